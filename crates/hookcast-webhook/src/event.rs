//! Webhook event catalog and subscription event selectors.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// Defines the domain events that can trigger webhook delivery.
///
/// Event names are namespaced as `resource.action`; producers may only emit
/// events from this catalog.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
#[derive(Serialize, Deserialize, AsRefStr, Display, EnumIter, EnumString, IntoStaticStr)]
pub enum WebhookEvent {
    // Contact events
    /// A contact was created
    #[serde(rename = "user.created")]
    #[strum(serialize = "user.created")]
    UserCreated,

    /// A contact was updated
    #[serde(rename = "user.updated")]
    #[strum(serialize = "user.updated")]
    UserUpdated,

    // Booking events
    /// A booking was created
    #[serde(rename = "booking.created")]
    #[strum(serialize = "booking.created")]
    BookingCreated,

    /// A booking was updated
    #[serde(rename = "booking.updated")]
    #[strum(serialize = "booking.updated")]
    BookingUpdated,

    /// A booking was cancelled
    #[serde(rename = "booking.cancelled")]
    #[strum(serialize = "booking.cancelled")]
    BookingCancelled,

    /// A booking was completed
    #[serde(rename = "booking.completed")]
    #[strum(serialize = "booking.completed")]
    BookingCompleted,

    // QR code events
    /// A QR code was generated
    #[serde(rename = "qr.created")]
    #[strum(serialize = "qr.created")]
    QrCreated,

    /// A QR code was scanned
    #[serde(rename = "qr.scanned")]
    #[strum(serialize = "qr.scanned")]
    QrScanned,

    /// A QR code was validated
    #[serde(rename = "qr.validated")]
    #[strum(serialize = "qr.validated")]
    QrValidated,

    // Tag events
    /// A tag was added to a contact
    #[serde(rename = "tag.added")]
    #[strum(serialize = "tag.added")]
    TagAdded,

    /// A tag was removed from a contact
    #[serde(rename = "tag.removed")]
    #[strum(serialize = "tag.removed")]
    TagRemoved,

    // Custom field events
    /// A custom field value was updated
    #[serde(rename = "customfield.updated")]
    #[strum(serialize = "customfield.updated")]
    CustomFieldUpdated,

    /// Synthetic event used to test an endpoint
    #[serde(rename = "webhook.test")]
    #[strum(serialize = "webhook.test")]
    WebhookTest,
}

impl WebhookEvent {
    /// Returns every event in the catalog.
    pub fn all() -> Vec<Self> {
        Self::iter().collect()
    }

    /// Returns the namespaced event name, e.g. `booking.created`.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        self.into()
    }

    /// Returns the resource half of the event name.
    pub fn resource(&self) -> &'static str {
        self.as_str()
            .split_once('.')
            .map_or(self.as_str(), |(resource, _)| resource)
    }

    /// Returns the action half of the event name.
    pub fn action(&self) -> &'static str {
        self.as_str()
            .split_once('.')
            .map_or(self.as_str(), |(_, action)| action)
    }

    /// Returns whether this is a booking lifecycle event.
    #[inline]
    pub fn is_booking_event(self) -> bool {
        matches!(
            self,
            Self::BookingCreated
                | Self::BookingUpdated
                | Self::BookingCancelled
                | Self::BookingCompleted
        )
    }

    /// Returns whether this is a QR code event.
    #[inline]
    pub fn is_qr_event(self) -> bool {
        matches!(self, Self::QrCreated | Self::QrScanned | Self::QrValidated)
    }
}

/// One entry of a subscription's event set.
///
/// Serialized as the event name, or as `*` for [`EventSelector::All`].
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum EventSelector {
    /// Matches every event in the catalog.
    All,
    /// Matches exactly one event.
    Event(WebhookEvent),
}

impl EventSelector {
    /// The wildcard sentinel stored for [`EventSelector::All`].
    pub const WILDCARD: &'static str = "*";

    /// Returns whether this selector matches the given event.
    #[inline]
    pub fn matches(&self, event: WebhookEvent) -> bool {
        match self {
            Self::All => true,
            Self::Event(selected) => *selected == event,
        }
    }
}

impl From<WebhookEvent> for EventSelector {
    fn from(event: WebhookEvent) -> Self {
        Self::Event(event)
    }
}

impl fmt::Display for EventSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str(Self::WILDCARD),
            Self::Event(event) => f.write_str(event.as_str()),
        }
    }
}

impl FromStr for EventSelector {
    type Err = strum::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == Self::WILDCARD {
            return Ok(Self::All);
        }
        WebhookEvent::from_str(s).map(Self::Event)
    }
}

impl Serialize for EventSelector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EventSelector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        value
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("unknown webhook event `{value}`")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_round_trip_through_strum() {
        for event in WebhookEvent::all() {
            assert_eq!(WebhookEvent::from_str(event.as_str()).unwrap(), event);
            assert_eq!(event.to_string(), event.as_str());
        }
    }

    #[test]
    fn test_catalog_size() {
        assert_eq!(WebhookEvent::all().len(), 13);
    }

    #[test]
    fn test_resource_and_action() {
        assert_eq!(WebhookEvent::BookingCancelled.resource(), "booking");
        assert_eq!(WebhookEvent::BookingCancelled.action(), "cancelled");
        assert_eq!(WebhookEvent::CustomFieldUpdated.resource(), "customfield");
        assert_eq!(WebhookEvent::WebhookTest.action(), "test");
    }

    #[test]
    fn test_event_serializes_as_dotted_name() {
        let json = serde_json::to_string(&WebhookEvent::QrValidated).unwrap();
        assert_eq!(json, "\"qr.validated\"");

        let parsed: WebhookEvent = serde_json::from_str("\"tag.removed\"").unwrap();
        assert_eq!(parsed, WebhookEvent::TagRemoved);
    }

    #[test]
    fn test_event_categories() {
        assert!(WebhookEvent::BookingCompleted.is_booking_event());
        assert!(!WebhookEvent::QrScanned.is_booking_event());
        assert!(WebhookEvent::QrScanned.is_qr_event());
    }

    #[test]
    fn test_wildcard_matches_every_event() {
        for event in WebhookEvent::all() {
            assert!(EventSelector::All.matches(event));
        }
    }

    #[test]
    fn test_single_event_selector() {
        let selector = EventSelector::from(WebhookEvent::BookingCreated);
        assert!(selector.matches(WebhookEvent::BookingCreated));
        assert!(!selector.matches(WebhookEvent::BookingUpdated));
    }

    #[test]
    fn test_selector_serde() {
        let selectors: Vec<EventSelector> =
            serde_json::from_str(r#"["*", "booking.created"]"#).unwrap();
        assert_eq!(
            selectors,
            vec![
                EventSelector::All,
                EventSelector::Event(WebhookEvent::BookingCreated)
            ]
        );

        let json = serde_json::to_string(&selectors).unwrap();
        assert_eq!(json, r#"["*","booking.created"]"#);

        assert!(serde_json::from_str::<EventSelector>("\"booking.deleted\"").is_err());
    }
}
