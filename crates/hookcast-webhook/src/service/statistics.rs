//! Subscription delivery counters.

use std::fmt;
use std::sync::Arc;

use jiff::Timestamp;
use uuid::Uuid;

use crate::store::StatisticsStore;
use crate::{DeliveryResult, Result};

/// Tracing target for subscription statistics.
pub const TRACING_TARGET: &str = "hookcast_webhook::statistics";

/// Folds the final outcome of a delivery sequence into subscription counters.
#[derive(Clone)]
pub struct StatisticsUpdater {
    statistics: Arc<dyn StatisticsStore>,
}

impl fmt::Debug for StatisticsUpdater {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatisticsUpdater").finish_non_exhaustive()
    }
}

impl StatisticsUpdater {
    /// Creates an updater writing to the given statistics store.
    pub fn new(statistics: Arc<dyn StatisticsStore>) -> Self {
        Self { statistics }
    }

    /// Records one success or one failure, never both, for a finished sequence.
    pub async fn record_outcome(&self, subscription_id: Uuid, result: &DeliveryResult) -> Result<()> {
        let now = Timestamp::now();

        if result.success {
            self.statistics.increment_success(subscription_id, now).await?;
        } else {
            self.statistics.increment_failure(subscription_id, now).await?;
        }

        tracing::trace!(
            target: TRACING_TARGET,
            subscription_id = %subscription_id,
            success = result.success,
            "Updated subscription statistics"
        );

        Ok(())
    }
}
