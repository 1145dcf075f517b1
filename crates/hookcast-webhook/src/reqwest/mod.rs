//! Reqwest-based HTTP transport for webhook delivery.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use hookcast_webhook::WebhookDispatcher;
//! use hookcast_webhook::reqwest::{ReqwestClient, ReqwestConfig};
//!
//! let client = ReqwestClient::new(ReqwestConfig::default())?;
//! let dispatcher = WebhookDispatcher::builder()
//!     .store(store)
//!     .transport(Arc::new(client))
//!     .build()?;
//! ```

mod client;
mod config;
mod error;

pub use client::ReqwestClient;
pub use config::ReqwestConfig;
pub use error::{Error, Result};

/// Tracing target for reqwest client operations.
pub const TRACING_TARGET: &str = "hookcast_webhook::reqwest";
