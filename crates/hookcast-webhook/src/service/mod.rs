//! Delivery pipeline: dispatcher, retry coordinator, executor and statistics.

mod dispatcher;
mod executor;
mod retry;
mod statistics;

pub use self::dispatcher::{DispatcherBuilder, EmitSummary, WebhookDispatcher};
pub use self::executor::DeliveryExecutor;
pub use self::retry::{RetryCoordinator, RetryPolicy};
pub use self::statistics::StatisticsUpdater;
