//! Queue module
//!
//! Message transport port plus in-memory and PostgreSQL implementations.

mod gateway;
mod memory;
mod postgres;

pub use gateway::{DeadLetterEntry, QueueError, QueueGateway, QueueGatewayBox, QueueMessage};
pub use memory::{InMemoryQueue, Reschedule};
pub use postgres::PgQueueGateway;
