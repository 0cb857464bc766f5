//! Job dispatch — agent resolution and priority queues.

pub mod assign;
pub mod dispatcher;
pub mod job;

pub use dispatcher::{DispatchReceipt, Dispatcher, TaskRequest};
pub use job::{JobDescriptor, Priority};
