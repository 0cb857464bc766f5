//! jobforge — indexed job queue, agent registry, and workflow-state
//! derivation engine.
//!
//! Jobs are routed to named agents and pushed onto priority queues; external
//! workers pop them, execute, and write result records back. Every listable
//! entity keeps a companion time-ordered index so "most recent N" never
//! scans the store, and workflow progress is re-derived on read by probing
//! for each step's result record — no separate state machine is persisted.

pub mod agents;
pub mod analytics;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod metrics;
pub mod results;
pub mod store;
pub mod uploads;
pub mod workflow;

pub use agents::{Agent, AgentRegistry, NewAgent};
pub use analytics::Analytics;
pub use config::EngineConfig;
pub use dispatch::{DispatchReceipt, Dispatcher, JobDescriptor, Priority, TaskRequest};
pub use error::{Error, Result};
pub use metrics::Metrics;
pub use results::{ExportService, JobResult, ResultStore};
pub use store::{IndexedStore, LibSqlStore, MemoryStore};
pub use uploads::UploadIndex;
pub use workflow::{Orchestrator, Workflow};
