//! Workflow orchestration with lazily-derived step state.

pub mod model;
pub mod orchestrator;

pub use model::{ReviewReceipt, StepStatus, Workflow, WorkflowList, WorkflowStatus, WorkflowStep};
pub use orchestrator::Orchestrator;
