//! Result persistence, indexed retrieval, and exports.

pub mod export;
pub mod model;
pub mod store;

pub use export::{AgentPerformance, Export, ExportFormat, ExportService};
pub use model::{JobResult, ResultStatus};
pub use store::ResultStore;
