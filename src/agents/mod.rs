//! Agent registry — named worker profiles and their time-ordered index.

pub mod model;
pub mod registry;

pub use model::{Agent, NewAgent, normalize_name};
pub use registry::{AgentRegistry, default_agents};
