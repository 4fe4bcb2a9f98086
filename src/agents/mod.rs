//! Role-specialized agents for the coding pipeline.

pub mod agent;
pub mod roster;

pub use agent::{Agent, ArtifactKind};
pub use roster::{AgentRoster, RefinementRoster};
