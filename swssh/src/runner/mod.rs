//! Fan-out of a command plan over many hosts.

mod coordinator;
mod plan;

pub use coordinator::{Coordinator, DEFAULT_LIMIT, SharedWriter};
pub use plan::{CommandPlan, HostReport, HostTarget, RepeatPolicy};
