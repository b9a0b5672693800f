//! Execution-plan compiler for confine sandboxes.
//!
//! This crate turns a parsed [`PolicyDocument`](confine_policy::PolicyDocument)
//! into a single, fully-resolved [`ExecutionPlan`]: resource limits are
//! reduced to concrete 64-bit values, capability names become validated
//! identifiers, mount declarations become an ordered flag-composed sequence,
//! and the exec descriptor gets its finalized argument storage. Compilation
//! is all-or-nothing: the first invalid field aborts and no partial plan is
//! ever returned. The downstream mechanisms (namespace creation, mount
//! application, rlimit enforcement, the final exec) consume the plan but are
//! not part of this crate.

pub mod caps;
pub mod compiler;
pub mod exec;
pub mod idmap;
pub mod limits;
pub mod mount;
pub mod ns;
pub mod plan;

pub use caps::resolve_capabilities;
pub use compiler::{compile, compile_policy_file};
pub use exec::ExecDescriptor;
pub use idmap::{resolve_mappings, IdMapping};
pub use limits::{current_rlimit, resolve_rlimit, LimitValue, RlimitKind, RLIM_UNLIMITED};
pub use mount::{MountSpec, Tristate};
pub use ns::{personality_mask, Namespaces};
pub use plan::{CgroupConfig, ExecutionPlan, IfaceConfig, Mode, RlimitSet, Verbosity};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("policy error: {0}")]
    Policy(#[from] confine_policy::PolicyError),
    #[error("unknown capability name: '{0}'")]
    UnknownCapability(String),
    #[error("invalid mount src:'{src}' dst:'{dst}': {reason}")]
    InvalidMount {
        src: String,
        dst: String,
        reason: String,
    },
    #[error("invalid id mapping inside:'{inside}' outside:'{outside}': {reason}")]
    InvalidMapping {
        inside: String,
        outside: String,
        reason: String,
    },
    #[error("could not query current {kind} limit: {source}")]
    RlimitQuery {
        kind: &'static str,
        source: std::io::Error,
    },
    #[error("exec argument contains an interior NUL byte: {0:?}")]
    NulInArgument(String),
}
