use crate::PlanError;
use confine_policy::RlimitMode;

/// The seven resource limits the launcher applies to the sandboxed process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RlimitKind {
    AddressSpace,
    Core,
    CpuTime,
    FileSize,
    OpenFiles,
    Processes,
    Stack,
}

impl RlimitKind {
    pub const ALL: [RlimitKind; 7] = [
        RlimitKind::AddressSpace,
        RlimitKind::Core,
        RlimitKind::CpuTime,
        RlimitKind::FileSize,
        RlimitKind::OpenFiles,
        RlimitKind::Processes,
        RlimitKind::Stack,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RlimitKind::AddressSpace => "RLIMIT_AS",
            RlimitKind::Core => "RLIMIT_CORE",
            RlimitKind::CpuTime => "RLIMIT_CPU",
            RlimitKind::FileSize => "RLIMIT_FSIZE",
            RlimitKind::OpenFiles => "RLIMIT_NOFILE",
            RlimitKind::Processes => "RLIMIT_NPROC",
            RlimitKind::Stack => "RLIMIT_STACK",
        }
    }

    fn resource(self) -> libc::__rlimit_resource_t {
        match self {
            RlimitKind::AddressSpace => libc::RLIMIT_AS,
            RlimitKind::Core => libc::RLIMIT_CORE,
            RlimitKind::CpuTime => libc::RLIMIT_CPU,
            RlimitKind::FileSize => libc::RLIMIT_FSIZE,
            RlimitKind::OpenFiles => libc::RLIMIT_NOFILE,
            RlimitKind::Processes => libc::RLIMIT_NPROC,
            RlimitKind::Stack => libc::RLIMIT_STACK,
        }
    }
}

/// Canonical "no limit" sentinel, as understood by setrlimit.
pub const RLIM_UNLIMITED: u64 = libc::RLIM_INFINITY;

/// Fully-resolved strategy for one limit field.
///
/// A closed variant: internally-constructed values can never hold an
/// out-of-set mode, so the "unknown mode" defect of a sentinel-based
/// encoding is unrepresentable here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitValue {
    Explicit(u64),
    InheritSoft,
    InheritHard,
    Unlimited,
}

impl LimitValue {
    /// Map the document's (mode, value) pair into the resolved strategy.
    pub fn from_policy(mode: RlimitMode, value: u64) -> Self {
        match mode {
            RlimitMode::Value => LimitValue::Explicit(value),
            RlimitMode::Soft => LimitValue::InheritSoft,
            RlimitMode::Hard => LimitValue::InheritHard,
            RlimitMode::Inf => LimitValue::Unlimited,
        }
    }
}

/// Query the launcher's current (soft, hard) limit for `kind`.
///
/// The only OS interaction of the whole compiler; a plain non-blocking
/// syscall.
pub fn current_rlimit(kind: RlimitKind) -> Result<(u64, u64), PlanError> {
    let mut rl = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };
    // Safe wrapper around libc::getrlimit(): rl is a valid out-pointer.
    #[allow(unsafe_code)]
    let ret = unsafe { libc::getrlimit(kind.resource(), &mut rl) };
    if ret != 0 {
        return Err(PlanError::RlimitQuery {
            kind: kind.name(),
            source: std::io::Error::last_os_error(),
        });
    }
    Ok((rl.rlim_cur, rl.rlim_max))
}

/// Resolve one limit field to its concrete value.
///
/// `multiplier` scales explicit values only (MiB-declared limits); inherit
/// and unlimited strategies ignore it.
pub fn resolve_rlimit(
    kind: RlimitKind,
    value: LimitValue,
    multiplier: u64,
) -> Result<u64, PlanError> {
    match value {
        LimitValue::Explicit(v) => Ok(v.saturating_mul(multiplier)),
        LimitValue::InheritSoft => Ok(current_rlimit(kind)?.0),
        LimitValue::InheritHard => Ok(current_rlimit(kind)?.1),
        LimitValue::Unlimited => Ok(RLIM_UNLIMITED),
    }
}
