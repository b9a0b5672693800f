use crate::exec::ExecDescriptor;
use crate::idmap::IdMapping;
use crate::mount::MountSpec;
use crate::ns::Namespaces;

/// Resolved supervision mode for the launcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    ListenTcp,
    StandaloneOnce,
    StandaloneRerun,
    StandaloneExecve,
}

/// Resolved diagnostic verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Debug,
    Info,
    Warning,
    Error,
    Fatal,
}

/// The seven resolved resource limits, in canonical units (bytes, seconds
/// or counts), or [`RLIM_UNLIMITED`](crate::RLIM_UNLIMITED).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RlimitSet {
    pub addr_space: u64,
    pub core: u64,
    pub cpu_time: u64,
    pub file_size: u64,
    pub open_files: u64,
    pub processes: u64,
    pub stack: u64,
}

/// Cgroup controller settings, passed through verbatim. A zero max means
/// "no limit configured"; interpretation belongs to the cgroup attacher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CgroupConfig {
    pub mem_max: u64,
    pub mem_mount: String,
    pub mem_parent: String,
    pub pids_max: u64,
    pub pids_mount: String,
    pub pids_parent: String,
    pub net_cls_classid: u32,
    pub net_cls_mount: String,
    pub net_cls_parent: String,
}

/// Network interface settings for the sandbox's network namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfaceConfig {
    /// Bring up the loopback interface inside the namespace.
    pub lo: bool,
    /// Host interface to attach a macvlan slave to, if any.
    pub vs: Option<String>,
    pub vs_ip: String,
    pub vs_nm: String,
    pub vs_gw: String,
}

/// The single output of compilation: one fully-resolved, internally
/// consistent description of everything the sandbox setup stages do.
///
/// Built once by [`compile`](crate::compile) and never mutated afterwards;
/// listen-mode launchers reuse one plan across all accepted connections,
/// which is safe because no writer exists post-commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPlan {
    pub mode: Mode,
    pub chroot: Option<String>,
    pub is_root_rw: bool,
    pub hostname: String,
    pub cwd: String,
    pub port: u16,
    pub bindhost: String,
    pub max_conns: u32,
    pub max_conns_per_ip: u32,
    pub time_limit: u64,
    pub max_cpus: u32,
    pub daemonize: bool,

    pub logfile: Option<String>,
    pub verbosity: Option<Verbosity>,

    pub keep_env: bool,
    pub envs: Vec<String>,
    pub keep_caps: bool,
    pub caps: Vec<u32>,

    pub is_silent: bool,
    pub skip_setsid: bool,
    pub pass_fds: Vec<i32>,
    pub disable_no_new_privs: bool,

    pub rlimits: RlimitSet,
    pub personality: u64,
    pub namespaces: Namespaces,

    pub id_mappings: Vec<IdMapping>,

    /// Default proc mount path; `None` when the policy opted out of
    /// mounting proc.
    pub proc_path: Option<String>,
    pub mounts: Vec<MountSpec>,

    pub seccomp_policy_file: Option<String>,
    /// Inline seccomp policy lines, newline-joined and -terminated.
    pub seccomp_string: String,

    pub cgroup: CgroupConfig,
    pub iface: IfaceConfig,

    pub exec: Option<ExecDescriptor>,
}
