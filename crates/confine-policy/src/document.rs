use serde::{Deserialize, Serialize};

/// How the launcher supervises the sandboxed program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Accept TCP connections and run one sandboxed process per connection.
    Listen,
    /// Run the program once and exit.
    Once,
    /// Run the program repeatedly, restarting it when it exits.
    Rerun,
    /// Replace the launcher process with the sandboxed program.
    Execve,
}

/// Diagnostic verbosity requested by the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Fatal,
}

/// Resolution strategy for one resource-limit field.
///
/// `Value` uses the declared number (scaled by the per-kind multiplier),
/// `Soft`/`Hard` inherit the launcher's current limit, `Inf` means no limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RlimitMode {
    #[default]
    Value,
    Soft,
    Hard,
    Inf,
}

/// One declared uid or gid mapping.
///
/// Absent inside/outside ids mean "let the mapping writer pick its
/// convention", which is distinct from an explicitly empty string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdMapEntry {
    #[serde(default)]
    pub inside_id: Option<String>,
    #[serde(default)]
    pub outside_id: Option<String>,
    #[serde(default = "default_count")]
    pub count: u64,
    #[serde(default)]
    pub use_newidmap: bool,
}

/// One declared mount, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MountEntry {
    #[serde(default)]
    pub src: Option<String>,
    /// Environment variable whose value is prepended to `src` at apply time.
    #[serde(default)]
    pub prefix_src_env: Option<String>,
    /// Inline content for a tmpfs-backed file, instead of a bind source.
    #[serde(default)]
    pub src_content: Option<String>,
    #[serde(default)]
    pub dst: Option<String>,
    /// Environment variable whose value is prepended to `dst` at apply time.
    #[serde(default)]
    pub prefix_dst_env: Option<String>,
    #[serde(default)]
    pub fstype: Option<String>,
    #[serde(default)]
    pub options: Option<String>,
    #[serde(default)]
    pub rw: bool,
    #[serde(default)]
    pub is_bind: bool,
    /// When false, an apply-time failure of this entry is logged and skipped
    /// instead of aborting sandbox startup.
    #[serde(default = "default_true")]
    pub mandatory: bool,
    /// Absent means "auto-detect directory vs. file from the source".
    #[serde(default)]
    pub is_dir: Option<bool>,
    #[serde(default)]
    pub is_symlink: bool,
}

/// The target executable and its argument vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecBin {
    pub path: String,
    /// Overrides argv[0]; the exec call still uses `path`.
    #[serde(default)]
    pub arg0: Option<String>,
    #[serde(default)]
    pub arg: Vec<String>,
    /// Execute via a pre-opened file descriptor rather than by path.
    #[serde(default)]
    pub exec_fd: bool,
}

/// A parsed sandbox policy document.
///
/// Field names and defaults mirror the launcher's wire schema; this struct
/// is what the generic text-format parser produces and what the plan
/// compiler consumes. Validation beyond closed-set membership happens in
/// `confine-plan`, not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyDocument {
    #[serde(default = "default_mode")]
    pub mode: RunMode,
    #[serde(default)]
    pub chroot_dir: Option<String>,
    #[serde(default)]
    pub is_root_rw: bool,
    #[serde(default = "default_hostname")]
    pub hostname: String,
    #[serde(default = "default_cwd")]
    pub cwd: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default = "default_bindhost")]
    pub bindhost: String,
    #[serde(default)]
    pub max_conns: u32,
    #[serde(default)]
    pub max_conns_per_ip: u32,
    #[serde(default)]
    pub time_limit: u64,
    #[serde(default)]
    pub max_cpus: u32,
    #[serde(default)]
    pub daemon: bool,

    #[serde(default)]
    pub log_file: Option<String>,
    #[serde(default)]
    pub log_fd: Option<i32>,
    #[serde(default)]
    pub log_level: Option<LogLevel>,

    #[serde(default)]
    pub keep_env: bool,
    #[serde(default)]
    pub envar: Vec<String>,

    #[serde(default)]
    pub keep_caps: bool,
    #[serde(default)]
    pub cap: Vec<String>,

    #[serde(default)]
    pub silent: bool,
    #[serde(default)]
    pub skip_setsid: bool,
    #[serde(default)]
    pub pass_fd: Vec<i32>,
    #[serde(default)]
    pub disable_no_new_privs: bool,

    #[serde(default = "default_rlimit_as")]
    pub rlimit_as: u64,
    #[serde(default)]
    pub rlimit_as_type: RlimitMode,
    #[serde(default)]
    pub rlimit_core: u64,
    #[serde(default)]
    pub rlimit_core_type: RlimitMode,
    #[serde(default = "default_rlimit_cpu")]
    pub rlimit_cpu: u64,
    #[serde(default)]
    pub rlimit_cpu_type: RlimitMode,
    #[serde(default = "default_rlimit_fsize")]
    pub rlimit_fsize: u64,
    #[serde(default)]
    pub rlimit_fsize_type: RlimitMode,
    #[serde(default = "default_rlimit_nofile")]
    pub rlimit_nofile: u64,
    #[serde(default)]
    pub rlimit_nofile_type: RlimitMode,
    #[serde(default = "default_rlimit_nproc")]
    pub rlimit_nproc: u64,
    #[serde(default = "default_soft")]
    pub rlimit_nproc_type: RlimitMode,
    #[serde(default = "default_rlimit_stack")]
    pub rlimit_stack: u64,
    #[serde(default = "default_soft")]
    pub rlimit_stack_type: RlimitMode,

    #[serde(default)]
    pub persona_addr_compat_layout: bool,
    #[serde(default)]
    pub persona_mmap_page_zero: bool,
    #[serde(default)]
    pub persona_read_implies_exec: bool,
    #[serde(default)]
    pub persona_addr_limit_3gb: bool,
    #[serde(default)]
    pub persona_addr_no_randomize: bool,

    #[serde(default = "default_true")]
    pub clone_newnet: bool,
    #[serde(default = "default_true")]
    pub clone_newuser: bool,
    #[serde(default = "default_true")]
    pub clone_newns: bool,
    #[serde(default = "default_true")]
    pub clone_newpid: bool,
    #[serde(default = "default_true")]
    pub clone_newipc: bool,
    #[serde(default = "default_true")]
    pub clone_newuts: bool,
    #[serde(default = "default_true")]
    pub clone_newcgroup: bool,

    #[serde(default)]
    pub uidmap: Vec<IdMapEntry>,
    #[serde(default)]
    pub gidmap: Vec<IdMapEntry>,

    #[serde(default = "default_true")]
    pub mount_proc: bool,
    #[serde(default)]
    pub mount: Vec<MountEntry>,

    #[serde(default)]
    pub seccomp_policy_file: Option<String>,
    #[serde(default)]
    pub seccomp_string: Vec<String>,

    #[serde(default)]
    pub cgroup_mem_max: u64,
    #[serde(default = "default_cgroup_mem_mount")]
    pub cgroup_mem_mount: String,
    #[serde(default = "default_cgroup_parent")]
    pub cgroup_mem_parent: String,
    #[serde(default)]
    pub cgroup_pids_max: u64,
    #[serde(default = "default_cgroup_pids_mount")]
    pub cgroup_pids_mount: String,
    #[serde(default = "default_cgroup_parent")]
    pub cgroup_pids_parent: String,
    #[serde(default)]
    pub cgroup_net_cls_classid: u32,
    #[serde(default = "default_cgroup_net_cls_mount")]
    pub cgroup_net_cls_mount: String,
    #[serde(default = "default_cgroup_parent")]
    pub cgroup_net_cls_parent: String,

    #[serde(default)]
    pub iface_no_lo: bool,
    #[serde(default)]
    pub macvlan_iface: Option<String>,
    #[serde(default = "default_vs_ip")]
    pub macvlan_vs_ip: String,
    #[serde(default = "default_vs_nm")]
    pub macvlan_vs_nm: String,
    #[serde(default = "default_vs_ip")]
    pub macvlan_vs_gw: String,

    #[serde(default)]
    pub exec_bin: Option<ExecBin>,
}

fn default_true() -> bool {
    true
}

fn default_count() -> u64 {
    1
}

fn default_mode() -> RunMode {
    RunMode::Once
}

fn default_hostname() -> String {
    "CONFINE".to_owned()
}

fn default_cwd() -> String {
    "/".to_owned()
}

fn default_bindhost() -> String {
    "::".to_owned()
}

fn default_rlimit_as() -> u64 {
    4096
}

fn default_rlimit_cpu() -> u64 {
    600
}

fn default_rlimit_fsize() -> u64 {
    1
}

fn default_rlimit_nofile() -> u64 {
    32
}

fn default_rlimit_nproc() -> u64 {
    1024
}

fn default_rlimit_stack() -> u64 {
    8
}

fn default_soft() -> RlimitMode {
    RlimitMode::Soft
}

fn default_cgroup_mem_mount() -> String {
    "/sys/fs/cgroup/memory".to_owned()
}

fn default_cgroup_pids_mount() -> String {
    "/sys/fs/cgroup/pids".to_owned()
}

fn default_cgroup_net_cls_mount() -> String {
    "/sys/fs/cgroup/net_cls".to_owned()
}

fn default_cgroup_parent() -> String {
    "CONFINE".to_owned()
}

fn default_vs_ip() -> String {
    "0.0.0.0".to_owned()
}

fn default_vs_nm() -> String {
    "255.255.255.0".to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_policy_str;

    #[test]
    fn parses_full_document() {
        let input = r#"
mode = "listen"
hostname = "worker"
cwd = "/srv"
port = 4000
bindhost = "127.0.0.1"
time_limit = 30
log_level = "warning"

keep_env = false
envar = ["PATH=/usr/bin", "HOME=/home/user"]
cap = ["CAP_NET_ADMIN", "CAP_SYS_ADMIN"]
pass_fd = [100, 3]

rlimit_as = 2048
rlimit_as_type = "value"
rlimit_nofile_type = "hard"

persona_addr_no_randomize = true
clone_newnet = false

[[uidmap]]
inside_id = "0"
outside_id = "1000"

[[gidmap]]
count = 4
use_newidmap = true

[[mount]]
src = "/bin"
dst = "/bin"
is_bind = true

[[mount]]
dst = "/tmp"
fstype = "tmpfs"
rw = true

[exec_bin]
path = "/bin/busybox"
arg0 = "sh"
arg = ["-c", "id"]
"#;
        let doc = parse_policy_str(input).expect("should parse");
        assert_eq!(doc.mode, RunMode::Listen);
        assert_eq!(doc.log_level, Some(LogLevel::Warning));
        assert_eq!(doc.cap.len(), 2);
        assert_eq!(doc.pass_fd, vec![100, 3]);
        assert_eq!(doc.rlimit_as, 2048);
        assert_eq!(doc.rlimit_nofile_type, RlimitMode::Hard);
        assert!(doc.persona_addr_no_randomize);
        assert!(!doc.clone_newnet);
        assert_eq!(doc.uidmap.len(), 1);
        assert_eq!(doc.gidmap[0].count, 4);
        assert_eq!(doc.mount.len(), 2);
        assert!(doc.mount[0].is_bind);
        assert_eq!(doc.exec_bin.as_ref().unwrap().arg0.as_deref(), Some("sh"));
    }

    #[test]
    fn empty_document_gets_schema_defaults() {
        let doc = parse_policy_str("").expect("should parse");
        assert_eq!(doc.mode, RunMode::Once);
        assert_eq!(doc.hostname, "CONFINE");
        assert_eq!(doc.cwd, "/");
        assert_eq!(doc.bindhost, "::");
        assert_eq!(doc.rlimit_as, 4096);
        assert_eq!(doc.rlimit_cpu, 600);
        assert_eq!(doc.rlimit_nproc_type, RlimitMode::Soft);
        assert_eq!(doc.rlimit_stack_type, RlimitMode::Soft);
        assert!(doc.mount_proc);
        assert!(doc.clone_newuser && doc.clone_newcgroup);
        assert!(doc.exec_bin.is_none());
    }

    #[test]
    fn mount_and_idmap_entry_defaults() {
        let doc = parse_policy_str(
            r#"
[[mount]]
dst = "/tmp"
fstype = "tmpfs"

[[uidmap]]
outside_id = "1000"
"#,
        )
        .unwrap();
        let m = &doc.mount[0];
        assert!(m.mandatory);
        assert!(!m.rw && !m.is_bind && !m.is_symlink);
        assert!(m.is_dir.is_none());
        let u = &doc.uidmap[0];
        assert_eq!(u.count, 1);
        assert!(u.inside_id.is_none());
    }

    #[test]
    fn rejects_unknown_run_mode() {
        let err = parse_policy_str("mode = \"forever\"").unwrap_err();
        assert!(err.to_string().contains("forever"));
    }

    #[test]
    fn rejects_unknown_log_level() {
        assert!(parse_policy_str("log_level = \"chatty\"").is_err());
    }

    #[test]
    fn rejects_unknown_rlimit_mode() {
        assert!(parse_policy_str("rlimit_as_type = \"huge\"").is_err());
    }

    #[test]
    fn rejects_unknown_fields() {
        assert!(parse_policy_str("frobnicate = true").is_err());
        assert!(parse_policy_str("[[mount]]\ndst = \"/x\"\nwritable = true").is_err());
    }

    #[test]
    fn serde_roundtrip_preserves_document() {
        let doc = parse_policy_str("mode = \"rerun\"\n[[mount]]\ndst = \"/tmp\"").unwrap();
        let json = serde_json::to_string(&doc).unwrap();
        let back: PolicyDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(back, doc);
    }
}
