use crate::caps::resolve_capabilities;
use crate::exec::ExecDescriptor;
use crate::idmap::resolve_mappings;
use crate::limits::{resolve_rlimit, LimitValue, RlimitKind};
use crate::mount::MountSpec;
use crate::ns::{personality_mask, Namespaces};
use crate::plan::{CgroupConfig, ExecutionPlan, IfaceConfig, Mode, RlimitSet, Verbosity};
use crate::PlanError;
use confine_policy::{LogLevel, PolicyDocument, RunMode};
use std::path::Path;
use tracing::{debug, warn};

/// Mount path seeded into every plan unless the policy opts out of proc.
const DEFAULT_PROC_PATH: &str = "/proc";

const MIB: u64 = 1024 * 1024;

/// Compile one parsed policy document into an execution plan.
///
/// Resolvers run in fixed order; the first failure aborts the whole
/// compilation and no partially-populated plan escapes. On success the
/// returned plan is final: nothing mutates it afterwards.
pub fn compile(doc: &PolicyDocument) -> Result<ExecutionPlan, PlanError> {
    let mode = match doc.mode {
        RunMode::Listen => Mode::ListenTcp,
        RunMode::Once => Mode::StandaloneOnce,
        RunMode::Rerun => Mode::StandaloneRerun,
        RunMode::Execve => Mode::StandaloneExecve,
    };

    let verbosity = doc.log_level.map(|level| match level {
        LogLevel::Debug => Verbosity::Debug,
        LogLevel::Info => Verbosity::Info,
        LogLevel::Warning => Verbosity::Warning,
        LogLevel::Error => Verbosity::Error,
        LogLevel::Fatal => Verbosity::Fatal,
    });

    // An explicit log file wins over a log descriptor.
    let logfile = doc
        .log_file
        .clone()
        .or_else(|| doc.log_fd.map(|fd| format!("/dev/fd/{fd}")));

    let rlimits = RlimitSet {
        addr_space: resolve_rlimit(
            RlimitKind::AddressSpace,
            LimitValue::from_policy(doc.rlimit_as_type, doc.rlimit_as),
            MIB,
        )?,
        core: resolve_rlimit(
            RlimitKind::Core,
            LimitValue::from_policy(doc.rlimit_core_type, doc.rlimit_core),
            MIB,
        )?,
        cpu_time: resolve_rlimit(
            RlimitKind::CpuTime,
            LimitValue::from_policy(doc.rlimit_cpu_type, doc.rlimit_cpu),
            1,
        )?,
        file_size: resolve_rlimit(
            RlimitKind::FileSize,
            LimitValue::from_policy(doc.rlimit_fsize_type, doc.rlimit_fsize),
            MIB,
        )?,
        open_files: resolve_rlimit(
            RlimitKind::OpenFiles,
            LimitValue::from_policy(doc.rlimit_nofile_type, doc.rlimit_nofile),
            1,
        )?,
        processes: resolve_rlimit(
            RlimitKind::Processes,
            LimitValue::from_policy(doc.rlimit_nproc_type, doc.rlimit_nproc),
            1,
        )?,
        stack: resolve_rlimit(
            RlimitKind::Stack,
            LimitValue::from_policy(doc.rlimit_stack_type, doc.rlimit_stack),
            MIB,
        )?,
    };

    let caps = resolve_capabilities(&doc.cap)?;

    let id_mappings = resolve_mappings(&doc.uidmap, &doc.gidmap)?;

    // mount_proc=false clears the seeded default instead of adding an entry.
    let mut proc_path = Some(DEFAULT_PROC_PATH.to_owned());
    if !doc.mount_proc {
        proc_path = None;
    }

    let mut mounts = Vec::with_capacity(doc.mount.len());
    for entry in &doc.mount {
        match MountSpec::from_entry(entry) {
            Ok(spec) => mounts.push(spec),
            Err(e) => {
                warn!(
                    "could not add mountpoint for src:{:?} dst:{:?}",
                    entry.src, entry.dst
                );
                return Err(e);
            }
        }
    }

    let mut seccomp_string = String::new();
    for line in &doc.seccomp_string {
        seccomp_string.push_str(line);
        seccomp_string.push('\n');
    }

    let exec = doc
        .exec_bin
        .as_ref()
        .map(ExecDescriptor::from_policy)
        .transpose()?;

    let plan = ExecutionPlan {
        mode,
        chroot: doc.chroot_dir.clone(),
        is_root_rw: doc.is_root_rw,
        hostname: doc.hostname.clone(),
        cwd: doc.cwd.clone(),
        port: doc.port,
        bindhost: doc.bindhost.clone(),
        max_conns: doc.max_conns,
        max_conns_per_ip: doc.max_conns_per_ip,
        time_limit: doc.time_limit,
        max_cpus: doc.max_cpus,
        daemonize: doc.daemon,
        logfile,
        verbosity,
        keep_env: doc.keep_env,
        envs: doc.envar.clone(),
        keep_caps: doc.keep_caps,
        caps,
        is_silent: doc.silent,
        skip_setsid: doc.skip_setsid,
        // The declared descriptor numbers, in order, not positional indices.
        pass_fds: doc.pass_fd.clone(),
        disable_no_new_privs: doc.disable_no_new_privs,
        rlimits,
        personality: personality_mask(doc),
        namespaces: Namespaces::from_policy(doc),
        id_mappings,
        proc_path,
        mounts,
        seccomp_policy_file: doc.seccomp_policy_file.clone(),
        seccomp_string,
        cgroup: CgroupConfig {
            mem_max: doc.cgroup_mem_max,
            mem_mount: doc.cgroup_mem_mount.clone(),
            mem_parent: doc.cgroup_mem_parent.clone(),
            pids_max: doc.cgroup_pids_max,
            pids_mount: doc.cgroup_pids_mount.clone(),
            pids_parent: doc.cgroup_pids_parent.clone(),
            net_cls_classid: doc.cgroup_net_cls_classid,
            net_cls_mount: doc.cgroup_net_cls_mount.clone(),
            net_cls_parent: doc.cgroup_net_cls_parent.clone(),
        },
        iface: IfaceConfig {
            lo: !doc.iface_no_lo,
            vs: doc.macvlan_iface.clone(),
            vs_ip: doc.macvlan_vs_ip.clone(),
            vs_nm: doc.macvlan_vs_nm.clone(),
            vs_gw: doc.macvlan_vs_gw.clone(),
        },
        exec,
    };

    debug!(
        "compiled plan: mode={:?} mounts={} caps={} idmaps={}",
        plan.mode,
        plan.mounts.len(),
        plan.caps.len(),
        plan.id_mappings.len()
    );
    Ok(plan)
}

/// Parse a policy file and compile it in one step.
pub fn compile_policy_file(path: impl AsRef<Path>) -> Result<ExecutionPlan, PlanError> {
    let doc = confine_policy::parse_policy_file(path)?;
    compile(&doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use confine_policy::parse_policy_str;

    #[test]
    fn mode_and_level_map_exhaustively() {
        for (s, mode) in [
            ("listen", Mode::ListenTcp),
            ("once", Mode::StandaloneOnce),
            ("rerun", Mode::StandaloneRerun),
            ("execve", Mode::StandaloneExecve),
        ] {
            let doc = parse_policy_str(&format!("mode = \"{s}\"")).unwrap();
            assert_eq!(compile(&doc).unwrap().mode, mode);
        }
        let doc = parse_policy_str("log_level = \"fatal\"").unwrap();
        assert_eq!(compile(&doc).unwrap().verbosity, Some(Verbosity::Fatal));
    }

    #[test]
    fn log_file_wins_over_log_fd() {
        let doc = parse_policy_str("log_fd = 5").unwrap();
        assert_eq!(compile(&doc).unwrap().logfile.as_deref(), Some("/dev/fd/5"));

        let doc = parse_policy_str("log_fd = 5\nlog_file = \"/var/log/confine.log\"").unwrap();
        assert_eq!(
            compile(&doc).unwrap().logfile.as_deref(),
            Some("/var/log/confine.log")
        );
    }

    #[test]
    fn proc_default_is_seeded_and_clearable() {
        let doc = parse_policy_str("").unwrap();
        assert_eq!(compile(&doc).unwrap().proc_path.as_deref(), Some("/proc"));

        let doc = parse_policy_str("mount_proc = true").unwrap();
        assert_eq!(compile(&doc).unwrap().proc_path.as_deref(), Some("/proc"));

        let doc = parse_policy_str("mount_proc = false").unwrap();
        assert!(compile(&doc).unwrap().proc_path.is_none());
    }

    #[test]
    fn seccomp_lines_are_newline_joined() {
        let doc = parse_policy_str(
            "seccomp_string = [\"ALLOW { read }\", \"DEFAULT KILL\"]",
        )
        .unwrap();
        let plan = compile(&doc).unwrap();
        assert_eq!(plan.seccomp_string, "ALLOW { read }\nDEFAULT KILL\n");
    }

    #[test]
    fn pass_fds_keep_declared_numbers() {
        let doc = parse_policy_str("pass_fd = [100, 3, 7]").unwrap();
        assert_eq!(compile(&doc).unwrap().pass_fds, vec![100, 3, 7]);
    }

    #[test]
    fn loopback_follows_negated_toggle() {
        let doc = parse_policy_str("").unwrap();
        assert!(compile(&doc).unwrap().iface.lo);
        let doc = parse_policy_str("iface_no_lo = true").unwrap();
        assert!(!compile(&doc).unwrap().iface.lo);
    }

    #[test]
    fn cgroup_settings_pass_through() {
        let doc = parse_policy_str("cgroup_mem_max = 268435456\ncgroup_pids_max = 64").unwrap();
        let plan = compile(&doc).unwrap();
        assert_eq!(plan.cgroup.mem_max, 268_435_456);
        assert_eq!(plan.cgroup.pids_max, 64);
        // Zero means "not configured"; passed through untouched.
        assert_eq!(plan.cgroup.net_cls_classid, 0);
        assert_eq!(plan.cgroup.pids_mount, "/sys/fs/cgroup/pids");
    }
}
