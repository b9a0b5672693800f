use crate::PlanError;
use confine_policy::MountEntry;

/// Directory-vs-file classification of a mount point.
///
/// `Maybe` defers the decision to the mount applier, which inspects the
/// source at apply time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tristate {
    Yes,
    No,
    Maybe,
}

/// One fully-resolved mount operation, applied downstream in plan order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountSpec {
    pub src: Option<String>,
    /// Env var whose value is prepended to `src` at apply time.
    pub src_env: Option<String>,
    /// Inline file content for a tmpfs-backed source.
    pub src_content: Option<Vec<u8>>,
    pub dst: Option<String>,
    /// Env var whose value is prepended to `dst` at apply time.
    pub dst_env: Option<String>,
    pub fstype: Option<String>,
    pub options: Option<String>,
    pub flags: libc::c_ulong,
    pub is_dir: Tristate,
    pub is_symlink: bool,
    /// When false, apply-time failure is logged and skipped, not fatal.
    pub mandatory: bool,
}

/// Compose the mount flag bitmask from the two per-entry booleans.
///
/// Read-only unless `rw`; a bind mount is always recursive and private,
/// independent of `rw`.
pub fn compose_flags(rw: bool, is_bind: bool) -> libc::c_ulong {
    let mut flags = if rw { 0 } else { libc::MS_RDONLY };
    if is_bind {
        flags |= libc::MS_BIND | libc::MS_REC | libc::MS_PRIVATE;
    }
    flags
}

impl MountSpec {
    /// Build one mount operation from its document entry.
    ///
    /// Rejects contradictory sources (literal path and inline content both
    /// set) and entries with no destination at all; the diagnostic names
    /// the entry's src/dst.
    pub fn from_entry(entry: &MountEntry) -> Result<Self, PlanError> {
        if entry.src.is_some() && entry.src_content.is_some() {
            return Err(invalid(entry, "both src and src_content set"));
        }
        if entry.dst.is_none() && entry.prefix_dst_env.is_none() {
            return Err(invalid(entry, "no dst or prefix_dst_env"));
        }

        let is_dir = match entry.is_dir {
            Some(true) => Tristate::Yes,
            Some(false) => Tristate::No,
            None => Tristate::Maybe,
        };

        Ok(MountSpec {
            src: entry.src.clone(),
            src_env: entry.prefix_src_env.clone(),
            src_content: entry.src_content.as_ref().map(|c| c.as_bytes().to_vec()),
            dst: entry.dst.clone(),
            dst_env: entry.prefix_dst_env.clone(),
            fstype: entry.fstype.clone(),
            options: entry.options.clone(),
            flags: compose_flags(entry.rw, entry.is_bind),
            is_dir,
            is_symlink: entry.is_symlink,
            mandatory: entry.mandatory,
        })
    }
}

fn invalid(entry: &MountEntry, reason: &str) -> PlanError {
    PlanError::InvalidMount {
        src: entry.src.clone().unwrap_or_default(),
        dst: entry.dst.clone().unwrap_or_default(),
        reason: reason.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(dst: &str) -> MountEntry {
        let doc = confine_policy::parse_policy_str(&format!("[[mount]]\ndst = \"{dst}\""))
            .expect("fixture parses");
        doc.mount.into_iter().next().unwrap()
    }

    #[test]
    fn default_entry_is_read_only_non_bind() {
        let spec = MountSpec::from_entry(&entry("/tmp")).unwrap();
        assert_eq!(spec.flags & libc::MS_RDONLY, libc::MS_RDONLY);
        assert_eq!(spec.flags & libc::MS_BIND, 0);
        assert_eq!(spec.is_dir, Tristate::Maybe);
        assert!(spec.mandatory);
    }

    #[test]
    fn bind_adds_rec_and_private_regardless_of_rw() {
        for rw in [false, true] {
            let flags = compose_flags(rw, true);
            assert_eq!(
                flags & (libc::MS_BIND | libc::MS_REC | libc::MS_PRIVATE),
                libc::MS_BIND | libc::MS_REC | libc::MS_PRIVATE
            );
            assert_eq!(flags & libc::MS_RDONLY != 0, !rw);
        }
    }

    #[test]
    fn explicit_dir_classification_is_kept() {
        let mut e = entry("/data");
        e.is_dir = Some(true);
        assert_eq!(MountSpec::from_entry(&e).unwrap().is_dir, Tristate::Yes);
        e.is_dir = Some(false);
        assert_eq!(MountSpec::from_entry(&e).unwrap().is_dir, Tristate::No);
    }

    #[test]
    fn inline_content_becomes_bytes() {
        let mut e = entry("/etc/hosts");
        e.src_content = Some("127.0.0.1 localhost\n".to_owned());
        let spec = MountSpec::from_entry(&e).unwrap();
        assert_eq!(spec.src_content.as_deref(), Some(&b"127.0.0.1 localhost\n"[..]));
    }

    #[test]
    fn literal_src_and_inline_content_conflict() {
        let mut e = entry("/etc/hosts");
        e.src = Some("/etc/hosts".to_owned());
        e.src_content = Some("x".to_owned());
        let err = MountSpec::from_entry(&e).unwrap_err();
        assert!(err.to_string().contains("/etc/hosts"));
        assert!(err.to_string().contains("src_content"));
    }

    #[test]
    fn missing_destination_is_rejected() {
        let mut e = entry("/x");
        e.dst = None;
        assert!(MountSpec::from_entry(&e).is_err());
        e.prefix_dst_env = Some("WORKDIR".to_owned());
        assert!(MountSpec::from_entry(&e).is_ok());
    }
}
