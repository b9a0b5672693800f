use confine_policy::PolicyDocument;

/// Which isolation namespaces the launcher creates for the sandboxed
/// process. Independent toggles; any combination is valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Namespaces {
    pub net: bool,
    pub user: bool,
    pub mount: bool,
    pub pid: bool,
    pub ipc: bool,
    pub uts: bool,
    pub cgroup: bool,
}

impl Namespaces {
    pub fn from_policy(doc: &PolicyDocument) -> Self {
        Namespaces {
            net: doc.clone_newnet,
            user: doc.clone_newuser,
            mount: doc.clone_newns,
            pid: doc.clone_newpid,
            ipc: doc.clone_newipc,
            uts: doc.clone_newuts,
            cgroup: doc.clone_newcgroup,
        }
    }

    /// CLONE_NEW* bits for the eventual clone call.
    pub fn clone_flags(self) -> libc::c_int {
        let mut flags = 0;
        if self.net {
            flags |= libc::CLONE_NEWNET;
        }
        if self.user {
            flags |= libc::CLONE_NEWUSER;
        }
        if self.mount {
            flags |= libc::CLONE_NEWNS;
        }
        if self.pid {
            flags |= libc::CLONE_NEWPID;
        }
        if self.ipc {
            flags |= libc::CLONE_NEWIPC;
        }
        if self.uts {
            flags |= libc::CLONE_NEWUTS;
        }
        if self.cgroup {
            flags |= libc::CLONE_NEWCGROUP;
        }
        flags
    }
}

/// OR the five personality toggles into the personality(2) bitmask.
pub fn personality_mask(doc: &PolicyDocument) -> u64 {
    let mut mask: u64 = 0;
    if doc.persona_addr_compat_layout {
        mask |= libc::ADDR_COMPAT_LAYOUT as u64;
    }
    if doc.persona_mmap_page_zero {
        mask |= libc::MMAP_PAGE_ZERO as u64;
    }
    if doc.persona_read_implies_exec {
        mask |= libc::READ_IMPLIES_EXEC as u64;
    }
    if doc.persona_addr_limit_3gb {
        mask |= libc::ADDR_LIMIT_3GB as u64;
    }
    if doc.persona_addr_no_randomize {
        mask |= libc::ADDR_NO_RANDOMIZE as u64;
    }
    mask
}

#[cfg(test)]
mod tests {
    use super::*;
    use confine_policy::parse_policy_str;

    #[test]
    fn all_namespaces_default_on() {
        let doc = parse_policy_str("").unwrap();
        let ns = Namespaces::from_policy(&doc);
        assert!(ns.net && ns.user && ns.mount && ns.pid && ns.ipc && ns.uts && ns.cgroup);
        let flags = ns.clone_flags();
        assert_eq!(flags & libc::CLONE_NEWUSER, libc::CLONE_NEWUSER);
        assert_eq!(flags & libc::CLONE_NEWNET, libc::CLONE_NEWNET);
    }

    #[test]
    fn toggles_are_independent() {
        let doc = parse_policy_str("clone_newnet = false\nclone_newpid = false").unwrap();
        let ns = Namespaces::from_policy(&doc);
        assert!(!ns.net && !ns.pid);
        assert!(ns.user && ns.mount);
        assert_eq!(ns.clone_flags() & libc::CLONE_NEWNET, 0);
    }

    #[test]
    fn personality_bits_accumulate() {
        let doc = parse_policy_str(
            "persona_addr_no_randomize = true\npersona_mmap_page_zero = true",
        )
        .unwrap();
        let mask = personality_mask(&doc);
        assert_eq!(
            mask,
            libc::ADDR_NO_RANDOMIZE as u64 | libc::MMAP_PAGE_ZERO as u64
        );
    }

    #[test]
    fn no_toggles_means_empty_mask() {
        let doc = parse_policy_str("").unwrap();
        assert_eq!(personality_mask(&doc), 0);
    }
}
