use crate::PlanError;
use confine_policy::ExecBin;
use std::ffi::{CStr, CString};

/// The resolved invocation of the target executable.
///
/// Owns the finalized argument storage for the lifetime of the plan; the
/// storage is never resized or relocated after construction, so pointer
/// tables derived from it stay valid for as long as the plan lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecDescriptor {
    path: CString,
    argv: Vec<CString>,
    exec_fd: bool,
}

impl ExecDescriptor {
    /// Resolve the document's exec descriptor.
    ///
    /// argv[0] is the arg0 override when present, otherwise the executable
    /// path; the path itself is always retained for the actual exec call.
    /// Extra arguments are appended in declaration order.
    pub fn from_policy(bin: &ExecBin) -> Result<Self, PlanError> {
        let path = cstring(&bin.path)?;
        let mut argv = Vec::with_capacity(bin.arg.len() + 1);
        argv.push(cstring(bin.arg0.as_deref().unwrap_or(&bin.path))?);
        for arg in &bin.arg {
            argv.push(cstring(arg)?);
        }
        Ok(ExecDescriptor {
            path,
            argv,
            exec_fd: bin.exec_fd,
        })
    }

    /// Path used by the exec call. In fd mode this may differ from what is
    /// actually executed.
    pub fn path(&self) -> &CStr {
        &self.path
    }

    pub fn argv(&self) -> &[CString] {
        &self.argv
    }

    /// Execute via execveat on a pre-opened descriptor rather than by path.
    pub fn by_fd(&self) -> bool {
        self.exec_fd
    }

    /// Null-terminated argv pointer table for the exec call.
    ///
    /// Derived from the owned storage; the pointers remain valid while this
    /// descriptor is alive and are invalidated by dropping it, which for a
    /// committed plan means process exit.
    pub fn argv_ptrs(&self) -> Vec<*const libc::c_char> {
        let mut ptrs: Vec<*const libc::c_char> =
            self.argv.iter().map(|arg| arg.as_ptr()).collect();
        ptrs.push(std::ptr::null());
        ptrs
    }
}

fn cstring(s: &str) -> Result<CString, PlanError> {
    CString::new(s).map_err(|_| PlanError::NulInArgument(s.to_owned()))
}
