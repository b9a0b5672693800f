use crate::PlanError;
use confine_policy::IdMapEntry;

/// One validated uid or gid mapping, forwarded to the user-namespace
/// mapping writer in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdMapping {
    /// Absent means the writer picks its convention (typically the current id).
    pub inside_id: Option<String>,
    pub outside_id: Option<String>,
    pub count: u64,
    pub is_gid: bool,
    /// Use the setuid newuidmap/newgidmap helper instead of a direct
    /// privileged write.
    pub use_newidmap: bool,
}

fn validate(entry: &IdMapEntry, is_gid: bool) -> Result<IdMapping, PlanError> {
    if entry.count == 0 {
        return Err(PlanError::InvalidMapping {
            inside: entry.inside_id.clone().unwrap_or_default(),
            outside: entry.outside_id.clone().unwrap_or_default(),
            reason: "count must be positive".to_owned(),
        });
    }
    Ok(IdMapping {
        inside_id: entry.inside_id.clone(),
        outside_id: entry.outside_id.clone(),
        count: entry.count,
        is_gid,
        use_newidmap: entry.use_newidmap,
    })
}

/// Validate all declared mappings, uid entries first, each list in
/// declaration order. The first rejected mapping fails the whole set.
pub fn resolve_mappings(
    uidmaps: &[IdMapEntry],
    gidmaps: &[IdMapEntry],
) -> Result<Vec<IdMapping>, PlanError> {
    let mut mappings = Vec::with_capacity(uidmaps.len() + gidmaps.len());
    for entry in uidmaps {
        mappings.push(validate(entry, false)?);
    }
    for entry in gidmaps {
        mappings.push(validate(entry, true)?);
    }
    Ok(mappings)
}
