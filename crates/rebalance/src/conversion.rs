//! Conversion-job path encoding (§6.4).

use fmd::LayoutId;

/// A zero-byte proc entry whose name encodes the move; inserted under a
/// well-known proc path and consumed by a separate converter subsystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionJob {
    pub fid: u64,
    pub target_group: String,
    pub lid: LayoutId,
    pub reason: Option<String>,
}

/// `<fxid:016x>:<target-group>#<lid:08x>`, with an optional `^<reason>^`
/// suffix tagging the origin (e.g. `groupdrainer`).
pub fn conversion_job_name(fid: u64, group: &str, lid: LayoutId, reason: Option<&str>) -> String {
    let base = format!("{fid:016x}:{group}#{:08x}", lid.0);
    match reason {
        Some(r) => format!("{base}^{r}^"),
        None => base,
    }
}

impl ConversionJob {
    pub fn proc_name(&self) -> String {
        conversion_job_name(self.fid, &self.target_group, self.lid, self.reason.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fmd::ChecksumKind;

    #[test]
    fn encodes_name_without_reason() {
        let lid = LayoutId::plain(ChecksumKind::Adler32);
        let name = conversion_job_name(0xdeadbeef, "default.3", lid, None);
        assert_eq!(name, format!("00000000deadbeef:default.3#{:08x}", lid.0));
    }

    #[test]
    fn encodes_name_with_reason_suffix() {
        let lid = LayoutId::plain(ChecksumKind::None);
        let name = conversion_job_name(1, "default.0", lid, Some("groupdrainer"));
        assert!(name.ends_with("^groupdrainer^"));
        assert!(name.starts_with("0000000000000001:default.0#"));
    }
}
