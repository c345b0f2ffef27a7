use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::layout::LayoutId;

/// Sentinel value for `disksize`/`mgmsize` meaning "not observed yet".
pub const UNDEF_SIZE: u64 = (1u64 << 32) - 15;

/// A unix timestamp with nanosecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Timestamp {
    pub sec: u64,
    pub ns: u32,
}

impl Timestamp {
    pub fn now() -> Self {
        let d = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before unix epoch");
        Timestamp {
            sec: d.as_secs(),
            ns: d.subsec_nanos(),
        }
    }

    pub fn zero() -> Self {
        Timestamp { sec: 0, ns: 0 }
    }
}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.sec, self.ns).cmp(&(other.sec, other.ns))
    }
}

/// Per-replica file metadata record, keyed by `(fsid, fid)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub fid: u64,
    pub fsid: u32,
    pub cid: u64,

    pub size: u64,
    pub disksize: u64,
    pub mgmsize: u64,

    pub checksum: String,
    pub diskchecksum: String,
    pub mgmchecksum: String,

    pub ctime: Timestamp,
    pub mtime: Timestamp,
    pub atime: Timestamp,
    pub checktime: Timestamp,

    pub lid: LayoutId,
    pub uid: u32,
    pub gid: u32,

    pub filecxerror: bool,
    pub blockcxerror: bool,
    /// Bitfield of [`crate::layout::layout_error`] values.
    pub layouterror: u8,

    /// Comma-separated fsid list as observed by the MGM; entries may carry a
    /// leading `!` marking them unlinked. Kept in wire form since it is
    /// produced/consumed verbatim by `dumpmd`/`getfmd`.
    pub locations: String,
}

impl FileRecord {
    /// A freshly allocated record for a newly created, writable replica.
    pub fn new(fid: u64, fsid: u32, uid: u32, gid: u32, lid: LayoutId) -> Self {
        let now = Timestamp::now();
        FileRecord {
            fid,
            fsid,
            cid: 0,
            size: 0,
            disksize: UNDEF_SIZE,
            mgmsize: UNDEF_SIZE,
            checksum: String::new(),
            diskchecksum: String::new(),
            mgmchecksum: String::new(),
            ctime: now,
            mtime: now,
            atime: now,
            checktime: Timestamp::zero(),
            lid,
            uid,
            gid,
            filecxerror: false,
            blockcxerror: false,
            layouterror: 0,
            locations: String::new(),
        }
    }

    /// True iff every observed size/checksum agrees with the reference
    /// `size`/`checksum` (or is still unset). `get` refuses to hand back an
    /// inconsistent record unless `force=true`.
    pub fn is_consistent(&self) -> bool {
        let size_ok = (self.disksize == UNDEF_SIZE || self.disksize == self.size)
            && (self.mgmsize == UNDEF_SIZE || self.mgmsize == self.size);
        let cksum_ok = (self.diskchecksum.is_empty() || self.diskchecksum == self.checksum)
            && (self.mgmchecksum.is_empty() || self.mgmchecksum == self.checksum);
        size_ok && cksum_ok
    }

    /// Resets every disk-observed field to its sentinel/empty value.
    pub fn reset_disk(&mut self) {
        self.disksize = UNDEF_SIZE;
        self.diskchecksum.clear();
    }

    /// Resets every MGM-observed field to its sentinel/empty value.
    pub fn reset_mgm(&mut self) {
        self.mgmsize = UNDEF_SIZE;
        self.mgmchecksum.clear();
        self.locations.clear();
    }

    /// Touches `mtime`/`atime` to `now`, as every `commit` does.
    pub fn touch(&mut self) {
        let now = Timestamp::now();
        self.mtime = now;
        self.atime = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::ChecksumKind;

    #[test]
    fn fresh_record_is_consistent_and_undef() {
        let rec = FileRecord::new(1, 1, 0, 0, LayoutId::plain(ChecksumKind::Adler32));
        assert!(rec.is_consistent());
        assert_eq!(rec.disksize, UNDEF_SIZE);
        assert_eq!(rec.mgmsize, UNDEF_SIZE);
    }

    #[test]
    fn disagreeing_size_is_inconsistent() {
        let mut rec = FileRecord::new(1, 1, 0, 0, LayoutId::plain(ChecksumKind::Adler32));
        rec.size = 100;
        rec.disksize = 100;
        rec.mgmsize = 101;
        assert!(!rec.is_consistent());
    }

    #[test]
    fn disagreeing_checksum_is_inconsistent() {
        let mut rec = FileRecord::new(1, 1, 0, 0, LayoutId::plain(ChecksumKind::Adler32));
        rec.checksum = "aaaa".into();
        rec.diskchecksum = "aaaa".into();
        rec.mgmchecksum = "bbbb".into();
        assert!(!rec.is_consistent());
    }
}
