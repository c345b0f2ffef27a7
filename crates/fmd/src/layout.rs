//! Layout descriptors and the layout-error classifier (§4.4, §8 property 5).

use serde::{Deserialize, Serialize};

/// Bitfield values for [`FileRecord::layouterror`](crate::record::FileRecord::layouterror).
pub mod layout_error {
    pub const ORPHAN: u8 = 0b001;
    pub const UNREGISTERED: u8 = 0b010;
    pub const REPLICA_WRONG: u8 = 0b100;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayoutKind {
    Plain,
    Replica,
    Erasure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChecksumKind {
    None,
    Adler32,
    Crc32c,
    Md5,
    Sha1,
}

/// A packed layout descriptor. `0` is reserved to mean "no layout" (the
/// orphan marker checked by the layout-error classifier) and is distinct
/// from `LayoutId::plain(ChecksumKind::None)`, which has a nonzero type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LayoutId(pub u32);

const TYPE_MASK: u32 = 0xF;
const STRIPE_SHIFT: u32 = 4;
const STRIPE_MASK: u32 = 0xF << STRIPE_SHIFT;
const CKSUM_SHIFT: u32 = 8;
const CKSUM_MASK: u32 = 0xF << CKSUM_SHIFT;
const BLOCK_CKSUM_SHIFT: u32 = 12;
const BLOCK_CKSUM_MASK: u32 = 0xF << BLOCK_CKSUM_SHIFT;
const PARITY_SHIFT: u32 = 16;
const PARITY_MASK: u32 = 0xF << PARITY_SHIFT;

impl LayoutId {
    pub const ZERO: LayoutId = LayoutId(0);

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    fn build(
        kind: LayoutKind,
        stripe_number: u8,
        checksum: ChecksumKind,
        block_checksum: ChecksumKind,
        parity: u8,
    ) -> LayoutId {
        let type_tag: u32 = match kind {
            LayoutKind::Plain => 1,
            LayoutKind::Replica => 2,
            LayoutKind::Erasure => 3,
        };
        let raw = type_tag
            | ((stripe_number as u32) << STRIPE_SHIFT & STRIPE_MASK)
            | ((checksum_tag(checksum) as u32) << CKSUM_SHIFT & CKSUM_MASK)
            | ((checksum_tag(block_checksum) as u32) << BLOCK_CKSUM_SHIFT & BLOCK_CKSUM_MASK)
            | ((parity as u32) << PARITY_SHIFT & PARITY_MASK);
        LayoutId(raw)
    }

    pub fn plain(checksum: ChecksumKind) -> LayoutId {
        Self::build(LayoutKind::Plain, 0, checksum, ChecksumKind::None, 0)
    }

    /// `n_locations` is the total number of replicas expected (including the
    /// primary), matching the spec's "replica-N" shorthand.
    pub fn replica(n_locations: u8, checksum: ChecksumKind) -> LayoutId {
        assert!(n_locations >= 1, "a replica layout needs at least 1 copy");
        Self::build(
            LayoutKind::Replica,
            n_locations - 1,
            checksum,
            ChecksumKind::None,
            0,
        )
    }

    pub fn erasure(data_stripes: u8, parity_stripes: u8, checksum: ChecksumKind) -> LayoutId {
        Self::build(
            LayoutKind::Erasure,
            data_stripes + parity_stripes - 1,
            checksum,
            ChecksumKind::None,
            parity_stripes,
        )
    }

    pub fn kind(&self) -> Option<LayoutKind> {
        match self.0 & TYPE_MASK {
            1 => Some(LayoutKind::Plain),
            2 => Some(LayoutKind::Replica),
            3 => Some(LayoutKind::Erasure),
            _ => None,
        }
    }

    /// Encoded stripe number; the expected location count is this plus one.
    pub fn stripe_number(&self) -> u8 {
        ((self.0 & STRIPE_MASK) >> STRIPE_SHIFT) as u8
    }

    pub fn parity_stripe_count(&self) -> u8 {
        ((self.0 & PARITY_MASK) >> PARITY_SHIFT) as u8
    }

    pub fn checksum_kind(&self) -> ChecksumKind {
        checksum_from_tag(((self.0 & CKSUM_MASK) >> CKSUM_SHIFT) as u8)
    }

    pub fn block_checksum_kind(&self) -> ChecksumKind {
        checksum_from_tag(((self.0 & BLOCK_CKSUM_MASK) >> BLOCK_CKSUM_SHIFT) as u8)
    }

    /// Returns a copy of this layout id with its block checksum kind forced
    /// to `None`, used by the balance scheduler to mask the transfer layout
    /// (§4.7 step 5).
    pub fn with_block_checksum_none(&self) -> LayoutId {
        LayoutId(self.0 & !BLOCK_CKSUM_MASK)
    }

    /// Returns a copy with both checksum fields forced to `None`.
    pub fn with_checksums_none(&self) -> LayoutId {
        LayoutId(self.0 & !BLOCK_CKSUM_MASK & !CKSUM_MASK)
    }
}

fn checksum_tag(c: ChecksumKind) -> u8 {
    match c {
        ChecksumKind::None => 0,
        ChecksumKind::Adler32 => 1,
        ChecksumKind::Crc32c => 2,
        ChecksumKind::Md5 => 3,
        ChecksumKind::Sha1 => 4,
    }
}

fn checksum_from_tag(tag: u8) -> ChecksumKind {
    match tag {
        1 => ChecksumKind::Adler32,
        2 => ChecksumKind::Crc32c,
        3 => ChecksumKind::Md5,
        4 => ChecksumKind::Sha1,
        _ => ChecksumKind::None,
    }
}

/// One entry in the `locations` field: an fsid, and whether it was recorded
/// with the `!` (unlinked) prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationEntry {
    pub fsid: u32,
    pub unlinked: bool,
}

/// Parses the comma-separated `locations` field (`"7,!8,9"`).
pub fn parse_locations(locations: &str) -> Vec<LocationEntry> {
    locations
        .split(',')
        .filter(|s| !s.is_empty())
        .filter_map(|entry| {
            let (unlinked, digits) = match entry.strip_prefix('!') {
                Some(rest) => (true, rest),
                None => (false, entry),
            };
            digits.parse::<u32>().ok().map(|fsid| LocationEntry { fsid, unlinked })
        })
        .collect()
}

/// Classifies the layout-error bitfield for one replica, per §4.4:
///
/// ```text
/// layouterror(fsid, lid, locations):
///   if lid == 0:                              kOrphan
///   parse locations (strip leading '!')
///   if stripe_number(lid)+1 != #locations:    kReplicaWrong
///   if fsid not in locations:                 kUnregistered
/// ```
pub fn classify_layout_error(fsid: u32, lid: LayoutId, locations: &str) -> u8 {
    if lid.is_zero() {
        return layout_error::ORPHAN;
    }
    let locs = parse_locations(locations);
    let mut err = 0u8;
    if lid.stripe_number() as usize + 1 != locs.len() {
        err |= layout_error::REPLICA_WRONG;
    }
    if !locs.iter().any(|l| l.fsid == fsid) {
        err |= layout_error::UNREGISTERED;
    }
    err
}
