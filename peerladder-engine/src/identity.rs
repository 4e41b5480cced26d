//! The identity this process runs for, and the storage slots only it may touch.
//!
//! Every peer executes the same replicated logic, but a filesystem belongs to one
//! machine. A [`StorageSlot`] can only be obtained from a [`LocalIdentity`], so
//! addressing another player's file is not expressible through the storage API.

use std::fmt;

use crate::constants::{FILE_EXTENSION, PEER_FILE_PREFIX, RATING_FILE_PREFIX};
use crate::record::PlayerId;

fn fnv1a64(bytes: &[u8]) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0100_0000_01b3;
    let mut hash = FNV_OFFSET;
    for b in bytes {
        hash = (hash ^ u64::from(*b)).wrapping_mul(FNV_PRIME);
    }
    hash
}

fn djb2_64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 5381;
    for b in bytes {
        hash = (hash << 5).wrapping_add(hash).wrapping_add(u64::from(*b));
    }
    hash
}

/// Fixed-length, non-reversible fingerprint of a handle: two independent hashes
/// of `salt + handle`, rendered as 32 lowercase hex digits.
#[must_use]
pub fn fingerprint(handle: &PlayerId, salt: &str) -> String {
    let mut buf = Vec::with_capacity(salt.len() + handle.as_str().len());
    buf.extend_from_slice(salt.as_bytes());
    buf.extend_from_slice(handle.as_str().as_bytes());
    format!("{:016x}{:016x}", fnv1a64(&buf), djb2_64(&buf))
}

/// Which of the local identity's two files a slot names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKind {
    Rating,
    PeerSnapshot,
}

/// A file owned by the local identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageSlot {
    kind: SlotKind,
    fingerprint: String,
}

impl StorageSlot {
    #[must_use]
    pub const fn kind(&self) -> SlotKind {
        self.kind
    }

    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// File name under the storage root, e.g. `rating-<fp>.dat`.
    #[must_use]
    pub fn file_name(&self) -> String {
        let prefix = match self.kind {
            SlotKind::Rating => RATING_FILE_PREFIX,
            SlotKind::PeerSnapshot => PEER_FILE_PREFIX,
        };
        format!("{prefix}{}{FILE_EXTENSION}", self.fingerprint)
    }
}

impl fmt::Display for StorageSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_name())
    }
}

/// The player this process is running for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalIdentity {
    player: PlayerId,
    fingerprint: String,
}

impl LocalIdentity {
    /// Claim `player` as the identity of this machine.
    #[must_use]
    pub fn new(player: PlayerId, salt: &str) -> Self {
        let fingerprint = fingerprint(&player, salt);
        Self {
            player,
            fingerprint,
        }
    }

    #[must_use]
    pub const fn player(&self) -> &PlayerId {
        &self.player
    }

    #[must_use]
    pub fn is(&self, player: &PlayerId) -> bool {
        &self.player == player
    }

    #[must_use]
    pub fn rating_slot(&self) -> StorageSlot {
        StorageSlot {
            kind: SlotKind::Rating,
            fingerprint: self.fingerprint.clone(),
        }
    }

    #[must_use]
    pub fn peer_slot(&self) -> StorageSlot {
        StorageSlot {
            kind: SlotKind::PeerSnapshot,
            fingerprint: self.fingerprint.clone(),
        }
    }
}
