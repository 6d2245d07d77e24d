//! Globally unique, totally ordered event identifiers.
//!
//! A [`UniqueId`] is the `(logical_time, site_id, sequence)` triple used to
//! timestamp every write in the system. The derived ordering (field order
//! below) is the single total order that drives both LWW tie-breaks and RGA
//! sibling placement, so every replica resolves concurrency identically.

use crate::clock::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use ulid::Ulid;

/// Identifier of one replica (one editing session, device, or tab).
///
/// Compared lexicographically. The empty site id is reserved for the root
/// sentinel and never minted.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SiteId(String);

impl SiteId {
    pub fn new(id: impl Into<String>) -> Self {
        SiteId(id.into())
    }

    /// Generate a fresh globally unique site id for a new replica.
    pub fn generate() -> Self {
        SiteId(Ulid::new().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Failure to parse the compact `"time.seq@site"` id form.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("malformed unique id: {0:?}")]
pub struct ParseIdError(pub String);

/// Globally unique, totally ordered event identifier.
///
/// Ordering: `time`, then `site` (lexicographic), then `seq` - the derived
/// `Ord` over this field order. `seq` only breaks ties for ids minted in the
/// same logical tick on the same site, which the clock never produces but
/// which must still order deterministically.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UniqueId {
    pub time: u64,
    pub site: SiteId,
    pub seq: u64,
}

impl UniqueId {
    pub fn new(time: u64, site: SiteId, seq: u64) -> Self {
        UniqueId { time, site, seq }
    }

    /// The reserved sentinel below every minted id, anchoring "before the
    /// first character". Minting always advances the clock first, so real
    /// ids have `time >= 1`.
    pub fn root() -> Self {
        UniqueId {
            time: 0,
            site: SiteId::default(),
            seq: 0,
        }
    }

    pub fn is_root(&self) -> bool {
        self.time == 0 && self.site.as_str().is_empty() && self.seq == 0
    }

    /// Allocate a fresh id from the local clock.
    pub fn mint(clock: &mut Clock, site: &SiteId) -> Self {
        UniqueId {
            time: clock.advance(),
            site: site.clone(),
            seq: clock.next_seq(),
        }
    }
}

impl fmt::Display for UniqueId {
    /// Compact wire form: `"time.seq@site"`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}@{}", self.time, self.seq, self.site)
    }
}

impl FromStr for UniqueId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (stamp, site) = s.rsplit_once('@').ok_or_else(|| ParseIdError(s.into()))?;
        let (time, seq) = stamp.split_once('.').ok_or_else(|| ParseIdError(s.into()))?;
        let time = time.parse().map_err(|_| ParseIdError(s.into()))?;
        let seq = seq.parse().map_err(|_| ParseIdError(s.into()))?;
        Ok(UniqueId::new(time, SiteId::new(site), seq))
    }
}
