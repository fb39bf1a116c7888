//! Snapshot domain models
//!
//! A snapshot is an immutable, named set of embedded chunks for one tenant.
//! Snapshot ids sort lexicographically in allocation order, so "latest" is
//! simply the greatest published id.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::chunking::EmbeddedChunk;
use crate::domain::errors::{DomainError, DomainResult};

/// UTC timestamp with second resolution, basic ISO-8601 form
const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%SZ";
const TIMESTAMP_LEN: usize = 16;
const SEQUENCE_WIDTH: usize = 6;
const MAX_SEQUENCE: u32 = 999_999;
const DISAMBIGUATOR_LEN: usize = 8;
const MAX_TENANT_ID_LEN: usize = 128;

/// Opaque tenant identifier used to namespace snapshot storage
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantId(String);

impl TenantId {
    /// Parse and validate a tenant id.
    ///
    /// Tenant ids double as storage path components, so separators, control
    /// characters, and leading dots are rejected.
    pub fn new(value: impl Into<String>) -> DomainResult<Self> {
        let value = value.into();

        if value.trim().is_empty() {
            return Err(DomainError::Validation("tenant id cannot be empty".to_string()));
        }
        if value.len() > MAX_TENANT_ID_LEN {
            return Err(DomainError::Validation(format!(
                "tenant id exceeds {MAX_TENANT_ID_LEN} bytes"
            )));
        }
        if value.starts_with('.') {
            return Err(DomainError::Validation(format!(
                "tenant id '{value}' cannot start with '.'"
            )));
        }
        if value
            .chars()
            .any(|c| c == '/' || c == '\\' || c.is_control())
        {
            return Err(DomainError::Validation(format!(
                "tenant id '{}' contains a path separator or control character",
                value.escape_debug()
            )));
        }

        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TenantId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for TenantId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TenantId> for String {
    fn from(id: TenantId) -> Self {
        id.0
    }
}

/// Lexicographically sortable snapshot identifier.
///
/// Format: `YYYYMMDDTHHMMSSZ-NNNNNN-xxxxxxxx` (UTC second, per-tenant
/// sequence, random disambiguator). Ordering compares the rendered string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SnapshotId {
    raw: String,
    timestamp: DateTime<Utc>,
    sequence: u32,
}

impl SnapshotId {
    /// Allocate the next id for a tenant whose greatest known id is `last`.
    ///
    /// The result is strictly greater than `last` even if the clock stands
    /// still or runs backwards: the previous second is reused with an
    /// incremented sequence, and a full sequence rolls into the next second.
    pub fn next_after(last: Option<&Self>, now: DateTime<Utc>) -> Self {
        let (timestamp, sequence) = match last {
            Some(last) if now.timestamp() <= last.timestamp.timestamp() => {
                if last.sequence >= MAX_SEQUENCE {
                    (last.timestamp + Duration::seconds(1), 0)
                } else {
                    (last.timestamp, last.sequence + 1)
                }
            }
            _ => (now, 0),
        };

        let disambiguator = Uuid::new_v4().simple().to_string();
        Self::compose(timestamp, sequence, &disambiguator[..DISAMBIGUATOR_LEN])
    }

    fn compose(timestamp: DateTime<Utc>, sequence: u32, disambiguator: &str) -> Self {
        let raw = format!(
            "{}-{:0width$}-{}",
            timestamp.format(TIMESTAMP_FORMAT),
            sequence,
            disambiguator,
            width = SEQUENCE_WIDTH
        );
        let timestamp = Utc
            .timestamp_opt(timestamp.timestamp(), 0)
            .single()
            .unwrap_or(timestamp);

        Self {
            raw,
            timestamp,
            sequence,
        }
    }

    /// Parse a snapshot id, rejecting anything that is not in canonical form.
    pub fn parse(value: &str) -> DomainResult<Self> {
        let invalid = || DomainError::Validation(format!("invalid snapshot id '{value}'"));

        let mut parts = value.splitn(3, '-');
        let (Some(ts), Some(seq), Some(disambiguator)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };

        if ts.len() != TIMESTAMP_LEN
            || seq.len() != SEQUENCE_WIDTH
            || disambiguator.len() != DISAMBIGUATOR_LEN
        {
            return Err(invalid());
        }
        if !seq.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if !disambiguator
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
        {
            return Err(invalid());
        }

        let naive = NaiveDateTime::parse_from_str(ts, TIMESTAMP_FORMAT).map_err(|_| invalid())?;
        let sequence = seq.parse::<u32>().map_err(|_| invalid())?;

        Ok(Self {
            raw: value.to_string(),
            timestamp: Utc.from_utc_datetime(&naive),
            sequence,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Allocation time, truncated to the second
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Allocation sequence within the timestamp's second
    pub const fn sequence(&self) -> u32 {
        self.sequence
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for SnapshotId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SnapshotId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SnapshotId> for String {
    fn from(id: SnapshotId) -> Self {
        id.raw
    }
}

/// One tenant's corpus state at one point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub snapshot_id: SnapshotId,
    pub tenant_id: TenantId,
    pub created_at: DateTime<Utc>,
    /// Embedding dimension shared by every chunk (0 for an empty snapshot)
    pub dimension: usize,
    pub chunks: Vec<EmbeddedChunk>,
}

impl Snapshot {
    pub fn new(snapshot_id: SnapshotId, tenant_id: TenantId, chunks: Vec<EmbeddedChunk>) -> Self {
        let dimension = chunks.first().map_or(0, EmbeddedChunk::dimension);
        Self {
            snapshot_id,
            tenant_id,
            created_at: Utc::now(),
            dimension,
            chunks,
        }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// Check that a batch of embedded chunks can form a snapshot: one shared,
/// non-zero dimension and finite components.
pub fn validate_embedded_chunks(chunks: &[EmbeddedChunk]) -> DomainResult<usize> {
    let Some(first) = chunks.first() else {
        return Ok(0);
    };

    let dimension = first.dimension();
    if dimension == 0 {
        return Err(DomainError::Validation(
            "embedded chunks must have non-empty vectors".to_string(),
        ));
    }

    for item in chunks {
        if item.dimension() != dimension {
            return Err(DomainError::Validation(format!(
                "chunk {} has dimension {}, expected {}",
                item.ordinal(),
                item.dimension(),
                dimension
            )));
        }
        if item.vector.iter().any(|v| !v.is_finite()) {
            return Err(DomainError::Validation(format!(
                "chunk {} has a non-finite vector component",
                item.ordinal()
            )));
        }
    }

    Ok(dimension)
}

/// Like [`validate_embedded_chunks`], but a snapshot must also hold at least
/// one chunk.
pub fn validate_snapshot_chunks(chunks: &[EmbeddedChunk]) -> DomainResult<usize> {
    if chunks.is_empty() {
        return Err(DomainError::Validation(
            "a snapshot must contain at least one chunk".to_string(),
        ));
    }
    validate_embedded_chunks(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Chunk;

    fn at(ts: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(ts).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_first_id_uses_clock() {
        let id = SnapshotId::next_after(None, at("2024-03-01T12:30:45.900Z"));
        assert!(id.as_str().starts_with("20240301T123045Z-000000-"));
        assert_eq!(id.sequence(), 0);
        assert_eq!(id.timestamp(), at("2024-03-01T12:30:45Z"));
    }

    #[test]
    fn test_same_second_increments_sequence() {
        let now = at("2024-03-01T12:30:45Z");
        let first = SnapshotId::next_after(None, now);
        let second = SnapshotId::next_after(Some(&first), now);

        assert!(second > first);
        assert_eq!(second.sequence(), 1);
        assert_eq!(second.timestamp(), first.timestamp());
    }

    #[test]
    fn test_clock_going_backwards_stays_monotonic() {
        let first = SnapshotId::next_after(None, at("2024-03-01T12:30:45Z"));
        let second = SnapshotId::next_after(Some(&first), at("2024-03-01T12:00:00Z"));

        assert!(second > first);
        assert_eq!(second.timestamp(), first.timestamp());
    }

    #[test]
    fn test_sequence_overflow_rolls_second() {
        let last = SnapshotId::parse("20240301T123045Z-999999-0badf00d").unwrap();
        let next = SnapshotId::next_after(Some(&last), at("2024-03-01T12:30:45Z"));

        assert!(next > last);
        assert!(next.as_str().starts_with("20240301T123046Z-000000-"));
    }

    #[test]
    fn test_newer_second_resets_sequence() {
        let last = SnapshotId::parse("20240301T123045Z-000007-0badf00d").unwrap();
        let next = SnapshotId::next_after(Some(&last), at("2024-03-01T12:30:46Z"));
        assert_eq!(next.sequence(), 0);
        assert!(next > last);
    }

    #[test]
    fn test_parse_round_trip_and_rejects_garbage() {
        let id = SnapshotId::next_after(None, Utc::now());
        assert_eq!(SnapshotId::parse(id.as_str()).unwrap(), id);

        for bad in [
            "",
            ".staging",
            "20240301_123045_uuid",
            "20240301T123045Z-1-0badf00d",
            "20240301T123045Z-000001-0BADF00D",
            "20241301T123045Z-000001-0badf00d",
        ] {
            assert!(SnapshotId::parse(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_tenant_id_validation() {
        assert!(TenantId::new("user-42").is_ok());
        assert!(TenantId::new("6650f0c2a1b2c3d4e5f60718").is_ok());

        for bad in ["", "   ", "../etc", "a/b", "a\\b", ".hidden", "nul\0"] {
            assert!(
                matches!(TenantId::new(bad), Err(DomainError::Validation(_))),
                "{bad:?} should be rejected"
            );
        }
        assert!(TenantId::new("x".repeat(129)).is_err());
    }

    #[test]
    fn test_validate_embedded_chunks() {
        let ok = vec![
            EmbeddedChunk::new(Chunk::new(0, "a".into(), 0, 0), vec![1.0, 0.0]),
            EmbeddedChunk::new(Chunk::new(1, "b".into(), 1, 0), vec![0.0, 1.0]),
        ];
        assert_eq!(validate_embedded_chunks(&ok).unwrap(), 2);
        assert_eq!(validate_embedded_chunks(&[]).unwrap(), 0);

        let mixed = vec![
            EmbeddedChunk::new(Chunk::new(0, "a".into(), 0, 0), vec![1.0, 0.0]),
            EmbeddedChunk::new(Chunk::new(1, "b".into(), 1, 0), vec![1.0]),
        ];
        assert!(validate_embedded_chunks(&mixed).is_err());

        let nan = vec![EmbeddedChunk::new(
            Chunk::new(0, "a".into(), 0, 0),
            vec![f32::NAN],
        )];
        assert!(validate_embedded_chunks(&nan).is_err());
    }

    #[test]
    fn test_snapshot_needs_chunks() {
        assert!(matches!(
            validate_snapshot_chunks(&[]),
            Err(DomainError::Validation(_))
        ));

        let one = vec![EmbeddedChunk::new(Chunk::new(0, "a".into(), 0, 0), vec![1.0])];
        assert_eq!(validate_snapshot_chunks(&one).unwrap(), 1);
    }
}
