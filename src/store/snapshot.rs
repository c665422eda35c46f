//! Versioned state snapshot
//!
//! One blob carries the whole platform: ledger book, profile roster,
//! and match registry. The payload is JSON wrapped in an envelope with
//! a version tag and a domain-separated SHA-256 checksum, so a stale
//! or corrupted blob is refused at load instead of half-applied.
//! Missing payload sections decode to their defaults, which lets old
//! blobs load under newer layouts.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::ledger::LedgerExport;
use crate::matches::MatchExport;
use crate::stats::StatsExport;

/// Envelope version this build writes and accepts.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Domain separator for the payload checksum.
const CHECKSUM_DOMAIN: &[u8] = b"rally-stakes:snapshot:v1";

/// Snapshot codec errors.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// The blob was written by an incompatible build.
    #[error("Snapshot version {0} is not supported")]
    UnsupportedVersion(u32),

    /// The payload does not hash to the recorded checksum.
    #[error("Snapshot checksum mismatch")]
    ChecksumMismatch,

    /// The blob or its payload is not valid JSON for this layout.
    #[error("Snapshot codec failure: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Full platform state.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// Wallets, escrows, and the transaction log.
    #[serde(default)]
    pub ledger: LedgerExport,
    /// Player profiles.
    #[serde(default)]
    pub stats: StatsExport,
    /// Open and completed matches.
    #[serde(default)]
    pub matches: MatchExport,
}

/// On-blob wrapper. The payload is the snapshot's JSON text, kept as
/// written so the checksum covers exact bytes.
#[derive(Serialize, Deserialize)]
struct Envelope {
    version: u32,
    checksum: String,
    payload: String,
}

impl Snapshot {
    /// Serialize into a checksummed, versioned blob.
    pub fn encode(&self) -> Result<Vec<u8>, SnapshotError> {
        let payload = serde_json::to_string(self)?;
        let envelope = Envelope {
            version: SNAPSHOT_VERSION,
            checksum: checksum_of(payload.as_bytes()),
            payload,
        };
        Ok(serde_json::to_vec(&envelope)?)
    }

    /// Parse a blob, refusing unknown versions and corrupted payloads.
    pub fn decode(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let envelope: Envelope = serde_json::from_slice(bytes)?;
        if envelope.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(envelope.version));
        }
        if checksum_of(envelope.payload.as_bytes()) != envelope.checksum {
            return Err(SnapshotError::ChecksumMismatch);
        }
        Ok(serde_json::from_str(&envelope.payload)?)
    }
}

fn checksum_of(payload: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(CHECKSUM_DOMAIN);
    hasher.update(payload);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ids::UserId;
    use crate::core::money::Money;
    use crate::ledger::Wallet;

    fn sample() -> Snapshot {
        let mut snapshot = Snapshot::default();
        let mut wallet = Wallet::default();
        wallet.credit(Money::from_units(100)).unwrap();
        snapshot
            .ledger
            .wallets
            .insert(UserId::new([1; 16]), wallet);
        snapshot.ledger.next_tx_id = crate::core::ids::TxId::FIRST.next();
        snapshot
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let snapshot = sample();
        let blob = snapshot.encode().unwrap();
        let decoded = Snapshot::decode(&blob).unwrap();

        assert_eq!(decoded.ledger.wallets.len(), 1);
        let wallet = decoded.ledger.wallets[&UserId::new([1; 16])];
        assert_eq!(wallet.balance, Money::from_units(100));
        assert_eq!(decoded.ledger.next_tx_id, snapshot.ledger.next_tx_id);
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let blob = sample().encode().unwrap();
        let mut envelope: serde_json::Value = serde_json::from_slice(&blob).unwrap();
        let payload = envelope["payload"].as_str().unwrap().to_string();
        envelope["payload"] = serde_json::Value::String(format!("{} ", payload));
        let tampered = serde_json::to_vec(&envelope).unwrap();

        assert!(matches!(
            Snapshot::decode(&tampered),
            Err(SnapshotError::ChecksumMismatch)
        ));
    }

    #[test]
    fn test_unknown_version_rejected() {
        let blob = sample().encode().unwrap();
        let mut envelope: serde_json::Value = serde_json::from_slice(&blob).unwrap();
        envelope["version"] = serde_json::Value::from(99);
        let futuristic = serde_json::to_vec(&envelope).unwrap();

        assert!(matches!(
            Snapshot::decode(&futuristic),
            Err(SnapshotError::UnsupportedVersion(99))
        ));
    }

    #[test]
    fn test_garbage_blob_rejected() {
        assert!(matches!(
            Snapshot::decode(b"not a snapshot"),
            Err(SnapshotError::Codec(_))
        ));
    }

    #[test]
    fn test_missing_sections_decode_to_defaults() {
        let payload = "{}".to_string();
        let envelope = serde_json::json!({
            "version": SNAPSHOT_VERSION,
            "checksum": checksum_of(payload.as_bytes()),
            "payload": payload,
        });
        let blob = serde_json::to_vec(&envelope).unwrap();

        let decoded = Snapshot::decode(&blob).unwrap();
        assert!(decoded.ledger.wallets.is_empty());
        assert!(decoded.stats.profiles.is_empty());
        assert!(decoded.matches.open.is_empty());
    }
}
