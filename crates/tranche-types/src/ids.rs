//! Identifiers used throughout Tranche.
//!
//! Parties are 20-byte account identities (the same width as the wallet
//! addresses the dashboards authenticate). Escrows use UUIDs: time-ordered
//! v7 for freshly opened escrows, or a deterministic digest when an escrow
//! mirrors an externally assigned address.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::TrancheError;

// ---------------------------------------------------------------------------
// PartyId
// ---------------------------------------------------------------------------

/// Identity of a counterparty (client, service provider, or arbitrator).
///
/// The engine trusts the identity it is handed; signature checks happen in
/// the wallet layer before a call reaches the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PartyId(pub [u8; 20]);

impl PartyId {
    #[must_use]
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// First four bytes as hex, for compact log fields.
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for PartyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for PartyId {
    type Err = TrancheError;

    /// Parses `0x`-prefixed (or bare) hex. Case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        let raw = hex::decode(digits).map_err(|e| TrancheError::InvalidConfiguration {
            reason: format!("party id {s:?} is not hex: {e}"),
        })?;
        let bytes: [u8; 20] = raw
            .try_into()
            .map_err(|raw: Vec<u8>| TrancheError::InvalidConfiguration {
                reason: format!("party id {s:?} has {} bytes, expected 20", raw.len()),
            })?;
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for PartyId {
    type Error = TrancheError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PartyId> for String {
    fn from(id: PartyId) -> Self {
        id.to_string()
    }
}

// ---------------------------------------------------------------------------
// EscrowId
// ---------------------------------------------------------------------------

/// Unique identifier of one escrow instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct EscrowId(pub Uuid);

impl EscrowId {
    /// Fresh time-ordered identifier (UUIDv7).
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Deterministic identifier from the two counterparties and a nonce.
    ///
    /// The same `(client, provider, nonce)` triple always yields the same
    /// id, so an off-chain mirror can recompute it without a lookup.
    #[must_use]
    pub fn derive(client: PartyId, provider: PartyId, nonce: u64) -> Self {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(b"tranche:escrow_id:v1:");
        hasher.update(client.0);
        hasher.update(provider.0);
        hasher.update(nonce.to_le_bytes());
        let hash = hasher.finalize();
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&hash[..16]);
        Self(Uuid::from_bytes(bytes))
    }
}

impl Default for EscrowId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EscrowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "escrow:{}", self.0)
    }
}

/// Random identities for unit tests. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl PartyId {
    pub fn random() -> Self {
        Self(rand::random::<[u8; 20]>())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
