use serde::{Deserialize, Serialize};

use crate::errors::RejectReason;

pub const SEAL_KEY_LEN: usize = 32;     // AES-256
pub const SEAL_IV_LEN: usize = 12;      // 96-bit GCM nonce
pub const SEAL_TAG_LEN: usize = 16;     // 128-bit GCM tag
pub const RECORD_NONCE_LEN: usize = 16; // per-record uniqueness bytes

/// The semantic content of a ticket. Immutable after issuance; the usage
/// state associated with `ticket_id` lives in the redemption store, never
/// in the record itself.
///
/// Field order is fixed: the canonical serialization of this struct is the
/// unit that is both sealed and signed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TicketRecord {
    /// UUIDv4, 128 bits of randomness rendered as a string.
    pub ticket_id: String,
    pub event_name: String,
    pub holder_name: String,
    pub seat_number: String,
    /// Unix-epoch seconds.
    pub issue_time: u64,
    /// Unix-epoch seconds. Invariant: `expiry_time > issue_time`.
    pub expiry_time: u64,
    /// Hex-rendered random bytes so two tickets with identical business
    /// fields never serialize to identical plaintext.
    pub nonce: String,
}

/// The wire form handed to the carrier medium (QR layer).
///
/// The per-ticket AES key travels inside the payload, so the encryption
/// layer provides tamper evidence only, not confidentiality against a
/// payload holder; the signature is the sole binding to the issuing
/// authority. Replay defense lives entirely in the redemption store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportPayload {
    pub ciphertext: Vec<u8>,
    pub tag: [u8; SEAL_TAG_LEN],
    pub iv: [u8; SEAL_IV_LEN],
    pub key: [u8; SEAL_KEY_LEN],
    pub signature: Vec<u8>,
}

/// Persistent row keyed by `ticket_id`. `used` transitions false→true exactly
/// once and never reverses; rows are never deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedemptionEntry {
    pub ticket_id: String,
    pub event_name: String,
    pub issue_time: u64,
    pub expiry_time: u64,
    pub used: bool,
    pub use_time: Option<u64>,
}

/// Result of the store's atomic check-and-mark-used operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedeemOutcome {
    Accepted { use_time: u64 },
    NotFound,
    AlreadyUsed { use_time: u64 },
    Expired { expiry_time: u64 },
}

/// Outcome of validating one transported payload. A rejection is a normal,
/// frequent operational event, not a defect; infrastructure failures are
/// reported separately as `StoreError`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Accepted { record: TicketRecord, use_time: u64 },
    Rejected(RejectReason),
}

impl Validation {
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }
}
