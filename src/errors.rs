use std::path::PathBuf;

use thiserror::Error;

/// Key material could not be generated, persisted, or loaded. Fatal at
/// startup: no ticket can be issued or validated without the keypair.
#[derive(Debug, Error)]
pub enum KeyStorageError {
    #[error("key file unreadable: {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("key material corrupt: {path}: {detail}")]
    Corrupt { path: PathBuf, detail: String },

    #[error("key generation failed: {0}")]
    Generate(rsa::Error),

    #[error("key persistence failed: {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Redemption store failures. `DuplicateTicket` is a caller error at
/// registration; `Unavailable` means the system is broken, never that a
/// ticket was rejected.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate ticket id: {0}")]
    DuplicateTicket(String),

    #[error("redemption store unavailable: {0}")]
    Unavailable(#[from] rusqlite::Error),
}

/// Issuance failures, reported to the issuance caller. Non-fatal.
#[derive(Debug, Error)]
pub enum IssueError {
    #[error("valid duration must be positive")]
    InvalidDuration,

    #[error("record encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("ticket encryption failed")]
    Seal,

    #[error("signing failed: {0}")]
    Sign(#[from] rsa::signature::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Context construction failures.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Keys(#[from] KeyStorageError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Why a payload was rejected. Every branch of the validation pipeline is
/// reported distinctly so operators can tell tampering from expiry from
/// replay; none of these are collapsed into a generic failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("malformed payload: {0}")]
    MalformedPayload(&'static str),

    #[error("decryption failed: ciphertext, tag, or iv corrupt")]
    DecryptionFailed,

    #[error("signature verification failed")]
    SignatureInvalid,

    #[error("malformed record: {0}")]
    MalformedRecord(&'static str),

    #[error("ticket not registered")]
    NotFound,

    #[error("ticket already used at {use_time}")]
    AlreadyUsed { use_time: u64 },

    #[error("ticket expired at {expiry_time}")]
    Expired { expiry_time: u64 },
}
