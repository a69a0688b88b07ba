#![forbid(unsafe_code)]
#![deny(warnings)]
#![deny(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

//! ticketseal: cryptographic core for single-use event tickets
//!
//! This crate implements issuance and validation of tamper-evident,
//! time-bounded credentials encoded for offline transport (printed or
//! scanned codes). It covers the protocol core only: key lifecycle,
//! authenticated encryption of ticket content, independent signature
//! binding, and exactly-once redemption against a persistent store under
//! concurrent validation attempts.

// Fixed cryptographic choices:
// - AEAD: AES-256-GCM (256-bit key, 96-bit IV, 128-bit tag), detached tag
// - Signature: RSA-PSS over SHA-256, 2048-bit keys, randomized salt
// - Ticket identity: UUIDv4 (128-bit random)
// - Redemption: SQLite row per ticket, immediate-transaction check-and-mark
//
// The per-ticket symmetric key is transported inside the payload, so the
// AEAD layer is tamper evidence, not confidentiality; the signature is the
// trust anchor. Single-use enforcement lives entirely in the store.

// Core modules
pub mod authority;
pub mod cipher;
pub mod errors;
pub mod issuer;
pub mod keys;
pub mod ser;
pub mod signer;
pub mod store;
pub mod types;
pub mod validator;

#[cfg(test)]
pub(crate) mod testutil;

// Re-export commonly used types and functions
pub use authority::TicketAuthority;
pub use errors::{IssueError, KeyStorageError, RejectReason, SetupError, StoreError};
pub use issuer::{issue_ticket, IssueParams, IssuedTicket};
pub use keys::{ensure_keypair, Keypair};
pub use ser::{decode_payload, encode_payload};
pub use signer::{TicketSigner, TicketVerifier};
pub use store::RedemptionStore;
pub use types::*;
pub use validator::validate_ticket;

// Version constant
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
