use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};

use crate::cipher;
use crate::errors::{RejectReason, StoreError};
use crate::ser;
use crate::signer::TicketVerifier;
use crate::store::RedemptionStore;
use crate::types::{RedeemOutcome, Validation};

/// Validate one transported payload, short-circuiting on the first failure.
///
/// Pipeline: parse payload → open ciphertext → verify signature → parse
/// record → redeem. Every branch is reported distinctly so an operator can
/// tell tampering from forgery from expiry from replay.
///
/// The signature check runs even though the AEAD tag has already
/// authenticated the plaintext: the symmetric key travels with the payload,
/// so anyone holding the blob could re-seal altered content. Only the
/// signature binds the ticket to the issuing authority.
///
/// # Errors
///
/// Returns [`StoreError`] only when the redemption store itself fails;
/// every business rejection is a [`Validation::Rejected`] value.
pub fn validate_ticket(
    verifier: &TicketVerifier,
    store: &RedemptionStore,
    blob: &str,
    current_time: Option<u64>,
) -> Result<Validation, StoreError> {
    let now = current_time.unwrap_or_else(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    });

    let payload = match ser::decode_payload(blob) {
        Ok(payload) => payload,
        Err(reason) => return Ok(reject(reason)),
    };

    let Some(plaintext) = cipher::open(&payload.ciphertext, &payload.tag, &payload.key, &payload.iv)
    else {
        return Ok(reject(RejectReason::DecryptionFailed));
    };

    if !verifier.verify(&plaintext, &payload.signature) {
        return Ok(reject(RejectReason::SignatureInvalid));
    }

    let record = match ser::decode_record(&plaintext) {
        Ok(record) => record,
        Err(reason) => return Ok(reject(reason)),
    };

    match store.try_redeem(&record.ticket_id, now)? {
        RedeemOutcome::Accepted { use_time } => {
            debug!(ticket_id = %record.ticket_id, use_time, "ticket accepted");
            Ok(Validation::Accepted { record, use_time })
        }
        RedeemOutcome::NotFound => Ok(reject(RejectReason::NotFound)),
        RedeemOutcome::AlreadyUsed { use_time } => {
            Ok(reject(RejectReason::AlreadyUsed { use_time }))
        }
        RedeemOutcome::Expired { expiry_time } => {
            Ok(reject(RejectReason::Expired { expiry_time }))
        }
    }
}

fn reject(reason: RejectReason) -> Validation {
    warn!(%reason, "ticket rejected");
    Validation::Rejected(reason)
}
