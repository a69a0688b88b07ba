use std::time::{SystemTime, UNIX_EPOCH};

use rand_core::{OsRng, RngCore};
use tracing::debug;
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::cipher;
use crate::errors::IssueError;
use crate::ser;
use crate::signer::TicketSigner;
use crate::store::RedemptionStore;
use crate::types::{TicketRecord, TransportPayload, RECORD_NONCE_LEN};

/// Parameters for issuing a ticket.
#[derive(Debug, Clone)]
pub struct IssueParams {
    pub event_name: String,
    pub holder_name: String,
    pub seat_number: String,
    /// Validity window length in seconds, starting at `issue_time`.
    pub valid_duration_secs: u64,
    /// Override for the issuance instant; defaults to the system clock.
    pub issue_time: Option<u64>,
}

/// An issued ticket: the immutable record and its transportable payload.
#[derive(Debug, Clone)]
pub struct IssuedTicket {
    pub record: TicketRecord,
    pub payload: TransportPayload,
}

/// Compose, register, seal, and sign a new ticket.
///
/// The entry is registered in the redemption store before the payload is
/// assembled, so no payload can reach a validator ahead of its own
/// registration. A fresh symmetric key and IV are generated for this ticket
/// alone and not retained after return.
///
/// # Errors
///
/// Returns [`IssueError::InvalidDuration`] for a zero-length validity
/// window; store, encoding, and signing failures are propagated.
pub fn issue_ticket(
    signer: &TicketSigner,
    store: &RedemptionStore,
    params: IssueParams,
) -> Result<IssuedTicket, IssueError> {
    if params.valid_duration_secs == 0 {
        return Err(IssueError::InvalidDuration);
    }
    let issue_time = params.issue_time.unwrap_or_else(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    });
    let expiry_time = issue_time.saturating_add(params.valid_duration_secs);

    let mut nonce = [0u8; RECORD_NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    let record = TicketRecord {
        ticket_id: Uuid::new_v4().to_string(),
        event_name: params.event_name,
        holder_name: params.holder_name,
        seat_number: params.seat_number,
        issue_time,
        expiry_time,
        nonce: hex::encode(nonce),
    };

    store.register(
        &record.ticket_id,
        &record.event_name,
        record.issue_time,
        record.expiry_time,
    )?;

    let canonical = ser::encode_record(&record)?;
    let (key, iv) = cipher::generate_key_iv();
    let key = Zeroizing::new(key);
    let (ciphertext, tag) = cipher::seal(&canonical, &key, &iv).map_err(|_| IssueError::Seal)?;
    let signature = signer.sign(&canonical)?;

    let payload = TransportPayload {
        ciphertext,
        tag,
        iv,
        key: *key,
        signature,
    };
    debug!(ticket_id = %record.ticket_id, expiry_time, "issued ticket");
    Ok(IssuedTicket { record, payload })
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::testutil::test_signer;

    fn params(valid_duration_secs: u64) -> IssueParams {
        IssueParams {
            event_name: "Concert".to_owned(),
            holder_name: "Alice".to_owned(),
            seat_number: "A12".to_owned(),
            valid_duration_secs,
            issue_time: Some(1000),
        }
    }

    #[test]
    fn zero_duration_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let store = RedemptionStore::open(dir.path().join("tickets.db")).unwrap();
        assert!(matches!(
            issue_ticket(&test_signer(), &store, params(0)),
            Err(IssueError::InvalidDuration)
        ));
    }

    #[test]
    fn issuance_registers_before_returning() {
        let dir = tempfile::tempdir().unwrap();
        let store = RedemptionStore::open(dir.path().join("tickets.db")).unwrap();
        let issued = issue_ticket(&test_signer(), &store, params(3600)).unwrap();

        assert_eq!(issued.record.issue_time, 1000);
        assert_eq!(issued.record.expiry_time, 4600);
        let entry = store.entry(&issued.record.ticket_id).unwrap().unwrap();
        assert_eq!(entry.event_name, "Concert");
        assert!(!entry.used);
    }

    #[test]
    fn identical_requests_yield_distinct_tickets() {
        let dir = tempfile::tempdir().unwrap();
        let store = RedemptionStore::open(dir.path().join("tickets.db")).unwrap();
        let signer = test_signer();
        let a = issue_ticket(&signer, &store, params(3600)).unwrap();
        let b = issue_ticket(&signer, &store, params(3600)).unwrap();

        assert_ne!(a.record.ticket_id, b.record.ticket_id);
        assert_ne!(a.record.nonce, b.record.nonce);
        assert_ne!(a.payload.key, b.payload.key);
        assert_ne!(a.payload.iv, b.payload.iv);
    }
}
