use std::path::Path;

use crate::errors::{IssueError, SetupError, StoreError};
use crate::issuer::{issue_ticket, IssueParams, IssuedTicket};
use crate::keys::{ensure_keypair, Keypair};
use crate::signer::{TicketSigner, TicketVerifier};
use crate::store::RedemptionStore;
use crate::types::Validation;
use crate::validator::validate_ticket;

/// Explicitly constructed context owning the deployment's signing and
/// verification capabilities and the redemption store handle. Front ends
/// hold exactly one of these; there is no process-global state.
#[derive(Debug)]
pub struct TicketAuthority {
    signer: TicketSigner,
    verifier: TicketVerifier,
    store: RedemptionStore,
}

impl TicketAuthority {
    /// Load or create the keypair under `key_dir` and open the redemption
    /// store at `db_path`.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError`] when key material cannot be established or
    /// the store cannot be opened. Both are fatal at startup.
    pub fn open(key_dir: &Path, db_path: &Path) -> Result<Self, SetupError> {
        let keypair = ensure_keypair(key_dir)?;
        let store = RedemptionStore::open(db_path)?;
        Ok(Self::new(&keypair, store))
    }

    #[must_use]
    pub fn new(keypair: &Keypair, store: RedemptionStore) -> Self {
        Self {
            signer: keypair.signer(),
            verifier: keypair.verifier(),
            store,
        }
    }

    /// Issue a ticket. See [`issue_ticket`].
    ///
    /// # Errors
    ///
    /// Propagates [`IssueError`].
    pub fn issue(&self, params: IssueParams) -> Result<IssuedTicket, IssueError> {
        issue_ticket(&self.signer, &self.store, params)
    }

    /// Validate a captured payload blob. See [`validate_ticket`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] only on store failure; rejections are values.
    pub fn validate(
        &self,
        blob: &str,
        current_time: Option<u64>,
    ) -> Result<Validation, StoreError> {
        validate_ticket(&self.verifier, &self.store, blob, current_time)
    }

    #[must_use]
    pub const fn store(&self) -> &RedemptionStore {
        &self.store
    }

    #[must_use]
    pub const fn verifier(&self) -> &TicketVerifier {
        &self.verifier
    }
}
