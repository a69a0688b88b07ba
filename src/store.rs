use std::path::PathBuf;
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use tracing::{debug, warn};

use crate::errors::StoreError;
use crate::types::{RedeemOutcome, RedemptionEntry};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS tickets (
    ticket_id   TEXT PRIMARY KEY,
    event_name  TEXT NOT NULL,
    issue_time  INTEGER NOT NULL,
    expiry_time INTEGER NOT NULL,
    used        INTEGER NOT NULL DEFAULT 0,
    use_time    INTEGER
)";

/// Durable record of every issued ticket's identity, expiry, and usage
/// state. This is the only shared mutable resource in the protocol; replay
/// defense lives here.
///
/// Every operation runs on its own connection, so calls for different
/// tickets do not serialize in-process; `try_redeem` runs inside an
/// immediate transaction, so concurrent redemptions of one ticket admit
/// exactly one winner. Rows are never deleted.
#[derive(Debug, Clone)]
pub struct RedemptionStore {
    db_path: PathBuf,
}

impl RedemptionStore {
    /// Open (and on first use create) the store at `db_path`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the database cannot be opened
    /// or the schema cannot be created.
    pub fn open(db_path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let store = Self {
            db_path: db_path.into(),
        };
        let conn = store.connect()?;
        conn.execute(SCHEMA, [])?;
        Ok(store)
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        let conn = Connection::open(&self.db_path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.pragma_update(None, "journal_mode", "wal")?;
        Ok(conn)
    }

    /// Insert a new entry with `used = false`.
    ///
    /// Issuance must complete this before any payload leaves the issuer, so
    /// no payload can reach a validator ahead of its own registration.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateTicket`] if `ticket_id` already
    /// exists, [`StoreError::Unavailable`] on database failure.
    pub fn register(
        &self,
        ticket_id: &str,
        event_name: &str,
        issue_time: u64,
        expiry_time: u64,
    ) -> Result<(), StoreError> {
        let conn = self.connect()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO tickets (ticket_id, event_name, issue_time, expiry_time, used)
             VALUES (?1, ?2, ?3, ?4, 0)",
            params![ticket_id, event_name, issue_time, expiry_time],
        )?;
        if inserted == 0 {
            return Err(StoreError::DuplicateTicket(ticket_id.to_owned()));
        }
        debug!(ticket_id, event_name, expiry_time, "registered ticket");
        Ok(())
    }

    /// Atomic check-and-mark-used. Checks run in order: unknown id, already
    /// used, expired; otherwise the entry is marked used at `now` and
    /// committed. Under concurrent calls for the same `ticket_id` exactly
    /// one caller observes `Accepted`; the rest observe `AlreadyUsed`.
    ///
    /// An unused entry is still accepted at `now == expiry_time`; the first
    /// expired second is `expiry_time + 1`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] on database failure. Business
    /// rejections are values, not errors.
    pub fn try_redeem(&self, ticket_id: &str, now: u64) -> Result<RedeemOutcome, StoreError> {
        let mut conn = self.connect()?;
        // The write lock is taken up front so the read below cannot race
        // another redeemer's update.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let row = tx
            .query_row(
                "SELECT used, expiry_time, use_time FROM tickets WHERE ticket_id = ?1",
                params![ticket_id],
                |r| {
                    Ok((
                        r.get::<_, bool>(0)?,
                        r.get::<_, u64>(1)?,
                        r.get::<_, Option<u64>>(2)?,
                    ))
                },
            )
            .optional()?;

        let outcome = match row {
            None => RedeemOutcome::NotFound,
            Some((true, _, use_time)) => RedeemOutcome::AlreadyUsed {
                use_time: use_time.unwrap_or(0),
            },
            Some((false, expiry_time, _)) if now > expiry_time => {
                RedeemOutcome::Expired { expiry_time }
            }
            Some((false, _, _)) => {
                tx.execute(
                    "UPDATE tickets SET used = 1, use_time = ?2 WHERE ticket_id = ?1",
                    params![ticket_id, now],
                )?;
                RedeemOutcome::Accepted { use_time: now }
            }
        };
        tx.commit()?;

        match outcome {
            RedeemOutcome::Accepted { .. } => debug!(ticket_id, now, "ticket redeemed"),
            _ => warn!(ticket_id, now, ?outcome, "redemption refused"),
        }
        Ok(outcome)
    }

    /// Fetch one audit row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] on database failure.
    pub fn entry(&self, ticket_id: &str) -> Result<Option<RedemptionEntry>, StoreError> {
        let conn = self.connect()?;
        let entry = conn
            .query_row(
                "SELECT ticket_id, event_name, issue_time, expiry_time, used, use_time
                 FROM tickets WHERE ticket_id = ?1",
                params![ticket_id],
                row_to_entry,
            )
            .optional()?;
        Ok(entry)
    }

    /// List every audit row, most recently issued first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] on database failure.
    pub fn entries(&self) -> Result<Vec<RedemptionEntry>, StoreError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT ticket_id, event_name, issue_time, expiry_time, used, use_time
             FROM tickets ORDER BY issue_time DESC, ticket_id",
        )?;
        let entries = stmt
            .query_map([], row_to_entry)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<RedemptionEntry> {
    Ok(RedemptionEntry {
        ticket_id: row.get(0)?,
        event_name: row.get(1)?,
        issue_time: row.get(2)?,
        expiry_time: row.get(3)?,
        used: row.get(4)?,
        use_time: row.get(5)?,
    })
}
