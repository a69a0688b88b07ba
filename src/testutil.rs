//! Shared fixtures for unit tests. Keypair generation dominates test time,
//! so tests share one process-wide private key.

use std::sync::OnceLock;

use rand_core::OsRng;
use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::signer::{TicketSigner, TicketVerifier};

pub fn test_private_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| RsaPrivateKey::new(&mut OsRng, 2048).expect("test keygen"))
}

pub fn test_signer() -> TicketSigner {
    TicketSigner::new(test_private_key().clone())
}

pub fn test_verifier() -> TicketVerifier {
    TicketVerifier::new(RsaPublicKey::from(test_private_key()))
}
