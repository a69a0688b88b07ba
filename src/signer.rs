use core::fmt;

use rand_core::OsRng;
use rsa::pss::{BlindedSigningKey, Signature, VerifyingKey};
use rsa::signature::{RandomizedSigner, SignatureEncoding, Verifier};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;

/// Signing capability over the deployment keypair. Holds the private half;
/// callers only ever see `sign`.
#[derive(Clone)]
pub struct TicketSigner {
    key: BlindedSigningKey<Sha256>,
}

impl TicketSigner {
    #[must_use]
    pub fn new(private: RsaPrivateKey) -> Self {
        Self {
            key: BlindedSigningKey::<Sha256>::new(private),
        }
    }

    /// RSA-PSS over SHA-256 with a random salt and blinding: signing
    /// identical bytes twice yields different signature bytes, so identical
    /// ticket content cannot be correlated through its signatures.
    ///
    /// # Errors
    ///
    /// Returns `rsa::signature::Error` if the signing operation fails.
    pub fn sign(&self, msg: &[u8]) -> Result<Vec<u8>, rsa::signature::Error> {
        let sig = self.key.try_sign_with_rng(&mut OsRng, msg)?;
        Ok(sig.to_vec())
    }
}

impl fmt::Debug for TicketSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TicketSigner").finish_non_exhaustive()
    }
}

/// Verification capability over the deployment's public key.
#[derive(Debug, Clone)]
pub struct TicketVerifier {
    key: VerifyingKey<Sha256>,
}

impl TicketVerifier {
    #[must_use]
    pub fn new(public: RsaPublicKey) -> Self {
        Self {
            key: VerifyingKey::<Sha256>::new(public),
        }
    }

    /// Verify a detached signature over `msg`. Malformed signature bytes are
    /// reported as `false`, never as a panic or error.
    #[must_use]
    pub fn verify(&self, msg: &[u8], signature: &[u8]) -> bool {
        Signature::try_from(signature)
            .is_ok_and(|sig| self.key.verify(msg, &sig).is_ok())
    }
}
