use std::fs;
use std::path::Path;

use rand_core::OsRng;
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use tracing::debug;

use crate::errors::KeyStorageError;
use crate::signer::{TicketSigner, TicketVerifier};

pub const KEY_BITS: usize = 2048;
pub const PRIVATE_KEY_FILE: &str = "private_key.pem";
pub const PUBLIC_KEY_FILE: &str = "public_key.pem";

/// The deployment's signing keypair. Generated once, reused for the lifetime
/// of the deployment. The private half never leaves this module except as a
/// [`TicketSigner`] capability.
pub struct Keypair {
    private: RsaPrivateKey,
    public: RsaPublicKey,
}

impl core::fmt::Debug for Keypair {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Keypair").finish_non_exhaustive()
    }
}

impl Keypair {
    #[must_use]
    pub fn signer(&self) -> TicketSigner {
        TicketSigner::new(self.private.clone())
    }

    #[must_use]
    pub fn verifier(&self) -> TicketVerifier {
        TicketVerifier::new(self.public.clone())
    }
}

/// Load the deployment keypair, generating and persisting one on first run.
///
/// The private half is written with restrictive permissions; the public half
/// is kept on disk alongside it so out-of-process verifiers can pick it up.
///
/// # Errors
///
/// Returns [`KeyStorageError`] if persisted key material is unreadable or
/// corrupt, or if generation/persistence fails.
pub fn ensure_keypair(key_dir: &Path) -> Result<Keypair, KeyStorageError> {
    let private_path = key_dir.join(PRIVATE_KEY_FILE);
    let public_path = key_dir.join(PUBLIC_KEY_FILE);

    let private = if private_path.exists() {
        let pem = fs::read_to_string(&private_path).map_err(|source| KeyStorageError::Unreadable {
            path: private_path.clone(),
            source,
        })?;
        let private =
            RsaPrivateKey::from_pkcs8_pem(&pem).map_err(|e| KeyStorageError::Corrupt {
                path: private_path.clone(),
                detail: e.to_string(),
            })?;
        debug!(path = %private_path.display(), "loaded signing keypair");
        private
    } else {
        generate_private(key_dir, &private_path)?
    };

    let public = RsaPublicKey::from(&private);
    if !public_path.exists() {
        persist_public(&public, &public_path)?;
    }

    Ok(Keypair { private, public })
}

fn generate_private(key_dir: &Path, path: &Path) -> Result<RsaPrivateKey, KeyStorageError> {
    debug!(path = %path.display(), bits = KEY_BITS, "generating signing keypair");
    let private = RsaPrivateKey::new(&mut OsRng, KEY_BITS).map_err(KeyStorageError::Generate)?;

    fs::create_dir_all(key_dir).map_err(|source| KeyStorageError::Persist {
        path: key_dir.to_path_buf(),
        source,
    })?;
    let pem = private
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| KeyStorageError::Corrupt {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
    fs::write(path, pem.as_bytes()).map_err(|source| KeyStorageError::Persist {
        path: path.to_path_buf(),
        source,
    })?;
    restrict_permissions(path).map_err(|source| KeyStorageError::Persist {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(private)
}

fn persist_public(public: &RsaPublicKey, path: &Path) -> Result<(), KeyStorageError> {
    let pem = public
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| KeyStorageError::Corrupt {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
    fs::write(path, pem).map_err(|source| KeyStorageError::Persist {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_then_load_same_keypair() {
        let dir = tempfile::tempdir().unwrap();

        let first = ensure_keypair(dir.path()).unwrap();
        assert!(dir.path().join(PRIVATE_KEY_FILE).exists());
        assert!(dir.path().join(PUBLIC_KEY_FILE).exists());

        // A second run loads rather than regenerates: a signature from the
        // first pair must verify under the second.
        let second = ensure_keypair(dir.path()).unwrap();
        let sig = first.signer().sign(b"probe").unwrap();
        assert!(second.verifier().verify(b"probe", &sig));

        // A missing public half is rewritten from the private half.
        fs::remove_file(dir.path().join(PUBLIC_KEY_FILE)).unwrap();
        let _ = ensure_keypair(dir.path()).unwrap();
        assert!(dir.path().join(PUBLIC_KEY_FILE).exists());
    }

    #[test]
    fn corrupt_private_pem_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(PRIVATE_KEY_FILE), "not pem at all").unwrap();

        match ensure_keypair(dir.path()) {
            Err(KeyStorageError::Corrupt { .. }) => {}
            other => panic!("expected corrupt key error, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn private_key_file_is_restricted() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let _ = ensure_keypair(dir.path()).unwrap();
        let mode = fs::metadata(dir.path().join(PRIVATE_KEY_FILE))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
