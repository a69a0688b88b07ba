use aes_gcm::aead::AeadInPlace;
use aes_gcm::{Aes256Gcm, Key, KeyInit, Nonce, Tag};
use rand_core::{OsRng, RngCore};

use crate::types::{SEAL_IV_LEN, SEAL_KEY_LEN, SEAL_TAG_LEN};

/// Generate a fresh AES-256 key and 96-bit IV. One pair per ticket; reuse
/// across tickets is forbidden.
#[must_use]
pub fn generate_key_iv() -> ([u8; SEAL_KEY_LEN], [u8; SEAL_IV_LEN]) {
    let mut key = [0u8; SEAL_KEY_LEN];
    let mut iv = [0u8; SEAL_IV_LEN];
    OsRng.fill_bytes(&mut key);
    OsRng.fill_bytes(&mut iv);
    (key, iv)
}

/// AES-256-GCM with detached tag.
///
/// # Errors
///
/// Returns `aes_gcm::Error` if encryption fails (unreachable for valid
/// key/iv sizes, kept for the AEAD contract).
pub fn seal(
    plaintext: &[u8],
    key: &[u8; SEAL_KEY_LEN],
    iv: &[u8; SEAL_IV_LEN],
) -> Result<(Vec<u8>, [u8; SEAL_TAG_LEN]), aes_gcm::Error> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let mut buf = plaintext.to_vec();
    let tag = cipher.encrypt_in_place_detached(Nonce::from_slice(iv), b"", &mut buf)?;
    Ok((buf, tag.into()))
}

/// Open a sealed buffer. Fails closed: any bit-flip in ciphertext, tag, or
/// iv yields `None`, never partial plaintext.
#[must_use]
pub fn open(
    ciphertext: &[u8],
    tag: &[u8; SEAL_TAG_LEN],
    key: &[u8; SEAL_KEY_LEN],
    iv: &[u8; SEAL_IV_LEN],
) -> Option<Vec<u8>> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let mut buf = ciphertext.to_vec();
    match cipher.decrypt_in_place_detached(Nonce::from_slice(iv), b"", &mut buf, Tag::from_slice(tag)) {
        Ok(()) => Some(buf),
        Err(_) => None,
    }
}
