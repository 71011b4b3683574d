//! Random key, IV and salt generation.

use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::{Rng, RngCore};

use super::aes_cbc::{IV_LEN, KEY_LEN};

/// Kind of key material to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyMaterial {
    /// 32-byte AES-256 key
    Key,
    /// 16-byte CBC initialization vector
    Iv,
}

/// Generate a random 256-bit key from the OS RNG.
pub fn generate_key() -> [u8; KEY_LEN] {
    let mut bytes = [0u8; KEY_LEN];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

/// Generate a random 128-bit IV from the OS RNG.
pub fn generate_iv() -> [u8; IV_LEN] {
    let mut bytes = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

/// Generate key material of the requested kind.
pub fn generate(kind: KeyMaterial) -> Vec<u8> {
    match kind {
        KeyMaterial::Key => generate_key().to_vec(),
        KeyMaterial::Iv => generate_iv().to_vec(),
    }
}

/// Generate a random alphanumeric salt.
///
/// Salts are ASCII so every character maps onto exactly one key byte; a
/// length of [`KEY_LEN`] fills the whole key.
pub fn generate_salt(len: usize) -> String {
    OsRng
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
