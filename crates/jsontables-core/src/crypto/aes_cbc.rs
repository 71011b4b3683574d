//! AES-256-CBC encryption of individual field strings.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use zeroize::ZeroizeOnDrop;

use crate::error::{Result, StoreError};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Length of the AES key in bytes (256 bits).
pub const KEY_LEN: usize = 32;

/// Length of the CBC initialization vector in bytes.
pub const IV_LEN: usize = 16;

/// AES block size in bytes.
pub const BLOCK_LEN: usize = 16;

/// Built-in key, partially overwritten by the salt.
const DEFAULT_KEY: [u8; KEY_LEN] = [
    143, 217, 19, 111, 24, 216, 85, 45, 111, 184, 27, 162, 137, 114, 222, 209, 241, 24, 175, 144,
    173, 53, 196, 29, 24, 26, 17, 218, 131, 236, 53, 209,
];

/// Built-in IV, partially overwritten by the salt.
const DEFAULT_IV: [u8; IV_LEN] = [
    126, 64, 191, 112, 23, 3, 116, 119, 231, 121, 252, 112, 79, 32, 114, 156,
];

/// Encrypts and decrypts field values with a key and IV derived from a salt.
///
/// Key material is zeroized from memory on drop.
#[derive(Clone, ZeroizeOnDrop)]
pub struct CryptoEngine {
    key: [u8; KEY_LEN],
    iv: [u8; IV_LEN],
}

impl CryptoEngine {
    /// Engine using only the built-in key and IV.
    pub fn unsalted() -> Self {
        Self {
            key: DEFAULT_KEY,
            iv: DEFAULT_IV,
        }
    }

    /// Engine whose key and IV start with the salt's bytes.
    ///
    /// Each salt character becomes one byte: ASCII maps to itself and any
    /// other character becomes a single `?`, including a character outside
    /// the Basic Multilingual Plane (a surrogate pair is replaced whole, not
    /// per code unit). Those bytes overwrite the default key and the default
    /// IV position by position, up to each buffer's length. A blank salt leaves
    /// the defaults untouched.
    ///
    /// # Examples
    ///
    /// ```
    /// use jsontables_core::crypto::CryptoEngine;
    ///
    /// let a = CryptoEngine::with_salt("YU7icKHkVp5aARqK");
    /// let b = CryptoEngine::with_salt("YU7icKHkVp5aARqK");
    /// assert_eq!(a.encrypt("MyPass"), b.encrypt("MyPass"));
    /// ```
    pub fn with_salt(salt: &str) -> Self {
        let mut engine = Self::unsalted();
        if salt.trim().is_empty() {
            return engine;
        }

        let salt_bytes = salt.chars().map(|c| if c.is_ascii() { c as u8 } else { b'?' });
        for (i, byte) in salt_bytes.enumerate() {
            if i >= KEY_LEN {
                break;
            }
            engine.key[i] = byte;
            if i < IV_LEN {
                engine.iv[i] = byte;
            }
        }
        engine
    }

    /// Encrypt a string, returning uppercase hex ciphertext.
    pub fn encrypt(&self, plaintext: &str) -> String {
        let ciphertext = Aes256CbcEnc::new(&self.key.into(), &self.iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());
        hex::encode_upper(ciphertext)
    }

    /// Decrypt hex ciphertext produced by [`CryptoEngine::encrypt`].
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Crypto` if:
    /// - The input is empty or not valid hex
    /// - The decoded length is not a multiple of the block size
    /// - The padding is invalid (wrong salt or corrupted data)
    /// - The plaintext is not valid UTF-8
    pub fn decrypt(&self, ciphertext_hex: &str) -> Result<String> {
        let ciphertext = hex::decode(ciphertext_hex.trim())
            .map_err(|e| StoreError::Crypto(format!("Invalid hex ciphertext: {}", e)))?;

        if ciphertext.is_empty() || ciphertext.len() % BLOCK_LEN != 0 {
            return Err(StoreError::Crypto(format!(
                "Ciphertext length {} is not a positive multiple of {}",
                ciphertext.len(),
                BLOCK_LEN
            )));
        }

        let plaintext = Aes256CbcDec::new(&self.key.into(), &self.iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
            .map_err(|_| StoreError::Crypto("Decryption failed: invalid padding".to_string()))?;

        String::from_utf8(plaintext)
            .map_err(|e| StoreError::Crypto(format!("Decrypted data is not UTF-8: {}", e)))
    }
}

impl Default for CryptoEngine {
    fn default() -> Self {
        Self::unsalted()
    }
}

impl std::fmt::Debug for CryptoEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoEngine")
            .field("key", &"[REDACTED]")
            .field("iv", &"[REDACTED]")
            .finish()
    }
}
