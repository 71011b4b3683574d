//! Field-level encryption for secure columns.
//!
//! This module provides:
//! - **aes_cbc**: the [`CryptoEngine`] that encrypts and decrypts individual
//!   field strings with AES-256-CBC
//! - **keygen**: random key, IV and salt generation for callers who want to
//!   mint their own salts
//!
//! ## Security Model
//!
//! The key and IV are derived from built-in defaults overwritten by the
//! caller's salt. The IV is therefore fixed per salt: encrypting the same
//! plaintext twice with the same salt yields the same ciphertext. That keeps
//! data files stable across rewrites but leaks equality between secure
//! values to anyone who can read the file.
//!
//! We defend against:
//! - Reading secure column values from a copied data file without the salt
//!
//! We do NOT defend against:
//! - Equality analysis across ciphertexts
//! - Tampering (CBC provides no integrity check)

pub mod aes_cbc;
pub mod keygen;

pub use aes_cbc::{CryptoEngine, BLOCK_LEN, IV_LEN, KEY_LEN};
pub use keygen::{generate, generate_iv, generate_key, generate_salt, KeyMaterial};
