//! Payload cipher for SwiftShare.
//!
//! Every transferred file is encrypted as one buffer with AES-128 in ECB mode
//! and PKCS#7 padding, using a key compiled into the binary. The ciphertext
//! length is what the sender announces in the handshake.
//!
//! ## Security Model
//!
//! There is none worth the name. The key is public (it ships with every
//! build) and ECB leaks equality of plaintext blocks: identical 16-byte blocks
//! encrypt to identical ciphertext blocks. The scheme only exists so the wire
//! format stays compatible with existing peers.
//!
//! Because the whole file is held in memory twice (plaintext and ciphertext),
//! the largest transferable file is bounded by available memory.

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyInit};
use aes::Aes128;
use base64::prelude::*;

use crate::error::{Error, Result};

/// AES block size in bytes.
pub const BLOCK_SIZE: usize = 16;

/// Key shared by every SwiftShare peer.
pub const DEFAULT_KEY: [u8; 16] = *b"SwiftShareAES128";

type EcbEncryptor = ecb::Encryptor<Aes128>;
type EcbDecryptor = ecb::Decryptor<Aes128>;

/// Whole-buffer AES-128/ECB/PKCS#7 codec.
#[derive(Clone)]
pub struct CipherCodec {
    key: [u8; 16],
}

impl std::fmt::Debug for CipherCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CipherCodec").finish_non_exhaustive()
    }
}

impl Default for CipherCodec {
    fn default() -> Self {
        Self::new(DEFAULT_KEY)
    }
}

impl CipherCodec {
    /// Create a codec with an explicit key.
    #[must_use]
    pub const fn new(key: [u8; 16]) -> Self {
        Self { key }
    }

    /// Encrypt a whole buffer.
    ///
    /// The output is always a non-empty multiple of [`BLOCK_SIZE`]; an empty
    /// input yields one full block of padding.
    #[must_use]
    pub fn encrypt(&self, plaintext: &[u8]) -> Vec<u8> {
        EcbEncryptor::new(&self.key.into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext)
    }

    /// Decrypt a whole buffer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cipher`] if the input is empty, not block aligned
    /// (for example a truncated payload), or carries invalid padding.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
            return Err(Error::Cipher(format!(
                "ciphertext length {} is not a positive multiple of {BLOCK_SIZE}",
                ciphertext.len()
            )));
        }

        EcbDecryptor::new(&self.key.into())
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| Error::Cipher("invalid padding (wrong key or corrupt data)".to_string()))
    }

    /// Encrypt a UTF-8 string and encode the ciphertext as base64.
    #[must_use]
    pub fn encrypt_text(&self, input: &str) -> String {
        BASE64_STANDARD.encode(self.encrypt(input.as_bytes()))
    }

    /// Decode a base64 ciphertext produced by [`encrypt_text`](Self::encrypt_text).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cipher`] if the input is not base64, fails to
    /// decrypt, or is not valid UTF-8 once decrypted.
    pub fn decrypt_text(&self, input: &str) -> Result<String> {
        let raw = BASE64_STANDARD
            .decode(input.trim())
            .map_err(|e| Error::Cipher(format!("invalid base64: {e}")))?;
        let plain = self.decrypt(&raw)?;
        String::from_utf8(plain).map_err(|e| Error::Cipher(format!("invalid UTF-8: {e}")))
    }
}

/// Encrypt with the default key.
#[must_use]
pub fn encrypt(plaintext: &[u8]) -> Vec<u8> {
    CipherCodec::default().encrypt(plaintext)
}

/// Decrypt with the default key.
///
/// # Errors
///
/// See [`CipherCodec::decrypt`].
pub fn decrypt(ciphertext: &[u8]) -> Result<Vec<u8>> {
    CipherCodec::default().decrypt(ciphertext)
}
