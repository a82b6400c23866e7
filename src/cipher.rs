// Copyright (c) 2024-present, caskdb contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Optional symmetric encryption of value payloads: AES-128-CBC with PKCS7
//! padding.
//!
//! The source this engine was modeled on derived its CBC IV from the first
//! block of the secret key and reused it for every record — identical
//! plaintexts under the same key then produce identical ciphertexts. This
//! rewrite draws a fresh random IV per record and prepends it to the
//! ciphertext, so `iv || ciphertext` is what the codec ends up storing as
//! the record's value bytes. The on-disk record frame layout is unaffected:
//! as far as [`crate::record`] is concerned this is just "the value".

use aes::{
    cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit},
    Aes128,
};
use rand::RngCore;

use crate::error::{Error, Result};

const KEY_LEN: usize = 16;
const IV_LEN: usize = 16;

type Encryptor = cbc::Encryptor<Aes128>;
type Decryptor = cbc::Decryptor<Aes128>;

/// A 16-byte AES-128 key.
#[derive(Clone)]
pub struct EncryptionKey([u8; KEY_LEN]);

impl EncryptionKey {
    /// Builds a key from exactly 16 bytes.
    pub fn new(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != KEY_LEN {
            return Err(Error::InvalidConfig("encryption key must be 16 bytes"));
        }
        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(bytes);
        Ok(Self(key))
    }
}

/// Encrypts or passes through value bytes, depending on configuration.
#[derive(Clone)]
pub enum Cipher {
    /// No encryption; values are stored as-is.
    Plain,
    /// AES-128-CBC with a per-record random IV.
    Aes(EncryptionKey),
}

impl Cipher {
    /// Transforms `plaintext` into what gets written to the log.
    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        match self {
            Self::Plain => Ok(plaintext.to_vec()),
            Self::Aes(key) => {
                let mut iv = [0u8; IV_LEN];
                rand::thread_rng().fill_bytes(&mut iv);

                let ciphertext = Encryptor::new_from_slices(&key.0, &iv)
                    .map_err(|_| Error::EncryptionError)?
                    .encrypt_padded_vec_mut::<Pkcs7>(plaintext);

                let mut out = Vec::with_capacity(IV_LEN + ciphertext.len());
                out.extend_from_slice(&iv);
                out.extend_from_slice(&ciphertext);
                Ok(out)
            }
        }
    }

    /// Recovers the plaintext stored in a record's value bytes.
    pub fn open(&self, stored: &[u8]) -> Result<Vec<u8>> {
        match self {
            Self::Plain => Ok(stored.to_vec()),
            Self::Aes(key) => {
                if stored.len() < IV_LEN {
                    return Err(Error::EncryptionError);
                }
                let (iv, ciphertext) = stored.split_at(IV_LEN);

                Decryptor::new_from_slices(&key.0, iv)
                    .map_err(|_| Error::EncryptionError)?
                    .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
                    .map_err(|_| Error::EncryptionError)
            }
        }
    }

    /// `true` if this cipher is not a no-op.
    #[must_use]
    pub fn is_encrypting(&self) -> bool {
        matches!(self, Self::Aes(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn cipher() -> Cipher {
        Cipher::Aes(EncryptionKey::new(b"0123456789abcdef").unwrap())
    }

    #[test]
    fn round_trip() {
        let cipher = cipher();
        let plaintext = b"a fairly long secret value that spans blocks";
        let sealed = cipher.seal(plaintext).unwrap();
        assert_ne!(&sealed[16..], &plaintext[..]);
        let opened = cipher.open(&sealed).unwrap();
        assert_eq!(opened, plaintext);
    }

    #[test]
    fn same_plaintext_differs_each_time() {
        let cipher = cipher();
        let a = cipher.seal(b"repeat me").unwrap();
        let b = cipher.seal(b"repeat me").unwrap();
        assert_ne!(a, b, "random per-record IV should change the ciphertext");
    }

    #[test]
    fn wrong_key_fails_to_decrypt() {
        let cipher = cipher();
        let sealed = cipher.seal(b"top secret").unwrap();

        let wrong = Cipher::Aes(EncryptionKey::new(b"fedcba9876543210").unwrap());
        assert!(wrong.open(&sealed).is_err());
    }

    #[test]
    fn rejects_bad_key_length() {
        assert!(EncryptionKey::new(b"short").is_err());
    }

    #[test]
    fn plain_cipher_passes_through() {
        let cipher = Cipher::Plain;
        let sealed = cipher.seal(b"hello").unwrap();
        assert_eq!(sealed, b"hello");
        assert_eq!(cipher.open(&sealed).unwrap(), b"hello");
    }
}
