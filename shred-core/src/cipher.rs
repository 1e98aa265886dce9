// Keyed string ciphers used as the leaf transform

use crate::error::CipherError;
use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha2::{Digest, Sha256};

/// Length of the AES-GCM nonce prepended to every ciphertext.
const NONCE_LEN: usize = 12;

/// A string cipher with its key bound at construction.
pub trait KeyedTransform {
    fn encrypt(&self, plaintext: &str) -> Result<String, CipherError>;
    fn decrypt(&self, ciphertext: &str) -> Result<String, CipherError>;
}

impl<T: KeyedTransform + ?Sized> KeyedTransform for &T {
    fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        (**self).encrypt(plaintext)
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, CipherError> {
        (**self).decrypt(ciphertext)
    }
}

/// AES-256-GCM keyed by the SHA-256 digest of a passphrase.
///
/// Ciphertext layout, base64 (standard alphabet, padded):
///
/// ```text
/// [nonce: 12 bytes][ciphertext][tag: 16 bytes]
/// ```
///
/// A fresh random nonce is drawn per call, so encrypting the same text twice
/// gives different output. Decrypting with the wrong passphrase fails the
/// tag check and reports [`CipherError::Crypto`].
pub struct AesKeyedEncryptor {
    cipher: Aes256Gcm,
}

impl AesKeyedEncryptor {
    pub fn new(passphrase: &str) -> Self {
        let key = Sha256::digest(passphrase.as_bytes());
        AesKeyedEncryptor {
            cipher: Aes256Gcm::new(&key),
        }
    }
}

impl KeyedTransform for AesKeyedEncryptor {
    fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let sealed = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| CipherError::Crypto)?;

        let mut framed = Vec::with_capacity(NONCE_LEN + sealed.len());
        framed.extend_from_slice(&nonce);
        framed.extend_from_slice(&sealed);
        Ok(STANDARD.encode(framed))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, CipherError> {
        let framed = STANDARD
            .decode(ciphertext)
            .map_err(|e| CipherError::Format(e.to_string()))?;
        if framed.len() < NONCE_LEN {
            return Err(CipherError::Format(format!(
                "{} bytes is shorter than the nonce",
                framed.len()
            )));
        }

        let (nonce, sealed) = framed.split_at(NONCE_LEN);
        let plain = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| CipherError::Crypto)?;
        String::from_utf8(plain).map_err(|_| CipherError::Utf8)
    }
}
