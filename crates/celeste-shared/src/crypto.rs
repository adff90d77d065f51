use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use rand::RngCore;
use sha2::Sha256;

use crate::constants::{
    DEFAULT_CODEC_PASSPHRASE, DEFAULT_CODEC_SALT, NONCE_SIZE, PBKDF2_ROUNDS, SYMMETRIC_KEY_SIZE,
    TAG_SIZE,
};
use crate::error::CryptoError;

pub type SymmetricKey = [u8; SYMMETRIC_KEY_SIZE];

pub fn generate_nonce() -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut nonce);
    nonce
}

/// PBKDF2-HMAC-SHA256 over `passphrase` and `salt`.
pub fn derive_key_from_passphrase(passphrase: &[u8], salt: &[u8]) -> SymmetricKey {
    let mut key = [0u8; SYMMETRIC_KEY_SIZE];
    pbkdf2::pbkdf2_hmac::<Sha256>(passphrase, salt, PBKDF2_ROUNDS, &mut key);
    key
}

// Returns nonce || ciphertext || tag (12 bytes nonce prepended)
pub fn encrypt(key: &SymmetricKey, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = ChaCha20Poly1305::new(key.into());
    let nonce_bytes = generate_nonce();
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| CryptoError::EncryptionFailed)?;

    let mut output = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    output.extend_from_slice(&nonce_bytes);
    output.extend_from_slice(&ciphertext);
    Ok(output)
}

pub fn decrypt(key: &SymmetricKey, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if data.len() < NONCE_SIZE + TAG_SIZE {
        return Err(CryptoError::Truncated {
            len: data.len(),
            min: NONCE_SIZE + TAG_SIZE,
        });
    }

    let (nonce_bytes, ciphertext) = data.split_at(NONCE_SIZE);
    let cipher = ChaCha20Poly1305::new(key.into());
    let nonce = Nonce::from_slice(nonce_bytes);

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| CryptoError::DecryptionFailed)
}

/// Encrypts short secrets (the user's API key) into base64 text blobs.
///
/// The key is derived once at construction. [`SecretCodec::obfuscating`] uses
/// a passphrase compiled into the binary, which hides the secret from casual
/// inspection of the database but offers no protection against anyone who can
/// read the program. Use [`SecretCodec::from_passphrase`] with a
/// user-supplied passphrase for actual confidentiality.
#[derive(Clone)]
pub struct SecretCodec {
    key: SymmetricKey,
}

impl SecretCodec {
    /// Codec keyed with the built-in passphrase and salt.
    pub fn obfuscating() -> Self {
        Self::from_passphrase(DEFAULT_CODEC_PASSPHRASE, DEFAULT_CODEC_SALT)
    }

    pub fn from_passphrase(passphrase: &str, salt: &str) -> Self {
        Self {
            key: derive_key_from_passphrase(passphrase.as_bytes(), salt.as_bytes()),
        }
    }

    /// Encrypt `plaintext` under a fresh random nonce.
    ///
    /// Returns base64 of `nonce || ciphertext || tag`; two calls with the same
    /// input never return the same blob.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        let sealed = encrypt(&self.key, plaintext.as_bytes())?;
        Ok(BASE64.encode(sealed))
    }

    /// Recover the plaintext of a blob produced by [`SecretCodec::encrypt`].
    ///
    /// Malformed, truncated or tampered blobs yield `None`; the cause is only
    /// logged.
    pub fn decrypt(&self, blob: &str) -> Option<String> {
        match self.open(blob) {
            Ok(plaintext) => Some(plaintext),
            Err(e) => {
                tracing::warn!(error = %e, "Decryption failed");
                None
            }
        }
    }

    fn open(&self, blob: &str) -> Result<String, CryptoError> {
        let data = BASE64.decode(blob.trim())?;
        let plaintext = decrypt(&self.key, &data)?;
        Ok(String::from_utf8(plaintext)?)
    }
}

impl Default for SecretCodec {
    fn default() -> Self {
        Self::obfuscating()
    }
}

impl std::fmt::Debug for SecretCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretCodec")
            .field("key", &"<redacted>")
            .finish()
    }
}
