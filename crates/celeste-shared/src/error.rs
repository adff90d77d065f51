use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Encryption failed")]
    EncryptionFailed,

    #[error("Decryption failed: invalid ciphertext or wrong key")]
    DecryptionFailed,

    #[error("Encrypted blob is not valid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("Encrypted blob too short: {len} bytes (need at least {min})")]
    Truncated { len: usize, min: usize },

    #[error("Decrypted secret is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}
