/// Application name
pub const APP_NAME: &str = "Celeste";

/// ChaCha20-Poly1305 nonce size in bytes
pub const NONCE_SIZE: usize = 12;

/// Poly1305 authentication tag size in bytes
pub const TAG_SIZE: usize = 16;

/// Symmetric key size in bytes (for ChaCha20-Poly1305)
pub const SYMMETRIC_KEY_SIZE: usize = 32;

/// PBKDF2-HMAC-SHA256 iteration count used for every key derivation
pub const PBKDF2_ROUNDS: u32 = 100_000;

/// Built-in passphrase for the API key codec.
///
/// Shipped in the binary, so a codec keyed with it only obfuscates the stored
/// key; anyone holding the source can recover it.
pub const DEFAULT_CODEC_PASSPHRASE: &str = "celeste-openrouter-api-key";

/// Built-in salt paired with [`DEFAULT_CODEC_PASSPHRASE`]
pub const DEFAULT_CODEC_SALT: &str = "fixed-salt-for-celeste";

/// Title given to a chat that has no user message yet
pub const DEFAULT_CHAT_TITLE: &str = "New Chat";

/// Number of characters of the first user message kept in a chat title
pub const CHAT_TITLE_MAX_CHARS: usize = 30;

/// Upstream chat-completion endpoint (OpenRouter)
pub const DEFAULT_UPSTREAM_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// Default HTTP API port (server)
pub const DEFAULT_HTTP_PORT: u16 = 8080;
