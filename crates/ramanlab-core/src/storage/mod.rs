//! Durable key-value storage for session state.
//!
//! The session core only needs three string keys that survive process
//! restarts. Backends:
//! - `MemoryStore`: process-local map, used by tests and ephemeral shells
//! - `FileStore`: JSON file in the user's data directory (default)
//! - `KeychainStore`: OS keychain entries via `keyring`
//!
//! Individual `get`/`set`/`remove` calls are atomic per key. Multi-key
//! consistency is the caller's job (see `SessionStore`).

pub mod file;
pub mod keychain;
pub mod memory;

use anyhow::Result;

pub use file::FileStore;
pub use keychain::KeychainStore;
pub use memory::MemoryStore;

/// Key holding the bearer access token.
pub const ACCESS_TOKEN_KEY: &str = "access_token";

/// Key holding the refresh token. Written and cleared with the access token.
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Key holding the JSON-serialized user profile.
pub const USER_INFO_KEY: &str = "user_info";

/// All keys owned by the session, in write order.
pub const SESSION_KEYS: [&str; 3] = [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_INFO_KEY];

/// Minimal get/set/remove interface over a persistent store.
pub trait KeyValueStore: Send + Sync {
    /// Read a value, `None` if the key is absent.
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a key. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}
