//! Reddit OAuth password-grant authentication
//!
//! Exchanges a username/password plus script-app client credentials for a
//! bearer token and caches the token on disk until it expires.
//!
//! Token flow:
//! 1. `TokenProvider::get_token()` loads the `TokenCache`
//! 2. An unexpired `CachedToken` is returned without touching the network
//! 3. Otherwise `token::password_grant()` fetches a new token
//! 4. The new token is written back through `TokenCache::store()`

pub mod cache;
pub mod constants;
pub mod credentials;
pub mod error;
pub mod provider;
pub mod token;

pub use cache::{CACHE_SCHEMA_VERSION, CachedToken, TokenCache, now_millis};
pub use constants::*;
pub use credentials::Credentials;
pub use error::{Error, Result};
pub use provider::TokenProvider;
pub use token::{TokenResponse, password_grant};
