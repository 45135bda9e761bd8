//! Authentication module
//!
//! OAuth code/token lifecycle for the Stack Exchange API, built on the
//! run's key/value cache.

mod session;

pub use session::{
    extract_code, OAuthSession, ACCESS_TOKEN_CACHE_KEY, CODE_CACHE_KEY, SCOPE, SESSION_TTL,
};
