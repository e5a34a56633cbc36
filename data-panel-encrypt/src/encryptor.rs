//! The encryption capability the rewrite depends on.
//!
//! Algorithms live outside of this crate. Rewriting only needs to call them,
//! so they are seen through two traits: every encryptor can `encrypt` and
//! `decrypt`, and some of them can additionally produce assisted query
//! tokens, which is probed with [`Encryptor::assisted_query`].

use crate::statement::value::Value;
use crate::Result;

pub trait Encryptor: Send + Sync {
    /// Encrypts a plain value. May be non-deterministic.
    fn encrypt(&self, plain: &Value) -> Result<Value>;

    fn decrypt(&self, cipher: &Value) -> Result<Value>;

    /// The assisted query capability, if this encryptor has one.
    fn assisted_query(&self) -> Option<&dyn AssistedQueryEncryptor> {
        None
    }
}

/// Produces tokens for the assisted query column.
///
/// Implementations must be deterministic: equal inputs give equal tokens, so
/// equality and `IN` lookups keep working without decrypting anything. Nothing
/// more is assumed; in particular tokens are not assumed collision free.
pub trait AssistedQueryEncryptor: Send + Sync {
    fn assisted_encrypt(&self, plain: &Value) -> Result<Value>;
}
