//! Credential slots for the upstream match API.
//!
//! The upstream binds opaque player identity tokens to a specific
//! credential, so identity-scoped lookups must always use the same key (the
//! *primary*, slot 0). Resource-scoped lookups accept any key, so those
//! rotate round-robin to multiply aggregate throughput.

use std::sync::atomic::{AtomicUsize, Ordering};

use secrecy::SecretString;

use crate::error::{ClientError, Result};

/// Ring of API credentials with a wrapping rotation cursor.
#[derive(Debug)]
pub struct KeyRing {
    keys: Vec<SecretString>,
    cursor: AtomicUsize,
}

impl KeyRing {
    /// Build a ring from at least one key. Key 0 becomes the primary
    /// (identity-bound) credential.
    pub fn new(keys: Vec<SecretString>) -> Result<Self> {
        if keys.is_empty() {
            return Err(ClientError::NoApiKeys);
        }
        Ok(Self {
            keys,
            cursor: AtomicUsize::new(0),
        })
    }

    /// Number of credentials in the ring.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// The identity-bound credential.
    pub fn primary(&self) -> &SecretString {
        &self.keys[0]
    }

    /// The credential owning the given limiter slot.
    pub fn slot(&self, idx: usize) -> &SecretString {
        &self.keys[idx % self.keys.len()]
    }

    /// Next credential under round-robin rotation.
    pub fn next_rotating(&self) -> &SecretString {
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed) % self.keys.len();
        &self.keys[idx]
    }
}
