//! Salted password digests.
//!
//! Encoded as `blake3$<salt>$<hex digest>`. The salt is a random UUID in
//! simple form; verification recomputes the digest and compares in constant
//! time via [`blake3::Hash`]'s `PartialEq`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

const SCHEME: &str = "blake3";

// Digest of a random secret nobody knows.
static DECOY: LazyLock<PasswordHash> =
    LazyLock::new(|| PasswordHash::digest(&uuid::Uuid::new_v4().to_string()));

/// A stored password digest. Never holds the plaintext.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Hashes `password` with a fresh random salt.
    pub fn digest(password: &str) -> Self {
        let salt = uuid::Uuid::new_v4().simple().to_string();
        let hash = compute(&salt, password);
        Self(format!("{SCHEME}${salt}${}", hash.to_hex()))
    }

    /// Returns `true` if `password` matches this digest.
    ///
    /// Malformed digests never verify.
    pub fn verify(&self, password: &str) -> bool {
        let mut parts = self.0.splitn(3, '$');
        let (Some(scheme), Some(salt), Some(hex)) = (parts.next(), parts.next(), parts.next())
        else {
            return false;
        };
        if scheme != SCHEME {
            return false;
        }
        match blake3::Hash::from_hex(hex) {
            Ok(expected) => compute(salt, password) == expected,
            Err(_) => false,
        }
    }

    /// A well-formed digest that no password verifies against.
    ///
    /// Login paths verify against it when the account does not exist, so
    /// an unknown email costs the same work as a wrong password.
    pub fn decoy() -> &'static PasswordHash {
        &DECOY
    }

    /// Returns the encoded digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn compute(salt: &str, password: &str) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(salt.as_bytes());
    hasher.update(b"$");
    hasher.update(password.as_bytes());
    hasher.finalize()
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordHash(..)")
    }
}
