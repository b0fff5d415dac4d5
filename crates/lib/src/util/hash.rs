//! Content digests for assembled features.
//!
//! - `ObjectHash`: a truncated hex digest for display and file naming
//! - `ContentHash`: the full SHA-256 digest for equality checks

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::consts::DIGEST_PREFIX_LEN;

pub type HashError = serde_json::Error;

/// A truncated SHA-256 digest of a value's JSON serialization.
///
/// The hash is a lowercase hexadecimal string of [`DIGEST_PREFIX_LEN`] characters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectHash(pub String);

impl std::fmt::Display for ObjectHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// A full 64-character SHA-256 digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl std::fmt::Display for ContentHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl ContentHash {
  /// The display-length prefix of this digest.
  pub fn short(&self) -> ObjectHash {
    ObjectHash(self.0[..DIGEST_PREFIX_LEN.min(self.0.len())].to_string())
  }
}

/// Types whose canonical JSON serialization can be digested.
///
/// Only types serializing through ordered containers give stable digests.
pub trait Hashable: Serialize {
  fn content_hash(&self) -> Result<ContentHash, HashError> {
    let serialized = serde_json::to_vec(self)?;
    Ok(hash_bytes(&serialized))
  }

  fn compute_hash(&self) -> Result<ObjectHash, HashError> {
    Ok(self.content_hash()?.short())
  }
}

/// Hash arbitrary bytes.
pub fn hash_bytes(data: &[u8]) -> ContentHash {
  let mut hasher = Sha256::new();
  hasher.update(data);
  ContentHash(hex::encode(hasher.finalize()))
}
