//! Numeric entity identifiers.
//!
//! IDs are the SHA-256 digest of a seed with every digest byte written in
//! decimal and concatenated, so they contain digits only and vary in length.
//!
//! This is a convenience ID scheme, NOT a cryptographic commitment. It is not
//! collision-free against adversarial input and uniqueness depends entirely on
//! the timestamp entropy mixed into the seed. Do not use it for anything
//! security-sensitive.

use std::fmt::Write;

use chrono::{DateTime, SecondsFormat, Utc};
use sha2::{Digest, Sha256};

pub struct IdGenerator;

impl IdGenerator {
    /// Pure digest of the seed. Same seed, same ID.
    pub fn from_seed(seed: &str) -> String {
        let digest = Sha256::digest(seed.as_bytes());
        let mut id = String::with_capacity(digest.len() * 3);
        for byte in digest.iter() {
            // Writing to a String cannot fail
            let _ = write!(id, "{}", byte);
        }
        id
    }

    /// ID for `content` seeded with the current time at nanosecond resolution.
    pub fn generate(content: &str) -> String {
        Self::generate_at(content, Utc::now())
    }

    pub fn generate_at(content: &str, at: DateTime<Utc>) -> String {
        let seed = format!("{}{}", content, at.to_rfc3339_opts(SecondsFormat::Nanos, true));
        Self::from_seed(&seed)
    }
}

/// Whether a path segment has the shape of a generated ID.
pub fn looks_like_id(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}
