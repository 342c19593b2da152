//! Cryptographic utilities
//!
//! Only hashing is needed: token addresses are derived from a SHA-256 digest.

pub mod hash;

pub use hash::{sha256, sha256_hex};
