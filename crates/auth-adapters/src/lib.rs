//! # auth-adapters
//!
//! Credential hashing and token issuing for the forum.

pub mod password;

#[cfg(feature = "auth-jwt")]
pub mod jwt;

pub use password::Argon2Hasher;

#[cfg(feature = "auth-jwt")]
pub use jwt::{Claims, JwtIssuer};
