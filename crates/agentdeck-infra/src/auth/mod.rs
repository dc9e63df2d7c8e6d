//! Bearer-token signing and verification.

pub mod jwt;
