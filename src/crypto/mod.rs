//! Signature verification and, optionally, signing.

pub use self::keys::{PublicKey, PublicKeyFormat, SignatureVerificationError};
pub use self::signature::{Signature, SignatureAlgorithm};

pub mod keys;
pub mod signature;
#[cfg(any(test, feature = "softkeys"))] pub mod softsigner;
