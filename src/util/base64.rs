//! Handling of Base 64-encoded data.
//!
//! This module provides the flavor of Base 64 used by this crate. It is a
//! struct describing how Base 64 is used within a certain context, so you
//! don’t have to remember the engine configuration but just pick the
//! flavor.

use base64::Engine;
use base64::engine::general_purpose::{
    GeneralPurpose, GeneralPurposeConfig,
};
use base64::engine::DecodePaddingMode;

pub use base64::DecodeError;


//------------ Pem -----------------------------------------------------------

/// The flavor used inside PEM armor.
///
/// This uses the standard alphabet. When decoding, line breaks and other
/// white space are skipped and padding is optional. When encoding, padding
/// is added and no white space.
pub struct Pem;

impl Pem {
    const ENGINE: GeneralPurpose = GeneralPurpose::new(
        &base64::alphabet::STANDARD,
        GeneralPurposeConfig::new()
            .with_decode_padding_mode(DecodePaddingMode::Indifferent)
    );

    pub fn decode(self, input: &str) -> Result<Vec<u8>, DecodeError> {
        let input: String = input.chars().filter(|ch| {
            !ch.is_ascii_whitespace()
        }).collect();
        Self::ENGINE.decode(input)
    }

    pub fn encode(self, data: &[u8]) -> String {
        Self::ENGINE.encode(data)
    }
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn pem_skips_white_space() {
        assert_eq!(
            Pem.decode("Zm9v\nYmFy\r\n").unwrap(),
            b"foobar"
        );
        assert_eq!(Pem.decode("Zm9vYg").unwrap(), b"foob");
        assert_eq!(Pem.decode("Zm9vYg==").unwrap(), b"foob");
        assert!(Pem.decode("Zm9v*").is_err());
    }

    #[test]
    fn pem_encode() {
        assert_eq!(Pem.encode(b"foob"), "Zm9vYg==");
    }
}
