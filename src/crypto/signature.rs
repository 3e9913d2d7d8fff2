//! Signature algorithms and operations.

use bcder::{decode, encode};
use bcder::decode::DecodeError;
use bcder::encode::PrimitiveContent;
use bcder::Oid;
use bytes::Bytes;
use crate::oid;
use super::keys::PublicKeyFormat;


//------------ SignatureAlgorithm --------------------------------------------

/// The signature algorithms supported for certificates and CRLs.
///
/// The algorithms are identified in X.509 objects through an algorithm
/// identifier:
///
/// ```txt
/// AlgorithmIdentifier          ::= SEQUENCE {
///      algorithm                   OBJECT IDENTIFIER,
///      parameters                  ANY DEFINED BY algorithm OPTIONAL }
/// ```
///
/// For the RSA PKCS #1 v1.5 algorithms of [RFC 4055], the parameters
/// should be NULL but we also accept them missing. For the ECDSA algorithms
/// of [RFC 5758], the parameters must be absent.
///
/// SHA-1 based signatures are still accepted as plenty of long-lived grid
/// CA certificates use them.
///
/// [RFC 4055]: https://tools.ietf.org/html/rfc4055
/// [RFC 5758]: https://tools.ietf.org/html/rfc5758
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SignatureAlgorithm {
    RsaSha1,
    RsaSha256,
    RsaSha384,
    RsaSha512,
    EcdsaSha256,
    EcdsaSha384,
}

impl SignatureAlgorithm {
    /// Returns the public key format for the algorithm.
    ///
    /// For ECDSA, this returns the curve that is normally paired with the
    /// hash function.
    pub fn public_key_format(self) -> PublicKeyFormat {
        match self {
            SignatureAlgorithm::EcdsaSha256 => PublicKeyFormat::EcdsaP256,
            SignatureAlgorithm::EcdsaSha384 => PublicKeyFormat::EcdsaP384,
            _ => PublicKeyFormat::Rsa,
        }
    }

    /// Takes the algorithm identifier from a DER value in X.509 signed data.
    pub fn x509_take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(Self::x509_from_constructed)
    }

    fn x509_from_constructed<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        let oid = Oid::take_from(cons)?;
        let res = if oid == oid::SHA1_WITH_RSA_ENCRYPTION {
            SignatureAlgorithm::RsaSha1
        }
        else if oid == oid::SHA256_WITH_RSA_ENCRYPTION {
            SignatureAlgorithm::RsaSha256
        }
        else if oid == oid::SHA384_WITH_RSA_ENCRYPTION {
            SignatureAlgorithm::RsaSha384
        }
        else if oid == oid::SHA512_WITH_RSA_ENCRYPTION {
            SignatureAlgorithm::RsaSha512
        }
        else if oid == oid::ECDSA_WITH_SHA256 {
            return Ok(SignatureAlgorithm::EcdsaSha256)
        }
        else if oid == oid::ECDSA_WITH_SHA384 {
            return Ok(SignatureAlgorithm::EcdsaSha384)
        }
        else {
            return Err(cons.content_err("unsupported signature algorithm"))
        };
        cons.take_opt_null()?;
        Ok(res)
    }

    /// Returns a DER encoder.
    pub fn x509_encode(self) -> impl encode::Values {
        let oid = match self {
            SignatureAlgorithm::RsaSha1 => oid::SHA1_WITH_RSA_ENCRYPTION,
            SignatureAlgorithm::RsaSha256 => oid::SHA256_WITH_RSA_ENCRYPTION,
            SignatureAlgorithm::RsaSha384 => oid::SHA384_WITH_RSA_ENCRYPTION,
            SignatureAlgorithm::RsaSha512 => oid::SHA512_WITH_RSA_ENCRYPTION,
            SignatureAlgorithm::EcdsaSha256 => oid::ECDSA_WITH_SHA256,
            SignatureAlgorithm::EcdsaSha384 => oid::ECDSA_WITH_SHA384,
        };
        let null = match self.public_key_format() {
            PublicKeyFormat::Rsa => Some(().encode()),
            _ => None,
        };
        encode::sequence((oid.encode(), null))
    }
}


//------------ Signature -----------------------------------------------------

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Signature {
    algorithm: SignatureAlgorithm,
    value: Bytes
}

impl Signature {
    pub fn new(algorithm: SignatureAlgorithm, value: Bytes) -> Self {
        Signature { algorithm, value }
    }

    pub fn algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }

    pub fn value(&self) -> &Bytes {
        &self.value
    }
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;
    use bcder::Mode;
    use bcder::encode::Values;

    #[test]
    fn algorithm_identifiers() {
        for alg in [
            SignatureAlgorithm::RsaSha1, SignatureAlgorithm::RsaSha256,
            SignatureAlgorithm::RsaSha384, SignatureAlgorithm::RsaSha512,
            SignatureAlgorithm::EcdsaSha256, SignatureAlgorithm::EcdsaSha384,
        ] {
            let der = alg.x509_encode().to_captured(Mode::Der);
            assert_eq!(
                Mode::Der.decode(
                    der.as_slice(), SignatureAlgorithm::x509_take_from
                ).unwrap(),
                alg
            );
        }
    }

    #[test]
    fn rsa_without_null() {
        // SEQUENCE { sha256WithRSAEncryption }
        let der = b"\x30\x0b\x06\x09\x2a\x86\x48\x86\xf7\x0d\x01\x01\x0b";
        assert_eq!(
            Mode::Der.decode(
                der.as_ref(), SignatureAlgorithm::x509_take_from
            ).unwrap(),
            SignatureAlgorithm::RsaSha256
        );
    }

    #[test]
    fn md5_is_rejected() {
        // SEQUENCE { md5WithRSAEncryption, NULL }
        let der = b"\x30\x0d\x06\x09\x2a\x86\x48\x86\xf7\x0d\x01\x01\x04\
                    \x05\x00";
        assert!(
            Mode::Der.decode(
                der.as_ref(), SignatureAlgorithm::x509_take_from
            ).is_err()
        );
    }
}
