//! Types and parameters of keys.

use std::{error, fmt};
use bcder::{decode, encode};
use bcder::{BitString, Mode, Oid};
use bcder::decode::{DecodeError, IntoSource, Source};
use bcder::encode::{PrimitiveContent, Values};
use bytes::Bytes;
use ring::signature;
use ring::signature::VerificationAlgorithm;
use crate::oid;
use super::signature::{Signature, SignatureAlgorithm};


//------------ PublicKeyFormat -----------------------------------------------

/// The formats of public keys we can verify signatures with.
///
/// Grid CAs and end entities overwhelmingly use RSA keys. Some newer CAs
/// have moved to ECDSA with the NIST curves, so P-256 and P-384 keys are
/// supported as well.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum PublicKeyFormat {
    /// An RSA public key.
    Rsa,

    /// An ECDSA public key for the P-256 elliptic curve.
    EcdsaP256,

    /// An ECDSA public key for the P-384 elliptic curve.
    EcdsaP384,
}

/// # ASN.1 Algorithm Identifiers
///
/// The format of the public key is identified in certificates through a
/// algorithm identifier defined with this ASN.1:
///
/// ```txt
/// AlgorithmIdentifier ::= SEQUENCE {
///      algorithm          OBJECT IDENTIFIER,
///      parameters         ANY DEFINED BY algorithm OPTIONAL }
/// ```
///
/// For RSA keys, the object identifier needs to be that of `rsaEncryption`
/// defined by [RFC 4055] and the parameters must be present and NULL.
/// When parsing, we generously also allow it to be absent altogether.
///
/// For ECDSA keys, the object identifer needs to be `ecPublicKey` defined
/// in [RFC 5480] with the parameter being the object identifier of a
/// named curve, either `secp256r1` or `secp384r1`.
///
/// [RFC 4055]: https://tools.ietf.org/html/rfc4055
/// [RFC 5480]: https://tools.ietf.org/html/rfc5480
impl PublicKeyFormat {
    /// Takes and returns a algorithm identifier.
    ///
    /// Returns a malformed error if the algorithm isn’t one of the allowed
    /// algorithms or if the value isn’t correctly encoded.
    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(Self::from_constructed)
    }

    /// Parses the algorithm identifier from the contents of its sequence.
    fn from_constructed<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        let alg = Oid::take_from(cons)?;
        if alg == oid::RSA_ENCRYPTION {
            cons.take_opt_null()?;
            Ok(PublicKeyFormat::Rsa)
        }
        else if alg == oid::EC_PUBLIC_KEY {
            let curve = Oid::take_from(cons)?;
            if curve == oid::SECP256R1 {
                Ok(PublicKeyFormat::EcdsaP256)
            }
            else if curve == oid::SECP384R1 {
                Ok(PublicKeyFormat::EcdsaP384)
            }
            else {
                Err(cons.content_err("unsupported elliptic curve"))
            }
        }
        else {
            Err(cons.content_err("unsupported public key algorithm"))
        }
    }

    /// Provides an encoder for the algorihm identifier.
    pub fn encode(self) -> impl encode::Values {
        match self {
            PublicKeyFormat::Rsa => {
                encode::Choice2::One(
                    encode::sequence((
                        oid::RSA_ENCRYPTION.encode(),
                        ().encode(),
                    ))
                )
            }
            PublicKeyFormat::EcdsaP256 => {
                encode::Choice2::Two(
                    encode::sequence((
                        oid::EC_PUBLIC_KEY.encode(),
                        oid::SECP256R1.encode(),
                    ))
                )
            }
            PublicKeyFormat::EcdsaP384 => {
                encode::Choice2::Two(
                    encode::sequence((
                        oid::EC_PUBLIC_KEY.encode(),
                        oid::SECP384R1.encode(),
                    ))
                )
            }
        }
    }
}


//------------ PublicKey -----------------------------------------------------

/// A public key.
///
/// Two keys are equal if both their format and their bits are equal. This
/// is what is used to match a certificate against a trust anchor.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PublicKey {
    algorithm: PublicKeyFormat,
    bits: BitString,
}

impl PublicKey {
    pub fn algorithm(&self) -> PublicKeyFormat {
        self.algorithm
    }

    /// Returns the content of the subject public key bit string.
    ///
    /// For RSA keys, this is the DER encoded `RSAPublicKey`, for ECDSA keys
    /// the uncompressed curve point.
    pub fn bits(&self) -> &[u8] {
        self.bits.octet_slice().unwrap_or(&[])
    }

    /// Verifies a signature using this public key.
    pub fn verify(
        &self, message: &[u8], signature: &Signature
    ) -> Result<(), SignatureVerificationError> {
        let alg: &'static dyn VerificationAlgorithm = match (
            self.algorithm, signature.algorithm()
        ) {
            (PublicKeyFormat::Rsa, SignatureAlgorithm::RsaSha1) => {
                &signature::RSA_PKCS1_1024_8192_SHA1_FOR_LEGACY_USE_ONLY
            }
            (PublicKeyFormat::Rsa, SignatureAlgorithm::RsaSha256) => {
                &signature::RSA_PKCS1_1024_8192_SHA256_FOR_LEGACY_USE_ONLY
            }
            (PublicKeyFormat::Rsa, SignatureAlgorithm::RsaSha384) => {
                &signature::RSA_PKCS1_2048_8192_SHA384
            }
            (PublicKeyFormat::Rsa, SignatureAlgorithm::RsaSha512) => {
                &signature::RSA_PKCS1_1024_8192_SHA512_FOR_LEGACY_USE_ONLY
            }
            (PublicKeyFormat::EcdsaP256, SignatureAlgorithm::EcdsaSha256) => {
                &signature::ECDSA_P256_SHA256_ASN1
            }
            (PublicKeyFormat::EcdsaP256, SignatureAlgorithm::EcdsaSha384) => {
                &signature::ECDSA_P256_SHA384_ASN1
            }
            (PublicKeyFormat::EcdsaP384, SignatureAlgorithm::EcdsaSha256) => {
                &signature::ECDSA_P384_SHA256_ASN1
            }
            (PublicKeyFormat::EcdsaP384, SignatureAlgorithm::EcdsaSha384) => {
                &signature::ECDSA_P384_SHA384_ASN1
            }
            _ => return Err(SignatureVerificationError::AlgorithmMismatch)
        };
        signature::UnparsedPublicKey::new(alg, self.bits()).verify(
            message, signature.value().as_ref()
        ).map_err(|_| SignatureVerificationError::BadSignature)
    }
}


/// # As `SubjectPublicKeyInfo`
///
/// Public keys are included in X.509 certificates as `SubjectPublicKeyInfo`
/// structures. As these are contain the same information as `PublicKey`,
/// it can be decoded from and encoded to such sequences.
impl PublicKey {
    pub fn decode<S: IntoSource>(
        source: S
    ) -> Result<Self, DecodeError<<S::Source as Source>::Error>> {
        Mode::Der.decode(source, Self::take_from)
    }

    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            Ok(PublicKey {
                algorithm: PublicKeyFormat::take_from(cons)?,
                bits: BitString::take_from(cons)?
            })
        })
    }

    pub fn encode_ref(&self) -> impl encode::Values + '_ {
        encode::sequence((
            self.algorithm.encode(),
            self.bits.encode_ref()
        ))
    }

    /// Returns a bytes values of the encoded the *subjectPublicKeyInfo*.
    pub fn to_info_bytes(&self) -> Bytes {
        self.encode_ref().to_captured(Mode::Der).into_bytes()
    }
}


//------------ SignatureVerificationError ------------------------------------

/// Verification of a signature has failed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SignatureVerificationError {
    /// The signature algorithm doesn’t fit the key.
    AlgorithmMismatch,

    /// The signature is not valid.
    BadSignature,
}

impl fmt::Display for SignatureVerificationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match *self {
            SignatureVerificationError::AlgorithmMismatch => {
                "signature algorithm does not match public key"
            }
            SignatureVerificationError::BadSignature => {
                "signature verification failed"
            }
        })
    }
}

impl error::Error for SignatureVerificationError { }


//============ Tests =========================================================
