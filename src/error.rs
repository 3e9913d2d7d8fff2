//! Why a certificate path was rejected.

use std::{error, fmt};
use bcder::Oid;
use bytes::Bytes;
use crate::crypto::SignatureVerificationError;
use crate::dn::{DistinguishedName, ProxyNamingError};
use crate::namespace::NamespaceViolation;
use crate::revocation::RevocationError;
use crate::validator::ProxyType;
use crate::x509::{Serial, Time};


//------------ ErrorKind -----------------------------------------------------

/// The broad category of a rejection.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ErrorKind {
    /// The input could not be understood.
    Malformed,

    /// The path does not lead to a trusted CA.
    Untrusted,

    /// A certificate is expired or not yet valid.
    Temporal,

    /// A certificate is revoked or revocation could not be checked.
    Revocation,

    /// A certificate violates the rules for certificate paths.
    Policy,

    /// The trust store could not be maintained.
    StoreMaintenance,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match *self {
            ErrorKind::Malformed => "malformed input",
            ErrorKind::Untrusted => "untrusted",
            ErrorKind::Temporal => "outside validity period",
            ErrorKind::Revocation => "revocation",
            ErrorKind::Policy => "policy violation",
            ErrorKind::StoreMaintenance => "trust store maintenance",
        })
    }
}


//------------ ValidationError -----------------------------------------------

/// A certificate path has been rejected.
///
/// Positions are indexes into the certificate path with the leaf at
/// position 0. The path may be longer than the chain given for validation
/// if CA certificates have been added from the trust store.
#[derive(Clone, Debug, PartialEq)]
pub enum ValidationError {
    /// The chain doesn’t contain any certificates.
    EmptyChain,

    /// No trusted CA was found for the chain.
    UntrustedRoot {
        subject: DistinguishedName,
        issuer: DistinguishedName,
    },

    /// A self-signed certificate is not in the trust store.
    SelfSignedNotTrusted {
        subject: DistinguishedName,
    },

    /// A CA certificate issuing another certificate is not trusted.
    UntrustedCa {
        position: usize,
        subject: DistinguishedName,
    },

    /// A certificate has an empty subject or issuer.
    EmptyName {
        position: usize,
    },

    /// The issuer doesn’t match the subject of the next certificate.
    IssuerMismatch {
        position: usize,
        issuer: DistinguishedName,
        signer: DistinguishedName,
    },

    /// The signature of a certificate doesn’t verify.
    BadSignature {
        position: usize,
        subject: DistinguishedName,
        err: SignatureVerificationError,
    },

    /// A certificate has expired.
    Expired {
        position: usize,
        subject: DistinguishedName,
        not_after: Time,
    },

    /// A certificate isn’t valid yet.
    NotYetValid {
        position: usize,
        subject: DistinguishedName,
        not_before: Time,
    },

    /// A CA certificate exceeds the path length of a superior CA.
    PathLenExceeded {
        position: usize,
        subject: DistinguishedName,
        limited_by: DistinguishedName,
    },

    /// A certificate issued by a non-CA has the CA flag.
    CaAfterNonCa {
        position: usize,
        subject: DistinguishedName,
    },

    /// A certificate issued by a non-CA is no proxy certificate.
    UnrecognizedProxyType {
        position: usize,
        subject: DistinguishedName,
    },

    /// A proxy certificate is of a different type than its issuer.
    ProxyTypeMismatch {
        position: usize,
        subject: DistinguishedName,
        expected: ProxyType,
        found: ProxyType,
    },

    /// The subject of a proxy certificate is not properly named.
    ProxyNaming {
        position: usize,
        subject: DistinguishedName,
        err: ProxyNamingError,
    },

    /// The subject of a proxy isn’t derived from its issuer’s subject.
    ProxySubjectMismatch {
        position: usize,
        subject: DistinguishedName,
        issuer: DistinguishedName,
    },

    /// A proxy certificate exceeds the path length of a superior proxy.
    ProxyPathLenExceeded {
        position: usize,
        subject: DistinguishedName,
        limited_by: DistinguishedName,
    },

    /// A proxy certificate’s key usage doesn’t allow digital signatures.
    MissingDigitalSignature {
        position: usize,
        subject: DistinguishedName,
    },

    /// A CA certificate’s key usage doesn’t allow certificate signing.
    MissingKeyCertSign {
        position: usize,
        subject: DistinguishedName,
    },

    /// A certificate has a critical extension we don’t support.
    UnsupportedCriticalExtension {
        position: usize,
        subject: DistinguishedName,
        oid: Oid<Bytes>,
    },

    /// A certificate’s subject is outside the namespace of its CA.
    Namespace {
        position: usize,
        subject: DistinguishedName,
        ca: DistinguishedName,
        err: NamespaceViolation,
    },

    /// Revocation checking is required but the CA has no checker.
    NoRevocationChecker {
        position: usize,
        ca: DistinguishedName,
    },

    /// A certificate has been revoked.
    Revoked {
        position: usize,
        subject: DistinguishedName,
        serial: Serial,
        date: Time,
    },

    /// The revocation status of a certificate could not be determined.
    RevocationUnavailable {
        position: usize,
        subject: DistinguishedName,
        err: RevocationError,
    },
}

impl ValidationError {
    /// Returns the category of the error.
    pub fn kind(&self) -> ErrorKind {
        use self::ValidationError::*;

        match *self {
            EmptyChain | EmptyName { .. } => ErrorKind::Malformed,
            UntrustedRoot { .. } | SelfSignedNotTrusted { .. }
            | UntrustedCa { .. } | IssuerMismatch { .. }
            | BadSignature { .. } => ErrorKind::Untrusted,
            Expired { .. } | NotYetValid { .. } => ErrorKind::Temporal,
            NoRevocationChecker { .. } | Revoked { .. }
            | RevocationUnavailable { .. } => ErrorKind::Revocation,
            PathLenExceeded { .. } | CaAfterNonCa { .. }
            | UnrecognizedProxyType { .. } | ProxyTypeMismatch { .. }
            | ProxyNaming { .. } | ProxySubjectMismatch { .. }
            | ProxyPathLenExceeded { .. } | MissingDigitalSignature { .. }
            | MissingKeyCertSign { .. }
            | UnsupportedCriticalExtension { .. }
            | Namespace { .. } => ErrorKind::Policy,
        }
    }

    /// Returns the position of the offending certificate if known.
    pub fn position(&self) -> Option<usize> {
        use self::ValidationError::*;

        match *self {
            EmptyChain | UntrustedRoot { .. }
            | SelfSignedNotTrusted { .. } => None,
            UntrustedCa { position, .. }
            | EmptyName { position }
            | IssuerMismatch { position, .. }
            | BadSignature { position, .. }
            | Expired { position, .. }
            | NotYetValid { position, .. }
            | PathLenExceeded { position, .. }
            | CaAfterNonCa { position, .. }
            | UnrecognizedProxyType { position, .. }
            | ProxyTypeMismatch { position, .. }
            | ProxyNaming { position, .. }
            | ProxySubjectMismatch { position, .. }
            | ProxyPathLenExceeded { position, .. }
            | MissingDigitalSignature { position, .. }
            | MissingKeyCertSign { position, .. }
            | UnsupportedCriticalExtension { position, .. }
            | Namespace { position, .. }
            | NoRevocationChecker { position, .. }
            | Revoked { position, .. }
            | RevocationUnavailable { position, .. } => Some(position),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use self::ValidationError::*;

        match *self {
            EmptyChain => f.write_str("empty certificate chain"),
            UntrustedRoot { ref subject, ref issuer } => {
                write!(
                    f, "untrusted root: no trusted CA '{}' found for '{}'",
                    issuer, subject
                )
            }
            SelfSignedNotTrusted { ref subject } => {
                write!(
                    f, "untrusted root: self-signed certificate '{}' \
                        is not in the trust store",
                    subject
                )
            }
            UntrustedCa { position, ref subject } => {
                write!(
                    f, "CA certificate '{}' at position {} is not trusted",
                    subject, position
                )
            }
            EmptyName { position } => {
                write!(
                    f, "certificate at position {} has an empty subject \
                        or issuer",
                    position
                )
            }
            IssuerMismatch { position, ref issuer, ref signer } => {
                write!(
                    f, "issuer '{}' of certificate at position {} does not \
                        match subject '{}' of the next certificate",
                    issuer, position, signer
                )
            }
            BadSignature { position, ref subject, err } => {
                write!(
                    f, "signature of certificate '{}' at position {}: {}",
                    subject, position, err
                )
            }
            Expired { position, ref subject, not_after } => {
                write!(
                    f, "certificate '{}' at position {} expired at {}",
                    subject, position, not_after
                )
            }
            NotYetValid { position, ref subject, not_before } => {
                write!(
                    f, "certificate '{}' at position {} not valid before {}",
                    subject, position, not_before
                )
            }
            PathLenExceeded { position, ref subject, ref limited_by } => {
                write!(
                    f, "CA certificate '{}' at position {} exceeds the path \
                        length allowed by '{}'",
                    subject, position, limited_by
                )
            }
            CaAfterNonCa { position, ref subject } => {
                write!(
                    f, "certificate '{}' at position {} is issued by a \
                        non-CA and not allowed to have CA flag",
                    subject, position
                )
            }
            UnrecognizedProxyType { position, ref subject } => {
                write!(
                    f, "certificate '{}' at position {} is issued by a \
                        non-CA and of unrecognized proxy type",
                    subject, position
                )
            }
            ProxyTypeMismatch { position, ref subject, expected, found } => {
                write!(
                    f, "proxy certificate '{}' at position {} is of \
                        different type {} than its issuer ({})",
                    subject, position, found, expected
                )
            }
            ProxyNaming { position, ref subject, ref err } => {
                write!(
                    f, "proxy certificate '{}' at position {}: {}",
                    subject, position, err
                )
            }
            ProxySubjectMismatch { position, ref subject, ref issuer } => {
                write!(
                    f, "subject '{}' of proxy certificate at position {} is \
                        not derived from its issuer '{}'",
                    subject, position, issuer
                )
            }
            ProxyPathLenExceeded { position, ref subject, ref limited_by } => {
                write!(
                    f, "proxy certificate '{}' at position {} exceeds the \
                        proxy path length allowed by '{}'",
                    subject, position, limited_by
                )
            }
            MissingDigitalSignature { position, ref subject } => {
                write!(
                    f, "proxy certificate '{}' at position {} has key usage \
                        without digital signature",
                    subject, position
                )
            }
            MissingKeyCertSign { position, ref subject } => {
                write!(
                    f, "CA certificate '{}' at position {} has key usage \
                        without certificate signing",
                    subject, position
                )
            }
            UnsupportedCriticalExtension {
                position, ref subject, ref oid
            } => {
                write!(
                    f, "certificate '{}' at position {} has unsupported \
                        critical extension {}",
                    subject, position, oid
                )
            }
            Namespace { position, ref subject, ref ca, ref err } => {
                write!(
                    f, "certificate '{}' at position {} violates namespace \
                        of CA '{}': {}",
                    subject, position, ca, err
                )
            }
            NoRevocationChecker { position, ref ca } => {
                write!(
                    f, "no revocation information for CA '{}' at \
                        position {}",
                    ca, position
                )
            }
            Revoked { position, ref subject, ref serial, date } => {
                write!(
                    f, "certificate '{}' at position {} with serial {} \
                        was revoked at {}",
                    subject, position, serial, date
                )
            }
            RevocationUnavailable { position, ref subject, ref err } => {
                write!(
                    f, "cannot check revocation of certificate '{}' at \
                        position {}: {}",
                    subject, position, err
                )
            }
        }
    }
}

impl error::Error for ValidationError { }


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn kinds_and_positions() {
        let subject: DistinguishedName = "CN=Alice".parse().unwrap();
        let err = ValidationError::Expired {
            position: 1, subject: subject.clone(), not_after: Time::now()
        };
        assert_eq!(err.kind(), ErrorKind::Temporal);
        assert_eq!(err.position(), Some(1));
        assert!(err.to_string().contains("'CN=Alice' at position 1 expired"));

        let err = ValidationError::SelfSignedNotTrusted { subject };
        assert_eq!(err.kind(), ErrorKind::Untrusted);
        assert_eq!(err.position(), None);
        assert!(err.to_string().starts_with("untrusted root"));

        assert_eq!(ValidationError::EmptyChain.kind(), ErrorKind::Malformed);
    }
}
