//! Certificate Revocation Lists.
//!
//! Grid CAs publish their CRLs next to their certificates in the trust
//! directory. This module implements the CRLs themselves via the type
//! [`Crl`]. Before a CRL can be used to check the status of certificates,
//! it needs to be accepted for its CA via [`Crl::verify_for_ca`]. This
//! checks the issuer and signature and rejects CRLs that only cover part
//! of the certificates issued by the CA.
//!
//! [`Crl`]: struct.Crl.html
//! [`Crl::verify_for_ca`]: struct.Crl.html#method.verify_for_ca

use std::{error, fmt, fs, io};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use bcder::decode;
use bcder::{Mode, OctetString, Oid, Tag};
use bcder::decode::{DecodeError, IntoSource, Source};
use bytes::Bytes;
use crate::oid;
use crate::cert::Cert;
use crate::crypto::{
    PublicKey, SignatureAlgorithm, SignatureVerificationError,
};
use crate::dn::DistinguishedName;
use crate::util::pem;
use crate::x509::{Serial, SignedData, Time, ValidityPeriodError};


//------------ Crl -----------------------------------------------------------

/// A certificate revocation list.
///
/// Both version 1 and version 2 CRLs are supported. The serial numbers of
/// the revoked certificates are collected into a set during decoding so
/// that looking up a certificate is cheap.
#[derive(Clone, Debug)]
pub struct Crl {
    /// The outer structure of the CRL.
    signed_data: SignedData,

    /// The algorithm used for signing the CRL.
    signature: SignatureAlgorithm,

    /// The name of the issuer.
    issuer: DistinguishedName,

    /// The time this version of the CRL was created.
    this_update: Time,

    /// The time the next version of the CRL is likely to be created.
    next_update: Option<Time>,

    /// The list of revoked certificates.
    revoked_certs: RevokedCertificates,

    /// The CRL extensions.
    extensions: Extensions,
}

/// # Decoding
///
impl Crl {
    /// Parses a source as a certificate revocation list.
    pub fn decode<S: IntoSource>(
        source: S
    ) -> Result<Self, DecodeError<<S::Source as Source>::Error>> {
        Mode::Der.decode(source, Self::take_from)
    }

    /// Takes an encoded CRL from the beginning of a constructed value.
    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(Self::from_constructed)
    }

    /// Parses the content of a certificate revocation list.
    ///
    /// ```txt
    /// TBSCertList  ::=  SEQUENCE  {
    ///      version                 Version OPTIONAL,
    ///      signature               AlgorithmIdentifier,
    ///      issuer                  Name,
    ///      thisUpdate              Time,
    ///      nextUpdate              Time OPTIONAL,
    ///      revokedCertificates     SEQUENCE OF SEQUENCE  { ... } OPTIONAL,
    ///      crlExtensions           [0]  EXPLICIT Extensions OPTIONAL
    /// }
    /// ```
    pub fn from_constructed<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        let signed_data = SignedData::from_constructed(cons)?;

        signed_data.data().clone().decode(|cons| {
            cons.take_sequence(|cons| {
                if let Some(version) = cons.take_opt_u8()? {
                    if version > 1 {
                        return Err(cons.content_err("unknown CRL version"))
                    }
                }
                Ok(Crl {
                    signature: SignatureAlgorithm::x509_take_from(cons)?,
                    issuer: DistinguishedName::take_from(cons)?,
                    this_update: Time::take_from(cons)?,
                    next_update: Time::take_opt_from(cons)?,
                    revoked_certs: RevokedCertificates::take_from(cons)?,
                    extensions: cons.take_opt_constructed_if(
                        Tag::CTX_0,
                        Extensions::take_from
                    )?.unwrap_or_default(),
                    signed_data,
                })
            })
        }).map_err(DecodeError::convert)
    }

    /// Decodes a CRL from data in either PEM or DER format.
    pub fn from_pem_or_der(data: Bytes) -> Result<Self, CrlError> {
        let der = pem::der_or_pem(data, "X509 CRL")?;
        Self::decode(der).map_err(|err| CrlError::Decode(err.to_string()))
    }

    /// Loads a CRL from a file in either PEM or DER format.
    pub fn load(path: &Path) -> Result<Self, CrlError> {
        Self::from_pem_or_der(fs::read(path)?.into())
    }
}

/// # Data Access
///
impl Crl {
    pub fn signature_algorithm(&self) -> SignatureAlgorithm {
        self.signature
    }

    pub fn issuer(&self) -> &DistinguishedName {
        &self.issuer
    }

    pub fn this_update(&self) -> Time {
        self.this_update
    }

    pub fn next_update(&self) -> Option<Time> {
        self.next_update
    }

    pub fn revoked_certs(&self) -> &RevokedCertificates {
        &self.revoked_certs
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    /// Returns whether the given serial number is on this revocation list.
    pub fn contains(&self, serial: &Serial) -> bool {
        self.revoked_certs.contains(serial)
    }
}

/// # Verification
///
impl Crl {
    /// Verifies the signature of the CRL against a public key.
    pub fn verify_signature(
        &self, public_key: &PublicKey
    ) -> Result<(), SignatureVerificationError> {
        if self.signature != self.signed_data.signature().algorithm() {
            return Err(SignatureVerificationError::AlgorithmMismatch)
        }
        self.signed_data.verify_signature(public_key)
    }

    /// Verifies that the CRL is a complete CRL we can work with.
    ///
    /// Every critical extension needs to be understood. Delta CRLs are not
    /// supported. An issuing distribution point that restricts the CRL to
    /// some revocation reasons or to attribute certificates means that
    /// the CRL doesn’t cover all certificates of the CA and it is rejected.
    pub fn verify_complete(&self) -> Result<(), CrlError> {
        if self.extensions.delta_crl_critical {
            return Err(CrlError::DeltaCrl)
        }
        if let Some(idp) = self.extensions.issuing_distribution_point {
            if idp.critical {
                if idp.only_some_reasons {
                    return Err(CrlError::OnlySomeReasons)
                }
                if idp.only_attribute_certs {
                    return Err(CrlError::OnlyAttributeCerts)
                }
            }
        }
        if let Some(id) = self.extensions.unsupported_critical.first() {
            return Err(CrlError::UnsupportedCriticalExtension(id.clone()))
        }
        Ok(())
    }

    /// Verifies that the CRL has been issued by the given CA.
    ///
    /// Checks that the issuer of the CRL is the subject of the CA, that
    /// the signature verifies with the CA’s key and that the CRL is
    /// complete as defined by [`verify_complete`].
    ///
    /// [`verify_complete`]: #method.verify_complete
    pub fn verify_for_ca(&self, ca: &Cert) -> Result<(), CrlError> {
        if self.issuer != *ca.subject() {
            return Err(CrlError::IssuerMismatch {
                crl: self.issuer.clone(),
                ca: ca.subject().clone(),
            })
        }
        self.verify_signature(
            ca.subject_public_key_info()
        ).map_err(CrlError::BadSignature)?;
        self.verify_complete()
    }

    /// Verifies that the CRL is current at the given time.
    ///
    /// A CRL without a next update time never expires.
    pub fn verify_validity_at(
        &self, now: Time
    ) -> Result<(), ValidityPeriodError> {
        self.this_update.verify_not_before(now)?;
        if let Some(next_update) = self.next_update {
            next_update.verify_not_after(now)?;
        }
        Ok(())
    }
}


//------------ RevokedCertificates -------------------------------------------

/// The list of revoked certificates.
#[derive(Clone, Debug, Default)]
pub struct RevokedCertificates {
    /// The entries in the order they appear in the CRL.
    entries: Vec<CrlEntry>,

    /// The index of the entry for each serial number.
    serials: HashMap<Serial, usize>,
}

impl RevokedCertificates {
    /// Takes a revoked certificates list from the beginning of a value.
    ///
    /// The list is optional and is empty if missing.
    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        let mut res = RevokedCertificates::default();
        cons.take_opt_sequence(|cons| {
            while let Some(entry) = CrlEntry::take_opt_from(cons)? {
                res.serials.entry(
                    entry.user_certificate.clone()
                ).or_insert(res.entries.len());
                res.entries.push(entry);
            }
            Ok(())
        })?;
        Ok(res)
    }

    /// Returns whether the given serial number is contained on this list.
    pub fn contains(&self, serial: &Serial) -> bool {
        self.serials.contains_key(serial)
    }

    /// Returns the entry for the given serial number.
    ///
    /// If the serial appears more than once, returns the first entry.
    pub fn get(&self, serial: &Serial) -> Option<&CrlEntry> {
        self.serials.get(serial).and_then(|&idx| self.entries.get(idx))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns an iterator over the entries in the list.
    pub fn iter(&self) -> impl Iterator<Item = &CrlEntry> {
        self.entries.iter()
    }
}


//------------ CrlEntry ------------------------------------------------------

/// An entry in the revoked certificates list.
#[derive(Clone, Debug)]
pub struct CrlEntry {
    /// The serial number of the revoked certificate.
    user_certificate: Serial,

    /// The time of revocation.
    revocation_date: Time,

    /// The reason code if present.
    reason: Option<u8>,
}

impl CrlEntry {
    pub fn user_certificate(&self) -> &Serial {
        &self.user_certificate
    }

    pub fn revocation_date(&self) -> Time {
        self.revocation_date
    }

    pub fn reason(&self) -> Option<u8> {
        self.reason
    }

    /// Takes an optional CRL entry from the beginning of a contructed value.
    pub fn take_opt_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Option<Self>, DecodeError<S::Error>> {
        cons.take_opt_sequence(Self::from_constructed)
    }

    /// Parses the content of a CRL entry.
    ///
    /// Of the entry extensions, only the reason code is looked at.
    pub fn from_constructed<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        let user_certificate = Serial::take_from(cons)?;
        let revocation_date = Time::take_from(cons)?;
        let mut reason = None;
        cons.take_opt_sequence(|cons| {
            while let Some(()) = cons.take_opt_sequence(|cons| {
                let id = Oid::take_from(cons)?;
                let _critical = cons.take_opt_bool()?;
                let value = OctetString::take_from(cons)?;
                if id == oid::CE_CRL_REASON {
                    reason = Some(Mode::Der.decode(value, |cons| {
                        cons.take_primitive_if(Tag::ENUMERATED, |prim| {
                            prim.take_u8()
                        })
                    }).map_err(DecodeError::convert)?);
                }
                Ok(())
            })? { }
            Ok(())
        })?;
        Ok(CrlEntry { user_certificate, revocation_date, reason })
    }
}


//------------ Extensions ----------------------------------------------------

/// The extensions of a certificate revocation list.
#[derive(Clone, Debug, Default)]
pub struct Extensions {
    /// The CRL number.
    crl_number: Option<Serial>,

    /// The base CRL number if this is a delta CRL.
    delta_crl: Option<Serial>,

    /// Was the delta CRL indicator marked critical?
    delta_crl_critical: bool,

    /// The issuing distribution point.
    issuing_distribution_point: Option<IssuingDistributionPoint>,

    /// Critical extensions we don’t know of.
    unsupported_critical: Vec<Oid<Bytes>>,
}

impl Extensions {
    pub fn crl_number(&self) -> Option<&Serial> {
        self.crl_number.as_ref()
    }

    /// Returns the base CRL number if this is a delta CRL.
    pub fn delta_crl(&self) -> Option<&Serial> {
        self.delta_crl.as_ref()
    }

    pub fn issuing_distribution_point(
        &self
    ) -> Option<IssuingDistributionPoint> {
        self.issuing_distribution_point
    }

    /// Takes the CRL extension from the beginning of a constructed value.
    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            let mut res = Extensions::default();
            while let Some(()) = cons.take_opt_sequence(|cons| {
                let id = Oid::take_from(cons)?;
                let critical = cons.take_opt_bool()?.unwrap_or(false);
                let value = OctetString::take_from(cons)?;
                Mode::Der.decode(value, |content| {
                    if id == oid::CE_CRL_NUMBER {
                        res.crl_number = Some(Serial::take_from(content)?);
                    }
                    else if id == oid::CE_DELTA_CRL_INDICATOR {
                        res.delta_crl = Some(Serial::take_from(content)?);
                        res.delta_crl_critical = critical;
                    }
                    else if id == oid::CE_ISSUING_DISTRIBUTION_POINT {
                        res.issuing_distribution_point = Some(
                            IssuingDistributionPoint::take_from(
                                content, critical
                            )?
                        );
                    }
                    else {
                        if critical {
                            res.unsupported_critical.push(id.clone());
                        }
                        content.skip_one()?;
                    }
                    Ok(())
                }).map_err(DecodeError::convert)
            })? { }
            Ok(res)
        })
    }
}


//------------ IssuingDistributionPoint --------------------------------------

/// The relevant parts of the issuing distribution point extension.
///
/// ```txt
/// IssuingDistributionPoint ::= SEQUENCE {
///      distributionPoint          [0] DistributionPointName OPTIONAL,
///      onlyContainsUserCerts      [1] BOOLEAN DEFAULT FALSE,
///      onlyContainsCACerts        [2] BOOLEAN DEFAULT FALSE,
///      onlySomeReasons            [3] ReasonFlags OPTIONAL,
///      indirectCRL                [4] BOOLEAN DEFAULT FALSE,
///      onlyContainsAttributeCerts [5] BOOLEAN DEFAULT FALSE }
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct IssuingDistributionPoint {
    pub critical: bool,
    pub only_user_certs: bool,
    pub only_ca_certs: bool,
    pub only_some_reasons: bool,
    pub indirect: bool,
    pub only_attribute_certs: bool,
}

impl IssuingDistributionPoint {
    fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>,
        critical: bool,
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            cons.take_opt_constructed_if(Tag::CTX_0, |c| c.skip_all())?;
            Ok(IssuingDistributionPoint {
                critical,
                only_user_certs: take_implicit_bool(cons, Tag::CTX_1)?,
                only_ca_certs: take_implicit_bool(cons, Tag::CTX_2)?,
                only_some_reasons: cons.take_opt_primitive_if(
                    Tag::CTX_3, |prim| prim.take_all()
                )?.is_some(),
                indirect: take_implicit_bool(cons, Tag::CTX_4)?,
                only_attribute_certs: take_implicit_bool(cons, Tag::CTX_5)?,
            })
        })
    }
}

/// Takes an optional implicitly tagged boolean defaulting to false.
fn take_implicit_bool<S: decode::Source>(
    cons: &mut decode::Constructed<S>,
    tag: Tag,
) -> Result<bool, DecodeError<S::Error>> {
    cons.take_opt_primitive_if(tag, |prim| {
        let value = prim.take_all()?;
        match value.as_ref() {
            [0] => Ok(false),
            [_] => Ok(true),
            _ => Err(prim.content_err("invalid boolean")),
        }
    }).map(|res| res.unwrap_or(false))
}


//------------ CrlError ------------------------------------------------------

/// A CRL could not be loaded or is not acceptable.
#[derive(Clone, Debug)]
pub enum CrlError {
    /// Reading the CRL file failed.
    Io(Arc<io::Error>),

    /// The PEM armor was broken.
    Pem(pem::PemError),

    /// The CRL could not be decoded.
    Decode(String),

    /// The CRL was issued by someone other than the CA.
    IssuerMismatch {
        crl: DistinguishedName,
        ca: DistinguishedName,
    },

    /// The signature doesn’t verify with the CA’s key.
    BadSignature(SignatureVerificationError),

    /// Delta CRLs are not supported.
    DeltaCrl,

    /// The CRL only covers some revocation reasons.
    OnlySomeReasons,

    /// The CRL only covers attribute certificates.
    OnlyAttributeCerts,

    /// The CRL has a critical extension we don’t know.
    UnsupportedCriticalExtension(Oid<Bytes>),
}

impl CrlError {
    /// Returns whether the error is caused by a missing CRL file.
    pub fn is_not_found(&self) -> bool {
        matches!(
            *self,
            CrlError::Io(ref err) if err.kind() == io::ErrorKind::NotFound
        )
    }
}

impl From<io::Error> for CrlError {
    fn from(err: io::Error) -> Self {
        CrlError::Io(Arc::new(err))
    }
}

impl From<pem::PemError> for CrlError {
    fn from(err: pem::PemError) -> Self {
        CrlError::Pem(err)
    }
}

impl PartialEq for CrlError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (CrlError::Io(left), CrlError::Io(right)) => {
                left.kind() == right.kind()
                && left.to_string() == right.to_string()
            }
            (CrlError::Pem(left), CrlError::Pem(right)) => left == right,
            (CrlError::Decode(left), CrlError::Decode(right)) => {
                left == right
            }
            (
                CrlError::IssuerMismatch { crl: lc, ca: la },
                CrlError::IssuerMismatch { crl: rc, ca: ra }
            ) => lc == rc && la == ra,
            (CrlError::BadSignature(left), CrlError::BadSignature(right)) => {
                left == right
            }
            (CrlError::DeltaCrl, CrlError::DeltaCrl) => true,
            (CrlError::OnlySomeReasons, CrlError::OnlySomeReasons) => true,
            (CrlError::OnlyAttributeCerts, CrlError::OnlyAttributeCerts) => {
                true
            }
            (
                CrlError::UnsupportedCriticalExtension(left),
                CrlError::UnsupportedCriticalExtension(right)
            ) => left == right,
            _ => false
        }
    }
}

impl fmt::Display for CrlError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            CrlError::Io(ref err) => err.fmt(f),
            CrlError::Pem(ref err) => err.fmt(f),
            CrlError::Decode(ref err) => write!(f, "invalid CRL: {}", err),
            CrlError::IssuerMismatch { ref crl, ref ca } => {
                write!(
                    f, "CRL issuer '{}' does not match CA '{}'", crl, ca
                )
            }
            CrlError::BadSignature(err) => {
                write!(f, "CRL signature: {}", err)
            }
            CrlError::DeltaCrl => f.write_str("delta CRLs are not supported"),
            CrlError::OnlySomeReasons => {
                f.write_str("CRL only covers some revocation reasons")
            }
            CrlError::OnlyAttributeCerts => {
                f.write_str("CRL only covers attribute certificates")
            }
            CrlError::UnsupportedCriticalExtension(ref id) => {
                write!(f, "unsupported critical CRL extension {}", id)
            }
        }
    }
}

impl error::Error for CrlError { }


//============ Tests =========================================================
