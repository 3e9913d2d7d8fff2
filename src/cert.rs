//! X.509 certificates.
//!
//! This module contains the type [`Cert`] for decoded certificates as used
//! by grid services: CA certificates, end entity certificates, and proxy
//! certificates. Decoding is deliberately liberal. It only rejects what
//! cannot be represented. Checking whether a certificate is acceptable in
//! a certain position of a chain is up to the
//! [validator](../validator/index.html).
//!
//! [`Cert`]: struct.Cert.html

use std::{error, fmt, fs, io, ops};
use std::convert::Infallible;
use std::path::Path;
use bcder::{decode, encode};
use bcder::{BitString, Captured, Mode, OctetString, Oid, Tag};
use bcder::decode::{DecodeError, IntoSource, Source};
use bcder::encode::{PrimitiveContent, Values};
use bytes::Bytes;
use crate::oid;
use crate::crypto::{
    PublicKey, SignatureAlgorithm, SignatureVerificationError,
};
use crate::dn::DistinguishedName;
use crate::util::pem;
use crate::x509::{Serial, SignedData, Time, Validity, ValidityPeriodError};


//------------ Cert ----------------------------------------------------------

/// A decoded certificate.
///
/// Use [`decode`] for DER data in memory, [`from_pem_or_der`] if the data
/// may also be PEM encoded, and [`load`] to read a certificate file.
///
/// The value keeps the original encoding of the certificate which is
/// available through [`to_captured`].
///
/// [`decode`]: #method.decode
/// [`from_pem_or_der`]: #method.from_pem_or_der
/// [`load`]: #method.load
/// [`to_captured`]: #method.to_captured
#[derive(Clone, Debug)]
pub struct Cert {
    /// The complete encoded certificate.
    der: Captured,

    /// The outer structure of the certificate.
    signed_data: SignedData,

    /// The actual data of the certificate.
    tbs: TbsCert,
}

/// # Decoding and Encoding
///
impl Cert {
    /// Decodes a source as a certificate.
    pub fn decode<S: IntoSource>(
        source: S,
    ) -> Result<Self, DecodeError<<S::Source as Source>::Error>> {
        Mode::Der.decode(source, Self::take_from)
    }

    /// Takes an encoded certificate from the beginning of a value.
    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        let der = cons.capture_one()?;
        let (signed_data, tbs) = der.clone().decode(|cons| {
            cons.take_sequence(|cons| {
                let signed_data = SignedData::from_constructed(cons)?;
                let tbs = signed_data.data().clone().decode(
                    TbsCert::from_constructed
                )?;
                Ok((signed_data, tbs))
            })
        }).map_err(DecodeError::convert)?;
        Ok(Cert { der, signed_data, tbs })
    }

    /// Decodes the first certificate from data in either PEM or DER.
    pub fn from_pem_or_der(data: Bytes) -> Result<Self, CertLoadError> {
        let der = pem::der_or_pem(data, "CERTIFICATE")?;
        Ok(Self::decode(der)?)
    }

    /// Loads a certificate from a file in either PEM or DER format.
    pub fn load(path: &Path) -> Result<Self, CertLoadError> {
        Self::from_pem_or_der(fs::read(path)?.into())
    }

    /// Decodes all certificates contained in PEM encoded data.
    ///
    /// Blocks with labels other than `CERTIFICATE`, such as private keys in
    /// a proxy credential file, are skipped.
    pub fn decode_pem_chain(data: &[u8]) -> Result<Vec<Self>, CertLoadError> {
        let mut res = Vec::new();
        for block in pem::parse(data)? {
            if block.label() != "CERTIFICATE" {
                continue
            }
            res.push(Self::decode(block.into_content())?);
        }
        if res.is_empty() {
            return Err(CertLoadError::Pem(
                pem::PemError::Missing("CERTIFICATE".into())
            ))
        }
        Ok(res)
    }

    /// Returns the encoded certificate.
    pub fn to_captured(&self) -> Captured {
        self.der.clone()
    }

    /// Returns the DER encoding of the certificate as bytes.
    pub fn to_bytes(&self) -> Bytes {
        self.der.clone().into_bytes()
    }

    /// Returns a value encoder for a reference to the certificate.
    pub fn encode_ref(&self) -> impl encode::Values + '_ {
        &self.der
    }
}

/// # Verification
///
impl Cert {
    /// Returns a reference to the signed data of the certificate.
    pub fn signed_data(&self) -> &SignedData {
        &self.signed_data
    }

    /// Verifies the signature of the certificate against a public key.
    ///
    /// The signature algorithm given inside the signed part needs to be
    /// the same as the one used for the actual signature.
    pub fn verify_signature(
        &self, public_key: &PublicKey
    ) -> Result<(), SignatureVerificationError> {
        if self.tbs.signature != self.signed_data.signature().algorithm() {
            return Err(SignatureVerificationError::AlgorithmMismatch)
        }
        self.signed_data.verify_signature(public_key)
    }

    /// Verifies that the certificate is valid right now.
    pub fn verify_validity(&self) -> Result<(), ValidityPeriodError> {
        self.tbs.validity.verify()
    }

    /// Verifies that the certificate is valid at the given time.
    pub fn verify_validity_at(
        &self, now: Time
    ) -> Result<(), ValidityPeriodError> {
        self.tbs.validity.verify_at(now)
    }

    /// Returns whether the certificate is self-signed.
    ///
    /// This is the case if issuer and subject are equal and the signature
    /// verifies with the certificate’s own key.
    pub fn is_self_signed(&self) -> bool {
        self.tbs.issuer == self.tbs.subject
        && self.verify_signature(&self.tbs.subject_public_key_info).is_ok()
    }
}


//--- Deref, AsRef

impl ops::Deref for Cert {
    type Target = TbsCert;

    fn deref(&self) -> &Self::Target {
        &self.tbs
    }
}

impl AsRef<TbsCert> for Cert {
    fn as_ref(&self) -> &TbsCert {
        &self.tbs
    }
}


//--- PartialEq and Eq

impl PartialEq for Cert {
    fn eq(&self, other: &Self) -> bool {
        self.der.as_slice() == other.der.as_slice()
    }
}

impl Eq for Cert { }


//------------ TbsCert -------------------------------------------------------

/// The data of a certificate.
#[derive(Clone, Debug)]
pub struct TbsCert {
    /// The raw version number, i.e., 0 for v1 and 2 for v3.
    version: u8,

    /// The serial number.
    serial_number: Serial,

    /// The algorithm used for signing the certificate.
    signature: SignatureAlgorithm,

    /// The name of the issuer.
    issuer: DistinguishedName,

    /// The validity of the certificate.
    validity: Validity,

    /// The name of the subject of this certificate.
    subject: DistinguishedName,

    /// Information about the public key of this certificate.
    subject_public_key_info: PublicKey,

    /// Basic Constraints.
    basic_constraints: Option<BasicConstraints>,

    /// Key Usage.
    key_usage: Option<KeyUsage>,

    /// The proxy certificate information extension in either flavor.
    proxy_cert_info: Option<ProxyCertInfo>,

    /// All extensions in the order they appear in the certificate.
    extensions: Vec<Extension>,
}

impl TbsCert {
    /// Returns the X.509 version of the certificate, i.e., 1 or 3.
    pub fn version(&self) -> u8 {
        self.version + 1
    }

    pub fn serial_number(&self) -> &Serial {
        &self.serial_number
    }

    pub fn signature_algorithm(&self) -> SignatureAlgorithm {
        self.signature
    }

    pub fn issuer(&self) -> &DistinguishedName {
        &self.issuer
    }

    pub fn validity(&self) -> Validity {
        self.validity
    }

    pub fn subject(&self) -> &DistinguishedName {
        &self.subject
    }

    pub fn subject_public_key_info(&self) -> &PublicKey {
        &self.subject_public_key_info
    }

    pub fn basic_constraints(&self) -> Option<BasicConstraints> {
        self.basic_constraints
    }

    /// Returns whether the certificate has the CA flag set.
    pub fn is_ca(&self) -> bool {
        self.basic_constraints.map(|bc| bc.is_ca()).unwrap_or(false)
    }

    pub fn key_usage(&self) -> Option<KeyUsage> {
        self.key_usage
    }

    pub fn proxy_cert_info(&self) -> Option<&ProxyCertInfo> {
        self.proxy_cert_info.as_ref()
    }

    pub fn extensions(&self) -> &[Extension] {
        &self.extensions
    }

    /// Returns an iterator over the critical extensions.
    pub fn critical_extensions(&self) -> impl Iterator<Item = &Extension> {
        self.extensions.iter().filter(|ext| ext.is_critical())
    }

    /// Returns the extension with the given OID if it is marked critical.
    pub fn critical_extension<T: AsRef<[u8]>>(
        &self, id: &Oid<T>
    ) -> Option<&Extension> {
        self.critical_extensions().find(|ext| ext.oid() == id)
    }
}

/// # Decoding
///
/// ```txt
/// TBSCertificate  ::=  SEQUENCE  {
///      version         [0]  EXPLICIT Version DEFAULT v1,
///      serialNumber         CertificateSerialNumber,
///      signature            AlgorithmIdentifier,
///      issuer               Name,
///      validity             Validity,
///      subject              Name,
///      subjectPublicKeyInfo SubjectPublicKeyInfo,
///      issuerUniqueID  [1]  IMPLICIT UniqueIdentifier OPTIONAL,
///      subjectUniqueID [2]  IMPLICIT UniqueIdentifier OPTIONAL,
///      extensions      [3]  EXPLICIT Extensions OPTIONAL
/// }
/// ```
///
/// Unknown extensions are kept in the extension list regardless of whether
/// they are critical or not.
impl TbsCert {
    pub fn from_constructed<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            let version = cons.take_opt_constructed_if(
                Tag::CTX_0, |c| c.take_u8()
            )?.unwrap_or(0);
            if version > 2 {
                return Err(cons.content_err("unknown certificate version"))
            }
            let serial_number = Serial::take_from(cons)?;
            let signature = SignatureAlgorithm::x509_take_from(cons)?;
            let issuer = DistinguishedName::take_from(cons)?;
            let validity = Validity::take_from(cons)?;
            let subject = DistinguishedName::take_from(cons)?;
            let subject_public_key_info = PublicKey::take_from(cons)?;
            cons.take_opt_primitive_if(Tag::CTX_1, |prim| prim.take_all())?;
            cons.take_opt_primitive_if(Tag::CTX_2, |prim| prim.take_all())?;

            let mut basic_constraints = None;
            let mut key_usage = None;
            let mut proxy_cert_info = None;
            let mut extensions = Vec::new();

            cons.take_opt_constructed_if(Tag::CTX_3, |c| c.take_sequence(
                |cons| {
                    while let Some(()) = cons.take_opt_sequence(|cons| {
                        let id = Oid::take_from(cons)?;
                        let critical = cons.take_opt_bool()?.unwrap_or(false);
                        let value = OctetString::take_from(cons)?;
                        if extensions.iter().any(|ext: &Extension| {
                            ext.oid == id
                        }) {
                            return Err(cons.content_err(
                                "duplicate extension"
                            ))
                        }
                        let raw = value.to_bytes();
                        Mode::Der.decode(value, |content| {
                            if id == oid::CE_BASIC_CONSTRAINTS {
                                basic_constraints = Some(
                                    BasicConstraints::take_from(content)?
                                );
                            }
                            else if id == oid::CE_KEY_USAGE {
                                key_usage = Some(
                                    KeyUsage::take_from(content)?
                                );
                            }
                            else if id == oid::PE_PROXY_CERT_INFO {
                                proxy_cert_info = Some(
                                    ProxyCertInfo::take_from(
                                        content, ProxyCertKind::Rfc3820
                                    )?
                                );
                            }
                            else if id == oid::PE_PROXY_CERT_INFO_DRAFT {
                                proxy_cert_info = Some(
                                    ProxyCertInfo::take_from(
                                        content, ProxyCertKind::Draft
                                    )?
                                );
                            }
                            else {
                                content.skip_one()?;
                            }
                            Ok(())
                        }).map_err(DecodeError::convert)?;
                        extensions.push(Extension {
                            oid: id, critical, value: raw
                        });
                        Ok(())
                    })? { }
                    Ok(())
                }
            ))?;

            if version < 2 && !extensions.is_empty() {
                return Err(cons.content_err(
                    "extensions in non-v3 certificate"
                ))
            }
            if extensions.iter().filter(|ext| {
                ext.oid == oid::PE_PROXY_CERT_INFO
                || ext.oid == oid::PE_PROXY_CERT_INFO_DRAFT
            }).count() > 1 {
                return Err(cons.content_err(
                    "both proxy certificate info flavors present"
                ))
            }

            Ok(TbsCert {
                version,
                serial_number,
                signature,
                issuer,
                validity,
                subject,
                subject_public_key_info,
                basic_constraints,
                key_usage,
                proxy_cert_info,
                extensions,
            })
        })
    }
}


//------------ Extension -----------------------------------------------------

/// A certificate extension in its raw form.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Extension {
    oid: Oid<Bytes>,
    critical: bool,
    value: Bytes,
}

impl Extension {
    pub fn oid(&self) -> &Oid<Bytes> {
        &self.oid
    }

    pub fn is_critical(&self) -> bool {
        self.critical
    }

    /// Returns the content of the extension’s octet string.
    pub fn value(&self) -> &Bytes {
        &self.value
    }
}


//------------ BasicConstraints ----------------------------------------------

/// The content of the Basic Constraints extension.
///
/// ```txt
/// BasicConstraints        ::= SEQUENCE {
///     cA                      BOOLEAN DEFAULT FALSE,
///     pathLenConstraint       INTEGER (0..MAX) OPTIONAL
/// }
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BasicConstraints {
    ca: bool,
    path_len: Option<u32>,
}

impl BasicConstraints {
    pub fn new(ca: bool, path_len: Option<u32>) -> Self {
        BasicConstraints { ca, path_len }
    }

    pub fn is_ca(self) -> bool {
        self.ca
    }

    /// Returns the maximum number of subordinate CAs below this one.
    ///
    /// Returns `None` if there is no limit.
    pub fn path_len(self) -> Option<u32> {
        self.path_len
    }

    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            let ca = cons.take_opt_bool()?.unwrap_or(false);
            let path_len = cons.take_opt_u64()?.map(saturating_u32);
            Ok(BasicConstraints { ca, path_len })
        })
    }

    pub fn encode(self) -> impl encode::Values {
        encode::sequence((
            if self.ca { Some(true.encode()) } else { None },
            self.path_len.map(|len| u64::from(len).encode()),
        ))
    }
}


//------------ KeyUsage ------------------------------------------------------

/// The bits of the Key Usage extension.
///
/// ```txt
/// KeyUsage ::= BIT STRING {
///      digitalSignature        (0),
///      nonRepudiation          (1),
///      keyEncipherment         (2),
///      dataEncipherment        (3),
///      keyAgreement            (4),
///      keyCertSign             (5),
///      cRLSign                 (6),
///      encipherOnly            (7),
///      decipherOnly            (8) }
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct KeyUsage(u16);

impl KeyUsage {
    pub const DIGITAL_SIGNATURE: Self = KeyUsage(1 << 0);
    pub const NON_REPUDIATION: Self = KeyUsage(1 << 1);
    pub const KEY_ENCIPHERMENT: Self = KeyUsage(1 << 2);
    pub const DATA_ENCIPHERMENT: Self = KeyUsage(1 << 3);
    pub const KEY_AGREEMENT: Self = KeyUsage(1 << 4);
    pub const KEY_CERT_SIGN: Self = KeyUsage(1 << 5);
    pub const CRL_SIGN: Self = KeyUsage(1 << 6);
    pub const ENCIPHER_ONLY: Self = KeyUsage(1 << 7);
    pub const DECIPHER_ONLY: Self = KeyUsage(1 << 8);

    /// Returns whether all bits set in `other` are set in `self`.
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn digital_signature(self) -> bool {
        self.contains(Self::DIGITAL_SIGNATURE)
    }

    pub fn key_cert_sign(self) -> bool {
        self.contains(Self::KEY_CERT_SIGN)
    }

    pub fn crl_sign(self) -> bool {
        self.contains(Self::CRL_SIGN)
    }

    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        let bits = BitString::take_from(cons)?;
        let mut res = 0;
        for bit in 0..9 {
            if bits.bit(bit) {
                res |= 1 << bit;
            }
        }
        Ok(KeyUsage(res))
    }

    /// Returns an encoder for the value as a minimal bit string.
    pub fn encode(self) -> impl encode::Values {
        let first = (0..8).fold(0u8, |res, bit| {
            if self.0 & (1 << bit) != 0 { res | (0x80 >> bit) } else { res }
        });
        let bits = if self.0 & (1 << 8) != 0 {
            BitString::new(7, Bytes::copy_from_slice(&[first, 0x80]))
        }
        else if first == 0 {
            BitString::new(0, Bytes::new())
        }
        else {
            BitString::new(
                first.trailing_zeros() as u8, Bytes::copy_from_slice(&[first])
            )
        };
        bits.encode()
    }
}

impl ops::BitOr for KeyUsage {
    type Output = Self;

    fn bitor(self, other: Self) -> Self {
        KeyUsage(self.0 | other.0)
    }
}


//------------ ProxyCertKind -------------------------------------------------

/// The flavor of the proxy certificate info extension.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ProxyCertKind {
    /// The extension as standardized in RFC 3820.
    Rfc3820,

    /// The extension of the pre-RFC Globus Toolkit drafts.
    Draft,
}


//------------ ProxyCertInfo -------------------------------------------------

/// The content of the proxy certificate info extension.
///
/// RFC 3820 defines the extension as:
///
/// ```txt
/// ProxyCertInfo ::= SEQUENCE {
///      pCPathLenConstraint   INTEGER (0..MAX) OPTIONAL,
///      proxyPolicy           ProxyPolicy }
///
/// ProxyPolicy ::= SEQUENCE {
///      policyLanguage        OBJECT IDENTIFIER,
///      policy                OCTET STRING OPTIONAL }
/// ```
///
/// The draft version has the path length constraint after the policy.
/// Both orders are accepted for both flavors.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProxyCertInfo {
    kind: ProxyCertKind,
    path_len: Option<u32>,
    policy_language: Oid<Bytes>,
    policy: Option<Bytes>,
}

impl ProxyCertInfo {
    pub fn kind(&self) -> ProxyCertKind {
        self.kind
    }

    /// Returns the maximum number of proxies below this one.
    ///
    /// Returns `None` if there is no limit.
    pub fn path_len(&self) -> Option<u32> {
        self.path_len
    }

    pub fn policy_language(&self) -> &Oid<Bytes> {
        &self.policy_language
    }

    pub fn policy(&self) -> Option<&Bytes> {
        self.policy.as_ref()
    }

    /// Returns whether this is a limited proxy.
    pub fn is_limited(&self) -> bool {
        self.policy_language == oid::PPL_LIMITED
    }

    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>,
        kind: ProxyCertKind,
    ) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            let mut path_len = cons.take_opt_u64()?;
            let (policy_language, policy) = cons.take_sequence(|cons| {
                Ok((
                    Oid::take_from(cons)?,
                    OctetString::take_opt_from(cons)?.map(|policy| {
                        policy.into_bytes()
                    })
                ))
            })?;
            if path_len.is_none() {
                path_len = cons.take_opt_u64()?;
            }
            Ok(ProxyCertInfo {
                kind,
                path_len: path_len.map(saturating_u32),
                policy_language,
                policy,
            })
        })
    }
}


//------------ Helper Functions ----------------------------------------------

fn saturating_u32(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}


//------------ CertLoadError -------------------------------------------------

/// An error happened while loading a certificate.
#[derive(Debug)]
pub enum CertLoadError {
    /// Reading the file failed.
    Io(io::Error),

    /// The PEM armor was broken.
    Pem(pem::PemError),

    /// The certificate could not be decoded.
    Decode(DecodeError<Infallible>),
}

impl From<io::Error> for CertLoadError {
    fn from(err: io::Error) -> Self {
        CertLoadError::Io(err)
    }
}

impl From<pem::PemError> for CertLoadError {
    fn from(err: pem::PemError) -> Self {
        CertLoadError::Pem(err)
    }
}

impl From<DecodeError<Infallible>> for CertLoadError {
    fn from(err: DecodeError<Infallible>) -> Self {
        CertLoadError::Decode(err)
    }
}

impl fmt::Display for CertLoadError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            CertLoadError::Io(ref err) => err.fmt(f),
            CertLoadError::Pem(ref err) => err.fmt(f),
            CertLoadError::Decode(ref err) => {
                write!(f, "invalid certificate: {}", err)
            }
        }
    }
}

impl error::Error for CertLoadError { }


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;
    use crate::test::{self, KeyRing, TbsBuilder};

    #[test]
    fn decode_ca_and_ee() {
        let ring = KeyRing::new();
        let ca = test::Issued::root_ca(&ring, "CN=Test CA,O=Grid,C=NL");
        assert_eq!(ca.cert.version(), 3);
        assert!(ca.cert.is_ca());
        assert!(ca.cert.is_self_signed());
        assert!(ca.cert.key_usage().unwrap().key_cert_sign());
        assert_eq!(
            ca.cert.subject().to_x500(), "/C=NL/O=Grid/CN=Test CA"
        );
        assert!(
            ca.cert.critical_extension(&oid::CE_BASIC_CONSTRAINTS).is_some()
        );

        let ee = ca.end_entity(&ring, "CN=Alice,O=Grid,C=NL");
        assert!(!ee.cert.is_ca());
        assert!(!ee.cert.is_self_signed());
        assert_eq!(ee.cert.issuer(), ca.cert.subject());
        ee.cert.verify_signature(ca.cert.subject_public_key_info()).unwrap();
        assert_eq!(
            ee.cert.verify_signature(ee.cert.subject_public_key_info()),
            Err(SignatureVerificationError::BadSignature)
        );
        ee.cert.verify_validity().unwrap();

        let again = Cert::decode(ee.cert.to_bytes()).unwrap();
        assert_eq!(again, ee.cert);
    }

    #[test]
    fn decode_proxy_cert_info() {
        let ring = KeyRing::new();
        let ca = test::Issued::root_ca(&ring, "CN=Test CA,O=Grid");
        let ee = ca.end_entity(&ring, "CN=Alice,O=Grid");
        let proxy = ee.rfc3820_proxy(&ring, "1234", Some(2));
        let info = proxy.cert.proxy_cert_info().unwrap();
        assert_eq!(info.kind(), ProxyCertKind::Rfc3820);
        assert_eq!(info.path_len(), Some(2));
        assert!(!info.is_limited());
        assert_eq!(info.policy_language(), &oid::PPL_INHERIT_ALL);
        assert!(
            proxy.cert.critical_extension(&oid::PE_PROXY_CERT_INFO).is_some()
        );

        let draft = ee.draft_proxy(&ring, "proxy", None);
        let info = draft.cert.proxy_cert_info().unwrap();
        assert_eq!(info.kind(), ProxyCertKind::Draft);
        assert_eq!(info.path_len(), None);
    }

    #[test]
    fn decode_draft_order() {
        // SEQUENCE { SEQUENCE { id-ppl-inheritAll }, INTEGER 3 }
        let der = b"\x30\x0f\x30\x0a\x06\x08\x2b\x06\x01\x05\x05\x07\x15\x01\
                    \x02\x01\x03";
        let info = Mode::Der.decode(der.as_ref(), |cons| {
            ProxyCertInfo::take_from(cons, ProxyCertKind::Draft)
        }).unwrap();
        assert_eq!(info.path_len(), Some(3));
    }

    #[test]
    fn key_usage_bits() {
        let ku = KeyUsage::KEY_CERT_SIGN | KeyUsage::CRL_SIGN;
        let der = ku.encode().to_captured(Mode::Der);
        // BIT STRING, 1 unused bit, 0000 0110
        assert_eq!(der.as_slice(), b"\x03\x02\x01\x06");
        let decoded = Mode::Der.decode(
            der.as_slice(), KeyUsage::take_from
        ).unwrap();
        assert_eq!(decoded, ku);
        assert!(decoded.key_cert_sign());
        assert!(!decoded.digital_signature());

        let ku = KeyUsage::DIGITAL_SIGNATURE | KeyUsage::DECIPHER_ONLY;
        let der = ku.encode().to_captured(Mode::Der);
        assert_eq!(der.as_slice(), b"\x03\x03\x07\x80\x80");
    }

    #[test]
    fn basic_constraints_path_len() {
        let der = BasicConstraints::new(true, Some(0)).encode().to_captured(
            Mode::Der
        );
        let bc = Mode::Der.decode(
            der.as_slice(), BasicConstraints::take_from
        ).unwrap();
        assert!(bc.is_ca());
        assert_eq!(bc.path_len(), Some(0));
        let bc = Mode::Der.decode(
            b"\x30\x00".as_ref(), BasicConstraints::take_from
        ).unwrap();
        assert!(!bc.is_ca());
        assert_eq!(bc.path_len(), None);
    }

    #[test]
    fn unknown_critical_extension_is_kept() {
        let ring = KeyRing::new();
        let ca = test::Issued::root_ca(&ring, "CN=Test CA");
        let key = ring.create_key();
        let tbs = TbsBuilder::v3()
            .serial(7)
            .issuer(ca.cert.subject())
            .subject(&"CN=Odd,CN=Test CA".parse().unwrap())
            .public_key(key.key_info())
            .raw_extension(
                &oid::CE_CRL_NUMBER, true, test::DerData::encode(5u8.encode())
            )
            .finalize();
        let cert = Cert::decode(test::sign_tbs(tbs, &ca.key)).unwrap();
        let critical: Vec<_> = cert.critical_extensions().collect();
        assert_eq!(critical.len(), 1);
        assert_eq!(critical[0].oid(), &oid::CE_CRL_NUMBER);
        assert_eq!(critical[0].value().as_ref(), b"\x02\x01\x05");
    }

    #[test]
    fn key_identifiers_are_kept() {
        let ring = KeyRing::new();
        let ca = test::Issued::root_ca(&ring, "CN=Test CA");
        let ee = ca.issue_with_key_ids(
            &ring, test::ee_template().subject(&test::dn("CN=Alice"))
        );
        assert_eq!(ee.cert.extensions().len(), 3);
        assert_eq!(ee.cert.critical_extensions().count(), 1);
        let ski = ee.cert.extensions().iter().find(|ext| {
            ext.oid() == &oid::CE_SUBJECT_KEY_IDENTIFIER
        }).unwrap();
        assert!(!ski.is_critical());
        let mut id = vec![0x04, 0x14];
        id.extend_from_slice(&test::key_identifier(&ee.key.key_info()));
        assert_eq!(ski.value().as_ref(), id.as_slice());
        assert!(ee.cert.extensions().iter().any(|ext| {
            ext.oid() == &oid::CE_AUTHORITY_KEY_IDENTIFIER
        }));
        assert!(
            ee.cert.critical_extension(
                &oid::CE_AUTHORITY_KEY_IDENTIFIER
            ).is_none()
        );
    }

    #[test]
    fn decode_openssl_certs() {
        use openssl::asn1::Asn1Time;
        use openssl::bn::BigNum;
        use openssl::hash::MessageDigest;
        use openssl::pkey::{PKey, Private};
        use openssl::rsa::Rsa;
        use openssl::x509::{X509, X509Name, X509NameBuilder};
        use openssl::x509::extension::{
            AuthorityKeyIdentifier, BasicConstraints, KeyUsage,
            SubjectKeyIdentifier,
        };

        fn name(cn: &str) -> X509Name {
            let mut name = X509NameBuilder::new().unwrap();
            name.append_entry_by_text("O", "Grid").unwrap();
            name.append_entry_by_text("CN", cn).unwrap();
            name.build()
        }

        fn builder(
            serial: u32, subject: &X509Name, issuer: &X509Name,
            key: &PKey<Private>,
        ) -> openssl::x509::X509Builder {
            let mut builder = X509::builder().unwrap();
            builder.set_version(2).unwrap();
            builder.set_serial_number(
                &BigNum::from_u32(serial).unwrap().to_asn1_integer().unwrap()
            ).unwrap();
            builder.set_subject_name(subject).unwrap();
            builder.set_issuer_name(issuer).unwrap();
            builder.set_pubkey(key).unwrap();
            builder.set_not_before(
                &Asn1Time::days_from_now(0).unwrap()
            ).unwrap();
            builder.set_not_after(
                &Asn1Time::days_from_now(30).unwrap()
            ).unwrap();
            builder
        }

        let ca_key = PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap();
        let ca_name = name("OpenSSL CA");
        let mut ca = builder(1, &ca_name, &ca_name, &ca_key);
        ca.append_extension(
            BasicConstraints::new().critical().ca().build().unwrap()
        ).unwrap();
        ca.append_extension(
            KeyUsage::new().critical().key_cert_sign().crl_sign()
                .build().unwrap()
        ).unwrap();
        let ski = SubjectKeyIdentifier::new().build(
            &ca.x509v3_context(None, None)
        ).unwrap();
        ca.append_extension(ski).unwrap();
        ca.sign(&ca_key, MessageDigest::sha256()).unwrap();
        let ca = ca.build();

        let ee_key = PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap();
        let mut ee = builder(2, &name("Alice"), &ca_name, &ee_key);
        ee.append_extension(
            KeyUsage::new().critical().digital_signature()
                .build().unwrap()
        ).unwrap();
        let ski = SubjectKeyIdentifier::new().build(
            &ee.x509v3_context(Some(&ca), None)
        ).unwrap();
        ee.append_extension(ski).unwrap();
        let aki = AuthorityKeyIdentifier::new().keyid(false).build(
            &ee.x509v3_context(Some(&ca), None)
        ).unwrap();
        ee.append_extension(aki).unwrap();
        ee.sign(&ca_key, MessageDigest::sha256()).unwrap();
        let ee = ee.build();

        let ca = Cert::decode(Bytes::from(ca.to_der().unwrap())).unwrap();
        assert!(ca.is_ca());
        assert!(ca.key_usage().unwrap().key_cert_sign());
        assert_eq!(ca.critical_extensions().count(), 2);

        let ee = Cert::decode(Bytes::from(ee.to_der().unwrap())).unwrap();
        assert!(!ee.is_ca());
        assert_eq!(ee.subject().to_x500(), "/O=Grid/CN=Alice");
        assert_eq!(ee.extensions().len(), 3);
        assert_eq!(ee.critical_extensions().count(), 1);
        ee.verify_signature(ca.subject_public_key_info()).unwrap();
        ee.verify_validity().unwrap();
    }

    #[test]
    fn duplicate_extension_is_rejected() {
        let ring = KeyRing::new();
        let ca = test::Issued::root_ca(&ring, "CN=Test CA");
        let tbs = TbsBuilder::v3()
            .serial(7)
            .issuer(ca.cert.subject())
            .subject(ca.cert.subject())
            .public_key(ca.key.key_info())
            .basic_constraints(true, true, None)
            .basic_constraints(true, true, None)
            .finalize();
        assert!(Cert::decode(test::sign_tbs(tbs, &ca.key)).is_err());
    }

    #[test]
    fn decode_v1() {
        let ring = KeyRing::new();
        let key = ring.create_key();
        let name: DistinguishedName = "CN=Old CA,O=Grid".parse().unwrap();
        let tbs = TbsBuilder::v1()
            .serial(1)
            .issuer(&name)
            .subject(&name)
            .public_key(key.key_info())
            .finalize();
        let cert = Cert::decode(test::sign_tbs(tbs, &key)).unwrap();
        assert_eq!(cert.version(), 1);
        assert!(!cert.is_ca());
        assert!(cert.is_self_signed());
        assert!(cert.extensions().is_empty());
    }

    #[test]
    fn pem_chain() {
        let ring = KeyRing::new();
        let ca = test::Issued::root_ca(&ring, "CN=Test CA");
        let ee = ca.end_entity(&ring, "CN=Bob,CN=Test CA");
        let mut data = test::pem_encode("CERTIFICATE", &ee.cert.to_bytes());
        data.push_str(&test::pem_encode("RSA PRIVATE KEY", b"secret"));
        data.push_str(&test::pem_encode("CERTIFICATE", &ca.cert.to_bytes()));
        let chain = Cert::decode_pem_chain(data.as_bytes()).unwrap();
        assert_eq!(chain, vec![ee.cert.clone(), ca.cert.clone()]);
        assert_eq!(
            Cert::from_pem_or_der(Bytes::from(data)).unwrap(), ee.cert
        );
        assert_eq!(
            Cert::from_pem_or_der(ca.cert.to_bytes()).unwrap(), ca.cert
        );
    }
}
