//! Test data for certificates and CRLs.

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use bcder::encode;
use bcder::{BitString, Captured, ConstOid, Mode, OctetString, Tag};
use bcder::decode::IntoSource;
use bcder::encode::{PrimitiveContent, Values};
use bytes::Bytes;
use chrono::TimeDelta;
use ring::digest;
use crate::oid;
use crate::cert::{BasicConstraints, Cert, KeyUsage};
use crate::crl::IssuingDistributionPoint;
use crate::crypto::{PublicKey, SignatureAlgorithm};
use crate::dn::{Attribute, DistinguishedName};
use crate::util::pem;
use crate::x509::{Serial, Time};
use super::crypto::{KeyRing, TestKey};


//------------ Issued --------------------------------------------------------

/// A certificate together with its private key.
pub struct Issued {
    pub key: TestKey,
    pub cert: Cert,
}

impl Issued {
    /// Creates a self-signed CA certificate without path length limit.
    pub fn root_ca(ring: &KeyRing, subject: &str) -> Self {
        Self::root_ca_with(ring, subject, None)
    }

    pub fn root_ca_with(
        ring: &KeyRing, subject: &str, path_len: Option<u32>
    ) -> Self {
        Self::self_signed(ring, subject, ca_template(path_len))
    }

    /// Creates a self-signed certificate from a builder.
    pub fn self_signed(
        ring: &KeyRing, subject: &str, builder: TbsBuilder
    ) -> Self {
        let key = ring.create_key();
        let subject = dn(subject);
        let tbs = builder
            .issuer(&subject)
            .subject(&subject)
            .public_key(key.key_info())
            .finalize();
        Issued {
            cert: Cert::decode(sign_tbs(tbs, &key)).unwrap(),
            key,
        }
    }

    /// Issues a subordinate CA certificate.
    pub fn sub_ca(
        &self, ring: &KeyRing, subject: &str, path_len: Option<u32>
    ) -> Self {
        self.issue(ring, ca_template(path_len).subject(&dn(subject)))
    }

    /// Issues an end entity certificate.
    pub fn end_entity(&self, ring: &KeyRing, subject: &str) -> Self {
        self.issue(ring, ee_template().subject(&dn(subject)))
    }

    /// Issues an RFC 3820 proxy with the given extra common name.
    pub fn rfc3820_proxy(
        &self, ring: &KeyRing, cn: &str, path_len: Option<u32>
    ) -> Self {
        self.issue(ring,
            ee_template()
                .subject(&self.proxy_subject(cn))
                .proxy_cert_info(
                    &oid::PE_PROXY_CERT_INFO, path_len, &oid::PPL_INHERIT_ALL
                )
        )
    }

    /// Issues a pre-RFC draft proxy with the given extra common name.
    pub fn draft_proxy(
        &self, ring: &KeyRing, cn: &str, path_len: Option<u32>
    ) -> Self {
        self.issue(ring,
            ee_template()
                .subject(&self.proxy_subject(cn))
                .proxy_cert_info(
                    &oid::PE_PROXY_CERT_INFO_DRAFT, path_len,
                    &oid::PPL_INHERIT_ALL
                )
        )
    }

    /// Issues a legacy Globus proxy.
    ///
    /// The `cn` should be `proxy` or `limited proxy`.
    pub fn legacy_proxy(&self, ring: &KeyRing, cn: &str) -> Self {
        self.issue(ring, ee_template().subject(&self.proxy_subject(cn)))
    }

    /// Returns the subject name with an additional common name.
    pub fn proxy_subject(&self, cn: &str) -> DistinguishedName {
        let mut attrs = self.cert.subject().attributes().to_vec();
        attrs.push(Attribute::from_const(oid::AT_COMMON_NAME, cn));
        DistinguishedName::new(attrs)
    }

    /// Issues a certificate from a builder with a fresh key.
    ///
    /// The builder’s issuer and public key are set by this method.
    pub fn issue(&self, ring: &KeyRing, builder: TbsBuilder) -> Self {
        let key = ring.create_key();
        let cert = self.sign(builder.public_key(key.key_info()));
        Issued { key, cert }
    }

    /// Issues a certificate with subject and authority key identifiers.
    pub fn issue_with_key_ids(
        &self, ring: &KeyRing, builder: TbsBuilder
    ) -> Self {
        let key = ring.create_key();
        let cert = self.sign(
            builder.public_key(key.key_info()).key_identifiers(
                &key.key_info(), &self.key.key_info()
            )
        );
        Issued { key, cert }
    }

    /// Signs a builder with this certificate’s key.
    ///
    /// Only the issuer is set. The builder needs to have a public key.
    pub fn sign(&self, builder: TbsBuilder) -> Cert {
        let tbs = builder.issuer(self.cert.subject()).finalize();
        Cert::decode(sign_tbs(tbs, &self.key)).unwrap()
    }

    /// Returns a CRL builder for this certificate as the issuer.
    pub fn crl(&self) -> CrlBuilder {
        CrlBuilder::new(self.cert.subject())
    }
}

/// Returns a builder for a CA certificate.
pub fn ca_template(path_len: Option<u32>) -> TbsBuilder {
    TbsBuilder::v3()
        .basic_constraints(true, true, path_len)
        .key_usage(true, KeyUsage::KEY_CERT_SIGN | KeyUsage::CRL_SIGN)
}

/// Returns a builder for an end entity or proxy certificate.
pub fn ee_template() -> TbsBuilder {
    TbsBuilder::v3()
        .key_usage(
            true, KeyUsage::DIGITAL_SIGNATURE | KeyUsage::KEY_ENCIPHERMENT
        )
}

/// Parses a name in either string form.
pub fn dn(name: &str) -> DistinguishedName {
    name.parse().unwrap()
}


//------------ TbsBuilder ---------------------------------------------------

/// Helps creating the TBS portion of a certficate.
pub struct TbsBuilder {
    version: Option<DerData>,
    serial_number: DerData,
    signature: SignatureAlgorithm,
    issuer: Option<DerData>,
    validity: DerData,
    subject: Option<DerData>,
    subject_public_key_info: Option<DerData>,
    extensions: Option<Vec<DerData>>,
}

impl Default for TbsBuilder {
    fn default() -> Self {
        TbsBuilder {
            version: None,
            serial_number: DerData::encode(
                (&Serial::from(next_serial())).encode()
            ),
            signature: SignatureAlgorithm::RsaSha256,
            issuer: None,
            validity: DerData::encode(
                encode::sequence((
                    five_minutes_ago().encode_varied(),
                    next_year().encode_varied()
                ))
            ),
            subject: None,
            subject_public_key_info: None,
            extensions: None,
        }
    }
}

impl TbsBuilder {
    pub fn v1() -> Self {
        Self::default()
    }

    pub fn v3() -> Self {
        TbsBuilder {
            version: Some(DerData::encode(2u8.encode())),
            .. Default::default()
        }
    }

    pub fn finalize(self) -> DerData {
        DerData::encode(encode::sequence((
            self.version.map(|ver| encode::sequence_as(Tag::CTX_0, ver)),
            self.serial_number,
            self.signature.x509_encode(),
            self.issuer.unwrap(),
            self.validity,
            self.subject.unwrap(),
            self.subject_public_key_info.unwrap(),
            self.extensions.map(|ext| {
                encode::sequence_as(Tag::CTX_3, encode::sequence(
                    encode::iter(ext.into_iter())
                ))
            }),
        )))
    }

    pub fn serial(mut self, serial: u64) -> Self {
        self.serial_number = DerData::encode(
            (&Serial::from(serial)).encode()
        );
        self
    }

    /// Changes the signature algorithm given inside the TBS part.
    pub fn signature(mut self, algorithm: SignatureAlgorithm) -> Self {
        self.signature = algorithm;
        self
    }

    pub fn issuer(mut self, issuer: &DistinguishedName) -> Self {
        self.issuer = Some(issuer.to_captured().into());
        self
    }

    pub fn validity(mut self, not_before: Time, not_after: Time) -> Self {
        self.validity = DerData::encode(
            encode::sequence((
                not_before.encode_varied(), not_after.encode_varied()
            ))
        );
        self
    }

    /// Makes the certificate expire yesterday.
    pub fn expired(self) -> Self {
        let now = Time::now();
        self.validity(now - TimeDelta::days(30), now - TimeDelta::days(1))
    }

    pub fn subject(mut self, subject: &DistinguishedName) -> Self {
        self.subject = Some(subject.to_captured().into());
        self
    }

    pub fn public_key(mut self, key: PublicKey) -> Self {
        self.subject_public_key_info = Some(
            DerData::encode(key.encode_ref())
        );
        self
    }

    pub fn extension(mut self, extension: DerData) -> Self {
        self.extensions.get_or_insert_with(Vec::new).push(extension);
        self
    }

    /// Adds an extension with an already encoded value.
    pub fn raw_extension(
        self, oid: &ConstOid, critical: bool, value: DerData
    ) -> Self {
        self.extension(encoded_extension(oid, critical, value))
    }

    /// Adds non-critical subject and authority key identifiers.
    pub fn key_identifiers(
        self, subject: &PublicKey, authority: &PublicKey
    ) -> Self {
        self.raw_extension(
            &oid::CE_SUBJECT_KEY_IDENTIFIER, false,
            DerData::encode(
                OctetString::new(key_identifier(subject)).encode()
            )
        ).raw_extension(
            &oid::CE_AUTHORITY_KEY_IDENTIFIER, false,
            authority_key_identifier(authority)
        )
    }

    pub fn basic_constraints(
        self, critical: bool, ca: bool, path_len: Option<u32>
    ) -> Self {
        self.raw_extension(
            &oid::CE_BASIC_CONSTRAINTS, critical,
            DerData::encode(BasicConstraints::new(ca, path_len).encode())
        )
    }

    pub fn key_usage(self, critical: bool, usage: KeyUsage) -> Self {
        self.raw_extension(
            &oid::CE_KEY_USAGE, critical, DerData::encode(usage.encode())
        )
    }

    /// Adds a critical proxy certificate info extension.
    ///
    /// The `oid` selects the flavor, the extension is always encoded in
    /// the RFC 3820 layout.
    pub fn proxy_cert_info(
        self, oid: &ConstOid, path_len: Option<u32>, language: &ConstOid
    ) -> Self {
        self.raw_extension(
            oid, true,
            DerData::encode(encode::sequence((
                path_len.map(|len| u64::from(len).encode()),
                encode::sequence(language.encode()),
            )))
        )
    }
}

fn encoded_extension(
    oid: &ConstOid, critical: bool, value: DerData
) -> DerData {
    DerData::encode(
        encode::sequence((
            oid.encode(),
            if critical { Some(true.encode()) } else { None },
            OctetString::new(value.0).encode()
        ))
    )
}

fn next_serial() -> u64 {
    static SERIAL: AtomicU64 = AtomicU64::new(1000);
    SERIAL.fetch_add(1, Ordering::Relaxed)
}

fn five_minutes_ago() -> Time {
    Time::now() - TimeDelta::minutes(5)
}

fn next_year() -> Time {
    Time::now() + TimeDelta::days(365)
}


//------------ Signing -------------------------------------------------------

/// Signs the encoded TBS part and returns the complete object.
///
/// This works for both certificates and CRLs.
pub fn sign_tbs(tbs: DerData, key: &TestKey) -> DerData {
    let signature = key.sign(&tbs);
    DerData::encode(
        encode::sequence((
            tbs,
            signature.algorithm().x509_encode(),
            BitString::new(0, signature.value().clone()).encode()
        ))
    )
}

/// Wraps data into PEM armor.
pub fn pem_encode(label: &str, data: &[u8]) -> String {
    pem::encode(label, data)
}


//------------ CrlBuilder ----------------------------------------------------

/// Helps creating a signed CRL.
pub struct CrlBuilder {
    v2: bool,
    issuer: DerData,
    this_update: Time,
    next_update: Option<Time>,
    revoked: Vec<DerData>,
    extensions: Vec<DerData>,
}

impl CrlBuilder {
    /// Creates a v2 CRL valid from five minutes ago for a week.
    pub fn new(issuer: &DistinguishedName) -> Self {
        CrlBuilder {
            v2: true,
            issuer: issuer.to_captured().into(),
            this_update: five_minutes_ago(),
            next_update: Some(Time::now() + TimeDelta::days(7)),
            revoked: Vec::new(),
            extensions: Vec::new(),
        }
    }

    pub fn v1(mut self) -> Self {
        self.v2 = false;
        self
    }

    pub fn validity(
        mut self, this_update: Time, next_update: Option<Time>
    ) -> Self {
        self.this_update = this_update;
        self.next_update = next_update;
        self
    }

    pub fn revoke(mut self, serial: u64) -> Self {
        let serial = Serial::from(serial);
        self.revoked.push(DerData::encode(encode::sequence((
            (&serial).encode(),
            five_minutes_ago().encode_varied(),
        ))));
        self
    }

    pub fn crl_number(self, number: u64) -> Self {
        let number = Serial::from(number);
        self.extension(
            &oid::CE_CRL_NUMBER, false, DerData::encode((&number).encode())
        )
    }

    pub fn delta_crl(self, base: u64) -> Self {
        let base = Serial::from(base);
        self.extension(
            &oid::CE_DELTA_CRL_INDICATOR, true,
            DerData::encode((&base).encode())
        )
    }

    pub fn issuing_dp(
        self, critical: bool, idp: IssuingDistributionPoint
    ) -> Self {
        let flag = |set: bool, tag: Tag| {
            if set { Some(true.encode_as(tag)) } else { None }
        };
        let value = DerData::encode(encode::sequence((
            flag(idp.only_user_certs, Tag::CTX_1),
            flag(idp.only_ca_certs, Tag::CTX_2),
            if idp.only_some_reasons {
                Some(
                    OctetString::new(
                        Bytes::from_static(b"\x07\x80")
                    ).encode_as(Tag::CTX_3)
                )
            }
            else {
                None
            },
            flag(idp.indirect, Tag::CTX_4),
            flag(idp.only_attribute_certs, Tag::CTX_5),
        )));
        self.extension(&oid::CE_ISSUING_DISTRIBUTION_POINT, critical, value)
    }

    /// Adds a non-critical authority key identifier.
    pub fn authority_key_id(self, key: &PublicKey) -> Self {
        self.extension(
            &oid::CE_AUTHORITY_KEY_IDENTIFIER, false,
            authority_key_identifier(key)
        )
    }

    /// Adds an extension of the given type with a NULL value.
    pub fn raw_extension(self, oid: &ConstOid, critical: bool) -> Self {
        self.extension(oid, critical, DerData::encode(().encode()))
    }

    fn extension(
        mut self, oid: &ConstOid, critical: bool, value: DerData
    ) -> Self {
        self.extensions.push(encoded_extension(oid, critical, value));
        self
    }

    /// Signs the CRL and returns its encoding.
    pub fn sign(self, key: &TestKey) -> DerData {
        let tbs = DerData::encode(encode::sequence((
            if self.v2 { Some(1u8.encode()) } else { None },
            key.algorithm().x509_encode(),
            self.issuer,
            self.this_update.encode_varied(),
            self.next_update.map(|time| time.encode_varied()),
            if self.revoked.is_empty() {
                None
            }
            else {
                Some(encode::sequence(encode::iter(self.revoked.into_iter())))
            },
            if self.extensions.is_empty() {
                None
            }
            else {
                Some(encode::sequence_as(Tag::CTX_0,
                    encode::sequence(encode::iter(self.extensions.into_iter()))
                ))
            },
        )));
        sign_tbs(tbs, key)
    }
}


//------------ Key Identifiers -----------------------------------------------

/// Returns the SHA-1 hash of the subject public key bits.
pub fn key_identifier(key: &PublicKey) -> Bytes {
    Bytes::copy_from_slice(
        digest::digest(
            &digest::SHA1_FOR_LEGACY_USE_ONLY, key.bits()
        ).as_ref()
    )
}

/// Encodes an authority key identifier with only the keyIdentifier.
fn authority_key_identifier(key: &PublicKey) -> DerData {
    DerData::encode(encode::sequence(
        OctetString::new(key_identifier(key)).encode_as(Tag::CTX_0)
    ))
}


//------------ DerData ------------------------------------------------------

/// A type holding some DER encoded data for testing.
#[derive(Clone, Debug)]
pub struct DerData(Bytes);

impl DerData {
    pub fn encode(values: impl encode::Values) -> Self {
        DerData(values.to_captured(Mode::Der).into_bytes())
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

impl From<Captured> for DerData {
    fn from(data: Captured) -> Self {
        DerData(data.into_bytes())
    }
}

impl encode::Values for DerData {
    fn encoded_len(&self, _mode: Mode) -> usize {
        self.0.len()
    }

    fn write_encoded<W: io::Write>(
        &self,
        _mode: Mode,
        target: &mut W
    ) -> Result<(), io::Error> {
        target.write_all(&self.0)
    }
}

impl AsRef<[u8]> for DerData {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl IntoSource for DerData {
    type Source = <Bytes as IntoSource>::Source;

    fn into_source(self) -> Self::Source {
        self.0.into_source()
    }
}
