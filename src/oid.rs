//! The object identifiers used in this crate.
//!
//! This module collects all the object indentifiers used at various places
//! in this crate in one central place. They are public so you can refer to
//! them should that ever become necessary.

use bcder::{ConstOid, Oid};


//------------ Algorithms ----------------------------------------------------

/// [RFC 4055](https://tools.ietf.org/html/rfc4055) `rsaEncryption`
///
/// Identifies an RSA public key with no limitation to either RSASSA-PSS or
/// RSAES-OEAP.
pub const RSA_ENCRYPTION: ConstOid
    = Oid(&[42, 134, 72, 134, 247, 13, 1, 1, 1]);

/// [RFC 3279](https://tools.ietf.org/html/rfc3279) `sha1WithRSAEncryption`
pub const SHA1_WITH_RSA_ENCRYPTION: ConstOid
    = Oid(&[42, 134, 72, 134, 247, 13, 1, 1, 5]);

/// [RFC 4055](https://tools.ietf.org/html/rfc4055) `sha256WithRSAEncryption`
///
/// Identifies the PKCS #1 version 1.5 signature algorithm with SHA-256.
pub const SHA256_WITH_RSA_ENCRYPTION: ConstOid
    = Oid(&[42, 134, 72, 134, 247, 13, 1, 1, 11]);

/// [RFC 4055](https://tools.ietf.org/html/rfc4055) `sha384WithRSAEncryption`
pub const SHA384_WITH_RSA_ENCRYPTION: ConstOid
    = Oid(&[42, 134, 72, 134, 247, 13, 1, 1, 12]);

/// [RFC 4055](https://tools.ietf.org/html/rfc4055) `sha512WithRSAEncryption`
pub const SHA512_WITH_RSA_ENCRYPTION: ConstOid
    = Oid(&[42, 134, 72, 134, 247, 13, 1, 1, 13]);

/// [RFC 5480](https://tools.ietf.org/html/rfc5480) `id-ecPublicKey`
///
/// Identifies public keys for elliptic curve cryptography.
pub const EC_PUBLIC_KEY: ConstOid = Oid(&[42, 134, 72, 206, 61, 2, 1]);

/// [RFC 5480](https://tools.ietf.org/html/rfc5480) `secp256r1`
///
/// Identifies the P-256 curve for elliptic curve cryptography.
pub const SECP256R1: ConstOid = Oid(&[42, 134, 72, 206, 61, 3, 1, 7]);

/// [RFC 5480](https://tools.ietf.org/html/rfc5480) `secp384r1`
pub const SECP384R1: ConstOid = Oid(&[43, 129, 4, 0, 34]);

/// [RFC 5758](https://tools.ietf.org/html/rfc5758) `ecdsa-with-SHA256`
pub const ECDSA_WITH_SHA256: ConstOid
    = Oid(&[42, 134, 72, 206, 61, 4, 3, 2]);

/// [RFC 5758](https://tools.ietf.org/html/rfc5758) `ecdsa-with-SHA384`
pub const ECDSA_WITH_SHA384: ConstOid
    = Oid(&[42, 134, 72, 206, 61, 4, 3, 3]);


//------------ Name Attributes -----------------------------------------------

pub const AT_COMMON_NAME: ConstOid = Oid(&[85, 4, 3]);
pub const AT_SERIAL_NUMBER: ConstOid = Oid(&[85, 4, 5]);
pub const AT_COUNTRY_NAME: ConstOid = Oid(&[85, 4, 6]);
pub const AT_LOCALITY_NAME: ConstOid = Oid(&[85, 4, 7]);
pub const AT_STATE_OR_PROVINCE_NAME: ConstOid = Oid(&[85, 4, 8]);
pub const AT_STREET_ADDRESS: ConstOid = Oid(&[85, 4, 9]);
pub const AT_ORGANIZATION_NAME: ConstOid = Oid(&[85, 4, 10]);
pub const AT_ORGANIZATIONAL_UNIT_NAME: ConstOid = Oid(&[85, 4, 11]);
pub const AT_TITLE: ConstOid = Oid(&[85, 4, 12]);

/// [RFC 4519](https://tools.ietf.org/html/rfc4519) `domainComponent`
pub const AT_DOMAIN_COMPONENT: ConstOid
    = Oid(&[9, 146, 38, 137, 147, 242, 44, 100, 1, 25]);

/// [RFC 4519](https://tools.ietf.org/html/rfc4519) `uid`
pub const AT_USER_ID: ConstOid
    = Oid(&[9, 146, 38, 137, 147, 242, 44, 100, 1, 1]);

/// PKCS #9 `emailAddress`
pub const AT_EMAIL_ADDRESS: ConstOid
    = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 1]);


//------------ Certificate Extensions ----------------------------------------

pub const CE_SUBJECT_KEY_IDENTIFIER: ConstOid = Oid(&[85, 29, 14]);
pub const CE_KEY_USAGE: ConstOid = Oid(&[85, 29, 15]);
pub const CE_BASIC_CONSTRAINTS: ConstOid = Oid(&[85, 29, 19]);
pub const CE_AUTHORITY_KEY_IDENTIFIER: ConstOid = Oid(&[85, 29, 35]);

/// [RFC 3820](https://tools.ietf.org/html/rfc3820) `id-pe-proxyCertInfo`
pub const PE_PROXY_CERT_INFO: ConstOid
    = Oid(&[43, 6, 1, 5, 5, 7, 1, 14]);

/// The proxy certificate info extension of the pre-RFC Globus drafts.
///
/// This is `1.3.6.1.4.1.3536.1.222`.
pub const PE_PROXY_CERT_INFO_DRAFT: ConstOid
    = Oid(&[43, 6, 1, 4, 1, 155, 80, 1, 129, 94]);

/// [RFC 3820](https://tools.ietf.org/html/rfc3820) `id-ppl-inheritAll`
pub const PPL_INHERIT_ALL: ConstOid = Oid(&[43, 6, 1, 5, 5, 7, 21, 1]);

/// [RFC 3820](https://tools.ietf.org/html/rfc3820) `id-ppl-independent`
pub const PPL_INDEPENDENT: ConstOid = Oid(&[43, 6, 1, 5, 5, 7, 21, 2]);

/// The Globus limited proxy policy language, `1.3.6.1.4.1.3536.1.1.1.9`.
pub const PPL_LIMITED: ConstOid
    = Oid(&[43, 6, 1, 4, 1, 155, 80, 1, 1, 1, 9]);


//------------ CRL Extensions ------------------------------------------------

pub const CE_CRL_NUMBER: ConstOid = Oid(&[85, 29, 20]);
pub const CE_CRL_REASON: ConstOid = Oid(&[85, 29, 21]);
pub const CE_DELTA_CRL_INDICATOR: ConstOid = Oid(&[85, 29, 27]);
pub const CE_ISSUING_DISTRIBUTION_POINT: ConstOid = Oid(&[85, 29, 28]);

