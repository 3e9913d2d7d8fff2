//! Distinguished names.
//!
//! This module provides the type [`DistinguishedName`] used for issuer and
//! subject names of certificates and CRLs. A name is kept as the sequence of
//! its attributes in the order they appear in the encoded name, i.e., the
//! most general attribute (usually the country) first and the most specific
//! one – for grid certificates, usually a common name – last.
//!
//! Two names are equal if they have the same attribute types in the same
//! order and their values are equal ignoring case and superfluous white
//! space.
//!
//! Names can be converted into three string forms: the RFC 2253 form which
//! lists the most specific attribute first and separates attributes with
//! commas, the X.500 or “OpenSSL” form which lists the most general
//! attribute first and starts each attribute with a slash, and a canonical
//! form. All of them are computed only once and cached.
//!
//! [`DistinguishedName`]: struct.DistinguishedName.html

use std::{error, fmt, hash, str};
use std::str::FromStr;
use std::sync::OnceLock;
use bcder::{decode, encode};
use bcder::{Captured, ConstOid, Mode, OctetString, Oid, Tag};
use bcder::decode::{DecodeError, IntoSource, Source};
use bcder::encode::{PrimitiveContent, Values};
use bytes::Bytes;
use ring::digest;
use crate::oid;


//------------ DistinguishedName ---------------------------------------------

/// A distinguished name.
#[derive(Clone, Default)]
pub struct DistinguishedName {
    /// The attributes in encoding order.
    attrs: Vec<Attribute>,

    /// The cached RFC 2253 form.
    rfc2253: OnceLock<String>,

    /// The cached X.500 form.
    x500: OnceLock<String>,

    /// The cached canonical form.
    canonical: OnceLock<String>,
}

impl DistinguishedName {
    /// Creates a new name from a list of attributes in encoding order.
    pub fn new(attrs: Vec<Attribute>) -> Self {
        DistinguishedName {
            attrs,
            rfc2253: OnceLock::new(),
            x500: OnceLock::new(),
            canonical: OnceLock::new(),
        }
    }

    /// Returns the attributes of the name in encoding order.
    pub fn attributes(&self) -> &[Attribute] {
        &self.attrs
    }

    /// Returns the number of attributes in the name.
    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    /// Returns whether the name has no attributes at all.
    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    /// Returns the value of the last attribute if it is a common name.
    ///
    /// For a proxy certificate, this is the name component added by the
    /// issuer of the proxy.
    pub fn last_cn_value(&self) -> Option<&str> {
        self.attrs.last().filter(|attr| {
            attr.oid == oid::AT_COMMON_NAME
        }).map(|attr| attr.value.as_str())
    }

    /// Returns the name with its last attribute removed.
    ///
    /// The last attribute needs to be a common name. If `check_proxy_naming`
    /// is `true`, its value needs to follow the naming convention for legacy
    /// proxies, i.e., be either `proxy`, `limited proxy`, or a decimal
    /// number.
    pub fn without_last_cn(
        &self, check_proxy_naming: bool
    ) -> Result<Self, ProxyNamingError> {
        let last = match self.last_cn_value() {
            Some(last) => last,
            None => return Err(ProxyNamingError::NoCommonName),
        };
        if check_proxy_naming && !is_proxy_cn(last) {
            return Err(ProxyNamingError::NotProxyName(last.into()))
        }
        Ok(Self::new(self.attrs[..self.attrs.len() - 1].to_vec()))
    }

    /// Returns the name in RFC 2253 form.
    ///
    /// The most specific attribute is listed first.
    pub fn to_rfc2253(&self) -> &str {
        self.rfc2253.get_or_init(|| {
            self.format_rfc2253(|value| escape_rfc2253(value))
        })
    }

    /// Returns the name in X.500 slash form.
    ///
    /// This is the form OpenSSL uses in its one-line output and which
    /// appears in namespace files. The most general attribute is listed
    /// first and each attribute starts with a slash.
    pub fn to_x500(&self) -> &str {
        self.x500.get_or_init(|| {
            let mut res = String::new();
            for attr in &self.attrs {
                res.push(if attr.multi { '+' } else { '/' });
                res.push_str(&attr.type_name());
                res.push('=');
                res.push_str(&attr.value);
            }
            res
        })
    }

    /// Returns the canonical form of the name.
    ///
    /// This is the RFC 2253 form with all values lower-cased and white
    /// space collapsed. Two names are equal if their canonical forms are.
    pub fn to_canonical(&self) -> &str {
        self.canonical.get_or_init(|| {
            self.format_rfc2253(|value| {
                escape_rfc2253(&canonical_value(value))
            })
        })
    }

    fn format_rfc2253(&self, value: impl Fn(&str) -> String) -> String {
        let mut res = String::new();
        let mut rdns: Vec<&[Attribute]> = self.rdns().collect();
        rdns.reverse();
        for (i, rdn) in rdns.into_iter().enumerate() {
            if i > 0 {
                res.push(',');
            }
            for (j, attr) in rdn.iter().enumerate() {
                if j > 0 {
                    res.push('+');
                }
                res.push_str(&attr.type_name());
                res.push('=');
                res.push_str(&value(&attr.value));
            }
        }
        res
    }

    /// Returns an iterator over the relative distinguished names.
    fn rdns(&self) -> impl Iterator<Item = &[Attribute]> + '_ {
        let mut start = 0;
        let attrs = self.attrs.as_slice();
        (0..attrs.len()).filter_map(move |i| {
            if attrs.get(i + 1).map(|attr| attr.multi).unwrap_or(false) {
                return None
            }
            let res = &attrs[start..=i];
            start = i + 1;
            Some(res)
        })
    }

    /// Returns the OpenSSL hash of the name.
    ///
    /// This is the value of OpenSSL’s `X509_NAME_hash` function as eight
    /// lower case hex digits. The trust directory uses it for naming the
    /// files of a CA.
    ///
    /// The hash is the first four octets of the SHA-1 digest over the
    /// canonical encoding of the name interpreted as a little endian
    /// integer. The canonical encoding is the DER encoding of the sequence
    /// of relative distinguished names sans the outer sequence tag. Each
    /// value is encoded as a UTF8String after removing leading and trailing
    /// white space, collapsing inner white space into a single space, and
    /// lower-casing all ASCII letters.
    pub fn openssl_hash(&self) -> String {
        let mut canon = Vec::new();
        for rdn in self.rdns() {
            let mut values: Vec<Captured> = rdn.iter().map(|attr| {
                encode::sequence((
                    attr.oid.encode_ref(),
                    OctetString::new(
                        Bytes::from(openssl_canon(&attr.value))
                    ).encode_as(Tag::UTF8_STRING)
                )).to_captured(Mode::Der)
            }).collect();
            values.sort_by(|left, right| {
                left.as_slice().cmp(right.as_slice())
            });
            canon.extend_from_slice(
                encode::set(
                    encode::iter(values.iter())
                ).to_captured(Mode::Der).as_slice()
            );
        }
        let digest = digest::digest(
            &digest::SHA1_FOR_LEGACY_USE_ONLY, &canon
        );
        let digest = digest.as_ref();
        format!(
            "{:08x}",
            u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]])
        )
    }
}

/// # Decoding and Encoding
///
/// ```txt
/// Name ::= CHOICE { -- only one possibility for now --
///   rdnSequence  RDNSequence }
///
/// RDNSequence ::= SEQUENCE OF RelativeDistinguishedName
///
/// RelativeDistinguishedName ::=
///   SET SIZE (1..MAX) OF AttributeTypeAndValue
///
/// AttributeTypeAndValue ::= SEQUENCE {
///   type     AttributeType,
///   value    AttributeValue }
/// ```
///
/// The attribute value is taken to be any of the string types. Types other
/// than UTF8String, BMPString, UniversalString, and TeletexString are
/// interpreted as UTF-8 with invalid sequences replaced.
impl DistinguishedName {
    pub fn decode<S: IntoSource>(
        source: S
    ) -> Result<Self, DecodeError<<S::Source as Source>::Error>> {
        Mode::Der.decode(source, Self::take_from)
    }

    pub fn take_from<S: decode::Source>(
        cons: &mut decode::Constructed<S>
    ) -> Result<Self, DecodeError<S::Error>> {
        let mut attrs = Vec::new();
        cons.take_sequence(|cons| {
            while let Some(()) = cons.take_opt_set(|cons| {
                let mut multi = false;
                while let Some(()) = cons.take_opt_sequence(|cons| {
                    let oid = Oid::take_from(cons)?;
                    let value = cons.take_value(|tag, content| {
                        let bytes = OctetString::from_content(
                            content
                        )?.into_bytes();
                        decode_string(tag, &bytes).ok_or_else(|| {
                            content.content_err(
                                "invalid attribute value"
                            )
                        })
                    })?;
                    attrs.push(Attribute { oid, value, multi });
                    multi = true;
                    Ok(())
                })? { }
                if !multi {
                    return Err(cons.content_err(
                        "empty relative distinguished name"
                    ))
                }
                Ok(())
            })? { }
            Ok(())
        })?;
        Ok(Self::new(attrs))
    }

    /// Returns the DER encoding of the name.
    pub fn to_captured(&self) -> Captured {
        let rdns: Vec<Captured> = self.rdns().map(|rdn| {
            let mut values: Vec<Captured> = rdn.iter().map(|attr| {
                attr.encode_ref().to_captured(Mode::Der)
            }).collect();
            values.sort_by(|left, right| {
                left.as_slice().cmp(right.as_slice())
            });
            let res = encode::set(
                encode::iter(values.iter())
            ).to_captured(Mode::Der);
            res
        }).collect();
        let res = encode::sequence(
            encode::iter(rdns.iter())
        ).to_captured(Mode::Der);
        res
    }
}

/// # Parsing
///
impl DistinguishedName {
    /// Parses a name in RFC 2253 form.
    ///
    /// Both `,` and `;` are accepted as separators, `+` separates the
    /// attributes of multi-valued relative names. Values can be quoted or
    /// use backslash escapes, including hex escapes. The hex form of values
    /// starting with `#` is not supported.
    pub fn from_rfc2253(s: &str) -> Result<Self, DnParseError> {
        if s.trim().is_empty() {
            return Ok(Self::default())
        }
        let mut rdns = Vec::new();
        let mut current = Vec::new();
        let mut chars = s.chars().peekable();
        loop {
            let mut key = String::new();
            loop {
                match chars.next() {
                    Some('=') => break,
                    Some(ch) => key.push(ch),
                    None => return Err(DnParseError("missing '='"))
                }
            }
            let oid = attribute_oid(key.trim()).ok_or(
                DnParseError("unknown attribute type")
            )?;
            while chars.next_if(|ch| *ch == ' ').is_some() { }

            let mut value = Vec::new();
            if chars.next_if_eq(&'"').is_some() {
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => unescape(&mut chars, &mut value)?,
                        Some(ch) => push_char(&mut value, ch),
                        None => {
                            return Err(DnParseError("unterminated quote"))
                        }
                    }
                }
                while chars.next_if(|ch| *ch == ' ').is_some() { }
            }
            else {
                if chars.peek() == Some(&'#') {
                    return Err(DnParseError("hex values not supported"))
                }
                let mut keep = 0;
                while let Some(ch) = chars.next_if(|ch| {
                    !matches!(ch, ',' | ';' | '+')
                }) {
                    if ch == '\\' {
                        unescape(&mut chars, &mut value)?;
                        keep = value.len();
                    }
                    else {
                        push_char(&mut value, ch);
                        if ch != ' ' {
                            keep = value.len();
                        }
                    }
                }
                value.truncate(keep);
            }
            let value = String::from_utf8(value).map_err(|_| {
                DnParseError("invalid UTF-8 in escaped value")
            })?;
            current.push(Attribute {
                oid, value, multi: !current.is_empty()
            });
            match chars.next() {
                Some('+') => { }
                Some(',') | Some(';') => {
                    rdns.push(std::mem::take(&mut current));
                }
                None => {
                    rdns.push(current);
                    break
                }
                Some(_) => {
                    return Err(DnParseError("garbage after quoted value"))
                }
            }
        }
        Ok(Self::new(rdns.into_iter().rev().flatten().collect()))
    }

    /// Parses a name in X.500 slash form.
    ///
    /// The string must start with a slash. A slash only starts a new
    /// attribute if it is followed by a known attribute type and an equals
    /// sign, so values may contain slashes.
    pub fn from_x500(s: &str) -> Result<Self, DnParseError> {
        let s = match s.strip_prefix('/') {
            Some(s) => s,
            None => return Err(DnParseError("missing leading '/'"))
        };
        if s.is_empty() {
            return Ok(Self::default())
        }
        let mut pieces = Vec::new();
        let mut start = 0;
        for (pos, ch) in s.char_indices() {
            if ch == '/' && starts_attribute(&s[pos + 1..]) {
                pieces.push(&s[start..pos]);
                start = pos + 1;
            }
        }
        pieces.push(&s[start..]);
        let mut attrs = Vec::new();
        for piece in pieces {
            let (key, value) = match piece.split_once('=') {
                Some(some) => some,
                None => return Err(DnParseError("missing '='"))
            };
            attrs.push(Attribute {
                oid: attribute_oid(key.trim()).ok_or(
                    DnParseError("unknown attribute type")
                )?,
                value: value.into(),
                multi: false,
            })
        }
        Ok(Self::new(attrs))
    }
}


//--- FromStr

impl FromStr for DistinguishedName {
    type Err = DnParseError;

    /// Parses either form, picking the X.500 form if `s` starts with a slash.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.starts_with('/') {
            Self::from_x500(s)
        }
        else {
            Self::from_rfc2253(s)
        }
    }
}


//--- PartialEq, Eq, and Hash

impl PartialEq for DistinguishedName {
    fn eq(&self, other: &Self) -> bool {
        self.attrs.len() == other.attrs.len()
        && self.attrs.iter().zip(other.attrs.iter()).all(|(left, right)| {
            left.oid == right.oid
            && left.multi == right.multi
            && canonical_value(&left.value) == canonical_value(&right.value)
        })
    }
}

impl Eq for DistinguishedName { }

impl hash::Hash for DistinguishedName {
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        self.to_canonical().hash(state)
    }
}


//--- Display and Debug

impl fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.to_rfc2253())
    }
}

impl fmt::Debug for DistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "DistinguishedName({})", self.to_rfc2253())
    }
}


//------------ Attribute -----------------------------------------------------

/// A single attribute of a distinguished name.
#[derive(Clone, Debug)]
pub struct Attribute {
    /// The attribute type.
    oid: Oid<Bytes>,

    /// The attribute value.
    value: String,

    /// Does the attribute belong to the same RDN as the one before it?
    multi: bool,
}

impl Attribute {
    /// Creates a new attribute forming a relative name on its own.
    pub fn new(oid: Oid<Bytes>, value: impl Into<String>) -> Self {
        Attribute { oid, value: value.into(), multi: false }
    }

    /// Creates a new attribute from one of the well-known types.
    pub fn from_const(oid: ConstOid, value: impl Into<String>) -> Self {
        Self::new(Oid(Bytes::from_static(oid.0)), value)
    }

    pub fn oid(&self) -> &Oid<Bytes> {
        &self.oid
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Returns the short name of the attribute type or its dotted form.
    pub fn type_name(&self) -> String {
        NAMES.iter().find(|(_, oid)| {
            self.oid == *oid
        }).map(|(name, _)| String::from(*name)).unwrap_or_else(|| {
            self.oid.to_string()
        })
    }

    /// Returns an encoder for the `AttributeTypeAndValue` sequence.
    ///
    /// Country names, domain components, and email addresses use the
    /// string types RFC 5280 prescribes for them. All other values are
    /// encoded as PrintableString if possible and as UTF8String otherwise.
    pub fn encode_ref(&self) -> impl encode::Values + '_ {
        let tag = if
            self.oid == oid::AT_DOMAIN_COMPONENT
            || self.oid == oid::AT_EMAIL_ADDRESS
        {
            Tag::IA5_STRING
        }
        else if self.value.chars().all(is_printable) {
            Tag::PRINTABLE_STRING
        }
        else {
            Tag::UTF8_STRING
        };
        encode::sequence((
            self.oid.encode_ref(),
            OctetString::new(
                Bytes::copy_from_slice(self.value.as_bytes())
            ).encode_as(tag)
        ))
    }
}


//------------ Attribute Type Names ------------------------------------------

/// The short names used for formatting.
const NAMES: &[(&str, ConstOid)] = &[
    ("CN", oid::AT_COMMON_NAME),
    ("SERIALNUMBER", oid::AT_SERIAL_NUMBER),
    ("C", oid::AT_COUNTRY_NAME),
    ("L", oid::AT_LOCALITY_NAME),
    ("ST", oid::AT_STATE_OR_PROVINCE_NAME),
    ("STREET", oid::AT_STREET_ADDRESS),
    ("O", oid::AT_ORGANIZATION_NAME),
    ("OU", oid::AT_ORGANIZATIONAL_UNIT_NAME),
    ("T", oid::AT_TITLE),
    ("DC", oid::AT_DOMAIN_COMPONENT),
    ("UID", oid::AT_USER_ID),
    ("emailAddress", oid::AT_EMAIL_ADDRESS),
];

/// Additional names accepted when parsing.
const ALIASES: &[(&str, ConstOid)] = &[
    ("E", oid::AT_EMAIL_ADDRESS),
    ("Email", oid::AT_EMAIL_ADDRESS),
    ("USERID", oid::AT_USER_ID),
    ("title", oid::AT_TITLE),
];

/// Returns the OID for an attribute type name.
///
/// This accepts the short names case-insensitively as well as dotted OIDs,
/// optionally prefixed with `OID.`.
fn attribute_oid(name: &str) -> Option<Oid<Bytes>> {
    if let Some((_, oid)) = NAMES.iter().chain(ALIASES.iter()).find(|item| {
        item.0.eq_ignore_ascii_case(name)
    }) {
        return Some(Oid(Bytes::from_static(oid.0)))
    }
    let dotted = name.strip_prefix("OID.").or_else(|| {
        name.strip_prefix("oid.")
    }).unwrap_or(name);
    oid_from_dotted(dotted)
}

/// Encodes an OID in dotted notation.
fn oid_from_dotted(s: &str) -> Option<Oid<Bytes>> {
    let mut arcs = s.split('.').map(u64::from_str);
    let first = arcs.next()?.ok()?;
    let second = arcs.next()?.ok()?;
    if first > 2 || (first < 2 && second >= 40) {
        return None
    }
    let mut res = Vec::new();
    push_arc(&mut res, first * 40 + second);
    for arc in arcs {
        push_arc(&mut res, arc.ok()?);
    }
    Some(Oid(res.into()))
}

fn push_arc(target: &mut Vec<u8>, mut arc: u64) {
    let mut buf = [0u8; 10];
    let mut pos = buf.len() - 1;
    buf[pos] = (arc & 0x7F) as u8;
    arc >>= 7;
    while arc > 0 {
        pos -= 1;
        buf[pos] = (arc & 0x7F) as u8 | 0x80;
        arc >>= 7;
    }
    target.extend_from_slice(&buf[pos..]);
}

/// Returns whether a slash form piece starts a new attribute.
fn starts_attribute(s: &str) -> bool {
    match s.find('=') {
        Some(pos) => {
            let key = &s[..pos];
            !key.contains('/') && attribute_oid(key.trim()).is_some()
        }
        None => false
    }
}


//------------ Helper Functions ----------------------------------------------

/// Returns whether a common name follows the legacy proxy naming rules.
fn is_proxy_cn(value: &str) -> bool {
    value.eq_ignore_ascii_case("proxy")
    || value.eq_ignore_ascii_case("limited proxy")
    || (!value.is_empty() && value.bytes().all(|ch| ch.is_ascii_digit()))
}

/// Returns the canonical form of a value for comparison.
fn canonical_value(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// Returns the canonical form of a value used for OpenSSL hashes.
///
/// Unlike `canonical_value`, this only lower-cases ASCII letters.
fn openssl_canon(value: &str) -> String {
    value.split_ascii_whitespace().collect::<Vec<_>>().join(
        " "
    ).to_ascii_lowercase()
}

/// Escapes a value for the RFC 2253 form.
fn escape_rfc2253(value: &str) -> String {
    let mut res = String::with_capacity(value.len());
    let last = value.chars().count().saturating_sub(1);
    for (i, ch) in value.chars().enumerate() {
        let escape = match ch {
            ',' | '+' | '"' | '\\' | '<' | '>' | ';' => true,
            '#' => i == 0,
            ' ' => i == 0 || i == last,
            _ => false
        };
        if escape {
            res.push('\\');
        }
        res.push(ch);
    }
    res
}

/// Processes the character after a backslash in RFC 2253 form.
fn unescape(
    chars: &mut std::iter::Peekable<str::Chars>,
    target: &mut Vec<u8>,
) -> Result<(), DnParseError> {
    let first = chars.next().ok_or(DnParseError("dangling escape"))?;
    if let Some(high) = first.to_digit(16) {
        if let Some(low) = chars.peek().and_then(|ch| ch.to_digit(16)) {
            chars.next();
            target.push((high * 16 + low) as u8);
            return Ok(())
        }
    }
    push_char(target, first);
    Ok(())
}

fn push_char(target: &mut Vec<u8>, ch: char) {
    let mut buf = [0u8; 4];
    target.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
}

/// Returns whether the char is allowed in a PrintableString.
fn is_printable(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(
        ch, ' ' | '\'' | '(' | ')' | '+' | ',' | '-' | '.' | '/' | ':' | '='
        | '?'
    )
}

/// Converts the content of an attribute value into a string.
fn decode_string(tag: Tag, bytes: &[u8]) -> Option<String> {
    if tag == Tag::BMP_STRING {
        if bytes.len() % 2 != 0 {
            return None
        }
        let units: Vec<u16> = bytes.chunks(2).map(|pair| {
            u16::from_be_bytes([pair[0], pair[1]])
        }).collect();
        String::from_utf16(&units).ok()
    }
    else if tag == Tag::UNIVERSAL_STRING {
        if bytes.len() % 4 != 0 {
            return None
        }
        bytes.chunks(4).map(|quad| {
            char::from_u32(
                u32::from_be_bytes([quad[0], quad[1], quad[2], quad[3]])
            )
        }).collect()
    }
    else if tag == Tag::TELETEX_STRING {
        Some(bytes.iter().map(|&ch| char::from(ch)).collect())
    }
    else if tag == Tag::UTF8_STRING {
        String::from_utf8(bytes.into()).ok()
    }
    else {
        Some(String::from_utf8_lossy(bytes).into_owned())
    }
}


//------------ ProxyNamingError ----------------------------------------------

/// The last attribute of a name is not what was requested.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ProxyNamingError {
    /// The last attribute is not a common name.
    NoCommonName,

    /// The last common name doesn’t follow the proxy naming convention.
    NotProxyName(String),
}

impl fmt::Display for ProxyNamingError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ProxyNamingError::NoCommonName => {
                f.write_str("last name component is not a common name")
            }
            ProxyNamingError::NotProxyName(ref cn) => {
                write!(f, "common name '{}' is not a proxy name", cn)
            }
        }
    }
}

impl error::Error for ProxyNamingError { }


//------------ DnParseError --------------------------------------------------

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DnParseError(&'static str);

impl fmt::Display for DnParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "invalid distinguished name: {}", self.0)
    }
}

impl error::Error for DnParseError { }


//============ Tests =========================================================
