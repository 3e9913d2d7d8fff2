//! Reading and writing PEM armored data.
//!
//! Certificate and CRL files in a grid trust directory come either as raw
//! DER or wrapped in PEM armor. The functions here find the armored blocks
//! and decode their content.

use std::{error, fmt, str};
use bytes::Bytes;
use super::base64;


//------------ Block ---------------------------------------------------------

/// A single PEM block.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Block {
    /// The label from the encapsulation boundaries, e.g., `CERTIFICATE`.
    label: String,

    /// The decoded content.
    content: Bytes,
}

impl Block {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn content(&self) -> &Bytes {
        &self.content
    }

    pub fn into_content(self) -> Bytes {
        self.content
    }
}


//------------ Functions -----------------------------------------------------

/// Parses all PEM blocks contained in `data`.
///
/// Text outside the encapsulation boundaries is ignored. If there are no
/// blocks at all, the result is empty.
pub fn parse(data: &[u8]) -> Result<Vec<Block>, PemError> {
    let text = str::from_utf8(data).map_err(|_| PemError::NotText)?;
    let mut res = Vec::new();
    let mut lines = text.lines();
    while let Some(line) = lines.next() {
        let label = match begin_label(line) {
            Some(label) => label,
            None => continue,
        };
        let mut body = String::new();
        let mut terminated = false;
        for line in lines.by_ref() {
            if end_label(line) == Some(label) {
                terminated = true;
                break
            }
            // Skip RFC 1421 style headers.
            if line.contains(':') {
                continue
            }
            body.push_str(line);
        }
        if !terminated {
            return Err(PemError::Unterminated(label.into()))
        }
        res.push(Block {
            label: label.into(),
            content: base64::Pem.decode(&body)?.into(),
        })
    }
    Ok(res)
}

/// Returns the DER encoding contained in `data`.
///
/// If `data` looks like DER already, i.e., starts with a SEQUENCE tag, it
/// is returned as is. Otherwise, the content of the first PEM block with
/// the given label is returned.
pub fn der_or_pem(data: Bytes, label: &str) -> Result<Bytes, PemError> {
    if data.first() == Some(&0x30) {
        return Ok(data)
    }
    parse(&data)?.into_iter().find(|block| {
        block.label == label
    }).map(Block::into_content).ok_or_else(|| {
        PemError::Missing(label.into())
    })
}

/// Wraps `data` into a PEM block with the given label.
///
/// The Base 64 text is broken into lines of 64 characters.
pub fn encode(label: &str, data: &[u8]) -> String {
    let body = base64::Pem.encode(data);
    let mut res = format!("-----BEGIN {}-----\n", label);
    let mut rest = body.as_str();
    while !rest.is_empty() {
        let (line, tail) = rest.split_at(rest.len().min(64));
        res.push_str(line);
        res.push('\n');
        rest = tail;
    }
    res.push_str(&format!("-----END {}-----\n", label));
    res
}

fn begin_label(line: &str) -> Option<&str> {
    line.trim().strip_prefix("-----BEGIN ")?.strip_suffix("-----")
}

fn end_label(line: &str) -> Option<&str> {
    line.trim().strip_prefix("-----END ")?.strip_suffix("-----")
}


//------------ PemError ------------------------------------------------------

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PemError {
    /// The data is neither DER nor text.
    NotText,

    /// A block was started but never ended.
    Unterminated(String),

    /// There was no block with the expected label.
    Missing(String),

    /// The content of a block is not valid Base 64.
    Base64(base64::DecodeError),
}

impl From<base64::DecodeError> for PemError {
    fn from(err: base64::DecodeError) -> Self {
        PemError::Base64(err)
    }
}

impl fmt::Display for PemError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            PemError::NotText => f.write_str("neither DER nor PEM data"),
            PemError::Unterminated(ref label) => {
                write!(f, "unterminated PEM block '{}'", label)
            }
            PemError::Missing(ref label) => {
                write!(f, "no PEM block '{}'", label)
            }
            PemError::Base64(ref err) => {
                write!(f, "invalid PEM content: {}", err)
            }
        }
    }
}

impl error::Error for PemError { }


//============ Tests =========================================================
