//! Trust anchors.
//!
//! A trust anchor is a CA certificate from the trust directory together
//! with the revocation checker and namespace policy for the CA. The files
//! for an anchor with hash `<hash>` and number `<n>` are the certificate
//! `<hash>.<n>`, the CRL `<hash>.r<n>`, and the namespace policy in
//! `<hash>.namespaces` or `<hash>.signing_policy`.

use std::{error, fmt, fs, io};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use log::{debug, warn};
use crate::cert::{Cert, CertLoadError};
use crate::namespace::{NamespaceError, NamespaceFormat, NamespacePolicy};
use crate::revocation::{RevocationChecker, RevocationCheckerFactory};
use crate::x509::Time;


//------------ AnchorFile ----------------------------------------------------

/// The name of a CA certificate file in the trust directory.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct AnchorFile {
    hash: String,
    number: u32,
}

impl AnchorFile {
    pub fn new(hash: impl Into<String>, number: u32) -> Self {
        AnchorFile { hash: hash.into(), number }
    }

    /// Parses a file name of the form `<hash>.<n>`.
    ///
    /// The hash has to be eight lower-case hex digits and `n` a decimal
    /// number.
    pub fn from_file_name(name: &str) -> Option<Self> {
        let (hash, number) = name.split_once('.')?;
        if hash.len() != 8 || !hash.bytes().all(|ch| {
            ch.is_ascii_digit() || (b'a'..=b'f').contains(&ch)
        }) {
            return None
        }
        if number.is_empty() || !number.bytes().all(|ch| ch.is_ascii_digit()) {
            return None
        }
        Some(AnchorFile::new(hash, number.parse().ok()?))
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn file_name(&self) -> String {
        format!("{}.{}", self.hash, self.number)
    }

    pub fn crl_file_name(&self) -> String {
        format!("{}.r{}", self.hash, self.number)
    }

    pub fn namespace_file_name(&self, format: NamespaceFormat) -> String {
        format!("{}.{}", self.hash, format.extension())
    }
}

impl fmt::Display for AnchorFile {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}", self.hash, self.number)
    }
}


//------------ TrustAnchor ---------------------------------------------------

/// A trusted CA.
#[derive(Clone, Debug)]
pub struct TrustAnchor {
    /// The directory the anchor lives in.
    dir: PathBuf,

    /// The name of the certificate file.
    file: AnchorFile,

    /// The CA certificate.
    cert: Cert,

    /// The OpenSSL hash of the certificate’s subject.
    subject_hash: String,

    /// The modification time of the certificate file.
    cert_modified: SystemTime,

    /// The namespace policy if there is one.
    namespace: Option<Arc<NamespacePolicy>>,

    /// The modification times of the namespace files.
    namespace_modified: NamespaceStamp,

    /// The revocation checker if one could be created.
    revocation: Option<Arc<dyn RevocationChecker>>,
}

impl TrustAnchor {
    /// Loads an anchor from the trust directory.
    ///
    /// The certificate has to be a currently valid CA certificate that is
    /// allowed to sign certificates. If `factory` is `None`, the anchor
    /// will not have a revocation checker.
    pub fn load(
        dir: &Path,
        file: AnchorFile,
        factory: Option<&dyn RevocationCheckerFactory>,
    ) -> Result<Self, AnchorError> {
        let path = dir.join(file.file_name());
        let cert_modified = fs::metadata(&path).and_then(|meta| {
            meta.modified()
        }).map_err(AnchorError::from_io)?;
        let cert = Cert::load(&path).map_err(AnchorError::from_load)?;
        Self::verify_cert(&cert, Time::now())?;

        let subject_hash = cert.subject().openssl_hash();
        if subject_hash != file.hash() {
            warn!(
                "{}: subject hash is {}, file will be found by that.",
                path.display(), subject_hash
            );
        }

        let namespace_modified = NamespaceStamp::new(dir, &file);
        let namespace = match load_namespace(dir, &file, &cert) {
            Ok(policy) => policy.map(Arc::new),
            Err(err) => {
                warn!(
                    "{}: cannot read namespace policy, CA is unrestricted: {}",
                    path.display(), err
                );
                None
            }
        };

        let revocation = factory.and_then(|factory| {
            match factory.create(&cert, &dir.join(file.crl_file_name())) {
                Ok(checker) => Some(checker),
                Err(err) => {
                    warn!(
                        "{}: cannot create revocation checker: {}",
                        path.display(), err
                    );
                    None
                }
            }
        });

        debug!(
            "Loaded trust anchor {} for '{}'.",
            path.display(), cert.subject()
        );
        Ok(TrustAnchor {
            dir: dir.into(),
            file,
            cert,
            subject_hash,
            cert_modified,
            namespace,
            namespace_modified,
            revocation,
        })
    }

    /// Checks that a certificate can be used as a trust anchor.
    pub fn verify_cert(cert: &Cert, now: Time) -> Result<(), AnchorError> {
        if !cert.is_ca() {
            return Err(AnchorError::NotCa)
        }
        let can_sign = cert.key_usage().map(|usage| {
            usage.key_cert_sign()
        }).unwrap_or(false);
        if !can_sign {
            return Err(AnchorError::MissingKeyCertSign)
        }
        if let Err(err) = cert.verify_validity_at(now) {
            return Err(if err.is_not_yet_valid() {
                AnchorError::NotYetValid(cert.validity().not_before())
            }
            else {
                AnchorError::Expired(cert.validity().not_after())
            })
        }
        Ok(())
    }

    /// Updates the anchor from its files.
    ///
    /// If the certificate file has changed, the whole anchor is reloaded.
    /// Otherwise the revocation checker is asked to update itself and the
    /// namespace policy is reloaded if its files have changed.
    ///
    /// Returns a new anchor if it needs to be replaced or `None` if it can
    /// stay as it is. A namespace policy that fails to load is logged and
    /// the old policy kept.
    pub fn check_update(
        &self, factory: Option<&dyn RevocationCheckerFactory>
    ) -> Result<Option<Self>, AnchorError> {
        let modified = fs::metadata(self.path()).and_then(|meta| {
            meta.modified()
        }).map_err(AnchorError::from_io)?;
        if self.cert_modified != modified {
            debug!(
                "{}: certificate changed, reloading.", self.path().display()
            );
            return Self::load(&self.dir, self.file.clone(), factory).map(Some)
        }

        if let Some(revocation) = self.revocation.as_ref() {
            revocation.check_update()
        }

        let stamp = NamespaceStamp::new(&self.dir, &self.file);
        if stamp == self.namespace_modified {
            return Ok(None)
        }
        let mut res = self.clone();
        res.namespace_modified = stamp;
        match load_namespace(&self.dir, &self.file, &self.cert) {
            Ok(policy) => {
                debug!(
                    "{}: namespace policy changed, reloaded.",
                    self.path().display()
                );
                res.namespace = policy.map(Arc::new);
            }
            Err(err) => {
                warn!(
                    "{}: cannot reload namespace policy, keeping old one: {}",
                    self.path().display(), err
                );
            }
        }
        Ok(Some(res))
    }

    pub fn file(&self) -> &AnchorFile {
        &self.file
    }

    /// Returns the path of the certificate file.
    pub fn path(&self) -> PathBuf {
        self.dir.join(self.file.file_name())
    }

    /// Returns the path of the CRL file.
    pub fn crl_path(&self) -> PathBuf {
        self.dir.join(self.file.crl_file_name())
    }

    pub fn cert(&self) -> &Cert {
        &self.cert
    }

    /// Returns the OpenSSL hash of the certificate’s subject.
    pub fn subject_hash(&self) -> &str {
        &self.subject_hash
    }

    pub fn namespace(&self) -> Option<&NamespacePolicy> {
        self.namespace.as_deref()
    }

    pub fn revocation(&self) -> Option<&dyn RevocationChecker> {
        self.revocation.as_deref()
    }
}


//------------ NamespaceStamp ------------------------------------------------

/// The modification times of both namespace files.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct NamespaceStamp {
    namespaces: Option<SystemTime>,
    signing_policy: Option<SystemTime>,
}

impl NamespaceStamp {
    fn new(dir: &Path, file: &AnchorFile) -> Self {
        let modified = |format| {
            fs::metadata(
                dir.join(file.namespace_file_name(format))
            ).and_then(|meta| meta.modified()).ok()
        };
        NamespaceStamp {
            namespaces: modified(NamespaceFormat::EuGridPma),
            signing_policy: modified(NamespaceFormat::Globus),
        }
    }
}

/// Loads the namespace policy for an anchor.
///
/// The `.namespaces` file is preferred. The `.signing_policy` file is used
/// if the former is missing or broken. Returns `Ok(None)` if neither file
/// exists.
fn load_namespace(
    dir: &Path, file: &AnchorFile, cert: &Cert,
) -> Result<Option<NamespacePolicy>, NamespaceError> {
    let mut failed = None;
    for format in [NamespaceFormat::EuGridPma, NamespaceFormat::Globus] {
        let path = dir.join(file.namespace_file_name(format));
        match NamespacePolicy::load(&path, format, cert.subject()) {
            Ok(policy) => return Ok(Some(policy)),
            Err(err) if err.is_not_found() => { }
            Err(err) => {
                debug!("{}: {}", path.display(), err);
                failed.get_or_insert(err);
            }
        }
    }
    match failed {
        Some(err) => Err(err),
        None => Ok(None),
    }
}


//------------ AnchorError ---------------------------------------------------

/// A trust anchor could not be loaded.
#[derive(Debug)]
pub enum AnchorError {
    /// The certificate file doesn’t exist (anymore).
    NotFound,

    /// The certificate file could not be read.
    Io(io::Error),

    /// The certificate file doesn’t contain a certificate.
    Malformed(CertLoadError),

    /// The certificate is not a CA certificate.
    NotCa,

    /// The certificate is not allowed to sign certificates.
    MissingKeyCertSign,

    /// The certificate has expired.
    Expired(Time),

    /// The certificate is not valid yet.
    NotYetValid(Time),
}

impl AnchorError {
    fn from_io(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            AnchorError::NotFound
        }
        else {
            AnchorError::Io(err)
        }
    }

    fn from_load(err: CertLoadError) -> Self {
        match err {
            CertLoadError::Io(err) => Self::from_io(err),
            err => AnchorError::Malformed(err),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(*self, AnchorError::NotFound)
    }
}

impl fmt::Display for AnchorError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            AnchorError::NotFound => f.write_str("file not found"),
            AnchorError::Io(ref err) => err.fmt(f),
            AnchorError::Malformed(ref err) => err.fmt(f),
            AnchorError::NotCa => f.write_str("not a CA certificate"),
            AnchorError::MissingKeyCertSign => {
                f.write_str("key usage does not allow certificate signing")
            }
            AnchorError::Expired(time) => write!(f, "expired at {}", time),
            AnchorError::NotYetValid(time) => {
                write!(f, "not valid before {}", time)
            }
        }
    }
}

impl error::Error for AnchorError { }


//============ Tests =========================================================
