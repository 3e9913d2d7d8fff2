//! Checking certificates for revocation.
//!
//! Each trust anchor can have a revocation checker attached that answers
//! whether a certificate issued by the anchor’s CA has been revoked. The
//! checker is created through a [`RevocationCheckerFactory`] when the
//! anchor is loaded. Which factory is used is selected through
//! [`RevocationCheckerKind`] in the configuration or can be provided
//! directly.
//!
//! The [`FileRevocationChecker`] reads the CA’s CRL from the trust
//! directory. It keeps the parsed CRL in memory and only reloads it when
//! [`RevocationChecker::check_update`] notices that the file has changed.

use std::{error, fmt, fs};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, RwLock};
use std::time::SystemTime;
use log::{debug, error, warn};
use crate::cert::Cert;
use crate::crl::{Crl, CrlError};
use crate::dn::DistinguishedName;
use crate::x509::{Serial, Time};


//------------ RevocationChecker ---------------------------------------------

/// A type that can check certificates of a single CA for revocation.
pub trait RevocationChecker: fmt::Debug + Send + Sync {
    /// Checks whether a certificate has been revoked.
    ///
    /// The certificate has already been verified to be issued by the CA
    /// the checker was created for.
    fn check(&self, cert: &Cert) -> Result<(), RevocationError>;

    /// Reloads the revocation information if it has changed.
    fn check_update(&self);
}


//------------ RevocationCheckerFactory --------------------------------------

/// A type that creates revocation checkers for trust anchors.
pub trait RevocationCheckerFactory: fmt::Debug + Send + Sync {
    /// Creates the revocation checker for a CA.
    ///
    /// The `crl_path` is where the CA’s CRL file lives in the trust
    /// directory. It may not exist.
    fn create(
        &self, ca: &Cert, crl_path: &Path
    ) -> Result<Arc<dyn RevocationChecker>, RevocationError>;
}


//------------ RevocationCheckerKind -----------------------------------------

/// The revocation checkers available through configuration.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize, serde::Serialize),
    serde(rename_all = "lowercase")
)]
pub enum RevocationCheckerKind {
    /// CRL files in the trust directory.
    #[default]
    File,

    /// Certificates are never considered revoked.
    None,
}

impl RevocationCheckerKind {
    /// Returns the factory for this kind of checker.
    pub fn factory(
        self, crl_required: bool
    ) -> Arc<dyn RevocationCheckerFactory> {
        match self {
            RevocationCheckerKind::File => {
                Arc::new(FileCheckerFactory::new(crl_required))
            }
            RevocationCheckerKind::None => Arc::new(NoCheckerFactory),
        }
    }
}

impl FromStr for RevocationCheckerKind {
    type Err = UnknownCheckerKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("file") {
            Ok(RevocationCheckerKind::File)
        }
        else if s.eq_ignore_ascii_case("none") {
            Ok(RevocationCheckerKind::None)
        }
        else {
            Err(UnknownCheckerKind(s.into()))
        }
    }
}

impl fmt::Display for RevocationCheckerKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match *self {
            RevocationCheckerKind::File => "file",
            RevocationCheckerKind::None => "none",
        })
    }
}


//------------ FileCheckerFactory --------------------------------------------

/// The factory for file based revocation checkers.
#[derive(Clone, Copy, Debug)]
pub struct FileCheckerFactory {
    crl_required: bool,
}

impl FileCheckerFactory {
    pub fn new(crl_required: bool) -> Self {
        FileCheckerFactory { crl_required }
    }
}

impl RevocationCheckerFactory for FileCheckerFactory {
    fn create(
        &self, ca: &Cert, crl_path: &Path
    ) -> Result<Arc<dyn RevocationChecker>, RevocationError> {
        Ok(Arc::new(FileRevocationChecker::new(
            ca.clone(), crl_path.into(), self.crl_required
        )))
    }
}


//------------ FileRevocationChecker -----------------------------------------

/// A revocation checker using a CRL file.
///
/// The result of the last load is kept. If it failed, all checks fail with
/// the same error until the file changes.
#[derive(Debug)]
pub struct FileRevocationChecker {
    /// The CA certificate.
    ca: Cert,

    /// The path of the CRL file.
    path: PathBuf,

    /// Whether a missing CRL is an error or only worth a warning.
    crl_required: bool,

    /// The current CRL or the reason why there is none.
    state: RwLock<CrlState>,
}

#[derive(Debug)]
struct CrlState {
    /// The modification time of the file when it was loaded.
    ///
    /// This is `None` if the file couldn’t be found.
    modified: Option<SystemTime>,

    /// The result of the last load.
    crl: Result<Arc<Crl>, CrlError>,
}

impl FileRevocationChecker {
    /// Creates a new checker and tries to load the CRL.
    pub fn new(ca: Cert, path: PathBuf, crl_required: bool) -> Self {
        let state = CrlState::load(&ca, &path, crl_required);
        FileRevocationChecker {
            ca, path, crl_required,
            state: RwLock::new(state),
        }
    }

    /// Returns the path to the CRL file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the currently loaded CRL.
    pub fn crl(&self) -> Result<Arc<Crl>, CrlError> {
        self.state.read().unwrap_or_else(|err| {
            err.into_inner()
        }).crl.clone()
    }

    /// Checks a certificate at the given time.
    pub fn check_at(
        &self, cert: &Cert, now: Time
    ) -> Result<(), RevocationError> {
        let crl = self.crl().map_err(|err| {
            RevocationError::from_crl_error(&self.ca, &self.path, err)
        })?;
        if let Err(err) = crl.verify_validity_at(now) {
            return Err(if err.is_not_yet_valid() {
                RevocationError::NotYetValid {
                    ca: self.ca.subject().clone(),
                    this_update: crl.this_update(),
                }
            }
            else {
                RevocationError::Expired {
                    ca: self.ca.subject().clone(),
                    next_update: crl.next_update().unwrap_or_else(
                        || crl.this_update()
                    ),
                }
            })
        }
        let serial = cert.serial_number();
        if let Some(entry) = crl.revoked_certs().get(serial) {
            return Err(RevocationError::Revoked {
                serial: serial.clone(),
                date: entry.revocation_date(),
            })
        }
        Ok(())
    }
}

impl RevocationChecker for FileRevocationChecker {
    fn check(&self, cert: &Cert) -> Result<(), RevocationError> {
        self.check_at(cert, Time::now())
    }

    fn check_update(&self) {
        let modified = modified(&self.path);
        {
            let state = self.state.read().unwrap_or_else(|err| {
                err.into_inner()
            });
            if state.modified == modified {
                return
            }
        }
        debug!("CRL {} changed, reloading.", self.path.display());
        let new_state = CrlState::load(&self.ca, &self.path, self.crl_required);
        let mut state = self.state.write().unwrap_or_else(|err| {
            err.into_inner()
        });
        *state = new_state;
    }
}

impl CrlState {
    fn load(ca: &Cert, path: &Path, crl_required: bool) -> Self {
        let modified = modified(path);
        let crl = Crl::load(path).and_then(|crl| {
            crl.verify_for_ca(ca)?;
            Ok(Arc::new(crl))
        });
        match crl {
            Ok(ref crl) => {
                debug!(
                    "Loaded CRL {} with {} entries.",
                    path.display(), crl.revoked_certs().len()
                );
            }
            Err(ref err) if err.is_not_found() && !crl_required => {
                debug!("No CRL for CA '{}'.", ca.subject());
            }
            Err(ref err) if crl_required => {
                error!(
                    "Cannot use CRL {} for CA '{}': {}",
                    path.display(), ca.subject(), err
                );
            }
            Err(ref err) => {
                warn!(
                    "Cannot use CRL {} for CA '{}': {}",
                    path.display(), ca.subject(), err
                );
            }
        }
        CrlState { modified, crl }
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|meta| meta.modified()).ok()
}


//------------ NoCheckerFactory and NoRevocationChecker ----------------------

/// A factory for checkers that never report a certificate revoked.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoCheckerFactory;

impl RevocationCheckerFactory for NoCheckerFactory {
    fn create(
        &self, _ca: &Cert, _crl_path: &Path
    ) -> Result<Arc<dyn RevocationChecker>, RevocationError> {
        Ok(Arc::new(NoRevocationChecker))
    }
}

/// A checker that never reports a certificate revoked.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoRevocationChecker;

impl RevocationChecker for NoRevocationChecker {
    fn check(&self, _cert: &Cert) -> Result<(), RevocationError> {
        Ok(())
    }

    fn check_update(&self) { }
}


//------------ UnknownCheckerKind --------------------------------------------

/// The name of a revocation checker is not known.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UnknownCheckerKind(String);

impl fmt::Display for UnknownCheckerKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "unknown revocation checker '{}'", self.0)
    }
}

impl error::Error for UnknownCheckerKind { }


//------------ RevocationError -----------------------------------------------

/// A certificate is revoked or its revocation status is unknown.
#[derive(Clone, Debug, PartialEq)]
pub enum RevocationError {
    /// The certificate has been revoked.
    Revoked {
        serial: Serial,
        date: Time,
    },

    /// There is no CRL for the CA.
    NoCrl {
        ca: DistinguishedName,
        path: PathBuf,
    },

    /// The CRL could not be used.
    Crl {
        ca: DistinguishedName,
        path: PathBuf,
        err: CrlError,
    },

    /// The CRL is past its next update time.
    Expired {
        ca: DistinguishedName,
        next_update: Time,
    },

    /// The CRL’s this update time is in the future.
    NotYetValid {
        ca: DistinguishedName,
        this_update: Time,
    },
}

impl RevocationError {
    fn from_crl_error(ca: &Cert, path: &Path, err: CrlError) -> Self {
        if err.is_not_found() {
            RevocationError::NoCrl {
                ca: ca.subject().clone(),
                path: path.into(),
            }
        }
        else {
            RevocationError::Crl {
                ca: ca.subject().clone(),
                path: path.into(),
                err
            }
        }
    }

    /// Returns whether the certificate has been found in a CRL.
    ///
    /// All other errors mean the revocation status is unknown.
    pub fn is_revoked(&self) -> bool {
        matches!(*self, RevocationError::Revoked { .. })
    }

    /// Returns whether the CRL is outside its validity period.
    pub fn is_stale(&self) -> bool {
        matches!(
            *self,
            RevocationError::Expired { .. }
            | RevocationError::NotYetValid { .. }
        )
    }
}

impl fmt::Display for RevocationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            RevocationError::Revoked { ref serial, date } => {
                write!(
                    f, "certificate with serial {} revoked at {}",
                    serial, date
                )
            }
            RevocationError::NoCrl { ref ca, ref path } => {
                write!(
                    f, "no CRL found for CA '{}' at {}", ca, path.display()
                )
            }
            RevocationError::Crl { ref ca, ref path, ref err } => {
                write!(
                    f, "invalid CRL {} for CA '{}': {}",
                    path.display(), ca, err
                )
            }
            RevocationError::Expired { ref ca, next_update } => {
                write!(
                    f, "CRL of CA '{}' expired at {}", ca, next_update
                )
            }
            RevocationError::NotYetValid { ref ca, this_update } => {
                write!(
                    f, "CRL of CA '{}' not valid before {}", ca, this_update
                )
            }
        }
    }
}

impl error::Error for RevocationError { }


//============ Tests =========================================================
