//! Trust managers for TLS peers.
//!
//! A [`TrustManager`] bundles a trust store with a path validator and
//! checks the DER encoded certificate chains presented by TLS peers. A
//! [`TrustManagerCache`] keeps trust managers around so that several
//! connections with the same configuration share one store.

use std::{error, fmt};
use std::collections::HashMap;
use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use bcder::decode::DecodeError;
use bytes::Bytes;
use log::debug;
use crate::cert::Cert;
use crate::config::Config;
use crate::error::{ErrorKind, ValidationError};
use crate::revocation::RevocationCheckerFactory;
use crate::store::{StoreError, TrustStore};
use crate::validator::{PathValidator, ValidatedPath};


//------------ TrustManager --------------------------------------------------

/// Checks certificate chains of TLS clients and servers.
#[derive(Debug)]
pub struct TrustManager {
    config: Config,
    store: Arc<TrustStore>,
    validator: PathValidator,
}

impl TrustManager {
    /// Creates a trust manager for the given configuration.
    ///
    /// This loads the trust store right away.
    pub fn new(config: Config) -> Result<Self, StoreError> {
        let factory = config.checker_factory();
        Self::with_factory(config, factory)
    }

    /// Creates a trust manager with a custom revocation checker factory.
    ///
    /// The revocation checker kind of the configuration is ignored. If
    /// `factory` is `None`, revocation is not checked.
    pub fn with_factory(
        config: Config,
        factory: Option<Arc<dyn RevocationCheckerFactory>>,
    ) -> Result<Self, StoreError> {
        let crl_enabled = config.crl_enabled && factory.is_some();
        let store = Arc::new(
            TrustStore::new(config.trust_store_dir.clone(), factory)?
        );
        let validator = PathValidator::new(
            store.clone(), config.crl_required, crl_enabled
        );
        Ok(TrustManager { config, store, validator })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<TrustStore> {
        &self.store
    }

    /// Checks the certificate chain presented by a TLS client.
    ///
    /// The chain contains DER encoded certificates with the leaf first.
    /// The authentication type is ignored.
    pub fn check_client_trusted(
        &self, chain: &[impl AsRef<[u8]>], _auth_type: &str
    ) -> Result<ValidatedPath, CertificateError> {
        self.check_der_chain(chain)
    }

    /// Checks the certificate chain presented by a TLS server.
    ///
    /// This works exactly like
    /// [`check_client_trusted`][Self::check_client_trusted].
    pub fn check_server_trusted(
        &self, chain: &[impl AsRef<[u8]>], _auth_type: &str
    ) -> Result<ValidatedPath, CertificateError> {
        self.check_der_chain(chain)
    }

    /// Checks an already decoded certificate chain, leaf first.
    pub fn check_trusted(
        &self, chain: &[Cert]
    ) -> Result<ValidatedPath, CertificateError> {
        self.update_if_due();
        self.validator.check(chain).map_err(Into::into)
    }

    /// Returns the certificates of all trusted CAs.
    pub fn accepted_issuers(&self) -> Vec<Cert> {
        self.store.anchors().iter().map(|anchor| {
            anchor.cert().clone()
        }).collect()
    }

    fn check_der_chain(
        &self, chain: &[impl AsRef<[u8]>]
    ) -> Result<ValidatedPath, CertificateError> {
        let chain = chain.iter().enumerate().map(|(position, der)| {
            Cert::decode(Bytes::copy_from_slice(der.as_ref())).map_err(|err| {
                debug!(
                    "Rejected certificate chain: certificate {} is broken: {}",
                    position, err
                );
                CertificateError::Decode { position, err }
            })
        }).collect::<Result<Vec<_>, _>>()?;
        self.check_trusted(&chain)
    }

    /// Updates the store if the configured update interval has passed.
    fn update_if_due(&self) {
        if let Some(interval) = self.config.crl_update_interval {
            if self.store.last_update().elapsed() >= interval {
                self.store.check_update();
            }
        }
    }
}


//------------ CacheKey ------------------------------------------------------

/// The identity of a trust manager in a cache.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct CacheKey {
    /// A name chosen by the caller.
    pub id: String,

    /// The trust directory.
    pub trust_store_dir: PathBuf,

    /// Whether CRLs are required.
    pub crl_required: bool,
}

impl CacheKey {
    pub fn new(id: impl Into<String>, config: &Config) -> Self {
        CacheKey {
            id: id.into(),
            trust_store_dir: config.trust_store_dir.clone(),
            crl_required: config.crl_required,
        }
    }
}


//------------ TrustManagerCache ---------------------------------------------

/// A collection of trust managers shared between users.
#[derive(Debug, Default)]
pub struct TrustManagerCache {
    managers: Mutex<HashMap<CacheKey, Arc<TrustManager>>>,
}

impl TrustManagerCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the trust manager for `id` and `config`.
    ///
    /// If there is no trust manager for the key derived from the two yet,
    /// a new one is created from `config`.
    pub fn get_or_create(
        &self, id: impl Into<String>, config: &Config
    ) -> Result<Arc<TrustManager>, StoreError> {
        let key = CacheKey::new(id, config);
        if let Some(manager) = self.get(&key) {
            return Ok(manager)
        }

        // Load the store without holding the lock.
        let manager = Arc::new(TrustManager::new(config.clone())?);
        let mut managers = self.lock();
        Ok(managers.entry(key).or_insert(manager).clone())
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<TrustManager>> {
        self.lock().get(key).cloned()
    }

    /// Updates the stores of all managers not updated within `max_age`.
    ///
    /// Returns the number of stores that were updated.
    pub fn refresh_if_older_than(&self, max_age: Duration) -> usize {
        let managers: Vec<_> = self.lock().values().cloned().collect();
        managers.iter().filter(|manager| {
            manager.store.last_update().elapsed() >= max_age
                && manager.store.check_update()
        }).count()
    }

    pub fn remove(&self, key: &CacheKey) -> Option<Arc<TrustManager>> {
        self.lock().remove(key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear()
    }

    fn lock(
        &self
    ) -> std::sync::MutexGuard<HashMap<CacheKey, Arc<TrustManager>>> {
        self.managers.lock().unwrap_or_else(|err| err.into_inner())
    }
}


//------------ CertificateError ----------------------------------------------

/// A certificate chain was rejected.
#[derive(Debug)]
pub enum CertificateError {
    /// A certificate in the chain could not be decoded.
    Decode {
        position: usize,
        err: DecodeError<Infallible>,
    },

    /// The chain did not validate.
    Validation(ValidationError),
}

impl CertificateError {
    pub fn kind(&self) -> ErrorKind {
        match *self {
            CertificateError::Decode { .. } => ErrorKind::Malformed,
            CertificateError::Validation(ref err) => err.kind(),
        }
    }

    /// Returns the validation error if there was one.
    pub fn validation_error(&self) -> Option<&ValidationError> {
        match *self {
            CertificateError::Validation(ref err) => Some(err),
            _ => None
        }
    }
}

impl From<ValidationError> for CertificateError {
    fn from(err: ValidationError) -> Self {
        CertificateError::Validation(err)
    }
}

impl fmt::Display for CertificateError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            CertificateError::Decode { position, ref err } => {
                write!(
                    f, "certificate {} in chain is broken: {}", position, err
                )
            }
            CertificateError::Validation(ref err) => err.fmt(f),
        }
    }
}

impl error::Error for CertificateError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            CertificateError::Decode { .. } => None,
            CertificateError::Validation(ref err) => Some(err),
        }
    }
}


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;
    use crate::test::{Issued, KeyRing, TrustDir};

    fn setup() -> (KeyRing, TrustDir, Issued) {
        let ring = KeyRing::new();
        let dir = TrustDir::new();
        let ca = Issued::root_ca(&ring, "CN=Test CA,O=Grid");
        dir.add_ca(&ca.cert, 0);
        dir.add_crl(&ca.cert, 0, ca.crl().sign(&ca.key));
        (ring, dir, ca)
    }

    fn der(items: &[&Issued]) -> Vec<Bytes> {
        items.iter().map(|item| item.cert.to_bytes()).collect()
    }

    #[test]
    fn check_chains() {
        let (ring, dir, ca) = setup();
        let manager = TrustManager::new(Config::with_dir(dir.path())).unwrap();
        let ee = ca.end_entity(&ring, "CN=Alice,O=Grid");
        let proxy = ee.legacy_proxy(&ring, "proxy");

        let path = manager.check_client_trusted(
            &der(&[&proxy, &ee]), "RSA"
        ).unwrap();
        assert_eq!(path.identity(), ee.cert.subject());
        assert!(manager.check_server_trusted(&der(&[&ee]), "RSA").is_ok());

        let stranger = Issued::root_ca(&ring, "CN=Stranger");
        let err = manager.check_server_trusted(
            &der(&[&stranger.end_entity(&ring, "CN=Mallory")]), "RSA"
        ).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Untrusted);
        assert!(matches!(
            err.validation_error(),
            Some(ValidationError::UntrustedRoot { .. })
        ));

        let mut broken = der(&[&proxy, &ee]);
        broken[1] = Bytes::from_static(b"\x30\x03\x02\x01");
        let err = manager.check_client_trusted(&broken, "RSA").unwrap_err();
        assert!(matches!(err, CertificateError::Decode { position: 1, .. }));
        assert_eq!(err.kind(), ErrorKind::Malformed);

        let issuers = manager.accepted_issuers();
        assert_eq!(issuers, vec![ca.cert.clone()]);
    }

    #[test]
    fn update_interval() {
        let (ring, dir, _) = setup();
        let late = Issued::root_ca(&ring, "CN=Late CA,O=Grid");
        let ee = late.end_entity(&ring, "CN=Bob,O=Grid");

        let manual = TrustManager::new(Config::with_dir(dir.path())).unwrap();
        let mut config = Config::with_dir(dir.path());
        config.crl_update_interval = Some(Duration::ZERO);
        let timed = TrustManager::new(config).unwrap();

        dir.add_ca(&late.cert, 0);
        dir.add_crl(&late.cert, 0, late.crl().sign(&late.key));
        assert!(manual.check_client_trusted(&der(&[&ee]), "RSA").is_err());
        assert!(timed.check_client_trusted(&der(&[&ee]), "RSA").is_ok());
        assert_eq!(timed.store().len(), 2);
    }

    #[test]
    fn disabled_revocation() {
        let ring = KeyRing::new();
        let dir = TrustDir::new();
        let ca = Issued::root_ca(&ring, "CN=Test CA,O=Grid");
        dir.add_ca(&ca.cert, 0);
        let ee = ca.end_entity(&ring, "CN=Alice,O=Grid");

        let manager = TrustManager::new(Config::with_dir(dir.path())).unwrap();
        let err = manager.check_client_trusted(&der(&[&ee]), "RSA");
        assert_eq!(err.unwrap_err().kind(), ErrorKind::Revocation);

        let mut config = Config::with_dir(dir.path());
        config.crl_enabled = false;
        let manager = TrustManager::new(config.clone()).unwrap();
        assert!(!manager.store().has_revocation());
        assert!(manager.check_client_trusted(&der(&[&ee]), "RSA").is_ok());

        config.crl_enabled = true;
        let manager = TrustManager::with_factory(config, None).unwrap();
        assert!(manager.check_client_trusted(&der(&[&ee]), "RSA").is_ok());
    }

    #[test]
    fn cache() {
        let (_, dir, _) = setup();
        let cache = TrustManagerCache::new();
        let config = Config::with_dir(dir.path());

        let first = cache.get_or_create("default", &config).unwrap();
        let second = cache.get_or_create("default", &config).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);

        let lenient = Config { crl_required: false, .. config.clone() };
        let third = cache.get_or_create("default", &lenient).unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        let fourth = cache.get_or_create("other", &config).unwrap();
        assert!(!Arc::ptr_eq(&first, &fourth));
        assert_eq!(cache.len(), 3);

        assert_eq!(cache.refresh_if_older_than(Duration::ZERO), 3);
        assert_eq!(cache.refresh_if_older_than(Duration::from_secs(3600)), 0);

        let key = CacheKey::new("other", &config);
        assert!(cache.remove(&key).is_some());
        assert!(cache.get(&key).is_none());
        assert_eq!(cache.len(), 2);
        cache.clear();
        assert!(cache.is_empty());

        let missing = Config::with_dir(dir.path().join("missing"));
        assert!(cache.get_or_create("default", &missing).is_err());
        assert!(cache.is_empty());
    }
}
