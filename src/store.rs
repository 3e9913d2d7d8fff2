//! The trust anchor store.
//!
//! The [`TrustStore`] keeps all trust anchors of a trust directory in
//! memory, indexed by the OpenSSL hash of their subject. Since a CA may
//! have several certificates with the same subject, for instance during a
//! key rollover, a hash can lead to more than one anchor.
//!
//! The store is brought up to date with the directory through
//! [`TrustStore::check_update`]. This reconciliation walks the directory,
//! loads new anchors, updates existing ones, and drops those whose files
//! have disappeared. Only one reconciliation runs at a time. Lookups can
//! happen concurrently and see either the old or the new set of anchors.

use std::{error, fmt, fs, io};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Instant, SystemTime};
use log::{debug, info, warn};
use crate::anchor::{AnchorFile, TrustAnchor};
use crate::config::Config;
use crate::dn::DistinguishedName;
use crate::error::ErrorKind;
use crate::revocation::RevocationCheckerFactory;


//------------ TrustStore ----------------------------------------------------

/// The trust anchors of a trust directory.
#[derive(Debug)]
pub struct TrustStore {
    /// The trust directory.
    dir: PathBuf,

    /// The factory for revocation checkers of new anchors.
    ///
    /// If this is `None`, revocation checking is disabled.
    factory: Option<Arc<dyn RevocationCheckerFactory>>,

    /// The current set of anchors.
    index: RwLock<Arc<AnchorIndex>>,

    /// Is a reconciliation currently running?
    updating: AtomicBool,

    /// When did the last reconciliation finish?
    last_update: RwLock<Instant>,
}

impl TrustStore {
    /// Creates a store from a trust directory.
    ///
    /// Certificate files that cannot be used are skipped. Fails if the
    /// directory cannot be read or if there isn’t a single usable anchor.
    pub fn new(
        dir: impl Into<PathBuf>,
        factory: Option<Arc<dyn RevocationCheckerFactory>>,
    ) -> Result<Self, StoreError> {
        let dir = dir.into();
        let files = list_dir(&dir).map_err(|err| {
            StoreError::Io { path: dir.clone(), err }
        })?;
        let index = AnchorIndex::default().reconcile(
            &dir, files, factory.as_deref()
        );
        if index.files.is_empty() {
            return Err(StoreError::Empty(dir))
        }
        info!(
            "Loaded {} trust anchors from {}.",
            index.files.len(), dir.display()
        );
        Ok(TrustStore {
            dir,
            factory,
            index: RwLock::new(Arc::new(index)),
            updating: AtomicBool::new(false),
            last_update: RwLock::new(Instant::now()),
        })
    }

    /// Creates a store as described by the configuration.
    pub fn from_config(config: &Config) -> Result<Self, StoreError> {
        Self::new(config.trust_store_dir.clone(), config.checker_factory())
    }

    /// Returns the path of the trust directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns whether revocation checkers are created for anchors.
    pub fn has_revocation(&self) -> bool {
        self.factory.is_some()
    }

    /// Returns all anchors whose subject has the given hash.
    pub fn lookup(&self, hash: &str) -> Vec<Arc<TrustAnchor>> {
        self.index().by_hash.get(hash).cloned().unwrap_or_default()
    }

    /// Returns all anchors with the given subject.
    pub fn find_by_subject(
        &self, subject: &DistinguishedName
    ) -> Vec<Arc<TrustAnchor>> {
        let mut res = self.lookup(&subject.openssl_hash());
        res.retain(|anchor| anchor.cert().subject() == subject);
        res
    }

    /// Returns a snapshot of all anchors.
    pub fn anchors(&self) -> Vec<Arc<TrustAnchor>> {
        self.index().files.values().cloned().collect()
    }

    /// Returns the number of anchors.
    pub fn len(&self) -> usize {
        self.index().files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index().files.is_empty()
    }

    /// Returns when the last reconciliation finished.
    pub fn last_update(&self) -> Instant {
        *self.last_update.read().unwrap_or_else(|err| err.into_inner())
    }

    /// Brings the store up to date with the trust directory.
    ///
    /// If another reconciliation is currently running, returns `false`
    /// right away. Otherwise returns `true` after the reconciliation has
    /// finished.
    ///
    /// Problems with individual files are logged and only affect the anchor
    /// in question. If the directory cannot be read at all, the current
    /// anchors are kept.
    pub fn check_update(&self) -> bool {
        if self.updating.compare_exchange(
            false, true, Ordering::AcqRel, Ordering::Acquire
        ).is_err() {
            debug!("Trust store update already running, skipping.");
            return false
        }
        let _guard = UpdateGuard(&self.updating);

        match list_dir(&self.dir) {
            Ok(files) => {
                let index = self.index().reconcile(
                    &self.dir, files, self.factory.as_deref()
                );
                if index.files.is_empty() {
                    warn!(
                        "Trust directory {} has no usable CAs left.",
                        self.dir.display()
                    );
                }
                *self.index.write().unwrap_or_else(|err| {
                    err.into_inner()
                }) = Arc::new(index);
            }
            Err(err) => {
                warn!(
                    "Cannot read trust directory {}, keeping old CAs: {}",
                    self.dir.display(), err
                );
            }
        }
        *self.last_update.write().unwrap_or_else(|err| {
            err.into_inner()
        }) = Instant::now();
        true
    }

    fn index(&self) -> Arc<AnchorIndex> {
        self.index.read().unwrap_or_else(|err| err.into_inner()).clone()
    }
}


//------------ AnchorIndex ---------------------------------------------------

/// A set of trust anchors.
#[derive(Clone, Debug, Default)]
struct AnchorIndex {
    /// The anchors by their file name.
    files: BTreeMap<AnchorFile, Arc<TrustAnchor>>,

    /// The anchors by their subject hash.
    by_hash: HashMap<String, Vec<Arc<TrustAnchor>>>,

    /// Files that failed to load and their modification time.
    ///
    /// These are only tried again when they change.
    failed: HashMap<AnchorFile, SystemTime>,
}

impl AnchorIndex {
    /// Produces the index for the files now present in the directory.
    fn reconcile(
        &self,
        dir: &Path,
        files: Vec<AnchorFile>,
        factory: Option<&dyn RevocationCheckerFactory>,
    ) -> Self {
        let mut res = AnchorIndex::default();
        for file in files {
            if let Some(anchor) = self.files.get(&file) {
                match anchor.check_update(factory) {
                    Ok(None) => {
                        res.insert(file, anchor.clone());
                    }
                    Ok(Some(anchor)) => {
                        res.insert(file, Arc::new(anchor));
                    }
                    Err(err) if err.is_not_found() => {
                        debug!("{}/{}: removed.", dir.display(), file);
                    }
                    Err(err) => {
                        warn!(
                            "{}/{}: dropping CA: {}", dir.display(), file, err
                        );
                        res.fail(dir, file);
                    }
                }
                continue
            }

            let modified = modified(dir, &file);
            if let (Some(failed), Some(modified)) = (
                self.failed.get(&file), modified
            ) {
                if *failed == modified {
                    res.failed.insert(file, modified);
                    continue
                }
            }
            match TrustAnchor::load(dir, file.clone(), factory) {
                Ok(anchor) => {
                    res.insert(file, Arc::new(anchor));
                }
                Err(err) if err.is_not_found() => { }
                Err(err) => {
                    warn!(
                        "{}/{}: skipping CA: {}", dir.display(), file, err
                    );
                    res.fail(dir, file);
                }
            }
        }
        for file in self.files.keys() {
            if !res.files.contains_key(file) && !res.failed.contains_key(file)
            {
                debug!("{}/{}: CA gone.", dir.display(), file);
            }
        }
        res
    }

    fn insert(&mut self, file: AnchorFile, anchor: Arc<TrustAnchor>) {
        self.by_hash.entry(
            anchor.subject_hash().into()
        ).or_default().push(anchor.clone());
        self.files.insert(file, anchor);
    }

    fn fail(&mut self, dir: &Path, file: AnchorFile) {
        if let Some(modified) = modified(dir, &file) {
            self.failed.insert(file, modified);
        }
    }
}

fn modified(dir: &Path, file: &AnchorFile) -> Option<SystemTime> {
    fs::metadata(
        dir.join(file.file_name())
    ).and_then(|meta| meta.modified()).ok()
}

/// Returns all CA certificate files in a directory.
fn list_dir(dir: &Path) -> Result<Vec<AnchorFile>, io::Error> {
    let mut res = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = match name.to_str() {
            Some(name) => name,
            None => continue,
        };
        if let Some(file) = AnchorFile::from_file_name(name) {
            res.push(file)
        }
    }
    res.sort();
    Ok(res)
}


//------------ UpdateGuard ---------------------------------------------------

/// Releases the update flag when dropped.
struct UpdateGuard<'a>(&'a AtomicBool);

impl Drop for UpdateGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release)
    }
}


//------------ StoreError ----------------------------------------------------

/// The trust store could not be created.
#[derive(Debug)]
pub enum StoreError {
    /// The trust directory could not be read.
    Io { path: PathBuf, err: io::Error },

    /// The trust directory doesn’t contain any usable CA certificates.
    Empty(PathBuf),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::StoreMaintenance
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            StoreError::Io { ref path, ref err } => {
                write!(
                    f, "cannot read trust directory {}: {}",
                    path.display(), err
                )
            }
            StoreError::Empty(ref path) => {
                write!(
                    f, "no usable CA certificates in trust directory {}",
                    path.display()
                )
            }
        }
    }
}

impl error::Error for StoreError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            StoreError::Io { ref err, .. } => Some(err),
            StoreError::Empty(_) => None,
        }
    }
}


//============ Tests =========================================================
