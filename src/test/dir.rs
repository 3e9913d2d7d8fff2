//! Temporary trust directories.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;
use crate::cert::Cert;
use super::cert::{pem_encode, DerData};


//------------ TrustDir ------------------------------------------------------

/// A trust directory in a temporary location.
///
/// The directory is removed when the value is dropped.
pub struct TrustDir {
    dir: TempDir,
}

impl TrustDir {
    pub fn new() -> Self {
        TrustDir { dir: tempfile::tempdir().unwrap() }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Returns the path for a file name.
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Writes a CA certificate as `<hash>.<number>` in PEM form.
    pub fn add_ca(&self, cert: &Cert, number: u32) -> PathBuf {
        let name = format!("{}.{}", cert.subject().openssl_hash(), number);
        self.write(
            &name, pem_encode("CERTIFICATE", cert.to_bytes().as_ref())
        )
    }

    /// Writes a DER encoded CRL as `<hash>.r<number>`.
    pub fn add_crl(&self, ca: &Cert, number: u32, crl: DerData) -> PathBuf {
        let name = format!("{}.r{}", ca.subject().openssl_hash(), number);
        self.write(&name, crl)
    }

    /// Writes a `.namespaces` file for the CA.
    pub fn add_namespaces(&self, ca: &Cert, content: &str) -> PathBuf {
        let name = format!("{}.namespaces", ca.subject().openssl_hash());
        self.write(&name, content)
    }

    /// Writes a `.signing_policy` file for the CA.
    pub fn add_signing_policy(&self, ca: &Cert, content: &str) -> PathBuf {
        let name = format!("{}.signing_policy", ca.subject().openssl_hash());
        self.write(&name, content)
    }

    /// Writes a file and moves its modification time into the future.
    ///
    /// Each write moves the time further so that rewriting a file is
    /// always noticed, however fast it happens.
    pub fn write(&self, name: &str, content: impl AsRef<[u8]>) -> PathBuf {
        let path = self.file(name);
        let previous = fs::metadata(&path).and_then(|meta| meta.modified());
        fs::write(&path, content).unwrap();
        let modified = match previous {
            Ok(previous) => previous + Duration::from_secs(10),
            Err(_) => SystemTime::now(),
        };
        fs::File::options().write(true).open(&path).unwrap()
            .set_modified(modified).unwrap();
        path
    }

    pub fn remove(&self, path: &Path) {
        fs::remove_file(path).unwrap()
    }
}

impl Default for TrustDir {
    fn default() -> Self {
        Self::new()
    }
}
