//! Trust decisions for grid certificates.
//!
//! Grid middleware authenticates users through X.509 certificates issued
//! by a set of accredited CAs, and through _proxy certificates_ that users
//! derive from their own certificates to delegate their identity to jobs
//! and services. This crate checks such certificate chains against the
//! CAs of a trust directory in the layout used by grid installations,
//! usually `/etc/grid-security/certificates`, including the CRLs and the
//! namespace restrictions published next to the CA certificates.
//!
//! The main entry points are [`TrustManager`], which checks the DER
//! encoded chains presented by TLS peers, and [`PathValidator`] for
//! checking already decoded chains. Both are built on top of a
//! [`TrustStore`] that keeps the trust directory in memory and can be
//! brought up to date while in use.
//!
//! The crate uses the [log] crate for logging. It never installs a logger
//! itself.
//!
//! [log]: https://docs.rs/log/

pub use self::config::Config;
pub use self::error::{ErrorKind, ValidationError};
pub use self::store::TrustStore;
pub use self::trustmanager::{
    CertificateError, TrustManager, TrustManagerCache
};
pub use self::validator::{PathValidator, ProxyType, ValidatedPath};

pub mod anchor;
pub mod cert;
pub mod config;
pub mod crl;
pub mod crypto;
pub mod dn;
pub mod error;
pub mod namespace;
pub mod oid;
pub mod revocation;
pub mod store;
pub mod trustmanager;
pub mod util;
pub mod validator;
pub mod x509;

#[cfg(test)]
mod test;
