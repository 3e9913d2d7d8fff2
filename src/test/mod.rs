//! Infrastructure for unit tests.

pub use self::cert::{
    ca_template, dn, ee_template, key_identifier, pem_encode, sign_tbs,
    CrlBuilder, DerData, Issued, TbsBuilder,
};
pub use self::crypto::{KeyRing, TestKey};
pub use self::dir::TrustDir;

pub mod cert;
pub mod crypto;
pub mod dir;
