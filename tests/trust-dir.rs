//! Tests of the public API that don’t need any certificates.

use std::fs;
use std::time::Duration;
use gridtrust::{Config, ErrorKind, TrustManager, TrustStore};
use gridtrust::config::ConfigError;
use gridtrust::dn::DistinguishedName;
use gridtrust::namespace::{
    NamespaceFormat, NamespacePolicy, NamespaceViolation
};
use gridtrust::revocation::RevocationCheckerKind;
use gridtrust::store::StoreError;

fn dn(s: &str) -> DistinguishedName {
    s.parse().unwrap()
}

#[test]
fn config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trust.properties");
    fs::write(
        &path,
        "# Trust settings\n\
         crlRequired=false\n\
         trustStoreDir = /opt/grid/certificates\n\
         crlUpdateInterval: 10m\n\
         revocationChecker = none\n"
    ).unwrap();
    let config = Config::from_file(&path).unwrap();
    assert!(!config.crl_required);
    assert!(config.crl_enabled);
    assert_eq!(
        config.trust_store_dir.to_str(), Some("/opt/grid/certificates")
    );
    assert_eq!(config.crl_update_interval, Some(Duration::from_secs(600)));
    assert_eq!(config.revocation_checker, RevocationCheckerKind::None);

    fs::write(&path, "crlEnabled = sometimes\n").unwrap();
    assert!(matches!(
        Config::from_file(&path),
        Err(ConfigError::InvalidValue { .. })
    ));
    assert!(matches!(
        Config::from_file(dir.path().join("missing")),
        Err(ConfigError::Io(_))
    ));
}

#[test]
fn namespace_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("1234abcd.namespaces");
    fs::write(
        &path,
        "# EUGridPMA namespaces\n\
         TO Issuer \"/C=XY/O=Grid/CN=Grid CA\" \\\n\
         \x20   DENY Subject \"/C=XY/O=Grid/CN=Banned.*\"\n\
         TO Issuer SELF PERMIT Subject \"/C=XY/O=Grid/.*\"\n"
    ).unwrap();
    let ca = dn("/C=XY/O=Grid/CN=Grid CA");
    let policy = NamespacePolicy::load(
        &path, NamespaceFormat::EuGridPma, &ca
    ).unwrap();
    assert_eq!(policy.format(), NamespaceFormat::EuGridPma);
    assert_eq!(policy.rules().len(), 2);

    assert_eq!(policy.check(&ca, &dn("/C=XY/O=Grid/CN=Alice")), Ok(()));
    assert!(matches!(
        policy.check(&ca, &dn("/C=XY/O=Grid/CN=Banned User")),
        Err(NamespaceViolation::Denied { .. })
    ));
    assert_eq!(
        policy.check(&ca, &dn("/C=XY/O=Elsewhere/CN=Bob")),
        Err(NamespaceViolation::NotPermitted)
    );
    assert_eq!(
        policy.check(&dn("/C=XY/CN=Other CA"), &dn("/C=XY/O=Grid/CN=Bob")),
        Err(NamespaceViolation::NoRule)
    );
}

#[test]
fn signing_policy_file() {
    let policy = NamespacePolicy::parse_signing_policy(
        "access_id_CA X509 '/C=XY/O=Grid/CN=Grid CA'\n\
         pos_rights globus CA:sign\n\
         cond_subjects globus '\"/C=XY/O=Grid/*\" \"/C=XY/O=Test/*\"'\n"
    ).unwrap();
    let ca = dn("CN=Grid CA,O=Grid,C=XY");
    assert_eq!(policy.check(&ca, &dn("/C=XY/O=Test/CN=Carol")), Ok(()));
    assert_eq!(
        policy.check(&ca, &dn("/C=XY/O=Other/CN=Carol")),
        Err(NamespaceViolation::NotPermitted)
    );
}

#[test]
fn unusable_trust_dirs() {
    let dir = tempfile::tempdir().unwrap();

    let missing = dir.path().join("missing");
    let err = TrustStore::new(&missing, None).unwrap_err();
    assert!(matches!(err, StoreError::Io { .. }));
    assert_eq!(err.kind(), ErrorKind::StoreMaintenance);

    let err = TrustStore::new(dir.path(), None).unwrap_err();
    assert!(matches!(err, StoreError::Empty(_)));

    fs::write(dir.path().join("0123abcd.0"), b"not a certificate").unwrap();
    fs::write(dir.path().join("README"), b"nothing to see here").unwrap();
    assert!(matches!(
        TrustStore::new(dir.path(), None),
        Err(StoreError::Empty(_))
    ));
    assert!(TrustManager::new(Config::with_dir(dir.path())).is_err());
}
