//! Validation of certificate paths.
//!
//! The [`PathValidator`] checks a certificate chain as presented by a peer,
//! possibly including proxy certificates, against the trust anchors of a
//! [`TrustStore`].
//!
//! Validation happens in two steps. First, the chain is completed into a
//! full path ending in a trust anchor. CA certificates in the chain are
//! replaced by the store’s copies and missing CA certificates are added
//! from the store. Then the path is walked from the anchor down to the
//! leaf, checking each certificate against the one that issued it. The
//! state carried from one pair of certificates to the next is kept in a
//! `PathState`.
//!
//! A certificate issued by a CA can be another CA or an end entity. A
//! certificate issued by an end entity has to be a proxy certificate, and
//! so does a certificate issued by a proxy. All proxies in a path have to
//! be of the same type: legacy Globus proxies, pre-RFC draft proxies, or
//! RFC 3820 proxies.

use std::fmt;
use std::sync::Arc;
use bcder::Oid;
use log::{debug, warn};
use crate::oid;
use crate::anchor::TrustAnchor;
use crate::cert::{Cert, ProxyCertKind};
use crate::config::Config;
use crate::dn::DistinguishedName;
use crate::error::ValidationError;
use crate::revocation::RevocationError;
use crate::store::TrustStore;
use crate::x509::{Time, ValidityPeriodError};


//------------ Configuration -------------------------------------------------

/// The maximum number of CA certificates added from the trust store.
const MAX_ADDED_CAS: usize = 16;


//------------ ProxyType -----------------------------------------------------

/// The type of a certificate in a path.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ProxyType {
    /// A CA certificate.
    Ca,

    /// An end entity certificate, i.e., neither CA nor proxy.
    EndEntity,

    /// A legacy Globus proxy certificate.
    LegacyProxy,

    /// A proxy certificate following the pre-RFC drafts.
    DraftProxy,

    /// An RFC 3820 proxy certificate.
    Rfc3820Proxy,
}

impl ProxyType {
    /// Returns whether the type is one of the proxy types.
    pub fn is_proxy(self) -> bool {
        matches!(
            self,
            ProxyType::LegacyProxy | ProxyType::DraftProxy
            | ProxyType::Rfc3820Proxy
        )
    }

    /// Returns the OID of the proxy certificate info extension.
    fn proxy_oid(self) -> Option<Oid<&'static [u8]>> {
        match self {
            ProxyType::DraftProxy => Some(oid::PE_PROXY_CERT_INFO_DRAFT),
            ProxyType::Rfc3820Proxy => Some(oid::PE_PROXY_CERT_INFO),
            _ => None
        }
    }
}

impl From<ProxyCertKind> for ProxyType {
    fn from(kind: ProxyCertKind) -> Self {
        match kind {
            ProxyCertKind::Rfc3820 => ProxyType::Rfc3820Proxy,
            ProxyCertKind::Draft => ProxyType::DraftProxy,
        }
    }
}

impl fmt::Display for ProxyType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match *self {
            ProxyType::Ca => "CA",
            ProxyType::EndEntity => "end entity",
            ProxyType::LegacyProxy => "legacy proxy",
            ProxyType::DraftProxy => "draft RFC proxy",
            ProxyType::Rfc3820Proxy => "RFC 3820 proxy",
        })
    }
}


//------------ PathValidator -------------------------------------------------

/// Validates certificate paths against a trust store.
#[derive(Clone, Debug)]
pub struct PathValidator {
    /// The trust anchors.
    store: Arc<TrustStore>,

    /// Does every CA need working revocation checking?
    crl_required: bool,

    /// Is revocation checked at all?
    crl_enabled: bool,
}

impl PathValidator {
    pub fn new(
        store: Arc<TrustStore>, crl_required: bool, crl_enabled: bool
    ) -> Self {
        PathValidator { store, crl_required, crl_enabled }
    }

    /// Creates a validator with the revocation settings of a config.
    pub fn from_config(store: Arc<TrustStore>, config: &Config) -> Self {
        Self::new(store, config.crl_required, config.crl_enabled)
    }

    pub fn store(&self) -> &Arc<TrustStore> {
        &self.store
    }

    /// Validates a certificate chain right now.
    ///
    /// The leaf certificate is the first element of `chain`. Each following
    /// element should be the issuer of the previous one. The chain may or
    /// may not include CA certificates.
    pub fn check(
        &self, chain: &[Cert]
    ) -> Result<ValidatedPath, ValidationError> {
        self.check_at(chain, Time::now())
    }

    /// Validates a certificate chain at the given time.
    ///
    /// Revocation is always checked against the current CRLs.
    pub fn check_at(
        &self, chain: &[Cert], now: Time
    ) -> Result<ValidatedPath, ValidationError> {
        let res = self.build_path(chain, now).and_then(|path| {
            self.check_path(path, now)
        });
        if let Err(ref err) = res {
            match chain.first() {
                Some(leaf) => {
                    debug!(
                        "Rejected certificate chain for '{}': {}",
                        leaf.subject(), err
                    );
                }
                None => debug!("Rejected certificate chain: {}", err),
            }
        }
        res
    }

    /// Completes the chain into a path ending in a trust anchor.
    fn build_path(
        &self, chain: &[Cert], now: Time
    ) -> Result<Vec<PathCert>, ValidationError> {
        if chain.is_empty() {
            return Err(ValidationError::EmptyChain)
        }
        let mut path: Vec<_> = chain.iter().map(|cert| {
            if cert.is_ca() {
                if let Some(anchor) = self.find_anchor(cert, now) {
                    return PathCert::trusted(anchor)
                }
            }
            PathCert::untrusted(cert.clone())
        }).collect();

        if let Some(top) = path.last() {
            if top.anchor.is_none() && top.cert.is_self_signed() {
                return Err(ValidationError::SelfSignedNotTrusted {
                    subject: top.cert.subject().clone()
                })
            }
        }

        for _ in 0..MAX_ADDED_CAS {
            let parent = match path.last() {
                Some(top) if !top.cert.is_self_signed() => {
                    self.find_issuer(&top.cert, now)
                }
                _ => None
            };
            let parent = match parent {
                Some(parent) => parent,
                None => break
            };
            if path.iter().any(|item| item.cert == *parent.cert()) {
                break
            }
            path.push(PathCert::trusted(parent));
        }

        if path.iter().all(|item| item.anchor.is_none()) {
            let top = &chain[chain.len() - 1];
            return Err(ValidationError::UntrustedRoot {
                subject: top.subject().clone(),
                issuer: top.issuer().clone(),
            })
        }
        Ok(path)
    }

    /// Finds the trust anchor for a CA certificate.
    ///
    /// The anchor has to have the same subject and public key.
    fn find_anchor(&self, cert: &Cert, now: Time) -> Option<Arc<TrustAnchor>> {
        best_anchor(
            self.store.find_by_subject(cert.subject()).into_iter().filter(
                |anchor| {
                    anchor.cert().subject_public_key_info()
                        == cert.subject_public_key_info()
                }
            ),
            |_| true, now
        )
    }

    /// Finds the trust anchor for the issuer of a certificate.
    fn find_issuer(
        &self, cert: &Cert, now: Time
    ) -> Option<Arc<TrustAnchor>> {
        best_anchor(
            self.store.find_by_subject(cert.issuer()),
            |anchor| {
                cert.verify_signature(
                    anchor.cert().subject_public_key_info()
                ).is_ok()
            },
            now
        )
    }

    /// Walks the path from the anchor down to the leaf.
    fn check_path(
        &self, path: Vec<PathCert>, now: Time
    ) -> Result<ValidatedPath, ValidationError> {
        let top = path.len() - 1;
        let mut state = PathState::new(top);
        if let Err(err) = path[top].cert.verify_validity_at(now) {
            return Err(validity_error(&path[top].cert, top, err))
        }
        for position in (0..top).rev() {
            let signer = &path[position + 1];
            let sub = &path[position];
            state = if signer.cert.is_ca() {
                self.check_ca_pair(state, signer, sub, position, now)?
            }
            else {
                check_plain_pair(state, signer, sub, position, now)?
            };
        }

        // All CAs are trusted, so the leaf-most anchor exists.
        let anchor = match state.anchors.pop().or_else(|| {
            path.iter().find_map(|item| item.anchor.clone())
        }) {
            Some(anchor) => anchor,
            None => {
                return Err(ValidationError::UntrustedRoot {
                    subject: path[top].cert.subject().clone(),
                    issuer: path[top].cert.issuer().clone(),
                })
            }
        };
        Ok(ValidatedPath {
            certs: path.into_iter().map(|item| item.cert).collect(),
            anchor,
            proxy_type: state.proxy_type,
            end_entity: state.end_entity,
        })
    }

    /// Checks a certificate issued by a CA.
    fn check_ca_pair(
        &self,
        mut state: PathState,
        signer: &PathCert,
        sub: &PathCert,
        position: usize,
        now: Time,
    ) -> Result<PathState, ValidationError> {
        let anchor = match signer.anchor.as_ref() {
            Some(anchor) => anchor.clone(),
            None => {
                return Err(ValidationError::UntrustedCa {
                    position: position + 1,
                    subject: signer.cert.subject().clone(),
                })
            }
        };
        if let Some(usage) = signer.cert.key_usage() {
            if !usage.key_cert_sign() {
                return Err(ValidationError::MissingKeyCertSign {
                    position: position + 1,
                    subject: signer.cert.subject().clone(),
                })
            }
        }
        check_common(signer, sub, position, now)?;
        check_critical_extensions(&sub.cert, position, None)?;

        // The anchor’s path length can only tighten the limit.
        if let Some(limit) = anchor.cert().basic_constraints().and_then(|bc| {
            bc.path_len()
        }) {
            if state.ca_budget.map(|budget| limit < budget).unwrap_or(true) {
                state.ca_budget = Some(limit);
                state.ca_budget_from = Some(signer.cert.subject().clone());
            }
        }
        if sub.cert.is_ca() {
            if state.ca_budget == Some(0) {
                return Err(ValidationError::PathLenExceeded {
                    position,
                    subject: sub.cert.subject().clone(),
                    limited_by: state.ca_budget_from.unwrap_or_default(),
                })
            }
            state.ca_budget = state.ca_budget.map(|budget| budget - 1);
        }

        state.anchors.push(anchor.clone());
        check_namespace(&state.anchors, signer, sub, position)?;
        self.check_revocation(&anchor, sub, position)?;

        if sub.cert.is_ca() {
            state.proxy_type = ProxyType::Ca;
        }
        else {
            state.proxy_type = ProxyType::EndEntity;
        }
        state.end_entity = position;
        Ok(state)
    }

    fn check_revocation(
        &self,
        anchor: &TrustAnchor,
        sub: &PathCert,
        position: usize,
    ) -> Result<(), ValidationError> {
        if !self.crl_enabled {
            return Ok(())
        }
        let checker = match anchor.revocation() {
            Some(checker) => checker,
            None => {
                if self.crl_required {
                    return Err(ValidationError::NoRevocationChecker {
                        position: position + 1,
                        ca: anchor.cert().subject().clone(),
                    })
                }
                warn!(
                    "No revocation checking for CA '{}'.",
                    anchor.cert().subject()
                );
                return Ok(())
            }
        };
        match checker.check(&sub.cert) {
            Ok(()) => Ok(()),
            Err(RevocationError::Revoked { serial, date }) => {
                Err(ValidationError::Revoked {
                    position,
                    subject: sub.cert.subject().clone(),
                    serial, date
                })
            }
            Err(err) if self.crl_required => {
                Err(ValidationError::RevocationUnavailable {
                    position,
                    subject: sub.cert.subject().clone(),
                    err,
                })
            }
            Err(err) => {
                warn!(
                    "Accepting '{}' without revocation check: {}",
                    sub.cert.subject(), err
                );
                Ok(())
            }
        }
    }
}

/// Picks the best of a number of candidate anchors.
///
/// Candidates for which `verifies` returns `true` come first, then those
/// currently valid, then those with the latest not-after time.
fn best_anchor(
    candidates: impl IntoIterator<Item = Arc<TrustAnchor>>,
    verifies: impl Fn(&TrustAnchor) -> bool,
    now: Time,
) -> Option<Arc<TrustAnchor>> {
    candidates.into_iter().max_by_key(|anchor| {
        (
            verifies(anchor),
            anchor.cert().verify_validity_at(now).is_ok(),
            anchor.cert().validity().not_after(),
        )
    })
}

/// Checks a certificate issued by an end entity or a proxy.
fn check_plain_pair(
    mut state: PathState,
    signer: &PathCert,
    sub: &PathCert,
    position: usize,
    now: Time,
) -> Result<PathState, ValidationError> {
    check_common(signer, sub, position, now)?;
    if sub.cert.is_ca() {
        return Err(ValidationError::CaAfterNonCa {
            position,
            subject: sub.cert.subject().clone(),
        })
    }
    let proxy_type = classify_proxy(&sub.cert).ok_or_else(|| {
        ValidationError::UnrecognizedProxyType {
            position,
            subject: sub.cert.subject().clone(),
        }
    })?;
    if state.proxy_type != ProxyType::EndEntity
        && state.proxy_type != proxy_type
    {
        return Err(ValidationError::ProxyTypeMismatch {
            position,
            subject: sub.cert.subject().clone(),
            expected: state.proxy_type,
            found: proxy_type,
        })
    }
    check_critical_extensions(&sub.cert, position, proxy_type.proxy_oid())?;

    let base = sub.cert.subject().without_last_cn(
        proxy_type == ProxyType::LegacyProxy
    ).map_err(|err| {
        ValidationError::ProxyNaming {
            position,
            subject: sub.cert.subject().clone(),
            err,
        }
    })?;
    if base != *signer.cert.subject() {
        return Err(ValidationError::ProxySubjectMismatch {
            position,
            subject: sub.cert.subject().clone(),
            issuer: signer.cert.subject().clone(),
        })
    }

    if proxy_type != ProxyType::LegacyProxy {
        if state.proxy_budget == Some(0) {
            return Err(ValidationError::ProxyPathLenExceeded {
                position,
                subject: sub.cert.subject().clone(),
                limited_by: state.proxy_budget_from.unwrap_or_default(),
            })
        }
        state.proxy_budget = state.proxy_budget.map(|budget| budget - 1);
        if let Some(limit) = sub.cert.proxy_cert_info().and_then(|info| {
            info.path_len()
        }) {
            if state.proxy_budget.map(|budget| limit < budget).unwrap_or(true)
            {
                state.proxy_budget = Some(limit);
                state.proxy_budget_from = Some(sub.cert.subject().clone());
            }
        }
    }

    if let Some(usage) = sub.cert.key_usage() {
        if !usage.digital_signature() {
            return Err(ValidationError::MissingDigitalSignature {
                position,
                subject: sub.cert.subject().clone(),
            })
        }
    }

    state.proxy_type = proxy_type;
    Ok(state)
}

/// Determines the proxy type of a certificate issued by a non-CA.
fn classify_proxy(cert: &Cert) -> Option<ProxyType> {
    if cert.critical_extension(&oid::PE_PROXY_CERT_INFO).is_some() {
        Some(ProxyType::Rfc3820Proxy)
    }
    else if cert.critical_extension(&oid::PE_PROXY_CERT_INFO_DRAFT).is_some() {
        Some(ProxyType::DraftProxy)
    }
    else {
        match cert.subject().last_cn_value() {
            Some(cn) if cn.eq_ignore_ascii_case("proxy")
                || cn.eq_ignore_ascii_case("limited proxy") =>
            {
                Some(ProxyType::LegacyProxy)
            }
            _ => None
        }
    }
}

/// Performs the checks common to all pairs of certificates.
fn check_common(
    signer: &PathCert,
    sub: &PathCert,
    position: usize,
    now: Time,
) -> Result<(), ValidationError> {
    if sub.cert.subject().is_empty() || sub.cert.issuer().is_empty() {
        return Err(ValidationError::EmptyName { position })
    }
    if sub.cert.issuer() != signer.cert.subject() {
        return Err(ValidationError::IssuerMismatch {
            position,
            issuer: sub.cert.issuer().clone(),
            signer: signer.cert.subject().clone(),
        })
    }
    sub.cert.verify_signature(
        signer.cert.subject_public_key_info()
    ).map_err(|err| {
        ValidationError::BadSignature {
            position,
            subject: sub.cert.subject().clone(),
            err
        }
    })?;
    sub.cert.verify_validity_at(now).map_err(|err| {
        validity_error(&sub.cert, position, err)
    })
}

/// Rejects critical extensions other than the ones we understand.
fn check_critical_extensions(
    cert: &Cert,
    position: usize,
    proxy_oid: Option<Oid<&'static [u8]>>,
) -> Result<(), ValidationError> {
    for ext in cert.critical_extensions() {
        let id = ext.oid();
        if *id == oid::CE_BASIC_CONSTRAINTS || *id == oid::CE_KEY_USAGE {
            continue
        }
        if let Some(proxy_oid) = proxy_oid.as_ref() {
            if id == proxy_oid {
                continue
            }
        }
        return Err(ValidationError::UnsupportedCriticalExtension {
            position,
            subject: cert.subject().clone(),
            oid: id.clone(),
        })
    }
    Ok(())
}

/// Checks the subject of a CA issued certificate against namespaces.
///
/// Only the first non-empty namespace policy found from the root towards
/// the leaf applies. It must have a rule for the signing CA. If no anchor
/// has a policy, the CA is unrestricted.
fn check_namespace(
    anchors: &[Arc<TrustAnchor>],
    signer: &PathCert,
    sub: &PathCert,
    position: usize,
) -> Result<(), ValidationError> {
    let issuer = signer.cert.subject();
    let policy = match anchors.iter().filter_map(|anchor| {
        anchor.namespace()
    }).find(|policy| !policy.is_empty()) {
        Some(policy) => policy,
        None => return Ok(())
    };
    policy.check(issuer, sub.cert.subject()).map_err(|err| {
        ValidationError::Namespace {
            position,
            subject: sub.cert.subject().clone(),
            ca: issuer.clone(),
            err
        }
    })
}

fn validity_error(
    cert: &Cert, position: usize, err: ValidityPeriodError
) -> ValidationError {
    if err.is_not_yet_valid() {
        ValidationError::NotYetValid {
            position,
            subject: cert.subject().clone(),
            not_before: cert.validity().not_before(),
        }
    }
    else {
        ValidationError::Expired {
            position,
            subject: cert.subject().clone(),
            not_after: cert.validity().not_after(),
        }
    }
}


//------------ PathCert ------------------------------------------------------

/// A certificate in a path together with its anchor if it is trusted.
struct PathCert {
    cert: Cert,
    anchor: Option<Arc<TrustAnchor>>,
}

impl PathCert {
    fn trusted(anchor: Arc<TrustAnchor>) -> Self {
        PathCert { cert: anchor.cert().clone(), anchor: Some(anchor) }
    }

    fn untrusted(cert: Cert) -> Self {
        PathCert { cert, anchor: None }
    }
}


//------------ PathState -----------------------------------------------------

/// The state carried from one pair of certificates to the next.
struct PathState {
    /// The type of the most recently checked certificate.
    proxy_type: ProxyType,

    /// How many more CA certificates may follow, `None` for unlimited.
    ca_budget: Option<u32>,

    /// The CA that imposed the current CA budget.
    ca_budget_from: Option<DistinguishedName>,

    /// How many more proxies may follow, `None` for unlimited.
    proxy_budget: Option<u32>,

    /// The proxy that imposed the current proxy budget.
    proxy_budget_from: Option<DistinguishedName>,

    /// The anchors of all CAs that issued certificates so far.
    anchors: Vec<Arc<TrustAnchor>>,

    /// The position of the lowest certificate that is not a proxy.
    end_entity: usize,
}

impl PathState {
    fn new(top: usize) -> Self {
        PathState {
            proxy_type: ProxyType::Ca,
            ca_budget: None,
            ca_budget_from: None,
            proxy_budget: None,
            proxy_budget_from: None,
            anchors: Vec::new(),
            end_entity: top,
        }
    }
}


//------------ ValidatedPath -------------------------------------------------

/// A successfully validated certificate path.
#[derive(Clone, Debug)]
pub struct ValidatedPath {
    /// The complete path, leaf first.
    certs: Vec<Cert>,

    /// The anchor of the CA closest to the leaf.
    anchor: Arc<TrustAnchor>,

    /// The type of the leaf certificate.
    proxy_type: ProxyType,

    /// The position of the end entity certificate.
    end_entity: usize,
}

impl ValidatedPath {
    /// Returns the complete path with the leaf first.
    ///
    /// This includes the CA certificates from the trust store.
    pub fn certs(&self) -> &[Cert] {
        &self.certs
    }

    pub fn leaf(&self) -> &Cert {
        &self.certs[0]
    }

    /// Returns the anchor of the CA that issued the end entity.
    pub fn anchor(&self) -> &Arc<TrustAnchor> {
        &self.anchor
    }

    /// Returns the type of the leaf certificate.
    pub fn proxy_type(&self) -> ProxyType {
        self.proxy_type
    }

    /// Returns the end entity certificate the proxies are derived from.
    pub fn end_entity(&self) -> &Cert {
        &self.certs[self.end_entity]
    }

    /// Returns the identity the path was issued for.
    pub fn identity(&self) -> &DistinguishedName {
        self.end_entity().subject()
    }
}


//============ Tests =========================================================
