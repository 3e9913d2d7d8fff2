//! Configuration for trust stores and trust managers.
//!
//! The configuration is usually given as a set of key-value properties,
//! either programmatically or through a properties file. The following
//! keys are understood, all case-insensitive:
//!
//! * `crlRequired`: whether each CA needs a valid CRL (default `true`),
//! * `crlEnabled`: whether to check revocation at all (default `true`),
//! * `trustStoreDir`: the trust directory (default
//!   `/etc/grid-security/certificates`),
//! * `crlUpdateInterval`: how often to update the trust store, given as
//!   a number with an optional unit of `s`, `m`, `h`, or `d` (default `0`,
//!   which means never),
//! * `revocationChecker`: the revocation checker, `file` or `none`
//!   (default `file`).

use std::{error, fmt, fs, io};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use log::debug;
use crate::revocation::{RevocationCheckerFactory, RevocationCheckerKind};


//------------ Config --------------------------------------------------------

/// The default trust directory.
pub const DEFAULT_TRUST_STORE_DIR: &str = "/etc/grid-security/certificates";

/// Configuration of a trust manager.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize, serde::Serialize),
    serde(default, rename_all = "camelCase")
)]
pub struct Config {
    /// Does every CA need a usable CRL?
    pub crl_required: bool,

    /// Are certificates checked for revocation at all?
    pub crl_enabled: bool,

    /// The directory with CA certificates, CRLs, and namespace files.
    pub trust_store_dir: PathBuf,

    /// How often the trust store is updated from the directory.
    ///
    /// If this is `None`, updates only happen when asked for.
    pub crl_update_interval: Option<Duration>,

    /// The kind of revocation checker to use.
    pub revocation_checker: RevocationCheckerKind,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            crl_required: true,
            crl_enabled: true,
            trust_store_dir: DEFAULT_TRUST_STORE_DIR.into(),
            crl_update_interval: None,
            revocation_checker: RevocationCheckerKind::File,
        }
    }
}

impl Config {
    /// Creates the default configuration for a trust directory.
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Config {
            trust_store_dir: dir.into(),
            .. Default::default()
        }
    }

    /// Creates a configuration from key-value pairs.
    ///
    /// Missing keys keep their default value. Unknown keys are ignored.
    pub fn from_properties<I, K, V>(iter: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut res = Config::default();
        for (key, value) in iter {
            res.set(key.as_ref(), value.as_ref())?;
        }
        Ok(res)
    }

    /// Reads the configuration from a properties file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_properties(parse_properties(&text)?)
    }

    /// Sets a single value.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        if key.eq_ignore_ascii_case("crlRequired") {
            self.crl_required = parse_bool(key, value)?;
        }
        else if key.eq_ignore_ascii_case("crlEnabled") {
            self.crl_enabled = parse_bool(key, value)?;
        }
        else if key.eq_ignore_ascii_case("trustStoreDir") {
            self.trust_store_dir = value.into();
        }
        else if key.eq_ignore_ascii_case("crlUpdateInterval") {
            self.crl_update_interval = parse_duration(key, value)?;
        }
        else if key.eq_ignore_ascii_case("revocationChecker") {
            self.revocation_checker = value.parse().map_err(|_| {
                ConfigError::invalid(key, value, "'file' or 'none'")
            })?;
        }
        else {
            debug!("Ignoring unknown configuration key '{}'.", key);
        }
        Ok(())
    }

    /// Returns the factory for revocation checkers.
    ///
    /// Returns `None` if revocation checking is disabled.
    pub fn checker_factory(
        &self
    ) -> Option<Arc<dyn RevocationCheckerFactory>> {
        if self.crl_enabled {
            Some(self.revocation_checker.factory(self.crl_required))
        }
        else {
            None
        }
    }
}


//------------ Parsing -------------------------------------------------------

/// Splits the content of a properties file into key-value pairs.
///
/// Keys and values are separated by `=` or `:`. Lines starting with `#` or
/// `!` are comments.
fn parse_properties(
    text: &str
) -> Result<Vec<(String, String)>, ConfigError> {
    let mut res = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue
        }
        let (key, value) = match line.split_once(&['=', ':'][..]) {
            Some(pair) => pair,
            None => return Err(ConfigError::Syntax { line: idx + 1 })
        };
        res.push((key.trim().into(), value.trim().into()));
    }
    Ok(res)
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    for yes in ["true", "yes", "on", "1"] {
        if value.eq_ignore_ascii_case(yes) {
            return Ok(true)
        }
    }
    for no in ["false", "no", "off", "0"] {
        if value.eq_ignore_ascii_case(no) {
            return Ok(false)
        }
    }
    Err(ConfigError::invalid(key, value, "a boolean"))
}

/// Parses a duration.
///
/// A duration of zero means no duration at all.
fn parse_duration(
    key: &str, value: &str
) -> Result<Option<Duration>, ConfigError> {
    let err = || ConfigError::invalid(key, value, "a duration");
    let (number, factor) = match value.char_indices().last() {
        Some((pos, ch)) if ch.is_ascii_alphabetic() => {
            let factor = match ch.to_ascii_lowercase() {
                's' => 1,
                'm' => 60,
                'h' => 60 * 60,
                'd' => 24 * 60 * 60,
                _ => return Err(err())
            };
            (value[..pos].trim(), factor)
        }
        Some(_) => (value, 1),
        None => return Err(err())
    };
    let number = number.parse::<u64>().map_err(|_| err())?;
    match number.checked_mul(factor) {
        Some(0) => Ok(None),
        Some(secs) => Ok(Some(Duration::from_secs(secs))),
        None => Err(err())
    }
}


//------------ ConfigError ---------------------------------------------------

/// The configuration is invalid.
#[derive(Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    Io(io::Error),

    /// A line in the configuration file is not a key-value pair.
    Syntax { line: usize },

    /// A key has an invalid value.
    InvalidValue {
        key: String,
        value: String,
        expected: &'static str,
    },
}

impl ConfigError {
    fn invalid(key: &str, value: &str, expected: &'static str) -> Self {
        ConfigError::InvalidValue {
            key: key.into(), value: value.into(), expected
        }
    }
}

impl From<io::Error> for ConfigError {
    fn from(err: io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ConfigError::Io(ref err) => err.fmt(f),
            ConfigError::Syntax { line } => {
                write!(f, "line {}: expected 'key = value'", line)
            }
            ConfigError::InvalidValue { ref key, ref value, expected } => {
                write!(
                    f, "invalid value '{}' for '{}': expected {}",
                    value, key, expected
                )
            }
        }
    }
}

impl error::Error for ConfigError { }


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert!(config.crl_required);
        assert!(config.crl_enabled);
        assert_eq!(
            config.trust_store_dir, Path::new("/etc/grid-security/certificates")
        );
        assert_eq!(config.crl_update_interval, None);
        assert_eq!(config.revocation_checker, RevocationCheckerKind::File);
        assert!(config.checker_factory().is_some());
    }

    #[test]
    fn properties() {
        let config = Config::from_properties([
            ("CRLREQUIRED", "no"),
            ("crlenabled", "On"),
            ("trustStoreDir", " /tmp/certificates "),
            ("crlUpdateInterval", "2h"),
            ("revocationChecker", "None"),
            ("somethingElse", "whatever"),
        ]).unwrap();
        assert!(!config.crl_required);
        assert!(config.crl_enabled);
        assert_eq!(config.trust_store_dir, Path::new("/tmp/certificates"));
        assert_eq!(
            config.crl_update_interval, Some(Duration::from_secs(7200))
        );
        assert_eq!(config.revocation_checker, RevocationCheckerKind::None);

        let config = Config::from_properties([("crlEnabled", "false")]);
        assert!(config.unwrap().checker_factory().is_none());
    }

    #[test]
    fn durations() {
        let parse = |s| parse_duration("crlUpdateInterval", s).unwrap();
        assert_eq!(parse("0"), None);
        assert_eq!(parse("0h"), None);
        assert_eq!(parse("30"), Some(Duration::from_secs(30)));
        assert_eq!(parse("30s"), Some(Duration::from_secs(30)));
        assert_eq!(parse("5m"), Some(Duration::from_secs(300)));
        assert_eq!(parse("1D"), Some(Duration::from_secs(86400)));
        assert!(parse_duration("x", "").is_err());
        assert!(parse_duration("x", "h").is_err());
        assert!(parse_duration("x", "5w").is_err());
        assert!(parse_duration("x", "-5m").is_err());
    }

    #[test]
    fn invalid_values() {
        assert!(matches!(
            Config::from_properties([("crlRequired", "maybe")]),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            Config::from_properties([("revocationChecker", "ocsp")]),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn properties_file() {
        let pairs = parse_properties(
            "# Grid trust\n\
             ! another comment\n\
             \n\
             crlRequired = false\n\
             trustStoreDir: /opt/certs\n"
        ).unwrap();
        assert_eq!(pairs, vec![
            ("crlRequired".to_string(), "false".to_string()),
            ("trustStoreDir".to_string(), "/opt/certs".to_string()),
        ]);
        assert!(matches!(
            parse_properties("crlRequired\n"),
            Err(ConfigError::Syntax { line: 1 })
        ));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_config() {
        let config: Config = serde_json::from_str(
            r#"{"crlRequired": false, "revocationChecker": "none"}"#
        ).unwrap();
        assert!(!config.crl_required);
        assert!(config.crl_enabled);
        assert_eq!(config.revocation_checker, RevocationCheckerKind::None);
    }
}
