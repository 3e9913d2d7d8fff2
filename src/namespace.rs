//! Namespace policies for certification authorities.
//!
//! A namespace policy limits the subject names a CA may issue certificates
//! for. Grid trust directories carry them in one of two formats next to
//! the CA certificate: the EUGridPMA format in a file `<hash>.namespaces`
//! and the older Globus format in a file `<hash>.signing_policy`.
//!
//! Both formats are reduced to a list of [`NamespaceRule`]s. A rule applies
//! to certificates issued by a certain CA and either permits or denies
//! subject names matching a regular expression. Subject names are matched
//! in their slash form, e.g., `/C=US/O=Org/CN=Example`.

use std::{error, fmt, fs, io};
use std::path::Path;
use log::debug;
use regex::{Regex, RegexBuilder};
use crate::dn::DistinguishedName;


//------------ NamespaceFormat -----------------------------------------------

/// The file format a namespace policy was read from.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum NamespaceFormat {
    /// The EUGridPMA `.namespaces` format.
    EuGridPma,

    /// The Globus `.signing_policy` format.
    Globus,
}

impl NamespaceFormat {
    /// Returns the file name extension used for the format.
    pub fn extension(self) -> &'static str {
        match self {
            NamespaceFormat::EuGridPma => "namespaces",
            NamespaceFormat::Globus => "signing_policy",
        }
    }
}

impl fmt::Display for NamespaceFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match *self {
            NamespaceFormat::EuGridPma => "EUGridPMA namespaces",
            NamespaceFormat::Globus => "Globus signing policy",
        })
    }
}


//------------ NamespacePolicy -----------------------------------------------

/// The namespace policy attached to a CA.
#[derive(Clone, Debug)]
pub struct NamespacePolicy {
    format: NamespaceFormat,
    rules: Vec<NamespaceRule>,
}

impl NamespacePolicy {
    /// Creates a policy from a list of rules.
    pub fn new(format: NamespaceFormat, rules: Vec<NamespaceRule>) -> Self {
        NamespacePolicy { format, rules }
    }

    /// Loads a policy from a file.
    ///
    /// The `owner` is the subject of the CA the file belongs to. It is
    /// used for `SELF` issuers in the EUGridPMA format.
    pub fn load(
        path: &Path, format: NamespaceFormat, owner: &DistinguishedName
    ) -> Result<Self, NamespaceError> {
        let data = fs::read(path)?;
        let text = String::from_utf8_lossy(&data);
        match format {
            NamespaceFormat::EuGridPma => Self::parse_namespaces(&text, owner),
            NamespaceFormat::Globus => Self::parse_signing_policy(&text),
        }
    }

    /// Parses the content of a `.namespaces` file.
    ///
    /// Each rule has the form
    ///
    /// ```text
    /// TO Issuer "/C=CH/O=Example/CN=Example CA" \
    ///     PERMIT Subject "/C=CH/O=Example/.*"
    /// ```
    ///
    /// with `SELF` instead of the quoted issuer referring to `owner`.
    pub fn parse_namespaces(
        text: &str, owner: &DistinguishedName
    ) -> Result<Self, NamespaceError> {
        let mut rules = Vec::new();
        for (line_no, line) in logical_lines(text) {
            let tokens = tokenize(&line, line_no, '"')?;
            if tokens.is_empty() {
                continue
            }
            rules.push(NamespaceRule::from_namespaces_tokens(
                &tokens, line_no, owner
            )?);
        }
        debug!("Parsed {} namespace rules.", rules.len());
        Ok(NamespacePolicy::new(NamespaceFormat::EuGridPma, rules))
    }

    /// Parses the content of a `.signing_policy` file.
    ///
    /// The file consists of blocks of the form
    ///
    /// ```text
    /// access_id_CA   X509   '/C=CH/O=Example/CN=Example CA'
    /// pos_rights     globus CA:sign
    /// cond_subjects  globus '"/C=CH/O=Example/*" "/DC=ch/DC=example/*"'
    /// ```
    ///
    /// Every subject pattern becomes a permitting rule.
    pub fn parse_signing_policy(text: &str) -> Result<Self, NamespaceError> {
        let mut rules = Vec::new();
        let mut block: Option<SigningBlock> = None;
        for (idx, line) in text.lines().enumerate() {
            let line_no = idx + 1;
            let tokens = tokenize(line, line_no, '\'')?;
            let keyword = match tokens.first() {
                Some(Token::Word(word)) => word.as_str(),
                Some(Token::Quoted(_)) => {
                    return Err(NamespaceError::syntax(
                        line_no, "expected keyword"
                    ))
                }
                None => continue,
            };
            if keyword.eq_ignore_ascii_case("access_id_CA") {
                if let Some(block) = block.take() {
                    block.finish(&mut rules)?;
                }
                block = Some(SigningBlock::from_tokens(&tokens, line_no)?);
            }
            else if keyword.eq_ignore_ascii_case("pos_rights") {
                let block = block.as_mut().ok_or_else(|| {
                    NamespaceError::syntax(
                        line_no, "pos_rights outside of access_id_CA block"
                    )
                })?;
                block.rights(&tokens, line_no)?;
            }
            else if keyword.eq_ignore_ascii_case("cond_subjects") {
                let block = block.as_mut().ok_or_else(|| {
                    NamespaceError::syntax(
                        line_no, "cond_subjects outside of access_id_CA block"
                    )
                })?;
                block.subjects(&tokens, line_no)?;
            }
            else {
                return Err(NamespaceError::syntax(
                    line_no, format!("unknown keyword '{}'", keyword)
                ))
            }
        }
        if let Some(block) = block {
            block.finish(&mut rules)?;
        }
        debug!("Parsed {} signing policy rules.", rules.len());
        Ok(NamespacePolicy::new(NamespaceFormat::Globus, rules))
    }

    pub fn format(&self) -> NamespaceFormat {
        self.format
    }

    pub fn rules(&self) -> &[NamespaceRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Returns whether any rule applies to certificates by `issuer`.
    pub fn has_rules_for(&self, issuer: &DistinguishedName) -> bool {
        self.rules.iter().any(|rule| rule.issuer() == issuer)
    }

    /// Checks whether `issuer` may issue a certificate for `subject`.
    ///
    /// Only rules for the issuer are considered. If there are none, the
    /// subject is rejected. A matching denying rule rejects the subject.
    /// Otherwise at least one permitting rule has to match.
    pub fn check(
        &self, issuer: &DistinguishedName, subject: &DistinguishedName
    ) -> Result<(), NamespaceViolation> {
        let name = subject.to_x500();
        let mut applicable = false;
        let mut permitted = false;
        for rule in self.rules.iter().filter(|rule| rule.issuer() == issuer) {
            applicable = true;
            if !rule.matches_str(name) {
                continue
            }
            if !rule.is_permit() {
                return Err(NamespaceViolation::Denied {
                    pattern: rule.pattern().into()
                })
            }
            permitted = true;
        }
        if !applicable {
            Err(NamespaceViolation::NoRule)
        }
        else if !permitted {
            Err(NamespaceViolation::NotPermitted)
        }
        else {
            Ok(())
        }
    }
}


//------------ NamespaceRule -------------------------------------------------

/// A single rule of a namespace policy.
#[derive(Clone, Debug)]
pub struct NamespaceRule {
    issuer: DistinguishedName,
    permit: bool,
    pattern: String,
    subject: Regex,
}

impl NamespaceRule {
    /// Creates a rule from a regular expression.
    ///
    /// The expression is matched against the whole subject name, ignoring
    /// case.
    pub fn new(
        issuer: DistinguishedName, permit: bool, pattern: &str
    ) -> Result<Self, regex::Error> {
        let subject = RegexBuilder::new(&format!("^(?:{})$", pattern))
            .case_insensitive(true)
            .build()?;
        Ok(NamespaceRule {
            issuer, permit, pattern: pattern.into(), subject
        })
    }

    /// Creates a permitting rule from a Globus glob pattern.
    ///
    /// The only wildcard is `*` matching any sequence of characters.
    pub fn from_glob(
        issuer: DistinguishedName, glob: &str
    ) -> Result<Self, regex::Error> {
        let pattern = glob.split('*').map(regex::escape)
            .collect::<Vec<_>>().join(".*");
        Self::new(issuer, true, &pattern)
    }

    fn from_namespaces_tokens(
        tokens: &[Token], line_no: usize, owner: &DistinguishedName
    ) -> Result<Self, NamespaceError> {
        let mut tokens = tokens.iter();
        expect_word(tokens.next(), "TO", line_no)?;
        expect_word(tokens.next(), "Issuer", line_no)?;
        let issuer = match tokens.next() {
            Some(Token::Word(word)) if word.eq_ignore_ascii_case("SELF") => {
                owner.clone()
            }
            Some(Token::Quoted(name)) => parse_issuer(name, line_no)?,
            _ => {
                return Err(NamespaceError::syntax(
                    line_no, "expected quoted issuer or SELF"
                ))
            }
        };
        let permit = match tokens.next() {
            Some(Token::Word(word)) if word.eq_ignore_ascii_case("PERMIT") => {
                true
            }
            Some(Token::Word(word)) if word.eq_ignore_ascii_case("DENY") => {
                false
            }
            _ => {
                return Err(NamespaceError::syntax(
                    line_no, "expected PERMIT or DENY"
                ))
            }
        };
        expect_word(tokens.next(), "Subject", line_no)?;
        let pattern = match tokens.next() {
            Some(Token::Quoted(pattern)) => pattern,
            _ => {
                return Err(NamespaceError::syntax(
                    line_no, "expected quoted subject pattern"
                ))
            }
        };
        if tokens.next().is_some() {
            return Err(NamespaceError::syntax(
                line_no, "trailing data after subject pattern"
            ))
        }
        Self::new(issuer, permit, pattern).map_err(|err| {
            NamespaceError::Regex { line: line_no, err }
        })
    }

    pub fn issuer(&self) -> &DistinguishedName {
        &self.issuer
    }

    pub fn is_permit(&self) -> bool {
        self.permit
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Returns whether the rule’s subject pattern matches a name.
    pub fn matches(&self, subject: &DistinguishedName) -> bool {
        self.matches_str(subject.to_x500())
    }

    fn matches_str(&self, subject: &str) -> bool {
        self.subject.is_match(subject)
    }
}


//------------ SigningBlock --------------------------------------------------

/// An `access_id_CA` block of a signing policy under construction.
struct SigningBlock {
    line: usize,
    issuer: DistinguishedName,
    can_sign: bool,
    subjects: Vec<String>,
}

impl SigningBlock {
    fn from_tokens(
        tokens: &[Token], line_no: usize
    ) -> Result<Self, NamespaceError> {
        match tokens {
            [_, Token::Word(kind), Token::Quoted(name)]
                if kind.eq_ignore_ascii_case("X509") =>
            {
                Ok(SigningBlock {
                    line: line_no,
                    issuer: parse_issuer(name, line_no)?,
                    can_sign: false,
                    subjects: Vec::new(),
                })
            }
            _ => {
                Err(NamespaceError::syntax(
                    line_no, "expected access_id_CA X509 '<name>'"
                ))
            }
        }
    }

    fn rights(
        &mut self, tokens: &[Token], line_no: usize
    ) -> Result<(), NamespaceError> {
        match tokens {
            [_, Token::Word(auth), Token::Word(right)]
                if auth.eq_ignore_ascii_case("globus") =>
            {
                if right.eq_ignore_ascii_case("CA:sign") {
                    self.can_sign = true;
                    Ok(())
                }
                else {
                    Err(NamespaceError::syntax(
                        line_no, format!("unsupported right '{}'", right)
                    ))
                }
            }
            _ => {
                Err(NamespaceError::syntax(
                    line_no, "expected pos_rights globus CA:sign"
                ))
            }
        }
    }

    fn subjects(
        &mut self, tokens: &[Token], line_no: usize
    ) -> Result<(), NamespaceError> {
        let list = match tokens {
            [_, Token::Word(auth), Token::Quoted(list)]
                if auth.eq_ignore_ascii_case("globus") => list,
            _ => {
                return Err(NamespaceError::syntax(
                    line_no, "expected cond_subjects globus '<subjects>'"
                ))
            }
        };
        for token in tokenize(list, line_no, '"')? {
            match token {
                Token::Quoted(subject) => self.subjects.push(subject),
                Token::Word(_) => {
                    return Err(NamespaceError::syntax(
                        line_no, "subjects must be double quoted"
                    ))
                }
            }
        }
        Ok(())
    }

    fn finish(
        self, rules: &mut Vec<NamespaceRule>
    ) -> Result<(), NamespaceError> {
        if !self.can_sign {
            return Err(NamespaceError::syntax(
                self.line, "access_id_CA block without pos_rights"
            ))
        }
        if self.subjects.is_empty() {
            return Err(NamespaceError::syntax(
                self.line, "access_id_CA block without cond_subjects"
            ))
        }
        for subject in &self.subjects {
            rules.push(
                NamespaceRule::from_glob(
                    self.issuer.clone(), subject
                ).map_err(|err| {
                    NamespaceError::Regex { line: self.line, err }
                })?
            );
        }
        Ok(())
    }
}


//------------ Tokenizing ----------------------------------------------------

#[derive(Clone, Debug, Eq, PartialEq)]
enum Token {
    Word(String),
    Quoted(String),
}

/// Joins continued lines.
///
/// Returns the logical lines together with the number of their first
/// physical line.
fn logical_lines(text: &str) -> Vec<(usize, String)> {
    let mut res = Vec::new();
    let mut current: Option<(usize, String)> = None;
    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim_end();
        let (content, continued) = match trimmed.strip_suffix('\\') {
            Some(content) => (content, true),
            None => (trimmed, false),
        };
        let entry = current.get_or_insert_with(|| (idx + 1, String::new()));
        entry.1.push_str(content);
        entry.1.push(' ');
        if !continued {
            res.extend(current.take());
        }
    }
    res.extend(current);
    res
}

/// Splits a line into words and quoted strings.
///
/// A `#` at the start of a token starts a comment.
fn tokenize(
    line: &str, line_no: usize, quote: char
) -> Result<Vec<Token>, NamespaceError> {
    let mut res = Vec::new();
    let mut chars = line.chars().peekable();
    while let Some(&ch) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
        }
        else if ch == '#' {
            break
        }
        else if ch == quote {
            chars.next();
            let mut value = String::new();
            loop {
                match chars.next() {
                    Some(ch) if ch == quote => break,
                    Some(ch) => value.push(ch),
                    None => {
                        return Err(NamespaceError::syntax(
                            line_no, "unterminated quoted string"
                        ))
                    }
                }
            }
            res.push(Token::Quoted(value));
        }
        else {
            let mut value = String::new();
            while let Some(&ch) = chars.peek() {
                if ch.is_whitespace() || ch == quote {
                    break
                }
                value.push(ch);
                chars.next();
            }
            res.push(Token::Word(value));
        }
    }
    Ok(res)
}

fn expect_word(
    token: Option<&Token>, keyword: &'static str, line_no: usize
) -> Result<(), NamespaceError> {
    match token {
        Some(Token::Word(word)) if word.eq_ignore_ascii_case(keyword) => {
            Ok(())
        }
        _ => {
            Err(NamespaceError::syntax(
                line_no, format!("expected '{}'", keyword)
            ))
        }
    }
}

fn parse_issuer(
    name: &str, line_no: usize
) -> Result<DistinguishedName, NamespaceError> {
    DistinguishedName::from_x500(name).map_err(|_| {
        NamespaceError::syntax(
            line_no, format!("invalid issuer name '{}'", name)
        )
    })
}


//------------ NamespaceViolation --------------------------------------------

/// A subject name is outside the namespace of its issuer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum NamespaceViolation {
    /// The policy has no rules for the issuer.
    NoRule,

    /// A denying rule matched the subject.
    Denied { pattern: String },

    /// No permitting rule matched the subject.
    NotPermitted,
}

impl fmt::Display for NamespaceViolation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            NamespaceViolation::NoRule => {
                f.write_str("namespace policy has no rules for the issuer")
            }
            NamespaceViolation::Denied { ref pattern } => {
                write!(f, "subject denied by namespace rule '{}'", pattern)
            }
            NamespaceViolation::NotPermitted => {
                f.write_str("subject not permitted by any namespace rule")
            }
        }
    }
}

impl error::Error for NamespaceViolation { }


//------------ NamespaceError ------------------------------------------------

/// A namespace policy file could not be read.
#[derive(Debug)]
pub enum NamespaceError {
    /// Reading the file failed.
    Io(io::Error),

    /// The file has a syntax error.
    Syntax { line: usize, msg: String },

    /// A subject pattern is not a valid regular expression.
    Regex { line: usize, err: regex::Error },
}

impl NamespaceError {
    fn syntax(line: usize, msg: impl Into<String>) -> Self {
        NamespaceError::Syntax { line, msg: msg.into() }
    }

    /// Returns the line the error was found on, if any.
    pub fn line(&self) -> Option<usize> {
        match *self {
            NamespaceError::Io(_) => None,
            NamespaceError::Syntax { line, .. } => Some(line),
            NamespaceError::Regex { line, .. } => Some(line),
        }
    }

    /// Returns whether the error is caused by a missing file.
    pub fn is_not_found(&self) -> bool {
        matches!(
            *self,
            NamespaceError::Io(ref err) if err.kind() == io::ErrorKind::NotFound
        )
    }
}

impl From<io::Error> for NamespaceError {
    fn from(err: io::Error) -> Self {
        NamespaceError::Io(err)
    }
}

impl fmt::Display for NamespaceError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            NamespaceError::Io(ref err) => err.fmt(f),
            NamespaceError::Syntax { line, ref msg } => {
                write!(f, "line {}: {}", line, msg)
            }
            NamespaceError::Regex { line, ref err } => {
                write!(f, "line {}: invalid subject pattern: {}", line, err)
            }
        }
    }
}

impl error::Error for NamespaceError { }


//============ Tests =========================================================

#[cfg(test)]
mod test {
    use super::*;

    fn dn(s: &str) -> DistinguishedName {
        s.parse().unwrap()
    }

    const NAMESPACES: &str = r#"
# Namespaces for the Example CA
#
TO Issuer "/C=CH/O=Example/CN=Example CA" \
    PERMIT Subject "/C=CH/O=Example/.*"

TO Issuer SELF DENY Subject "/C=CH/O=Example/CN=Evil.*"  # no evil
to issuer SELF permit subject "/DC=ch/DC=example/.*"
"#;

    #[test]
    fn parse_namespaces() {
        let owner = dn("/C=CH/O=Example/CN=Example CA");
        let policy = NamespacePolicy::parse_namespaces(
            NAMESPACES, &owner
        ).unwrap();
        assert_eq!(policy.format(), NamespaceFormat::EuGridPma);
        assert_eq!(policy.rules().len(), 3);
        assert!(policy.rules()[0].is_permit());
        assert!(!policy.rules()[1].is_permit());
        assert_eq!(policy.rules()[1].issuer(), &owner);
        assert_eq!(policy.rules()[2].pattern(), "/DC=ch/DC=example/.*");
    }

    #[test]
    fn check_namespaces() {
        let owner = dn("/C=CH/O=Example/CN=Example CA");
        let policy = NamespacePolicy::parse_namespaces(
            NAMESPACES, &owner
        ).unwrap();
        assert_eq!(
            policy.check(&owner, &dn("/C=CH/O=Example/CN=Alice")),
            Ok(())
        );
        assert_eq!(
            policy.check(&owner, &dn("/c=ch/o=EXAMPLE/CN=Bob")),
            Ok(())
        );
        assert_eq!(
            policy.check(&owner, &dn("/DC=ch/DC=example/CN=Carol")),
            Ok(())
        );
        assert_eq!(
            policy.check(&owner, &dn("/C=CH/O=Example/CN=Evil Eve")),
            Err(NamespaceViolation::Denied {
                pattern: "/C=CH/O=Example/CN=Evil.*".into()
            })
        );
        assert_eq!(
            policy.check(&owner, &dn("/C=DE/O=Other/CN=Alice")),
            Err(NamespaceViolation::NotPermitted)
        );
        assert_eq!(
            policy.check(
                &dn("/C=CH/O=Other/CN=Other CA"),
                &dn("/C=CH/O=Example/CN=Alice")
            ),
            Err(NamespaceViolation::NoRule)
        );
    }

    #[test]
    fn pattern_is_anchored() {
        let owner = dn("/C=CH/O=Example/CN=Example CA");
        let policy = NamespacePolicy::parse_namespaces(
            "TO Issuer SELF PERMIT Subject \"/C=CH/O=Example/CN=Alice\"",
            &owner
        ).unwrap();
        assert!(
            policy.check(&owner, &dn("/C=CH/O=Example/CN=Alice")).is_ok()
        );
        assert!(
            policy.check(
                &owner, &dn("/C=CH/O=Example/CN=Alice/CN=proxy")
            ).is_err()
        );
    }

    #[test]
    fn namespaces_errors() {
        let owner = dn("/CN=Example CA");
        let err = NamespacePolicy::parse_namespaces(
            "# comment\nTO Issuer SELF ALLOW Subject \".*\"", &owner
        ).unwrap_err();
        assert_eq!(err.line(), Some(2));

        let err = NamespacePolicy::parse_namespaces(
            "TO Issuer SELF PERMIT Subject \"(unclosed\"", &owner
        ).unwrap_err();
        assert!(matches!(err, NamespaceError::Regex { line: 1, .. }));

        let err = NamespacePolicy::parse_namespaces(
            "TO Issuer \"/CN=Example CA\" PERMIT Subject \".*", &owner
        ).unwrap_err();
        assert!(matches!(err, NamespaceError::Syntax { line: 1, .. }));
    }

    #[test]
    fn hash_inside_word() {
        assert_eq!(
            tokenize("pos_rights globus CA#sign # rights", 1, '\'').unwrap(),
            vec![
                Token::Word("pos_rights".into()),
                Token::Word("globus".into()),
                Token::Word("CA#sign".into()),
            ]
        );
        assert_eq!(
            tokenize("TO \"/CN=#1\"#comment", 1, '"').unwrap(),
            vec![Token::Word("TO".into()), Token::Quoted("/CN=#1".into())]
        );
    }

    const SIGNING_POLICY: &str = "
# EACL for the Example CA
access_id_CA      X509         '/C=CH/O=Example/CN=Example CA'
pos_rights        globus        CA:sign
cond_subjects     globus       '\"/C=CH/O=Example/*\"  \"/DC=ch/DC=example/*\"'
";

    #[test]
    fn parse_signing_policy() {
        let policy = NamespacePolicy::parse_signing_policy(
            SIGNING_POLICY
        ).unwrap();
        assert_eq!(policy.format(), NamespaceFormat::Globus);
        assert_eq!(policy.rules().len(), 2);
        assert!(policy.rules().iter().all(|rule| rule.is_permit()));

        let ca = dn("/C=CH/O=Example/CN=Example CA");
        assert!(policy.has_rules_for(&ca));
        assert!(policy.check(&ca, &dn("/C=CH/O=Example/CN=Alice")).is_ok());
        assert!(
            policy.check(&ca, &dn("/DC=ch/DC=example/CN=Bob")).is_ok()
        );
        assert_eq!(
            policy.check(&ca, &dn("/C=CH/O=Examples/CN=Mallory")),
            Err(NamespaceViolation::NotPermitted)
        );
    }

    #[test]
    fn glob_escapes_pattern() {
        let rule = NamespaceRule::from_glob(
            dn("/CN=CA"), "/C=CH/O=Example (1.0)/*"
        ).unwrap();
        assert!(rule.matches(&dn("/C=CH/O=Example (1.0)/CN=Alice")));
        assert!(!rule.matches(&dn("/C=CH/O=Example x1y0z/CN=Alice")));
    }

    #[test]
    fn signing_policy_errors() {
        let err = NamespacePolicy::parse_signing_policy(
            "pos_rights globus CA:sign"
        ).unwrap_err();
        assert_eq!(err.line(), Some(1));

        let err = NamespacePolicy::parse_signing_policy(
            "access_id_CA X509 '/CN=CA'\npos_rights globus CA:sign\n"
        ).unwrap_err();
        assert!(matches!(err, NamespaceError::Syntax { line: 1, .. }));

        let err = NamespacePolicy::parse_signing_policy(
            "access_id_CA X509 '/CN=CA'\nfrobnicate\n"
        ).unwrap_err();
        assert_eq!(err.line(), Some(2));
    }
}
