//! PEP 440 version parsing and ordering.
//!
//! Implements enough of the version grammar to validate and order the
//! versions that appear in requirements manifests: epoch, release segments,
//! pre/post/dev releases and local version labels.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Pre-release kind, in ascending precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PreKind {
    Alpha,
    Beta,
    Rc,
}

impl fmt::Display for PreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreKind::Alpha => write!(f, "a"),
            PreKind::Beta => write!(f, "b"),
            PreKind::Rc => write!(f, "rc"),
        }
    }
}

/// A parsed PEP 440 version.
///
/// Versions are compared by epoch, then release (shorter releases are
/// padded with zeros), then pre/post/dev status, then local label.
#[derive(Debug, Clone)]
pub struct Version {
    pub epoch: u32,
    pub release: Vec<u64>,
    pub pre: Option<(PreKind, u64)>,
    pub post: Option<u64>,
    pub dev: Option<u64>,
    pub local: Option<String>,
}

impl Version {
    /// Parse a version string, tolerating the usual spelling variations
    /// (leading `v`, upper case, `-`/`_` separators, `alpha`/`beta`/`c`
    /// pre-release spellings).
    pub fn parse(input: &str) -> Result<Self, String> {
        let text = input.trim().to_ascii_lowercase();
        let text = text.strip_prefix('v').unwrap_or(&text);
        if text.is_empty() {
            return Err("empty version".to_string());
        }

        let mut parser = VersionParser::new(text);
        let version = parser.parse()?;
        if !parser.at_end() {
            return Err(format!(
                "unexpected trailing characters in version '{}'",
                input.trim()
            ));
        }
        Ok(version)
    }

    /// Release segments padded or truncated to `len` entries.
    pub fn padded_release(&self, len: usize) -> Vec<u64> {
        let mut padded = self.release.clone();
        padded.resize(len, 0);
        padded
    }

    /// True if this is a pre-release or dev release.
    pub fn is_prerelease(&self) -> bool {
        self.pre.is_some() || self.dev.is_some()
    }

    /// This version with the local label removed.
    pub fn without_local(&self) -> Version {
        Version {
            local: None,
            ..self.clone()
        }
    }

    fn pre_rank(&self) -> (u8, u8, u64) {
        match self.pre {
            Some((kind, n)) => (1, kind as u8, n),
            // A dev release with no pre/post segment sorts below any
            // pre-release of the same release.
            None if self.post.is_none() && self.dev.is_some() => (0, 0, 0),
            None => (2, 0, 0),
        }
    }
}

// Equality must agree with the ordering: "1.0" and "1.0.0" are the same
// version, so PartialEq cannot be derived.
impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let width = self.release.len().max(other.release.len());
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| self.padded_release(width).cmp(&other.padded_release(width)))
            .then_with(|| self.pre_rank().cmp(&other.pre_rank()))
            .then_with(|| match (self.post, other.post) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (Some(a), Some(b)) => a.cmp(&b),
            })
            .then_with(|| match (self.dev, other.dev) {
                (None, None) => Ordering::Equal,
                // X.devN sorts before X
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (Some(a), Some(b)) => a.cmp(&b),
            })
            .then_with(|| compare_local(self.local.as_deref(), other.local.as_deref()))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for Version {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.epoch != 0 {
            write!(f, "{}!", self.epoch)?;
        }
        let release: Vec<String> = self.release.iter().map(|n| n.to_string()).collect();
        write!(f, "{}", release.join("."))?;
        if let Some((kind, n)) = self.pre {
            write!(f, "{}{}", kind, n)?;
        }
        if let Some(n) = self.post {
            write!(f, ".post{}", n)?;
        }
        if let Some(n) = self.dev {
            write!(f, ".dev{}", n)?;
        }
        if let Some(local) = &self.local {
            write!(f, "+{}", local)?;
        }
        Ok(())
    }
}

/// Compare local version labels per PEP 440: segment-wise, numeric
/// segments rank above alphanumeric ones, absence ranks lowest.
fn compare_local(a: Option<&str>, b: Option<&str>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => {
            let key = |label: &str| -> Vec<(bool, u64, String)> {
                label
                    .split(['.', '-', '_'])
                    .map(|seg| match seg.parse::<u64>() {
                        Ok(n) => (true, n, String::new()),
                        Err(_) => (false, 0, seg.to_string()),
                    })
                    .collect()
            };
            key(a).cmp(&key(b))
        }
    }
}

struct VersionParser<'a> {
    rest: &'a str,
}

impl<'a> VersionParser<'a> {
    fn new(text: &'a str) -> Self {
        Self { rest: text }
    }

    fn at_end(&self) -> bool {
        self.rest.is_empty()
    }

    fn parse(&mut self) -> Result<Version, String> {
        let first = self
            .number()
            .ok_or_else(|| "version must start with a number".to_string())?;

        // Epoch is a number followed by '!'
        let (epoch, first_release) = if self.eat('!') {
            let epoch = u32::try_from(first).map_err(|_| "epoch out of range".to_string())?;
            let n = self
                .number()
                .ok_or_else(|| "expected release after epoch".to_string())?;
            (epoch, n)
        } else {
            (0, first)
        };

        let mut release = vec![first_release];
        while self.peek() == Some('.') {
            let saved = self.rest;
            self.eat('.');
            match self.number() {
                Some(n) => release.push(n),
                None => {
                    // Not a release segment (e.g. ".dev0"); back off
                    self.rest = saved;
                    break;
                }
            }
        }

        let pre = self.pre_segment()?;
        let post = self.post_segment()?;
        let dev = self.dev_segment()?;
        let local = self.local_segment()?;

        Ok(Version {
            epoch,
            release,
            pre,
            post,
            dev,
            local,
        })
    }

    fn pre_segment(&mut self) -> Result<Option<(PreKind, u64)>, String> {
        let saved = self.rest;
        self.eat_separator();
        let kind = if self.eat_word("alpha") || self.eat_word("a") {
            PreKind::Alpha
        } else if self.eat_word("beta") || self.eat_word("b") {
            PreKind::Beta
        } else if self.eat_word("preview") || self.eat_word("pre") || self.eat_word("rc") {
            PreKind::Rc
        } else if self.eat_word("c") {
            PreKind::Rc
        } else {
            self.rest = saved;
            return Ok(None);
        };
        self.eat_separator();
        Ok(Some((kind, self.number().unwrap_or(0))))
    }

    fn post_segment(&mut self) -> Result<Option<u64>, String> {
        let saved = self.rest;
        self.eat_separator();
        if self.eat_word("post") || self.eat_word("rev") || self.eat_word("r") {
            self.eat_separator();
            return Ok(Some(self.number().unwrap_or(0)));
        }
        self.rest = saved;
        // Implicit post release: "1.0-1"
        if self.peek() == Some('-') {
            let saved = self.rest;
            self.eat('-');
            if let Some(n) = self.number() {
                return Ok(Some(n));
            }
            self.rest = saved;
        }
        Ok(None)
    }

    fn dev_segment(&mut self) -> Result<Option<u64>, String> {
        let saved = self.rest;
        self.eat_separator();
        if self.eat_word("dev") {
            self.eat_separator();
            return Ok(Some(self.number().unwrap_or(0)));
        }
        self.rest = saved;
        Ok(None)
    }

    fn local_segment(&mut self) -> Result<Option<String>, String> {
        if !self.eat('+') {
            return Ok(None);
        }
        let label: String = self
            .rest
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
            .collect();
        if !label.chars().next().is_some_and(|c| c.is_ascii_alphanumeric()) {
            return Err("invalid local version label".to_string());
        }
        self.rest = &self.rest[label.len()..];
        Ok(Some(label))
    }

    fn peek(&self) -> Option<char> {
        self.rest.chars().next()
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.rest = &self.rest[c.len_utf8()..];
            true
        } else {
            false
        }
    }

    fn eat_separator(&mut self) {
        if matches!(self.peek(), Some('.') | Some('-') | Some('_')) {
            self.rest = &self.rest[1..];
        }
    }

    /// Consume `word` only if it is followed by a non-letter (so "a"
    /// does not swallow the start of "alpha" or a local label).
    fn eat_word(&mut self, word: &str) -> bool {
        if let Some(rest) = self.rest.strip_prefix(word) {
            if rest.chars().next().is_none_or(|c| !c.is_ascii_alphabetic()) {
                self.rest = rest;
                return true;
            }
        }
        false
    }

    fn number(&mut self) -> Option<u64> {
        let digits: String = self.rest.chars().take_while(char::is_ascii_digit).collect();
        // A digit run that overflows u64 is left in place so the caller
        // reports it as trailing garbage instead of reading it as 0
        let value: u64 = digits.parse().ok()?;
        self.rest = &self.rest[digits.len()..];
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_parse_simple() {
        let version = v("1.2.3");
        assert_eq!(version.release, vec![1, 2, 3]);
        assert_eq!(version.epoch, 0);
        assert!(version.pre.is_none());
        assert!(version.local.is_none());
    }

    #[test]
    fn test_parse_v_prefix_and_case() {
        assert_eq!(v("v1.0"), v("1.0"));
        assert_eq!(v("1.0RC1"), v("1.0rc1"));
    }

    #[test]
    fn test_overflowing_number_is_rejected() {
        // The digit run does not fit in u64; it must not read as 0
        assert!(Version::parse("1.0a99999999999999999999999").is_err());
        assert!(Version::parse("99999999999999999999999").is_err());
        assert_eq!(v("1.0a12").pre, Some((PreKind::Alpha, 12)));
    }

    #[test]
    fn test_parse_epoch() {
        let version = v("2!1.0");
        assert_eq!(version.epoch, 2);
        assert_eq!(version.release, vec![1, 0]);
    }

    #[test]
    fn test_parse_pre_release_spellings() {
        assert_eq!(v("1.0a1"), v("1.0.alpha.1"));
        assert_eq!(v("1.0b2"), v("1.0-beta-2"));
        assert_eq!(v("1.0rc1"), v("1.0c1"));
        assert_eq!(v("1.0rc1"), v("1.0.pre1"));
        assert_eq!(v("1.0a0"), v("1.0a"));
    }

    #[test]
    fn test_parse_post_and_dev() {
        let version = v("1.0.post2");
        assert_eq!(version.post, Some(2));
        assert_eq!(v("1.0-3").post, Some(3));
        assert_eq!(v("1.0.rev1").post, Some(1));
        assert_eq!(v("1.0.dev4").dev, Some(4));
    }

    #[test]
    fn test_parse_local() {
        let version = v("1.0+ubuntu.1");
        assert_eq!(version.local.as_deref(), Some("ubuntu.1"));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Version::parse("").is_err());
        assert!(Version::parse("abc").is_err());
        assert!(Version::parse("1.0.0!").is_err());
        assert!(Version::parse("1.0+").is_err());
        assert!(Version::parse("1.0 beta").is_err());
    }

    #[test]
    fn test_ordering_release_padding() {
        assert_eq!(v("1.0").cmp(&v("1.0.0")), Ordering::Equal);
        assert!(v("1.0") < v("1.0.1"));
        assert!(v("1.9") < v("1.10"));
    }

    #[test]
    fn test_ordering_epoch_dominates() {
        assert!(v("1!1.0") > v("999.0"));
    }

    #[test]
    fn test_ordering_pre_dev_post_chain() {
        // PEP 440 example ordering
        let ordered = [
            "1.0.dev1", "1.0a1", "1.0a2.dev1", "1.0a2", "1.0b1", "1.0rc1", "1.0", "1.0.post1",
            "1.1.dev1",
        ];
        for pair in ordered.windows(2) {
            assert!(v(pair[0]) < v(pair[1]), "{} < {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_ordering_local() {
        assert!(v("1.0") < v("1.0+abc"));
        assert!(v("1.0+abc") < v("1.0+abc.1"));
        // Numeric local segments rank above alphanumeric ones
        assert!(v("1.0+1") > v("1.0+abc"));
    }

    #[test]
    fn test_is_prerelease() {
        assert!(v("1.0a1").is_prerelease());
        assert!(v("1.0.dev1").is_prerelease());
        assert!(!v("1.0.post1").is_prerelease());
        assert!(!v("1.0").is_prerelease());
    }

    #[test]
    fn test_display_round_trip() {
        for text in ["1.2.3", "2!1.0", "1.0a1", "1.0.post1", "1.0.dev2", "1.0+x.1"] {
            assert_eq!(v(text).to_string(), text.to_string());
            assert_eq!(v(&v(text).to_string()), v(text));
        }
    }
}
