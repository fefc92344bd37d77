// src/atom.rs

//! Package atoms: the human-supplied package reference
//!
//! An atom names one recipe using the format `channel/name[@version]`:
//!
//! - `core/binutils` - newest binutils recipe in the `core` channel
//! - `core/binutils@2.44-1` - exactly version 2.44, recipe revision 1
//!
//! When the version is omitted the sentinel [`LATEST_VERSION`] is used and
//! the recipe locator decides what it resolves to.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Version sentinel used when an atom omits `@version`
pub const LATEST_VERSION: &str = "latest";

/// Recipe revision assumed when a version carries no `-revision` suffix
pub const DEFAULT_RELEASE: &str = "0";

/// A parsed package reference
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageAtom {
    /// Namespace grouping recipes (a recipe repository section)
    pub channel: String,
    /// Recipe name
    pub name: String,
    /// Requested version, or [`LATEST_VERSION`]
    pub version: String,
}

impl PackageAtom {
    /// Create an atom from already-validated parts
    pub fn new(
        channel: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            channel: channel.into(),
            name: name.into(),
            version: version.into(),
        }
    }

    /// Parse an atom from `channel/name` or `channel/name@version`
    ///
    /// Never panics: malformed input yields [`Error::AtomSyntax`].
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let syntax = |reason| Error::AtomSyntax {
            input: raw.to_string(),
            reason,
        };

        let mut parts = raw.split('@');
        let qualified = parts.next().unwrap_or_default();
        let version = match (parts.next(), parts.next()) {
            (None, _) => LATEST_VERSION,
            (Some(v), None) if !v.is_empty() => v,
            _ => return Err(syntax("malformed version suffix")),
        };

        let segments: Vec<&str> = qualified.split('/').collect();
        match segments.as_slice() {
            [channel, name] if !channel.is_empty() && !name.is_empty() => {
                Ok(Self::new(*channel, *name, version))
            }
            _ => Err(syntax("malformed channel/name")),
        }
    }

    /// Whether the version is the `latest` sentinel
    pub fn is_latest(&self) -> bool {
        self.version == LATEST_VERSION
    }

    /// The same package pinned to another version
    pub fn with_version(&self, version: impl Into<String>) -> Self {
        Self {
            channel: self.channel.clone(),
            name: self.name.clone(),
            version: version.into(),
        }
    }

    /// Split the version into upstream version and recipe revision
    ///
    /// `2.44-1` -> (`2.44`, `1`); `2.44` -> (`2.44`, `0`). The split happens
    /// at the last `-` so upstream versions may contain dashes themselves.
    pub fn version_release(&self) -> (&str, &str) {
        match self.version.rsplit_once('-') {
            Some((version, release)) if !version.is_empty() && !release.is_empty() => {
                (version, release)
            }
            _ => (&self.version, DEFAULT_RELEASE),
        }
    }
}

impl fmt::Display for PackageAtom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.channel, self.name, self.version)
    }
}

impl FromStr for PackageAtom {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PackageAtom::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn syntax_reason(raw: &str) -> &'static str {
        match PackageAtom::parse(raw) {
            Err(Error::AtomSyntax { reason, input }) => {
                assert_eq!(input, raw);
                reason
            }
            other => panic!("expected syntax error for {:?}, got {:?}", raw, other),
        }
    }

    #[test]
    fn test_parse_without_version() {
        let atom = PackageAtom::parse("core/binutils").unwrap();
        assert_eq!(atom, PackageAtom::new("core", "binutils", "latest"));
        assert!(atom.is_latest());
    }

    #[test]
    fn test_parse_with_version() {
        let atom = PackageAtom::parse("core/binutils@2.44-1").unwrap();
        assert_eq!(atom.channel, "core");
        assert_eq!(atom.name, "binutils");
        assert_eq!(atom.version, "2.44-1");
        assert!(!atom.is_latest());
    }

    #[test]
    fn test_version_is_taken_verbatim() {
        let atom = PackageAtom::parse("extra/foo@not a version!").unwrap();
        assert_eq!(atom.version, "not a version!");
    }

    #[test]
    fn test_parse_channel_name_errors() {
        for raw in ["badatom", "", "/", "core/", "/binutils", "a/b/c", "a//b", "@1.0", "a/b/c@1"] {
            assert_eq!(syntax_reason(raw), "malformed channel/name", "input {:?}", raw);
        }
    }

    #[test]
    fn test_parse_version_suffix_errors() {
        for raw in ["core/binutils@1@2", "core/binutils@", "a@b@c", "@@", "core/x@1.0@"] {
            assert_eq!(syntax_reason(raw), "malformed version suffix", "input {:?}", raw);
        }
    }

    #[test]
    fn test_display_round_trip() {
        let atom = PackageAtom::new("core", "zlib", "1.3.1-2");
        assert_eq!(atom.to_string(), "core/zlib@1.3.1-2");
        assert_eq!(atom.to_string().parse::<PackageAtom>().unwrap(), atom);
    }

    #[test]
    fn test_version_release_split() {
        let atom = PackageAtom::new("core", "binutils", "2.44-1");
        assert_eq!(atom.version_release(), ("2.44", "1"));

        let atom = atom.with_version("2.44");
        assert_eq!(atom.version_release(), ("2.44", "0"));

        let atom = atom.with_version("1.0-rc1-3");
        assert_eq!(atom.version_release(), ("1.0-rc1", "3"));

        let atom = atom.with_version("-1");
        assert_eq!(atom.version_release(), ("-1", "0"));
    }
}
