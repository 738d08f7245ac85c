//! Drive letter parsing.
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;

/// A validated, upper-cased drive letter.
///
/// Accepts the forms people actually type in a config file: `M`, `m`,
/// `M:`, `M:\` and `M:/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct DriveLetter(char);

impl DriveLetter {
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let rest = trimmed.trim_end_matches(['\\', '/']);
        let rest = rest.strip_suffix(':').unwrap_or(rest);

        let mut chars = rest.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii_alphabetic() => Some(Self(c.to_ascii_uppercase())),
            _ => None,
        }
    }

    pub fn letter(self) -> char {
        self.0
    }

    /// Volume form passed to the scanner, e.g. `"M:"`.
    pub fn volume(self) -> String {
        format!("{}:", self.0)
    }

    /// Root directory of the volume, e.g. `M:\`.
    pub fn root(self) -> PathBuf {
        PathBuf::from(format!("{}:\\", self.0))
    }
}

impl fmt::Display for DriveLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for DriveLetter {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("invalid drive letter {value:?}"))
    }
}
