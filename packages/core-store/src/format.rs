//! Format hints for on-disk encodings.

use std::borrow::Cow;
use std::fmt;

/// Names one of the encodings a record may live in.
///
/// Carried by decode/encode errors so a user can tell which file was at
/// fault. Uses MIME-type-like strings for familiarity.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Format(pub Cow<'static, str>);

impl Format {
    /// Structured text property tree (`text/x-keyvalues`).
    pub const TEXT: Format = Format(Cow::Borrowed("text/x-keyvalues"));

    /// Structured binary element graph (`application/x-element-graph`).
    pub const BINARY: Format = Format(Cow::Borrowed("application/x-element-graph"));

    /// Legacy flat key/value configuration (`text/x-ini`).
    pub const LEGACY: Format = Format(Cow::Borrowed("text/x-ini"));

    /// Get the format string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_text(&self) -> bool {
        self == &Self::TEXT
    }

    pub fn is_binary(&self) -> bool {
        self == &Self::BINARY
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&'static str> for Format {
    fn from(s: &'static str) -> Self {
        Format(Cow::Borrowed(s))
    }
}

impl AsRef<str> for Format {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
