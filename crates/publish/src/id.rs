use crate::error::{Error, ErrorKind};
use derive_more::Display;
use std::num::NonZeroU64;
use std::str::FromStr;

/// Identifier of a content item (page, post, ...) on the host platform.
///
/// Always positive: zero is the host's "no item" sentinel and is rejected at
/// construction, so every filename derived from a `ContentId` is safe.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[display("{_0}")]
pub struct ContentId(NonZeroU64);
impl ContentId {
    pub fn new(id: u64) -> Option<Self> {
        NonZeroU64::new(id).map(Self)
    }

    pub fn get(self) -> u64 {
        self.0.get()
    }

    /// Interpret a raw form or metadata value the way the host does for
    /// optional references: surrounding whitespace is ignored, and anything
    /// blank, zero or non-numeric means "no item".
    pub fn parse_lenient(raw: impl AsRef<str>) -> Option<Self> {
        raw.as_ref().trim().parse::<u64>().ok().and_then(Self::new)
    }
}
impl TryFrom<u64> for ContentId {
    type Error = Error;
    fn try_from(id: u64) -> std::result::Result<Self, Self::Error> {
        match Self::new(id) {
            Some(id) => Ok(id),
            None => exn::bail!(ErrorKind::InvalidContentId(id)),
        }
    }
}
impl FromStr for ContentId {
    type Err = Error;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.parse::<u64>() {
            Ok(id) => Self::try_from(id),
            Err(_) => exn::bail!(ErrorKind::InvalidContentId(0)),
        }
    }
}
impl From<ContentId> for u64 {
    fn from(id: ContentId) -> Self {
        id.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_zero_is_rejected() {
        assert!(ContentId::new(0).is_none());
        let err = ContentId::try_from(0).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidContentId(0)));
    }

    #[test]
    fn test_display_is_plain_number() {
        assert_eq!(ContentId::new(42).unwrap().to_string(), "42");
    }

    #[rstest]
    #[case("42", Some(42))]
    #[case("  7 ", Some(7))]
    #[case("0", None)]
    #[case("", None)]
    #[case("-3", None)]
    #[case("../../etc", None)]
    #[case("12abc", None)]
    fn test_parse_lenient(#[case] raw: &str, #[case] expected: Option<u64>) {
        assert_eq!(ContentId::parse_lenient(raw).map(ContentId::get), expected);
    }

    #[test]
    fn test_from_str_is_strict() {
        assert_eq!("42".parse::<ContentId>().unwrap().get(), 42);
        assert!(" 42".parse::<ContentId>().is_err());
        assert!("0".parse::<ContentId>().is_err());
    }
}
