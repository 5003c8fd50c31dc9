//! API version negotiation through the `Accept` header.
//!
//! Clients select a representation with a media type parameter, for example
//! `Accept: application/json;version=2.0`. Fields introduced in a later version
//! are withheld from older clients.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Extract the version token from an `Accept` header value.
///
/// The header is split on `;` and the first segment mentioning `version` is
/// split on `=`; its second token is returned as-is. When the header is
/// absent, carries no such segment, or the segment has no `=`, `default` is
/// returned. The token is not validated here.
pub fn resolve_version(accept: Option<&str>, default: &str) -> String {
    let Some(accept) = accept else {
        return default.to_string();
    };

    accept
        .split(';')
        .find(|segment| segment.contains("version"))
        .and_then(|segment| segment.split('=').nth(1))
        .map(|token| token.trim().to_string())
        .unwrap_or_else(|| default.to_string())
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("'{0}' is not a dotted numeric version")]
pub struct VersionError(String);

/// Dotted numeric version, compared component by component.
///
/// Missing components count as zero, so `2` == `2.0` == `2.0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ApiVersion {
    major: u32,
    minor: u32,
    patch: u32,
}

impl ApiVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse `token`, or fall back to `default` when it is not a version.
    pub fn parse_or(token: &str, default: ApiVersion) -> ApiVersion {
        token.parse().unwrap_or_else(|err: VersionError| {
            tracing::debug!(%err, fallback = %default, "unparseable api version");
            default
        })
    }
}

impl FromStr for ApiVersion {
    type Err = VersionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let invalid = || VersionError(value.to_string());

        let mut parts = [0u32; 3];
        let mut count = 0;
        for piece in trimmed.split('.') {
            if count == parts.len() || piece.is_empty() {
                return Err(invalid());
            }
            parts[count] = piece.parse().map_err(|_| invalid())?;
            count += 1;
        }

        Ok(Self::new(parts[0], parts[1], parts[2]))
    }
}

impl Ord for ApiVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch).cmp(&(other.major, other.minor, other.patch))
    }
}

impl PartialOrd for ApiVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.patch == 0 {
            write!(f, "{}.{}", self.major, self.minor)
        } else {
            write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_parameter_is_extracted() {
        assert_eq!(resolve_version(Some("text/json;version=2.0"), "1.0"), "2.0");
        assert_eq!(
            resolve_version(Some("application/json; version=1.5"), "1.0"),
            "1.5"
        );
    }

    #[test]
    fn missing_header_uses_default() {
        assert_eq!(resolve_version(None, "1.0"), "1.0");
        assert_eq!(resolve_version(Some("application/json"), "1.0"), "1.0");
        assert_eq!(resolve_version(Some(""), "1.0"), "1.0");
    }

    #[test]
    fn first_match_wins() {
        assert_eq!(
            resolve_version(Some("application/json;version=3.0;version=4.0"), "1.0"),
            "3.0"
        );
    }

    #[test]
    fn token_is_passed_through_unvalidated() {
        assert_eq!(
            resolve_version(Some("application/json;version=2.0beta"), "1.0"),
            "2.0beta"
        );
    }

    #[test]
    fn segment_without_equals_uses_default() {
        assert_eq!(resolve_version(Some("application/json;version"), "1.0"), "1.0");
    }

    #[test]
    fn versions_compare_numerically() {
        let v = |s: &str| s.parse::<ApiVersion>().unwrap();
        assert!(v("2.0") > v("1.0"));
        assert!(v("1.10") > v("1.9"));
        assert_eq!(v("2"), v("2.0.0"));
        assert_eq!(v("2.0").to_string(), "2.0");
        assert_eq!(v("2.0.1").to_string(), "2.0.1");
    }

    #[test]
    fn malformed_versions_are_rejected() {
        for token in ["", "2.0beta", "1..0", "1.2.3.4", "v2"] {
            assert!(token.parse::<ApiVersion>().is_err(), "{token}");
        }
    }

    #[test]
    fn parse_or_falls_back() {
        let default = ApiVersion::new(1, 0, 0);
        assert_eq!(ApiVersion::parse_or("garbage", default), default);
        assert_eq!(
            ApiVersion::parse_or("2.0", default),
            ApiVersion::new(2, 0, 0)
        );
    }
}
