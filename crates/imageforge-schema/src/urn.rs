use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("{0:?} is not a publisher:offer:sku:version platform image specifier")]
pub struct UrnParseError(pub String);

/// A platform image reference in `publisher:offer:sku:version` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformImage {
    pub publisher: String,
    pub offer: String,
    pub sku: String,
    pub version: String,
}

impl PlatformImage {
    /// Whether the version is the floating `latest` specifier, which
    /// must be pinned to a concrete version before disk creation.
    pub fn is_latest(&self) -> bool {
        self.version.eq_ignore_ascii_case("latest")
    }

    pub fn with_version(&self, version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            ..self.clone()
        }
    }
}

impl FromStr for PlatformImage {
    type Err = UrnParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        let [publisher, offer, sku, version] = parts.as_slice() else {
            return Err(UrnParseError(s.to_owned()));
        };
        if [publisher, offer, sku, version].iter().any(|p| p.is_empty()) {
            return Err(UrnParseError(s.to_owned()));
        }
        Ok(Self {
            publisher: (*publisher).to_owned(),
            offer: (*offer).to_owned(),
            sku: (*sku).to_owned(),
            version: (*version).to_owned(),
        })
    }
}

impl fmt::Display for PlatformImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.publisher, self.offer, self.sku, self.version
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_four_part_urn() {
        let image: PlatformImage = "Canonical:UbuntuServer:18.04-LTS:latest".parse().unwrap();
        assert_eq!(image.publisher, "Canonical");
        assert_eq!(image.offer, "UbuntuServer");
        assert_eq!(image.sku, "18.04-LTS");
        assert!(image.is_latest());
    }

    #[test]
    fn latest_is_case_insensitive() {
        let image: PlatformImage = "P:O:S:LaTeSt".parse().unwrap();
        assert!(image.is_latest());
        let pinned: PlatformImage = "P:O:S:18.04.202002180".parse().unwrap();
        assert!(!pinned.is_latest());
    }

    #[test]
    fn rejects_wrong_shapes() {
        assert!("".parse::<PlatformImage>().is_err());
        assert!("a:b:c".parse::<PlatformImage>().is_err());
        assert!("a:b:c:d:e".parse::<PlatformImage>().is_err());
        assert!("a::c:d".parse::<PlatformImage>().is_err());
        assert!("not-a-valid-thing".parse::<PlatformImage>().is_err());
    }

    #[test]
    fn with_version_replaces_only_version() {
        let image: PlatformImage = "P:O:S:latest".parse().unwrap();
        let pinned = image.with_version("1.2.3");
        assert_eq!(pinned.to_string(), "P:O:S:1.2.3");
        assert_eq!(image.version, "latest");
    }
}
