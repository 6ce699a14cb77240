//! Semantic version parsing, ordering and bumping.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::{UltrathinkError, UltrathinkResult};

static SEMVER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<major>0|[1-9]\d*)\.(?P<minor>0|[1-9]\d*)\.(?P<patch>0|[1-9]\d*)(?:-(?P<prerelease>(?:0|[1-9]\d*|\d*[a-zA-Z-][0-9a-zA-Z-]*)(?:\.(?:0|[1-9]\d*|\d*[a-zA-Z-][0-9a-zA-Z-]*))*))?(?:\+(?P<buildmetadata>[0-9a-zA-Z-]+(?:\.[0-9a-zA-Z-]+)*))?$",
    )
    .unwrap()
});

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedVersion {
    pub version_string: String,
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub pre_release: Option<String>,
    pub build_metadata: Option<String>,
    pub is_valid_semver: bool,
}

/// Parse `s` as semver. Non-semver strings fall back to a best-effort `.`
/// split where non-numeric parts count as 0.
pub fn parse_version(s: &str) -> ParsedVersion {
    if let Some(caps) = SEMVER.captures(s) {
        let number = |name: &str| {
            caps.name(name)
                .and_then(|m| m.as_str().parse::<u64>().ok())
                .unwrap_or(0)
        };
        return ParsedVersion {
            version_string: s.to_string(),
            major: number("major"),
            minor: number("minor"),
            patch: number("patch"),
            pre_release: caps.name("prerelease").map(|m| m.as_str().to_string()),
            build_metadata: caps.name("buildmetadata").map(|m| m.as_str().to_string()),
            is_valid_semver: true,
        };
    }

    let parts: Vec<&str> = s.split('.').collect();
    let component = |i: usize| {
        parts
            .get(i)
            .filter(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
            .and_then(|p| p.parse::<u64>().ok())
            .unwrap_or(0)
    };
    ParsedVersion {
        version_string: s.to_string(),
        major: component(0),
        minor: component(1),
        patch: component(2),
        pre_release: None,
        build_metadata: None,
        is_valid_semver: false,
    }
}

/// Order by major, minor, patch; a release ranks above its pre-releases and
/// pre-release tags compare lexically.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let (a, b) = (parse_version(a), parse_version(b));
    (a.major, a.minor, a.patch)
        .cmp(&(b.major, b.minor, b.patch))
        .then_with(|| match (&a.pre_release, &b.pre_release) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(x), Some(y)) => x.cmp(y),
        })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BumpKind {
    Major,
    Minor,
    Patch,
    Prerelease,
}

impl BumpKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BumpKind::Major => "major",
            BumpKind::Minor => "minor",
            BumpKind::Patch => "patch",
            BumpKind::Prerelease => "prerelease",
        }
    }
}

impl fmt::Display for BumpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BumpKind {
    type Err = UltrathinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "major" => Ok(BumpKind::Major),
            "minor" => Ok(BumpKind::Minor),
            "patch" => Ok(BumpKind::Patch),
            "prerelease" => Ok(BumpKind::Prerelease),
            other => Err(UltrathinkError::Value(format!("Unknown bump type: {other}"))),
        }
    }
}

/// Next version after `current` for a bump kind given as text.
pub fn next_version(current: &str, bump: &str) -> UltrathinkResult<String> {
    bump_version(current, bump.parse()?)
}

fn increment(component: u64, current: &str) -> UltrathinkResult<u64> {
    component.checked_add(1).ok_or_else(|| {
        UltrathinkError::Value(format!("Version component overflows when bumping {current}"))
    })
}

/// `current` bumped by one `bump` step. Fails when the bumped component is
/// already `u64::MAX`.
pub fn bump_version(current: &str, bump: BumpKind) -> UltrathinkResult<String> {
    let v = parse_version(current);
    Ok(match bump {
        BumpKind::Major => format!("{}.0.0", increment(v.major, current)?),
        BumpKind::Minor => format!("{}.{}.0", v.major, increment(v.minor, current)?),
        BumpKind::Patch => format!("{}.{}.{}", v.major, v.minor, increment(v.patch, current)?),
        BumpKind::Prerelease => match v.pre_release {
            Some(pre) => {
                let mut parts: Vec<String> = pre.split('.').map(str::to_string).collect();
                match parts.last().and_then(|p| p.parse::<u64>().ok()) {
                    Some(n) => {
                        let last = parts.len() - 1;
                        parts[last] = increment(n, current)?.to_string();
                    }
                    None => parts.push("1".to_string()),
                }
                format!("{}.{}.{}-{}", v.major, v.minor, v.patch, parts.join("."))
            }
            None => format!("{}.{}.{}-alpha.1", v.major, v.minor, v.patch),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_semver() {
        let v = parse_version("2.1.1");
        assert_eq!((v.major, v.minor, v.patch), (2, 1, 1));
        assert_eq!(v.pre_release, None);
        assert!(v.is_valid_semver);

        let pre = parse_version("3.0.0-alpha.1+build.7");
        assert_eq!(pre.pre_release.as_deref(), Some("alpha.1"));
        assert_eq!(pre.build_metadata.as_deref(), Some("build.7"));
    }

    #[test]
    fn test_parse_invalid_falls_back() {
        let v = parse_version("notasemver");
        assert!(!v.is_valid_semver);
        assert_eq!((v.major, v.minor, v.patch), (0, 0, 0));

        let partial = parse_version("4.x.2rc");
        assert_eq!((partial.major, partial.minor, partial.patch), (4, 0, 0));
    }

    #[test]
    fn test_ordering_ranks_release_over_prerelease() {
        assert_eq!(compare_versions("1.2.0", "1.10.0"), Ordering::Less);
        assert_eq!(compare_versions("2.0.0", "2.0.0-rc.1"), Ordering::Greater);
        assert_eq!(compare_versions("2.0.0-alpha", "2.0.0-beta"), Ordering::Less);
        assert_eq!(compare_versions("1.0.0", "1.0.0"), Ordering::Equal);
    }

    #[test]
    fn test_next_version_bumps() {
        assert_eq!(next_version("2.1.1", "major").unwrap(), "3.0.0");
        assert_eq!(next_version("2.1.1", "minor").unwrap(), "2.2.0");
        assert_eq!(next_version("2.1.1-rc.1", "patch").unwrap(), "2.1.2");
        assert_eq!(next_version("2.1.1-alpha.1", "prerelease").unwrap(), "2.1.1-alpha.2");
        assert_eq!(next_version("2.1.1-beta", "prerelease").unwrap(), "2.1.1-beta.1");
        assert_eq!(next_version("2.1.1", "prerelease").unwrap(), "2.1.1-alpha.1");
        assert!(matches!(
            next_version("2.1.1", "huge"),
            Err(UltrathinkError::Value(_))
        ));
    }

    #[test]
    fn test_bump_at_component_limit_is_an_error() {
        let max = u64::MAX;
        assert!(matches!(
            bump_version(&format!("{max}.0.0"), BumpKind::Major),
            Err(UltrathinkError::Value(_))
        ));
        assert!(bump_version(&format!("1.{max}.0"), BumpKind::Minor).is_err());
        assert!(bump_version(&format!("1.0.{max}"), BumpKind::Patch).is_err());
        assert!(bump_version(&format!("1.0.0-rc.{max}"), BumpKind::Prerelease).is_err());
        assert_eq!(
            bump_version(&format!("1.{max}.0"), BumpKind::Major).unwrap(),
            "2.0.0"
        );
    }
}
