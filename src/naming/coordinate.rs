//! Coordinates identify one instance of one service owned by one user in
//! one cell. They are immutable and validated on construction.

use crate::common::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Grammar for a single coordinate segment (cell, user, service and
/// endpoint names all share it): lowercase alphanumeric plus dash and
/// underscore, never empty, never a path separator.
static SEGMENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9_-]*$").unwrap());

static COORDINATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9]+)\.([a-z0-9][a-z0-9_-]*)\.([a-z0-9][a-z0-9_-]*)\.([a-z0-9][a-z0-9_-]*)$")
        .unwrap()
});

/// Is `segment` a valid coordinate segment?
pub(crate) fn is_valid_segment(segment: &str) -> bool {
    SEGMENT_RE.is_match(segment)
}

/// A service coordinate: (cell, user, service, instance).
///
/// Canonical string form is `instance.service.user.cell`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coordinate {
    cell: String,
    user: String,
    service: String,
    instance: u32,
}

impl Coordinate {
    /// Create a validated coordinate.
    pub fn new(instance: u32, service: &str, user: &str, cell: &str) -> Result<Self> {
        for (field, value) in [("service", service), ("user", user), ("cell", cell)] {
            if !is_valid_segment(value) {
                return Err(Error::InvalidCoordinate(format!(
                    "{} segment {:?} violates [a-z0-9][a-z0-9_-]*",
                    field, value
                )));
            }
        }
        Ok(Self::new_unchecked(instance, service, user, cell))
    }

    /// Create a coordinate without validating the segments. Paths built
    /// from an unchecked coordinate with bad segments will not resolve.
    pub fn new_unchecked(instance: u32, service: &str, user: &str, cell: &str) -> Self {
        Self {
            cell: cell.to_string(),
            user: user.to_string(),
            service: service.to_string(),
            instance,
        }
    }

    /// Parse the canonical form `instance.service.user.cell`.
    pub fn parse(s: &str) -> Result<Self> {
        let caps = COORDINATE_RE
            .captures(s)
            .ok_or_else(|| Error::InvalidCoordinate(s.to_string()))?;
        let instance: u32 = caps[1]
            .parse()
            .map_err(|_| Error::InvalidCoordinate(format!("instance out of range in {:?}", s)))?;
        Ok(Self::new_unchecked(instance, &caps[2], &caps[3], &caps[4]))
    }

    pub fn cell(&self) -> &str {
        &self.cell
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn instance(&self) -> u32 {
        self.instance
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.instance, self.service, self.user, self.cell
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_coordinate() {
        let c = Coordinate::new(42, "service", "user", "cell").unwrap();
        assert_eq!(c.instance(), 42);
        assert_eq!(c.service(), "service");
        assert_eq!(c.user(), "user");
        assert_eq!(c.cell(), "cell");
        assert_eq!(c.to_string(), "42.service.user.cell");
    }

    #[test]
    fn test_parse_round_trip() {
        let c = Coordinate::new(7, "web-frontend", "ops", "dc1").unwrap();
        let parsed = Coordinate::parse(&c.to_string()).unwrap();
        assert_eq!(parsed, c);
    }

    #[test]
    fn test_rejects_bad_segments() {
        assert!(matches!(
            Coordinate::new(1, "has/slash", "user", "cell"),
            Err(Error::InvalidCoordinate(_))
        ));
        assert!(Coordinate::new(1, "", "user", "cell").is_err());
        assert!(Coordinate::new(1, "Upper", "user", "cell").is_err());
        assert!(Coordinate::new(1, "svc", "user", "cell.dots").is_err());
    }

    #[test]
    fn test_unchecked_skips_validation() {
        let c = Coordinate::new_unchecked(1, "Any/Thing", "user", "cell");
        assert_eq!(c.service(), "Any/Thing");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(Coordinate::parse("service.user.cell").is_err());
        assert!(Coordinate::parse("x.service.user.cell").is_err());
        assert!(Coordinate::parse("1.service.user").is_err());
        assert!(Coordinate::parse("").is_err());
        assert!(Coordinate::parse("99999999999.service.user.cell").is_err());
    }
}
