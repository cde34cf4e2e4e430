//! Canonical store paths for coordinates.
//!
//! A coordinate (cell, user, service, instance) maps to
//! `{root}/{cell}/{user}/{service}/{instance}`, with the claim living at
//! `.../status` and configuration under `.../config`. The mapping is pure
//! string formatting; segment validity is enforced when the coordinate is
//! constructed.

use crate::common::{Error, Result};
use crate::naming::coordinate::{is_valid_segment, Coordinate};

const STATUS_NODE: &str = "status";
const CONFIG_NODE: &str = "config";

/// Builds store paths for coordinates under a fixed namespace root.
#[derive(Debug, Clone)]
pub struct PathCodec {
    root: String,
}

impl PathCodec {
    pub fn new(root: impl Into<String>) -> Self {
        let root = root.into();
        Self {
            root: root.trim_end_matches('/').to_string(),
        }
    }

    /// The namespace root all coordinates live under.
    pub fn namespace_root(&self) -> &str {
        &self.root
    }

    /// `{root}/{cell}/{user}/{service}/{instance}`
    pub fn root_path(&self, coordinate: &Coordinate) -> String {
        self.path_for(
            coordinate.cell(),
            coordinate.user(),
            coordinate.service(),
            coordinate.instance(),
        )
    }

    /// `{root}/{cell}/{user}/{service}/{instance}/status`
    pub fn status_path(&self, coordinate: &Coordinate) -> String {
        format!("{}/{}", self.root_path(coordinate), STATUS_NODE)
    }

    /// `{root}/{cell}/{user}/{service}/{instance}/config` or
    /// `.../config/{name}` when a named config node is given.
    pub fn config_path(&self, coordinate: &Coordinate, name: Option<&str>) -> Result<String> {
        let base = format!("{}/{}", self.root_path(coordinate), CONFIG_NODE);
        match name {
            None => Ok(base),
            Some(name) => {
                if !is_valid_segment(name) {
                    return Err(Error::InvalidCoordinate(format!(
                        "config name {:?} violates [a-z0-9][a-z0-9_-]*",
                        name
                    )));
                }
                Ok(format!("{}/{}", base, name))
            }
        }
    }

    /// `{root}/{cell}/{user}/{service}`
    pub fn path_without_instance(&self, cell: &str, user: &str, service: &str) -> String {
        format!("{}/{}/{}/{}", self.root, cell, user, service)
    }

    /// `{root}/{cell}/{user}/{service}/{instance}`
    pub fn path_for(&self, cell: &str, user: &str, service: &str, instance: u32) -> String {
        format!("{}/{}/{}/{}/{}", self.root, cell, user, service, instance)
    }

    /// Recover the coordinate from a root, status or config path.
    pub fn parse(&self, path: &str) -> Result<Coordinate> {
        let rest = path
            .strip_prefix(&self.root)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| {
                Error::InvalidCoordinate(format!("path {:?} is outside {}", path, self.root))
            })?;
        let segments: Vec<&str> = rest.split('/').collect();
        let tail_ok = match segments.len() {
            4 => true,
            5 => segments[4] == STATUS_NODE || segments[4] == CONFIG_NODE,
            6 => segments[4] == CONFIG_NODE,
            _ => false,
        };
        if !tail_ok {
            return Err(Error::InvalidCoordinate(format!(
                "path {:?} is not a coordinate path",
                path
            )));
        }
        let instance: u32 = segments[3]
            .parse()
            .map_err(|_| Error::InvalidCoordinate(format!("bad instance in path {:?}", path)))?;
        Coordinate::new(instance, segments[2], segments[1], segments[0])
    }
}
