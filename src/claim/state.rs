//! Claim lifecycle for a single coordinate.
//!
//! A [`ClaimState`] starts empty and is consumed either by `claim()`
//! (exclusive ownership, read-write) or by `load()` (a point-in-time
//! read-only snapshot). Every mutation is a conditional write guarded by
//! the version observed at claim time or at the last successful write; a
//! stale version means someone else touched the record and the write is
//! rejected, never merged.

use crate::claim::record;
use crate::common::{Error, Result};
use crate::naming::{Coordinate, Endpoint, PathCodec, ServiceStatus};
use crate::session::SessionKeeper;
use crate::store::{CreateMode, Version};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Empty,
    Loaded,
    Claimed,
    Released,
}

pub struct ClaimState {
    keeper: SessionKeeper,
    coordinate: Coordinate,
    status_path: String,
    lifecycle: Lifecycle,
    version: Version,
    status: ServiceStatus,
    endpoints: BTreeMap<String, Endpoint>,
}

impl ClaimState {
    pub fn new(keeper: SessionKeeper, codec: &PathCodec, coordinate: Coordinate) -> Self {
        let status_path = codec.status_path(&coordinate);
        Self {
            keeper,
            coordinate,
            status_path,
            lifecycle: Lifecycle::Empty,
            version: 0,
            status: ServiceStatus::default(),
            endpoints: BTreeMap::new(),
        }
    }

    pub fn coordinate(&self) -> &Coordinate {
        &self.coordinate
    }

    /// Claim the coordinate by exclusively creating its status node,
    /// ephemeral to the session, holding the default record.
    pub async fn claim(&mut self) -> Result<()> {
        if self.lifecycle != Lifecycle::Empty {
            return Err(Error::InvalidState(
                "already used for claim or load, create a new instance".to_string(),
            ));
        }
        let session = self.keeper.current()?;
        let payload = record::encode(&self.status, &self.endpoints)?;
        match session
            .create(&self.status_path, payload, CreateMode::Ephemeral)
            .await
        {
            Ok(()) => {}
            Err(Error::NodeExists(_)) => {
                tracing::info!("coordinate already claimed ({})", self.status_path);
                return Err(Error::AlreadyClaimed(self.coordinate.to_string()));
            }
            Err(Error::NodeNotFound(_)) => {
                tracing::info!("coordinate does not exist ({})", self.status_path);
                return Err(Error::CoordinateNotFound(self.coordinate.to_string()));
            }
            Err(e) => return Err(e),
        }

        // Pick up the store-assigned version; all later writes are
        // conditioned on it.
        let (_, version) = session.read(&self.status_path).await?;
        self.version = version;
        self.lifecycle = Lifecycle::Claimed;
        tracing::info!("claimed {} ({})", self.coordinate, self.status_path);
        Ok(())
    }

    /// Read the claim record someone else published. The result is a
    /// snapshot; it is not refreshed.
    pub async fn load(&mut self) -> Result<()> {
        if self.lifecycle != Lifecycle::Empty {
            return Err(Error::InvalidState(
                "already used for claim or load, create a new instance".to_string(),
            ));
        }
        let session = self.keeper.current()?;
        let (payload, version) = match session.read(&self.status_path).await {
            Ok(read) => read,
            Err(Error::NodeNotFound(_)) => {
                return Err(Error::CoordinateNotFound(self.coordinate.to_string()))
            }
            Err(e) => return Err(e),
        };
        let (status, endpoints) = record::decode(&self.status_path, &payload)?;
        self.status = status;
        self.endpoints = endpoints;
        self.version = version;
        self.lifecycle = Lifecycle::Loaded;
        Ok(())
    }

    pub fn status(&self) -> Result<&ServiceStatus> {
        if self.lifecycle == Lifecycle::Empty {
            return Err(Error::InvalidState(
                "nothing known about this coordinate yet".to_string(),
            ));
        }
        Ok(&self.status)
    }

    pub fn endpoint(&self, name: &str) -> Result<Option<&Endpoint>> {
        if self.lifecycle == Lifecycle::Empty {
            return Err(Error::InvalidState(
                "nothing known about this coordinate yet".to_string(),
            ));
        }
        Ok(self.endpoints.get(name))
    }

    pub fn endpoints(&self) -> Result<Vec<&Endpoint>> {
        if self.lifecycle == Lifecycle::Empty {
            return Err(Error::InvalidState(
                "nothing known about this coordinate yet".to_string(),
            ));
        }
        Ok(self.endpoints.values().collect())
    }

    pub async fn update_status(&mut self, status: ServiceStatus) -> Result<()> {
        self.ensure_claimed()?;
        let version = self.write_record(&status, &self.endpoints).await?;
        self.status = status;
        self.version = version;
        Ok(())
    }

    /// Publish endpoints. All names must be new; a duplicate fails the
    /// whole call and writes nothing.
    pub async fn put_endpoints(&mut self, endpoints: Vec<Endpoint>) -> Result<()> {
        self.ensure_claimed()?;
        let mut next = self.endpoints.clone();
        for endpoint in endpoints {
            if next.contains_key(endpoint.name()) {
                tracing::info!("endpoint already exists: {}", endpoint.name());
                return Err(Error::EndpointExists(endpoint.name().to_string()));
            }
            next.insert(endpoint.name().to_string(), endpoint);
        }
        let version = self.write_record(&self.status, &next).await?;
        self.endpoints = next;
        self.version = version;
        Ok(())
    }

    /// Withdraw endpoints. All names must exist; a missing one fails the
    /// whole call and writes nothing.
    pub async fn remove_endpoints(&mut self, names: &[String]) -> Result<()> {
        self.ensure_claimed()?;
        let mut next = self.endpoints.clone();
        for name in names {
            if next.remove(name).is_none() {
                tracing::info!("endpoint does not exist: {}", name);
                return Err(Error::EndpointDoesNotExist(name.clone()));
            }
        }
        let version = self.write_record(&self.status, &next).await?;
        self.endpoints = next;
        self.version = version;
        Ok(())
    }

    /// Delete the claim node, freeing the coordinate for others. The
    /// node is ephemeral and would go away with the session anyway, but
    /// explicit release keeps a process holding several claims honest.
    pub async fn release(&mut self) -> Result<()> {
        self.ensure_claimed()?;
        let session = self.keeper.current()?;
        match session.delete(&self.status_path, self.version).await {
            Ok(()) => {}
            Err(Error::NodeNotFound(_)) => {
                return Err(Error::CoordinateNotFound(self.coordinate.to_string()))
            }
            Err(e) => return Err(e),
        }
        self.lifecycle = Lifecycle::Released;
        tracing::info!("released claim on {}", self.coordinate);
        Ok(())
    }

    fn ensure_claimed(&self) -> Result<()> {
        match self.lifecycle {
            Lifecycle::Claimed => Ok(()),
            Lifecycle::Empty => Err(Error::InvalidState(
                "this instance did not claim the coordinate".to_string(),
            )),
            Lifecycle::Loaded => Err(Error::InvalidState(
                "loaded snapshots are read-only".to_string(),
            )),
            Lifecycle::Released => Err(Error::InvalidState(
                "the claim has been released".to_string(),
            )),
        }
    }

    async fn write_record(
        &self,
        status: &ServiceStatus,
        endpoints: &BTreeMap<String, Endpoint>,
    ) -> Result<Version> {
        let session = self.keeper.current()?;
        let payload = record::encode(status, endpoints)?;
        match session.write(&self.status_path, payload, self.version).await {
            Ok(version) => Ok(version),
            Err(Error::NodeNotFound(_)) => {
                Err(Error::CoordinateNotFound(self.coordinate.to_string()))
            }
            Err(e) => Err(e),
        }
    }
}
