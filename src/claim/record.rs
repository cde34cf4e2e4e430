//! The persisted claim record.
//!
//! Wire form is one JSON object: `{"status": "<json-string>",
//! "endpoints": {name: endpoint}}`. The status is sub-serialized into a
//! JSON string so the whole record stays a single opaque unit to the
//! store, and the endpoints map is ordered so encoding is deterministic.

use crate::common::{Error, Result};
use crate::naming::{Endpoint, ServiceStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Serialize, Deserialize)]
struct WireRecord {
    status: String,
    endpoints: BTreeMap<String, Endpoint>,
}

pub(crate) fn encode(
    status: &ServiceStatus,
    endpoints: &BTreeMap<String, Endpoint>,
) -> Result<Vec<u8>> {
    let wire = WireRecord {
        status: status.to_json()?,
        endpoints: endpoints.clone(),
    };
    serde_json::to_vec(&wire).map_err(|e| Error::Store(format!("serialize claim record: {}", e)))
}

pub(crate) fn decode(
    path: &str,
    payload: &[u8],
) -> Result<(ServiceStatus, BTreeMap<String, Endpoint>)> {
    let wire: WireRecord = serde_json::from_slice(payload).map_err(|e| Error::CorruptRecord {
        path: path.to_string(),
        reason: e.to_string(),
    })?;
    let status = ServiceStatus::from_json(&wire.status).map_err(|e| Error::CorruptRecord {
        path: path.to_string(),
        reason: e.to_string(),
    })?;
    Ok((status, wire.endpoints))
}
