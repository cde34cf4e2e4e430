//! Matching strategies applied per claimed candidate.

use crate::naming::Endpoint;
use crate::resolver::expression::Expression;
use std::collections::BTreeMap;

/// How a candidate's endpoints are selected once its coordinate fields
/// match the pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Every endpoint satisfying the filter, from every matching claim.
    All,
    /// The first endpoint satisfying the filter; the rest of the
    /// candidate is skipped. Short-circuits per candidate, not globally.
    Any,
}

impl Strategy {
    pub(crate) fn select(
        &self,
        expr: &Expression,
        endpoints: &BTreeMap<String, Endpoint>,
    ) -> Vec<Endpoint> {
        match self {
            Strategy::All => endpoints
                .values()
                .filter(|e| expr.endpoint_matches(e.name()))
                .cloned()
                .collect(),
            Strategy::Any => endpoints
                .values()
                .find(|e| expr.endpoint_matches(e.name()))
                .cloned()
                .into_iter()
                .collect(),
        }
    }
}
