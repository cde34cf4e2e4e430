//! Strategy-based resolution of coordinate patterns to endpoints.
//!
//! Resolution is read-only: it enumerates the subtree the pattern's
//! literal fields pin down, reads each candidate's claim record and
//! applies the strategy. Claims appearing or vanishing while the walk is
//! in flight are tolerated: a candidate that disappears is omitted, not
//! an error.

pub(crate) mod expression;
pub mod strategy;

pub use strategy::Strategy;

use crate::claim::record;
use crate::common::{Error, Result};
use crate::naming::{Coordinate, Endpoint, PathCodec};
use crate::resolver::expression::{Expression, FieldPattern};
use crate::session::SessionKeeper;
use crate::store::StoreSession;
use std::sync::Arc;

/// An endpoint together with the coordinate that published it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEndpoint {
    pub coordinate: Coordinate,
    pub endpoint: Endpoint,
}

pub struct Resolver {
    keeper: SessionKeeper,
    codec: PathCodec,
}

impl Resolver {
    pub(crate) fn new(keeper: SessionKeeper, codec: PathCodec) -> Self {
        Self { keeper, codec }
    }

    /// Resolve a pattern expression to the endpoints of matching claims,
    /// ordered by coordinate and endpoint name.
    pub async fn resolve(&self, expression: &str) -> Result<Vec<ResolvedEndpoint>> {
        let expr = Expression::parse(expression)?;
        let session = self.keeper.current()?;
        let root = self.codec.namespace_root();

        let mut resolved = Vec::new();
        for cell in matching_children(&session, root, &expr.cell).await? {
            let cell_path = format!("{}/{}", root, cell);
            for user in matching_children(&session, &cell_path, &expr.user).await? {
                let user_path = format!("{}/{}", cell_path, user);
                for service in matching_children(&session, &user_path, &expr.service).await? {
                    let service_path = format!("{}/{}", user_path, service);
                    for name in matching_children(&session, &service_path, &FieldPattern::Any)
                        .await?
                    {
                        let Ok(instance) = name.parse::<u32>() else {
                            continue;
                        };
                        if !expr.instance.matches(instance) {
                            continue;
                        }
                        let coordinate =
                            Coordinate::new_unchecked(instance, &service, &user, &cell);
                        self.collect_candidate(&session, &expr, coordinate, &mut resolved)
                            .await?;
                    }
                }
            }
        }

        resolved.sort_by(|a, b| {
            a.coordinate
                .cmp(&b.coordinate)
                .then_with(|| a.endpoint.name().cmp(b.endpoint.name()))
        });
        Ok(resolved)
    }

    async fn collect_candidate(
        &self,
        session: &Arc<dyn StoreSession>,
        expr: &Expression,
        coordinate: Coordinate,
        resolved: &mut Vec<ResolvedEndpoint>,
    ) -> Result<()> {
        let status_path = self.codec.status_path(&coordinate);
        let (payload, _) = match session.read(&status_path).await {
            Ok(read) => read,
            // Unclaimed, or released while we were walking.
            Err(Error::NodeNotFound(_)) => return Ok(()),
            Err(e) => return Err(e),
        };
        let (_, endpoints) = match record::decode(&status_path, &payload) {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::warn!("skipping unparsable claim record: {}", e);
                return Ok(());
            }
        };
        for endpoint in expr.strategy.select(expr, &endpoints) {
            resolved.push(ResolvedEndpoint {
                coordinate: coordinate.clone(),
                endpoint,
            });
        }
        Ok(())
    }
}

async fn matching_children(
    session: &Arc<dyn StoreSession>,
    path: &str,
    pattern: &FieldPattern,
) -> Result<Vec<String>> {
    match session.children(path).await {
        Ok(children) => Ok(children
            .into_iter()
            .filter(|child| pattern.matches(child))
            .collect()),
        // Nothing registered under this branch (yet, or anymore).
        Err(Error::NodeNotFound(_)) => Ok(Vec::new()),
        Err(e) => Err(e),
    }
}
