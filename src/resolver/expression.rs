//! Resolver expression grammar.
//!
//! Expressions are dot-separated and mirror the canonical coordinate
//! form, optionally led by an endpoint name:
//!
//! ```text
//! 42.service.user.cell              exact instance
//! any.service.user.cell             first matching endpoint per instance
//! all.service.user.cell             every endpoint of every instance
//! http.42.service.user.cell         named endpoint of one instance
//! http.any.service.user.cell        named endpoint across instances
//! ```
//!
//! `service`, `user` and `cell` accept `*` as a per-field wildcard, and
//! `*` in the instance position is shorthand for `all`.

use crate::common::{Error, Result};
use crate::naming::coordinate::is_valid_segment;
use crate::resolver::strategy::Strategy;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FieldPattern {
    Any,
    Literal(String),
}

impl FieldPattern {
    fn parse(token: &str, expr: &str) -> Result<Self> {
        if token == "*" {
            Ok(FieldPattern::Any)
        } else if is_valid_segment(token) {
            Ok(FieldPattern::Literal(token.to_string()))
        } else {
            Err(Error::InvalidResolverExpression(expr.to_string()))
        }
    }

    pub(crate) fn matches(&self, value: &str) -> bool {
        match self {
            FieldPattern::Any => true,
            FieldPattern::Literal(want) => want == value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InstancePattern {
    Exact(u32),
    Any,
}

impl InstancePattern {
    pub(crate) fn matches(&self, instance: u32) -> bool {
        match self {
            InstancePattern::Exact(want) => *want == instance,
            InstancePattern::Any => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Expression {
    pub(crate) endpoint: Option<String>,
    pub(crate) strategy: Strategy,
    pub(crate) instance: InstancePattern,
    pub(crate) service: FieldPattern,
    pub(crate) user: FieldPattern,
    pub(crate) cell: FieldPattern,
}

impl Expression {
    pub(crate) fn parse(expr: &str) -> Result<Self> {
        let tokens: Vec<&str> = expr.split('.').collect();
        let (endpoint, rest) = match tokens.len() {
            4 => (None, &tokens[..]),
            5 => {
                if !is_valid_segment(tokens[0]) {
                    return Err(Error::InvalidResolverExpression(expr.to_string()));
                }
                (Some(tokens[0].to_string()), &tokens[1..])
            }
            _ => return Err(Error::InvalidResolverExpression(expr.to_string())),
        };
        let (strategy, instance) = parse_instance_token(rest[0], expr)?;
        Ok(Self {
            endpoint,
            strategy,
            instance,
            service: FieldPattern::parse(rest[1], expr)?,
            user: FieldPattern::parse(rest[2], expr)?,
            cell: FieldPattern::parse(rest[3], expr)?,
        })
    }

    /// Does an endpoint name satisfy the (optional) endpoint filter?
    pub(crate) fn endpoint_matches(&self, name: &str) -> bool {
        match &self.endpoint {
            None => true,
            Some(want) => want == name,
        }
    }
}

fn parse_instance_token(token: &str, expr: &str) -> Result<(Strategy, InstancePattern)> {
    if !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()) {
        let instance: u32 = token
            .parse()
            .map_err(|_| Error::InvalidResolverExpression(expr.to_string()))?;
        return Ok((Strategy::All, InstancePattern::Exact(instance)));
    }
    match token {
        "any" => Ok((Strategy::Any, InstancePattern::Any)),
        "all" | "*" => Ok((Strategy::All, InstancePattern::Any)),
        _ => Err(Error::InvalidResolverExpression(expr.to_string())),
    }
}
