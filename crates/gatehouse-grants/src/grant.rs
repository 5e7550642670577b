//! grant type definition

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use gatehouse_types::{CredentialContext, GrantItem, GrantSpec};

use crate::error::ParseError;
use crate::guard::{Guard, GuardType};
use crate::matcher;
use crate::record::GrantRecord;

/// a guard/policy pair plus metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    /// predicate over the request's credentials.
    pub guard: Guard,

    /// policy conferred when the guard matches.
    pub policy: String,

    /// when the grant was created; immutable.
    pub created_at: DateTime<Utc>,
}

impl Grant {
    /// create a grant stamped with the current time.
    pub fn new(guard: Guard, policy: impl Into<String>) -> Self {
        Self {
            guard,
            policy: policy.into(),
            created_at: Utc::now().trunc_subsecs(0),
        }
    }

    /// build and validate a grant from its wire shape.
    pub fn from_spec(spec: &GrantSpec) -> Result<Self, ParseError> {
        if spec.policy.is_empty() {
            return Err(ParseError::InvalidData(
                "policy cannot be empty".to_string(),
            ));
        }
        let guard_type: GuardType = spec.guard_type.parse()?;
        let guard = Guard::from_json(guard_type, &spec.guard_data)?;
        guard.validate()?;
        Ok(Self::new(guard, spec.policy.clone()))
    }

    /// decode a persisted record.
    ///
    /// unlike [`Grant::from_spec`] this does not reject empty patterns:
    /// whatever was stored is evaluated as stored. `created_at` is metadata
    /// only, so an unparsable timestamp reads as the unix epoch.
    pub fn from_record(record: &GrantRecord) -> Result<Self, ParseError> {
        let guard = Guard::from_stored(&record.guard_type, &record.guard_data)?;
        let created_at = match DateTime::parse_from_rfc3339(&record.created_at) {
            Ok(ts) => ts.with_timezone(&Utc),
            Err(e) => {
                tracing::warn!(
                    policy = %record.policy,
                    created_at = %record.created_at,
                    error = %e,
                    "unparsable grant timestamp"
                );
                DateTime::<Utc>::UNIX_EPOCH
            }
        };
        Ok(Self {
            guard,
            policy: record.policy.clone(),
            created_at,
        })
    }

    /// encode for persistence.
    pub fn to_record(&self) -> GrantRecord {
        GrantRecord {
            guard_type: self.guard_type().as_str().to_string(),
            guard_data: self.guard.to_bytes(),
            policy: self.policy.clone(),
            created_at: self.created_at_rfc3339(),
        }
    }

    /// the shape returned by the list endpoint.
    pub fn to_item(&self) -> GrantItem {
        GrantItem {
            guard_type: self.guard_type().as_str().to_string(),
            guard_data: self.guard.to_json(),
            policy: self.policy.clone(),
            created_at: self.created_at_rfc3339(),
        }
    }

    /// the guard's type tag.
    pub fn guard_type(&self) -> GuardType {
        self.guard.guard_type()
    }

    /// check this grant's guard against the request's credentials.
    pub fn matches(&self, ctx: &CredentialContext) -> bool {
        matcher::matches(&self.guard, ctx)
    }

    /// true if both grants confer the same policy under the same guard,
    /// ignoring creation time.
    pub fn same_rule(&self, other: &Grant) -> bool {
        self.policy == other.policy && self.guard == other.guard
    }

    fn created_at_rfc3339(&self) -> String {
        self.created_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    }
}
