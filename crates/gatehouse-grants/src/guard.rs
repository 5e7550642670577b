//! guard types: predicates over a request's credentials.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ParseError;
use crate::x509::X509Pattern;

/// guard type tag, as stored and sent on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardType {
    /// matches a specific access token id.
    AccessToken,
    /// matches client certificates against a subject pattern.
    X509,
    /// matches loopback connections.
    Localhost,
    /// matches every request.
    Any,
}

impl GuardType {
    /// the wire tag.
    pub fn as_str(self) -> &'static str {
        match self {
            GuardType::AccessToken => "access_token",
            GuardType::X509 => "x509",
            GuardType::Localhost => "localhost",
            GuardType::Any => "any",
        }
    }
}

impl fmt::Display for GuardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GuardType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "access_token" => Ok(GuardType::AccessToken),
            "x509" => Ok(GuardType::X509),
            "localhost" => Ok(GuardType::Localhost),
            "any" => Ok(GuardType::Any),
            other => Err(ParseError::UnknownGuardType(other.to_string())),
        }
    }
}

/// a guard with its type-specific payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guard {
    /// exact match on the access token id.
    AccessToken {
        /// token id to match.
        id: String,
    },
    /// match if any presented certificate satisfies the pattern.
    X509(X509Pattern),
    /// match loopback connections.
    Localhost,
    /// match unconditionally.
    Any,
}

/// the token id from an access-token payload.
///
/// the `id` key is matched case-insensitively; an exact `id` wins over
/// other spellings.
fn access_token_id(data: &Value) -> Result<String, ParseError> {
    let Value::Object(map) = data else {
        return Err(ParseError::InvalidData(format!(
            "access token guard data must be an object, got {data}"
        )));
    };
    let entry = map
        .get_key_value("id")
        .or_else(|| map.iter().find(|(key, _)| key.eq_ignore_ascii_case("id")));
    match entry {
        Some((_, Value::String(id))) => Ok(id.clone()),
        Some((key, other)) => Err(ParseError::InvalidData(format!(
            "access token {key} must be a string, got {other}"
        ))),
        None => Err(ParseError::InvalidData("missing field `id`".to_string())),
    }
}

impl Guard {
    /// the type tag of this guard.
    pub fn guard_type(&self) -> GuardType {
        match self {
            Guard::AccessToken { .. } => GuardType::AccessToken,
            Guard::X509(_) => GuardType::X509,
            Guard::Localhost => GuardType::Localhost,
            Guard::Any => GuardType::Any,
        }
    }

    /// build a guard from a type tag and json payload.
    ///
    /// this only checks shape; see [`Guard::validate`] for the stricter
    /// checks applied to newly created grants.
    pub fn from_json(guard_type: GuardType, data: &Value) -> Result<Self, ParseError> {
        match guard_type {
            GuardType::AccessToken => Ok(Guard::AccessToken {
                id: access_token_id(data)?,
            }),
            GuardType::X509 => Ok(Guard::X509(X509Pattern::from_json(data)?)),
            GuardType::Localhost | GuardType::Any => {
                if is_empty_payload(data) {
                    Ok(if guard_type == GuardType::Any {
                        Guard::Any
                    } else {
                        Guard::Localhost
                    })
                } else {
                    Err(ParseError::UnexpectedData(guard_type))
                }
            }
        }
    }

    /// build a guard from a stored tag and raw json bytes.
    ///
    /// an empty byte slice stands for no payload.
    pub fn from_stored(guard_type: &str, data: &[u8]) -> Result<Self, ParseError> {
        let guard_type: GuardType = guard_type.parse()?;
        let data = if data.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(data).map_err(|e| ParseError::InvalidData(e.to_string()))?
        };
        Self::from_json(guard_type, &data)
    }

    /// reject guards that could never match or would match too broadly.
    pub fn validate(&self) -> Result<(), ParseError> {
        match self {
            Guard::AccessToken { id } if id.is_empty() => Err(ParseError::EmptyTokenId),
            Guard::X509(pattern) if pattern.is_empty() => Err(ParseError::EmptyPattern),
            _ => Ok(()),
        }
    }

    /// canonical json payload for this guard.
    pub fn to_json(&self) -> Value {
        match self {
            Guard::AccessToken { id } => {
                let mut map = Map::new();
                map.insert("id".to_string(), Value::from(id.as_str()));
                Value::Object(map)
            }
            Guard::X509(pattern) => pattern.to_json(),
            Guard::Localhost | Guard::Any => Value::Null,
        }
    }

    /// canonical payload bytes as persisted in a grant record.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self.to_json() {
            Value::Null => Vec::new(),
            value => value.to_string().into_bytes(),
        }
    }
}

fn is_empty_payload(data: &Value) -> bool {
    match data {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}
