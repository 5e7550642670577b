//! x.509 subject name patterns.
//!
//! a pattern is a partial subject name. single-valued attributes match when
//! the pattern is empty or equal; multi-valued attributes match when the
//! pattern is an ordered prefix of the subject's values, so `o=["Acme"]`
//! matches `o=["Acme", "Eng"]` but not `o=["Eng", "Acme"]`.
//!
//! on the wire a pattern is a json object of attributes, either flat or
//! nested under a `subject` key. attribute keys are matched ignoring case
//! and underscores, and the usual short forms (`CN`, `O`, `OU`, ...) are
//! accepted.

use std::collections::HashSet;

use gatehouse_types::CertSubject;
use serde_json::{Map, Value};

use crate::error::ParseError;

/// partial subject name that certificates are matched against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct X509Pattern {
    /// exact common name, or empty for any.
    pub common_name: String,
    /// exact subject serial number, or empty for any.
    pub serial_number: String,
    /// required prefix of the subject's countries.
    pub country: Vec<String>,
    /// required prefix of the subject's organizations.
    pub organization: Vec<String>,
    /// required prefix of the subject's organizational units.
    pub organizational_unit: Vec<String>,
    /// required prefix of the subject's localities.
    pub locality: Vec<String>,
    /// required prefix of the subject's provinces.
    pub province: Vec<String>,
    /// required prefix of the subject's street addresses.
    pub street_address: Vec<String>,
    /// required prefix of the subject's postal codes.
    pub postal_code: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Attribute {
    CommonName,
    SerialNumber,
    Country,
    Organization,
    OrganizationalUnit,
    Locality,
    Province,
    StreetAddress,
    PostalCode,
}

impl Attribute {
    fn lookup(key: &str) -> Option<Self> {
        let folded: String = key
            .chars()
            .filter(|c| *c != '_')
            .flat_map(char::to_lowercase)
            .collect();
        let attr = match folded.as_str() {
            "commonname" | "cn" => Self::CommonName,
            "serialnumber" => Self::SerialNumber,
            "country" | "c" => Self::Country,
            "organization" | "o" => Self::Organization,
            "organizationalunit" | "ou" => Self::OrganizationalUnit,
            "locality" | "l" => Self::Locality,
            "province" | "st" | "stateorprovince" => Self::Province,
            "streetaddress" | "street" => Self::StreetAddress,
            "postalcode" => Self::PostalCode,
            _ => return None,
        };
        Some(attr)
    }

    /// canonical key used when writing a pattern back out.
    fn canonical_name(self) -> &'static str {
        match self {
            Self::CommonName => "commonName",
            Self::SerialNumber => "serialNumber",
            Self::Country => "country",
            Self::Organization => "organization",
            Self::OrganizationalUnit => "organizationalUnit",
            Self::Locality => "locality",
            Self::Province => "province",
            Self::StreetAddress => "streetAddress",
            Self::PostalCode => "postalCode",
        }
    }
}

impl X509Pattern {
    /// parse a pattern from its json form (flat or nested under `subject`).
    pub fn from_json(data: &Value) -> Result<Self, ParseError> {
        let Value::Object(map) = data else {
            return Err(ParseError::InvalidData(
                "x509 guard data must be an object".to_string(),
            ));
        };

        let subject = map
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("subject"));
        match subject {
            Some(_) if map.len() > 1 => Err(ParseError::AmbiguousSubject),
            Some((_, Value::Object(inner))) => Self::from_attributes(inner),
            Some((key, _)) => Err(ParseError::InvalidAttribute {
                name: key.clone(),
                reason: "expected an object".to_string(),
            }),
            None => Self::from_attributes(map),
        }
    }

    fn from_attributes(map: &Map<String, Value>) -> Result<Self, ParseError> {
        let mut pattern = Self::default();
        let mut seen = HashSet::new();

        for (key, value) in map {
            let attr =
                Attribute::lookup(key).ok_or_else(|| ParseError::UnknownAttribute(key.clone()))?;
            if !seen.insert(attr) {
                return Err(ParseError::InvalidAttribute {
                    name: key.clone(),
                    reason: "attribute given more than once".to_string(),
                });
            }

            match attr {
                Attribute::CommonName => pattern.common_name = single_value(key, value)?,
                Attribute::SerialNumber => pattern.serial_number = single_value(key, value)?,
                Attribute::Country => pattern.country = multi_value(key, value)?,
                Attribute::Organization => pattern.organization = multi_value(key, value)?,
                Attribute::OrganizationalUnit => {
                    pattern.organizational_unit = multi_value(key, value)?
                }
                Attribute::Locality => pattern.locality = multi_value(key, value)?,
                Attribute::Province => pattern.province = multi_value(key, value)?,
                Attribute::StreetAddress => pattern.street_address = multi_value(key, value)?,
                Attribute::PostalCode => pattern.postal_code = multi_value(key, value)?,
            }
        }

        Ok(pattern)
    }

    /// canonical json form: `{"subject": {...}}` with empty attributes omitted.
    pub fn to_json(&self) -> Value {
        let mut subject = Map::new();
        let mut put_single = |attr: Attribute, value: &str| {
            if !value.is_empty() {
                subject.insert(attr.canonical_name().to_string(), Value::from(value));
            }
        };
        put_single(Attribute::CommonName, &self.common_name);
        put_single(Attribute::SerialNumber, &self.serial_number);

        for (attr, values) in [
            (Attribute::Country, &self.country),
            (Attribute::Organization, &self.organization),
            (Attribute::OrganizationalUnit, &self.organizational_unit),
            (Attribute::Locality, &self.locality),
            (Attribute::Province, &self.province),
            (Attribute::StreetAddress, &self.street_address),
            (Attribute::PostalCode, &self.postal_code),
        ] {
            if !values.is_empty() {
                subject.insert(attr.canonical_name().to_string(), Value::from(values.clone()));
            }
        }

        let mut root = Map::new();
        root.insert("subject".to_string(), Value::Object(subject));
        Value::Object(root)
    }

    /// true if the pattern constrains no attribute.
    pub fn is_empty(&self) -> bool {
        self.common_name.is_empty()
            && self.serial_number.is_empty()
            && self.country.is_empty()
            && self.organization.is_empty()
            && self.organizational_unit.is_empty()
            && self.locality.is_empty()
            && self.province.is_empty()
            && self.street_address.is_empty()
            && self.postal_code.is_empty()
    }

    /// check a certificate subject against this pattern.
    pub fn matches(&self, subject: &CertSubject) -> bool {
        matches_string(&self.common_name, &subject.common_name)
            && matches_string(&self.serial_number, &subject.serial_number)
            && matches_strings(&self.country, &subject.country)
            && matches_strings(&self.organization, &subject.organization)
            && matches_strings(&self.organizational_unit, &subject.organizational_unit)
            && matches_strings(&self.locality, &subject.locality)
            && matches_strings(&self.province, &subject.province)
            && matches_strings(&self.street_address, &subject.street_address)
            && matches_strings(&self.postal_code, &subject.postal_code)
    }
}

fn matches_string(pattern: &str, value: &str) -> bool {
    pattern.is_empty() || pattern == value
}

fn matches_strings(pattern: &[String], values: &[String]) -> bool {
    values.len() >= pattern.len() && pattern.iter().zip(values).all(|(p, v)| p == v)
}

fn single_value(key: &str, value: &Value) -> Result<String, ParseError> {
    match value {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s.clone()),
        _ => Err(ParseError::InvalidAttribute {
            name: key.to_string(),
            reason: "expected a string".to_string(),
        }),
    }
}

fn multi_value(key: &str, value: &Value) -> Result<Vec<String>, ParseError> {
    let invalid = || ParseError::InvalidAttribute {
        name: key.to_string(),
        reason: "expected a string or an array of strings".to_string(),
    };
    match value {
        Value::Null => Ok(Vec::new()),
        Value::String(s) => Ok(vec![s.clone()]),
        Value::Array(items) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string).ok_or_else(invalid))
            .collect(),
        _ => Err(invalid()),
    }
}
