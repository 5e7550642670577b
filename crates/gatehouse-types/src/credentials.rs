//! credential facts about the current request.
//!
//! a [`CredentialContext`] is produced by the authentication layer after tls
//! termination and token verification. it is read-only and lives for exactly
//! one request.

use serde::{Deserialize, Serialize};

/// subject name of a validated x.509 client certificate.
///
/// multi-valued attributes keep the order in which they appear in the
/// certificate, since guard matching is an ordered prefix comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CertSubject {
    /// common name (cn).
    pub common_name: String,
    /// serial number attribute of the subject (not the certificate serial).
    pub serial_number: String,
    /// country (c).
    pub country: Vec<String>,
    /// organization (o).
    pub organization: Vec<String>,
    /// organizational unit (ou).
    pub organizational_unit: Vec<String>,
    /// locality (l).
    pub locality: Vec<String>,
    /// state or province (st).
    pub province: Vec<String>,
    /// street address.
    pub street_address: Vec<String>,
    /// postal code.
    pub postal_code: Vec<String>,
}

impl CertSubject {
    /// create a subject with only a common name set.
    pub fn with_common_name(cn: impl Into<String>) -> Self {
        Self {
            common_name: cn.into(),
            ..Default::default()
        }
    }
}

/// authenticated facts about one request.
///
/// an empty context (no token, no certificates, remote peer) is valid and
/// represents an unauthenticated caller.
#[derive(Debug, Clone, Default)]
pub struct CredentialContext {
    token_id: Option<String>,
    cert_subjects: Vec<CertSubject>,
    loopback: bool,
}

impl CredentialContext {
    /// a context carrying no credentials at all.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// set the verified access token id.
    ///
    /// an empty id is treated as no token.
    pub fn with_token_id(mut self, id: impl Into<String>) -> Self {
        let id = id.into();
        self.token_id = if id.is_empty() { None } else { Some(id) };
        self
    }

    /// add a validated certificate subject.
    pub fn with_cert_subject(mut self, subject: CertSubject) -> Self {
        self.cert_subjects.push(subject);
        self
    }

    /// add several validated certificate subjects.
    pub fn with_cert_subjects(mut self, subjects: impl IntoIterator<Item = CertSubject>) -> Self {
        self.cert_subjects.extend(subjects);
        self
    }

    /// mark whether the request arrived over a loopback connection.
    pub fn with_loopback(mut self, loopback: bool) -> Self {
        self.loopback = loopback;
        self
    }

    /// the verified access token id, if one was presented.
    pub fn token_id(&self) -> Option<&str> {
        self.token_id.as_deref()
    }

    /// subjects of every validated client certificate.
    pub fn cert_subjects(&self) -> &[CertSubject] {
        &self.cert_subjects
    }

    /// whether the peer connected over loopback.
    pub fn is_loopback(&self) -> bool {
        self.loopback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_context_is_empty() {
        let ctx = CredentialContext::anonymous();
        assert_eq!(ctx.token_id(), None);
        assert!(ctx.cert_subjects().is_empty());
        assert!(!ctx.is_loopback());
    }

    #[test]
    fn test_empty_token_id_is_no_token() {
        let ctx = CredentialContext::anonymous().with_token_id("");
        assert_eq!(ctx.token_id(), None);

        let ctx = CredentialContext::anonymous().with_token_id("tok123");
        assert_eq!(ctx.token_id(), Some("tok123"));
    }

    #[test]
    fn test_cert_subject_deserializes_camel_case() {
        let json = r#"{"commonName": "node-1", "organization": ["Acme", "Eng"]}"#;
        let subject: CertSubject = serde_json::from_str(json).unwrap();
        assert_eq!(subject.common_name, "node-1");
        assert_eq!(subject.organization, vec!["Acme", "Eng"]);
        assert!(subject.country.is_empty());
    }
}
