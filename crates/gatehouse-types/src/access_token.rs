//! access token credentials recognised by the authentication layer.
//!
//! tokens are presented as `{id}:{secret}`. only the sha-256 hash of the
//! secret is kept in configuration; the id is what access-token guards match.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::Error;

/// length of a hex-encoded sha-256 digest.
const SECRET_HASH_HEX_LEN: usize = 64;

/// a configured access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenCredential {
    /// public identifier of the token, matched by access-token guards.
    pub id: String,

    /// hex-encoded sha-256 hash of the token secret.
    pub secret_hash: String,
}

impl AccessTokenCredential {
    /// create a credential from an id and a plaintext secret.
    pub fn from_secret(id: impl Into<String>, secret: &str) -> Self {
        Self {
            id: id.into(),
            secret_hash: hash_secret(secret),
        }
    }

    /// verify a presented secret against the stored hash in constant time.
    pub fn verify(&self, secret: &str) -> bool {
        let Ok(stored) = hex::decode(&self.secret_hash) else {
            return false;
        };
        let computed: [u8; 32] = Sha256::digest(secret.as_bytes()).into();
        computed.ct_eq(stored.as_slice()).into()
    }

    /// check the credential is usable.
    pub fn validate(&self) -> Result<(), Error> {
        if self.id.is_empty() {
            return Err(Error::InvalidCredential {
                id: self.id.clone(),
                reason: "id cannot be empty".to_string(),
            });
        }
        if self.id.contains(':') {
            return Err(Error::InvalidCredential {
                id: self.id.clone(),
                reason: "id cannot contain ':'".to_string(),
            });
        }
        if self.secret_hash.len() != SECRET_HASH_HEX_LEN || hex::decode(&self.secret_hash).is_err()
        {
            return Err(Error::InvalidCredential {
                id: self.id.clone(),
                reason: "secret_hash must be a hex-encoded sha-256 digest".to_string(),
            });
        }
        Ok(())
    }
}

/// hex-encoded sha-256 hash of a token secret.
pub fn hash_secret(secret: &str) -> String {
    hex::encode(Sha256::digest(secret.as_bytes()))
}

/// split a presented `{id}:{secret}` token into its parts.
///
/// returns `None` if there is no separator or either part is empty.
pub fn split_token(token: &str) -> Option<(&str, &str)> {
    let (id, secret) = token.split_once(':')?;
    if id.is_empty() || secret.is_empty() {
        return None;
    }
    Some((id, secret))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_correct_secret() {
        let cred = AccessTokenCredential::from_secret("tok123", "s3cret");
        assert!(cred.verify("s3cret"));
        assert!(!cred.verify("wrong"));
        assert!(!cred.verify(""));
    }

    #[test]
    fn test_verify_with_garbage_hash_fails() {
        let cred = AccessTokenCredential {
            id: "tok123".to_string(),
            secret_hash: "not-hex".to_string(),
        };
        assert!(!cred.verify("s3cret"));
    }

    #[test]
    fn test_validate() {
        assert!(
            AccessTokenCredential::from_secret("tok123", "s3cret")
                .validate()
                .is_ok()
        );
        assert!(
            AccessTokenCredential::from_secret("", "s3cret")
                .validate()
                .is_err()
        );
        assert!(
            AccessTokenCredential::from_secret("a:b", "s3cret")
                .validate()
                .is_err()
        );

        let short = AccessTokenCredential {
            id: "tok123".to_string(),
            secret_hash: "abcd".to_string(),
        };
        assert!(short.validate().is_err());
    }

    #[test]
    fn test_split_token() {
        assert_eq!(split_token("tok123:s3cret"), Some(("tok123", "s3cret")));
        assert_eq!(split_token("tok123:a:b"), Some(("tok123", "a:b")));
        assert_eq!(split_token("tok123"), None);
        assert_eq!(split_token(":s3cret"), None);
        assert_eq!(split_token("tok123:"), None);
    }
}
