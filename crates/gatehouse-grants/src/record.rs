//! persisted grant list format.
//!
//! each policy's grants are stored as one CBOR-encoded [`GrantList`]. the
//! guard payload stays as raw json bytes so a single bad payload can be
//! skipped without losing the rest of the list.

use minicbor::{Decode, Encode};

/// one grant as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
#[cbor(map)]
pub struct GrantRecord {
    /// guard type tag.
    #[n(1)]
    pub guard_type: String,

    /// raw guard payload (json), schema keyed by `guard_type`.
    #[n(2)]
    #[cbor(with = "minicbor::bytes")]
    pub guard_data: Vec<u8>,

    /// policy conferred by the grant.
    #[n(3)]
    pub policy: String,

    /// creation time (rfc3339).
    #[n(4)]
    pub created_at: String,
}

/// all grants stored under one policy key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Encode, Decode)]
#[cbor(map)]
pub struct GrantList {
    /// grant records in insertion order.
    #[n(1)]
    pub grants: Vec<GrantRecord>,
}

impl GrantList {
    /// encode to CBOR bytes.
    pub fn to_cbor(&self) -> Result<Vec<u8>, String> {
        minicbor::to_vec(self).map_err(|e| e.to_string())
    }

    /// decode from CBOR bytes.
    pub fn from_cbor(bytes: &[u8]) -> Result<Self, String> {
        minicbor::decode(bytes).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(guard_type: &str, data: &[u8], policy: &str) -> GrantRecord {
        GrantRecord {
            guard_type: guard_type.to_string(),
            guard_data: data.to_vec(),
            policy: policy.to_string(),
            created_at: "2026-10-19T12:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_list_cbor_roundtrip() {
        let list = GrantList {
            grants: vec![
                record("access_token", br#"{"id":"tok123"}"#, "client-readwrite"),
                record("any", b"", "client-readwrite"),
            ],
        };
        let bytes = list.to_cbor().unwrap();
        assert_eq!(GrantList::from_cbor(&bytes).unwrap(), list);
    }

    #[test]
    fn test_empty_list_roundtrip() {
        let bytes = GrantList::default().to_cbor().unwrap();
        assert!(GrantList::from_cbor(&bytes).unwrap().grants.is_empty());
    }

    #[test]
    fn test_garbage_fails_to_decode() {
        assert!(GrantList::from_cbor(b"definitely not cbor").is_err());
        assert!(GrantList::from_cbor(b"").is_err());
    }

    #[test]
    fn test_bad_guard_data_survives_list_decoding() {
        // payload validity is not the list decoder's concern
        let list = GrantList {
            grants: vec![record("access_token", b"{broken", "network")],
        };
        let bytes = list.to_cbor().unwrap();
        let decoded = GrantList::from_cbor(&bytes).unwrap();
        assert_eq!(decoded.grants[0].guard_data, b"{broken");
    }
}
