//! Stored credential records and their decoding into [`KeyMaterial`].
//!
//! A record is a DynamoDB item keyed by (`name`, `version`):
//!
//! | attribute  | encoding                                             |
//! |------------|------------------------------------------------------|
//! | `name`     | string                                               |
//! | `version`  | string, zero-padded decimal so it sorts correctly    |
//! | `digest`   | string, optional, defaults to `SHA256`               |
//! | `hmac`     | hex string, or (older writers) binary holding hex    |
//! | `key`      | base64 string of the KMS-wrapped key material        |
//! | `contents` | base64 string of the AES-CTR ciphertext              |

use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{CredstashError, Result};
use crate::types::{KeyMaterial, DEFAULT_DIGEST};

pub const NAME_FIELD: &str = "name";
pub const VERSION_FIELD: &str = "version";
pub const DIGEST_FIELD: &str = "digest";
pub const HMAC_FIELD: &str = "hmac";
pub const KEY_FIELD: &str = "key";
pub const CONTENTS_FIELD: &str = "contents";

/// A single attribute value, serialized in DynamoDB JSON form
/// (`{"S": "..."}`, `{"B": "<base64>"}`, `{"N": "..."}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeValue {
    S(String),
    B(#[serde(with = "base64_bytes")] Vec<u8>),
    N(String),
}

impl AttributeValue {
    pub fn as_s(&self) -> Option<&str> {
        match self {
            AttributeValue::S(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_b(&self) -> Option<&[u8]> {
        match self {
            AttributeValue::B(b) => Some(b.as_slice()),
            _ => None,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::S(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::S(s)
    }
}

/// Raw item as returned by the store.
pub type StoredRecord = HashMap<String, AttributeValue>;

/// Decode a raw record into [`KeyMaterial`].
///
/// Pure: performs no I/O and does not touch KMS. Every required field is
/// checked here, so a malformed record fails before any remote call.
///
/// # Errors
/// * `MissingField` if `name`, `version`, `hmac`, `key` or `contents` is absent
/// * `UnexpectedType` if a field is present with the wrong attribute type
/// * `InvalidHex` / `InvalidBase64` for undecodable values
pub fn key_material_from_record(record: &StoredRecord) -> Result<KeyMaterial> {
    let digest = get_digest(record)?;
    let name = get_string(record, NAME_FIELD)?.to_string();
    let version = get_string(record, VERSION_FIELD)?.to_string();
    let hmac = get_hmac(record)?;
    let key = get_base64(record, KEY_FIELD)?;
    let content = get_base64(record, CONTENTS_FIELD)?;

    Ok(KeyMaterial {
        name,
        version,
        digest,
        content,
        hmac,
        key,
    })
}

/// Digest name of the record; records that predate the attribute use SHA256.
pub fn get_digest(record: &StoredRecord) -> Result<String> {
    match record.get(DIGEST_FIELD) {
        None => Ok(DEFAULT_DIGEST.to_string()),
        Some(value) => value
            .as_s()
            .map(str::to_string)
            .ok_or(CredstashError::UnexpectedType {
                field: DIGEST_FIELD,
                expected: "string",
            }),
    }
}

fn get_string<'a>(record: &'a StoredRecord, field: &'static str) -> Result<&'a str> {
    record
        .get(field)
        .ok_or(CredstashError::MissingField { field })?
        .as_s()
        .ok_or(CredstashError::UnexpectedType {
            field,
            expected: "string",
        })
}

fn get_base64(record: &StoredRecord, field: &'static str) -> Result<Vec<u8>> {
    let s = get_string(record, field)?;
    STANDARD
        .decode(s)
        .map_err(|source| CredstashError::InvalidBase64 { field, source })
}

// ============================================================================
// HMAC — two historical encodings
// ============================================================================

fn get_hmac(record: &StoredRecord) -> Result<Vec<u8>> {
    let value = record
        .get(HMAC_FIELD)
        .ok_or(CredstashError::MissingField { field: HMAC_FIELD })?;
    match value {
        AttributeValue::S(_) | AttributeValue::B(_) => {
            or_if_empty(hmac_from_text(value), || hmac_from_binary(value))
        }
        AttributeValue::N(_) => Err(CredstashError::UnexpectedType {
            field: HMAC_FIELD,
            expected: "string or binary",
        }),
    }
}

/// Hex string attribute (current writers).
fn hmac_from_text(value: &AttributeValue) -> Result<Vec<u8>> {
    match value.as_s() {
        Some(s) => hex::decode(s).map_err(|source| CredstashError::InvalidHex {
            field: HMAC_FIELD,
            source,
        }),
        None => Ok(Vec::new()),
    }
}

/// Binary attribute whose bytes are hex text (older writers).
fn hmac_from_binary(value: &AttributeValue) -> Result<Vec<u8>> {
    match value.as_b() {
        Some(b) => hex::decode(b).map_err(|source| CredstashError::InvalidHex {
            field: HMAC_FIELD,
            source,
        }),
        None => Ok(Vec::new()),
    }
}

/// Take `primary` unless it decoded to nothing, then try `fallback`.
fn or_if_empty(
    primary: Result<Vec<u8>>,
    fallback: impl FnOnce() -> Result<Vec<u8>>,
) -> Result<Vec<u8>> {
    let bytes = primary?;
    if bytes.is_empty() {
        fallback()
    } else {
        Ok(bytes)
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b64(data: &[u8]) -> AttributeValue {
        AttributeValue::S(STANDARD.encode(data))
    }

    fn item_with_all_fields() -> StoredRecord {
        let mut item = StoredRecord::new();
        item.insert("name".into(), "test_key".into());
        item.insert("version".into(), "0000000000000000001".into());
        item.insert("digest".into(), "SHA256".into());
        item.insert("hmac".into(), "01020304".into());
        item.insert("contents".into(), b64(&[1, 2, 3, 4]));
        item.insert("key".into(), b64(&[1, 2, 3, 4]));
        item
    }

    #[test]
    fn decodes_all_fields() {
        let km = key_material_from_record(&item_with_all_fields()).unwrap();
        assert_eq!(
            km,
            KeyMaterial {
                name: "test_key".into(),
                version: "0000000000000000001".into(),
                digest: "SHA256".into(),
                content: vec![1, 2, 3, 4],
                hmac: vec![1, 2, 3, 4],
                key: vec![1, 2, 3, 4],
            }
        );
    }

    #[test]
    fn digest_defaults_to_sha256() {
        assert_eq!(get_digest(&StoredRecord::new()).unwrap(), "SHA256");

        let mut item = item_with_all_fields();
        item.remove("digest");
        let km = key_material_from_record(&item).unwrap();
        assert_eq!(km.digest, "SHA256");
    }

    #[test]
    fn digest_used_verbatim() {
        let mut item = StoredRecord::new();
        item.insert("digest".into(), "SHA512".into());
        assert_eq!(get_digest(&item).unwrap(), "SHA512");
    }

    #[test]
    fn hmac_binary_encoding_matches_text_encoding() {
        let text = item_with_all_fields();
        let mut binary = item_with_all_fields();
        binary.insert("hmac".into(), AttributeValue::B(b"01020304".to_vec()));

        let from_text = key_material_from_record(&text).unwrap();
        let from_binary = key_material_from_record(&binary).unwrap();
        assert_eq!(from_text.hmac, vec![1, 2, 3, 4]);
        assert_eq!(from_binary.hmac, vec![1, 2, 3, 4]);
        assert_eq!(from_text, from_binary);
    }

    #[test]
    fn empty_text_hmac_decodes_empty() {
        let mut item = item_with_all_fields();
        item.insert("hmac".into(), "".into());
        let km = key_material_from_record(&item).unwrap();
        assert!(km.hmac.is_empty());
    }

    #[test]
    fn invalid_hex_hmac_fails() {
        let mut item = item_with_all_fields();
        item.insert("hmac".into(), "zz".into());
        let err = key_material_from_record(&item).unwrap_err();
        assert!(matches!(
            err,
            CredstashError::InvalidHex { field: "hmac", .. }
        ));

        item.insert("hmac".into(), AttributeValue::B(b"not hex".to_vec()));
        assert!(key_material_from_record(&item).is_err());
    }

    #[test]
    fn numeric_hmac_fails() {
        let mut item = item_with_all_fields();
        item.insert("hmac".into(), AttributeValue::N("1234".into()));
        let err = key_material_from_record(&item).unwrap_err();
        assert!(matches!(
            err,
            CredstashError::UnexpectedType { field: "hmac", .. }
        ));
    }

    #[test]
    fn missing_key_field_fails() {
        let mut item = item_with_all_fields();
        item.remove("key");
        let err = key_material_from_record(&item).unwrap_err();
        assert!(matches!(err, CredstashError::MissingField { field: "key" }));
        assert_eq!(err.to_string(), "Missing key: key");
    }

    #[test]
    fn wrong_key_field_fails() {
        let mut item = item_with_all_fields();
        item.insert("key".into(), "not base64!".into());
        let err = key_material_from_record(&item).unwrap_err();
        assert!(matches!(
            err,
            CredstashError::InvalidBase64 { field: "key", .. }
        ));
    }

    #[test]
    fn invalid_contents_fails() {
        let mut item = item_with_all_fields();
        item.insert("contents".into(), "@@@".into());
        let err = key_material_from_record(&item).unwrap_err();
        assert!(matches!(
            err,
            CredstashError::InvalidBase64 {
                field: "contents",
                ..
            }
        ));
    }

    #[test]
    fn missing_required_fields_fail() {
        for field in ["name", "version", "hmac", "key", "contents"] {
            let mut item = item_with_all_fields();
            item.remove(field);
            let err = key_material_from_record(&item).unwrap_err();
            assert!(
                matches!(err, CredstashError::MissingField { field: f } if f == field),
                "expected missing {field}, got {err}"
            );
        }
    }

    #[test]
    fn binary_name_is_rejected() {
        let mut item = item_with_all_fields();
        item.insert("name".into(), AttributeValue::B(b"test_key".to_vec()));
        let err = key_material_from_record(&item).unwrap_err();
        assert!(matches!(
            err,
            CredstashError::UnexpectedType { field: "name", .. }
        ));
    }

    #[test]
    fn parses_dynamodb_json_item() {
        let json = r#"{
            "name": {"S": "test_key"},
            "version": {"S": "0000000000000000001"},
            "hmac": {"B": "MDEwMjAzMDQ="},
            "contents": {"S": "AQIDBA=="},
            "key": {"S": "AQIDBA=="}
        }"#;
        let item: StoredRecord = serde_json::from_str(json).unwrap();
        assert_eq!(item["hmac"], AttributeValue::B(b"01020304".to_vec()));

        let km = key_material_from_record(&item).unwrap();
        assert_eq!(
            km,
            key_material_from_record(&item_with_all_fields()).unwrap()
        );
    }
}
