//! Value encoding for stored entries.
//!
//! Every value is stored as its JSON text. Strings are therefore stored
//! quoted, which keeps the string `"1"` distinct from the number `1` when
//! the bytes are decoded again.

use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Error, Result};

/// Encodes a JSON value into its stored representation.
pub fn encode_value(value: &Value) -> Result<Bytes> {
    encode(value)
}

/// Decodes a stored representation back into a fresh JSON value.
pub fn decode_value(stored: &[u8]) -> Result<Value> {
    decode(stored)
}

/// Encodes any serializable type the same way [`encode_value`] does.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Bytes> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(|e| Error::Encoding(format!("failed to encode value: {}", e)))
}

/// Decodes a stored representation into any deserializable type.
pub fn decode<T: DeserializeOwned>(stored: &[u8]) -> Result<T> {
    serde_json::from_slice(stored)
        .map_err(|e| Error::Encoding(format!("failed to decode value: {}", e)))
}

/// Decodes a physical key, which must be UTF-8.
pub(crate) fn decode_key(key: &[u8]) -> Result<String> {
    std::str::from_utf8(key)
        .map(str::to_owned)
        .map_err(|e| Error::Encoding(format!("key is not valid UTF-8: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn should_store_strings_as_json_text() {
        // when
        let encoded = encode_value(&json!("Hello")).unwrap();

        // then
        assert_eq!(encoded, Bytes::from("\"Hello\""));
    }

    #[test]
    fn should_keep_numeric_strings_distinct_from_numbers() {
        // given
        let string = encode_value(&json!("1")).unwrap();
        let number = encode_value(&json!(1)).unwrap();

        // when / then
        assert_ne!(string, number);
        assert_eq!(decode_value(&string).unwrap(), json!("1"));
        assert_eq!(decode_value(&number).unwrap(), json!(1));
    }

    #[test]
    fn should_roundtrip_nested_values() {
        // given
        let value = json!({ "modified": false, "tags": ["a", "b"], "n": null });

        // when
        let decoded = decode_value(&encode_value(&value).unwrap()).unwrap();

        // then
        assert_eq!(decoded, value);
    }

    #[test]
    fn should_encode_null() {
        assert_eq!(encode_value(&Value::Null).unwrap(), Bytes::from("null"));
        assert_eq!(decode_value(b"null").unwrap(), Value::Null);
    }

    #[test]
    fn should_fail_on_corrupted_value() {
        // when
        let result = decode_value(b"{not json");

        // then
        assert!(matches!(result, Err(Error::Encoding(_))));
    }

    #[test]
    fn should_reject_non_utf8_keys() {
        assert!(matches!(decode_key(&[0x61, 0xFF]), Err(Error::Encoding(_))));
        assert_eq!(decode_key(b"ns/key").unwrap(), "ns/key");
    }
}
