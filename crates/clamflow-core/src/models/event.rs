//! "Object created" notification model.
//!
//! Two broker payload shapes carry the same per-record structure:
//!
//! - a flat notification object: `{"Records":[{"s3":{...}}], ...}`
//! - a list of wrappers, each holding an `"event"` array of records:
//!   `[{"event":[{"s3":{...}}]}]`
//!
//! Field names are accepted in both capitalised and lowercase spellings.

use percent_encoding::percent_decode_str;
use serde::Deserialize;

use crate::error::{ErrorClass, ErrorMetadata};

#[derive(Debug, thiserror::Error)]
pub enum EventDecodeError {
    #[error("Malformed event payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Event record has no bucket name")]
    MissingBucket,

    #[error("Event record has no object key")]
    MissingKey,

    #[error("Invalid object key encoding {key:?}: {reason}")]
    InvalidKeyEncoding { key: String, reason: String },
}

impl ErrorMetadata for EventDecodeError {
    fn error_class(&self) -> ErrorClass {
        ErrorClass::DecodeError
    }

    fn error_code(&self) -> &'static str {
        match self {
            EventDecodeError::Malformed(_) => "EVENT_MALFORMED",
            EventDecodeError::MissingBucket => "EVENT_MISSING_BUCKET",
            EventDecodeError::MissingKey => "EVENT_MISSING_KEY",
            EventDecodeError::InvalidKeyEncoding { .. } => "EVENT_INVALID_KEY_ENCODING",
        }
    }
}

/// Flat notification shape delivered by the queue consumer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct S3EventNotification {
    #[serde(rename = "EventName", alias = "eventName", default)]
    pub event_name: Option<String>,
    #[serde(rename = "Records", alias = "records", default)]
    pub records: Vec<EventRecord>,
}

/// Wrapper object of the list consumer payload (`[{"event":[...]}]`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListNotification {
    #[serde(rename = "event", alias = "Event", default)]
    pub event: Vec<EventRecord>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventRecord {
    #[serde(default)]
    pub s3: S3Entity,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct S3Entity {
    #[serde(default)]
    pub bucket: BucketEntity,
    #[serde(default)]
    pub object: ObjectEntity,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BucketEntity {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ObjectEntity {
    #[serde(default)]
    pub key: String,
}

impl EventRecord {
    /// Validate the record and turn it into an [`ObjectCreatedEvent`].
    pub fn to_event(&self) -> Result<ObjectCreatedEvent, EventDecodeError> {
        ObjectCreatedEvent::new(&self.s3.bucket.name, &self.s3.object.key)
    }
}

/// Decode the flat `{"Records":[...]}` payload.
pub fn decode_records_payload(payload: &[u8]) -> Result<S3EventNotification, EventDecodeError> {
    Ok(serde_json::from_slice(payload)?)
}

/// Decode the nested `[{"event":[...]}]` payload.
pub fn decode_list_payload(payload: &[u8]) -> Result<Vec<ListNotification>, EventDecodeError> {
    Ok(serde_json::from_slice(payload)?)
}

/// One "object was created" fact.
///
/// Immutable once constructed. The key is kept in its transport encoding;
/// [`ObjectCreatedEvent::decoded_key`] yields the key used against storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectCreatedEvent {
    bucket: String,
    encoded_key: String,
}

impl ObjectCreatedEvent {
    pub fn new(bucket: &str, encoded_key: &str) -> Result<Self, EventDecodeError> {
        if bucket.is_empty() {
            return Err(EventDecodeError::MissingBucket);
        }
        if encoded_key.is_empty() {
            return Err(EventDecodeError::MissingKey);
        }
        Ok(Self {
            bucket: bucket.to_string(),
            encoded_key: encoded_key.to_string(),
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Object key exactly as it arrived on the wire.
    pub fn encoded_key(&self) -> &str {
        &self.encoded_key
    }

    /// Object key with form-style unescaping applied (`+` is a space, `%XX` a byte).
    pub fn decoded_key(&self) -> Result<String, EventDecodeError> {
        unescape_key(&self.encoded_key)
    }
}

fn unescape_key(encoded: &str) -> Result<String, EventDecodeError> {
    let bytes = encoded.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let well_formed = bytes.get(i + 1).is_some_and(u8::is_ascii_hexdigit)
                && bytes.get(i + 2).is_some_and(u8::is_ascii_hexdigit);
            if !well_formed {
                return Err(EventDecodeError::InvalidKeyEncoding {
                    key: encoded.to_string(),
                    reason: format!("invalid escape at byte {}", i),
                });
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    let spaced = encoded.replace('+', " ");
    let decoded = percent_decode_str(&spaced)
        .decode_utf8()
        .map_err(|e| EventDecodeError::InvalidKeyEncoding {
            key: encoded.to_string(),
            reason: e.to_string(),
        })?;

    if decoded.is_empty() {
        return Err(EventDecodeError::MissingKey);
    }
    Ok(decoded.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_payload_yields_decoded_event() {
        let payload =
            br#"{"Records":[{"s3":{"bucket":{"name":"b1"},"object":{"key":"a%2Fb.txt"}}}]}"#;
        let notification = decode_records_payload(payload).unwrap();
        assert_eq!(notification.records.len(), 1);

        let event = notification.records[0].to_event().unwrap();
        assert_eq!(event.bucket(), "b1");
        assert_eq!(event.encoded_key(), "a%2Fb.txt");
        assert_eq!(event.decoded_key().unwrap(), "a/b.txt");
    }

    #[test]
    fn flat_payload_keeps_event_name_and_ignores_unknown_fields() {
        let payload = br#"{
            "EventName":"s3:ObjectCreated:Put",
            "Key":"staging/x.txt",
            "Records":[{"eventVersion":"2.0","s3":{"bucket":{"name":"staging","arn":"x"},"object":{"key":"x.txt","size":3}}}]
        }"#;
        let notification = decode_records_payload(payload).unwrap();
        assert_eq!(
            notification.event_name.as_deref(),
            Some("s3:ObjectCreated:Put")
        );
        assert_eq!(notification.records[0].to_event().unwrap().bucket(), "staging");
    }

    #[test]
    fn list_payload_accepts_both_spellings() {
        let lower = br#"[{"event":[{"s3":{"bucket":{"name":"b1"},"object":{"key":"x.txt"}}}]}]"#;
        let upper = br#"[{"Event":[{"s3":{"bucket":{"name":"b1"},"object":{"key":"x.txt"}}}]}]"#;

        for payload in [&lower[..], &upper[..]] {
            let wrappers = decode_list_payload(payload).unwrap();
            assert_eq!(wrappers.len(), 1);
            let event = wrappers[0].event[0].to_event().unwrap();
            assert_eq!(event, ObjectCreatedEvent::new("b1", "x.txt").unwrap());
        }
    }

    #[test]
    fn malformed_payload_is_decode_error() {
        let err = decode_records_payload(b"not json").unwrap_err();
        assert!(matches!(err, EventDecodeError::Malformed(_)));
        assert_eq!(err.error_class(), ErrorClass::DecodeError);

        // The list shape is an array; a flat object does not decode as one.
        assert!(decode_list_payload(br#"{"Records":[]}"#).is_err());
    }

    #[test]
    fn record_without_bucket_or_key_is_rejected() {
        let payload = br#"{"Records":[{"s3":{"object":{"key":"x"}}},{"s3":{"bucket":{"name":"b"}}}]}"#;
        let notification = decode_records_payload(payload).unwrap();
        assert!(matches!(
            notification.records[0].to_event(),
            Err(EventDecodeError::MissingBucket)
        ));
        assert!(matches!(
            notification.records[1].to_event(),
            Err(EventDecodeError::MissingKey)
        ));
    }

    #[test]
    fn plus_decodes_to_space_and_escaped_plus_survives() {
        let event = ObjectCreatedEvent::new("b", "my+report%2B2024.pdf").unwrap();
        assert_eq!(event.decoded_key().unwrap(), "my report+2024.pdf");
    }

    #[test]
    fn malformed_escapes_are_rejected() {
        for key in ["bad%zz", "trailing%", "short%4"] {
            let event = ObjectCreatedEvent::new("b", key).unwrap();
            assert!(
                matches!(
                    event.decoded_key(),
                    Err(EventDecodeError::InvalidKeyEncoding { .. })
                ),
                "{key} should be rejected"
            );
        }
    }

    #[test]
    fn non_utf8_escape_is_rejected() {
        let event = ObjectCreatedEvent::new("b", "%FF%FE").unwrap();
        assert!(event.decoded_key().is_err());
    }
}
