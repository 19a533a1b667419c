use serde::Serialize;
use sha2::{Digest, Sha256};

use super::error::DomainError;
use super::payload::Payload;

pub const EVENT_TYPE: &str = "com.kinesis.ingester";
pub const EVENT_SOURCE: &str = "/cloudevents/kinesis/record";
pub const SPEC_VERSION: &str = "1.0";
pub const DATA_CONTENT_TYPE: &str = "application/json";
pub const STRUCTURED_CONTENT_TYPE: &str = "application/cloudevents+json; charset=utf-8";

/// Envelope attributes shared by every event the process emits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventAttributes {
    pub event_type: String,
    pub source: String,
}

impl EventAttributes {
    pub fn new(event_type: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            source: source.into(),
        }
    }
}

impl Default for EventAttributes {
    fn default() -> Self {
        Self::new(EVENT_TYPE, EVENT_SOURCE)
    }
}

/// CloudEvents 1.0 envelope around a forwarded payload
///
/// The `id` is a SHA-256 digest of the attributes and data, so building the
/// same event twice yields identical bytes on the wire. Two stream records
/// with identical bodies therefore share an `id`, and a sink that dedupes on
/// `source` + `id` keeps only the first of them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CloudEvent {
    specversion: &'static str,
    id: String,
    source: String,
    #[serde(rename = "type")]
    event_type: String,
    datacontenttype: &'static str,
    data: Payload,
}

impl CloudEvent {
    pub fn new(attributes: &EventAttributes, data: Payload) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(attributes.event_type.as_bytes());
        hasher.update([0u8]);
        hasher.update(attributes.source.as_bytes());
        hasher.update([0u8]);
        hasher.update(data.as_value().to_string().as_bytes());

        Self {
            specversion: SPEC_VERSION,
            id: format!("{:x}", hasher.finalize()),
            source: attributes.source.clone(),
            event_type: attributes.event_type.clone(),
            datacontenttype: DATA_CONTENT_TYPE,
            data,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Encode in structured content mode: the whole envelope is the body
    pub fn to_structured(&self) -> Result<StructuredEvent, DomainError> {
        let body = serde_json::to_vec(self).map_err(|e| DomainError::Encode(e.to_string()))?;

        Ok(StructuredEvent {
            headers: vec![(
                "content-type".to_string(),
                STRUCTURED_CONTENT_TYPE.to_string(),
            )],
            body,
        })
    }
}

/// Headers and body ready to be POSTed to a sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredEvent {
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl StructuredEvent {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Classification, PayloadFilter};
    use proptest::prelude::*;
    use serde_json::{Value, json};

    fn payload(value: Value) -> Payload {
        match PayloadFilter::default().classify_value(value).unwrap() {
            Classification::Forward(payload) => payload,
            Classification::Empty => panic!("Expected Forward"),
        }
    }

    #[test]
    fn structured_body_carries_attributes_and_data() {
        let event = CloudEvent::new(
            &EventAttributes::default(),
            payload(json!({"FaceSearchResponse": [{"id": 1}]})),
        );
        let structured = event.to_structured().unwrap();
        let body: Value = serde_json::from_slice(&structured.body).unwrap();

        assert_eq!(body["specversion"], "1.0");
        assert_eq!(body["type"], "com.kinesis.ingester");
        assert_eq!(body["source"], "/cloudevents/kinesis/record");
        assert_eq!(body["datacontenttype"], "application/json");
        assert_eq!(body["id"], event.id());
        assert_eq!(body["data"], json!({"FaceSearchResponse": [{"id": 1}]}));
        assert_eq!(
            structured.header("Content-Type"),
            Some("application/cloudevents+json; charset=utf-8")
        );
    }

    #[test]
    fn id_depends_on_data_and_attributes() {
        let attributes = EventAttributes::default();
        let a = CloudEvent::new(&attributes, payload(json!({"FaceSearchResponse": [1]})));
        let b = CloudEvent::new(&attributes, payload(json!({"FaceSearchResponse": [2]})));
        let c = CloudEvent::new(
            &EventAttributes::new("com.example.other", EVENT_SOURCE),
            payload(json!({"FaceSearchResponse": [1]})),
        );

        assert_eq!(a.id().len(), 64);
        assert_ne!(a.id(), b.id());
        assert_ne!(a.id(), c.id());
    }

    #[test]
    fn identical_bodies_share_an_id() {
        let attributes = EventAttributes::default();
        let body = json!({"FaceSearchResponse": [{"id": 1}]});
        let first = CloudEvent::new(&attributes, payload(body.clone()));
        let second = CloudEvent::new(&attributes, payload(body));

        assert_eq!(first.id(), second.id());
    }

    #[test]
    fn missing_header_lookup_returns_none() {
        let event = CloudEvent::new(
            &EventAttributes::default(),
            payload(json!({"FaceSearchResponse": [1]})),
        );
        assert_eq!(event.to_structured().unwrap().header("ce-id"), None);
    }

    proptest! {
        #[test]
        fn encoding_is_byte_identical_on_rebuild(ids in proptest::collection::vec(any::<u32>(), 1..6), label in "[a-z]{0,12}") {
            let value = json!({ "FaceSearchResponse": ids, "label": label });
            let attributes = EventAttributes::default();

            let first = CloudEvent::new(&attributes, payload(value.clone())).to_structured().unwrap();
            let second = CloudEvent::new(&attributes, payload(value)).to_structured().unwrap();

            prop_assert_eq!(first, second);
        }
    }
}
