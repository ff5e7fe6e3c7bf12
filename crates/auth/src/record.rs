use serde::{Deserialize, Serialize};

type JsonMap = serde_json::Map<String, serde_json::Value>;

/// The singleton persisted session document.
///
/// The schema is additive-only: every field defaults to empty when absent
/// from the stored JSON, and sub-documents we do not model explicitly are
/// captured in `extra` so a newer sidecar never loses material when an
/// older record is loaded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionRecord {
    /// Opaque authentication material (identity, registration, noise keys).
    pub creds: JsonMap,
    /// Key id → key material.
    pub keys: JsonMap,
    /// Any additional protocol sub-documents, kept verbatim.
    #[serde(flatten)]
    pub extra: JsonMap,
}

impl SessionRecord {
    /// Whether the record carries any credentials at all. An unregistered
    /// record means the sidecar will have to go through the QR pairing flow.
    #[must_use]
    pub fn is_registered(&self) -> bool {
        !self.creds.is_empty()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, serde_json::json};

    #[test]
    fn missing_fields_load_as_empty() {
        let rec: SessionRecord = serde_json::from_str(r#"{"creds": {"noise_key": "abc"}}"#).unwrap();
        assert_eq!(rec.creds["noise_key"], "abc");
        assert!(rec.keys.is_empty());
        assert!(rec.extra.is_empty());
    }

    #[test]
    fn unknown_sub_documents_survive_a_round_trip() {
        let rec: SessionRecord = serde_json::from_value(json!({
            "creds": {},
            "keys": {"pre-key-1": "k"},
            "app_state_sync": {"version": 7}
        }))
        .unwrap();
        assert_eq!(rec.extra["app_state_sync"]["version"], 7);

        let back = serde_json::to_value(&rec).unwrap();
        assert_eq!(back["app_state_sync"]["version"], 7);
        assert_eq!(back["keys"]["pre-key-1"], "k");
    }

    #[test]
    fn registration_is_driven_by_creds() {
        assert!(!SessionRecord::default().is_registered());

        let rec: SessionRecord =
            serde_json::from_str(r#"{"creds": {"me": {"id": "x"}}}"#).unwrap();
        assert!(rec.is_registered());
    }
}
