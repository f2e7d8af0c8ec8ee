//! The cross-context message contract.
//!
//! Requests are JSON objects tagged by `type`; responses always carry
//! `success`, plus `data`, `timestamp`, or `error` depending on the request.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::annotations::{Annotation, AnnotationKind, DomainCounts, ExportBundle};
use crate::badge::BadgeUpdate;
use crate::error::MessageError;
use crate::tracking::log::InteractionFilter;
use crate::tracking::settings::Settings;
use crate::tracking::stats::ActivityStats;
use crate::tracking::types::{InteractionKind, InteractionRecord, SummaryRecord};

/// Every `type` the background understands.
pub const MESSAGE_TYPES: &[&str] = &[
    "user_interaction",
    "updateCounts",
    "getCounts",
    "exportData",
    "clearData",
    "addAnnotation",
    "removeAnnotation",
    "getHighlights",
    "queryInteractions",
    "getSummaries",
    "getSettings",
    "saveSettings",
    "getStats",
    "tabActivated",
    "tabUpdated",
];

/// The browser tab a message came from, or that an event is about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TabInfo {
    pub id: Option<i64>,
    pub url: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    #[serde(rename = "user_interaction")]
    UserInteraction {
        action: InteractionKind,
        #[serde(default)]
        data: Value,
    },
    #[serde(rename = "updateCounts")]
    UpdateCounts { data: BadgeUpdate },
    #[serde(rename = "getCounts")]
    GetCounts {
        #[serde(default)]
        domain: Option<String>,
    },
    #[serde(rename = "exportData")]
    ExportData {
        #[serde(default)]
        domain: Option<String>,
    },
    #[serde(rename = "clearData")]
    ClearData {
        #[serde(rename = "dataType")]
        data_type: AnnotationKind,
        #[serde(default)]
        domain: Option<String>,
    },
    #[serde(rename = "addAnnotation")]
    AddAnnotation { kind: AnnotationKind, item: Annotation },
    #[serde(rename = "removeAnnotation")]
    RemoveAnnotation { kind: AnnotationKind, id: String },
    #[serde(rename = "getHighlights")]
    GetHighlights { url: String },
    #[serde(rename = "queryInteractions")]
    QueryInteractions {
        #[serde(default)]
        filters: InteractionFilter,
    },
    #[serde(rename = "getSummaries")]
    GetSummaries {
        #[serde(default)]
        limit: Option<usize>,
    },
    #[serde(rename = "getSettings")]
    GetSettings,
    #[serde(rename = "saveSettings")]
    SaveSettings { settings: Settings },
    #[serde(rename = "getStats")]
    GetStats,
    #[serde(rename = "tabActivated")]
    TabActivated { tab: TabInfo },
    #[serde(rename = "tabUpdated")]
    TabUpdated {
        tab: TabInfo,
        #[serde(default)]
        status: Option<String>,
    },
}

impl Message {
    /// The wire `type`.
    pub fn name(&self) -> &'static str {
        match self {
            Self::UserInteraction { .. } => "user_interaction",
            Self::UpdateCounts { .. } => "updateCounts",
            Self::GetCounts { .. } => "getCounts",
            Self::ExportData { .. } => "exportData",
            Self::ClearData { .. } => "clearData",
            Self::AddAnnotation { .. } => "addAnnotation",
            Self::RemoveAnnotation { .. } => "removeAnnotation",
            Self::GetHighlights { .. } => "getHighlights",
            Self::QueryInteractions { .. } => "queryInteractions",
            Self::GetSummaries { .. } => "getSummaries",
            Self::GetSettings => "getSettings",
            Self::SaveSettings { .. } => "saveSettings",
            Self::GetStats => "getStats",
            Self::TabActivated { .. } => "tabActivated",
            Self::TabUpdated { .. } => "tabUpdated",
        }
    }
}

/// Parse a wire message. An unrecognized or missing `type` is
/// [`MessageError::UnknownMessage`]; a known type with a bad body is
/// [`MessageError::InvalidPayload`].
pub fn decode(value: Value) -> Result<Message, MessageError> {
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    if !MESSAGE_TYPES.contains(&kind.as_str()) {
        return Err(MessageError::UnknownMessage(kind));
    }
    serde_json::from_value(value).map_err(|e| MessageError::InvalidPayload(e.to_string()))
}

#[derive(Debug, Clone)]
pub enum Response {
    /// An interaction was accepted at `timestamp` (epoch ms).
    Recorded { timestamp: i64 },
    Ack,
    Counts(DomainCounts),
    Export(ExportBundle),
    Removed(bool),
    Highlights(Vec<Annotation>),
    Interactions(Vec<InteractionRecord>),
    Summaries(Vec<SummaryRecord>),
    Settings(Settings),
    Stats(ActivityStats),
}

impl Response {
    pub fn to_wire(&self) -> Value {
        match self {
            Self::Recorded { timestamp } => json!({ "success": true, "timestamp": timestamp }),
            Self::Ack => json!({ "success": true }),
            Self::Counts(counts) => with_data(counts),
            Self::Export(bundle) => with_data(bundle),
            Self::Removed(removed) => with_data(&json!({ "removed": removed })),
            Self::Highlights(items) => with_data(items),
            Self::Interactions(records) => with_data(records),
            Self::Summaries(summaries) => with_data(summaries),
            Self::Settings(settings) => with_data(settings),
            Self::Stats(stats) => with_data(stats),
        }
    }
}

fn with_data<T: Serialize>(data: &T) -> Value {
    match serde_json::to_value(data) {
        Ok(data) => json!({ "success": true, "data": data }),
        Err(e) => error_wire(&MessageError::Internal(e.to_string())),
    }
}

pub fn error_wire(err: &MessageError) -> Value {
    json!({ "success": false, "error": err.to_string() })
}

/// Wire form of a request outcome.
pub fn result_wire(result: &Result<Response, MessageError>) -> Value {
    match result {
        Ok(response) => response.to_wire(),
        Err(err) => error_wire(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_contract_messages() {
        let msg = decode(json!({
            "type": "user_interaction",
            "action": "meaningful_click",
            "data": {"x": 1, "y": 2}
        }))
        .unwrap();
        assert!(matches!(
            msg,
            Message::UserInteraction { action: InteractionKind::MeaningfulClick, .. }
        ));

        let msg = decode(json!({"type": "clearData", "dataType": "notes", "domain": "a.com"})).unwrap();
        match msg {
            Message::ClearData { data_type, domain } => {
                assert_eq!(data_type, AnnotationKind::Note);
                assert_eq!(domain.as_deref(), Some("a.com"));
            }
            other => panic!("unexpected {other:?}"),
        }

        assert!(matches!(decode(json!({"type": "getCounts"})).unwrap(), Message::GetCounts { domain: None }));
        assert!(matches!(decode(json!({"type": "getStats"})).unwrap(), Message::GetStats));
    }

    #[test]
    fn unknown_type_maps_to_contract_error() {
        let err = decode(json!({"type": "launchRockets"})).unwrap_err();
        assert_eq!(err, MessageError::UnknownMessage("launchRockets".into()));
        assert_eq!(error_wire(&err), json!({"success": false, "error": "Unknown message type"}));

        assert!(matches!(decode(json!({"no": "type"})), Err(MessageError::UnknownMessage(_))));
    }

    #[test]
    fn bad_body_is_invalid_payload() {
        let err = decode(json!({"type": "clearData", "dataType": "bookmarks"})).unwrap_err();
        assert!(matches!(err, MessageError::InvalidPayload(_)));
    }

    #[test]
    fn every_listed_type_has_a_variant_name() {
        let names = [
            Message::GetSettings.name(),
            Message::GetStats.name(),
            Message::GetCounts { domain: None }.name(),
        ];
        for name in names {
            assert!(MESSAGE_TYPES.contains(&name));
        }
    }

    #[test]
    fn response_wire_shapes() {
        assert_eq!(
            Response::Recorded { timestamp: 42 }.to_wire(),
            json!({"success": true, "timestamp": 42})
        );
        assert_eq!(Response::Ack.to_wire(), json!({"success": true}));
        assert_eq!(
            Response::Counts(DomainCounts::new(1, 2, 3)).to_wire(),
            json!({"success": true, "data": {"highlights": 1, "notes": 2, "quotes": 3, "total": 6}})
        );
    }
}
