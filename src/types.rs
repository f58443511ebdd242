use serde::{Deserialize, Serialize};

/// Who produced a chat entry. `SystemHide` is a relabel target, never a role
/// the backend sends: it marks kernel output that a fix attempt superseded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Generator,
    System,
    SystemHide,
    Upload,
}

/// Content tag carried by every chat entry. The wire values are the backend's
/// MIME-like strings; anything outside the known vocabulary lands on
/// `Unknown` and renders as plain text instead of failing the poll tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentKind {
    #[serde(rename = "message")]
    Message,
    #[serde(rename = "message_raw")]
    RawMessage,
    #[serde(rename = "message_status")]
    StatusMessage,
    #[serde(rename = "message_error")]
    ErrorMessage,
    #[serde(rename = "message_loader")]
    Loader,
    #[serde(rename = "image/png")]
    Png,
    #[serde(rename = "image/jpeg")]
    Jpeg,
    #[serde(rename = "image/svg+xml")]
    Svg,
    #[serde(rename = "text/html")]
    Html,
    #[serde(rename = "application/3dmoljs_load.v0")]
    MolViewer,
    #[serde(rename = "code")]
    Code,
    #[serde(other)]
    Unknown,
}

impl ContentKind {
    pub fn is_error(self) -> bool {
        self == ContentKind::ErrorMessage
    }

    /// Binary or markup payloads whose raw value must not be dumped into the
    /// transcript.
    pub fn is_opaque(self) -> bool {
        matches!(
            self,
            ContentKind::Png
                | ContentKind::Jpeg
                | ContentKind::Svg
                | ContentKind::Html
                | ContentKind::MolViewer
        )
    }

    pub fn wire_name(self) -> &'static str {
        match self {
            ContentKind::Message => "message",
            ContentKind::RawMessage => "message_raw",
            ContentKind::StatusMessage => "message_status",
            ContentKind::ErrorMessage => "message_error",
            ContentKind::Loader => "message_loader",
            ContentKind::Png => "image/png",
            ContentKind::Jpeg => "image/jpeg",
            ContentKind::Svg => "image/svg+xml",
            ContentKind::Html => "text/html",
            ContentKind::MolViewer => "application/3dmoljs_load.v0",
            ContentKind::Code => "code",
            ContentKind::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub text: String,
    pub role: Role,
    #[serde(rename = "type")]
    pub kind: ContentKind,
}

impl Message {
    pub fn new(role: Role, kind: ContentKind, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            role,
            kind,
        }
    }
}

/// Body of a `/generate` response.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub code: Option<String>,
}

/// Client-level generation outcome: the parsed body plus whether the HTTP
/// status was a success. A non-success reply still carries explanation text.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateReply {
    pub ok: bool,
    pub text: String,
    pub code: Option<String>,
}

/// One status poll of the kernel: its phase string plus any results produced
/// since the previous poll.
#[derive(Debug, Clone, Deserialize)]
pub struct PollSnapshot {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub results: Vec<ResultEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResultEntry {
    pub value: String,
    #[serde(rename = "type")]
    pub kind: ContentKind,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadReply {
    pub message: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FoundryListing {
    #[serde(default)]
    pub folder: Option<String>,
    #[serde(default)]
    pub datasets: Vec<FoundryDataset>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FoundryDataset {
    pub name: String,
    pub dataset_rid: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FoundryFileReply {
    pub message: String,
    #[serde(default)]
    pub filename: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_kind_parses_full_wire_vocabulary() {
        let cases = [
            ("message", ContentKind::Message),
            ("message_raw", ContentKind::RawMessage),
            ("message_status", ContentKind::StatusMessage),
            ("message_error", ContentKind::ErrorMessage),
            ("message_loader", ContentKind::Loader),
            ("image/png", ContentKind::Png),
            ("image/jpeg", ContentKind::Jpeg),
            ("image/svg+xml", ContentKind::Svg),
            ("text/html", ContentKind::Html),
            ("application/3dmoljs_load.v0", ContentKind::MolViewer),
            ("code", ContentKind::Code),
        ];

        for (wire, expected) in cases {
            let parsed: ContentKind =
                serde_json::from_str(&format!("\"{wire}\"")).expect("known kind must parse");
            assert_eq!(parsed, expected);
            assert_eq!(expected.wire_name(), wire);
        }
    }

    #[test]
    fn test_unrecognized_content_kind_falls_back_to_unknown() {
        let parsed: ContentKind = serde_json::from_str("\"video/mp4\"").expect("must not fail");
        assert_eq!(parsed, ContentKind::Unknown);
    }

    #[test]
    fn test_poll_snapshot_tolerates_missing_fields() {
        let snapshot: PollSnapshot = serde_json::from_str("{}").expect("parse");
        assert_eq!(snapshot.status, "");
        assert!(snapshot.results.is_empty());

        let snapshot: PollSnapshot = serde_json::from_str(
            r#"{"status":"idle","results":[{"value":"42\n","type":"message"}]}"#,
        )
        .expect("parse");
        assert_eq!(snapshot.status, "idle");
        assert_eq!(snapshot.results[0].kind, ContentKind::Message);
    }

    #[test]
    fn test_role_round_trips_snake_case() {
        let json = serde_json::to_string(&Role::SystemHide).expect("serialize");
        assert_eq!(json, "\"system_hide\"");
        let parsed: Role = serde_json::from_str(&json).expect("parse");
        assert_eq!(parsed, Role::SystemHide);
    }
}
