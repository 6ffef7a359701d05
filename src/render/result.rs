//! The typed response protocol between renderer and gateway.
//!
//! # Responsibilities
//! - Define `RendererResult`, the tagged union of terminal outcomes
//! - Define the permissive wire payload and its validating conversion
//!
//! # Design Decisions
//! - The enum makes multi-populated results unrepresentable in process;
//!   the wire payload re-validates what arrives over the hop, so a
//!   malformed renderer can never smuggle two outcomes past the gateway

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ProtocolError, RenderError};

/// Terminal outcome of one render. Exactly one case is ever populated.
#[derive(Debug, Clone, PartialEq)]
pub enum RendererResult {
    Success {
        html: String,
    },
    Redirect {
        url: String,
    },
    NotFound {
        html: Option<String>,
    },
    Error {
        kind: String,
        message: String,
        details: Option<Value>,
        status: u16,
    },
}

impl RendererResult {
    /// Label recorded in metrics and the `X-Renderer-Response-Type` header.
    pub fn response_type(&self) -> &'static str {
        match self {
            RendererResult::Success { .. } => "success",
            RendererResult::Redirect { .. } => "redirect",
            RendererResult::NotFound { .. } => "not_found",
            RendererResult::Error { .. } => "error",
        }
    }

    /// Build the Error outcome for a render failure, preserving kind,
    /// message, details and status.
    pub fn from_render_error(error: &RenderError) -> Self {
        RendererResult::Error {
            kind: error.kind().to_string(),
            message: error.to_string(),
            details: error.details(),
            status: error.status(),
        }
    }
}

/// Error case carried on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    pub status: u16,
}

/// Wire form of a `RendererResult`: a JSON object with optional fields.
///
/// Deliberately permissive so the validating conversion — not serde — is
/// what rejects ambiguous payloads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    #[serde(skip_serializing_if = "is_false")]
    pub not_found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl RendererPayload {
    /// Validate the one-populated-case contract.
    pub fn into_result(self) -> Result<RendererResult, ProtocolError> {
        let success = self.html.is_some() && !self.not_found;
        let populated = [
            self.redirect_url.is_some(),
            self.error.is_some(),
            self.not_found,
            success,
        ]
        .iter()
        .filter(|p| **p)
        .count();

        match populated {
            0 => Err(ProtocolError::Empty),
            1 => Ok(if let Some(url) = self.redirect_url {
                RendererResult::Redirect { url }
            } else if let Some(error) = self.error {
                RendererResult::Error {
                    kind: error.kind,
                    message: error.message,
                    details: error.details,
                    status: error.status,
                }
            } else if self.not_found {
                RendererResult::NotFound { html: self.html }
            } else {
                RendererResult::Success {
                    html: self.html.unwrap_or_default(),
                }
            }),
            n => Err(ProtocolError::Ambiguous(n)),
        }
    }
}

impl From<RendererResult> for RendererPayload {
    fn from(result: RendererResult) -> Self {
        match result {
            RendererResult::Success { html } => RendererPayload {
                html: Some(html),
                ..RendererPayload::default()
            },
            RendererResult::Redirect { url } => RendererPayload {
                redirect_url: Some(url),
                ..RendererPayload::default()
            },
            RendererResult::NotFound { html } => RendererPayload {
                html,
                not_found: true,
                ..RendererPayload::default()
            },
            RendererResult::Error {
                kind,
                message,
                details,
                status,
            } => RendererPayload {
                error: Some(ErrorBody {
                    kind,
                    message,
                    details,
                    status,
                }),
                ..RendererPayload::default()
            },
        }
    }
}

/// Body of the internal gateway → renderer call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderRequest {
    pub state: Value,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_case_round_trips() {
        let cases = vec![
            RendererResult::Success {
                html: "<p>ok</p>".into(),
            },
            RendererResult::Redirect {
                url: "/login".into(),
            },
            RendererResult::NotFound { html: None },
            RendererResult::NotFound {
                html: Some("<p>missing</p>".into()),
            },
            RendererResult::Error {
                kind: "render_failure".into(),
                message: "boom".into(),
                details: Some(serde_json::json!({ "resource": "users/42" })),
                status: 500,
            },
        ];
        for case in cases {
            let payload = RendererPayload::from(case.clone());
            let encoded = serde_json::to_string(&payload).unwrap();
            let decoded: RendererPayload = serde_json::from_str(&encoded).unwrap();
            assert_eq!(decoded.into_result().unwrap(), case);
        }
    }

    #[test]
    fn both_html_and_redirect_rejected() {
        let payload = RendererPayload {
            html: Some("<p>ok</p>".into()),
            redirect_url: Some("/elsewhere".into()),
            ..RendererPayload::default()
        };
        assert!(matches!(
            payload.into_result(),
            Err(ProtocolError::Ambiguous(2))
        ));
    }

    #[test]
    fn empty_payload_rejected() {
        assert!(matches!(
            RendererPayload::default().into_result(),
            Err(ProtocolError::Empty)
        ));
    }

    #[test]
    fn not_found_with_body_is_one_case() {
        let payload = RendererPayload {
            html: Some("<p>404</p>".into()),
            not_found: true,
            ..RendererPayload::default()
        };
        assert_eq!(
            payload.into_result().unwrap(),
            RendererResult::NotFound {
                html: Some("<p>404</p>".into())
            }
        );
    }

    #[test]
    fn error_and_not_found_rejected() {
        let payload = RendererPayload {
            not_found: true,
            error: Some(ErrorBody {
                kind: "render_failure".into(),
                message: "boom".into(),
                details: None,
                status: 500,
            }),
            ..RendererPayload::default()
        };
        assert!(matches!(
            payload.into_result(),
            Err(ProtocolError::Ambiguous(2))
        ));
    }
}
