//! Breakdown collaborator: turns a natural-language goal into proposed
//! task subtrees using the Gemini `generateContent` endpoint.

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{debug, instrument};

use crate::model::{BreakdownConfig, ProposedTask};

#[derive(Debug, thiserror::Error)]
pub enum BreakdownError {
    #[error("{0} environment variable not set")]
    MissingApiKey(String),
    #[error("breakdown request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("breakdown service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("breakdown response contained no text")]
    EmptyResponse,
    #[error("breakdown response is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("breakdown response is not a list of tasks")]
    NotAnArray,
}

/// Anything that can propose subtrees for a goal
#[async_trait]
pub trait Breakdown: Send + Sync {
    async fn breakdown(&self, prompt: &str) -> Result<Vec<ProposedTask>, BreakdownError>;
}

/// Gemini-backed breakdown
pub struct GeminiBreakdown {
    model: String,
    base_url: String,
    api_key_env: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl GeminiBreakdown {
    /// Build from config, reading the API key from the configured
    /// environment variable. A missing key only fails when a request is made.
    pub fn from_config(config: &BreakdownConfig) -> Self {
        GeminiBreakdown {
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key_env: config.api_key_env.clone(),
            api_key: std::env::var(&config.api_key_env)
                .ok()
                .filter(|k| !k.trim().is_empty()),
            client: reqwest::Client::new(),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl Breakdown for GeminiBreakdown {
    #[instrument(skip_all, fields(model = %self.model))]
    async fn breakdown(&self, prompt: &str) -> Result<Vec<ProposedTask>, BreakdownError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| BreakdownError::MissingApiKey(self.api_key_env.clone()))?;

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&request_body(prompt))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BreakdownError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let payload: Value = response.json().await?;
        let text = response_text(&payload).ok_or(BreakdownError::EmptyResponse)?;
        debug!(bytes = text.len(), "received breakdown");
        parse_proposals(text)
    }
}

pub fn breakdown_prompt(goal: &str) -> String {
    format!(
        "Break down the following goal into a nested list of actionable tasks and habits: \"{}\"",
        goal
    )
}

fn request_body(goal: &str) -> Value {
    json!({
        "contents": [{ "parts": [{ "text": breakdown_prompt(goal) }] }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": {
                "type": "ARRAY",
                "items": task_schema(),
            },
        },
    })
}

fn task_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "title": {
                "type": "STRING",
                "description": "The title of the task or subtask.",
            },
            "type": {
                "type": "STRING",
                "enum": ["todo", "habit"],
                "description": "Use 'habit' for recurring actions and 'todo' for one-off tasks.",
            },
            "children": {
                "type": "ARRAY",
                "description": "Nested subtasks.",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "title": { "type": "STRING" },
                        "type": { "type": "STRING", "enum": ["todo", "habit"] },
                        "children": { "type": "ARRAY", "items": { "type": "OBJECT" } },
                    },
                },
            },
        },
        "required": ["title", "type"],
    })
}

/// Pull the generated text out of a `generateContent` response
fn response_text(payload: &Value) -> Option<&str> {
    payload
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Parse the model's JSON text into proposals. Anything but an array is rejected.
pub fn parse_proposals(text: &str) -> Result<Vec<ProposedTask>, BreakdownError> {
    let value: Value = serde_json::from_str(text.trim())?;
    if !value.is_array() {
        return Err(BreakdownError::NotAnArray);
    }
    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TaskKind;

    #[test]
    fn test_parse_nested_proposals() {
        let proposals = parse_proposals(
            r#"
            [
              {"title": "Train for 5k", "type": "todo", "children": [
                {"title": "Run three times a week", "type": "habit"}
              ]}
            ]
            "#,
        )
        .unwrap();
        assert_eq!(proposals.len(), 1);
        assert_eq!(proposals[0].children[0].kind, TaskKind::Habit);
        assert!(proposals[0].children[0].children.is_empty());
    }

    #[test]
    fn test_parse_rejects_non_array() {
        assert!(matches!(
            parse_proposals(r#"{"title": "x"}"#),
            Err(BreakdownError::NotAnArray)
        ));
        assert!(matches!(
            parse_proposals("Sure! Here is your list"),
            Err(BreakdownError::Malformed(_))
        ));
    }

    #[test]
    fn test_response_text_extraction() {
        let payload = json!({
            "candidates": [{ "content": { "parts": [{ "text": " [] \n" }] } }]
        });
        assert_eq!(response_text(&payload), Some("[]"));
        assert_eq!(response_text(&json!({ "candidates": [] })), None);
    }

    #[test]
    fn test_request_body_shape() {
        let body = request_body("learn piano");
        let text = body
            .pointer("/contents/0/parts/0/text")
            .and_then(Value::as_str)
            .unwrap();
        assert!(text.ends_with("\"learn piano\""));
        assert_eq!(
            body.pointer("/generationConfig/responseMimeType"),
            Some(&json!("application/json"))
        );
    }

    #[test]
    fn test_endpoint_and_missing_key() {
        let config = BreakdownConfig {
            api_key_env: "TASKTREE_TEST_UNSET_KEY".into(),
            base_url: "http://localhost:9/v1beta/".into(),
            ..BreakdownConfig::default()
        };
        let gemini = GeminiBreakdown::from_config(&config);
        assert_eq!(
            gemini.endpoint(),
            "http://localhost:9/v1beta/models/gemini-2.5-flash:generateContent"
        );

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let result = rt.block_on(gemini.breakdown("anything"));
        assert!(matches!(result, Err(BreakdownError::MissingApiKey(_))));
    }
}
