//! Chat classification client
//!
//! Wraps an OpenAI-compatible chat-completion endpoint. A request carries the
//! shape the answer must take; strict shapes are requested through a
//! `json_schema` response format and validated again on the way back.

use std::collections::BTreeSet;

use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use url::Url;

use crate::storage::Settings;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifyError {
    #[error("classification endpoint not configured: {0}")]
    Configuration(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("response does not match expected shape: {0}")]
    Schema(String),
}

pub type Result<T> = std::result::Result<T, ClassifyError>;

/// The shape a classification answer must take
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseShape {
    Boolean,
    Text,
    Enum(BTreeSet<String>),
}

/// A parsed answer, one variant per shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassificationValue {
    Boolean(bool),
    Text(String),
    Enum(String),
}

impl ClassificationValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ClassificationValue::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ClassificationValue::Text(value) | ClassificationValue::Enum(value) => Some(value),
            ClassificationValue::Boolean(_) => None,
        }
    }
}

impl ResponseShape {
    /// The `response_format` directive for this shape
    pub fn response_format(&self, schema_name: &str) -> Value {
        let schema = match self {
            ResponseShape::Text => return json!({ "type": "text" }),
            ResponseShape::Boolean => json!({ "type": "boolean" }),
            ResponseShape::Enum(choices) => json!({ "type": "string", "enum": choices }),
        };

        json!({
            "type": "json_schema",
            "json_schema": {
                "name": schema_name,
                "strict": true,
                "schema": schema,
            },
        })
    }

    /// Parse the first choice's message content into this shape
    pub fn parse(&self, content: &str) -> Result<ClassificationValue> {
        match self {
            ResponseShape::Boolean => serde_json::from_str::<bool>(content.trim())
                .map(ClassificationValue::Boolean)
                .map_err(|_| ClassifyError::Schema(format!("expected a boolean, got {:?}", content))),
            ResponseShape::Text => Ok(ClassificationValue::Text(content.to_string())),
            ResponseShape::Enum(choices) => {
                let choice = serde_json::from_str::<String>(content.trim())
                    .unwrap_or_else(|_| content.to_string());
                if choices.contains(&choice) {
                    Ok(ClassificationValue::Enum(choice))
                } else {
                    Err(ClassifyError::Schema(format!("{:?} is not one of {:?}", choice, choices)))
                }
            }
        }
    }
}

/// A single prompt to classify
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationRequest {
    pub model: String,
    pub prompt: String,
    pub shape: ResponseShape,
    /// Name given to the json_schema for strict shapes
    pub schema_name: String,
}

impl ClassificationRequest {
    pub fn new(model: &str, prompt: String, shape: ResponseShape) -> Self {
        Self {
            model: model.to_string(),
            prompt,
            shape,
            schema_name: "classification".to_string(),
        }
    }

    pub fn named(mut self, schema_name: &str) -> Self {
        self.schema_name = schema_name.to_string();
        self
    }

    fn body(&self) -> ChatRequest<'_> {
        ChatRequest {
            model: &self.model,
            messages: vec![Message {
                role: "user",
                content: &self.prompt,
            }],
            response_format: self.shape.response_format(&self.schema_name),
        }
    }
}

/// Anything that can answer a classification request.
///
/// Futures are not required to be `Send`: everything runs on the browser's
/// event loop.
#[allow(async_fn_in_trait)]
pub trait Classifier {
    async fn classify(&self, request: ClassificationRequest) -> Result<ClassificationValue>;
}

#[derive(Debug, Clone, PartialEq)]
struct Endpoint {
    completions_url: Url,
    api_key: String,
}

/// `Classifier` backed by a remote chat-completion endpoint
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: Client,
    endpoint: std::result::Result<Endpoint, ClassifyError>,
}

impl ChatClient {
    /// Build a client from the stored settings. Incomplete settings still
    /// produce a client, but every call on it fails with
    /// `ClassifyError::Configuration` until it is rebuilt.
    pub fn new(settings: &Settings) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint_from(settings),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.endpoint.is_ok()
    }

    /// Why the client is unusable, if it is
    pub fn configuration_error(&self) -> Option<&ClassifyError> {
        self.endpoint.as_ref().err()
    }
}

impl Classifier for ChatClient {
    async fn classify(&self, request: ClassificationRequest) -> Result<ClassificationValue> {
        let endpoint = self.endpoint.as_ref().map_err(|e| e.clone())?;

        debug!("classify {} via {}", request.schema_name, endpoint.completions_url);

        let response = self
            .client
            .post(endpoint.completions_url.clone())
            .bearer_auth(&endpoint.api_key)
            .json(&request.body())
            .send()
            .await
            .map_err(|e| ClassifyError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ClassifyError::Transport(format!("API error {}: {}", status, error_text)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ClassifyError::Transport(e.to_string()))?;

        let content = first_choice_content(&body)?;
        request.shape.parse(&content)
    }
}

fn endpoint_from(settings: &Settings) -> Result<Endpoint> {
    if settings.api_key.trim().is_empty() {
        return Err(ClassifyError::Configuration("API key is not set".into()));
    }
    if settings.base_url.trim().is_empty() {
        return Err(ClassifyError::Configuration("endpoint URL is not set".into()));
    }

    Ok(Endpoint {
        completions_url: completions_url(&settings.base_url)?,
        api_key: settings.api_key.trim().to_string(),
    })
}

/// `<base>/chat/completions`, keeping any path prefix the base carries
pub fn completions_url(base_url: &str) -> Result<Url> {
    let mut base = Url::parse(base_url.trim())
        .map_err(|e| ClassifyError::Configuration(format!("invalid endpoint URL {:?}: {}", base_url, e)))?;

    if !matches!(base.scheme(), "http" | "https") {
        return Err(ClassifyError::Configuration(format!(
            "endpoint URL must be http or https, got {:?}",
            base.scheme()
        )));
    }

    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }

    base.join("chat/completions")
        .map_err(|e| ClassifyError::Configuration(e.to_string()))
}

/// Extract the first choice's message content from a response body
fn first_choice_content(body: &str) -> Result<String> {
    let completion: ChatResponse = serde_json::from_str(body)
        .map_err(|e| ClassifyError::Schema(format!("malformed completion: {}", e)))?;

    completion
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ClassifyError::Schema("empty choices".into()))?
        .message
        .content
        .ok_or_else(|| ClassifyError::Schema("choice has no content".into()))
}

// OpenAI-compatible wire format
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    response_format: Value,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;

    fn settings(api_key: &str, base_url: &str) -> Settings {
        Settings {
            api_key: api_key.to_string(),
            base_url: base_url.to_string(),
            ..Settings::default()
        }
    }

    fn choices(set: &[&str]) -> BTreeSet<String> {
        set.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_boolean_response_format_is_strict_schema() {
        let format = ResponseShape::Boolean.response_format("tab_matches_query");

        assert_eq!(format["type"], "json_schema");
        assert_eq!(format["json_schema"]["name"], "tab_matches_query");
        assert_eq!(format["json_schema"]["strict"], true);
        assert_eq!(format["json_schema"]["schema"]["type"], "boolean");
    }

    #[test]
    fn test_text_response_format() {
        assert_eq!(ResponseShape::Text.response_format("ignored"), json!({ "type": "text" }));
    }

    #[test]
    fn test_enum_response_format_lists_choices() {
        let format = ResponseShape::Enum(choices(&["Work", "Personal"])).response_format("group");

        assert_eq!(format["json_schema"]["schema"]["type"], "string");
        assert_eq!(format["json_schema"]["schema"]["enum"], json!(["Personal", "Work"]));
    }

    #[test]
    fn test_parse_boolean() {
        assert_eq!(ResponseShape::Boolean.parse("true"), Ok(ClassificationValue::Boolean(true)));
        assert_eq!(ResponseShape::Boolean.parse(" false\n"), Ok(ClassificationValue::Boolean(false)));
        assert!(matches!(ResponseShape::Boolean.parse("True"), Err(ClassifyError::Schema(_))));
        assert!(matches!(ResponseShape::Boolean.parse("yes"), Err(ClassifyError::Schema(_))));
    }

    #[test]
    fn test_parse_text_is_verbatim() {
        assert_eq!(
            ResponseShape::Text.parse(" Work\n"),
            Ok(ClassificationValue::Text(" Work\n".to_string()))
        );
    }

    #[test]
    fn test_parse_enum() {
        let shape = ResponseShape::Enum(choices(&["Work", "Personal"]));

        assert_eq!(shape.parse("\"Work\""), Ok(ClassificationValue::Enum("Work".to_string())));
        assert_eq!(shape.parse("Personal"), Ok(ClassificationValue::Enum("Personal".to_string())));
        assert!(matches!(shape.parse("\"work\""), Err(ClassifyError::Schema(_))));
    }

    #[test]
    fn test_request_body() {
        let request = ClassificationRequest::new("test-model", "hello".to_string(), ResponseShape::Boolean)
            .named("tab_matches_query");

        let body = serde_json::to_value(request.body()).unwrap();

        assert_eq!(body["model"], "test-model");
        assert_eq!(body["messages"], json!([{ "role": "user", "content": "hello" }]));
        assert_eq!(body["response_format"]["json_schema"]["name"], "tab_matches_query");
    }

    #[test]
    fn test_first_choice_content() {
        let body = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"true"}},{"index":1,"message":{"role":"assistant","content":"false"}}]}"#;
        assert_eq!(first_choice_content(body), Ok("true".to_string()));
    }

    #[test]
    fn test_first_choice_content_malformed() {
        assert!(matches!(first_choice_content("not json"), Err(ClassifyError::Schema(_))));
        assert!(matches!(first_choice_content(r#"{"choices":[]}"#), Err(ClassifyError::Schema(_))));
        assert!(matches!(
            first_choice_content(r#"{"choices":[{"message":{"content":null}}]}"#),
            Err(ClassifyError::Schema(_))
        ));
    }

    #[test]
    fn test_completions_url() {
        assert_eq!(
            completions_url("https://api.example.com/v1").unwrap().as_str(),
            "https://api.example.com/v1/chat/completions"
        );
        assert_eq!(
            completions_url("https://api.example.com/v1/").unwrap().as_str(),
            "https://api.example.com/v1/chat/completions"
        );
        assert_eq!(
            completions_url("http://localhost:5000").unwrap().as_str(),
            "http://localhost:5000/chat/completions"
        );
    }

    #[test]
    fn test_completions_url_rejects_bad_urls() {
        assert!(matches!(completions_url("not a url"), Err(ClassifyError::Configuration(_))));
        assert!(matches!(completions_url("ftp://example.com"), Err(ClassifyError::Configuration(_))));
    }

    #[test]
    fn test_client_configured() {
        let client = ChatClient::new(&settings("sk-test", "https://api.example.com/v1"));
        assert!(client.is_configured());
        assert!(client.configuration_error().is_none());
    }

    #[test]
    fn test_client_unconfigured() {
        assert!(!ChatClient::new(&settings("", "https://api.example.com/v1")).is_configured());
        assert!(!ChatClient::new(&settings("sk-test", "")).is_configured());
        assert!(!ChatClient::new(&settings("sk-test", "example.com")).is_configured());
    }

    #[tokio::test]
    async fn test_unconfigured_client_fails_without_network() {
        let client = ChatClient::new(&Settings::default());
        let request = ClassificationRequest::new("m", "p".to_string(), ResponseShape::Boolean);

        let result = client.classify(request).await;

        assert!(matches!(result, Err(ClassifyError::Configuration(_))));
    }

    mod http {
        use super::*;
        use serde_json::json;
        use wiremock::matchers::{body_partial_json, header, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        fn completion(content: &str) -> Value {
            json!({ "choices": [{ "message": { "role": "assistant", "content": content } }] })
        }

        fn boolean_request() -> ClassificationRequest {
            ClassificationRequest::new("test-model", "Is this about Rust?".to_string(), ResponseShape::Boolean)
                .named("tab_matches_query")
        }

        #[tokio::test]
        async fn test_classify_posts_to_completions_with_bearer_key() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/v1/chat/completions"))
                .and(header("authorization", "Bearer sk-test"))
                .and(body_partial_json(json!({
                    "model": "test-model",
                    "messages": [{ "role": "user", "content": "Is this about Rust?" }],
                    "response_format": { "type": "json_schema" },
                })))
                .respond_with(ResponseTemplate::new(200).set_body_json(completion("true")))
                .expect(1)
                .mount(&server)
                .await;

            let client = ChatClient::new(&settings("sk-test", &format!("{}/v1", server.uri())));
            let result = client.classify(boolean_request()).await;

            assert_eq!(result, Ok(ClassificationValue::Boolean(true)));
        }

        #[tokio::test]
        async fn test_error_status_is_transport_error() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/v1/chat/completions"))
                .respond_with(ResponseTemplate::new(500).set_body_string("model crashed"))
                .mount(&server)
                .await;

            let client = ChatClient::new(&settings("sk-test", &format!("{}/v1", server.uri())));

            match client.classify(boolean_request()).await {
                Err(ClassifyError::Transport(message)) => {
                    assert!(message.contains("500"));
                    assert!(message.contains("model crashed"));
                }
                other => panic!("expected transport error, got {:?}", other),
            }
        }

        #[tokio::test]
        async fn test_malformed_body_is_schema_error() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/v1/chat/completions"))
                .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
                .mount(&server)
                .await;

            let client = ChatClient::new(&settings("sk-test", &format!("{}/v1", server.uri())));
            let result = client.classify(boolean_request()).await;

            assert!(matches!(result, Err(ClassifyError::Schema(_))));
        }

        #[tokio::test]
        async fn test_answer_outside_shape_is_schema_error() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/v1/chat/completions"))
                .respond_with(ResponseTemplate::new(200).set_body_json(completion("probably")))
                .mount(&server)
                .await;

            let client = ChatClient::new(&settings("sk-test", &format!("{}/v1", server.uri())));
            let result = client.classify(boolean_request()).await;

            assert!(matches!(result, Err(ClassifyError::Schema(_))));
        }
    }
}
