//! The text-generation collaborator.
//!
//! [`CompletionModel`] is the seam between structured output and whatever
//! produces text: an HTTP client for a hosted model, a local runtime, or
//! [`MockModel`](crate::MockModel) in tests.

use std::sync::Arc;

use async_trait::async_trait;
use schemaforge_schema::SchemaNode;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// A completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,
    /// Schema the response must follow, for models that enforce it natively.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<SchemaNode>,
}

impl CompletionRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            response_schema: None,
        }
    }

    #[must_use]
    pub fn with_response_schema(mut self, schema: SchemaNode) -> Self {
        self.response_schema = Some(schema);
        self
    }

    /// The system message, if any.
    #[must_use]
    pub fn system_prompt(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
    }
}

/// Something that turns messages into text.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// Model name, for logs.
    fn name(&self) -> &str {
        "model"
    }

    /// Run one completion and return the response text.
    async fn complete(&self, request: CompletionRequest) -> Result<String, ModelError>;

    /// Whether the model can enforce a response schema itself.
    fn supports_native_structured_output(&self) -> bool {
        false
    }
}

#[async_trait]
impl<M: CompletionModel + ?Sized> CompletionModel for Arc<M> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, ModelError> {
        (**self).complete(request).await
    }

    fn supports_native_structured_output(&self) -> bool {
        (**self).supports_native_structured_output()
    }
}

#[async_trait]
impl<M: CompletionModel + ?Sized> CompletionModel for Box<M> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, ModelError> {
        (**self).complete(request).await
    }

    fn supports_native_structured_output(&self) -> bool {
        (**self).supports_native_structured_output()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl CompletionModel for Echo {
        async fn complete(&self, request: CompletionRequest) -> Result<String, ModelError> {
            request
                .messages
                .last()
                .map(|m| m.content.clone())
                .ok_or(ModelError::EmptyResponse)
        }
    }

    #[test]
    fn test_message_constructors() {
        assert_eq!(Message::system("s").role, Role::System);
        assert_eq!(Message::user("u").role, Role::User);
        assert_eq!(Message::assistant("a").role, Role::Assistant);
    }

    #[test]
    fn test_request_serialization() {
        let request = CompletionRequest::new(vec![Message::user("hi")]);
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"messages": [{"role": "user", "content": "hi"}]})
        );

        let request = request.with_response_schema(SchemaNode::string());
        assert_eq!(
            serde_json::to_value(&request).unwrap()["response_schema"],
            json!({"type": "string"})
        );
    }

    #[test]
    fn test_system_prompt_lookup() {
        let request = CompletionRequest::new(vec![Message::system("rules"), Message::user("q")]);
        assert_eq!(request.system_prompt(), Some("rules"));
        assert_eq!(CompletionRequest::new(vec![]).system_prompt(), None);
    }

    #[tokio::test]
    async fn test_shared_model_delegates() {
        let model: Arc<dyn CompletionModel> = Arc::new(Echo);
        assert_eq!(model.name(), "model");
        assert!(!model.supports_native_structured_output());
        let text = model
            .complete(CompletionRequest::new(vec![Message::user("ping")]))
            .await
            .unwrap();
        assert_eq!(text, "ping");
    }
}
