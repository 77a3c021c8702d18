//! Scripted models for testing.
//!
//! [`MockModel`] returns a queue of pre-configured responses in order and
//! records every request it receives.
//!
//! ```rust
//! use schemaforge_output::MockModel;
//!
//! let model = MockModel::new("test")
//!     .with_response(r#"{"name": "Ada"}"#)
//!     .with_response(r#"{"name": "Grace"}"#);
//! ```

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::ModelError;
use crate::model::{CompletionModel, CompletionRequest};

/// A model with pre-configured responses.
///
/// Clones share the same queue and request log.
#[derive(Debug, Clone)]
pub struct MockModel {
    name: String,
    native: bool,
    delay: Option<Duration>,
    responses: Arc<Mutex<VecDeque<Result<String, ModelError>>>>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl MockModel {
    /// Create a new mock model.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            native: false,
            delay: None,
            responses: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue a text response.
    #[must_use]
    pub fn with_response(self, text: impl Into<String>) -> Self {
        self.responses.lock().push_back(Ok(text.into()));
        self
    }

    /// Queue a failure.
    #[must_use]
    pub fn with_error(self, error: ModelError) -> Self {
        self.responses.lock().push_back(Err(error));
        self
    }

    /// Report native structured output support.
    #[must_use]
    pub fn with_native(mut self, native: bool) -> Self {
        self.native = native;
        self
    }

    /// Sleep before answering each request.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Get recorded requests.
    pub fn recorded_requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().clone()
    }

    /// Number of requests received so far.
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Clear recorded requests.
    pub fn clear_requests(&self) {
        self.requests.lock().clear();
    }
}

#[async_trait]
impl CompletionModel for MockModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String, ModelError> {
        self.requests.lock().push(request);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self.responses.lock().pop_front();
        next.unwrap_or(Err(ModelError::EmptyResponse))
    }

    fn supports_native_structured_output(&self) -> bool {
        self.native
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Message;

    fn request() -> CompletionRequest {
        CompletionRequest::new(vec![Message::user("hello")])
    }

    #[tokio::test]
    async fn test_responses_in_order() {
        let model = MockModel::new("test")
            .with_response("first")
            .with_error(ModelError::request("boom"))
            .with_response("third");

        assert_eq!(model.complete(request()).await.unwrap(), "first");
        assert!(matches!(
            model.complete(request()).await,
            Err(ModelError::Request(_))
        ));
        assert_eq!(model.complete(request()).await.unwrap(), "third");
        assert!(matches!(
            model.complete(request()).await,
            Err(ModelError::EmptyResponse)
        ));
        assert_eq!(model.request_count(), 4);
    }

    #[tokio::test]
    async fn test_records_requests() {
        let model = MockModel::new("test").with_response("ok");
        let clone = model.clone();
        clone.complete(request()).await.unwrap();

        let recorded = model.recorded_requests();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].messages[0].content, "hello");

        model.clear_requests();
        assert_eq!(clone.request_count(), 0);
    }

    #[test]
    fn test_native_flag() {
        assert!(!MockModel::new("a").supports_native_structured_output());
        assert!(MockModel::new("b")
            .with_native(true)
            .supports_native_structured_output());
        assert_eq!(MockModel::new("named").name(), "named");
    }
}
