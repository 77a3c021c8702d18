//! Typed structured output over a [`CompletionModel`].
//!
//! [`StructuredOutput`] owns the schema for an output type, conveys it to the
//! model, and turns the response into a validated, decoded value.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use schemaforge_schema::{
    Describe, SchemaGenerator, SchemaNode, SchemaValidator, ValidationErrors,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::OutputError;
use crate::extract::{build_native_instruction, build_prompt, extract_json};
use crate::mode::{OutputConfig, OutputMode};
use crate::model::{CompletionModel, CompletionRequest, Message};

/// Outcome of decoding and validating one response.
///
/// `value` is present whenever the text decoded into `T`, even if it also
/// violated the schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseResult<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<T>,
    /// The text the result was produced from.
    pub raw: String,
    #[serde(default, skip_serializing_if = "ValidationErrors::is_empty")]
    pub errors: ValidationErrors,
}

impl<T> ParseResult<T> {
    /// Decoded with no violations.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.value.is_some() && self.errors.is_empty()
    }

    /// The value, or a validation error carrying every violation.
    pub fn into_result(self) -> Result<T, OutputError> {
        match self.value {
            Some(value) if self.errors.is_empty() => Ok(value),
            Some(_) => Err(OutputError::validation(self.errors, self.raw)),
            None => {
                let mut errors = self.errors;
                if errors.is_empty() {
                    errors.add("", "no value decoded");
                }
                Err(OutputError::validation(errors, self.raw))
            }
        }
    }
}

/// Structured output for type `T` produced by model `M`.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Describe, Deserialize)]
/// struct Sentiment {
///     #[schema(required, enum_values("positive", "negative", "neutral"))]
///     label: String,
///     #[schema(minimum = 0, maximum = 1)]
///     confidence: f64,
/// }
///
/// let output = StructuredOutput::<Sentiment, _>::new(model)?;
/// let sentiment = output.generate("I love this library").await?;
/// ```
pub struct StructuredOutput<T, M> {
    model: M,
    schema: SchemaNode,
    validator: Arc<SchemaValidator>,
    config: OutputConfig,
    _marker: PhantomData<fn() -> T>,
}

impl<T, M: fmt::Debug> fmt::Debug for StructuredOutput<T, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructuredOutput")
            .field("model", &self.model)
            .field("schema", &self.schema)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<T: Describe, M> StructuredOutput<T, M> {
    /// Generate the schema for `T` with default options.
    pub fn new(model: M) -> Result<Self, OutputError> {
        Self::with_generator(model, &SchemaGenerator::new())
    }

    /// Generate the schema for `T` with a configured generator.
    pub fn with_generator(model: M, generator: &SchemaGenerator) -> Result<Self, OutputError> {
        let schema = generator.generate::<T>()?;
        Ok(Self::with_schema(model, schema))
    }
}

impl<T, M> StructuredOutput<T, M> {
    /// Use a caller-supplied schema.
    pub fn with_schema(model: M, schema: SchemaNode) -> Self {
        Self {
            model,
            schema,
            validator: Arc::new(SchemaValidator::new()),
            config: OutputConfig::default(),
            _marker: PhantomData,
        }
    }

    /// Replace the configuration.
    #[must_use]
    pub fn with_config(mut self, config: OutputConfig) -> Self {
        self.config = config;
        self
    }

    /// Share a validator, for instance one with custom formats.
    #[must_use]
    pub fn with_validator(mut self, validator: Arc<SchemaValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn schema(&self) -> &SchemaNode {
        &self.schema
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn config(&self) -> &OutputConfig {
        &self.config
    }

    /// Validate an already-built value against the schema.
    pub fn validate_value(&self, value: &T) -> ValidationErrors
    where
        T: Serialize,
    {
        match serde_json::to_value(value) {
            Ok(json) => self.validator.validate(&json, &self.schema),
            Err(e) => {
                let mut errors = ValidationErrors::new();
                errors.add("", format!("serialization error: {e}"));
                errors
            }
        }
    }
}

impl<T: DeserializeOwned, M> StructuredOutput<T, M> {
    /// Validate then decode JSON text.
    pub fn parse(&self, json_text: &str) -> Result<T, OutputError> {
        self.parse_detailed(json_text).into_result()
    }

    /// Validate then decode JSON text, keeping every violation.
    pub fn parse_detailed(&self, json_text: &str) -> ParseResult<T> {
        self.decode(json_text.to_string(), json_text)
    }

    fn decode(&self, raw: String, json_text: &str) -> ParseResult<T> {
        let mut errors = ValidationErrors::new();

        let json: JsonValue = match serde_json::from_str(json_text) {
            Ok(json) => json,
            Err(e) => {
                errors.add("", format!("JSON parse error: {e}"));
                return ParseResult {
                    value: None,
                    raw,
                    errors,
                };
            }
        };

        errors.extend(self.validator.validate(&json, &self.schema));

        let value = match serde_json::from_value::<T>(json) {
            Ok(value) => Some(value),
            Err(e) => {
                errors.add("", format!("JSON parse error: {e}"));
                None
            }
        };

        ParseResult { value, raw, errors }
    }
}

impl<T: DeserializeOwned, M: CompletionModel> StructuredOutput<T, M> {
    /// Ask the model for a `T` given a single user prompt.
    pub async fn generate(&self, prompt: &str) -> Result<T, OutputError> {
        self.generate_with_messages(vec![Message::user(prompt)])
            .await
    }

    /// Ask the model for a `T` given a conversation.
    pub async fn generate_with_messages(&self, messages: Vec<Message>) -> Result<T, OutputError> {
        self.run(messages, None).await?.into_result()
    }

    /// Like [`generate_with_messages`](Self::generate_with_messages), abandoning
    /// the call as soon as `cancel` fires.
    pub async fn generate_cancellable(
        &self,
        messages: Vec<Message>,
        cancel: &CancellationToken,
    ) -> Result<T, OutputError> {
        self.run(messages, Some(cancel)).await?.into_result()
    }

    /// Ask the model for a `T`, returning violations instead of failing on them.
    pub async fn generate_detailed(&self, prompt: &str) -> Result<ParseResult<T>, OutputError> {
        self.generate_detailed_with_messages(vec![Message::user(prompt)])
            .await
    }

    pub async fn generate_detailed_with_messages(
        &self,
        messages: Vec<Message>,
    ) -> Result<ParseResult<T>, OutputError> {
        self.run(messages, None).await
    }

    pub async fn generate_detailed_cancellable(
        &self,
        messages: Vec<Message>,
        cancel: &CancellationToken,
    ) -> Result<ParseResult<T>, OutputError> {
        self.run(messages, Some(cancel)).await
    }

    async fn run(
        &self,
        messages: Vec<Message>,
        cancel: Option<&CancellationToken>,
    ) -> Result<ParseResult<T>, OutputError> {
        let mode = self
            .config
            .resolve_mode(self.model.supports_native_structured_output());
        let request = self.build_request(messages, mode)?;

        debug!(
            model = self.model.name(),
            mode = %mode,
            messages = request.messages.len(),
            "requesting structured output"
        );

        let raw = self.call_model(request, cancel).await?;

        let json_text = match mode {
            OutputMode::Native => raw.trim().to_string(),
            OutputMode::Prompted => extract_json(&raw),
        };
        debug!(
            response_bytes = raw.len(),
            extracted_bytes = json_text.len(),
            "received model response"
        );

        let result = self.decode(raw, &json_text);
        if !result.errors.is_empty() {
            debug!(
                violations = result.errors.len(),
                decoded = result.value.is_some(),
                "structured output failed validation"
            );
        }
        Ok(result)
    }

    fn build_request(
        &self,
        mut messages: Vec<Message>,
        mode: OutputMode,
    ) -> Result<CompletionRequest, OutputError> {
        match mode {
            OutputMode::Native => {
                let compact = serde_json::to_string(&self.schema)?;
                messages.insert(0, Message::system(build_native_instruction(&compact)));
                Ok(CompletionRequest::new(messages).with_response_schema(self.schema.clone()))
            }
            OutputMode::Prompted => {
                let schema_json = if self.config.pretty_schema {
                    serde_json::to_string_pretty(&self.schema)?
                } else {
                    serde_json::to_string(&self.schema)?
                };
                let prompt = build_prompt(&schema_json, self.config.instructions.as_deref());
                messages.insert(0, Message::system(prompt));
                Ok(CompletionRequest::new(messages))
            }
        }
    }

    async fn call_model(
        &self,
        request: CompletionRequest,
        cancel: Option<&CancellationToken>,
    ) -> Result<String, OutputError> {
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            return Err(OutputError::Cancelled);
        }

        let call = async {
            match self.config.timeout {
                Some(limit) => {
                    match tokio::time::timeout(limit, self.model.complete(request)).await {
                        Ok(result) => result.map_err(OutputError::from),
                        Err(_) => Err(OutputError::Timeout(limit)),
                    }
                }
                None => self.model.complete(request).await.map_err(OutputError::from),
            }
        };

        match cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => Err(OutputError::Cancelled),
                result = call => result,
            },
            None => call.await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;
    use crate::mock::MockModel;
    use crate::model::Role;
    use pretty_assertions::assert_eq;
    use schemaforge_schema::{Describe, GeneratorOptions};
    use serde_json::json;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq, Describe, Serialize, Deserialize)]
    struct Verdict {
        #[schema(required, enum_values("success", "failure", "pending"))]
        status: String,
        #[schema(minimum = 0, maximum = 100)]
        score: f64,
    }

    #[derive(Debug, PartialEq, Describe, Serialize, Deserialize)]
    struct Contact {
        #[schema(required)]
        name: String,
        #[schema(format = "email")]
        email: Option<String>,
        tags: Vec<String>,
    }

    fn verdict_output(model: MockModel) -> StructuredOutput<Verdict, MockModel> {
        StructuredOutput::new(model).unwrap()
    }

    #[tokio::test]
    async fn test_prompted_generate_extracts_fenced_json() {
        let model = MockModel::new("test").with_response(
            "Here is the result:\n```json\n{\"status\": \"success\", \"score\": 87.5}\n```",
        );
        let output = verdict_output(model.clone());

        let verdict = output.generate("Grade this essay").await.unwrap();
        assert_eq!(
            verdict,
            Verdict {
                status: "success".into(),
                score: 87.5
            }
        );

        let requests = model.recorded_requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert!(request.response_schema.is_none());
        assert_eq!(request.messages[0].role, Role::System);
        assert!(request.messages[0].content.contains("JSON Schema:\n```json\n{\n"));
        assert!(request.messages[0].content.contains("\"success\""));
        assert_eq!(request.messages[1].content, "Grade this essay");
    }

    #[tokio::test]
    async fn test_native_mode_attaches_schema() {
        let model = MockModel::new("native")
            .with_native(true)
            .with_response(r#"{"status": "pending", "score": 10}"#);
        let output = verdict_output(model.clone());

        let verdict = output.generate("Grade").await.unwrap();
        assert_eq!(verdict.status, "pending");

        let request = &model.recorded_requests()[0];
        assert_eq!(request.response_schema.as_ref(), Some(output.schema()));
        let system = request.system_prompt().unwrap();
        assert!(system.starts_with("You must respond with valid JSON"));
        assert!(!system.contains("```"));
    }

    #[tokio::test]
    async fn test_forced_prompted_mode_on_native_model() {
        let model = MockModel::new("native")
            .with_native(true)
            .with_response(r#"{"status": "failure", "score": 0}"#);
        let output = verdict_output(model.clone())
            .with_config(OutputConfig::new().mode(OutputMode::Prompted));

        output.generate("Grade").await.unwrap();
        assert!(model.recorded_requests()[0].response_schema.is_none());
    }

    #[tokio::test]
    async fn test_custom_instructions_and_compact_schema() {
        let model = MockModel::new("test").with_response(r#"{"status": "success", "score": 1}"#);
        let output = verdict_output(model.clone()).with_config(
            OutputConfig::new()
                .instructions("You grade essays.")
                .pretty_schema(false),
        );

        output.generate("Grade").await.unwrap();
        let system = model.recorded_requests()[0].messages[0].content.clone();
        assert!(system.starts_with("You grade essays.\n\n"));
        assert!(system.contains("```json\n{\"type\":\"object\""));
    }

    #[tokio::test]
    async fn test_detailed_result_keeps_invalid_value() {
        let model =
            MockModel::new("test").with_response(r#"{"status": "success", "score": 150}"#);
        let output = verdict_output(model);

        let result = output.generate_detailed("Grade").await.unwrap();
        assert!(!result.is_valid());
        assert_eq!(result.value.as_ref().map(|v| v.score), Some(150.0));
        assert_eq!(result.errors.len(), 1);
        let error = result.errors.iter().next().unwrap();
        assert_eq!(error.path, "score");
        assert!(error.message.contains("exceeds maximum"));
    }

    #[tokio::test]
    async fn test_generate_fails_on_violation() {
        let model = MockModel::new("test").with_response(r#"{"status": "maybe", "score": 50}"#);
        let output = verdict_output(model);

        let err = output.generate("Grade").await.unwrap_err();
        let errors = err.validation_errors().unwrap();
        assert_eq!(errors.len(), 1);
        let error = errors.iter().next().unwrap();
        assert_eq!(error.path, "status");
        assert!(error.message.contains("one of"));
        assert_eq!(err.raw_response(), Some(r#"{"status": "maybe", "score": 50}"#));
    }

    #[tokio::test]
    async fn test_model_error_propagates_without_retry() {
        let model = MockModel::new("test")
            .with_error(ModelError::request("connection refused"))
            .with_response(r#"{"status": "success", "score": 1}"#);
        let output = verdict_output(model.clone());

        let err = output.generate("Grade").await.unwrap_err();
        assert!(matches!(err, OutputError::Model(ModelError::Request(_))));
        assert_eq!(model.request_count(), 1);
    }

    #[tokio::test]
    async fn test_non_json_response() {
        let model = MockModel::new("test").with_response("I cannot help with that.");
        let output = verdict_output(model);

        let result = output.generate_detailed("Grade").await.unwrap();
        assert!(result.value.is_none());
        assert_eq!(result.raw, "I cannot help with that.");
        assert_eq!(result.errors.len(), 1);
        let error = result.errors.iter().next().unwrap();
        assert_eq!(error.path, "");
        assert!(error.message.starts_with("JSON parse error"));
    }

    #[tokio::test]
    async fn test_timeout() {
        let model = MockModel::new("slow")
            .with_delay(Duration::from_secs(5))
            .with_response(r#"{"status": "success", "score": 1}"#);
        let output = verdict_output(model)
            .with_config(OutputConfig::new().timeout(Duration::from_millis(20)));

        let err = output.generate("Grade").await.unwrap_err();
        assert!(matches!(err, OutputError::Timeout(d) if d == Duration::from_millis(20)));
    }

    #[tokio::test]
    async fn test_cancellation() {
        let model = MockModel::new("slow")
            .with_delay(Duration::from_secs(5))
            .with_response(r#"{"status": "success", "score": 1}"#);
        let output = verdict_output(model);
        let token = CancellationToken::new();

        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });

        let err = output
            .generate_cancellable(vec![Message::user("Grade")], &token)
            .await
            .unwrap_err();
        assert!(matches!(err, OutputError::Cancelled));
    }

    #[tokio::test]
    async fn test_already_cancelled_skips_model() {
        let model = MockModel::new("test").with_response(r#"{"status": "success", "score": 1}"#);
        let output = verdict_output(model.clone());
        let token = CancellationToken::new();
        token.cancel();

        let err = output
            .generate_detailed_cancellable(vec![Message::user("Grade")], &token)
            .await
            .unwrap_err();
        assert!(matches!(err, OutputError::Cancelled));
        assert_eq!(model.request_count(), 0);
    }

    #[test]
    fn test_parse_round_trip() {
        let output: StructuredOutput<Contact, _> =
            StructuredOutput::new(MockModel::new("unused")).unwrap();

        let contact = output
            .parse(r#"{"name": "Ada", "email": "ada@example.com", "tags": ["math"]}"#)
            .unwrap();
        assert_eq!(
            contact,
            Contact {
                name: "Ada".into(),
                email: Some("ada@example.com".into()),
                tags: vec!["math".into()],
            }
        );
    }

    #[test]
    fn test_parse_detailed_reports_every_violation() {
        let output: StructuredOutput<Contact, _> =
            StructuredOutput::new(MockModel::new("unused")).unwrap();

        let result = output.parse_detailed(r#"{"email": "not-an-email", "tags": ["a", 2]}"#);
        let paths: Vec<_> = result.errors.iter().map(|e| e.path.as_str()).collect();
        assert!(paths.contains(&"name"));
        assert!(paths.contains(&"email"));
        assert!(paths.contains(&"tags[1]"));
        assert!(result.value.is_none());
    }

    #[test]
    fn test_validate_value() {
        let output = verdict_output(MockModel::new("unused"));
        let good = Verdict {
            status: "failure".into(),
            score: 40.0,
        };
        assert!(output.validate_value(&good).is_empty());

        let bad = Verdict {
            status: "unknown".into(),
            score: -1.0,
        };
        let errors = output.validate_value(&bad);
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_validate_value_reports_absent_option_as_null() {
        let output = StructuredOutput::<Contact, _>::new(MockModel::new("unused")).unwrap();
        let contact = Contact {
            name: "Ann".into(),
            email: None,
            tags: vec![],
        };

        let errors = output.validate_value(&contact);
        assert_eq!(errors.len(), 1);
        let error = errors.at("email").next().unwrap();
        assert_eq!(error.message, "expected string, got null");

        // The same payload without the key is accepted.
        let parsed = output.parse_detailed(r#"{"name": "Ann", "tags": []}"#);
        assert!(parsed.is_valid());
    }

    #[test]
    fn test_with_schema_and_generator() {
        let schema = SchemaNode::object()
            .with_property("status", SchemaNode::string())
            .with_required(["status"]);
        let output: StructuredOutput<JsonValue, _> =
            StructuredOutput::with_schema(MockModel::new("unused"), schema.clone());
        assert_eq!(output.schema(), &schema);
        assert!(output.parse(r#"{"status": "ok"}"#).is_ok());
        assert!(output.parse("{}").is_err());

        let generator = SchemaGenerator::with_options(GeneratorOptions::new().include_titles(true));
        let titled: StructuredOutput<Verdict, _> =
            StructuredOutput::with_generator(MockModel::new("unused"), &generator).unwrap();
        assert_eq!(titled.schema().title.as_deref(), Some("Verdict"));
    }

    #[test]
    fn test_parse_result_serialization() {
        let valid = ParseResult {
            value: Some(json!({"a": 1})),
            raw: r#"{"a": 1}"#.to_string(),
            errors: ValidationErrors::new(),
        };
        assert_eq!(
            serde_json::to_value(&valid).unwrap(),
            json!({"value": {"a": 1}, "raw": "{\"a\": 1}"})
        );

        let mut errors = ValidationErrors::new();
        errors.add("", "JSON parse error: EOF");
        let invalid: ParseResult<JsonValue> = ParseResult {
            value: None,
            raw: "{".to_string(),
            errors,
        };
        assert_eq!(
            serde_json::to_value(&invalid).unwrap(),
            json!({"raw": "{", "errors": [{"path": "", "message": "JSON parse error: EOF"}]})
        );
        assert!(invalid.into_result().is_err());
    }

    #[test]
    fn test_schema_for_unsupported_type_fails() {
        struct Opaque;
        impl Describe for Opaque {
            fn describe() -> schemaforge_schema::TypeDescriptor {
                schemaforge_schema::TypeDescriptor::Unsupported("Opaque".into())
            }
        }
        let err = StructuredOutput::<Opaque, _>::new(MockModel::new("unused")).unwrap_err();
        assert!(matches!(err, OutputError::Schema(_)));
    }
}
