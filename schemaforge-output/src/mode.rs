//! Output mode and configuration.
//!
//! This module defines how a schema reaches the model and the knobs that
//! control a [`StructuredOutput`](crate::StructuredOutput) call.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// How the schema is conveyed to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// Attach the schema to the request (JSON mode / response format).
    ///
    /// The response is expected to be bare JSON.
    Native,

    /// Embed the schema in a system instruction.
    ///
    /// The response is free text and JSON is extracted from it.
    Prompted,
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputMode::Native => write!(f, "native"),
            OutputMode::Prompted => write!(f, "prompted"),
        }
    }
}

impl OutputMode {
    /// Whether the schema travels with the request.
    #[must_use]
    pub fn attaches_schema(&self) -> bool {
        matches!(self, OutputMode::Native)
    }
}

/// Parse an output mode from a string.
impl std::str::FromStr for OutputMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "native" | "json_schema" | "response_format" => Ok(OutputMode::Native),
            "prompted" | "prompt" | "json" => Ok(OutputMode::Prompted),
            _ => Err(format!("Unknown output mode: {}", s)),
        }
    }
}

/// Configuration for structured output calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Force a mode. `None` picks native when the model supports it.
    pub mode: Option<OutputMode>,
    /// Deadline for one model call.
    pub timeout: Option<Duration>,
    /// Replaces the default preamble of the prompted-mode instruction.
    pub instructions: Option<String>,
    /// Indent the schema embedded in prompts.
    pub pretty_schema: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            mode: None,
            timeout: None,
            instructions: None,
            pretty_schema: true,
        }
    }
}

impl OutputConfig {
    /// Create a default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Force an output mode.
    #[must_use]
    pub fn mode(mut self, mode: OutputMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Set a per-call timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Replace the default instruction preamble.
    #[must_use]
    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Embed the schema compactly or indented.
    #[must_use]
    pub fn pretty_schema(mut self, pretty: bool) -> Self {
        self.pretty_schema = pretty;
        self
    }

    /// The mode to use given what the model supports.
    #[must_use]
    pub fn resolve_mode(&self, model_supports_native: bool) -> OutputMode {
        match self.mode {
            Some(mode) => mode,
            None if model_supports_native => OutputMode::Native,
            None => OutputMode::Prompted,
        }
    }
}
