//! Inbound request and outbound result types for tokenprobe

use serde::{Deserialize, Serialize};
use crate::error::{Error, FieldError};

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 100;

pub const MIN_TEMPERATURE: f32 = 0.0;
pub const MAX_TEMPERATURE: f32 = 2.0;
pub const MIN_MAX_TOKENS: u32 = 1;
pub const MAX_MAX_TOKENS: u32 = 4096;

fn default_model() -> String
{   DEFAULT_MODEL.to_string()
}

fn default_temperature() -> f32
{   DEFAULT_TEMPERATURE
}

fn default_max_tokens() -> u32
{   DEFAULT_MAX_TOKENS
}

/// Completion request as posted by the page
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRequest
{   /// The prompt text
    pub prompt: String
  , /// Model name
    #[serde(default = "default_model")]
    pub model: String
  , /// Temperature for sampling
    #[serde(default = "default_temperature")]
    pub temperature: f32
  , /// Max tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32
  , /// Caller-supplied upstream API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>
}

impl CompletionRequest
{   pub fn new(prompt: impl Into<String>) -> Self
    {   CompletionRequest
        {   prompt: prompt.into()
          , model: default_model()
          , temperature: DEFAULT_TEMPERATURE
          , max_tokens: DEFAULT_MAX_TOKENS
          , credential: None
        }
    }

    /// Check every field, reporting all violations at once
    pub fn validate(&self) -> Result<(), Error>
    {   let mut errors = Vec::new();

        if self.prompt.trim().is_empty()
        {   errors.push(FieldError::new("prompt", "must not be empty"));
        }
        if self.model.trim().is_empty()
        {   errors.push(FieldError::new("model", "must not be empty"));
        }
        if !self.temperature.is_finite()
          || self.temperature < MIN_TEMPERATURE
          || self.temperature > MAX_TEMPERATURE
        {   errors.push(FieldError::new(
              "temperature",
              format!(
                "must be between {} and {}",
                MIN_TEMPERATURE, MAX_TEMPERATURE
              )
            ));
        }
        if self.max_tokens < MIN_MAX_TOKENS
          || self.max_tokens > MAX_MAX_TOKENS
        {   errors.push(FieldError::new(
              "maxTokens",
              format!(
                "must be between {} and {}",
                MIN_MAX_TOKENS, MAX_MAX_TOKENS
              )
            ));
        }

        if errors.is_empty()
        {   Ok(())
        } else
        {   Err(Error::Validation(errors))
        }
    }
}

// Hand-written so the credential never reaches the logs.
impl std::fmt::Debug for CompletionRequest
{   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {   f.debug_struct("CompletionRequest")
          .field("prompt", &self.prompt)
          .field("model", &self.model)
          .field("temperature", &self.temperature)
          .field("max_tokens", &self.max_tokens)
          .field(
            "credential",
            &self.credential.as_ref().map(|_| "<redacted>")
          )
          .finish()
    }
}

/// A token the model considered but did not choose
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alternative
{   pub token: String
  , pub probability: f64
}

/// Probability record for one generated token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenProbability
{   /// The chosen token
    pub token: String
  , /// exp(logprob) of the chosen token
    pub probability: f64
  , /// Other candidates, most probable first
    pub alternatives: Vec<Alternative>
}

/// Token accounting reported by the upstream
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage
{   pub prompt_tokens: u32
  , pub completion_tokens: u32
  , pub total_tokens: u32
}

/// Completion result returned to the page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionResult
{   /// Generated text
    pub text: String
  , /// Per-token probabilities in generation order
    pub token_probabilities: Vec<TokenProbability>
  , pub usage: Usage
  , /// Seconds spent in the upstream call
    pub response_time: f64
  , /// Model that generated it
    pub model: String
}
