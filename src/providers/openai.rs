use serde::{Deserialize, Serialize};
use log::{debug, trace, error};
use std::time::Duration;

pub const OPENAI_API_BASE: &str
  = "https://api.openai.com/v1";

/// Alternatives requested per generated token
pub const TOP_LOGPROBS: u8 = 5;

const LEGACY_MODEL_PREFIX: &str = "text-davinci";
const LEGACY_REPLACEMENT: &str = "gpt-3.5-turbo";

/// Map retired completion-era models onto their chat equivalent
pub fn resolve_model(requested: &str) -> String
{   if requested.starts_with(LEGACY_MODEL_PREFIX)
    {   debug!(
          "Substituting {} for legacy model {}",
          LEGACY_REPLACEMENT, requested
        );
        LEGACY_REPLACEMENT.to_string()
    } else
    {   requested.to_string()
    }
}

// ===== Message Types =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage
{   pub role: String
  , #[serde(default)]
    pub content: Option<String>
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest
{   pub model: String
  , pub messages: Vec<ChatMessage>
  , pub temperature: f32
  , pub max_tokens: u32
  , pub logprobs: bool
  , pub top_logprobs: u8
  , pub stream: bool
}

impl ChatRequest
{   /// Single user message with log-probability reporting enabled
    pub fn with_logprobs(
      model: String
    , prompt: String
    , temperature: f32
    , max_tokens: u32
    ) -> Self
    {   ChatRequest
        {   model
          , messages: vec![
              ChatMessage
              {   role: "user".to_string()
                , content: Some(prompt)
              }
            ]
          , temperature
          , max_tokens
          , logprobs: true
          , top_logprobs: TOP_LOGPROBS
          , stream: false
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse
{   #[serde(default)]
    pub model: Option<String>
  , pub choices: Vec<Choice>
  , #[serde(default)]
    pub usage: Option<ChatUsage>
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice
{   pub message: ChatMessage
  , #[serde(default)]
    pub logprobs: Option<ChoiceLogprobs>
  , pub finish_reason: Option<String>
}

/// The `logprobs` object of one choice
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChoiceLogprobs
{   #[serde(default)]
    pub content: Option<Vec<TokenLogprob>>
}

/// Chosen token at one generation step with its runners-up
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TokenLogprob
{   pub token: String
  , pub logprob: f64
  , #[serde(default)]
    pub top_logprobs: Vec<TopLogprob>
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TopLogprob
{   pub token: String
  , pub logprob: f64
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatUsage
{   pub prompt_tokens: u32
  , pub completion_tokens: u32
  , pub total_tokens: u32
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelsResponse
{   pub data: Vec<ModelData>
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelData
{   pub id: String
  , #[serde(default)]
    pub owned_by: Option<String>
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope
{   error: ErrorDetail
}

#[derive(Debug, Deserialize)]
struct ErrorDetail
{   message: String
}

/// Pull the human-readable message out of an upstream error body
pub fn upstream_error_message(body: &str) -> String
{   match serde_json::from_str::<ErrorEnvelope>(body)
    {   Ok(envelope) => envelope.error.message
      , Err(_) if body.trim().is_empty() => "Unknown error".to_string()
      , Err(_) => body.to_string()
    }
}

// ===== OpenAI Client =====

/// Stateless HTTP client for the OpenAI API
#[derive(Debug, Clone)]
pub struct OpenAiClient
{   api_base: String
  , http_client: reqwest::Client
}

impl OpenAiClient
{   pub fn new(
      api_base: &str
    , timeout_secs: Option<u64>
    ) -> Result<Self, crate::error::Error>
    {   debug!("Creating OpenAiClient for {}", api_base);
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = timeout_secs
        {   builder = builder.timeout(Duration::from_secs(secs));
        }
        let http_client = builder.build().map_err(|e| {
          error!("Failed to build HTTP client: {}", e);
          crate::error::Error::InvalidConfiguration(e.to_string())
        })?;

        Ok(OpenAiClient
        {   api_base: api_base.trim_end_matches('/').to_string()
          , http_client
        })
    }

    pub fn api_base(&self) -> &str
    {   &self.api_base
    }

    /// One chat completion call, no retry
    pub async fn chat(
      &self
    , api_key: &str
    , request: &ChatRequest
    ) -> Result<ChatResponse, crate::error::Error>
    {   debug!("Sending chat completion for: {}", request.model);
        trace!(
          "OpenAI request: model={} temperature={} max_tokens={}",
          request.model, request.temperature, request.max_tokens
        );

        let response = self.http_client
          .post(format!("{}/chat/completions", self.api_base))
          .header("Authorization", format!("Bearer {}", api_key))
          .header("Content-Type", "application/json")
          .json(request)
          .send()
          .await
          .map_err(|e| {
            error!("HTTP error: {}", e);
            crate::error::Error::HttpError(e.to_string())
          })?;

        let status = response.status();
        trace!("OpenAI response status: {}", status);

        if !status.is_success()
        {   let error_text = response.text().await
              .unwrap_or_default();
            let message = upstream_error_message(&error_text);
            error!("OpenAI API error ({}): {}", status, message);
            return Err(crate::error::Error::Upstream
            {   status: Some(status.as_u16())
              , message
            });
        }

        response.json().await.map_err(|e| {
          error!("Parse error: {}", e);
          crate::error::Error::ParseError(e.to_string())
        })
    }

    /// List model identifiers visible to the key
    pub async fn list_models(
      &self
    , api_key: &str
    ) -> Result<Vec<String>, crate::error::Error>
    {   debug!("Fetching model list");

        let response = self.http_client
          .get(format!("{}/models", self.api_base))
          .header("Authorization", format!("Bearer {}", api_key))
          .send()
          .await
          .map_err(|e| {
            error!("Failed to fetch models: {}", e);
            crate::error::Error::HttpError(e.to_string())
          })?;

        let status = response.status();
        trace!("Models response status: {}", status);

        if !status.is_success()
        {   let error_text = response.text().await
              .unwrap_or_default();
            let message = upstream_error_message(&error_text);
            error!("Failed to get models: {}", message);
            return Err(crate::error::Error::Upstream
            {   status: Some(status.as_u16())
              , message
            });
        }

        let models_response: ModelsResponse
          = response.json().await.map_err(|e| {
            error!("Parse error: {}", e);
            crate::error::Error::ParseError(e.to_string())
          })?;

        let mut model_names: Vec<String>
          = models_response.data
            .into_iter()
            .map(|m| m.id)
            .collect();
        model_names.sort();

        debug!("Retrieved {} models", model_names.len());
        Ok(model_names)
    }
}

#[cfg(test)]
mod tests
{   use super::*;

    #[test]
    fn legacy_models_are_substituted()
    {   assert_eq!(resolve_model("text-davinci-003"), "gpt-3.5-turbo");
        assert_eq!(resolve_model("text-davinci-002"), "gpt-3.5-turbo");
        assert_eq!(resolve_model("gpt-4o-mini"), "gpt-4o-mini");
        // prefix match only
        assert_eq!(
          resolve_model("my-text-davinci"),
          "my-text-davinci"
        );
    }

    #[test]
    fn request_asks_for_five_alternatives()
    {   let req = ChatRequest::with_logprobs(
          "gpt-3.5-turbo".to_string(),
          "Hello".to_string(),
          0.5,
          16
        );
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["logprobs"], true);
        assert_eq!(json["top_logprobs"], 5);
        assert_eq!(json["stream"], false);
        assert_eq!(json["max_tokens"], 16);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "Hello");
    }

    #[test]
    fn response_with_logprobs_parses()
    {   let body = r#"{
          "id": "chatcmpl-1",
          "model": "gpt-3.5-turbo-0125",
          "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": "Tea"},
            "logprobs": {"content": [{
              "token": "Tea", "logprob": -0.22, "bytes": [84, 101, 97],
              "top_logprobs": [
                {"token": "Tea", "logprob": -0.22, "bytes": [84, 101, 97]},
                {"token": "Coffee", "logprob": -1.9, "bytes": null}
              ]
            }]},
            "finish_reason": "stop"
          }],
          "usage": {"prompt_tokens": 9, "completion_tokens": 1, "total_tokens": 10}
        }"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        let choice = &parsed.choices[0];
        assert_eq!(choice.message.content.as_deref(), Some("Tea"));
        let content = choice.logprobs.as_ref()
          .and_then(|l| l.content.as_ref())
          .unwrap();
        assert_eq!(content.len(), 1);
        assert_eq!(content[0].top_logprobs[1].token, "Coffee");
        assert_eq!(parsed.usage.unwrap().total_tokens, 10);
    }

    #[test]
    fn response_without_logprobs_parses()
    {   let body = r#"{
          "choices": [{
            "message": {"role": "assistant", "content": "Hi"},
            "logprobs": null,
            "finish_reason": "stop"
          }]
        }"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.choices[0].logprobs.is_none());
        assert!(parsed.usage.is_none());
    }

    #[test]
    fn error_message_prefers_envelope()
    {   assert_eq!(
          upstream_error_message(
            r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#
          ),
          "Incorrect API key provided"
        );
        assert_eq!(upstream_error_message("Bad Gateway"), "Bad Gateway");
        assert_eq!(upstream_error_message(""), "Unknown error");
    }

    #[test]
    fn trailing_slash_is_trimmed()
    {   let client = OpenAiClient::new("http://localhost:9/v1/", None)
          .unwrap();
        assert_eq!(client.api_base(), "http://localhost:9/v1");
    }
}
