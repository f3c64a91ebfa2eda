use std::time::Instant;
use log::{debug, error, info};
use crate::config::CredentialStore;
use crate::error::Error;
use crate::providers::openai::{self, ChatRequest, OpenAiClient};
use crate::request::{CompletionRequest, CompletionResult, Usage};

/// Forwards completion requests to the upstream, one call each
#[derive(Debug, Clone)]
pub struct CompletionForwarder
{   client: OpenAiClient
  , credentials: CredentialStore
}

impl CompletionForwarder
{   pub fn new(
      client: OpenAiClient
    , credentials: CredentialStore
    ) -> Self
    {   debug!("Creating CompletionForwarder");
        CompletionForwarder
        {   client
          , credentials
        }
    }

    pub fn credentials(&self) -> &CredentialStore
    {   &self.credentials
    }

    /// Caller's credential wins over the process-wide one
    fn api_key_for(
      &self
    , request: &CompletionRequest
    ) -> Result<String, Error>
    {   if let Some(key) = request.credential.as_ref()
          .filter(|k| !k.trim().is_empty())
        {   debug!("Using caller-supplied credential");
            return Ok(key.clone());
        }
        self.server_api_key()
    }

    fn server_api_key(&self) -> Result<String, Error>
    {   self.credentials().get().ok_or_else(|| {
          error!("No upstream credential configured");
          Error::MissingApiKey("OpenAI".to_string())
        })
    }

    /// Validate, forward once, normalize. Upstream failures pass through.
    pub async fn complete(
      &self
    , request: CompletionRequest
    ) -> Result<CompletionResult, Error>
    {   request.validate()?;
        let api_key = self.api_key_for(&request)?;
        let model = openai::resolve_model(&request.model);

        let chat_request = ChatRequest::with_logprobs(
          model.clone(),
          request.prompt,
          request.temperature,
          request.max_tokens
        );

        let started = Instant::now();
        let response = self.client.chat(&api_key, &chat_request).await?;
        let response_time = started.elapsed().as_secs_f64();

        let choice = response.choices.into_iter().next()
          .ok_or_else(|| {
            error!("No choices in response");
            Error::NoChoicesInResponse
          })?;

        let token_probabilities
          = crate::normalize::normalize_choice(choice.logprobs.as_ref());
        let usage = response.usage
          .map(|u| Usage
            {   prompt_tokens: u.prompt_tokens
              , completion_tokens: u.completion_tokens
              , total_tokens: u.total_tokens
            })
          .unwrap_or_default();

        // upstream names the dated snapshot it actually ran
        let model = response.model
          .filter(|m| !m.is_empty())
          .unwrap_or(model);

        info!(
          "Completion from {} in {:.3}s ({} tokens)",
          model, response_time, usage.total_tokens
        );

        Ok(CompletionResult
        {   text: choice.message.content.unwrap_or_default()
          , token_probabilities
          , usage
          , response_time
          , model
        })
    }

    /// Model identifiers visible to the server credential
    pub async fn models(&self) -> Result<Vec<String>, Error>
    {   let api_key = self.server_api_key()?;
        self.client.list_models(&api_key).await
    }
}
