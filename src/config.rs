//! Configuration for the tokenprobe server and its upstream

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, RwLock};
use log::{debug, info, warn};

/// Environment variable holding the upstream API key
pub const API_KEY_VAR: &str = "OPENAI_API_KEY";
/// Environment variable holding the access passkey
pub const PASSKEY_VAR: &str = "ACCESS_PASSKEY";
pub const BIND_VAR: &str = "TOKENPROBE_BIND";
pub const API_BASE_VAR: &str = "OPENAI_API_BASE";

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3001";

/// Upstream API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig
{   /// API base URL
    pub api_base: String
  , /// Request timeout in seconds; transport default when unset
    pub timeout_secs: Option<u64>
}

impl Default for UpstreamConfig
{   fn default() -> Self
    {   UpstreamConfig
        {   api_base: crate::providers::openai::OPENAI_API_BASE.to_string()
          , timeout_secs: None
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig
{   /// Listen address
    pub bind_addr: String
  , /// Upstream API configuration
    pub upstream: UpstreamConfig
}

impl Default for ServerConfig
{   fn default() -> Self
    {   ServerConfig
        {   bind_addr: DEFAULT_BIND_ADDR.to_string()
          , upstream: UpstreamConfig::default()
        }
    }
}

impl ServerConfig
{   /// Load from a JSON file; missing keys take defaults
    pub fn from_file(path: &Path)
      -> Result<Self, crate::error::Error>
    {   debug!("Loading config from {}", path.display());
        let contents = std::fs::read_to_string(path).map_err(|e| {
          crate::error::Error::InvalidConfiguration(
            format!("{}: {}", path.display(), e)
          )
        })?;
        serde_json::from_str(&contents).map_err(|e| {
          crate::error::Error::InvalidConfiguration(
            format!("{}: {}", path.display(), e)
          )
        })
    }

    /// Apply non-secret overrides from the environment
    pub fn apply_env(mut self) -> Self
    {   if let Ok(addr) = std::env::var(BIND_VAR)
        {   self.bind_addr = addr;
        }
        if let Ok(base) = std::env::var(API_BASE_VAR)
        {   self.upstream.api_base = base;
        }
        self
    }
}

/// Read a secret from the environment, treating blank as unset
pub fn secret_from_env(var: &str) -> Option<String>
{   match std::env::var(var)
    {   Ok(value) if !value.trim().is_empty() => Some(value)
      , _ => None
    }
}

/// Process-wide upstream credential.
/// Clones share the same slot.
#[derive(Clone, Default)]
pub struct CredentialStore
{   key: Arc<RwLock<Option<String>>>
}

impl CredentialStore
{   pub fn new(key: Option<String>) -> Self
    {   CredentialStore
        {   key: Arc::new(RwLock::new(key))
        }
    }

    /// Store built from `OPENAI_API_KEY`
    pub fn from_env() -> Self
    {   let store = CredentialStore::default();
        store.load_from_env();
        store
    }

    /// Reload from `OPENAI_API_KEY`; returns whether a key was found
    pub fn load_from_env(&self) -> bool
    {   self.load_from_var(API_KEY_VAR)
    }

    pub fn load_from_var(&self, var: &str) -> bool
    {   match secret_from_env(var)
        {   Some(key) => {
              info!("Loaded upstream credential from {}", var);
              self.set(key);
              true
            }
          , None => {
              warn!("{} not set; callers must supply a credential", var);
              self.clear();
              false
            }
        }
    }

    pub fn set(&self, key: String)
    {   debug!("Setting upstream credential");
        let mut slot = self.key.write()
          .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Some(key);
    }

    pub fn clear(&self)
    {   debug!("Clearing upstream credential");
        let mut slot = self.key.write()
          .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = None;
    }

    pub fn get(&self) -> Option<String>
    {   self.key.read()
          .unwrap_or_else(|poisoned| poisoned.into_inner())
          .clone()
    }

    pub fn is_set(&self) -> bool
    {   self.get().is_some()
    }
}

impl std::fmt::Debug for CredentialStore
{   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {   f.debug_struct("CredentialStore")
          .field("is_set", &self.is_set())
          .finish()
    }
}

#[cfg(test)]
mod tests
{   use super::*;

    #[test]
    fn defaults_point_at_openai()
    {   let config = ServerConfig::default();
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(config.upstream.api_base, "https://api.openai.com/v1");
        assert!(config.upstream.timeout_secs.is_none());
    }

    #[test]
    fn partial_json_keeps_defaults()
    {   let config: ServerConfig = serde_json::from_str(
          r#"{"upstream":{"timeout_secs":30}}"#
        ).unwrap();
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(config.upstream.timeout_secs, Some(30));
        assert_eq!(config.upstream.api_base, "https://api.openai.com/v1");
    }

    #[test]
    fn missing_file_is_configuration_error()
    {   let err = ServerConfig::from_file(
          Path::new("/nonexistent/tokenprobe.json")
        ).unwrap_err();
        assert!(matches!(
          err,
          crate::error::Error::InvalidConfiguration(_)
        ));
    }

    #[test]
    fn store_set_get_clear()
    {   let store = CredentialStore::new(None);
        assert!(!store.is_set());
        store.set("sk-one".to_string());
        assert_eq!(store.get().as_deref(), Some("sk-one"));

        // clones share the slot
        let other = store.clone();
        other.set("sk-two".to_string());
        assert_eq!(store.get().as_deref(), Some("sk-two"));

        store.clear();
        assert!(other.get().is_none());
    }

    #[test]
    fn store_loads_from_named_var()
    {   let var = "TOKENPROBE_TEST_CREDENTIAL_LOAD";
        std::env::set_var(var, "sk-env");
        let store = CredentialStore::default();
        assert!(store.load_from_var(var));
        assert_eq!(store.get().as_deref(), Some("sk-env"));

        std::env::set_var(var, "   ");
        assert!(!store.load_from_var(var));
        assert!(store.get().is_none());
        std::env::remove_var(var);
    }

    #[test]
    fn debug_never_prints_key()
    {   let store = CredentialStore::new(Some("sk-hidden".to_string()));
        let shown = format!("{:?}", store);
        assert!(!shown.contains("sk-hidden"));
    }
}
