//! Passkey gate for the page

use log::{debug, error, warn};

/// Check a supplied passkey against the server secret
pub fn verify_passkey(
  configured: Option<&str>
, supplied: &str
) -> Result<(), crate::error::Error>
{   let secret = match configured
    {   Some(secret) if !secret.is_empty() => secret
      , _ => {
          error!("{} is not configured", crate::config::PASSKEY_VAR);
          return Err(crate::error::Error::InvalidConfiguration(
            format!("{} is not set", crate::config::PASSKEY_VAR)
          ));
        }
    };

    if constant_time_eq(secret.as_bytes(), supplied.as_bytes())
    {   debug!("Passkey accepted");
        Ok(())
    } else
    {   warn!("Passkey rejected");
        Err(crate::error::Error::Unauthorized)
    }
}

// Runtime depends only on the lengths, not on where bytes differ.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool
{   if a.len() != b.len()
    {   return false;
    }
    a.iter()
      .zip(b.iter())
      .fold(0u8, |acc, (x, y)| acc | (x ^ y))
      == 0
}
