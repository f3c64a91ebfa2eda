//! Turn upstream log-probabilities into per-token probability records

use crate::providers::openai::{ChoiceLogprobs, TokenLogprob};
use crate::request::{Alternative, TokenProbability};

/// Normalize one choice's log-probabilities.
/// Missing or null data is a valid, empty result.
pub fn normalize_choice(
  logprobs: Option<&ChoiceLogprobs>
) -> Vec<TokenProbability>
{   match logprobs.and_then(|l| l.content.as_deref())
    {   Some(entries) => normalize(entries)
      , None => Vec::new()
    }
}

/// Convert each entry, keeping generation order.
pub fn normalize(entries: &[TokenLogprob]) -> Vec<TokenProbability>
{   entries.iter().map(normalize_entry).collect()
}

fn normalize_entry(entry: &TokenLogprob) -> TokenProbability
{   // exact text match only; " Tea" and "tea" stay
    let mut alternatives: Vec<Alternative>
      = entry.top_logprobs
        .iter()
        .filter(|alt| alt.token != entry.token)
        .map(|alt| Alternative
          {   token: alt.token.clone()
            , probability: alt.logprob.exp()
          })
        .collect();
    alternatives.sort_by(|a, b| b.probability.total_cmp(&a.probability));

    TokenProbability
    {   token: entry.token.clone()
      , probability: entry.logprob.exp()
      , alternatives
    }
}

#[cfg(test)]
mod tests
{   use super::*;
    use crate::providers::openai::TopLogprob;

    const EPS: f64 = 1e-9;

    fn top(token: &str, p: f64) -> TopLogprob
    {   TopLogprob
        {   token: token.to_string()
          , logprob: p.ln()
        }
    }

    fn entry(token: &str, p: f64, alts: Vec<TopLogprob>) -> TokenLogprob
    {   TokenLogprob
        {   token: token.to_string()
          , logprob: p.ln()
          , top_logprobs: alts
        }
    }

    #[test]
    fn tea_example()
    {   let input = vec![entry(
          "Tea",
          0.8,
          vec![top("Coffee", 0.15), top("Tea", 0.8), top("Water", 0.05)]
        )];
        let out = normalize(&input);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].token, "Tea");
        assert!((out[0].probability - 0.8).abs() < EPS);
        let alts: Vec<&str>
          = out[0].alternatives.iter().map(|a| a.token.as_str()).collect();
        assert_eq!(alts, vec!["Coffee", "Water"]);
        assert!((out[0].alternatives[0].probability - 0.15).abs() < EPS);
        assert!((out[0].alternatives[1].probability - 0.05).abs() < EPS);
    }

    #[test]
    fn probability_is_exp_of_logprob()
    {   let raw = TokenLogprob
        {   token: "x".to_string()
          , logprob: -3.25
          , top_logprobs: vec![TopLogprob
            {   token: "y".to_string()
              , logprob: -0.5
            }]
        };
        let out = normalize(std::slice::from_ref(&raw));
        assert!((out[0].probability - (-3.25f64).exp()).abs() < EPS);
        assert!(
          (out[0].alternatives[0].probability - (-0.5f64).exp()).abs()
            < EPS
        );
    }

    #[test]
    fn near_duplicates_are_kept()
    {   let input = vec![entry(
          "Tea",
          0.5,
          vec![top("Tea", 0.5), top(" Tea", 0.2), top("tea", 0.1)]
        )];
        let out = normalize(&input);
        let alts: Vec<&str>
          = out[0].alternatives.iter().map(|a| a.token.as_str()).collect();
        assert_eq!(alts, vec![" Tea", "tea"]);
    }

    #[test]
    fn alternatives_are_sorted_descending()
    {   let input = vec![entry(
          "a",
          0.3,
          vec![
            top("b", 0.01), top("c", 0.25), top("a", 0.3),
            top("d", 0.2), top("e", 0.24)
          ]
        )];
        let out = normalize(&input);
        let probs: Vec<f64>
          = out[0].alternatives.iter().map(|a| a.probability).collect();
        assert_eq!(probs.len(), 4);
        assert!(probs.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(out[0].alternatives[0].token, "c");
    }

    #[test]
    fn generation_order_is_preserved()
    {   // second token is more probable than the first; order must not change
        let input = vec![
          entry("The", 0.4, vec![]),
          entry(" cat", 0.9, vec![]),
          entry(" sat", 0.1, vec![]),
        ];
        let tokens: Vec<String>
          = normalize(&input).into_iter().map(|t| t.token).collect();
        assert_eq!(tokens, vec!["The", " cat", " sat"]);
    }

    #[test]
    fn missing_logprobs_yield_empty()
    {   assert!(normalize_choice(None).is_empty());
        let null_content = ChoiceLogprobs { content: None };
        assert!(normalize_choice(Some(&null_content)).is_empty());
        let empty = ChoiceLogprobs { content: Some(vec![]) };
        assert!(normalize_choice(Some(&empty)).is_empty());
    }
}
