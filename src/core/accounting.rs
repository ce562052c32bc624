//! Token and cost estimates for display.
//!
//! Token counts are whitespace-delimited word counts, not real tokenizer
//! output. Expect them to undercount for code and non-Latin scripts.

use crate::core::catalog::CatalogEntry;
use crate::core::constants::{DEFAULT_CONTEXT_LENGTH, TOKENS_PER_PRICE_UNIT};
use crate::core::message::{Message, Role};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TokenStats {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub input_cost: f64,
    pub output_cost: f64,
    pub total_cost: f64,
    pub context_limit: u32,
}

fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

/// User turns count as input, assistant turns as output; system text is
/// not counted. Missing pricing costs nothing.
pub fn compute_stats(messages: &[Message], entry: Option<&CatalogEntry>) -> TokenStats {
    let (input_tokens, output_tokens) =
        messages
            .iter()
            .fold((0u64, 0u64), |(input, output), message| match message.role {
                Role::User => (input + message.content.word_count() as u64, output),
                Role::Assistant => (input, output + message.content.word_count() as u64),
                Role::System => (input, output),
            });

    let (prompt_price, completion_price) = entry
        .map(|entry| (entry.pricing.prompt, entry.pricing.completion))
        .unwrap_or((0.0, 0.0));

    let input_cost = input_tokens as f64 * (prompt_price / TOKENS_PER_PRICE_UNIT);
    let output_cost = output_tokens as f64 * (completion_price / TOKENS_PER_PRICE_UNIT);

    TokenStats {
        input_tokens,
        output_tokens,
        total_tokens: input_tokens + output_tokens,
        input_cost: round6(input_cost),
        output_cost: round6(output_cost),
        total_cost: round6(input_cost + output_cost),
        context_limit: entry
            .map(|entry| entry.context_length)
            .unwrap_or(DEFAULT_CONTEXT_LENGTH),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::Pricing;
    use crate::utils::test_utils::catalog_entry;

    #[test]
    fn empty_conversation_is_all_zero() {
        let stats = compute_stats(&[], Some(&catalog_entry("m", 8192)));
        assert_eq!(stats.input_tokens, 0);
        assert_eq!(stats.output_tokens, 0);
        assert_eq!(stats.total_tokens, 0);
        assert_eq!(stats.input_cost, 0.0);
        assert_eq!(stats.output_cost, 0.0);
        assert_eq!(stats.total_cost, 0.0);
        assert_eq!(stats.context_limit, 8192);
    }

    #[test]
    fn words_are_split_by_role() {
        let messages = vec![
            Message::system("ignored system words here"),
            Message::user("one two  three\nfour"),
            Message::assistant("five six"),
            Message::user_with_images("seven", vec!["data:image/png;base64,AA".into()]),
        ];
        let stats = compute_stats(&messages, None);
        assert_eq!(stats.input_tokens, 5);
        assert_eq!(stats.output_tokens, 2);
        assert_eq!(stats.total_tokens, 7);
        assert_eq!(stats.total_cost, 0.0);
        assert_eq!(stats.context_limit, 4096);
    }

    #[test]
    fn costs_use_per_million_prices_rounded_to_six_places() {
        let mut entry = catalog_entry("m", 4096);
        entry.pricing = Pricing {
            prompt: 3.0,
            completion: 15.0,
            image: 0.0,
        };
        let messages = vec![
            Message::user("a b c"),
            Message::assistant("d e f g h i j"),
        ];
        let stats = compute_stats(&messages, Some(&entry));
        assert!((stats.input_cost - 0.000009).abs() < 1e-12);
        assert!((stats.output_cost - 0.000105).abs() < 1e-12);
        assert!((stats.total_cost - 0.000114).abs() < 1e-12);
    }

    #[test]
    fn tiny_costs_round_away() {
        let mut entry = catalog_entry("m", 4096);
        entry.pricing.prompt = 0.1;
        let stats = compute_stats(&[Message::user("word")], Some(&entry));
        assert_eq!(stats.input_cost, 0.0);
    }
}
