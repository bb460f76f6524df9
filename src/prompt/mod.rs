//! Few-shot prompt assembly
//!
//! Builds the system instruction sent to the classification service: the
//! category definition block, followed by a bounded window of previously
//! corrected examples. The output is a pure function of its inputs, so
//! identical category definitions and example pools always produce the
//! same instruction text.

use crate::config::CategoryDef;
use crate::identity::RecordId;
use crate::labels::LabelAssignment;

/// Longest example text embedded in the prompt, in characters
const EXAMPLE_TEXT_LIMIT: usize = 100;

const INSTRUCTION_HEADER: &str = "You are a precise text classification assistant. \
For the given text, decide for every category whether it applies (1) or not (0). \
Respond with a JSON object containing every category exactly once.";

/// Build the system instruction from category definitions and up to
/// `max_examples` labeled examples.
///
/// `pool` is expected most-recently-added first (the order of
/// [`crate::labels::LabelStore::example_pool`]); the most recent window
/// is kept and presented oldest first. An empty pool or
/// `max_examples == 0` yields a valid definitions-only prompt.
pub fn build(
    categories: &[CategoryDef],
    pool: &[&LabelAssignment],
    max_examples: usize,
) -> String {
    render(categories, pool.iter().copied(), max_examples)
}

/// Leave-one-out variant: like [`build`], but with one record excluded
/// from the example window.
pub fn build_excluding(
    categories: &[CategoryDef],
    pool: &[&LabelAssignment],
    excluded: &RecordId,
    max_examples: usize,
) -> String {
    render(
        categories,
        pool.iter().copied().filter(|a| a.record_id != *excluded),
        max_examples,
    )
}

fn render<'a, I>(categories: &[CategoryDef], pool: I, max_examples: usize) -> String
where
    I: Iterator<Item = &'a LabelAssignment>,
{
    let mut prompt = String::new();
    prompt.push_str(INSTRUCTION_HEADER);
    prompt.push_str("\n\nCategories:\n");
    for cat in categories {
        prompt.push_str(&format!("\u{2022} {}: {}\n", cat.name, cat.description));
    }

    // Most recent window, presented oldest first
    let mut window: Vec<&LabelAssignment> = pool.take(max_examples).collect();
    window.reverse();

    if !window.is_empty() {
        prompt.push_str("\nExamples:\n");
        for (i, example) in window.iter().enumerate() {
            let labels = example.category_values.active_categories();
            let labels = if labels.is_empty() {
                "none".to_string()
            } else {
                labels.join(", ")
            };
            prompt.push_str(&format!(
                "{}. Text: {}\n   Categories: {}\n\n",
                i + 1,
                truncate(&example.text_content),
                labels
            ));
        }
    }

    prompt
}

fn truncate(text: &str) -> String {
    let mut out: String = text.chars().take(EXAMPLE_TEXT_LIMIT).collect();
    if text.chars().count() > EXAMPLE_TEXT_LIMIT {
        out.push_str("...");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity;
    use crate::labels::{CategoryValues, LabelSource};
    use chrono::Utc;

    fn categories() -> Vec<CategoryDef> {
        vec![
            CategoryDef {
                name: "billing".to_string(),
                description: "Payment and invoicing issues".to_string(),
            },
            CategoryDef {
                name: "technical".to_string(),
                description: "Bugs and technical problems".to_string(),
            },
        ]
    }

    fn example(text: &str, billing: bool) -> LabelAssignment {
        LabelAssignment {
            record_id: identity::identify(text),
            text_content: text.to_string(),
            category_values: CategoryValues::from_pairs([
                ("billing", billing),
                ("technical", false),
            ]),
            source: LabelSource::Manual,
            model_ref: None,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_cold_start_definitions_only() {
        let prompt = build(&categories(), &[], 30);
        assert!(prompt.contains("\u{2022} billing: Payment and invoicing issues"));
        assert!(prompt.contains("\u{2022} technical: Bugs and technical problems"));
        assert!(!prompt.contains("Examples:"));
    }

    #[test]
    fn test_max_examples_zero_with_nonempty_pool() {
        let ex = example("some labeled text", true);
        let pool = vec![&ex];
        let prompt = build(&categories(), &pool, 0);
        assert!(prompt.contains("Categories:"));
        assert!(!prompt.contains("Examples:"));
        assert!(!prompt.contains("some labeled text"));
    }

    #[test]
    fn test_examples_window_most_recent_presented_oldest_first() {
        // Pool is most-recent-first: newest, middle, oldest
        let newest = example("newest", true);
        let middle = example("middle", false);
        let oldest = example("oldest", true);
        let pool = vec![&newest, &middle, &oldest];

        let prompt = build(&categories(), &pool, 2);
        // Window keeps the two most recent, presented oldest first
        assert!(!prompt.contains("oldest"));
        let middle_pos = prompt.find("1. Text: middle").unwrap();
        let newest_pos = prompt.find("2. Text: newest").unwrap();
        assert!(middle_pos < newest_pos);
    }

    #[test]
    fn test_labels_rendered_or_none() {
        let with_label = example("has billing", true);
        let without = example("has nothing", false);
        let pool = vec![&without, &with_label];
        let prompt = build(&categories(), &pool, 10);
        assert!(prompt.contains("Categories: billing\n"));
        assert!(prompt.contains("Categories: none\n"));
    }

    #[test]
    fn test_long_example_text_truncated() {
        let long_text = "x".repeat(150);
        let ex = example(&long_text, true);
        let pool = vec![&ex];
        let prompt = build(&categories(), &pool, 5);
        let expected = format!("Text: {}...", "x".repeat(100));
        assert!(prompt.contains(&expected));
        assert!(!prompt.contains(&"x".repeat(101)));
    }

    #[test]
    fn test_build_is_deterministic() {
        let a = example("one", true);
        let b = example("two", false);
        let pool = vec![&a, &b];
        assert_eq!(build(&categories(), &pool, 5), build(&categories(), &pool, 5));
    }

    #[test]
    fn test_build_excluding_drops_only_that_record() {
        let keep = example("kept example", true);
        let drop = example("dropped example", false);
        let pool = vec![&keep, &drop];

        let prompt = build_excluding(&categories(), &pool, &drop.record_id, 10);
        assert!(prompt.contains("kept example"));
        assert!(!prompt.contains("dropped example"));
    }
}
