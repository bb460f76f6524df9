//! Batch selection strategies
//!
//! Picks the next set of unlabeled records to send for prediction.
//! All strategies are deterministic: length-based methods break ties by
//! record id, and `random` samples from an id-sorted pool with a seeded
//! RNG, so a given pool, method, and seed always produce the same batch.

use crate::dataset::Record;
use crate::identity::RecordId;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Default seed for the `random` method
pub const DEFAULT_RANDOM_SEED: u64 = 42;

/// How the next batch of unlabeled records is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMethod {
    /// Longest texts first
    Longest,
    /// Shortest texts first
    Shortest,
    /// Texts closest to the mean length of the unlabeled pool
    Medium,
    /// Seeded pseudo-random sample
    Random,
}

impl fmt::Display for SelectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Longest => "longest",
            Self::Shortest => "shortest",
            Self::Medium => "medium",
            Self::Random => "random",
        };
        f.write_str(name)
    }
}

impl FromStr for SelectionMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "longest" => Ok(Self::Longest),
            "shortest" => Ok(Self::Shortest),
            "medium" => Ok(Self::Medium),
            "random" => Ok(Self::Random),
            other => Err(format!(
                "unknown selection method '{other}' (expected longest, shortest, medium, or random)"
            )),
        }
    }
}

fn text_len(record: &Record) -> usize {
    record.text_content.chars().count()
}

fn by_id(a: &Record, b: &Record) -> Ordering {
    a.id.cmp(&b.id)
}

/// Select up to `batch_size` unlabeled records from `pool`.
///
/// Records whose id is in `labeled_ids` are never returned. When fewer
/// than `batch_size` unlabeled records remain, the whole filtered pool is
/// returned.
pub fn select(
    pool: &[Record],
    labeled_ids: &HashSet<RecordId>,
    batch_size: usize,
    method: SelectionMethod,
    seed: Option<u64>,
) -> Vec<Record> {
    let mut filtered: Vec<&Record> = pool
        .iter()
        .filter(|r| !labeled_ids.contains(&r.id))
        .collect();

    match method {
        SelectionMethod::Longest => {
            filtered.sort_by(|a, b| text_len(b).cmp(&text_len(a)).then_with(|| by_id(a, b)));
        }
        SelectionMethod::Shortest => {
            filtered.sort_by(|a, b| text_len(a).cmp(&text_len(b)).then_with(|| by_id(a, b)));
        }
        SelectionMethod::Medium => {
            let mean = if filtered.is_empty() {
                0.0
            } else {
                filtered.iter().map(|r| text_len(r) as f64).sum::<f64>() / filtered.len() as f64
            };
            filtered.sort_by(|a, b| {
                let da = (text_len(a) as f64 - mean).abs();
                let db = (text_len(b) as f64 - mean).abs();
                da.partial_cmp(&db)
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| by_id(a, b))
            });
        }
        SelectionMethod::Random => {
            // Sort first so the sample depends only on pool membership,
            // not on input order.
            filtered.sort_by(|a, b| by_id(a, b));
            let mut rng = StdRng::seed_from_u64(seed.unwrap_or(DEFAULT_RANDOM_SEED));
            let sampled: Vec<&Record> = filtered
                .choose_multiple(&mut rng, batch_size.min(filtered.len()))
                .copied()
                .collect();
            filtered = sampled;
        }
    }

    let selected: Vec<Record> = filtered.into_iter().take(batch_size).cloned().collect();

    tracing::info!(
        method = %method,
        requested = batch_size,
        selected = selected.len(),
        "selected batch of unlabeled records"
    );

    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::consolidate;
    use crate::identity;

    fn pool() -> Vec<Record> {
        consolidate(["aaaaa", "bb", "ccc", "dddddddd", "e"])
            .unwrap()
            .records()
            .to_vec()
    }

    #[test]
    fn test_longest_orders_by_length_desc() {
        let records = pool();
        let selected = select(&records, &HashSet::new(), 3, SelectionMethod::Longest, None);
        let texts: Vec<&str> = selected.iter().map(|r| r.text_content.as_str()).collect();
        assert_eq!(texts, vec!["dddddddd", "aaaaa", "ccc"]);
    }

    #[test]
    fn test_shortest_orders_by_length_asc() {
        let records = pool();
        let selected = select(&records, &HashSet::new(), 2, SelectionMethod::Shortest, None);
        let texts: Vec<&str> = selected.iter().map(|r| r.text_content.as_str()).collect();
        assert_eq!(texts, vec!["e", "bb"]);
    }

    #[test]
    fn test_medium_prefers_mean_distance() {
        // Lengths 5, 2, 3, 8, 1 → mean 3.8; closest is "aaaaa" (5), then "ccc" (3)
        let records = pool();
        let selected = select(&records, &HashSet::new(), 2, SelectionMethod::Medium, None);
        let texts: Vec<&str> = selected.iter().map(|r| r.text_content.as_str()).collect();
        assert_eq!(texts, vec!["ccc", "aaaaa"]);
    }

    #[test]
    fn test_labeled_records_excluded() {
        let records = pool();
        let labeled: HashSet<RecordId> =
            [identity::identify("dddddddd"), identity::identify("aaaaa")]
                .into_iter()
                .collect();
        let selected = select(&records, &labeled, 10, SelectionMethod::Longest, None);
        assert_eq!(selected.len(), 3);
        assert!(selected.iter().all(|r| !labeled.contains(&r.id)));
    }

    #[test]
    fn test_undersized_pool_returned_whole() {
        let records = pool();
        let selected = select(&records, &HashSet::new(), 100, SelectionMethod::Shortest, None);
        assert_eq!(selected.len(), records.len());
    }

    #[test]
    fn test_random_is_reproducible() {
        let records = pool();
        let a = select(&records, &HashSet::new(), 3, SelectionMethod::Random, Some(7));
        let b = select(&records, &HashSet::new(), 3, SelectionMethod::Random, Some(7));
        let ids = |sel: &[Record]| sel.iter().map(|r| r.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&a), ids(&b));
        assert_eq!(a.len(), 3);
    }

    #[test]
    fn test_random_independent_of_pool_order() {
        let records = pool();
        let mut reversed = records.clone();
        reversed.reverse();
        let a = select(&records, &HashSet::new(), 3, SelectionMethod::Random, Some(7));
        let b = select(&reversed, &HashSet::new(), 3, SelectionMethod::Random, Some(7));
        let ids = |sel: &[Record]| sel.iter().map(|r| r.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&a), ids(&b));
    }

    #[test]
    fn test_ties_broken_by_id() {
        let records = consolidate(["xx", "yy", "zz"]).unwrap().records().to_vec();
        let selected = select(&records, &HashSet::new(), 3, SelectionMethod::Longest, None);
        let mut expected: Vec<RecordId> = records.iter().map(|r| r.id.clone()).collect();
        expected.sort();
        let got: Vec<RecordId> = selected.iter().map(|r| r.id.clone()).collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn test_method_round_trip() {
        for method in [
            SelectionMethod::Longest,
            SelectionMethod::Shortest,
            SelectionMethod::Medium,
            SelectionMethod::Random,
        ] {
            assert_eq!(method.to_string().parse::<SelectionMethod>(), Ok(method));
        }
        assert!("typo".parse::<SelectionMethod>().is_err());
    }
}
