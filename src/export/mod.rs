//! Training data export
//!
//! Writes the master label set as supervised fine-tuning data: one JSON
//! object per line with the system instruction, the input text, and the
//! authoritative category values as the expected response. Regenerated
//! whole from the master set after every merge, so the export always
//! matches the current authoritative labels.

use crate::error::Result;
use crate::labels::{CategoryValues, LabelAssignment};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

#[derive(Serialize)]
struct TrainingExample<'a> {
    system: &'a str,
    input: &'a str,
    expected: &'a CategoryValues,
}

/// Write one training example per labeled record, returning the number
/// of lines written.
pub fn write_training_export(
    path: &Path,
    system_instruction: &str,
    assignments: &[LabelAssignment],
) -> Result<usize> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
    for assignment in assignments {
        let example = TrainingExample {
            system: system_instruction,
            input: &assignment.text_content,
            expected: &assignment.category_values,
        };
        serde_json::to_writer(&mut file, &example)?;
        file.write_all(b"\n")?;
    }
    file.flush()?;

    tracing::info!(
        path = %path.display(),
        examples = assignments.len(),
        "wrote training export"
    );
    Ok(assignments.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity;
    use crate::labels::LabelSource;
    use chrono::Utc;
    use tempfile::TempDir;

    fn assignment(text: &str, cat_a: bool) -> LabelAssignment {
        LabelAssignment {
            record_id: identity::identify(text),
            text_content: text.to_string(),
            category_values: CategoryValues::from_pairs([("catA", cat_a)]),
            source: LabelSource::Manual,
            model_ref: None,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_one_line_per_example() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("training.jsonl");

        let count = write_training_export(
            &path,
            "classify things",
            &[assignment("first text", true), assignment("second text", false)],
        )
        .unwrap();
        assert_eq!(count, 2);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["system"], "classify things");
        assert_eq!(first["input"], "first text");
        assert_eq!(first["expected"]["catA"], 1);

        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["expected"]["catA"], 0);
    }

    #[test]
    fn test_empty_master_writes_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("training.jsonl");
        let count = write_training_export(&path, "sys", &[]).unwrap();
        assert_eq!(count, 0);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }
}
