//! Tag selection from raw labels.

use std::collections::HashSet;

use crate::types::Label;

/// Append the names of labels strictly above `threshold` to `tags`.
pub fn push_qualifying(labels: &[Label], threshold: f64, tags: &mut Vec<String>) {
    tags.extend(
        labels
            .iter()
            .filter(|label| label.exceeds(threshold))
            .map(|label| label.name.clone()),
    );
}

/// Drop repeated tags, keeping the first occurrence of each.
pub fn dedupe(tags: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(tags.len());
    tags.into_iter()
        .filter(|tag| seen.insert(tag.clone()))
        .collect()
}
