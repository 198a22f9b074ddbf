use std::collections::HashMap;

use num_bigint::BigInt;
use shared::domain::CountRow;

/// Occurrence counts for arbitrary integers.
#[derive(Debug, Default, Clone)]
pub struct FrequencyCounter {
    counts: HashMap<BigInt, u64>,
    total: u64,
}

impl FrequencyCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one occurrence of `value` and returns its updated count.
    pub fn add(&mut self, value: BigInt) -> u64 {
        let count = self.counts.entry(value).or_insert(0);
        *count += 1;
        self.total += 1;
        *count
    }

    pub fn get(&self, value: &BigInt) -> u64 {
        self.counts.get(value).copied().unwrap_or(0)
    }

    /// Number of `add` calls since creation or the last `clear`.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Number of distinct values seen.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn clear(&mut self) {
        self.counts.clear();
        self.total = 0;
    }

    /// Rows ranked by count descending, ties by value ascending.
    ///
    /// `None` and non-finite limits return every row. Fractional limits are
    /// floored; zero or negative limits return nothing.
    pub fn snapshot(&self, limit: Option<f64>) -> Vec<CountRow> {
        let Some(limit) = normalize_limit(limit, self.counts.len()) else {
            return Vec::new();
        };

        let mut rows: Vec<CountRow> = self
            .counts
            .iter()
            .map(|(value, count)| CountRow::new(value.clone(), *count))
            .collect();
        rows.sort_unstable_by(|left, right| {
            right
                .count
                .cmp(&left.count)
                .then_with(|| left.value.cmp(&right.value))
        });
        rows.truncate(limit);
        rows
    }
}

fn normalize_limit(limit: Option<f64>, distinct: usize) -> Option<usize> {
    if distinct == 0 {
        return None;
    }
    let limit = match limit {
        Some(limit) if limit.is_finite() => limit.floor(),
        _ => return Some(distinct),
    };
    if limit < 1.0 {
        return None;
    }
    // Float-to-int casts saturate, so very large limits simply mean "all".
    Some((limit as usize).min(distinct))
}
