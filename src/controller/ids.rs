use chrono::Utc;

use crate::model::ColumnId;

/// Generates `col_<nanos>` column ids.
///
/// Stamps never go backwards within one generator, and a stamp already
/// taken by the table is skipped.
#[derive(Debug, Default)]
pub struct ColumnIdGenerator {
    last: i64,
}

impl ColumnIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self, taken: impl Fn(&str) -> bool) -> ColumnId {
        let now = Utc::now().timestamp_nanos_opt().unwrap_or(self.last + 1);
        let mut stamp = now.max(self.last + 1);
        loop {
            let id = format!("col_{}", stamp);
            if !taken(&id) {
                self.last = stamp;
                return ColumnId::new(id);
            }
            stamp += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_ids_are_unique_and_prefixed() {
        let mut ids = ColumnIdGenerator::new();
        let mut seen = HashSet::new();
        for _ in 0..1000 {
            let id = ids.next(|_| false);
            assert!(id.as_str().starts_with("col_"));
            assert!(seen.insert(id));
        }
    }

    #[test]
    fn test_taken_ids_are_skipped() {
        let mut ids = ColumnIdGenerator::new();
        let first = ids.next(|_| false);
        let stamp: i64 = first.as_str()["col_".len()..].parse().unwrap();

        let blocked = format!("col_{}", stamp + 1);
        let second = ids.next(|id| id == blocked);
        assert_ne!(second.as_str(), blocked);
        let next_stamp: i64 = second.as_str()["col_".len()..].parse().unwrap();
        assert!(next_stamp > stamp);
    }
}
