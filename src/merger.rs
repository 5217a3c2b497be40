//! Concatenation and key-based deduplication.
//!
//! All normalized tables of one table type are concatenated, ordered by
//! their source sort key ascending, and grouped by the configured unique
//! columns keeping the last row per group, so the source with the greatest
//! sort key wins ties.

use crate::table::{DataTable, Value};
use std::collections::HashMap;

/// Merges `(table, sort_key)` pairs into one deduplicated table restricted
/// to `output_columns`. With no unique columns this is a straight
/// concatenation. A result no larger than the smallest input is logged as a
/// warning; it usually indicates a unique-key or matching misconfiguration.
pub fn merge_tables(
    tables: &[(DataTable, String)],
    unique_columns: &[String],
    output_columns: &[String],
) -> DataTable {
    tracing::debug!(
        tables = tables.len(),
        unique = ?unique_columns,
        "merging tables"
    );

    let min_input_len = tables.iter().map(|(t, _)| t.len()).min().unwrap_or(0);

    // Concatenate, tagging each row with its source's sort key.
    let mut rows: Vec<(&str, Vec<Value>)> = Vec::new();
    for (table, sort_key) in tables {
        let aligned = table.select(output_columns);
        for row in aligned.rows() {
            rows.push((sort_key.as_str(), row.clone()));
        }
    }
    let len_before = rows.len();

    // Stable sort keeps within-source row order for equal keys.
    rows.sort_by(|a, b| a.0.cmp(b.0));

    let mut merged = DataTable::new(output_columns.to_vec());
    if unique_columns.is_empty() {
        for (_, row) in rows {
            merged.push_row(row);
        }
        return merged;
    }

    let key_indices: Vec<Option<usize>> = unique_columns
        .iter()
        .map(|c| output_columns.iter().position(|o| o == c))
        .collect();

    // Last row per key wins; output keeps first-appearance key order.
    let mut positions: HashMap<Vec<String>, usize> = HashMap::new();
    let mut deduped: Vec<Vec<Value>> = Vec::new();
    for (_, row) in rows {
        let key: Vec<String> = key_indices
            .iter()
            .map(|ix| ix.map_or(String::new(), |i| row[i].display()))
            .collect();
        // A row with a fully empty key has no identity to deduplicate on;
        // it is kept as-is rather than collapsed with other key-less rows.
        if key.iter().all(String::is_empty) {
            deduped.push(row);
            continue;
        }
        match positions.get(&key) {
            Some(&pos) => deduped[pos] = row,
            None => {
                positions.insert(key, deduped.len());
                deduped.push(row);
            }
        }
    }

    for row in deduped {
        merged.push_row(row);
    }

    let len_after = merged.len();
    tracing::debug!(before = len_before, after = len_after, "deduplicated rows");

    if len_after <= min_input_len {
        tracing::warn!(
            before = len_before,
            after = len_after,
            "low number of rows after deduplication, could indicate a problem"
        );
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn people(rows: &[(&str, &str)]) -> DataTable {
        let mut table = DataTable::new(vec!["ID".into(), "Name".into()]);
        for (id, name) in rows {
            table.push_row(vec![
                Value::Text(id.to_string()),
                Value::Text(name.to_string()),
            ]);
        }
        table
    }

    #[test]
    fn test_last_sort_key_wins() {
        let tables = vec![
            (people(&[("1", "Old"), ("2", "Kept")]), "A".to_string()),
            (people(&[("1", "New")]), "B".to_string()),
        ];
        let merged = merge_tables(
            &tables,
            &["ID".to_string()],
            &["ID".to_string(), "Name".to_string()],
        );

        assert_eq!(merged.len(), 2);
        assert_eq!(merged.value(0, "Name"), Some(&Value::Text("New".into())));
        assert_eq!(merged.value(1, "Name"), Some(&Value::Text("Kept".into())));
    }

    #[test]
    fn test_input_order_does_not_matter() {
        // Same data, tables supplied in reverse order; sort key decides.
        let tables = vec![
            (people(&[("1", "New")]), "B".to_string()),
            (people(&[("1", "Old")]), "A".to_string()),
        ];
        let merged = merge_tables(
            &tables,
            &["ID".to_string()],
            &["ID".to_string(), "Name".to_string()],
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged.value(0, "Name"), Some(&Value::Text("New".into())));
    }

    #[test]
    fn test_no_unique_columns_concatenates() {
        let tables = vec![
            (people(&[("1", "A1")]), "A".to_string()),
            (people(&[("1", "B1")]), "B".to_string()),
        ];
        let merged = merge_tables(&tables, &[], &["ID".to_string(), "Name".to_string()]);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_composite_unique_key() {
        let tables = vec![
            (people(&[("1", "X"), ("1", "Y")]), "A".to_string()),
        ];
        let merged = merge_tables(
            &tables,
            &["ID".to_string(), "Name".to_string()],
            &["ID".to_string(), "Name".to_string()],
        );
        // Distinct on (ID, Name), so both rows survive.
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_rows_without_key_are_all_kept() {
        let mut table = DataTable::new(vec!["ID".into(), "Name".into()]);
        table.push_row(vec![Value::Empty, Value::Text("A".into())]);
        table.push_row(vec![Value::Empty, Value::Text("B".into())]);
        table.push_row(vec![Value::Text("1".into()), Value::Text("C".into())]);
        table.push_row(vec![Value::Text("1".into()), Value::Text("D".into())]);

        let merged = merge_tables(
            &[(table, "A".to_string())],
            &["ID".to_string()],
            &["ID".to_string(), "Name".to_string()],
        );

        // Key-less rows do not collapse into each other; keyed rows
        // deduplicate as usual.
        assert_eq!(merged.len(), 3);
        assert_eq!(merged.value(0, "Name"), Some(&Value::Text("A".into())));
        assert_eq!(merged.value(1, "Name"), Some(&Value::Text("B".into())));
        assert_eq!(merged.value(2, "Name"), Some(&Value::Text("D".into())));
    }

    #[test]
    fn test_empty_input() {
        let merged = merge_tables(&[], &["ID".to_string()], &["ID".to_string()]);
        assert!(merged.is_empty());
        assert_eq!(merged.columns(), &["ID".to_string()]);
    }
}
