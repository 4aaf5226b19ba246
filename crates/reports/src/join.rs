//! Reference-data indexing and foreign-key resolution.
//!
//! Lookups return `Option`; callers substitute [`unknown_label`] when a key
//! doesn't resolve. Two join paths exist on purpose: the primary path keys
//! events by `code_id` against the code table, the secondary path keys them
//! by `conf_id` against `tsl_code_id` on the mapping table. They address
//! different naming schemes and must not be unified.

use std::collections::HashMap;

/// Neutral swatch used when a code has no configured color.
pub const FALLBACK_COLOR: &str = "#cccccc";

/// One-pass `id -> record` index. Duplicate ids keep the first occurrence.
pub fn build_index<'a, T, F>(rows: &'a [T], key: F) -> HashMap<String, &'a T>
where
    F: Fn(&T) -> Option<&str>,
{
    let mut index = HashMap::with_capacity(rows.len());
    for row in rows {
        if let Some(id) = key(row) {
            index.entry(id.to_string()).or_insert(row);
        }
    }
    index
}

/// Placeholder label for an unresolvable foreign key; keeps the raw id
/// visible so the row stays diagnosable in a report.
pub fn unknown_label(id: &str) -> String {
    format!("Unknown ({id})")
}

#[cfg(test)]
mod tests {
    use super::*;
    use vconnect_core_types::Code;

    fn code(id: &str, name: &str) -> Code {
        Code {
            id: Some(id.to_string()),
            code_name: Some(name.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn index_resolves_and_misses_return_none() {
        let codes = vec![code("1", "Blue"), code("2", "Red")];
        let index = build_index(&codes, |c| c.id.as_deref());

        assert_eq!(index.get("1").and_then(|c| c.code_name.as_deref()), Some("Blue"));
        assert!(index.get("99").is_none());
    }

    #[test]
    fn duplicate_ids_keep_first_occurrence() {
        let codes = vec![code("1", "First"), code("1", "Second")];
        let index = build_index(&codes, |c| c.id.as_deref());
        assert_eq!(
            index.get("1").and_then(|c| c.code_name.as_deref()),
            Some("First")
        );
    }

    #[test]
    fn rows_without_keys_are_skipped() {
        let codes = vec![Code::default(), code("7", "Grey")];
        let index = build_index(&codes, |c| c.id.as_deref());
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn unknown_label_carries_raw_id() {
        assert_eq!(unknown_label("42"), "Unknown (42)");
    }
}
