use std::collections::BTreeMap;

use serde::Serialize;

/// Fixed leading columns of the student table. Every consumer of the
/// schema descriptor (DDL, manual insert, CSV import) starts from these.
pub const FIXED_COLUMNS: [&str; 3] = ["name", "grade", "section"];

pub const TERMS: [u8; 2] = [1, 2];

/// One derived mark column, kept together with its (term, subject) origin
/// so aggregation iterates a known finite set instead of matching column
/// names by prefix at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkColumn {
    pub term: u8,
    pub subject: String,
    pub name: String,
}

/// Lowercases the subject and strips every character that is not an ASCII
/// word character. Deterministic; no error path. Distinct subjects can
/// sanitize to the same fragment ("I.P" vs "IP") — callers must run
/// `collision_groups` before trusting the derived schema.
pub fn sanitize(subject: &str) -> String {
    subject
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

pub fn mark_column_name(term: u8, subject: &str) -> String {
    format!("t{}_{}", term, sanitize(subject))
}

/// All mark columns in schema order: term 1 in registry order, then
/// term 2 in registry order.
pub fn mark_columns(subjects: &[String]) -> Vec<MarkColumn> {
    let mut cols = Vec::with_capacity(subjects.len() * TERMS.len());
    for term in TERMS {
        for subject in subjects {
            cols.push(MarkColumn {
                term,
                subject: subject.clone(),
                name: mark_column_name(term, subject),
            });
        }
    }
    cols
}

/// The full schema descriptor: the contract between table creation, manual
/// insert, and CSV import. All three must consume this exact ordering.
pub fn expected_columns(subjects: &[String]) -> Vec<String> {
    let mut cols: Vec<String> = FIXED_COLUMNS.iter().map(|c| c.to_string()).collect();
    cols.extend(mark_columns(subjects).into_iter().map(|c| c.name));
    cols
}

/// Subjects whose sanitized fragments coincide, keyed by the shared
/// fragment. Any non-empty result means two registry entries would map to
/// the same database columns and silently misroute marks, so workspace
/// selection treats this as a configuration error.
pub fn collision_groups(subjects: &[String]) -> BTreeMap<String, Vec<String>> {
    let mut by_fragment: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for subject in subjects {
        by_fragment
            .entry(sanitize(subject))
            .or_default()
            .push(subject.clone());
    }
    by_fragment.retain(|_, subjects| subjects.len() > 1);
    by_fragment
}

/// Idempotent DDL for the student table. Mark columns follow the schema
/// descriptor's order. Only configuration-derived identifiers are
/// interpolated here; data values are always bound as parameters.
pub fn create_table_sql(table_name: &str, subjects: &[String]) -> String {
    let mark_defs: Vec<String> = mark_columns(subjects)
        .into_iter()
        .map(|c| format!("{} INTEGER NOT NULL", c.name))
        .collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {}(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            grade INTEGER NOT NULL,
            section TEXT NOT NULL,
            {}
        )",
        table_name,
        mark_defs.join(",\n            ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn sanitize_is_deterministic_and_idempotent() {
        for subject in ["Physics", "I.P", "Computer Science", "Math's", "c++"] {
            let once = sanitize(subject);
            assert_eq!(once, sanitize(subject));
            assert_eq!(once, sanitize(&once));
        }
        assert_eq!(sanitize("I.P"), "ip");
        assert_eq!(sanitize("Computer Science"), "computerscience");
        assert_eq!(sanitize("c++"), "c");
    }

    #[test]
    fn mark_column_name_shape() {
        assert_eq!(mark_column_name(1, "Physics"), "t1_physics");
        assert_eq!(mark_column_name(2, "I.P"), "t2_ip");
    }

    #[test]
    fn subjects_differing_only_in_stripped_chars_collide() {
        // Known sanitization hazard: these map to identical columns.
        assert_eq!(mark_column_name(1, "I.P"), mark_column_name(1, "IP"));
        assert_eq!(mark_column_name(2, "Math's"), mark_column_name(2, "Maths"));

        let groups = collision_groups(&registry(&["I.P", "IP", "Physics"]));
        assert_eq!(groups.len(), 1);
        assert_eq!(groups["ip"], vec!["I.P".to_string(), "IP".to_string()]);
    }

    #[test]
    fn collision_free_registry_yields_no_groups() {
        let groups = collision_groups(&registry(&["Physics", "Chemistry", "Maths"]));
        assert!(groups.is_empty());
    }

    #[test]
    fn expected_columns_length_and_order_are_stable() {
        let subjects = registry(&["Physics", "Chemistry", "I.P"]);
        let cols = expected_columns(&subjects);
        assert_eq!(cols.len(), 3 + 2 * subjects.len());
        assert_eq!(
            cols,
            vec![
                "name",
                "grade",
                "section",
                "t1_physics",
                "t1_chemistry",
                "t1_ip",
                "t2_physics",
                "t2_chemistry",
                "t2_ip",
            ]
        );
        // Stable across repeated derivation from the same registry.
        assert_eq!(cols, expected_columns(&subjects));
    }

    #[test]
    fn mark_columns_carry_their_origin() {
        let cols = mark_columns(&registry(&["Physics", "Chemistry"]));
        assert_eq!(cols.len(), 4);
        assert_eq!(cols[0].term, 1);
        assert_eq!(cols[0].subject, "Physics");
        assert_eq!(cols[0].name, "t1_physics");
        assert_eq!(cols[3].term, 2);
        assert_eq!(cols[3].subject, "Chemistry");
        assert_eq!(cols[3].name, "t2_chemistry");
    }

    #[test]
    fn create_table_sql_lists_descriptor_columns_in_order() {
        let sql = create_table_sql("students", &registry(&["Physics", "I.P"]));
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS students"));
        assert!(sql.contains("id INTEGER PRIMARY KEY AUTOINCREMENT"));
        let t1p = sql.find("t1_physics INTEGER NOT NULL").expect("t1_physics");
        let t1i = sql.find("t1_ip INTEGER NOT NULL").expect("t1_ip");
        let t2p = sql.find("t2_physics INTEGER NOT NULL").expect("t2_physics");
        let t2i = sql.find("t2_ip INTEGER NOT NULL").expect("t2_ip");
        assert!(t1p < t1i && t1i < t2p && t2p < t2i);
    }
}
