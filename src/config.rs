use serde::Serialize;

/// Schema-shaping configuration, fixed at workspace selection time.
/// Every component takes this by reference; there is no module-level state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaConfig {
    pub table_name: String,
    pub subjects: Vec<String>,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            table_name: "students".to_string(),
            subjects: ["Physics", "Chemistry", "Maths", "English", "I.P"]
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}

impl SchemaConfig {
    /// Table and column names are the only values interpolated into SQL
    /// text, so the table name must be a plain identifier.
    pub fn table_name_is_valid(&self) -> bool {
        let mut chars = self.table_name.chars();
        match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
            _ => return false,
        }
        chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_matches_shipping_subjects() {
        let cfg = SchemaConfig::default();
        assert_eq!(cfg.table_name, "students");
        assert_eq!(cfg.subjects.len(), 5);
        assert_eq!(cfg.subjects[4], "I.P");
    }

    #[test]
    fn table_name_identifier_rules() {
        let mut cfg = SchemaConfig::default();
        assert!(cfg.table_name_is_valid());
        cfg.table_name = "_staging2".to_string();
        assert!(cfg.table_name_is_valid());
        cfg.table_name = "2students".to_string();
        assert!(!cfg.table_name_is_valid());
        cfg.table_name = "students; DROP TABLE x".to_string();
        assert!(!cfg.table_name_is_valid());
        cfg.table_name = String::new();
        assert!(!cfg.table_name_is_valid());
    }
}
