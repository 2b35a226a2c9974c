//! The table catalog.
//!
//! Maps table names to PipeQL expressions: either a bare filter (no `|`)
//! or a full pipeline (contains `|`). Built once at process start and
//! immutable afterwards, so concurrent readers need no synchronisation.

use std::collections::BTreeMap;

use super::error::StoreError;

/// Case-insensitive, immutable table catalog.
#[derive(Debug, Clone, Default)]
pub struct TableCatalog {
    tables: BTreeMap<String, String>,
}

impl TableCatalog {
    /// Builds a catalog from `name → expression` pairs.
    ///
    /// Names are trimmed and lower-cased; expressions are trimmed. Empty
    /// names and duplicates (after normalisation) are rejected.
    pub fn new(
        tables: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self, StoreError> {
        let mut normalized = BTreeMap::new();
        for (name, expr) in tables {
            let key = name.trim().to_lowercase();
            if key.is_empty() {
                return Err(StoreError::InvalidName {
                    reason: "table name cannot be empty".to_string(),
                });
            }
            if normalized.contains_key(&key) {
                return Err(StoreError::InvalidName {
                    reason: format!("duplicate table name {:?}", key),
                });
            }
            normalized.insert(key, expr.trim().to_string());
        }
        Ok(Self { tables: normalized })
    }

    /// An empty catalog.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Looks up a table expression, case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.tables.get(&name.to_lowercase()).map(String::as_str)
    }

    /// Returns all table names, sorted.
    pub fn list(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }

    /// Iterates over `(name, expression)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tables
            .iter()
            .map(|(name, expr)| (name.as_str(), expr.as_str()))
    }

    /// Returns true when no tables are configured.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(pairs: &[(&str, &str)]) -> Result<TableCatalog, StoreError> {
        TableCatalog::new(
            pairs
                .iter()
                .map(|(n, e)| (n.to_string(), e.to_string())),
        )
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let catalog = catalog(&[("Logs", "*"), ("errors", "* | level:ERROR")]).unwrap();
        assert_eq!(catalog.get("logs"), Some("*"));
        assert_eq!(catalog.get("LOGS"), Some("*"));
        assert_eq!(catalog.get("errors"), Some("* | level:ERROR"));
        assert_eq!(catalog.get("missing"), None);
    }

    #[test]
    fn test_names_and_expressions_are_trimmed() {
        let catalog = catalog(&[("  api  ", "  service:api  ")]).unwrap();
        assert_eq!(catalog.get("api"), Some("service:api"));
    }

    #[test]
    fn test_list_is_sorted() {
        let catalog = catalog(&[("zeta", "*"), ("alpha", "*"), ("mid", "*")]).unwrap();
        assert_eq!(catalog.list(), vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_empty_name_rejected() {
        let err = catalog(&[("   ", "*")]).unwrap_err();
        assert!(err.to_string().contains("cannot be empty"));
    }

    #[test]
    fn test_duplicate_after_normalisation_rejected() {
        let err = catalog(&[("logs", "*"), ("LOGS", "level:info")]).unwrap_err();
        assert!(err.to_string().contains("duplicate table name"));
    }
}
