//! Column catalog of the queried table.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Mapping from column name to semantic type for one table.
///
/// Built once at startup and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaCatalog {
    /// Table the generated queries must target
    pub table: String,

    /// Column name to type, ordered by name
    pub columns: BTreeMap<String, String>,
}

impl SchemaCatalog {
    pub fn new(table: impl Into<String>, columns: BTreeMap<String, String>) -> Self {
        Self {
            table: table.into(),
            columns,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Render as `- column: type` lines for prompts.
    pub fn render(&self) -> String {
        if self.columns.is_empty() {
            return "(no columns known)".to_string();
        }

        self.columns
            .iter()
            .map(|(column, kind)| format!("- {}: {}", column, kind))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_sorted_lines() {
        let mut columns = BTreeMap::new();
        columns.insert("SG_UF".to_string(), "string".to_string());
        columns.insert("DT_NOTIFIC".to_string(), "date".to_string());

        let catalog = SchemaCatalog::new("srag_cases", columns);
        assert_eq!(catalog.render(), "- DT_NOTIFIC: date\n- SG_UF: string");
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_render_empty() {
        let catalog = SchemaCatalog::new("srag_cases", BTreeMap::new());
        assert!(catalog.is_empty());
        assert_eq!(catalog.render(), "(no columns known)");
    }
}
