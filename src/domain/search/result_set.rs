use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Ordered rows returned by the contact store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    /// Total matching rows, which may exceed `rows.len()` under a limit
    pub row_count: usize,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let row_count = rows.len();
        Self {
            columns,
            rows,
            row_count,
        }
    }

    pub fn with_row_count(mut self, row_count: usize) -> Self {
        self.row_count = row_count.max(self.rows.len());
        self
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    pub fn returned(&self) -> usize {
        self.rows.len()
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let index = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row)?.get(index)
    }

    /// Render at most `max_rows` rows as `column: value` lines for a prompt
    pub fn to_prompt_text(&self, max_rows: usize) -> String {
        if self.rows.is_empty() {
            return "(sin resultados)".to_string();
        }

        let mut lines = Vec::new();
        for (i, row) in self.rows.iter().take(max_rows).enumerate() {
            let fields: Vec<String> = self
                .columns
                .iter()
                .zip(row.iter())
                .filter(|(_, value)| !value.is_null())
                .map(|(column, value)| format!("{}: {}", column, display_value(value)))
                .collect();
            lines.push(format!("{}. {}", i + 1, fields.join(" | ")));
        }

        let shown = self.rows.len().min(max_rows);
        if self.row_count > shown {
            lines.push(format!(
                "(mostrando {} de {} resultados)",
                shown, self.row_count
            ));
        }

        lines.join("\n")
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> ResultSet {
        ResultSet::new(
            vec!["full_name".to_string(), "phone".to_string()],
            vec![
                vec![json!("Luis Pérez García"), json!("618-555-0101")],
                vec![json!("Luisa Pérez Soto"), Value::Null],
            ],
        )
    }

    #[test]
    fn test_get() {
        let rs = sample();
        assert_eq!(rs.get(0, "phone"), Some(&json!("618-555-0101")));
        assert_eq!(rs.get(1, "email"), None);
        assert_eq!(rs.get(5, "phone"), None);
    }

    #[test]
    fn test_prompt_text_truncates_and_states_total() {
        let rs = sample().with_row_count(120);
        let text = rs.to_prompt_text(1);

        assert!(text.contains("1. full_name: Luis Pérez García | phone: 618-555-0101"));
        assert!(!text.contains("Luisa"));
        assert!(text.contains("(mostrando 1 de 120 resultados)"));
    }

    #[test]
    fn test_prompt_text_skips_nulls() {
        let text = sample().to_prompt_text(10);
        assert!(text.contains("2. full_name: Luisa Pérez Soto"));
        assert!(!text.contains("null"));
    }

    #[test]
    fn test_row_count_never_below_returned() {
        let rs = sample().with_row_count(0);
        assert_eq!(rs.row_count, 2);
        assert!(ResultSet::empty().is_empty());
    }
}
