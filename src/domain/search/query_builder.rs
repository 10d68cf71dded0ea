use super::{Column, MatchMode, QuerySpec, Strategy, TOTAL_MATCHES_COLUMN};
use crate::domain::semantic_key::{words, Attribute, QueryKind, DIACRITIC_FOLDS};
use crate::domain::DomainError;

pub const DEFAULT_MAX_ROWS: u32 = 200;

/// Builds parameterized statements from strategies.
///
/// Statement text is assembled only from whitelisted column names, the
/// configured table name and fixed SQL; every value taken from a question is
/// bound as a parameter.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    table: String,
    max_rows: u32,
}

impl QueryBuilder {
    pub fn new(table: impl Into<String>) -> Result<Self, DomainError> {
        let table = table.into();
        let valid = !table.is_empty()
            && table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
            && !table.starts_with(|c: char| c.is_ascii_digit());

        if !valid {
            return Err(DomainError::configuration(format!(
                "Invalid table name: {}",
                table
            )));
        }

        Ok(Self {
            table,
            max_rows: DEFAULT_MAX_ROWS,
        })
    }

    pub fn with_max_rows(mut self, max_rows: u32) -> Self {
        self.max_rows = max_rows.max(1);
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn build(&self, strategy: &Strategy) -> QuerySpec {
        let mut params = Vec::new();
        let mut conditions = Vec::new();

        let name_expr = folded(Column::FullName);

        let name_groups: Vec<String> = strategy
            .names
            .iter()
            .filter_map(|name| match_condition(&name_expr, &name.text, name.mode, &mut params))
            .collect();
        if !name_groups.is_empty() {
            conditions.push(format!("({})", name_groups.join(" OR ")));
        }

        for filter in &strategy.filters {
            let expr = folded(Column::filtered_by(filter.attribute));
            if let Some(condition) = match_condition(&expr, &filter.value, filter.mode, &mut params) {
                conditions.push(condition);
            }
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };

        let order_clause = self.order_clause(strategy, &name_expr, &mut params);
        let limit = strategy.limit.unwrap_or(self.max_rows).min(self.max_rows);

        let statement = format!(
            "SELECT {}, COUNT(*) OVER () AS {} FROM {}{} ORDER BY {} LIMIT {}",
            select_columns(strategy)
                .iter()
                .map(Column::name)
                .collect::<Vec<_>>()
                .join(", "),
            TOTAL_MATCHES_COLUMN,
            self.table,
            where_clause,
            order_clause,
            limit,
        );

        QuerySpec::new(statement, params).with_total_column(TOTAL_MATCHES_COLUMN)
    }

    /// Exact matches score above prefix matches, which score above word matches
    fn order_clause(&self, strategy: &Strategy, name_expr: &str, params: &mut Vec<String>) -> String {
        let scores: Vec<String> = strategy
            .names
            .iter()
            .filter_map(|name| {
                let phrase = words(&name.text).join(" ");
                if phrase.is_empty() {
                    return None;
                }
                params.push(phrase.clone());
                params.push(format!("{}%", escape_like(&phrase)));
                params.push(format!("% {} %", escape_like(&phrase)));
                Some(format!(
                    "(CASE WHEN {e} = ? THEN 3 WHEN {e} LIKE ? ESCAPE '\\' THEN 2 \
                     WHEN (' ' || {e} || ' ') LIKE ? ESCAPE '\\' THEN 1 ELSE 0 END)",
                    e = name_expr
                ))
            })
            .collect();

        if scores.is_empty() {
            format!("{} ASC", Column::FullName.name())
        } else {
            format!("{} DESC, {} ASC", scores.join(" + "), Column::FullName.name())
        }
    }
}

/// Condition matching `value` against an already-folded expression
fn match_condition(expr: &str, value: &str, mode: MatchMode, params: &mut Vec<String>) -> Option<String> {
    let tokens = words(value);
    if tokens.is_empty() {
        return None;
    }

    let condition = match mode {
        MatchMode::Exact => {
            params.push(format!("% {} %", escape_like(&tokens.join(" "))));
            format!("(' ' || {} || ' ') LIKE ? ESCAPE '\\'", expr)
        }
        MatchMode::Partial | MatchMode::AnyToken => {
            let joiner = if mode == MatchMode::Partial { " AND " } else { " OR " };
            let parts: Vec<String> = tokens
                .iter()
                .map(|token| {
                    params.push(format!("%{}%", escape_like(token)));
                    format!("{} LIKE ? ESCAPE '\\'", expr)
                })
                .collect();
            format!("({})", parts.join(joiner))
        }
    };

    Some(condition)
}

/// Lowercased, accent-free SQL expression for a column.
///
/// SQLite's LOWER only folds ASCII, so accented capitals are replaced
/// explicitly alongside their lowercase forms.
fn folded(column: Column) -> String {
    let mut expr = format!("LOWER(COALESCE({}, ''))", column.name());
    for (from, to) in DIACRITIC_FOLDS {
        expr = format!("REPLACE({}, '{}', '{}')", expr, from, to);
        for upper in from.to_uppercase() {
            if upper != *from {
                expr = format!("REPLACE({}, '{}', '{}')", expr, upper, to);
            }
        }
    }
    expr
}

fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn select_columns(strategy: &Strategy) -> Vec<Column> {
    let mut columns = vec![Column::FullName];

    let base: &[Column] = match strategy.kind {
        QueryKind::Person => &[],
        QueryKind::Listing => &[Column::Role, Column::Zone, Column::Workplace],
        QueryKind::Count => &[Column::Role, Column::Zone],
    };
    columns.extend_from_slice(base);

    let attributes: Vec<Attribute> = if strategy.attributes.is_empty() && strategy.kind == QueryKind::Person {
        vec![Attribute::Identity]
    } else {
        strategy.attributes.clone()
    };

    for attribute in attributes {
        columns.extend_from_slice(Column::for_attribute(attribute));
    }
    for filter in &strategy.filters {
        columns.push(Column::filtered_by(filter.attribute));
    }

    let mut unique = Vec::with_capacity(columns.len());
    for column in columns {
        if !unique.contains(&column) {
            unique.push(column);
        }
    }
    unique
}
