//! SQLite contact store with connection pooling

use std::str::FromStr;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column as _, Row};

use crate::config::StoreConfig;
use crate::domain::{
    Column, ContactStore, DomainError, KnownPerson, QueryBuilder, QuerySpec, ResultSet,
    StorePreview,
};

/// A contact as loaded into the store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactRecord {
    pub given_names: String,
    pub paternal_surname: String,
    pub maternal_surname: String,
    pub phone: Option<String>,
    pub mobile: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub role: Option<String>,
    pub workplace: Option<String>,
    pub zone: Option<String>,
    pub education: Option<String>,
    pub marital_status: Option<String>,
    pub start_date: Option<String>,
    pub double_post: Option<String>,
}

impl ContactRecord {
    pub fn new(
        given_names: impl Into<String>,
        paternal_surname: impl Into<String>,
        maternal_surname: impl Into<String>,
    ) -> Self {
        Self {
            given_names: given_names.into(),
            paternal_surname: paternal_surname.into(),
            maternal_surname: maternal_surname.into(),
            ..Default::default()
        }
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_zone(mut self, zone: impl Into<String>) -> Self {
        self.zone = Some(zone.into());
        self
    }

    pub fn with_workplace(mut self, workplace: impl Into<String>) -> Self {
        self.workplace = Some(workplace.into());
        self
    }

    pub fn with_marital_status(mut self, status: impl Into<String>) -> Self {
        self.marital_status = Some(status.into());
        self
    }

    pub fn full_name(&self) -> String {
        [
            self.given_names.trim(),
            self.paternal_surname.trim(),
            self.maternal_surname.trim(),
        ]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
    }
}

/// Contact store backed by a single SQLite table
#[derive(Debug, Clone)]
pub struct SqliteContactStore {
    pool: SqlitePool,
    table: String,
    preview_names: u32,
    preview_rows: u32,
}

impl SqliteContactStore {
    /// Wrap an existing pool. The table name must be a plain identifier.
    pub fn new(pool: SqlitePool, table: impl Into<String>) -> Result<Self, DomainError> {
        let builder = QueryBuilder::new(table)?;

        Ok(Self {
            pool,
            table: builder.table().to_string(),
            preview_names: 20,
            preview_rows: 3,
        })
    }

    pub async fn connect(config: &StoreConfig) -> Result<Self, DomainError> {
        let options = SqliteConnectOptions::from_str(&config.database_url)
            .map_err(|e| DomainError::configuration(format!("Invalid database URL: {}", e)))?
            .create_if_missing(true);

        // Each in-memory connection is its own database
        let max_connections = if config.database_url.contains(":memory:") {
            1
        } else {
            config.max_connections.max(1)
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| DomainError::store(format!("Failed to open contact store: {}", e)))?;

        Ok(Self::new(pool, &config.table)?
            .with_preview_limits(config.preview_names, config.preview_rows))
    }

    pub fn with_preview_limits(mut self, names: u32, rows: u32) -> Self {
        self.preview_names = names;
        self.preview_rows = rows;
        self
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create the contacts table when it does not exist
    pub async fn ensure_schema(&self) -> Result<(), DomainError> {
        let columns = Column::ALL
            .iter()
            .map(|column| format!("{} TEXT", column.name()))
            .collect::<Vec<_>>()
            .join(", ");

        let statement = format!(
            "CREATE TABLE IF NOT EXISTS {} (id INTEGER PRIMARY KEY AUTOINCREMENT, {})",
            self.table, columns
        );

        sqlx::query(&statement)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::store(format!("Failed to create table: {}", e)))?;

        Ok(())
    }

    pub async fn insert(&self, record: &ContactRecord) -> Result<(), DomainError> {
        let names: Vec<&str> = Column::ALL.iter().map(Column::name).collect();
        let placeholders = vec!["?"; names.len()].join(", ");
        let statement = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table,
            names.join(", "),
            placeholders
        );

        let mut query = sqlx::query(&statement);
        for column in Column::ALL {
            query = query.bind(record_value(record, column));
        }

        query
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::store(format!("Failed to insert contact: {}", e)))?;

        Ok(())
    }

    async fn fetch(&self, statement: &str, params: &[String]) -> Result<Vec<SqliteRow>, DomainError> {
        let mut query = sqlx::query(statement);
        for param in params {
            query = query.bind(param.as_str());
        }

        query.fetch_all(&self.pool).await.map_err(map_sqlx_error)
    }
}

#[async_trait]
impl ContactStore for SqliteContactStore {
    async fn execute(&self, spec: &QuerySpec) -> Result<ResultSet, DomainError> {
        let rows = self.fetch(&spec.statement, &spec.params).await?;
        let result = rows_to_result_set(&rows, spec.total_column.as_deref());

        tracing::debug!(
            rows = result.returned(),
            total = result.row_count,
            "Statement executed"
        );

        Ok(result)
    }

    async fn preview(&self) -> Result<StorePreview, DomainError> {
        let pragma = self
            .fetch(&format!("PRAGMA table_info({})", self.table), &[])
            .await?;
        let columns: Vec<String> = pragma
            .iter()
            .filter_map(|row| row.try_get::<String, _>("name").ok())
            .filter(|name| name != "id")
            .collect();

        let total_rows: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", self.table))
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let sample_names: Vec<String> = sqlx::query_scalar(&format!(
            "SELECT DISTINCT full_name FROM {} WHERE full_name IS NOT NULL \
             ORDER BY full_name LIMIT {}",
            self.table, self.preview_names
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let example = self
            .fetch(
                &format!(
                    "SELECT {} FROM {} LIMIT {}",
                    columns.join(", "),
                    self.table,
                    self.preview_rows
                ),
                &[],
            )
            .await?;

        Ok(StorePreview {
            columns,
            total_rows: usize::try_from(total_rows).unwrap_or_default(),
            sample_names,
            example_rows: rows_to_result_set(&example, None),
        })
    }

    async fn known_people(&self) -> Result<Vec<KnownPerson>, DomainError> {
        let rows = self
            .fetch(
                &format!(
                    "SELECT given_names, paternal_surname, maternal_surname FROM {} \
                     WHERE given_names IS NOT NULL AND given_names <> ''",
                    self.table
                ),
                &[],
            )
            .await?;

        let people = rows
            .iter()
            .map(|row| {
                let text = |column: &str| {
                    row.try_get::<Option<String>, _>(column)
                        .ok()
                        .flatten()
                        .unwrap_or_default()
                };
                KnownPerson::new(
                    text("given_names"),
                    text("paternal_surname"),
                    text("maternal_surname"),
                )
            })
            .collect();

        Ok(people)
    }
}

fn record_value(record: &ContactRecord, column: Column) -> Option<String> {
    let text = |value: &str| (!value.is_empty()).then(|| value.to_string());
    match column {
        Column::FullName => text(&record.full_name()),
        Column::GivenNames => text(&record.given_names),
        Column::PaternalSurname => text(&record.paternal_surname),
        Column::MaternalSurname => text(&record.maternal_surname),
        Column::Phone => record.phone.clone(),
        Column::Mobile => record.mobile.clone(),
        Column::Email => record.email.clone(),
        Column::Address => record.address.clone(),
        Column::Role => record.role.clone(),
        Column::Workplace => record.workplace.clone(),
        Column::Zone => record.zone.clone(),
        Column::Education => record.education.clone(),
        Column::MaritalStatus => record.marital_status.clone(),
        Column::StartDate => record.start_date.clone(),
        Column::DoublePost => record.double_post.clone(),
    }
}

/// A rejected statement is the query's fault; anything else is the store's
fn map_sqlx_error(error: sqlx::Error) -> DomainError {
    match error {
        sqlx::Error::Database(_)
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::RowNotFound => DomainError::query_execution(error.to_string()),
        other => DomainError::store(other.to_string()),
    }
}

fn rows_to_result_set(rows: &[SqliteRow], total_column: Option<&str>) -> ResultSet {
    let Some(first) = rows.first() else {
        return ResultSet::empty();
    };

    let names: Vec<String> = first
        .columns()
        .iter()
        .map(|column| column.name().to_string())
        .collect();
    let total_index = total_column.and_then(|total| names.iter().position(|name| name == total));

    let mut total = 0usize;
    let mut data = Vec::with_capacity(rows.len());

    for row in rows {
        let mut values = Vec::with_capacity(names.len());
        for index in 0..names.len() {
            let value = column_value(row, index);
            if Some(index) == total_index {
                if let Some(count) = value.as_u64() {
                    total = total.max(usize::try_from(count).unwrap_or(usize::MAX));
                }
            } else {
                values.push(value);
            }
        }
        data.push(values);
    }

    let columns = names
        .into_iter()
        .enumerate()
        .filter(|(index, _)| Some(*index) != total_index)
        .map(|(_, name)| name)
        .collect();

    ResultSet::new(columns, data).with_row_count(total)
}

fn column_value(row: &SqliteRow, index: usize) -> Value {
    if let Ok(value) = row.try_get::<Option<String>, _>(index) {
        return value.map(Value::String).unwrap_or(Value::Null);
    }
    if let Ok(value) = row.try_get::<Option<i64>, _>(index) {
        return value.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(value) = row.try_get::<Option<f64>, _>(index) {
        return value.map(Value::from).unwrap_or(Value::Null);
    }
    Value::Null
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// In-memory store seeded with a handful of contacts
    pub async fn seeded_store() -> SqliteContactStore {
        let config = StoreConfig {
            database_url: "sqlite::memory:".to_string(),
            ..StoreConfig::default()
        };
        let store = SqliteContactStore::connect(&config).await.unwrap();
        store.ensure_schema().await.unwrap();

        let contacts = [
            ContactRecord::new("Luis", "Pérez", "García")
                .with_phone("618-555-0101")
                .with_email("luis.perez@example.mx")
                .with_role("Docente")
                .with_zone("109")
                .with_marital_status("Casado"),
            ContactRecord::new("Luisa", "Pérez", "Soto")
                .with_phone("618-555-0102")
                .with_role("Directora")
                .with_zone("110"),
            ContactRecord::new("José Ángel", "Alvarado", "Ruiz")
                .with_email("jose.alvarado@example.mx")
                .with_role("Subdirector")
                .with_zone("109"),
            ContactRecord::new("Gabriela", "Jara", "Fuentes")
                .with_role("Docente")
                .with_zone("111")
                .with_address("Calle Pino 12, Durango"),
            ContactRecord::new("Carmen Celina", "Ramírez", "López")
                .with_role("Velador")
                .with_zone("110")
                .with_address("Av. Juárez 300, Gómez Palacio"),
        ];

        for contact in &contacts {
            store.insert(contact).await.unwrap();
        }

        store
    }
}
