//! SQLite-backed [`Session`] implementation.
//!
//! Statement text arrives fully formed from the core's query builder with
//! positional `?` placeholders; this module only binds [`Value`]s, applies
//! the pagination window and decodes result tuples.

use crate::error::SqlxErrorExt;
use qldao::{DataError, Entity, EntityExt, Session, Value, Window};
use sqlx::sqlite::{SqliteArguments, SqlitePool, SqliteRow};
use sqlx::{Row, TypeInfo, ValueRef};
use tracing::debug;

type SqliteQuery<'q> = sqlx::query::Query<'q, sqlx::Sqlite, SqliteArguments<'q>>;

/// A unit-of-work handle over an `sqlx::SqlitePool`.
///
/// There is no second-level cache and no identity map here, so the cacheable
/// hint is accepted and ignored and [`Session::clear`] is a no-op.
pub struct SqliteSession {
    pool: SqlitePool,
}

impl SqliteSession {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get the underlying pool reference.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl Clone for SqliteSession {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
        }
    }
}

fn bind_values<'q>(
    mut query: SqliteQuery<'q>,
    binds: &'q [Value],
) -> Result<SqliteQuery<'q>, DataError> {
    for value in binds {
        query = match value {
            Value::Null => query.bind(None::<String>),
            Value::Bool(b) => query.bind(*b),
            Value::Int(i) => query.bind(*i),
            Value::Float(x) => query.bind(*x),
            Value::Text(s) => query.bind(s.as_str()),
            Value::Bytes(b) => query.bind(b.as_slice()),
            // lists travel as JSON text
            Value::List(_) => {
                query.bind(serde_json::to_string(value).map_err(DataError::provider)?)
            }
        };
    }
    Ok(query)
}

fn decode_column(row: &SqliteRow, index: usize) -> Result<Value, DataError> {
    let raw = row.try_get_raw(index).map_err(SqlxErrorExt::into_data_error)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let type_name = raw.type_info().name().to_ascii_uppercase();
    drop(raw);

    let value = if type_name.contains("INT") {
        Value::Int(row.try_get::<i64, _>(index).map_err(SqlxErrorExt::into_data_error)?)
    } else if type_name.contains("BOOL") {
        Value::Bool(row.try_get::<bool, _>(index).map_err(SqlxErrorExt::into_data_error)?)
    } else if type_name.contains("REAL")
        || type_name.contains("FLOA")
        || type_name.contains("DOUB")
        || type_name.contains("NUMERIC")
    {
        Value::Float(row.try_get::<f64, _>(index).map_err(SqlxErrorExt::into_data_error)?)
    } else if type_name.contains("BLOB") {
        Value::Bytes(row.try_get::<Vec<u8>, _>(index).map_err(SqlxErrorExt::into_data_error)?)
    } else {
        Value::Text(row.try_get::<String, _>(index).map_err(SqlxErrorExt::into_data_error)?)
    };
    Ok(value)
}

fn decode_row(row: &SqliteRow) -> Result<Vec<Value>, DataError> {
    (0..row.columns().len())
        .map(|i| decode_column(row, i))
        .collect()
}

/// SQLite requires a LIMIT clause whenever OFFSET is present; `-1` means
/// unlimited.
fn windowed(sql: &str, window: Window) -> String {
    let mut out = sql.to_string();
    match (window.limit(), window.offset()) {
        (Some(limit), Some(offset)) => {
            out.push_str(&format!(" LIMIT {limit} OFFSET {offset}"));
        }
        (Some(limit), None) => out.push_str(&format!(" LIMIT {limit}")),
        (None, Some(offset)) => out.push_str(&format!(" LIMIT -1 OFFSET {offset}")),
        (None, None) => {}
    }
    out
}

impl Session for SqliteSession {
    async fn select(
        &self,
        sql: &str,
        binds: &[Value],
        window: Window,
        _cacheable: bool,
    ) -> Result<Vec<Vec<Value>>, DataError> {
        let sql = windowed(sql, window);
        debug!(%sql, binds = binds.len(), "select");
        let rows = bind_values(sqlx::query(&sql), binds)?
            .fetch_all(&self.pool)
            .await
            .map_err(SqlxErrorExt::into_data_error)?;
        rows.iter().map(decode_row).collect()
    }

    async fn select_scalar(&self, sql: &str, binds: &[Value]) -> Result<i64, DataError> {
        debug!(%sql, "scalar");
        let row = bind_values(sqlx::query(sql), binds)?
            .fetch_one(&self.pool)
            .await
            .map_err(SqlxErrorExt::into_data_error)?;
        row.try_get::<i64, _>(0).map_err(SqlxErrorExt::into_data_error)
    }

    async fn execute(&self, sql: &str, binds: &[Value]) -> Result<u64, DataError> {
        debug!(%sql, binds = binds.len(), "execute");
        let result = bind_values(sqlx::query(sql), binds)?
            .execute(&self.pool)
            .await
            .map_err(SqlxErrorExt::into_data_error)?;
        Ok(result.rows_affected())
    }

    async fn find<T: Entity>(&self, id: &T::Id) -> Result<Option<T>, DataError> {
        let fields = T::attribute_names();
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ?",
            fields.join(", "),
            T::table_name(),
            T::id_column(),
        );
        let binds = [id.clone().into()];
        let row = bind_values(sqlx::query(&sql), &binds)?
            .fetch_optional(&self.pool)
            .await
            .map_err(SqlxErrorExt::into_data_error)?;
        match row {
            Some(row) => Ok(Some(T::from_row(&fields, decode_row(&row)?)?)),
            None => Ok(None),
        }
    }

    async fn get_reference<T: Entity>(&self, id: &T::Id) -> Result<Option<T>, DataError> {
        let sql = format!(
            "SELECT {id_col} FROM {} WHERE {id_col} = ?",
            T::table_name(),
            id_col = T::id_column(),
        );
        let binds = [id.clone().into()];
        let row = bind_values(sqlx::query(&sql), &binds)?
            .fetch_optional(&self.pool)
            .await
            .map_err(SqlxErrorExt::into_data_error)?;
        if row.is_none() {
            return Ok(None);
        }
        let mut entity = T::default();
        entity.set_attribute(T::id_column(), id.clone().into())?;
        entity.state_mut().deferred = true;
        Ok(Some(entity))
    }

    async fn persist<T: Entity>(&self, entity: &mut T) -> Result<(), DataError> {
        let generated = entity.primary_key().is_none();
        let mut cols = Vec::new();
        let mut binds = Vec::new();
        for attr in T::attributes() {
            if generated && attr.name == T::id_column() {
                continue;
            }
            cols.push(attr.name);
            binds.push((attr.get)(entity));
        }
        let placeholders = vec!["?"; cols.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({placeholders})",
            T::table_name(),
            cols.join(", "),
        );
        debug!(%sql, "persist");
        let result = bind_values(sqlx::query(&sql), &binds)?
            .execute(&self.pool)
            .await
            .map_err(SqlxErrorExt::into_data_error)?;
        if generated {
            entity.set_attribute(T::id_column(), Value::Int(result.last_insert_rowid()))?;
        }
        Ok(())
    }

    async fn merge<T: Entity>(&self, entity: &T) -> Result<(), DataError> {
        let id = entity
            .primary_key()
            .ok_or(DataError::MissingPrimaryKey(T::table_name()))?;
        let mut sets = Vec::new();
        let mut binds = Vec::new();
        for attr in T::attributes() {
            if attr.name == T::id_column() {
                continue;
            }
            sets.push(format!("{} = ?", attr.name));
            binds.push((attr.get)(entity));
        }
        binds.push(id.into());
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ?",
            T::table_name(),
            sets.join(", "),
            T::id_column(),
        );
        debug!(%sql, "merge");
        bind_values(sqlx::query(&sql), &binds)?
            .execute(&self.pool)
            .await
            .map_err(SqlxErrorExt::into_data_error)?;
        Ok(())
    }

    async fn remove<T: Entity>(&self, id: &T::Id) -> Result<(), DataError> {
        let sql = format!(
            "DELETE FROM {} WHERE {} = ?",
            T::table_name(),
            T::id_column(),
        );
        let binds = [id.clone().into()];
        bind_values(sqlx::query(&sql), &binds)?
            .execute(&self.pool)
            .await
            .map_err(SqlxErrorExt::into_data_error)?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), DataError> {
        // no identity map to clear
        Ok(())
    }
}
