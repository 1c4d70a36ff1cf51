//! Generic CRUD/scan orchestrator.
//!
//! [`Dao`] owns no entity-specific logic: every operation resolves through
//! the entity's capability table and the pure query functions, and delegates
//! execution to the [`Session`] it was constructed with. The orchestrator is
//! stateless beyond that session handle and safe to share across threads as
//! long as each logical unit of work gets its own session.

use crate::entity::{Entity, EntityExt};
use crate::error::DataError;
use crate::page::QueryResult;
use crate::query::{self, OrderBy, Params, Window};
use crate::session::{Row, Session};
use tracing::debug;

/// The generic data-access API consumed by callers.
pub struct Dao<S> {
    session: S,
}

impl<S: Clone> Clone for Dao<S> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
        }
    }
}

impl<S: Session> Dao<S> {
    pub fn new(session: S) -> Self {
        Self { session }
    }

    /// The underlying session handle.
    pub fn session(&self) -> &S {
        &self.session
    }

    /// Clear the session's request-scoped identity cache.
    pub async fn clear(&self) -> Result<(), DataError> {
        self.session.clear().await
    }

    pub async fn create<T: Entity>(&self, entity: &mut T) -> Result<(), DataError> {
        self.session.persist(entity).await
    }

    /// Sequential loop of single creates; no atomicity beyond what each
    /// session call offers.
    pub async fn create_batch<T: Entity>(&self, entities: &mut [T]) -> Result<(), DataError> {
        for entity in entities {
            self.create(entity).await?;
        }
        Ok(())
    }

    pub async fn update<T: Entity>(&self, entity: &T) -> Result<(), DataError> {
        if entity.primary_key().is_none() {
            return Err(DataError::MissingPrimaryKey(T::table_name()));
        }
        self.session.merge(entity).await
    }

    /// Dispatch to create or update based solely on primary-key presence.
    pub async fn save<T: Entity>(&self, entity: &mut T) -> Result<(), DataError> {
        if entity.primary_key().is_none() {
            self.create(entity).await
        } else {
            self.update(&*entity).await
        }
    }

    pub async fn save_all<T: Entity>(&self, entities: &mut [T]) -> Result<(), DataError> {
        for entity in entities {
            self.save(entity).await?;
        }
        Ok(())
    }

    /// Look up the id and remove the row if present; a missing id is
    /// silently skipped.
    pub async fn delete<T: Entity>(&self, id: &T::Id) -> Result<(), DataError> {
        if self.session.find::<T>(id).await?.is_some() {
            self.session.remove::<T>(id).await?;
        }
        Ok(())
    }

    pub async fn delete_many<T: Entity>(&self, ids: &[T::Id]) -> Result<(), DataError> {
        for id in ids {
            self.delete::<T>(id).await?;
        }
        Ok(())
    }

    /// Bulk delete over a predicate fragment, returning affected rows.
    pub async fn delete_by_where<T: Entity>(
        &self,
        predicate: &str,
        params: &Params,
    ) -> Result<u64, DataError> {
        let sql = query::delete_sql::<T>(predicate)?;
        let (sql, binds) = query::bind_params(&sql, params)?;
        debug!(%sql, binds = binds.len(), "bulk delete");
        self.session.execute(&sql, &binds).await
    }

    /// Eager full load by primary key.
    pub async fn find<T: Entity>(&self, id: &T::Id) -> Result<Option<T>, DataError> {
        self.session.find(id).await
    }

    /// Load a reference whose non-key attributes may be deferred until
    /// [`load_lazy_attributes`](Dao::load_lazy_attributes).
    ///
    /// Any provider failure is downgraded to `None` — a deliberately softer
    /// contract than [`find`](Dao::find).
    pub async fn load<T: Entity>(&self, id: &T::Id) -> Option<T> {
        self.session.get_reference(id).await.unwrap_or(None)
    }

    /// Materialize every deferred attribute of a lazy reference. Idempotent;
    /// a fully loaded entity is left untouched.
    pub async fn load_lazy_attributes<T: Entity>(&self, entity: &mut T) -> Result<(), DataError> {
        if !entity.state().deferred {
            return Ok(());
        }
        let id = entity
            .primary_key()
            .ok_or(DataError::MissingPrimaryKey(T::table_name()))?;
        let full: T = self
            .session
            .find(&id)
            .await?
            .ok_or_else(|| DataError::NotFound(format!("broken reference into {}", T::table_name())))?;
        let names = T::attribute_names();
        entity.copy_attributes_from(&full, &names)?;
        entity.state_mut().deferred = false;
        Ok(())
    }

    /// The single entity matching the predicate, `None` when nothing
    /// matches, `AmbiguousResult` when more than one row does.
    pub async fn find_by_where<T: Entity>(
        &self,
        predicate: &str,
        params: &Params,
    ) -> Result<Option<T>, DataError> {
        let mut matches = self.query_by_where::<T>(predicate, params).await?;
        match matches.len() {
            0 => Ok(None),
            1 => Ok(Some(matches.remove(0))),
            matched => Err(DataError::AmbiguousResult { matched }),
        }
    }

    pub async fn get_count<T: Entity>(&self) -> Result<u64, DataError> {
        self.get_count_by_where::<T>("", &Params::None).await
    }

    /// Total rows matching the predicate, never windowed.
    pub async fn get_count_by_where<T: Entity>(
        &self,
        predicate: &str,
        params: &Params,
    ) -> Result<u64, DataError> {
        let sql = query::count_sql::<T>(predicate)?;
        let (sql, binds) = query::bind_params(&sql, params)?;
        let count = self.session.select_scalar(&sql, &binds).await?;
        Ok(count.max(0) as u64)
    }

    pub async fn is_existed_by_where<T: Entity>(
        &self,
        predicate: &str,
        params: &Params,
    ) -> Result<bool, DataError> {
        Ok(self.get_count_by_where::<T>(predicate, params).await? > 0)
    }

    /// All entities matching the predicate; an empty predicate matches the
    /// whole relation.
    pub async fn query_by_where<T: Entity>(
        &self,
        predicate: &str,
        params: &Params,
    ) -> Result<Vec<T>, DataError> {
        self.query_by_where_paged(predicate, params, Window::ALL)
            .await
    }

    pub async fn query_by_where_paged<T: Entity>(
        &self,
        predicate: &str,
        params: &Params,
        window: Window,
    ) -> Result<Vec<T>, DataError> {
        let rows = self
            .select_rows::<T>(None, predicate, params, window, &OrderBy::new(), true)
            .await?;
        let fields = T::attribute_names();
        rows.into_iter()
            .map(|row| T::from_row(&fields, row))
            .collect()
    }

    /// Partial-field scan, rehydrated positionally in the caller's field
    /// order; unselected fields stay at their zero value.
    pub async fn query_fields<T: Entity>(
        &self,
        fields: &[&str],
        predicate: &str,
        params: &Params,
        window: Window,
    ) -> Result<Vec<T>, DataError> {
        let rows = self
            .select_rows::<T>(Some(fields), predicate, params, window, &OrderBy::new(), false)
            .await?;
        rows.into_iter()
            .map(|row| T::from_row(fields, row))
            .collect()
    }

    /// Partial-field scan returned as raw tuples, in the caller's field
    /// order.
    pub async fn query_field_values<T: Entity>(
        &self,
        fields: &[&str],
        predicate: &str,
        params: &Params,
        window: Window,
    ) -> Result<Vec<Row>, DataError> {
        self.select_rows::<T>(Some(fields), predicate, params, window, &OrderBy::new(), false)
            .await
    }

    /// Execute the page query and an independent un-windowed count query
    /// over the same predicate, returning both results at once.
    pub async fn get_scroll_data<T: Entity>(
        &self,
        window: Window,
        predicate: &str,
        params: &Params,
        order: &OrderBy,
    ) -> Result<QueryResult<T>, DataError> {
        let rows = self
            .select_rows::<T>(None, predicate, params, window, order, true)
            .await?;
        let fields = T::attribute_names();
        let entities: Result<Vec<T>, DataError> = rows
            .into_iter()
            .map(|row| T::from_row(&fields, row))
            .collect();
        let total = self.get_count_by_where::<T>(predicate, params).await?;
        Ok(QueryResult::new(entities?, total))
    }

    /// [`get_scroll_data`](Dao::get_scroll_data) over a field projection.
    pub async fn get_scroll_data_fields<T: Entity>(
        &self,
        fields: &[&str],
        window: Window,
        predicate: &str,
        params: &Params,
        order: &OrderBy,
    ) -> Result<QueryResult<T>, DataError> {
        let rows = self
            .select_rows::<T>(Some(fields), predicate, params, window, order, true)
            .await?;
        let entities: Result<Vec<T>, DataError> = rows
            .into_iter()
            .map(|row| T::from_row(fields, row))
            .collect();
        let total = self.get_count_by_where::<T>(predicate, params).await?;
        Ok(QueryResult::new(entities?, total))
    }

    async fn select_rows<T: Entity>(
        &self,
        fields: Option<&[&str]>,
        predicate: &str,
        params: &Params,
        window: Window,
        order: &OrderBy,
        cacheable: bool,
    ) -> Result<Vec<Row>, DataError> {
        let sql = query::select_sql::<T>(fields, predicate, order)?;
        let (sql, binds) = query::bind_params(&sql, params)?;
        debug!(%sql, binds = binds.len(), "select");
        self.session.select(&sql, &binds, window, cacheable).await
    }
}
