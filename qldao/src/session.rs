//! The persistence-session abstraction the data layer executes against.
//!
//! The core only ever *consumes* this trait; concrete implementations live in
//! backend crates (e.g. `qldao-sqlx`). Transaction scope, retries, timeouts
//! and cancellation are all properties of the session, passed through
//! unmodified.

use crate::entity::Entity;
use crate::error::DataError;
use crate::query::Window;
use crate::value::Value;
use std::future::Future;

/// One result row as an ordered tuple of dynamic values, in the column order
/// of the executed statement.
pub type Row = Vec<Value>;

/// A unit-of-work handle over the underlying store.
///
/// Uses RPITIT (return-position `impl Trait` in traits) — no `async-trait`
/// needed. A session must not be shared across concurrent logical units of
/// work; that discipline is the caller's responsibility.
pub trait Session: Send + Sync {
    /// Execute a result-producing statement with positional binds, applying
    /// the pagination window. `cacheable` hints that results may be served
    /// from a second-level cache; implementations may ignore it.
    fn select(
        &self,
        sql: &str,
        binds: &[Value],
        window: Window,
        cacheable: bool,
    ) -> impl Future<Output = Result<Vec<Row>, DataError>> + Send;

    /// Execute a scalar-producing statement (counts).
    fn select_scalar(
        &self,
        sql: &str,
        binds: &[Value],
    ) -> impl Future<Output = Result<i64, DataError>> + Send;

    /// Execute a bulk update/delete statement, returning affected rows.
    fn execute(
        &self,
        sql: &str,
        binds: &[Value],
    ) -> impl Future<Output = Result<u64, DataError>> + Send;

    /// Eager full load by primary key.
    fn find<T: Entity>(
        &self,
        id: &T::Id,
    ) -> impl Future<Output = Result<Option<T>, DataError>> + Send;

    /// Load by primary key as a deferred reference: the returned entity may
    /// carry only its key, with `state().deferred` set.
    fn get_reference<T: Entity>(
        &self,
        id: &T::Id,
    ) -> impl Future<Output = Result<Option<T>, DataError>> + Send;

    /// Persist a new entity. Implementations may backfill a generated
    /// primary key into the entity.
    fn persist<T: Entity>(
        &self,
        entity: &mut T,
    ) -> impl Future<Output = Result<(), DataError>> + Send;

    /// Merge an existing entity's attribute values by primary key.
    fn merge<T: Entity>(&self, entity: &T) -> impl Future<Output = Result<(), DataError>> + Send;

    /// Remove the row with the given primary key.
    fn remove<T: Entity>(
        &self,
        id: &T::Id,
    ) -> impl Future<Output = Result<(), DataError>> + Send;

    /// Clear any request-scoped identity cache.
    fn clear(&self) -> impl Future<Output = Result<(), DataError>> + Send;
}
