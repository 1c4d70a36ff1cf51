//! # qldao — generic data access layer
//!
//! A reflection-free take on the classic generic DAO: entity types declare a
//! static capability table once, and every CRUD, count, existence, scan and
//! projection operation is derived from it — no per-entity query code.
//!
//! # What's in this crate
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Entity`] / [`EntityExt`] | Capability-table entity model: typed get/set by name, structural equality/hash, deep clone, diff |
//! | [`attributes!`] | Declarative macro generating a type's capability table |
//! | [`Value`] / [`FromValue`] | Dynamic attribute and parameter values, with coercions |
//! | [`query`] | Pure query construction: projections, predicates, ordering, parameter binding |
//! | [`Session`] | The abstract persistence session the layer executes against |
//! | [`Dao`] | The generic CRUD/scan orchestrator |
//! | [`QueryResult`] | A page of rows paired with the un-windowed total count |
//! | [`DataError`] | The single error type of the layer |
//!
//! # Quick start
//!
//! ```ignore
//! use qldao::prelude::*;
//!
//! #[derive(Default)]
//! struct UserEntity {
//!     id: Option<i64>,
//!     username: String,
//!     state: EntityState,
//! }
//!
//! impl Entity for UserEntity {
//!     type Id = i64;
//!     fn table_name() -> &'static str { "users" }
//!     fn id_column() -> &'static str { "id" }
//!     qldao::attributes! { UserEntity { id, username } }
//!     fn primary_key(&self) -> Option<i64> { self.id }
//!     fn state(&self) -> &EntityState { &self.state }
//!     fn state_mut(&mut self) -> &mut EntityState { &mut self.state }
//! }
//!
//! let dao = Dao::new(session);
//! let mut user = UserEntity { username: "alice".into(), ..Default::default() };
//! dao.save(&mut user).await?;   // routes to create: no primary key yet
//! let page: QueryResult<UserEntity> = dao
//!     .get_scroll_data(Window::new(0, 20), "username LIKE ?",
//!                      &Params::positional([Value::Text("a%".into())]),
//!                      &OrderBy::new().asc("id"))
//!     .await?;
//! ```
//!
//! The core never talks to a database itself: it builds statements, binds
//! parameters and rehydrates rows, delegating execution to whatever
//! [`Session`] it is handed (see `qldao-sqlx` for a SQLite one).

pub mod dao;
pub mod entity;
pub mod error;
pub mod page;
pub mod query;
pub mod session;
pub mod value;

pub use dao::Dao;
pub use entity::{Attribute, Entity, EntityExt, EntityState};
pub use error::DataError;
pub use page::QueryResult;
pub use query::{OrderBy, Params, SortDir, Window};
pub use session::{Row, Session};
pub use value::{FromValue, Value};

pub mod prelude {
    //! Re-exports of the most commonly used data types.
    pub use crate::{
        Dao, DataError, Entity, EntityExt, EntityState, FromValue, OrderBy, Params, QueryResult,
        Session, SortDir, Value, Window,
    };
}
