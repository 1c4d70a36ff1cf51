//! # qldao-sqlx — SQLite backend for the qldao data layer
//!
//! This crate provides the [SQLx](https://github.com/launchbadge/sqlx)-specific
//! implementation of the persistence session that `qldao`'s orchestrator
//! executes against. It depends on [`qldao`] for the abstract traits and
//! types, and adds value binding, row decoding and error bridging needed to
//! talk to a real database.
//!
//! # What's in this crate
//!
//! | Type | Description |
//! |------|-------------|
//! | [`SqliteSession`] | `Session` implementation over an `sqlx::SqlitePool` |
//! | [`SqlxErrorExt`] | Extension trait to convert `sqlx::Error` → `DataError` (`.into_data_error()`) |
//! | [`SqlxResult<T>`] | Type alias for `Result<T, DataError>` |
//!
//! # Quick start
//!
//! ```ignore
//! use qldao::Dao;
//! use qldao_sqlx::SqliteSession;
//! use sqlx::sqlite::SqlitePoolOptions;
//!
//! let pool = SqlitePoolOptions::new().connect("sqlite::memory:").await?;
//! let dao = Dao::new(SqliteSession::new(pool));
//! ```
//!
//! # Error bridging
//!
//! Due to Rust's orphan rules, `From<sqlx::Error> for DataError` can't be
//! implemented here. Use the [`SqlxErrorExt`] trait instead:
//!
//! ```ignore
//! use qldao_sqlx::SqlxErrorExt;
//!
//! let row = sqlx::query("SELECT ...")
//!     .fetch_one(&pool)
//!     .await
//!     .map_err(|e| e.into_data_error())?;
//! ```

pub mod error;
pub mod session;

pub use error::{SqlxErrorExt, SqlxResult};
pub use session::SqliteSession;

/// Re-exports of the most commonly used types from both `qldao` and this
/// crate.
pub mod prelude {
    pub use crate::{SqliteSession, SqlxErrorExt};
    pub use qldao::prelude::*;
}
