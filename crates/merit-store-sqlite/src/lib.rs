//! SQLite backend for the Merit achievement stores.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. The two halves of an achievement live
//! in separate databases: [`SqliteContentStore`] keeps content as JSON
//! documents, [`SqliteReferenceStore`] keeps references and the directory as
//! relational rows. Nothing spans both connections.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::{SqliteContentStore, SqliteReferenceStore};
