//! Structured store access for epiqa.
//!
//! The orchestrator only sees the [`StructuredQueryRunner`] trait. The
//! production adapter is [`SqliteQueryRunner`], which opens the surveillance
//! database read-only and screens every statement with [`QueryGuard`].

pub mod guard;
pub mod result;
pub mod runner;
pub mod schema;
pub mod sqlite;

pub use guard::QueryGuard;
pub use result::{ResultSet, Value};
pub use runner::StructuredQueryRunner;
pub use schema::SchemaCatalog;
pub use sqlite::SqliteQueryRunner;
