//! SQLite-like engine: file-backed storage, `sqlite_master`/PRAGMA
//! catalogs, inline foreign keys, no stored routines.

mod ddl;
mod dml;
mod introspect;
mod routine;
mod types;

pub use ddl::SqliteDdl;
pub use dml::SqliteDml;
pub use introspect::SqliteIntrospector;
pub use routine::SqliteRoutines;
pub use types::SqliteTranslator;
