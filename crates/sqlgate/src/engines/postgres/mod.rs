//! PostgreSQL-like engine: double-quote identifiers, `$n` placeholders,
//! `serial` identities, native `RETURNING`, result-set-embedded OUT values.

mod ddl;
mod dml;
mod introspect;
mod routine;
mod types;

pub use ddl::PgDdl;
pub use dml::PgDml;
pub use introspect::PgIntrospector;
pub use routine::PgRoutines;
pub use types::PgTranslator;
