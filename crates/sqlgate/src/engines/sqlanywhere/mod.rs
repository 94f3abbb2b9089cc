//! SQL-Anywhere-like engine: `SYS.*` catalog views, `DEFAULT AUTOINCREMENT`
//! identities, `TOP n START AT` pagination, session-variable routine
//! emulation over a TDS-derived driver.

mod ddl;
mod dml;
mod introspect;
mod routine;
mod types;

pub use ddl::SqlAnyDdl;
pub use dml::SqlAnyDml;
pub use introspect::SqlAnyIntrospector;
pub use routine::SqlAnyRoutines;
pub use types::SqlAnyTranslator;
