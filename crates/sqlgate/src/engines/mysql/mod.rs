//! MySQL-like engine: backtick quoting, `information_schema` catalogs,
//! `AUTO_INCREMENT` identities, session-variable routine emulation.

mod ddl;
mod dml;
mod introspect;
mod routine;
mod types;

pub use ddl::MySqlDdl;
pub use dml::MySqlDml;
pub use introspect::MySqlIntrospector;
pub use routine::MySqlRoutines;
pub use types::MySqlTranslator;
