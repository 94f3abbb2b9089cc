//! DB2-like engine: SYSCAT (LUW) or QSYS2 (iSeries) catalogs selected by a
//! one-time probe, `GENERATED ALWAYS AS IDENTITY`, `FINAL TABLE` key
//! retrieval, natively bound OUT parameters.

mod ddl;
mod dml;
mod introspect;
mod routine;
mod types;

pub use ddl::Db2Ddl;
pub use dml::Db2Dml;
pub use introspect::{Db2Introspector, Db2Variant};
pub use routine::Db2Routines;
pub use types::Db2Translator;
