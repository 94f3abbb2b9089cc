//! Engine-neutral core: data model, value types, identifier handling, and
//! the strategy traits each engine implements.

pub mod coerce;
pub mod descriptor;
pub mod identifier;
pub mod schema;
pub mod traits;
pub mod value;

pub use descriptor::{AbstractType, ColumnDescriptor, TableDescriptor};
pub use identifier::{split_qualified, validate_identifier, QuoteStyle};
pub use schema::{
    ColumnMap, ColumnSchema, FkEdge, FunctionSchema, JunctionRef, PrimaryKey, ProcedureSchema,
    Relation, RelationKind, TableName, TableSchema,
};
pub use traits::{
    DdlBuilder, DmlBuilder, Executor, InsertCommand, Introspector, JoinClause, KeyRetrieval,
    RoutineCaller, SelectOptions, TypeTranslator, UpdateOptions,
};
pub use value::{CallResult, ParamDirection, RoutineParam, Row, SqlValue};
