//! SQLite has no stored routines; every invocation is unsupported.

use async_trait::async_trait;

use crate::core::traits::{Executor, RoutineCaller};
use crate::core::value::{CallResult, RoutineParam};
use crate::error::{Result, SchemaError};

pub struct SqliteRoutines;

#[async_trait]
impl RoutineCaller for SqliteRoutines {
    async fn call_procedure(
        &self,
        _exec: &dyn Executor,
        name: &str,
        _params: &mut [RoutineParam],
    ) -> Result<CallResult> {
        Err(SchemaError::unsupported(
            "sqlite",
            format!("CALL procedure '{}'", name),
        ))
    }

    async fn call_function(
        &self,
        _exec: &dyn Executor,
        name: &str,
        _params: &mut [RoutineParam],
    ) -> Result<CallResult> {
        Err(SchemaError::unsupported(
            "sqlite",
            format!("CALL function '{}'", name),
        ))
    }
}
