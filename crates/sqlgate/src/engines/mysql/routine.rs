//! MySQL routine invocation: session-variable emulation.
//!
//! The wire protocol cannot bind OUT parameters from a prepared `CALL`, so
//! output values round-trip through `@user` variables.

use async_trait::async_trait;

use crate::core::identifier::QuoteStyle;
use crate::core::traits::{Executor, RoutineCaller};
use crate::core::value::{CallResult, ParamDirection, RoutineParam, SqlValue};
use crate::engines::common::call_with_session_vars;
use crate::error::{Result, SchemaError};

pub struct MySqlRoutines;

#[async_trait]
impl RoutineCaller for MySqlRoutines {
    async fn call_procedure(
        &self,
        exec: &dyn Executor,
        name: &str,
        params: &mut [RoutineParam],
    ) -> Result<CallResult> {
        let raw = QuoteStyle::Backtick.quote(name)?;
        call_with_session_vars(exec, &raw, params).await
    }

    async fn call_function(
        &self,
        exec: &dyn Executor,
        name: &str,
        params: &mut [RoutineParam],
    ) -> Result<CallResult> {
        if params.iter().any(|p| p.direction != ParamDirection::In) {
            return Err(SchemaError::RoutineInvocation(format!(
                "Function '{}' cannot take OUT parameters",
                name
            )));
        }
        let raw = QuoteStyle::Backtick.quote(name)?;
        let placeholders: Vec<&str> = params.iter().map(|_| "?").collect();
        let bound: Vec<SqlValue> = params.iter().map(|p| p.value.clone()).collect();
        let rows = exec
            .query(
                &format!("SELECT {}({})", raw, placeholders.join(", ")),
                &bound,
            )
            .await?;
        Ok(CallResult {
            result_sets: vec![rows],
        })
    }
}
