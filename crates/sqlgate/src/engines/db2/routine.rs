//! DB2 routine invocation: the driver binds OUT parameters natively.

use async_trait::async_trait;

use crate::core::identifier::QuoteStyle;
use crate::core::traits::{Executor, RoutineCaller};
use crate::core::value::{CallResult, ParamDirection, RoutineParam, SqlValue};
use crate::error::Result;

pub struct Db2Routines;

const QUOTE: QuoteStyle = QuoteStyle::DoubleQuote;

#[async_trait]
impl RoutineCaller for Db2Routines {
    async fn call_procedure(
        &self,
        exec: &dyn Executor,
        name: &str,
        params: &mut [RoutineParam],
    ) -> Result<CallResult> {
        let placeholders: Vec<&str> = params.iter().map(|_| "?").collect();
        let sql = format!("CALL {}({})", QUOTE.quote(name)?, placeholders.join(", "));
        tracing::debug!(sql = %sql, "Invoking procedure with bound OUT parameters");

        // The executor writes OUT/INOUT values back into `params`.
        let mut result_sets = exec.call(&sql, params).await?;
        result_sets.retain(|rs| !rs.is_empty());
        Ok(CallResult { result_sets })
    }

    async fn call_function(
        &self,
        exec: &dyn Executor,
        name: &str,
        params: &mut [RoutineParam],
    ) -> Result<CallResult> {
        let placeholders: Vec<String> = params
            .iter()
            .filter(|p| p.direction == ParamDirection::In)
            .map(|_| "?".to_string())
            .collect();
        let bound: Vec<SqlValue> = params
            .iter()
            .filter(|p| p.direction == ParamDirection::In)
            .map(|p| p.value.clone())
            .collect();
        let sql = format!(
            "SELECT {}({}) FROM sysibm.sysdummy1",
            QUOTE.quote(name)?,
            placeholders.join(", ")
        );
        let rows = exec.query(&sql, &bound).await?;
        Ok(CallResult {
            result_sets: vec![rows],
        })
    }
}
