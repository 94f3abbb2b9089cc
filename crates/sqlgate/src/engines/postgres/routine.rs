//! PostgreSQL routine invocation: OUT values come back embedded in the
//! result set.

use async_trait::async_trait;

use crate::core::identifier::QuoteStyle;
use crate::core::traits::{Executor, RoutineCaller};
use crate::core::value::{CallResult, ParamDirection, RoutineParam, SqlValue};
use crate::engines::common::take_out_fetch;
use crate::error::Result;

pub struct PgRoutines;

const QUOTE: QuoteStyle = QuoteStyle::DoubleQuote;

/// How OUT positions appear in the rendered argument list. Procedures
/// take a `NULL` placeholder the server fills; functions exclude OUT
/// parameters from their input signature, so the position is omitted.
enum OutRendering {
    NullPlaceholder,
    Omitted,
}

/// Render the argument list: IN/INOUT bind as `$n`, OUT positions
/// render per `out_rendering`.
fn render_args(params: &[RoutineParam], out_rendering: OutRendering) -> (String, Vec<SqlValue>) {
    let mut args = Vec::with_capacity(params.len());
    let mut bound = Vec::new();
    for param in params {
        match param.direction {
            ParamDirection::In | ParamDirection::InOut => {
                bound.push(param.value.clone());
                args.push(format!("${}", bound.len()));
            }
            ParamDirection::Out => match out_rendering {
                OutRendering::NullPlaceholder => args.push("NULL".to_string()),
                OutRendering::Omitted => {}
            },
        }
    }
    (args.join(", "), bound)
}

#[async_trait]
impl RoutineCaller for PgRoutines {
    async fn call_procedure(
        &self,
        exec: &dyn Executor,
        name: &str,
        params: &mut [RoutineParam],
    ) -> Result<CallResult> {
        let (args, bound) = render_args(params, OutRendering::NullPlaceholder);
        let sql = format!("CALL {}({})", QUOTE.quote(name)?, args);
        tracing::debug!(sql = %sql, "Invoking procedure");

        let mut result_sets = exec.query_multi(&sql, &bound).await?;
        result_sets.retain(|rs| !rs.is_empty());
        take_out_fetch(&mut result_sets, params);
        Ok(CallResult { result_sets })
    }

    async fn call_function(
        &self,
        exec: &dyn Executor,
        name: &str,
        params: &mut [RoutineParam],
    ) -> Result<CallResult> {
        let (args, bound) = render_args(params, OutRendering::Omitted);
        let sql = format!("SELECT * FROM {}({})", QUOTE.quote(name)?, args);
        tracing::debug!(sql = %sql, "Invoking function");

        let rows = exec.query(&sql, &bound).await?;
        let mut result_sets = vec![rows];
        take_out_fetch(&mut result_sets, params);
        Ok(CallResult { result_sets })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_procedure_args_render_out_as_null() {
        let params = vec![
            RoutineParam::input("a", 1i64),
            RoutineParam::output("total"),
            RoutineParam::inout("b", 2i64),
        ];
        let (args, bound) = render_args(&params, OutRendering::NullPlaceholder);
        assert_eq!(args, "$1, NULL, $2");
        assert_eq!(bound.len(), 2);
    }

    // OUT parameters are not part of a function's input signature, so
    // they must not appear in the call at all.
    #[test]
    fn test_function_args_omit_out_positions() {
        let params = vec![
            RoutineParam::input("a", 1i64),
            RoutineParam::output("total"),
            RoutineParam::inout("b", 2i64),
        ];
        let (args, bound) = render_args(&params, OutRendering::Omitted);
        assert_eq!(args, "$1, $2");
        assert_eq!(bound.len(), 2);
    }
}
