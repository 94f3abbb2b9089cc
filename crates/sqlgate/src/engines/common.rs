//! Helpers shared across engine routine callers.

use crate::core::traits::Executor;
use crate::core::value::{CallResult, ParamDirection, RoutineParam, Row, SqlValue};
use crate::error::Result;

/// Copy output values from a row into matching OUT/INOUT parameters.
///
/// Column names are matched case-insensitively, with a leading `@` on the
/// column name tolerated (session-variable fetches).
pub fn assign_outputs_from_row(row: &Row, params: &mut [RoutineParam]) {
    for param in params.iter_mut() {
        if !param.direction.is_output() {
            continue;
        }
        let hit = row
            .columns
            .iter()
            .position(|c| c.trim_start_matches('@').eq_ignore_ascii_case(&param.name));
        if let Some(i) = hit {
            param.value = row.values[i].clone();
        }
    }
}

/// Consume a trailing OUT-parameter fetch from a routine's result sets.
///
/// Heuristic: the last result set is treated as the OUT fetch when it holds
/// exactly one row whose column names are all OUT/INOUT parameter names. A
/// genuine final result set that happens to share its column names with the
/// OUT parameters is indistinguishable and will be consumed; this is a known
/// limitation of the convention, not corrected here.
pub fn take_out_fetch(result_sets: &mut Vec<Vec<Row>>, params: &mut [RoutineParam]) -> bool {
    let outputs: Vec<&str> = params
        .iter()
        .filter(|p| p.direction.is_output())
        .map(|p| p.name.as_str())
        .collect();
    if outputs.is_empty() {
        return false;
    }

    let Some(last) = result_sets.last() else {
        return false;
    };
    if last.len() != 1 {
        return false;
    }
    let row = &last[0];
    if row.columns.is_empty() {
        return false;
    }
    let all_outputs = row.columns.iter().all(|c| {
        let bare = c.trim_start_matches('@');
        outputs.iter().any(|o| o.eq_ignore_ascii_case(bare))
    });
    if !all_outputs {
        return false;
    }

    assign_outputs_from_row(row, params);
    result_sets.pop();
    true
}

/// Session-variable routine emulation for drivers that cannot bind output
/// parameters (MySQL-style and TDS-derived dialects).
///
/// Renders `SET @p = <literal>` for every OUT/INOUT parameter, a
/// `CALL name(...)` body where IN parameters stay bound and output
/// parameters appear as `@p`, and a trailing `SELECT @p AS p, ...` whose
/// single row is copied back into the parameter slice.
pub async fn call_with_session_vars(
    exec: &dyn Executor,
    raw_name: &str,
    params: &mut [RoutineParam],
) -> Result<CallResult> {
    let mut args = Vec::with_capacity(params.len());
    let mut bound: Vec<SqlValue> = Vec::new();
    let mut outputs: Vec<&RoutineParam> = Vec::new();

    for param in params.iter() {
        match param.direction {
            ParamDirection::In => {
                args.push("?".to_string());
                bound.push(param.value.clone());
            }
            ParamDirection::Out | ParamDirection::InOut => {
                args.push(format!("@{}", param.name));
                outputs.push(param);
            }
        }
    }

    for param in &outputs {
        exec.execute(
            &format!("SET @{} = {}", param.name, param.value.to_sql_literal()),
            &[],
        )
        .await?;
    }

    let call_sql = format!("CALL {}({})", raw_name, args.join(", "));
    tracing::debug!(sql = %call_sql, "Invoking routine via session variables");
    let mut result_sets = exec.query_multi(&call_sql, &bound).await?;
    result_sets.retain(|rs| !rs.is_empty());

    if !outputs.is_empty() {
        let select_list: Vec<String> = outputs
            .iter()
            .map(|p| format!("@{} AS {}", p.name, p.name))
            .collect();
        let fetch = exec
            .query(&format!("SELECT {}", select_list.join(", ")), &[])
            .await?;
        if let Some(row) = fetch.first() {
            assign_outputs_from_row(row, params);
        }
    }

    Ok(CallResult { result_sets })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_fetch_consumed() {
        let mut params = vec![
            RoutineParam::input("x", 5i64),
            RoutineParam::output("total"),
        ];
        let mut sets = vec![
            vec![Row::from_pairs([("name", SqlValue::from("a"))])],
            vec![Row::from_pairs([("total", SqlValue::I64(42))])],
        ];

        assert!(take_out_fetch(&mut sets, &mut params));
        assert_eq!(sets.len(), 1);
        assert_eq!(params[1].value, SqlValue::I64(42));
    }

    #[test]
    fn test_out_fetch_ignores_multi_row_set() {
        let mut params = vec![RoutineParam::output("total")];
        let mut sets = vec![vec![
            Row::from_pairs([("total", SqlValue::I64(1))]),
            Row::from_pairs([("total", SqlValue::I64(2))]),
        ]];

        assert!(!take_out_fetch(&mut sets, &mut params));
        assert_eq!(sets.len(), 1);
        assert!(params[0].value.is_null());
    }

    #[test]
    fn test_out_fetch_requires_output_params() {
        let mut params = vec![RoutineParam::input("x", 1i64)];
        let mut sets = vec![vec![Row::from_pairs([("x", SqlValue::I64(1))])]];
        assert!(!take_out_fetch(&mut sets, &mut params));
    }

    #[test]
    fn test_assign_outputs_tolerates_at_prefix() {
        let mut params = vec![RoutineParam::output("counter")];
        let row = Row::from_pairs([("@counter", SqlValue::I64(9))]);
        assign_outputs_from_row(&row, &mut params);
        assert_eq!(params[0].value, SqlValue::I64(9));
    }
}
