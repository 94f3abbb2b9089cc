//! SQL Anywhere DDL rendering.

use crate::core::descriptor::ColumnDescriptor;
use crate::core::identifier::QuoteStyle;
use crate::core::schema::TableName;
use crate::core::traits::DdlBuilder;
use crate::error::Result;

pub struct SqlAnyDdl;

impl DdlBuilder for SqlAnyDdl {
    fn engine(&self) -> &'static str {
        "sqlanywhere"
    }

    fn quote_style(&self) -> QuoteStyle {
        QuoteStyle::DoubleQuote
    }

    // Identity is spelled as a default.
    fn identity_suffix(&self, _col: &ColumnDescriptor) -> Option<String> {
        Some("DEFAULT AUTOINCREMENT".to_string())
    }

    fn alter_column(&self, table: &TableName, col: &ColumnDescriptor) -> Result<Vec<String>> {
        Ok(vec![format!(
            "ALTER TABLE {} MODIFY {}",
            self.qualify(table)?,
            self.column_definition(col)?
        )])
    }

    fn rename_column(
        &self,
        table: &TableName,
        column: &str,
        new_name: &str,
        _definition: Option<&ColumnDescriptor>,
    ) -> Result<String> {
        Ok(format!(
            "ALTER TABLE {} RENAME {} TO {}",
            self.qualify(table)?,
            self.quote(column)?,
            self.quote(new_name)?
        ))
    }
}
