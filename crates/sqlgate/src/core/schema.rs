//! Introspected schema metadata: tables, columns, relations, routines.
//!
//! These types are the read-side data model. The introspector builds them
//! from engine catalogs; the extras overlay merges user-supplied labels and
//! virtual relationships on top without mutating the introspected source.

use serde::{Deserialize, Serialize};

use super::descriptor::AbstractType;
use super::identifier::split_qualified;

/// A table name with optional schema qualifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableName {
    /// Schema/catalog qualifier, if any.
    pub schema: Option<String>,
    /// Unqualified table name.
    pub name: String,
}

impl TableName {
    /// Create from an unqualified name.
    pub fn bare(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
        }
    }

    /// Create with a schema qualifier.
    pub fn qualified(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            name: name.into(),
        }
    }

    /// Parse a possibly dotted name ("public.users").
    pub fn parse(name: &str) -> Self {
        let (schema, table) = split_qualified(name);
        Self {
            schema: schema.map(str::to_string),
            name: table.to_string(),
        }
    }

    /// Dotted form, used as cache key and in messages.
    #[must_use]
    pub fn dotted(&self) -> String {
        match &self.schema {
            Some(s) => format!("{}.{}", s, self.name),
            None => self.name.clone(),
        }
    }

    /// Lowercased dotted form for case-insensitive keying.
    #[must_use]
    pub fn cache_key(&self) -> String {
        self.dotted().to_ascii_lowercase()
    }

    /// Case-insensitive comparison against another name, ignoring a missing
    /// schema on either side.
    #[must_use]
    pub fn matches(&self, other: &TableName) -> bool {
        if !self.name.eq_ignore_ascii_case(&other.name) {
            return false;
        }
        match (&self.schema, &other.schema) {
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
            _ => true,
        }
    }
}

impl std::fmt::Display for TableName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.dotted())
    }
}

/// Turn `customer_order_items` into `Customer Order Items`.
pub fn humanize(name: &str) -> String {
    name.split(['_', '-'])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Primary key shape of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PrimaryKey {
    /// No primary key.
    #[default]
    None,
    /// Single-column key.
    Single(String),
    /// Ordered composite key.
    Composite(Vec<String>),
}

impl PrimaryKey {
    /// Build from an ordered column list.
    pub fn from_columns(mut cols: Vec<String>) -> Self {
        match cols.len() {
            0 => PrimaryKey::None,
            1 => PrimaryKey::Single(cols.remove(0)),
            _ => PrimaryKey::Composite(cols),
        }
    }

    /// Ordered key columns (empty when absent).
    #[must_use]
    pub fn columns(&self) -> Vec<&str> {
        match self {
            PrimaryKey::None => Vec::new(),
            PrimaryKey::Single(c) => vec![c.as_str()],
            PrimaryKey::Composite(cols) => cols.iter().map(String::as_str).collect(),
        }
    }

    /// Whether any key columns are present.
    #[must_use]
    pub fn is_present(&self) -> bool {
        !matches!(self, PrimaryKey::None)
    }
}

/// Introspected column metadata, merged with extras at read time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSchema {
    /// Column name.
    pub name: String,
    /// Engine-quoted name, ready for SQL.
    pub raw_name: String,
    /// Display label (humanized name unless overridden by extras).
    pub label: String,
    /// Abstract type.
    pub abstract_type: AbstractType,
    /// Engine-native type string.
    pub db_type: String,
    /// Length for sized types.
    pub length: Option<u32>,
    /// Precision for exact numerics.
    pub precision: Option<u32>,
    /// Scale for exact numerics.
    pub scale: Option<u32>,
    pub allow_null: bool,
    /// Default value: literal JSON, or `{"expression": "..."}` marker for
    /// non-literal defaults.
    pub default: Option<serde_json::Value>,
    pub auto_increment: bool,
    pub is_primary_key: bool,
    pub is_unique: bool,
    pub is_index: bool,
    pub is_foreign_key: bool,
    /// Referenced table when this column is a foreign key.
    pub ref_table: Option<String>,
    /// Referenced column when this column is a foreign key.
    pub ref_field: Option<String>,
    pub fixed_length: bool,
    pub supports_multibyte: bool,
    /// Column comment from the catalog, if any.
    pub comment: Option<String>,
}

impl ColumnSchema {
    /// Minimal column for building up during introspection.
    pub fn new(name: impl Into<String>, raw_name: impl Into<String>, db_type: impl Into<String>) -> Self {
        let name = name.into();
        let label = humanize(&name);
        Self {
            name,
            raw_name: raw_name.into(),
            label,
            abstract_type: AbstractType::String,
            db_type: db_type.into(),
            length: None,
            precision: None,
            scale: None,
            allow_null: true,
            default: None,
            auto_increment: false,
            is_primary_key: false,
            is_unique: false,
            is_index: false,
            is_foreign_key: false,
            ref_table: None,
            ref_field: None,
            fixed_length: false,
            supports_multibyte: false,
            comment: None,
        }
    }
}

/// Ordered, case-insensitive mapping of column name to [`ColumnSchema`].
///
/// Order is discovery order from the catalog; lookups ignore case.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnMap {
    columns: Vec<ColumnSchema>,
}

impl ColumnMap {
    /// Append a column, replacing any existing column of the same name.
    pub fn insert(&mut self, column: ColumnSchema) {
        if let Some(existing) = self
            .columns
            .iter_mut()
            .find(|c| c.name.eq_ignore_ascii_case(&column.name))
        {
            *existing = column;
        } else {
            self.columns.push(column);
        }
    }

    /// Case-insensitive lookup.
    pub fn get(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Case-insensitive mutable lookup.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut ColumnSchema> {
        self.columns
            .iter_mut()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Remove a column by name, preserving order of the rest.
    pub fn remove(&mut self, name: &str) -> Option<ColumnSchema> {
        let idx = self
            .columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))?;
        Some(self.columns.remove(idx))
    }

    /// Columns in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &ColumnSchema> {
        self.columns.iter()
    }

    /// Mutable iteration in discovery order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ColumnSchema> {
        self.columns.iter_mut()
    }

    /// Column names in discovery order.
    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Kind of inferred relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    BelongsTo,
    HasMany,
    ManyMany,
}

impl RelationKind {
    /// Spelling used in relation names and client payloads.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::BelongsTo => "belongs_to",
            RelationKind::HasMany => "has_many",
            RelationKind::ManyMany => "many_many",
        }
    }
}

/// Junction descriptor for many-to-many relations: the linking table and
/// its two foreign-key columns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JunctionRef {
    pub table: TableName,
    /// Column in the junction pointing at the local table.
    pub local_column: String,
    /// Column in the junction pointing at the target table.
    pub target_column: String,
}

/// One relation edge of a table, derived from foreign keys or supplied as a
/// virtual relationship through extras.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relation {
    pub kind: RelationKind,
    /// Target (related) table.
    pub target: TableName,
    /// Column on the local table participating in the relation.
    pub local_column: String,
    /// Column on the target table participating in the relation.
    pub target_column: String,
    /// Junction descriptor, present only for many-to-many.
    pub junction: Option<JunctionRef>,
    /// True when this relation came from extras rather than FK metadata.
    #[serde(default)]
    pub is_virtual: bool,
}

impl Relation {
    /// Conventional relation name, e.g. `users_by_owner_id` or
    /// `tags_via_item_tags`.
    ///
    /// Both sides of a foreign key name themselves after the child's FK
    /// column: for belongs_to that is the local column, for has_many the
    /// target column. Two foreign keys from the same child to one parent
    /// therefore stay distinguishable from either side.
    #[must_use]
    pub fn name(&self) -> String {
        match (&self.kind, &self.junction) {
            (RelationKind::ManyMany, Some(j)) => {
                format!("{}_via_{}", self.target.name, j.table.name)
            }
            (RelationKind::HasMany, _) => {
                format!("{}_by_{}", self.target.name, self.target_column)
            }
            _ => format!("{}_by_{}", self.target.name, self.local_column),
        }
    }
}

/// Raw foreign-key edge from introspection: child column → parent column.
///
/// Multi-column foreign keys surface as one edge per column pair, sharing a
/// constraint name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FkEdge {
    /// Constraint name as reported by the catalog.
    pub constraint: String,
    /// Child (referencing) table.
    pub table: TableName,
    /// Child column.
    pub column: String,
    /// Parent (referenced) table.
    pub ref_table: TableName,
    /// Parent column.
    pub ref_column: String,
}

/// Introspected table metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name, schema-qualified when the engine reported one.
    pub name: TableName,
    /// Engine-quoted qualified name, ready for SQL.
    pub raw_name: String,
    /// Display label (humanized unless overridden by extras).
    pub label: String,
    /// Description from extras, if any.
    pub description: Option<String>,
    /// Ordered column map.
    pub columns: ColumnMap,
    /// Primary key shape.
    pub primary_key: PrimaryKey,
    /// Identity/sequence name backing the key, where the engine exposes one.
    pub sequence_name: Option<String>,
    /// Relations inferred from foreign keys plus virtual relations.
    pub relations: Vec<Relation>,
    /// Whether this is a view rather than a base table.
    pub is_view: bool,
}

impl TableSchema {
    /// New empty schema for a table being introspected.
    pub fn new(name: TableName, raw_name: impl Into<String>) -> Self {
        let label = humanize(&name.name);
        Self {
            name,
            raw_name: raw_name.into(),
            label,
            description: None,
            columns: ColumnMap::default(),
            primary_key: PrimaryKey::None,
            sequence_name: None,
            relations: Vec::new(),
            is_view: false,
        }
    }

    /// Find a relation by its conventional name.
    pub fn relation(&self, name: &str) -> Option<&Relation> {
        self.relations
            .iter()
            .find(|r| r.name().eq_ignore_ascii_case(name))
    }
}

/// Stored procedure metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcedureSchema {
    /// Name, optionally schema-qualified.
    pub name: TableName,
    /// Engine-quoted qualified name.
    pub raw_name: String,
}

/// Stored function metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionSchema {
    /// Name, optionally schema-qualified.
    pub name: TableName,
    /// Engine-quoted qualified name.
    pub raw_name: String,
    /// Return type hint where the engine exposes one.
    pub return_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_name_parse_and_dotted() {
        let n = TableName::parse("public.users");
        assert_eq!(n.schema.as_deref(), Some("public"));
        assert_eq!(n.name, "users");
        assert_eq!(n.dotted(), "public.users");

        let bare = TableName::parse("users");
        assert!(bare.schema.is_none());
        assert_eq!(bare.dotted(), "users");
    }

    #[test]
    fn test_table_name_matches_ignores_missing_schema() {
        let a = TableName::qualified("public", "Users");
        let b = TableName::bare("users");
        assert!(a.matches(&b));
        let c = TableName::qualified("other", "users");
        assert!(!a.matches(&c));
    }

    #[test]
    fn test_humanize() {
        assert_eq!(humanize("customer_order_items"), "Customer Order Items");
        assert_eq!(humanize("users"), "Users");
        assert_eq!(humanize("__x"), "X");
    }

    #[test]
    fn test_primary_key_shapes() {
        assert!(!PrimaryKey::from_columns(vec![]).is_present());
        assert_eq!(
            PrimaryKey::from_columns(vec!["id".into()]),
            PrimaryKey::Single("id".into())
        );
        let pk = PrimaryKey::from_columns(vec!["a".into(), "b".into()]);
        assert_eq!(pk.columns(), vec!["a", "b"]);
    }

    #[test]
    fn test_column_map_order_and_case() {
        let mut map = ColumnMap::default();
        map.insert(ColumnSchema::new("Id", "\"Id\"", "integer"));
        map.insert(ColumnSchema::new("Name", "\"Name\"", "varchar"));
        assert_eq!(map.names(), vec!["Id", "Name"]);
        assert!(map.get("id").is_some());
        assert!(map.get("NAME").is_some());

        // Replacement keeps position
        map.insert(ColumnSchema::new("id", "\"id\"", "bigint"));
        assert_eq!(map.names(), vec!["id", "Name"]);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_relation_names() {
        let r = Relation {
            kind: RelationKind::BelongsTo,
            target: TableName::bare("users"),
            local_column: "owner_id".into(),
            target_column: "id".into(),
            junction: None,
            is_virtual: false,
        };
        assert_eq!(r.name(), "users_by_owner_id");

        // The parent-side has_many names itself after the child's FK
        // column, not the parent key it points at.
        let h = Relation {
            kind: RelationKind::HasMany,
            target: TableName::bare("widgets"),
            local_column: "id".into(),
            target_column: "owner_id".into(),
            junction: None,
            is_virtual: false,
        };
        assert_eq!(h.name(), "widgets_by_owner_id");

        let m = Relation {
            kind: RelationKind::ManyMany,
            target: TableName::bare("tags"),
            local_column: "id".into(),
            target_column: "id".into(),
            junction: Some(JunctionRef {
                table: TableName::bare("item_tags"),
                local_column: "item_id".into(),
                target_column: "tag_id".into(),
            }),
            is_virtual: false,
        };
        assert_eq!(m.name(), "tags_via_item_tags");
    }
}
