//! Extras/cache overlay: out-of-band metadata merged onto introspected
//! schema at read time.
//!
//! Extras never change what exists in the database — only labels,
//! descriptions, and virtual relationships. The overlay is the one piece of
//! shared mutable state in the engine: read-many, write-rare, with entries
//! replaced atomically (`Arc` swap under a `tokio` RwLock) so concurrent
//! readers always see a consistent snapshot.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::core::schema::{JunctionRef, Relation, RelationKind, TableName, TableSchema};

/// Table-level extras: label and description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableExtras {
    pub table: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Field-level extras.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldExtras {
    pub table: String,
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A virtual relationship not derivable from foreign keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationExtras {
    pub table: String,
    pub kind: RelationKind,
    pub target: String,
    pub local_column: String,
    pub target_column: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub junction: Option<JunctionRef>,
}

impl RelationExtras {
    fn to_relation(&self) -> Relation {
        Relation {
            kind: self.kind,
            target: TableName::parse(&self.target),
            local_column: self.local_column.clone(),
            target_column: self.target_column.clone(),
            junction: self.junction.clone(),
            is_virtual: true,
        }
    }
}

/// One overlay entry: everything stored for a single table.
#[derive(Debug, Default)]
struct ExtrasEntry {
    stored_at: Option<Instant>,
    table: Option<TableExtras>,
    fields: HashMap<String, FieldExtras>,
    relations: Vec<RelationExtras>,
}

impl ExtrasEntry {
    fn touched(&self) -> ExtrasEntry {
        ExtrasEntry {
            stored_at: Some(Instant::now()),
            table: self.table.clone(),
            fields: self.fields.clone(),
            relations: self.relations.clone(),
        }
    }

    fn is_empty(&self) -> bool {
        self.table.is_none() && self.fields.is_empty() && self.relations.is_empty()
    }
}

/// Shared extras overlay, keyed by lowercased table name.
///
/// Entries expire after the configured TTL and are invalidated eagerly when
/// DDL drops tables or fields.
pub struct ExtrasOverlay {
    ttl: Duration,
    entries: RwLock<HashMap<String, Arc<ExtrasEntry>>>,
}

impl ExtrasOverlay {
    /// New overlay with the given entry TTL.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn key(table: &str) -> String {
        table.to_ascii_lowercase()
    }

    fn live<'a>(&self, entry: &'a Arc<ExtrasEntry>) -> Option<&'a Arc<ExtrasEntry>> {
        match entry.stored_at {
            Some(at) if at.elapsed() <= self.ttl => Some(entry),
            Some(_) => None,
            None => Some(entry),
        }
    }

    /// Table-level extras for the named tables, in request order.
    pub async fn table_extras(&self, tables: &[&str]) -> Vec<TableExtras> {
        let entries = self.entries.read().await;
        tables
            .iter()
            .filter_map(|t| entries.get(&Self::key(t)))
            .filter_map(|e| self.live(e))
            .filter_map(|e| e.table.clone())
            .collect()
    }

    /// Field-level extras for the named tables.
    pub async fn field_extras(&self, tables: &[&str]) -> Vec<FieldExtras> {
        let entries = self.entries.read().await;
        let mut out = Vec::new();
        for table in tables {
            if let Some(entry) = entries.get(&Self::key(table)).and_then(|e| self.live(e)) {
                let mut fields: Vec<_> = entry.fields.values().cloned().collect();
                fields.sort_by(|a, b| a.field.cmp(&b.field));
                out.extend(fields);
            }
        }
        out
    }

    /// Virtual relationships recorded for the named tables.
    pub async fn related_extras(&self, tables: &[&str]) -> Vec<RelationExtras> {
        let entries = self.entries.read().await;
        tables
            .iter()
            .filter_map(|t| entries.get(&Self::key(t)))
            .filter_map(|e| self.live(e))
            .flat_map(|e| e.relations.iter().cloned())
            .collect()
    }

    /// Store table-level extras, replacing any previous value atomically.
    pub async fn set_table_extras(&self, extras: TableExtras) {
        let key = Self::key(&extras.table);
        let mut entries = self.entries.write().await;
        let mut next = entries.get(&key).map(|e| e.touched()).unwrap_or_default();
        next.stored_at = Some(Instant::now());
        next.table = Some(extras);
        entries.insert(key, Arc::new(next));
    }

    /// Store field-level extras.
    pub async fn set_field_extras(&self, extras: FieldExtras) {
        let key = Self::key(&extras.table);
        let mut entries = self.entries.write().await;
        let mut next = entries.get(&key).map(|e| e.touched()).unwrap_or_default();
        next.stored_at = Some(Instant::now());
        next.fields
            .insert(extras.field.to_ascii_lowercase(), extras);
        entries.insert(key, Arc::new(next));
    }

    /// Record a virtual relationship.
    pub async fn set_relation_extras(&self, extras: RelationExtras) {
        let key = Self::key(&extras.table);
        let mut entries = self.entries.write().await;
        let mut next = entries.get(&key).map(|e| e.touched()).unwrap_or_default();
        next.stored_at = Some(Instant::now());
        next.relations.retain(|r| {
            !(r.target.eq_ignore_ascii_case(&extras.target)
                && r.local_column.eq_ignore_ascii_case(&extras.local_column))
        });
        next.relations.push(extras);
        entries.insert(key, Arc::new(next));
    }

    /// Remove table-level extras for the named tables.
    pub async fn remove_table_extras(&self, tables: &[&str]) {
        let mut entries = self.entries.write().await;
        for table in tables {
            let key = Self::key(table);
            if let Some(existing) = entries.get(&key) {
                let mut next = existing.touched();
                next.table = None;
                if next.is_empty() {
                    entries.remove(&key);
                } else {
                    entries.insert(key, Arc::new(next));
                }
            }
        }
    }

    /// Remove field-level extras for specific fields of a table.
    pub async fn remove_field_extras(&self, table: &str, fields: &[&str]) {
        let key = Self::key(table);
        let mut entries = self.entries.write().await;
        if let Some(existing) = entries.get(&key) {
            let mut next = existing.touched();
            for field in fields {
                next.fields.remove(&field.to_ascii_lowercase());
            }
            if next.is_empty() {
                entries.remove(&key);
            } else {
                entries.insert(key, Arc::new(next));
            }
        }
    }

    /// Remove a virtual relationship by its conventional name.
    pub async fn remove_relation_extras(&self, table: &str, relation_name: &str) {
        let key = Self::key(table);
        let mut entries = self.entries.write().await;
        if let Some(existing) = entries.get(&key) {
            let mut next = existing.touched();
            next.relations
                .retain(|r| !r.to_relation().name().eq_ignore_ascii_case(relation_name));
            if next.is_empty() {
                entries.remove(&key);
            } else {
                entries.insert(key, Arc::new(next));
            }
        }
    }

    /// Drop everything.
    pub async fn flush(&self) {
        self.entries.write().await.clear();
    }

    /// DDL notification: these tables no longer exist.
    pub async fn tables_dropped(&self, tables: &[&str]) {
        let mut entries = self.entries.write().await;
        for table in tables {
            entries.remove(&Self::key(table));
        }
        tracing::debug!(count = tables.len(), "Invalidated extras for dropped tables");
    }

    /// DDL notification: these fields no longer exist.
    pub async fn fields_dropped(&self, table: &str, fields: &[&str]) {
        self.remove_field_extras(table, fields).await;
    }

    /// Merge stored extras into an introspected table schema.
    ///
    /// Extras only decorate: a field extra for a column that no longer
    /// exists is ignored, never materialized.
    pub async fn merge_into(&self, schema: &mut TableSchema) {
        let entries = self.entries.read().await;
        let Some(entry) = entries
            .get(&Self::key(&schema.name.name))
            .and_then(|e| self.live(e))
        else {
            return;
        };

        if let Some(table) = &entry.table {
            if let Some(label) = &table.label {
                schema.label = label.clone();
            }
            if table.description.is_some() {
                schema.description = table.description.clone();
            }
        }
        for column in schema.columns.iter_mut() {
            if let Some(extra) = entry.fields.get(&column.name.to_ascii_lowercase()) {
                if let Some(label) = &extra.label {
                    column.label = label.clone();
                }
                if extra.description.is_some() {
                    column.comment = extra.description.clone();
                }
            }
        }
        for extra in &entry.relations {
            let relation = extra.to_relation();
            if !schema.relations.contains(&relation) {
                schema.relations.push(relation);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overlay() -> ExtrasOverlay {
        ExtrasOverlay::new(Duration::from_secs(300))
    }

    #[tokio::test]
    async fn test_table_extras_round_trip() {
        let overlay = overlay();
        overlay
            .set_table_extras(TableExtras {
                table: "foo".to_string(),
                label: Some("Foo".to_string()),
                description: None,
            })
            .await;

        let stored = overlay.table_extras(&["foo"]).await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].label.as_deref(), Some("Foo"));

        overlay.remove_table_extras(&["foo"]).await;
        assert!(overlay.table_extras(&["foo"]).await.is_empty());
    }

    #[tokio::test]
    async fn test_lookup_is_case_insensitive() {
        let overlay = overlay();
        overlay
            .set_table_extras(TableExtras {
                table: "Orders".to_string(),
                label: Some("Orders".to_string()),
                description: None,
            })
            .await;
        assert_eq!(overlay.table_extras(&["ORDERS"]).await.len(), 1);
    }

    #[tokio::test]
    async fn test_ttl_expiry() {
        let overlay = ExtrasOverlay::new(Duration::from_millis(10));
        overlay
            .set_table_extras(TableExtras {
                table: "foo".to_string(),
                label: Some("Foo".to_string()),
                description: None,
            })
            .await;
        tokio::time::sleep(Duration::from_millis(25)).await;
        assert!(overlay.table_extras(&["foo"]).await.is_empty());
    }

    #[tokio::test]
    async fn test_drop_notifications_invalidate() {
        let overlay = overlay();
        overlay
            .set_field_extras(FieldExtras {
                table: "foo".to_string(),
                field: "bar".to_string(),
                label: Some("Bar".to_string()),
                description: None,
            })
            .await;
        overlay.fields_dropped("foo", &["bar"]).await;
        assert!(overlay.field_extras(&["foo"]).await.is_empty());

        overlay
            .set_table_extras(TableExtras {
                table: "foo".to_string(),
                label: Some("Foo".to_string()),
                description: None,
            })
            .await;
        overlay.tables_dropped(&["foo"]).await;
        assert!(overlay.table_extras(&["foo"]).await.is_empty());
    }

    #[tokio::test]
    async fn test_merge_decorates_without_materializing() {
        use crate::core::schema::{ColumnSchema, TableName};

        let overlay = overlay();
        overlay
            .set_table_extras(TableExtras {
                table: "widgets".to_string(),
                label: Some("Widget Catalog".to_string()),
                description: Some("All widgets".to_string()),
            })
            .await;
        overlay
            .set_field_extras(FieldExtras {
                table: "widgets".to_string(),
                field: "name".to_string(),
                label: Some("Widget Name".to_string()),
                description: None,
            })
            .await;
        overlay
            .set_field_extras(FieldExtras {
                table: "widgets".to_string(),
                field: "ghost".to_string(),
                label: Some("Ghost".to_string()),
                description: None,
            })
            .await;

        let mut schema = TableSchema::new(TableName::bare("widgets"), "\"widgets\"");
        schema
            .columns
            .insert(ColumnSchema::new("name", "\"name\"", "varchar(64)"));

        overlay.merge_into(&mut schema).await;

        assert_eq!(schema.label, "Widget Catalog");
        assert_eq!(schema.description.as_deref(), Some("All widgets"));
        assert_eq!(schema.columns.get("name").unwrap().label, "Widget Name");
        // Extras for a nonexistent column do not create one.
        assert!(schema.columns.get("ghost").is_none());
    }

    #[tokio::test]
    async fn test_virtual_relation_merge() {
        use crate::core::schema::TableName;

        let overlay = overlay();
        overlay
            .set_relation_extras(RelationExtras {
                table: "users".to_string(),
                kind: RelationKind::HasMany,
                target: "audit_log".to_string(),
                local_column: "id".to_string(),
                target_column: "actor_id".to_string(),
                junction: None,
            })
            .await;

        let mut schema = TableSchema::new(TableName::bare("users"), "\"users\"");
        overlay.merge_into(&mut schema).await;

        assert_eq!(schema.relations.len(), 1);
        assert!(schema.relations[0].is_virtual);
        assert_eq!(schema.relations[0].target.name, "audit_log");
    }
}
