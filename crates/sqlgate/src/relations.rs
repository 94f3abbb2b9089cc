//! Relationship inference from raw foreign-key edges.
//!
//! A pure function of the schema-wide edge set: no catalog access, no state
//! between tables. The `Schema` façade fetches the edge list once per schema,
//! memoizes it, and applies this inference to each table it describes.
//!
//! Rules, per table T and edge (child.c → parent.p):
//! - T == child: emit `belongs_to(parent, p, c)` and retype column c as a
//!   `reference`.
//! - T == parent: emit `has_many(child, c, p)`; additionally, for every other
//!   edge sharing the same child table, emit `many_many` to that edge's
//!   parent with the shared child as the junction.
//! - A self-referential edge is a valid belongs_to/has_many pair on the same
//!   table, but never makes the table a many_many partner of itself.

use crate::core::descriptor::AbstractType;
use crate::core::schema::{FkEdge, JunctionRef, Relation, RelationKind, TableName, TableSchema};

/// Compute the relation set for one table from the schema-wide edge list.
#[must_use]
pub fn infer_relations(table: &TableName, edges: &[FkEdge]) -> Vec<Relation> {
    let mut relations: Vec<Relation> = Vec::new();

    for edge in edges {
        if edge.table.matches(table) {
            push_unique(
                &mut relations,
                Relation {
                    kind: RelationKind::BelongsTo,
                    target: edge.ref_table.clone(),
                    local_column: edge.column.clone(),
                    target_column: edge.ref_column.clone(),
                    junction: None,
                    is_virtual: false,
                },
            );
        }

        if edge.ref_table.matches(table) {
            push_unique(
                &mut relations,
                Relation {
                    kind: RelationKind::HasMany,
                    target: edge.table.clone(),
                    local_column: edge.ref_column.clone(),
                    target_column: edge.column.clone(),
                    junction: None,
                    is_virtual: false,
                },
            );

            // A self-referential edge never forms a junction back to its
            // own table.
            if edge.table.matches(table) {
                continue;
            }

            for other in edges {
                if other == edge || !other.table.matches(&edge.table) {
                    continue;
                }
                if other.ref_table.matches(table) && other.column == edge.column {
                    continue;
                }
                push_unique(
                    &mut relations,
                    Relation {
                        kind: RelationKind::ManyMany,
                        target: other.ref_table.clone(),
                        local_column: edge.ref_column.clone(),
                        target_column: other.ref_column.clone(),
                        junction: Some(JunctionRef {
                            table: edge.table.clone(),
                            local_column: edge.column.clone(),
                            target_column: other.column.clone(),
                        }),
                        is_virtual: false,
                    },
                );
            }
        }
    }

    relations
}

/// Fill a table's relations and retype its foreign-key columns.
pub fn apply_relations(table: &mut TableSchema, edges: &[FkEdge]) {
    table.relations = infer_relations(&table.name, edges);

    for edge in edges {
        if !edge.table.matches(&table.name) {
            continue;
        }
        if let Some(col) = table.columns.get_mut(&edge.column) {
            col.is_foreign_key = true;
            col.ref_table = Some(edge.ref_table.dotted());
            col.ref_field = Some(edge.ref_column.clone());
            if !matches!(col.abstract_type, AbstractType::Id) {
                col.abstract_type = AbstractType::Reference;
            }
        }
    }
}

fn push_unique(relations: &mut Vec<Relation>, relation: Relation) {
    if !relations.contains(&relation) {
        relations.push(relation);
    }
}
