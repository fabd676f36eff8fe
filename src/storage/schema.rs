//! Database schema definitions

/// SQL to create the relation types table
pub const CREATE_RELATION_TYPES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS relation_types (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    alias TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    parent_object TEXT NOT NULL,
    child_object TEXT NOT NULL,
    bidirectional INTEGER NOT NULL DEFAULT 0
)
"#;

/// SQL to create the relations table
///
/// No UNIQUE constraint over (parent_id, child_id, type_alias): duplicate and
/// orphaned edges must be representable.
pub const CREATE_RELATIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS relations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    parent_id INTEGER NOT NULL,
    child_id INTEGER NOT NULL,
    type_alias TEXT NOT NULL REFERENCES relation_types(alias),
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_relations_parent ON relations(parent_id)",
    "CREATE INDEX IF NOT EXISTS idx_relations_child ON relations(child_id)",
    "CREATE INDEX IF NOT EXISTS idx_relations_type ON relations(type_alias)",
];

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![CREATE_RELATION_TYPES_TABLE, CREATE_RELATIONS_TABLE];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}
