//! SQLite storage implementation

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use rusqlite::{Connection, params, OptionalExtension};
use crate::{Result, Error};
use crate::node::NodeId;
use crate::relation::{ObjectType, Relation, RelationKind, RelationType};
use super::{schema, RelationStore};

/// SQLite-backed relation store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn: Mutex::new(conn) };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn: Mutex::new(conn) };
        store.initialize_schema()?;
        Ok(store)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| Error::LockPoisoned("relation store"))
    }

    /// Initialize the database schema
    fn initialize_schema(&self) -> Result<()> {
        let conn = self.conn()?;
        for stmt in schema::all_schema_statements() {
            conn.execute(stmt, [])?;
        }
        Ok(())
    }

    /// Run a relation query with a single bound parameter
    fn query_relations(&self, sql: &str, param: &dyn rusqlite::ToSql) -> Result<Vec<Relation>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;

        let relations = stmt
            .query_map([param], row_to_relation)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(relations)
    }

    /// All edges in the store, in creation order
    pub fn all_relations(&self) -> Result<Vec<Relation>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, parent_id, child_id, type_alias FROM relations ORDER BY id"
        )?;

        let relations = stmt
            .query_map([], row_to_relation)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(relations)
    }

    /// Number of edges of every kind
    pub fn count_relations(&self) -> Result<usize> {
        let count: i64 = self.conn()?.query_row("SELECT COUNT(*) FROM relations", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Delete every edge, keeping the relation type definitions
    pub fn clear_relations(&self) -> Result<usize> {
        Ok(self.conn()?.execute("DELETE FROM relations", [])?)
    }

    /// Count relation type definitions
    pub fn count_relation_types(&self) -> Result<usize> {
        let count: i64 = self.conn()?.query_row("SELECT COUNT(*) FROM relation_types", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats> {
        Ok(DbStats {
            relation_types: self.count_relation_types()?,
            structural: self.count_by_kind(RelationKind::StructuralMirror)?,
            usage: self.count_by_kind(RelationKind::UsageLink)?,
        })
    }
}

impl RelationStore for SqliteStore {
    fn ensure_relation_type(&self, definition: &RelationType) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT OR IGNORE INTO relation_types (alias, name, parent_object, child_object, bidirectional)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                definition.alias,
                definition.name,
                definition.parent_object.as_str(),
                definition.child_object.as_str(),
                definition.bidirectional,
            ],
        )?;

        let id: i64 = conn.query_row(
            "SELECT id FROM relation_types WHERE alias = ?1",
            [&definition.alias],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    fn get_relation_type(&self, alias: &str) -> Result<Option<RelationType>> {
        let conn = self.conn()?;
        let row: Option<(String, String, String, String, bool)> = conn
            .query_row(
                "SELECT alias, name, parent_object, child_object, bidirectional FROM relation_types WHERE alias = ?1",
                [alias],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
            )
            .optional()?;

        match row {
            Some((alias, name, parent, child, bidirectional)) => Ok(Some(RelationType {
                alias,
                name,
                parent_object: parent.parse::<ObjectType>()?,
                child_object: child.parse::<ObjectType>()?,
                bidirectional,
            })),
            None => Ok(None),
        }
    }

    fn relate(&self, parent_id: NodeId, child_id: NodeId, kind: RelationKind) -> Result<Relation> {
        let conn = self.conn()?;
        let defined: Option<i64> = conn
            .query_row(
                "SELECT id FROM relation_types WHERE alias = ?1",
                [kind.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        if defined.is_none() {
            return Err(Error::UnknownRelationType(kind.as_str().to_string()));
        }

        conn.execute(
            "INSERT INTO relations (parent_id, child_id, type_alias) VALUES (?1, ?2, ?3)",
            params![parent_id, child_id, kind.as_str()],
        )?;

        Ok(Relation {
            id: conn.last_insert_rowid(),
            parent_id,
            child_id,
            kind,
        })
    }

    fn get_by_parent(&self, parent_id: NodeId) -> Result<Vec<Relation>> {
        self.query_relations(
            "SELECT id, parent_id, child_id, type_alias FROM relations WHERE parent_id = ?1 ORDER BY id",
            &parent_id,
        )
    }

    fn get_by_child(&self, child_id: NodeId) -> Result<Vec<Relation>> {
        self.query_relations(
            "SELECT id, parent_id, child_id, type_alias FROM relations WHERE child_id = ?1 ORDER BY id",
            &child_id,
        )
    }

    fn get_by_kind(&self, kind: RelationKind) -> Result<Vec<Relation>> {
        self.query_relations(
            "SELECT id, parent_id, child_id, type_alias FROM relations WHERE type_alias = ?1 ORDER BY id",
            &kind.as_str(),
        )
    }

    fn delete(&self, relation_id: i64) -> Result<()> {
        self.conn()?.execute("DELETE FROM relations WHERE id = ?1", [relation_id])?;
        Ok(())
    }

    fn count_by_kind(&self, kind: RelationKind) -> Result<usize> {
        let count: i64 = self.conn()?.query_row(
            "SELECT COUNT(*) FROM relations WHERE type_alias = ?1",
            [kind.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

/// Helper to convert a row to a Relation
fn row_to_relation(row: &rusqlite::Row) -> rusqlite::Result<Relation> {
    let kind_str: String = row.get(3)?;
    let kind: RelationKind = kind_str.parse().map_err(|e: Error| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Relation {
        id: row.get(0)?,
        parent_id: row.get(1)?,
        child_id: row.get(2)?,
        kind,
    })
}

/// Database statistics
#[derive(Debug, Clone)]
pub struct DbStats {
    pub relation_types: usize,
    pub structural: usize,
    pub usage: usize,
}

impl std::fmt::Display for DbStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Database Statistics:")?;
        writeln!(f, "  Relation types: {}", self.relation_types)?;
        writeln!(f, "  Folder relations: {}", self.structural)?;
        writeln!(f, "  Usage relations: {}", self.usage)
    }
}
