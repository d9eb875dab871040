//! Builds parameterized statements over a document table `(id UUID, body JSONB)`.

use crate::store::SortOrder;

/// Quote identifier for PostgreSQL (safe: only from config).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Full qualified table name.
pub fn qualified_table(schema: &str, table: &str) -> String {
    format!("{}.{}", quoted(schema), quoted(table))
}

/// How the page query orders rows.
#[derive(Clone, Debug, PartialEq)]
pub enum OrderKey {
    /// The identifier column itself.
    Id,
    /// A top-level body field; its name is bound as a parameter.
    BodyField(String),
}

/// Statement text plus the number of positional parameters it expects.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryBuf {
    pub sql: String,
    pub param_count: u32,
}

impl QueryBuf {
    fn new(sql: String, param_count: u32) -> Self {
        QueryBuf { sql, param_count }
    }
}

pub fn create_schema(schema: &str) -> QueryBuf {
    QueryBuf::new(format!("CREATE SCHEMA IF NOT EXISTS {}", quoted(schema)), 0)
}

pub fn create_table(table: &str) -> QueryBuf {
    QueryBuf::new(
        format!(
            "CREATE TABLE IF NOT EXISTS {} (id UUID PRIMARY KEY, body JSONB NOT NULL)",
            table
        ),
        0,
    )
}

pub fn count_all(table: &str) -> QueryBuf {
    QueryBuf::new(format!("SELECT COUNT(*) FROM {}", table), 0)
}

/// SELECT one page. Params: [field name when ordering by body field], offset, limit.
/// Body-field ordering always falls back to `id ASC` so ties have a fixed order.
pub fn select_page(table: &str, order_key: &OrderKey, order: SortOrder, limited: bool) -> QueryBuf {
    let dir = match order {
        SortOrder::Ascending => "ASC",
        SortOrder::Descending => "DESC",
    };
    let (order_clause, mut n) = match order_key {
        OrderKey::Id => (format!("ORDER BY id {}", dir), 0),
        OrderKey::BodyField(_) => (format!("ORDER BY body -> $1 {}, id ASC", dir), 1),
    };
    n += 1;
    let mut sql = format!("SELECT id, body FROM {} {} OFFSET ${}", table, order_clause, n);
    if limited {
        n += 1;
        sql.push_str(&format!(" LIMIT ${}", n));
    }
    QueryBuf::new(sql, n)
}

/// SELECT by id. Params: id.
pub fn select_by_id(table: &str) -> QueryBuf {
    QueryBuf::new(format!("SELECT id, body FROM {} WHERE id = $1", table), 1)
}

/// INSERT. Params: id, body.
pub fn insert(table: &str) -> QueryBuf {
    QueryBuf::new(
        format!("INSERT INTO {} (id, body) VALUES ($1, $2)", table),
        2,
    )
}

/// UPDATE whole body by id. Params: id, body.
pub fn replace_by_id(table: &str) -> QueryBuf {
    QueryBuf::new(format!("UPDATE {} SET body = $2 WHERE id = $1", table), 2)
}

/// DELETE by id returning the removed row. Params: id.
pub fn delete_by_id(table: &str) -> QueryBuf {
    QueryBuf::new(
        format!("DELETE FROM {} WHERE id = $1 RETURNING id, body", table),
        1,
    )
}
