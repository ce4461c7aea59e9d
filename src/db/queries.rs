use anyhow::Context;
use rusqlite::types::ToSql;
use rusqlite::{params, Connection};

use crate::models::{timestamp, Booking};
use crate::services::query::{Clause, Direction, Filter, FindSpec};

type SqlParams = Vec<Box<dyn ToSql>>;

// ── Compilation ──

/// SQL expression addressing a document field. `id` lives in its own column.
fn field_expr(field: &str) -> String {
    if field == "id" || field == "_id" {
        return "id".to_string();
    }
    let path: String = field
        .split('.')
        .map(|part| format!(".\"{part}\""))
        .collect();
    format!("json_extract(doc, '${path}')")
}

fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn compile_filter(filter: &Filter) -> (String, SqlParams) {
    let mut conditions: Vec<String> = Vec::new();
    let mut params: SqlParams = Vec::new();

    for clause in &filter.clauses {
        match clause {
            Clause::Equals { field, value } => {
                conditions.push(format!("{} = ?", field_expr(field)));
                params.push(Box::new(value.clone()));
            }
            Clause::Between { field, from, to } => {
                if let Some(from) = from {
                    conditions.push(format!("{} >= ?", field_expr(field)));
                    params.push(Box::new(timestamp::format(from)));
                }
                if let Some(to) = to {
                    conditions.push(format!("{} <= ?", field_expr(field)));
                    params.push(Box::new(timestamp::format(to)));
                }
            }
            Clause::ContainsAny { fields, needle } => {
                let pattern = escape_like(&needle.to_lowercase());
                let alternatives: Vec<String> = fields
                    .iter()
                    .map(|field| {
                        params.push(Box::new(pattern.clone()));
                        format!("fold({}) LIKE ? ESCAPE '\\'", field_expr(field))
                    })
                    .collect();
                conditions.push(format!("({})", alternatives.join(" OR ")));
            }
        }
    }

    if conditions.is_empty() {
        (String::new(), params)
    } else {
        (format!(" WHERE {}", conditions.join(" AND ")), params)
    }
}

fn compile_order(spec: &FindSpec) -> String {
    let mut terms: Vec<String> = spec
        .sort
        .iter()
        .map(|key| {
            let dir = match key.direction {
                Direction::Ascending => "ASC",
                Direction::Descending => "DESC",
            };
            format!("{} {dir}", field_expr(&key.field))
        })
        .collect();
    terms.push("rowid ASC".to_string());
    format!(" ORDER BY {}", terms.join(", "))
}

fn parse_doc(doc: &str) -> anyhow::Result<Booking> {
    serde_json::from_str(doc).context("stored booking document is unreadable")
}

// ── Bookings ──

pub fn insert_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    let doc = serde_json::to_string(booking)?;
    conn.execute(
        "INSERT INTO bookings (id, doc) VALUES (?1, ?2)",
        params![booking.id, doc],
    )
    .context("failed to insert booking")?;
    Ok(())
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let result = conn.query_row(
        "SELECT doc FROM bookings WHERE id = ?1",
        params![id],
        |row| row.get::<_, String>(0),
    );

    match result {
        Ok(doc) => Ok(Some(parse_doc(&doc)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e).context("failed to load booking"),
    }
}

pub fn find_bookings(conn: &Connection, spec: &FindSpec) -> anyhow::Result<Vec<Booking>> {
    let (where_sql, mut params_vec) = compile_filter(&spec.filter);
    let sql = format!(
        "SELECT doc FROM bookings{where_sql}{} LIMIT ? OFFSET ?",
        compile_order(spec)
    );
    params_vec.push(Box::new(spec.limit));
    params_vec.push(Box::new(spec.skip));

    let mut stmt = conn.prepare(&sql).context("failed to prepare booking query")?;
    let params_refs: Vec<&dyn ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), |row| row.get::<_, String>(0))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(parse_doc(&row?)?);
    }
    Ok(bookings)
}

pub fn count_bookings(conn: &Connection, filter: &Filter) -> anyhow::Result<u64> {
    let (where_sql, params_vec) = compile_filter(filter);
    let sql = format!("SELECT COUNT(*) FROM bookings{where_sql}");
    let params_refs: Vec<&dyn ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
    let count: i64 = conn
        .query_row(&sql, params_refs.as_slice(), |row| row.get(0))
        .context("failed to count bookings")?;
    Ok(u64::try_from(count).unwrap_or_default())
}

pub fn replace_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<bool> {
    let doc = serde_json::to_string(booking)?;
    let count = conn
        .execute(
            "UPDATE bookings SET doc = ?1 WHERE id = ?2",
            params![doc, booking.id],
        )
        .context("failed to update booking")?;
    Ok(count > 0)
}

pub fn delete_booking(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn
        .execute("DELETE FROM bookings WHERE id = ?1", params![id])
        .context("failed to delete booking")?;
    Ok(count > 0)
}

pub fn ping(conn: &Connection) -> anyhow::Result<()> {
    conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
        .context("store did not answer")?;
    Ok(())
}
