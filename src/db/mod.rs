pub mod migrations;
pub mod queries;

use std::sync::{Arc, Mutex};

use anyhow::Context;
use async_trait::async_trait;
use rusqlite::functions::FunctionFlags;
use rusqlite::types::ValueRef;
use rusqlite::Connection;

use crate::models::{timestamp, Booking, BookingChanges};
use crate::services::query::{Filter, FindSpec};

pub fn init_db(path: &str) -> anyhow::Result<Connection> {
    let conn = Connection::open(path).context("failed to open database")?;

    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA busy_timeout=5000;")
        .context("failed to set database pragmas")?;

    register_fold(&conn)?;
    migrations::run_migrations(&conn)?;

    Ok(conn)
}

/// `fold(x)`: Unicode lowercase of text, numbers as their text form, NULL stays NULL.
/// SQLite's own `LIKE` only ignores case for ASCII letters.
fn register_fold(conn: &Connection) -> anyhow::Result<()> {
    conn.create_scalar_function(
        "fold",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let folded = match ctx.get_raw(0) {
                ValueRef::Null => None,
                ValueRef::Integer(n) => Some(n.to_string()),
                ValueRef::Real(n) => Some(n.to_string()),
                ValueRef::Text(text) | ValueRef::Blob(text) => {
                    Some(String::from_utf8_lossy(text).to_lowercase())
                }
            };
            Ok(folded)
        },
    )
    .context("failed to register fold function")
}

/// The persistent booking collection.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn insert(&self, booking: &Booking) -> anyhow::Result<()>;
    async fn find_by_id(&self, id: &str) -> anyhow::Result<Option<Booking>>;
    async fn find(&self, spec: &FindSpec) -> anyhow::Result<Vec<Booking>>;
    async fn count(&self, filter: &Filter) -> anyhow::Result<u64>;
    /// Merges `changes` into the stored record. `None` if the id is unknown.
    async fn update_by_id(&self, id: &str, changes: BookingChanges)
        -> anyhow::Result<Option<Booking>>;
    /// `false` if the id is unknown.
    async fn delete_by_id(&self, id: &str) -> anyhow::Result<bool>;
    async fn ping(&self) -> anyhow::Result<()>;
}

/// SQLite-backed store sharing one connection across requests.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    pub fn open(path: &str) -> anyhow::Result<Self> {
        Ok(Self::new(init_db(path)?))
    }

    /// Runs `op` against the connection on the blocking pool so SQLite work
    /// never stalls an async worker.
    async fn run<T, F>(&self, op: F) -> anyhow::Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> anyhow::Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let db = conn
                .lock()
                .map_err(|_| anyhow::anyhow!("database connection lock poisoned"))?;
            op(&db)
        })
        .await
        .context("database task failed")?
    }
}

#[async_trait]
impl BookingStore for SqliteStore {
    async fn insert(&self, booking: &Booking) -> anyhow::Result<()> {
        let booking = booking.clone();
        self.run(move |db| queries::insert_booking(db, &booking)).await
    }

    async fn find_by_id(&self, id: &str) -> anyhow::Result<Option<Booking>> {
        let id = id.to_string();
        self.run(move |db| queries::get_booking_by_id(db, &id)).await
    }

    async fn find(&self, spec: &FindSpec) -> anyhow::Result<Vec<Booking>> {
        let spec = spec.clone();
        self.run(move |db| queries::find_bookings(db, &spec)).await
    }

    async fn count(&self, filter: &Filter) -> anyhow::Result<u64> {
        let filter = filter.clone();
        self.run(move |db| queries::count_bookings(db, &filter)).await
    }

    async fn update_by_id(
        &self,
        id: &str,
        changes: BookingChanges,
    ) -> anyhow::Result<Option<Booking>> {
        let id = id.to_string();
        self.run(move |db| {
            let Some(mut booking) = queries::get_booking_by_id(db, &id)? else {
                return Ok(None);
            };
            changes.apply(&mut booking, timestamp::now());
            if queries::replace_booking(db, &booking)? {
                Ok(Some(booking))
            } else {
                Ok(None)
            }
        })
        .await
    }

    async fn delete_by_id(&self, id: &str) -> anyhow::Result<bool> {
        let id = id.to_string();
        self.run(move |db| queries::delete_booking(db, &id)).await
    }

    async fn ping(&self) -> anyhow::Result<()> {
        self.run(queries::ping).await
    }
}
