//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::model::Business;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::path::Path;

const INSERT_SQL: &str = "
    INSERT OR IGNORE INTO businesses
    (name, rating, review_count, category, address, price_range, lat, lng, cid,
     phone, website, google_url, description, place_id,
     open_hours, thumbnail, categories, city, postal_code, country_code, query)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
            ?15, ?16, ?17, ?18, ?19, ?20, ?21)
";

const SELECT_SQL: &str = "
    SELECT name, rating, review_count, category, address, price_range, lat, lng, cid,
           phone, website, google_url, description, place_id,
           open_hours, thumbnail, categories, city, postal_code, country_code, query
    FROM businesses
";

/// SQLite storage backend
///
/// All access goes through one mutex; the connection is taken out on close.
pub struct SqliteStorage {
    conn: Mutex<Option<Connection>>,
}

impl SqliteStorage {
    /// Opens or creates a results database
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        // Tuned for write throughput
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA cache_size = -64000;
            PRAGMA busy_timeout = 5000;
        ",
        )?;

        initialize_schema(&conn)?;

        tracing::debug!("Opened results database at {}", path.display());

        Ok(Self {
            conn: Mutex::new(Some(conn)),
        })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(Some(conn)),
        })
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&mut Connection) -> StorageResult<T>,
    ) -> StorageResult<T> {
        let mut guard = self.conn.lock();
        let conn = guard.as_mut().ok_or(StorageError::Closed)?;
        f(conn)
    }

    /// Inserts a batch of businesses, see [`Storage::insert_batch`]
    pub fn insert_batch(&self, businesses: &[Business]) -> StorageResult<usize> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let mut inserted = 0;

            {
                let mut stmt = tx.prepare_cached(INSERT_SQL)?;
                for b in businesses {
                    let result = stmt.execute(params![
                        b.name,
                        b.rating,
                        b.review_count,
                        b.category,
                        b.address,
                        b.price_range,
                        b.lat,
                        b.lng,
                        b.cid,
                        b.phone,
                        b.website,
                        b.map_url,
                        b.description,
                        b.place_id,
                        b.open_hours,
                        b.thumbnail,
                        b.categories,
                        b.city,
                        b.postal_code,
                        b.country_code,
                        b.query,
                    ]);

                    match result {
                        Ok(n) => inserted += n,
                        Err(e) => tracing::debug!("Skipping business {:?}: {}", b.name, e),
                    }
                }
            }

            tx.commit()?;
            Ok(inserted)
        })
    }

    /// Total number of stored rows
    pub fn count(&self) -> StorageResult<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM businesses", [], |row| row.get(0))?;
            Ok(count as u64)
        })
    }

    /// Loads stored businesses in insertion order, optionally for one query
    pub fn list_businesses(&self, query: Option<&str>) -> StorageResult<Vec<Business>> {
        self.with_conn(|conn| {
            let sql = match query {
                Some(_) => format!("{} WHERE query = ?1 ORDER BY id", SELECT_SQL),
                None => format!("{} ORDER BY id", SELECT_SQL),
            };
            let mut stmt = conn.prepare(&sql)?;

            let rows = match query {
                Some(q) => stmt.query_map([q], row_to_business)?,
                None => stmt.query_map([], row_to_business)?,
            };

            let mut businesses = Vec::new();
            for row in rows {
                businesses.push(row?);
            }
            Ok(businesses)
        })
    }

    /// Closes the database; later calls fail with `StorageError::Closed`
    pub fn close(&self) -> StorageResult<()> {
        let conn = self.conn.lock().take();
        match conn {
            Some(conn) => conn.close().map_err(|(_, e)| StorageError::Sqlite(e)),
            None => Ok(()),
        }
    }
}

impl Storage for SqliteStorage {
    fn insert_batch(&self, businesses: &[Business]) -> StorageResult<usize> {
        SqliteStorage::insert_batch(self, businesses)
    }

    fn count(&self) -> StorageResult<u64> {
        SqliteStorage::count(self)
    }
}

fn row_to_business(row: &rusqlite::Row<'_>) -> rusqlite::Result<Business> {
    let text = |idx: usize| -> rusqlite::Result<String> {
        Ok(row.get::<_, Option<String>>(idx)?.unwrap_or_default())
    };

    Ok(Business {
        name: row.get(0)?,
        rating: row.get::<_, Option<f64>>(1)?.unwrap_or_default(),
        review_count: row.get::<_, Option<i64>>(2)?.unwrap_or_default(),
        category: text(3)?,
        address: text(4)?,
        price_range: text(5)?,
        lat: row.get(6)?,
        lng: row.get(7)?,
        cid: text(8)?,
        phone: text(9)?,
        website: text(10)?,
        map_url: text(11)?,
        description: text(12)?,
        place_id: text(13)?,
        open_hours: text(14)?,
        thumbnail: text(15)?,
        categories: text(16)?,
        city: text(17)?,
        postal_code: text(18)?,
        country_code: text(19)?,
        query: row.get(20)?,
    })
}
