//! Database schema definitions
//!
//! This module contains the SQL schema for the results database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per business per search term
CREATE TABLE IF NOT EXISTS businesses (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    rating REAL,
    review_count INTEGER,
    category TEXT,
    address TEXT,
    price_range TEXT,
    lat REAL NOT NULL,
    lng REAL NOT NULL,
    cid TEXT,
    phone TEXT,
    website TEXT,
    google_url TEXT,
    description TEXT,
    place_id TEXT,
    open_hours TEXT,
    thumbnail TEXT,
    categories TEXT,
    city TEXT,
    postal_code TEXT,
    country_code TEXT,
    query TEXT NOT NULL,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    UNIQUE(cid, query)
);

CREATE INDEX IF NOT EXISTS idx_businesses_query ON businesses(query);
CREATE INDEX IF NOT EXISTS idx_businesses_rating ON businesses(rating);
CREATE INDEX IF NOT EXISTS idx_businesses_coords ON businesses(lat, lng);
CREATE INDEX IF NOT EXISTS idx_businesses_city ON businesses(city);
"#;

/// Initializes the database schema
///
/// Safe to call on an existing database.
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
