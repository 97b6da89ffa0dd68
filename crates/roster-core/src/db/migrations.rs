//! Database migrations

use crate::error::Result;
use libsql::Connection;

/// Current schema version
const CURRENT_VERSION: i32 = 1;

/// Run all pending migrations
pub async fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn).await?;

    if version < 1 {
        migrate_v1(conn).await?;
    }

    Ok(())
}

/// Get the current schema version
async fn get_version(conn: &Connection) -> Result<i32> {
    // Check if schema_version table exists
    let mut rows = conn
        .query(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
            (),
        )
        .await?;

    let exists: bool = if let Some(row) = rows.next().await? {
        row.get::<i32>(0)? != 0
    } else {
        false
    };

    if !exists {
        return Ok(0);
    }

    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM schema_version", ())
        .await?;

    let version: i32 = if let Some(row) = rows.next().await? {
        row.get(0)?
    } else {
        0
    };

    Ok(version)
}

/// Migration to version 1: flattened profiles table
async fn migrate_v1(conn: &Connection) -> Result<()> {
    conn.execute("BEGIN TRANSACTION", ()).await?;

    let statements = [
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        )",
        "CREATE TABLE IF NOT EXISTS profiles (
            id TEXT PRIMARY KEY,
            gender TEXT NOT NULL,
            email TEXT NOT NULL,
            phone TEXT NOT NULL,
            cell TEXT NOT NULL,
            nat TEXT NOT NULL,
            name_title TEXT NOT NULL,
            name_first TEXT NOT NULL,
            name_last TEXT NOT NULL,
            location_street_number INTEGER NOT NULL,
            location_street_name TEXT NOT NULL,
            location_city TEXT NOT NULL,
            location_state TEXT NOT NULL,
            location_country TEXT NOT NULL,
            location_postcode TEXT NOT NULL,
            location_latitude TEXT NOT NULL,
            location_longitude TEXT NOT NULL,
            location_timezone_offset TEXT NOT NULL,
            location_timezone_description TEXT NOT NULL,
            dob_date TEXT NOT NULL,
            dob_age INTEGER NOT NULL,
            registered_date TEXT NOT NULL,
            registered_age INTEGER NOT NULL,
            login_uuid TEXT NOT NULL,
            login_username TEXT NOT NULL,
            login_password TEXT NOT NULL,
            login_salt TEXT NOT NULL,
            login_md5 TEXT NOT NULL,
            login_sha1 TEXT NOT NULL,
            login_sha256 TEXT NOT NULL,
            id_name TEXT,
            id_value TEXT,
            picture_large TEXT NOT NULL,
            picture_medium TEXT NOT NULL,
            picture_thumbnail TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            from_remote INTEGER NOT NULL DEFAULT 1
        )",
        "CREATE INDEX IF NOT EXISTS idx_profiles_created ON profiles(created_at DESC)",
        "CREATE INDEX IF NOT EXISTS idx_profiles_name ON profiles(name_first, name_last)",
        "CREATE INDEX IF NOT EXISTS idx_profiles_location ON profiles(location_country, location_city)",
        "CREATE INDEX IF NOT EXISTS idx_profiles_source ON profiles(from_remote)",
        "INSERT INTO schema_version (version) VALUES (1)",
    ];

    for stmt in statements {
        if let Err(e) = conn.execute(stmt, ()).await {
            conn.execute("ROLLBACK", ()).await.ok();
            return Err(e.into());
        }
    }

    if let Err(e) = conn.execute("COMMIT", ()).await {
        conn.execute("ROLLBACK", ()).await.ok();
        return Err(e.into());
    }

    tracing::info!("Migrated database to version {CURRENT_VERSION}");
    Ok(())
}
