use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;

use crate::config::DatabaseConfig;

/// Fixed ids so clients can hard-code difficulty references across installs.
pub const DIFFICULTIES: [(&str, &str); 3] = [
    ("54466f17-02af-48e7-8ed3-5a4a8bfacf6f", "Easy"),
    ("ea294873-7a8c-4c0f-bfa7-a2eb492cbf8c", "Medium"),
    ("f808ddcd-b5e5-4d80-b732-1ca523e48434", "Hard"),
];

const SAMPLE_REGIONS: [(&str, &str, &str, Option<&str>); 6] = [
    (
        "f7248fc3-2585-4efb-8d1d-1c555f4087f6",
        "AKL",
        "Auckland",
        Some("https://images.pexels.com/photos/5169056/pexels-photo-5169056.jpeg"),
    ),
    ("6884f7d7-ad1f-4101-8df3-7a6fa7387d81", "NTL", "Northland", None),
    ("14ceba71-4b51-4777-9b17-46602cf66153", "BOP", "Bay Of Plenty", None),
    (
        "cfa06ed2-bf65-4b65-93ed-c9d286ddb0de",
        "WGN",
        "Wellington",
        Some("https://images.pexels.com/photos/4350631/pexels-photo-4350631.jpeg"),
    ),
    (
        "906cb139-415a-4bbb-a174-1a1faf9fb1f6",
        "NSN",
        "Nelson",
        Some("https://images.pexels.com/photos/13918194/pexels-photo-13918194.jpeg"),
    ),
    ("f077a22e-4248-4bf6-b564-c7cf4e250263", "STL", "Southland", None),
];

/// Opens the pool described by `cfg`, creating the database file if needed.
pub async fn connect(cfg: &DatabaseConfig) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&cfg.url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(10));
    let pool = SqlitePoolOptions::new().max_connections(cfg.max_connections).connect_with(options).await?;
    Ok(pool)
}

pub async fn init_db(pool: &SqlitePool) -> anyhow::Result<()> {
    // Foreign keys are critical - fail if this doesn't work
    sqlx::query("PRAGMA foreign_keys=ON;").execute(pool).await?;

    if let Err(e) = sqlx::query("PRAGMA temp_store=MEMORY;").execute(pool).await {
        tracing::warn!("Failed to set temp_store: {}", e);
    }

    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS difficulties (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL
        )"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS regions (
            id TEXT PRIMARY KEY,
            code TEXT NOT NULL,
            name TEXT NOT NULL CHECK (length(name) > 0),
            region_image_url TEXT NULL
        )"#,
    )
    .execute(pool)
    .await?;

    // Walks reference both lookups. The default NO ACTION rule rejects deleting a referenced row.
    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS walks (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT NOT NULL,
            length_in_km REAL NOT NULL CHECK (length_in_km > 0),
            walk_image_url TEXT NULL,
            difficulty_id TEXT NOT NULL,
            region_id TEXT NOT NULL,
            FOREIGN KEY(difficulty_id) REFERENCES difficulties(id),
            FOREIGN KEY(region_id) REFERENCES regions(id)
        )"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS images (
            id TEXT PRIMARY KEY,
            file_name TEXT NOT NULL,
            file_extension TEXT NOT NULL,
            content_type TEXT NOT NULL,
            file_description TEXT NULL,
            file_size_in_bytes INTEGER NOT NULL,
            file_path TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ','now'))
        )"#,
    )
    .execute(pool)
    .await?;

    let indexes = [
        ("idx_walks_region", "CREATE INDEX IF NOT EXISTS idx_walks_region ON walks(region_id)"),
        ("idx_walks_difficulty", "CREATE INDEX IF NOT EXISTS idx_walks_difficulty ON walks(difficulty_id)"),
    ];
    for (name, query) in indexes {
        if let Err(e) = sqlx::query(query).execute(pool).await {
            tracing::warn!("Failed to create index {}: {}", name, e);
        }
    }

    seed_difficulties(pool).await?;

    Ok(())
}

async fn seed_difficulties(pool: &SqlitePool) -> anyhow::Result<()> {
    for (id, name) in DIFFICULTIES {
        sqlx::query("INSERT OR IGNORE INTO difficulties (id, name) VALUES (?1, ?2)")
            .bind(id)
            .bind(name)
            .execute(pool)
            .await?;
    }
    Ok(())
}

/// Inserts the sample regions once; existing rows are left alone.
pub async fn seed_sample_regions(pool: &SqlitePool) -> anyhow::Result<()> {
    let mut tx = pool.begin().await?;
    for (id, code, name, image) in SAMPLE_REGIONS {
        sqlx::query("INSERT OR IGNORE INTO regions (id, code, name, region_image_url) VALUES (?1, ?2, ?3, ?4)")
            .bind(id)
            .bind(code)
            .bind(name)
            .bind(image)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;
    tracing::debug!("Sample regions seeded");
    Ok(())
}
