//! Versioned schema migrations and sample data.
//!
//! Applied versions are tracked in `schema_migrations` together with an MD5
//! checksum of the script that created them. A run applies every declared
//! version that is not tracked yet, one transaction per script, and refuses
//! to touch the database if the tracked history no longer matches the
//! declared list.

use sqlx::{FromRow, PgPool};
use std::collections::HashSet;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info};

const TRACKING_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version           BIGINT PRIMARY KEY,
    description       TEXT NOT NULL,
    checksum          TEXT NOT NULL,
    applied_at        TIMESTAMPTZ NOT NULL DEFAULT now(),
    execution_time_ms BIGINT NOT NULL
)
"#;

const SEED_PRODUCTS: &str = include_str!("../seeds/products.sql");

#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: i64,
    pub description: &'static str,
    pub script: &'static str,
}

impl Migration {
    pub fn checksum(&self) -> String {
        format!("{:x}", md5::compute(self.script.as_bytes()))
    }
}

pub static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "Add Products",
    script: include_str!("../migrations/001_add_products.sql"),
}];

#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("Invalid migration list: {0}")]
    InvalidList(String),

    #[error("Migration {version} was applied with checksum {applied} but is declared with {declared}")]
    ChecksumMismatch {
        version: i64,
        applied: String,
        declared: String,
    },

    #[error("Migration {0} was applied but is no longer declared")]
    Removed(i64),

    #[error("Migration {version} ({description}) failed: {source}")]
    Script {
        version: i64,
        description: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// A row of the tracking table.
#[derive(Debug, Clone, FromRow)]
pub struct AppliedMigration {
    pub version: i64,
    pub description: String,
    pub checksum: String,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    /// Versions applied by this run.
    pub applied: Vec<i64>,
    /// Versions that were already tracked.
    pub skipped: Vec<i64>,
}

/// Applies the built-in migrations.
pub async fn migrate(pool: &PgPool) -> Result<MigrationReport, MigrationError> {
    apply_pending(pool, MIGRATIONS).await
}

pub async fn apply_pending(
    pool: &PgPool,
    migrations: &[Migration],
) -> Result<MigrationReport, MigrationError> {
    validate(migrations)?;

    sqlx::raw_sql(TRACKING_TABLE).execute(pool).await?;

    let applied = sqlx::query_as::<_, AppliedMigration>(
        "SELECT version, description, checksum FROM schema_migrations ORDER BY version",
    )
    .fetch_all(pool)
    .await?;

    let pending = pending(migrations, &applied)?;
    let mut report = MigrationReport {
        applied: Vec::with_capacity(pending.len()),
        skipped: applied.iter().map(|m| m.version).collect(),
    };

    for migration in pending {
        info!(
            "Running migration {} ({})",
            migration.version, migration.description
        );
        let started = Instant::now();

        let mut tx = pool.begin().await?;
        sqlx::raw_sql(migration.script)
            .execute(&mut *tx)
            .await
            .map_err(|source| MigrationError::Script {
                version: migration.version,
                description: migration.description,
                source,
            })?;

        sqlx::query(
            r#"
            INSERT INTO schema_migrations (version, description, checksum, execution_time_ms)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(migration.version)
        .bind(migration.description)
        .bind(migration.checksum())
        .bind(started.elapsed().as_millis() as i64)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        report.applied.push(migration.version);
    }

    if report.applied.is_empty() {
        debug!("Schema is up to date");
    } else {
        info!("Applied migrations {:?}", report.applied);
    }

    Ok(report)
}

/// Checks that versions are positive, unique and strictly increasing.
pub fn validate(migrations: &[Migration]) -> Result<(), MigrationError> {
    let mut previous = 0;
    for migration in migrations {
        if migration.version <= 0 {
            return Err(MigrationError::InvalidList(format!(
                "version {} must be positive",
                migration.version
            )));
        }
        if migration.version <= previous {
            return Err(MigrationError::InvalidList(format!(
                "version {} follows {}; versions must be unique and strictly increasing",
                migration.version, previous
            )));
        }
        previous = migration.version;
    }
    Ok(())
}

/// Declared migrations that are not tracked yet, in declaration order.
pub fn pending<'a>(
    migrations: &'a [Migration],
    applied: &[AppliedMigration],
) -> Result<Vec<&'a Migration>, MigrationError> {
    for record in applied {
        let declared = migrations
            .iter()
            .find(|m| m.version == record.version)
            .ok_or(MigrationError::Removed(record.version))?;

        let checksum = declared.checksum();
        if checksum != record.checksum {
            return Err(MigrationError::ChecksumMismatch {
                version: record.version,
                applied: record.checksum.clone(),
                declared: checksum,
            });
        }
    }

    let done: HashSet<i64> = applied.iter().map(|m| m.version).collect();
    Ok(migrations
        .iter()
        .filter(|m| !done.contains(&m.version))
        .collect())
}

/// Inserts the sample products. Rows that already exist are left alone.
pub async fn seed(pool: &PgPool) -> Result<u64, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let result = sqlx::raw_sql(SEED_PRODUCTS).execute(&mut *tx).await?;
    tx.commit().await?;

    Ok(result.rows_affected())
}
