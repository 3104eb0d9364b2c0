//! Database pool construction and boot-time schema setup.

use anyhow::{Context, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

/// Connect with production pool settings. The acquire timeout bounds every
/// storage operation; a saturated pool surfaces as an error instead of a
/// hung request.
pub async fn create_pg_pool(database_url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(600))
        .connect(database_url)
        .await
        .context("Failed to connect to Postgres")?;
    Ok(pool)
}

/// Create the `admins` and `passes` tables if they do not exist yet.
pub async fn init_schema(pool: &PgPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS admins (
            username TEXT PRIMARY KEY,
            password_hash TEXT NOT NULL,
            display_name TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await
    .context("Failed to create admins table")?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS passes (
            pass_id UUID PRIMARY KEY,
            name1 TEXT NOT NULL,
            phone1 TEXT NOT NULL,
            name2 TEXT,
            phone2 TEXT,
            pass_type TEXT NOT NULL CHECK (pass_type IN ('SINGLE','COUPLE')),
            amount INTEGER NOT NULL,
            payment_mode TEXT NOT NULL CHECK (payment_mode IN ('CASH','ONLINE')),
            txn_info TEXT,
            timing TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            scanned_at TIMESTAMPTZ,
            scanned_by TEXT,
            CONSTRAINT passes_primary_holder_key UNIQUE (name1, phone1)
        )
        "#,
    )
    .execute(pool)
    .await
    .context("Failed to create passes table")?;

    Ok(())
}

/// Seed the five check-in operator accounts. Idempotent; existing accounts
/// are left untouched.
pub async fn seed_admin_accounts(pool: &PgPool, password: &str) -> Result<()> {
    let password_hash =
        bcrypt::hash(password, bcrypt::DEFAULT_COST).context("Failed to hash seed password")?;

    let admin_users = [
        ("admin1", "Admin One"),
        ("admin2", "Admin Two"),
        ("admin3", "Admin Three"),
        ("admin4", "Admin Four"),
        ("admin5", "Admin Five"),
    ];

    for (username, display_name) in admin_users {
        sqlx::query(
            r#"
            INSERT INTO admins (username, password_hash, display_name)
            VALUES ($1, $2, $3)
            ON CONFLICT (username) DO NOTHING
            "#,
        )
        .bind(username)
        .bind(&password_hash)
        .bind(display_name)
        .execute(pool)
        .await
        .context("Failed to seed admin account")?;
    }

    tracing::info!("admin accounts seeded");
    Ok(())
}
