use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

use crate::users::repo_types::SEED_ROLES;

pub async fn connect(database_url: &str) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .context("connect to database")
}

pub async fn migrate(db: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations")
        .run(db)
        .await
        .context("run migrations")?;
    Ok(())
}

/// Inserts the reference roles if they are missing. Safe to run on every
/// start; existing rows are never touched.
pub async fn seed_roles(db: &PgPool) -> anyhow::Result<()> {
    let mut inserted = 0;
    for (id, name, description) in SEED_ROLES {
        let res = sqlx::query(
            r#"
            INSERT INTO roles (id, name, description)
            VALUES ($1, $2, $3)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(description)
        .execute(db)
        .await
        .with_context(|| format!("seed role {name}"))?;
        inserted += res.rows_affected();
    }
    info!(inserted, "roles seeded");
    Ok(())
}
