use anyhow::{Context, Result};
use model::UserManager;
use sea_orm::Database;
use tracing::{debug, info};

use super::initdb::apply_migrations;

pub async fn create_superuser(email: &str, password: &str, database_url: &str) -> Result<()> {
    debug!("Database URL: {}", database_url);

    let db = Database::connect(database_url)
        .await
        .with_context(|| format!("Failed to connect to database '{}'", database_url))?;
    apply_migrations(&db).await?;

    let users = UserManager::new(db);
    let admin = users
        .create_superuser(email, password)
        .await
        .context("Failed to create superuser")?;

    info!("Superuser {} created with ID {}", admin.email, admin.id);
    Ok(())
}
