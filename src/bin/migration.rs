use anyhow::Context;
use sea_orm_migration::MigratorTrait;
use storefront_api::{config, db, migrator::Migrator};
use tracing::info;

/// Schema maintenance: `migration [up|down|status|fresh]` (default `up`).
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = config::load_config().context("failed to load configuration")?;
    config::init_tracing(&cfg.log_level, cfg.log_json);

    let command = std::env::args().nth(1).unwrap_or_else(|| "up".to_string());
    let pool = db::establish_connection_from_app_config(&cfg)
        .await
        .context("failed to connect to the database")?;

    match command.as_str() {
        "up" => {
            Migrator::up(&pool, None).await?;
            info!("Migrations applied");
        }
        "down" => {
            Migrator::down(&pool, Some(1)).await?;
            info!("Rolled back the latest migration");
        }
        "status" => Migrator::status(&pool).await?,
        "fresh" => {
            Migrator::fresh(&pool).await?;
            info!("Schema rebuilt from scratch");
        }
        other => anyhow::bail!("unknown command '{}'; expected up, down, status or fresh", other),
    }

    Ok(())
}
