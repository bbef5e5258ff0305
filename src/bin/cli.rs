use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use sekolah_authz::authz::{PermissionEvaluator, Role, SqliteGrantStore};
use sekolah_authz::db;
use sekolah_authz::utils::hash_password;

#[derive(Parser, Debug)]
#[command(author, version, about = "sekolah-authz admin tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a new empty migration with the provided name
    MakeMigration { name: String },
    /// Apply pending migrations
    MigrateRun,
    /// Show migration status against the current database
    MigrateStatus,
    /// Roll back the last applied migration
    MigrateRollback,
    /// Insert the well-known permission catalog; existing rows are kept
    SeedCatalog,
    /// Create an administrator holding every permission family
    CreateAdmin {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Ask whether a user holds any of the given permissions
    Check {
        user_id: i64,
        #[arg(required = true)]
        permissions: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if dotenv().is_err() {
        let crate_env = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(crate_env);
    }

    let cli = Cli::parse();

    match cli.command {
        Commands::MakeMigration { name } => {
            let path = make_migration_file(&name)?;
            println!("Created migration: {}", path.display());
        }
        Commands::MigrateRun => {
            let pool = get_pool().await?;
            let migrator = get_migrator().await?;
            migrator.run(&pool).await?;
            println!("Migrations applied");
        }
        Commands::MigrateStatus => {
            let pool = get_pool().await?;
            let migrator = get_migrator().await?;
            print_status(&pool, &migrator).await?;
        }
        Commands::MigrateRollback => {
            let pool = get_pool().await?;
            let migrator = get_migrator().await?;
            let version = rollback_last(&pool, &migrator).await?;
            println!("Rolled back migration {}", version);
        }
        Commands::SeedCatalog => {
            let pool = get_pool().await?;
            let inserted = db::catalog::seed(&pool).await?;
            println!("Seeded {} catalog entries", inserted);
        }
        Commands::CreateAdmin { name, email, password } => {
            let pool = get_pool().await?;
            db::catalog::seed(&pool).await?;

            let password_hash = hash_password(&password)?;
            let detail = db::users::create(
                &pool,
                db::users::NewUser {
                    name: &name,
                    email: &email,
                    password_hash,
                    role: Role::Admin,
                },
                None,
            )
            .await?;

            println!("Created admin {} (id {})", detail.user.email, detail.user.id);
            for grant in &detail.permissions {
                println!("  {}", grant.name);
            }
        }
        Commands::Check { user_id, permissions } => {
            let pool = get_pool().await?;
            let evaluator = PermissionEvaluator::new(Arc::new(SqliteGrantStore::new(pool)));

            let allowed = evaluator
                .has_any_permission(user_id, permissions.as_slice())
                .await
                .with_context(|| format!("could not evaluate permissions of user {user_id}"))?;

            println!("{}", if allowed { "allowed" } else { "denied" });
            if !allowed {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn make_migration_file(name: &str) -> anyhow::Result<PathBuf> {
    let timestamp = Utc::now().format("%Y%m%d%H%M%S");
    let sanitized = sanitize_name(name);
    let filename = format!("{}_{}.sql", timestamp, sanitized);
    let path = Path::new("migrations").join(filename);

    if path.exists() {
        anyhow::bail!("migration already exists: {}", path.display());
    }

    fs::write(&path, "-- Write your migration SQL here\n")
        .with_context(|| format!("failed to create migration at {}", path.display()))?;

    Ok(path)
}

async fn get_pool() -> anyhow::Result<SqlitePool> {
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL not set")?;
    SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to database")
}

async fn applied_versions(pool: &SqlitePool) -> anyhow::Result<HashSet<i64>> {
    let has_table: Option<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name = '_sqlx_migrations'",
    )
    .fetch_optional(pool)
    .await?;

    if has_table.is_none() {
        return Ok(HashSet::new());
    }

    Ok(sqlx::query_scalar::<_, i64>("SELECT version FROM _sqlx_migrations WHERE success = 1")
        .fetch_all(pool)
        .await?
        .into_iter()
        .collect())
}

/// Reverts the newest applied migration and returns its version.
///
/// Fails instead of reporting success when the newest migration has no
/// `.down.sql` script, since `Migrator::undo` silently skips those.
async fn rollback_last(pool: &SqlitePool, migrator: &sqlx::migrate::Migrator) -> anyhow::Result<i64> {
    let applied = applied_versions(pool).await?;
    let latest = applied
        .iter()
        .max()
        .copied()
        .context("no applied migrations to roll back")?;

    let reversible = migrator
        .iter()
        .any(|m| m.version == latest && m.migration_type.is_down_migration());
    if !reversible {
        anyhow::bail!("migration {} has no down script; nothing was rolled back", latest);
    }

    migrator
        .undo(pool, latest - 1)
        .await
        .with_context(|| format!("failed to roll back migration {}", latest))?;

    if applied_versions(pool).await?.contains(&latest) {
        anyhow::bail!("migration {} is still applied after rollback", latest);
    }

    Ok(latest)
}

async fn print_status(pool: &SqlitePool, migrator: &sqlx::migrate::Migrator) -> anyhow::Result<()> {
    let applied_versions = applied_versions(pool).await?;

    println!("{:<8} {:<20} {}", "Status", "Version", "Name");
    for migration in migrator.iter() {
        let status = if applied_versions.contains(&migration.version) {
            "applied"
        } else {
            "pending"
        };
        let desc = migration.description.trim();
        let name = if desc.is_empty() { "unknown" } else { desc };
        println!("{:<8} {:<20} {}", status, migration.version, name);
    }

    Ok(())
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' | '_' => c,
            'A'..='Z' => c.to_ascii_lowercase(),
            _ => '_',
        })
        .collect()
}

async fn get_migrator() -> anyhow::Result<sqlx::migrate::Migrator> {
    // ./migrations when run from the repo root, else the crate's own folder
    let local = Path::new("./migrations");
    let migrator_path = if local.exists() {
        local.to_path_buf()
    } else {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations")
    };

    let display = migrator_path.display().to_string();
    sqlx::migrate::Migrator::new(migrator_path)
        .await
        .with_context(|| format!("failed to load migrations from {}", display))
}
