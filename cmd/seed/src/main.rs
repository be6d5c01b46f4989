//! Prepares a database for local use: applies migrations, creates the
//! default categories and, when `SEED_ADMIN_*` is set, an admin account.

use std::env;

use anyhow::Context;
use auth_adapters::Argon2Hasher;
use configs::Settings;
use domains::{CredentialHasher, NewUser, StoreError, UserRepository};
use secrecy::ExposeSecret;
use storage_adapters::PgForumStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_CATEGORIES: [&str; 3] = ["General", "Announcements", "Help"];

struct AdminAccount {
    username: String,
    email: String,
    password: String,
}

impl AdminAccount {
    /// All three variables must be present, otherwise no admin is created.
    fn from_env() -> Option<Self> {
        Some(Self {
            username: env::var("SEED_ADMIN_USERNAME").ok()?,
            email: env::var("SEED_ADMIN_EMAIL").ok()?.trim().to_lowercase(),
            password: env::var("SEED_ADMIN_PASSWORD").ok()?,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("loading settings")?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log.filter)),
        )
        .init();

    let store = PgForumStore::connect_lazy(
        settings.database.url.expose_secret(),
        settings.database.max_connections,
        settings.database.acquire_timeout(),
        None,
    )
    .context("configuring database pool")?;
    store.migrate().await.context("running migrations")?;

    for name in DEFAULT_CATEGORIES {
        let category = store
            .ensure_category(name)
            .await
            .with_context(|| format!("creating category {name}"))?;
        info!(id = category.id, name = %category.name, "category ready");
    }

    match AdminAccount::from_env() {
        Some(admin) => seed_admin(&store, admin).await?,
        None => info!("SEED_ADMIN_* not set, skipping admin account"),
    }

    Ok(())
}

async fn seed_admin(store: &PgForumStore, admin: AdminAccount) -> anyhow::Result<()> {
    let password_hash = Argon2Hasher::new()
        .hash_password(&admin.password)
        .context("hashing admin password")?;
    let result = store
        .insert_user(NewUser {
            username: admin.username.clone(),
            email: admin.email,
            password_hash,
        })
        .await;

    match result {
        Ok(user) => info!(user_id = user.id, username = %user.username, "admin account created"),
        Err(StoreError::UniqueViolation(_)) => {
            info!(username = %admin.username, "admin account already exists")
        }
        Err(e) => return Err(e).context("creating admin account"),
    }
    Ok(())
}
