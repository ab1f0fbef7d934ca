//! # Bootstrap
//!
//! Creates (or opens) the database, applies migrations and makes sure the
//! initial administrator exists.
//!
//! ## Usage
//! ```bash
//! ORDERDESK_ADMIN_EMAIL=root@loja.com \
//! ORDERDESK_ADMIN_PASSWORD=troque-me \
//! cargo run -p orderdesk-db --bin bootstrap
//!
//! # Optional
//! ORDERDESK_DATABASE_PATH=./data/orderdesk.db
//! ORDERDESK_MAX_CONNECTIONS=5
//! ORDERDESK_ADMIN_NAME="Dona Maria"
//! RUST_LOG=orderdesk_db=debug
//! ```
//!
//! Running it again is safe: migrations are idempotent and an existing
//! account with the admin e-mail is left untouched. If that account is
//! inactive or not an administrator, a warning is logged.

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use orderdesk_core::Role;
use orderdesk_db::{AdminAccount, BootstrapConfig, Database, NewUser};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("Starting OrderDesk bootstrap...");

    let config = BootstrapConfig::load()?;
    info!(
        path = %config.database_path.display(),
        max_connections = config.max_connections,
        "Configuration loaded"
    );

    let db = Database::new(config.db_config()).await?;
    let users = db.users();

    let outcome = users
        .ensure_admin(NewUser {
            name: config.admin_name.clone(),
            email: config.admin_email.clone(),
            password: config.admin_password.clone(),
            password_confirmation: config.admin_password.clone(),
            role: Role::Admin,
        })
        .await?;

    match outcome {
        AdminAccount::Created(admin) => {
            info!(user_id = %admin.id, email = %admin.email, "Administrator created");
        }
        AdminAccount::Present(admin) => {
            info!(user_id = %admin.id, "Administrator already present");
        }
        AdminAccount::Unusable(existing) => {
            warn!(
                user_id = %existing.id,
                profile_id = existing.profile_id,
                active = existing.active,
                "Admin e-mail belongs to an account that cannot administer; left unchanged"
            );
        }
    }

    info!(users = users.count().await?, "Bootstrap complete");

    db.close().await;
    Ok(())
}
