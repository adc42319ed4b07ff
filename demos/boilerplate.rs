//! Service boilerplate example
//!
//! Builds the user, role and product services from `DB_*` environment
//! settings, seeds empty collections from `demos/data/<environment>/`, and
//! runs a few calls against them.
//!
//! ```sh
//! RUST_LOG=crudkit=debug cargo run --example boilerplate
//! DB_GENERIC_DIALECT=file APP_DATA_DIR=/tmp/crudkit cargo run --example boilerplate
//! ```

use anyhow::Result;
use crudkit::prelude::*;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut app = AppConfig::from_env();
    if std::env::var_os("APP_SEED_DIR").is_none() {
        app.seed_dir = PathBuf::from("demos/data");
    }

    let factory = ServiceFactory::new(
        Arc::new(app),
        EntityRegistry::with_defaults(),
        Some(Arc::new(MemoryCacher::new())),
        EventBus::default(),
    );

    let users = UserService::new(factory.build_service::<User>(Some(1))?);
    let roles = RoleService::new(factory.build_service::<Role>(Some(1))?);
    let products = ProductService::new(factory.build_service::<Product>(Some(1))?);

    let (_, seeded) = users.db().start().await?;
    println!("{}: {:?}", users.db().full_name(), seeded);
    let (_, seeded) = roles.db().start().await?;
    println!("{}: {:?}", roles.db().full_name(), seeded);
    let (_, seeded) = products.db().start().await?;
    println!("{}: {:?}", products.db().full_name(), seeded);

    match users.authenticate("admin", "admin").await? {
        Some(admin) => println!("Authenticated {} with roles {:?}", admin.login, admin.roles),
        None => println!("No admin account; was the users collection seeded?"),
    }

    for role in roles.list().await? {
        println!("Role {} ({})", role.name, role.description);
    }

    let ctx = CallContext::user("admin");
    for product in products.list_active().await? {
        if let Some(id) = product.id {
            let restocked = products.adjust_quantity(&id, 1, &ctx).await?;
            println!(
                "Restocked {} to {}",
                restocked.name,
                restocked.quantity.unwrap_or_default()
            );
        }
    }

    Ok(())
}
