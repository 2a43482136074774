use anyhow::Result;
use clap::Parser;
use merenda::auth::hash_password;
use merenda::config::Config;
use merenda::model::{InsertUser, ADMIN_CLASSROOM};
use merenda::routes;
use merenda::state::AppState;
use merenda::store::Store;
use merenda::Args;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }
    if args.auth_bypass {
        config.auth_bypass = true;
    }

    if config.auth_bypass {
        warn!("auth bypass is enabled: role checks are OFF, do not deploy like this");
    }

    std::fs::create_dir_all(&config.data_dir)?;
    let mut store = Store::open(config.store_path(), config.classes_path());

    // First run: create the bootstrap admin so someone can log in.
    if store.get_all_users().is_empty() {
        let admin = store.create_user(InsertUser {
            username: config.admin_username.clone(),
            password: hash_password(&config.admin_password),
            first_name: "Admin".to_string(),
            last_name: "Scuola".to_string(),
            class_room: ADMIN_CLASSROOM.to_string(),
            email: config.admin_username.clone(),
            is_admin: true,
            is_representative: false,
            is_user_admin: true,
        });
        warn!(
            "created bootstrap admin '{}' (id {}); change its password",
            admin.username, admin.id
        );
    }

    let port = config.port;
    let state = AppState::new(config, store);
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    info!("listening on port {}", port);
    axum::serve(listener, app).await?;
    Ok(())
}
