use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use std::path::PathBuf;
use std::sync::Arc;

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod error;
mod migrate;
mod model;
mod models;
mod routes;
mod service;
mod store;
mod utils;

use config::Config;
use db::init_db;
use routes::Limiters;
use store::mysql::MySqlStore;
use store::{IdentityStore, LogStore};
use utils::card_cache::CardCache;
use utils::identity_filter::IdentityFilter;

use crate::docs::ApiDoc;
use tracing::{error, info};
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(Parser)]
#[command(name = "dailylog", about = "Staff daily log service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Import users, ID cards and logs from a legacy JSON dump
    Migrate {
        #[arg(long, env = "LEGACY_DUMP")]
        dump: PathBuf,
    },
}

#[get("/")]
async fn index() -> impl Responder {
    "Staff daily log service is running"
}

#[actix_web::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(config.log_level)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    let pool = init_db(&config.database_url, config.db_max_connections).await?;
    let store = Arc::new(MySqlStore::new(pool));

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, store).await,
        Command::Migrate { dump } => {
            let report =
                migrate::run_from_file(store.as_ref(), &dump, &config.migration_default_password)
                    .await?;
            println!("Migration completed: {report:#?}");
            Ok(())
        }
    }
}

async fn serve(config: Config, store: Arc<MySqlStore>) -> Result<()> {
    info!("Server starting...");

    let limiters = Limiters::from_config(&config)?;
    let identity_filter = Data::new(IdentityFilter::new());
    let card_cache = Data::new(CardCache::default());

    {
        let filter = identity_filter.clone();
        let pool = store.pool().clone();
        actix_web::rt::spawn(async move {
            if let Err(e) = filter.warmup(&pool, 100).await {
                error!(error = %e, "Failed to warm up identity filter");
            }
        });
    }

    {
        let cache = card_cache.clone();
        let pool = store.pool().clone();
        actix_web::rt::spawn(async move {
            // cards of users seen in the last 30 days, in batches of 250
            if let Err(e) = cache.warmup(&pool, 30, 250).await {
                error!(error = %e, "Failed to warm up card cache");
            }
        });
    }

    let log_store: Arc<dyn LogStore> = store.clone();
    let identity_store: Arc<dyn IdentityStore> = store;
    let server_addr = config.server_addr.clone();
    let api_prefix = config.api_prefix.clone();
    let config = Data::new(config);

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← wildcard {_:.*} matches the JS/CSS assets
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::from(log_store.clone()))
            .app_data(Data::from(identity_store.clone()))
            .app_data(config.clone())
            .app_data(card_cache.clone())
            .app_data(identity_filter.clone())
            .service(index)
            // auth + protected routes with rate limiting
            .configure(|cfg| routes::configure(cfg, &api_prefix, &limiters))
    })
    .bind(&server_addr)
    .with_context(|| format!("Failed to bind {server_addr}"))?
    .run()
    .await?;

    Ok(())
}
