//! Super Quiz Hero API server

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};

use quizhero::{
    config::Args,
    db::MongoClient,
    logging::{self, ActivityLogger},
    progress::{Catalog, ProgressEvaluator},
    server::{self, AppState},
    services::{PlayerService, PlayerSettings},
    store::{MemoryUserStore, MongoUserStore, UserStore},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    logging::init_tracing(&args.log_level, args.log_format);

    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    info!("======================================");
    info!("  Super Quiz Hero API");
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("Listen: {}", args.listen);
    info!("Mode: {}", if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" });
    info!("MongoDB database: {}", args.mongodb_db);
    info!("Leaderboard size: {}", args.leaderboard_limit);
    info!("Event validation: {:?}", args.validation_mode());
    info!("======================================");

    let catalog = Catalog::load(args.catalog_path.as_deref())?;
    info!(
        "Catalog: {} ranks, {} achievements",
        catalog.ranks.len(),
        catalog.achievements.len()
    );
    let evaluator = ProgressEvaluator::new(Arc::new(catalog));

    let jwt = args.jwt_validator()?;

    // MongoDB is required in production; dev mode falls back to memory
    let store: Arc<dyn UserStore> = match MongoClient::new(&args.mongodb_uri, &args.mongodb_db).await {
        Ok(mongo) => {
            info!("MongoDB connected to '{}'", mongo.db_name());
            Arc::new(MongoUserStore::new(&mongo).await?)
        }
        Err(e) if args.dev_mode => {
            warn!("MongoDB connection failed (dev mode, using in-memory store): {}", e);
            Arc::new(MemoryUserStore::new())
        }
        Err(e) => {
            error!("MongoDB connection failed: {}", e);
            std::process::exit(1);
        }
    };

    let activity = ActivityLogger::new(args.node_id.to_string());
    if let Some(path) = args.activity_log.clone() {
        if let Err(e) = activity.init_file(path).await {
            warn!("Activity log disabled: {}", e);
        }
    }

    let players = Arc::new(PlayerService::new(
        store,
        evaluator,
        jwt,
        activity,
        PlayerSettings::from_args(&args),
    ));

    let state = Arc::new(AppState::new(args, players));
    server::run(state).await?;

    Ok(())
}
