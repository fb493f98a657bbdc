use tracing::info;

use chorely::{Config, Database, WebServer};

#[tokio::main]
async fn main() -> chorely::Result<()> {
    // Load configuration
    let config = match Config::load_with_env("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config.toml: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };
    config.validate()?;

    // Initialize logging
    if let Err(e) = chorely::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        chorely::logging::init_console_only(&config.logging.level);
    }

    info!("Chorely auth service");

    let db = Database::open(&config.database.path).await?;
    info!("Database ready at {}", config.database.path);

    let server = WebServer::new(&config.server, db);
    info!(
        "Server configured on {}:{}",
        config.server.host, config.server.port
    );

    server.run().await?;
    Ok(())
}
