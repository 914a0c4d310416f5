use bibliotheca::config::{Cli, Config, default_config_dir, default_config_path};
use bibliotheca::db::Database;
use bibliotheca::handler::AppState;
use bibliotheca::routes::routes;
use bibliotheca::views::Views;
use clap::Parser;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let args = Cli::parse();
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    tracing::info!("bibliotheca.svc starting");

    // With --config the database lives next to the config file,
    // otherwise both live in ~/.bibliotheca/
    let (mut cfg, data_dir) = match &args.config_path {
        Some(path) => {
            let path = std::path::PathBuf::from(path);
            let dir = path
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| std::path::PathBuf::from("."));
            let cfg = Config::new(path.to_string_lossy().as_ref()).unwrap_or_else(|e| {
                tracing::error!(error = %e, path = ?path, "failed to load config file");
                std::process::exit(1);
            });
            (cfg, dir)
        }
        None => {
            let cfg = Config::new_or_default(&default_config_path()).unwrap_or_else(|e| {
                tracing::error!(error = %e, "failed to load default config file");
                std::process::exit(1);
            });
            (cfg, default_config_dir())
        }
    };
    cfg.apply_cli(&args);

    let db = Database::new(&cfg, &data_dir).await.unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to setup database");
        std::process::exit(1);
    });
    tracing::info!(path = ?db.path(), "database ready");

    let views = Views::new().unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to load templates");
        std::process::exit(1);
    });

    let app = routes()
        .layer(TraceLayer::new_for_http())
        .with_state(AppState::new(db, views));

    let address = cfg.app.address();
    let listener = tokio::net::TcpListener::bind(&address).await.unwrap_or_else(|e| {
        tracing::error!(error = %e, address = %address, "failed to setup tcp listener");
        std::process::exit(1);
    });

    tracing::info!("bibliotheca.svc running on {}", &address);
    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl+c");
            }
            tracing::info!("ctrl+c signal received, preparing to shutdown");
        })
        .await;

    if let Err(err) = result {
        tracing::error!(error = %err, "server error");
        std::process::exit(1);
    }
    tracing::info!("bibliotheca.svc going off, graceful shutdown complete");
}
