//! the `serve` subcommand - runs the authorization server.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use clap::Args;
use color_eyre::eyre::{Context, Result, bail};
use gatehouse_grants::Authorizer;
use gatehouse_store::AnyStore;
use gatehouse_types::{Config, ReadConsistency, StoreBackend};
use tokio::net::TcpListener;
use tracing::{Level, debug, info};
use tracing_subscriber::FmtSubscriber;

/// default config file search paths (in order of priority).
const CONFIG_SEARCH_PATHS: &[&str] = &["/etc/gatehouse/config.toml", "./config.toml"];

/// run the gatehouse authorization server
#[derive(Args, Debug)]
pub struct ServeCommand {
    /// path to config file (toml format)
    #[arg(short, long, env = "GATEHOUSE_CONFIG")]
    config: Option<PathBuf>,

    /// address to listen on
    #[arg(long, env = "GATEHOUSE_LISTEN_ADDR")]
    listen_addr: Option<String>,

    /// grant store backend (memory or sql)
    #[arg(long, env = "GATEHOUSE_STORE_BACKEND")]
    store_backend: Option<String>,

    /// database url for the sql backend
    #[arg(long, env = "GATEHOUSE_DATABASE_URL")]
    database_url: Option<String>,

    /// read consistency for authorization lookups (stale or linearizable)
    #[arg(long, env = "GATEHOUSE_READ_CONSISTENCY")]
    read_consistency: Option<String>,

    /// log level
    #[arg(long, env = "GATEHOUSE_LOG_LEVEL")]
    log_level: Option<String>,
}

impl ServeCommand {
    /// find and load config file, returning none if no config file is found.
    fn load_config_file(config_path: Option<&PathBuf>) -> Result<Option<Config>> {
        // if explicit path provided, it must exist
        if let Some(path) = config_path {
            return read_config(path).map(Some);
        }

        for path_str in CONFIG_SEARCH_PATHS {
            let path = Path::new(path_str);
            if path.exists() {
                debug!("Found config file at {:?}", path);
                return read_config(path).map(Some);
            }
        }

        Ok(None)
    }

    /// convert cli arguments into a config struct, merging with config file if present.
    ///
    /// priority order: defaults -> config file -> cli flags
    fn into_config(self) -> Result<Config> {
        let mut config = match Self::load_config_file(self.config.as_ref())? {
            Some(file_config) => {
                info!("Loaded configuration from file");
                file_config
            }
            None => {
                debug!("No config file found, using defaults");
                Config::default()
            }
        };

        if let Some(listen_addr) = self.listen_addr {
            config.listen_addr = listen_addr;
        }
        if let Some(backend) = self.store_backend {
            config.store.backend = parse_backend(&backend)?;
        }
        if let Some(db_url) = self.database_url {
            config.store.connection_string = db_url;
        }
        if let Some(consistency) = self.read_consistency {
            config.store.consistency = parse_consistency(&consistency)?;
        }

        config.validate().context("invalid configuration")?;
        Ok(config)
    }

    /// run the serve command
    pub async fn run(self) -> Result<()> {
        let log_level = parse_log_level(self.log_level.as_deref());
        let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
        tracing::subscriber::set_global_default(subscriber)?;

        info!("Starting gatehouse...");

        let config = self.into_config()?;
        info!("Listen address: {}", config.listen_addr);
        info!(
            backend = ?config.store.backend,
            consistency = ?config.store.consistency,
            "Grant store"
        );

        if config.store.backend == StoreBackend::Sql {
            if let Some(parent) = sqlite_path(&config.store.connection_string).and_then(Path::parent)
            {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    info!("Creating database directory: {:?}", parent);
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!("failed to create database directory: {:?}", parent)
                    })?;
                }
            }
        }

        let store = AnyStore::open(&config.store)
            .await
            .context("failed to open grant store")?;

        let authorizer = Authorizer::from_config(store.clone(), &config)
            .context("failed to initialize authorizer")?;
        info!(
            routes = authorizer.resolver().len(),
            builtin_grants = authorizer.registry().builtin_grants().len(),
            managed_policies = ?authorizer.registry().store().managed_policies(),
            internal_subjects = config.internal_subjects.len(),
            "Authorizer ready"
        );

        let app = crate::create_app(authorizer, &config);

        let addr: SocketAddr = config
            .listen_addr
            .parse()
            .context("invalid listen address")?;

        info!("Starting HTTP server on {}", addr);

        let listener = TcpListener::bind(addr).await?;
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

        info!("Shutting down");
        store.close().await.context("failed to close grant store")?;
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}

fn read_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {:?}", path))?;
    toml::from_str(&content).with_context(|| format!("failed to parse config file: {:?}", path))
}

fn parse_log_level(level: Option<&str>) -> Level {
    match level.map(str::to_lowercase).as_deref() {
        Some("trace") => Level::TRACE,
        Some("debug") => Level::DEBUG,
        Some("warn") => Level::WARN,
        Some("error") => Level::ERROR,
        _ => Level::INFO,
    }
}

fn parse_backend(value: &str) -> Result<StoreBackend> {
    match value.to_lowercase().as_str() {
        "memory" => Ok(StoreBackend::Memory),
        "sql" => Ok(StoreBackend::Sql),
        other => bail!("unsupported store backend '{}', expected 'memory' or 'sql'", other),
    }
}

fn parse_consistency(value: &str) -> Result<ReadConsistency> {
    match value.to_lowercase().as_str() {
        "stale" => Ok(ReadConsistency::Stale),
        "linearizable" => Ok(ReadConsistency::Linearizable),
        other => bail!(
            "unsupported read consistency '{}', expected 'stale' or 'linearizable'",
            other
        ),
    }
}

/// filesystem path of a sqlite connection string, if it names a file.
fn sqlite_path(connection_string: &str) -> Option<&Path> {
    let rest = connection_string.strip_prefix("sqlite:")?;
    let rest = rest.strip_prefix("//").unwrap_or(rest);
    let path = rest.split('?').next()?;
    if path.is_empty() || path.starts_with(":memory:") {
        return None;
    }
    Some(Path::new(path))
}
