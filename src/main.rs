use acmeproxy::clock::SystemClock;
use acmeproxy::service::SharedService;
use acmeproxy::store::DynSecretStore;
use acmeproxy::{ChallengeService, Config, FileSecretStore, InMemorySecretStore, PipeSession, Shared};
use anyhow::{anyhow, Result};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::RwLock;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_init();

    let mut args = std::env::args();
    let program_name = args.next().unwrap_or("acmeproxy".to_string());
    let (mode, config_file) = (args.next(), args.next());

    let config = config_init(&program_name, config_file)?;
    let store = store_init(&config).await?;
    let service = Arc::new(ChallengeService::from_config(
        &config,
        store,
        Arc::new(SystemClock),
    ));

    match mode.as_deref() {
        Some("pipe") => pipe(&config, service).await,
        Some("serve") => serve(config, service).await,
        _ => Err(usage(&program_name)),
    }
}

async fn pipe(config: &Config, service: SharedService) -> Result<()> {
    let session = PipeSession::new(service, config.banner.clone());
    if let Err(err) = acmeproxy::pipe::serve_stdio(&session).await {
        tracing::error!("pipe session failed: {err}");
        std::process::exit(1);
    }
    Ok(())
}

async fn serve(config: Shared, service: SharedService) -> Result<()> {
    tracing::info!("API listening on {}", &config.api_bind_addr);
    let api_server = acmeproxy::api::new(config.clone(), service);
    let api_handle = tokio::spawn(api_server);

    tokio::select! {
        _ = signal::ctrl_c() => {
            tracing::info!("quitting from signal");
        },
        Ok(api_res) = api_handle => {
            if let Err(err) = api_res {
                return Err(err.into())
            }
        }
    }
    tracing::info!("goodbye");
    Ok(())
}

/// Logs always go to stderr: in pipe mode stdout belongs to PowerDNS.
fn tracing_init() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "acmeproxy=info".into()),
        )
        .init();
}

fn usage(program_name: &str) -> anyhow::Error {
    anyhow!("usage: {program_name} serve|pipe /path/to/config.json")
}

fn config_init(program_name: &str, config_file: Option<String>) -> Result<Shared> {
    match config_file {
        None => Err(usage(program_name)),
        Some(config_file) => {
            let config = Config::try_from_file(&config_file)?;
            tracing::debug!("loaded config from {config_file}");
            Ok(Arc::new(config))
        }
    }
}

async fn store_init(config: &Config) -> Result<DynSecretStore> {
    let store: DynSecretStore = match &config.state_path {
        Some(path) => Arc::new(RwLock::new(FileSecretStore::try_from_file(path).await?)),
        None => {
            tracing::warn!("no state_path configured, keeping state in memory");
            Arc::new(RwLock::new(InMemorySecretStore::new()))
        }
    };
    Ok(store)
}
