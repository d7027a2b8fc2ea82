//! Entry point
//!
//! Subcommands: `serve` (default), `build-index <issues.json>`,
//! `query <text>`, `health`, `metrics`.

use std::net::SocketAddr;

use tracing_subscriber::EnvFilter;

use sherlock_config::{load_settings, Settings};
use sherlock_core::Incident;
use sherlock_server::{create_router, init_metrics, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env = std::env::var("SHERLOCK_ENV").ok();
    let settings = match load_settings(env.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Warning: failed to load config: {e}. Using defaults.");
            Settings::default()
        }
    };

    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        None | Some("serve") => serve(settings).await,
        Some("build-index") => {
            let path = args.get(1).ok_or("usage: sherlock build-index <issues.json>")?;
            build_index(settings, path).await
        }
        Some("query") => {
            let text = args[1..].join(" ");
            if text.trim().is_empty() {
                return Err("usage: sherlock query <text>".into());
            }
            query(settings, &text).await
        }
        Some("health") => health(settings).await,
        Some("metrics") => metrics(settings).await,
        Some(other) => {
            eprintln!("Unknown command: {other}");
            eprintln!("Commands: serve | build-index <issues.json> | query <text> | health | metrics");
            std::process::exit(2);
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn serve(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("Starting sherlock server v{}", env!("CARGO_PKG_VERSION"));

    let _handle = init_metrics();
    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port).parse()?;
    let state = AppState::from_settings(settings).await;
    let router = create_router(state);

    tracing::info!(%addr, "Listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}

async fn build_index(settings: Settings, path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(path)?;
    let incidents: Vec<Incident> = match serde_json::from_str(&raw) {
        Ok(incidents) => incidents,
        Err(_) => {
            // Ingestion exports sometimes wrap the list in {"issues": [...]}
            #[derive(serde::Deserialize)]
            struct Wrapped {
                issues: Vec<Incident>,
            }
            serde_json::from_str::<Wrapped>(&raw)?.issues
        }
    };

    let state = AppState::from_settings(settings).await;
    let count = incidents.len();
    if state.service.build_indices(incidents).await {
        println!("Indexed {count} incidents");
        Ok(())
    } else {
        Err("index build failed".into())
    }
}

async fn query(settings: Settings, text: &str) -> Result<(), Box<dyn std::error::Error>> {
    let state = AppState::from_settings(settings).await;
    let response = state.service.process_query(text).await;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

async fn health(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let state = AppState::from_settings(settings).await;
    let report = state.service.health_check().await;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn metrics(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let state = AppState::from_settings(settings).await;
    println!("{}", serde_json::to_string_pretty(&state.service.metrics())?);
    Ok(())
}
