use chorechart_server::{server, storage};
mod cli;

use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

const DEFAULT_PORT: u16 = 5152;

#[tokio::main]
async fn main() {
    use clap::Parser;
    let args = cli::Cli::parse();
    if let Some(cmd) = args.command {
        match cmd {
            cli::Command::HashPasscode { passcode, cost } => {
                match bcrypt::hash(&passcode, cost) {
                    Ok(h) => println!("{}", h),
                    Err(e) => {
                        eprintln!("Hash error: {}", e);
                        std::process::exit(2);
                    }
                }
                return;
            }
        }
    }
    // Console-only logging with env-driven level
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_ansi(true)
        .init();

    let config = match server::AppConfig::load() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error=%e, "Failed to load config");
            std::process::exit(2);
        }
    };

    let db_path = std::env::var("DB_PATH").unwrap_or_else(|_| "data/app.db".into());
    // Ensure data dir exists when using default
    if let Some(parent) = std::path::Path::new(&db_path).parent()
        && !parent.as_os_str().is_empty()
        && let Err(e) = std::fs::create_dir_all(parent)
    {
        tracing::error!(error=%e, path=%parent.display(), "Failed to create data dir");
        std::process::exit(3);
    }
    let store = match storage::Store::connect_sqlite(&db_path).await {
        Ok(s) => s.with_log_retention(config.log_retention),
        Err(e) => {
            tracing::error!(error=%e, path=%db_path, "Failed to connect DB");
            std::process::exit(3);
        }
    };

    if let Err(e) = store.seed_users(&config.users).await {
        tracing::error!(error=%e, "Failed to seed users");
        std::process::exit(4);
    }

    // Decide listen port: env PORT overrides config.listen_port
    let port = std::env::var("PORT")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .or(config.listen_port)
        .unwrap_or(DEFAULT_PORT);

    let state = server::AppState::new(config, store);
    let shutdown_token = state.shutdown_token();
    let shutdown_token_for_server = shutdown_token.clone();

    let app = server::router(state);

    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    tracing::info!(%addr, "Starting server");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!(error=%e, %addr, "Failed to bind listener");
            std::process::exit(1);
        }
    };

    let mut server_task = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_token_for_server.cancelled_owned())
            .await
    });

    // Wait for OS signal; then trigger graceful, and if it hangs beyond timeout, force abort.
    shutdown_signal().await;
    tracing::info!("shutdown: initiating graceful stop");
    shutdown_token.cancel();
    match tokio::time::timeout(std::time::Duration::from_secs(3), &mut server_task).await {
        Ok(join_res) => match join_res {
            Ok(Ok(())) => {}
            Ok(Err(err)) => tracing::error!(%err, "server error"),
            Err(e) => tracing::error!(error=%e, "server task join error"),
        },
        Err(_) => {
            tracing::warn!("shutdown: forcing server abort due to timeout");
            server_task.abort();
        }
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let (mut sigint, mut sigterm) =
            match (signal(SignalKind::interrupt()), signal(SignalKind::terminate())) {
                (Ok(i), Ok(t)) => (i, t),
                (Err(e), _) | (_, Err(e)) => {
                    tracing::error!(error=%e, "failed to install signal handlers");
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = sigint.recv() => {
                tracing::info!("shutdown: received SIGINT");
            }
            _ = sigterm.recv() => {
                tracing::info!("shutdown: received SIGTERM");
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("shutdown: received Ctrl+C");
    }
}
