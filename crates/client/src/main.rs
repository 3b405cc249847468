// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use clap::Parser;
use tokio::sync::broadcast::error::TryRecvError;
use tracing::error;

use helpdesk_client::cli::{self, Cli};
use helpdesk_client::credential::FileBackend;
use helpdesk_client::{
    RequestDecorator, ReqwestTransport, Session, SessionController, SessionEvent, TransportClient,
};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);

    match run(cli).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("fatal: {e:#}");
            std::process::exit(1);
        }
    }
}

fn init_tracing(cli: &Cli) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));

    match cli.log_format.as_str() {
        "json" => {
            fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr).json().init();
        }
        _ => {
            fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<i32> {
    let config = cli.config;
    let session = Session::restore(Arc::new(FileBackend::new(config.credentials_path())));
    let mut events = session.subscribe();

    let transport = ReqwestTransport::new(&config.api_url, config.timeout())?;
    let client = TransportClient::new(transport, session)
        .with_decorator(RequestDecorator::new(config.auth_scheme.clone()));
    let controller = SessionController::new(client);

    let result = cli::execute(&controller, cli.command).await;

    let mut expired = false;
    loop {
        match events.try_recv() {
            Ok(SessionEvent::Expired { reason }) => {
                tracing::debug!(%reason, "session expired");
                expired = true;
            }
            Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }

    match result {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            if expired {
                eprintln!("note: the stored session expired during this command");
            }
            Ok(0)
        }
        Err(e) => {
            eprintln!("error [{}]: {e}", e.kind());
            if let Some(hint) = cli::hint(&e) {
                eprintln!("hint: {hint}");
            }
            Ok(cli::exit_code(&e))
        }
    }
}
