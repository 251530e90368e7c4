//! `ade-jobs` -- submit one document to the ADE parse-jobs endpoint and
//! wait for the result.
//!
//! The parsed result JSON is printed to stdout. Progress is logged.
//! Ctrl-C stops waiting; the remote job keeps running.
//!
//! # Environment variables
//!
//! | Variable           | Required | Default        | Description                        |
//! |--------------------|----------|----------------|------------------------------------|
//! | `ADE_DOCUMENT`     | one of   | --             | Local file uploaded as the document |
//! | `ADE_DOCUMENT_URL` | one of   | --             | Remote document URL                |
//! | `ADE_MODEL`        | no       | `dpt-2-latest` | Parse model                        |
//! | `ADE_SPLIT`        | no       | --             | Split mode, e.g. `page`            |
//!
//! Connection, polling and retry settings are read by
//! [`AdeConfig::from_env`].

use std::path::Path;

use anyhow::{bail, Context};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ade_core::request::{JobRequest, DEFAULT_MODEL};
use ade_jobs::client::JobClient;
use ade_jobs::config::AdeConfig;
use ade_jobs::events::JobEvent;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ade_jobs=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run().await {
        tracing::error!("Parse job did not complete: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = AdeConfig::from_env();
    tracing::info!(
        base_url = %config.http.base_url,
        poll_interval_secs = config.client.poll_interval.as_secs(),
        wait_timeout_secs = config.client.wait_timeout.as_secs(),
        max_attempts = config.client.retry.max_attempts,
        "Loaded client configuration",
    );

    let request = request_from_env().await?;
    let client =
        JobClient::http(&config.http, config.client.clone()).context("Failed to build HTTP client")?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, no longer waiting");
            ctrl_c.cancel();
        }
    });

    let events = tokio::spawn(log_events(client.subscribe()));

    let outcome = client.run(&request, &cancel).await;
    events.abort();

    let result = outcome?;
    let rendered = serde_json::to_string_pretty(&result.data).context("Failed to render result")?;
    println!("{rendered}");

    if let Some(url) = &result.output_url {
        tracing::info!(output_url = %url, "Result is also available for download");
    }
    Ok(())
}

/// Build the request from `ADE_DOCUMENT` / `ADE_DOCUMENT_URL`,
/// `ADE_MODEL` and `ADE_SPLIT`.
async fn request_from_env() -> anyhow::Result<JobRequest> {
    let model = std::env::var("ADE_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
    let mut request = JobRequest::new().model(model);

    if let Ok(split) = std::env::var("ADE_SPLIT") {
        request = request.split(split);
    }

    match (std::env::var("ADE_DOCUMENT"), std::env::var("ADE_DOCUMENT_URL")) {
        (Ok(path), Err(_)) => {
            let bytes = tokio::fs::read(&path)
                .await
                .with_context(|| format!("Failed to read document {path}"))?;
            let file_name = Path::new(&path)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.clone());
            tracing::info!(file = %file_name, size_bytes = bytes.len(), "Uploading local document");
            request = request.document(file_name, bytes);
        }
        (Err(_), Ok(url)) => {
            request = request.document_url(url);
        }
        (Ok(_), Ok(_)) => bail!("Set only one of ADE_DOCUMENT and ADE_DOCUMENT_URL"),
        (Err(_), Err(_)) => bail!("ADE_DOCUMENT or ADE_DOCUMENT_URL must be set"),
    }

    Ok(request)
}

/// Log job events until the channel closes.
async fn log_events(mut rx: tokio::sync::broadcast::Receiver<JobEvent>) {
    use tokio::sync::broadcast::error::RecvError;

    loop {
        match rx.recv().await {
            Ok(JobEvent::Progress {
                job_id,
                state,
                progress,
            }) => {
                tracing::info!(
                    job_id = %job_id,
                    status = %state,
                    "Progress: {:.1}%",
                    progress * 100.0,
                );
            }
            Ok(JobEvent::RetryScheduled {
                attempt,
                delay_ms,
                error,
                ..
            }) => {
                tracing::info!(attempt, delay_ms, error = %error, "Retrying after transient error");
            }
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "Event logger lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
}
