// src/main.rs

//! # Certificate Registry - Main Entry Point
//!
//! Loads configuration, starts the in-process ledger and serves the HTTP
//! gateway.
//!
//! ## Environment
//! Any setting can be overridden with `CERTS_<SECTION>__<KEY>`, for example
//! `CERTS_SERVER__PORT=8080` or `CERTS_LEDGER__REGISTRAR_MSP=UniMSP`.
//! A `.env` file in the working directory is loaded first.

use anyhow::Context;
use cert_registry::config::Settings;
use cert_registry::services::api_server::ApiServer;
use cert_registry::services::certificate_service::CertificateService;
use cert_registry::storage::memory_ledger::MemoryLedger;
use dotenv::dotenv;
use log::info;
use std::sync::Arc;

/// Main application entry point
///
/// # Initialization Sequence
/// 1. Load environment and configuration
/// 2. Initialize logging
/// 3. Create the ledger and declare the configured student index
/// 4. Start API server
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let settings = Settings::load().context("failed to load configuration")?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(settings.server.log_level.as_str()),
    )
    .init();

    let addr = settings
        .socket_addr()
        .with_context(|| format!("invalid server host '{}'", settings.server.host))?;

    let ledger = MemoryLedger::new();
    ledger
        .declare_index(settings.student_index())
        .context("failed to declare the student index")?;
    info!(
        "ledger ready: channel={} chaincode={} registrar={}",
        settings.ledger.channel, settings.ledger.chaincode, settings.ledger.registrar_msp
    );

    let service = CertificateService::new(
        Arc::new(ledger),
        settings.contract(),
        settings.client_identity(),
    );
    info!(
        "gateway identity: {}::{}",
        service.identity().msp_id,
        service.identity().id
    );

    let api_server = ApiServer::new(service, settings.server.cors_origin.clone());
    api_server.run(addr).await.context("API server failed")?;

    Ok(())
}
