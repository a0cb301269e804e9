// src/config.rs
//! Runtime configuration.
//!
//! Layered, lowest priority first:
//! 1. Built-in defaults (reference test network: `Org1MSP`, `mychannel`)
//! 2. Optional `cert-registry.toml` in the working directory
//! 3. Environment variables prefixed `CERTS_`, nested keys split by `__`
//!    Example: `CERTS_SERVER__PORT=8080`, `CERTS_LEDGER__REGISTRAR_MSP=UniMSP`
//!
//! `main` loads a `.env` file first, so its entries count as environment.

use crate::blockchain::ledger::IndexRef;
use crate::contracts::access_control::{RegistrarGuard, DEFAULT_REGISTRAR_MSP};
use crate::contracts::certificate_registry::CertificateContract;
use crate::contracts::query::{StudentQuery, DEFAULT_INDEX_DESIGN_DOC, DEFAULT_INDEX_NAME};
use crate::models::identity::ClientIdentity;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use config::builder::DefaultState;
use serde::Deserialize;
use std::net::{IpAddr, SocketAddr};

pub const ENV_PREFIX: &str = "CERTS";
pub const CONFIG_FILE: &str = "cert-registry";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Settings {
    pub server: ServerSettings,
    pub ledger: LedgerSettings,
}

/// HTTP gateway settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origin, `*` for any
    pub cors_origin: String,
    /// Default `env_logger` filter when `RUST_LOG` is unset
    pub log_level: String,
}

/// Ledger network and contract settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LedgerSettings {
    /// The only MSP allowed to issue, revoke or amend certificates
    pub registrar_msp: String,
    /// MSP the gateway transacts as
    pub client_msp: String,
    /// Enrollment id the gateway transacts as
    pub client_id: String,
    pub channel: String,
    pub chaincode: String,
    pub index_design_doc: String,
    pub index_name: String,
}

impl Settings {
    /// Loads settings from defaults, the optional config file and the
    /// process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::defaults()?
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(Self::environment())
            .build()?
            .try_deserialize()
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3001_i64)?
            .set_default("server.cors_origin", "*")?
            .set_default("server.log_level", "info")?
            .set_default("ledger.registrar_msp", DEFAULT_REGISTRAR_MSP)?
            .set_default("ledger.client_msp", DEFAULT_REGISTRAR_MSP)?
            .set_default("ledger.client_id", "User1@org1.example.com")?
            .set_default("ledger.channel", "mychannel")?
            .set_default("ledger.chaincode", "certificates")?
            .set_default("ledger.index_design_doc", DEFAULT_INDEX_DESIGN_DOC)?
            .set_default("ledger.index_name", DEFAULT_INDEX_NAME)
    }

    fn environment() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    /// Address the HTTP gateway binds to.
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        let ip: IpAddr = self.server.host.parse()?;
        Ok(SocketAddr::new(ip, self.server.port))
    }

    /// Identity the gateway presents to the ledger.
    pub fn client_identity(&self) -> ClientIdentity {
        ClientIdentity::new(&self.ledger.client_msp, &self.ledger.client_id)
    }

    pub fn student_index(&self) -> IndexRef {
        IndexRef::new(&self.ledger.index_design_doc, &self.ledger.index_name)
    }

    /// Builds the contract with the configured registrar and student index.
    pub fn contract(&self) -> CertificateContract {
        CertificateContract::new(
            RegistrarGuard::new(&self.ledger.registrar_msp),
            StudentQuery::new(self.student_index()),
        )
    }
}
