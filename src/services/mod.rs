// src/services/mod.rs
//! Gateway service and HTTP API.

pub mod api_server;
pub mod certificate_service;
