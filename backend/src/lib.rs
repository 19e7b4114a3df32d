//! Challan Gateway Library
//!
//! Backend for querying traffic challan data in natural language, plus the
//! typed API client and chart renderer used by the command-line client.
//! The server binary is in `src/main.rs`.

pub mod api;
pub mod auth;
pub mod chart;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod llm;
pub mod mail;
pub mod query;
pub mod services;
/// Application state management
///
/// Wires the services handed to every request handler.
pub mod state;
