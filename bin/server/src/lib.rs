//! medigate authentication gateway server.
//!
//! This crate provides the HTTP surface (`/login`, `/register`,
//! `/google-oauth-callback`), environment configuration and the Postgres
//! repository behind `medigate_gateway::AuthGateway`.

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod routes;
pub mod state;
