// Library for the binary and integration tests

pub mod commands;
pub mod config;
pub mod connection;
pub mod engine;
pub mod events;
pub mod models;
pub mod routes;
pub mod state;
pub mod version;
