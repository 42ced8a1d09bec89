pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod domain;
pub mod notify;
pub mod outcome;
pub mod routes;
pub mod store;
pub mod terminal;
