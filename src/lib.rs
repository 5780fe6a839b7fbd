//! Core of a chat client for a locally running language-model server.
//!
//! All conversation state lives in [`store::SessionState`];
//! [`session::SessionController`] drives user actions against it and a
//! [`client::GenerationBackend`], delivering request resolutions back as
//! events. The binary wires a line-driven loop on top. Nothing is persisted.

pub mod client;
pub mod config;
pub mod errors;
pub mod models;
pub mod registry;
pub mod session;
pub mod store;
