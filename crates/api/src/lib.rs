//! HTTP host for the pre-authentication gate: configuration, wiring, and
//! request/response mapping for the two blocking triggers.

pub mod app;
pub mod config;
pub mod errors;
