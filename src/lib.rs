//! Library crate for buzzroom-back, exposing modules for the binary and
//! integration tests.

pub mod config;
mod dto;
mod error;
pub mod routes;
pub mod services;
pub mod state;
