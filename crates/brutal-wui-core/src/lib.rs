//! Core types for BrutalWUI: the browser command protocol, configuration,
//! and the shared error type.

pub mod config;
pub mod error;
pub mod protocol;
