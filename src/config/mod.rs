//! # Configuration Module
//!
//! Configuration structures for the capture controller and the hosted backend client.

pub mod config;

pub use config::{BackendConfig, ControllerConfig, DeviceClass};
