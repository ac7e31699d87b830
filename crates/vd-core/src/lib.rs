//! Pairs downloads with their digest and signature files and has an external
//! verifier check them.

pub mod config;
pub mod controller;
pub mod error;
pub mod fetch;
pub mod host;
pub mod listing;
pub mod logging;
pub mod menus;
pub mod registry;
pub mod rules;
pub mod settings;
pub mod url_model;
pub mod verifier;

pub use controller::{Collaborators, Controller, ControllerOptions, DiscoveryOutcome, DiscoveryPolicy};
pub use error::{Result, VdError};
