//! Rotation of short-lived AWS STS credentials and console sign-in URLs
//! for managed accounts.

pub mod account;
pub mod aws;
pub mod cli;
pub mod commands;
pub mod config;
pub mod constants;
pub mod error;
pub mod platform;
pub mod policy;
pub mod rotation;
pub mod secret;
pub mod store;
