//! Chaebo CLI library.
//!
//! This crate provides the file-backed song store and the command
//! implementations behind the `chaebo` binary.

pub mod commands;
pub mod config;
pub mod store;
