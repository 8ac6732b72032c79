//! Fleetlock: named locks shared by a fleet of cooperating nodes.
//!
//! The [`locks::Locks`] facade hands out mutually exclusive locks identified
//! by arbitrary names. Which backend enforces them (in-process, a shared lock
//! table, or an expiring cache) is chosen by [`config::Config`] and wired by
//! [`backend::build_locks`].

pub mod backend;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod exit_codes;
pub mod locks;
pub mod logging;
pub mod metrics;
pub mod node;
