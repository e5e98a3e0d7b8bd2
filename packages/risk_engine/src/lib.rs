//! `risk_engine` maintains hierarchical risk trees and computes Loss
//! Exceedance Curves (LECs) for any node of a tree on demand.
//!
//! The crate is a pure domain/service library: it has no HTTP/RPC surface,
//! no authentication, and no persistence backend of its own beyond an
//! in-process map. Those concerns belong to an external transport crate
//! that embeds [`domain::services::tree_service::TreeService`].

pub mod config;
pub mod domain;

pub use config::EngineConfig;
