//! Command orchestrators for business logic
//!
//! This module provides orchestrators that coordinate between the CLI layer
//! and the core library services.

pub mod reconcile_orchestrator;
pub mod subscribe_orchestrator;
