//! Controller-facing side of the background connection service.
//!
//! This module provides the accept list abstraction and the manager task
//! that serializes access to the registry.

pub mod filter;
pub mod manager;
