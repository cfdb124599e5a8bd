//! GATT-layer bookkeeping.
//!
//! This module contains the application identifier type and the
//! background connection registry.

use core::fmt;

use serde::{Deserialize, Serialize};

pub mod bg_conn;

/// Identifier of a registered GATT application ("GATT interface").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GattIf(pub u8);

impl fmt::Display for GattIf {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      write!(f, "{}", self.0)
   }
}
