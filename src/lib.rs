//! GATT background connection registry.
//!
//! Keeps track of which local GATT applications want a background connection
//! to which remote devices, and keeps the controller accept list containing
//! exactly the devices at least one application still cares about.

pub mod bluetooth;
pub mod config;
pub mod error;
pub mod gatt;

pub use bluetooth::{
   filter::{AcceptFilter, AcceptList},
   manager::BgConnManager,
};
pub use gatt::{
   GattIf,
   bg_conn::{BgConnDevice, BgConnRegistry},
};
