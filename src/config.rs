//! Configuration management for the background connection service.
//!
//! This module handles loading and saving configuration from disk,
//! including the accept list size and devices to register at start-up.

use std::{
   env, fs,
   path::{Path, PathBuf},
   str::FromStr,
};

use bluer::Address;
use serde::{Deserialize, Serialize};

use crate::{
   error::{BgConnError, Result},
   gatt::GattIf,
};

/// Main configuration structure for the service.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Config {
   #[serde(default = "default_accept_list_size")]
   pub accept_list_size: usize,

   #[serde(default)]
   pub background_devices: Vec<BackgroundDevice>,
}

/// A device an application wants a background connection to from start-up.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct BackgroundDevice {
   pub gatt_if: GattIf,
   pub address: String,
}

impl BackgroundDevice {
   pub fn address(&self) -> Result<Address> {
      Address::from_str(&self.address).map_err(|_| BgConnError::InvalidAddress(self.address.clone()))
   }
}

const fn default_accept_list_size() -> usize {
   8
}

impl Default for Config {
   fn default() -> Self {
      Self {
         accept_list_size: default_accept_list_size(),
         background_devices: vec![],
      }
   }
}

impl Config {
   /// Loads configuration from disk or creates default if not exists.
   pub fn load() -> Result<Self> {
      Self::load_from(&Self::config_path()?)
   }

   /// Saves the current configuration to disk.
   pub fn save(&self) -> Result<()> {
      self.save_to(&Self::config_path()?)
   }

   pub fn load_from(path: &Path) -> Result<Self> {
      if path.exists() {
         let contents = fs::read_to_string(path)?;
         Ok(toml::from_str(&contents)?)
      } else {
         // Create default config
         let config = Self::default();
         config.save_to(path)?;
         Ok(config)
      }
   }

   pub fn save_to(&self, path: &Path) -> Result<()> {
      // Ensure directory exists
      if let Some(parent) = path.parent() {
         fs::create_dir_all(parent)?;
      }

      let contents = toml::to_string_pretty(self)?;
      fs::write(path, contents)?;

      Ok(())
   }

   fn config_path() -> Result<PathBuf> {
      let config_dir = if let Ok(bgconn_home) = env::var("BGCONN_HOME") {
         PathBuf::from(bgconn_home)
      } else if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
         PathBuf::from(config_home)
      } else if let Ok(home) = env::var("HOME") {
         PathBuf::from(home).join(".config")
      } else {
         return Err(BgConnError::ConfigDirNotFound);
      };

      Ok(config_dir.join("bgconnd").join("config.toml"))
   }
}
