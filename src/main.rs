//! Background connection daemon.
//!
//! Loads the configured background devices, registers them with the
//! manager over an accept list of the configured size, and resets the
//! registry on shutdown.

use bgconnd::{AcceptList, BgConnManager, config::Config, error::Result};
use log::{info, warn};
use tokio::signal;

#[tokio::main]
async fn main() -> Result<()> {
   env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

   info!("Starting background connection service...");

   // Load configuration
   let config = Config::load()?;
   info!(
      "Loaded configuration with {} background devices, accept list size {}",
      config.background_devices.len(),
      config.accept_list_size
   );

   let manager = BgConnManager::new(AcceptList::with_capacity(config.accept_list_size));

   for device in &config.background_devices {
      let address = match device.address() {
         Ok(address) => address,
         Err(e) => {
            warn!("Skipping background device for app {}: {e}", device.gatt_if);
            continue;
         },
      };
      if !manager.add_interest(device.gatt_if, address).await? {
         warn!(
            "Accept list full, app {} will not reconnect to {address}",
            device.gatt_if
         );
      }
   }

   info!(
      "Background connection service started with {} devices",
      manager.count_devices().await
   );

   // Wait for shutdown signal
   signal::ctrl_c().await?;
   info!("Shutting down background connection service...");
   manager.reset(false).await?;

   Ok(())
}
