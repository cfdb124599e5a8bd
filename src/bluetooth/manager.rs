//! Background connection manager.
//!
//! The registry is plain single-owner state. This module wraps it in an
//! actor task so that any number of async callers can share it while every
//! operation still runs one at a time, in arrival order.

use bluer::Address;
use log::{debug, info};
use tokio::sync::{mpsc, oneshot};

use crate::{
   bluetooth::filter::AcceptFilter,
   error::{BgConnError, Result},
   gatt::{
      GattIf,
      bg_conn::{BgConnDevice, BgConnRegistry},
   },
};

/// Channel buffer size
const CHANNEL_BUFFER_SIZE: usize = 256;

type BoxedFilter = Box<dyn AcceptFilter + Send>;

// === Commands ===

#[derive(Debug)]
enum ManagerCommand {
   AddInterest(GattIf, Address, oneshot::Sender<bool>),
   RemoveInterest(GattIf, Address, oneshot::Sender<bool>),
   IsInterested(GattIf, Address, oneshot::Sender<bool>),
   DeregisterApp(GattIf, oneshot::Sender<()>),
   ClearDevice(Address, oneshot::Sender<bool>),
   Reset(bool, oneshot::Sender<()>), // after_controller_reset
   GetAllDevices(oneshot::Sender<Vec<BgConnDevice>>),
   CountDevices(oneshot::Sender<u32>),
}

// === Main Manager ===

/// Cloneable handle to the background connection registry.
///
/// All clones talk to the same actor; the actor stops once the last handle
/// is dropped.
#[derive(Debug, Clone)]
pub struct BgConnManager {
   inbox: mpsc::Sender<ManagerCommand>,
}

impl BgConnManager {
   /// Spawns the manager actor on the current tokio runtime.
   pub fn new<F>(filter: F) -> Self
   where
      F: AcceptFilter + Send + 'static,
   {
      let (command_tx, command_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
      tokio::spawn(ManagerActor::new(Box::new(filter), command_rx).run());
      Self { inbox: command_tx }
   }

   async fn request<T>(
      &self,
      make: impl FnOnce(oneshot::Sender<T>) -> ManagerCommand,
   ) -> Result<T> {
      let (tx, rx) = oneshot::channel();
      self
         .inbox
         .send(make(tx))
         .await
         .map_err(|_| BgConnError::ManagerShutdown)?;
      rx.await.map_err(|_| BgConnError::ManagerShutdown)
   }

   /// Registers `gatt_if`'s interest in `address`. `Ok(false)` means the
   /// accept list refused the device.
   pub async fn add_interest(&self, gatt_if: GattIf, address: Address) -> Result<bool> {
      self
         .request(|tx| ManagerCommand::AddInterest(gatt_if, address, tx))
         .await
   }

   pub async fn remove_interest(&self, gatt_if: GattIf, address: Address) -> Result<bool> {
      self
         .request(|tx| ManagerCommand::RemoveInterest(gatt_if, address, tx))
         .await
   }

   pub async fn is_interested(&self, gatt_if: GattIf, address: Address) -> Result<bool> {
      self
         .request(|tx| ManagerCommand::IsInterested(gatt_if, address, tx))
         .await
   }

   pub async fn deregister_app(&self, gatt_if: GattIf) -> Result<()> {
      self
         .request(|tx| ManagerCommand::DeregisterApp(gatt_if, tx))
         .await
   }

   pub async fn clear_device(&self, address: Address) -> Result<bool> {
      self
         .request(|tx| ManagerCommand::ClearDevice(address, tx))
         .await
   }

   pub async fn reset(&self, after_controller_reset: bool) -> Result<()> {
      self
         .request(|tx| ManagerCommand::Reset(after_controller_reset, tx))
         .await
   }

   /// Snapshot of all registered devices in insertion order.
   pub async fn devices(&self) -> Result<Vec<BgConnDevice>> {
      self.request(ManagerCommand::GetAllDevices).await
   }

   pub async fn count_devices(&self) -> u32 {
      self
         .request(ManagerCommand::CountDevices)
         .await
         .unwrap_or_default()
   }
}

// === Manager Actor ===

struct ManagerActor {
   command_rx: mpsc::Receiver<ManagerCommand>,
   registry: BgConnRegistry<BoxedFilter>,
}

impl ManagerActor {
   fn new(filter: BoxedFilter, command_rx: mpsc::Receiver<ManagerCommand>) -> Self {
      Self {
         command_rx,
         registry: BgConnRegistry::new(filter),
      }
   }

   async fn run(mut self) {
      info!("Background connection manager starting up");

      while let Some(cmd) = self.command_rx.recv().await {
         self.handle_command(cmd);
      }

      info!(
         "Background connection manager shutting down ({} devices registered)",
         self.registry.len()
      );
   }

   fn handle_command(&mut self, cmd: ManagerCommand) {
      match cmd {
         ManagerCommand::AddInterest(gatt_if, addr, reply) => {
            let _ = reply.send(self.registry.add(gatt_if, addr));
         },
         ManagerCommand::RemoveInterest(gatt_if, addr, reply) => {
            let _ = reply.send(self.registry.remove(gatt_if, addr));
         },
         ManagerCommand::IsInterested(gatt_if, addr, reply) => {
            let _ = reply.send(self.registry.is_interested(addr, gatt_if));
         },
         ManagerCommand::DeregisterApp(gatt_if, reply) => {
            debug!("Deregistering app {gatt_if}");
            self.registry.deregister(gatt_if);
            let _ = reply.send(());
         },
         ManagerCommand::ClearDevice(addr, reply) => {
            let _ = reply.send(self.registry.clear_for_address(addr));
         },
         ManagerCommand::Reset(after_controller_reset, reply) => {
            self.registry.reset(after_controller_reset);
            let _ = reply.send(());
         },
         ManagerCommand::GetAllDevices(reply) => {
            let devices = self.registry.iter().cloned().collect();
            let _ = reply.send(devices);
         },
         ManagerCommand::CountDevices(reply) => {
            let count = self.registry.len() as u32;
            let _ = reply.send(count);
         },
      }
   }
}

#[cfg(test)]
mod tests {
   use std::sync::Arc;

   use parking_lot::Mutex;

   use super::*;
   use crate::bluetooth::filter::AcceptList;

   const ADDR_X: Address = Address([0xC0, 0xFF, 0xEE, 0x00, 0x00, 0x01]);
   const ADDR_Y: Address = Address([0xC0, 0xFF, 0xEE, 0x00, 0x00, 0x02]);

   /// Accept list whose state stays observable after being moved into the
   /// actor.
   #[derive(Clone)]
   struct SharedList(Arc<Mutex<AcceptList>>);

   impl AcceptFilter for SharedList {
      fn add(&mut self, address: Address) -> bool {
         self.0.lock().add(address)
      }

      fn remove(&mut self, address: Address) {
         self.0.lock().remove(address);
      }

      fn clear(&mut self) {
         self.0.lock().clear();
      }
   }

   fn spawn_manager(capacity: usize) -> (BgConnManager, Arc<Mutex<AcceptList>>) {
      let list = Arc::new(Mutex::new(AcceptList::with_capacity(capacity)));
      let manager = BgConnManager::new(SharedList(list.clone()));
      (manager, list)
   }

   #[tokio::test]
   async fn test_add_and_remove_through_manager() -> Result<()> {
      let (manager, list) = spawn_manager(4);

      assert!(manager.add_interest(GattIf(1), ADDR_X).await?);
      assert!(manager.add_interest(GattIf(2), ADDR_X).await?);
      assert!(manager.is_interested(GattIf(2), ADDR_X).await?);
      assert!(list.lock().contains(ADDR_X));

      assert!(manager.remove_interest(GattIf(1), ADDR_X).await?);
      assert!(list.lock().contains(ADDR_X));
      assert!(manager.remove_interest(GattIf(2), ADDR_X).await?);
      assert!(!list.lock().contains(ADDR_X));
      assert_eq!(manager.count_devices().await, 0);

      Ok(())
   }

   #[tokio::test]
   async fn test_capacity_refusal() -> Result<()> {
      let (manager, list) = spawn_manager(1);

      assert!(manager.add_interest(GattIf(1), ADDR_X).await?);
      assert!(!manager.add_interest(GattIf(1), ADDR_Y).await?);
      assert!(!manager.is_interested(GattIf(1), ADDR_Y).await?);
      assert_eq!(list.lock().len(), 1);

      Ok(())
   }

   #[tokio::test]
   async fn test_deregister_and_snapshot() -> Result<()> {
      let (manager, list) = spawn_manager(4);

      manager.add_interest(GattIf(3), ADDR_X).await?;
      manager.add_interest(GattIf(3), ADDR_Y).await?;
      manager.add_interest(GattIf(4), ADDR_Y).await?;

      manager.deregister_app(GattIf(3)).await?;

      let devices = manager.devices().await?;
      assert_eq!(devices.len(), 1);
      assert_eq!(devices[0].address(), ADDR_Y);
      assert_eq!(devices[0].apps(), &[GattIf(4)]);
      assert!(!list.lock().contains(ADDR_X));

      assert!(manager.clear_device(ADDR_Y).await?);
      assert!(!manager.clear_device(ADDR_Y).await?);
      assert!(list.lock().is_empty());

      Ok(())
   }

   #[tokio::test]
   async fn test_reset() -> Result<()> {
      let (manager, list) = spawn_manager(4);

      manager.add_interest(GattIf(1), ADDR_X).await?;
      manager.reset(true).await?;
      assert_eq!(manager.count_devices().await, 0);
      // Controller already wiped its list, so our model keeps the stale entry
      assert!(list.lock().contains(ADDR_X));

      manager.add_interest(GattIf(1), ADDR_Y).await?;
      manager.reset(false).await?;
      assert!(list.lock().is_empty());

      Ok(())
   }

   /// Filter that takes the actor down on the first add.
   struct PanickingFilter;

   impl AcceptFilter for PanickingFilter {
      fn add(&mut self, address: Address) -> bool {
         panic!("controller rejected {address}");
      }

      fn remove(&mut self, _address: Address) {}

      fn clear(&mut self) {}
   }

   #[tokio::test]
   async fn test_requests_fail_after_actor_stops() {
      let manager = BgConnManager::new(PanickingFilter);

      // The actor dies while handling this request, dropping its reply
      assert!(matches!(
         manager.add_interest(GattIf(1), ADDR_X).await,
         Err(BgConnError::ManagerShutdown)
      ));
      // Its inbox is gone as well
      assert!(matches!(
         manager.is_interested(GattIf(1), ADDR_X).await,
         Err(BgConnError::ManagerShutdown)
      ));
      assert_eq!(manager.count_devices().await, 0);
   }

   #[tokio::test]
   async fn test_concurrent_callers() -> Result<()> {
      let (manager, list) = spawn_manager(8);

      let mut handles = Vec::new();
      for app in 0..16u8 {
         let manager = manager.clone();
         handles.push(tokio::spawn(async move {
            manager.add_interest(GattIf(app), ADDR_X).await
         }));
      }
      for handle in handles {
         assert!(handle.await.expect("task panicked")?);
      }

      let devices = manager.devices().await?;
      assert_eq!(devices.len(), 1);
      assert_eq!(devices[0].apps().len(), 16);
      assert_eq!(list.lock().len(), 1);

      Ok(())
   }
}
