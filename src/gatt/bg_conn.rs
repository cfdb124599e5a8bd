//! Background connection registry.
//!
//! Tracks which registered GATT applications want a background connection
//! to which remote devices, and keeps the controller accept list holding
//! exactly the addresses that at least one application is interested in.

use bluer::Address;
use log::{debug, warn};
use smallvec::SmallVec;

use crate::{bluetooth::filter::AcceptFilter, gatt::GattIf};

/// Interest sets are tiny in practice; keep them inline.
type InterestSet = SmallVec<[GattIf; 4]>;

/// A remote device with at least one interested application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BgConnDevice {
   address: Address,
   gatt_if: InterestSet,
}

impl BgConnDevice {
   fn new(address: Address, gatt_if: GattIf) -> Self {
      let mut apps = InterestSet::new();
      apps.push(gatt_if);
      Self {
         address,
         gatt_if: apps,
      }
   }

   pub const fn address(&self) -> Address {
      self.address
   }

   /// Returns true if `gatt_if` is one of the applications interested in
   /// this device.
   pub fn is_interested(&self, gatt_if: GattIf) -> bool {
      self.gatt_if.contains(&gatt_if)
   }

   pub fn apps(&self) -> &[GattIf] {
      &self.gatt_if
   }

   /// Inserts `gatt_if`, returning false if it was already present.
   fn insert(&mut self, gatt_if: GattIf) -> bool {
      if self.is_interested(gatt_if) {
         return false;
      }
      self.gatt_if.push(gatt_if);
      true
   }

   /// Erases `gatt_if`, returning false if it was not present.
   fn erase(&mut self, gatt_if: GattIf) -> bool {
      match self.gatt_if.iter().position(|&g| g == gatt_if) {
         Some(idx) => {
            self.gatt_if.swap_remove(idx);
            true
         },
         None => false,
      }
   }
}

/// Registry of background connection interests, synchronized with an
/// [`AcceptFilter`].
///
/// A device record exists exactly while its interest set is non-empty, and
/// every record corresponds to an address the filter has accepted. The only
/// exception is [`reset`](Self::reset), which drops records and filter
/// entries through separate paths.
///
/// The registry is not internally synchronized. Share it through
/// [`BgConnManager`](crate::bluetooth::manager::BgConnManager) when more than
/// one task needs access.
#[derive(Debug)]
pub struct BgConnRegistry<F> {
   devices: Vec<BgConnDevice>,
   filter: F,
}

impl<F: AcceptFilter> BgConnRegistry<F> {
   pub const fn new(filter: F) -> Self {
      Self {
         devices: Vec::new(),
         filter,
      }
   }

   /// Returns true if `gatt_if` wants a background connection to `address`.
   pub fn is_interested(&self, address: Address, gatt_if: GattIf) -> bool {
      self
         .find(address)
         .is_some_and(|dev| dev.is_interested(gatt_if))
   }

   pub fn find(&self, address: Address) -> Option<&BgConnDevice> {
      self.devices.iter().find(|dev| dev.address == address)
   }

   fn find_mut(&mut self, address: Address) -> Option<&mut BgConnDevice> {
      self.devices.iter_mut().find(|dev| dev.address == address)
   }

   /// Position of the record for `address` in insertion order.
   pub fn position(&self, address: Address) -> Option<usize> {
      self.devices.iter().position(|dev| dev.address == address)
   }

   /// Registers interest of `gatt_if` in `address`.
   ///
   /// Returns false only if the address was new and the filter refused it,
   /// in which case nothing is recorded. Registering twice is not an error.
   pub fn add(&mut self, gatt_if: GattIf, address: Address) -> bool {
      if let Some(dev) = self.find_mut(address) {
         if !dev.insert(gatt_if) {
            warn!("{address} already in accept list for app {gatt_if}");
         }
         return true;
      }

      if !self.filter.add(address) {
         warn!("Accept list refused {address} for app {gatt_if}");
         return false;
      }

      debug!("Background connection to {address} added for app {gatt_if}");
      self.devices.push(BgConnDevice::new(address, gatt_if));
      true
   }

   /// Drops interest of `gatt_if` in `address`.
   ///
   /// Returns true if an interest was removed. The address leaves the filter
   /// once no application remains interested.
   pub fn remove(&mut self, gatt_if: GattIf, address: Address) -> bool {
      let Some(idx) = self.position(address) else {
         return false;
      };

      if !self.devices[idx].erase(gatt_if) {
         return false;
      }

      if self.devices[idx].gatt_if.is_empty() {
         debug!("No apps left for {address}, removing from accept list");
         self.filter.remove(address);
         self.devices.remove(idx);
      }
      true
   }

   /// Drops every application's interest in `address`. Returns true if the
   /// device was registered.
   pub fn clear_for_address(&mut self, address: Address) -> bool {
      let Some(idx) = self.position(address) else {
         return false;
      };

      self.filter.remove(address);
      self.devices.remove(idx);
      true
   }

   /// Drops every interest held by `gatt_if`, e.g. when the application
   /// unregisters.
   pub fn deregister(&mut self, gatt_if: GattIf) {
      let filter = &mut self.filter;
      self.devices.retain_mut(|dev| {
         dev.erase(gatt_if);
         if !dev.gatt_if.is_empty() {
            return true;
         }
         debug!(
            "App {gatt_if} was last interested in {}, removing from accept list",
            dev.address
         );
         filter.remove(dev.address);
         false
      });
   }

   /// Forgets every record without touching individual filter entries.
   ///
   /// Pass `after_controller_reset = true` when the controller has just been
   /// reset: its accept list is already empty and is left alone.
   pub fn reset(&mut self, after_controller_reset: bool) {
      debug!(
         "Resetting background connection list ({} devices)",
         self.devices.len()
      );
      self.devices.clear();
      if !after_controller_reset {
         self.filter.clear();
      }
   }

   pub const fn len(&self) -> usize {
      self.devices.len()
   }

   pub const fn is_empty(&self) -> bool {
      self.devices.is_empty()
   }

   pub fn iter(&self) -> impl ExactSizeIterator<Item = &BgConnDevice> + '_ {
      self.devices.iter()
   }

   pub const fn filter(&self) -> &F {
      &self.filter
   }

   pub fn into_filter(self) -> F {
      self.filter
   }
}
