//! Controller accept list ("white list") abstraction.
//!
//! The registry never talks to the controller directly; it drives an
//! [`AcceptFilter`] whenever an address gains its first interested
//! application or loses its last one.

use bluer::Address;
use log::{debug, warn};

/// Controller-side address filter used for background connections.
pub trait AcceptFilter {
   /// Adds `address` to the filter. Returns `false` if the controller has no
   /// room left or refused the entry.
   fn add(&mut self, address: Address) -> bool;

   /// Removes `address` from the filter. Best effort.
   fn remove(&mut self, address: Address);

   /// Empties the whole filter.
   fn clear(&mut self);
}

impl<F: AcceptFilter + ?Sized> AcceptFilter for Box<F> {
   fn add(&mut self, address: Address) -> bool {
      (**self).add(address)
   }

   fn remove(&mut self, address: Address) {
      (**self).remove(address);
   }

   fn clear(&mut self) {
      (**self).clear();
   }
}

/// In-process model of a capacity-limited controller accept list.
#[derive(Debug, Clone)]
pub struct AcceptList {
   entries: Vec<Address>,
   capacity: usize,
}

impl AcceptList {
   pub fn with_capacity(capacity: usize) -> Self {
      Self {
         entries: Vec::with_capacity(capacity),
         capacity,
      }
   }

   pub fn contains(&self, address: Address) -> bool {
      self.entries.contains(&address)
   }

   pub const fn len(&self) -> usize {
      self.entries.len()
   }

   pub const fn is_empty(&self) -> bool {
      self.entries.is_empty()
   }

   pub const fn capacity(&self) -> usize {
      self.capacity
   }

   pub fn iter(&self) -> impl ExactSizeIterator<Item = Address> + '_ {
      self.entries.iter().copied()
   }
}

impl AcceptFilter for AcceptList {
   fn add(&mut self, address: Address) -> bool {
      if self.contains(address) {
         return true;
      }
      if self.entries.len() >= self.capacity {
         warn!(
            "Accept list full ({} entries), cannot add {address}",
            self.capacity
         );
         return false;
      }
      debug!("Accept list add: {address}");
      self.entries.push(address);
      true
   }

   fn remove(&mut self, address: Address) {
      if let Some(idx) = self.entries.iter().position(|&a| a == address) {
         debug!("Accept list remove: {address}");
         self.entries.swap_remove(idx);
      }
   }

   fn clear(&mut self) {
      debug!("Accept list clear ({} entries)", self.entries.len());
      self.entries.clear();
   }
}
