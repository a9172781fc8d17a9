use std::fs::File;
use std::sync::Arc;

use parking_lot::{FairMutex, Mutex};
use rustc_hash::FxHashMap;

use crate::error::PinError;

/// Shared handle to a pin's open value file. The fair mutex keeps foreground
/// reads/writes from being starved while an edge monitor holds the handle
/// across its bounded wait.
pub type ValueHandle = Arc<FairMutex<File>>;

/// Process-wide table mapping pin number to its open value handle. A handle
/// is present iff the pin is currently exported; the registry is the single
/// source of truth for that state and the sole owner of every handle.
#[derive(Default)]
pub struct PinRegistry {
    pins: Mutex<FxHashMap<u32, ValueHandle>>, // keyed by pin number
}

impl PinRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_exported(&self, pin: u32, value: File) -> Result<ValueHandle, PinError> {
        let mut pins = self.pins.lock();
        if pins.contains_key(&pin) {
            return Err(PinError::AlreadyExported(pin));
        }
        let handle: ValueHandle = Arc::new(FairMutex::new(value));
        pins.insert(pin, handle.clone());
        Ok(handle)
    }

    pub fn handle_for(&self, pin: u32) -> Option<ValueHandle> {
        self.pins.lock().get(&pin).cloned()
    }

    /// Removes the entry and hands the handle back so the caller decides when
    /// it is closed.
    pub fn record_unexported(&self, pin: u32) -> Result<ValueHandle, PinError> {
        self.pins
            .lock()
            .remove(&pin)
            .ok_or(PinError::NotExported(pin))
    }

    pub fn is_exported(&self, pin: u32) -> bool {
        self.pins.lock().contains_key(&pin)
    }

    pub fn exported_pins(&self) -> Vec<u32> {
        let mut pins: Vec<u32> = self.pins.lock().keys().copied().collect();
        pins.sort_unstable();
        pins
    }
}
