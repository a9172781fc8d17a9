use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::{info, warn};
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;

use crate::gpio::{EdgeEvent, EdgeWait, EventHandler, LogicLevel};
use crate::registry::PinRegistry;

const EDGE_WAIT_TIMEOUT: Duration = Duration::from_millis(10);

pub type InterruptCallback = Box<dyn Fn() + Send + Sync>;

type CallbackSlot = Arc<RwLock<InterruptCallback>>;

pub(crate) struct InterruptController {
    registry: Arc<PinRegistry>,
    waiter: Arc<dyn EdgeWait>,
    events: EventHandler,
    debounce: Duration,
    bindings: Mutex<FxHashMap<u32, InterruptBinding>>, // at most one per pin
}

struct InterruptBinding {
    callback: CallbackSlot,
    monitor: EdgeMonitor,
}

impl InterruptController {
    pub(crate) fn new(
        registry: Arc<PinRegistry>,
        waiter: Arc<dyn EdgeWait>,
        events: EventHandler,
        debounce: Duration,
    ) -> Self {
        Self {
            registry,
            waiter,
            events,
            debounce,
            bindings: Mutex::new(FxHashMap::default()),
        }
    }

    pub(crate) fn bind(&self, pin: u32, callback: InterruptCallback) {
        let mut bindings = self.bindings.lock();

        if let Some(binding) = bindings.get(&pin) {
            if binding.monitor.is_running() {
                // The running monitor picks the new callback up on its next
                // edge; the monitor itself is never recreated.
                *binding.callback.write() = callback;
                info!("replaced interrupt callback for pin {pin}");
                return;
            }
        }

        let slot: CallbackSlot = Arc::new(RwLock::new(callback));
        let monitor = EdgeMonitor::spawn(
            pin,
            self.registry.clone(),
            self.waiter.clone(),
            slot.clone(),
            self.events.clone(),
            self.debounce,
        );
        bindings.insert(pin, InterruptBinding {
            callback: slot,
            monitor,
        });
    }

    pub(crate) fn unbind(&self, pin: u32) {
        // Dropping the binding joins the monitor thread.
        self.bindings.lock().remove(&pin);
    }
}

struct EdgeMonitor {
    cancel: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl EdgeMonitor {
    fn spawn(
        pin: u32,
        registry: Arc<PinRegistry>,
        waiter: Arc<dyn EdgeWait>,
        callback: CallbackSlot,
        events: EventHandler,
        debounce: Duration,
    ) -> Self {
        let cancel = Arc::new(AtomicBool::new(false));
        let cancel_flag = cancel.clone();

        let handle = std::thread::spawn(move || {
            info!("edge monitor started for pin {pin}");

            while !cancel_flag.load(Ordering::Relaxed) {
                let Some(handle) = registry.handle_for(pin) else {
                    info!("pin {pin} no longer exported, stopping edge monitor");
                    break;
                };

                let ready = {
                    let value = handle.lock();
                    waiter.wait_edge(pin, &value, EDGE_WAIT_TIMEOUT)
                };

                match ready {
                    Ok(false) => continue,
                    Ok(true) => {
                        let level = {
                            let mut value = handle.lock();
                            clear_pending(pin, &mut value)
                        };
                        (*callback.read())();
                        events.dispatch(EdgeEvent {
                            pin,
                            level,
                            timestamp_ms: epoch_millis(),
                        });
                        std::thread::sleep(debounce);
                    }
                    Err(e) => {
                        warn!("edge wait failed for pin {pin}, stopping monitor: {e}");
                        break;
                    }
                }
            }
        });

        Self {
            cancel,
            handle: Some(handle),
        }
    }

    fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for EdgeMonitor {
    fn drop(&mut self) {
        self.cancel.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Consumes the pending notification and rewinds the handle so the next
/// foreground read starts at offset 0.
fn clear_pending(pin: u32, value: &mut File) -> Option<LogicLevel> {
    if let Err(e) = value.seek(SeekFrom::Start(0)) {
        warn!("seek on pin {pin} value file failed: {e}");
        return None;
    }

    let mut byte = [0u8; 1];
    let level = match value.read(&mut byte) {
        Ok(1) => LogicLevel::from_ascii(byte[0]),
        Ok(_) => None,
        Err(e) => {
            warn!("clearing read on pin {pin} value file failed: {e}");
            None
        }
    };

    if let Err(e) = value.seek(SeekFrom::Start(0)) {
        warn!("seek on pin {pin} value file failed: {e}");
    }
    level
}

fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
