use std::fs::File;
use std::io;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::PinError;
use crate::gpio::EdgeWait;

/// Test stand-in for the `poll(2)` wait: edges are injected with
/// `trigger_edge` and consumed one per wait, and `fail_next` makes the next
/// wait on a pin report a fatal error.
#[derive(Default)]
pub struct SimulatedEdgeWait {
    state: Mutex<SimState>,
    cond: Condvar,
}

#[derive(Default)]
struct SimState {
    pending: FxHashMap<u32, usize>,
    failing: FxHashSet<u32>,
}

impl SimulatedEdgeWait {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger_edge(&self, pin: u32) {
        let mut state = self.state.lock();
        *state.pending.entry(pin).or_insert(0) += 1;
        self.cond.notify_all();
    }

    pub fn fail_next(&self, pin: u32) {
        let mut state = self.state.lock();
        state.failing.insert(pin);
        self.cond.notify_all();
    }
}

impl EdgeWait for SimulatedEdgeWait {
    fn wait_edge(&self, pin: u32, _value: &File, timeout: Duration) -> Result<bool, PinError> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();

        loop {
            if state.failing.remove(&pin) {
                return Err(PinError::Io(
                    format!("edge wait on pin {pin}"),
                    io::Error::other("injected wait failure"),
                ));
            }
            if let Some(count) = state.pending.get_mut(&pin) {
                if *count > 0 {
                    *count -= 1;
                    return Ok(true);
                }
            }
            if self.cond.wait_until(&mut state, deadline).timed_out() {
                return Ok(false);
            }
        }
    }
}
