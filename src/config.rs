use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::PinError;

const REV1_PINS: [u32; 17] = [0, 1, 4, 7, 8, 9, 10, 11, 14, 15, 17, 18, 21, 22, 23, 24, 25];
const REV2_PINS: [u32; 17] = [2, 3, 4, 7, 8, 9, 10, 11, 14, 15, 17, 18, 22, 23, 24, 25, 27];

/// Raspberry Pi board revision, which fixes the set of usable GPIO numbers.
#[derive(Debug, Hash, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum BoardRevision {
    Rev1,
    Rev2,
}

impl BoardRevision {
    pub fn usable_pins(&self) -> &'static [u32] {
        match self {
            BoardRevision::Rev1 => &REV1_PINS,
            BoardRevision::Rev2 => &REV2_PINS,
        }
    }

    pub fn is_usable(&self, pin: u32) -> bool {
        self.usable_pins().contains(&pin)
    }
}

impl Default for BoardRevision {
    fn default() -> Self {
        BoardRevision::Rev2
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GpioConfig {
    #[serde(default = "default_sysfs_root")]
    pub sysfs_root: PathBuf,
    #[serde(default)]
    pub board: BoardRevision,
    /// Pause after each delivered edge, to swallow contact bounce.
    #[serde(default = "default_debounce_us")]
    pub debounce_us: u64,
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,
    #[serde(default = "default_event_history_capacity")]
    pub event_history_capacity: usize,
}

fn default_sysfs_root() -> PathBuf {
    PathBuf::from("/sys/class/gpio")
}

fn default_debounce_us() -> u64 {
    200
}

fn default_broadcast_capacity() -> usize {
    64
}

fn default_event_history_capacity() -> usize {
    32
}

impl Default for GpioConfig {
    fn default() -> Self {
        Self {
            sysfs_root: default_sysfs_root(),
            board: BoardRevision::default(),
            debounce_us: default_debounce_us(),
            broadcast_capacity: default_broadcast_capacity(),
            event_history_capacity: default_event_history_capacity(),
        }
    }
}

impl GpioConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, PinError> {
        let contents = fs::read_to_string(&path)
            .map_err(|e| PinError::Config(format!("Failed to read config: {e}")))?;
        serde_json::from_str(&contents)
            .map_err(|e| PinError::Config(format!("Invalid config json: {e}")))
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_micros(self.debounce_us)
    }
}
