use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use log::info;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::config::GpioConfig;
use crate::error::PinError;
use crate::interrupt::{InterruptCallback, InterruptController};
use crate::registry::PinRegistry;
use crate::sysfs::SysfsPaths;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    In,
    Out,
    Low,
    High,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::In => "in",
            Direction::Out => "out",
            Direction::Low => "low",
            Direction::High => "high",
        }
    }
}

impl FromStr for Direction {
    type Err = PinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in" => Ok(Direction::In),
            "out" => Ok(Direction::Out),
            "low" => Ok(Direction::Low),
            "high" => Ok(Direction::High),
            other => Err(PinError::InvalidDirection(other.to_string())),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Edge {
    None,
    Rising,
    Falling,
    Both,
}

impl Edge {
    pub fn as_str(&self) -> &'static str {
        match self {
            Edge::None => "none",
            Edge::Rising => "rising",
            Edge::Falling => "falling",
            Edge::Both => "both",
        }
    }

    /// Anything outside the known edge names collapses to `None` instead of
    /// being rejected.
    pub fn from_name(name: &str) -> Edge {
        match name {
            "rising" => Edge::Rising,
            "falling" => Edge::Falling,
            "both" => Edge::Both,
            _ => Edge::None,
        }
    }
}

impl Default for Edge {
    fn default() -> Self {
        Edge::None
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogicLevel {
    Zero,
    One,
}

impl LogicLevel {
    pub fn ascii(self) -> u8 {
        match self {
            LogicLevel::Zero => b'0',
            LogicLevel::One => b'1',
        }
    }

    pub fn from_ascii(byte: u8) -> Option<LogicLevel> {
        match byte {
            b'0' => Some(LogicLevel::Zero),
            b'1' => Some(LogicLevel::One),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EdgeEvent {
    pub pin: u32,
    /// Level observed by the clearing read, when it parsed.
    pub level: Option<LogicLevel>,
    pub timestamp_ms: u64,
}

pub struct EventCallbackHandler {
    event_tx: broadcast::Sender<EdgeEvent>,
    event_history: FxHashMap<u32, RwLock<VecDeque<EdgeEvent>>>,
    event_history_capacity: usize,
}

impl EventCallbackHandler {
    fn new(config: &GpioConfig) -> Self {
        let (event_tx, _) = broadcast::channel(config.broadcast_capacity);

        let mut event_history = FxHashMap::default();
        for pin in config.board.usable_pins() {
            event_history.insert(*pin, RwLock::new(VecDeque::new()));
        }

        Self {
            event_tx,
            event_history,
            event_history_capacity: config.event_history_capacity,
        }
    }

    pub fn dispatch(&self, event: EdgeEvent) {
        {
            let event = event.clone();
            if let Some(history_lock) = self.event_history.get(&event.pin) {
                let mut history = history_lock.write();
                while history.len() >= self.event_history_capacity {
                    history.pop_front();
                }
                history.push_back(event);
            }
        }
        let _ = self.event_tx.send(event);
    }
}

pub type EventHandler = Arc<EventCallbackHandler>;

/// The one hardware-dependent primitive: block until an edge notification is
/// pending on the pin's value handle, or the timeout elapses. `Ok(true)`
/// means an edge is pending, `Ok(false)` means the wait timed out. An `Err`
/// is fatal for the calling monitor.
pub trait EdgeWait: Send + Sync {
    fn wait_edge(&self, pin: u32, value: &File, timeout: Duration) -> Result<bool, PinError>;
}

pub struct PinController {
    config: Arc<GpioConfig>,
    paths: SysfsPaths,
    registry: Arc<PinRegistry>,
    interrupts: InterruptController,
    event_handler: EventHandler,
}

impl PinController {
    pub fn new(
        config: Arc<GpioConfig>,
        registry: Arc<PinRegistry>,
        waiter: Arc<dyn EdgeWait>,
    ) -> Self {
        let paths = SysfsPaths::new(config.sysfs_root.clone());
        let event_handler: EventHandler = Arc::new(EventCallbackHandler::new(&config));
        let interrupts = InterruptController::new(
            registry.clone(),
            waiter,
            event_handler.clone(),
            config.debounce(),
        );

        Self {
            config,
            paths,
            registry,
            interrupts,
            event_handler,
        }
    }

    /// Default controller wired to the real `poll(2)` edge wait.
    #[cfg(feature = "hardware-gpio")]
    pub fn sysfs(config: Arc<GpioConfig>, registry: Arc<PinRegistry>) -> Self {
        Self::new(config, registry, Arc::new(crate::wait::PollEdgeWait))
    }

    fn ensure_valid(&self, pin: u32) -> Result<(), PinError> {
        if self.config.board.is_usable(pin) {
            Ok(())
        } else {
            Err(PinError::InvalidPin(pin))
        }
    }

    pub fn export(&self, pin: u32) -> Result<(), PinError> {
        self.ensure_valid(pin)?;
        if self.registry.is_exported(pin) {
            return Err(PinError::AlreadyExported(pin));
        }

        write_control(&self.paths.export(), &pin.to_string())?;

        let value_path = self.paths.value(pin);
        let value = File::options()
            .read(true)
            .write(true)
            .open(&value_path)
            .map_err(|e| PinError::Unreachable(value_path.display().to_string(), e))?;
        self.registry.record_exported(pin, value)?;

        info!("exported pin {pin}");
        Ok(())
    }

    pub fn unexport(&self, pin: u32) -> Result<(), PinError> {
        self.ensure_valid(pin)?;
        if !self.registry.is_exported(pin) {
            return Err(PinError::NotExported(pin));
        }

        write_control(&self.paths.unexport(), &pin.to_string())?;

        // Removing the entry is what tells the pin's monitor to stop; the
        // unbind below then joins it.
        let handle = self.registry.record_unexported(pin)?;
        drop(handle);
        self.interrupts.unbind(pin);

        info!("unexported pin {pin}");
        Ok(())
    }

    pub fn set_direction(&self, pin: u32, direction: Direction) -> Result<(), PinError> {
        self.ensure_valid(pin)?;
        if !self.registry.is_exported(pin) {
            return Err(PinError::NotExported(pin));
        }
        write_control(&self.paths.direction(pin), direction.as_str())
    }

    pub fn set_edge(&self, pin: u32, edge: Edge) -> Result<(), PinError> {
        self.ensure_valid(pin)?;
        if !self.registry.is_exported(pin) {
            return Err(PinError::NotExported(pin));
        }
        write_control(&self.paths.edge(pin), edge.as_str())
    }

    pub fn direction(&self, pin: u32) -> Result<Direction, PinError> {
        self.ensure_valid(pin)?;
        if !self.registry.is_exported(pin) {
            return Err(PinError::NotExported(pin));
        }
        let contents = read_control(&self.paths.direction(pin))?;
        contents.trim().parse()
    }

    pub fn edge(&self, pin: u32) -> Result<Edge, PinError> {
        self.ensure_valid(pin)?;
        if !self.registry.is_exported(pin) {
            return Err(PinError::NotExported(pin));
        }
        let contents = read_control(&self.paths.edge(pin))?;
        Ok(Edge::from_name(contents.trim()))
    }

    pub fn read(&self, pin: u32) -> Result<LogicLevel, PinError> {
        self.ensure_valid(pin)?;
        let handle = self
            .registry
            .handle_for(pin)
            .ok_or(PinError::NotExported(pin))?;
        let context = self.paths.value(pin).display().to_string();

        let mut value = handle.lock();
        value
            .seek(SeekFrom::Start(0))
            .map_err(|e| PinError::Io(context.clone(), e))?;
        let mut byte = [0u8; 1];
        let n = value
            .read(&mut byte)
            .map_err(|e| PinError::Io(context.clone(), e))?;
        if n != 1 {
            return Err(PinError::Io(
                context,
                io::Error::new(io::ErrorKind::UnexpectedEof, "empty value file"),
            ));
        }

        LogicLevel::from_ascii(byte[0]).ok_or_else(|| {
            PinError::Io(
                context,
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("unexpected value byte {:#04x}", byte[0]),
                ),
            )
        })
    }

    pub fn write(&self, pin: u32, level: LogicLevel) -> Result<(), PinError> {
        self.ensure_valid(pin)?;
        let handle = self
            .registry
            .handle_for(pin)
            .ok_or(PinError::NotExported(pin))?;
        let context = self.paths.value(pin).display().to_string();

        let mut value = handle.lock();
        value
            .seek(SeekFrom::Start(0))
            .map_err(|e| PinError::Io(context.clone(), e))?;
        let n = value
            .write(&[level.ascii()])
            .map_err(|e| PinError::Io(context.clone(), e))?;
        if n != 1 {
            return Err(PinError::Io(
                context,
                io::Error::new(io::ErrorKind::WriteZero, "short write to value file"),
            ));
        }
        Ok(())
    }

    /// Binds `callback` to the pin's edge notifications. A monitor is spawned
    /// the first time; re-binding an already-monitored pin swaps the callback
    /// the running monitor invokes.
    pub fn create_interrupt<F>(&self, pin: u32, callback: F) -> Result<(), PinError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.ensure_valid(pin)?;
        if !self.registry.is_exported(pin) {
            return Err(PinError::NotExported(pin));
        }
        let callback: InterruptCallback = Box::new(callback);
        self.interrupts.bind(pin, callback);
        Ok(())
    }

    pub fn is_exported(&self, pin: u32) -> bool {
        self.registry.is_exported(pin)
    }

    pub fn exported_pins(&self) -> Vec<u32> {
        self.registry.exported_pins()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<EdgeEvent> {
        self.event_handler.event_tx.subscribe()
    }

    pub fn events(&self, pin: u32, limit: Option<usize>) -> Result<Vec<EdgeEvent>, PinError> {
        self.ensure_valid(pin)?;
        let map = &self.event_handler.event_history;

        Ok(map
            .get(&pin)
            .map(|d| {
                let events: Vec<EdgeEvent> = if let Some(lim) = limit {
                    d.read().iter().rev().take(lim).cloned().collect()
                } else {
                    d.read().iter().cloned().collect()
                };
                events.into_iter().rev().collect()
            })
            .unwrap_or_default())
    }

    pub fn last_event(&self, pin: u32) -> Result<Option<EdgeEvent>, PinError> {
        self.ensure_valid(pin)?;
        let map = &self.event_handler.event_history;

        Ok(map.get(&pin).and_then(|d| d.read().back().cloned()))
    }
}

fn write_control(path: &std::path::Path, payload: &str) -> Result<(), PinError> {
    // No O_CREAT: a missing control file means the sysfs tree is not there.
    let mut file = File::options()
        .write(true)
        .truncate(true)
        .open(path)
        .map_err(|e| PinError::Unreachable(path.display().to_string(), e))?;
    let written = file
        .write(payload.as_bytes())
        .map_err(|e| PinError::Io(path.display().to_string(), e))?;
    if written != payload.len() {
        return Err(PinError::Io(
            path.display().to_string(),
            io::Error::new(
                io::ErrorKind::WriteZero,
                format!("short write: {written} of {} bytes", payload.len()),
            ),
        ));
    }
    Ok(())
}

fn read_control(path: &std::path::Path) -> Result<String, PinError> {
    let mut file = File::options()
        .read(true)
        .open(path)
        .map_err(|e| PinError::Unreachable(path.display().to_string(), e))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .map_err(|e| PinError::Io(path.display().to_string(), e))?;
    Ok(contents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_strings_round_trip() {
        for direction in [Direction::In, Direction::Out, Direction::Low, Direction::High] {
            assert_eq!(direction.as_str().parse::<Direction>().unwrap(), direction);
        }
        assert!(matches!(
            "sideways".parse::<Direction>(),
            Err(PinError::InvalidDirection(_))
        ));
    }

    #[test]
    fn unknown_edge_normalizes_to_none() {
        assert_eq!(Edge::from_name("rising"), Edge::Rising);
        assert_eq!(Edge::from_name("falling"), Edge::Falling);
        assert_eq!(Edge::from_name("both"), Edge::Both);
        assert_eq!(Edge::from_name("none"), Edge::None);
        assert_eq!(Edge::from_name("sideways"), Edge::None);
        assert_eq!(Edge::from_name(""), Edge::None);
    }

    #[test]
    fn logic_level_maps_ascii_digits() {
        assert_eq!(LogicLevel::Zero.ascii(), b'0');
        assert_eq!(LogicLevel::One.ascii(), b'1');
        assert_eq!(LogicLevel::from_ascii(b'0'), Some(LogicLevel::Zero));
        assert_eq!(LogicLevel::from_ascii(b'1'), Some(LogicLevel::One));
        assert_eq!(LogicLevel::from_ascii(b'x'), None);
    }
}
