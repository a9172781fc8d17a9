mod config;
mod error;
mod gpio;
mod interrupt;
mod registry;
mod sysfs;
mod wait;

pub use config::{BoardRevision, GpioConfig};
pub use error::PinError;
pub use gpio::{
    Direction, Edge, EdgeEvent, EdgeWait, EventCallbackHandler, EventHandler, LogicLevel,
    PinController,
};
pub use interrupt::InterruptCallback;
pub use registry::{PinRegistry, ValueHandle};
pub use sysfs::SysfsPaths;

#[cfg(feature = "hardware-gpio")]
pub use wait::PollEdgeWait;
pub use wait::SimulatedEdgeWait;
