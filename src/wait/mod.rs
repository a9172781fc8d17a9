#[cfg(feature = "hardware-gpio")]
pub mod poll;
pub mod sim;

#[cfg(feature = "hardware-gpio")]
pub use poll::PollEdgeWait;
pub use sim::SimulatedEdgeWait;
