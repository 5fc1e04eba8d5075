//! host-side driver for the SPMI bus controller and the USB-C port
//! controller (HPM) that sits behind it
//!
//! [`SpmiController`] turns commands into FIFO frames and validates the
//! replies, [`HpmDevice`] builds the chip's register model on top of it.

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod discovery;
mod error;
pub mod hpm;
mod poll;
pub mod spmi;

#[cfg(test)]
mod sim;

pub use config::{HpmConfig, SpmiConfig};
pub use discovery::{enumerate, DiscoveredDevice, HardwareNode};
pub use error::Error;
pub use hpm::{EventSet, HpmDevice, IrqState};
pub use poll::poll_until;
pub use spmi::{bus::RegisterBus, Reply, SpmiController};
