//! Hardware-independent core library for fieldnode
//!
//! This crate contains all platform-agnostic logic for the fieldnode telemetry
//! node: the debounced occupancy counter, location resolution, remote counter
//! reconciliation, the sample logger and the cooperative scheduler that ties
//! them together. Every peripheral is reached through a trait so the same code
//! drives the ESP32-S3 firmware and the desktop simulator.
//!
//! It is `#![no_std]` with `extern crate alloc` so it compiles on both
//! embedded targets (ESP32-S3) and desktop hosts (for the simulator and tests).

#![no_std]

extern crate alloc;

pub mod config;
pub mod counter;
pub mod deadline;
pub mod gnss;
pub mod link;
pub mod location;
pub mod metrics;
pub mod remote;
pub mod scheduler;
pub mod sensors;
pub mod status;
pub mod storage;
pub mod timestamp;

#[cfg(test)]
pub(crate) mod testing;
