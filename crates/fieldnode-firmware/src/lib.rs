//! ESP32-S3 firmware-specific modules for fieldnode
//!
//! This crate contains the hardware-specific half of the node: Wi-Fi and
//! network stack management, the HTTPS clients for the geolocation service
//! and the remote database, the button, GNSS and ADC drivers, and the
//! [`Platform`](fieldnode_core::scheduler::Platform) binding that hands all of
//! it to the core scheduler.

#![no_std]

extern crate alloc;

pub mod cloud;
pub mod hardware;
pub mod https;
pub mod inputs;
pub mod platform;
pub mod secrets;
pub mod wifi;
