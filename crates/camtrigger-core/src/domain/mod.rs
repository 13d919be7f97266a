//! Domain entities for camtrigger.
//!
//! This module contains pure business logic with no infrastructure
//! dependencies: no sockets, no capture handles, no file I/O.
//!
//! The central concept is the [`device::DeviceRegistry`]: a static,
//! validated table of devices that are allowed to trigger an actuation.  It is
//! built once at process start and shared read-only for the lifetime of the
//! process.

/// Link-layer hardware addresses (the correlation key).
pub mod hardware_id;

/// Device profiles, the registry, and the matching policy.
pub mod device;

/// Transient per-packet capture records.
pub mod event;
