//! Application layer use cases for the correlator.
//!
//! Use cases here orchestrate the domain (`camtrigger-core`) against the
//! abstractions in `infrastructure` ([`PacketSource`], [`Actuator`]) and never
//! touch a socket or a capture handle directly.
//!
//! - **`correlate`** – The observe → match → actuate loop.  Runs once per
//!   captured event, strictly in observation order.
//!
//! [`PacketSource`]: crate::infrastructure::capture::PacketSource
//! [`Actuator`]: crate::infrastructure::actuation::Actuator

pub mod correlate;
