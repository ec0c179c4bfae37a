//! `armctl-hal` – motor sensor abstraction.
//!
//! There is no real motor bus; temperatures come from a [`TemperatureSensor`]
//! implementation. The telemetry sampler only ever talks to the trait, so a
//! simulated sensor and a scripted test sensor are interchangeable.
//!
//! # Modules
//!
//! - [`sensor`] – the [`TemperatureSensor`][sensor::TemperatureSensor] trait.
//! - [`sim`] – [`SimThermalSensor`][sim::SimThermalSensor] (uniform random
//!   temperatures) and [`ScriptedSensor`][sim::ScriptedSensor] (replays fixed
//!   readings for deterministic tests).

pub mod sensor;
pub mod sim;

pub use sensor::TemperatureSensor;
pub use sim::{ScriptedSensor, SimThermalSensor};
