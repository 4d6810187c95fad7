//! Core solver for a multi-level nested shallow-water / tsunami
//! simulation: continuity and momentum finite-difference stepping on a
//! tree of cartesian or geographic grids, coupled by edge injection and
//! upscaled feedback (see each module for the governing equations).

pub mod boundary;
pub mod coeffs;
pub mod concurrency;
pub mod config;
pub mod error;
pub mod grid;
pub mod mass;
pub mod momentum;
pub mod nesting;
pub mod sampler;
pub mod simulation;
pub mod tracker;

pub use config::SimulationConfig;
pub use error::{NswingError, Result};
pub use simulation::{Level, Simulation};
