//! A fixed capacity carpark shared by concurrent arrival (producer) and departure
//! (consumer) threads.
//!
//! The heart of the crate is [`SlotBuffer`], a circular buffer behind one mutex with a
//! "space" and a "car" condition variable. [`CarparkGraph`] spawns the actors, lines
//! them up on a startup barrier and watches the occupancy invariant
//! `cars_in - cars_out - occupied == 0` through a periodic monitor.

pub mod actor {
    pub mod car_arrival;
    pub mod car_departure;
    pub mod occupancy_monitor;
}

pub mod args;
pub mod config;
pub mod error;
pub mod graph;
pub mod liveliness;
pub mod slot_buffer;
pub(crate) mod util;

pub use actor::occupancy_monitor::{ConsoleSink, MonitorSummary, RecordingSink, ReportSink};
pub use args::Args;
pub use config::CarparkConfig;
pub use error::{CarparkError, Result};
pub use graph::{CarparkGraph, GraphReport};
pub use liveliness::{Liveliness, LivelinessState};
pub use slot_buffer::{SlotBuffer, Snapshot};

/// Initialize logging for the carpark crate.
/// This is a convenience function that should be called at the beginning of main.
pub fn init_logging(loglevel: &str) -> std::result::Result<(), Box<dyn std::error::Error>> {
    util::carpark_logging_init(loglevel)
}
