//! Periodic occupancy report.
//!
//! Every period the monitor takes a [`Snapshot`] under the carpark lock and hands it
//! to a [`ReportSink`]. A nonzero delta means producers and consumers disagree about
//! how many cars are inside, which can only happen if the locking is broken.

use std::io::{Stdout, Write};
use std::sync::Arc;
use std::time::Duration;
use log::*;
use parking_lot::Mutex;
use crate::liveliness::Liveliness;
use crate::slot_buffer::{Snapshot, SlotBuffer};

/// Destination for monitor observations.
pub trait ReportSink: Send {
    fn report(&mut self, snapshot: &Snapshot);
}

/// Writes the two classic report lines, to stdout unless another writer is given.
pub struct ConsoleSink<W: Write + Send = Stdout> {
    out: W,
}

impl ConsoleSink<Stdout> {
    pub fn stdout() -> Self {
        ConsoleSink { out: std::io::stdout() }
    }
}

impl Default for ConsoleSink<Stdout> {
    fn default() -> Self {
        ConsoleSink::stdout()
    }
}

impl<W: Write + Send> ConsoleSink<W> {
    pub fn with_writer(out: W) -> Self {
        ConsoleSink { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> ReportSink for ConsoleSink<W> {
    fn report(&mut self, snapshot: &Snapshot) {
        let out = &mut self.out;
        if let Err(e) = writeln!(out, "Delta: {}", snapshot.delta)
            .and_then(|_| writeln!(out, "Number of cars in carpark: {}", snapshot.occupied))
            .and_then(|_| out.flush()) {
            warn!("unable to write occupancy report: {}", e);
        }
    }
}

/// Keeps every observation, clones share the same history.
#[derive(Clone, Default)]
pub struct RecordingSink {
    observed: Arc<Mutex<Vec<Snapshot>>>,
}

impl RecordingSink {
    pub fn observations(&self) -> Vec<Snapshot> {
        self.observed.lock().clone()
    }
}

impl ReportSink for RecordingSink {
    fn report(&mut self, snapshot: &Snapshot) {
        self.observed.lock().push(*snapshot);
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MonitorSummary {
    pub observations: u64,
    /// Observations with a nonzero delta.
    pub defects: u64,
}

pub fn run(buffer: Arc<SlotBuffer>
          , liveliness: Arc<Liveliness>
          , period: Duration
          , mut sink: Box<dyn ReportSink>) -> MonitorSummary {
    let mut summary = MonitorSummary::default();
    while liveliness.sleep(period) {
        iterate_once(&mut summary, &buffer, sink.as_mut());
    }
    debug!("monitor stopping after {} observations", summary.observations);
    summary
}

fn iterate_once(summary: &mut MonitorSummary
               , buffer: &SlotBuffer
               , sink: &mut dyn ReportSink) -> Snapshot {
    let snapshot = buffer.snapshot();
    summary.observations += 1;
    if snapshot.delta != 0 {
        summary.defects += 1;
        error!("synchronization defect, delta {} in {:?}", snapshot.delta, snapshot);
    }
    sink.report(&snapshot);
    snapshot
}
