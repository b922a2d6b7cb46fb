//! Wires the carpark, the actors and the startup barrier together and owns their threads.
//!
//! The barrier is sized from the same `producers + consumers` values that drive the
//! spawn loops, so the participant count and the number of waiting threads always agree.
//! The monitor is not a participant, it starts reporting on its own schedule.

use std::sync::{Arc, Barrier};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use log::*;
use crate::actor::{car_arrival, car_departure, occupancy_monitor};
use crate::actor::occupancy_monitor::{MonitorSummary, ReportSink};
use crate::config::CarparkConfig;
use crate::error::{CarparkError, Result};
use crate::liveliness::{Liveliness, LivelinessState};
use crate::slot_buffer::{SlotBuffer, Snapshot};

/// Totals gathered once every actor has been joined.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GraphReport {
    /// Sum of the cars each arrival actor says it parked.
    pub parked: u64,
    /// Sum of the cars each departure actor says it released.
    pub released: u64,
    pub monitor: MonitorSummary,
    pub final_snapshot: Snapshot,
}

struct ActorThread<T> {
    name: String,
    handle: JoinHandle<T>,
}

pub struct CarparkGraph {
    config: CarparkConfig,
    buffer: Arc<SlotBuffer>,
    liveliness: Arc<Liveliness>,
    barrier: Arc<Barrier>,
    arrivals: Vec<ActorThread<u64>>,
    departures: Vec<ActorThread<u64>>,
    monitor: Option<ActorThread<MonitorSummary>>,
}

impl CarparkGraph {
    /// Allocates the carpark. No threads exist until [`CarparkGraph::start`].
    pub fn new(config: CarparkConfig) -> Result<CarparkGraph> {
        debug!("building graph from {:?}", config);
        let buffer = Arc::new(SlotBuffer::new(config.capacity)?);
        let barrier = Arc::new(Barrier::new(config.barrier_participants()));
        Ok(CarparkGraph {
            config,
            buffer,
            liveliness: Arc::new(Liveliness::new()),
            barrier,
            arrivals: Vec::new(),
            departures: Vec::new(),
            monitor: None,
        })
    }

    pub fn config(&self) -> &CarparkConfig {
        &self.config
    }

    pub fn buffer(&self) -> Arc<SlotBuffer> {
        self.buffer.clone()
    }

    pub fn liveliness(&self) -> Arc<Liveliness> {
        self.liveliness.clone()
    }

    /// Spawns every arrival and departure actor plus the monitor, then moves to `Running`.
    ///
    /// # Errors
    /// `Spawn` if the OS refuses a thread. Actors already spawned are left blocked at
    /// the barrier, the caller is expected to exit the process.
    pub fn start(&mut self, sink: Box<dyn ReportSink>) -> Result<()> {
        if LivelinessState::Building != self.liveliness.state() || self.monitor.is_some() {
            warn!("graph already started");
            return Ok(());
        }
        let pace = self.config.pace();

        for n in 0..self.config.producers {
            let name = format!("car-in-{}", n);
            let buffer = self.buffer.clone();
            let liveliness = self.liveliness.clone();
            let barrier = self.barrier.clone();
            let actor_name = name.clone();
            let handle = spawn_named(&name, move || {
                car_arrival::run(&actor_name, buffer, liveliness, barrier, pace)
            })?;
            self.arrivals.push(ActorThread { name, handle });
        }

        for n in 0..self.config.consumers {
            let name = format!("car-out-{}", n);
            let buffer = self.buffer.clone();
            let liveliness = self.liveliness.clone();
            let barrier = self.barrier.clone();
            let actor_name = name.clone();
            let handle = spawn_named(&name, move || {
                car_departure::run(&actor_name, buffer, liveliness, barrier, pace)
            })?;
            self.departures.push(ActorThread { name, handle });
        }

        {
            let name = String::from("monitor");
            let buffer = self.buffer.clone();
            let liveliness = self.liveliness.clone();
            let period = self.config.period;
            let handle = spawn_named(&name, move || {
                occupancy_monitor::run(buffer, liveliness, period, sink)
            })?;
            self.monitor = Some(ActorThread { name, handle });
        }

        self.liveliness.building_to_running();
        info!("carpark of {} slots running with {} arrival and {} departure actors"
              , self.config.capacity, self.config.producers, self.config.consumers);
        Ok(())
    }

    /// Asks every actor to stop and closes the carpark so blocked actors wake up.
    pub fn request_shutdown(&self) {
        self.liveliness.request_shutdown();
        self.buffer.close();
    }

    /// Waits until a stop has been requested, then joins all actors.
    ///
    /// `timeout` only bounds the join phase. A graph that is never asked to stop
    /// blocks here forever, which is the normal mode of the binary.
    ///
    /// # Errors
    /// `ShutdownTimeout` naming the actors still alive, or `ActorPanicked`.
    pub fn block_until_stopped(&mut self, timeout: Duration) -> Result<GraphReport> {
        self.liveliness.wait_until_stop_requested();
        // a stop requested through the liveliness handle alone still has to wake waiters
        self.buffer.close();

        let deadline = Instant::now().checked_add(timeout);
        let mut pending = self.unfinished();
        while !pending.is_empty() && deadline.map_or(true, |d| Instant::now() < d) {
            thread::sleep(Duration::from_millis(10));
            pending = self.unfinished();
        }
        if !pending.is_empty() {
            error!("actors still running after {:?}: {:?}", timeout, pending);
            return Err(CarparkError::ShutdownTimeout(pending));
        }

        // every actor is joined even after a panic, the first one is reported
        let mut panicked = None;
        let parked = join_all(&mut self.arrivals, &mut panicked);
        let released = join_all(&mut self.departures, &mut panicked);
        let monitor = match self.monitor.take() {
            Some(actor) => match actor.handle.join() {
                Ok(summary) => summary,
                Err(_) => {
                    error!("{} panicked", actor.name);
                    panicked.get_or_insert(actor.name);
                    MonitorSummary::default()
                }
            },
            None => MonitorSummary::default(),
        };

        self.liveliness.mark_stopped();
        if let Some(name) = panicked {
            return Err(CarparkError::ActorPanicked(name));
        }
        let final_snapshot = self.buffer.snapshot();
        info!("carpark stopped: {:?}", final_snapshot);
        Ok(GraphReport { parked, released, monitor, final_snapshot })
    }

    fn unfinished(&self) -> Vec<String> {
        let mut names: Vec<String> = self.arrivals.iter()
            .chain(self.departures.iter())
            .filter(|a| !a.handle.is_finished())
            .map(|a| a.name.clone())
            .collect();
        if let Some(monitor) = &self.monitor {
            if !monitor.handle.is_finished() {
                names.push(monitor.name.clone());
            }
        }
        names
    }
}

fn spawn_named<T, F>(name: &str, f: F) -> Result<JoinHandle<T>>
    where F: FnOnce() -> T + Send + 'static,
          T: Send + 'static {
    trace!("spawning {}", name);
    thread::Builder::new()
        .name(name.to_string())
        .spawn(f)
        .map_err(|source| CarparkError::Spawn { name: name.to_string(), source })
}

/// Joins and sums every actor, remembering the name of the first one that panicked.
fn join_all(actors: &mut Vec<ActorThread<u64>>, panicked: &mut Option<String>) -> u64 {
    let mut total = 0;
    for actor in actors.drain(..) {
        match actor.handle.join() {
            Ok(count) => total += count,
            Err(_) => {
                error!("{} panicked", actor.name);
                panicked.get_or_insert(actor.name);
            }
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::occupancy_monitor::RecordingSink;

    fn fast_config(capacity: usize, producers: usize, consumers: usize) -> CarparkConfig {
        CarparkConfig {
            capacity,
            producers,
            consumers,
            period: Duration::from_millis(20),
            max_delay: Duration::from_millis(5),
            value_range: 10,
        }
    }

    #[test]
    fn zero_capacity_graph_is_rejected() {
        assert!(matches!(CarparkGraph::new(fast_config(0, 2, 2))
                        , Err(CarparkError::InvalidCapacity(0))));
    }

    #[test]
    fn running_graph_keeps_delta_at_zero() {
        crate::util::util_tests::initialize_logger();

        let mut graph = CarparkGraph::new(fast_config(3, 2, 2)).expect("valid config");
        let sink = RecordingSink::default();
        graph.start(Box::new(sink.clone())).expect("threads spawn");
        assert_eq!(graph.liveliness().state(), LivelinessState::Running);

        let liveliness = graph.liveliness();
        let buffer = graph.buffer();
        let started = Instant::now();
        while sink.observations().len() < 5 && started.elapsed() < Duration::from_secs(10) {
            let snap = buffer.snapshot();
            assert_eq!(snap.delta, 0);
            assert!(snap.occupied <= 3);
            assert!(snap.next_in < 3 && snap.next_out < 3);
            thread::sleep(Duration::from_millis(5));
        }
        assert!(liveliness.is_running());
        graph.request_shutdown();

        let report = graph.block_until_stopped(Duration::from_secs(5)).expect("clean stop");
        assert_eq!(graph.liveliness().state(), LivelinessState::Stopped);

        let observed = sink.observations();
        assert!(observed.len() >= 5);
        assert!(observed.iter().all(|s| s.delta == 0));
        assert!(observed.iter().all(|s| s.occupied <= 3));
        assert_eq!(report.monitor.defects, 0);
        assert_eq!(report.monitor.observations as usize, observed.len());

        let last = report.final_snapshot;
        assert_eq!(last.delta, 0);
        assert_eq!(report.parked, last.cars_in);
        assert_eq!(report.released, last.cars_out);
        assert_eq!(last.cars_in, last.cars_out + last.occupied as u64);
        assert!(last.cars_in > 0);
    }

    #[test]
    fn more_producers_than_consumers_stops_cleanly() {
        let mut graph = CarparkGraph::new(fast_config(2, 3, 1)).expect("valid config");
        graph.start(Box::new(RecordingSink::default())).expect("threads spawn");
        thread::sleep(Duration::from_millis(100));
        graph.request_shutdown();
        let report = graph.block_until_stopped(Duration::from_secs(5)).expect("clean stop");
        assert_eq!(report.final_snapshot.delta, 0);
        assert!(report.final_snapshot.occupied <= 2);
    }

    struct FailingSink;

    impl ReportSink for FailingSink {
        fn report(&mut self, _snapshot: &Snapshot) {
            panic!("sink failure");
        }
    }

    #[test]
    fn monitor_panic_still_joins_every_actor() {
        let mut graph = CarparkGraph::new(fast_config(2, 2, 2)).expect("valid config");
        graph.start(Box::new(FailingSink)).expect("threads spawn");

        let started = Instant::now();
        while graph.monitor.as_ref().map_or(false, |m| !m.handle.is_finished())
              && started.elapsed() < Duration::from_secs(10) {
            thread::sleep(Duration::from_millis(5));
        }
        graph.request_shutdown();

        let result = graph.block_until_stopped(Duration::from_secs(5));
        assert!(matches!(result, Err(CarparkError::ActorPanicked(ref name)) if name == "monitor"));
        assert_eq!(graph.liveliness().state(), LivelinessState::Stopped);
        assert!(graph.arrivals.is_empty());
        assert!(graph.departures.is_empty());
        assert!(graph.monitor.is_none());
        assert_eq!(graph.buffer().snapshot().delta, 0);
    }

    #[test]
    fn stop_through_liveliness_handle_wakes_blocked_actors() {
        // long delays and a single slot, so actors are either sleeping or blocked
        let mut config = fast_config(1, 2, 2);
        config.max_delay = Duration::from_secs(30);
        config.period = Duration::from_secs(30);
        let mut graph = CarparkGraph::new(config).expect("valid config");
        graph.start(Box::new(RecordingSink::default())).expect("threads spawn");

        let liveliness = graph.liveliness();
        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            liveliness.request_shutdown();
        });
        let started = Instant::now();
        let report = graph.block_until_stopped(Duration::from_secs(5)).expect("clean stop");
        stopper.join().expect("stopper panicked");

        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(report.final_snapshot.delta, 0);
        assert_eq!(report.monitor.observations, 0);
    }
}
