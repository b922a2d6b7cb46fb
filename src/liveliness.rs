//! Lifecycle state shared by the graph and every actor.
//!
//! Actors poll [`Liveliness::is_running`] at the head of each loop and sleep through
//! [`Liveliness::sleep`], which returns early once a stop has been requested. Together
//! with closing the carpark this lets the whole graph stop in a bounded time.

use std::time::{Duration, Instant};
use log::*;
use parking_lot::{Condvar, Mutex};

/// Represents the state of the actor graph.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum LivelinessState {
    /// Threads are being spawned, nothing has been released from the barrier yet.
    Building,
    /// All actors are executing their loops.
    Running,
    /// A stop was requested, actors leave at their next loop head or wakeup.
    StopRequested,
    /// Every actor has been joined.
    Stopped,
}

pub struct Liveliness {
    state: Mutex<LivelinessState>,
    changed: Condvar,
}

impl Default for Liveliness {
    fn default() -> Self {
        Liveliness::new()
    }
}

impl Liveliness {
    pub fn new() -> Self {
        Liveliness {
            state: Mutex::new(LivelinessState::Building),
            changed: Condvar::new(),
        }
    }

    pub fn state(&self) -> LivelinessState {
        *self.state.lock()
    }

    pub fn building_to_running(&self) {
        let mut state = self.state.lock();
        if LivelinessState::Building == *state {
            *state = LivelinessState::Running;
            self.changed.notify_all();
        } else {
            error!("unexpected state {:?}", *state);
        }
    }

    /// Requests that all actors stop. Safe to call more than once and from any state
    /// before `Stopped`.
    pub fn request_shutdown(&self) {
        let mut state = self.state.lock();
        match *state {
            LivelinessState::Building | LivelinessState::Running => {
                trace!("stop requested from {:?}", *state);
                *state = LivelinessState::StopRequested;
                self.changed.notify_all();
            }
            LivelinessState::StopRequested | LivelinessState::Stopped => {}
        }
    }

    pub fn mark_stopped(&self) {
        let mut state = self.state.lock();
        *state = LivelinessState::Stopped;
        self.changed.notify_all();
    }

    /// True until a stop is requested. Actors that begin before `start` finishes
    /// moving the graph to `Running` are still considered live.
    pub fn is_running(&self) -> bool {
        matches!(*self.state.lock(), LivelinessState::Building | LivelinessState::Running)
    }

    pub fn is_stop_requested(&self) -> bool {
        !self.is_running()
    }

    /// Sleeps for `duration` unless a stop is requested first.
    /// Returns `true` if the full duration elapsed while still running.
    pub fn sleep(&self, duration: Duration) -> bool {
        // a duration past the end of the clock means wait until stopped
        let deadline = Instant::now().checked_add(duration);
        let mut state = self.state.lock();
        loop {
            if !matches!(*state, LivelinessState::Building | LivelinessState::Running) {
                return false;
            }
            match deadline {
                Some(deadline) => {
                    if self.changed.wait_until(&mut state, deadline).timed_out() {
                        return matches!(*state, LivelinessState::Building | LivelinessState::Running);
                    }
                }
                None => self.changed.wait(&mut state),
            }
        }
    }

    /// Blocks until a stop is requested or `timeout` elapses.
    /// Returns `true` if a stop was requested.
    pub fn wait_for_stop(&self, timeout: Duration) -> bool {
        !self.sleep(timeout)
    }

    /// Blocks with no time limit until some thread requests a stop.
    pub fn wait_until_stop_requested(&self) {
        let mut state = self.state.lock();
        while matches!(*state, LivelinessState::Building | LivelinessState::Running) {
            self.changed.wait(&mut state);
        }
    }
}
