use std::sync::{Arc, Barrier};
use log::*;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use crate::config::ActorPace;
use crate::liveliness::Liveliness;
use crate::slot_buffer::SlotBuffer;

struct InternalState {
    rng: SmallRng,
    parked: u64,
}

/// Producer loop: waits at the barrier, then parks cars at random intervals until stopped.
/// Returns how many cars this actor parked.
pub fn run(name: &str
          , buffer: Arc<SlotBuffer>
          , liveliness: Arc<Liveliness>
          , barrier: Arc<Barrier>
          , pace: ActorPace) -> u64 {
    barrier.wait();
    debug!("{} released from startup barrier", name);

    // every actor owns its generator, nothing is shared between threads
    let mut state = InternalState { rng: SmallRng::from_entropy(), parked: 0 };
    while liveliness.is_running() {
        //single pass of work, do not loop in here
        if iterate_once(&mut state, &buffer, &liveliness, pace) {
            break;
        }
    }
    info!("{} stopping after parking {} cars", name, state.parked);
    state.parked
}

/// Returns true when the actor should exit.
fn iterate_once(state: &mut InternalState
               , buffer: &SlotBuffer
               , liveliness: &Liveliness
               , pace: ActorPace) -> bool {
    // the arrival pause happens outside the lock
    if !liveliness.sleep(pace.next_delay(&mut state.rng)) {
        return true;
    }
    let plate = pace.next_plate(&mut state.rng);
    match buffer.produce(plate) {
        Ok(()) => {
            state.parked += 1;
            trace!("parked car {}", plate);
            false
        }
        Err(e) => {
            if !e.is_closed() {
                error!("Unexpected error parking car: {}", e);
            }
            true
        }
    }
}
