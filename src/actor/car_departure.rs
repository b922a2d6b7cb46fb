use std::sync::{Arc, Barrier};
use log::*;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use crate::config::ActorPace;
use crate::liveliness::Liveliness;
use crate::slot_buffer::SlotBuffer;

struct InternalState {
    rng: SmallRng,
    released: u64,
    last_plate: Option<i32>,
}

/// Consumer loop, the mirror image of the arrival actor.
/// Returns how many cars this actor let out.
pub fn run(name: &str
          , buffer: Arc<SlotBuffer>
          , liveliness: Arc<Liveliness>
          , barrier: Arc<Barrier>
          , pace: ActorPace) -> u64 {
    barrier.wait();
    debug!("{} released from startup barrier", name);

    let mut state = InternalState { rng: SmallRng::from_entropy(), released: 0, last_plate: None };
    while liveliness.is_running() {
        if iterate_once(&mut state, &buffer, &liveliness, pace) {
            break;
        }
    }
    info!("{} stopping after releasing {} cars", name, state.released);
    state.released
}

fn iterate_once(state: &mut InternalState
               , buffer: &SlotBuffer
               , liveliness: &Liveliness
               , pace: ActorPace) -> bool {
    if !liveliness.sleep(pace.next_delay(&mut state.rng)) {
        return true;
    }
    match buffer.consume() {
        Ok(plate) => {
            state.released += 1;
            state.last_plate = Some(plate);
            trace!("released car {}", plate);
            false
        }
        Err(e) => {
            if !e.is_closed() {
                error!("Unexpected error releasing car: {}", e);
            }
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    fn quick_pace() -> ActorPace {
        ActorPace { max_delay: Duration::ZERO, value_range: 10 }
    }

    #[test]
    fn iterate_once_releases_oldest_car() {
        crate::util::util_tests::initialize_logger();

        let buffer = SlotBuffer::new(2).expect("valid capacity");
        buffer.produce(4).expect("open");
        buffer.produce(9).expect("open");
        let liveliness = Liveliness::new();
        let mut state = InternalState { rng: SmallRng::seed_from_u64(1), released: 0, last_plate: None };

        assert!(!iterate_once(&mut state, &buffer, &liveliness, quick_pace()));
        assert_eq!(state.last_plate, Some(4));
        assert!(!iterate_once(&mut state, &buffer, &liveliness, quick_pace()));
        assert_eq!(state.last_plate, Some(9));
        assert_eq!(state.released, 2);

        let snap = buffer.snapshot();
        assert_eq!(snap.occupied, 0);
        assert_eq!(snap.cars_out, 2);
        assert_eq!(snap.delta, 0);
    }

    #[test]
    fn blocked_departure_is_released_by_close() {
        let buffer = Arc::new(SlotBuffer::new(1).expect("valid capacity"));
        let liveliness = Arc::new(Liveliness::new());
        let barrier = Arc::new(Barrier::new(1));

        let handle = {
            let buffer = buffer.clone();
            let liveliness = liveliness.clone();
            thread::spawn(move || run("car-out-test", buffer, liveliness, barrier, quick_pace()))
        };
        thread::sleep(Duration::from_millis(50));
        liveliness.request_shutdown();
        buffer.close();

        assert_eq!(handle.join().expect("consumer panicked"), 0);
        assert_eq!(buffer.snapshot().cars_out, 0);
    }
}
