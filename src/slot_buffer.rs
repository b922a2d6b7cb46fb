//! The shared carpark: a fixed size circular buffer of slots guarded by one lock.
//!
//! Producers park cars at `next_in`, consumers release them from `next_out`. Both
//! cursors wrap modulo the capacity. Slot validity is derived from the counters,
//! there are no per slot flags. All fields live behind a single `parking_lot::Mutex`
//! and are only reachable through the methods on [`SlotBuffer`], so no caller can
//! observe a half finished update.
//!
//! Two condition variables coordinate blocking:
//! * `space` is signalled after a car leaves, producers wait on it while full.
//! * `car` is signalled after a car arrives, consumers wait on it while empty.
//!
//! Each successful operation moves `occupied` by exactly one, so waking a single
//! waiter is enough. Only [`SlotBuffer::close`] broadcasts, since every waiter
//! has to see the closed flag.

use log::*;
use parking_lot::{Condvar, Mutex};
use crate::error::{CarparkError, Result};

/// A consistent view of the counters taken under the lock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Snapshot {
    /// `cars_in - cars_out - occupied`, always zero unless synchronization is broken.
    pub delta: i64,
    pub occupied: usize,
    pub capacity: usize,
    pub cars_in: u64,
    pub cars_out: u64,
    pub next_in: usize,
    pub next_out: usize,
}

struct CarparkState {
    slots: Vec<i32>,
    occupied: usize,
    next_in: usize,
    next_out: usize,
    cars_in: u64,
    cars_out: u64,
    closed: bool,
}

impl CarparkState {
    fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn is_full(&self) -> bool {
        self.occupied == self.capacity()
    }

    fn is_empty(&self) -> bool {
        self.occupied == 0
    }

    fn park(&mut self, value: i32) {
        debug_assert!(!self.is_full());
        self.slots[self.next_in] = value;
        self.occupied += 1;
        self.cars_in += 1;
        self.next_in = (self.next_in + 1) % self.capacity();
    }

    fn release(&mut self) -> i32 {
        debug_assert!(!self.is_empty());
        let value = self.slots[self.next_out];
        self.occupied -= 1;
        self.cars_out += 1;
        self.next_out = (self.next_out + 1) % self.capacity();
        value
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            delta: self.cars_in
                .wrapping_sub(self.cars_out)
                .wrapping_sub(self.occupied as u64) as i64,
            occupied: self.occupied,
            capacity: self.capacity(),
            cars_in: self.cars_in,
            cars_out: self.cars_out,
            next_in: self.next_in,
            next_out: self.next_out,
        }
    }
}

pub struct SlotBuffer {
    state: Mutex<CarparkState>,
    space: Condvar,
    car: Condvar,
}

impl SlotBuffer {
    /// Allocates `capacity` zeroed slots with all counters and cursors at zero.
    ///
    /// # Errors
    /// `InvalidCapacity` for zero, `Allocation` if the slots can not be reserved.
    pub fn new(capacity: usize) -> Result<SlotBuffer> {
        if capacity == 0 {
            return Err(CarparkError::InvalidCapacity(capacity));
        }
        let mut slots = Vec::new();
        slots.try_reserve_exact(capacity)
             .map_err(|source| CarparkError::Allocation { capacity, source })?;
        slots.resize(capacity, 0);
        trace!("carpark allocated with {} slots", capacity);

        Ok(SlotBuffer {
            state: Mutex::new(CarparkState {
                slots,
                occupied: 0,
                next_in: 0,
                next_out: 0,
                cars_in: 0,
                cars_out: 0,
                closed: false,
            }),
            space: Condvar::new(),
            car: Condvar::new(),
        })
    }

    pub fn capacity(&self) -> usize {
        self.state.lock().capacity()
    }

    /// Parks one car, blocking while every slot is taken.
    ///
    /// # Errors
    /// `Closed` if the buffer is closed before or while waiting. Nothing is written in that case.
    pub fn produce(&self, value: i32) -> Result<()> {
        let mut state = self.state.lock();
        loop {
            if state.closed {
                return Err(CarparkError::Closed);
            }
            if !state.is_full() {
                break;
            }
            self.space.wait(&mut state);
        }
        state.park(value);
        self.car.notify_one();
        Ok(())
    }

    /// Releases the oldest parked car, blocking while the carpark is empty.
    ///
    /// # Errors
    /// `Closed` if the buffer is closed before or while waiting.
    pub fn consume(&self) -> Result<i32> {
        let mut state = self.state.lock();
        loop {
            if state.closed {
                return Err(CarparkError::Closed);
            }
            if !state.is_empty() {
                break;
            }
            self.car.wait(&mut state);
        }
        let value = state.release();
        self.space.notify_one();
        Ok(value)
    }

    /// Parks a car only if a slot is free right now.
    pub fn try_produce(&self, value: i32) -> Result<bool> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(CarparkError::Closed);
        }
        if state.is_full() {
            return Ok(false);
        }
        state.park(value);
        self.car.notify_one();
        Ok(true)
    }

    /// Releases a car only if one is parked right now.
    pub fn try_consume(&self) -> Result<Option<i32>> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(CarparkError::Closed);
        }
        if state.is_empty() {
            return Ok(None);
        }
        let value = state.release();
        self.space.notify_one();
        Ok(Some(value))
    }

    pub fn snapshot(&self) -> Snapshot {
        self.state.lock().snapshot()
    }

    /// Closes the carpark and wakes every waiter on both conditions.
    /// Parked cars stay where they are so the counters still balance.
    pub fn close(&self) {
        let mut state = self.state.lock();
        if !state.closed {
            state.closed = true;
            debug!("carpark closed with {} cars inside", state.occupied);
        }
        drop(state);
        self.space.notify_all();
        self.car.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}
