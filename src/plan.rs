//! A priority queue that stores arbitrary data sorted by tick
//!
//! Defines a `Queue<T>` that stores items of type T sorted by `u64` tick, called 'plans'. This
//! queue has methods for adding plans, cancelling plans, peeking at the tick of the earliest plan
//! and retrieving it. Adding a plan is *O*(log(*n*)) while cancellation is *O*(1).
//!
//! This queue is used by `Context` to store future events where some callback closure
//! `FnOnce(&mut Context)` will be executed at a given tick.

use std::{
    cmp::Ordering,
    collections::{BinaryHeap, HashMap},
};

/// A priority queue that stores arbitrary data sorted by tick
///
/// When plans are created they are sequentially assigned an `Id` that is a wrapped `u64`. If two
/// plans are scheduled for the same tick then the plan that is scheduled first (i.e., that has the
/// lowest id) is placed earlier.
///
/// The tick and plan id are stored in a binary heap of `Entry` objects. The data payload of the
/// event is stored in a hash map by plan id. Plan cancellation occurs by removing the
/// corresponding entry from the data hash map.
pub struct Queue<T> {
    queue: BinaryHeap<Entry>,
    data_map: HashMap<u64, T>,
    plan_counter: u64,
}

impl<T> Queue<T> {
    /// Create a new empty `Queue<T>`
    #[must_use]
    pub fn new() -> Queue<T> {
        Queue {
            queue: BinaryHeap::new(),
            data_map: HashMap::new(),
            plan_counter: 0,
        }
    }

    /// Add a plan to the queue at the specified tick
    ///
    /// Returns an `Id` for the newly-added plan that can be used to cancel it if needed.
    pub fn add_plan(&mut self, tick: u64, data: T) -> Id {
        let id = self.plan_counter;
        self.queue.push(Entry { tick, id });
        self.data_map.insert(id, data);
        self.plan_counter += 1;
        Id { id }
    }

    /// Cancel a plan that has been added to the queue
    ///
    /// # Panics
    ///
    /// This function panics if you cancel a plan which has already been cancelled or executed.
    pub fn cancel_plan(&mut self, id: &Id) {
        // Delete the plan from the map, but leave in the queue
        // It will be skipped when the plan is popped from the queue
        assert!(
            self.data_map.remove(&id.id).is_some(),
            "Plan does not exist"
        );
    }

    /// The tick of the earliest live plan, if any. Cancelled entries at the head of the heap are
    /// discarded along the way.
    pub fn next_tick(&mut self) -> Option<u64> {
        while let Some(entry) = self.queue.peek() {
            if self.data_map.contains_key(&entry.id) {
                return Some(entry.tick);
            }
            self.queue.pop();
        }
        None
    }

    /// Retrieve the earliest plan in the queue
    ///
    /// Returns the next plan if it exists or else `None` if the queue is empty
    pub fn get_next_plan(&mut self) -> Option<Plan<T>> {
        // Pop from queue until we find a plan with data or queue is empty
        while let Some(entry) = self.queue.pop() {
            // Skip plans that have been cancelled and thus have no data
            if let Some(data) = self.data_map.remove(&entry.id) {
                return Some(Plan {
                    tick: entry.tick,
                    data,
                });
            }
        }
        None
    }

    /// Number of live plans.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data_map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data_map.is_empty()
    }
}

impl<T> Default for Queue<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A tick and id object used to order plans in the `Queue<T>`
#[derive(PartialEq, Eq, Debug)]
struct Entry {
    tick: u64,
    id: u64,
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Entry objects are ordered in increasing order by tick and then plan id. `BinaryHeap` is a
/// max-heap, hence the reversal.
impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.tick
            .cmp(&other.tick)
            .then(self.id.cmp(&other.id))
            .reverse()
    }
}

/// A unique identifier for a plan added to a `Queue<T>`
#[derive(Debug, PartialEq, Eq)]
pub struct Id {
    id: u64,
}

/// A plan that holds data of type `T` intended to be used at the specified tick
pub struct Plan<T> {
    pub tick: u64,
    pub data: T,
}
