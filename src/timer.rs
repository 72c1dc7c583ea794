use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

/// Opaque reference to an armed timer, used to disarm it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

/// Min-heap of deadlines with O(1) disarm.
///
/// Disarming only drops the payload; the heap entry is discarded lazily when
/// it reaches the top. Timers with equal deadlines pop in arming order.
#[derive(Debug)]
pub struct TimerQueue<T> {
    heap: BinaryHeap<Reverse<(i64, TimerHandle)>>,
    armed: HashMap<TimerHandle, (i64, T)>,
    next_handle: u64,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            armed: HashMap::new(),
            next_handle: 0,
        }
    }

    pub fn arm(&mut self, deadline_ms: i64, payload: T) -> TimerHandle {
        let handle = TimerHandle(self.next_handle);
        self.next_handle += 1;
        self.heap.push(Reverse((deadline_ms, handle)));
        self.armed.insert(handle, (deadline_ms, payload));
        self.compact();
        handle
    }

    /// Disarm a timer; returns its payload if it was still armed
    pub fn disarm(&mut self, handle: TimerHandle) -> Option<T> {
        self.armed.remove(&handle).map(|(_, payload)| payload)
    }

    pub fn is_armed(&self, handle: TimerHandle) -> bool {
        self.armed.contains_key(&handle)
    }

    /// Earliest deadline among armed timers
    pub fn next_deadline(&mut self) -> Option<i64> {
        self.drop_disarmed_top();
        self.heap.peek().map(|&Reverse((deadline, _))| deadline)
    }

    /// Remove and return the earliest timer whose deadline is at or before `now_ms`
    pub fn pop_due(&mut self, now_ms: i64) -> Option<(i64, T)> {
        self.drop_disarmed_top();
        match self.heap.peek() {
            Some(Reverse((deadline, _))) if *deadline <= now_ms => {}
            _ => return None,
        }
        let Reverse((_, handle)) = self.heap.pop()?;
        self.armed.remove(&handle)
    }

    pub fn len(&self) -> usize {
        self.armed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.armed.is_empty()
    }

    fn drop_disarmed_top(&mut self) {
        while let Some(Reverse((_, handle))) = self.heap.peek() {
            if self.armed.contains_key(handle) {
                break;
            }
            self.heap.pop();
        }
    }

    // Keep disarmed entries from piling up under heavy reschedule churn
    fn compact(&mut self) {
        if self.heap.len() > 64 && self.heap.len() > self.armed.len() * 2 {
            let armed = &self.armed;
            self.heap.retain(|Reverse((_, handle))| armed.contains_key(handle));
        }
    }
}
