use std::cmp;
use std::collections::{BinaryHeap, HashMap};
use std::time::{Duration, Instant};

const HASH_CAP: usize = 64;

// the wall clock now
#[inline]
pub fn now() -> Instant {
    Instant::now()
}

// timeout handler which can be removed/cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeoutHandle(u64);

impl TimeoutHandle {
    pub fn from_id(id: u64) -> Self {
        TimeoutHandle(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

// this is the data type that used by the binary heap to get the latest timer
struct TimeoutEntry {
    time: Instant, // the wall clock that the timer expires
    id: u64,       // also the tie breaker, earlier registration fires first
}

impl PartialEq for TimeoutEntry {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.id == other.id
    }
}

impl Eq for TimeoutEntry {}

impl PartialOrd for TimeoutEntry {
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
        Some(self.cmp(other))
    }
}

// reversed so that the binary heap pops the earliest timer
impl cmp::Ord for TimeoutEntry {
    fn cmp(&self, other: &Self) -> cmp::Ordering {
        other
            .time
            .cmp(&self.time)
            .then_with(|| other.id.cmp(&self.id))
    }
}

// the timeout list data structure
//
// cancelled timers are removed from the data map right away and their heap
// entries are dropped lazily when they reach the top
pub struct TimeoutList<T> {
    next_id: u64,
    timer_bh: BinaryHeap<TimeoutEntry>,
    data: HashMap<u64, T>,
}

impl<T> Default for TimeoutList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimeoutList<T> {
    pub fn new() -> Self {
        TimeoutList {
            next_id: 0,
            timer_bh: BinaryHeap::new(),
            data: HashMap::with_capacity(HASH_CAP),
        }
    }

    // add a timeout event to the list
    pub fn add_timer(&mut self, dur: Duration, data: T) -> TimeoutHandle {
        let id = self.next_id;
        self.next_id += 1;
        let now = now();
        let time = now
            .checked_add(dur)
            .unwrap_or_else(|| now + Duration::from_secs(u32::MAX as u64));
        self.timer_bh.push(TimeoutEntry { time, id });
        self.data.insert(id, data);
        TimeoutHandle(id)
    }

    // remove a timer, return its data if it was still pending
    pub fn del_timer(&mut self, handle: TimeoutHandle) -> Option<T> {
        self.data.remove(&handle.0)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    // drop the cancelled entries on the top of the heap
    fn purge(&mut self) {
        while let Some(entry) = self.timer_bh.peek() {
            if self.data.contains_key(&entry.id) {
                return;
            }
            self.timer_bh.pop();
        }
    }

    // pop one expired timer, earliest first
    pub fn pop_expired(&mut self, now: Instant) -> Option<T> {
        self.purge();
        match self.timer_bh.peek() {
            Some(entry) if entry.time <= now => {}
            _ => return None,
        }
        let entry = self.timer_bh.pop()?;
        self.data.remove(&entry.id)
    }

    // return the time left until the next expiration
    pub fn next_expire(&mut self, now: Instant) -> Option<Duration> {
        self.purge();
        self.timer_bh
            .peek()
            .map(|entry| entry.time.saturating_duration_since(now))
    }
}
