// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Progress events for loading sessions

use std::fmt;

/// Lifecycle phase of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressPhase {
    /// Stream header decoded
    Start,
    /// A geometry or object record was processed
    Progress,
    /// End record received
    Done,
}

/// Event delivered to listeners
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    pub phase: ProgressPhase,
    pub nr_objects_read: usize,
    pub nr_objects_total: usize,
}

impl ProgressEvent {
    /// Completion in percent, 0 when the total is unknown
    pub fn percent(&self) -> f64 {
        if self.nr_objects_total == 0 {
            return 0.0;
        }
        (self.nr_objects_read as f64 / self.nr_objects_total as f64 * 100.0).min(100.0)
    }
}

/// Handle returned by [`ProgressTracker::add_listener`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&ProgressEvent)>;

/// Counts objects read and fans events out to listeners
pub struct ProgressTracker {
    listeners: Vec<(ListenerId, Listener)>,
    next_listener: u64,
    nr_objects_read: usize,
    nr_objects_total: usize,
}

impl ProgressTracker {
    pub fn new(nr_objects_total: usize) -> Self {
        Self {
            listeners: Vec::new(),
            next_listener: 0,
            nr_objects_read: 0,
            nr_objects_total,
        }
    }

    pub fn add_listener(&mut self, listener: impl FnMut(&ProgressEvent) + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Detach a listener; returns whether it was registered
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn nr_objects_read(&self) -> usize {
        self.nr_objects_read
    }

    pub fn nr_objects_total(&self) -> usize {
        self.nr_objects_total
    }

    pub fn object_read(&mut self) {
        self.nr_objects_read += 1;
    }

    pub fn emit(&mut self, phase: ProgressPhase) {
        let event = ProgressEvent {
            phase,
            nr_objects_read: self.nr_objects_read,
            nr_objects_total: self.nr_objects_total,
        };
        for (_, listener) in self.listeners.iter_mut() {
            listener(&event);
        }
    }
}

impl fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("listeners", &self.listeners.len())
            .field("nr_objects_read", &self.nr_objects_read)
            .field("nr_objects_total", &self.nr_objects_total)
            .finish()
    }
}
