use std::collections::HashSet;

use inkcal_core::Event;

/// Collects events, dropping repeats of the same `(date, name, time)`.
#[derive(Debug, Default)]
pub struct EventSink {
    events: Vec<Event>,
    seen: HashSet<(String, String, String)>,
}

impl EventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when an equal key was already collected.
    pub fn push(&mut self, ev: Event) -> bool {
        let (date, name, time) = ev.dedupe_key();
        let key = (date.to_string(), name.to_string(), time.to_string());
        if !self.seen.insert(key) {
            return false;
        }
        self.events.push(ev);
        true
    }

    pub fn extend(&mut self, events: impl IntoIterator<Item = Event>) {
        for ev in events {
            self.push(ev);
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events ordered by `(date, time)`; ties keep insertion order.
    pub fn into_sorted(self) -> Vec<Event> {
        let mut events = self.events;
        events.sort_by(|a, b| (&a.date, &a.time).cmp(&(&b.date, &b.time)));
        events
    }
}
