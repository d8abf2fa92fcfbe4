use std::sync::{Arc, Mutex};

use crate::{Sdr, SdrEvent};

/// Builds a canonical node holding `sparse`.
pub fn sdr_with(dimensions: &[u32], sparse: &[u32]) -> Sdr {
    let mut sdr = Sdr::new(dimensions).unwrap();
    sdr.set_sparse(sparse).unwrap();
    sdr
}

/// Records every event a node delivers.
#[derive(Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<SdrEvent>>>,
}

impl EventLog {
    /// Subscribes a new log to `sdr`.
    pub fn attach(sdr: &Sdr) -> Self {
        let log = EventLog::default();
        let sink = log.events.clone();
        sdr.subscribe(move |event| sink.lock().unwrap().push(event));
        log
    }

    pub fn events(&self) -> Vec<SdrEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, event: SdrEvent) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|&&seen| seen == event)
            .count()
    }
}
