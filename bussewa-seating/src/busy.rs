use std::sync::atomic::{AtomicBool, Ordering};

/// Advisory gate that keeps an interactive layer from starting a second seat
/// operation while one is in flight. Correctness comes from the store.
#[derive(Debug, Default)]
pub struct BusyGate {
    busy: AtomicBool,
}

impl BusyGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` while another operation holds the gate.
    pub fn try_enter(&self) -> Option<BusyGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard { gate: self })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

pub struct BusyGuard<'a> {
    gate: &'a BusyGate,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.gate.busy.store(false, Ordering::Release);
    }
}
