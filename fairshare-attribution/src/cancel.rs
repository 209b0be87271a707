use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Shared stop flag for Monte Carlo sampling.
///
/// Workers check it between permutations, so a cancelled run still returns
/// an estimate over every permutation that completed.
#[derive(Debug, Clone, Default)]
pub struct SamplingCancellation {
    flag: Arc<AtomicBool>,
}

impl SamplingCancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}
