use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Whether conditions allow the dome to be open.
pub trait WeatherGate: Send + Sync {
    fn is_safe(&self) -> bool;
}

/// A weather gate backed by a shared flag.
///
/// Clones share the flag, so a monitoring task can flip it while the scheduler
/// reads it.
#[derive(Debug, Clone)]
pub struct WeatherFlag(Arc<AtomicBool>);

impl WeatherFlag {
    pub fn new(safe: bool) -> Self {
        Self(Arc::new(AtomicBool::new(safe)))
    }

    pub fn set_safe(&self, safe: bool) {
        self.0.store(safe, Ordering::SeqCst);
    }
}

impl Default for WeatherFlag {
    fn default() -> Self {
        Self::new(true)
    }
}

impl WeatherGate for WeatherFlag {
    fn is_safe(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let flag = WeatherFlag::default();
        let monitor = flag.clone();
        assert!(flag.is_safe());
        monitor.set_safe(false);
        assert!(!flag.is_safe());
    }
}
