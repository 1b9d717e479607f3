//! Filtering of noisy sensor streams

/// A stateful filter over a stream of samples
pub trait Filter<T> {
    /// Feed one sample and get the filtered output
    fn filter(&mut self, input: T) -> T;
}

/// Rising-edge detector for boolean events.
///
/// Reports `true` for the first sample of a run of `true` samples and then
/// stays quiet until it has seen a `false`, so one wide floor line crossed
/// over many samples counts once.
#[derive(Debug, Clone, Default)]
pub struct EdgeDebouncer {
    active: bool,
    edges: usize,
}

impl EdgeDebouncer {
    pub fn new() -> Self {
        EdgeDebouncer::default()
    }

    /// Number of edges reported so far
    pub fn edges(&self) -> usize {
        self.edges
    }

    /// True while the input is still inside the last reported event
    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl Filter<bool> for EdgeDebouncer {
    fn filter(&mut self, input: bool) -> bool {
        if !input {
            self.active = false;
            return false;
        }
        if self.active {
            return false;
        }
        self.active = true;
        self.edges += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wide_event_counts_once() {
        let mut debouncer = EdgeDebouncer::new();
        let stream = [false, true, true, true, false, false, true, true, false];
        let edges: Vec<bool> = stream.iter().map(|&s| debouncer.filter(s)).collect();
        assert_eq!(
            edges,
            vec![false, true, false, false, false, false, true, false, false]
        );
        assert_eq!(debouncer.edges(), 2);
    }

    #[test]
    fn test_event_at_start_is_reported() {
        let mut debouncer = EdgeDebouncer::new();
        assert!(debouncer.filter(true));
        assert!(debouncer.is_active());
        assert!(!debouncer.filter(true));
    }
}
