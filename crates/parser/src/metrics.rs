use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

/// Counters accumulated across every document a parser converts
#[derive(Debug, Default)]
pub struct DocumentMetrics {
    /// Total number of documents and fragments parsed
    documents: AtomicUsize,
    /// Total number of elements converted
    elements: AtomicUsize,
    /// Total number of attributes converted
    attributes: AtomicUsize,
    /// Elements re-attached flat because they sat below the depth limit
    flattened: AtomicUsize,
}

impl DocumentMetrics {
    /// Create new document metrics
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_documents(&self) {
        self.documents.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the element counter
    pub fn increment_elements(&self) {
        self.elements.fetch_add(1, Ordering::Relaxed);
    }

    /// Add to the attribute counter
    pub fn add_attributes(&self, count: usize) {
        self.attributes.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_flattened(&self) {
        self.flattened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total_documents(&self) -> usize {
        self.documents.load(Ordering::Relaxed)
    }

    /// Get the total number of elements
    pub fn total_elements(&self) -> usize {
        self.elements.load(Ordering::Relaxed)
    }

    /// Get the total number of attributes
    pub fn total_attributes(&self) -> usize {
        self.attributes.load(Ordering::Relaxed)
    }

    pub fn total_flattened(&self) -> usize {
        self.flattened.load(Ordering::Relaxed)
    }

    /// Reset all metrics to zero
    pub fn reset(&self) {
        self.documents.store(0, Ordering::Relaxed);
        self.elements.store(0, Ordering::Relaxed);
        self.attributes.store(0, Ordering::Relaxed);
        self.flattened.store(0, Ordering::Relaxed);
    }
}

/// Timer for measuring parse operations
#[derive(Debug)]
pub struct ParseTimer {
    start: Instant,
}

impl ParseTimer {
    /// Create a new parse timer
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get the elapsed time in microseconds
    pub fn elapsed_us(&self) -> u128 {
        self.start.elapsed().as_micros()
    }
}

impl Default for ParseTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_metrics() {
        let metrics = DocumentMetrics::new();
        metrics.increment_documents();
        metrics.increment_elements();
        metrics.increment_elements();
        metrics.add_attributes(3);
        metrics.increment_flattened();

        assert_eq!(metrics.total_documents(), 1);
        assert_eq!(metrics.total_elements(), 2);
        assert_eq!(metrics.total_attributes(), 3);
        assert_eq!(metrics.total_flattened(), 1);

        metrics.reset();
        assert_eq!(metrics.total_elements(), 0);
        assert_eq!(metrics.total_attributes(), 0);
    }
}
