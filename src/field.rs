use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Read/write access to one visual input.
///
/// Change notification is not part of the trait: front ends call
/// [`crate::controller::ViewController::on_query_input`] when the primary field changes.
pub trait FieldAccessor: Send + Sync {
    fn get(&self) -> String;
    fn set(&self, value: &str);
    fn focus(&self) {}
}

/// In-memory field used by the terminal front end and tests.
#[derive(Debug, Default)]
pub struct MemoryField {
    value: Mutex<String>,
    focus_count: AtomicUsize,
}

impl MemoryField {
    pub fn new(initial: &str) -> Self {
        Self {
            value: Mutex::new(initial.to_string()),
            focus_count: AtomicUsize::new(0),
        }
    }

    /// How many times focus was requested.
    pub fn focus_count(&self) -> usize {
        self.focus_count.load(Ordering::SeqCst)
    }
}

impl FieldAccessor for MemoryField {
    fn get(&self) -> String {
        self.value.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn set(&self, value: &str) {
        *self.value.lock().unwrap_or_else(|e| e.into_inner()) = value.to_string();
    }

    fn focus(&self) {
        self.focus_count.fetch_add(1, Ordering::SeqCst);
    }
}
