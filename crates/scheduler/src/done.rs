use std::sync::{Mutex, MutexGuard};

/// Append-only record of task names that finished, successfully or not.
#[derive(Debug, Default)]
pub struct DoneList {
    names: Mutex<Vec<String>>,
}

impl DoneList {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<String>> {
        self.names.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn push(&self, name: impl Into<String>) {
        self.lock().push(name.into());
    }

    /// Whether any finished task carried this name.
    pub fn contains(&self, name: &str) -> bool {
        self.lock().iter().any(|n| n == name)
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
