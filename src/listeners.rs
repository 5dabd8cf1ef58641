//! Callback registries
//!
//! Listeners run in registration order. A failing listener is logged and
//! the remaining ones still run.

use std::fmt;
use tracing::warn;

/// Handle returned on registration, used to unregister
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub type Listener<E> = Box<dyn FnMut(&E) -> anyhow::Result<()>>;

pub struct Listeners<E> {
    next_id: u64,
    entries: Vec<(ListenerId, Listener<E>)>,
}

impl<E> Default for Listeners<E> {
    fn default() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }
}

impl<E> Listeners<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, listener: Listener<E>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, listener));
        id
    }

    /// Returns whether a listener was removed; unknown ids are ignored
    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(existing, _)| *existing != id);
        self.entries.len() != before
    }

    pub fn emit(&mut self, event: &E) {
        for (id, listener) in &mut self.entries {
            if let Err(e) = listener(event) {
                warn!(listener = %id, error = %format!("{e:#}"), "Listener failed");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_failing_listener_does_not_stop_others() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut listeners: Listeners<u32> = Listeners::new();

        let first = seen.clone();
        listeners.add(Box::new(move |n| {
            first.borrow_mut().push(("first", *n));
            Ok(())
        }));
        listeners.add(Box::new(|_| anyhow::bail!("boom")));
        let third = seen.clone();
        listeners.add(Box::new(move |n| {
            third.borrow_mut().push(("third", *n));
            Ok(())
        }));

        listeners.emit(&7);
        assert_eq!(*seen.borrow(), vec![("first", 7), ("third", 7)]);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut listeners: Listeners<()> = Listeners::new();
        let id = listeners.add(Box::new(|_| Ok(())));
        assert!(listeners.remove(id));
        assert!(!listeners.remove(id));
        assert!(listeners.is_empty());
    }

    #[test]
    fn test_ids_are_not_reused() {
        let mut listeners: Listeners<()> = Listeners::new();
        let a = listeners.add(Box::new(|_| Ok(())));
        listeners.remove(a);
        let b = listeners.add(Box::new(|_| Ok(())));
        assert_ne!(a, b);
    }
}
