use std::cell::Cell;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Identifier returned when a listener is registered. Required to remove the listener later.
pub type ListenerId = u64;

type Callback<A> = Rc<dyn Fn(&A)>;

/// # Listener Registry
///
/// Multi-subscriber broadcast channel. Every registered callback is called once per
/// [ListenerRegistry::invoke].
///
/// Listener ids are never reused within a registry. The registry does not own the state captured
/// by its callbacks: a listener must be removed before the state it refers to goes away, or it
/// must capture something that tolerates that (a [std::rc::Weak], a handle, a copied value).
///
/// Invocation snapshots the current listeners before calling any of them, so a callback may add
/// or remove listeners on the registry that is invoking it. Listeners added during an invocation
/// are first called by the next invocation; listeners removed during an invocation are still
/// called by the current one.
pub struct ListenerRegistry<A> {
    listeners: RefCell<BTreeMap<ListenerId, Callback<A>>>,
    next_id: Cell<ListenerId>,
}

impl<A> ListenerRegistry<A> {
    /// Returns an empty registry.
    pub fn new() -> Self {
        Self {
            listeners: RefCell::new(BTreeMap::new()),
            next_id: Cell::new(0),
        }
    }

    /// Registers the callback and returns its id.
    pub fn add_listener(&self, callback: impl Fn(&A) + 'static) -> ListenerId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.listeners.borrow_mut().insert(id, Rc::new(callback));
        id
    }

    /// Removes the listener with the given id. Returns false if no such listener is registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.borrow_mut().remove(&id).is_some()
    }

    /// Removes every listener.
    pub fn remove_all_listeners(&self) {
        self.listeners.borrow_mut().clear();
    }

    /// Returns the number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Returns true if a listener with the given id is registered.
    pub fn contains(&self, id: ListenerId) -> bool {
        self.listeners.borrow().contains_key(&id)
    }

    /// Calls every registered listener with the given arguments.
    pub fn invoke(&self, args: &A) {
        let snapshot: Vec<Callback<A>> = self.listeners.borrow().values().cloned().collect();

        for callback in snapshot {
            callback(args);
        }
    }
}

impl<A> Default for ListenerRegistry<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> std::fmt::Debug for ListenerRegistry<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.listener_count())
            .field("next_id", &self.next_id.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter() -> (Rc<Cell<u32>>, impl Fn(&u32) + 'static) {
        let count = Rc::new(Cell::new(0));
        let captured = count.clone();
        (count, move |value: &u32| captured.set(captured.get() + value))
    }

    #[test]
    fn add_listener_returns_distinct_ids() {
        let registry = ListenerRegistry::<u32>::new();

        let first = registry.add_listener(|_| {});
        let second = registry.add_listener(|_| {});

        assert_ne!(first, second);
    }

    #[test]
    fn add_listener_after_remove_does_not_reuse_id() {
        let registry = ListenerRegistry::<u32>::new();
        let first = registry.add_listener(|_| {});
        registry.remove_listener(first);

        let second = registry.add_listener(|_| {});

        assert_ne!(first, second);
    }

    #[test]
    fn invoke_calls_every_listener_once() {
        let registry = ListenerRegistry::<u32>::new();
        let (first_count, first) = counter();
        let (second_count, second) = counter();
        registry.add_listener(first);
        registry.add_listener(second);

        registry.invoke(&1);

        assert_eq!(first_count.get(), 1);
        assert_eq!(second_count.get(), 1);
    }

    #[test]
    fn remove_listener_twice_returns_true_then_false() {
        let registry = ListenerRegistry::<u32>::new();
        let id = registry.add_listener(|_| {});

        assert!(registry.remove_listener(id));
        assert!(!registry.remove_listener(id));
    }

    #[test]
    fn remove_unknown_listener_returns_false() {
        let registry = ListenerRegistry::<u32>::new();

        assert!(!registry.remove_listener(42));
    }

    #[test]
    fn remove_all_listeners_invoke_calls_nothing() {
        let registry = ListenerRegistry::<u32>::new();
        let (count, callback) = counter();
        registry.add_listener(callback);

        registry.remove_all_listeners();
        registry.invoke(&1);

        assert_eq!(count.get(), 0);
        assert_eq!(registry.listener_count(), 0);
    }

    #[test]
    fn listener_count_returns_registered_count() {
        let registry = ListenerRegistry::<u32>::new();
        registry.add_listener(|_| {});
        let id = registry.add_listener(|_| {});
        registry.add_listener(|_| {});

        registry.remove_listener(id);

        assert_eq!(registry.listener_count(), 2);
    }

    #[test]
    fn invoke_listener_removing_itself_does_not_panic() {
        let registry = Rc::new(ListenerRegistry::<u32>::new());
        let own_id = Rc::new(Cell::new(None));
        let calls = Rc::new(Cell::new(0));

        let weak = Rc::downgrade(&registry);
        let id_cell = own_id.clone();
        let calls_cell = calls.clone();
        let id = registry.add_listener(move |_| {
            calls_cell.set(calls_cell.get() + 1);
            if let (Some(registry), Some(id)) = (weak.upgrade(), id_cell.get()) {
                registry.remove_listener(id);
            }
        });
        own_id.set(Some(id));

        registry.invoke(&0);
        registry.invoke(&0);

        assert_eq!(calls.get(), 1);
        assert_eq!(registry.listener_count(), 0);
    }

    #[test]
    fn invoke_listener_added_during_invoke_is_called_next_time() {
        let registry = Rc::new(ListenerRegistry::<u32>::new());
        let (count, callback) = counter();
        let callback = Rc::new(callback);

        let weak = Rc::downgrade(&registry);
        let added = Rc::new(Cell::new(false));
        let added_cell = added.clone();
        registry.add_listener(move |_| {
            if !added_cell.get() {
                added_cell.set(true);
                if let Some(registry) = weak.upgrade() {
                    let callback = callback.clone();
                    registry.add_listener(move |value| callback(value));
                }
            }
        });

        registry.invoke(&1);
        assert_eq!(count.get(), 0);

        registry.invoke(&1);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn invoke_passes_tuple_arguments() {
        let registry = ListenerRegistry::<(u16, u16)>::new();
        let received = Rc::new(Cell::new((0, 0)));
        let captured = received.clone();
        registry.add_listener(move |size| captured.set(*size));

        registry.invoke(&(800, 600));

        assert_eq!(received.get(), (800, 600));
    }
}
