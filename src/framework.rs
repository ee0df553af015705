use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Framework override of an element's ordinary value setter.
///
/// Reactive frameworks replace the `value` accessor of the controls they
/// render so they can observe writes. An interceptor receives every ordinary
/// write and decides what actually reaches the element: `Some(value)` lets a
/// (possibly rewritten) value through, `None` swallows the write. Writes made
/// through the base setter of the control type never reach the interceptor.
pub trait ValueInterceptor {
    fn intercept(&mut self, current: &str, requested: &str) -> Option<String>;
}

impl<F> ValueInterceptor for F
where
    F: FnMut(&str, &str) -> Option<String>,
{
    fn intercept(&mut self, current: &str, requested: &str) -> Option<String> {
        self(current, requested)
    }
}

pub(crate) type SharedInterceptor = Rc<RefCell<dyn ValueInterceptor>>;

/// Cached "last seen" value a framework keeps next to a control.
///
/// Frameworks compare the tracked value with the live value when an `input`
/// or `change` event arrives and drop the event when both agree. The handle is
/// shared: clones observe the same state as the copy attached to the element.
#[derive(Clone, Default)]
pub struct ValueTracker {
    state: Rc<RefCell<TrackerState>>,
}

#[derive(Debug, Default)]
struct TrackerState {
    value: String,
    history: Vec<String>,
}

impl ValueTracker {
    pub fn new(initial: &str) -> Self {
        Self {
            state: Rc::new(RefCell::new(TrackerState {
                value: initial.to_string(),
                history: Vec::new(),
            })),
        }
    }

    pub fn value(&self) -> String {
        self.state.borrow().value.clone()
    }

    pub fn set_value(&self, value: &str) {
        let mut state = self.state.borrow_mut();
        state.value = value.to_string();
        state.history.push(value.to_string());
    }

    /// Every value written into the tracker, oldest first.
    pub fn history(&self) -> Vec<String> {
        self.state.borrow().history.clone()
    }

    /// True when `live` differs from the tracked value, i.e. a framework
    /// would treat the next `input` event as a real change.
    pub fn is_stale(&self, live: &str) -> bool {
        self.state.borrow().value != live
    }
}

impl fmt::Debug for ValueTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("ValueTracker")
            .field("value", &state.value)
            .field("history", &state.history)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracker_clones_share_state() {
        let tracker = ValueTracker::new("a");
        let observer = tracker.clone();
        tracker.set_value("b");
        assert_eq!(observer.value(), "b");
        assert_eq!(observer.history(), vec!["b".to_string()]);
        assert!(observer.is_stale("c"));
        assert!(!observer.is_stale("b"));
    }

    #[test]
    fn closures_act_as_interceptors() {
        let mut upper = |_: &str, requested: &str| Some(requested.to_uppercase());
        assert_eq!(upper.intercept("", "abc"), Some("ABC".to_string()));

        let mut swallow = |_: &str, _: &str| -> Option<String> { None };
        assert_eq!(swallow.intercept("x", "y"), None);
    }
}
