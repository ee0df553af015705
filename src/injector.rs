use crate::dom::{Dom, NodeId};
use crate::events::EventInit;
use crate::page::Page;
use crate::{Error, Result};

/// Events a framework may listen to for a value change, in dispatch order.
pub(crate) const INJECTED_EVENTS: [&str; 3] = ["input", "change", "blur"];

const INJECTED_EVENT_INIT: EventInit = EventInit {
    bubbles: true,
    cancelable: true,
};

/// Control families that own a base value setter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    TextInput,
    TextArea,
    Select,
}

impl ControlKind {
    pub(crate) fn of(dom: &Dom, node: NodeId) -> Option<Self> {
        match dom.tag_name(node)?.to_ascii_lowercase().as_str() {
            "input" => Some(Self::TextInput),
            "textarea" => Some(Self::TextArea),
            "select" => Some(Self::Select),
            _ => None,
        }
    }
}

pub(crate) type NativeValueSetter = fn(&mut Dom, NodeId, &str) -> Result<()>;

/// Base setter for a control family, unaffected by any value interceptor.
pub(crate) fn native_value_setter(kind: Option<ControlKind>) -> Option<NativeValueSetter> {
    match kind? {
        ControlKind::TextInput | ControlKind::TextArea => Some(set_text_control_value),
        ControlKind::Select => Some(set_select_control_value),
    }
}

fn set_text_control_value(dom: &mut Dom, node: NodeId, value: &str) -> Result<()> {
    let element = dom.element_mut(node).ok_or_else(|| Error::TypeMismatch {
        selector: format!("node-{}", node.0),
        expected: "input or textarea".into(),
        actual: "non-element".into(),
    })?;
    element.value = value.to_string();
    Ok(())
}

fn set_select_control_value(dom: &mut Dom, node: NodeId, value: &str) -> Result<()> {
    // Dom::set_value already routes selects through option selection.
    dom.set_value(node, value)
}

/// Value the control holds after a base-setter write of `requested`.
///
/// A select without an option for `requested` ends up empty.
pub(crate) fn settled_value(dom: &Dom, node: NodeId, requested: &str) -> String {
    match ControlKind::of(dom, node) {
        Some(ControlKind::Select) => dom
            .matching_option(node, requested)
            .map(|_| requested.to_string())
            .unwrap_or_default(),
        _ => requested.to_string(),
    }
}

impl Page {
    /// Writes `value` through the ordinary value accessor, which an installed
    /// [`crate::ValueInterceptor`] may rewrite or swallow.
    pub(crate) fn assign_value(&mut self, node: NodeId, value: &str) -> Result<()> {
        let current = self.dom.value(node)?;
        let interceptor = self
            .dom
            .element(node)
            .and_then(|element| element.interceptor.clone());
        let effective = match interceptor {
            Some(interceptor) => interceptor.borrow_mut().intercept(&current, value),
            None => Some(value.to_string()),
        };
        match effective {
            Some(effective) => self.dom.set_value(node, &effective),
            None => Ok(()),
        }
    }

    /// Writes `value` into `node` so that both direct reads and reactive
    /// frameworks observe it.
    ///
    /// The ordinary accessor is tried first, then an attached value tracker
    /// is rewound to the pre-write value and the control's base setter
    /// rewrites the value underneath any interceptor. Finally `input`,
    /// `change` and `blur` are dispatched, all bubbling and cancelable.
    /// Elements without a base setter skip the bypass but still get the
    /// events.
    pub fn inject_value(&mut self, node: NodeId, value: &str) -> Result<()> {
        let previous = self.dom.value(node)?;
        self.assign_value(node, value)?;

        if let Some(tracker) = self
            .dom
            .element(node)
            .and_then(|element| element.tracker.clone())
        {
            tracker.set_value(&previous);
        }

        match native_value_setter(ControlKind::of(&self.dom, node)) {
            Some(setter) => setter(&mut self.dom, node, value)?,
            None => {
                let label = self.trace_node_label(node);
                self.trace_autofill_line(format!(
                    "[autofill] {label} has no base value setter, bypass skipped"
                ));
            }
        }

        for event_type in INJECTED_EVENTS {
            self.dispatch_event(node, event_type, INJECTED_EVENT_INIT)?;
        }
        Ok(())
    }
}
