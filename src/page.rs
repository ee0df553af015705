use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::classifier::{Classification, Classifier, FieldMetadata};
use crate::dom::{Dom, NodeId, truncate_chars};
use crate::enumerator::CandidateFields;
use crate::events::{Event, EventInit, Listener, ListenerStore};
use crate::framework::{SharedInterceptor, ValueInterceptor, ValueTracker};
use crate::html::parse_html;
use crate::injector::settled_value;
use crate::message::{FillStatus, FrameContext};
use crate::profile::Profile;
use crate::{Error, Result};

/// Outcome of one fill pass. `filled_count` never exceeds `matched_count`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FillReport {
    pub filled_count: usize,
    pub matched_count: usize,
}

impl FillReport {
    pub fn status(&self) -> FillStatus {
        if self.filled_count > 0 {
            FillStatus::Success
        } else if self.matched_count > 0 {
            FillStatus::AlreadyFilled
        } else {
            FillStatus::NoFields
        }
    }
}

#[derive(Debug)]
struct TraceState {
    enabled: bool,
    events: bool,
    autofill: bool,
    logs: VecDeque<String>,
    log_limit: usize,
    to_stderr: bool,
}

impl Default for TraceState {
    fn default() -> Self {
        Self {
            enabled: false,
            events: true,
            autofill: true,
            logs: VecDeque::new(),
            log_limit: 10_000,
            to_stderr: true,
        }
    }
}

/// A parsed document plus the listeners, framework hooks and trace log that
/// a fill pass runs against.
pub struct Page {
    pub(crate) dom: Dom,
    pub(crate) listeners: ListenerStore,
    classifier: Classifier,
    frame: FrameContext,
    trace_state: TraceState,
}

impl Page {
    pub fn from_html(html: &str) -> Result<Self> {
        Ok(Self {
            dom: parse_html(html)?,
            listeners: ListenerStore::default(),
            classifier: Classifier::new()?,
            frame: FrameContext::default(),
            trace_state: TraceState::default(),
        })
    }

    pub fn enable_trace(&mut self, enabled: bool) {
        self.trace_state.enabled = enabled;
    }

    pub fn set_trace_events(&mut self, enabled: bool) {
        self.trace_state.events = enabled;
    }

    pub fn set_trace_autofill(&mut self, enabled: bool) {
        self.trace_state.autofill = enabled;
    }

    pub fn set_trace_stderr(&mut self, enabled: bool) {
        self.trace_state.to_stderr = enabled;
    }

    pub fn set_trace_log_limit(&mut self, max_entries: usize) -> Result<()> {
        if max_entries == 0 {
            return Err(Error::Config(
                "set_trace_log_limit requires at least 1 entry".into(),
            ));
        }
        self.trace_state.log_limit = max_entries;
        while self.trace_state.logs.len() > self.trace_state.log_limit {
            self.trace_state.logs.pop_front();
        }
        Ok(())
    }

    pub fn take_trace_logs(&mut self) -> Vec<String> {
        self.trace_state.logs.drain(..).collect()
    }

    pub fn set_frame_context(&mut self, frame: FrameContext) {
        self.frame = frame;
    }

    pub fn frame_context(&self) -> FrameContext {
        self.frame
    }

    pub fn query(&self, selector: &str) -> Result<NodeId> {
        self.dom
            .query_selector(selector)?
            .ok_or_else(|| Error::SelectorNotFound(selector.to_string()))
    }

    pub fn query_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        self.dom.query_selector_all(selector)
    }

    pub fn value(&self, selector: &str) -> Result<String> {
        let target = self.query(selector)?;
        self.dom.value(target)
    }

    /// Writes through the ordinary value accessor, as page script would.
    /// No events are dispatched.
    pub fn set_value(&mut self, selector: &str, value: &str) -> Result<()> {
        let target = self.query(selector)?;
        self.assign_value(target, value)
    }

    pub fn attr(&self, selector: &str, name: &str) -> Result<Option<String>> {
        let target = self.query(selector)?;
        Ok(self.dom.attr(target, name).map(str::to_string))
    }

    pub fn dump_dom(&self, selector: &str) -> Result<String> {
        let target = self.query(selector)?;
        Ok(self.dom.dump_node(target))
    }

    pub fn assert_value(&self, selector: &str, expected: &str) -> Result<()> {
        let target = self.query(selector)?;
        let actual = self.dom.value(target)?;
        if actual != expected {
            return Err(Error::AssertionFailed {
                selector: selector.to_string(),
                expected: expected.to_string(),
                actual,
                dom_snippet: self.node_snippet(target),
            });
        }
        Ok(())
    }

    pub fn add_event_listener<F>(
        &mut self,
        selector: &str,
        event_type: &str,
        capture: bool,
        handler: F,
    ) -> Result<()>
    where
        F: FnMut(&mut Event) + 'static,
    {
        let target = self.query(selector)?;
        self.listen(target, event_type, capture, handler);
        Ok(())
    }

    /// Listens on the document node, which every dispatch path starts from.
    pub fn add_document_listener<F>(&mut self, event_type: &str, capture: bool, handler: F)
    where
        F: FnMut(&mut Event) + 'static,
    {
        self.listen(self.dom.root, event_type, capture, handler);
    }

    fn listen<F>(&mut self, node: NodeId, event_type: &str, capture: bool, handler: F)
    where
        F: FnMut(&mut Event) + 'static,
    {
        self.listeners.add(
            node,
            event_type.to_string(),
            Listener {
                capture,
                handler: Rc::new(RefCell::new(handler)),
            },
        );
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.count()
    }

    pub fn dispatch(&mut self, selector: &str, event_type: &str) -> Result<Event> {
        self.dispatch_with(selector, event_type, EventInit::default())
    }

    pub fn dispatch_with(
        &mut self,
        selector: &str,
        event_type: &str,
        init: EventInit,
    ) -> Result<Event> {
        let target = self.query(selector)?;
        self.dispatch_event(target, event_type, init)
    }

    /// Replaces the ordinary value setter of the selected control.
    pub fn install_value_interceptor<I>(&mut self, selector: &str, interceptor: I) -> Result<()>
    where
        I: ValueInterceptor + 'static,
    {
        let target = self.query(selector)?;
        let shared: SharedInterceptor = Rc::new(RefCell::new(interceptor));
        self.element_for_hook(selector, target)?.interceptor = Some(shared);
        Ok(())
    }

    /// Attaches a tracker seeded with the control's current value and
    /// returns a handle sharing its state.
    pub fn attach_value_tracker(&mut self, selector: &str) -> Result<ValueTracker> {
        let target = self.query(selector)?;
        let tracker = ValueTracker::new(&self.dom.value(target)?);
        self.element_for_hook(selector, target)?.tracker = Some(tracker.clone());
        Ok(tracker)
    }

    pub fn value_tracker(&self, selector: &str) -> Result<Option<ValueTracker>> {
        let target = self.query(selector)?;
        Ok(self
            .dom
            .element(target)
            .and_then(|element| element.tracker.clone()))
    }

    fn element_for_hook(
        &mut self,
        selector: &str,
        target: NodeId,
    ) -> Result<&mut crate::dom::Element> {
        self.dom
            .element_mut(target)
            .ok_or_else(|| Error::TypeMismatch {
                selector: selector.to_string(),
                expected: "form control".into(),
                actual: "non-element".into(),
            })
    }

    /// Fillable controls in document order. Each call restarts the walk.
    pub fn candidate_fields(&self) -> Result<CandidateFields<'_>> {
        CandidateFields::new(&self.dom)
    }

    pub fn field_metadata(&self, node: NodeId) -> FieldMetadata {
        FieldMetadata::read(&self.dom, node)
    }

    /// Classifies one field and, when it is recognised but holds a different
    /// value, injects the profile value.
    pub fn classify_field(&mut self, node: NodeId, profile: &Profile) -> Result<Classification> {
        let metadata = self.field_metadata(node).normalized();
        let Some(matched) = self.classifier.resolve(&metadata, profile)? else {
            let label = self.trace_node_label(node);
            self.trace_autofill_line(format!("[autofill] field {label} outcome=no_match"));
            return Ok(Classification::NoMatch);
        };

        // Compare against what a write would leave behind, so a select with no
        // option for the value counts as unchanged once it has been cleared.
        let settled = settled_value(&self.dom, node, &matched.value);
        let outcome = if self.dom.value(node)? == settled {
            Classification::Unchanged {
                kind: matched.kind,
                value: matched.value,
            }
        } else {
            self.inject_value(node, &matched.value)?;
            Classification::Filled {
                kind: matched.kind,
                value: matched.value,
            }
        };

        if self.trace_state.enabled {
            let label = self.trace_node_label(node);
            self.trace_autofill_line(format!(
                "[autofill] field {} kind={} rule=/{}/ outcome={}",
                label,
                matched.kind,
                matched.pattern,
                if outcome.is_filled() { "filled" } else { "unchanged" }
            ));
        }
        Ok(outcome)
    }

    /// Runs one fill pass over every candidate field.
    pub fn autofill(&mut self, profile: &Profile) -> Result<FillReport> {
        // Injection mutates the tree, so the candidate list is fixed up front.
        let candidates = self.candidate_fields()?.collect::<Vec<_>>();
        let mut report = FillReport::default();
        for node in candidates {
            let classification = self.classify_field(node, profile)?;
            if classification.is_match() {
                report.matched_count += 1;
            }
            if classification.is_filled() {
                report.filled_count += 1;
            }
        }
        self.trace_autofill_line(format!(
            "[autofill] done frame={} filled={} matched={} status={}",
            self.frame.as_str(),
            report.filled_count,
            report.matched_count,
            report.status().as_str()
        ));
        Ok(report)
    }

    pub(crate) fn dispatch_event(
        &mut self,
        target: NodeId,
        event_type: &str,
        init: EventInit,
    ) -> Result<Event> {
        if !self.dom.is_valid_node(target) {
            return Err(Error::TypeMismatch {
                selector: format!("node-{}", target.0),
                expected: "node".into(),
                actual: "unknown node id".into(),
            });
        }
        let target_value = self
            .dom
            .element(target)
            .map(|element| element.value.clone())
            .unwrap_or_default();
        let mut event = Event::new(event_type, target, target_value, init);

        let mut path = Vec::new();
        let mut cursor = Some(target);
        while let Some(node) = cursor {
            path.push(node);
            cursor = self.dom.parent(node);
        }
        path.reverse();

        // Capture phase.
        for node in &path[..path.len() - 1] {
            event.current_target = *node;
            self.invoke_listeners(*node, &mut event, true);
            if event.propagation_stopped {
                self.trace_event_done(&event, "propagation_stopped");
                return Ok(event);
            }
        }

        // Target phase: capture listeners first.
        event.current_target = target;
        self.invoke_listeners(target, &mut event, true);
        if event.propagation_stopped {
            self.trace_event_done(&event, "propagation_stopped");
            return Ok(event);
        }

        // Target phase: bubble listeners.
        self.invoke_listeners(target, &mut event, false);
        if event.propagation_stopped {
            self.trace_event_done(&event, "propagation_stopped");
            return Ok(event);
        }

        // Bubble phase.
        if event.bubbles {
            for node in path[..path.len() - 1].iter().rev() {
                event.current_target = *node;
                self.invoke_listeners(*node, &mut event, false);
                if event.propagation_stopped {
                    self.trace_event_done(&event, "propagation_stopped");
                    return Ok(event);
                }
            }
        }

        self.trace_event_done(&event, "completed");
        Ok(event)
    }

    fn invoke_listeners(&mut self, node: NodeId, event: &mut Event, capture: bool) {
        let listeners = self.listeners.get(node, &event.event_type, capture);
        for listener in listeners {
            if self.trace_state.enabled {
                let phase = if capture { "capture" } else { "bubble" };
                let target_label = self.trace_node_label(event.target);
                let current_label = self.trace_node_label(event.current_target);
                self.trace_event_line(format!(
                    "[event] {} target={} current={} phase={} default_prevented={}",
                    event.event_type, target_label, current_label, phase, event.default_prevented
                ));
            }
            let mut handler = listener.handler.borrow_mut();
            (&mut *handler)(event);
            if event.immediate_propagation_stopped {
                break;
            }
        }
    }

    fn trace_event_done(&mut self, event: &Event, outcome: &str) {
        if !self.trace_state.enabled {
            return;
        }
        let target_label = self.trace_node_label(event.target);
        let current_label = self.trace_node_label(event.current_target);
        self.trace_event_line(format!(
            "[event] done {} target={} current={} outcome={} default_prevented={} propagation_stopped={} immediate_stopped={}",
            event.event_type,
            target_label,
            current_label,
            outcome,
            event.default_prevented,
            event.propagation_stopped,
            event.immediate_propagation_stopped
        ));
    }

    fn trace_event_line(&mut self, line: String) {
        if self.trace_state.enabled && self.trace_state.events {
            self.trace_line(line);
        }
    }

    pub(crate) fn trace_autofill_line(&mut self, line: String) {
        if self.trace_state.enabled && self.trace_state.autofill {
            self.trace_line(line);
        }
    }

    fn trace_line(&mut self, line: String) {
        if self.trace_state.enabled {
            if self.trace_state.to_stderr {
                eprintln!("{line}");
            }
            if self.trace_state.logs.len() >= self.trace_state.log_limit {
                self.trace_state.logs.pop_front();
            }
            self.trace_state.logs.push_back(line);
        }
    }

    pub(crate) fn trace_node_label(&self, node: NodeId) -> String {
        if let Some(id) = self.dom.attr(node, "id") {
            if !id.is_empty() {
                return format!("#{id}");
            }
        }
        self.dom
            .tag_name(node)
            .map(ToOwned::to_owned)
            .unwrap_or_else(|| format!("node-{}", node.0))
    }

    fn node_snippet(&self, node: NodeId) -> String {
        truncate_chars(&self.dom.dump_node(node), 200)
    }
}
