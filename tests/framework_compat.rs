use std::cell::RefCell;
use std::rc::Rc;

use form_autofill::{Event, EventInit, Page, Profile, Result, ValueTracker};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Observed {
    event_type: String,
    target_value: String,
    bubbles: bool,
    cancelable: bool,
    changed: bool,
}

/// Wires `#field` up the way a reactive framework renders a controlled input:
/// the value setter is overridden to keep the tracker in sync, and a single
/// document listener reports a change only when the live value differs from
/// the tracked one.
fn render_controlled_input(page: &mut Page) -> Result<(ValueTracker, Rc<RefCell<Vec<Observed>>>)> {
    let tracker = page.attach_value_tracker("#field")?;
    let setter_tracker = tracker.clone();
    page.install_value_interceptor("#field", move |_current: &str, requested: &str| {
        setter_tracker.set_value(requested);
        Some(requested.to_string())
    })?;

    let observed = Rc::new(RefCell::new(Vec::new()));
    for event_type in ["input", "change", "blur"] {
        let sink = Rc::clone(&observed);
        let listener_tracker = tracker.clone();
        page.add_document_listener(event_type, false, move |event: &mut Event| {
            let changed = listener_tracker.is_stale(&event.target_value);
            if changed {
                listener_tracker.set_value(&event.target_value);
            }
            sink.borrow_mut().push(Observed {
                event_type: event.event_type.clone(),
                target_value: event.target_value.clone(),
                bubbles: event.bubbles(),
                cancelable: event.cancelable(),
                changed,
            });
        });
    }
    Ok((tracker, observed))
}

fn profile_with_email(email: &str) -> Profile {
    Profile {
        email: Some(email.into()),
        ..Profile::default()
    }
}

#[test]
fn injection_rewinds_tracker_so_framework_sees_a_change() -> Result<()> {
    let mut page = Page::from_html("<form><input id='field' name='email'></form>")?;
    let (tracker, observed) = render_controlled_input(&mut page)?;

    page.autofill(&profile_with_email("j@x.com"))?;

    // Setter write, rewind to the prior value, then the framework catching up.
    assert_eq!(tracker.history(), vec!["j@x.com", "", "j@x.com"]);
    let observed = observed.borrow();
    let types = observed
        .iter()
        .map(|seen| seen.event_type.as_str())
        .collect::<Vec<_>>();
    assert_eq!(types, vec!["input", "change", "blur"]);
    assert!(observed.iter().all(|seen| seen.bubbles && seen.cancelable));
    assert!(observed.iter().all(|seen| seen.target_value == "j@x.com"));
    assert!(observed[0].changed);
    page.assert_value("#field", "j@x.com")?;
    Ok(())
}

#[test]
fn plain_assignment_is_invisible_to_the_framework() -> Result<()> {
    let mut page = Page::from_html("<input id='field' name='email'>")?;
    let (_tracker, observed) = render_controlled_input(&mut page)?;

    page.set_value("#field", "j@x.com")?;
    page.dispatch_with(
        "#field",
        "input",
        EventInit {
            bubbles: true,
            cancelable: false,
        },
    )?;

    let observed = observed.borrow();
    assert_eq!(observed.len(), 1);
    assert!(!observed[0].changed);
    Ok(())
}

#[test]
fn base_setter_bypasses_an_interceptor_that_swallows_writes() -> Result<()> {
    let mut page = Page::from_html("<input id='field' name='email' value='locked'>")?;
    page.install_value_interceptor("#field", |_current: &str, _requested: &str| -> Option<String> {
        None
    })?;

    page.set_value("#field", "ignored")?;
    page.assert_value("#field", "locked")?;

    let report = page.autofill(&profile_with_email("j@x.com"))?;
    assert_eq!(report.filled_count, 1);
    page.assert_value("#field", "j@x.com")?;
    Ok(())
}

#[test]
fn base_setter_overrides_an_interceptor_that_rewrites_values() -> Result<()> {
    let mut page = Page::from_html("<input id='field' name='email'>")?;
    page.install_value_interceptor("#field", |_current: &str, requested: &str| {
        Some(requested.to_uppercase())
    })?;
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    page.add_event_listener("#field", "input", false, move |event: &mut Event| {
        sink.borrow_mut().push(event.target_value.clone());
    })?;

    page.autofill(&profile_with_email("j@x.com"))?;
    assert_eq!(*seen.borrow(), vec!["j@x.com"]);
    Ok(())
}

#[test]
fn element_without_base_setter_still_receives_events() -> Result<()> {
    let mut page = Page::from_html("<div id='widget' role='textbox'></div>")?;
    page.enable_trace(true);
    page.set_trace_stderr(false);
    page.set_trace_events(false);
    let seen = Rc::new(RefCell::new(Vec::new()));
    for event_type in ["input", "change", "blur"] {
        let sink = Rc::clone(&seen);
        page.add_document_listener(event_type, false, move |event: &mut Event| {
            sink.borrow_mut().push(event.event_type.clone());
        });
    }

    let widget = page.query("#widget")?;
    page.inject_value(widget, "hello")?;

    assert_eq!(*seen.borrow(), vec!["input", "change", "blur"]);
    assert_eq!(
        page.take_trace_logs(),
        vec!["[autofill] #widget has no base value setter, bypass skipped"]
    );
    Ok(())
}

#[test]
fn document_capture_listener_can_cancel_but_not_block_the_write() -> Result<()> {
    let mut page = Page::from_html("<input id='field' name='email'>")?;
    page.add_document_listener("input", true, |event: &mut Event| {
        event.prevent_default();
        event.stop_propagation();
    });
    let target_hits = Rc::new(RefCell::new(0));
    let sink = Rc::clone(&target_hits);
    page.add_event_listener("#field", "input", false, move |_: &mut Event| {
        *sink.borrow_mut() += 1;
    })?;

    page.autofill(&profile_with_email("j@x.com"))?;
    assert_eq!(*target_hits.borrow(), 0);
    page.assert_value("#field", "j@x.com")?;
    Ok(())
}

#[test]
fn plain_dispatch_skips_document_bubble_listeners() -> Result<()> {
    let mut page = Page::from_html("<input id='field'>")?;
    let hits = Rc::new(RefCell::new(0));
    let sink = Rc::clone(&hits);
    page.add_document_listener("focus", false, move |_: &mut Event| {
        *sink.borrow_mut() += 1;
    });

    let event = page.dispatch("#field", "focus")?;
    assert!(!event.bubbles());
    assert_eq!(*hits.borrow(), 0);

    page.dispatch_with(
        "#field",
        "focus",
        EventInit {
            bubbles: true,
            cancelable: false,
        },
    )?;
    assert_eq!(*hits.borrow(), 1);
    Ok(())
}

#[test]
fn value_tracker_lookup_returns_the_attached_handle() -> Result<()> {
    let mut page = Page::from_html("<input id='field' value='seed'><input id='other'>")?;
    assert!(page.value_tracker("#field")?.is_none());
    let tracker = page.attach_value_tracker("#field")?;
    assert_eq!(tracker.value(), "seed");
    let looked_up = page.value_tracker("#field")?;
    assert_eq!(looked_up.map(|tracker| tracker.value()), Some("seed".to_string()));
    assert!(page.value_tracker("#other")?.is_none());
    Ok(())
}
