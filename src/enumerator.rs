use crate::dom::{Descendants, Dom, NodeId};
use crate::selector::{SelectorPart, parse_selector_groups};
use crate::Result;

pub(crate) const CANDIDATE_SELECTOR: &str = "input, textarea, select";

/// Lazy document-order walk over fillable form controls.
///
/// Calling [`crate::Page::candidate_fields`] again restarts the walk from
/// the document root.
pub struct CandidateFields<'a> {
    dom: &'a Dom,
    walker: Descendants<'a>,
    groups: Vec<Vec<SelectorPart>>,
}

impl<'a> CandidateFields<'a> {
    pub(crate) fn new(dom: &'a Dom) -> Result<Self> {
        Ok(Self {
            dom,
            walker: dom.descendants(dom.root),
            groups: parse_selector_groups(CANDIDATE_SELECTOR)?,
        })
    }
}

impl Iterator for CandidateFields<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let dom = self.dom;
        self.walker.by_ref().find(|node| {
            dom.matches_groups(*node, &self.groups)
                && !is_file_field(dom, *node)
                && !is_hidden(dom, *node)
        })
    }
}

/// Value of the DOM `type` property for a form control.
pub(crate) fn control_type(dom: &Dom, node: NodeId) -> String {
    match dom.tag_name(node).map(str::to_ascii_lowercase).as_deref() {
        Some("input") => dom
            .attr(node, "type")
            .map(str::to_ascii_lowercase)
            .filter(|kind| !kind.is_empty())
            .unwrap_or_else(|| "text".to_string()),
        Some("textarea") => "textarea".to_string(),
        Some("select") => {
            if dom.has_attr(node, "multiple") {
                "select-multiple".to_string()
            } else {
                "select-one".to_string()
            }
        }
        _ => String::new(),
    }
}

pub(crate) fn is_file_field(dom: &Dom, node: NodeId) -> bool {
    control_type(dom, node) == "file"
}

pub(crate) fn is_hidden(dom: &Dom, node: NodeId) -> bool {
    control_type(dom, node) == "hidden"
        || dom.inline_style(node, "display").as_deref() == Some("none")
        || dom.inline_style(node, "visibility").as_deref() == Some("hidden")
        || dom.attr(node, "aria-hidden") == Some("true")
}
