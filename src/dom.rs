use std::collections::HashMap;
use std::fmt;

use crate::framework::{SharedInterceptor, ValueTracker};
use crate::{Error, Result};

/// Opaque handle to a node of a [`crate::Page`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

#[derive(Debug)]
pub(crate) enum NodeType {
    Document,
    Element(Element),
    Text(String),
}

#[derive(Debug)]
pub(crate) struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) node_type: NodeType,
}

pub(crate) struct Element {
    pub(crate) tag_name: String,
    pub(crate) attrs: HashMap<String, String>,
    pub(crate) value: String,
    pub(crate) interceptor: Option<SharedInterceptor>,
    pub(crate) tracker: Option<ValueTracker>,
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("tag_name", &self.tag_name)
            .field("attrs", &self.attrs)
            .field("value", &self.value)
            .field("interceptor", &self.interceptor.is_some())
            .field("tracker", &self.tracker)
            .finish()
    }
}

#[derive(Debug)]
pub(crate) struct Dom {
    pub(crate) nodes: Vec<Node>,
    pub(crate) root: NodeId,
    id_index: HashMap<String, NodeId>,
}

impl Dom {
    pub(crate) fn new() -> Self {
        let root = Node {
            parent: None,
            children: Vec::new(),
            node_type: NodeType::Document,
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
            id_index: HashMap::new(),
        }
    }

    fn create_node(&mut self, parent: Option<NodeId>, node_type: NodeType) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent,
            children: Vec::new(),
            node_type,
        });
        if let Some(parent_id) = parent {
            self.nodes[parent_id.0].children.push(id);
        }
        id
    }

    pub(crate) fn create_element(
        &mut self,
        parent: NodeId,
        tag_name: String,
        attrs: HashMap<String, String>,
    ) -> NodeId {
        let value = attrs.get("value").cloned().unwrap_or_default();
        let id_attr = attrs.get("id").filter(|id| !id.is_empty()).cloned();
        let element = Element {
            tag_name,
            attrs,
            value,
            interceptor: None,
            tracker: None,
        };
        let id = self.create_node(Some(parent), NodeType::Element(element));
        if let Some(id_attr) = id_attr {
            // First element wins, like getElementById.
            self.id_index.entry(id_attr).or_insert(id);
        }
        id
    }

    pub(crate) fn create_text(&mut self, parent: NodeId, text: String) -> NodeId {
        self.create_node(Some(parent), NodeType::Text(text))
    }

    pub(crate) fn is_valid_node(&self, node_id: NodeId) -> bool {
        node_id.0 < self.nodes.len()
    }

    pub(crate) fn element(&self, node_id: NodeId) -> Option<&Element> {
        match &self.nodes.get(node_id.0)?.node_type {
            NodeType::Element(element) => Some(element),
            _ => None,
        }
    }

    pub(crate) fn element_mut(&mut self, node_id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes.get_mut(node_id.0)?.node_type {
            NodeType::Element(element) => Some(element),
            _ => None,
        }
    }

    pub(crate) fn tag_name(&self, node_id: NodeId) -> Option<&str> {
        self.element(node_id).map(|e| e.tag_name.as_str())
    }

    pub(crate) fn parent(&self, node_id: NodeId) -> Option<NodeId> {
        self.nodes.get(node_id.0)?.parent
    }

    pub(crate) fn by_id(&self, id: &str) -> Option<NodeId> {
        self.id_index.get(id).copied()
    }

    pub(crate) fn attr(&self, node_id: NodeId, name: &str) -> Option<&str> {
        self.element(node_id)
            .and_then(|e| e.attrs.get(name))
            .map(String::as_str)
    }

    pub(crate) fn has_attr(&self, node_id: NodeId, name: &str) -> bool {
        self.element(node_id)
            .is_some_and(|e| e.attrs.contains_key(&name.to_ascii_lowercase()))
    }

    pub(crate) fn text_content(&self, node_id: NodeId) -> String {
        stacker::maybe_grow(64 * 1024, 2 * 1024 * 1024, || {
            match &self.nodes[node_id.0].node_type {
                NodeType::Document | NodeType::Element(_) => {
                    let mut out = String::new();
                    for child in &self.nodes[node_id.0].children {
                        out.push_str(&self.text_content(*child));
                    }
                    out
                }
                NodeType::Text(text) => text.clone(),
            }
        })
    }

    /// Element nodes below `root` in document order, `root` excluded.
    pub(crate) fn descendants(&self, root: NodeId) -> Descendants<'_> {
        let mut stack = Vec::new();
        if let Some(node) = self.nodes.get(root.0) {
            stack.extend(node.children.iter().rev().copied());
        }
        Descendants { dom: self, stack }
    }

    pub(crate) fn value(&self, node_id: NodeId) -> Result<String> {
        let element = self
            .element(node_id)
            .ok_or_else(|| Error::TypeMismatch {
                selector: format!("node-{}", node_id.0),
                expected: "element".into(),
                actual: "non-element".into(),
            })?;
        Ok(element.value.clone())
    }

    /// Writes the value slot directly. Selects pick the matching option.
    pub(crate) fn set_value(&mut self, node_id: NodeId, value: &str) -> Result<()> {
        if self
            .tag_name(node_id)
            .is_some_and(|tag| tag.eq_ignore_ascii_case("select"))
        {
            return self.set_select_value(node_id, value);
        }

        let element = self
            .element_mut(node_id)
            .ok_or_else(|| Error::TypeMismatch {
                selector: format!("node-{}", node_id.0),
                expected: "element".into(),
                actual: "non-element".into(),
            })?;
        element.value = value.to_string();
        Ok(())
    }

    pub(crate) fn initialize_form_control_values(&mut self) -> Result<()> {
        let nodes = self.descendants(self.root).collect::<Vec<_>>();
        for node in nodes {
            let Some(tag) = self.tag_name(node).map(str::to_ascii_lowercase) else {
                continue;
            };
            match tag.as_str() {
                "textarea" => {
                    let text = self.text_content(node);
                    if let Some(element) = self.element_mut(node) {
                        element.value = text;
                    }
                }
                "select" => self.sync_select_value(node)?,
                _ => {}
            }
        }
        Ok(())
    }

    /// First option of `select_node` whose effective value is `requested`.
    pub(crate) fn matching_option(&self, select_node: NodeId, requested: &str) -> Option<NodeId> {
        self.select_options(select_node)
            .into_iter()
            .find(|option| self.option_effective_value(*option) == requested)
    }

    fn set_select_value(&mut self, select_node: NodeId, requested: &str) -> Result<()> {
        let matched = self.matching_option(select_node, requested);

        for option in self.select_options(select_node) {
            if let Some(element) = self.element_mut(option) {
                if Some(option) == matched {
                    element
                        .attrs
                        .insert("selected".to_string(), String::new());
                } else {
                    element.attrs.remove("selected");
                }
            }
        }

        let value = matched
            .map(|option| self.option_effective_value(option))
            .unwrap_or_default();
        if let Some(element) = self.element_mut(select_node) {
            element.value = value;
        }
        Ok(())
    }

    fn sync_select_value(&mut self, select_node: NodeId) -> Result<()> {
        let options = self.select_options(select_node);
        let selected = options
            .iter()
            .copied()
            .find(|option| self.has_attr(*option, "selected"))
            .or_else(|| options.first().copied());
        let value = selected
            .map(|option| self.option_effective_value(option))
            .unwrap_or_default();
        let element = self
            .element_mut(select_node)
            .ok_or_else(|| Error::HtmlParse("select target is not an element".into()))?;
        element.value = value;
        Ok(())
    }

    fn select_options(&self, select_node: NodeId) -> Vec<NodeId> {
        self.descendants(select_node)
            .filter(|node| {
                self.tag_name(*node)
                    .is_some_and(|tag| tag.eq_ignore_ascii_case("option"))
            })
            .collect()
    }

    fn option_effective_value(&self, option_node: NodeId) -> String {
        match self.attr(option_node, "value") {
            Some(value) => value.to_string(),
            None => self.text_content(option_node).trim().to_string(),
        }
    }

    /// Last declaration of `property` in the element's inline `style`.
    pub(crate) fn inline_style(&self, node_id: NodeId, property: &str) -> Option<String> {
        parse_style_declarations(self.attr(node_id, "style"))
            .into_iter()
            .find(|(name, _)| name == property)
            .map(|(_, value)| value)
    }

    pub(crate) fn dump_node(&self, node_id: NodeId) -> String {
        stacker::maybe_grow(64 * 1024, 2 * 1024 * 1024, || {
            match &self.nodes[node_id.0].node_type {
                NodeType::Document => {
                    let mut out = String::new();
                    for child in &self.nodes[node_id.0].children {
                        out.push_str(&self.dump_node(*child));
                    }
                    out
                }
                NodeType::Text(text) => text.clone(),
                NodeType::Element(element) => {
                    let mut out = String::new();
                    out.push('<');
                    out.push_str(&element.tag_name);
                    let mut attrs = element.attrs.iter().collect::<Vec<_>>();
                    attrs.sort();
                    for (k, v) in attrs {
                        out.push(' ');
                        out.push_str(k);
                        out.push_str("=\"");
                        out.push_str(v);
                        out.push('"');
                    }
                    out.push('>');
                    for child in &self.nodes[node_id.0].children {
                        out.push_str(&self.dump_node(*child));
                    }
                    out.push_str("</");
                    out.push_str(&element.tag_name);
                    out.push('>');
                    out
                }
            }
        })
    }
}

/// Lazy pre-order walk over element nodes.
pub(crate) struct Descendants<'a> {
    dom: &'a Dom,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        while let Some(node) = self.stack.pop() {
            let entry = &self.dom.nodes[node.0];
            self.stack.extend(entry.children.iter().rev().copied());
            if matches!(entry.node_type, NodeType::Element(_)) {
                return Some(node);
            }
        }
        None
    }
}

pub(crate) fn has_class(element: &Element, class_name: &str) -> bool {
    element
        .attrs
        .get("class")
        .map(|classes| classes.split_whitespace().any(|c| c == class_name))
        .unwrap_or(false)
}

pub(crate) fn parse_style_declarations(style_attr: Option<&str>) -> Vec<(String, String)> {
    let mut out: Vec<(String, String)> = Vec::new();
    let Some(style_attr) = style_attr else {
        return out;
    };

    for decl in style_attr.split(';') {
        let decl = decl.trim();
        if decl.is_empty() {
            continue;
        }
        let Some((name, value)) = decl.split_once(':') else {
            continue;
        };
        let name = name.trim().to_ascii_lowercase();
        if name.is_empty() {
            continue;
        }
        let value = value.trim();
        let value = value
            .strip_suffix("!important")
            .map(str::trim_end)
            .unwrap_or(value)
            .to_ascii_lowercase();
        if let Some(pos) = out.iter().position(|(existing, _)| existing == &name) {
            out[pos].1 = value;
        } else {
            out.push((name, value));
        }
    }

    out
}

pub(crate) fn truncate_chars(value: &str, max_chars: usize) -> String {
    let mut out = value.chars().take(max_chars).collect::<String>();
    if value.chars().nth(max_chars).is_some() {
        out.push_str("...");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::parse_html;

    #[test]
    fn descendants_follow_document_order() -> Result<()> {
        let dom = parse_html("<div id='a'><p id='b'><i id='c'></i></p></div><span id='d'></span>")?;
        let ids = dom
            .descendants(dom.root)
            .filter_map(|node| dom.attr(node, "id").map(ToOwned::to_owned))
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);
        Ok(())
    }

    #[test]
    fn descendants_walk_is_restartable() -> Result<()> {
        let dom = parse_html("<input><textarea></textarea><select></select>")?;
        let first = dom.descendants(dom.root).collect::<Vec<_>>();
        let second = dom.descendants(dom.root).collect::<Vec<_>>();
        assert_eq!(first.len(), 3);
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn style_declarations_keep_last_value_and_drop_important() {
        let decls = parse_style_declarations(Some(
            "display: block; DISPLAY : None !important; visibility:Hidden",
        ));
        assert_eq!(
            decls,
            vec![
                ("display".to_string(), "none".to_string()),
                ("visibility".to_string(), "hidden".to_string()),
            ]
        );
    }

    #[test]
    fn select_value_follows_selected_option_or_first() -> Result<()> {
        let dom = parse_html(
            "<select id='a'><option>One</option><option value='2' selected>Two</option></select>\
             <select id='b'><option value='x'>X</option><option>Y</option></select>",
        )?;
        let a = dom.by_id("a").ok_or_else(|| Error::SelectorNotFound("#a".into()))?;
        let b = dom.by_id("b").ok_or_else(|| Error::SelectorNotFound("#b".into()))?;
        assert_eq!(dom.value(a)?, "2");
        assert_eq!(dom.value(b)?, "x");
        Ok(())
    }

    #[test]
    fn setting_select_value_without_matching_option_clears_it() -> Result<()> {
        let mut dom = parse_html("<select id='s'><option>One</option><option>Two</option></select>")?;
        let select = dom.by_id("s").ok_or_else(|| Error::SelectorNotFound("#s".into()))?;
        dom.set_value(select, "Two")?;
        assert_eq!(dom.value(select)?, "Two");
        dom.set_value(select, "Three")?;
        assert_eq!(dom.value(select)?, "");
        Ok(())
    }

    #[test]
    fn textarea_value_starts_from_text_content() -> Result<()> {
        let dom = parse_html("<textarea id='t'>hello</textarea>")?;
        let textarea = dom.by_id("t").ok_or_else(|| Error::SelectorNotFound("#t".into()))?;
        assert_eq!(dom.value(textarea)?, "hello");
        Ok(())
    }

    #[test]
    fn truncate_chars_marks_cut_text() {
        assert_eq!(truncate_chars("abcdef", 3), "abc...");
        assert_eq!(truncate_chars("abc", 3), "abc");
    }
}
