//! Profile-driven form autofill over a deterministic in-process DOM.
//!
//! A [`Page`] is built from HTML markup. [`Page::autofill`] walks its form
//! controls, classifies each one from its metadata (name, id, placeholder,
//! autocomplete, class, `aria-label`, `data-testid`) against a [`Profile`],
//! and writes matching values the way reactive UI frameworks expect to see
//! them: through the base value setter, with the framework's value tracker
//! rewound, followed by bubbling `input`, `change` and `blur` events.

use std::error::Error as StdError;
use std::fmt;

mod classifier;
mod dom;
mod enumerator;
mod events;
mod framework;
mod html;
mod injector;
mod message;
mod page;
mod pattern;
mod profile;
mod selector;

pub use classifier::{Classification, FieldKind, FieldMetadata};
pub use dom::NodeId;
pub use enumerator::CandidateFields;
pub use events::{Event, EventInit};
pub use framework::{ValueInterceptor, ValueTracker};
pub use injector::ControlKind;
pub use message::{AutofillRequest, AutofillResponse, FillStatus, FrameContext};
pub use page::{FillReport, Page};
pub use profile::Profile;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    HtmlParse(String),
    SelectorNotFound(String),
    UnsupportedSelector(String),
    Pattern(String),
    Message(String),
    Config(String),
    TypeMismatch {
        selector: String,
        expected: String,
        actual: String,
    },
    AssertionFailed {
        selector: String,
        expected: String,
        actual: String,
        dom_snippet: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HtmlParse(msg) => write!(f, "html parse error: {msg}"),
            Self::SelectorNotFound(selector) => write!(f, "selector not found: {selector}"),
            Self::UnsupportedSelector(selector) => write!(f, "unsupported selector: {selector}"),
            Self::Pattern(msg) => write!(f, "pattern error: {msg}"),
            Self::Message(msg) => write!(f, "message error: {msg}"),
            Self::Config(msg) => write!(f, "config error: {msg}"),
            Self::TypeMismatch {
                selector,
                expected,
                actual,
            } => write!(
                f,
                "type mismatch for {selector}: expected {expected}, actual {actual}"
            ),
            Self::AssertionFailed {
                selector,
                expected,
                actual,
                dom_snippet,
            } => write!(
                f,
                "assertion failed for {selector}: expected {expected}, actual {actual}, snippet {dom_snippet}"
            ),
        }
    }
}

impl StdError for Error {}
