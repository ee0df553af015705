use std::fmt;

use crate::dom::{Dom, NodeId};
use crate::pattern::Pattern;
use crate::profile::Profile;
use crate::Result;

/// Profile attribute a field was recognised as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Email,
    Phone,
    FullName,
    FirstName,
    LastName,
    /// Bare "name" fallback, filled with the full name.
    Name,
    Skills,
    Experience,
}

impl FieldKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Phone => "phone",
            Self::FullName => "full_name",
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
            Self::Name => "name",
            Self::Skills => "skills",
            Self::Experience => "experience",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type Resolver = fn(&Profile) -> &str;

// Order matters: first match wins, and the bare "name" fallback must stay
// behind every rule that also contains "name".
const RULES: &[(FieldKind, &str, Option<&str>, Resolver)] = &[
    (FieldKind::Email, "email|e-mail", None, Profile::email),
    (
        FieldKind::Phone,
        "phone|tel|mobile|contact number",
        None,
        Profile::phone,
    ),
    (
        FieldKind::FullName,
        r"full\s*name|fullname",
        None,
        Profile::full_name,
    ),
    (
        FieldKind::FirstName,
        r"first\s*name|fname",
        None,
        Profile::first_name,
    ),
    (
        FieldKind::LastName,
        r"last\s*name|lname|surname",
        None,
        Profile::last_name,
    ),
    (
        FieldKind::Name,
        "name",
        Some("user|file|task|project|company"),
        Profile::full_name,
    ),
    (
        FieldKind::Skills,
        "skill|technolog|stack",
        None,
        Profile::skills,
    ),
    (
        FieldKind::Experience,
        "experience|history|cover|bio|about",
        None,
        Profile::experience,
    ),
];

struct Rule {
    kind: FieldKind,
    pattern: Pattern,
    exclude: Option<Pattern>,
    resolve: Resolver,
}

pub(crate) struct RuleMatch {
    pub(crate) kind: FieldKind,
    pub(crate) value: String,
    pub(crate) pattern: &'static str,
}

/// Ordered, first-match-wins rule table over normalized field metadata.
pub(crate) struct Classifier {
    rules: Vec<Rule>,
}

impl Classifier {
    pub(crate) fn new() -> Result<Self> {
        let mut rules = Vec::with_capacity(RULES.len());
        for &(kind, pattern, exclude, resolve) in RULES {
            rules.push(Rule {
                kind,
                pattern: Pattern::new(pattern)?,
                exclude: exclude.map(Pattern::new).transpose()?,
                resolve,
            });
        }
        Ok(Self { rules })
    }

    pub(crate) fn resolve(&self, metadata: &str, profile: &Profile) -> Result<Option<RuleMatch>> {
        for rule in &self.rules {
            if !rule.pattern.is_match(metadata)? {
                continue;
            }
            if let Some(exclude) = &rule.exclude {
                if exclude.is_match(metadata)? {
                    continue;
                }
            }
            return Ok(Some(RuleMatch {
                kind: rule.kind,
                value: (rule.resolve)(profile).to_string(),
                pattern: rule.pattern.as_str(),
            }));
        }
        Ok(None)
    }
}

/// Attributes a field is classified by. Missing attributes are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMetadata {
    pub name: String,
    pub id: String,
    pub placeholder: String,
    pub autocomplete: String,
    pub class_name: String,
    pub aria_label: String,
    pub test_id: String,
}

impl FieldMetadata {
    pub(crate) fn read(dom: &Dom, node: NodeId) -> Self {
        let attr = |name: &str| dom.attr(node, name).unwrap_or_default().to_string();
        // Selects have no placeholder property.
        let has_placeholder = dom.tag_name(node).is_some_and(|tag| {
            tag.eq_ignore_ascii_case("input") || tag.eq_ignore_ascii_case("textarea")
        });
        Self {
            name: attr("name"),
            id: attr("id"),
            placeholder: if has_placeholder {
                attr("placeholder")
            } else {
                String::new()
            },
            autocomplete: attr("autocomplete"),
            class_name: attr("class"),
            aria_label: attr("aria-label"),
            test_id: attr("data-testid"),
        }
    }

    /// Lowercased, space-joined metadata string the rules match against.
    pub fn normalized(&self) -> String {
        [
            self.name.as_str(),
            self.id.as_str(),
            self.placeholder.as_str(),
            self.autocomplete.as_str(),
            self.class_name.as_str(),
            self.aria_label.as_str(),
            self.test_id.as_str(),
        ]
        .join(" ")
        .to_lowercase()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    NoMatch,
    /// Recognised, and the field already held the resolved value.
    Unchanged { kind: FieldKind, value: String },
    /// Recognised and written.
    Filled { kind: FieldKind, value: String },
}

impl Classification {
    pub fn is_match(&self) -> bool {
        !matches!(self, Self::NoMatch)
    }

    pub fn is_filled(&self) -> bool {
        matches!(self, Self::Filled { .. })
    }

    pub fn kind(&self) -> Option<FieldKind> {
        match self {
            Self::NoMatch => None,
            Self::Unchanged { kind, .. } | Self::Filled { kind, .. } => Some(*kind),
        }
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            Self::NoMatch => None,
            Self::Unchanged { value, .. } | Self::Filled { value, .. } => Some(value),
        }
    }
}
