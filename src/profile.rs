use serde::{Deserialize, Serialize};

/// Values a fill pass may write. Any attribute may be absent; absent
/// attributes are written as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub skills: Option<String>,
    #[serde(default)]
    pub experience: Option<String>,
}

impl Profile {
    pub fn full_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or_default()
    }

    pub fn email(&self) -> &str {
        self.email.as_deref().unwrap_or_default()
    }

    pub fn phone(&self) -> &str {
        self.phone.as_deref().unwrap_or_default()
    }

    pub fn skills(&self) -> &str {
        self.skills.as_deref().unwrap_or_default()
    }

    pub fn experience(&self) -> &str {
        self.experience.as_deref().unwrap_or_default()
    }

    /// First whitespace-delimited token of the full name.
    pub fn first_name(&self) -> &str {
        self.full_name().split_whitespace().next().unwrap_or_default()
    }

    /// Last whitespace-delimited token of the full name, or empty when the
    /// name is a single token.
    pub fn last_name(&self) -> &str {
        let mut tokens = self.full_name().split_whitespace();
        let first = tokens.next();
        match (first, tokens.last()) {
            (Some(_), Some(last)) => last,
            _ => "",
        }
    }
}
