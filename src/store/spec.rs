use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one repertoire as (owner, context, name).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepertoireSpec {
    pub user_id: String,
    pub context: String,
    pub name: String,
}

impl RepertoireSpec {
    pub fn new(user_id: &str, context: &str, name: &str) -> Self {
        RepertoireSpec {
            user_id: user_id.to_string(),
            context: context.to_string(),
            name: name.to_string(),
        }
    }

    /// Partial-override merge: empty fields inherit from `fallback`. Used
    /// when copying or moving between owners or contexts, where the caller
    /// only names what changes.
    pub fn with_fallback(&self, fallback: &RepertoireSpec) -> RepertoireSpec {
        let pick = |ours: &str, theirs: &str| {
            if ours.is_empty() {
                theirs.to_string()
            } else {
                ours.to_string()
            }
        };

        RepertoireSpec {
            user_id: pick(&self.user_id, &fallback.user_id),
            context: pick(&self.context, &fallback.context),
            name: pick(&self.name, &fallback.name),
        }
    }
}

impl fmt::Display for RepertoireSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.user_id, self.context, self.name)
    }
}
