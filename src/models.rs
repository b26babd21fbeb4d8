//! Model-name remapping and the static model catalog served on `/v1/models`.

use serde::Serialize;
use std::collections::HashMap;
use std::hash::BuildHasher;

const CATALOG_CREATED: u64 = 1_677_610_602;

/// Source-API model names that are rewritten to a Gemini model.
const MODEL_MAP: &[(&str, &str)] = &[
    ("gpt-3.5-turbo", "gemini-1.0-pro"),
    ("gpt-4", "gemini-1.5-pro"),
    ("gpt-4-turbo", "gemini-1.5-flash"),
    ("gpt-4o", "gemini-1.5-flash"),
    ("gpt-4o-mini", "gemini-1.5-pro"),
];

const CATALOG: &[&str] = &["gemini-1.5-pro", "gemini-1.5-flash", "gemini-1.0-pro"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelCard {
    pub id: &'static str,
    pub object: &'static str,
    pub created: u64,
    pub owned_by: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelList {
    pub object: &'static str,
    pub data: Vec<ModelCard>,
}

/// Map a requested model name to the provider model. Configured overrides win over the
/// built-in table; unknown names pass through unchanged.
pub fn resolve_model<S: BuildHasher>(requested: &str, overrides: &HashMap<String, String, S>) -> String {
    if let Some(target) = overrides.get(requested) {
        return target.clone();
    }
    MODEL_MAP
        .iter()
        .find(|(from, _)| *from == requested)
        .map_or_else(|| requested.to_string(), |(_, to)| (*to).to_string())
}

#[must_use]
pub fn model_catalog() -> ModelList {
    ModelList {
        object: "list",
        data: CATALOG
            .iter()
            .copied()
            .map(|id| ModelCard {
                id,
                object: "model",
                created: CATALOG_CREATED,
                owned_by: "google",
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_mapping() {
        let none = HashMap::new();
        assert_eq!(resolve_model("gpt-4o", &none), "gemini-1.5-flash");
        assert_eq!(resolve_model("gpt-3.5-turbo", &none), "gemini-1.0-pro");
        assert_eq!(resolve_model("gpt-4o-mini", &none), "gemini-1.5-pro");
    }

    #[test]
    fn test_unknown_model_passes_through() {
        assert_eq!(
            resolve_model("gemini-2.0-flash", &HashMap::new()),
            "gemini-2.0-flash"
        );
    }

    #[test]
    fn test_override_wins() {
        let mut overrides = HashMap::new();
        overrides.insert("gpt-4o".to_string(), "gemini-2.5-pro".to_string());
        assert_eq!(resolve_model("gpt-4o", &overrides), "gemini-2.5-pro");
    }

    #[test]
    fn test_catalog_has_three_google_models() {
        let list = model_catalog();
        assert_eq!(list.object, "list");
        let ids: Vec<_> = list.data.iter().map(|m| m.id).collect();
        assert_eq!(ids, ["gemini-1.5-pro", "gemini-1.5-flash", "gemini-1.0-pro"]);
        assert!(list
            .data
            .iter()
            .all(|m| m.owned_by == "google" && m.created == 1_677_610_602 && m.object == "model"));
    }
}
