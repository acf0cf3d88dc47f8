//! Seed vault normalization.
//!
//! Vaults are free-form YAML, but each domain uses a recognisable set of
//! container keys. [`VaultKind`] names those shapes; each kind knows which
//! seed names it exposes. [`find_seed`] resolves a seed by name and
//! [`SeedAttributes`] pulls out the optional fields worth displaying.
//!
//! Key presence follows loose truthiness: `null`, `false`, `0`, `""` count
//! as absent, while any list or mapping (even empty) counts as present.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The recognised vault shapes, checked in declaration order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VaultKind {
    /// `components`, `hooks`
    Frontend,
    /// `api_routes`, `services`
    Backend,
    /// `auth_model`, `scopes`, `roles`
    Auth,
    /// `types`, `api_responses`, `sse_events`
    Data,
    /// `config_files`, `constants`, `build_tools`
    Config,
    /// `test_framework`, `recommended_setup`
    Testing,
    /// Anything else: every top-level key is a seed.
    Generic,
}

/// Containers searched by [`find_seed`], in order.
const SEED_CONTAINERS: &[&str] = &[
    "components",
    "hooks",
    "api_routes",
    "services",
    "scopes",
    "roles",
    "types",
    "api_responses",
    "sse_events",
    "config_files",
    "design_tokens",
];

impl VaultKind {
    pub fn detect(content: &Value) -> Self {
        let Some(obj) = content.as_object() else {
            return Self::Generic;
        };
        let any = |keys: &[&str]| keys.iter().any(|k| has(obj, k));

        if any(&["components", "hooks"]) {
            Self::Frontend
        } else if any(&["api_routes", "services"]) {
            Self::Backend
        } else if any(&["auth_model", "scopes", "roles"]) {
            Self::Auth
        } else if any(&["types", "api_responses"]) {
            Self::Data
        } else if any(&["config_files", "constants", "build_tools"]) {
            Self::Config
        } else if any(&["test_framework", "recommended_setup"]) {
            Self::Testing
        } else {
            Self::Generic
        }
    }

    /// Seed names this kind exposes from `content`, in display order.
    pub fn seed_names(self, content: &Value) -> Vec<String> {
        let Some(obj) = content.as_object() else {
            return Vec::new();
        };

        let mut names = Vec::new();
        match self {
            Self::Frontend => {
                extend_keys(&mut names, obj, "components");
                extend_keys(&mut names, obj, "hooks");
            }
            Self::Backend => {
                extend_keys(&mut names, obj, "api_routes");
                extend_keys(&mut names, obj, "services");
            }
            Self::Auth => {
                push_if_present(&mut names, obj, "auth_model");
                push_if_present(&mut names, obj, "cors");
                push_if_present(&mut names, obj, "security_headers");
                extend_keys(&mut names, obj, "scopes");
                extend_keys(&mut names, obj, "roles");
            }
            Self::Data => {
                extend_keys(&mut names, obj, "types");
                extend_keys(&mut names, obj, "api_responses");
                extend_keys(&mut names, obj, "sse_events");
            }
            Self::Config => {
                extend_keys(&mut names, obj, "config_files");
                push_if_present(&mut names, obj, "constants");
                push_if_present(&mut names, obj, "build_tools");
                push_if_present(&mut names, obj, "scripts");
            }
            Self::Testing => {
                names.push("test_framework".to_string());
                push_if_present(&mut names, obj, "recommended_setup");
                push_if_present(&mut names, obj, "recommended_structure");
            }
            Self::Generic => names.extend(obj.keys().cloned()),
        }
        names
    }
}

/// Detect the vault kind and list its seeds.
pub fn seed_names(content: &Value) -> Vec<String> {
    VaultKind::detect(content).seed_names(content)
}

/// A seed located inside a vault document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeedRef<'a> {
    /// `None` for seeds that are top-level keys (`auth_model`, `constants`, ...).
    pub container: Option<&'static str>,
    pub value: &'a Value,
}

pub fn find_seed<'a>(content: &'a Value, name: &str) -> Option<SeedRef<'a>> {
    let obj = content.as_object()?;

    for container in SEED_CONTAINERS {
        if let Some(value) = obj
            .get(*container)
            .and_then(Value::as_object)
            .and_then(|c| c.get(name))
            .filter(|v| truthy(v))
        {
            return Some(SeedRef {
                container: Some(*container),
                value,
            });
        }
    }

    obj.get(name).filter(|v| truthy(v)).map(|value| SeedRef {
        container: None,
        value,
    })
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn has(obj: &Map<String, Value>, key: &str) -> bool {
    obj.get(key).map(truthy).unwrap_or(false)
}

fn extend_keys(names: &mut Vec<String>, obj: &Map<String, Value>, container: &str) {
    if let Some(inner) = obj.get(container).and_then(Value::as_object) {
        names.extend(inner.keys().cloned());
    }
}

fn push_if_present(names: &mut Vec<String>, obj: &Map<String, Value>, key: &str) {
    if has(obj, key) {
        names.push(key.to_string());
    }
}

// ============================================================
// Seed attributes
// ============================================================

/// The displayable subset of a seed. Every field is optional; seeds carry
/// whichever ones their domain uses.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeedAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when_to_use: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub props: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variants: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub responsibilities: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub forbidden: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub forbidden_extensions: Vec<String>,
}

impl SeedAttributes {
    pub fn from_seed(seed: &Value) -> Self {
        let text = |key: &str| seed.get(key).filter(|v| truthy(v)).map(display);
        let list = |key: &str| {
            seed.get(key)
                .and_then(Value::as_array)
                .map(|items| items.iter().map(display).collect::<Vec<String>>())
                .unwrap_or_default()
        };

        Self {
            location: text("location"),
            when_to_use: text("when_to_use"),
            purpose: text("purpose"),
            props: list("props"),
            variants: list("variants"),
            responsibilities: list("responsibilities"),
            scopes: list("scopes"),
            auth_required: seed.get("auth_required").and_then(Value::as_bool),
            returns: text("returns"),
            forbidden: list("forbidden"),
            forbidden_extensions: list("forbidden_extensions"),
        }
    }

    /// Display sections for the attributes that are present, in page order.
    pub fn sections(&self) -> Vec<Section> {
        let mut sections = Vec::new();
        let mut text = |title, value: &Option<String>, code: bool| {
            if let Some(v) = value {
                let body = if code {
                    SectionBody::Code(v.clone())
                } else {
                    SectionBody::Text(v.clone())
                };
                sections.push(Section::new(title, body));
            }
        };
        text("Location", &self.location, true);
        text("When to use", &self.when_to_use, false);
        text("Purpose", &self.purpose, false);

        let tags = |title, items: &[String]| {
            (!items.is_empty()).then(|| Section::new(title, SectionBody::Tags(items.to_vec())))
        };
        let list = |title, items: &[String]| {
            (!items.is_empty()).then(|| Section::new(title, SectionBody::List(items.to_vec())))
        };

        sections.extend(tags("Props", &self.props));
        sections.extend(tags("Variants", &self.variants));
        sections.extend(list("Responsibilities", &self.responsibilities));
        sections.extend(tags("Required Scopes", &self.scopes));
        if let Some(required) = self.auth_required {
            sections.push(Section::new("Authentication", SectionBody::Flag(required)));
        }
        if let Some(returns) = &self.returns {
            sections.push(Section::new("Returns", SectionBody::Code(returns.clone())));
        }
        sections.extend(
            list("Forbidden Extensions", &self.forbidden_extensions).map(Section::danger),
        );
        sections.extend(list("Forbidden", &self.forbidden).map(Section::danger));
        sections
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub title: &'static str,
    pub body: SectionBody,
    pub danger: bool,
}

impl Section {
    fn new(title: &'static str, body: SectionBody) -> Self {
        Self {
            title,
            body,
            danger: false,
        }
    }

    fn danger(mut self) -> Self {
        self.danger = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionBody {
    Text(String),
    Code(String),
    Tags(Vec<String>),
    List(Vec<String>),
    Flag(bool),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn frontend_lists_components_then_hooks() {
        let vault = json!({
            "components": {"Button": {}, "Card": {}},
            "hooks": {"useAuth": {}},
            "design_tokens": {"colors": {}}
        });
        assert_eq!(VaultKind::detect(&vault), VaultKind::Frontend);
        assert_eq!(seed_names(&vault), vec!["Button", "Card", "useAuth"]);
    }

    #[test]
    fn auth_lists_top_level_sections_before_scopes_and_roles() {
        let vault = json!({
            "roles": {"admin": {}},
            "scopes": {"read:vaults": {}},
            "cors": {"origins": ["*"]},
            "auth_model": {"type": "jwt"}
        });
        assert_eq!(VaultKind::detect(&vault), VaultKind::Auth);
        assert_eq!(
            seed_names(&vault),
            vec!["auth_model", "cors", "read:vaults", "admin"]
        );
    }

    #[test]
    fn config_and_testing_expose_fixed_names() {
        let config = json!({
            "config_files": {"tsconfig": {}},
            "constants": {"PORT": 1},
            "scripts": ["dev"]
        });
        assert_eq!(VaultKind::detect(&config), VaultKind::Config);
        assert_eq!(seed_names(&config), vec!["tsconfig", "constants", "scripts"]);

        let testing = json!({"recommended_setup": {"runner": "vitest"}});
        assert_eq!(VaultKind::detect(&testing), VaultKind::Testing);
        assert_eq!(
            seed_names(&testing),
            vec!["test_framework", "recommended_setup"]
        );
    }

    #[test]
    fn falsy_containers_do_not_select_a_kind() {
        let vault = json!({"components": null, "api_routes": {"GET /api/vaults": {}}});
        assert_eq!(VaultKind::detect(&vault), VaultKind::Backend);
    }

    #[test]
    fn generic_vault_uses_top_level_keys() {
        let vault = json!({"glossary": {}, "links": []});
        assert_eq!(VaultKind::detect(&vault), VaultKind::Generic);
        assert_eq!(seed_names(&vault), vec!["glossary", "links"]);
        assert!(seed_names(&json!(["not", "a", "mapping"])).is_empty());
    }

    #[test]
    fn find_seed_prefers_containers_over_top_level() {
        let vault = json!({
            "components": {"Button": {"location": "src/Button.tsx"}},
            "auth_model": {"type": "session"}
        });

        let button = find_seed(&vault, "Button").unwrap();
        assert_eq!(button.container, Some("components"));
        assert_eq!(button.value["location"], "src/Button.tsx");

        let auth = find_seed(&vault, "auth_model").unwrap();
        assert_eq!(auth.container, None);

        assert!(find_seed(&vault, "Missing").is_none());
    }

    #[test]
    fn attributes_render_present_fields_in_page_order() {
        let seed = json!({
            "purpose": "List vaults",
            "scopes": ["read"],
            "auth_required": false,
            "returns": "VaultInfo[]",
            "forbidden": ["writes"],
            "props": []
        });
        let attrs = SeedAttributes::from_seed(&seed);
        let titles: Vec<_> = attrs.sections().iter().map(|s| s.title).collect();
        assert_eq!(
            titles,
            vec!["Purpose", "Required Scopes", "Authentication", "Returns", "Forbidden"]
        );

        let sections = attrs.sections();
        assert_eq!(sections[2].body, SectionBody::Flag(false));
        assert!(sections[4].danger);
    }

    #[test]
    fn non_string_list_items_are_displayed_as_json() {
        let attrs = SeedAttributes::from_seed(&json!({"variants": ["primary", 2, {"size": "sm"}]}));
        assert_eq!(attrs.variants, vec!["primary", "2", r#"{"size":"sm"}"#]);
    }
}
