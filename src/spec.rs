//! Theme Specification Model
//!
//! The spec is the single input entity. Validation is pure: it collects
//! every offending field in one pass and never touches the filesystem.

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::platform::{Platform, UnsupportedPlatformError};

/// One offending field in a rejected spec.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Error)]
#[error("Spec validation failed: {}", field_summary(.fields))]
pub struct SpecValidationError {
    pub fields: Vec<FieldError>,
}

fn field_summary(fields: &[FieldError]) -> String {
    fields
        .iter()
        .map(|f| format!("{} ({})", f.field, f.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Spec rejection: either field-level validation or an unknown platform.
#[derive(Debug, Error)]
pub enum SpecError {
    #[error(transparent)]
    Validation(#[from] SpecValidationError),
    #[error(transparent)]
    UnsupportedPlatform(#[from] UnsupportedPlatformError),
}

/// Canonical page roles. Platform key vocabularies map onto these, so a
/// renderer never sees a foreign-platform layout key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutRole {
    Home,
    Single,
    Archive,
}

impl LayoutRole {
    /// Accepts both platform vocabularies: ghost says `post`/`tag`,
    /// wordpress says `single`/`archive`. Equivalent keys remap; anything
    /// else is dropped by the caller.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "home" | "homepage" => Some(Self::Home),
            "post" | "single" => Some(Self::Single),
            "tag" | "archive" => Some(Self::Archive),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutVariant {
    Grid,
    List,
    Minimal,
}

impl LayoutVariant {
    /// Unrecognized variants fall back to the default instead of failing
    /// the build.
    pub fn parse_or_default(value: &str) -> Self {
        match value {
            "grid" => Self::Grid,
            "list" => Self::List,
            "minimal" => Self::Minimal,
            _ => Self::default(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Grid => "grid",
            Self::List => "list",
            Self::Minimal => "minimal",
        }
    }
}

impl Default for LayoutVariant {
    fn default() -> Self {
        Self::List
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavItem {
    pub label: String,
    pub url: String,
}

/// Validated, normalized theme specification.
#[derive(Debug, Clone, Serialize)]
pub struct ThemeSpec {
    pub platform: Platform,
    pub project_name: String,
    pub version: semver::Version,
    pub description: String,
    pub author: String,
    pub layout: BTreeMap<LayoutRole, LayoutVariant>,
    pub colors: BTreeMap<String, String>,
    pub fonts: BTreeMap<String, String>,
    pub features: BTreeSet<String>,
    pub navigation: Vec<NavItem>,
    /// Unknown top-level fields, preserved but not interpreted.
    pub extra: Map<String, Value>,
}

const KNOWN_FIELDS: &[&str] = &[
    "platform",
    "projectName",
    "version",
    "description",
    "author",
    "layout",
    "colors",
    "fonts",
    "features",
    "navigation",
];

fn default_colors() -> BTreeMap<String, String> {
    [
        ("primary", "#1a1a1a"),
        ("accent", "#3eb0ef"),
        ("background", "#ffffff"),
        ("text", "#15171a"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn default_fonts() -> BTreeMap<String, String> {
    [
        ("heading", "Georgia, serif"),
        ("body", "Helvetica, Arial, sans-serif"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

impl ThemeSpec {
    /// Validate and normalize a raw spec document.
    ///
    /// Collects every missing/invalid required field before failing, so the
    /// caller sees the whole list in one error.
    pub fn from_value(raw: Value) -> Result<Self, SpecError> {
        let obj = match raw {
            Value::Object(map) => map,
            other => {
                return Err(SpecValidationError {
                    fields: vec![FieldError {
                        field: "$".to_string(),
                        message: format!("expected an object, got {}", type_name(&other)),
                    }],
                }
                .into())
            }
        };

        let mut fields = Vec::new();

        let platform_raw = match obj.get("platform") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(_) => {
                fields.push(FieldError {
                    field: "platform".into(),
                    message: "must be a string".into(),
                });
                None
            }
            None => {
                fields.push(FieldError {
                    field: "platform".into(),
                    message: "required".into(),
                });
                None
            }
        };

        let project_name = match obj.get("projectName") {
            Some(Value::String(s)) if !s.trim().is_empty() && slugify(s).is_empty() => {
                fields.push(FieldError {
                    field: "projectName".into(),
                    message: "must contain at least one alphanumeric character".into(),
                });
                None
            }
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Some(Value::String(_)) => {
                fields.push(FieldError {
                    field: "projectName".into(),
                    message: "must not be empty".into(),
                });
                None
            }
            Some(_) => {
                fields.push(FieldError {
                    field: "projectName".into(),
                    message: "must be a string".into(),
                });
                None
            }
            None => {
                fields.push(FieldError {
                    field: "projectName".into(),
                    message: "required".into(),
                });
                None
            }
        };

        let version = match obj.get("version") {
            Some(Value::String(s)) => match semver::Version::parse(s) {
                Ok(v) => Some(v),
                Err(e) => {
                    fields.push(FieldError {
                        field: "version".into(),
                        message: format!("invalid semver: {e}"),
                    });
                    None
                }
            },
            Some(_) => {
                fields.push(FieldError {
                    field: "version".into(),
                    message: "must be a semver string".into(),
                });
                None
            }
            None => None,
        };

        let navigation = match obj.get("navigation") {
            Some(Value::Array(items)) => {
                let mut nav = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    match parse_nav_item(item) {
                        Some(entry) => nav.push(entry),
                        None => fields.push(FieldError {
                            field: format!("navigation[{i}]"),
                            message: "must be an object with string label and url".into(),
                        }),
                    }
                }
                Some(nav)
            }
            Some(_) => {
                fields.push(FieldError {
                    field: "navigation".into(),
                    message: "must be an array".into(),
                });
                None
            }
            None => None,
        };

        if !fields.is_empty() {
            return Err(SpecValidationError { fields }.into());
        }

        // Unknown platform is a distinct error kind, checked only once the
        // field-level pass is clean.
        let platform = Platform::from_str(&platform_raw.unwrap_or_default())?;

        let layout = parse_layout(obj.get("layout"));
        let colors = merge_tokens(default_colors(), obj.get("colors"));
        let fonts = merge_tokens(default_fonts(), obj.get("fonts"));
        let features = parse_features(obj.get("features"));
        let description = string_field(&obj, "description")
            .unwrap_or_else(|| format!("A {} theme", platform.as_str()));
        let author = string_field(&obj, "author").unwrap_or_else(|| "ThemeForge".to_string());

        let extra: Map<String, Value> = obj
            .into_iter()
            .filter(|(k, _)| !KNOWN_FIELDS.contains(&k.as_str()))
            .collect();

        Ok(ThemeSpec {
            platform,
            project_name: project_name.unwrap_or_default(),
            version: version.unwrap_or_else(|| semver::Version::new(1, 0, 0)),
            description,
            author,
            layout,
            colors,
            fonts,
            features,
            navigation: navigation.unwrap_or_else(|| {
                vec![NavItem {
                    label: "Home".into(),
                    url: "/".into(),
                }]
            }),
            extra,
        })
    }

    /// Deterministic slug for this spec.
    pub fn slug(&self) -> String {
        slugify(&self.project_name)
    }

    /// Layout variant for a page role, defaulting when the spec is silent.
    pub fn variant(&self, role: LayoutRole) -> LayoutVariant {
        self.layout.get(&role).copied().unwrap_or_default()
    }

    pub fn has_feature(&self, flag: &str) -> bool {
        self.features.contains(flag)
    }
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(str::to_string)
}

fn parse_nav_item(item: &Value) -> Option<NavItem> {
    let obj = item.as_object()?;
    Some(NavItem {
        label: obj.get("label")?.as_str()?.to_string(),
        url: obj.get("url")?.as_str()?.to_string(),
    })
}

/// Foreign-platform keys remap to the local role when an equivalent exists
/// and are dropped otherwise; unrecognized variants fall back to the default.
fn parse_layout(value: Option<&Value>) -> BTreeMap<LayoutRole, LayoutVariant> {
    let mut layout = BTreeMap::new();
    if let Some(Value::Object(map)) = value {
        for (key, variant) in map {
            let Some(role) = LayoutRole::from_key(key) else {
                continue;
            };
            let variant = variant
                .as_str()
                .map(LayoutVariant::parse_or_default)
                .unwrap_or_default();
            layout.insert(role, variant);
        }
    }
    layout
}

fn merge_tokens(
    mut defaults: BTreeMap<String, String>,
    value: Option<&Value>,
) -> BTreeMap<String, String> {
    if let Some(Value::Object(map)) = value {
        for (key, v) in map {
            if let Some(s) = v.as_str() {
                defaults.insert(key.clone(), s.to_string());
            }
        }
    }
    defaults
}

/// Unknown flags are preserved and ignored by renderers, never errors.
fn parse_features(value: Option<&Value>) -> BTreeSet<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => BTreeSet::new(),
    }
}

/// Derive the filesystem/URL-safe identifier from a project name.
///
/// Lowercase; non-alphanumeric runs collapse to a single hyphen; no leading
/// or trailing hyphen.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }
    slug
}
