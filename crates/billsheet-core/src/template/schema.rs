//! On-disk YAML layout of a template definition.

use std::collections::BTreeMap;

use serde::Deserialize;

/// A string or a list of strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl Default for OneOrMany {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

impl OneOrMany {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(s) => vec![s],
            Self::Many(v) => v,
        }
    }
}

/// One template as written in YAML.
#[derive(Debug, Clone, Deserialize)]
pub struct TemplateDef {
    pub issuer: Option<String>,

    pub name: Option<String>,

    #[serde(default)]
    pub keywords: OneOrMany,

    #[serde(default)]
    pub exclude_keywords: OneOrMany,

    #[serde(default)]
    pub fields: BTreeMap<String, FieldDef>,

    pub required_fields: Option<Vec<String>>,

    #[serde(default)]
    pub options: OptionsDef,
}

/// A field rule: a bare regex (or list), a typed rule, or a literal.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FieldDef {
    Pattern(OneOrMany),
    Spec(FieldSpec),
    Literal(serde_yaml::Value),
}

/// Typed field rule.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldSpec {
    #[serde(default = "default_parser")]
    pub parser: String,

    pub regex: Option<OneOrMany>,

    pub value: Option<serde_yaml::Value>,

    #[serde(rename = "type")]
    pub value_type: Option<String>,

    pub group: Option<String>,
}

fn default_parser() -> String {
    "regex".to_string()
}

/// Template options.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OptionsDef {
    pub currency: String,
    pub date_formats: Vec<String>,
    pub decimal_separator: String,
    pub remove_whitespace: bool,
    pub remove_accents: bool,
    pub lowercase: bool,
    pub replace: Vec<(String, String)>,
}

impl Default for OptionsDef {
    fn default() -> Self {
        Self {
            currency: "EUR".to_string(),
            date_formats: Vec::new(),
            decimal_separator: ".".to_string(),
            remove_whitespace: false,
            remove_accents: false,
            lowercase: false,
            replace: Vec::new(),
        }
    }
}
