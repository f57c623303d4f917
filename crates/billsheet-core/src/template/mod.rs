//! Per-vendor invoice templates: loading, matching and field extraction.
//!
//! A template names an issuer, a set of keywords that identify its
//! invoices, and one regex rule per field. Templates are tried in
//! collection order and the first whose keywords all match wins.

mod loader;
mod schema;
pub mod values;

pub use loader::{parse_templates, read_templates, read_templates_from_dir};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use regex::Regex;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::error::{ExtractionError, TemplateError};
use crate::extraction::{RawExtraction, RawValue};
use schema::{FieldDef, FieldSpec, OptionsDef, TemplateDef};

/// Fields a template must produce unless it lists its own `required_fields`.
pub const DEFAULT_REQUIRED_FIELDS: &[&str] = &["date", "amount"];

/// A parsed, compiled template. Read-only once loaded.
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    issuer: String,
    source: PathBuf,
    keywords: Vec<Regex>,
    exclude_keywords: Vec<Regex>,
    fields: Vec<FieldRule>,
    required_fields: Vec<String>,
    options: TemplateOptions,
}

#[derive(Debug, Clone)]
struct TemplateOptions {
    currency: String,
    date_formats: Vec<String>,
    decimal_separator: char,
    remove_whitespace: bool,
    remove_accents: bool,
    lowercase: bool,
    replace: Vec<(Regex, String)>,
}

#[derive(Debug, Clone)]
struct FieldRule {
    name: String,
    kind: FieldKind,
}

#[derive(Debug, Clone)]
enum FieldKind {
    Static(RawValue),
    Regex {
        patterns: Vec<Regex>,
        value_type: ValueType,
        group: Group,
    },
}

/// Type a captured string is converted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueType {
    Text,
    Float,
    Int,
    Date,
    Percent,
}

/// How several matches of one field are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Group {
    First,
    Last,
    Sum,
}

impl Template {
    /// Compile a template definition. `name` is used when the definition
    /// has no `name` key.
    fn compile(def: TemplateDef, name: String, source: &Path) -> Result<Self, TemplateError> {
        let name = def.name.unwrap_or(name);
        let invalid = |reason: String| TemplateError::Invalid {
            name: name.clone(),
            path: source.to_path_buf(),
            reason,
        };

        let issuer = def
            .issuer
            .filter(|i| !i.trim().is_empty())
            .ok_or_else(|| invalid("missing 'issuer'".to_string()))?;

        let keywords = compile_all(def.keywords.into_vec()).map_err(&invalid)?;
        if keywords.is_empty() {
            return Err(invalid("'keywords' must not be empty".to_string()));
        }
        let exclude_keywords = compile_all(def.exclude_keywords.into_vec()).map_err(&invalid)?;

        if def.fields.is_empty() {
            return Err(invalid("'fields' must not be empty".to_string()));
        }
        let fields = def
            .fields
            .into_iter()
            .map(|(key, field)| compile_field(key, field))
            .collect::<Result<Vec<_>, _>>()
            .map_err(&invalid)?;

        let options = compile_options(def.options).map_err(&invalid)?;

        let required_fields = def.required_fields.unwrap_or_else(|| {
            DEFAULT_REQUIRED_FIELDS.iter().map(|f| f.to_string()).collect()
        });

        Ok(Self {
            name,
            issuer,
            source: source.to_path_buf(),
            keywords,
            exclude_keywords,
            fields,
            required_fields,
            options,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// File the template was loaded from.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Keyword patterns as written in the template.
    pub fn keywords(&self) -> Vec<&str> {
        self.keywords.iter().map(Regex::as_str).collect()
    }

    /// Names of the fields this template extracts.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Apply the template's text options before matching.
    pub fn prepare_input(&self, text: &str) -> String {
        let mut prepared = text.to_string();

        if self.options.remove_whitespace {
            prepared.retain(|c| !c.is_whitespace());
        }
        if self.options.remove_accents {
            prepared = strip_accents(&prepared);
        }
        if self.options.lowercase {
            prepared = prepared.to_lowercase();
        }
        for (pattern, replacement) in &self.options.replace {
            prepared = pattern
                .replace_all(&prepared, replacement.as_str())
                .into_owned();
        }

        prepared
    }

    /// True when every keyword and no exclude keyword is found.
    pub fn matches_input(&self, prepared: &str) -> bool {
        self.keywords.iter().all(|k| k.is_match(prepared))
            && !self.exclude_keywords.iter().any(|k| k.is_match(prepared))
    }

    /// Extract every field from prepared text.
    ///
    /// The result always carries `issuer`, `currency` and `desc`. Fails when
    /// a required field is missing.
    pub fn extract(&self, prepared: &str) -> Result<RawExtraction, ExtractionError> {
        let mut fields = BTreeMap::new();
        fields.insert("issuer".to_string(), RawValue::Text(self.issuer.clone()));
        fields.insert(
            "currency".to_string(),
            RawValue::Text(self.options.currency.clone()),
        );
        fields.insert(
            "desc".to_string(),
            RawValue::Text(format!("Invoice from {}", self.issuer)),
        );

        for rule in &self.fields {
            match &rule.kind {
                FieldKind::Static(value) => {
                    fields.insert(rule.name.clone(), value.clone());
                }
                FieldKind::Regex {
                    patterns,
                    value_type,
                    group,
                } => {
                    let captures: Vec<&str> = patterns
                        .iter()
                        .flat_map(|p| p.captures_iter(prepared))
                        .filter_map(|c| c.get(1).or_else(|| c.get(0)))
                        .map(|m| m.as_str().trim())
                        .filter(|s| !s.is_empty())
                        .collect();

                    if captures.is_empty() {
                        debug!("Field '{}' not found by template '{}'", rule.name, self.name);
                        continue;
                    }

                    let values: Vec<RawValue> = captures
                        .iter()
                        .filter_map(|raw| {
                            let value = self.coerce(raw, *value_type);
                            if value.is_none() {
                                warn!(
                                    "Field '{}': cannot read '{}' as {:?}",
                                    rule.name, raw, value_type
                                );
                            }
                            value
                        })
                        .collect();

                    let combined = combine(values, *group).map_err(|reason| {
                        ExtractionError::FieldValue {
                            template: self.name.clone(),
                            field: rule.name.clone(),
                            reason,
                        }
                    })?;
                    if let Some(value) = combined {
                        fields.insert(rule.name.clone(), value);
                    }
                }
            }
        }

        let missing: Vec<String> = self
            .required_fields
            .iter()
            .filter(|f| !fields.contains_key(f.as_str()))
            .cloned()
            .collect();

        if !missing.is_empty() {
            return Err(ExtractionError::MissingFields {
                template: self.name.clone(),
                missing,
            });
        }

        Ok(RawExtraction {
            template: self.name.clone(),
            fields,
        })
    }

    fn coerce(&self, raw: &str, value_type: ValueType) -> Option<RawValue> {
        let sep = self.options.decimal_separator;
        match value_type {
            ValueType::Text => Some(RawValue::Text(raw.to_string())),
            ValueType::Float => values::parse_number(raw, sep).map(RawValue::Number),
            ValueType::Int => values::parse_number(raw, sep).map(|n| RawValue::Number(n.trunc())),
            ValueType::Percent => values::parse_number(raw, sep).map(|n| {
                if raw.trim_end().ends_with('%') {
                    RawValue::Number(n)
                } else {
                    RawValue::Number(n / Decimal::ONE_HUNDRED)
                }
            }),
            ValueType::Date => {
                values::parse_date(raw, &self.options.date_formats).map(RawValue::Date)
            }
        }
    }
}

fn combine(values: Vec<RawValue>, group: Group) -> Result<Option<RawValue>, String> {
    match group {
        Group::First => Ok(values.into_iter().next()),
        Group::Last => Ok(values.into_iter().last()),
        Group::Sum => {
            let mut numbers = values.iter().filter_map(RawValue::as_number);
            let Some(first) = numbers.next() else {
                return Ok(None);
            };
            numbers
                .try_fold(first, |acc, n| acc.checked_add(n))
                .map(|total| Some(RawValue::Number(total)))
                .ok_or_else(|| "sum overflows".to_string())
        }
    }
}

fn compile_all(patterns: Vec<String>) -> Result<Vec<Regex>, String> {
    patterns
        .iter()
        .map(|p| Regex::new(p).map_err(|e| format!("bad regex '{}': {}", p, e)))
        .collect()
}

fn compile_field(key: String, field: FieldDef) -> Result<FieldRule, String> {
    match field {
        FieldDef::Pattern(patterns) => {
            if let Some(name) = key.strip_prefix("static_") {
                let literal = match patterns {
                    schema::OneOrMany::One(s) => s,
                    schema::OneOrMany::Many(v) => v.join(" "),
                };
                return Ok(FieldRule {
                    name: name.to_string(),
                    kind: FieldKind::Static(RawValue::Text(literal)),
                });
            }

            let (value_type, group) = legacy_type(&key);
            Ok(FieldRule {
                kind: FieldKind::Regex {
                    patterns: compile_all(patterns.into_vec())?,
                    value_type,
                    group,
                },
                name: key,
            })
        }
        FieldDef::Spec(spec) => compile_spec(key, spec),
        FieldDef::Literal(value) => {
            let name = key.strip_prefix("static_").unwrap_or(&key).to_string();
            Ok(FieldRule {
                kind: FieldKind::Static(literal_value(&value).ok_or_else(|| {
                    format!("field '{}': unsupported literal value", key)
                })?),
                name,
            })
        }
    }
}

fn compile_spec(key: String, spec: FieldSpec) -> Result<FieldRule, String> {
    match spec.parser.as_str() {
        "static" => {
            let value = spec
                .value
                .as_ref()
                .and_then(literal_value)
                .ok_or_else(|| format!("field '{}': static parser needs a scalar 'value'", key))?;
            Ok(FieldRule {
                name: key,
                kind: FieldKind::Static(value),
            })
        }
        "regex" => {
            let patterns = spec
                .regex
                .ok_or_else(|| format!("field '{}': regex parser needs 'regex'", key))?
                .into_vec();
            let (default_type, default_group) = legacy_type(&key);
            let value_type = match spec.value_type.as_deref() {
                None => default_type,
                Some("text") | Some("str") | Some("string") => ValueType::Text,
                Some("float") | Some("number") | Some("amount") => ValueType::Float,
                Some("int") | Some("integer") => ValueType::Int,
                Some("date") => ValueType::Date,
                Some("percent") | Some("percentage") => ValueType::Percent,
                Some(other) => return Err(format!("field '{}': unknown type '{}'", key, other)),
            };
            let group = match spec.group.as_deref() {
                None => default_group,
                Some("first") => Group::First,
                Some("last") => Group::Last,
                Some("sum") => Group::Sum,
                Some(other) => return Err(format!("field '{}': unknown group '{}'", key, other)),
            };
            Ok(FieldRule {
                kind: FieldKind::Regex {
                    patterns: compile_all(patterns)?,
                    value_type,
                    group,
                },
                name: key,
            })
        }
        other => Err(format!("field '{}': unknown parser '{}'", key, other)),
    }
}

/// Type inferred from the field name, as invoice2data-style templates expect.
fn legacy_type(key: &str) -> (ValueType, Group) {
    if key.starts_with("sum_amount") {
        (ValueType::Float, Group::Sum)
    } else if key.starts_with("date") {
        (ValueType::Date, Group::First)
    } else if key.starts_with("amount") {
        (ValueType::Float, Group::First)
    } else {
        (ValueType::Text, Group::First)
    }
}

fn literal_value(value: &serde_yaml::Value) -> Option<RawValue> {
    use std::str::FromStr;

    match value {
        serde_yaml::Value::String(s) => Some(RawValue::Text(s.clone())),
        serde_yaml::Value::Bool(b) => Some(RawValue::Text(b.to_string())),
        serde_yaml::Value::Number(n) => Decimal::from_str(&n.to_string())
            .ok()
            .map(RawValue::Number),
        _ => None,
    }
}

fn compile_options(options: OptionsDef) -> Result<TemplateOptions, String> {
    let mut separator = options.decimal_separator.chars();
    let decimal_separator = match (separator.next(), separator.next()) {
        (Some(c), None) => c,
        _ => {
            return Err(format!(
                "decimal_separator must be one character, got '{}'",
                options.decimal_separator
            ));
        }
    };

    let replace = options
        .replace
        .into_iter()
        .map(|(pattern, replacement)| {
            Regex::new(&pattern)
                .map(|re| (re, replacement))
                .map_err(|e| format!("bad replace regex '{}': {}", pattern, e))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(TemplateOptions {
        currency: options.currency,
        date_formats: options.date_formats,
        decimal_separator,
        remove_whitespace: options.remove_whitespace,
        remove_accents: options.remove_accents,
        lowercase: options.lowercase,
        replace,
    })
}

fn strip_accents(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
            'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => 'A',
            'è' | 'é' | 'ê' | 'ë' => 'e',
            'È' | 'É' | 'Ê' | 'Ë' => 'E',
            'ì' | 'í' | 'î' | 'ï' => 'i',
            'Ì' | 'Í' | 'Î' | 'Ï' => 'I',
            'ò' | 'ó' | 'ô' | 'õ' | 'ö' => 'o',
            'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' => 'O',
            'ù' | 'ú' | 'û' | 'ü' => 'u',
            'Ù' | 'Ú' | 'Û' | 'Ü' => 'U',
            'ç' => 'c',
            'Ç' => 'C',
            'ñ' => 'n',
            'Ñ' => 'N',
            'ÿ' => 'y',
            other => other,
        })
        .collect()
}
