//! Per-tool argument schemas, loaded from the language-keyed knowledge
//! base (`<knowledge_dir>/<lang>/schemas.json`) once at startup.
//!
//! The schemas drive two things: filtering/coercion of decoded directive
//! arguments, and the human-readable function list embedded in the base
//! system prompt. They are never used for tool discovery — that comes
//! from the tool host's `tools/list`.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use suroo_domain::{Error, Result};

/// Languages the knowledge base is keyed by. Anything that is not `ru`
/// normalizes to `ky`.
pub const LANGUAGES: [&str; 2] = ["ky", "ru"];

pub fn norm_lang(lang: &str) -> &'static str {
    if lang.trim().eq_ignore_ascii_case("ru") {
        "ru"
    } else {
        "ky"
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ToolSchema {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parameters: Parameters,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Parameters {
    #[serde(default)]
    pub properties: BTreeMap<String, ParamSchema>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ParamSchema {
    #[serde(default, rename = "type")]
    pub param_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// All tool schemas for all languages. Read-only after load.
pub struct ToolSchemas {
    by_lang: HashMap<&'static str, BTreeMap<String, ToolSchema>>,
}

impl ToolSchemas {
    /// Load `schemas.json` for every supported language. A missing file
    /// yields an empty schema set for that language; a malformed file is
    /// a startup error.
    pub fn load(knowledge_dir: &Path) -> Result<Self> {
        let mut by_lang = HashMap::new();
        for lang in LANGUAGES {
            let path = knowledge_dir.join(lang).join("schemas.json");
            let schemas = match std::fs::read_to_string(&path) {
                Ok(raw) => serde_json::from_str(&raw)
                    .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::warn!(path = %path.display(), "no schema file for language, tools will take no arguments");
                    BTreeMap::new()
                }
                Err(e) => return Err(e.into()),
            };
            tracing::info!(lang, tools = schemas.len(), "tool schemas loaded");
            by_lang.insert(lang, schemas);
        }
        Ok(Self { by_lang })
    }

    /// Empty schema set (all arguments filtered out for every tool).
    pub fn empty() -> Self {
        Self {
            by_lang: LANGUAGES.iter().map(|l| (*l, BTreeMap::new())).collect(),
        }
    }

    fn schemas(&self, lang: &str) -> &BTreeMap<String, ToolSchema> {
        // `norm_lang` keys always exist; populated in both constructors.
        static EMPTY: std::sync::OnceLock<BTreeMap<String, ToolSchema>> = std::sync::OnceLock::new();
        self.by_lang
            .get(norm_lang(lang))
            .unwrap_or_else(|| EMPTY.get_or_init(BTreeMap::new))
    }

    pub fn get(&self, tool: &str, lang: &str) -> Option<&ToolSchema> {
        self.schemas(lang).get(tool)
    }

    /// Filter a decoded argument map down to the parameters the tool
    /// declares, casting each value to its declared type best-effort.
    ///
    /// After filtering, any value still a string that contains a comma
    /// is split into a list of trimmed substrings — uniformly, whatever
    /// the declared type. Tools without a schema accept no arguments.
    pub fn filter_args(&self, tool: &str, lang: &str, args: &Map<String, Value>) -> Map<String, Value> {
        let mut filtered = Map::new();
        let Some(schema) = self.get(tool, lang) else {
            tracing::warn!(tool, "no schema for tool, dropping all arguments");
            return filtered;
        };

        for (key, value) in args {
            let Some(param) = schema.parameters.properties.get(key) else {
                continue;
            };
            let cast = cast_value(value, param.param_type.as_deref());
            filtered.insert(key.clone(), comma_split(cast));
        }
        filtered
    }

    /// Human-readable function list for the base system prompt, with
    /// localized service phrases.
    pub fn function_docs(&self, lang: &str) -> String {
        let lang = norm_lang(lang);
        let (label_params, no_params, no_descr) = if lang == "ky" {
            ("Параметрлер", "Параметрлер жок", "Сүрөттөмө жок")
        } else {
            ("Параметры", "Параметры отсутствуют", "нет описания")
        };

        self.schemas(lang)
            .iter()
            .map(|(name, schema)| {
                let description = schema.description.as_deref().unwrap_or(no_descr);
                let params: Vec<&str> = schema
                    .parameters
                    .properties
                    .keys()
                    .map(String::as_str)
                    .collect();
                let param_list = if params.is_empty() {
                    no_params.to_string()
                } else {
                    params.join(", ")
                };
                format!("\t{name} — {description}. {label_params}: {param_list}")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Cast a decoded value to a declared JSON-schema type. Anything that
/// cannot be cast keeps its original value; this never errors.
fn cast_value(value: &Value, param_type: Option<&str>) -> Value {
    match param_type {
        Some("number") => match value {
            Value::Number(_) => value.clone(),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .unwrap_or_else(|| value.clone()),
            _ => value.clone(),
        },
        Some("integer") => match value {
            Value::Number(n) => n
                .as_i64()
                .map(Value::from)
                .or_else(|| n.as_f64().map(|f| Value::from(f as i64)))
                .unwrap_or_else(|| value.clone()),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .unwrap_or_else(|_| value.clone()),
            _ => value.clone(),
        },
        Some("string") => match value {
            Value::String(_) => value.clone(),
            Value::Number(n) => Value::String(n.to_string()),
            Value::Bool(b) => Value::String(b.to_string()),
            _ => value.clone(),
        },
        Some("array") => match value {
            Value::Array(_) => value.clone(),
            Value::String(s) => Value::Array(
                s.split(',')
                    .map(|item| Value::String(item.trim().to_string()))
                    .collect(),
            ),
            _ => value.clone(),
        },
        Some("boolean") => match value {
            Value::Bool(_) => value.clone(),
            Value::String(s) => {
                let truthy = ["1", "true", "yes", "y", "да", "ооба"];
                Value::Bool(truthy.contains(&s.trim().to_lowercase().as_str()))
            }
            Value::Number(n) => Value::Bool(n.as_f64().is_some_and(|f| f != 0.0)),
            _ => value.clone(),
        },
        _ => value.clone(),
    }
}

/// The uniform comma-split convenience rule: string values carrying a
/// comma become lists of trimmed substrings.
fn comma_split(value: Value) -> Value {
    match value {
        Value::String(ref s) if s.contains(',') => Value::Array(
            s.split(',')
                .map(|item| Value::String(item.trim().to_string()))
                .collect(),
        ),
        other => other,
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
