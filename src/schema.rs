use std::fmt::Debug;

use anyhow::{Context, Result};
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Semantic type of a record field as announced to the extraction model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
}

impl FieldKind {
    fn json_type(self) -> &'static str {
        match self {
            FieldKind::Text => "string",
            FieldKind::Integer => "integer",
        }
    }
}

/// One named, optional field of a record schema.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    /// Sent verbatim to the model; units here drive interpretation.
    pub description: &'static str,
}

/// A structured record the extraction model fills in.
///
/// Every field is optional. `fields()` lists them in declaration order and
/// must match the serde field names of the implementing struct.
pub trait Record: Serialize + DeserializeOwned + Default + Debug + Send {
    /// Schema name used for the structured-output constraint.
    const NAME: &'static str;

    fn fields() -> &'static [FieldSpec];

    /// JSON Schema describing the record: one nullable property per field,
    /// nothing required.
    fn json_schema() -> Value {
        let mut properties = Map::new();
        for field in Self::fields() {
            properties.insert(
                field.name.to_string(),
                json!({
                    "type": [field.kind.json_type(), "null"],
                    "description": field.description,
                }),
            );
        }
        json!({
            "type": "object",
            "properties": properties,
            "additionalProperties": false,
        })
    }

    /// Compact JSON with every field present; absent values become `null`.
    fn to_prompt_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .with_context(|| format!("Failed to serialize {} record", Self::NAME))
    }

    /// True when no field carries a value.
    fn is_empty(&self) -> bool {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map.values().all(Value::is_null),
            _ => false,
        }
    }
}

/// Who the user is and what they are aiming for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub age: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub weight_kg: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub height_cm: Option<i64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub goal: Option<String>,
}

const PROFILE_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        name: "name",
        kind: FieldKind::Text,
        description: "Nom de l'utilisateur",
    },
    FieldSpec {
        name: "age",
        kind: FieldKind::Integer,
        description: "Age de l'utilisateur",
    },
    FieldSpec {
        name: "weight_kg",
        kind: FieldKind::Integer,
        description: "Poids de l'utilisateur en kg",
    },
    FieldSpec {
        name: "height_cm",
        kind: FieldKind::Integer,
        description: "Taille de l'utilisateur en cm",
    },
    FieldSpec {
        name: "goal",
        kind: FieldKind::Text,
        description: "Objectif de l'utilisateur (prendre du muscle, perdre du poids...)",
    },
];

impl Record for Profile {
    const NAME: &'static str = "user_profile";

    fn fields() -> &'static [FieldSpec] {
        PROFILE_FIELDS
    }
}

/// Estimated food and drink consumption for one day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intake {
    #[serde(default, deserialize_with = "lenient_int")]
    pub kcal: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub protein_g: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub carbs_g: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub fat_g: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub water_l: Option<i64>,
}

const INTAKE_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        name: "kcal",
        kind: FieldKind::Integer,
        description: "Calories consommées dans la journée en kcal",
    },
    FieldSpec {
        name: "protein_g",
        kind: FieldKind::Integer,
        description: "Protéines consommées dans la journée en g",
    },
    FieldSpec {
        name: "carbs_g",
        kind: FieldKind::Integer,
        description: "Glucides consommés dans la journée en g",
    },
    FieldSpec {
        name: "fat_g",
        kind: FieldKind::Integer,
        description: "Lipides consommés dans la journée en g",
    },
    FieldSpec {
        name: "water_l",
        kind: FieldKind::Integer,
        description: "Eau consommée dans la journée en L",
    },
];

impl Record for Intake {
    const NAME: &'static str = "daily_intake";

    fn fields() -> &'static [FieldSpec] {
        INTAKE_FIELDS
    }
}

/// Estimated energy spent through physical activity for one day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    #[serde(default, deserialize_with = "lenient_int")]
    pub kcal: Option<i64>,
}

const ACTIVITY_FIELDS: &[FieldSpec] = &[FieldSpec {
    name: "kcal",
    kind: FieldKind::Integer,
    description: "Calories dépensées dans la journée en kcal",
}];

impl Record for Activity {
    const NAME: &'static str = "daily_activity";

    fn fields() -> &'static [FieldSpec] {
        ACTIVITY_FIELDS
    }
}

/// Accepts integers, floats (rounded) and numeric strings. Blank strings and
/// strings without a leading number are treated as absent.
fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                Ok(Some(i))
            } else {
                Ok(n.as_f64().filter(|f| f.is_finite()).map(|f| f.round() as i64))
            }
        }
        Some(Value::String(s)) => Ok(leading_number(&s)),
        Some(other) => Err(de::Error::custom(format!(
            "expected an integer, got {}",
            other
        ))),
    }
}

/// Reads the number at the start of `text`, ignoring any trailing unit.
///
/// A comma or space followed by exactly three digits groups thousands
/// ("1,800", "1 800"); any other comma is a decimal separator ("1,5").
fn leading_number(text: &str) -> Option<i64> {
    let chars: Vec<char> = text.trim().chars().collect();
    let mut digits = String::new();
    let mut fractional = false;
    let mut idx = 0;

    if let Some(&sign @ ('-' | '+')) = chars.first() {
        if sign == '-' {
            digits.push('-');
        }
        idx = 1;
    }

    while idx < chars.len() {
        let c = chars[idx];
        if c.is_ascii_digit() {
            digits.push(c);
        } else if matches!(c, ',' | ' ' | '\u{a0}' | '\u{202f}')
            && !fractional
            && digits.chars().any(|d| d.is_ascii_digit())
            && groups_thousands(&chars[idx + 1..])
        {
            // thousands separator
        } else if matches!(c, ',' | '.')
            && !fractional
            && chars.get(idx + 1).is_some_and(|n| n.is_ascii_digit())
        {
            digits.push('.');
            fractional = true;
        } else {
            break;
        }
        idx += 1;
    }

    if !digits.chars().any(|d| d.is_ascii_digit()) {
        return None;
    }
    if fractional {
        digits
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(|f| f.round() as i64)
    } else {
        digits.parse::<i64>().ok()
    }
}

fn groups_thousands(rest: &[char]) -> bool {
    rest.len() >= 3
        && rest[..3].iter().all(|c| c.is_ascii_digit())
        && !rest.get(3).is_some_and(|c| c.is_ascii_digit())
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Ok(None)
            } else {
                Ok(Some(trimmed.to_string()))
            }
        }
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(de::Error::custom(format!(
            "expected a string, got {}",
            other
        ))),
    }
}
