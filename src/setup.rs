use crate::db;
use rusqlite::Connection;
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupSection {
    Lessons,
    Notifications,
    Matrix,
    Ai,
}

impl SetupSection {
    pub const ALL: [SetupSection; 4] = [
        SetupSection::Lessons,
        SetupSection::Notifications,
        SetupSection::Matrix,
        SetupSection::Ai,
    ];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "lessons" => Some(Self::Lessons),
            "notifications" => Some(Self::Notifications),
            "matrix" => Some(Self::Matrix),
            "ai" => Some(Self::Ai),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Lessons => "lessons",
            Self::Notifications => "notifications",
            Self::Matrix => "matrix",
            Self::Ai => "ai",
        }
    }

    fn key(self) -> &'static str {
        match self {
            Self::Lessons => "setup.lessons",
            Self::Notifications => "setup.notifications",
            Self::Matrix => "setup.matrix",
            Self::Ai => "setup.ai",
        }
    }
}

pub const AI_API_KEY_ENV: &str = "EDUPLAN_AI_API_KEY";
const DEFAULT_AI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_AI_MODEL: &str = "gemini-2.5-flash";

pub fn default_section(section: SetupSection) -> Value {
    match section {
        SetupSection::Lessons => json!({
            "defaultPeriods": 2,
            "defaultEquipment": "Máy tính, máy chiếu",
            "defaultLocation": "Phòng Tin học"
        }),
        SetupSection::Notifications => json!({
            "timeoutMs": 5000
        }),
        SetupSection::Matrix => json!({
            "minCoverage": 1
        }),
        SetupSection::Ai => json!({
            "endpoint": DEFAULT_AI_ENDPOINT,
            "model": DEFAULT_AI_MODEL,
            "apiKey": null,
            "maxRetries": 3,
            "baseDelayMs": 2000,
            "multiplier": 2
        }),
    }
}

fn as_object_mut(value: &mut Value) -> Result<&mut Map<String, Value>, String> {
    value
        .as_object_mut()
        .ok_or_else(|| "internal setup object must be a JSON object".to_string())
}

fn parse_i64_range(v: &Value, key: &str, min: i64, max: i64) -> Result<i64, String> {
    let n = v
        .as_i64()
        .ok_or_else(|| format!("{} must be integer", key))?;
    if !(min..=max).contains(&n) {
        return Err(format!("{} must be in {}..={}", key, min, max));
    }
    Ok(n)
}

fn parse_string_max(v: &Value, key: &str, max_len: usize) -> Result<String, String> {
    let s = v.as_str().ok_or_else(|| format!("{} must be string", key))?;
    let s = s.trim();
    if s.chars().count() > max_len {
        return Err(format!("{} length must be <= {}", key, max_len));
    }
    Ok(s.to_string())
}

fn parse_nullable_string_max(v: &Value, key: &str, max_len: usize) -> Result<Value, String> {
    if v.is_null() {
        return Ok(Value::Null);
    }
    let s = parse_string_max(v, key, max_len)?;
    if s.is_empty() {
        return Ok(Value::Null);
    }
    Ok(Value::String(s))
}

/// Validates `patch` field by field and writes accepted values into `current`.
pub fn merge_section_patch(
    section: SetupSection,
    current: &mut Value,
    patch: &Map<String, Value>,
) -> Result<(), String> {
    let obj = as_object_mut(current)?;
    for (k, v) in patch {
        match section {
            SetupSection::Lessons => match k.as_str() {
                "defaultPeriods" => {
                    obj.insert(k.clone(), Value::from(parse_i64_range(v, k, 1, 20)?));
                }
                "defaultEquipment" | "defaultLocation" => {
                    obj.insert(k.clone(), Value::String(parse_string_max(v, k, 200)?));
                }
                _ => return Err(format!("unknown lessons field: {}", k)),
            },
            SetupSection::Notifications => match k.as_str() {
                "timeoutMs" => {
                    obj.insert(k.clone(), Value::from(parse_i64_range(v, k, 500, 60_000)?));
                }
                _ => return Err(format!("unknown notifications field: {}", k)),
            },
            SetupSection::Matrix => match k.as_str() {
                "minCoverage" => {
                    obj.insert(k.clone(), Value::from(parse_i64_range(v, k, 1, 50)?));
                }
                _ => return Err(format!("unknown matrix field: {}", k)),
            },
            SetupSection::Ai => match k.as_str() {
                "endpoint" => {
                    let s = parse_string_max(v, k, 300)?;
                    if !s.starts_with("http://") && !s.starts_with("https://") {
                        return Err("endpoint must be an http(s) URL".into());
                    }
                    obj.insert(k.clone(), Value::String(s.trim_end_matches('/').to_string()));
                }
                "model" => {
                    let s = parse_string_max(v, k, 80)?;
                    if s.is_empty() {
                        return Err("model must not be empty".into());
                    }
                    obj.insert(k.clone(), Value::String(s));
                }
                "apiKey" => {
                    obj.insert(k.clone(), parse_nullable_string_max(v, k, 200)?);
                }
                "maxRetries" => {
                    obj.insert(k.clone(), Value::from(parse_i64_range(v, k, 0, 10)?));
                }
                "baseDelayMs" => {
                    obj.insert(k.clone(), Value::from(parse_i64_range(v, k, 0, 60_000)?));
                }
                "multiplier" => {
                    obj.insert(k.clone(), Value::from(parse_i64_range(v, k, 1, 10)?));
                }
                _ => return Err(format!("unknown ai field: {}", k)),
            },
        }
    }
    Ok(())
}

pub fn load_section(conn: &Connection, section: SetupSection) -> anyhow::Result<Value> {
    let mut current = default_section(section);
    if let Some(saved) = db::settings_get_json(conn, section.key())? {
        if let Some(saved_obj) = saved.as_object() {
            // Malformed historical values fall back to defaults field by field.
            for (k, v) in saved_obj {
                let one = Map::from_iter([(k.clone(), v.clone())]);
                let _ = merge_section_patch(section, &mut current, &one);
            }
        }
    }
    Ok(current)
}

pub fn update_section(
    conn: &Connection,
    section: SetupSection,
    patch: &Map<String, Value>,
) -> anyhow::Result<Result<Value, String>> {
    let mut current = load_section(conn, section)?;
    if let Err(msg) = merge_section_patch(section, &mut current, patch) {
        return Ok(Err(msg));
    }
    db::settings_set_json(conn, section.key(), &current)?;
    Ok(Ok(current))
}

fn int_field(v: &Value, key: &str) -> Option<i64> {
    v.get(key).and_then(|x| x.as_i64())
}

fn str_field(v: &Value, key: &str) -> Option<String> {
    v.get(key).and_then(|x| x.as_str()).map(|s| s.to_string())
}

/// Field values given to freshly added lessons.
#[derive(Debug, Clone, PartialEq)]
pub struct LessonDefaults {
    pub periods: u32,
    pub equipment: String,
    pub location: String,
}

impl Default for LessonDefaults {
    fn default() -> Self {
        LessonDefaults::from_section(&default_section(SetupSection::Lessons))
    }
}

impl LessonDefaults {
    pub fn from_section(v: &Value) -> Self {
        LessonDefaults {
            periods: int_field(v, "defaultPeriods")
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(2),
            equipment: str_field(v, "defaultEquipment")
                .unwrap_or_else(|| "Máy tính, máy chiếu".to_string()),
            location: str_field(v, "defaultLocation").unwrap_or_else(|| "Phòng Tin học".to_string()),
        }
    }

    pub fn load(conn: &Connection) -> anyhow::Result<Self> {
        Ok(Self::from_section(&load_section(conn, SetupSection::Lessons)?))
    }
}

pub fn notification_timeout_ms(conn: &Connection) -> anyhow::Result<i64> {
    let v = load_section(conn, SetupSection::Notifications)?;
    Ok(int_field(&v, "timeoutMs").unwrap_or(5000))
}

pub fn matrix_min_coverage(conn: &Connection) -> anyhow::Result<usize> {
    let v = load_section(conn, SetupSection::Matrix)?;
    Ok(int_field(&v, "minCoverage")
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or(1))
}

#[derive(Debug, Clone, PartialEq)]
pub struct AiSetup {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub multiplier: u32,
}

impl AiSetup {
    /// Setup values with the API key falling back to the environment.
    pub fn from_section(v: &Value) -> Self {
        let api_key = str_field(v, "apiKey")
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var(AI_API_KEY_ENV).ok().filter(|k| !k.trim().is_empty()));
        AiSetup {
            endpoint: str_field(v, "endpoint").unwrap_or_else(|| DEFAULT_AI_ENDPOINT.to_string()),
            model: str_field(v, "model").unwrap_or_else(|| DEFAULT_AI_MODEL.to_string()),
            api_key,
            max_retries: int_field(v, "maxRetries")
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(3),
            base_delay_ms: int_field(v, "baseDelayMs")
                .and_then(|n| u64::try_from(n).ok())
                .unwrap_or(2000),
            multiplier: int_field(v, "multiplier")
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(2),
        }
    }

    pub fn load(conn: &Connection) -> anyhow::Result<Self> {
        Ok(Self::from_section(&load_section(conn, SetupSection::Ai)?))
    }
}
