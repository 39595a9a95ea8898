use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;

/// Subject whose bundled curriculum seeds new workspaces and backs the gap matrix.
pub const ANCHOR_SUBJECT: &str = "Tin học";

/// Subjects offered by the editor, in menu order.
pub const SUBJECTS: &[&str] = &[
    "Tin học",
    "Toán",
    "Ngữ văn",
    "KHTN",
    "Lịch sử và Địa lí",
    "GDCD",
    "Công nghệ",
    "Nghệ thuật",
    "GDTC",
    "HĐTN, HN",
    "Khác",
];

const EXAM_KEYWORD: &str = "kiểm tra";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Grade {
    Six,
    Seven,
    Eight,
    Nine,
}

impl Grade {
    pub const ALL: [Grade; 4] = [Grade::Six, Grade::Seven, Grade::Eight, Grade::Nine];

    pub fn as_str(self) -> &'static str {
        match self {
            Grade::Six => "6",
            Grade::Seven => "7",
            Grade::Eight => "8",
            Grade::Nine => "9",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "6" => Some(Grade::Six),
            "7" => Some(Grade::Seven),
            "8" => Some(Grade::Eight),
            "9" => Some(Grade::Nine),
            _ => None,
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Grade {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

struct GradeVisitor;

impl<'de> de::Visitor<'de> for GradeVisitor {
    type Value = Grade;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("grade 6, 7, 8 or 9 as text or number")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Grade, E> {
        Grade::parse(v).ok_or_else(|| E::custom(format!("unknown grade: {v}")))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Grade, E> {
        self.visit_str(&v.to_string())
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Grade, E> {
        self.visit_str(&v.to_string())
    }
}

/// Accepts "6" as well as 6; map keys arrive as text.
impl<'de> Deserialize<'de> for Grade {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(GradeVisitor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Semester {
    #[default]
    First,
    Second,
}

impl Semester {
    pub fn number(self) -> u8 {
        match self {
            Semester::First => 1,
            Semester::Second => 2,
        }
    }

    pub fn from_number(n: u64) -> Option<Self> {
        match n {
            1 => Some(Semester::First),
            2 => Some(Semester::Second),
            _ => None,
        }
    }

    pub fn roman(self) -> &'static str {
        match self {
            Semester::First => "I",
            Semester::Second => "II",
        }
    }
}

impl Serialize for Semester {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.number())
    }
}

impl<'de> Deserialize<'de> for Semester {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let n = u64::deserialize(deserializer)?;
        Semester::from_number(n).ok_or_else(|| de::Error::custom(format!("semester must be 1 or 2, got {n}")))
    }
}

/// Canonical lesson id. Older data stored numeric ids; they are accepted on
/// ingest and kept as their decimal text from then on.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct LessonId(String);

impl LessonId {
    pub fn new(raw: impl Into<String>) -> Self {
        LessonId(raw.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn matches(&self, other: &str) -> bool {
        self.0 == other.trim()
    }

    /// Numeric value of clock-issued ids, used to seed the id clock.
    pub fn numeric(&self) -> Option<i64> {
        self.0.parse::<i64>().ok()
    }
}

impl fmt::Display for LessonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

struct LessonIdVisitor;

impl<'de> Visitor<'de> for LessonIdVisitor {
    type Value = LessonId;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a lesson id as string or integer")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<LessonId, E> {
        Ok(LessonId::new(v))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<LessonId, E> {
        Ok(LessonId::new(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<LessonId, E> {
        Ok(LessonId(v.to_string()))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<LessonId, E> {
        Ok(LessonId(v.to_string()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<LessonId, E> {
        if v.fract() == 0.0 && v.abs() < 9.0e15 {
            Ok(LessonId((v as i64).to_string()))
        } else {
            Ok(LessonId(v.to_string()))
        }
    }
}

impl<'de> Deserialize<'de> for LessonId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(LessonIdVisitor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingType {
    Suggested,
    Manual,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingDetail {
    #[serde(default)]
    pub selected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<MappingType>,
}

impl MappingDetail {
    pub fn manual(reason: impl Into<String>) -> Self {
        MappingDetail {
            selected: true,
            reason: Some(reason.into()),
            kind: Some(MappingType::Manual),
        }
    }

    pub fn suggested(reason: impl Into<String>) -> Self {
        MappingDetail {
            selected: true,
            reason: Some(reason.into()),
            kind: Some(MappingType::Suggested),
        }
    }

    pub fn reason_text(&self) -> &str {
        self.reason.as_deref().unwrap_or("")
    }
}

fn de_opt_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    match Option::<JsonValue>::deserialize(deserializer)? {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::String(s)) => Ok(Some(s)),
        Some(JsonValue::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(de::Error::custom(format!(
            "expected text or number, got {other}"
        ))),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanStep {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nls_codes: Option<Vec<String>>,
}

/// One activity block of a detailed lesson plan (Hoạt động 1, 2, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSection {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub title: String,
    #[serde(
        default,
        deserialize_with = "de_opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub duration: Option<String>,
    #[serde(default)]
    pub objective: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub product: String,
    #[serde(default)]
    pub steps: Vec<PlanStep>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: LessonId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub yccd: Vec<String>,
    #[serde(default)]
    pub mappings: BTreeMap<String, MappingDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub periods: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objectives: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_data: Option<Vec<PlanSection>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activities: Option<String>,
}

/// Largest period count a single lesson may declare.
pub const MAX_LESSON_PERIODS: u32 = 100;

/// Whether `periods` is an acceptable declared period count.
pub fn periods_in_range(periods: u32) -> bool {
    (1..=MAX_LESSON_PERIODS).contains(&periods)
}

impl Lesson {
    pub fn new(id: LessonId, title: impl Into<String>) -> Self {
        Lesson {
            id,
            title: title.into(),
            yccd: Vec::new(),
            mappings: BTreeMap::new(),
            periods: None,
            equipment: None,
            location: None,
            objectives: None,
            plan_data: None,
            activities: None,
        }
    }

    pub fn is_exam(&self) -> bool {
        self.title.to_lowercase().contains(EXAM_KEYWORD)
    }

    /// Period count used by the schedule exports: declared value, else 1 for
    /// exams and 2 otherwise. Capped at [`MAX_LESSON_PERIODS`].
    pub fn effective_periods(&self) -> u32 {
        match self.periods {
            Some(p) if p > 0 => p.min(MAX_LESSON_PERIODS),
            _ if self.is_exam() => 1,
            _ => 2,
        }
    }

    /// Codes whose mapping is selected, in key order.
    pub fn selected_codes(&self) -> Vec<&str> {
        self.mappings
            .iter()
            .filter(|(_, m)| m.selected)
            .map(|(c, _)| c.as_str())
            .collect()
    }

    pub fn has_plan_data(&self) -> bool {
        self.plan_data.as_ref().map(|p| !p.is_empty()).unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    #[serde(rename = "topic")]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semester: Option<Semester>,
    #[serde(default)]
    pub lessons: Vec<Lesson>,
}

impl Topic {
    pub fn new(title: impl Into<String>, semester: Semester) -> Self {
        Topic {
            title: title.into(),
            semester: Some(semester),
            lessons: Vec::new(),
        }
    }

    pub fn semester(&self) -> Semester {
        self.semester.unwrap_or_default()
    }
}

pub type CurriculumData = BTreeMap<Grade, Vec<Topic>>;

/// Root persisted entity: subject name to its curriculum.
pub type FullDataset = BTreeMap<String, CurriculumData>;

pub fn grade_topics<'a>(data: &'a FullDataset, subject: &str, grade: Grade) -> &'a [Topic] {
    data.get(subject)
        .and_then(|c| c.get(&grade))
        .map(|t| t.as_slice())
        .unwrap_or(&[])
}
