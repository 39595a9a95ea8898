use crate::model::{CurriculumData, Grade, Lesson, LessonId, MappingDetail, Semester, Topic};
use crate::registry;
use crate::store::{BlobStore, CurriculumStore};
use serde::Serialize;
use tracing::info;

const SUPPLEMENTARY_KEYWORDS: [&str; 3] = ["Hoạt động bổ trợ", "STEM", "CLB"];
pub const SUPPLEMENTARY_TOPIC_TITLE: &str = "Hoạt động bổ trợ / STEM / CLB";
const SUPPLEMENTARY_REASON: &str = "Hoạt động tăng cường lấp lỗ hổng năng lực.";
const SUPPLEMENTARY_EQUIPMENT: &str = "Phòng máy tính / Phòng STEM";
const SUPPLEMENTARY_LOCATION: &str = "Trường học";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageStatus {
    Covered,
    AnchorOnly,
    Gap,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageRow {
    pub code: &'static str,
    pub text: &'static str,
    pub subject_count: usize,
    pub anchor_count: usize,
    pub status: CoverageStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeCoverage {
    pub grade: Grade,
    pub band: &'static str,
    pub rows: Vec<CoverageRow>,
    pub covered: usize,
    pub anchor_only: usize,
    pub gaps: usize,
}

impl GradeCoverage {
    pub fn row(&self, code: &str) -> Option<&CoverageRow> {
        self.rows.iter().find(|r| r.code == code)
    }
}

fn count_selecting(data: Option<&CurriculumData>, grade: Grade, code: &str) -> usize {
    data.and_then(|d| d.get(&grade))
        .map(|topics| {
            topics
                .iter()
                .flat_map(|t| t.lessons.iter())
                .filter(|l| l.mappings.get(code).map(|m| m.selected).unwrap_or(false))
                .count()
        })
        .unwrap_or(0)
}

/// Coverage of every registry code per grade, for the subject against the
/// anchor subject. A code counts as covered once `threshold` lessons select it.
pub fn analyze(
    subject: Option<&CurriculumData>,
    anchor: Option<&CurriculumData>,
    threshold: usize,
) -> Vec<GradeCoverage> {
    let threshold = threshold.max(1);
    Grade::ALL
        .iter()
        .map(|&grade| {
            let rows: Vec<CoverageRow> = registry::for_grade(grade)
                .iter()
                .map(|c| {
                    let subject_count = count_selecting(subject, grade, c.code);
                    let anchor_count = count_selecting(anchor, grade, c.code);
                    let status = if subject_count >= threshold {
                        CoverageStatus::Covered
                    } else if anchor_count >= threshold {
                        CoverageStatus::AnchorOnly
                    } else {
                        CoverageStatus::Gap
                    };
                    CoverageRow {
                        code: c.code,
                        text: c.text,
                        subject_count,
                        anchor_count,
                        status,
                    }
                })
                .collect();
            let tally = |s: CoverageStatus| rows.iter().filter(|r| r.status == s).count();
            GradeCoverage {
                grade,
                band: registry::band_name(grade),
                covered: tally(CoverageStatus::Covered),
                anchor_only: tally(CoverageStatus::AnchorOnly),
                gaps: tally(CoverageStatus::Gap),
                rows,
            }
        })
        .collect()
}

fn is_supplementary_topic(topic: &Topic) -> bool {
    SUPPLEMENTARY_KEYWORDS.iter().any(|k| topic.title.contains(k))
}

pub fn supplementary_lesson(id: LessonId, title: &str, code: &str) -> Lesson {
    let mut lesson = Lesson::new(id, title);
    lesson.yccd = vec![format!("Phát triển năng lực số: {code}")];
    lesson
        .mappings
        .insert(code.to_string(), MappingDetail::manual(SUPPLEMENTARY_REASON));
    lesson.periods = Some(2);
    lesson.equipment = Some(SUPPLEMENTARY_EQUIPMENT.to_string());
    lesson.location = Some(SUPPLEMENTARY_LOCATION.to_string());
    lesson
}

/// Appends `lesson` to the first supplementary topic, creating one in
/// semester 2 when the grade has none.
pub fn with_supplementary_lesson(topics: &[Topic], lesson: Lesson) -> Vec<Topic> {
    let mut next = topics.to_vec();
    let idx = match next.iter().position(is_supplementary_topic) {
        Some(i) => i,
        None => {
            next.push(Topic::new(SUPPLEMENTARY_TOPIC_TITLE, Semester::Second));
            next.len() - 1
        }
    };
    next[idx].lessons.push(lesson);
    next
}

pub fn add_supplementary_lesson<B: BlobStore>(
    store: &mut CurriculumStore<B>,
    subject: &str,
    grade: Grade,
    title: &str,
    code: &str,
) -> anyhow::Result<LessonId> {
    let id = store.next_id();
    let lesson = supplementary_lesson(id.clone(), title, code);
    let next = with_supplementary_lesson(store.topics(subject, grade), lesson);
    store.replace_grade_topics(subject, grade, next)?;
    info!(subject, grade = grade.as_str(), code, "supplementary lesson added");
    Ok(id)
}
