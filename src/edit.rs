//! Structural edits over one grade's topic list.
//!
//! Every function takes the current topics by reference and returns a freshly
//! built list, or `None` when the request addresses nothing (unknown id, index
//! past the end, move at a boundary). Callers hand the new list to
//! `CurriculumStore::replace_grade_topics`; the input slice is never touched.

use crate::context::locate;
use crate::model::{
    periods_in_range, Lesson, LessonId, MappingDetail, MappingType, PlanSection, Semester, Topic,
    MAX_LESSON_PERIODS,
};
use serde::Deserialize;

pub const NEW_TOPIC_TITLE: &str = "Chủ đề mới";
pub const NEW_LESSON_TITLE: &str = "Bài học mới";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn from_step(step: i64) -> Option<Self> {
        match step {
            -1 => Some(Direction::Up),
            1 => Some(Direction::Down),
            _ => None,
        }
    }

    fn neighbour(self, index: usize, len: usize) -> Option<usize> {
        let target = match self {
            Direction::Up => index.checked_sub(1)?,
            Direction::Down => index + 1,
        };
        (target < len && index < len).then_some(target)
    }
}

/// Lesson field that can be set across a whole grade at once.
#[derive(Debug, Clone, PartialEq)]
pub enum BulkField {
    Equipment(String),
    Location(String),
    Periods(u32),
}

impl BulkField {
    pub fn display_value(&self) -> String {
        match self {
            BulkField::Equipment(v) | BulkField::Location(v) => v.clone(),
            BulkField::Periods(p) => p.to_string(),
        }
    }
}

/// Shallow patch of lesson fields; absent fields are left alone.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LessonPatch {
    pub title: Option<String>,
    pub yccd: Option<Vec<String>>,
    pub periods: Option<u32>,
    pub equipment: Option<String>,
    pub location: Option<String>,
    pub objectives: Option<String>,
    pub plan_data: Option<Vec<PlanSection>>,
    pub activities: Option<String>,
}

impl LessonPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.yccd.is_none()
            && self.periods.is_none()
            && self.equipment.is_none()
            && self.location.is_none()
            && self.objectives.is_none()
            && self.plan_data.is_none()
            && self.activities.is_none()
    }

    /// Rejects field values no lesson may hold.
    pub fn validate(&self) -> Result<(), String> {
        match self.periods {
            Some(p) if !periods_in_range(p) => Err(format!(
                "periods must be between 1 and {}",
                MAX_LESSON_PERIODS
            )),
            _ => Ok(()),
        }
    }

    pub fn apply(&self, lesson: &Lesson) -> Lesson {
        let mut next = lesson.clone();
        if let Some(v) = &self.title {
            next.title = v.clone();
        }
        if let Some(v) = &self.yccd {
            next.yccd = v.clone();
        }
        if let Some(v) = self.periods {
            next.periods = Some(v);
        }
        if let Some(v) = &self.equipment {
            next.equipment = Some(v.clone());
        }
        if let Some(v) = &self.location {
            next.location = Some(v.clone());
        }
        if let Some(v) = &self.objectives {
            next.objectives = Some(v.clone());
        }
        if let Some(v) = &self.plan_data {
            next.plan_data = Some(v.clone());
        }
        if let Some(v) = &self.activities {
            next.activities = Some(v.clone());
        }
        next
    }
}

/// Rebuilds the list with the addressed lesson replaced by `f`'s result.
pub fn with_lesson<F>(topics: &[Topic], lesson_id: &str, f: F) -> Option<Vec<Topic>>
where
    F: FnOnce(&Lesson) -> Option<Lesson>,
{
    let (ti, li) = locate(topics, lesson_id)?;
    let replacement = f(&topics[ti].lessons[li])?;
    let mut next = topics.to_vec();
    next[ti].lessons[li] = replacement;
    Some(next)
}

/// Appends to the first topic, creating a placeholder topic when the grade is empty.
pub fn add_lesson(topics: &[Topic], lesson: Lesson) -> Vec<Topic> {
    let mut next = topics.to_vec();
    if next.is_empty() {
        next.push(Topic::new(NEW_TOPIC_TITLE, Semester::First));
    }
    next[0].lessons.push(lesson);
    next
}

pub fn add_topic(topics: &[Topic]) -> Vec<Topic> {
    let mut next = topics.to_vec();
    next.push(Topic::new(NEW_TOPIC_TITLE, Semester::First));
    next
}

pub fn delete_lesson(topics: &[Topic], lesson_id: &str) -> Option<Vec<Topic>> {
    let (ti, li) = locate(topics, lesson_id)?;
    let mut next = topics.to_vec();
    next[ti].lessons.remove(li);
    Some(next)
}

pub fn move_lesson(topics: &[Topic], lesson_id: &str, dir: Direction) -> Option<Vec<Topic>> {
    let (ti, li) = locate(topics, lesson_id)?;
    let target = dir.neighbour(li, topics[ti].lessons.len())?;
    let mut next = topics.to_vec();
    next[ti].lessons.swap(li, target);
    Some(next)
}

/// Swaps a topic with its neighbour. Crossing into the other semester makes
/// the moved topic take the semester of the topic it displaced.
pub fn move_topic(topics: &[Topic], index: usize, dir: Direction) -> Option<Vec<Topic>> {
    let target = dir.neighbour(index, topics.len())?;
    let mut next = topics.to_vec();
    let displaced = next[target].semester();
    if next[index].semester() != displaced {
        next[index].semester = Some(displaced);
    }
    next.swap(index, target);
    Some(next)
}

/// Removes the lesson, then inserts it at `target_lesson` (clamped, counted
/// after removal) in topic `target_topic`.
pub fn reorder_lesson(
    topics: &[Topic],
    lesson_id: &str,
    target_topic: usize,
    target_lesson: usize,
) -> Option<Vec<Topic>> {
    if target_topic >= topics.len() {
        return None;
    }
    let (ti, li) = locate(topics, lesson_id)?;
    let mut next = topics.to_vec();
    let lesson = next[ti].lessons.remove(li);
    let dest = &mut next[target_topic].lessons;
    let at = target_lesson.min(dest.len());
    if ti == target_topic && at == li {
        return None;
    }
    dest.insert(at, lesson);
    Some(next)
}

pub fn bulk_set(topics: &[Topic], field: &BulkField) -> Option<Vec<Topic>> {
    if topics.iter().all(|t| t.lessons.is_empty()) {
        return None;
    }
    let next = topics
        .iter()
        .map(|t| Topic {
            lessons: t
                .lessons
                .iter()
                .map(|l| {
                    let mut l = l.clone();
                    match field {
                        BulkField::Equipment(v) => l.equipment = Some(v.clone()),
                        BulkField::Location(v) => l.location = Some(v.clone()),
                        BulkField::Periods(p) => l.periods = Some(*p),
                    }
                    l
                })
                .collect(),
            ..t.clone()
        })
        .collect();
    Some(next)
}

pub fn update_lesson(topics: &[Topic], lesson_id: &str, patch: &LessonPatch) -> Option<Vec<Topic>> {
    if patch.is_empty() {
        return None;
    }
    with_lesson(topics, lesson_id, |l| Some(patch.apply(l)))
}

pub fn update_topic(
    topics: &[Topic],
    index: usize,
    title: Option<&str>,
    semester: Option<Semester>,
) -> Option<Vec<Topic>> {
    if index >= topics.len() || (title.is_none() && semester.is_none()) {
        return None;
    }
    let mut next = topics.to_vec();
    if let Some(t) = title {
        next[index].title = t.to_string();
    }
    if let Some(s) = semester {
        next[index].semester = Some(s);
    }
    Some(next)
}

pub fn set_requirement(lesson: &Lesson, index: usize, text: &str) -> Option<Lesson> {
    if index >= lesson.yccd.len() {
        return None;
    }
    let mut next = lesson.clone();
    next.yccd[index] = text.to_string();
    Some(next)
}

pub fn add_requirement(lesson: &Lesson) -> Lesson {
    let mut next = lesson.clone();
    next.yccd.push(String::new());
    next
}

pub fn delete_requirement(lesson: &Lesson, index: usize) -> Option<Lesson> {
    if index >= lesson.yccd.len() {
        return None;
    }
    let mut next = lesson.clone();
    next.yccd.remove(index);
    Some(next)
}

/// Selecting inserts a blank manual mapping (or re-selects a stored one and
/// keeps its reason); deselecting drops the key.
pub fn toggle_mapping(lesson: &Lesson, code: &str, selected: bool) -> Option<Lesson> {
    let current = lesson.mappings.get(code);
    if selected == current.is_some_and(|m| m.selected) {
        return None;
    }
    let mut next = lesson.clone();
    if selected {
        let mut detail = current.cloned().unwrap_or_else(|| MappingDetail::manual(""));
        detail.selected = true;
        detail.kind = Some(MappingType::Manual);
        next.mappings.insert(code.to_string(), detail);
    } else {
        next.mappings.remove(code);
    }
    Some(next)
}

pub fn set_reason(lesson: &Lesson, code: &str, reason: &str) -> Option<Lesson> {
    lesson.mappings.get(code)?;
    let mut next = lesson.clone();
    if let Some(m) = next.mappings.get_mut(code) {
        m.reason = Some(reason.to_string());
    }
    Some(next)
}

/// Writes AI-provided rationale and marks the mapping as suggested.
pub fn set_suggested_reason(lesson: &Lesson, code: &str, reason: &str) -> Option<Lesson> {
    lesson.mappings.get(code)?;
    let mut next = lesson.clone();
    if let Some(m) = next.mappings.get_mut(code) {
        m.reason = Some(reason.to_string());
        m.kind = Some(MappingType::Suggested);
    }
    Some(next)
}

/// Splits a lesson with two or more requirements into "(Phần 1)" and
/// "(Phần 2)" halves placed next to each other.
pub fn split_lesson(topics: &[Topic], lesson_id: &str, new_id: LessonId) -> Option<Vec<Topic>> {
    let (ti, li) = locate(topics, lesson_id)?;
    let src = &topics[ti].lessons[li];
    if src.yccd.len() < 2 {
        return None;
    }
    let cut = (src.yccd.len() + 1) / 2;
    let total = src.effective_periods();
    let first_periods = (total + 1) / 2;
    let second_periods = total.saturating_sub(first_periods).max(1);

    let mut first = src.clone();
    first.title = format!("{} (Phần 1)", src.title);
    first.yccd = src.yccd[..cut].to_vec();
    first.periods = Some(first_periods);

    let mut second = Lesson::new(new_id, format!("{} (Phần 2)", src.title));
    second.yccd = src.yccd[cut..].to_vec();
    second.mappings = src.mappings.clone();
    second.periods = Some(second_periods);
    second.equipment = src.equipment.clone();
    second.location = src.location.clone();

    let mut next = topics.to_vec();
    next[ti].lessons[li] = first;
    next[ti].lessons.insert(li + 1, second);
    Some(next)
}

fn merge_pair(first: &Lesson, second: &Lesson) -> Lesson {
    let mut merged = first.clone();
    merged.title = format!("{} + {}", first.title, second.title);
    merged.yccd.extend(second.yccd.iter().cloned());
    for (code, m) in &second.mappings {
        merged
            .mappings
            .entry(code.clone())
            .or_insert_with(|| m.clone());
    }
    merged.periods = Some(first.effective_periods() + second.effective_periods());
    if merged.equipment.is_none() {
        merged.equipment = second.equipment.clone();
    }
    if merged.location.is_none() {
        merged.location = second.location.clone();
    }
    if merged.objectives.is_none() {
        merged.objectives = second.objectives.clone();
    }
    if !first.has_plan_data() && second.has_plan_data() {
        merged.plan_data = second.plan_data.clone();
    }
    if merged.activities.is_none() {
        merged.activities = second.activities.clone();
    }
    merged
}

fn merge_at(topics: &[Topic], ti: usize, li: usize) -> Option<Vec<Topic>> {
    let lessons = &topics[ti].lessons;
    if li + 1 >= lessons.len() {
        return None;
    }
    let merged = merge_pair(&lessons[li], &lessons[li + 1]);
    let mut next = topics.to_vec();
    next[ti].lessons[li] = merged;
    next[ti].lessons.remove(li + 1);
    Some(next)
}

/// Folds the following lesson of the same topic into this one.
pub fn merge_next(topics: &[Topic], lesson_id: &str) -> Option<Vec<Topic>> {
    let (ti, li) = locate(topics, lesson_id)?;
    merge_at(topics, ti, li)
}

/// Folds this lesson into the preceding lesson of the same topic.
pub fn merge_previous(topics: &[Topic], lesson_id: &str) -> Option<Vec<Topic>> {
    let (ti, li) = locate(topics, lesson_id)?;
    merge_at(topics, ti, li.checked_sub(1)?)
}

pub fn can_merge_next(topics: &[Topic], lesson_id: &str) -> bool {
    locate(topics, lesson_id)
        .map(|(ti, li)| li + 1 < topics[ti].lessons.len())
        .unwrap_or(false)
}

pub fn can_merge_previous(topics: &[Topic], lesson_id: &str) -> bool {
    locate(topics, lesson_id).map(|(_, li)| li > 0).unwrap_or(false)
}
