use crate::model::{CurriculumData, Grade};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageEntry {
    pub grade: Grade,
    pub lesson_id: String,
    pub lesson_title: String,
    pub is_current: bool,
}

pub type UsageIndex = BTreeMap<String, Vec<UsageEntry>>;

/// Where each competency code is used across the four grades of one subject.
/// Entries per code follow grade, topic and lesson order; only selected
/// mappings count.
pub fn build(subject: Option<&CurriculumData>, current_grade: Grade, current_lesson: Option<&str>) -> UsageIndex {
    let mut index = UsageIndex::new();
    let Some(data) = subject else {
        return index;
    };
    for grade in Grade::ALL {
        let Some(topics) = data.get(&grade) else {
            continue;
        };
        for lesson in topics.iter().flat_map(|t| t.lessons.iter()) {
            let is_current = grade == current_grade
                && current_lesson.map(|id| lesson.id.matches(id)).unwrap_or(false);
            for code in lesson.selected_codes() {
                index.entry(code.to_string()).or_default().push(UsageEntry {
                    grade,
                    lesson_id: lesson.id.to_string(),
                    lesson_title: lesson.title.clone(),
                    is_current,
                });
            }
        }
    }
    index
}

/// Usage of one code outside the current lesson.
pub fn other_uses<'a>(index: &'a UsageIndex, code: &str) -> Vec<&'a UsageEntry> {
    index
        .get(code)
        .map(|entries| entries.iter().filter(|e| !e.is_current).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Lesson, LessonId, MappingDetail, Semester, Topic};

    fn lesson(id: &str, title: &str, codes: &[(&str, bool)]) -> Lesson {
        let mut l = Lesson::new(LessonId::new(id), title);
        for (code, selected) in codes {
            let mut m = MappingDetail::manual("");
            m.selected = *selected;
            l.mappings.insert(code.to_string(), m);
        }
        l
    }

    fn data() -> CurriculumData {
        let mut six = Topic::new("A", Semester::First);
        six.lessons.push(lesson("1", "L1", &[("1.1.TC1a", true)]));
        six.lessons.push(lesson("2", "L2", &[("1.1.TC1a", true), ("2.1.TC1a", false)]));
        let mut eight = Topic::new("B", Semester::Second);
        eight.lessons.push(lesson("3", "L3", &[("1.1.TC2a", true)]));
        CurriculumData::from([(Grade::Eight, vec![eight]), (Grade::Six, vec![six])])
    }

    #[test]
    fn indexes_selected_codes_in_grade_order() {
        let d = data();
        let idx = build(Some(&d), Grade::Six, Some("2"));
        assert_eq!(idx.len(), 2);
        let uses = &idx["1.1.TC1a"];
        assert_eq!(
            uses.iter().map(|e| e.lesson_title.as_str()).collect::<Vec<_>>(),
            vec!["L1", "L2"]
        );
        assert!(!uses[0].is_current);
        assert!(uses[1].is_current);
        assert!(!idx.contains_key("2.1.TC1a"));
        assert_eq!(idx["1.1.TC2a"][0].grade, Grade::Eight);
        assert_eq!(other_uses(&idx, "1.1.TC1a").len(), 1);
    }

    #[test]
    fn current_flag_needs_matching_grade() {
        let d = data();
        let idx = build(Some(&d), Grade::Seven, Some("2"));
        assert!(idx.values().flatten().all(|e| !e.is_current));
        assert!(build(None, Grade::Six, None).is_empty());
    }
}
