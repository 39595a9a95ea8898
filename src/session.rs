use crate::export::ViewMode;
use crate::model::{Grade, LessonId, ANCHOR_SUBJECT};
use serde::{Deserialize, Serialize};

/// What the editor is looking at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub subject: String,
    pub grade: Grade,
    pub lesson_id: Option<String>,
    pub view_mode: ViewMode,
    pub filter_mode: bool,
}

impl Default for Session {
    fn default() -> Self {
        Session {
            subject: ANCHOR_SUBJECT.to_string(),
            grade: Grade::Six,
            lesson_id: None,
            view_mode: ViewMode::Pl1,
            filter_mode: true,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SessionPatch {
    pub subject: Option<String>,
    pub grade: Option<Grade>,
    #[serde(default, with = "double_option")]
    pub lesson_id: Option<Option<LessonId>>,
    pub view_mode: Option<ViewMode>,
    pub filter_mode: Option<bool>,
}

// Distinguishes an absent `lessonId` from an explicit null.
mod double_option {
    use crate::model::LessonId;
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Option<LessonId>>, D::Error> {
        Ok(Some(Option::<LessonId>::deserialize(d)?))
    }
}

impl Session {
    /// Switching subject or grade drops the lesson selection unless the patch
    /// names a lesson too.
    pub fn apply(&mut self, patch: SessionPatch) {
        let mut moved = false;
        if let Some(subject) = patch.subject {
            let subject = subject.trim().to_string();
            if !subject.is_empty() && subject != self.subject {
                self.subject = subject;
                moved = true;
            }
        }
        if let Some(grade) = patch.grade {
            if grade != self.grade {
                self.grade = grade;
                moved = true;
            }
        }
        match patch.lesson_id {
            Some(id) => {
                self.lesson_id = id.map(|l| l.to_string()).filter(|s| !s.is_empty())
            }
            None if moved => self.lesson_id = None,
            None => {}
        }
        if let Some(view) = patch.view_mode {
            self.view_mode = view;
        }
        if let Some(filter) = patch.filter_mode {
            self.filter_mode = filter;
        }
    }

    pub fn lesson(&self) -> Option<&str> {
        self.lesson_id.as_deref()
    }
}
