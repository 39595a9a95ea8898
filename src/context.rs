use crate::model::{Lesson, Topic};

/// Address of a lesson inside one grade's topic list.
#[derive(Debug, Clone, Copy)]
pub struct LessonContext<'a> {
    pub topic: &'a Topic,
    pub lesson: &'a Lesson,
    pub topic_index: usize,
    pub lesson_index: usize,
}

/// First lesson whose id matches, scanning topics then lessons in order.
pub fn resolve<'a>(topics: &'a [Topic], lesson_id: &str) -> Option<LessonContext<'a>> {
    for (topic_index, topic) in topics.iter().enumerate() {
        if let Some(lesson_index) = topic.lessons.iter().position(|l| l.id.matches(lesson_id)) {
            return Some(LessonContext {
                topic,
                lesson: &topic.lessons[lesson_index],
                topic_index,
                lesson_index,
            });
        }
    }
    None
}

pub fn resolve_opt<'a>(topics: &'a [Topic], lesson_id: Option<&str>) -> Option<LessonContext<'a>> {
    lesson_id.and_then(|id| resolve(topics, id))
}

/// Position only, for writers that rebuild the list.
pub fn locate(topics: &[Topic], lesson_id: &str) -> Option<(usize, usize)> {
    resolve(topics, lesson_id).map(|c| (c.topic_index, c.lesson_index))
}
