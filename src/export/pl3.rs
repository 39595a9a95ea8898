use super::{escape, semester_heading, span, title_block, topic_row};
use crate::model::{Grade, Semester, Topic};

const TITLE: &str = "KẾ HOẠCH DẠY HỌC MÔN HỌC (PHỤ LỤC 3)";

/// Semester two never starts before this school week.
const SECOND_SEMESTER_FIRST_WEEK: u32 = 19;

const HEADER: &str = "<table><thead><tr>\
<th class=\"header-cell\">STT</th>\
<th class=\"header-cell\">Bài dạy / Nội dung</th>\
<th class=\"header-cell\">Số tiết</th>\
<th class=\"header-cell\">Thời điểm</th>\
<th class=\"header-cell\">Thiết bị dạy học</th>\
<th class=\"header-cell\">Địa điểm</th>\
<th class=\"header-cell\">NLS Tích hợp</th>\
</tr></thead><tbody>";

pub(super) fn render(html: &mut String, subject: &str, grade: Grade, topics: &[Topic]) {
    title_block(html, TITLE, subject, grade);
    let mut week = 1u32;
    for semester in [Semester::First, Semester::Second] {
        let in_semester: Vec<&Topic> = topics.iter().filter(|t| t.semester() == semester).collect();
        if in_semester.is_empty() {
            continue;
        }
        if semester == Semester::Second {
            week = week.max(SECOND_SEMESTER_FIRST_WEEK);
        }
        semester_heading(html, semester.roman());
        html.push_str(HEADER);
        let mut stt = 1u32;
        for topic in in_semester {
            topic_row(html, 7, &topic.title);
            for lesson in &topic.lessons {
                let periods = lesson.effective_periods();
                let codes = lesson
                    .selected_codes()
                    .into_iter()
                    .map(escape)
                    .collect::<Vec<_>>()
                    .join(", ");
                html.push_str(&format!(
                    "<tr><td class=\"text-center\">{}</td><td>{}</td><td class=\"text-center\">{}</td><td class=\"text-center font-bold\">Tuần {}</td><td>{}</td><td>{}</td><td class=\"text-center\">{}</td></tr>",
                    stt,
                    escape(&lesson.title),
                    periods,
                    span(week, periods),
                    escape(lesson.equipment.as_deref().unwrap_or("")),
                    escape(lesson.location.as_deref().unwrap_or("")),
                    codes
                ));
                stt += 1;
                week = week.saturating_add(periods);
            }
        }
        html.push_str("</tbody></table>");
    }
}
