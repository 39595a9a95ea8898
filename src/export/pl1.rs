use super::{escape, semester_heading, span, title_block, topic_row};
use crate::model::{Grade, Semester, Topic};

const TITLE: &str = "KẾ HOẠCH DẠY HỌC TÍCH HỢP NĂNG LỰC SỐ (PHỤ LỤC 1)";

const HEADER: &str = "<table><thead><tr>\
<th class=\"header-cell\" style=\"width:5%\">STT</th>\
<th class=\"header-cell\" style=\"width:25%\">Bài học</th>\
<th class=\"header-cell\" style=\"width:10%\">Tiết</th>\
<th class=\"header-cell\" style=\"width:10%\">Số tiết</th>\
<th class=\"header-cell\" style=\"width:35%\">Yêu cầu cần đạt</th>\
<th class=\"header-cell\" style=\"width:15%\">NLS</th>\
</tr></thead><tbody>";

/// Period numbering and row numbering both run across the two semesters.
pub(super) fn render(html: &mut String, subject: &str, grade: Grade, topics: &[Topic]) {
    title_block(html, TITLE, subject, grade);
    let mut period = 1u32;
    let mut stt = 1u32;
    for semester in [Semester::First, Semester::Second] {
        let in_semester: Vec<&Topic> = topics.iter().filter(|t| t.semester() == semester).collect();
        if in_semester.is_empty() {
            continue;
        }
        semester_heading(html, semester.roman());
        html.push_str(HEADER);
        for topic in in_semester {
            topic_row(html, 6, &topic.title);
            for lesson in &topic.lessons {
                let count = lesson.effective_periods();
                let requirements = lesson
                    .yccd
                    .iter()
                    .map(|y| format!("- {}", escape(y)))
                    .collect::<Vec<_>>()
                    .join("<br>");
                let codes = lesson
                    .selected_codes()
                    .into_iter()
                    .map(escape)
                    .collect::<Vec<_>>()
                    .join("<br>");
                html.push_str(&format!(
                    "<tr><td class=\"text-center\">{}</td><td>{}</td><td class=\"text-center\">{}</td><td class=\"text-center\">{}</td><td>{}</td><td class=\"text-center font-bold\">{}</td></tr>",
                    stt,
                    escape(&lesson.title),
                    span(period, count),
                    count,
                    requirements,
                    codes
                ));
                stt += 1;
                period = period.saturating_add(count);
            }
        }
        html.push_str("</tbody></table>");
    }
}
