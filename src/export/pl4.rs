use super::escape;
use crate::model::{Grade, Lesson, PlanSection};
use crate::registry;

const DEFAULT_EQUIPMENT: &str = "Máy tính, máy chiếu.";

fn lesson_periods(lesson: &Lesson) -> u32 {
    match lesson.periods {
        Some(p) if p > 0 => p,
        _ => 1,
    }
}

fn competency_list(lesson: &Lesson, grade: Grade) -> String {
    let codes = lesson.selected_codes();
    if codes.is_empty() {
        return "<p style=\"margin-left:20px; font-style:italic;\">Chưa chọn năng lực số tích hợp.</p>"
            .to_string();
    }
    let items: String = codes
        .iter()
        .map(|code| {
            let text = registry::lookup(grade, code).map(|c| c.text).unwrap_or("");
            let reason = lesson.mappings.get(*code).map(|m| m.reason_text()).unwrap_or("");
            format!(
                "<li><b>{}:</b> {}.<br><i>Minh chứng: {}</i></li>",
                escape(code),
                escape(text),
                escape(reason)
            )
        })
        .collect();
    format!("<ul style=\"margin-left:20px;\">{}</ul>", items)
}

fn section_box(section: &PlanSection) -> String {
    let duration = section
        .duration
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .map(|d| format!("{} phút", escape(d)))
        .unwrap_or_default();
    let mut steps = String::new();
    for step in &section.steps {
        steps.push_str(&format!(
            "<p><b>- {}:</b> {}</p>",
            escape(&step.title),
            escape(&step.content)
        ));
        if let Some(codes) = step.nls_codes.as_ref().filter(|c| !c.is_empty()) {
            let joined = codes.iter().map(|c| escape(c)).collect::<Vec<_>>().join(", ");
            steps.push_str(&format!(
                "<div class=\"nls-box\"><b>* Tích hợp NLS:</b> {}</div>",
                joined
            ));
        }
    }
    format!(
        "<div class=\"activity-box\">\
<p><b>{}. {}</b> ({})</p>\
<p><b>a) Mục tiêu:</b> {}</p>\
<p><b>b) Nội dung:</b> {}</p>\
<p><b>c) Sản phẩm:</b> {}</p>\
<p><b>d) Tổ chức thực hiện:</b></p>\
<div style=\"margin-left:15px;\">{}</div>\
</div>",
        escape(&section.label),
        escape(&section.title),
        duration,
        escape(&section.objective),
        escape(&section.content),
        escape(&section.product),
        steps
    )
}

pub(super) fn render(html: &mut String, subject: &str, grade: Grade, lesson: &Lesson) {
    html.push_str(
        "<div class=\"cv5512-header\">Phụ lục IV<br>KHUNG KẾ HOẠCH BÀI DẠY<br>(Kèm theo Công văn số 5512/BGDĐT-GDTrH)</div>",
    );
    html.push_str(
        "<div style=\"display:flex; justify-content:space-between; margin-bottom:20px;\">\
<div>Trường: ........................................<br>Tổ: .............................................</div>\
<div>Họ và tên giáo viên:<br>.......................................................</div>\
</div>",
    );
    html.push_str(&format!(
        "<div class=\"title-main\">TÊN BÀI DẠY: {}</div>",
        escape(&lesson.title.to_uppercase())
    ));
    html.push_str(&format!(
        "<div class=\"text-center\" style=\"margin-bottom:20px;\">Môn học: {}; Lớp: {}<br>Thời gian thực hiện: {} tiết</div>",
        escape(subject),
        grade,
        lesson_periods(lesson)
    ));

    let knowledge: String = lesson
        .yccd
        .iter()
        .map(|y| format!("<li>{}</li>", escape(y)))
        .collect();
    html.push_str("<div class=\"section-title\">I. MỤC TIÊU</div><div style=\"margin-left: 10px;\">");
    html.push_str(&format!(
        "<p><b>1. Về kiến thức:</b></p><ul style=\"margin-left: 20px;\">{}</ul>",
        knowledge
    ));
    html.push_str(
        "<p><b>2. Về năng lực:</b></p>\
<p style=\"margin-left: 20px;\">- <b>Năng lực chung:</b> Tự chủ và tự học, Giao tiếp và hợp tác, Giải quyết vấn đề và sáng tạo.</p>\
<p style=\"margin-left: 20px;\">- <b>Năng lực riêng:</b> Nhận thức khoa học, Tìm hiểu tự nhiên, Vận dụng kiến thức.</p>\
<p style=\"margin-left: 20px; text-decoration: underline;\">- <b>Năng lực số (Tích hợp):</b></p>",
    );
    html.push_str(&competency_list(lesson, grade));
    html.push_str(
        "<p><b>3. Về phẩm chất:</b></p><p style=\"margin-left: 20px;\">Chăm chỉ, trung thực, trách nhiệm.</p></div>",
    );

    let equipment = lesson
        .equipment
        .as_deref()
        .filter(|e| !e.is_empty())
        .unwrap_or(DEFAULT_EQUIPMENT);
    html.push_str(&format!(
        "<div class=\"section-title\">II. THIẾT BỊ DẠY HỌC VÀ HỌC LIỆU</div>\
<ul style=\"margin-left: 20px;\"><li>Thiết bị: {}</li><li>Học liệu: SGK, phiếu học tập.</li></ul>",
        escape(equipment)
    ));

    html.push_str("<div class=\"section-title\">III. TIẾN TRÌNH DẠY HỌC</div>");
    match (&lesson.plan_data, &lesson.activities) {
        (Some(sections), _) if !sections.is_empty() => {
            for section in sections {
                html.push_str(&section_box(section));
            }
        }
        // Stored activities are an authored HTML fragment.
        (_, Some(activities)) if !activities.is_empty() => html.push_str(activities),
        _ => html.push_str(
            "<p style=\"text-align:center; font-style:italic;\">(Chưa có nội dung chi tiết)</p>",
        ),
    }
}
