//! Word-compatible HTML renditions of a grade plan (Phụ lục 1 and 3) and of a
//! single lesson plan (Phụ lục 4, CV 5512).
//!
//! Rendering is pure: the same topics always produce the same bytes. Only
//! [`ExportDocument::write_to`] touches the filesystem.

mod pl1;
mod pl3;
mod pl4;

use crate::model::{Grade, Lesson, Topic};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const UTF8_BOM: &str = "\u{feff}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Pl1,
    Pl3,
    Pl4,
}

impl ViewMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pl1" => Some(ViewMode::Pl1),
            "pl3" => Some(ViewMode::Pl3),
            "pl4" => Some(ViewMode::Pl4),
            _ => None,
        }
    }

    pub fn file_stem(self) -> &'static str {
        match self {
            ViewMode::Pl1 => "Phu_luc_1_Ke_hoach_NLS",
            ViewMode::Pl3 => "Phu_luc_3_Ke_hoach_Day_hoc",
            ViewMode::Pl4 => "Phu_luc_4_KHBD_CV5512",
        }
    }

    fn orientation(self) -> &'static str {
        match self {
            ViewMode::Pl4 => "portrait",
            ViewMode::Pl1 | ViewMode::Pl3 => "landscape",
        }
    }

    fn page_size(self) -> &'static str {
        match self {
            ViewMode::Pl4 => "21cm 29.7cm",
            ViewMode::Pl1 | ViewMode::Pl3 => "29.7cm 21cm",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDocument {
    pub view: ViewMode,
    pub file_name: String,
    pub html: String,
}

impl ExportDocument {
    /// File contents: BOM followed by the HTML, so Word picks UTF-8.
    pub fn bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(UTF8_BOM.len() + self.html.len());
        out.extend_from_slice(UTF8_BOM.as_bytes());
        out.extend_from_slice(self.html.as_bytes());
        out
    }

    pub fn write_to(&self, dir: &Path) -> anyhow::Result<PathBuf> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create directory {}", dir.to_string_lossy()))?;
        let path = dir.join(&self.file_name);
        std::fs::write(&path, self.bytes())
            .with_context(|| format!("failed to write {}", path.to_string_lossy()))?;
        Ok(path)
    }
}

pub fn file_name(view: ViewMode, subject: &str, grade: Grade) -> String {
    format!("{}_{}_L{}.doc", view.file_stem(), subject, grade)
}

/// Renders one document. `lesson` is only read by the lesson-plan view; without
/// it that view has an empty body.
pub fn render(
    view: ViewMode,
    subject: &str,
    grade: Grade,
    topics: &[Topic],
    lesson: Option<&Lesson>,
) -> ExportDocument {
    let mut html = head(view);
    match view {
        ViewMode::Pl1 => pl1::render(&mut html, subject, grade, topics),
        ViewMode::Pl3 => pl3::render(&mut html, subject, grade, topics),
        ViewMode::Pl4 => {
            if let Some(lesson) = lesson {
                pl4::render(&mut html, subject, grade, lesson);
            }
        }
    }
    html.push_str("</div></body></html>");
    ExportDocument {
        view,
        file_name: file_name(view, subject, grade),
        html,
    }
}

fn head(view: ViewMode) -> String {
    let mut s = String::new();
    s.push_str("<html xmlns:o='urn:schemas-microsoft-com:office:office' xmlns:w='urn:schemas-microsoft-com:office:word' xmlns='http://www.w3.org/TR/REC-html40'>");
    s.push_str(&format!(
        "<head><meta charset=\"utf-8\"><title>{}</title><style>",
        view.file_stem()
    ));
    s.push_str(&format!(
        "@page Section1 {{ size: {}; mso-page-orientation: {}; margin: 2.0cm; }}\n",
        view.page_size(),
        view.orientation()
    ));
    s.push_str(STYLESHEET);
    s.push_str("</style></head><body><div class=\"Section1\">");
    s
}

const STYLESHEET: &str = "div.Section1 { page:Section1; }
body { font-family: 'Times New Roman', serif; font-size: 13pt; line-height: 1.3; color: black; }
table { border-collapse: collapse; width: 100%; border: 1px solid black; margin-bottom: 15px; }
th, td { border: 1px solid black; padding: 6px; vertical-align: top; font-size: 13pt; font-family: 'Times New Roman', serif; }
.header-cell { background: #f1f5f9; font-weight: bold; text-align: center; text-transform: uppercase; }
.text-center { text-align: center; }
.font-bold { font-weight: bold; }
.italic { font-style: italic; }
.title-main { text-align: center; text-transform: uppercase; font-weight: bold; font-size: 14pt; margin-bottom: 5px; }
.subtitle { text-align: center; font-weight: bold; font-size: 13pt; margin-bottom: 20px; }
.cv5512-header { text-align: right; font-style: italic; margin-bottom: 10px; font-size: 11pt; }
.section-title { font-weight: bold; text-transform: uppercase; margin-top: 15px; margin-bottom: 5px; }
.activity-box { border: 1px solid #000; padding: 10px; margin-bottom: 10px; }
.nls-box { background-color: #f0fdfa; border: 1px dashed #0d9488; padding: 5px; margin-top: 5px; font-size: 12pt; }
";

pub(crate) fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

pub(crate) fn title_block(html: &mut String, title: &str, subject: &str, grade: Grade) {
    html.push_str(&format!(
        "<div class=\"title-main\">{}</div><div class=\"subtitle\">Môn: {} - Khối: {}</div>",
        title,
        escape(subject),
        grade
    ));
}

pub(crate) fn semester_heading(html: &mut String, roman: &str) {
    html.push_str(&format!(
        "<div style=\"font-weight:bold; margin-top:20px;\">HỌC KÌ {}</div>",
        roman
    ));
}

pub(crate) fn topic_row(html: &mut String, colspan: usize, title: &str) {
    html.push_str(&format!(
        "<tr><td colspan=\"{}\" style=\"background:#f8fafc; font-weight:bold;\">{}</td></tr>",
        colspan,
        escape(title)
    ));
}

/// "a" for a single unit, "a - b" for a span.
pub(crate) fn span(start: u32, count: u32) -> String {
    if count <= 1 {
        start.to_string()
    } else {
        format!("{} - {}", start, start.saturating_add(count - 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LessonId, Semester};

    #[test]
    fn file_names_and_page_setup_follow_view() {
        assert_eq!(
            file_name(ViewMode::Pl3, "Tin học", Grade::Eight),
            "Phu_luc_3_Ke_hoach_Day_hoc_Tin học_L8.doc"
        );
        let doc = render(ViewMode::Pl4, "Toán", Grade::Six, &[], None);
        assert!(doc.html.contains("size: 21cm 29.7cm; mso-page-orientation: portrait"));
        assert!(doc.html.ends_with("<div class=\"Section1\"></div></body></html>"));
        let doc = render(ViewMode::Pl1, "Toán", Grade::Six, &[], None);
        assert!(doc.html.contains("mso-page-orientation: landscape"));
    }

    #[test]
    fn span_saturates_at_the_counter_limit() {
        assert_eq!(span(7, 1), "7");
        assert_eq!(span(3, 4), "3 - 6");
        assert_eq!(span(u32::MAX - 1, 5), format!("{} - {}", u32::MAX - 1, u32::MAX));
    }

    #[test]
    fn bytes_start_with_bom() {
        let doc = render(ViewMode::Pl1, "Toán", Grade::Six, &[], None);
        let bytes = doc.bytes();
        assert_eq!(&bytes[..3], &[0xEF, 0xBB, 0xBF]);
        assert_eq!(&bytes[3..], doc.html.as_bytes());
    }

    #[test]
    fn user_text_is_escaped() {
        let mut t = Topic::new("A & B", Semester::First);
        t.lessons.push(Lesson::new(LessonId::new("1"), "<script>"));
        let doc = render(ViewMode::Pl1, "Toán", Grade::Six, &[t], None);
        assert!(doc.html.contains("A &amp; B"));
        assert!(doc.html.contains("&lt;script&gt;"));
        assert!(!doc.html.contains("<script>"));
    }

    #[test]
    fn spans() {
        assert_eq!(span(3, 1), "3");
        assert_eq!(span(4, 2), "4 - 5");
    }
}
