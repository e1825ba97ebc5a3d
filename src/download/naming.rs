//! 文件名构造：标题清洗、序号补齐、扩展名推断。

use std::sync::OnceLock;

use regex::Regex;

use crate::base_system::context::safe_fs_name;

use super::models::CurrentItem;

const MAX_NAME_BYTES: usize = 200;
// 各段标题的字节上限，保证 `[序号 - 总数]` 始终落在文件名长度之内
const MAX_COURSE_BYTES: usize = 60;
const MAX_GROUP_BYTES: usize = 36;
const MAX_TITLE_BYTES: usize = 64;

fn duration_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\((\d+):(\d+)\)").expect("valid duration regex"))
}

fn gap_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+_*\s*").expect("valid gap regex"))
}

fn numbering_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+\s*[-.]\s").expect("valid numbering regex"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DurationUnit {
    MinutesSeconds,
    HoursMinutes,
}

fn clean_title(raw: &str, unit: DurationUnit) -> String {
    let first_line = raw.lines().next().unwrap_or_default().trim();
    let replacement = match unit {
        DurationUnit::MinutesSeconds => "(${1}m${2}s)",
        DurationUnit::HoursMinutes => "(${1}h${2}m)",
    };
    let s = duration_re().replace(first_line, replacement);
    let s = s.replace(':', " -");
    let s = gap_re().replace(&s, " ");
    let s = numbering_re().replace(&s, "");
    s.trim().to_string()
}

/// 课时标题：`Intro (3:45)` → `Intro (3m45s)`，去掉 `02 - ` 一类的前置编号。
pub fn clean_lesson_title(raw: &str) -> String {
    clean_title(raw, DurationUnit::MinutesSeconds)
}

/// 章节标题：时长按 时/分 解释。
pub fn clean_section_title(raw: &str) -> String {
    clean_title(raw, DurationUnit::HoursMinutes)
}

/// `[017 - 342]` 中的序号部分，按总数位数补零。
pub fn index_label(ordinal: usize, total: usize) -> String {
    let width = total.max(1).to_string().len();
    format!("{ordinal:0width$} - {total}")
}

/// 不含扩展名的文件名：`课程 [序号 - 总数] 章节序号. 章节 课内序号. 课时`。
pub fn base_name(course: &str, item: &CurrentItem) -> String {
    let course = course.lines().next().unwrap_or_default().trim();
    format!(
        "{} [{}] {}. {} {}. {}",
        fit(course, MAX_COURSE_BYTES),
        index_label(item.ordinal, item.total),
        item.group_index,
        fit(&clean_section_title(&item.group_title), MAX_GROUP_BYTES),
        item.position_in_group,
        fit(&clean_lesson_title(&item.title), MAX_TITLE_BYTES),
    )
}

/// 在字符边界上截断到 `max` 字节。
fn fit(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].trim_end()
}

/// 拼接扩展名并做文件系统安全化；过长时截断主体而保留扩展名。
pub fn file_name(base: &str, ext: &str) -> String {
    file_name_with_suffix(base, "", ext)
}

/// 同 [`file_name`]，但 `suffix`（如 ` (2)`）在截断之后拼接，不会被截掉。
pub fn file_name_with_suffix(base: &str, suffix: &str, ext: &str) -> String {
    let ext = ext.trim().trim_start_matches('.');
    let ext = safe_fs_name(ext, "_", 16);
    let budget = MAX_NAME_BYTES.saturating_sub(ext.len() + 1 + suffix.len());
    format!("{}{}.{}", safe_fs_name(base, "_", budget), suffix, ext)
}

/// 从原始下载名或 URL 路径推断扩展名。
pub fn extension_for(origin_name: Option<&str>, url: &str) -> Option<String> {
    if let Some(ext) = origin_name.and_then(ext_of) {
        return Some(ext);
    }
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let last = path.rsplit('/').next().unwrap_or_default();
    ext_of(last)
}

fn ext_of(name: &str) -> Option<String> {
    let (stem, ext) = name.trim().rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || ext.len() > 8 {
        return None;
    }
    if !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn current(ordinal: usize, total: usize) -> CurrentItem {
        CurrentItem {
            ordinal,
            total,
            group_index: 2,
            group_title: "Ownership (1:05)\n3 lessons".to_string(),
            position_in_group: 4,
            title: "07 - Borrowing: the rules (3:45)".to_string(),
            downloads: Vec::new(),
            capture: None,
        }
    }

    #[test]
    fn cleans_titles() {
        assert_eq!(clean_lesson_title("Intro (3:45)\nStart"), "Intro (3m45s)");
        assert_eq!(clean_section_title("Basics (1:05)"), "Basics (1h05m)");
        assert_eq!(clean_lesson_title("12 - Traits: a tour"), "Traits - a tour");
        assert_eq!(clean_lesson_title("  Setup   _  tools "), "Setup tools");
    }

    #[test]
    fn builds_padded_base_name() {
        assert_eq!(index_label(17, 342), "017 - 342");
        assert_eq!(index_label(3, 9), "3 - 9");
        assert_eq!(
            base_name("Rust Course", &current(17, 342)),
            "Rust Course [017 - 342] 2. Ownership (1h05m) 4. Borrowing - the rules (3m45s)"
        );
    }

    #[test]
    fn infers_extension() {
        assert_eq!(extension_for(Some("clip.MP4"), "https://x/y"), Some("mp4".into()));
        assert_eq!(
            extension_for(None, "https://cdn.example.com/a/b/slides.pdf?sig=1"),
            Some("pdf".into())
        );
        assert_eq!(extension_for(Some("noext"), "https://x/stream"), None);
        assert_eq!(extension_for(None, "https://x/.hidden"), None);
    }

    #[test]
    fn file_name_is_safe_and_bounded() {
        assert_eq!(file_name("a/b: c", ".mp4"), "a_b_ c.mp4");
        let long = "x".repeat(500);
        let name = file_name(&long, "pdf");
        assert!(name.len() <= MAX_NAME_BYTES);
        assert!(name.ends_with(".pdf"));

        let name = file_name_with_suffix(&long, " (2)", "pdf");
        assert!(name.len() <= MAX_NAME_BYTES);
        assert!(name.ends_with("x (2).pdf"));
    }

    #[test]
    fn long_course_name_keeps_index_and_titles() {
        let course = "零基础入门到精通".repeat(9);
        let mut first = current(1, 2);
        first.title = "Intro".to_string();
        let mut second = current(2, 2);
        second.title = "Setup".to_string();

        let a = file_name(&base_name(&course, &first), "mp4");
        let b = file_name(&base_name(&course, &second), "mp4");
        assert_ne!(a, b);
        assert!(a.contains("[1 - 2]") && a.ends_with("4. Intro.mp4"));
        assert!(b.contains("[2 - 2]") && b.ends_with("4. Setup.mp4"));
        assert!(a.len() <= MAX_NAME_BYTES);

        let mut verbose = current(342, 342);
        verbose.group_title = "g".repeat(300);
        verbose.title = "t".repeat(300);
        let name = file_name(&base_name(&"c".repeat(300), &verbose), "mp4");
        assert!(name.len() <= MAX_NAME_BYTES);
        assert!(name.contains("[342 - 342]"));
    }
}
