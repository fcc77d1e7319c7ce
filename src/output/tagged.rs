//! The report document: one `<tag>...</tag>` block per section, in order,
//! with one line of text per content unit.

use crate::report::NarrativeReport;

pub fn render_tagged(report: &NarrativeReport) -> String {
    report
        .sections
        .iter()
        .map(|section| {
            let tag = section.kind.as_tag();
            let body = section
                .units
                .iter()
                .map(|unit| unit.text.as_str())
                .collect::<Vec<_>>()
                .join("\n");
            format!("<{tag}>\n{body}\n</{tag}>\n")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Opening tags found at the start of a line, in document order.
pub fn top_level_tags(document: &str) -> Vec<String> {
    document
        .lines()
        .filter_map(|line| {
            let tag = line.trim().strip_prefix('<')?.strip_suffix('>')?;
            (!tag.starts_with('/')).then(|| tag.to_string())
        })
        .collect()
}
