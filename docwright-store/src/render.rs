//! Renders structural instructions into `.docx` bytes with `docx-rs`.

use std::io::Cursor;

use docwright_common::{Instruction, LayoutDirectives, Run, TemplateName, TitleStyle};
use docx_rs::{
    AbstractNumbering, AlignmentType, BreakType, Docx, IndentLevel, Level, LevelJc, LevelText,
    NumberFormat, Numbering, NumberingId, PageMargin, Paragraph, RunFonts, SpecialIndentType,
    Start, Style, StyleType,
};

use crate::error::StoreError;

const BULLET_NUMBERING: usize = 1;
const DECIMAL_NUMBERING: usize = 2;
const TITLE_SIZE_PT: usize = 24;
const BANNER_SIZE_PT: usize = 28;

/// What goes above the body: title block and the metadata lines.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentHeader {
    pub title: String,
    pub author: Option<String>,
    pub template: Option<TemplateName>,
}

pub fn heading_style_id(level: u8) -> String {
    format!("Heading{level}")
}

pub fn render_document(
    header: &DocumentHeader,
    created_label: &str,
    instructions: &[Instruction],
    layout: &LayoutDirectives,
) -> Result<Vec<u8>, StoreError> {
    let mut docx = base_document(layout);

    for paragraph in title_block(&header.title, layout.title_style) {
        docx = docx.add_paragraph(paragraph);
    }
    docx = docx.add_paragraph(text_paragraph(format!("Created: {created_label}")));
    if let Some(author) = &header.author {
        docx = docx.add_paragraph(text_paragraph(format!("Author: {author}")));
    }
    docx = docx.add_paragraph(Paragraph::new());

    for instruction in instructions {
        docx = docx.add_paragraph(instruction_paragraph(instruction));
    }

    let mut buffer = Cursor::new(Vec::new());
    docx.build()
        .pack(&mut buffer)
        .map_err(|e| StoreError::Render(e.to_string()))?;
    Ok(buffer.into_inner())
}

fn base_document(layout: &LayoutDirectives) -> Docx {
    let margin = layout.margin_twips();
    let font = layout.default_font_family;

    let mut docx = Docx::new()
        .page_margin(
            PageMargin::new()
                .top(margin)
                .bottom(margin)
                .left(margin)
                .right(margin),
        )
        .default_fonts(
            RunFonts::new()
                .ascii(font)
                .hi_ansi(font)
                .east_asia(font)
                .cs(font),
        )
        .default_size(usize::from(layout.default_font_size_pt) * 2)
        .add_style(
            Style::new("Title", StyleType::Paragraph)
                .name("Title")
                .size(TITLE_SIZE_PT * 2)
                .bold(),
        )
        .add_abstract_numbering(list_numbering(BULLET_NUMBERING, "bullet", "\u{2022}"))
        .add_numbering(Numbering::new(BULLET_NUMBERING, BULLET_NUMBERING))
        .add_abstract_numbering(list_numbering(DECIMAL_NUMBERING, "decimal", "%1."))
        .add_numbering(Numbering::new(DECIMAL_NUMBERING, DECIMAL_NUMBERING));

    // 見出しは下位レベルほど小さく、本文より小さくはしない
    let body_size = usize::from(layout.default_font_size_pt);
    for level in 1..=6u8 {
        let size = usize::from(layout.heading_size_pt)
            .saturating_sub(usize::from(level - 1))
            .max(body_size);
        docx = docx.add_style(
            Style::new(heading_style_id(level), StyleType::Paragraph)
                .name(format!("Heading {level}"))
                .size(size * 2)
                .bold(),
        );
    }
    docx
}

fn list_numbering(id: usize, format: &str, text: &str) -> AbstractNumbering {
    AbstractNumbering::new(id).add_level(
        Level::new(
            0,
            Start::new(1),
            NumberFormat::new(format),
            LevelText::new(text),
            LevelJc::new("left"),
        )
        .indent(Some(720), Some(SpecialIndentType::Hanging(360)), None, None),
    )
}

fn title_block(title: &str, style: TitleStyle) -> Vec<Paragraph> {
    let title_run = text_run(title);
    match style {
        TitleStyle::Centered => vec![
            Paragraph::new()
                .style("Title")
                .align(AlignmentType::Center)
                .add_run(title_run),
        ],
        TitleStyle::Banner => vec![
            Paragraph::new()
                .style("Title")
                .align(AlignmentType::Center)
                .add_run(title_run.bold().size(BANNER_SIZE_PT * 2)),
        ],
        TitleStyle::MemoHeader => vec![
            Paragraph::new()
                .style("Title")
                .align(AlignmentType::Left)
                .add_run(docx_rs::Run::new().add_text("MEMORANDUM")),
            Paragraph::new()
                .add_run(docx_rs::Run::new().add_text("Subject: ").bold())
                .add_run(title_run),
        ],
        TitleStyle::LeftAligned => vec![
            Paragraph::new()
                .style("Title")
                .align(AlignmentType::Left)
                .add_run(title_run),
        ],
    }
}

fn text_paragraph(text: String) -> Paragraph {
    Paragraph::new().add_run(text_run(&text))
}

fn text_run(text: &str) -> docx_rs::Run {
    docx_rs::Run::new().add_text(xml_safe(text))
}

/// Drops characters XML 1.0 cannot carry: C0 controls other than tab, LF
/// and CR, plus U+FFFE and U+FFFF. docx-rs writes text verbatim.
pub fn xml_safe(text: &str) -> String {
    text.chars()
        .filter(|&c| match c {
            '\t' | '\n' | '\r' => true,
            '\u{FFFE}' | '\u{FFFF}' => false,
            c => c >= ' ',
        })
        .collect()
}

fn instruction_paragraph(instruction: &Instruction) -> Paragraph {
    match instruction {
        Instruction::Heading { level, text } => Paragraph::new()
            .style(&heading_style_id(*level))
            .add_run(text_run(text)),
        Instruction::Paragraph(runs) => with_runs(Paragraph::new(), runs),
        Instruction::BulletItem(runs) => with_runs(
            Paragraph::new().numbering(NumberingId::new(BULLET_NUMBERING), IndentLevel::new(0)),
            runs,
        ),
        Instruction::NumberedItem(runs) => with_runs(
            Paragraph::new().numbering(NumberingId::new(DECIMAL_NUMBERING), IndentLevel::new(0)),
            runs,
        ),
    }
}

fn with_runs(paragraph: Paragraph, runs: &[Run]) -> Paragraph {
    runs.iter()
        .fold(paragraph, |paragraph, run| paragraph.add_run(docx_run(run)))
}

/// Embedded newlines become line breaks inside the run.
fn docx_run(run: &Run) -> docx_rs::Run {
    let mut out = docx_rs::Run::new();
    for (i, line) in run.text.split('\n').enumerate() {
        if i > 0 {
            out = out.add_break(BreakType::TextWrapping);
        }
        out = out.add_text(xml_safe(line));
    }
    if run.bold {
        out = out.bold();
    }
    if run.italic {
        out = out.italic();
    }
    out
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use docwright_common::format;
    use docx_rs::{DocumentChild, ParagraphChild, RunChild};

    /// (style id, text) of every paragraph in a packed document.
    pub(crate) fn paragraphs(bytes: &[u8]) -> Vec<(Option<String>, String)> {
        let docx = docx_rs::read_docx(bytes).expect("document should parse");
        docx.document
            .children
            .iter()
            .filter_map(|child| match child {
                DocumentChild::Paragraph(p) => Some(p),
                _ => None,
            })
            .map(|p| {
                let style = p.property.style.as_ref().map(|s| s.val.clone());
                let text = p
                    .children
                    .iter()
                    .filter_map(|c| match c {
                        ParagraphChild::Run(run) => Some(run),
                        _ => None,
                    })
                    .flat_map(|run| run.children.iter())
                    .filter_map(|c| match c {
                        RunChild::Text(t) => Some(t.text.clone()),
                        _ => None,
                    })
                    .collect::<String>();
                (style, text)
            })
            .collect()
    }

    fn header() -> DocumentHeader {
        DocumentHeader {
            title: "Quarterly".to_string(),
            author: Some("Ana".to_string()),
            template: Some(TemplateName::Standard),
        }
    }

    #[test]
    fn test_heading_is_separate_styled_paragraph() {
        let instructions = format("# Title\n\nSome **bold** text", true);
        let bytes = render_document(
            &header(),
            "October 19, 2026 at 05:53 AM",
            &instructions,
            &TemplateName::Standard.layout(),
        )
        .unwrap();

        let paragraphs = paragraphs(&bytes);
        assert!(paragraphs.contains(&(Some("Title".to_string()), "Quarterly".to_string())));
        assert!(paragraphs.contains(&(Some("Heading1".to_string()), "Title".to_string())));
        let body = paragraphs
            .iter()
            .find(|(_, text)| text == "Some bold text")
            .expect("body paragraph should be present");
        assert_ne!(body.0.as_deref(), Some("Heading1"));
        assert!(paragraphs.iter().any(|(_, text)| text == "Author: Ana"));
    }

    fn document_xml(bytes: &[u8]) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut xml = String::new();
        std::io::Read::read_to_string(&mut archive.by_name("word/document.xml").unwrap(), &mut xml)
            .unwrap();
        xml
    }

    #[test]
    fn test_control_characters_keep_document_well_formed() {
        let instructions = format("a\u{1}b\n\n- \u{1b}[31mred\u{1b}[0m\n\n# page\u{c}break", true);
        let bytes = render_document(
            &DocumentHeader {
                title: "Log\u{7} dump\u{FFFF}".to_string(),
                ..header()
            },
            "today",
            &instructions,
            &TemplateName::Standard.layout(),
        )
        .unwrap();

        let xml = document_xml(&bytes);
        assert!(!xml.chars().any(|c| c < ' ' && !matches!(c, '\t' | '\n' | '\r')));
        assert!(!xml.contains('\u{FFFF}'));
        for event in xml::reader::EventReader::new(xml.as_bytes()) {
            event.expect("document.xml should be well-formed");
        }

        let texts: Vec<String> = paragraphs(&bytes).into_iter().map(|(_, t)| t).collect();
        assert!(texts.contains(&"Log dump".to_string()));
        assert!(texts.contains(&"ab".to_string()));
        assert!(texts.contains(&"[31mred[0m".to_string()));
        assert!(texts.contains(&"pagebreak".to_string()));
    }

    #[test]
    fn test_xml_safe_keeps_whitespace_and_text() {
        assert_eq!(xml_safe("tab\there\r\nok"), "tab\there\r\nok");
        assert_eq!(xml_safe("\u{0}\u{8}x\u{1f}"), "x");
        assert_eq!(xml_safe("日本語 ✓"), "日本語 ✓");
    }

    #[test]
    fn test_memo_header_and_empty_body() {
        let bytes = render_document(
            &DocumentHeader {
                author: None,
                ..header()
            },
            "today",
            &[],
            &TemplateName::Memo.layout(),
        )
        .unwrap();

        let texts: Vec<String> = paragraphs(&bytes).into_iter().map(|(_, t)| t).collect();
        assert_eq!(texts[0], "MEMORANDUM");
        assert_eq!(texts[1], "Subject: Quarterly");
        assert_eq!(texts[2], "Created: today");
        assert!(!texts.iter().any(|t| t.starts_with("Author:")));
    }
}
