use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};
use tracing::info;

use crate::config::PageSetup;
use crate::helpers::fonts::{self, FontStyle};
use crate::models::handover::{
    ComponentRecord, DocumentationChecklist, Marker, Project, REGISTER_COLUMNS,
};

pub const MIME_TYPE: &str = "application/pdf";

pub const CHECKLIST_HEADING: &str = "1. Dokumentationspflicht bei Übergabe";
pub const REGISTER_HEADING: &str = "2. Komponentenregister (Garantie & Gewährleistung)";
pub const LEGAL_HEADING: &str = "3. Rechtliche / normative Bezugspunkte";

const TITLE_SIZE: f32 = 18.0;
const HEADING_SIZE: f32 = 14.0;
const BODY_SIZE: f32 = 10.0;
const TABLE_HEADER_SIZE: f32 = 8.0;
const TABLE_BODY_SIZE: f32 = 7.0;
const LEADING: f32 = 1.2;
const CELL_PADDING: f32 = 2.0;
const GRID_LINE_WIDTH: f32 = 0.25;
const GRID_GRAY: f32 = 0.5;
const HEADER_GRAY: f32 = 0.827;
const MIN_COLUMN_WIDTH: f32 = 24.0;
const MAX_COLUMN_WIDTH: f32 = 120.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub style: FontStyle,
    pub text: String,
}

impl Run {
    pub fn new(style: FontStyle, text: impl Into<String>) -> Self {
        Self {
            style,
            text: text.into(),
        }
    }
}

/// A unit of report content, laid out top to bottom.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Title(String),
    Heading(String),
    /// Explicit lines; each is wrapped on its own.
    Paragraph(Vec<Vec<Run>>),
    Bullet(Vec<Run>),
    /// Header row plus data rows; the header repeats on every page.
    Table {
        header: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    Spacer(f32),
}

impl Block {
    pub fn plain_text(&self) -> String {
        let runs_text = |runs: &[Run]| runs.iter().map(|run| run.text.as_str()).collect::<String>();
        match self {
            Block::Title(text) | Block::Heading(text) => text.clone(),
            Block::Paragraph(lines) => lines
                .iter()
                .map(|line| runs_text(line.as_slice()))
                .collect::<Vec<_>>()
                .join("\n"),
            Block::Bullet(runs) => runs_text(runs.as_slice()),
            Block::Table { header, .. } => header.join(" | "),
            Block::Spacer(_) => String::new(),
        }
    }
}

/// Lays out the report content without rendering it.
pub fn build_story(
    project: &Project,
    checklist: &DocumentationChecklist,
    components: &[ComponentRecord],
    legal_references: &[String],
    generated_on: NaiveDate,
) -> Vec<Block> {
    let mut story = Vec::new();

    story.push(Block::Title(format!(
        "Übergabedokumentation & Komponentenregister – Projekt {}",
        project.project_number.trim()
    )));
    story.push(Block::Spacer(6.0));

    let summary = project
        .summary_fields()
        .into_iter()
        .map(|(label, value)| {
            vec![
                Run::new(FontStyle::Bold, format!("{}:", label)),
                Run::new(FontStyle::Regular, format!(" {}", value)),
            ]
        })
        .collect();
    story.push(Block::Paragraph(summary));
    story.push(Block::Spacer(12.0));

    story.push(Block::Heading(CHECKLIST_HEADING.to_string()));
    for line in checklist.lines() {
        let marker = match line.marker {
            Marker::Present => Run::new(FontStyle::Symbol, Marker::Present.glyph().to_string()),
            Marker::Absent => Run::new(FontStyle::Regular, Marker::Absent.glyph().to_string()),
        };
        story.push(Block::Bullet(vec![
            Run::new(FontStyle::Regular, "• "),
            marker,
            Run::new(FontStyle::Regular, format!(" {}", line.text)),
        ]));
    }
    story.push(Block::Spacer(12.0));

    story.push(Block::Heading(REGISTER_HEADING.to_string()));
    story.push(Block::Table {
        header: REGISTER_COLUMNS.iter().map(|column| column.to_string()).collect(),
        rows: components
            .iter()
            .map(|component| {
                component
                    .register_row()
                    .iter()
                    .map(ToString::to_string)
                    .collect()
            })
            .collect(),
    });
    story.push(Block::Spacer(12.0));

    story.push(Block::Heading(LEGAL_HEADING.to_string()));
    for reference in legal_references {
        story.push(Block::Bullet(vec![
            Run::new(FontStyle::Regular, "• "),
            Run::new(FontStyle::Regular, reference.clone()),
        ]));
    }
    story.push(Block::Spacer(18.0));

    story.push(Block::Paragraph(vec![vec![Run::new(
        FontStyle::Italic,
        format!(
            "Erstellt am {} über die Vor-Ort-App.",
            generated_on.format("%Y-%m-%d")
        ),
    )]]));

    story
}

/// Renders the handover report on the default page setup, dated today.
pub fn export_report(
    project: &Project,
    checklist: &DocumentationChecklist,
    components: &[ComponentRecord],
    legal_references: &[String],
) -> Result<Vec<u8>> {
    render_report(
        project,
        checklist,
        components,
        legal_references,
        &PageSetup::default(),
        Local::now().date_naive(),
    )
}

pub fn render_report(
    project: &Project,
    checklist: &DocumentationChecklist,
    components: &[ComponentRecord],
    legal_references: &[String],
    page: &PageSetup,
    generated_on: NaiveDate,
) -> Result<Vec<u8>> {
    let story = build_story(project, checklist, components, legal_references, generated_on);

    let mut canvas = PageCanvas::new(page);
    for block in &story {
        canvas.draw_block(block);
    }
    let pages = canvas.finish();
    info!("Laid out report for {} component(s) on {} page(s)", components.len(), pages.len());

    let title = story
        .first()
        .map(Block::plain_text)
        .unwrap_or_default();
    let mut doc = assemble_document(pages, page, &title)?;

    let mut output_buffer: Vec<u8> = Vec::new();
    doc.save_to(&mut output_buffer)
        .context("Failed to convert PDF to bytes")?;
    info!(
        "Successfully rendered report PDF, size: {} bytes",
        output_buffer.len()
    );

    Ok(output_buffer)
}

fn assemble_document(pages: Vec<Vec<Operation>>, setup: &PageSetup, title: &str) -> Result<Document> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut font_dict = dictionary! {};
    for style in FontStyle::ALL {
        let mut font = dictionary! {
            b"Type" => Object::Name(b"Font".to_vec()),
            b"Subtype" => Object::Name(b"Type1".to_vec()),
            b"BaseFont" => Object::Name(style.base_font().as_bytes().to_vec()),
        };
        if !style.is_symbolic() {
            font.set(b"Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));
        }
        let font_id = doc.add_object(font);
        font_dict.set(style.resource().as_bytes(), Object::Reference(font_id));
    }
    let resources_id = doc.add_object(dictionary! {
        b"Font" => Object::Dictionary(font_dict),
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for operations in pages {
        let content = Content { operations };
        let encoded = content
            .encode()
            .context("Failed to encode page content")?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id: ObjectId = doc.add_object(dictionary! {
            b"Type" => Object::Name(b"Page".to_vec()),
            b"Parent" => Object::Reference(pages_id),
            b"Contents" => Object::Reference(content_id),
        });
        kids.push(Object::Reference(page_id));
    }

    let page_count = kids.len() as i64;
    let page_tree = dictionary! {
        b"Type" => Object::Name(b"Pages".to_vec()),
        b"Kids" => Object::Array(kids),
        b"Count" => Object::Integer(page_count),
        b"Resources" => Object::Reference(resources_id),
        b"MediaBox" => Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(setup.width),
            Object::Real(setup.height),
        ]),
    };
    doc.objects.insert(pages_id, Object::Dictionary(page_tree));

    let catalog_id = doc.add_object(dictionary! {
        b"Type" => Object::Name(b"Catalog".to_vec()),
        b"Pages" => Object::Reference(pages_id),
    });
    let info_id = doc.add_object(dictionary! {
        b"Title" => Object::String(text_string(title), StringFormat::Hexadecimal),
        b"Producer" => Object::String(b"pv-handover-register".to_vec(), StringFormat::Literal),
    });
    doc.trailer.set(b"Root", Object::Reference(catalog_id));
    doc.trailer.set(b"Info", Object::Reference(info_id));
    doc.compress();

    Ok(doc)
}

/// UTF-16BE with byte order mark, as PDF expects for document metadata.
fn text_string(text: &str) -> Vec<u8> {
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    bytes
}

fn runs_width(runs: &[Run], size: f32) -> f32 {
    runs.iter()
        .map(|run| fonts::text_width(&run.text, run.style, size))
        .sum()
}

// Alternating whitespace and non-whitespace segments.
fn split_tokens(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut in_space: Option<bool> = None;
    for (index, ch) in text.char_indices() {
        let space = ch.is_whitespace();
        if in_space.is_some_and(|previous| previous != space) {
            tokens.push(&text[start..index]);
            start = index;
        }
        in_space = Some(space);
    }
    if start < text.len() {
        tokens.push(&text[start..]);
    }
    tokens
}

fn push_text(line: &mut Vec<Run>, style: FontStyle, text: &str) {
    match line.last_mut() {
        Some(last) if last.style == style => last.text.push_str(text),
        _ => line.push(Run::new(style, text)),
    }
}

fn finish_line(mut line: Vec<Run>) -> Vec<Run> {
    if let Some(last) = line.last_mut() {
        let trimmed = last.text.trim_end().len();
        last.text.truncate(trimmed);
    }
    line
}

/// Greedy word wrap across styled runs. Words wider than a whole line are
/// broken between characters.
pub fn wrap_runs(runs: &[Run], size: f32, max_width: f32) -> Vec<Vec<Run>> {
    let mut lines = Vec::new();
    let mut line: Vec<Run> = Vec::new();
    let mut width = 0.0;

    for run in runs {
        for token in split_tokens(&run.text) {
            let is_space = token.chars().all(char::is_whitespace);
            if is_space && line.is_empty() && !lines.is_empty() {
                continue;
            }

            let token_width = fonts::text_width(token, run.style, size);
            if !is_space && !line.is_empty() && width + token_width > max_width {
                lines.push(finish_line(std::mem::take(&mut line)));
                width = 0.0;
            }

            if !is_space && token_width > max_width {
                let mut chunk = String::new();
                let mut chunk_width = 0.0;
                for ch in token.chars() {
                    let ch_width = fonts::char_width(ch, run.style) as f32 * size / 1000.0;
                    if !chunk.is_empty() && width + chunk_width + ch_width > max_width {
                        push_text(&mut line, run.style, &chunk);
                        lines.push(std::mem::take(&mut line));
                        chunk.clear();
                        chunk_width = 0.0;
                        width = 0.0;
                    }
                    chunk.push(ch);
                    chunk_width += ch_width;
                }
                push_text(&mut line, run.style, &chunk);
                width += chunk_width;
                continue;
            }

            push_text(&mut line, run.style, token);
            width += token_width;
        }
    }

    if !line.is_empty() || lines.is_empty() {
        lines.push(finish_line(line));
    }
    lines
}

/// Column widths proportional to each column's widest content, scaled to
/// fill `available`.
pub fn column_widths(header: &[String], rows: &[Vec<String>], available: f32) -> Vec<f32> {
    let natural: Vec<f32> = header
        .iter()
        .enumerate()
        .map(|(col, title)| {
            let header_width = fonts::text_width(title, FontStyle::Bold, TABLE_HEADER_SIZE);
            let body_width = rows
                .iter()
                .filter_map(|row| row.get(col))
                .map(|cell| fonts::text_width(cell, FontStyle::Regular, TABLE_BODY_SIZE))
                .fold(0.0, f32::max);
            header_width.max(body_width).clamp(MIN_COLUMN_WIDTH, MAX_COLUMN_WIDTH)
                + 2.0 * CELL_PADDING
        })
        .collect();

    let total: f32 = natural.iter().sum();
    if total <= 0.0 {
        return natural;
    }
    natural.iter().map(|width| width * available / total).collect()
}

type CellLines = Vec<Vec<Run>>;

struct PageCanvas<'a> {
    setup: &'a PageSetup,
    finished: Vec<Vec<Operation>>,
    ops: Vec<Operation>,
    cursor: f32,
}

impl<'a> PageCanvas<'a> {
    fn new(setup: &'a PageSetup) -> Self {
        Self {
            setup,
            finished: Vec::new(),
            ops: Vec::new(),
            cursor: setup.content_top(),
        }
    }

    fn at_top(&self) -> bool {
        self.cursor >= self.setup.content_top()
    }

    fn new_page(&mut self) {
        self.finished.push(std::mem::take(&mut self.ops));
        self.cursor = self.setup.content_top();
    }

    fn reserve(&mut self, height: f32) {
        if self.cursor - height < self.setup.margin_bottom && !self.at_top() {
            self.new_page();
        }
    }

    fn skip(&mut self, height: f32) {
        if !self.at_top() {
            self.cursor = (self.cursor - height).max(self.setup.margin_bottom);
        }
    }

    fn finish(mut self) -> Vec<Vec<Operation>> {
        self.finished.push(self.ops);
        self.finished
    }

    fn draw_block(&mut self, block: &Block) {
        let width = self.setup.content_width();
        match block {
            Block::Title(text) => {
                let lines = wrap_runs(&[Run::new(FontStyle::Bold, text.clone())], TITLE_SIZE, width);
                self.write_lines(&lines, TITLE_SIZE, true);
            }
            Block::Heading(text) => {
                self.skip(10.0);
                self.reserve(HEADING_SIZE * LEADING + 3.0 * BODY_SIZE * LEADING);
                let lines = wrap_runs(&[Run::new(FontStyle::Bold, text.clone())], HEADING_SIZE, width);
                self.write_lines(&lines, HEADING_SIZE, false);
                self.skip(6.0);
            }
            Block::Paragraph(paragraph) => {
                for line in paragraph {
                    let lines = wrap_runs(line, BODY_SIZE, width);
                    self.write_lines(&lines, BODY_SIZE, false);
                }
            }
            Block::Bullet(runs) => {
                let lines = wrap_runs(runs, BODY_SIZE, width);
                self.write_lines(&lines, BODY_SIZE, false);
            }
            Block::Table { header, rows } => self.draw_table(header, rows),
            Block::Spacer(height) => self.skip(*height),
        }
    }

    fn write_lines(&mut self, lines: &[Vec<Run>], size: f32, centered: bool) {
        let leading = size * LEADING;
        for line in lines {
            self.reserve(leading);
            let x = if centered {
                let free = self.setup.content_width() - runs_width(line, size);
                self.setup.margin_left + free.max(0.0) / 2.0
            } else {
                self.setup.margin_left
            };
            let baseline = self.cursor - size;
            self.text(x, baseline, line, size);
            self.cursor -= leading;
        }
    }

    fn draw_table(&mut self, header: &[String], rows: &[Vec<String>]) {
        let widths = column_widths(header, rows, self.setup.content_width());
        let header_cells = layout_row(header, &widths, FontStyle::Bold, TABLE_HEADER_SIZE);
        let header_height = row_height(&header_cells, TABLE_HEADER_SIZE);

        self.reserve(header_height + TABLE_BODY_SIZE * LEADING + 2.0 * CELL_PADDING);
        self.draw_row(&header_cells, &widths, header_height, TABLE_HEADER_SIZE, true);

        let line_height = TABLE_BODY_SIZE * LEADING;
        for row in rows {
            let mut cells = layout_row(row, &widths, FontStyle::Regular, TABLE_BODY_SIZE);
            let mut fresh_page = false;
            loop {
                let height = row_height(&cells, TABLE_BODY_SIZE);
                if self.cursor - height >= self.setup.margin_bottom {
                    self.draw_row(&cells, &widths, height, TABLE_BODY_SIZE, false);
                    break;
                }

                // Rows taller than the remaining space continue on the next
                // page below a repeated header.
                let free = self.cursor - self.setup.margin_bottom - 2.0 * CELL_PADDING;
                let mut fitting = (free / line_height).floor().max(0.0) as usize;
                if fitting == 0 && fresh_page {
                    fitting = 1;
                }
                if fitting > 0 {
                    let rest = split_cells(&mut cells, fitting);
                    let height = row_height(&cells, TABLE_BODY_SIZE);
                    self.draw_row(&cells, &widths, height, TABLE_BODY_SIZE, false);
                    cells = rest;
                }

                self.new_page();
                self.draw_row(&header_cells, &widths, header_height, TABLE_HEADER_SIZE, true);
                fresh_page = true;
            }
        }
    }

    fn draw_row(&mut self, cells: &[CellLines], widths: &[f32], height: f32, size: f32, shaded: bool) {
        let top = self.cursor;
        let bottom = top - height;
        let left = self.setup.margin_left;

        if shaded {
            let total: f32 = widths.iter().sum();
            self.fill_rect(left, bottom, total, height, HEADER_GRAY);
        }

        let mut x = left;
        for (lines, width) in cells.iter().zip(widths) {
            self.stroke_rect(x, bottom, *width, height);
            for (index, line) in lines.iter().enumerate() {
                let baseline = top - CELL_PADDING - index as f32 * size * LEADING - size * 0.9;
                self.text(x + CELL_PADDING, baseline, line, size);
            }
            x += width;
        }

        self.cursor = bottom;
    }

    fn text(&mut self, x: f32, baseline: f32, runs: &[Run], size: f32) {
        if runs.iter().all(|run| run.text.is_empty()) {
            return;
        }
        self.ops.push(Operation::new("BT", vec![]));
        self.ops.push(Operation::new("Td", vec![x.into(), baseline.into()]));
        for run in runs.iter().filter(|run| !run.text.is_empty()) {
            self.ops.push(Operation::new(
                "Tf",
                vec![
                    Object::Name(run.style.resource().as_bytes().to_vec()),
                    size.into(),
                ],
            ));
            self.ops.push(Operation::new(
                "Tj",
                vec![Object::String(
                    fonts::encode(&run.text, run.style),
                    StringFormat::Hexadecimal,
                )],
            ));
        }
        self.ops.push(Operation::new("ET", vec![]));
    }

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, gray: f32) {
        self.ops.push(Operation::new("q", vec![]));
        self.ops.push(Operation::new("g", vec![gray.into()]));
        self.ops.push(Operation::new(
            "re",
            vec![x.into(), y.into(), width.into(), height.into()],
        ));
        self.ops.push(Operation::new("f", vec![]));
        self.ops.push(Operation::new("Q", vec![]));
    }

    fn stroke_rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
        self.ops.push(Operation::new("q", vec![]));
        self.ops.push(Operation::new("w", vec![GRID_LINE_WIDTH.into()]));
        self.ops.push(Operation::new("G", vec![GRID_GRAY.into()]));
        self.ops.push(Operation::new(
            "re",
            vec![x.into(), y.into(), width.into(), height.into()],
        ));
        self.ops.push(Operation::new("S", vec![]));
        self.ops.push(Operation::new("Q", vec![]));
    }
}

fn layout_row(cells: &[String], widths: &[f32], style: FontStyle, size: f32) -> Vec<CellLines> {
    widths
        .iter()
        .enumerate()
        .map(|(col, width)| {
            let text = cells.get(col).cloned().unwrap_or_default();
            wrap_runs(&[Run::new(style, text)], size, width - 2.0 * CELL_PADDING)
        })
        .collect()
}

/// Keeps the first `lines` wrapped lines of every cell and returns the rest.
fn split_cells(cells: &mut [CellLines], lines: usize) -> Vec<CellLines> {
    cells
        .iter_mut()
        .map(|cell| cell.split_off(lines.min(cell.len())))
        .collect()
}

fn row_height(cells: &[CellLines], size: f32) -> f32 {
    let lines = cells.iter().map(Vec::len).max().unwrap_or(1).max(1);
    lines as f32 * size * LEADING + 2.0 * CELL_PADDING
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_legal_references;
    use crate::models::handover::{ChecklistEntry, ChecklistFlags};

    fn generated_on() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, 25).unwrap()
    }

    fn project() -> Project {
        Project {
            project_number: "2025-08-25-001".to_string(),
            customer_name: "Familie Schäfer".to_string(),
            street: "Lindenweg".to_string(),
            house_number: "3".to_string(),
            postal_code: "79100".to_string(),
            city: "Freiburg".to_string(),
            commissioning_date: NaiveDate::from_ymd_opt(2025, 8, 20),
            acceptance_date: NaiveDate::from_ymd_opt(2025, 8, 25),
            technician: "J. Keller".to_string(),
            technician_contact: "0761 555".to_string(),
        }
    }

    fn components(count: usize) -> Vec<ComponentRecord> {
        (0..count)
            .map(|index| ComponentRecord {
                component: format!("Modul {}", index + 1),
                manufacturer: "Hersteller".to_string(),
                serial_number: format!("SN-{:05}", index),
                warranty_start: "2024-01-01".to_string(),
                warranty_duration_years: Some(10.0),
                ..Default::default()
            })
            .collect()
    }

    fn story(count: usize) -> Vec<Block> {
        build_story(
            &project(),
            &DocumentationChecklist::from(ChecklistFlags {
                commissioning_protocol: true,
                test_protocols: false,
                handover_protocol: true,
            }),
            &components(count),
            &default_legal_references(),
            generated_on(),
        )
    }

    fn tables(story: &[Block]) -> Vec<(&Vec<String>, &Vec<Vec<String>>)> {
        story
            .iter()
            .filter_map(|block| match block {
                Block::Table { header, rows } => Some((header, rows)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn story_starts_with_title_and_summary() {
        let story = story(1);
        assert_eq!(
            story[0].plain_text(),
            "Übergabedokumentation & Komponentenregister – Projekt 2025-08-25-001"
        );
        let summary = story[2].plain_text();
        assert_eq!(summary.lines().count(), 6);
        assert!(summary.contains("Objektadresse: Lindenweg 3, 79100 Freiburg"));
        assert!(summary.contains("Techniker: J. Keller (0761 555)"));
    }

    #[test]
    fn table_has_header_and_one_row_per_component() {
        let story = story(3);
        let tables = tables(&story);
        assert_eq!(tables.len(), 1);

        let (header, rows) = tables[0];
        assert_eq!(header.as_slice(), REGISTER_COLUMNS.as_slice());
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|row| row[10] == "2033-12-31"));
        assert!(rows.iter().all(|row| row[4].is_empty()));
    }

    #[test]
    fn checklist_bullets_carry_exactly_one_marker() {
        let checklist = DocumentationChecklist {
            entries: vec![
                ChecklistEntry::Flat {
                    label: "Anlagenpass".to_string(),
                    present: false,
                },
                ChecklistEntry::Grouped {
                    label: "Prüfprotokolle".to_string(),
                    items: vec![("vorhanden".to_string(), true)],
                },
            ],
        };
        let story = build_story(&project(), &checklist, &[], &[], generated_on());
        let bullets: Vec<String> = story
            .iter()
            .filter(|block| matches!(block, Block::Bullet(_)))
            .map(Block::plain_text)
            .collect();

        assert_eq!(bullets, vec!["• — Anlagenpass", "• ✔ Prüfprotokolle: vorhanden"]);
        for bullet in &bullets {
            let markers = bullet.chars().filter(|ch| *ch == '✔' || *ch == '—').count();
            assert_eq!(markers, 1);
        }
    }

    #[test]
    fn legal_references_and_closing_line_are_verbatim() {
        let story = story(0);
        let texts: Vec<String> = story.iter().map(Block::plain_text).collect();
        for reference in default_legal_references() {
            assert!(texts.contains(&format!("• {}", reference)));
        }
        assert_eq!(
            texts.last().map(String::as_str),
            Some("Erstellt am 2025-08-25 über die Vor-Ort-App.")
        );
    }

    #[test]
    fn story_is_idempotent() {
        assert_eq!(story(4), story(4));
    }

    #[test]
    fn wrap_breaks_on_words_then_characters() {
        let runs = [Run::new(FontStyle::Regular, "alpha beta gamma")];
        let one_word = fonts::text_width("gamma", FontStyle::Regular, 10.0) + 1.0;
        let lines = wrap_runs(&runs, 10.0, one_word);
        let texts: Vec<String> = lines
            .iter()
            .map(|line| line.iter().map(|run| run.text.as_str()).collect())
            .collect();
        assert_eq!(texts, vec!["alpha", "beta", "gamma"]);

        let long = [Run::new(FontStyle::Regular, "Inbetriebnahmedatum")];
        let lines = wrap_runs(&long, 10.0, 30.0);
        assert!(lines.len() > 1);
        let joined: String = lines.iter().flatten().map(|run| run.text.as_str()).collect();
        assert_eq!(joined, "Inbetriebnahmedatum");
    }

    #[test]
    fn wrap_keeps_styles_apart() {
        let runs = [
            Run::new(FontStyle::Bold, "Kunde:"),
            Run::new(FontStyle::Regular, " Muster"),
        ];
        let lines = wrap_runs(&runs, 10.0, 500.0);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0], runs.to_vec());
    }

    #[test]
    fn columns_fill_available_width() {
        let header: Vec<String> = REGISTER_COLUMNS.iter().map(|c| c.to_string()).collect();
        let widths = column_widths(&header, &[], 480.0);
        assert_eq!(widths.len(), REGISTER_COLUMNS.len());
        assert!((widths.iter().sum::<f32>() - 480.0).abs() < 0.01);
    }

    fn fill_count(doc: &Document, page_id: ObjectId) -> usize {
        let content = doc.get_page_content(page_id).unwrap();
        Content::decode(&content)
            .unwrap()
            .operations
            .iter()
            .filter(|op| op.operator == "f")
            .count()
    }

    #[test]
    fn renders_loadable_pdf() {
        let checklist = DocumentationChecklist::from(ChecklistFlags::default());
        let bytes = render_report(
            &project(),
            &checklist,
            &components(2),
            &default_legal_references(),
            &PageSetup::default(),
            generated_on(),
        )
        .unwrap();

        assert!(bytes.starts_with(b"%PDF-1.5"));
        let doc = Document::load_mem(&bytes).unwrap();
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 1);
        assert_eq!(fill_count(&doc, pages[&1]), 1);
    }

    #[test]
    fn header_row_repeats_on_every_table_page() {
        let checklist = DocumentationChecklist::from(ChecklistFlags::default());
        let bytes = render_report(
            &project(),
            &checklist,
            &components(150),
            &default_legal_references(),
            &PageSetup::default(),
            generated_on(),
        )
        .unwrap();

        let doc = Document::load_mem(&bytes).unwrap();
        let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
        assert!(pages.len() >= 3);
        let (last, table_pages) = pages.split_last().unwrap();
        for page_id in table_pages {
            assert_eq!(fill_count(&doc, *page_id), 1);
        }
        assert!(fill_count(&doc, *last) <= 1);
    }

    fn page_operations(doc: &Document, page_id: ObjectId) -> Vec<Operation> {
        let content = doc.get_page_content(page_id).unwrap();
        Content::decode(&content).unwrap().operations
    }

    #[test]
    fn over_tall_row_continues_on_following_pages() {
        let mut rows = components(1);
        rows[0].remarks = "Bemerkung ".repeat(800);
        let setup = PageSetup::default();
        let checklist = DocumentationChecklist::from(ChecklistFlags::default());
        let bytes = render_report(
            &project(),
            &checklist,
            &rows,
            &default_legal_references(),
            &setup,
            generated_on(),
        )
        .unwrap();

        let doc = Document::load_mem(&bytes).unwrap();
        let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
        assert!(pages.len() >= 3);

        let mut remark_words = 0;
        for page_id in &pages {
            for op in page_operations(&doc, *page_id) {
                match op.operator.as_str() {
                    "Td" => {
                        let y = op.operands[1].as_float().unwrap();
                        assert!(y >= setup.margin_bottom && y <= setup.content_top(), "text at y={}", y);
                    }
                    "Tj" => {
                        let shown = op.operands[0].as_str().unwrap();
                        remark_words += shown
                            .split(|byte| *byte == b' ')
                            .filter(|word| *word == b"Bemerkung".as_slice())
                            .count();
                    }
                    _ => {}
                }
            }
        }
        assert_eq!(remark_words, 800);

        // Every continuation page starts with the repeated header.
        for page_id in &pages[..pages.len() - 1] {
            assert_eq!(fill_count(&doc, *page_id), 1);
        }
    }

    #[test]
    fn document_title_is_utf16_metadata() {
        let checklist = DocumentationChecklist::from(ChecklistFlags::default());
        let bytes = render_report(
            &project(),
            &checklist,
            &[],
            &[],
            &PageSetup::default(),
            generated_on(),
        )
        .unwrap();

        let doc = Document::load_mem(&bytes).unwrap();
        let info_id = doc.trailer.get(b"Info").unwrap().as_reference().unwrap();
        let title = doc
            .get_dictionary(info_id)
            .unwrap()
            .get(b"Title")
            .unwrap()
            .as_str()
            .unwrap();

        assert!(title.starts_with(&[0xFE, 0xFF]));
        let units: Vec<u16> = title[2..]
            .chunks(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        assert_eq!(
            String::from_utf16(&units).unwrap(),
            "Übergabedokumentation & Komponentenregister – Projekt 2025-08-25-001"
        );
    }
}
