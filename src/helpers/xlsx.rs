use anyhow::{Context, Result};
use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook, Worksheet};
use tracing::info;

use crate::models::handover::{ComponentRecord, Project, REGISTER_COLUMNS, RegisterCell};

pub const PROJECT_SHEET: &str = "Projekt";
pub const REGISTER_SHEET: &str = "Komponentenregister";
pub const PROJECT_HEADER: [&str; 2] = ["Feld", "Wert"];

pub const MIME_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

struct SheetFormats {
    header: Format,
    text: Format,
    number: Format,
}

impl SheetFormats {
    fn new() -> Self {
        let header = Format::new()
            .set_bold()
            .set_background_color(0xD3D3D3)
            .set_border(FormatBorder::Thin)
            .set_align(FormatAlign::Top);

        let text = Format::new()
            .set_border(FormatBorder::Thin)
            .set_align(FormatAlign::Top);

        let number = Format::new()
            .set_num_format("0")
            .set_border(FormatBorder::Thin)
            .set_align(FormatAlign::Top);

        Self {
            header,
            text,
            number,
        }
    }
}

/// (field, value) rows of the project sheet, without the header.
pub fn project_sheet_rows(project: &Project) -> Vec<[String; 2]> {
    project
        .summary_fields()
        .into_iter()
        .map(|(label, value)| [label.to_string(), value])
        .collect()
}

/// Register rows of the component sheet, without the header.
pub fn register_sheet_rows(components: &[ComponentRecord]) -> Vec<Vec<RegisterCell>> {
    components.iter().map(ComponentRecord::register_row).collect()
}

/// Builds the two-sheet workbook. All rows are computed before anything is
/// written, and any writer error fails the export as a whole.
pub fn export_spreadsheet(project: &Project, components: &[ComponentRecord]) -> Result<Vec<u8>> {
    let project_rows = project_sheet_rows(project);
    let register_rows = register_sheet_rows(components);
    let formats = SheetFormats::new();

    let mut workbook = Workbook::new();

    let sheet = workbook.add_worksheet();
    sheet
        .set_name(PROJECT_SHEET)
        .context("Failed to name project sheet")?;
    write_project_sheet(sheet, &project_rows, &formats)?;

    let sheet = workbook.add_worksheet();
    sheet
        .set_name(REGISTER_SHEET)
        .context("Failed to name register sheet")?;
    write_register_sheet(sheet, &register_rows, &formats)?;

    let buffer = workbook
        .save_to_buffer()
        .context("Failed to create Excel workbook")?;

    info!(
        "Created spreadsheet with {} component rows, size: {} bytes",
        register_rows.len(),
        buffer.len()
    );

    Ok(buffer)
}

fn write_project_sheet(
    sheet: &mut Worksheet,
    rows: &[[String; 2]],
    formats: &SheetFormats,
) -> Result<()> {
    for (col, header) in PROJECT_HEADER.iter().enumerate() {
        sheet
            .write_string_with_format(0, col as u16, *header, &formats.header)
            .context("Failed to write project header")?;
    }

    for (index, [field, value]) in rows.iter().enumerate() {
        let row = index as u32 + 1;
        sheet
            .write_string_with_format(row, 0, field, &formats.text)
            .context("Failed to write project field")?;
        sheet
            .write_string_with_format(row, 1, value, &formats.text)
            .context("Failed to write project value")?;
    }

    let value_width = rows.iter().map(|[_, value]| value.chars().count()).max();
    sheet.set_column_width(0, 18).ok();
    sheet
        .set_column_width(1, column_width(value_width.unwrap_or(0)))
        .ok();

    Ok(())
}

fn write_register_sheet(
    sheet: &mut Worksheet,
    rows: &[Vec<RegisterCell>],
    formats: &SheetFormats,
) -> Result<()> {
    for (col, header) in REGISTER_COLUMNS.iter().enumerate() {
        sheet
            .write_string_with_format(0, col as u16, *header, &formats.header)
            .context("Failed to write register header")?;
    }
    sheet.set_freeze_panes(1, 0).ok();

    for (index, cells) in rows.iter().enumerate() {
        let row = index as u32 + 1;
        for (col, cell) in cells.iter().enumerate() {
            let col = col as u16;
            match cell {
                RegisterCell::Number(n) => sheet
                    .write_number_with_format(row, col, *n, &formats.number)
                    .context("Failed to write register number")?,
                RegisterCell::Text(text) if text.is_empty() => sheet
                    .write_blank(row, col, &formats.text)
                    .context("Failed to write register cell")?,
                RegisterCell::Text(text) => sheet
                    .write_string_with_format(row, col, text, &formats.text)
                    .context("Failed to write register cell")?,
            };
        }
    }

    for (col, header) in REGISTER_COLUMNS.iter().enumerate() {
        let widest = rows
            .iter()
            .map(|cells| cells[col].to_string().chars().count())
            .chain(std::iter::once(header.chars().count()))
            .max()
            .unwrap_or(0);
        sheet.set_column_width(col as u16, column_width(widest)).ok();
    }

    Ok(())
}

fn column_width(chars: usize) -> f64 {
    (chars as f64 + 2.0).clamp(10.0, 50.0)
}
