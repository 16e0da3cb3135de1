use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

use crate::helpers::warranty::{compute_warranty_end, parse_date_or_blank};

/// Column headers of the component register, in export order. The derived
/// warranty end sits directly after the warranty duration.
pub const REGISTER_COLUMNS: [&str; 14] = [
    "Komponente",
    "Hersteller",
    "Modell",
    "Seriennummer",
    "Herstellungsdatum",
    "Lieferdatum",
    "Rechnungsdatum",
    "Inbetriebnahmedatum",
    "Garantiebeginn",
    "Garantiedauer (Jahre)",
    "Garantieende",
    "Firmware/Softwarestand",
    "Ablageort Garantieunterlagen",
    "Bemerkungen",
];

pub const WARRANTY_DURATION_COLUMN: usize = 9;
pub const WARRANTY_END_COLUMN: usize = 10;

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Project {
    pub project_number: String,
    pub customer_name: String,
    pub street: String,
    pub house_number: String,
    pub postal_code: String,
    pub city: String,
    #[serde(deserialize_with = "lenient_date")]
    pub commissioning_date: Option<NaiveDate>,
    #[serde(deserialize_with = "lenient_date")]
    pub acceptance_date: Option<NaiveDate>,
    pub technician: String,
    pub technician_contact: String,
}

impl Project {
    /// "Street 12, 12345 City", skipping blank parts.
    pub fn full_address(&self) -> String {
        let street = join_present(&[&self.street, &self.house_number], " ");
        let city = join_present(&[&self.postal_code, &self.city], " ");
        join_present(&[&street, &city], ", ")
    }

    pub fn technician_line(&self) -> String {
        let name = self.technician.trim();
        let contact = self.technician_contact.trim();
        match (name.is_empty(), contact.is_empty()) {
            (_, true) => name.to_string(),
            (true, false) => format!("({})", contact),
            (false, false) => format!("{} ({})", name, contact),
        }
    }

    /// Labelled summary lines shared by the report header and the
    /// spreadsheet's project sheet.
    pub fn summary_fields(&self) -> [(&'static str, String); 6] {
        [
            ("Projekt-Nr.", self.project_number.trim().to_string()),
            ("Kunde", self.customer_name.trim().to_string()),
            ("Objektadresse", self.full_address()),
            ("Inbetriebnahme", iso_or_blank(self.commissioning_date)),
            ("Abnahme", iso_or_blank(self.acceptance_date)),
            ("Techniker", self.technician_line()),
        ]
    }
}

fn join_present(parts: &[&String], separator: &str) -> String {
    parts
        .iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}

fn iso_or_blank(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

// Blank or unparseable form dates count as absent.
fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(raw)) => parse_date_or_blank(&raw),
        _ => None,
    })
}

/// One row of the component register. Date fields keep the raw form value.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct ComponentRecord {
    pub component: String,
    pub manufacturer: String,
    pub model: String,
    pub serial_number: String,
    pub manufacture_date: String,
    pub delivery_date: String,
    pub invoice_date: String,
    pub commissioning_date: String,
    pub warranty_start: String,
    #[serde(deserialize_with = "lenient_years")]
    pub warranty_duration_years: Option<f64>,
    pub firmware_version: String,
    pub warranty_documents_location: String,
    pub remarks: String,
}

// Numbers and numeric strings are accepted; anything else counts as absent.
fn lenient_years<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .and_then(|v| match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        })
        .filter(|years| years.is_finite()))
}

#[derive(Debug, Clone, PartialEq)]
pub enum RegisterCell {
    Text(String),
    Number(f64),
}

impl RegisterCell {
    pub fn is_empty(&self) -> bool {
        matches!(self, RegisterCell::Text(text) if text.is_empty())
    }
}

impl fmt::Display for RegisterCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisterCell::Text(text) => f.write_str(text),
            RegisterCell::Number(n) if n.fract() == 0.0 => write!(f, "{:.0}", n),
            RegisterCell::Number(n) => write!(f, "{}", n),
        }
    }
}

impl ComponentRecord {
    /// The record as a register row, matching `REGISTER_COLUMNS`. The
    /// warranty end is recomputed on every call.
    pub fn register_row(&self) -> Vec<RegisterCell> {
        let text = |value: &str| RegisterCell::Text(value.trim().to_string());
        let date = |value: &str| RegisterCell::Text(display_date(value));

        vec![
            text(&self.component),
            text(&self.manufacturer),
            text(&self.model),
            text(&self.serial_number),
            date(&self.manufacture_date),
            date(&self.delivery_date),
            date(&self.invoice_date),
            date(&self.commissioning_date),
            date(&self.warranty_start),
            self.warranty_duration_years
                .map(RegisterCell::Number)
                .unwrap_or_else(|| RegisterCell::Text(String::new())),
            RegisterCell::Text(compute_warranty_end(self)),
            text(&self.firmware_version),
            text(&self.warranty_documents_location),
            text(&self.remarks),
        ]
    }
}

fn display_date(raw: &str) -> String {
    match parse_date_or_blank(raw) {
        Some(date) => date.format("%Y-%m-%d").to_string(),
        None => raw.trim().to_string(),
    }
}

/// The editable component table of one session.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(transparent)]
pub struct ComponentRegister {
    rows: Vec<ComponentRecord>,
}

impl Default for ComponentRegister {
    // A fresh session starts with one blank row to edit.
    fn default() -> Self {
        Self {
            rows: vec![ComponentRecord::default()],
        }
    }
}

impl ComponentRegister {
    pub fn new(rows: Vec<ComponentRecord>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[ComponentRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push(&mut self, record: ComponentRecord) {
        self.rows.push(record);
    }

    pub fn remove(&mut self, index: usize) -> Option<ComponentRecord> {
        if index < self.rows.len() {
            Some(self.rows.remove(index))
        } else {
            None
        }
    }

    pub fn replace(&mut self, rows: Vec<ComponentRecord>) {
        self.rows = rows;
    }

    /// Copy of the current rows; exports work on this and never see later edits.
    pub fn snapshot(&self) -> Vec<ComponentRecord> {
        self.rows.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Present,
    Absent,
}

impl Marker {
    pub fn from_flag(present: bool) -> Self {
        if present { Marker::Present } else { Marker::Absent }
    }

    pub fn glyph(self) -> char {
        match self {
            Marker::Present => '✔',
            Marker::Absent => '—',
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChecklistEntry {
    Flat {
        label: String,
        present: bool,
    },
    Grouped {
        label: String,
        items: Vec<(String, bool)>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChecklistLine {
    pub marker: Marker,
    pub text: String,
}

impl fmt::Display for ChecklistLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.marker.glyph(), self.text)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct DocumentationChecklist {
    pub entries: Vec<ChecklistEntry>,
}

impl DocumentationChecklist {
    /// One line per flag: flat entries yield one line, grouped entries one
    /// line per sub-entry.
    pub fn lines(&self) -> Vec<ChecklistLine> {
        let mut lines = Vec::new();
        for entry in &self.entries {
            match entry {
                ChecklistEntry::Flat { label, present } => lines.push(ChecklistLine {
                    marker: Marker::from_flag(*present),
                    text: label.clone(),
                }),
                ChecklistEntry::Grouped { label, items } => {
                    for (sub_label, present) in items {
                        lines.push(ChecklistLine {
                            marker: Marker::from_flag(*present),
                            text: format!("{}: {}", label, sub_label),
                        });
                    }
                }
            }
        }
        lines
    }
}

/// The three handover checkboxes as submitted by the form.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ChecklistFlags {
    pub commissioning_protocol: bool,
    pub test_protocols: bool,
    pub handover_protocol: bool,
}

impl From<ChecklistFlags> for DocumentationChecklist {
    fn from(flags: ChecklistFlags) -> Self {
        let present = |label: &str, flag: bool| ChecklistEntry::Grouped {
            label: label.to_string(),
            items: vec![("vorhanden".to_string(), flag)],
        };

        DocumentationChecklist {
            entries: vec![
                present("Inbetriebnahmeprotokoll", flags.commissioning_protocol),
                present("Prüfprotokolle", flags.test_protocols),
                present("Übergabeprotokoll", flags.handover_protocol),
            ],
        }
    }
}
