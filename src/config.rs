/// Millimetres to PDF points.
pub const MM: f32 = 72.0 / 25.4;

/// Page geometry of the report, in PDF points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSetup {
    pub width: f32,
    pub height: f32,
    pub margin_left: f32,
    pub margin_right: f32,
    pub margin_top: f32,
    pub margin_bottom: f32,
}

impl PageSetup {
    /// A4 portrait with the same margin on every side.
    pub fn a4_portrait(margin: f32) -> Self {
        Self {
            width: 210.0 * MM,
            height: 297.0 * MM,
            margin_left: margin,
            margin_right: margin,
            margin_top: margin,
            margin_bottom: margin,
        }
    }

    pub fn content_width(&self) -> f32 {
        self.width - self.margin_left - self.margin_right
    }

    pub fn content_top(&self) -> f32 {
        self.height - self.margin_top
    }
}

impl Default for PageSetup {
    fn default() -> Self {
        Self::a4_portrait(18.0 * MM)
    }
}

/// Static data handed to the exporters: nothing here is user-editable.
#[derive(Debug, Clone)]
pub struct HandoverConfig {
    pub legal_references: Vec<String>,
    pub page: PageSetup,
}

impl Default for HandoverConfig {
    fn default() -> Self {
        Self {
            legal_references: default_legal_references(),
            page: PageSetup::default(),
        }
    }
}

pub fn default_legal_references() -> Vec<String> {
    [
        "BGB §§ 434 ff. – Sachmangel/Gewährleistung",
        "VOB/B § 13 – Mängelansprüche (falls vereinbart)",
        "Produkthaftungsgesetz (ProdHaftG)",
        "DIN VDE 0100, 0126, 4105 – Inbetriebnahme-/Prüfpflichten",
        "Herstellerbedingungen – Seriennummern/Registrierungen (z. B. SMA, BYD)",
    ]
    .iter()
    .map(|reference| reference.to_string())
    .collect()
}
