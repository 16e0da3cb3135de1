//! Metrics and encoding for the standard PDF fonts used by the report.
//!
//! Text fonts are Helvetica variants with `WinAnsiEncoding`; the check mark
//! comes from ZapfDingbats. Widths are in 1/1000 em.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontStyle {
    Regular,
    Bold,
    Italic,
    Symbol,
}

impl FontStyle {
    pub const ALL: [FontStyle; 4] = [
        FontStyle::Regular,
        FontStyle::Bold,
        FontStyle::Italic,
        FontStyle::Symbol,
    ];

    /// Name of the font in the page resource dictionary.
    pub fn resource(self) -> &'static str {
        match self {
            FontStyle::Regular => "F1",
            FontStyle::Bold => "F2",
            FontStyle::Italic => "F3",
            FontStyle::Symbol => "F4",
        }
    }

    pub fn base_font(self) -> &'static str {
        match self {
            FontStyle::Regular => "Helvetica",
            FontStyle::Bold => "Helvetica-Bold",
            FontStyle::Italic => "Helvetica-Oblique",
            FontStyle::Symbol => "ZapfDingbats",
        }
    }

    pub fn is_symbolic(self) -> bool {
        self == FontStyle::Symbol
    }
}

// Printable ASCII, 0x20..=0x7E.
#[rustfmt::skip]
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

const CHECK_MARK_WIDTH: u16 = 846;
const FALLBACK_WIDTH: u16 = 556;

fn base_letter(ch: char) -> Option<char> {
    let base = match ch {
        'ä' | 'à' | 'á' | 'â' => 'a',
        'ö' | 'ò' | 'ó' | 'ô' => 'o',
        'ü' | 'ù' | 'ú' | 'û' => 'u',
        'é' | 'è' | 'ê' => 'e',
        'ç' => 'c',
        'Ä' | 'À' | 'Á' => 'A',
        'Ö' | 'Ò' | 'Ó' => 'O',
        'Ü' | 'Ù' | 'Ú' => 'U',
        'É' | 'È' => 'E',
        _ => return None,
    };
    Some(base)
}

pub fn char_width(ch: char, style: FontStyle) -> u16 {
    if style.is_symbolic() {
        return CHECK_MARK_WIDTH;
    }

    let table = match style {
        FontStyle::Bold => &HELVETICA_BOLD,
        _ => &HELVETICA,
    };

    match ch {
        ' '..='~' => table[ch as usize - 0x20],
        '—' | '…' => 1000,
        '•' => 350,
        '„' | '“' | '”' => 333,
        '‘' | '’' | '‚' => 222,
        'ß' => 611,
        '\u{a0}' => 278,
        _ => base_letter(ch)
            .map(|base| char_width(base, style))
            .unwrap_or(FALLBACK_WIDTH),
    }
}

/// Width of `text` in points at `size`.
pub fn text_width(text: &str, style: FontStyle, size: f32) -> f32 {
    let units: u32 = text.chars().map(|ch| char_width(ch, style) as u32).sum();
    units as f32 * size / 1000.0
}

fn win_ansi_byte(ch: char) -> Option<u8> {
    let byte = match ch {
        ' '..='~' | '\u{a0}'..='\u{ff}' => ch as u32 as u8,
        '€' => 0x80,
        '‚' => 0x82,
        'ƒ' => 0x83,
        '„' => 0x84,
        '…' => 0x85,
        '†' => 0x86,
        '‡' => 0x87,
        'ˆ' => 0x88,
        '‰' => 0x89,
        'Š' => 0x8A,
        '‹' => 0x8B,
        'Œ' => 0x8C,
        'Ž' => 0x8E,
        '‘' => 0x91,
        '’' => 0x92,
        '“' => 0x93,
        '”' => 0x94,
        '•' => 0x95,
        '–' => 0x96,
        '—' => 0x97,
        '˜' => 0x98,
        '™' => 0x99,
        'š' => 0x9A,
        '›' => 0x9B,
        'œ' => 0x9C,
        'ž' => 0x9E,
        'Ÿ' => 0x9F,
        _ => return None,
    };
    Some(byte)
}

/// Encodes `text` for a font of the given style. Characters the font cannot
/// show become `?`.
pub fn encode(text: &str, style: FontStyle) -> Vec<u8> {
    text.chars()
        .map(|ch| {
            if style.is_symbolic() {
                match ch {
                    '✔' => b'4',
                    '✓' => b'3',
                    _ => b'?',
                }
            } else {
                win_ansi_byte(ch).unwrap_or(b'?')
            }
        })
        .collect()
}
