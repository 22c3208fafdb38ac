//! Class-code lookup table and legend palette.
//!
//! One ordered list of `(label, colour)` pairs is the single source of truth:
//! code `i + 1` is entry `i`, and both directions of the lookup are built
//! from it. Code 0 is reserved for cells that could not be classified.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Integer surrogate for a climate class label. 0 = unclassified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassCode(pub u8);

impl ClassCode {
    pub const UNCLASSIFIED: ClassCode = ClassCode(0);

    pub fn is_classified(self) -> bool {
        self.0 != 0
    }
}

/// Kottek et al. (2006) classes in code order, with legend colours.
const KOPPEN_GEIGER: &[(&str, [u8; 3])] = &[
    ("Af", [0x93, 0x01, 0x01]),
    ("Am", [0xfd, 0x00, 0x00]),
    ("Aw", [0xff, 0xca, 0xca]),
    ("As", [0xfd, 0x68, 0x6c]),
    ("BWh", [0xfc, 0xcb, 0x03]),
    ("BWk", [0xfd, 0xfc, 0x54]),
    ("BSh", [0xc9, 0x8a, 0x00]),
    ("BSk", [0xcb, 0xab, 0x54]),
    ("Csa", [0x00, 0xfe, 0x00]),
    ("Csb", [0x95, 0xff, 0x00]),
    ("Csc", [0xcb, 0xff, 0x00]),
    ("Cwa", [0xb4, 0x65, 0x00]),
    ("Cwb", [0x96, 0x66, 0x04]),
    ("Cwc", [0x5e, 0x40, 0x01]),
    ("Cfa", [0x00, 0x30, 0x00]),
    ("Cfb", [0x01, 0x50, 0x01]),
    ("Cfc", [0x00, 0x77, 0x00]),
    ("Dsa", [0xfe, 0x6c, 0xfd]),
    ("Dsb", [0xf8, 0xb9, 0xf7]),
    ("Dsc", [0xe6, 0xca, 0xfd]),
    ("Dsd", [0xca, 0xcc, 0xcb]),
    ("Dwa", [0xcc, 0xb6, 0xff]),
    ("Dwb", [0x99, 0x7c, 0xb2]),
    ("Dwc", [0x8a, 0x59, 0xb2]),
    ("Dwd", [0x6d, 0x23, 0xb3]),
    ("Dfa", [0x30, 0x00, 0x30]),
    ("Dfb", [0x65, 0x01, 0x64]),
    ("Dfc", [0xcb, 0x00, 0xcb]),
    ("Dfd", [0xc7, 0x15, 0x87]),
    ("ET", [0x65, 0xff, 0xff]),
    ("EF", [0x63, 0x96, 0xff]),
];

/// Colour for code 0.
const UNCLASSIFIED_COLOR: [u8; 3] = [0xff, 0xff, 0xff];

/// One legend row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassEntry {
    pub code: ClassCode,
    pub label: String,
    /// `#rrggbb`.
    pub color: String,
    #[serde(skip)]
    pub rgb: [u8; 3],
}

/// Immutable class table, injected into the classifier and assembler.
#[derive(Debug, Clone)]
pub struct ClassTable {
    entries: Vec<ClassEntry>,
    by_label: HashMap<String, ClassCode>,
    unclassified_rgb: [u8; 3],
}

impl ClassTable {
    /// Build a table from an ordered list of `(label, rgb)` pairs.
    ///
    /// Codes are assigned 1, 2, … in list order. Lists longer than 255
    /// entries do not fit in a `ClassCode` and are truncated.
    pub fn from_ordered<S: AsRef<str>>(classes: &[(S, [u8; 3])], unclassified_rgb: [u8; 3]) -> Self {
        let entries: Vec<ClassEntry> = classes
            .iter()
            .take(u8::MAX as usize)
            .enumerate()
            .map(|(i, (label, rgb))| ClassEntry {
                code: ClassCode(i as u8 + 1),
                label: label.as_ref().to_string(),
                color: hex_color(*rgb),
                rgb: *rgb,
            })
            .collect();
        let by_label = entries.iter().map(|e| (e.label.clone(), e.code)).collect();
        Self {
            entries,
            by_label,
            unclassified_rgb,
        }
    }

    /// The 31-class Köppen–Geiger table (Kottek et al. 2006).
    pub fn koppen_geiger() -> Self {
        Self::from_ordered(KOPPEN_GEIGER, UNCLASSIFIED_COLOR)
    }

    /// Code for `label`, or 0 when the label is unknown or incomplete.
    pub fn code_of(&self, label: &str) -> ClassCode {
        self.by_label.get(label).copied().unwrap_or(ClassCode::UNCLASSIFIED)
    }

    /// Label for `code`, `None` for 0 and out-of-range codes.
    pub fn label_of(&self, code: ClassCode) -> Option<&str> {
        self.entry(code).map(|e| e.label.as_str())
    }

    /// Legend colour for `code`. Unknown codes share the code-0 colour.
    pub fn color_of(&self, code: ClassCode) -> [u8; 3] {
        self.entry(code).map_or(self.unclassified_rgb, |e| e.rgb)
    }

    /// Number of classified codes (code 0 excluded).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ClassEntry] {
        &self.entries
    }

    /// Legend for a renderer: code 0 first, then every class in code order.
    pub fn legend(&self) -> Vec<ClassEntry> {
        let mut out = Vec::with_capacity(self.entries.len() + 1);
        out.push(ClassEntry {
            code: ClassCode::UNCLASSIFIED,
            label: "NA".to_string(),
            color: hex_color(self.unclassified_rgb),
            rgb: self.unclassified_rgb,
        });
        out.extend(self.entries.iter().cloned());
        out
    }

    /// Legend serialised as pretty JSON.
    pub fn legend_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.legend())
    }

    fn entry(&self, code: ClassCode) -> Option<&ClassEntry> {
        (code.0 as usize)
            .checked_sub(1)
            .and_then(|i| self.entries.get(i))
    }
}

impl Default for ClassTable {
    fn default() -> Self {
        Self::koppen_geiger()
    }
}

fn hex_color([r, g, b]: [u8; 3]) -> String {
    format!("#{r:02x}{g:02x}{b:02x}")
}
