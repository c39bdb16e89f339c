//! Reversible numeric display formatting
//!
//! Plain numbers stored in cells are shown with thousands grouping and
//! stripped back to their stored form before persistence:
//!
//! ```text
//! stored "1234567.50"  --format_for_display-->  shown "1,234,567.50"
//! stored "1234.000"    --format_for_display-->  shown "1,234"      (flag keeps "1234.000")
//! shown  "1,234,567"   --strip_for_storage--->  stored "1234567"
//! ```
//!
//! A formatted cell carries the [`AUTO_FORMAT_ATTR`] flag holding the stored
//! text, so stripping a cell whose display text is untouched restores the
//! stored text exactly, even where formatting dropped a zero fraction.
//!
//! ## Example
//!
//! ```rust
//! use gridedit::features::numeric::NumericFormatter;
//!
//! let formatter = NumericFormatter::default();
//! assert_eq!(formatter.format_for_display("1234567"), "1,234,567");
//! assert_eq!(formatter.strip_for_storage("1,234,567"), "1234567");
//! assert_eq!(formatter.format_for_display("0001234"), "0001234");
//! ```

use lazy_static::lazy_static;
use regex::Regex;

use crate::core::markup::{Document, NodeId};

/// Attribute marking a cell whose text was produced by the formatter
pub const AUTO_FORMAT_ATTR: &str = "data-auto-format";

/// Stand-in for `,`/`.` characters that are not configured separators
const FOREIGN_SEPARATOR: char = '\u{FFFD}';

lazy_static! {
    /// Ungrouped number in canonical form (`,` grouping, `.` decimal)
    static ref PLAIN_NUMBER: Regex = Regex::new(r"^([+-]?)(\d+)(?:\.(\d+))?$").unwrap();
    /// Grouped number in canonical form; zero groups allowed
    static ref GROUPED_NUMBER: Regex =
        Regex::new(r"^[+-]?\d{1,3}(?:,\d{3})*(?:\.\d+)?$").unwrap();
}

/// Separators and limits for numeric display
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    any(feature = "wasm", feature = "export"),
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct NumericOptions {
    /// Thousands grouping separator
    /// Default: `,`
    pub group_separator: char,

    /// Decimal separator
    /// Default: `.`
    pub decimal_separator: char,

    /// Integers with more digits are left alone
    /// Default: 15
    pub max_integer_digits: usize,
}

impl Default for NumericOptions {
    fn default() -> Self {
        Self {
            group_separator: ',',
            decimal_separator: '.',
            max_integer_digits: 15,
        }
    }
}

impl NumericOptions {
    /// `1.234.567,89` convention
    pub fn european() -> Self {
        Self {
            group_separator: '.',
            decimal_separator: ',',
            ..Self::default()
        }
    }
}

/// Text and cell level numeric transform
#[derive(Debug, Clone, Default)]
pub struct NumericFormatter {
    options: NumericOptions,
}

impl NumericFormatter {
    pub fn new(options: NumericOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &NumericOptions {
        &self.options
    }

    /// Group the integer part of a plain number; anything else is returned unchanged
    ///
    /// Leading/trailing whitespace is kept around the formatted value.
    pub fn format_for_display(&self, text: &str) -> String {
        match self.try_format(text) {
            Some(formatted) => formatted,
            None => text.to_string(),
        }
    }

    /// Whether `text` passes the display guard
    pub fn is_formattable(&self, text: &str) -> bool {
        self.try_format(text).is_some()
    }

    fn try_format(&self, text: &str) -> Option<String> {
        let value = text.trim();
        if value.is_empty() {
            return None;
        }
        let canonical = self.canonical(value);
        let caps = PLAIN_NUMBER.captures(&canonical)?;
        let sign = caps.get(1).map_or("", |m| m.as_str());
        let integer = caps.get(2).map_or("", |m| m.as_str());
        let fraction = caps.get(3).map(|m| m.as_str());

        // Zero-padded integers are identifiers, not quantities
        if fraction.is_none() && integer.len() > 1 && integer.starts_with('0') {
            return None;
        }
        if integer.len() > self.options.max_integer_digits {
            return None;
        }

        let mut out = String::with_capacity(value.len() + integer.len() / 3);
        out.push_str(sign);
        out.push_str(&self.group(integer));
        if let Some(fraction) = fraction {
            if fraction.chars().any(|c| c != '0') {
                out.push(self.options.decimal_separator);
                out.push_str(fraction);
            }
        }

        let start = text.len() - text.trim_start().len();
        let end = start + value.len();
        Some(format!("{}{}{}", &text[..start], out, &text[end..]))
    }

    /// Remove grouping separators from a grouped number; anything else is returned unchanged
    pub fn strip_for_storage(&self, text: &str) -> String {
        let value = text.trim();
        if value.is_empty() || !GROUPED_NUMBER.is_match(&self.canonical(value)) {
            return text.to_string();
        }
        let stripped: String = value
            .chars()
            .filter(|&c| c != self.options.group_separator)
            .collect();
        let start = text.len() - text.trim_start().len();
        let end = start + value.len();
        format!("{}{}{}", &text[..start], stripped, &text[end..])
    }

    /// Map the configured separators onto `,` and `.` so the static patterns apply
    fn canonical(&self, value: &str) -> String {
        value
            .chars()
            .map(|c| {
                if c == self.options.group_separator {
                    ','
                } else if c == self.options.decimal_separator {
                    '.'
                } else if c == ',' || c == '.' {
                    FOREIGN_SEPARATOR
                } else {
                    c
                }
            })
            .collect()
    }

    fn group(&self, digits: &str) -> String {
        let mut out = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                out.push(self.options.group_separator);
            }
            out.push(c);
        }
        out
    }

    /// Format one cell in place; returns whether the cell changed
    ///
    /// Only a cell whose sole child is a text node is touched. An already
    /// flagged cell is left alone.
    pub fn format_cell(&self, doc: &mut Document, cell: NodeId) -> bool {
        if doc.attribute(cell, AUTO_FORMAT_ATTR).is_some() {
            return false;
        }
        let Some((text_node, stored)) = doc.single_text_child(cell) else {
            return false;
        };
        let Some(display) = self.try_format(stored) else {
            return false;
        };
        if display == stored {
            return false;
        }
        let stored = stored.to_string();
        doc.replace_text(text_node, display);
        doc.set_attribute(cell, AUTO_FORMAT_ATTR, stored);
        true
    }

    /// Stored form of a flagged cell's text
    ///
    /// `None` unless the cell is flagged and holds a single text node.
    pub fn stored_text(&self, doc: &Document, cell: NodeId) -> Option<String> {
        let stored = doc.attribute(cell, AUTO_FORMAT_ATTR)?;
        let (_, displayed) = doc.single_text_child(cell)?;
        Some(self.restore(stored, displayed))
    }

    fn restore(&self, stored: &str, displayed: &str) -> String {
        if self.try_format(stored).as_deref() == Some(displayed) {
            stored.to_string()
        } else {
            self.strip_for_storage(displayed)
        }
    }

    /// Undo [`format_cell`](Self::format_cell); the flag is always cleared
    pub fn strip_cell(&self, doc: &mut Document, cell: NodeId) -> bool {
        let restored = self.stored_text(doc, cell);
        if doc.remove_attribute(cell, AUTO_FORMAT_ATTR).is_none() {
            return false;
        }
        if let (Some(restored), Some((text_node, _))) = (restored, doc.single_text_child(cell)) {
            doc.replace_text(text_node, restored);
        }
        true
    }

    /// Format every eligible cell of the document; returns the number formatted
    pub fn apply(&self, doc: &mut Document) -> usize {
        let count = doc
            .all_cells()
            .into_iter()
            .filter(|&cell| self.format_cell(doc, cell))
            .count();
        if count > 0 {
            tracing::debug!(target: "gridedit::numeric", cells = count, "formatted numeric cells");
        }
        count
    }

    /// Strip every flagged cell of the document; returns the number stripped
    pub fn strip(&self, doc: &mut Document) -> usize {
        doc.all_cells()
            .into_iter()
            .filter(|&cell| self.strip_cell(doc, cell))
            .count()
    }
}

/// Format with the default separators
pub fn format_for_display(text: &str) -> String {
    NumericFormatter::default().format_for_display(text)
}

/// Strip with the default separators
pub fn strip_for_storage(text: &str) -> String {
    NumericFormatter::default().strip_for_storage(text)
}
