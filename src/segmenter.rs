use crate::error::{Result, StatementAnalysisError};
use serde::{Deserialize, Serialize};

/// Proportional bounds for the two statement regions.
///
/// Combined filings almost always print the balance sheet before the income
/// statement; the overlap between the regions absorbs an uncertain boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Fraction of the text (by characters) where the balance-sheet region ends.
    pub balance_sheet_end: f64,
    /// Fraction of the text (by characters) where the income-statement region starts.
    pub income_statement_start: f64,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            balance_sheet_end: 0.6,
            income_statement_start: 0.4,
        }
    }
}

impl SegmentationConfig {
    pub fn validate(&self) -> Result<()> {
        let in_range = |f: f64| (0.0..=1.0).contains(&f);
        if !in_range(self.balance_sheet_end) || !in_range(self.income_statement_start) {
            return Err(StatementAnalysisError::InvalidSegmentation(format!(
                "fractions must lie within [0, 1] (got {} and {})",
                self.balance_sheet_end, self.income_statement_start
            )));
        }
        if self.income_statement_start > self.balance_sheet_end {
            return Err(StatementAnalysisError::InvalidSegmentation(format!(
                "income statement start {} leaves a gap after balance sheet end {}",
                self.income_statement_start, self.balance_sheet_end
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatementRegions<'a> {
    pub balance_sheet: &'a str,
    pub income_statement: &'a str,
}

impl<'a> StatementRegions<'a> {
    /// Splits `text` on character (not byte) proportions, then widens each cut to
    /// the nearest whole line: the balance-sheet region runs to the end of the line
    /// holding its cut, the income-statement region starts at the beginning of the
    /// line holding its cut. An amount is never split across regions.
    pub fn split(text: &'a str, config: &SegmentationConfig) -> Self {
        let char_count = text.chars().count();
        let balance_end = line_end_from(
            text,
            byte_offset_at(text, fraction_of(char_count, config.balance_sheet_end)),
        );
        let income_start = line_start_before(
            text,
            byte_offset_at(text, fraction_of(char_count, config.income_statement_start)),
        );

        Self {
            balance_sheet: &text[..balance_end],
            income_statement: &text[income_start..],
        }
    }
}

fn fraction_of(count: usize, fraction: f64) -> usize {
    ((count as f64) * fraction.clamp(0.0, 1.0)) as usize
}

fn at_line_start(text: &str, offset: usize) -> bool {
    offset == 0 || text.as_bytes()[offset - 1] == b'\n'
}

fn line_end_from(text: &str, offset: usize) -> usize {
    if at_line_start(text, offset) {
        return offset;
    }
    text[offset..]
        .find('\n')
        .map(|idx| offset + idx)
        .unwrap_or(text.len())
}

fn line_start_before(text: &str, offset: usize) -> usize {
    if at_line_start(text, offset) {
        return offset;
    }
    text[..offset].rfind('\n').map(|idx| idx + 1).unwrap_or(0)
}

fn byte_offset_at(text: &str, char_index: usize) -> usize {
    text.char_indices()
        .nth(char_index)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len())
}
