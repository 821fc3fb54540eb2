//! Fiscal period inference from date and year mentions.
//!
//! Strategies, tried in order until one yields a period:
//! 1. an explicit period / fiscal year / reference label followed by a date or year
//! 2. a full date on a closing-date line (registry boilerplate lines excluded)
//! 3. the latest full date anywhere, at most one year past the reference date
//! 4. the largest plausible year (2010-2039) anywhere in the text

use crate::error::{Result, StatementAnalysisError};
use chrono::{Datelike, Months, NaiveDate};
use log::debug;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

static FULL_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2})/(\d{1,2})/(\d{4})\b").unwrap());

static CANDIDATE_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(20[1-3]\d)\b").unwrap());

const PLAUSIBLE_YEARS: std::ops::RangeInclusive<i32> = 2010..=2039;

const DISPLAY_FORMAT: &str = "%d/%m/%Y";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum PeriodSource {
    ExplicitLabel,
    ClosingDate,
    LatestDate,
    LargestYear,
    Manual,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FiscalPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub source: PeriodSource,
}

impl FiscalPeriod {
    pub fn calendar_year(year: i32, source: PeriodSource) -> Option<Self> {
        Some(Self {
            start: NaiveDate::from_ymd_opt(year, 1, 1)?,
            end: NaiveDate::from_ymd_opt(year, 12, 31)?,
            source,
        })
    }

    /// The period from January 1st of the closing date's year up to the closing date.
    pub fn ending_on(end: NaiveDate, source: PeriodSource) -> Self {
        let start = NaiveDate::from_ymd_opt(end.year(), 1, 1).unwrap_or(end);
        Self { start, end, source }
    }

    /// Parses `DD/MM/YYYY to DD/MM/YYYY`, as produced by `Display`.
    pub fn parse(period: &str, source: PeriodSource) -> Option<Self> {
        let (start, end) = period.split_once(" to ")?;
        let start = NaiveDate::parse_from_str(start.trim(), DISPLAY_FORMAT).ok()?;
        let end = NaiveDate::parse_from_str(end.trim(), DISPLAY_FORMAT).ok()?;
        if end < start {
            return None;
        }
        Some(Self { start, end, source })
    }
}

impl fmt::Display for FiscalPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to {}",
            self.start.format(DISPLAY_FORMAT),
            self.end.format(DISPLAY_FORMAT)
        )
    }
}

/// The period as text; empty when none could be inferred and an operator must supply it.
pub fn period_string(period: Option<&FiscalPeriod>) -> String {
    period.map(|p| p.to_string()).unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeriodTerms {
    /// Labels introducing the period, e.g. "EXERCÍCIO" or "PERÍODO"
    pub period_labels: Vec<String>,
    /// Terms marking a line that carries the closing date
    pub closing_terms: Vec<String>,
    /// Terms marking registry/incorporation boilerplate whose dates are not the period
    pub registry_terms: Vec<String>,
}

impl Default for PeriodTerms {
    fn default() -> Self {
        let owned = |terms: &[&str]| terms.iter().map(|t| t.to_string()).collect::<Vec<_>>();
        Self {
            period_labels: owned(&[
                "PERIODO",
                "PERÍODO",
                "EXERCICIO SOCIAL",
                "EXERCÍCIO SOCIAL",
                "EXERCICIO",
                "EXERCÍCIO",
                "ANO-BASE",
                "ANO BASE",
                "REFERENCIA",
                "REFERÊNCIA",
                "COMPETENCIA",
                "COMPETÊNCIA",
            ]),
            closing_terms: owned(&[
                "ENCERRAD",
                "ENCERRAMENTO",
                "FINDO",
                "FINDA",
                "LEVANTADO",
                "POSIÇÃO EM",
                "POSICAO EM",
                "DATA BASE",
            ]),
            registry_terms: owned(&[
                "JUNTA COMERCIAL",
                "NIRE",
                "REGISTRO",
                "REGISTRADO",
                "CONSTITUI",
                "ABERTURA",
                "ARQUIVAMENTO",
                "AUTENTICA",
            ]),
        }
    }
}

pub struct PeriodExtractor {
    explicit: Option<Regex>,
    closing_terms: Vec<String>,
    registry_terms: Vec<String>,
}

impl PeriodExtractor {
    pub fn new(terms: &PeriodTerms) -> Result<Self> {
        let labels: Vec<String> = terms
            .period_labels
            .iter()
            .filter(|l| !l.trim().is_empty())
            .map(|l| regex::escape(l.trim()))
            .collect();

        let explicit = if labels.is_empty() {
            None
        } else {
            let pattern = format!(
                r"\b(?:{})\b[^\n\d]{{0,40}}?(?P<token>\d{{1,2}}/\d{{1,2}}/\d{{4}}(?:\s*(?:a|à|até|ate|to|-)\s*\d{{1,2}}/\d{{1,2}}/\d{{4}})?|\d{{1,2}}/\d{{4}}|\d{{4}})\b",
                labels.join("|")
            );
            Some(
                RegexBuilder::new(&pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(StatementAnalysisError::from)?,
            )
        };

        Ok(Self {
            explicit,
            closing_terms: terms.closing_terms.iter().map(|t| t.to_uppercase()).collect(),
            registry_terms: terms.registry_terms.iter().map(|t| t.to_uppercase()).collect(),
        })
    }

    pub fn extract(&self, text: &str, reference_date: NaiveDate) -> Option<FiscalPeriod> {
        let found = self
            .from_explicit_label(text)
            .or_else(|| self.from_closing_line(text))
            .or_else(|| from_latest_date(text, reference_date))
            .or_else(|| from_largest_year(text));

        match &found {
            Some(period) => debug!("Inferred period {} via {:?}", period, period.source),
            None => debug!("No period could be inferred"),
        }
        found
    }

    fn from_explicit_label(&self, text: &str) -> Option<FiscalPeriod> {
        let pattern = self.explicit.as_ref()?;

        pattern
            .captures_iter(text)
            .filter_map(|caps| caps.name("token"))
            .filter(|token| !starts_decimal_part(&text[token.end()..]))
            .find_map(|token| interpret_period_token(token.as_str()))
    }

    fn from_closing_line(&self, text: &str) -> Option<FiscalPeriod> {
        text.lines()
            .filter(|line| {
                let upper = line.to_uppercase();
                self.closing_terms.iter().any(|t| upper.contains(t.as_str()))
                    && !self.registry_terms.iter().any(|t| upper.contains(t.as_str()))
            })
            .find_map(|line| full_dates(line).next())
            .map(|date| FiscalPeriod::ending_on(date, PeriodSource::ClosingDate))
    }
}

impl Default for PeriodExtractor {
    fn default() -> Self {
        Self::new(&PeriodTerms::default()).unwrap_or(Self {
            explicit: None,
            closing_terms: Vec::new(),
            registry_terms: Vec::new(),
        })
    }
}

/// True when `rest` continues a number, as in the `,00` of `2000,00`.
fn starts_decimal_part(rest: &str) -> bool {
    let mut chars = rest.chars();
    matches!(chars.next(), Some('.' | ','))
        && chars.next().is_some_and(|c| c.is_ascii_digit())
}

fn full_dates(text: &str) -> impl Iterator<Item = NaiveDate> + '_ {
    FULL_DATE.captures_iter(text).filter_map(|caps| {
        let day = caps[1].parse().ok()?;
        let month = caps[2].parse().ok()?;
        let year = caps[3].parse().ok()?;
        NaiveDate::from_ymd_opt(year, month, day)
    })
}

/// Reads the token that followed a period label: a range, a full date, `MM/YYYY` or a year.
fn interpret_period_token(token: &str) -> Option<FiscalPeriod> {
    let dates: Vec<NaiveDate> = full_dates(token).collect();
    match dates.as_slice() {
        [start, end, ..] if start <= end => {
            return Some(FiscalPeriod {
                start: *start,
                end: *end,
                source: PeriodSource::ExplicitLabel,
            })
        }
        [single] => return Some(FiscalPeriod::ending_on(*single, PeriodSource::ExplicitLabel)),
        _ => {}
    }

    let year_part = token.rsplit('/').next()?;
    let year: i32 = year_part.parse().ok()?;
    if !PLAUSIBLE_YEARS.contains(&year) {
        return None;
    }
    FiscalPeriod::calendar_year(year, PeriodSource::ExplicitLabel)
}

fn from_latest_date(text: &str, reference_date: NaiveDate) -> Option<FiscalPeriod> {
    let horizon = reference_date
        .checked_add_months(Months::new(12))
        .unwrap_or(reference_date);

    full_dates(text)
        .filter(|date| *date <= horizon)
        .max()
        .map(|date| FiscalPeriod::ending_on(date, PeriodSource::LatestDate))
}

fn from_largest_year(text: &str) -> Option<FiscalPeriod> {
    CANDIDATE_YEAR
        .captures_iter(text)
        .filter_map(|caps| caps[1].parse::<i32>().ok())
        .max()
        .and_then(|year| FiscalPeriod::calendar_year(year, PeriodSource::LargestYear))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 15).unwrap()
    }

    fn extract(text: &str) -> Option<FiscalPeriod> {
        PeriodExtractor::default().extract(text, reference())
    }

    #[test]
    fn test_explicit_year_becomes_calendar_year() {
        let period = extract("DEMONSTRAÇÃO DO RESULTADO\nExercício: 2023\n").unwrap();
        assert_eq!(period.to_string(), "01/01/2023 to 31/12/2023");
        assert_eq!(period.source, PeriodSource::ExplicitLabel);
    }

    #[test]
    fn test_explicit_partial_date() {
        let period = extract("Período de referência: 12/2022").unwrap();
        assert_eq!(period.to_string(), "01/01/2022 to 31/12/2022");
    }

    #[test]
    fn test_explicit_range() {
        let period = extract("PERIODO: 01/04/2023 a 31/03/2024").unwrap();
        assert_eq!(period.to_string(), "01/04/2023 to 31/03/2024");
    }

    #[test]
    fn test_explicit_label_ignores_amounts() {
        let text = "LUCRO LIQUIDO DO EXERCICIO R$ 5.000,00\nBalanço encerrado em 30/06/2024";
        let period = extract(text).unwrap();
        assert_eq!(period.source, PeriodSource::ClosingDate);
        assert_eq!(period.to_string(), "01/01/2024 to 30/06/2024");
    }

    #[test]
    fn test_amount_after_period_label_is_not_a_year() {
        let text = "LUCRO LIQUIDO DO EXERCICIO R$ 2020,00\nBalanço encerrado em 31/12/2023";
        let period = extract(text).unwrap();
        assert_eq!(period.source, PeriodSource::ClosingDate);
        assert_eq!(period.to_string(), "01/01/2023 to 31/12/2023");

        let text = "LUCRO LIQUIDO DO EXERCICIO R$ 2000,00\nATIVO CIRCULANTE 1.000,00";
        assert!(extract(text).is_none());
    }

    #[test]
    fn test_explicit_year_out_of_range() {
        let text = "Exercício 1998\nDemonstrações encerradas em 31/12/2023";
        let period = extract(text).unwrap();
        assert_eq!(period.source, PeriodSource::ClosingDate);
        assert_eq!(period.end, NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());
    }

    #[test]
    fn test_closing_line_skips_registry_boilerplate() {
        let text = "Registro na Junta Comercial encerrado em 10/05/2015\n\
                    Balanço Patrimonial encerrado em 31/12/2022";
        let period = extract(text).unwrap();
        assert_eq!(period.source, PeriodSource::ClosingDate);
        assert_eq!(period.end, NaiveDate::from_ymd_opt(2022, 12, 31).unwrap());
    }

    #[test]
    fn test_latest_date_ignores_far_future() {
        let text = "Emitido 05/02/2024. Vencimento 01/01/2030. Posição 31/12/2023";
        let period = extract(text).unwrap();
        assert_eq!(period.source, PeriodSource::LatestDate);
        assert_eq!(period.end, NaiveDate::from_ymd_opt(2024, 2, 5).unwrap());
    }

    #[test]
    fn test_invalid_dates_are_ignored() {
        let text = "Data 31/02/2023 e 2019";
        let period = extract(text).unwrap();
        assert_eq!(period.source, PeriodSource::LargestYear);
        assert_eq!(period.to_string(), "01/01/2023 to 31/12/2023");
    }

    #[test]
    fn test_largest_year_fallback() {
        let period = extract("Comparativo 2021 2022 valores em reais 1999").unwrap();
        assert_eq!(period.to_string(), "01/01/2022 to 31/12/2022");
    }

    #[test]
    fn test_nothing_found() {
        assert!(extract("sem datas aqui").is_none());
        assert_eq!(period_string(None), "");
    }

    #[test]
    fn test_parse_round_trip() {
        let period = FiscalPeriod::calendar_year(2023, PeriodSource::Manual).unwrap();
        let parsed = FiscalPeriod::parse(&period.to_string(), PeriodSource::Manual).unwrap();
        assert_eq!(parsed, period);
        assert!(FiscalPeriod::parse("31/12/2023 to 01/01/2023", PeriodSource::Manual).is_none());
    }
}
