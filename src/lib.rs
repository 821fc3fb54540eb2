//! # Statement Analyzer
//!
//! A library for recovering balance-sheet and income-statement line items from the
//! text of Brazilian financial statements, and turning them into credit ratios and
//! a bounded score.
//!
//! ## Core Concepts
//!
//! - **Label-anchored location**: each line item is found by its accounting label
//!   and the first amount that follows it, with exclusion terms to skip totals
//! - **Regions**: the balance sheet is searched in the first part of the text and
//!   the income statement in the last part, with an overlap
//! - **Derivation**: missing subtotals are rebuilt from their components
//! - **Provenance**: every field records whether it was located, derived, set
//!   manually or not found; zero-valued, not-found fields require review
//! - **Score policy**: the score is a versioned table of threshold bands, not code
//!
//! ## Example
//!
//! ```rust,ignore
//! use statement_analyzer::*;
//!
//! let text = "ATIVO CIRCULANTE R$ 10.000,00\nPASSIVO CIRCULANTE R$ 5.000,00\n...";
//! let report = analyze_document(text)?;
//!
//! println!("{}", report.to_markdown());
//! if report.requires_review() {
//!     for item in &report.review {
//!         println!("{}", item.message());
//!     }
//! }
//! ```

pub mod builder;
pub mod config;
pub mod error;
pub mod format;
pub mod identification;
pub mod labels;
pub mod locator;
pub mod normalizer;
pub mod overrides;
pub mod period;
pub mod ratios;
pub mod report;
pub mod schema;
pub mod scoring;
pub mod segmenter;

pub use builder::{OperatingResultPolicy, RecordBuilder};
pub use config::AnalyzerConfig;
pub use error::{Result, StatementAnalysisError};
pub use format::{format_brl, format_decimal, format_percent};
pub use identification::CompanyIdentification;
pub use labels::{FieldRule, LabelCatalog, LabelTier};
pub use locator::{LocatedValue, LocatorConfig, ValueLocator};
pub use normalizer::parse_amount;
pub use overrides::*;
pub use period::{period_string, FiscalPeriod, PeriodExtractor, PeriodSource, PeriodTerms};
pub use ratios::{compute_ratios, RatioKind, RatioSet};
pub use report::{AnalysisReport, JsonSink, ReportSink, ReviewItem};
pub use schema::*;
pub use scoring::{ScoreBand, ScoreCard, ScorePolicy, ScoreRule, Threshold};
pub use segmenter::{SegmentationConfig, StatementRegions};

use chrono::NaiveDate;
use log::{debug, info, warn};

/// One document to analyze. Built once per request and never mutated by the
/// analysis.
#[derive(Debug, Clone)]
pub struct AnalysisContext {
    pub text: String,
    /// Dates later than one year past this are ignored when inferring the period.
    pub reference_date: NaiveDate,
    /// Identification supplied by the caller; wins over what is read from the text.
    pub identification: CompanyIdentification,
}

impl AnalysisContext {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            reference_date: chrono::Local::now().date_naive(),
            identification: CompanyIdentification::default(),
        }
    }

    pub fn with_reference_date(mut self, reference_date: NaiveDate) -> Self {
        self.reference_date = reference_date;
        self
    }

    pub fn with_identification(mut self, identification: CompanyIdentification) -> Self {
        self.identification = identification;
        self
    }
}

pub struct StatementAnalyzer {
    config: AnalyzerConfig,
    builder: RecordBuilder,
    periods: PeriodExtractor,
}

impl StatementAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Result<Self> {
        config.validate()?;

        let builder = RecordBuilder::new(
            &config.catalog,
            config.locator.clone(),
            config.operating_result,
        )?;
        let periods = PeriodExtractor::new(&config.period_terms)?;

        Ok(Self {
            config,
            builder,
            periods,
        })
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Never fails: noisy or incomplete text yields zeros and review items.
    pub fn analyze(&self, ctx: &AnalysisContext) -> AnalysisReport {
        info!(
            "Analyzing statement text ({} characters)",
            ctx.text.chars().count()
        );

        let regions = StatementRegions::split(&ctx.text, &self.config.segmentation);
        debug!(
            "Balance sheet region: {} bytes, income statement region: {} bytes",
            regions.balance_sheet.len(),
            regions.income_statement.len()
        );

        let statements = self.builder.build(&regions);
        let period = self.periods.extract(&ctx.text, ctx.reference_date);
        let identification =
            CompanyIdentification::from_text(&ctx.text).merged_with(&ctx.identification);

        let report =
            AnalysisReport::assemble(identification, period, statements, &self.config.score_policy);

        if report.requires_review() {
            warn!(
                "Analysis requires review: {}",
                report
                    .review
                    .iter()
                    .map(ReviewItem::message)
                    .collect::<Vec<_>>()
                    .join("; ")
            );
        }
        info!(
            "Scored {} under policy {} for period '{}'",
            report.score.score,
            report.score.policy_version,
            report.period_string()
        );

        report
    }

    /// Applies operator corrections and rescores under this analyzer's policy.
    pub fn apply_overrides(
        &self,
        report: &AnalysisReport,
        overrides: &SnapshotOverrides,
    ) -> Result<AnalysisReport> {
        overrides.apply(report, &self.config.score_policy)
    }
}

/// Analyzes `text` with the default Brazilian configuration.
pub fn analyze_document(text: &str) -> Result<AnalysisReport> {
    let analyzer = StatementAnalyzer::new(AnalyzerConfig::default())?;
    Ok(analyzer.analyze(&AnalysisContext::new(text)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
    }

    #[test]
    fn test_context_builders() {
        let ctx = AnalysisContext::new("texto")
            .with_reference_date(reference())
            .with_identification(CompanyIdentification {
                name: Some("Informada".to_string()),
                tax_id: None,
            });
        assert_eq!(ctx.reference_date, reference());
        assert_eq!(ctx.identification.name.as_deref(), Some("Informada"));
    }

    #[test]
    fn test_empty_document_needs_review() {
        let analyzer = StatementAnalyzer::new(AnalyzerConfig::default()).unwrap();
        let report = analyzer.analyze(&AnalysisContext::new("").with_reference_date(reference()));

        assert!(report.requires_review());
        assert!(report.review.contains(&ReviewItem::MissingPeriod));
        assert_eq!(report.statements.balance_sheet.current_assets, 0.0);
        assert!(report.ratios.is_low_confidence(RatioKind::CurrentRatio));
    }

    #[test]
    fn test_identification_hints_win() {
        let text = "Empresa: Nome Lido no Documento\nCNPJ 12.345.678/0001-90\n";
        let ctx = AnalysisContext::new(text)
            .with_reference_date(reference())
            .with_identification(CompanyIdentification {
                name: Some("Nome Informado".to_string()),
                tax_id: None,
            });
        let report = StatementAnalyzer::new(AnalyzerConfig::default())
            .unwrap()
            .analyze(&ctx);

        assert_eq!(report.identification.name.as_deref(), Some("Nome Informado"));
        assert_eq!(
            report.identification.tax_id.as_deref(),
            Some("12.345.678/0001-90")
        );
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = AnalyzerConfig {
            segmentation: SegmentationConfig {
                balance_sheet_end: 1.5,
                income_statement_start: 0.4,
            },
            ..Default::default()
        };
        assert!(StatementAnalyzer::new(config).is_err());
    }

    #[test]
    fn test_analyze_document_is_deterministic() {
        let text = "ATIVO CIRCULANTE 800,00\nPASSIVO CIRCULANTE 400,00\nRECEITA BRUTA 2.000,00\nLUCRO LIQUIDO 100,00";
        let first = analyze_document(text).unwrap();
        let second = analyze_document(text).unwrap();
        assert_eq!(first.ratios, second.ratios);
        assert_eq!(first.score, second.score);
    }
}
