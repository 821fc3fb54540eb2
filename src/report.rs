use crate::error::Result;
use crate::format::{format_brl, format_decimal, format_percent};
use crate::identification::CompanyIdentification;
use crate::period::{period_string, FiscalPeriod};
use crate::ratios::{backfill_derived_fields, ratios_from, RatioKind, RatioSet};
use crate::schema::{ExtractedStatements, FieldProvenance, LineItem, StatementKind, ValueOrigin};
use crate::scoring::{ScoreCard, ScorePolicy};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Something an operator has to look at before the ratios can be trusted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReviewItem {
    /// Zero and never located, derived or set.
    MissingField { item: LineItem },
    /// Computed over a substituted denominator.
    LowConfidenceRatio { ratio: RatioKind },
    MissingPeriod,
}

impl ReviewItem {
    pub fn message(&self) -> String {
        match self {
            ReviewItem::MissingField { item } => {
                format!("{} was not found in the document", item)
            }
            ReviewItem::LowConfidenceRatio { ratio } => {
                format!("{} was computed over a zero or negative denominator", ratio)
            }
            ReviewItem::MissingPeriod => "The fiscal period could not be inferred".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisReport {
    pub identification: CompanyIdentification,
    pub period: Option<FiscalPeriod>,
    pub statements: ExtractedStatements,
    pub ratios: RatioSet,
    pub score: ScoreCard,
    pub review: Vec<ReviewItem>,
}

impl AnalysisReport {
    /// Fills the derivable subtotals, then computes ratios, score and review items
    /// from scratch.
    pub fn assemble(
        identification: CompanyIdentification,
        period: Option<FiscalPeriod>,
        mut statements: ExtractedStatements,
        policy: &ScorePolicy,
    ) -> Self {
        for item in backfill_derived_fields(&mut statements.income_statement) {
            statements
                .provenance
                .insert(item, FieldProvenance::derived(derivation_logic(item)));
        }

        let ratios = ratios_from(&statements.balance_sheet, &statements.income_statement);
        let score = policy.evaluate(&ratios);
        let review = collect_review(&statements, &ratios, period.as_ref());

        Self {
            identification,
            period,
            statements,
            ratios,
            score,
            review,
        }
    }

    pub fn requires_review(&self) -> bool {
        !self.review.is_empty()
    }

    pub fn period_string(&self) -> String {
        period_string(self.period.as_ref())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_csv(&self) -> String {
        let mut output = String::new();
        output.push_str("Statement,Line Item,Value,Origin\n");

        for item in LineItem::ALL {
            let statement = match item.statement() {
                StatementKind::BalanceSheet => "Balance Sheet",
                StatementKind::IncomeStatement => "Income Statement",
            };
            output.push_str(&format!(
                "{},{},{:.2},{:?}\n",
                statement,
                item,
                self.statements.value(item),
                self.origin(item)
            ));
        }

        output
    }

    pub fn to_markdown(&self) -> String {
        let mut output = String::new();

        let name = self
            .identification
            .name
            .as_deref()
            .unwrap_or("Unidentified company");
        output.push_str(&format!("# Credit Analysis - {}\n\n", name));
        if let Some(tax_id) = &self.identification.tax_id {
            output.push_str(&format!("**CNPJ:** {}\n\n", tax_id));
        }
        let period = self.period_string();
        output.push_str(&format!(
            "**Period:** {}\n\n",
            if period.is_empty() {
                "not identified"
            } else {
                period.as_str()
            }
        ));
        output.push_str(&format!(
            "**Score:** {}/100 (policy {})\n\n",
            self.score.score, self.score.policy_version
        ));

        output.push_str("## Balance Sheet\n\n");
        self.push_line_items(&mut output, StatementKind::BalanceSheet);

        output.push_str("## Income Statement\n\n");
        self.push_line_items(&mut output, StatementKind::IncomeStatement);

        output.push_str("## Ratios\n\n");
        for kind in RatioKind::ALL {
            let value = self.ratios.get(kind);
            let shown = if kind.is_percentage() {
                format_percent(value)
            } else {
                format_decimal(value, 2)
            };
            let marker = if self.ratios.is_low_confidence(kind) {
                " ⚠️ **[LOW CONFIDENCE]**"
            } else {
                ""
            };
            output.push_str(&format!(
                "- {}: {} ({}){}\n",
                kind,
                shown,
                kind.formula(),
                marker
            ));
        }
        output.push('\n');

        if self.requires_review() {
            output.push_str("## Review Required\n\n");
            for item in &self.review {
                output.push_str(&format!("- {}\n", item.message()));
            }
            output.push('\n');
        }

        output
    }

    fn push_line_items(&self, output: &mut String, statement: StatementKind) {
        for item in LineItem::ALL.iter().filter(|i| i.statement() == statement) {
            let marker = match self.origin(*item) {
                ValueOrigin::Located => "",
                ValueOrigin::Derived => " *(derived)*",
                ValueOrigin::Manual => " *(manual)*",
                ValueOrigin::NotFound => " **[NOT FOUND]**",
            };
            output.push_str(&format!(
                "- {}: {}{}\n",
                item,
                format_brl(self.statements.value(*item)),
                marker
            ));
        }
        output.push('\n');
    }

    fn origin(&self, item: LineItem) -> ValueOrigin {
        // Total assets is a sum, whatever was located for reconciliation.
        if item == LineItem::TotalAssets {
            return ValueOrigin::Derived;
        }
        self.statements.origin(item)
    }
}

fn derivation_logic(item: LineItem) -> &'static str {
    match item {
        LineItem::NetRevenue => "Gross revenue - deductions",
        LineItem::GrossProfit => "Net revenue - costs",
        LineItem::OperatingResult => "Gross profit - operating expenses",
        _ => "Derived from other line items",
    }
}

fn collect_review(
    statements: &ExtractedStatements,
    ratios: &RatioSet,
    period: Option<&FiscalPeriod>,
) -> Vec<ReviewItem> {
    let mut review: Vec<ReviewItem> = statements
        .missing_items()
        .into_iter()
        .map(|item| ReviewItem::MissingField { item })
        .collect();

    review.extend(
        ratios
            .low_confidence
            .iter()
            .map(|&ratio| ReviewItem::LowConfidenceRatio { ratio }),
    );

    if period.is_none() {
        review.push(ReviewItem::MissingPeriod);
    }

    review
}

/// Destination for finished analyses.
pub trait ReportSink {
    fn write_report(&mut self, report: &AnalysisReport) -> Result<()>;
}

/// Writes each report as one JSON document per line.
pub struct JsonSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ReportSink for JsonSink<W> {
    fn write_report(&mut self, report: &AnalysisReport) -> Result<()> {
        serde_json::to_writer(&mut self.writer, report)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}
