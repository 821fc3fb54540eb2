use crate::error::{Result, StatementAnalysisError};
use crate::period::{FiscalPeriod, PeriodSource};
use crate::report::AnalysisReport;
use crate::schema::{ExtractedStatements, FieldProvenance, LineItem, ValueOrigin};
use crate::scoring::ScorePolicy;
use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Corrections made by an operator while reviewing an analysis.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
pub struct SnapshotOverrides {
    #[schemars(description = "Ordered list of corrections, applied one after another.")]
    #[serde(default)]
    pub modifications: Vec<FieldModification>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum FieldModification {
    /// Replace a line item with the value read by the operator.
    SetValue { item: LineItem, value: f64 },

    /// Reset a line item to zero and mark it as not found.
    Clear { item: LineItem },

    /// Multiply a line item by a factor (e.g., -1.0 to flip sign, 1000.0 for "em milhares").
    ScaleValue { item: LineItem, factor: f64 },

    SetPeriod {
        #[schemars(description = "DD/MM/YYYY to DD/MM/YYYY")]
        period: String,
    },

    SetCompanyName { name: String },

    SetTaxId { tax_id: String },
}

impl SnapshotOverrides {
    /// Applies the corrections to a copy of `report`. Subtotals that were derived
    /// follow their corrected components, and ratios, score and review items are
    /// recomputed from scratch.
    pub fn apply(&self, report: &AnalysisReport, policy: &ScorePolicy) -> Result<AnalysisReport> {
        let mut statements = report.statements.clone();
        let mut identification = report.identification.clone();
        let mut period = report.period.clone();

        for modification in &self.modifications {
            debug!("Applying override {:?}", modification);
            match modification {
                FieldModification::SetValue { item, value } => {
                    set_manual(&mut statements, *item, *value)?;
                }
                FieldModification::Clear { item } => {
                    if !statements.set_value(*item, 0.0) {
                        return Err(unknown_target(*item));
                    }
                    statements
                        .provenance
                        .insert(*item, FieldProvenance::not_found());
                }
                FieldModification::ScaleValue { item, factor } => {
                    let scaled = statements.value(*item) * factor;
                    set_manual(&mut statements, *item, scaled)?;
                }
                FieldModification::SetPeriod { period: text } => {
                    let parsed = FiscalPeriod::parse(text, PeriodSource::Manual)
                        .ok_or_else(|| StatementAnalysisError::InvalidPeriod(text.clone()))?;
                    period = Some(parsed);
                }
                FieldModification::SetCompanyName { name } => {
                    identification.name = Some(name.clone());
                }
                FieldModification::SetTaxId { tax_id } => {
                    identification.tax_id = Some(tax_id.clone());
                }
            }
        }

        refresh_derived_subtotals(&mut statements);

        Ok(AnalysisReport::assemble(
            identification,
            period,
            statements,
            policy,
        ))
    }

    pub fn schema_as_json() -> Result<String> {
        let schema = schemars::schema_for!(SnapshotOverrides);
        Ok(serde_json::to_string_pretty(&schema)?)
    }
}

fn set_manual(statements: &mut ExtractedStatements, item: LineItem, value: f64) -> Result<()> {
    if !statements.set_value(item, value) {
        return Err(unknown_target(item));
    }
    statements
        .provenance
        .insert(item, FieldProvenance::manual());
    Ok(())
}

fn unknown_target(item: LineItem) -> StatementAnalysisError {
    StatementAnalysisError::UnknownOverrideTarget(format!(
        "{} is derived from its components and cannot be set",
        item
    ))
}

/// Recomputes derived income-statement subtotals top-down so they reflect
/// corrected components. Located and manual values are left alone.
fn refresh_derived_subtotals(statements: &mut ExtractedStatements) {
    if statements.origin(LineItem::NetRevenue) == ValueOrigin::Derived {
        statements.income_statement.net_revenue =
            statements.income_statement.derived_net_revenue();
    }
    if statements.origin(LineItem::GrossProfit) == ValueOrigin::Derived {
        statements.income_statement.gross_profit =
            statements.income_statement.derived_gross_profit();
    }
    if statements.origin(LineItem::OperatingResult) == ValueOrigin::Derived {
        statements.income_statement.operating_result =
            statements.income_statement.derived_operating_result();
    }
}
