use crate::error::Result;
use crate::labels::LabelCatalog;
use crate::locator::{CompiledRule, CompiledTier, LocatedValue, LocatorConfig, ValueLocator};
use crate::schema::{ExtractedStatements, FieldProvenance, LineItem, StatementKind, ValueOrigin};
use crate::segmenter::StatementRegions;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Non-current assets are replaced by `total assets - current assets` when the
/// located figure strays further than this from it.
const NON_CURRENT_TOLERANCE: f64 = 0.10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OperatingResultPolicy {
    /// Operating result is gross profit minus operating expenses whenever there is
    /// something to derive it from, regardless of a located reading.
    #[default]
    AlwaysDerive,
    /// Keep a located operating result; derive only when none was found.
    PreferLocated,
}

pub struct RecordBuilder {
    rules: BTreeMap<LineItem, CompiledRule>,
    loss: CompiledTier,
    result_line_terms: Vec<String>,
    locator: ValueLocator,
    operating_result: OperatingResultPolicy,
}

impl RecordBuilder {
    pub fn new(
        catalog: &LabelCatalog,
        locator: LocatorConfig,
        operating_result: OperatingResultPolicy,
    ) -> Result<Self> {
        catalog.validate()?;

        let mut rules = BTreeMap::new();
        for rule in &catalog.rules {
            rules.insert(rule.item, CompiledRule::compile(rule)?);
        }

        Ok(Self {
            rules,
            loss: CompiledTier::compile(&catalog.loss_labels)?,
            result_line_terms: catalog
                .result_line_terms
                .iter()
                .map(|t| t.to_uppercase())
                .collect(),
            locator: ValueLocator::new(locator),
            operating_result,
        })
    }

    pub fn build(&self, regions: &StatementRegions<'_>) -> ExtractedStatements {
        let mut statements = ExtractedStatements::default();

        for item in LineItem::ALL.iter().copied().filter(LineItem::is_stored) {
            let provenance = match self.locate(item, regions) {
                Some(found) => {
                    statements.set_value(item, found.value);
                    located(found)
                }
                None => FieldProvenance::not_found(),
            };
            statements.provenance.insert(item, provenance);
        }

        let total_assets = self.locate(LineItem::TotalAssets, regions);
        if let Some(found) = &total_assets {
            statements
                .provenance
                .insert(LineItem::TotalAssets, located(found.clone()));
        }

        reconcile_non_current_assets(&mut statements, total_assets.map(|f| f.value));
        derive_net_revenue(&mut statements);
        derive_gross_profit(&mut statements);
        derive_operating_result(&mut statements, self.operating_result);
        self.resolve_net_result(&mut statements, regions.income_statement);

        statements
    }

    fn locate(&self, item: LineItem, regions: &StatementRegions<'_>) -> Option<LocatedValue> {
        let rule = self.rules.get(&item)?;
        let region = match item.statement() {
            StatementKind::BalanceSheet => regions.balance_sheet,
            StatementKind::IncomeStatement => regions.income_statement,
        };
        self.locator.locate_rule(rule, region)
    }

    /// Profit reading, else a negated loss reading, else the trailing amount of the
    /// last profit/result line of the income statement.
    fn resolve_net_result(&self, statements: &mut ExtractedStatements, income_region: &str) {
        if statements.income_statement.net_result != 0.0 {
            return;
        }

        if let Some(loss) = self.locator.locate_tier(&self.loss, income_region) {
            debug!("Net result taken from loss line '{}'", loss.label);
            statements.income_statement.net_result = -loss.value;
            statements.provenance.insert(
                LineItem::NetResult,
                FieldProvenance {
                    origin: ValueOrigin::Derived,
                    matched_label: Some(loss.label),
                    original_text: Some(loss.original_text),
                    logic: Some("Negated loss of the period".to_string()),
                },
            );
            return;
        }

        let result_line = income_region.lines().rev().find_map(|line| {
            let upper = line.to_uppercase();
            if !self.result_line_terms.iter().any(|t| upper.contains(t.as_str())) {
                return None;
            }
            self.locator
                .trailing_amount(line)
                .map(|value| (value, line.trim().to_string()))
        });

        if let Some((value, line)) = result_line {
            debug!("Net result taken from trailing amount of '{}'", line);
            statements.income_statement.net_result = value;
            statements.provenance.insert(
                LineItem::NetResult,
                FieldProvenance {
                    origin: ValueOrigin::Derived,
                    matched_label: None,
                    original_text: Some(line),
                    logic: Some("Trailing amount of the last result line".to_string()),
                },
            );
        }
    }
}

fn located(found: LocatedValue) -> FieldProvenance {
    FieldProvenance {
        origin: ValueOrigin::Located,
        matched_label: Some(found.label),
        original_text: Some(found.original_text),
        logic: None,
    }
}

fn reconcile_non_current_assets(statements: &mut ExtractedStatements, total_assets: Option<f64>) {
    let Some(total) = total_assets else {
        return;
    };
    let current = statements.balance_sheet.current_assets;
    if total <= current {
        return;
    }

    let implied = total - current;
    let located = statements.balance_sheet.non_current_assets;
    if (located - implied).abs() / implied > NON_CURRENT_TOLERANCE {
        debug!(
            "Non-current assets {} replaced by total {} - current {}",
            located, total, current
        );
        statements.balance_sheet.non_current_assets = implied;
        statements.provenance.insert(
            LineItem::NonCurrentAssets,
            FieldProvenance::derived("Total assets - current assets"),
        );
    }
}

fn derive_net_revenue(statements: &mut ExtractedStatements) {
    let is = &mut statements.income_statement;
    if is.net_revenue != 0.0 || is.gross_revenue == 0.0 {
        return;
    }
    is.net_revenue = is.derived_net_revenue();
    statements.provenance.insert(
        LineItem::NetRevenue,
        FieldProvenance::derived("Gross revenue - deductions"),
    );
}

fn derive_gross_profit(statements: &mut ExtractedStatements) {
    let is = &mut statements.income_statement;
    if is.gross_profit != 0.0 || is.net_revenue == 0.0 {
        return;
    }
    is.gross_profit = is.derived_gross_profit();
    statements.provenance.insert(
        LineItem::GrossProfit,
        FieldProvenance::derived("Net revenue - costs"),
    );
}

fn derive_operating_result(statements: &mut ExtractedStatements, policy: OperatingResultPolicy) {
    let is = &mut statements.income_statement;
    if is.gross_profit == 0.0 && is.operating_expenses == 0.0 {
        return;
    }
    if policy == OperatingResultPolicy::PreferLocated && is.operating_result != 0.0 {
        return;
    }
    is.operating_result = is.derived_operating_result();
    statements.provenance.insert(
        LineItem::OperatingResult,
        FieldProvenance::derived("Gross profit - operating expenses"),
    );
}
