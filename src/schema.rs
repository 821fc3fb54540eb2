use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum StatementKind {
    #[schemars(description = "Point-in-time balances: assets, liabilities, inventory")]
    BalanceSheet,

    #[schemars(description = "Period activity: revenue, costs, expenses and results")]
    IncomeStatement,
}

/// Canonical line items recovered from a statement.
///
/// `TotalAssets` is only ever located to reconcile non-current assets; the
/// snapshot value is always derived from its components.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum LineItem {
    CurrentAssets,
    NonCurrentAssets,
    TotalAssets,
    CurrentLiabilities,
    NonCurrentLiabilities,
    Inventory,
    GrossRevenue,
    RevenueDeductions,
    NetRevenue,
    Costs,
    GrossProfit,
    OperatingExpenses,
    OperatingResult,
    NetResult,
}

impl LineItem {
    pub const ALL: [LineItem; 14] = [
        LineItem::CurrentAssets,
        LineItem::NonCurrentAssets,
        LineItem::TotalAssets,
        LineItem::CurrentLiabilities,
        LineItem::NonCurrentLiabilities,
        LineItem::Inventory,
        LineItem::GrossRevenue,
        LineItem::RevenueDeductions,
        LineItem::NetRevenue,
        LineItem::Costs,
        LineItem::GrossProfit,
        LineItem::OperatingExpenses,
        LineItem::OperatingResult,
        LineItem::NetResult,
    ];

    pub fn statement(&self) -> StatementKind {
        match self {
            LineItem::CurrentAssets
            | LineItem::NonCurrentAssets
            | LineItem::TotalAssets
            | LineItem::CurrentLiabilities
            | LineItem::NonCurrentLiabilities
            | LineItem::Inventory => StatementKind::BalanceSheet,
            _ => StatementKind::IncomeStatement,
        }
    }

    /// Whether the item is stored on a snapshot (as opposed to derived on read).
    pub fn is_stored(&self) -> bool {
        !matches!(self, LineItem::TotalAssets)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            LineItem::CurrentAssets => "Current Assets",
            LineItem::NonCurrentAssets => "Non-Current Assets",
            LineItem::TotalAssets => "Total Assets",
            LineItem::CurrentLiabilities => "Current Liabilities",
            LineItem::NonCurrentLiabilities => "Non-Current Liabilities",
            LineItem::Inventory => "Inventory",
            LineItem::GrossRevenue => "Gross Revenue",
            LineItem::RevenueDeductions => "Revenue Deductions",
            LineItem::NetRevenue => "Net Revenue",
            LineItem::Costs => "Cost of Goods/Services",
            LineItem::GrossProfit => "Gross Profit",
            LineItem::OperatingExpenses => "Operating Expenses",
            LineItem::OperatingResult => "Operating Result",
            LineItem::NetResult => "Net Result",
        }
    }
}

impl fmt::Display for LineItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ValueOrigin {
    /// Read next to a label in the document text
    Located,
    /// Computed from other line items (totals, subtotals, negated losses)
    Derived,
    /// Set by an operator while reviewing the analysis
    Manual,
    /// Nothing acceptable was found; the stored value is zero
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FieldProvenance {
    pub origin: ValueOrigin,

    #[schemars(description = "The label synonym that anchored the value, if located")]
    pub matched_label: Option<String>,

    #[schemars(description = "The text between the label and the amount, as it appeared")]
    pub original_text: Option<String>,

    #[schemars(description = "How the value was calculated when it was not read directly")]
    pub logic: Option<String>,
}

impl FieldProvenance {
    pub fn not_found() -> Self {
        Self {
            origin: ValueOrigin::NotFound,
            matched_label: None,
            original_text: None,
            logic: None,
        }
    }

    pub fn derived(logic: impl Into<String>) -> Self {
        Self {
            origin: ValueOrigin::Derived,
            matched_label: None,
            original_text: None,
            logic: Some(logic.into()),
        }
    }

    pub fn manual() -> Self {
        Self {
            origin: ValueOrigin::Manual,
            matched_label: None,
            original_text: None,
            logic: Some("Set during manual review".to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BalanceSheetSnapshot {
    #[schemars(description = "Ativo circulante. Zero means either a true zero or not found.")]
    pub current_assets: f64,
    #[schemars(description = "Ativo não circulante (long-term receivables, fixed assets)")]
    pub non_current_assets: f64,
    #[schemars(description = "Passivo circulante")]
    pub current_liabilities: f64,
    #[schemars(description = "Passivo não circulante (long-term obligations)")]
    pub non_current_liabilities: f64,
    #[schemars(description = "Estoques")]
    pub inventory: f64,
}

impl BalanceSheetSnapshot {
    pub fn total_assets(&self) -> f64 {
        self.current_assets + self.non_current_assets
    }

    pub fn total_liabilities(&self) -> f64 {
        self.current_liabilities + self.non_current_liabilities
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct IncomeStatementSnapshot {
    pub gross_revenue: f64,
    pub revenue_deductions: f64,
    pub net_revenue: f64,
    #[schemars(description = "Cost of goods sold or services rendered")]
    pub costs: f64,
    pub gross_profit: f64,
    pub operating_expenses: f64,
    pub operating_result: f64,
    #[schemars(description = "Profit (positive) or loss (negative) of the period")]
    pub net_result: f64,
}

impl IncomeStatementSnapshot {
    pub fn derived_net_revenue(&self) -> f64 {
        self.gross_revenue - self.revenue_deductions
    }

    pub fn derived_gross_profit(&self) -> f64 {
        self.net_revenue - self.costs
    }

    pub fn derived_operating_result(&self) -> f64 {
        self.gross_profit - self.operating_expenses
    }
}

/// The two canonical records for one document, with per-field provenance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExtractedStatements {
    pub balance_sheet: BalanceSheetSnapshot,
    pub income_statement: IncomeStatementSnapshot,
    #[serde(default)]
    pub provenance: BTreeMap<LineItem, FieldProvenance>,
}

impl ExtractedStatements {
    pub fn value(&self, item: LineItem) -> f64 {
        let bs = &self.balance_sheet;
        let is = &self.income_statement;
        match item {
            LineItem::CurrentAssets => bs.current_assets,
            LineItem::NonCurrentAssets => bs.non_current_assets,
            LineItem::TotalAssets => bs.total_assets(),
            LineItem::CurrentLiabilities => bs.current_liabilities,
            LineItem::NonCurrentLiabilities => bs.non_current_liabilities,
            LineItem::Inventory => bs.inventory,
            LineItem::GrossRevenue => is.gross_revenue,
            LineItem::RevenueDeductions => is.revenue_deductions,
            LineItem::NetRevenue => is.net_revenue,
            LineItem::Costs => is.costs,
            LineItem::GrossProfit => is.gross_profit,
            LineItem::OperatingExpenses => is.operating_expenses,
            LineItem::OperatingResult => is.operating_result,
            LineItem::NetResult => is.net_result,
        }
    }

    /// Stores a value on the owning snapshot. Returns false for derived-only items.
    pub fn set_value(&mut self, item: LineItem, value: f64) -> bool {
        let slot = match item {
            LineItem::CurrentAssets => &mut self.balance_sheet.current_assets,
            LineItem::NonCurrentAssets => &mut self.balance_sheet.non_current_assets,
            LineItem::TotalAssets => return false,
            LineItem::CurrentLiabilities => &mut self.balance_sheet.current_liabilities,
            LineItem::NonCurrentLiabilities => &mut self.balance_sheet.non_current_liabilities,
            LineItem::Inventory => &mut self.balance_sheet.inventory,
            LineItem::GrossRevenue => &mut self.income_statement.gross_revenue,
            LineItem::RevenueDeductions => &mut self.income_statement.revenue_deductions,
            LineItem::NetRevenue => &mut self.income_statement.net_revenue,
            LineItem::Costs => &mut self.income_statement.costs,
            LineItem::GrossProfit => &mut self.income_statement.gross_profit,
            LineItem::OperatingExpenses => &mut self.income_statement.operating_expenses,
            LineItem::OperatingResult => &mut self.income_statement.operating_result,
            LineItem::NetResult => &mut self.income_statement.net_result,
        };
        *slot = value;
        true
    }

    pub fn origin(&self, item: LineItem) -> ValueOrigin {
        self.provenance
            .get(&item)
            .map(|p| p.origin.clone())
            .unwrap_or(ValueOrigin::NotFound)
    }

    /// Stored items whose value is zero and which nobody located, derived or set.
    pub fn missing_items(&self) -> Vec<LineItem> {
        LineItem::ALL
            .iter()
            .copied()
            .filter(|item| item.is_stored())
            .filter(|item| self.value(*item) == 0.0 && self.origin(*item) == ValueOrigin::NotFound)
            .collect()
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ExtractedStatements)
    }

    pub fn schema_as_json() -> Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_assets_is_derived() {
        let bs = BalanceSheetSnapshot {
            current_assets: 1000.0,
            non_current_assets: 250.0,
            ..Default::default()
        };
        assert_eq!(bs.total_assets(), 1250.0);

        let mut statements = ExtractedStatements {
            balance_sheet: bs,
            ..Default::default()
        };
        assert!(!statements.set_value(LineItem::TotalAssets, 10.0));
        assert_eq!(statements.value(LineItem::TotalAssets), 1250.0);
    }

    #[test]
    fn test_missing_items_ignore_derived_zeroes() {
        let mut statements = ExtractedStatements::default();
        statements
            .provenance
            .insert(LineItem::GrossProfit, FieldProvenance::derived("net revenue - costs"));

        let missing = statements.missing_items();
        assert!(missing.contains(&LineItem::CurrentAssets));
        assert!(!missing.contains(&LineItem::GrossProfit));
        assert!(!missing.contains(&LineItem::TotalAssets));
    }

    #[test]
    fn test_schema_generation() {
        let schema_json = ExtractedStatements::schema_as_json().unwrap();
        assert!(schema_json.contains("balance_sheet"));
        assert!(schema_json.contains("income_statement"));
        assert!(schema_json.contains("current_assets"));
    }

    #[test]
    fn test_line_item_serialization() {
        let json = serde_json::to_string(&LineItem::NonCurrentLiabilities).unwrap();
        assert_eq!(json, "\"non_current_liabilities\"");
        assert_eq!(LineItem::NetResult.statement(), StatementKind::IncomeStatement);
    }
}
