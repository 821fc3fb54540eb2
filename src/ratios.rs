use crate::schema::{BalanceSheetSnapshot, IncomeStatementSnapshot, LineItem};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum RatioKind {
    CurrentRatio,
    QuickRatio,
    GeneralLiquidity,
    Leverage,
    GrossMargin,
    OperatingMargin,
    NetMargin,
    OperatingLeverageDegree,
    OperatingExpenseWeight,
}

impl RatioKind {
    pub const ALL: [RatioKind; 9] = [
        RatioKind::CurrentRatio,
        RatioKind::QuickRatio,
        RatioKind::GeneralLiquidity,
        RatioKind::Leverage,
        RatioKind::GrossMargin,
        RatioKind::OperatingMargin,
        RatioKind::NetMargin,
        RatioKind::OperatingLeverageDegree,
        RatioKind::OperatingExpenseWeight,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            RatioKind::CurrentRatio => "Current Ratio",
            RatioKind::QuickRatio => "Quick Ratio",
            RatioKind::GeneralLiquidity => "General Liquidity",
            RatioKind::Leverage => "Leverage (%)",
            RatioKind::GrossMargin => "Gross Margin (%)",
            RatioKind::OperatingMargin => "Operating Margin (%)",
            RatioKind::NetMargin => "Net Margin (%)",
            RatioKind::OperatingLeverageDegree => "Operating Leverage Degree",
            RatioKind::OperatingExpenseWeight => "Operating Expense Weight (%)",
        }
    }

    pub fn is_percentage(&self) -> bool {
        matches!(
            self,
            RatioKind::Leverage
                | RatioKind::GrossMargin
                | RatioKind::OperatingMargin
                | RatioKind::NetMargin
                | RatioKind::OperatingExpenseWeight
        )
    }

    pub fn formula(&self) -> &'static str {
        match self {
            RatioKind::CurrentRatio => "Current Assets / Current Liabilities",
            RatioKind::QuickRatio => "(Current Assets - Inventory) / Current Liabilities",
            RatioKind::GeneralLiquidity => "Total Assets / Total Liabilities",
            RatioKind::Leverage => "Total Liabilities / Total Assets x 100",
            RatioKind::GrossMargin => "Gross Profit / Net Revenue x 100",
            RatioKind::OperatingMargin => "Operating Result / Net Revenue x 100",
            RatioKind::NetMargin => "Net Result / Net Revenue x 100",
            RatioKind::OperatingLeverageDegree => "Gross Profit / Operating Result (when positive)",
            RatioKind::OperatingExpenseWeight => "Operating Expenses / Net Revenue x 100",
        }
    }
}

impl fmt::Display for RatioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// The full ratio set for one pair of snapshots. Always recomputed as a whole.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RatioSet {
    pub values: BTreeMap<RatioKind, f64>,
    #[schemars(
        description = "Ratios whose denominator was zero or negative and was replaced by 1.0"
    )]
    pub low_confidence: BTreeSet<RatioKind>,
}

impl RatioSet {
    pub fn get(&self, kind: RatioKind) -> f64 {
        self.values.get(&kind).copied().unwrap_or(0.0)
    }

    pub fn is_low_confidence(&self, kind: RatioKind) -> bool {
        self.low_confidence.contains(&kind)
    }

    fn insert(&mut self, kind: RatioKind, numerator: f64, denominator: f64) {
        let (denominator, substituted) = guard_denominator(denominator);
        if substituted {
            self.low_confidence.insert(kind);
        }
        self.values.insert(kind, numerator / denominator);
    }

    /// Divides first and scales after, so band edges such as 60% compare exactly.
    fn insert_percent(&mut self, kind: RatioKind, numerator: f64, denominator: f64) {
        self.insert(kind, numerator, denominator);
        if let Some(value) = self.values.get_mut(&kind) {
            *value *= 100.0;
        }
    }
}

/// A denominator that is not strictly positive is replaced by 1.0.
fn guard_denominator(denominator: f64) -> (f64, bool) {
    if denominator > 0.0 {
        (denominator, false)
    } else {
        (1.0, true)
    }
}

/// Fills income-statement subtotals that are still zero from their components.
///
/// This is the only place the ratio computation writes to a snapshot. Returns the
/// items that were filled in.
pub fn backfill_derived_fields(is: &mut IncomeStatementSnapshot) -> Vec<LineItem> {
    let mut filled = Vec::new();

    if is.net_revenue == 0.0 && is.gross_revenue > 0.0 {
        is.net_revenue = is.derived_net_revenue();
        filled.push(LineItem::NetRevenue);
    }
    if is.gross_profit == 0.0 && is.net_revenue > 0.0 {
        is.gross_profit = is.derived_gross_profit();
        filled.push(LineItem::GrossProfit);
    }
    if is.operating_result == 0.0 && (is.gross_profit != 0.0 || is.operating_expenses != 0.0) {
        is.operating_result = is.derived_operating_result();
        filled.push(LineItem::OperatingResult);
    }

    filled
}

pub fn compute_ratios(bs: &BalanceSheetSnapshot, is: &mut IncomeStatementSnapshot) -> RatioSet {
    backfill_derived_fields(is);
    ratios_from(bs, is)
}

/// Ratio arithmetic without any backfill.
pub fn ratios_from(bs: &BalanceSheetSnapshot, is: &IncomeStatementSnapshot) -> RatioSet {
    let mut ratios = RatioSet::default();
    let total_liabilities = bs.total_liabilities();

    ratios.insert(
        RatioKind::CurrentRatio,
        bs.current_assets,
        bs.current_liabilities,
    );
    ratios.insert(
        RatioKind::QuickRatio,
        bs.current_assets - bs.inventory,
        bs.current_liabilities,
    );
    ratios.insert(
        RatioKind::GeneralLiquidity,
        bs.total_assets(),
        total_liabilities,
    );
    ratios.insert_percent(RatioKind::Leverage, total_liabilities, bs.total_assets());

    ratios.insert_percent(RatioKind::GrossMargin, is.gross_profit, is.net_revenue);
    ratios.insert_percent(RatioKind::OperatingMargin, is.operating_result, is.net_revenue);
    ratios.insert_percent(RatioKind::NetMargin, is.net_result, is.net_revenue);
    ratios.insert_percent(
        RatioKind::OperatingExpenseWeight,
        is.operating_expenses,
        is.net_revenue,
    );

    // A loss-making operation would flip the sign into a misleading figure.
    let leverage_degree = if is.operating_result > 0.0 {
        is.gross_profit / is.operating_result
    } else {
        0.0
    };
    ratios
        .values
        .insert(RatioKind::OperatingLeverageDegree, leverage_degree);

    ratios
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balance(ca: f64, nca: f64, cl: f64, ncl: f64, inventory: f64) -> BalanceSheetSnapshot {
        BalanceSheetSnapshot {
            current_assets: ca,
            non_current_assets: nca,
            current_liabilities: cl,
            non_current_liabilities: ncl,
            inventory,
        }
    }

    #[test]
    fn test_current_ratio_exact() {
        let bs = balance(500.0, 0.0, 250.0, 0.0, 0.0);
        let ratios = compute_ratios(&bs, &mut IncomeStatementSnapshot::default());
        assert_eq!(ratios.get(RatioKind::CurrentRatio), 2.0);
        assert!(!ratios.is_low_confidence(RatioKind::CurrentRatio));
    }

    #[test]
    fn test_zero_denominator_is_substituted_and_flagged() {
        let bs = balance(500.0, 0.0, 0.0, 0.0, 0.0);
        let ratios = compute_ratios(&bs, &mut IncomeStatementSnapshot::default());
        assert_eq!(ratios.get(RatioKind::CurrentRatio), 500.0);
        assert!(ratios.is_low_confidence(RatioKind::CurrentRatio));
        assert!(ratios.is_low_confidence(RatioKind::NetMargin));
        assert!(!ratios.is_low_confidence(RatioKind::Leverage));
    }

    #[test]
    fn test_liquidity_and_leverage() {
        let bs = balance(600.0, 400.0, 300.0, 200.0, 150.0);
        let ratios = compute_ratios(&bs, &mut IncomeStatementSnapshot::default());
        assert_eq!(ratios.get(RatioKind::QuickRatio), 1.5);
        assert_eq!(ratios.get(RatioKind::GeneralLiquidity), 2.0);
        assert_eq!(ratios.get(RatioKind::Leverage), 50.0);
    }

    #[test]
    fn test_percentages_divide_before_scaling() {
        // 0.07 * 100.0 is 7.000000000000001, while 7.0 * 100.0 / 100.0 is 7.0.
        let bs = balance(50.0, 50.0, 7.0, 0.0, 0.0);
        let ratios = compute_ratios(&bs, &mut IncomeStatementSnapshot::default());
        assert_eq!(ratios.get(RatioKind::Leverage), (7.0_f64 / 100.0) * 100.0);

        let mut is = IncomeStatementSnapshot {
            net_revenue: 100.0,
            net_result: 7.0,
            ..Default::default()
        };
        let ratios = compute_ratios(&BalanceSheetSnapshot::default(), &mut is);
        assert_eq!(ratios.get(RatioKind::NetMargin), (7.0_f64 / 100.0) * 100.0);
    }

    #[test]
    fn test_margins_and_backfill() {
        let mut is = IncomeStatementSnapshot {
            gross_revenue: 1200.0,
            revenue_deductions: 200.0,
            costs: 400.0,
            operating_expenses: 350.0,
            net_result: 100.0,
            ..Default::default()
        };
        let ratios = compute_ratios(&BalanceSheetSnapshot::default(), &mut is);

        assert_eq!(is.net_revenue, 1000.0);
        assert_eq!(is.gross_profit, 600.0);
        assert_eq!(is.operating_result, 250.0);
        assert_eq!(ratios.get(RatioKind::GrossMargin), 60.0);
        assert_eq!(ratios.get(RatioKind::OperatingMargin), 25.0);
        assert_eq!(ratios.get(RatioKind::NetMargin), 10.0);
        assert_eq!(ratios.get(RatioKind::OperatingExpenseWeight), 35.0);
        assert_eq!(ratios.get(RatioKind::OperatingLeverageDegree), 2.4);
    }

    #[test]
    fn test_operating_leverage_zero_on_operating_loss() {
        let mut is = IncomeStatementSnapshot {
            net_revenue: 1000.0,
            gross_profit: 300.0,
            operating_expenses: 500.0,
            ..Default::default()
        };
        let ratios = compute_ratios(&BalanceSheetSnapshot::default(), &mut is);
        assert_eq!(is.operating_result, -200.0);
        assert_eq!(ratios.get(RatioKind::OperatingLeverageDegree), 0.0);
    }

    #[test]
    fn test_recompute_is_bit_identical() {
        let bs = balance(1234.56, 789.01, 987.65, 321.09, 111.11);
        let mut is = IncomeStatementSnapshot {
            gross_revenue: 9876.54,
            revenue_deductions: 123.45,
            costs: 4567.89,
            operating_expenses: 1111.11,
            net_result: 777.77,
            ..Default::default()
        };

        let first = compute_ratios(&bs, &mut is);
        let snapshot_after_first = is.clone();
        let second = compute_ratios(&bs, &mut is);

        assert_eq!(is, snapshot_after_first);
        for kind in RatioKind::ALL {
            assert_eq!(first.get(kind).to_bits(), second.get(kind).to_bits());
        }
        assert_eq!(first.low_confidence, second.low_confidence);
    }
}
