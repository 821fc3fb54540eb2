//! Label synonyms for every canonical line item.
//!
//! The catalog is plain data: each line item owns an ordered list of tiers, each
//! tier an ordered list of label synonyms (most specific first) plus the terms
//! that disqualify a match when they appear between the label and its amount.
//! Later tiers are only consulted when every earlier tier came up empty.

use crate::error::{Result, StatementAnalysisError};
use crate::schema::LineItem;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LabelTier {
    #[schemars(description = "Label synonyms, most specific first")]
    pub labels: Vec<String>,

    #[schemars(
        description = "Terms that reject a match when found between the label and the amount (case-insensitive)"
    )]
    #[serde(default)]
    pub avoid: Vec<String>,
}

impl LabelTier {
    pub fn new(labels: &[&str], avoid: &[&str]) -> Self {
        Self {
            labels: labels.iter().map(|s| s.to_string()).collect(),
            avoid: avoid.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FieldRule {
    pub item: LineItem,
    pub tiers: Vec<LabelTier>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LabelCatalog {
    pub rules: Vec<FieldRule>,

    #[schemars(description = "Labels for a loss of the period, negated into the net result")]
    pub loss_labels: LabelTier,

    #[schemars(
        description = "Terms marking a result line when scanning the income statement bottom-up"
    )]
    pub result_line_terms: Vec<String>,
}

impl LabelCatalog {
    pub fn rule(&self, item: LineItem) -> Option<&FieldRule> {
        self.rules.iter().find(|r| r.item == item)
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();

        for rule in &self.rules {
            if !seen.insert(rule.item) {
                return Err(StatementAnalysisError::InvalidLabelCatalog {
                    item: rule.item.to_string(),
                    details: "line item appears more than once".to_string(),
                });
            }

            if rule.tiers.is_empty() {
                return Err(StatementAnalysisError::InvalidLabelCatalog {
                    item: rule.item.to_string(),
                    details: "at least one label tier is required".to_string(),
                });
            }

            for (idx, tier) in rule.tiers.iter().enumerate() {
                validate_tier(&rule.item.to_string(), idx, tier)?;
            }
        }

        validate_tier("loss labels", 0, &self.loss_labels)?;

        Ok(())
    }

    /// Brazilian accounting terminology, with and without diacritics.
    pub fn brazilian() -> Self {
        let rules = vec![
            FieldRule {
                item: LineItem::CurrentAssets,
                tiers: vec![
                    LabelTier::new(
                        &["ATIVO CIRCULANTE"],
                        &["TOTAL", "NAO CIRCULANTE", "NÃO CIRCULANTE"],
                    ),
                    LabelTier::new(&["TOTAL DO ATIVO CIRCULANTE"], &[]),
                ],
            },
            FieldRule {
                item: LineItem::NonCurrentAssets,
                tiers: vec![LabelTier::new(
                    &[
                        "ATIVO NAO CIRCULANTE",
                        "ATIVO NÃO CIRCULANTE",
                        "REALIZAVEL A LONGO PRAZO",
                        "REALIZÁVEL A LONGO PRAZO",
                        "PERMANENTE",
                        "IMOBILIZADO",
                    ],
                    &[],
                )],
            },
            FieldRule {
                item: LineItem::TotalAssets,
                tiers: vec![LabelTier::new(
                    &["TOTAL DO ATIVO", "ATIVO TOTAL", "TOTAL GERAL DO ATIVO"],
                    &["CIRCULANTE"],
                )],
            },
            FieldRule {
                item: LineItem::CurrentLiabilities,
                tiers: vec![
                    LabelTier::new(
                        &["PASSIVO CIRCULANTE"],
                        &["TOTAL", "NAO CIRCULANTE", "NÃO CIRCULANTE"],
                    ),
                    LabelTier::new(&["TOTAL DO PASSIVO CIRCULANTE"], &[]),
                ],
            },
            FieldRule {
                item: LineItem::NonCurrentLiabilities,
                tiers: vec![LabelTier::new(
                    &[
                        "PASSIVO NAO CIRCULANTE",
                        "PASSIVO NÃO CIRCULANTE",
                        "EXIGIVEL A LONGO PRAZO",
                        "EXIGÍVEL A LONGO PRAZO",
                    ],
                    &[],
                )],
            },
            FieldRule {
                item: LineItem::Inventory,
                tiers: vec![LabelTier::new(
                    &["ESTOQUES", "MERCADORIAS", "ESTOQUE FINAL"],
                    &["VENDIDAS", "CUSTO"],
                )],
            },
            FieldRule {
                item: LineItem::GrossRevenue,
                tiers: vec![LabelTier::new(
                    &["RECEITA OPERACIONAL BRUTA", "RECEITA BRUTA"],
                    &["DEDUC", "DEDUÇ"],
                )],
            },
            FieldRule {
                item: LineItem::RevenueDeductions,
                tiers: vec![LabelTier::new(
                    &[
                        "DEDUCOES DA RECEITA BRUTA",
                        "DEDUÇÕES DA RECEITA BRUTA",
                        "DEDUCOES DA RECEITA",
                        "DEDUÇÕES DA RECEITA",
                        "DEDUCOES",
                        "DEDUÇÕES",
                    ],
                    &[],
                )],
            },
            FieldRule {
                item: LineItem::NetRevenue,
                tiers: vec![LabelTier::new(
                    &[
                        "RECEITA OPERACIONAL LIQUIDA",
                        "RECEITA OPERACIONAL LÍQUIDA",
                        "RECEITA LIQUIDA",
                        "RECEITA LÍQUIDA",
                    ],
                    &[],
                )],
            },
            FieldRule {
                item: LineItem::Costs,
                tiers: vec![LabelTier::new(
                    &[
                        "CUSTO DAS MERCADORIAS VENDIDAS",
                        "CUSTO DOS PRODUTOS VENDIDOS",
                        "CUSTO DOS SERVICOS PRESTADOS",
                        "CUSTO DOS SERVIÇOS PRESTADOS",
                        "CUSTO DAS VENDAS",
                        "CUSTOS DAS VENDAS",
                        "CMV",
                        "CPV",
                        "CSP",
                    ],
                    &[],
                )],
            },
            FieldRule {
                item: LineItem::GrossProfit,
                tiers: vec![LabelTier::new(
                    &["LUCRO OPERACIONAL BRUTO", "LUCRO BRUTO", "RESULTADO BRUTO"],
                    &[],
                )],
            },
            FieldRule {
                item: LineItem::OperatingExpenses,
                tiers: vec![LabelTier::new(
                    &["DESPESAS OPERACIONAIS", "OUTRAS DESPESAS OPERACIONAIS"],
                    &["RECEITAS"],
                )],
            },
            FieldRule {
                item: LineItem::OperatingResult,
                tiers: vec![LabelTier::new(
                    &[
                        "RESULTADO OPERACIONAL",
                        "LUCRO OPERACIONAL",
                        "RESULTADO ANTES DO RESULTADO FINANCEIRO",
                    ],
                    &["BRUTO"],
                )],
            },
            FieldRule {
                item: LineItem::NetResult,
                tiers: vec![LabelTier::new(
                    &[
                        "LUCRO LIQUIDO DO EXERCICIO",
                        "LUCRO LÍQUIDO DO EXERCÍCIO",
                        "LUCRO LIQUIDO DO PERIODO",
                        "LUCRO LÍQUIDO DO PERÍODO",
                        "LUCRO DO EXERCICIO",
                        "LUCRO DO EXERCÍCIO",
                        "LUCRO DO PERIODO",
                        "LUCRO DO PERÍODO",
                        "LUCRO LIQUIDO",
                        "LUCRO LÍQUIDO",
                        "RESULTADO LIQUIDO",
                        "RESULTADO LÍQUIDO",
                    ],
                    &[],
                )],
            },
        ];

        Self {
            rules,
            loss_labels: LabelTier::new(
                &[
                    "PREJUIZO DO EXERCICIO",
                    "PREJUÍZO DO EXERCÍCIO",
                    "PREJUIZO DO PERIODO",
                    "PREJUÍZO DO PERÍODO",
                    "PREJUIZO LIQUIDO",
                    "PREJUÍZO LÍQUIDO",
                    "PREJUIZO",
                    "PREJUÍZO",
                ],
                &["ACUMULADO"],
            ),
            result_line_terms: vec!["LUCRO".to_string(), "RESULTADO".to_string()],
        }
    }
}

impl Default for LabelCatalog {
    fn default() -> Self {
        Self::brazilian()
    }
}

fn validate_tier(owner: &str, idx: usize, tier: &LabelTier) -> Result<()> {
    if tier.labels.is_empty() || tier.labels.iter().any(|l| l.trim().is_empty()) {
        return Err(StatementAnalysisError::InvalidLabelCatalog {
            item: owner.to_string(),
            details: format!("tier #{} has an empty label list or a blank label", idx),
        });
    }
    if tier.avoid.iter().any(|a| a.trim().is_empty()) {
        return Err(StatementAnalysisError::InvalidLabelCatalog {
            item: owner.to_string(),
            details: format!("tier #{} has a blank avoid term", idx),
        });
    }
    Ok(())
}
