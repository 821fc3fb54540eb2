use once_cell::sync::Lazy;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

static COMPANY_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:raz[aã]o\s+social|nome|empresa)\b\s*[:\n-]+\s*([^\n]{5,60})").unwrap()
});

static CNPJ: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{2}\.?\d{3}\.?\d{3}/?\d{4}-?\d{2}").unwrap());

/// Who the statement belongs to, as printed in the document header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CompanyIdentification {
    #[schemars(description = "Legal name (razão social)")]
    pub name: Option<String>,
    #[schemars(description = "CNPJ, as printed")]
    pub tax_id: Option<String>,
}

impl CompanyIdentification {
    pub fn from_text(text: &str) -> Self {
        let name = COMPANY_NAME
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|name| !name.is_empty());

        let tax_id = CNPJ.find(text).map(|m| m.as_str().to_string());

        Self { name, tax_id }
    }

    /// Fields present in `other` win over the ones read from the text.
    pub fn merged_with(&self, other: &CompanyIdentification) -> Self {
        Self {
            name: other.name.clone().or_else(|| self.name.clone()),
            tax_id: other.tax_id.clone().or_else(|| self.tax_id.clone()),
        }
    }
}
