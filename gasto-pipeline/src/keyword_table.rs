//! Category keyword table shared by the keyword strategy and learning.
//!
//! Lookups take the read lock, learning takes the write lock, so a lookup
//! never observes a half-appended entry.

use std::sync::{PoisonError, RwLock};

use gasto_core::ExpenseRecord;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Seed table: category name and the lowercase keywords that select it.
/// Categories are probed in this order.
const SEED: &[(&str, &[&str])] = &[
    (
        "Alimentação",
        &[
            "mercado", "supermercado", "padaria", "restaurante", "lanche", "lanchonete", "ifood",
            "pizza", "açougue", "hortifruti", "almoço", "jantar", "café", "sorvete",
        ],
    ),
    (
        "Transporte",
        &[
            "uber", "taxi", "táxi", "gasolina", "combustível", "posto", "ônibus", "onibus",
            "metrô", "metro", "estacionamento", "pedágio", "passagem",
        ],
    ),
    (
        "Saúde",
        &[
            "farmácia", "farmacia", "remédio", "médico", "medico", "hospital", "consulta",
            "dentista", "exame", "plano de saúde",
        ],
    ),
    (
        "Moradia",
        &[
            "aluguel", "condomínio", "condominio", "conta de luz", "energia", "conta de água",
            "internet", "gás de cozinha", "iptu",
        ],
    ),
    (
        "Lazer",
        &[
            "cinema", "netflix", "spotify", "teatro", "boteco", "viagem", "hotel", "ingresso",
        ],
    ),
    (
        "Educação",
        &["escola", "faculdade", "mensalidade", "livraria", "apostila", "matrícula"],
    ),
    (
        "Compras",
        &["loja", "shopping", "roupa", "sapato", "amazon", "magazine", "shopee"],
    ),
    (
        "Receitas",
        &["salário", "salario", "freela", "freelance", "rendimento", "reembolso"],
    ),
];

/// One category and its keyword set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryKeywords {
    pub name: String,
    pub keywords: Vec<String>,
}

impl CategoryKeywords {
    pub fn new(name: impl Into<String>, keywords: &[&str]) -> Self {
        let mut entry = Self {
            name: name.into(),
            keywords: Vec::new(),
        };
        for k in keywords {
            entry.insert(k);
        }
        entry
    }

    /// Append a lowercase keyword unless present. Returns whether it was added.
    fn insert(&mut self, keyword: &str) -> bool {
        let keyword = keyword.trim().to_lowercase();
        if keyword.is_empty() || self.keywords.contains(&keyword) {
            return false;
        }
        self.keywords.push(keyword);
        true
    }

    fn first_hit(&self, search: &str) -> Option<&str> {
        self.keywords
            .iter()
            .find(|k| search.contains(k.as_str()))
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeywordTableError {
    #[error("unknown category: {0}")]
    UnknownCategory(String),
}

/// A keyword hit: the category and the keyword that selected it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordHit {
    pub category: String,
    pub keyword: String,
}

#[derive(Debug, Default)]
pub struct KeywordTable {
    entries: RwLock<Vec<CategoryKeywords>>,
}

impl KeywordTable {
    /// Build a table; keywords are lowercased and deduplicated
    pub fn new(entries: Vec<CategoryKeywords>) -> Self {
        let entries = entries
            .into_iter()
            .map(|e| {
                let mut clean = CategoryKeywords {
                    name: e.name,
                    keywords: Vec::new(),
                };
                for k in &e.keywords {
                    clean.insert(k);
                }
                clean
            })
            .collect();
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// The built-in Portuguese table
    pub fn seeded() -> Self {
        Self::new(
            SEED.iter()
                .map(|(name, keywords)| CategoryKeywords::new(*name, keywords))
                .collect(),
        )
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let entries: Vec<CategoryKeywords> = serde_json::from_str(json)?;
        Ok(Self::new(entries))
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.snapshot())
    }

    /// First category (in table order) with a keyword contained in `search`
    pub fn lookup(&self, search: &str) -> Option<KeywordHit> {
        let search = search.to_lowercase();
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.iter().find_map(|e| {
            e.first_hit(&search).map(|k| KeywordHit {
                category: e.name.clone(),
                keyword: k.to_string(),
            })
        })
    }

    /// Canonical name of the category called `name`, ignoring case
    pub fn category_named(&self, name: &str) -> Option<String> {
        let wanted = name.trim().to_lowercase();
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .iter()
            .find(|e| e.name.to_lowercase() == wanted)
            .map(|e| e.name.clone())
    }

    pub fn category_names(&self) -> Vec<String> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.iter().map(|e| e.name.clone()).collect()
    }

    pub fn snapshot(&self) -> Vec<CategoryKeywords> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Add a keyword to an existing category. Returns whether it was new.
    pub fn add_keyword(&self, category: &str, keyword: &str) -> Result<bool, KeywordTableError> {
        let wanted = category.trim().to_lowercase();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let entry = entries
            .iter_mut()
            .find(|e| e.name.to_lowercase() == wanted)
            .ok_or_else(|| KeywordTableError::UnknownCategory(category.to_string()))?;
        Ok(entry.insert(keyword))
    }

    /// Learn a human-confirmed category for a record: its merchant becomes a
    /// keyword of that category. Idempotent and append-only; the
    /// "unidentified" merchant is never learned.
    pub fn learn(&self, record: &ExpenseRecord, category: &str) -> Result<bool, KeywordTableError> {
        if !record.has_merchant() {
            if self.category_named(category).is_none() {
                return Err(KeywordTableError::UnknownCategory(category.to_string()));
            }
            debug!(category, "skip learning: merchant unidentified");
            return Ok(false);
        }

        let added = self.add_keyword(category, &record.merchant)?;
        debug!(category, merchant = %record.merchant, added, "learned keyword");
        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use gasto_core::{Direction, UNIDENTIFIED_MERCHANT};
    use rust_decimal::Decimal;

    fn record(merchant: &str) -> ExpenseRecord {
        ExpenseRecord {
            amount: Decimal::new(3990, 2),
            occurred_on: NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(),
            merchant: merchant.to_string(),
            direction: Direction::Expense,
            details_raw: format!("paguei 39,90 na {}", merchant.to_lowercase()),
            category_hint: None,
            category_id: None,
            category_source: None,
            user_id: None,
            created_at: Utc::now(),
        }
    }

    fn small_table() -> KeywordTable {
        KeywordTable::new(vec![
            CategoryKeywords::new("Alimentação", &["mercado", "Padaria", "mercado"]),
            CategoryKeywords::new("Saúde", &["farmácia"]),
            CategoryKeywords::new("Compras", &["mercado livre"]),
        ])
    }

    #[test]
    fn test_keywords_are_lowercased_and_deduped() {
        let t = small_table();
        let snap = t.snapshot();
        assert_eq!(snap[0].keywords, vec!["mercado", "padaria"]);
    }

    #[test]
    fn test_lookup_first_category_wins() {
        let t = small_table();
        // "mercado livre" contains "mercado": table order decides
        let hit = t.lookup("comprei no Mercado Livre").unwrap();
        assert_eq!(hit.category, "Alimentação");
        assert_eq!(hit.keyword, "mercado");
        assert!(t.lookup("posto").is_none());
    }

    #[test]
    fn test_learn_round_trip() {
        let t = small_table();
        let r = record("Drogaria XYZ");
        assert!(t.lookup("drogaria xyz").is_none());

        assert_eq!(t.learn(&r, "Saúde"), Ok(true));
        // idempotent
        assert_eq!(t.learn(&r, "saúde"), Ok(false));

        let hit = t.lookup("paguei 10 na drogaria xyz").unwrap();
        assert_eq!(hit.category, "Saúde");
        assert_eq!(hit.keyword, "drogaria xyz");
    }

    #[test]
    fn test_learn_unknown_category() {
        let t = small_table();
        assert_eq!(
            t.learn(&record("Pet Shop"), "Pets"),
            Err(KeywordTableError::UnknownCategory("Pets".to_string()))
        );
        assert_eq!(
            t.learn(&record(UNIDENTIFIED_MERCHANT), "Pets"),
            Err(KeywordTableError::UnknownCategory("Pets".to_string()))
        );
    }

    #[test]
    fn test_learn_skips_unidentified_merchant() {
        let t = small_table();
        assert_eq!(t.learn(&record(UNIDENTIFIED_MERCHANT), "Saúde"), Ok(false));
        assert!(t.lookup(UNIDENTIFIED_MERCHANT).is_none());
    }

    #[test]
    fn test_json_round_trip_keeps_order() {
        let t = KeywordTable::seeded();
        t.add_keyword("Lazer", "clube").unwrap();
        let json = t.to_json_pretty().unwrap();
        let back = KeywordTable::from_json(&json).unwrap();
        assert_eq!(back.category_names(), t.category_names());
        assert_eq!(back.lookup("clube").unwrap().category, "Lazer");
    }

    #[test]
    fn test_seed_has_expected_categories() {
        let t = KeywordTable::seeded();
        let names = t.category_names();
        assert_eq!(names[0], "Alimentação");
        assert!(names.contains(&"Saúde".to_string()));
        assert_eq!(t.category_named("transporte").as_deref(), Some("Transporte"));
        assert_eq!(t.lookup("gastei r$ 50 no mercado").unwrap().category, "Alimentação");
    }

    #[test]
    fn test_concurrent_learn_and_lookup() {
        let t = small_table();
        std::thread::scope(|s| {
            s.spawn(|| {
                for i in 0..200 {
                    t.add_keyword("Compras", &format!("loja {i}")).unwrap();
                }
            });
            s.spawn(|| {
                for _ in 0..200 {
                    // either not yet learned or fully learned, never torn
                    if let Some(hit) = t.lookup("loja 199") {
                        assert_eq!(hit.category, "Compras");
                    }
                }
            });
        });
        assert_eq!(t.snapshot()[2].keywords.len(), 201);
    }
}
