//! Read-only card/reward catalog
//!
//! The catalog is externally owned reference data: cards keyed by id,
//! each with an ordered reward list. This module loads it from JSON and
//! serves the lookups the calculator and gap analyzer need.

use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{Card, Reward};
use crate::rewards::reward_applies;
use crate::taxonomy::Taxonomy;

/// A card together with its ordered reward list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub card: Card,
    #[serde(default)]
    pub rewards: Vec<Reward>,
}

/// The full catalog
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    /// Load a catalog from a JSON file (an array of entries)
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let entries: Vec<CatalogEntry> = serde_json::from_str(&data)?;
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn card(&self, card_id: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.card.id == card_id)
    }

    /// Best applicable (rate, reward) per catalog card for a category,
    /// sorted by rate descending. Cards with no applicable reward are
    /// omitted.
    pub fn top_for_category<'a>(
        &'a self,
        taxonomy: &Taxonomy,
        category: &str,
        date: NaiveDate,
    ) -> Vec<(&'a CatalogEntry, f64, &'a Reward)> {
        let mut ranked: Vec<(&CatalogEntry, f64, &Reward)> = self
            .entries
            .iter()
            .filter_map(|entry| {
                entry
                    .rewards
                    .iter()
                    .filter(|r| reward_applies(taxonomy, r, category, date))
                    .max_by(|a, b| {
                        a.multiplier
                            .partial_cmp(&b.multiplier)
                            .unwrap_or(std::cmp::Ordering::Equal)
                    })
                    .map(|r| (entry, r.multiplier, r))
            })
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked
    }
}

#[cfg(test)]
pub(crate) mod test_fixtures {
    use super::*;

    pub fn card(id: &str, name: &str, annual_fee: f64) -> Card {
        Card {
            id: id.into(),
            name: name.into(),
            issuer: "Test Bank".into(),
            network: "Visa".into(),
            annual_fee,
        }
    }

    pub fn reward(card_id: &str, category: &str, multiplier: f64) -> Reward {
        Reward {
            card_id: card_id.into(),
            category: category.into(),
            multiplier,
            cap: None,
            portal_only: false,
            start_date: None,
            end_date: None,
            notes: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_fixtures::{card, reward};
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn catalog() -> Catalog {
        Catalog::new(vec![
            CatalogEntry {
                card: card("everyday", "Everyday Card", 0.0),
                rewards: vec![reward("everyday", "All", 1.5)],
            },
            CatalogEntry {
                card: card("grocer", "Grocer Card", 95.0),
                rewards: vec![
                    reward("grocer", "Grocery", 6.0),
                    reward("grocer", "All", 1.0),
                ],
            },
            CatalogEntry {
                card: card("wanderer", "Wanderer Card", 250.0),
                rewards: vec![reward("wanderer", "Travel", 5.0)],
            },
        ])
    }

    #[test]
    fn test_top_for_category_orders_by_rate() {
        let taxonomy = Taxonomy::new().unwrap();
        let catalog = catalog();
        let top = catalog.top_for_category(&taxonomy, "Grocery", date(2025, 6, 1));
        let ids: Vec<&str> = top.iter().map(|(e, _, _)| e.card.id.as_str()).collect();
        // Grocer 6x, then Everyday's 1.5x wildcard; Wanderer has nothing applicable
        assert_eq!(ids, vec!["grocer", "everyday"]);
        assert_eq!(top[0].1, 6.0);
    }

    #[test]
    fn test_card_lookup() {
        let c = catalog();
        assert!(c.card("wanderer").is_some());
        assert!(c.card("missing").is_none());
    }

    #[test]
    fn test_catalog_json_round_trip() {
        let json = serde_json::to_string(catalog().entries()).unwrap();
        let parsed: Vec<CatalogEntry> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[1].rewards[0].multiplier, 6.0);
    }
}
