//! Category taxonomy: canonical categories, synonym sets, merchant
//! patterns, and the word tables used by the lexical classifier tier.
//!
//! Synonym sets must be pairwise disjoint across canonical categories.
//! An overlap would silently corrupt reward matching, so it is a fatal
//! configuration error at construction time, not a runtime branch.

use regex::Regex;
use std::collections::HashMap;

use crate::error::{Error, Result};

/// Reserved wildcard category on rewards that match any purchase
pub const WILDCARD: &str = "All";

/// Catch-all category for unclassifiable descriptions
pub const OTHER: &str = "Other";

/// A keyword phrase with its specificity weight
#[derive(Debug, Clone)]
pub struct Keyword {
    pub phrase: String,
    pub weight: f64,
}

/// One canonical category with its matching data
#[derive(Debug)]
pub struct CategoryEntry {
    pub name: String,
    pub synonyms: Vec<String>,
    pub keywords: Vec<Keyword>,
    pub merchant: Regex,
}

/// Static definition table, compiled into a `Taxonomy` at startup
struct CategoryDef {
    name: &'static str,
    synonyms: &'static [&'static str],
    keywords: &'static [&'static str],
    merchant_pattern: &'static str,
}

const CATEGORY_DEFS: &[CategoryDef] = &[
    CategoryDef {
        name: "Grocery",
        synonyms: &["groceries", "supermarkets", "grocery stores"],
        keywords: &["grocery", "groceries", "supermarket", "produce", "grocery run"],
        merchant_pattern: r"whole foods|trader joe|safeway|kroger|aldi|wegmans|publix",
    },
    CategoryDef {
        name: "Dining",
        synonyms: &["restaurants", "dining out", "food delivery"],
        keywords: &["restaurant", "dinner", "lunch", "brunch", "takeout", "coffee"],
        merchant_pattern: r"chipotle|starbucks|mcdonald|doordash|grubhub|uber eats",
    },
    CategoryDef {
        name: "Travel",
        synonyms: &["flights", "hotels", "airfare", "lodging"],
        keywords: &["flight", "hotel", "vacation", "trip", "airline tickets"],
        merchant_pattern: r"marriott|hilton|hyatt|delta air|united air|airbnb|expedia",
    },
    CategoryDef {
        name: "Gas",
        synonyms: &["fuel", "gas stations"],
        keywords: &["gas", "fuel", "gas station", "filling up"],
        merchant_pattern: r"shell|chevron|exxon|sunoco|valero",
    },
    CategoryDef {
        name: "Transit",
        synonyms: &["commuting", "public transit", "rideshare"],
        keywords: &["commute", "subway", "bus fare", "train ticket", "parking", "toll"],
        merchant_pattern: r"\blyft\b|\bamtrak\b|\bmta\b|\bbart\b|caltrain",
    },
    CategoryDef {
        name: "Entertainment",
        synonyms: &["streaming", "movies", "concerts"],
        keywords: &["concert", "movie", "tickets", "show", "festival"],
        merchant_pattern: r"spotify|netflix|hulu|amc theatres|ticketmaster|disney\+",
    },
    CategoryDef {
        name: "Online Shopping",
        synonyms: &["online retail", "e-commerce"],
        keywords: &["online order", "online shopping", "checkout", "shipping"],
        merchant_pattern: r"amazon|ebay|etsy|shein",
    },
    CategoryDef {
        name: "Drugstore",
        synonyms: &["pharmacy", "pharmacies", "drugstores"],
        keywords: &["prescription", "medication", "refill"],
        merchant_pattern: r"walgreens|cvs|rite aid",
    },
    CategoryDef {
        name: "Utilities",
        synonyms: &["phone", "internet", "cable"],
        keywords: &["utility bill", "internet bill", "phone bill", "electric bill"],
        merchant_pattern: r"comcast|xfinity|verizon|at&t|t-mobile",
    },
];

/// Action verbs that align with a category; an aligned verb boosts that
/// category's hits, any other verb presence mildly discounts the rest.
const ACTION_VERBS: &[(&str, &str)] = &[
    ("booking", "Travel"),
    ("book", "Travel"),
    ("flying", "Travel"),
    ("staying", "Travel"),
    ("eating", "Dining"),
    ("dining", "Dining"),
    ("ordering", "Dining"),
    ("shopping", "Online Shopping"),
    ("buying", "Online Shopping"),
    ("driving", "Gas"),
    ("refueling", "Gas"),
    ("commuting", "Transit"),
    ("riding", "Transit"),
    ("streaming", "Entertainment"),
];

/// Phrases that, placed before a hit, mark it as incidental background
/// ("listening to spotify ...")
const SUPPRESSORS_BEFORE: &[&str] = &["listening to", "while", "watching", "playing", "using"];

/// Words that, placed right after a hit, mark it as background
/// ("spotify during commute")
const SUPPRESSORS_AFTER: &[&str] = &["during", "while"];

/// Words before a hit that mark it as the true context of the purchase
const CONTEXT_BEFORE: &[&str] = &["during"];

/// Prepositions before a hit that tie the purchase to it
const BOOSTERS_BEFORE: &[&str] = &["at", "from", "for"];

/// Compiled taxonomy shared across the engine
#[derive(Debug)]
pub struct Taxonomy {
    categories: Vec<CategoryEntry>,
    /// lowercased synonym or canonical name -> canonical name index
    canonical: HashMap<String, usize>,
}

impl Taxonomy {
    /// Build the built-in taxonomy, validating synonym disjointness.
    ///
    /// Returns `Error::ConfigurationConflict` if any synonym (or canonical
    /// name) appears under two categories.
    pub fn new() -> Result<Self> {
        Self::from_defs(CATEGORY_DEFS)
    }

    fn from_defs(defs: &[CategoryDef]) -> Result<Self> {
        let mut categories = Vec::with_capacity(defs.len());
        let mut canonical: HashMap<String, usize> = HashMap::new();

        for (idx, def) in defs.iter().enumerate() {
            let mut names = vec![def.name.to_string()];
            names.extend(def.synonyms.iter().map(|s| s.to_string()));

            for name in &names {
                let key = name.to_lowercase();
                if let Some(&prev) = canonical.get(&key) {
                    return Err(Error::ConfigurationConflict(format!(
                        "synonym '{}' maps to both '{}' and '{}'",
                        name, defs[prev].name, def.name
                    )));
                }
                canonical.insert(key, idx);
            }

            let keywords = def
                .keywords
                .iter()
                .map(|k| Keyword {
                    phrase: k.to_string(),
                    weight: keyword_weight(k),
                })
                .collect();

            categories.push(CategoryEntry {
                name: def.name.to_string(),
                synonyms: def.synonyms.iter().map(|s| s.to_string()).collect(),
                keywords,
                merchant: Regex::new(def.merchant_pattern)?,
            });
        }

        Ok(Self {
            categories,
            canonical,
        })
    }

    /// Canonical category names, in definition order
    pub fn category_names(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|c| c.name.as_str())
    }

    pub fn entries(&self) -> &[CategoryEntry] {
        &self.categories
    }

    /// Resolve a category name or synonym to its canonical name
    pub fn canonicalize(&self, name: &str) -> Option<&str> {
        let key = name.trim().to_lowercase();
        if key == OTHER.to_lowercase() {
            return Some(OTHER);
        }
        self.canonical
            .get(&key)
            .map(|&idx| self.categories[idx].name.as_str())
    }

    /// Whether a reward category applies to a target purchase category:
    /// exact (case-insensitive), via the `"All"` wildcard, or via the
    /// synonym table.
    pub fn matches(&self, reward_category: &str, target: &str) -> bool {
        if reward_category.eq_ignore_ascii_case(WILDCARD) {
            return true;
        }
        if reward_category.eq_ignore_ascii_case(target) {
            return true;
        }
        match (self.canonicalize(reward_category), self.canonicalize(target)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    pub(crate) fn aligned_verb_category(&self, verb: &str) -> Option<&'static str> {
        ACTION_VERBS
            .iter()
            .find(|(v, _)| *v == verb)
            .map(|(_, cat)| *cat)
    }

    pub(crate) fn is_action_verb(&self, word: &str) -> bool {
        ACTION_VERBS.iter().any(|(v, _)| *v == word)
    }

    pub(crate) fn suppressors_before(&self) -> &'static [&'static str] {
        SUPPRESSORS_BEFORE
    }

    pub(crate) fn suppressors_after(&self) -> &'static [&'static str] {
        SUPPRESSORS_AFTER
    }

    pub(crate) fn context_before(&self) -> &'static [&'static str] {
        CONTEXT_BEFORE
    }

    pub(crate) fn boosters_before(&self) -> &'static [&'static str] {
        BOOSTERS_BEFORE
    }
}

/// Longer, more specific phrases score higher than single generic words
fn keyword_weight(phrase: &str) -> f64 {
    let words = phrase.split_whitespace().count() as f64;
    1.0 + 0.5 * words + 0.12 * phrase.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_taxonomy_is_valid() {
        let taxonomy = Taxonomy::new().unwrap();
        assert!(taxonomy.category_names().count() >= 8);
    }

    #[test]
    fn test_overlapping_synonyms_fail_fast() {
        let defs = [
            CategoryDef {
                name: "Dining",
                synonyms: &["restaurants", "food"],
                keywords: &[],
                merchant_pattern: "x",
            },
            CategoryDef {
                name: "Grocery",
                synonyms: &["food"],
                keywords: &[],
                merchant_pattern: "y",
            },
        ];
        let err = Taxonomy::from_defs(&defs).unwrap_err();
        assert!(matches!(err, Error::ConfigurationConflict(_)));
    }

    #[test]
    fn test_canonical_name_as_synonym_fails_fast() {
        let defs = [
            CategoryDef {
                name: "Dining",
                synonyms: &[],
                keywords: &[],
                merchant_pattern: "x",
            },
            CategoryDef {
                name: "Grocery",
                synonyms: &["dining"],
                keywords: &[],
                merchant_pattern: "y",
            },
        ];
        assert!(Taxonomy::from_defs(&defs).is_err());
    }

    #[test]
    fn test_canonicalize_synonym() {
        let taxonomy = Taxonomy::new().unwrap();
        assert_eq!(taxonomy.canonicalize("groceries"), Some("Grocery"));
        assert_eq!(taxonomy.canonicalize("Restaurants"), Some("Dining"));
        assert_eq!(taxonomy.canonicalize("other"), Some(OTHER));
        assert_eq!(taxonomy.canonicalize("spelunking"), None);
    }

    #[test]
    fn test_matches_wildcard_and_synonyms() {
        let taxonomy = Taxonomy::new().unwrap();
        assert!(taxonomy.matches(WILDCARD, "Dining"));
        assert!(taxonomy.matches("Grocery", "Grocery"));
        assert!(taxonomy.matches("groceries", "Grocery"));
        assert!(taxonomy.matches("Grocery", "supermarkets"));
        assert!(!taxonomy.matches("Dining", "Grocery"));
    }

    #[test]
    fn test_keyword_weight_favors_longer_phrases() {
        assert!(keyword_weight("gas station") > keyword_weight("gas"));
        assert!(keyword_weight("airline tickets") > keyword_weight("trip"));
    }
}
