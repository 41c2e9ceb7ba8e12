//! CLI command implementations
//!
//! Each `cmd_*` function maps to one subcommand. Shared wiring (opening
//! the ledger, building the classifier from environment variables) lives
//! in the small helpers at the top.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use tracing::{debug, info};

use cardmax_core::{
    Catalog, CategoryClassifier, ClassifyMethod, Database, GapReport, HttpVectorSearch,
    NewSpendingRecord, OllamaTextGen, PortfolioGapAnalyzer, RecommendationRanker, RewardCalculator,
    SpendingLedger, Taxonomy, TextGen,
};

/// Open the spending ledger database
pub fn open_db(db_path: &Path) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .context("Database path is not valid UTF-8")?;
    Database::open(path_str).context("Failed to open ledger database")
}

/// Build the classifier with whatever backends the environment provides
///
/// Tier 2 needs VECTOR_SEARCH_HOST, tier 3 needs OLLAMA_HOST (and
/// optionally OLLAMA_MODEL). With neither set the classifier is
/// lexical-only, which is still a complete cascade.
fn build_classifier(taxonomy: Arc<Taxonomy>) -> CategoryClassifier {
    let mut classifier = CategoryClassifier::new(taxonomy);

    if let Some(vector) = HttpVectorSearch::from_env() {
        info!("Semantic tier enabled (vector search)");
        classifier = classifier.with_vector_search(Arc::new(vector));
    } else {
        debug!("VECTOR_SEARCH_HOST not set; semantic tier disabled");
    }

    if let Some(textgen) = OllamaTextGen::from_env() {
        info!(model = %textgen.model(), "Generative tier enabled");
        classifier = classifier.with_text_gen(Arc::new(textgen));
    } else {
        debug!("OLLAMA_HOST not set; generative tier disabled");
    }

    classifier
}

/// Owned card ids from explicit --card flags, falling back to the ledger
fn resolve_owned(
    cards: &[String],
    user: Option<&str>,
    ledger: &dyn SpendingLedger,
) -> Result<Vec<String>> {
    if !cards.is_empty() {
        return Ok(cards.to_vec());
    }
    match user {
        Some(user_id) => {
            let owned = ledger.owned_card_ids(user_id)?;
            if owned.is_empty() {
                bail!("User '{}' owns no cards; add some with 'cardmax own'", user_id);
            }
            Ok(owned)
        }
        None => bail!("Provide owned cards with --card or a --user with ledger ownership"),
    }
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

pub async fn cmd_classify(
    description: &str,
    method: Option<ClassifyMethod>,
    json: bool,
) -> Result<()> {
    let taxonomy = Arc::new(Taxonomy::new()?);
    let classifier = build_classifier(taxonomy);

    let result = classifier.categorize(description, method).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("📂 {}", result.category);
        println!("   confidence: {:.2}", result.confidence);
        println!("   source:     {}", result.source);
        println!("   reasoning:  {}", result.reasoning);
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub async fn cmd_recommend(
    db_path: &Path,
    catalog_path: &Path,
    category: Option<String>,
    description: Option<String>,
    amount: f64,
    date: Option<NaiveDate>,
    user: Option<String>,
    top: usize,
) -> Result<()> {
    let catalog = Catalog::from_json_file(catalog_path).context("Failed to load card catalog")?;
    let taxonomy = Arc::new(Taxonomy::new()?);
    let date = date.unwrap_or_else(today);

    let category = match category {
        Some(c) => c,
        None => {
            let description =
                description.context("Provide --category or a --description to classify")?;
            let classifier = build_classifier(Arc::clone(&taxonomy));
            let result = classifier.categorize(&description, None).await;
            println!(
                "📂 Classified as {} ({:.2} via {})",
                result.category, result.confidence, result.source
            );
            result.category
        }
    };

    // The ledger only matters when a user id scopes the cap lookups
    let ledger = match &user {
        Some(_) => Some(open_db(db_path)?),
        None => None,
    };
    let calculator = match &ledger {
        Some(db) => RewardCalculator::with_ledger(&taxonomy, db),
        None => RewardCalculator::new(&taxonomy),
    };
    let ranker = RecommendationRanker::new(&calculator);

    let ranked = ranker.rank(catalog.entries(), &category, amount, date, user.as_deref());
    if ranked.is_empty() {
        println!("No cards in catalog");
        return Ok(());
    }

    if amount > 0.0 {
        println!("💳 Best cards for {} (${:.2}) on {}:", category, amount, date);
    } else {
        println!("💳 Best cards for {} on {}:", category, date);
    }
    for (i, entry) in ranked.iter().take(top).enumerate() {
        println!(
            "{}. {} — {:.2}x{}",
            i + 1,
            entry.card.name,
            entry.result.effective_rate,
            if amount > 0.0 {
                format!(" → ${:.2}", entry.result.reward_value)
            } else {
                String::new()
            }
        );
        if let Some(cap) = &entry.result.cap_status {
            println!(
                "   cap: ${:.0} of ${:.0} remaining ({:.0}% used)",
                cap.remaining, cap.total, cap.percentage
            );
        }
        if entry.result.portal_only {
            println!("   portal booking required");
        }
        println!("   simplicity: {}/100", entry.simplicity);
    }
    Ok(())
}

pub async fn cmd_gaps(
    db_path: &Path,
    catalog_path: &Path,
    cards: &[String],
    user: Option<&str>,
    category: Option<&str>,
    date: Option<NaiveDate>,
) -> Result<()> {
    let catalog = Arc::new(Catalog::from_json_file(catalog_path).context("Failed to load card catalog")?);
    let taxonomy = Arc::new(Taxonomy::new()?);
    let date = date.unwrap_or_else(today);

    let owned = if cards.is_empty() && user.is_some() {
        let db = open_db(db_path)?;
        resolve_owned(cards, user, &db)?
    } else {
        resolve_owned(cards, user, &cardmax_core::MemoryLedger::new())?
    };

    let analyzer = PortfolioGapAnalyzer::new(catalog, taxonomy);

    if let Some(category) = category {
        let comparison = analyzer.compare_category(&owned, category, date);
        println!("📊 {} coverage:", comparison.category);
        if comparison.user_cards.is_empty() {
            println!("   (no owned card earns here)");
        }
        for owned_rate in &comparison.user_cards {
            println!(
                "   {} — {:.2}x (${:.0}/yr)",
                owned_rate.card.name, owned_rate.rate, owned_rate.card.annual_fee
            );
        }
        if comparison.good_coverage {
            println!("   ✅ Coverage is close to market best");
        }
        for upgrade in &comparison.upgrades {
            println!(
                "   ⬆️  {} — {:.2}x, {}",
                upgrade.card.name, upgrade.rate, upgrade.justification
            );
        }
        return Ok(());
    }

    let reports = analyzer.analyze(&owned, date).await;
    if reports.is_empty() {
        println!("✅ No meaningful gaps; portfolio tracks the market");
        return Ok(());
    }

    println!("🔍 Found {} gap(s):", reports.len());
    for report in &reports {
        print_gap(report);
    }
    Ok(())
}

fn print_gap(report: &GapReport) {
    let gap = &report.gap;
    println!(
        "  [{}] {}: {:.2}x owned vs {:.2}x market (+{:.2})",
        gap.priority, gap.category, gap.user_best_rate, gap.market_best_rate, gap.improvement
    );
    for suggestion in &report.suggestions {
        println!(
            "      {} — {:.2}x, {}",
            suggestion.card.name, suggestion.rate, suggestion.justification
        );
    }
}

pub fn cmd_record(
    db_path: &Path,
    user: &str,
    card: &str,
    category: &str,
    amount: f64,
    date: Option<NaiveDate>,
) -> Result<()> {
    let db = open_db(db_path)?;
    let record = NewSpendingRecord {
        user_id: user.to_string(),
        card_id: card.to_string(),
        category: category.to_string(),
        amount,
        date: date.unwrap_or_else(today),
    };
    let id = db.insert_spending(&record)?;
    println!(
        "✅ Recorded ${:.2} of {} on {} (record #{})",
        amount, category, card, id
    );
    Ok(())
}

pub fn cmd_own(db_path: &Path, user: &str, card: &str) -> Result<()> {
    let db = open_db(db_path)?;
    db.add_ownership(user, card)?;
    println!("✅ {} now owns {}", user, card);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardmax_core::MemoryLedger;

    #[test]
    fn test_resolve_owned_prefers_explicit_cards() {
        let ledger = MemoryLedger::new();
        let cards = vec!["a".to_string(), "b".to_string()];
        let owned = resolve_owned(&cards, Some("u1"), &ledger).unwrap();
        assert_eq!(owned, cards);
    }

    #[test]
    fn test_resolve_owned_reads_ledger() {
        let ledger = MemoryLedger::new();
        ledger.add_ownership("u1", "grocer").unwrap();
        let owned = resolve_owned(&[], Some("u1"), &ledger).unwrap();
        assert_eq!(owned, vec!["grocer".to_string()]);
    }

    #[test]
    fn test_resolve_owned_requires_a_source() {
        let ledger = MemoryLedger::new();
        assert!(resolve_owned(&[], None, &ledger).is_err());
        assert!(resolve_owned(&[], Some("nobody"), &ledger).is_err());
    }

    #[test]
    fn test_record_and_own_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cli.db");

        cmd_own(&path, "u1", "grocer").unwrap();
        cmd_record(&path, "u1", "grocer", "Grocery", 42.0, None).unwrap();

        let db = open_db(&path).unwrap();
        assert_eq!(db.owned_card_ids("u1").unwrap(), vec!["grocer".to_string()]);
        let start = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2100, 1, 1).unwrap();
        assert_eq!(db.records_in_window("u1", "grocer", start, end).unwrap().len(), 1);
    }
}
