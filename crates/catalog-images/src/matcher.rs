/// Candidate matcher: scores (product, image) pairs and picks the best image.
///
/// The exact-name, category, and word-overlap strategies each give a base
/// score and the best of them is kept. Keyword-group and brand-word scores
/// are bonuses added on top, and the total is capped at 100. The strategy
/// list, weights, keyword groups,
/// and brand words are all data in `MatcherConfig`, so tuning never touches
/// code.
use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::model::{Confidence, ImageRecord, MatchResult, Product, Strategy};
use crate::normalize::{file_stem, normalize_words, significant_words};

const MAX_SCORE: u32 = 100;

/// A labelled set of keywords. The group applies when the product name
/// contains `label`; each keyword found in a candidate adds to its score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordGroup {
    pub label: String,
    pub keywords: Vec<String>,
}

impl KeywordGroup {
    fn new(label: &str, keywords: &[&str]) -> Self {
        Self {
            label: label.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Strategies to attempt, in order. Order only matters for reporting
    /// which strategy won when two produce the same score.
    pub strategies: Vec<Strategy>,
    pub exact: u32,
    pub category: u32,
    /// Score when every significant word matches; scaled down by the matched fraction.
    pub word_overlap_max: u32,
    /// Words of this length or shorter are ignored by the overlap strategy.
    pub min_word_len: usize,
    pub keyword_base: u32,
    pub keyword_step: u32,
    pub brand_bonus: u32,
    /// Minimum score for a match to be accepted.
    pub threshold: u32,
    pub high_confidence: u32,
    pub medium_confidence: u32,
    pub keyword_groups: Vec<KeywordGroup>,
    pub brand_words: Vec<String>,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            strategies: vec![
                Strategy::ExactName,
                Strategy::Category,
                Strategy::WordOverlap,
                Strategy::KeywordGroup,
                Strategy::BrandWord,
            ],
            exact: 100,
            category: 80,
            word_overlap_max: 70,
            min_word_len: 2,
            keyword_base: 60,
            keyword_step: 10,
            brand_bonus: 50,
            threshold: 40,
            high_confidence: 80,
            medium_confidence: 60,
            keyword_groups: vec![
                KeywordGroup::new("gift card", &["gift", "card"]),
                KeywordGroup::new("vinegar", &["vinegar", "viniger", "cider"]),
                KeywordGroup::new("hot sauce", &["hot", "sauce", "pepper"]),
                KeywordGroup::new("pepper sauce", &["pepper", "sauce", "scotch", "bonnet"]),
                KeywordGroup::new("jerk", &["jerk", "seasoning", "marinade"]),
                KeywordGroup::new("plantain", &["plantain", "chips"]),
                KeywordGroup::new("palm oil", &["palm", "oil"]),
                KeywordGroup::new("coconut", &["coconut", "milk", "cream"]),
                KeywordGroup::new("curry", &["curry", "powder"]),
                KeywordGroup::new("fufu", &["fufu", "flour", "yam"]),
                KeywordGroup::new("rice", &["rice", "basmati", "jasmine"]),
                KeywordGroup::new("ackee", &["ackee", "saltfish"]),
                KeywordGroup::new("tea", &["tea", "bush"]),
            ],
            brand_words: ["organic", "premium", "natural", "fresh", "pure", "artisan"]
                .iter()
                .map(|w| w.to_string())
                .collect(),
        }
    }
}

/// The score of one candidate and the strategy that contributed most to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score {
    pub value: u32,
    pub strategy: Option<Strategy>,
}

/// Result of matching one product against a candidate list.
#[derive(Debug, Clone, Copy)]
pub struct MatchOutcome<'a> {
    /// The winning candidate, present only when `score` reached the threshold.
    pub candidate: Option<&'a ImageRecord>,
    /// Best score seen, even when rejected.
    pub score: u32,
    pub confidence: Confidence,
    pub strategy: Option<Strategy>,
}

/// Product-side terms, normalized once per match call.
struct ProductTerms {
    name: String,
    category: String,
    words: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Matcher {
    config: MatcherConfig,
}

impl Matcher {
    pub fn new(config: MatcherConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    pub fn confidence(&self, score: u32) -> Confidence {
        if score >= self.config.high_confidence {
            Confidence::High
        } else if score >= self.config.medium_confidence {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }

    /// Score a single candidate for a product name and optional category.
    pub fn score(&self, name: &str, category: Option<&str>, candidate: &ImageRecord) -> Score {
        let terms = self.product_terms(name, category);
        self.score_terms(&terms, candidate)
    }

    /// Best candidate using the configured threshold.
    pub fn best_match<'a>(
        &self,
        name: &str,
        category: Option<&str>,
        candidates: &'a [ImageRecord],
    ) -> MatchOutcome<'a> {
        self.best_match_with_threshold(name, category, candidates, self.config.threshold)
    }

    /// Best candidate with an explicit acceptance threshold.
    ///
    /// Equal scores go to the candidate with the smallest path, so the result
    /// does not depend on scan order.
    pub fn best_match_with_threshold<'a>(
        &self,
        name: &str,
        category: Option<&str>,
        candidates: &'a [ImageRecord],
        threshold: u32,
    ) -> MatchOutcome<'a> {
        let terms = self.product_terms(name, category);

        let mut best: Option<(&ImageRecord, Score)> = None;
        for candidate in candidates {
            let score = self.score_terms(&terms, candidate);
            if score.value == 0 {
                continue;
            }
            let better = match &best {
                None => true,
                Some((current, current_score)) => {
                    score.value > current_score.value
                        || (score.value == current_score.value && candidate.path < current.path)
                }
            };
            if better {
                best = Some((candidate, score));
            }
        }

        match best {
            Some((candidate, score)) => MatchOutcome {
                candidate: (score.value >= threshold).then_some(candidate),
                score: score.value,
                confidence: self.confidence(score.value),
                strategy: score.strategy,
            },
            None => MatchOutcome {
                candidate: None,
                score: 0,
                confidence: Confidence::Low,
                strategy: None,
            },
        }
    }

    /// Match a catalog product, returning a result only when accepted.
    pub fn match_product(&self, product: &Product, candidates: &[ImageRecord]) -> Option<MatchResult> {
        let outcome = self.best_match(&product.name, product.category.as_deref(), candidates);
        let candidate = outcome.candidate?;
        Some(MatchResult {
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            candidate: candidate.clone(),
            score: outcome.score,
            confidence: outcome.confidence,
            strategy: outcome.strategy.unwrap_or(Strategy::WordOverlap),
        })
    }

    fn product_terms(&self, name: &str, category: Option<&str>) -> ProductTerms {
        ProductTerms {
            name: normalize_words(name),
            category: category.map(normalize_words).unwrap_or_default(),
            words: significant_words(name, self.config.min_word_len),
        }
    }

    fn score_terms(&self, terms: &ProductTerms, candidate: &ImageRecord) -> Score {
        let stem: Cow<'_, str> = if candidate.stem.is_empty() {
            Cow::Owned(normalize_words(file_stem(&candidate.filename)))
        } else {
            Cow::Borrowed(candidate.stem.as_str())
        };
        let candidate_category = normalize_words(&candidate.category);

        let mut base = 0u32;
        let mut bonus = 0u32;
        let mut lead: Option<(Strategy, u32)> = None;
        for &strategy in &self.config.strategies {
            let value = match strategy {
                Strategy::ExactName => self.exact_name(terms, &stem),
                Strategy::Category => self.category(terms, &candidate_category),
                Strategy::WordOverlap => self.word_overlap(terms, &stem, &candidate_category),
                Strategy::KeywordGroup => self.keyword_group(terms, &stem, &candidate_category),
                Strategy::BrandWord => self.brand_word(terms, &stem, &candidate_category),
            };
            if strategy.is_bonus() {
                bonus = bonus.saturating_add(value);
            } else {
                base = base.max(value);
            }
            if value > lead.map_or(0, |(_, v)| v) {
                lead = Some((strategy, value));
            }
        }
        Score {
            value: base.saturating_add(bonus).min(MAX_SCORE),
            strategy: lead.map(|(s, _)| s),
        }
    }

    fn exact_name(&self, terms: &ProductTerms, stem: &str) -> u32 {
        if !terms.name.is_empty() && terms.name == stem {
            self.config.exact
        } else {
            0
        }
    }

    fn category(&self, terms: &ProductTerms, candidate_category: &str) -> u32 {
        let product = terms.category.as_str();
        if product.is_empty() || candidate_category.is_empty() {
            return 0;
        }
        if product.contains(candidate_category) || candidate_category.contains(product) {
            self.config.category
        } else {
            0
        }
    }

    fn word_overlap(&self, terms: &ProductTerms, stem: &str, candidate_category: &str) -> u32 {
        if terms.words.is_empty() {
            return 0;
        }
        let matched = terms
            .words
            .iter()
            .filter(|w| stem.contains(w.as_str()) || candidate_category.contains(w.as_str()))
            .count();
        self.config.word_overlap_max.saturating_mul(matched as u32) / terms.words.len() as u32
    }

    fn keyword_group(&self, terms: &ProductTerms, stem: &str, candidate_category: &str) -> u32 {
        self.config
            .keyword_groups
            .iter()
            .filter(|g| {
                let label = normalize_words(&g.label);
                !label.is_empty() && terms.name.contains(label.as_str())
            })
            .map(|g| {
                g.keywords
                    .iter()
                    .map(|k| normalize_words(k))
                    .filter(|k| !k.is_empty() && (stem.contains(k.as_str()) || candidate_category.contains(k.as_str())))
                    .count() as u32
            })
            .filter(|&hits| hits > 0)
            .map(|hits| {
                self.config
                    .keyword_base
                    .saturating_add(self.config.keyword_step.saturating_mul(hits))
            })
            .max()
            .unwrap_or(0)
    }

    fn brand_word(&self, terms: &ProductTerms, stem: &str, candidate_category: &str) -> u32 {
        let shared = self.config.brand_words.iter().any(|w| {
            let w = normalize_words(w);
            contains_phrase(&terms.name, &w)
                && (contains_phrase(stem, &w) || contains_phrase(candidate_category, &w))
        });
        if shared {
            self.config.brand_bonus
        } else {
            0
        }
    }
}

/// Whole-word containment on normalized, space-separated text.
fn contains_phrase(haystack: &str, phrase: &str) -> bool {
    if phrase.is_empty() || haystack.is_empty() {
        return false;
    }
    format!(" {haystack} ").contains(&format!(" {phrase} "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(path: &str, category: &str) -> ImageRecord {
        let filename = path.rsplit('/').next().unwrap().to_string();
        ImageRecord::new(path.to_string(), filename, category.to_string())
    }

    #[test]
    fn test_premium_vinegar_matches_cider_vinegar() {
        let candidates = vec![
            record("/sitephoto/Rice/jasmine-rice.png", "Rice"),
            record(
                "/sitephoto/Apple Cider Viniger/North_Coast_Organic_Apple_Cider_Vinegar.png",
                "Apple Cider Viniger",
            ),
            record("/sitephoto/Gift Cards/gift-card-50.png", "Gift Cards"),
        ];
        let matcher = Matcher::default();
        let outcome = matcher.best_match("Premium Vinegar", None, &candidates);

        let matched = outcome.candidate.expect("vinegar should match");
        assert_eq!(matched.filename, "North_Coast_Organic_Apple_Cider_Vinegar.png");
        assert!(outcome.score >= 40, "score {}", outcome.score);
        assert_eq!(outcome.strategy, Some(Strategy::KeywordGroup));
    }

    #[test]
    fn test_exact_name_scores_100() {
        let matcher = Matcher::default();
        let candidate = record("/images/products/Grace-Coconut-Milk.jpg", "products");
        let score = matcher.score("Grace Coconut Milk", None, &candidate);
        assert_eq!(score.value, 100);
        assert_eq!(score.strategy, Some(Strategy::ExactName));
    }

    #[test]
    fn test_category_containment() {
        let matcher = Matcher::default();
        let candidate = record("/sitephoto/Hair Care/img001.jpg", "Hair Care");
        let score = matcher.score("Shea Butter Conditioner", Some("Hair Care & Beauty"), &candidate);
        assert_eq!(score.value, 80);
        assert_eq!(score.strategy, Some(Strategy::Category));
    }

    #[test]
    fn test_word_overlap_scales_with_fraction() {
        let matcher = Matcher::default();
        let candidate = record("/sitephoto/misc/maggi-cubes.png", "misc");
        // "maggi" matches, "chicken" does not.
        let score = matcher.score("Maggi Chicken", None, &candidate);
        assert_eq!(score.value, 35);
        assert_eq!(score.strategy, Some(Strategy::WordOverlap));
    }

    #[test]
    fn test_brand_word_requires_shared_adjective() {
        let matcher = Matcher::default();
        let organic = record("/sitephoto/misc/organic-stuff.png", "misc");
        let premium = record("/sitephoto/misc/premium-stuff.png", "misc");
        // 35 for "organic" overlapping, plus the 50 brand bonus
        assert_eq!(matcher.score("Organic Honey", None, &organic).value, 85);
        assert_eq!(matcher.score("Organic Honey", None, &premium).value, 0);
    }

    #[test]
    fn test_below_threshold_is_rejected() {
        let candidates = vec![record("/sitephoto/Rice/jasmine-rice.png", "Rice")];
        let matcher = Matcher::default();
        let outcome = matcher.best_match("Gift Card", None, &candidates);
        assert!(outcome.candidate.is_none());
        assert_eq!(outcome.score, 0);

        let weak = vec![record("/sitephoto/misc/maggi-cubes.png", "misc")];
        let outcome = matcher.best_match("Maggi Chicken", None, &weak);
        assert!(outcome.candidate.is_none());
        assert_eq!(outcome.score, 35);
        let outcome = matcher.best_match_with_threshold("Maggi Chicken", None, &weak, 30);
        assert!(outcome.candidate.is_some());
    }

    #[test]
    fn test_ties_resolve_alphabetically_by_path() {
        let a = record("/sitephoto/a/ackee.png", "a");
        let b = record("/sitephoto/b/ackee.png", "b");
        let matcher = Matcher::default();

        let forward = vec![a.clone(), b.clone()];
        let backward = vec![b, a];
        let first = matcher.best_match("Ackee", None, &forward).candidate.unwrap();
        let second = matcher.best_match("Ackee", None, &backward).candidate.unwrap();
        assert_eq!(first.path, "/sitephoto/a/ackee.png");
        assert_eq!(second.path, "/sitephoto/a/ackee.png");
    }

    #[test]
    fn test_keyword_hit_never_lowers_score() {
        let matcher = Matcher::default();
        let names = ["Jerk Seasoning Hot", "Palm Oil", "Basmati Rice", "Fresh Fufu Flour"];
        let pairs = [
            ("/p/x/plain.png", "/p/x/plain-jerk.png"),
            ("/p/x/bottle.png", "/p/x/bottle-palm.png"),
            ("/p/x/bag.png", "/p/x/bag-basmati.png"),
            ("/p/x/pack.png", "/p/x/pack-yam.png"),
        ];
        for name in names {
            for (without, with) in pairs {
                let base = matcher.score(name, None, &record(without, "x")).value;
                let more = matcher.score(name, None, &record(with, "x")).value;
                assert!(more >= base, "{name}: {with} scored {more} < {base}");
            }
        }
    }

    #[test]
    fn test_keyword_hit_keeps_exact_name_score() {
        let matcher = Matcher::default();
        for (name, without, with) in [
            ("Jerk", "/p/x/jerk.png", "/p/x/jerk-seasoning.png"),
            ("Curry", "/p/x/curry.png", "/p/x/curry-powder.png"),
            ("Plantain", "/p/x/plantain.png", "/p/x/plantain-chips.png"),
        ] {
            let base = matcher.score(name, None, &record(without, "x")).value;
            let more = matcher.score(name, None, &record(with, "x")).value;
            assert_eq!(base, 100);
            assert!(more >= base, "{name}: {with} scored {more} < {base}");
        }
    }

    #[test]
    fn test_keyword_group_label_matches_inside_longer_names() {
        let matcher = Matcher::new(MatcherConfig {
            strategies: vec![Strategy::KeywordGroup],
            ..MatcherConfig::default()
        });
        let candidate = record("/sitephoto/misc/card-gift.png", "misc");
        let score = matcher.score("Gift Cards 50", None, &candidate);
        assert_eq!(score.value, 80);
        assert_eq!(score.strategy, Some(Strategy::KeywordGroup));
    }

    #[test]
    fn test_large_weights_saturate_at_max_score() {
        let matcher = Matcher::new(MatcherConfig {
            word_overlap_max: u32::MAX,
            keyword_base: u32::MAX,
            keyword_step: u32::MAX,
            brand_bonus: u32::MAX,
            ..MatcherConfig::default()
        });
        let candidate = record("/sitephoto/Rice/organic-basmati-rice.png", "Rice");
        let score = matcher.score("Organic Jasmine Rice", None, &candidate);
        assert_eq!(score.value, 100);
    }

    #[test]
    fn test_strategies_are_configurable() {
        let config = MatcherConfig {
            strategies: vec![Strategy::WordOverlap],
            ..MatcherConfig::default()
        };
        let matcher = Matcher::new(config);
        let candidate = record("/images/products/Grace-Coconut-Milk.jpg", "products");
        let score = matcher.score("Grace Coconut Milk", None, &candidate);
        assert_eq!(score.value, 70);
        assert_eq!(score.strategy, Some(Strategy::WordOverlap));
    }

    #[test]
    fn test_match_product_and_confidence() {
        let matcher = Matcher::default();
        let product: Product = serde_json::from_value(serde_json::json!({
            "id": "p-1",
            "name": "Grace Coconut Milk",
            "category": "Canned Goods"
        }))
        .unwrap();
        let candidates = vec![record("/images/products/grace_coconut_milk.webp", "products")];
        let result = matcher.match_product(&product, &candidates).unwrap();
        assert_eq!(result.product_id, "p-1");
        assert_eq!(result.score, 100);
        assert_eq!(result.confidence, Confidence::High);

        assert_eq!(matcher.confidence(65), Confidence::Medium);
        assert_eq!(matcher.confidence(40), Confidence::Low);
    }
}
