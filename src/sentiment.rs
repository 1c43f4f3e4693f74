//! Lexicon sentiment and event extractor.
//! Category-based confidence scoring: a base score per category, adjusted
//! by bounded modifiers rather than a learned model.

use std::collections::HashSet;

use chrono::Utc;

use crate::models::{Article, Event, EventType, SentimentScore};

const NEGATION_WINDOW: usize = 3;

fn positive_lexicon() -> &'static [&'static str] {
    &[
        "beat", "beats", "surge", "surged", "rally", "record", "growth", "profit",
        "upgrade", "outperform", "strong", "bullish", "gain", "gains", "soar", "soared",
        "exceed", "exceeded", "breakthrough", "expansion",
    ]
}

fn negative_lexicon() -> &'static [&'static str] {
    &[
        "miss", "misses", "plunge", "plunged", "crash", "decline", "loss", "losses",
        "downgrade", "underperform", "weak", "bearish", "drop", "dropped", "slump",
        "fraud", "investigation", "lawsuit", "recall", "layoffs", "default",
    ]
}

fn negation_words() -> &'static [&'static str] {
    &["not", "no", "never", "without", "fails", "failed"]
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

/// Scans tokens for lexicon hits, flipping polarity for any hit inside
/// `NEGATION_WINDOW` tokens after a negation word.
pub fn score_article(article: &Article) -> SentimentScore {
    let tokens = tokenize(&format!("{} {}", article.title, article.body));
    let positive: HashSet<&str> = positive_lexicon().iter().copied().collect();
    let negative: HashSet<&str> = negative_lexicon().iter().copied().collect();
    let negations: HashSet<&str> = negation_words().iter().copied().collect();

    let mut negated_until = None;
    let mut pos_hits = Vec::new();
    let mut neg_hits = Vec::new();
    let mut pos_count: f64 = 0.0;
    let mut neg_count: f64 = 0.0;

    for (i, token) in tokens.iter().enumerate() {
        if negations.contains(token.as_str()) {
            negated_until = Some(i + NEGATION_WINDOW);
            continue;
        }
        let is_negated = negated_until.map(|end| i <= end).unwrap_or(false);

        if positive.contains(token.as_str()) {
            if is_negated {
                neg_count += 1.0;
                neg_hits.push(token.clone());
            } else {
                pos_count += 1.0;
                pos_hits.push(token.clone());
            }
        } else if negative.contains(token.as_str()) {
            if is_negated {
                pos_count += 1.0;
                pos_hits.push(token.clone());
            } else {
                neg_count += 1.0;
                neg_hits.push(token.clone());
            }
        }
    }

    let total_hits = pos_count + neg_count;
    let score = if total_hits > 0.0 {
        ((pos_count - neg_count) / total_hits).clamp(-1.0, 1.0)
    } else {
        0.0
    };
    // Confidence grows with the number of lexicon hits relative to the
    // article's length, capped so a single keyword in a short article never
    // reads as fully confident.
    let confidence = if total_hits > 0.0 {
        (total_hits / (total_hits + 3.0)).min(0.95)
    } else {
        0.0
    };

    SentimentScore {
        article_id: article.id.clone(),
        score,
        confidence,
        keywords_positive: pos_hits,
        keywords_negative: neg_hits,
        timestamp: Utc::now(),
    }
}

struct EventRule {
    event_type: EventType,
    keywords: &'static [&'static str],
    base_severity: f64,
}

fn event_rules() -> Vec<EventRule> {
    vec![
        EventRule {
            event_type: EventType::Earnings,
            keywords: &["earnings", "quarterly results", "eps", "revenue"],
            base_severity: 0.4,
        },
        EventRule {
            event_type: EventType::Merger,
            keywords: &["merger", "merge", "combine with"],
            base_severity: 0.6,
        },
        EventRule {
            event_type: EventType::Acquisition,
            keywords: &["acquire", "acquisition", "acquired", "buyout"],
            base_severity: 0.6,
        },
        EventRule {
            event_type: EventType::Bankruptcy,
            keywords: &["bankruptcy", "chapter 11", "insolvent", "insolvency"],
            base_severity: 0.95,
        },
        EventRule {
            event_type: EventType::Regulatory,
            keywords: &["sec probe", "investigation", "regulator", "fine", "lawsuit"],
            base_severity: 0.7,
        },
        EventRule {
            event_type: EventType::ProductLaunch,
            keywords: &["launch", "unveil", "announces new product", "release"],
            base_severity: 0.3,
        },
        EventRule {
            event_type: EventType::LeadershipChange,
            keywords: &["ceo steps down", "resigns", "appoints new ceo", "names new"],
            base_severity: 0.5,
        },
    ]
}

fn intensifier_multiplier(text: &str) -> f64 {
    let mut multiplier: f64 = 1.0;
    for word in ["massive", "unprecedented", "historic", "emergency"] {
        if text.contains(word) {
            multiplier += 0.15;
        }
    }
    for word in ["minor", "modest", "limited"] {
        if text.contains(word) {
            multiplier -= 0.1;
        }
    }
    multiplier.clamp(0.5, 1.5)
}

/// Detects zero or more events in an article by keyword matching.
/// `high_priority` is set when severity clears 0.8, matching the alert gate
/// elsewhere in the pipeline.
pub fn extract_events(article: &Article) -> Vec<Event> {
    let haystack = format!("{} {}", article.title, article.body).to_lowercase();
    let multiplier = intensifier_multiplier(&haystack);
    let mut events = Vec::new();

    for rule in event_rules() {
        let matched: Vec<String> = rule
            .keywords
            .iter()
            .filter(|kw| haystack.contains(*kw))
            .map(|kw| kw.to_string())
            .collect();
        if matched.is_empty() {
            continue;
        }
        let severity = (rule.base_severity * multiplier).clamp(0.0, 1.0);
        events.push(Event {
            id: uuid::Uuid::new_v4().to_string(),
            article_id: article.id.clone(),
            event_type: rule.event_type,
            severity,
            keywords: matched,
            timestamp: Utc::now(),
            high_priority: severity >= 0.8,
        });
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(title: &str, body: &str) -> Article {
        Article {
            id: "a1".into(),
            title: title.into(),
            body: body.into(),
            source: "wire".into(),
            published_at: Utc::now(),
            symbols: vec!["ACME".into()],
        }
    }

    #[test]
    fn positive_keywords_yield_positive_score() {
        let a = article("Company beats earnings, shares surge", "Strong growth and record profit reported");
        let s = score_article(&a);
        assert!(s.score > 0.0, "expected positive score, got {}", s.score);
        assert!(s.confidence > 0.0);
    }

    #[test]
    fn negative_keywords_yield_negative_score() {
        let a = article("Stock plunges on weak guidance", "Company reports loss and layoffs amid investigation");
        let s = score_article(&a);
        assert!(s.score < 0.0, "expected negative score, got {}", s.score);
    }

    #[test]
    fn negation_flips_polarity() {
        let a = article("Results were not strong", "no growth at all this quarter");
        let s = score_article(&a);
        assert!(s.score <= 0.0, "negated positives should not read positive, got {}", s.score);
    }

    #[test]
    fn neutral_article_scores_zero_with_zero_confidence() {
        let a = article("Quarterly update", "The company held its usual quarterly call today");
        let s = score_article(&a);
        assert_eq!(s.score, 0.0);
        assert_eq!(s.confidence, 0.0);
    }

    #[test]
    fn bankruptcy_keywords_detected_as_high_priority() {
        let a = article("Retailer files chapter 11", "The firm is insolvent after years of losses");
        let events = extract_events(&a);
        assert!(events.iter().any(|e| e.event_type == EventType::Bankruptcy && e.high_priority));
    }

    #[test]
    fn fraud_and_bankruptcy_article_yields_high_severity_high_priority_events() {
        // Mirrors the spec's S5 scenario: a fraud/bankruptcy article should
        // score negative and surface at least one high-severity,
        // high-priority event.
        let a = article(
            "Company faces fraud investigation amid bankruptcy filing",
            "Regulators opened a lawsuit after the firm filed for chapter 11 and is insolvent",
        );
        let score = score_article(&a);
        assert!(score.score < 0.0, "expected negative sentiment, got {}", score.score);

        let events = extract_events(&a);
        assert!(events.iter().any(|e| e.severity >= 0.7 && e.high_priority));
        assert!(events.iter().any(|e| e.event_type == EventType::Bankruptcy));
        assert!(events.iter().any(|e| e.event_type == EventType::Regulatory));
    }

    #[test]
    fn unrelated_article_yields_no_events() {
        let a = article("Weather report", "Sunny skies expected across the region this week");
        assert!(extract_events(&a).is_empty());
    }

    #[test]
    fn intensifier_raises_severity() {
        let mild = article("Regulatory probe opened", "A regulator opened an investigation today");
        let severe = article("Emergency regulatory probe opened", "A massive unprecedented investigation began today");
        let mild_severity = extract_events(&mild)[0].severity;
        let severe_severity = extract_events(&severe)[0].severity;
        assert!(severe_severity > mild_severity);
    }
}
