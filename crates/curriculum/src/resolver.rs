//! Entity Resolver (spec §4.7): raw string + coarse type → canonical id,
//! display name, category, and confidence, via static alias dictionaries.
//! No network calls, no fuzzy ML matching — exact alias, then syntactic
//! pattern, then partial containment, in that order.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Ticker,
    Crypto,
    Currency,
    CurrencyPair,
    Location,
    Timezone,
    Index,
    Commodity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStatus {
    Resolved,
    Ambiguous,
    NotFound,
    Unsupported,
    Invalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Time,
    Weather,
    Market,
    Crypto,
    Fx,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EntityMetadata {
    pub exchange: Option<String>,
    pub country: Option<String>,
    pub timezone_id: Option<String>,
    pub currency_code: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolvedEntity {
    pub raw: String,
    pub entity_type: EntityType,
    pub status: ResolutionStatus,
    pub canonical_id: Option<String>,
    pub display_name: Option<String>,
    pub category: Option<Category>,
    pub confidence: f32,
    pub metadata: EntityMetadata,
}

impl ResolvedEntity {
    fn not_found(raw: &str, entity_type: EntityType) -> Self {
        Self {
            raw: raw.to_string(),
            entity_type,
            status: ResolutionStatus::NotFound,
            canonical_id: None,
            display_name: None,
            category: None,
            confidence: 0.0,
            metadata: EntityMetadata::default(),
        }
    }

    fn invalid(raw: &str, entity_type: EntityType) -> Self {
        Self {
            status: ResolutionStatus::Invalid,
            ..Self::not_found(raw, entity_type)
        }
    }
}

struct Alias {
    canonical_id: &'static str,
    display_name: &'static str,
    aliases: &'static [&'static str],
    category: Category,
    metadata: fn() -> EntityMetadata,
}

fn no_meta() -> EntityMetadata {
    EntityMetadata::default()
}

const TICKERS: &[Alias] = &[
    Alias {
        canonical_id: "AAPL",
        display_name: "Apple Inc.",
        aliases: &["AAPL", "APPLE"],
        category: Category::Market,
        metadata: || EntityMetadata {
            exchange: Some("NASDAQ".to_string()),
            ..EntityMetadata::default()
        },
    },
    Alias {
        canonical_id: "MSFT",
        display_name: "Microsoft Corporation",
        aliases: &["MSFT", "MICROSOFT"],
        category: Category::Market,
        metadata: || EntityMetadata {
            exchange: Some("NASDAQ".to_string()),
            ..EntityMetadata::default()
        },
    },
    Alias {
        canonical_id: "GOOGL",
        display_name: "Alphabet Inc.",
        aliases: &["GOOGL", "GOOG", "GOOGLE", "ALPHABET"],
        category: Category::Market,
        metadata: || EntityMetadata {
            exchange: Some("NASDAQ".to_string()),
            ..EntityMetadata::default()
        },
    },
];

const CRYPTOS: &[Alias] = &[
    Alias {
        canonical_id: "BTC",
        display_name: "Bitcoin",
        aliases: &["BTC", "BITCOIN", "XBT"],
        category: Category::Crypto,
        metadata: no_meta,
    },
    Alias {
        canonical_id: "ETH",
        display_name: "Ethereum",
        aliases: &["ETH", "ETHEREUM", "ETHER"],
        category: Category::Crypto,
        metadata: no_meta,
    },
];

const CURRENCIES: &[Alias] = &[
    Alias {
        canonical_id: "USD",
        display_name: "United States Dollar",
        aliases: &["USD", "DOLLAR", "US DOLLAR", "USDOLLAR"],
        category: Category::Fx,
        metadata: || EntityMetadata {
            currency_code: Some("USD".to_string()),
            ..EntityMetadata::default()
        },
    },
    Alias {
        canonical_id: "EUR",
        display_name: "Euro",
        aliases: &["EUR", "EURO"],
        category: Category::Fx,
        metadata: || EntityMetadata {
            currency_code: Some("EUR".to_string()),
            ..EntityMetadata::default()
        },
    },
    Alias {
        canonical_id: "GBP",
        display_name: "British Pound",
        aliases: &["GBP", "POUND", "STERLING"],
        category: Category::Fx,
        metadata: || EntityMetadata {
            currency_code: Some("GBP".to_string()),
            ..EntityMetadata::default()
        },
    },
    Alias {
        canonical_id: "JPY",
        display_name: "Japanese Yen",
        aliases: &["JPY", "YEN"],
        category: Category::Fx,
        metadata: || EntityMetadata {
            currency_code: Some("JPY".to_string()),
            ..EntityMetadata::default()
        },
    },
];

const LOCATIONS: &[Alias] = &[
    Alias {
        canonical_id: "NYC",
        display_name: "New York City",
        aliases: &["NYC", "NEW YORK", "NEW YORK CITY"],
        category: Category::Weather,
        metadata: || EntityMetadata {
            country: Some("US".to_string()),
            timezone_id: Some("America/New_York".to_string()),
            ..EntityMetadata::default()
        },
    },
    Alias {
        canonical_id: "LON",
        display_name: "London",
        aliases: &["LON", "LONDON"],
        category: Category::Weather,
        metadata: || EntityMetadata {
            country: Some("GB".to_string()),
            timezone_id: Some("Europe/London".to_string()),
            ..EntityMetadata::default()
        },
    },
    Alias {
        canonical_id: "TYO",
        display_name: "Tokyo",
        aliases: &["TYO", "TOKYO"],
        category: Category::Weather,
        metadata: || EntityMetadata {
            country: Some("JP".to_string()),
            timezone_id: Some("Asia/Tokyo".to_string()),
            ..EntityMetadata::default()
        },
    },
];

const TIMEZONES: &[Alias] = &[
    Alias {
        canonical_id: "America/New_York",
        display_name: "America/New_York",
        aliases: &["AMERICA/NEW_YORK", "EASTERN", "ET", "EST", "EDT"],
        category: Category::Time,
        metadata: no_meta,
    },
    Alias {
        canonical_id: "Europe/London",
        display_name: "Europe/London",
        aliases: &["EUROPE/LONDON", "GMT", "BST"],
        category: Category::Time,
        metadata: no_meta,
    },
    Alias {
        canonical_id: "Asia/Tokyo",
        display_name: "Asia/Tokyo",
        aliases: &["ASIA/TOKYO", "JST"],
        category: Category::Time,
        metadata: no_meta,
    },
];

const INDICES: &[Alias] = &[
    Alias {
        canonical_id: "SPX",
        display_name: "S&P 500",
        aliases: &["SPX", "S&P500", "S&P 500", "SP500"],
        category: Category::Market,
        metadata: no_meta,
    },
    Alias {
        canonical_id: "DJI",
        display_name: "Dow Jones Industrial Average",
        aliases: &["DJI", "DOW", "DOW JONES"],
        category: Category::Market,
        metadata: no_meta,
    },
];

const COMMODITIES: &[Alias] = &[
    Alias {
        canonical_id: "XAU",
        display_name: "Gold",
        aliases: &["XAU", "GOLD"],
        category: Category::Market,
        metadata: no_meta,
    },
    Alias {
        canonical_id: "XAG",
        display_name: "Silver",
        aliases: &["XAG", "SILVER"],
        category: Category::Market,
        metadata: no_meta,
    },
    Alias {
        canonical_id: "WTI",
        display_name: "Crude Oil (WTI)",
        aliases: &["WTI", "CRUDE", "CRUDE OIL", "OIL"],
        category: Category::Market,
        metadata: no_meta,
    },
];

fn dictionary(entity_type: EntityType) -> &'static [Alias] {
    match entity_type {
        EntityType::Ticker => TICKERS,
        EntityType::Crypto => CRYPTOS,
        EntityType::Currency => CURRENCIES,
        EntityType::CurrencyPair => &[],
        EntityType::Location => LOCATIONS,
        EntityType::Timezone => TIMEZONES,
        EntityType::Index => INDICES,
        EntityType::Commodity => COMMODITIES,
    }
}

fn normalize(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Match order for non-pair types (spec §4.7): exact alias (0.95) → a
/// type-appropriate syntactic pattern (0.8-0.9) → partial containment
/// against an alias (0.7-0.9) → not_found.
fn resolve_simple(raw: &str, entity_type: EntityType) -> ResolvedEntity {
    let normalized = normalize(raw);
    if normalized.is_empty() {
        return ResolvedEntity::invalid(raw, entity_type);
    }

    let dict = dictionary(entity_type);

    if let Some(entry) = dict.iter().find(|e| e.aliases.contains(&normalized.as_str())) {
        return build(raw, entity_type, entry, ResolutionStatus::Resolved, 0.95);
    }

    if entity_type == EntityType::Ticker && is_ticker_pattern(&normalized) {
        // Syntactically plausible ticker with no dictionary hit: report it
        // back as the canonical id at reduced confidence rather than
        // failing outright — a real deployment's dictionary is much larger
        // than this crate's static seed.
        return ResolvedEntity {
            raw: raw.to_string(),
            entity_type,
            status: ResolutionStatus::Resolved,
            canonical_id: Some(normalized.clone()),
            display_name: Some(normalized),
            category: Some(Category::Market),
            confidence: 0.8,
            metadata: EntityMetadata::default(),
        };
    }

    if entity_type == EntityType::Timezone && normalized.contains('/') {
        return ResolvedEntity {
            raw: raw.to_string(),
            entity_type,
            status: ResolutionStatus::Resolved,
            canonical_id: Some(raw.trim().to_string()),
            display_name: Some(raw.trim().to_string()),
            category: Some(Category::Time),
            confidence: 0.85,
            metadata: EntityMetadata::default(),
        };
    }

    let partial: Vec<&Alias> = dict
        .iter()
        .filter(|e| e.aliases.iter().any(|a| a.contains(&normalized.as_str()) || normalized.contains(a)))
        .collect();
    match partial.len() {
        0 => ResolvedEntity::not_found(raw, entity_type),
        1 => build(raw, entity_type, partial[0], ResolutionStatus::Resolved, 0.75),
        _ => {
            let mut entity = ResolvedEntity::not_found(raw, entity_type);
            entity.status = ResolutionStatus::Ambiguous;
            entity.confidence = 0.6;
            entity
        }
    }
}

fn is_ticker_pattern(normalized: &str) -> bool {
    (1..=5).contains(&normalized.len()) && normalized.chars().all(|c| c.is_ascii_alphabetic())
}

fn build(raw: &str, entity_type: EntityType, entry: &Alias, status: ResolutionStatus, confidence: f32) -> ResolvedEntity {
    ResolvedEntity {
        raw: raw.to_string(),
        entity_type,
        status,
        canonical_id: Some(entry.canonical_id.to_string()),
        display_name: Some(entry.display_name.to_string()),
        category: Some(entry.category),
        confidence,
        metadata: (entry.metadata)(),
    }
}

/// Parses `XXX/YYY`, `XXX-YYY`, `XXXYYY`, `XXX to YYY`, and the named form
/// `euro to dollar` (spec §4.7 "Currency pairs").
fn resolve_currency_pair(raw: &str) -> ResolvedEntity {
    let normalized = normalize(raw);
    let (base_raw, quote_raw) = match split_pair(&normalized) {
        Some(pair) => pair,
        None => return ResolvedEntity::not_found(raw, EntityType::CurrencyPair),
    };

    let base = resolve_simple(&base_raw, EntityType::Currency);
    let quote = resolve_simple(&quote_raw, EntityType::Currency);

    match (base.status, quote.status) {
        (ResolutionStatus::Resolved, ResolutionStatus::Resolved) => {
            let base_id = base.canonical_id.unwrap();
            let quote_id = quote.canonical_id.unwrap();
            ResolvedEntity {
                raw: raw.to_string(),
                entity_type: EntityType::CurrencyPair,
                status: ResolutionStatus::Resolved,
                canonical_id: Some(format!("{base_id}/{quote_id}")),
                display_name: Some(format!("{base_id}/{quote_id}")),
                category: Some(Category::Fx),
                confidence: base.confidence.min(quote.confidence),
                metadata: EntityMetadata {
                    currency_code: Some(base_id),
                    ..EntityMetadata::default()
                },
            }
        }
        _ => ResolvedEntity::not_found(raw, EntityType::CurrencyPair),
    }
}

fn split_pair(normalized: &str) -> Option<(String, String)> {
    if let Some((a, b)) = normalized.split_once(" TO ") {
        return Some((a.trim().to_string(), b.trim().to_string()));
    }
    for sep in ['/', '-'] {
        if let Some((a, b)) = normalized.split_once(sep) {
            return Some((a.trim().to_string(), b.trim().to_string()));
        }
    }
    // Bare concatenation: XXXYYY, both legs exactly 3 chars.
    let letters: String = normalized.chars().filter(|c| c.is_ascii_alphabetic()).collect();
    if letters.len() == 6 {
        return Some((letters[..3].to_string(), letters[3..].to_string()));
    }
    None
}

/// Resolves `raw` tagged with `entity_type` (spec §4.7).
pub fn resolve_entity(raw: &str, entity_type: EntityType) -> ResolvedEntity {
    match entity_type {
        EntityType::CurrencyPair => resolve_currency_pair(raw),
        other => resolve_simple(raw, other),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolutionTrace {
    pub original_query: String,
    pub extraction_time_ms: u64,
    pub resolution_time_ms: u64,
    pub extracted_count: usize,
    pub resolved_count: usize,
    pub method: &'static str,
    pub resolver_version: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolveEntitiesResult {
    pub entities: Vec<ResolvedEntity>,
    pub resolved: Vec<ResolvedEntity>,
    pub failed: Vec<ResolvedEntity>,
    pub ambiguous: Vec<ResolvedEntity>,
    pub trace: ResolutionTrace,
}

/// Aggregates a batch of `(raw, type)` extractions into partitions plus a
/// trace (spec §4.7 "Aggregation"). Timings are supplied by the caller
/// since this crate has no wall-clock access of its own (workflow-style
/// determinism constraint carried over from the store/cache crates).
pub fn resolve_entities(
    original_query: &str,
    extracted: &[(String, EntityType)],
    extraction_time_ms: u64,
    resolution_time_ms: u64,
) -> ResolveEntitiesResult {
    let entities: Vec<ResolvedEntity> = extracted
        .iter()
        .map(|(raw, t)| resolve_entity(raw, *t))
        .collect();

    let resolved: Vec<ResolvedEntity> = entities
        .iter()
        .filter(|e| e.status == ResolutionStatus::Resolved)
        .cloned()
        .collect();
    let ambiguous: Vec<ResolvedEntity> = entities
        .iter()
        .filter(|e| e.status == ResolutionStatus::Ambiguous)
        .cloned()
        .collect();
    let failed: Vec<ResolvedEntity> = entities
        .iter()
        .filter(|e| {
            matches!(
                e.status,
                ResolutionStatus::NotFound | ResolutionStatus::Unsupported | ResolutionStatus::Invalid
            )
        })
        .cloned()
        .collect();

    ResolveEntitiesResult {
        trace: ResolutionTrace {
            original_query: original_query.to_string(),
            extraction_time_ms,
            resolution_time_ms,
            extracted_count: extracted.len(),
            resolved_count: resolved.len(),
            method: "static-dictionary",
            resolver_version: "1",
        },
        entities,
        resolved,
        ambiguous,
        failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_alias_resolves_with_high_confidence() {
        let r = resolve_entity("bitcoin", EntityType::Crypto);
        assert_eq!(r.status, ResolutionStatus::Resolved);
        assert_eq!(r.canonical_id.as_deref(), Some("BTC"));
        assert_eq!(r.confidence, 0.95);
    }

    #[test]
    fn currency_pair_slash_form() {
        let r = resolve_entity("EUR/USD", EntityType::CurrencyPair);
        assert_eq!(r.status, ResolutionStatus::Resolved);
        assert_eq!(r.canonical_id.as_deref(), Some("EUR/USD"));
    }

    #[test]
    fn currency_pair_named_form() {
        let r = resolve_entity("euro to dollar", EntityType::CurrencyPair);
        assert_eq!(r.canonical_id.as_deref(), Some("EUR/USD"));
    }

    #[test]
    fn currency_pair_concatenated_form() {
        let r = resolve_entity("EURUSD", EntityType::CurrencyPair);
        assert_eq!(r.canonical_id.as_deref(), Some("EUR/USD"));
    }

    #[test]
    fn unknown_ticker_still_resolves_syntactically() {
        let r = resolve_entity("ZZZZ", EntityType::Ticker);
        assert_eq!(r.status, ResolutionStatus::Resolved);
        assert_eq!(r.confidence, 0.8);
    }

    #[test]
    fn unresolvable_input_is_not_found() {
        let r = resolve_entity("###", EntityType::Location);
        assert_eq!(r.status, ResolutionStatus::NotFound);
    }

    #[test]
    fn resolution_is_idempotent() {
        let a = resolve_entity("New York", EntityType::Location);
        let b = resolve_entity("New York", EntityType::Location);
        assert_eq!(a.canonical_id, b.canonical_id);
        assert_eq!(a.confidence, b.confidence);
    }

    #[test]
    fn resolve_entities_partitions_results() {
        let extracted = vec![
            ("bitcoin".to_string(), EntityType::Crypto),
            ("###".to_string(), EntityType::Location),
        ];
        let result = resolve_entities("bitcoin and ###", &extracted, 1, 2);
        assert_eq!(result.resolved.len(), 1);
        assert_eq!(result.failed.len(), 1);
        assert_eq!(result.trace.extracted_count, 2);
    }
}
