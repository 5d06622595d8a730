//! Core domain model, duration codec, classifier, and balance math for vbal.

use serde::{Deserialize, Serialize};

pub const CRATE_NAME: &str = "vbal-core";

/// Content categories. Declaration order is normative: score ties and
/// lowest-category ties always resolve to the earliest declared variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Knowledge,
    Entertainment,
    Lifestyle,
    ArtsMusic,
    SelfImprovement,
    SocialCreator,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Knowledge,
        Category::Entertainment,
        Category::Lifestyle,
        Category::ArtsMusic,
        Category::SelfImprovement,
        Category::SocialCreator,
    ];

    /// Stable storage key, also the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Knowledge => "Knowledge",
            Category::Entertainment => "Entertainment",
            Category::Lifestyle => "Lifestyle",
            Category::ArtsMusic => "ArtsMusic",
            Category::SelfImprovement => "SelfImprovement",
            Category::SocialCreator => "SocialCreator",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Category::Knowledge => "Knowledge",
            Category::Entertainment => "Entertainment",
            Category::Lifestyle => "Lifestyle",
            Category::ArtsMusic => "Arts & Music",
            Category::SelfImprovement => "Self-Improvement",
            Category::SocialCreator => "Social / Creator",
        }
    }

    /// Unknown or malformed category strings fall back to `Entertainment`.
    pub fn from_str_or_default(value: &str) -> Category {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == value)
            .unwrap_or(Category::Entertainment)
    }
}

/// A classified media unit. Persisted rows and ephemeral recommendations
/// share this shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Video {
    pub video_id: String,
    pub title: String,
    pub channel_title: String,
    pub thumbnail_url: Option<String>,
    pub duration_seconds: Option<i32>,
    pub published_at_ms: Option<i64>,
    pub category: Category,
}

/// A timestamped record that a video was watched. Never mutated; re-syncs
/// append new events rather than merging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchEvent {
    pub video_id: String,
    pub watched_at_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub category: Category,
    pub raw_seconds: i64,
    /// Percentage of the maximum category total in the window, [0, 100].
    pub normalized_score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceReport {
    /// One entry per category, declaration order, zero buckets included.
    pub scores: Vec<CategoryScore>,
    pub lowest_category: Category,
    pub window_days: u32,
}

// ---------------------------------------------------------------------------
// Duration codec
// ---------------------------------------------------------------------------

/// Parses an ISO 8601 duration token (e.g. `PT1H2M10S`) to whole seconds.
/// Empty, unmarked, or otherwise malformed input yields 0.
pub fn parse_iso8601_duration(duration: &str) -> i32 {
    let Some(body) = duration.strip_prefix("PT") else {
        return 0;
    };

    let mut seconds: i32 = 0;
    let mut number = String::new();
    for ch in body.chars() {
        match ch {
            '0'..='9' => number.push(ch),
            'H' => {
                seconds += number.parse::<i32>().unwrap_or(0) * 3600;
                number.clear();
            }
            'M' => {
                seconds += number.parse::<i32>().unwrap_or(0) * 60;
                number.clear();
            }
            'S' => {
                seconds += number.parse::<i32>().unwrap_or(0);
                number.clear();
            }
            _ => number.clear(),
        }
    }
    seconds
}

/// Formats seconds as `H:MM:SS` above an hour, `M:SS` below.
pub fn format_duration(seconds: i32) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

/// Channel whitelist. Ordered slice so first-match semantics are explicit;
/// a whitelist hit bypasses keyword scoring entirely.
const CHANNEL_CATEGORY_TABLE: &[(&str, Category)] = &[
    ("Kurzgesagt", Category::Knowledge),
    ("Veritasium", Category::Knowledge),
    ("Vsauce", Category::Knowledge),
    ("TED", Category::Knowledge),
    ("TED-Ed", Category::Knowledge),
    ("CrashCourse", Category::Knowledge),
    ("National Geographic", Category::Knowledge),
    ("History Channel", Category::Knowledge),
    ("BBC", Category::Knowledge),
    ("Khan Academy", Category::Knowledge),
    ("Netflix", Category::Entertainment),
    ("Comedy Central", Category::Entertainment),
    ("SNL", Category::Entertainment),
    ("The Tonight Show", Category::Entertainment),
    ("CollegeHumor", Category::Entertainment),
    ("Bon App\u{e9}tit", Category::Lifestyle),
    ("Tasty", Category::Lifestyle),
    ("Tastemade", Category::Lifestyle),
    ("Refinery29", Category::Lifestyle),
    ("Vogue", Category::Lifestyle),
    ("NPR Music", Category::ArtsMusic),
    ("VEVO", Category::ArtsMusic),
    ("MTV", Category::ArtsMusic),
    ("The Museum of Modern Art", Category::ArtsMusic),
    ("Improvement Pill", Category::SelfImprovement),
    ("Matt D'Avella", Category::SelfImprovement),
    ("Thomas Frank", Category::SelfImprovement),
    ("Ali Abdaal", Category::SelfImprovement),
    ("MrBeast", Category::SocialCreator),
    ("PewDiePie", Category::SocialCreator),
    ("Casey Neistat", Category::SocialCreator),
];

/// Title keywords per category. Each keyword counts at most once per title.
const KEYWORD_CATEGORY_TABLE: &[(Category, &[&str])] = &[
    (
        Category::Knowledge,
        &[
            "science", "history", "documentary", "lecture", "explained", "education",
            "tutorial", "learn", "how it works", "research", "study", "theory",
            "physics", "chemistry", "biology", "mathematics", "astronomy", "space",
            "ted talk", "professor", "university", "academic",
        ],
    ),
    (
        Category::Entertainment,
        &[
            "funny", "comedy", "laugh", "hilarious", "meme", "prank", "challenge",
            "reaction", "gaming", "game", "play", "let's play", "walkthrough",
            "movie", "trailer", "review", "episode", "series", "show", "tv",
        ],
    ),
    (
        Category::Lifestyle,
        &[
            "cooking", "recipe", "food", "travel", "vlog", "daily", "routine",
            "fashion", "style", "outfit", "makeup", "skincare", "beauty",
            "home", "diy", "craft", "design", "interior", "garden", "pet",
            "fitness", "workout", "exercise", "yoga", "health", "nutrition",
        ],
    ),
    (
        Category::ArtsMusic,
        &[
            "music", "song", "album", "concert", "live", "performance", "cover",
            "art", "painting", "drawing", "artist", "gallery", "museum",
            "dance", "ballet", "choreography", "opera", "theater", "film",
            "photography", "sculpture", "exhibition",
        ],
    ),
    (
        Category::SelfImprovement,
        &[
            "productivity", "motivation", "self help", "personal development",
            "habits", "goals", "success", "mindfulness", "meditation", "focus",
            "discipline", "book review", "learning", "skills", "career",
            "business", "entrepreneurship", "leadership", "growth mindset",
        ],
    ),
    (
        Category::SocialCreator,
        &[
            "vlog", "day in the life", "behind the scenes", "q&a", "qa",
            "storytime", "update", "announcement", "community", "fan",
            "meetup", "collab", "collaboration", "podcast", "interview",
            "personal", "my story", "life update", "chat", "talk",
        ],
    ),
];

/// Classifies a video from its title and channel name.
///
/// Channel whitelist first (case-insensitive substring, first table entry
/// wins), then keyword scoring over the lowercased title. The strictly
/// highest keyword sum wins; ties and all-zero scores fall back to the
/// earliest entry in table order, which for the all-zero case means
/// `Entertainment`.
pub fn classify(title: &str, channel_title: &str) -> Category {
    let channel_lower = channel_title.to_lowercase();
    for (channel, category) in CHANNEL_CATEGORY_TABLE {
        if channel_lower.contains(&channel.to_lowercase()) {
            return *category;
        }
    }

    let title_lower = title.to_lowercase();
    let mut best: Option<(Category, usize)> = None;
    for (category, keywords) in KEYWORD_CATEGORY_TABLE {
        let score = keywords
            .iter()
            .filter(|keyword| title_lower.contains(**keyword))
            .count();
        if score > 0 && best.map_or(true, |(_, s)| score > s) {
            best = Some((*category, score));
        }
    }

    best.map_or(Category::Entertainment, |(category, _)| category)
}

/// Fixed search phrases used to source recommendations for a category.
/// Order matters: the ranker consumes only the leading entries.
pub fn search_keywords(category: Category) -> &'static [&'static str] {
    match category {
        Category::Knowledge => &[
            "science explained",
            "educational documentary",
            "ted talk",
            "how it works",
            "history explained",
        ],
        Category::Entertainment => &[
            "funny videos",
            "comedy sketches",
            "entertainment",
            "best moments",
            "highlights",
        ],
        Category::Lifestyle => &[
            "lifestyle tips",
            "cooking tutorial",
            "travel guide",
            "home improvement",
            "daily routine",
        ],
        Category::ArtsMusic => &[
            "music performance",
            "art tutorial",
            "museum tour",
            "classical music",
            "artistic inspiration",
        ],
        Category::SelfImprovement => &[
            "productivity tips",
            "personal development",
            "success habits",
            "motivation",
            "skill building",
        ],
        Category::SocialCreator => &[
            "vlog",
            "day in the life",
            "behind the scenes",
            "creator interview",
            "podcast",
        ],
    }
}

// ---------------------------------------------------------------------------
// Balance math
// ---------------------------------------------------------------------------

/// Builds a balance report from `(category, watched seconds)` rows, one row
/// per watch event in the window. All six buckets are reported even when
/// empty. The divisor is floored at 1 so an all-zero window normalizes every
/// score to 0 instead of dividing by zero.
pub fn balance_report(window_days: u32, rows: &[(Category, i64)]) -> BalanceReport {
    let mut buckets = [0i64; Category::ALL.len()];
    for &(category, seconds) in rows {
        let idx = Category::ALL
            .iter()
            .position(|c| *c == category)
            .unwrap_or(1);
        buckets[idx] += seconds.max(0);
    }

    let max_duration = buckets.iter().copied().max().unwrap_or(0).max(1);
    let scores: Vec<CategoryScore> = Category::ALL
        .iter()
        .zip(buckets.iter())
        .map(|(category, raw)| CategoryScore {
            category: *category,
            raw_seconds: *raw,
            normalized_score: (*raw as f32 / max_duration as f32) * 100.0,
        })
        .collect();

    // min_by on equal keys keeps the first occurrence, which is exactly the
    // declaration-order tie-break the report promises.
    let lowest_category = scores
        .iter()
        .min_by(|a, b| {
            a.normalized_score
                .partial_cmp(&b.normalized_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|s| s.category)
        .unwrap_or(Category::Knowledge);

    BalanceReport {
        scores,
        lowest_category,
        window_days,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_parse_handles_full_and_partial_tokens() {
        assert_eq!(parse_iso8601_duration("PT1H2M10S"), 3730);
        assert_eq!(parse_iso8601_duration("PT15M33S"), 933);
        assert_eq!(parse_iso8601_duration("PT45S"), 45);
        assert_eq!(parse_iso8601_duration("PT2H"), 7200);
    }

    #[test]
    fn duration_parse_rejects_garbage_as_zero() {
        assert_eq!(parse_iso8601_duration(""), 0);
        assert_eq!(parse_iso8601_duration("garbage"), 0);
        assert_eq!(parse_iso8601_duration("1H2M"), 0);
        assert_eq!(parse_iso8601_duration("PT"), 0);
    }

    #[test]
    fn duration_round_trips_synthetic_components() {
        for h in 0..=9 {
            for m in [0, 1, 30, 59] {
                for s in [0, 1, 30, 59] {
                    let token = format!("PT{h}H{m}M{s}S");
                    assert_eq!(
                        parse_iso8601_duration(&token),
                        h * 3600 + m * 60 + s,
                        "token {token}"
                    );
                }
            }
        }
    }

    #[test]
    fn duration_formats_with_zero_padding() {
        assert_eq!(format_duration(0), "0:00");
        assert_eq!(format_duration(59), "0:59");
        assert_eq!(format_duration(60), "1:00");
        assert_eq!(format_duration(3661), "1:01:01");
    }

    #[test]
    fn channel_whitelist_wins_over_title_keywords() {
        // "gameplay" would score Entertainment, but the channel is whitelisted.
        assert_eq!(
            classify("random gameplay clip", "Kurzgesagt channel"),
            Category::Knowledge
        );
        assert_eq!(classify("anything at all", "MrBeast"), Category::SocialCreator);
    }

    #[test]
    fn keyword_tie_resolves_to_first_declared_category() {
        // Knowledge hits: "science", "explained". Entertainment hits:
        // "funny", "prank". Equal sums, Knowledge is declared first.
        assert_eq!(
            classify("funny science prank explained", "Unknown Channel"),
            Category::Knowledge
        );
    }

    #[test]
    fn strictly_higher_keyword_sum_wins() {
        assert_eq!(
            classify("cooking recipe for daily fitness routine", "Somebody"),
            Category::Lifestyle
        );
    }

    #[test]
    fn unmatched_title_defaults_to_entertainment() {
        assert_eq!(classify("asdkjasd", "Nobody"), Category::Entertainment);
    }

    #[test]
    fn category_parsing_falls_back_to_entertainment() {
        assert_eq!(Category::from_str_or_default("Knowledge"), Category::Knowledge);
        assert_eq!(Category::from_str_or_default("ArtsMusic"), Category::ArtsMusic);
        assert_eq!(
            Category::from_str_or_default("NoSuchCategory"),
            Category::Entertainment
        );
        assert_eq!(Category::from_str_or_default(""), Category::Entertainment);
    }

    #[test]
    fn category_serde_uses_stable_keys() {
        let json = serde_json::to_string(&Category::SelfImprovement).unwrap();
        assert_eq!(json, "\"SelfImprovement\"");
        let parsed: Category = serde_json::from_str("\"SocialCreator\"").unwrap();
        assert_eq!(parsed, Category::SocialCreator);
    }

    #[test]
    fn search_keywords_are_fixed_and_ordered() {
        let keywords = search_keywords(Category::Knowledge);
        assert_eq!(keywords.len(), 5);
        assert_eq!(keywords[0], "science explained");
        assert_eq!(keywords[1], "educational documentary");
    }

    #[test]
    fn balance_normalizes_against_the_largest_bucket() {
        let rows = vec![
            (Category::Knowledge, 100),
            (Category::Entertainment, 200),
            (Category::Lifestyle, 300),
            (Category::ArtsMusic, 300),
        ];
        let report = balance_report(7, &rows);
        assert_eq!(report.window_days, 7);
        assert_eq!(report.scores.len(), 6);

        let by_category = |c: Category| {
            report
                .scores
                .iter()
                .find(|s| s.category == c)
                .expect("all categories present")
                .clone()
        };
        assert_eq!(by_category(Category::Lifestyle).normalized_score, 100.0);
        assert_eq!(by_category(Category::ArtsMusic).normalized_score, 100.0);
        assert_eq!(by_category(Category::SelfImprovement).normalized_score, 0.0);
        assert_eq!(by_category(Category::SocialCreator).raw_seconds, 0);

        // SelfImprovement and SocialCreator both sit at zero; the earlier
        // declared one is reported as lowest.
        assert_eq!(report.lowest_category, Category::SelfImprovement);
    }

    #[test]
    fn balance_sums_duplicate_rows_per_event() {
        let rows = vec![
            (Category::Knowledge, 120),
            (Category::Knowledge, 120),
            (Category::Entertainment, 200),
        ];
        let report = balance_report(30, &rows);
        assert_eq!(report.scores[0].raw_seconds, 240);
        assert_eq!(report.scores[1].raw_seconds, 200);
    }

    #[test]
    fn empty_window_scores_zero_everywhere() {
        let report = balance_report(7, &[]);
        assert!(report.scores.iter().all(|s| s.normalized_score == 0.0));
        assert!(report.scores.iter().all(|s| s.raw_seconds == 0));
        assert_eq!(report.lowest_category, Category::Knowledge);
    }
}
