//! Expense category and title extraction
//!
//! Category detection is a bag-of-keywords vote: every keyword of a
//! category that occurs as a word in the utterance adds one point, and only
//! a strict winner is returned. Ties and zero scores fall back to `Other`.

use super::{is_relative_date_word, title_case, tokens};
use crate::models::Category;
use lazy_static::lazy_static;
use regex::Regex;

const FALLBACK_TITLE: &str = "Expense";
const TITLE_WORD_LIMIT: usize = 3;

const CATEGORY_KEYWORDS: &[(Category, &[&str])] = &[
    (
        Category::Food,
        &[
            "lunch", "dinner", "breakfast", "brunch", "coffee", "food", "restaurant",
            "groceries", "grocery", "snack", "pizza", "cafe", "meal", "burger", "takeaway",
        ],
    ),
    (
        Category::Transport,
        &[
            "uber", "lyft", "taxi", "cab", "bus", "train", "fuel", "gas", "petrol",
            "parking", "metro", "subway", "flight", "toll",
        ],
    ),
    (
        Category::Shopping,
        &[
            "clothes", "shoes", "amazon", "shopping", "shirt", "jacket", "bag", "gift",
            "electronics", "headphones",
        ],
    ),
    (
        Category::Entertainment,
        &[
            "movie", "cinema", "concert", "netflix", "spotify", "game", "party", "show",
            "bowling", "tickets",
        ],
    ),
    (
        Category::Bills,
        &[
            "rent", "electricity", "water", "internet", "phone", "bill", "subscription",
            "insurance", "utilities",
        ],
    ),
    (
        Category::Health,
        &[
            "doctor", "medicine", "pharmacy", "gym", "dentist", "hospital", "medical",
            "vitamins", "therapy",
        ],
    ),
    (
        Category::Education,
        &[
            "book", "textbook", "course", "tuition", "stationery", "school", "college",
            "notebook", "exam", "fees",
        ],
    ),
];

/// Lead verbs stripped before building an expense title
const LEAD_VERBS: &[&str] = &[
    "spent", "spend", "paid", "pay", "bought", "buy", "purchased", "got", "cost", "costs",
];

/// Currency words that survive the number strip
const CURRENCY_WORDS: &[&str] = &[
    "dollar", "dollars", "bucks", "usd", "eur", "euro", "euros", "pound", "pounds", "gbp",
    "rupee", "rupees", "rs",
];

/// Function words that never make a useful label
const FILLER_WORDS: &[&str] = &[
    "i", "me", "we", "on", "for", "at", "a", "an", "the", "my", "some", "just", "of", "to",
    "and", "was", "it", "about", "around",
];

lazy_static! {
    static ref MONEY_TOKEN: Regex =
        Regex::new(r"^(?:\$|£|€|₹)?-?\d+(?:,\d{3})*(?:\.\d+)?$").unwrap();
}

/// Score every category by keyword hits and return the strict winner
pub fn extract_category(text: &str) -> Category {
    let words = tokens(text);

    let scores: Vec<(Category, usize)> = CATEGORY_KEYWORDS
        .iter()
        .map(|(category, keywords)| {
            let hits = keywords
                .iter()
                .filter(|kw| words.iter().any(|w| super::word_matches(w, kw)))
                .count();
            (*category, hits)
        })
        .collect();

    let best = scores.iter().map(|(_, s)| *s).max().unwrap_or(0);
    if best == 0 {
        return Category::Other;
    }

    let mut leaders = scores.iter().filter(|(_, s)| *s == best);
    match (leaders.next(), leaders.next()) {
        (Some((category, _)), None) => *category,
        _ => Category::Other,
    }
}

/// Build a short label for an expense from the utterance
///
/// Lead verbs, money tokens, currency words and relative-date words are
/// dropped; the first three remaining words are title-cased. Falls back to
/// `"Expense"` when nothing is left.
pub fn extract_expense_title(text: &str) -> String {
    let kept: Vec<String> = text
        .split_whitespace()
        .map(|raw| {
            raw.trim_matches(|c: char| c.is_ascii_punctuation() && c != '$' && c != '-')
                .to_string()
        })
        .filter(|word| !word.is_empty())
        .filter(|word| {
            let lower = word.to_lowercase();
            !LEAD_VERBS.contains(&lower.as_str())
                && !CURRENCY_WORDS.contains(&lower.as_str())
                && !FILLER_WORDS.contains(&lower.as_str())
                && !is_relative_date_word(&lower)
                && !MONEY_TOKEN.is_match(word)
        })
        .take(TITLE_WORD_LIMIT)
        .collect();

    if kept.is_empty() {
        FALLBACK_TITLE.to_string()
    } else {
        title_case(&kept.join(" "))
    }
}

/// True when the title extractor found nothing to say
pub fn is_fallback_title(title: &str) -> bool {
    title == FALLBACK_TITLE
}
