use std::collections::{BTreeSet, HashMap};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::lexical::{capitalize, common_words, content_tokens, tokenize};
use crate::models::{ClusterCategory, EmbeddedFile, Theme};

const FILENAME_WEIGHT: usize = 2;
const CONTENT_WEIGHT: usize = 1;
const MAX_COMMON_WORDS: usize = 3;
const MAX_CATEGORY_KEYWORDS: usize = 5;

struct CategoryRule {
    category: ClusterCategory,
    pattern: Regex,
}

// Declaration order doubles as the tie-break order.
static CATEGORY_RULES: Lazy<Vec<CategoryRule>> = Lazy::new(|| {
    [
        (
            ClusterCategory::Work,
            concat!(
                r"^(meeting|project|report|invoice|client|budget|proposal|presentation|",
                r"contract|agenda|quarter|sales|roadmap|payroll|strategy)",
            ),
        ),
        (
            ClusterCategory::Personal,
            concat!(
                r"^(family|vacation|holiday|birthday|wedding|recipe|personal|health|",
                r"travel|diary|journal|home|kids|medical)",
            ),
        ),
        (
            ClusterCategory::Media,
            concat!(
                r"^(photo|picture|video|music|audio|jpeg|movie|song|podcast|camera|",
                r"screenshot|recording|album|webm)",
            ),
        ),
        (
            ClusterCategory::Documents,
            concat!(
                r"^(notes|letter|resume|manual|guide|paper|essay|thesis|docx|xlsx|pptx|",
                r"form|spreadsheet|article|memo)",
            ),
        ),
        (
            ClusterCategory::Archive,
            r"^(archive|backup|legacy|deprecated|snapshot|export|tarball|older|previous|history)",
        ),
    ]
    .into_iter()
    .map(|(category, pattern)| CategoryRule {
        category,
        pattern: Regex::new(pattern).expect("valid category pattern"),
    })
    .collect()
});

/// Scores each category by keyword hits; file names count double. Returns the
/// winning category and the tokens that matched it.
pub fn score_category(files: &[EmbeddedFile]) -> (ClusterCategory, BTreeSet<String>) {
    let mut scores: HashMap<ClusterCategory, usize> = HashMap::new();
    let mut hits: HashMap<ClusterCategory, BTreeSet<String>> = HashMap::new();

    let mut tally = |tokens: Vec<String>, weight: usize| {
        for token in tokens {
            for rule in CATEGORY_RULES.iter() {
                if rule.pattern.is_match(&token) {
                    *scores.entry(rule.category).or_insert(0) += weight;
                    hits.entry(rule.category).or_default().insert(token.clone());
                }
            }
        }
    };

    for file in files {
        tally(tokenize(&file.file_name), FILENAME_WEIGHT);
        if let Some(content) = &file.content {
            tally(content_tokens(content), CONTENT_WEIGHT);
        }
    }

    let mut best = ClusterCategory::Mixed;
    let mut best_score = 0;
    for rule in CATEGORY_RULES.iter() {
        let score = scores.get(&rule.category).copied().unwrap_or(0);
        if score > best_score {
            best = rule.category;
            best_score = score;
        }
    }

    let keywords = hits
        .remove(&best)
        .unwrap_or_default()
        .into_iter()
        .take(MAX_CATEGORY_KEYWORDS)
        .collect();

    (best, keywords)
}

/// Derives a human readable theme for the files of one cluster.
pub fn label_cluster(files: &[EmbeddedFile]) -> Theme {
    let (category, category_keywords) = score_category(files);

    let names: Vec<&str> = files.iter().map(|f| f.file_name.as_str()).collect();
    let common = common_words(&names, MAX_COMMON_WORDS);

    let count = files.len();
    let noun = if count == 1 { "file" } else { "files" };

    let (name, suggested_folder_name, description) = match common.first() {
        Some(word) => {
            let word = capitalize(word);
            (
                format!("{} Collection", word),
                word,
                format!("{} {} about {}", count, noun, common.join(", ")),
            )
        }
        None => {
            let label = capitalize(category.as_str());
            (
                format!("{} Files", label),
                label,
                format!("{} {} {}", count, category, noun),
            )
        }
    };

    let mut keywords: BTreeSet<String> = common.into_iter().collect();
    keywords.extend(category_keywords);

    Theme {
        name,
        description,
        suggested_folder_name,
        category,
        keywords,
    }
}
