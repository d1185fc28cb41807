//! Token extraction shared by cluster labelling.

use std::collections::{BTreeSet, HashMap};

use once_cell::sync::Lazy;
use regex::Regex;

/// Tokens must be longer than this to count.
pub const MIN_TOKEN_LEN: usize = 3;

/// How much of a file's content is looked at.
pub const CONTENT_SAMPLE_CHARS: usize = 200;

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\W+").expect("valid regex"));

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "from", "this", "that", "file", "files", "copy", "final", "draft",
    "untitled", "document", "new", "version", "img", "image", "scan",
];

pub fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(&token)
}

/// Lowercase word tokens longer than three characters. `_` counts as a word
/// character, so `q3_report` stays one token.
pub fn tokenize(text: &str) -> Vec<String> {
    NON_WORD
        .split(&text.to_lowercase())
        .filter(|token| token.chars().count() > MIN_TOKEN_LEN)
        .map(str::to_string)
        .collect()
}

/// Tokens of a file name with the extension dropped.
pub fn filename_tokens(file_name: &str) -> Vec<String> {
    let stem = match file_name.rfind('.') {
        Some(dot) if dot > 0 => &file_name[..dot],
        _ => file_name,
    };
    tokenize(stem)
}

/// Tokens from the leading `CONTENT_SAMPLE_CHARS` characters of `content`.
pub fn content_tokens(content: &str) -> Vec<String> {
    let sample: String = content.chars().take(CONTENT_SAMPLE_CHARS).collect();
    tokenize(&sample)
}

/// Minimum number of distinct file names a word must appear in.
pub fn common_word_threshold(file_count: usize) -> usize {
    // ceil(0.3 * n) without going through floats
    let scaled = (3 * file_count).div_ceil(10);
    scaled.max(2)
}

/// Words shared by enough file names, most frequent first (ties alphabetical).
pub fn common_words<S: AsRef<str>>(file_names: &[S], limit: usize) -> Vec<String> {
    let threshold = common_word_threshold(file_names.len());
    let mut document_frequency: HashMap<String, usize> = HashMap::new();

    for name in file_names {
        let unique: BTreeSet<String> = filename_tokens(name.as_ref())
            .into_iter()
            .filter(|token| !is_stopword(token))
            .filter(|token| !token.chars().all(|c| c.is_ascii_digit()))
            .collect();
        for token in unique {
            *document_frequency.entry(token).or_insert(0) += 1;
        }
    }

    let mut ranked: Vec<(String, usize)> = document_frequency
        .into_iter()
        .filter(|(_, count)| *count >= threshold)
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(limit);

    ranked.into_iter().map(|(word, _)| word).collect()
}

pub fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_splits_and_filters_short_tokens() {
        assert_eq!(tokenize("Q3 Budget-Review.final"), vec!["budget", "review", "final"]);
        assert_eq!(tokenize("tax_return 2023"), vec!["tax_return", "2023"]);
        assert!(tokenize("a b cat").is_empty());
    }

    #[test]
    fn test_filename_tokens_drop_extension() {
        assert_eq!(filename_tokens("invoice march.pdf"), vec!["invoice", "march"]);
        assert_eq!(filename_tokens(".bashrc"), vec!["bashrc"]);
    }

    #[test]
    fn test_content_tokens_only_sample_prefix() {
        let content = format!("{} zebra", "x ".repeat(CONTENT_SAMPLE_CHARS));
        assert!(content_tokens(&content).is_empty());
        assert_eq!(content_tokens("meeting notes"), vec!["meeting", "notes"]);
    }

    #[test]
    fn test_common_word_threshold() {
        assert_eq!(common_word_threshold(1), 2);
        assert_eq!(common_word_threshold(5), 2);
        assert_eq!(common_word_threshold(10), 3);
        assert_eq!(common_word_threshold(11), 4);
    }

    #[test]
    fn test_common_words_ranked() {
        let names = [
            "invoice january.pdf",
            "invoice february.pdf",
            "invoice march.pdf",
            "receipt march.pdf",
            "holiday photo.jpg",
        ];
        assert_eq!(common_words(&names, 3), vec!["invoice", "march"]);
    }

    #[test]
    fn test_common_words_skip_stopwords_and_counts_each_name_once() {
        let names = ["copy of copy.txt", "copy notes.txt", "notes notes.txt"];
        assert_eq!(common_words(&names, 3), vec!["notes"]);
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("invoice"), "Invoice");
        assert_eq!(capitalize(""), "");
    }
}
