use once_cell::sync::Lazy;
use regex::Regex;

static CLEANER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\p{L}\p{Nd}\s]+").expect("valid tokenizer regex"));

const STOPWORDS: [&str; 24] = [
    "a", "an", "and", "are", "can", "do", "does", "for", "how", "i", "is", "it", "me", "my", "of",
    "on", "or", "the", "to", "we", "what", "with", "you", "your",
];

pub fn tokenize(input: &str) -> Vec<String> {
    let normalized = CLEANER.replace_all(input, " ").to_lowercase();

    normalized
        .split_whitespace()
        .filter(|token| token.chars().count() > 1)
        .filter(|token| !STOPWORDS.contains(token))
        .map(|token| token.to_string())
        .collect()
}
