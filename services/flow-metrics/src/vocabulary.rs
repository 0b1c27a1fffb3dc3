//!
//! src/vocabulary.rs
//!
//! Vocabulary statistics over lyrics text. Everything here is a pure
//! function of the input plus the fixed stop word and section header sets
//!

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// English stop words, the 179 word list shipped with nltk
pub const STOP_WORDS: [&str; 179] = [
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "you're",
    "you've", "you'll", "you'd", "your", "yours", "yourself", "yourselves", "he", "him",
    "his", "himself", "she", "she's", "her", "hers", "herself", "it", "it's", "its",
    "itself", "they", "them", "their", "theirs", "themselves", "what", "which", "who",
    "whom", "this", "that", "that'll", "these", "those", "am", "is", "are", "was",
    "were", "be", "been", "being", "have", "has", "had", "having", "do", "does", "did",
    "doing", "a", "an", "the", "and", "but", "if", "or", "because", "as", "until",
    "while", "of", "at", "by", "for", "with", "about", "against", "between", "into",
    "through", "during", "before", "after", "above", "below", "to", "from", "up", "down",
    "in", "out", "on", "off", "over", "under", "again", "further", "then", "once",
    "here", "there", "when", "where", "why", "how", "all", "any", "both", "each", "few",
    "more", "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same",
    "so", "than", "too", "very", "s", "t", "can", "will", "just", "don", "don't",
    "should", "should've", "now", "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren",
    "aren't", "couldn", "couldn't", "didn", "didn't", "doesn", "doesn't", "hadn",
    "hadn't", "hasn", "hasn't", "haven", "haven't", "isn", "isn't", "ma", "mightn",
    "mightn't", "mustn", "mustn't", "needn", "needn't", "shan", "shan't", "shouldn",
    "shouldn't", "wasn", "wasn't", "weren", "weren't", "won", "won't", "wouldn",
    "wouldn't",
];

/// Labels lyrics sites put in front of song sections
pub const SECTION_HEADERS: [&str; 15] = [
    "verse", "verse 1", "verse 2", "verse 3", "verse 4", "chorus", "bridge", "outro",
    "intro", "hook", "pre-chorus", "refrain", "interlude", "ad libs", "breakdown",
];

/// Plurals whose root the suffix rules would get wrong
const IRREGULAR_NOUNS: [(&str, &str); 24] = [
    ("men", "man"), ("women", "woman"), ("children", "child"), ("feet", "foot"),
    ("teeth", "tooth"), ("mice", "mouse"), ("geese", "goose"), ("knives", "knife"),
    ("lives", "life"), ("wives", "wife"), ("wolves", "wolf"), ("leaves", "leaf"),
    ("thieves", "thief"), ("halves", "half"), ("shelves", "shelf"), ("loaves", "loaf"),
    ("dice", "die"), ("oxen", "ox"), ("news", "news"), ("series", "series"),
    ("species", "species"), ("dies", "die"), ("ties", "tie"), ("lies", "lie"),
];

static STOP_SET: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| STOP_WORDS.into_iter().collect());
static HEADER_SET: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| SECTION_HEADERS.into_iter().collect());
static IRREGULAR: LazyLock<HashMap<&'static str, &'static str>> =
    LazyLock::new(|| IRREGULAR_NOUNS.into_iter().collect());

static TIMESTAMP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\d+:\d+\]").expect("static regex"));
static BRACKETED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(.*?)\]").expect("static regex"));
static PARENTHESIZED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(.*?\)").expect("static regex"));
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("static regex"));

/// Treebank contraction splits that survive punctuation removal
static CONTRACTIONS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)^(can)(not)$",
        r"(?i)^(gim)(me)$",
        r"(?i)^(gon)(na)$",
        r"(?i)^(got)(ta)$",
        r"(?i)^(lem)(me)$",
        r"(?i)^(wan)(na)$",
    ]
    .into_iter()
    .map(|pattern| Regex::new(pattern).expect("static regex"))
    .collect()
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
pub struct VocabularyMetrics {
    pub total_words: usize,
    pub unique_word_count: usize,
    pub type_token_ratio: f64,
    pub average_word_length: f64,
    pub lexical_density: f64
}

/// Per-song averages over a set of analyzed lyrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
pub struct AggregateMetrics {
    pub songs: usize,
    pub type_token_ratio: f64,
    pub average_word_length: f64,
    pub lexical_density: f64
}

/// Lowercases and strips timestamps, [section] labels, (annotations),
/// ascii punctuation and extra whitespace
pub fn clean_lyrics(lyrics: &str) -> String {
    let text = lyrics.to_lowercase();
    let text = TIMESTAMP.replace_all(&text, "");
    let text = BRACKETED.replace_all(&text, "");
    let text = PARENTHESIZED.replace_all(&text, "");
    let text: String = text.chars().filter(|c| !c.is_ascii_punctuation()).collect();
    WHITESPACE.replace_all(&text, " ").trim().to_string()
}

/// Whitespace tokens with contractions such as `gonna` split in two
pub fn tokenize(cleaned: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    for word in cleaned.split_whitespace() {
        match CONTRACTIONS.iter().find_map(|re| re.captures(word)) {
            Some(parts) => tokens.extend(parts.iter().skip(1).flatten().map(|m| m.as_str())),
            None => tokens.push(word)
        }
    }
    tokens
}

fn is_alphabetic(token: &str) -> bool {
    !token.is_empty() && token.chars().all(char::is_alphabetic)
}

/// Drops stop words, section labels and single letters
pub fn filter_words<'a>(words: &[&'a str]) -> Vec<&'a str> {
    words
        .iter()
        .copied()
        .filter(|w| !STOP_SET.contains(w) && !HEADER_SET.contains(w) && w.chars().count() > 1)
        .collect()
}

/// Singular noun form of a word
pub fn lemmatize(word: &str) -> String {
    if let Some(root) = IRREGULAR.get(word) {
        return root.to_string();
    }
    if word.chars().count() <= 3 || ["ss", "us", "is"].iter().any(|end| word.ends_with(end)) {
        return word.to_string();
    }

    if let Some(stem) = word.strip_suffix("ies") {
        return format!("{stem}y");
    }
    for suffix in ["sses", "ches", "shes", "xes", "zzes"] {
        if word.ends_with(suffix) {
            return word[..word.len() - 2].to_string();
        }
    }
    match word.strip_suffix('s') {
        Some(stem) => stem.to_string(),
        None => word.to_string()
    }
}

fn ratio(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}

/// Total and average length count every alphabetic word. Unique words are
/// counted over the filtered, lemmatized words
pub fn analyze(lyrics: &str) -> VocabularyMetrics {
    let cleaned = clean_lyrics(lyrics);
    let all_words: Vec<&str> = tokenize(&cleaned)
        .into_iter()
        .filter(|t| is_alphabetic(t))
        .collect();
    let filtered = filter_words(&all_words);
    let unique: HashSet<String> = filtered.iter().map(|w| lemmatize(w)).collect();

    let total_words = all_words.len();
    let total_length: usize = all_words.iter().map(|w| w.chars().count()).sum();

    VocabularyMetrics {
        total_words,
        unique_word_count: unique.len(),
        type_token_ratio: ratio(unique.len(), total_words),
        average_word_length: ratio(total_length, total_words),
        lexical_density: ratio(filtered.len(), total_words)
    }
}

/// Percent difference of type token ratios, 0 with no baseline
pub fn calculate_vocabulary_richness(artist: &VocabularyMetrics, baseline: &VocabularyMetrics) -> f64 {
    if baseline.type_token_ratio > 0.0 {
        (artist.type_token_ratio - baseline.type_token_ratio) / baseline.type_token_ratio * 100.0
    } else {
        0.0
    }
}

pub fn aggregate(metrics: &[VocabularyMetrics]) -> Option<AggregateMetrics> {
    if metrics.is_empty() {
        return None;
    }
    let n = metrics.len() as f64;
    let mean = |f: fn(&VocabularyMetrics) -> f64| metrics.iter().map(f).sum::<f64>() / n;

    Some( AggregateMetrics {
        songs: metrics.len(),
        type_token_ratio: mean(|m| m.type_token_ratio),
        average_word_length: mean(|m| m.average_word_length),
        lexical_density: mean(|m| m.lexical_density)
    })
}
