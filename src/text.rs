//! Sentence splitting and bag-of-words tokenization.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use unicode_normalization::UnicodeNormalization;

use crate::mention::Span;

static SENTENCE_BOUNDARY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"[.!?…]+["'”»)\]]*(?:\s+|$)|\n[ \t]*\n\s*"#).expect("sentence boundary pattern")
});

/// Tokens that end in a period without ending the sentence.
const ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "st", "jr", "sr", "prof", "gen", "col", "lt", "sgt", "m", "mme", "mlle", "vs", "etc",
    "inc", "corp", "ltd",
];

/// Splits `text` into sentence spans, in character offsets.
pub fn sentence_spans(text: &str) -> Vec<Span> {
    let char_starts: Vec<usize> = text.char_indices().map(|(b, _)| b).collect();
    let to_char = |byte: usize| char_starts.partition_point(|&b| b < byte);

    let mut spans = Vec::new();
    let mut start = 0usize;
    for m in SENTENCE_BOUNDARY.find_iter(text) {
        if m.as_str().starts_with('.') && ends_with_abbreviation(&text[start..m.start()]) {
            continue;
        }
        push_sentence(text, start, m.end(), &to_char, &mut spans);
        start = m.end();
    }
    if start < text.len() {
        push_sentence(text, start, text.len(), &to_char, &mut spans);
    }
    spans
}

fn push_sentence(text: &str, start: usize, end: usize, to_char: &impl Fn(usize) -> usize, out: &mut Vec<Span>) {
    if text[start..end].trim().is_empty() {
        return;
    }
    out.push(Span::new(to_char(start), to_char(end)));
}

fn ends_with_abbreviation(fragment: &str) -> bool {
    let Some(last) = fragment.split_whitespace().last() else {
        return false;
    };
    let word = last.trim_start_matches(|c: char| !c.is_alphanumeric());
    if word.chars().count() == 1 && word.chars().all(|c| c.is_uppercase()) {
        return true;
    }
    ABBREVIATIONS.contains(&word.to_lowercase().as_str())
}

/* ------------------------------ Stop words -------------------------------- */

const ENGLISH: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "if", "then", "of", "to", "in", "on", "for", "with", "as", "by", "is",
    "are", "was", "were", "be", "been", "being", "that", "this", "these", "those", "it", "its", "at", "from",
    "into", "over", "under", "about", "after", "before", "between", "during", "without", "within", "than", "not",
    "no", "yes", "more", "most", "less", "least", "very", "much", "many", "some", "any", "such", "he", "she",
    "they", "them", "his", "her", "their", "we", "our", "you", "your", "i", "me", "my", "has", "have", "had",
    "do", "does", "did", "will", "would", "can", "could", "should", "may", "might", "also", "which", "who",
    "whom", "what", "when", "where", "why", "how", "said", "says", "there", "here", "all", "so", "up", "out",
];

const FRENCH: &[&str] = &[
    "le", "la", "les", "l", "un", "une", "des", "du", "de", "d", "et", "ou", "mais", "donc", "or", "ni", "car",
    "à", "au", "aux", "en", "dans", "par", "pour", "sur", "sous", "avec", "sans", "entre", "vers", "chez", "ce",
    "cet", "cette", "ces", "c", "qui", "que", "qu", "quoi", "dont", "où", "il", "elle", "ils", "elles", "on",
    "nous", "vous", "je", "j", "tu", "se", "s", "sa", "son", "ses", "leur", "leurs", "ne", "n", "pas", "plus",
    "est", "sont", "était", "été", "être", "a", "ont", "avait", "avoir", "fait", "comme", "aussi", "très", "y",
];

/// Per-language stop-word lists, passed explicitly into tokenization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StopWords {
    lists: BTreeMap<String, BTreeSet<String>>,
}

static EMPTY: Lazy<BTreeSet<String>> = Lazy::new(BTreeSet::new);

impl StopWords {
    /// Built-in English (`en`) and French (`fr`) lists.
    pub fn builtin() -> Self {
        let mut lists = BTreeMap::new();
        lists.insert("en".to_string(), ENGLISH.iter().map(|s| s.to_string()).collect());
        lists.insert("fr".to_string(), FRENCH.iter().map(|s| s.to_string()).collect());
        Self { lists }
    }

    pub fn from_lists<I, L, W>(lists: I) -> Self
    where
        I: IntoIterator<Item = (L, Vec<W>)>,
        L: Into<String>,
        W: AsRef<str>,
    {
        let lists = lists
            .into_iter()
            .map(|(lang, words)| (lang.into(), words.iter().map(|w| w.as_ref().to_lowercase()).collect()))
            .collect();
        Self { lists }
    }

    /// The list for `language`; an unknown language has no stop words.
    pub fn for_language(&self, language: &str) -> &BTreeSet<String> {
        self.lists.get(language).unwrap_or(&*EMPTY)
    }
}

/// Case-folds, replaces digits and punctuation with blanks, and drops stop words.
#[derive(Debug, Clone, Copy)]
pub struct Tokenizer<'a> {
    stop_words: &'a BTreeSet<String>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(stop_words: &'a BTreeSet<String>) -> Self {
        Self { stop_words }
    }

    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let cleaned: String = text
            .nfc()
            .flat_map(char::to_lowercase)
            .map(|c| if c.is_alphabetic() { c } else { ' ' })
            .collect();
        cleaned
            .split_whitespace()
            .filter(|t| !self.stop_words.contains(*t))
            .map(str::to_string)
            .collect()
    }
}
