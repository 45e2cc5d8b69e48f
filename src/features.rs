use anyhow::Result;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;
use whatlang::detect;

use crate::models::{CommentRecord, TextFeatures};
use crate::utils::round_to;

const POSITIVE_WORDS: &[(&str, f64)] = &[
    ("good", 1.0),
    ("great", 1.5),
    ("excellent", 2.0),
    ("amazing", 2.0),
    ("wonderful", 1.8),
    ("fantastic", 1.8),
    ("happy", 1.2),
    ("love", 2.0),
    ("like", 0.6),
    ("best", 1.5),
    ("better", 1.2),
    ("awesome", 1.8),
    ("perfect", 2.0),
    ("brilliant", 1.8),
    ("helpful", 1.4),
    ("useful", 1.2),
    ("interesting", 1.0),
    ("beautiful", 1.6),
    ("funny", 1.0),
    ("cool", 1.0),
    ("nice", 1.0),
    ("thanks", 1.0),
    ("thank", 1.0),
    ("informative", 1.2),
    ("inspiring", 1.6),
    ("impressive", 1.5),
    ("clear", 0.8),
    ("enjoyed", 1.4),
    ("underrated", 1.0),
    ("legend", 1.4),
];

const NEGATIVE_WORDS: &[(&str, f64)] = &[
    ("bad", -1.0),
    ("terrible", -2.0),
    ("awful", -2.0),
    ("horrible", -2.0),
    ("worst", -2.0),
    ("hate", -2.0),
    ("dislike", -1.0),
    ("poor", -1.2),
    ("disappointing", -1.5),
    ("boring", -1.2),
    ("sad", -1.0),
    ("angry", -1.5),
    ("annoying", -1.2),
    ("clickbait", -1.5),
    ("wrong", -1.0),
    ("fake", -1.5),
    ("scam", -2.0),
    ("misleading", -1.5),
    ("useless", -1.5),
    ("waste", -1.5),
    ("stupid", -1.6),
    ("cringe", -1.4),
    ("confusing", -1.0),
    ("pathetic", -1.5),
    ("worse", -1.2),
];

// Intensifiers that modify sentiment
const INTENSIFIERS: &[(&str, f64)] = &[
    ("very", 1.5),
    ("extremely", 2.0),
    ("incredibly", 2.0),
    ("absolutely", 2.0),
    ("totally", 1.8),
    ("really", 1.3),
    ("so", 1.2),
    ("quite", 1.2),
    ("somewhat", 0.8),
    ("slightly", 0.7),
    ("barely", 0.5),
];

// Negation words that flip sentiment
const NEGATIONS: &[&str] = &[
    "not", "no", "never", "none", "nothing", "nobody", "neither", "nor", "dont", "don't",
    "isnt", "isn't", "wasnt", "wasn't",
];

/// Largest absolute word weight after intensifiers; scales polarity into [-1, 1]
const POLARITY_SCALE: f64 = 2.0;

/// Extracts lexical features from comment text
pub struct TextFeatureExtractor {
    url_regex: Regex,
    mention_regex: Regex,
    hashtag_regex: Regex,
    word_regex: Regex,
}

impl TextFeatureExtractor {
    /// Create a new extractor
    pub fn new() -> Result<Self> {
        // Initialize regular expressions for feature detection
        let url_regex = Regex::new(r"https?://\S+|www\.\S+")
            .map_err(|e| anyhow::anyhow!("Failed to compile URL regex: {e}"))?;
        let mention_regex = Regex::new(r"(?:^|\s)@[\w.\-]+")
            .map_err(|e| anyhow::anyhow!("Failed to compile mention regex: {e}"))?;
        let hashtag_regex = Regex::new(r"(?:^|\s)#\w+")
            .map_err(|e| anyhow::anyhow!("Failed to compile hashtag regex: {e}"))?;
        let word_regex = Regex::new(r"[\p{L}']+")
            .map_err(|e| anyhow::anyhow!("Failed to compile word regex: {e}"))?;

        Ok(Self {
            url_regex,
            mention_regex,
            hashtag_regex,
            word_regex,
        })
    }

    /// Compute the full feature set for one text
    #[must_use]
    pub fn extract(&self, text: &str) -> TextFeatures {
        // Normalize Unicode characters
        let normalized = text.nfc().collect::<String>();

        let letters = normalized.chars().filter(|c| c.is_alphabetic()).count();
        let uppercase = normalized.chars().filter(|c| c.is_uppercase()).count();
        let uppercase_ratio = if letters == 0 {
            0.0
        } else {
            round_to(uppercase as f64 / letters as f64, 4)
        };

        let (polarity, subjectivity) = self.polarity_subjectivity(&normalized);

        // Detect language only when the detector is confident
        let language = detect(&normalized)
            .filter(whatlang::Info::is_reliable)
            .map(|info| info.lang().code().to_string());

        TextFeatures {
            length: normalized.chars().count(),
            word_count: normalized.split_whitespace().count(),
            has_question: normalized.contains('?'),
            has_exclamation: normalized.contains('!'),
            has_link: self.url_regex.is_match(&normalized),
            has_mention: self.mention_regex.is_match(&normalized),
            has_hashtag: self.hashtag_regex.is_match(&normalized),
            has_emoji: normalized.chars().any(is_emoji),
            uppercase_ratio,
            polarity,
            subjectivity,
            language,
        }
    }

    /// Attach features to every comment in place
    pub fn annotate(&self, comments: &mut [CommentRecord]) {
        for comment in comments.iter_mut() {
            comment.features = Some(self.extract(&comment.text));
        }
    }

    /// Lexical polarity in [-1, 1] and subjectivity in [0, 1]
    #[must_use]
    pub fn polarity_subjectivity(&self, text: &str) -> (f64, f64) {
        let without_urls = self.url_regex.replace_all(text, " ");
        let words: Vec<String> = self
            .word_regex
            .find_iter(&without_urls)
            .map(|m| m.as_str().to_lowercase())
            .collect();

        if words.is_empty() {
            return (0.0, 0.0);
        }

        let mut total_sentiment = 0.0;
        let mut opinion_words = 0.0;

        for (i, word) in words.iter().enumerate() {
            let Some(weight) = POSITIVE_WORDS
                .iter()
                .chain(NEGATIVE_WORDS.iter())
                .find(|(w, _)| *w == word)
                .map(|(_, weight)| *weight)
            else {
                continue;
            };

            let mut sentiment = weight;

            // Check for intensifiers before this word
            if i > 0 {
                if let Some((_, intensity)) = INTENSIFIERS.iter().find(|(w, _)| *w == words[i - 1]) {
                    sentiment *= intensity;
                }
            }

            // Check for negations in the two preceding words
            let has_negation = (i >= 1 && NEGATIONS.contains(&words[i - 1].as_str()))
                || (i >= 2 && NEGATIONS.contains(&words[i - 2].as_str()));

            if has_negation {
                sentiment = -sentiment * 0.8; // Flip and reduce intensity
            }

            total_sentiment += sentiment;
            opinion_words += 1.0;
        }

        if opinion_words == 0.0 {
            return (0.0, 0.0);
        }

        let polarity = (total_sentiment / opinion_words / POLARITY_SCALE).clamp(-1.0, 1.0);
        let subjectivity = (opinion_words * 3.0 / words.len() as f64).min(1.0);
        (round_to(polarity, 4), round_to(subjectivity, 4))
    }
}

/// True for characters in the common emoji blocks
#[must_use]
pub fn is_emoji(c: char) -> bool {
    matches!(
        u32::from(c),
        0x1F600..=0x1F64F // emoticons
            | 0x1F300..=0x1F5FF // symbols & pictographs
            | 0x1F680..=0x1F6FF // transport & map
            | 0x1F1E0..=0x1F1FF // flags
            | 0x1F900..=0x1F9FF // supplemental symbols
            | 0x1FA70..=0x1FAFF // symbols & pictographs extended-A
            | 0x2600..=0x26FF // misc symbols
            | 0x2700..=0x27BF // dingbats
    )
}
