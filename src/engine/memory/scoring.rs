// ── Sarathi Engine: Memory Scoring ─────────────────────────────────────────
//
// Heuristic pipeline run on every appended turn:
//   content → sentiment → importance ∈ [0,1] → 384-dim hash embedding
//
// No ML model required — pure keyword heuristics, sub-millisecond latency.
// Importance decides retention (entries above the floor survive pruning
// forever) and weighs into retrieval ranking.

use crate::atoms::constants::{
    EMBEDDING_DIM, IMPORTANCE_BASE, LENGTH_BONUS, LONG_MESSAGE_CHARS, PREFERENCE_BONUS,
    SENTIMENT_BONUS_NEGATIVE, SENTIMENT_BONUS_POSITIVE,
};
use crate::atoms::types::{Sentiment, TopicType};
use crate::engine::classifier::topic_keyword_match;

// ═══════════════════════════════════════════════════════════════════════════
// Sentiment Lexicon
// ═══════════════════════════════════════════════════════════════════════════

/// Positive markers → positive sentiment.
const POSITIVE_MARKERS: &[&str] = &[
    "thank", "thanks", "awesome", "great", "perfect", "love", "loved", "amazing",
    "excellent", "wonderful", "fantastic", "beautiful", "happy", "glad",
    "appreciate", "delicious", "enjoyed", "best",
];

/// Negative markers → negative sentiment.
const NEGATIVE_MARKERS: &[&str] = &[
    "hate", "hated", "terrible", "awful", "horrible", "worst", "angry",
    "disappointing", "disappointed", "dirty", "scam", "cheated", "rude",
    "sick", "scared", "avoid", "annoying",
];

/// Preference markers earn the preference-keyword importance bonus —
/// statements of durable taste are worth remembering.
const PREFERENCE_MARKERS: &[&str] =
    &["love", "hate", "prefer", "favorite", "never", "always", "dislike"];

// ═══════════════════════════════════════════════════════════════════════════
// Scoring
// ═══════════════════════════════════════════════════════════════════════════

/// Majority vote over the positive/negative lexicons; ties and no-hits are
/// neutral.
pub fn sentiment_of(text: &str) -> Sentiment {
    let lower = text.to_lowercase();
    let pos = count_hits(&lower, POSITIVE_MARKERS);
    let neg = count_hits(&lower, NEGATIVE_MARKERS);
    if pos > neg {
        Sentiment::Positive
    } else if neg > pos {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    }
}

/// Importance of one turn, always clipped to [0, 1].
///
/// 0.3 base, plus:
///   • topic weight — only when a topic keyword actually matched the text
///     (a bare "hello" defaults to the practical topic downstream but earns
///     no topic bonus here)
///   • sentiment: +0.2 positive, +0.3 negative
///   • length: +0.1 when the message runs past LONG_MESSAGE_CHARS
///   • preference keywords (love/hate/prefer/…): +0.3
pub fn importance_of(user_message: &str, sentiment: Sentiment) -> f32 {
    let lower = user_message.to_lowercase();
    let mut score = IMPORTANCE_BASE;

    if let Some(topic) = topic_keyword_match(&lower) {
        score += topic_weight(topic);
    }

    score += match sentiment {
        Sentiment::Positive => SENTIMENT_BONUS_POSITIVE,
        Sentiment::Negative => SENTIMENT_BONUS_NEGATIVE,
        Sentiment::Neutral => 0.0,
    };

    if user_message.chars().count() > LONG_MESSAGE_CHARS {
        score += LENGTH_BONUS;
    }

    if contains_any(&lower, PREFERENCE_MARKERS) {
        score += PREFERENCE_BONUS;
    }

    score.clamp(0.0, 1.0)
}

/// Retention weight per topic. Spiritual conversations matter most to the
/// guide; practical logistics the least.
pub fn topic_weight(topic: TopicType) -> f32 {
    match topic {
        TopicType::Spiritual => 0.8,
        TopicType::Culture | TopicType::History => 0.7,
        TopicType::Food => 0.6,
        TopicType::Shopping => 0.5,
        TopicType::Practical => 0.4,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Embedding
// ═══════════════════════════════════════════════════════════════════════════

/// Deterministic bag-of-words hash embedding: each word is FNV-hashed into
/// one of EMBEDDING_DIM buckets, counts accumulated, then L2-normalized.
/// All-zero input (empty text) yields the zero vector.
pub fn embedding_of(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; EMBEDDING_DIM];
    for word in text.to_lowercase().split_whitespace() {
        let bucket = (fnv1a(word.as_bytes()) as usize) % EMBEDDING_DIM;
        v[bucket] += 1.0;
    }
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
    v
}

/// FNV-1a, 64-bit. Stable across platforms and Rust versions, unlike the
/// std hasher.
fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for b in bytes {
        hash ^= u64::from(*b);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

fn count_hits(text: &str, markers: &[&str]) -> usize {
    markers.iter().filter(|m| text.contains(**m)).count()
}

fn contains_any(text: &str, markers: &[&str]) -> bool {
    markers.iter().any(|m| text.contains(m))
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════
