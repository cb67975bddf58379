// ── Sarathi Engine: Message Classifier ─────────────────────────────────────
//
// Derives {topic, mood, urgency, complexity, time of day} from raw message
// text via keyword heuristics — no ML model required, fast & deterministic.
//
// Every dimension is an explicit, ordered list of (marker family → result)
// rules evaluated top-to-bottom; the first matching family wins. Precedence
// is therefore testable rule-by-rule:
//   topic:   spiritual > food > history > culture > shopping > practical
//   urgency: urgent family > moderate family > relative-time words > low
//   mood:    tired > overwhelmed > hungry > excited > peaceful > curious
//
// Empty input yields the full default tuple (practical/curious/low/simple).
// There are no error conditions.

use crate::atoms::constants::{COMPLEX_WORD_COUNT, MODERATE_WORD_COUNT};
use crate::atoms::types::{
    Complexity, MessageClassification, TimeOfDay, TopicType, Urgency, UserMood,
};

// ═══════════════════════════════════════════════════════════════════════════
// Marker Lexicons
// ═══════════════════════════════════════════════════════════════════════════

const SPIRITUAL_MARKERS: &[&str] = &[
    "temple", "ghat", "aarti", "puja", "prayer", "pray", "meditat", "spiritual",
    "moksha", "blessing", "pilgrim", "sacred", "holy", "shiva", "sadhu", "ritual",
];

const FOOD_MARKERS: &[&str] = &[
    "food", "eat", "restaurant", "breakfast", "lunch", "dinner", "chaat",
    "lassi", "paan", "kachori", "thali", "street food", "snack", "sweet",
    "dish", "taste", "cuisine",
];

const HISTORY_MARKERS: &[&str] = &[
    "history", "historic", "ancient", "heritage", "century", "centuries",
    "dynasty", "ruins", "old city", "museum", "emperor", "archaeolog", "era",
];

const CULTURE_MARKERS: &[&str] = &[
    "culture", "cultural", "music", "art", "festival", "silk", "weav",
    "tradition", "dance", "classical", "sari", "craft", "ceremony",
];

const SHOPPING_MARKERS: &[&str] = &[
    "shop", "buy", "market", "bazaar", "souvenir", "purchase", "price",
    "bargain", "handicraft",
];

const PRACTICAL_MARKERS: &[&str] = &[
    "atm", "toilet", "taxi", "auto", "rickshaw", "hotel", "direction",
    "map", "wifi", "pharmacy", "hospital", "police", "train", "airport",
    "ticket", "book",
];

/// Ordered (family → topic) table. First match wins.
const TOPIC_RULES: &[(&[&str], TopicType)] = &[
    (SPIRITUAL_MARKERS, TopicType::Spiritual),
    (FOOD_MARKERS, TopicType::Food),
    (HISTORY_MARKERS, TopicType::History),
    (CULTURE_MARKERS, TopicType::Culture),
    (SHOPPING_MARKERS, TopicType::Shopping),
    (PRACTICAL_MARKERS, TopicType::Practical),
];

const TIRED_MARKERS: &[&str] = &["tired", "exhausted", "sleepy", "worn out", "fatigued", "drained"];
const OVERWHELMED_MARKERS: &[&str] = &[
    "overwhelm", "too much", "confus", "lost", "chaotic", "so crowded", "can't cope",
];
const HUNGRY_MARKERS: &[&str] = &["hungry", "starving", "famished", "craving"];
const EXCITED_MARKERS: &[&str] = &["excited", "can't wait", "thrilled", "amazing", "awesome", "wow"];
const PEACEFUL_MARKERS: &[&str] = &["peaceful", "calm", "serene", "relaxed", "tranquil"];

/// Ordered (family → mood) table. First match wins; default is Curious.
const MOOD_RULES: &[(&[&str], UserMood)] = &[
    (TIRED_MARKERS, UserMood::Tired),
    (OVERWHELMED_MARKERS, UserMood::Overwhelmed),
    (HUNGRY_MARKERS, UserMood::Hungry),
    (EXCITED_MARKERS, UserMood::Excited),
    (PEACEFUL_MARKERS, UserMood::Peaceful),
];

const URGENT_MARKERS: &[&str] = &[
    "urgent", "emergency", "asap", "immediately", "right now", "right away", "critical",
];
const MODERATE_URGENCY_MARKERS: &[&str] = &["soon", "quickly", "hurry", "fast", "shortly"];
const RELATIVE_TIME_MARKERS: &[&str] = &[
    "today", "tonight", "this morning", "this afternoon", "this evening", "tomorrow",
];

const COMPLEX_MARKERS: &[&str] = &[
    "plan", "itinerary", "organize", "arrange", "schedule", "compare",
    "multi-day", "everything", "entire trip",
];

// ═══════════════════════════════════════════════════════════════════════════
// Classification
// ═══════════════════════════════════════════════════════════════════════════

/// Classify a message against the current wall clock.
pub fn classify(text: &str, location: Option<&str>) -> MessageClassification {
    use chrono::Timelike;
    classify_at(text, location, chrono::Local::now().hour())
}

/// Classify a message for an explicit hour-of-day (0–23). Pure; the
/// fixture-friendly entry point.
pub fn classify_at(text: &str, location: Option<&str>, hour: u32) -> MessageClassification {
    let lower = text.to_lowercase();
    let topic = detect_topic(&lower, location);
    let mood = detect_mood(&lower);
    let urgency = detect_urgency(&lower);
    let complexity = detect_complexity(&lower);
    let requires_autonomy =
        urgency >= Urgency::High || complexity == Complexity::Complex;

    MessageClassification {
        topic,
        mood,
        urgency,
        complexity,
        time_of_day: time_of_day_for_hour(hour),
        requires_autonomy,
    }
}

/// First matching topic family wins; falls back to Practical. When the
/// message itself has no topic marker, the location hint is scanned so that
/// "what is this place?" asked at a ghat still classifies as spiritual.
pub fn detect_topic(lower: &str, location: Option<&str>) -> TopicType {
    if let Some(topic) = topic_keyword_match(lower) {
        return topic;
    }
    if let Some(loc) = location {
        if let Some(topic) = topic_keyword_match(&loc.to_lowercase()) {
            return topic;
        }
    }
    TopicType::Practical
}

/// The raw keyword scan: Some(topic) only when a family actually matched.
/// Importance scoring uses this directly — a message with no topic marker
/// earns no topic bonus even though classification defaults to Practical.
pub fn topic_keyword_match(lower: &str) -> Option<TopicType> {
    TOPIC_RULES
        .iter()
        .find(|(markers, _)| contains_any(lower, markers))
        .map(|(_, topic)| *topic)
}

fn detect_mood(lower: &str) -> UserMood {
    MOOD_RULES
        .iter()
        .find(|(markers, _)| contains_any(lower, markers))
        .map(|(_, mood)| *mood)
        .unwrap_or(UserMood::Curious)
}

fn detect_urgency(lower: &str) -> Urgency {
    if contains_any(lower, URGENT_MARKERS) {
        Urgency::Critical
    } else if contains_any(lower, MODERATE_URGENCY_MARKERS) {
        Urgency::High
    } else if contains_any(lower, RELATIVE_TIME_MARKERS) {
        Urgency::Medium
    } else {
        Urgency::Low
    }
}

fn detect_complexity(lower: &str) -> Complexity {
    let words = lower.split_whitespace().count();
    if contains_any(lower, COMPLEX_MARKERS) || words > COMPLEX_WORD_COUNT {
        Complexity::Complex
    } else if words > MODERATE_WORD_COUNT {
        Complexity::Moderate
    } else {
        Complexity::Simple
    }
}

pub fn time_of_day_for_hour(hour: u32) -> TimeOfDay {
    match hour {
        5..=11 => TimeOfDay::Morning,
        12..=16 => TimeOfDay::Afternoon,
        17..=20 => TimeOfDay::Evening,
        _ => TimeOfDay::Night,
    }
}

fn contains_any(s: &str, terms: &[&str]) -> bool {
    terms.iter().any(|t| s.contains(t))
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_full_default_tuple() {
        let c = classify_at("", None, 9);
        assert_eq!(c.topic, TopicType::Practical);
        assert_eq!(c.mood, UserMood::Curious);
        assert_eq!(c.urgency, Urgency::Low);
        assert_eq!(c.complexity, Complexity::Simple);
        assert!(!c.requires_autonomy);
    }

    #[test]
    fn spiritual_beats_food_in_priority() {
        // Both families match; spiritual has higher priority.
        let c = classify_at("where can I eat near the temple", None, 9);
        assert_eq!(c.topic, TopicType::Spiritual);
    }

    #[test]
    fn food_beats_shopping_in_priority() {
        let c = classify_at("buy me some street food", None, 9);
        assert_eq!(c.topic, TopicType::Food);
    }

    #[test]
    fn urgent_keyword_is_critical() {
        let c = classify_at("this is urgent, I lost my passport", None, 9);
        assert_eq!(c.urgency, Urgency::Critical);
        assert!(c.requires_autonomy);
    }

    #[test]
    fn urgent_wins_over_moderate_family() {
        let c = classify_at("I need this quickly, it's an emergency", None, 9);
        assert_eq!(c.urgency, Urgency::Critical);
    }

    #[test]
    fn moderate_keyword_alone_is_high() {
        let c = classify_at("please answer quickly", None, 9);
        assert_eq!(c.urgency, Urgency::High);
        assert!(c.requires_autonomy);
    }

    #[test]
    fn relative_time_word_is_medium() {
        let c = classify_at("what should I see tomorrow", None, 9);
        assert_eq!(c.urgency, Urgency::Medium);
        assert!(!c.requires_autonomy);
    }

    #[test]
    fn urgent_booking_scenario_classifies_critical() {
        let c = classify_at("URGENT please book a hotel for tonight, I need it ASAP", None, 21);
        assert_eq!(c.urgency, Urgency::Critical);
        assert!(c.requires_autonomy);
    }

    #[test]
    fn planning_keyword_is_complex() {
        let c = classify_at("plan my itinerary", None, 9);
        assert_eq!(c.complexity, Complexity::Complex);
        assert!(c.requires_autonomy);
    }

    #[test]
    fn word_count_thresholds_drive_complexity() {
        let eleven = "one two three four five six seven eight nine ten eleven";
        assert_eq!(classify_at(eleven, None, 9).complexity, Complexity::Moderate);

        let long: String = (0..25).map(|i| format!("w{i} ")).collect();
        assert_eq!(classify_at(&long, None, 9).complexity, Complexity::Complex);

        assert_eq!(classify_at("short question", None, 9).complexity, Complexity::Simple);
    }

    #[test]
    fn mood_priority_tired_over_excited() {
        let c = classify_at("so excited but honestly exhausted", None, 9);
        assert_eq!(c.mood, UserMood::Tired);
    }

    #[test]
    fn hungry_mood_detected() {
        let c = classify_at("I'm starving", None, 13);
        assert_eq!(c.mood, UserMood::Hungry);
    }

    #[test]
    fn location_hint_supplies_topic_when_text_is_silent() {
        let c = classify_at("what is this place?", Some("Dashashwamedh Ghat"), 9);
        assert_eq!(c.topic, TopicType::Spiritual);
        // But the raw keyword scan over the text alone still reports no match.
        assert_eq!(topic_keyword_match("what is this place?"), None);
    }

    #[test]
    fn time_of_day_buckets() {
        assert_eq!(time_of_day_for_hour(6), TimeOfDay::Morning);
        assert_eq!(time_of_day_for_hour(13), TimeOfDay::Afternoon);
        assert_eq!(time_of_day_for_hour(18), TimeOfDay::Evening);
        assert_eq!(time_of_day_for_hour(23), TimeOfDay::Night);
        assert_eq!(time_of_day_for_hour(2), TimeOfDay::Night);
    }

    #[test]
    fn identical_input_identical_output() {
        let a = classify_at("show me the silk weaving workshops", None, 10);
        let b = classify_at("show me the silk weaving workshops", None, 10);
        assert_eq!(a.topic, b.topic);
        assert_eq!(a.mood, b.mood);
        assert_eq!(a.urgency, b.urgency);
        assert_eq!(a.complexity, b.complexity);
    }
}
