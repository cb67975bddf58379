// ── Sarathi Engine: Traveler Profile Aggregator ────────────────────────────
//
// Incrementally updates the per-session traveler profile from each classified
// message, and assembles the personalized prompt context for the generation
// collaborator.
//
// Update semantics:
//   • The profile is lazily created with defaults on first write — a missing
//     profile is never an error.
//   • Preference fields (travel style, spice level, budget, group size) are
//     keyword-matched and overwritten last-write-wins on every match. The
//     scans are independent and non-exclusive: one message can update several
//     fields. Flapping across a long conversation is accepted behavior (see
//     DESIGN.md).
//   • List fields (interests, avoidances, visited places) accumulate without
//     duplicates.
//   • Conversation-style flags are monotonic: once a heuristic fires, the
//     flag stays true for the life of the profile.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use log::debug;
use parking_lot::RwLock;

use crate::atoms::constants::CONTEXT_MEMORY_LIMIT;
use crate::atoms::error::EngineResult;
use crate::atoms::types::{
    BudgetRange, GroupSize, MessageClassification, Sentiment, SocialLevel, SpiceLevel,
    SpiritualStyle, TopicType, TravelStyle, UserMood, UserProfile,
};
use crate::engine::classifier::topic_keyword_match;
use crate::engine::memory::MemoryStore;

// ═══════════════════════════════════════════════════════════════════════════
// Preference Lexicons
// ═══════════════════════════════════════════════════════════════════════════

/// Ordered (family → value) tables; within one table the first match wins,
/// but the tables themselves are independent of each other.
const TRAVEL_STYLE_RULES: &[(&[&str], TravelStyle)] = &[
    (&["luxury", "five star", "premium", "comfort first"], TravelStyle::Luxury),
    (&["budget", "cheap", "affordable", "backpack"], TravelStyle::Budget),
    (&["adventure", "offbeat", "trek", "adrenaline"], TravelStyle::Adventure),
    (&["relax", "slow travel", "take it easy", "laid back"], TravelStyle::Relaxed),
];

// "not spicy" contains "spicy", so the mild family must be scanned first.
const SPICE_RULES: &[(&[&str], SpiceLevel)] = &[
    (&["not spicy", "no spice", "mild", "can't handle spice"], SpiceLevel::Mild),
    (&["medium spice", "some spice", "little spicy"], SpiceLevel::Medium),
    (&["spicy", "love spice", "extra hot", "more chili"], SpiceLevel::Spicy),
];

const BUDGET_RULES: &[(&[&str], BudgetRange)] = &[
    (&["shoestring", "very cheap", "tight budget"], BudgetRange::Shoestring),
    (&["mid-range", "reasonable price", "moderate budget"], BudgetRange::Moderate),
    (&["splurge", "money is no object", "high end"], BudgetRange::Premium),
];

const GROUP_RULES: &[(&[&str], GroupSize)] = &[
    (&["solo", "alone", "by myself"], GroupSize::Solo),
    (&["my wife", "my husband", "my partner", "couple", "honeymoon"], GroupSize::Couple),
    (&["family", "my kids", "children", "my parents"], GroupSize::Family),
    (&["friends", "our group", "group of"], GroupSize::Group),
];

const AVOIDANCE_MARKERS: &[&str] =
    &["avoid", "hate", "dislike", "allergic to", "scared of", "can't stand", "don't like"];

const STORY_MARKERS: &[&str] =
    &["story", "stories", "legend", "tell me about", "why do", "myth"];

const HUMOR_MARKERS: &[&str] = &["haha", "lol", "funny", "joke", "hilarious"];

const ADVENTUROUS_MARKERS: &[&str] =
    &["adventure", "try anything", "offbeat", "explore", "dare"];
const CAUTIOUS_MARKERS: &[&str] = &["safe", "careful", "comfortable", "familiar"];

const OUTGOING_MARKERS: &[&str] = &["meet people", "locals", "crowd", "festival", "together"];
const RESERVED_MARKERS: &[&str] = &["quiet", "peaceful", "away from crowds", "on my own"];

/// Messages longer than this, with positive sentiment, flip `prefers_detail`.
const DETAIL_MESSAGE_CHARS: usize = 120;

// ═══════════════════════════════════════════════════════════════════════════
// Repository Trait
// ═══════════════════════════════════════════════════════════════════════════

/// Session-keyed profile storage, injected like the memory repository.
pub trait ProfileRepository: Send + Sync {
    fn load(&self, session_id: &str) -> EngineResult<Option<UserProfile>>;
    fn save(&self, profile: &UserProfile) -> EngineResult<()>;
}

/// Single-node backend: a concurrent map of session → profile.
#[derive(Default)]
pub struct InMemoryProfiles {
    profiles: RwLock<HashMap<String, UserProfile>>,
}

impl InMemoryProfiles {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProfileRepository for InMemoryProfiles {
    fn load(&self, session_id: &str) -> EngineResult<Option<UserProfile>> {
        Ok(self.profiles.read().get(session_id).cloned())
    }

    fn save(&self, profile: &UserProfile) -> EngineResult<()> {
        self.profiles.write().insert(profile.session_id.clone(), profile.clone());
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Aggregator
// ═══════════════════════════════════════════════════════════════════════════

pub struct ProfileAggregator {
    repo: Arc<dyn ProfileRepository>,
}

impl ProfileAggregator {
    pub fn new(repo: Arc<dyn ProfileRepository>) -> Self {
        Self { repo }
    }

    /// Read-only view of a session's profile, if one exists yet.
    pub fn profile(&self, session_id: &str) -> EngineResult<Option<UserProfile>> {
        self.repo.load(session_id)
    }

    /// Fold one classified message into the session's profile.
    pub fn update(
        &self,
        session_id: &str,
        text: &str,
        classification: &MessageClassification,
        sentiment: Sentiment,
        location: Option<&str>,
    ) -> EngineResult<UserProfile> {
        let mut profile = self
            .repo
            .load(session_id)?
            .unwrap_or_else(|| UserProfile::new(session_id));
        let lower = text.to_lowercase();

        // ── Preference fields: last-write-wins on every match ──────────
        if let Some(style) = first_match(&lower, TRAVEL_STYLE_RULES) {
            profile.preferences.travel_style = Some(style);
        }
        if let Some(spice) = first_match(&lower, SPICE_RULES) {
            profile.preferences.spice_level = Some(spice);
        }
        if let Some(budget) = first_match(&lower, BUDGET_RULES) {
            profile.preferences.budget_range = Some(budget);
        }
        if let Some(group) = first_match(&lower, GROUP_RULES) {
            profile.preferences.group_size = Some(group);
        }

        // ── Accumulating lists ─────────────────────────────────────────
        if let Some(topic) = topic_keyword_match(&lower) {
            push_unique(&mut profile.preferences.interests, topic.name());
        }
        for avoidance in extract_avoidances(&lower) {
            push_unique(&mut profile.preferences.avoidances, &avoidance);
        }
        if let Some(loc) = location {
            push_unique(&mut profile.visited_places, loc);
        }

        // ── Emotional profile nudges ───────────────────────────────────
        if classification.topic == TopicType::Spiritual {
            match sentiment {
                Sentiment::Positive => {
                    profile.emotional_profile.spiritual_style = SpiritualStyle::Devout;
                }
                Sentiment::Negative => {
                    profile.emotional_profile.spiritual_style = SpiritualStyle::Observer;
                }
                Sentiment::Neutral => {}
            }
        }
        if contains_any(&lower, ADVENTUROUS_MARKERS) {
            profile.emotional_profile.adventurousness =
                (profile.emotional_profile.adventurousness + 0.1).min(1.0);
        }
        if contains_any(&lower, CAUTIOUS_MARKERS) {
            profile.emotional_profile.adventurousness =
                (profile.emotional_profile.adventurousness - 0.1).max(0.0);
        }
        if contains_any(&lower, OUTGOING_MARKERS) {
            profile.emotional_profile.social_level = SocialLevel::Outgoing;
        } else if contains_any(&lower, RESERVED_MARKERS) {
            profile.emotional_profile.social_level = SocialLevel::Reserved;
        }

        // ── Monotonic conversation-style flags ─────────────────────────
        if sentiment == Sentiment::Positive && text.chars().count() > DETAIL_MESSAGE_CHARS {
            profile.conversation_style.prefers_detail = true;
        }
        if sentiment == Sentiment::Positive && contains_any(&lower, STORY_MARKERS) {
            profile.conversation_style.enjoys_stories = true;
        }
        if contains_any(&lower, HUMOR_MARKERS) {
            profile.conversation_style.likes_humor = true;
        }
        if matches!(classification.mood, UserMood::Tired | UserMood::Overwhelmed) {
            profile.conversation_style.needs_encouragement = true;
        }

        profile.last_interaction = Utc::now();
        self.repo.save(&profile)?;
        debug!("[profile] updated session={session_id}");
        Ok(profile)
    }

    /// Pure read: profile summary plus up to three relevant memories,
    /// formatted as the personalization section of the generation prompt.
    pub fn personalized_context(
        &self,
        session_id: &str,
        topic: TopicType,
        memory: &MemoryStore,
    ) -> EngineResult<String> {
        let mut sections = Vec::new();

        if let Some(profile) = self.repo.load(session_id)? {
            sections.push(summarize_profile(&profile));
        }

        let memories = memory.retrieve(session_id, topic.name(), CONTEXT_MEMORY_LIMIT)?;
        if !memories.is_empty() {
            let lines: Vec<String> = memories
                .iter()
                .map(|m| format!("- Traveler: {} / Guide: {}", m.user_message, m.response))
                .collect();
            sections.push(format!("## Relevant Past Conversation\n{}", lines.join("\n")));
        }

        Ok(sections.join("\n\n"))
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Helpers
// ═══════════════════════════════════════════════════════════════════════════

fn summarize_profile(profile: &UserProfile) -> String {
    let mut lines = vec!["## Traveler Profile".to_string()];
    if let Some(style) = profile.preferences.travel_style {
        lines.push(format!("- Travel style: {style:?}"));
    }
    if let Some(spice) = profile.preferences.spice_level {
        lines.push(format!("- Spice tolerance: {spice:?}"));
    }
    if let Some(budget) = profile.preferences.budget_range {
        lines.push(format!("- Budget: {budget:?}"));
    }
    if let Some(group) = profile.preferences.group_size {
        lines.push(format!("- Traveling as: {group:?}"));
    }
    if !profile.preferences.interests.is_empty() {
        lines.push(format!("- Interests: {}", profile.preferences.interests.join(", ")));
    }
    if !profile.preferences.avoidances.is_empty() {
        lines.push(format!("- Avoid: {}", profile.preferences.avoidances.join(", ")));
    }
    if !profile.visited_places.is_empty() {
        lines.push(format!("- Already visited: {}", profile.visited_places.join(", ")));
    }
    let style = &profile.conversation_style;
    if style.prefers_detail {
        lines.push("- Likes detailed answers".to_string());
    }
    if style.enjoys_stories {
        lines.push("- Enjoys stories and legends".to_string());
    }
    if style.likes_humor {
        lines.push("- Appreciates light humor".to_string());
    }
    if style.needs_encouragement {
        lines.push("- Keep the tone gentle and encouraging".to_string());
    }
    lines.join("\n")
}

fn first_match<T: Copy>(lower: &str, rules: &[(&[&str], T)]) -> Option<T> {
    rules
        .iter()
        .find(|(markers, _)| contains_any(lower, markers))
        .map(|(_, value)| *value)
}

/// Grab up to three words following an avoidance marker, e.g.
/// "I'm allergic to peanuts" → "peanuts".
fn extract_avoidances(lower: &str) -> Vec<String> {
    let mut found = Vec::new();
    for marker in AVOIDANCE_MARKERS {
        if let Some(pos) = lower.find(marker) {
            let tail = lower[pos + marker.len()..]
                .split_whitespace()
                .take(3)
                .collect::<Vec<_>>()
                .join(" ");
            let tail = tail.trim_matches(|c: char| !c.is_alphanumeric() && c != ' ').to_string();
            if !tail.is_empty() {
                found.push(tail);
            }
        }
    }
    found
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|v| v.eq_ignore_ascii_case(value)) {
        list.push(value.to_string());
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
    use crate::engine::classifier::classify_at;
    use crate::engine::memory::{InMemoryRepository, MemoryStore};

    fn aggregator() -> ProfileAggregator {
        ProfileAggregator::new(Arc::new(InMemoryProfiles::new()))
    }

    fn update(agg: &ProfileAggregator, session: &str, text: &str) -> UserProfile {
        let c = classify_at(text, None, 9);
        let s = crate::engine::memory::sentiment_of(text);
        agg.update(session, text, &c, s, None).unwrap()
    }

    #[test]
    fn profile_is_lazily_created_with_defaults() {
        let agg = aggregator();
        assert!(agg.profile("s1").unwrap().is_none());
        let p = update(&agg, "s1", "hello");
        assert_eq!(p.session_id, "s1");
        assert!(p.preferences.travel_style.is_none());
        assert_eq!(p.emotional_profile.spiritual_style, SpiritualStyle::Curious);
        assert!(agg.profile("s1").unwrap().is_some());
    }

    #[test]
    fn preference_fields_are_last_write_wins() {
        let agg = aggregator();
        update(&agg, "s1", "I'm on a budget trip");
        let p = agg.profile("s1").unwrap().unwrap();
        assert_eq!(p.preferences.travel_style, Some(TravelStyle::Budget));

        update(&agg, "s1", "actually let's do luxury from here on");
        let p = agg.profile("s1").unwrap().unwrap();
        assert_eq!(p.preferences.travel_style, Some(TravelStyle::Luxury));
    }

    #[test]
    fn not_spicy_maps_to_mild() {
        let agg = aggregator();
        let p = update(&agg, "s1", "please nothing too spicy, actually not spicy at all");
        assert_eq!(p.preferences.spice_level, Some(SpiceLevel::Mild));
    }

    #[test]
    fn one_message_can_update_several_fields() {
        let agg = aggregator();
        let p = update(&agg, "s1", "traveling solo on a budget and I love spicy food");
        assert_eq!(p.preferences.group_size, Some(GroupSize::Solo));
        assert_eq!(p.preferences.travel_style, Some(TravelStyle::Budget));
        assert_eq!(p.preferences.spice_level, Some(SpiceLevel::Spicy));
        assert!(p.preferences.interests.contains(&"food".to_string()));
    }

    #[test]
    fn interests_accumulate_without_duplicates() {
        let agg = aggregator();
        update(&agg, "s1", "tell me about the temple");
        update(&agg, "s1", "another temple question");
        update(&agg, "s1", "where to eat chaat");
        let p = agg.profile("s1").unwrap().unwrap();
        assert_eq!(p.preferences.interests, vec!["spiritual".to_string(), "food".to_string()]);
    }

    #[test]
    fn avoidances_capture_the_object() {
        let agg = aggregator();
        let p = update(&agg, "s1", "I'm allergic to peanuts");
        assert!(
            p.preferences.avoidances.iter().any(|a| a.contains("peanuts")),
            "avoidances={:?}",
            p.preferences.avoidances
        );
    }

    #[test]
    fn conversation_flags_are_monotonic() {
        let agg = aggregator();
        update(&agg, "s1", "haha that's a great joke");
        let p = agg.profile("s1").unwrap().unwrap();
        assert!(p.conversation_style.likes_humor);

        // A later plain message must not reset the flag.
        update(&agg, "s1", "ok");
        let p = agg.profile("s1").unwrap().unwrap();
        assert!(p.conversation_style.likes_humor);
    }

    #[test]
    fn tired_mood_sets_needs_encouragement() {
        let agg = aggregator();
        let p = update(&agg, "s1", "I'm exhausted from walking all day");
        assert!(p.conversation_style.needs_encouragement);
    }

    #[test]
    fn story_interest_with_positive_sentiment_sets_flag() {
        let agg = aggregator();
        let p = update(&agg, "s1", "I loved that legend, tell me about another story");
        assert!(p.conversation_style.enjoys_stories);
    }

    #[test]
    fn spiritual_enthusiasm_shifts_spiritual_style() {
        let agg = aggregator();
        let p = update(&agg, "s1", "the morning aarti was absolutely beautiful, thank you");
        assert_eq!(p.emotional_profile.spiritual_style, SpiritualStyle::Devout);
    }

    #[test]
    fn personalized_context_combines_profile_and_memories() {
        let agg = aggregator();
        let memory = MemoryStore::new(Arc::new(InMemoryRepository::new()));
        update(&agg, "s1", "I love spicy street food");

        memory
            .append(crate::atoms::types::MemoryCandidate {
                session_id: "s1".into(),
                user_message: "best kachori in the old city?".into(),
                response: "try the shop near the crossing".into(),
                location: None,
                mood: UserMood::Hungry,
                topic: TopicType::Food,
                timestamp: None,
            })
            .unwrap();

        let ctx = agg.personalized_context("s1", TopicType::Food, &memory).unwrap();
        assert!(ctx.contains("Traveler Profile"), "ctx={ctx}");
        assert!(ctx.contains("Relevant Past Conversation"), "ctx={ctx}");
        assert!(ctx.contains("kachori"), "ctx={ctx}");
    }

    #[test]
    fn personalized_context_is_read_only() {
        let agg = aggregator();
        let memory = MemoryStore::new(Arc::new(InMemoryRepository::new()));
        let ctx = agg.personalized_context("fresh", TopicType::Practical, &memory).unwrap();
        assert!(ctx.is_empty());
        // No profile was created by the read.
        assert!(agg.profile("fresh").unwrap().is_none());
    }
}
