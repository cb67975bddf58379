// ── Sarathi Engine: Emotional State Engine ─────────────────────────────────
//
// Maps classified context to the reply's emotional register, then to voice
// modulation and speech markup. Stateless per turn: nothing is remembered
// between turns beyond what the turn pipeline embeds in stored entries.
//
// Derivation is an ordered rule list; later rules override earlier ones.
// The order is load-bearing for reproducible fixtures — do not reorder:
//   1. topic → base state (fixed lookup table)
//   2. location mentions temple/ghat → reverent, intensity capped at 0.6
//   3. excitement markers → excited, intensity raised to ≥ 0.8
//   4. calm markers → calm, intensity 0.5
//   5. mood excited → intensity raised to ≥ 0.7, energy high
//   6. mood tired → empathetic, intensity 0.6
//
// `derive_state` is pure. The randomized flourish helper lives behind
// `RandomSource` and never feeds back into state derivation.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::atoms::types::{
    Emotion, EmotionalState, EnergyLevel, SpeechPitch, SpeechRate, SpeechVolume, TopicType,
    UserMood, VoiceModulation,
};

// ═══════════════════════════════════════════════════════════════════════════
// Marker Lexicons
// ═══════════════════════════════════════════════════════════════════════════

const EXCITEMENT_MARKERS: &[&str] = &["amazing", "incredible", "wow"];
const CALM_MARKERS: &[&str] = &["peaceful", "calm", "serene"];

/// Per-emotion emphasis keywords, wrapped verbatim (case-insensitive) in the
/// reply markup.
fn emphasis_keywords(emotion: Emotion) -> &'static [&'static str] {
    match emotion {
        Emotion::Reverent => &["sacred", "ancient", "divine", "holy", "eternal"],
        Emotion::Enthusiastic => &["delicious", "famous", "flavors", "must-try"],
        Emotion::Nostalgic => &["centuries", "legend", "once", "history"],
        Emotion::Warm => &["welcome", "wonderful", "beautiful"],
        Emotion::Excited => &["amazing", "incredible", "fantastic", "wow"],
        Emotion::Calm => &["peaceful", "gently", "quiet", "serene"],
        Emotion::Empathetic => &["rest", "comfort", "easy", "gentle"],
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// State Derivation
// ═══════════════════════════════════════════════════════════════════════════

/// Base emotional register per topic.
fn topic_base(topic: TopicType) -> EmotionalState {
    match topic {
        TopicType::Spiritual => EmotionalState {
            primary: Emotion::Reverent,
            intensity: 0.7,
            energy: EnergyLevel::Low,
            warmth: 0.8,
        },
        TopicType::Food => EmotionalState {
            primary: Emotion::Enthusiastic,
            intensity: 0.8,
            energy: EnergyLevel::High,
            warmth: 0.9,
        },
        TopicType::History => EmotionalState {
            primary: Emotion::Nostalgic,
            intensity: 0.6,
            energy: EnergyLevel::Medium,
            warmth: 0.7,
        },
        TopicType::Culture => EmotionalState {
            primary: Emotion::Warm,
            intensity: 0.7,
            energy: EnergyLevel::Medium,
            warmth: 0.8,
        },
        TopicType::Shopping => EmotionalState {
            primary: Emotion::Excited,
            intensity: 0.6,
            energy: EnergyLevel::High,
            warmth: 0.7,
        },
        // Practical questions get the default register (EmotionalState's
        // Default impl is the table's final row).
        TopicType::Practical => EmotionalState::default(),
    }
}

/// Derive the emotional state for one turn. Pure: identical inputs always
/// produce identical output.
pub fn derive_state(
    topic: TopicType,
    location: Option<&str>,
    text: &str,
    mood: UserMood,
) -> EmotionalState {
    let mut state = topic_base(topic);

    // Rule 2: sacred locations quieten everything, whatever the topic.
    if let Some(loc) = location {
        let loc = loc.to_lowercase();
        if loc.contains("temple") || loc.contains("ghat") {
            state.primary = Emotion::Reverent;
            state.intensity = state.intensity.min(0.6);
            state.energy = EnergyLevel::Low;
        }
    }

    let lower = text.to_lowercase();

    // Rule 3: explicit excitement in the message.
    if contains_any(&lower, EXCITEMENT_MARKERS) {
        state.primary = Emotion::Excited;
        state.intensity = state.intensity.max(0.8);
        state.energy = EnergyLevel::High;
    }

    // Rule 4: explicit calm in the message.
    if contains_any(&lower, CALM_MARKERS) {
        state.primary = Emotion::Calm;
        state.intensity = 0.5;
        state.energy = EnergyLevel::Low;
    }

    // Rules 5–6: the traveler's mood has the final word.
    if mood == UserMood::Excited {
        state.intensity = state.intensity.max(0.7);
        state.energy = EnergyLevel::High;
    }
    if mood == UserMood::Tired {
        state.primary = Emotion::Empathetic;
        state.intensity = 0.6;
        state.energy = EnergyLevel::Low;
    }

    state
}

// ═══════════════════════════════════════════════════════════════════════════
// Voice Modulation
// ═══════════════════════════════════════════════════════════════════════════

/// Fixed modulation table keyed by primary emotion. Excited escalates rate
/// once intensity passes 0.7.
pub fn modulation_for(state: &EmotionalState) -> VoiceModulation {
    match state.primary {
        Emotion::Reverent => VoiceModulation {
            rate: SpeechRate::Slow,
            pitch: SpeechPitch::Low,
            volume: SpeechVolume::Soft,
        },
        Emotion::Enthusiastic => VoiceModulation {
            rate: SpeechRate::Medium,
            pitch: SpeechPitch::High,
            volume: SpeechVolume::Medium,
        },
        Emotion::Nostalgic => VoiceModulation {
            rate: SpeechRate::Slow,
            pitch: SpeechPitch::Medium,
            volume: SpeechVolume::Medium,
        },
        Emotion::Warm => VoiceModulation {
            rate: SpeechRate::Medium,
            pitch: SpeechPitch::Medium,
            volume: SpeechVolume::Medium,
        },
        Emotion::Excited => VoiceModulation {
            rate: if state.intensity > 0.7 { SpeechRate::Fast } else { SpeechRate::Medium },
            pitch: SpeechPitch::High,
            volume: SpeechVolume::Loud,
        },
        Emotion::Calm => VoiceModulation {
            rate: SpeechRate::Slow,
            pitch: SpeechPitch::Medium,
            volume: SpeechVolume::Soft,
        },
        Emotion::Empathetic => VoiceModulation {
            rate: SpeechRate::Slow,
            pitch: SpeechPitch::Medium,
            volume: SpeechVolume::Soft,
        },
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Speech Markup
// ═══════════════════════════════════════════════════════════════════════════

/// Emphasis + pauses for the voice collaborator, driven by the primary
/// emotion.
pub fn speech_markup(text: &str, emotion: Emotion) -> String {
    insert_pauses(&apply_emphasis(text, emotion), emotion)
}

/// Wrap every occurrence of the emotion's emphasis keywords in
/// `<emphasis>` tags. Matching is case-insensitive; the original casing is
/// preserved inside the tag. Overlapping matches keep the earliest.
pub fn apply_emphasis(text: &str, emotion: Emotion) -> String {
    let lower = text.to_lowercase();
    // Byte offsets below index into the original text; bail out when
    // lowercasing changed the length (non-ASCII case folding).
    if lower.len() != text.len() {
        return text.to_string();
    }
    let mut ranges: Vec<(usize, usize)> = Vec::new();
    for keyword in emphasis_keywords(emotion) {
        let mut from = 0;
        while let Some(pos) = lower[from..].find(keyword) {
            let start = from + pos;
            ranges.push((start, start + keyword.len()));
            from = start + keyword.len();
        }
    }
    if ranges.is_empty() {
        return text.to_string();
    }

    ranges.sort_unstable();
    let mut out = String::with_capacity(text.len() + ranges.len() * 24);
    let mut cursor = 0;
    for (start, end) in ranges {
        if start < cursor {
            continue; // overlaps an already-wrapped match
        }
        out.push_str(&text[cursor..start]);
        out.push_str("<emphasis>");
        out.push_str(&text[start..end]);
        out.push_str("</emphasis>");
        cursor = end;
    }
    out.push_str(&text[cursor..]);
    out
}

/// Insert a `<break>` after sentence punctuation. Reverent and calm replies
/// breathe longest; excited ones barely pause.
pub fn insert_pauses(text: &str, emotion: Emotion) -> String {
    let pause_ms = match emotion {
        Emotion::Reverent | Emotion::Calm => 800,
        Emotion::Excited => 200,
        _ => 400,
    };
    let marker = format!("<break time=\"{pause_ms}ms\"/>");

    let mut out = String::with_capacity(text.len() + 64);
    for ch in text.chars() {
        out.push(ch);
        if matches!(ch, '.' | '!' | '?') {
            out.push_str(&marker);
        }
    }
    out
}

// ═══════════════════════════════════════════════════════════════════════════
// Phrase Variation (isolated from the deterministic path)
// ═══════════════════════════════════════════════════════════════════════════

/// Injectable randomness for phrasing helpers. The scoring/state-derivation
/// path never touches this, so fixtures stay reproducible.
pub trait RandomSource: Send + Sync {
    /// Pick an index in `0..len`. `len` is at least 1.
    fn pick(&self, len: usize) -> usize;
}

/// Production source, seeded from the OS.
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    pub fn new() -> Self {
        Self { rng: Mutex::new(StdRng::from_entropy()) }
    }

    /// Fixed seed, for reproducing a phrasing sequence.
    pub fn with_seed(seed: u64) -> Self {
        Self { rng: Mutex::new(StdRng::seed_from_u64(seed)) }
    }
}

impl Default for SeededRandom {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomSource for SeededRandom {
    fn pick(&self, len: usize) -> usize {
        self.rng.lock().gen_range(0..len)
    }
}

/// Always picks the same index; used by tests and by hosts that want the
/// phrasing disabled-but-stable.
pub struct FixedRandom(pub usize);

impl RandomSource for FixedRandom {
    fn pick(&self, len: usize) -> usize {
        self.0.min(len - 1)
    }
}

/// A short spoken flourish matching the emotional register, prepended to
/// voiced replies when phrase variation is enabled.
pub fn flourish(emotion: Emotion, random: &dyn RandomSource) -> &'static str {
    let options: &[&str] = match emotion {
        Emotion::Reverent => &["Softly now —", "In this sacred place,", "With reverence,"],
        Emotion::Enthusiastic => &["Oh, you're in for a treat!", "Wonderful choice!"],
        Emotion::Nostalgic => &["Ah, that takes us back.", "There's a story here."],
        Emotion::Warm => &["Of course.", "Gladly.", "Happy to help."],
        Emotion::Excited => &["Oh, fantastic!", "Yes!", "You'll love this."],
        Emotion::Calm => &["Take a breath.", "Gently, then."],
        Emotion::Empathetic => &["I hear you.", "Let's take it slow."],
    };
    options[random.pick(options.len())]
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
    fn practical_topic_gets_default_register() {
        let s = derive_state(TopicType::Practical, None, "hello", UserMood::Curious);
        assert_eq!(s, EmotionalState::default());
    }

    #[test]
    fn spiritual_topic_is_reverent_low_energy() {
        let s = derive_state(TopicType::Spiritual, None, "tell me", UserMood::Curious);
        assert_eq!(s.primary, Emotion::Reverent);
        assert_eq!(s.energy, EnergyLevel::Low);
    }

    #[test]
    fn temple_location_caps_intensity_regardless_of_topic() {
        for topic in [
            TopicType::Food,
            TopicType::Shopping,
            TopicType::History,
            TopicType::Practical,
        ] {
            let s = derive_state(topic, Some("Kashi Vishwanath Temple"), "tell me", UserMood::Curious);
            assert_eq!(s.primary, Emotion::Reverent, "topic {topic:?}");
            assert!(s.intensity <= 0.6, "topic {topic:?} intensity {}", s.intensity);
            assert_eq!(s.energy, EnergyLevel::Low);
        }
    }

    #[test]
    fn ghat_location_also_triggers_reverence() {
        let s = derive_state(TopicType::Food, Some("Manikarnika Ghat"), "ok", UserMood::Curious);
        assert_eq!(s.primary, Emotion::Reverent);
    }

    #[test]
    fn excitement_markers_override_location_reverence() {
        // Rule 3 runs after rule 2, so the marker wins.
        let s = derive_state(
            TopicType::Spiritual,
            Some("Assi Ghat"),
            "wow this is amazing",
            UserMood::Curious,
        );
        assert_eq!(s.primary, Emotion::Excited);
        assert!(s.intensity >= 0.8);
        assert_eq!(s.energy, EnergyLevel::High);
    }

    #[test]
    fn calm_markers_override_excitement_markers() {
        let s = derive_state(
            TopicType::Practical,
            None,
            "amazing but so peaceful here",
            UserMood::Curious,
        );
        assert_eq!(s.primary, Emotion::Calm);
        assert!((s.intensity - 0.5).abs() < f32::EPSILON);
        assert_eq!(s.energy, EnergyLevel::Low);
    }

    #[test]
    fn excited_mood_raises_intensity_floor() {
        let s = derive_state(TopicType::Practical, None, "what next", UserMood::Excited);
        assert!(s.intensity >= 0.7);
        assert_eq!(s.energy, EnergyLevel::High);
    }

    #[test]
    fn tired_mood_has_the_final_word() {
        let s = derive_state(
            TopicType::Food,
            None,
            "this is amazing but I'm beat",
            UserMood::Tired,
        );
        assert_eq!(s.primary, Emotion::Empathetic);
        assert!((s.intensity - 0.6).abs() < f32::EPSILON);
        assert_eq!(s.energy, EnergyLevel::Low);
    }

    #[test]
    fn derivation_is_pure() {
        let a = derive_state(TopicType::Culture, Some("silk market"), "lovely silk", UserMood::Peaceful);
        let b = derive_state(TopicType::Culture, Some("silk market"), "lovely silk", UserMood::Peaceful);
        assert_eq!(a, b);
    }

    #[test]
    fn state_fields_stay_in_range() {
        for topic in [
            TopicType::Spiritual,
            TopicType::Food,
            TopicType::History,
            TopicType::Culture,
            TopicType::Shopping,
            TopicType::Practical,
        ] {
            for mood in [
                UserMood::Curious,
                UserMood::Tired,
                UserMood::Excited,
                UserMood::Overwhelmed,
                UserMood::Peaceful,
                UserMood::Hungry,
            ] {
                let s = derive_state(topic, Some("temple"), "wow amazing and calm", mood);
                assert!((0.0..=1.0).contains(&s.intensity));
                assert!((0.0..=1.0).contains(&s.warmth));
            }
        }
    }

    #[test]
    fn excited_rate_escalates_with_intensity() {
        let mut state = EmotionalState {
            primary: Emotion::Excited,
            intensity: 0.6,
            energy: EnergyLevel::High,
            warmth: 0.7,
        };
        assert_eq!(modulation_for(&state).rate, SpeechRate::Medium);
        state.intensity = 0.9;
        assert_eq!(modulation_for(&state).rate, SpeechRate::Fast);
    }

    #[test]
    fn reverent_modulation_is_slow_and_soft() {
        let state = derive_state(TopicType::Spiritual, None, "tell me", UserMood::Curious);
        let m = modulation_for(&state);
        assert_eq!(m.rate, SpeechRate::Slow);
        assert_eq!(m.volume, SpeechVolume::Soft);
    }

    #[test]
    fn emphasis_wraps_verbatim_case_insensitively() {
        let out = apply_emphasis("The Sacred river. SACRED indeed.", Emotion::Reverent);
        assert!(out.contains("<emphasis>Sacred</emphasis>"), "out={out}");
        assert!(out.contains("<emphasis>SACRED</emphasis>"), "out={out}");
    }

    #[test]
    fn emphasis_leaves_unrelated_text_untouched() {
        let text = "Just a plain sentence";
        assert_eq!(apply_emphasis(text, Emotion::Reverent), text);
    }

    #[test]
    fn pauses_depend_on_emotion() {
        assert!(insert_pauses("Rest here.", Emotion::Reverent).contains("800ms"));
        assert!(insert_pauses("Go go go!", Emotion::Excited).contains("200ms"));
        assert!(insert_pauses("Noted.", Emotion::Warm).contains("400ms"));
    }

    #[test]
    fn fixed_random_gives_stable_flourish() {
        let random = FixedRandom(0);
        let a = flourish(Emotion::Warm, &random);
        let b = flourish(Emotion::Warm, &random);
        assert_eq!(a, b);
    }

    #[test]
    fn seeded_random_is_reproducible() {
        let a = SeededRandom::with_seed(7);
        let b = SeededRandom::with_seed(7);
        for emotion in [Emotion::Warm, Emotion::Excited, Emotion::Calm] {
            assert_eq!(flourish(emotion, &a), flourish(emotion, &b));
        }
    }
}
