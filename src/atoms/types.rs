// ── Sarathi Atoms: Pure Data Types ─────────────────────────────────────────
// All plain struct/enum definitions with no I/O and no engine imports.
// Structs live here; behavior lives in engine/ impl blocks and free
// functions (classifier, scoring, emotion tables, goal transitions).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════════
// SECTION 1: Message Classification
// ═══════════════════════════════════════════════════════════════════════════

/// Conversation topic, detected by a fixed-priority keyword scan.
/// Priority order when several families match:
///   spiritual > food > history > culture > shopping > practical.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TopicType {
    Spiritual,
    Food,
    History,
    Culture,
    Shopping,
    #[default]
    Practical,
}

impl TopicType {
    /// Stable lowercase name, used in prompts and profile interest lists.
    pub fn name(&self) -> &'static str {
        match self {
            TopicType::Spiritual => "spiritual",
            TopicType::Food => "food",
            TopicType::History => "history",
            TopicType::Culture => "culture",
            TopicType::Shopping => "shopping",
            TopicType::Practical => "practical",
        }
    }
}

/// The traveler's apparent mood, detected from the message text.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserMood {
    #[default]
    Curious,
    Tired,
    Excited,
    Overwhelmed,
    Peaceful,
    Hungry,
}

/// Message urgency. Ordering is meaningful: autonomous tool execution is
/// gated on `urgency >= High`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Critical,
}

/// Coarse message complexity, from keyword families and word count.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    Moderate,
    Complex,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
    Night,
}

/// Message sentiment from a positive/negative marker scan.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    #[default]
    Neutral,
}

/// Full classification tuple for one incoming message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageClassification {
    pub topic: TopicType,
    pub mood: UserMood,
    pub urgency: Urgency,
    pub complexity: Complexity,
    pub time_of_day: TimeOfDay,
    /// True when urgency is High/Critical or complexity is Complex —
    /// the gate for goal synthesis and autonomous tool execution.
    pub requires_autonomy: bool,
}

// ═══════════════════════════════════════════════════════════════════════════
// SECTION 2: Memory Entries
// ═══════════════════════════════════════════════════════════════════════════

/// Derived context stored alongside a conversation turn.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntryContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub mood: UserMood,
    pub topic: TopicType,
    pub sentiment: Sentiment,
    /// Interest tags accumulated for this turn (topic names).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interests: Vec<String>,
}

/// One recorded conversation turn. Created once per turn; immutable except
/// for removal during retention pruning; owned by its session's entry list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub id: String,
    pub session_id: String,
    pub user_message: String,
    pub response: String,
    pub timestamp: DateTime<Utc>,
    pub context: EntryContext,
    /// Bag-of-words hash embedding (EMBEDDING_DIM), L2-normalized.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,
    /// Heuristic retention/retrieval value, always clipped to [0, 1].
    pub importance: f32,
}

/// Input to `MemoryStore::append`. The store derives sentiment, interests,
/// importance, and the embedding; the classification fields come from the
/// classifier so the two stay consistent within a turn.
#[derive(Debug, Clone)]
pub struct MemoryCandidate {
    pub session_id: String,
    pub user_message: String,
    pub response: String,
    pub location: Option<String>,
    pub mood: UserMood,
    pub topic: TopicType,
    /// Override for tests; `None` means "now".
    pub timestamp: Option<DateTime<Utc>>,
}

// ═══════════════════════════════════════════════════════════════════════════
// SECTION 3: Traveler Profile
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TravelStyle {
    Luxury,
    Budget,
    Adventure,
    Relaxed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SpiceLevel {
    Mild,
    Medium,
    Spicy,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BudgetRange {
    Shoestring,
    Moderate,
    Premium,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GroupSize {
    Solo,
    Couple,
    Family,
    Group,
}

/// Stated travel preferences. Keyword-matched fields are overwritten
/// last-write-wins on every match; list fields accumulate without duplicates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub travel_style: Option<TravelStyle>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interests: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub avoidances: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spice_level: Option<SpiceLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_range: Option<BudgetRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_size: Option<GroupSize>,
}

/// How the traveler responds to spiritual sites and experiences.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SpiritualStyle {
    Devout,
    Curious,
    Observer,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SocialLevel {
    Reserved,
    Moderate,
    Outgoing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmotionalProfile {
    pub spiritual_style: SpiritualStyle,
    pub social_level: SocialLevel,
    /// 0.0 (stays on the beaten path) to 1.0 (will try anything).
    pub adventurousness: f32,
}

impl Default for EmotionalProfile {
    fn default() -> Self {
        Self {
            spiritual_style: SpiritualStyle::Curious,
            social_level: SocialLevel::Moderate,
            adventurousness: 0.5,
        }
    }
}

/// Conversation-style flags. Monotonic: once a heuristic fires the flag is
/// set true and never reset for the life of the profile.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ConversationStyle {
    pub prefers_detail: bool,
    pub enjoys_stories: bool,
    pub likes_humor: bool,
    pub needs_encouragement: bool,
}

/// Per-session traveler profile. One per session, lazily created on first
/// write, mutated incrementally, never explicitly deleted by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub session_id: String,
    pub preferences: Preferences,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub visited_places: Vec<String>,
    pub emotional_profile: EmotionalProfile,
    pub conversation_style: ConversationStyle,
    pub last_interaction: DateTime<Utc>,
}

impl UserProfile {
    /// Fresh default profile for a session.
    pub fn new(session_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            preferences: Preferences::default(),
            visited_places: Vec::new(),
            emotional_profile: EmotionalProfile::default(),
            conversation_style: ConversationStyle::default(),
            last_interaction: Utc::now(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// SECTION 4: Emotional State & Voice Modulation
// ═══════════════════════════════════════════════════════════════════════════

/// Primary emotional register of the reply.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Reverent,
    Enthusiastic,
    Nostalgic,
    Warm,
    Excited,
    Calm,
    Empathetic,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EnergyLevel {
    Low,
    Medium,
    High,
}

/// Derived {primary, intensity, energy, warmth} tuple guiding reply tone.
/// Recomputed every turn; never persisted standalone — only embedded in a
/// memory entry's context via the turn pipeline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct EmotionalState {
    pub primary: Emotion,
    /// Always within [0, 1].
    pub intensity: f32,
    pub energy: EnergyLevel,
    /// Always within [0, 1].
    pub warmth: f32,
}

impl Default for EmotionalState {
    fn default() -> Self {
        Self {
            primary: Emotion::Warm,
            intensity: 0.5,
            energy: EnergyLevel::Medium,
            warmth: 0.7,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SpeechRate {
    Slow,
    Medium,
    Fast,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SpeechPitch {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SpeechVolume {
    Soft,
    Medium,
    Loud,
}

/// Pacing/emphasis directives handed to the voice collaborator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct VoiceModulation {
    pub rate: SpeechRate,
    pub pitch: SpeechPitch,
    pub volume: SpeechVolume,
}

/// Opaque handle to synthesized audio returned by the voice collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioHandle {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

// ═══════════════════════════════════════════════════════════════════════════
// SECTION 5: Goals & Tools
// ═══════════════════════════════════════════════════════════════════════════

/// Goal lifecycle. Transitions are forward-only:
/// Pending → InProgress → (Completed | Failed). Enforced in engine code.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum GoalPriority {
    Low,
    Normal,
    High,
}

/// Goal-kind-specific context. Each variant carries only the fields that
/// goal template actually uses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GoalContext {
    TripPlanning {
        focus: TopicType,
        days: u32,
    },
    UrgentBooking {
        service: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        deadline: Option<String>,
    },
}

/// A templated multi-step plan the orchestrator may track for
/// complex or urgent requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentGoal {
    pub id: String,
    pub objective: String,
    pub priority: GoalPriority,
    pub status: GoalStatus,
    pub steps: Vec<String>,
    /// Invariant: `current_step <= steps.len()`.
    pub current_step: usize,
    pub context: GoalContext,
}

/// Static descriptor for a registered tool. The parameter schema is a JSON
/// schema object (name/type/required), matching what the generation
/// collaborator is shown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// A tool call proposed by the generation collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposedToolCall {
    pub name: String,
    pub arguments: serde_json::Value,
}

/// Audit record of one attempted autonomous tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutonomousAction {
    pub action: String,
    pub reason: String,
    pub executed: bool,
}

// ═══════════════════════════════════════════════════════════════════════════
// SECTION 6: Collaborator Messages & Turn Outcome
// ═══════════════════════════════════════════════════════════════════════════

/// Request sent to the generation collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub system_prompt: String,
    pub user_message: String,
}

/// Reply from the generation collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationReply {
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ProposedToolCall>,
}

/// Everything one turn produces for the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnOutcome {
    /// Plain reply text shown to the traveler.
    pub reply: String,
    /// Reply with emphasis/pause markup for the voice collaborator.
    pub speech_markup: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioHandle>,
    pub classification: MessageClassification,
    pub emotional_state: EmotionalState,
    pub modulation: VoiceModulation,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub autonomous_actions: Vec<AutonomousAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<AgentGoal>,
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub next_steps: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub proactive_actions: Vec<String>,
    /// True when the branded fallback replaced a failed generation call.
    pub fallback_used: bool,
}
