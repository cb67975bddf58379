// ── Sarathi Engine: Goal & Tool Orchestrator ───────────────────────────────
//
// Given a classified message, optionally synthesizes a templated goal and
// autonomously executes the tool calls proposed by the generation
// collaborator. Execution is gated strictly: proposed calls run only when
// urgency is High or Critical; otherwise they are ignored and nothing is
// recorded.
//
// Failure semantics: every tool invocation is attempted independently. A
// failing handler is caught and recorded as `executed=false` with the error
// as reason — it never propagates and never aborts sibling invocations.

use std::time::Duration;

use log::{info, warn};
use serde_json::json;

use crate::atoms::constants::{
    CONFIDENCE_BASE, CONFIDENCE_FALLBACK, CONFIDENCE_LOCATION, CONFIDENCE_LOW_URGENCY,
    CONFIDENCE_SIMPLE, CONFIDENCE_TOOL_EXECUTED,
};
use crate::atoms::types::{
    AgentGoal, AutonomousAction, Complexity, GoalContext, GoalPriority, GoalStatus,
    MessageClassification, ProposedToolCall, TopicType, Urgency,
};
use crate::engine::tools::ToolDispatcher;

// ═══════════════════════════════════════════════════════════════════════════
// Goal Templates & Transitions
// ═══════════════════════════════════════════════════════════════════════════

const BOOKING_MARKERS: &[&str] = &["book", "reserve", "reservation", "ticket", "ride", "hotel"];

impl AgentGoal {
    /// Trip-planning template. Steps are fixed; there is no dynamic step
    /// generation.
    pub fn trip_planning(focus: TopicType, days: u32) -> Self {
        AgentGoal {
            id: uuid::Uuid::new_v4().to_string(),
            objective: format!("Plan a {days}-day visit focused on {}", focus.name()),
            priority: GoalPriority::Normal,
            status: GoalStatus::Pending,
            steps: vec![
                "Gather traveler preferences and constraints".into(),
                "Draft a day-by-day outline".into(),
                "Check timings for key places".into(),
                "Confirm the plan with the traveler".into(),
            ],
            current_step: 0,
            context: GoalContext::TripPlanning { focus, days },
        }
    }

    /// Urgent-booking template.
    pub fn urgent_booking(service: &str, deadline: Option<String>) -> Self {
        AgentGoal {
            id: uuid::Uuid::new_v4().to_string(),
            objective: format!("Complete an urgent {service} booking"),
            priority: GoalPriority::High,
            status: GoalStatus::Pending,
            steps: vec![
                "Identify booking options".into(),
                "Execute the booking tool".into(),
                "Confirm details with the traveler".into(),
            ],
            current_step: 0,
            context: GoalContext::UrgentBooking { service: service.to_string(), deadline },
        }
    }

    /// Move to the next step, entering InProgress on the first advance and
    /// Completed once every step is done. `current_step` never exceeds the
    /// step count.
    pub fn advance_step(&mut self) {
        if matches!(self.status, GoalStatus::Completed | GoalStatus::Failed) {
            return;
        }
        if self.current_step < self.steps.len() {
            self.current_step += 1;
        }
        self.status = if self.current_step >= self.steps.len() {
            GoalStatus::Completed
        } else {
            GoalStatus::InProgress
        };
    }

    /// Mark the goal failed. Terminal states never regress.
    pub fn fail(&mut self) {
        if !matches!(self.status, GoalStatus::Completed) {
            self.status = GoalStatus::Failed;
        }
    }
}

/// Synthesize a goal from the fixed templates, if the message calls for one.
/// Urgent booking wins over trip planning when both would apply.
pub fn synthesize_goal(
    classification: &MessageClassification,
    text: &str,
) -> Option<AgentGoal> {
    if !classification.requires_autonomy {
        return None;
    }
    let lower = text.to_lowercase();
    if classification.urgency >= Urgency::High && contains_any(&lower, BOOKING_MARKERS) {
        let service = if lower.contains("hotel") {
            "hotel"
        } else if lower.contains("ride") || lower.contains("taxi") {
            "ride"
        } else {
            "booking"
        };
        return Some(AgentGoal::urgent_booking(service, None));
    }
    if classification.complexity == Complexity::Complex {
        return Some(AgentGoal::trip_planning(classification.topic, 1));
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
// Orchestrator
// ═══════════════════════════════════════════════════════════════════════════

/// Result of the orchestration stage of one turn.
#[derive(Debug, Clone)]
pub struct OrchestratorOutcome {
    pub actions: Vec<AutonomousAction>,
    pub goal: Option<AgentGoal>,
    pub confidence: f32,
    pub next_steps: Vec<String>,
    pub proactive_actions: Vec<String>,
}

pub struct Orchestrator {
    dispatcher: ToolDispatcher,
    tool_timeout: Duration,
}

impl Orchestrator {
    pub fn new(dispatcher: ToolDispatcher, tool_timeout: Duration) -> Self {
        Self { dispatcher, tool_timeout }
    }

    /// Run the orchestration stage: synthesize a goal, execute proposed tool
    /// calls (when gated in), and score confidence.
    pub async fn run(
        &self,
        classification: &MessageClassification,
        text: &str,
        has_location: bool,
        proposed: &[ProposedToolCall],
    ) -> OrchestratorOutcome {
        let mut goal = synthesize_goal(classification, text);

        let actions = if classification.urgency >= Urgency::High {
            self.execute_all(proposed).await
        } else {
            // Below the urgency gate: proposed calls are ignored and no
            // action is recorded.
            Vec::new()
        };

        let any_executed = actions.iter().any(|a| a.executed);
        if any_executed {
            if let Some(g) = goal.as_mut() {
                g.advance_step();
            }
        }

        let confidence = confidence_score(classification, has_location, any_executed);

        OrchestratorOutcome {
            next_steps: next_steps(classification.topic),
            proactive_actions: proactive_actions(classification.urgency),
            actions,
            goal,
            confidence,
        }
    }

    /// Fixed response shape used when the generation collaborator failed:
    /// empty action/goal lists and fallback confidence. The branded reply
    /// text itself comes from config.
    pub fn fallback_outcome() -> OrchestratorOutcome {
        OrchestratorOutcome {
            actions: Vec::new(),
            goal: None,
            confidence: CONFIDENCE_FALLBACK,
            next_steps: Vec::new(),
            proactive_actions: Vec::new(),
        }
    }

    /// Attempt every proposed call, recording one action per attempt.
    async fn execute_all(&self, proposed: &[ProposedToolCall]) -> Vec<AutonomousAction> {
        let mut actions = Vec::with_capacity(proposed.len());
        for call in proposed {
            actions.push(self.execute_one(call).await);
        }
        actions
    }

    async fn execute_one(&self, call: &ProposedToolCall) -> AutonomousAction {
        let Some(handler) = self.dispatcher.handler(&call.name) else {
            warn!("[orchestrator] proposed unknown tool '{}'", call.name);
            return AutonomousAction {
                action: call.name.clone(),
                reason: "tool is not registered".into(),
                executed: false,
            };
        };

        info!("[orchestrator] executing tool {} args={}", call.name, call.arguments);
        let args = if call.arguments.is_null() { json!({}) } else { call.arguments.clone() };

        // Spawned as its own task: if the caller abandons the turn mid-flight,
        // a dispatched invocation still runs to completion and is logged for
        // audit, even though no reply will be delivered.
        let name = call.name.clone();
        let task = tokio::spawn(async move {
            let result = handler.invoke(&args).await;
            match &result {
                Ok(_) => info!("[orchestrator] tool {name} completed"),
                Err(e) => warn!("[orchestrator] tool {name} failed: {e}"),
            }
            result
        });

        match tokio::time::timeout(self.tool_timeout, task).await {
            Ok(Ok(Ok(result))) => AutonomousAction {
                action: call.name.clone(),
                reason: truncate(&result.to_string(), 200),
                executed: true,
            },
            Ok(Ok(Err(e))) => AutonomousAction {
                action: call.name.clone(),
                reason: e.to_string(),
                executed: false,
            },
            Ok(Err(join_err)) => AutonomousAction {
                action: call.name.clone(),
                reason: format!("tool task aborted: {join_err}"),
                executed: false,
            },
            Err(_) => {
                warn!(
                    "[orchestrator] tool {} timed out after {:?}",
                    call.name, self.tool_timeout
                );
                AutonomousAction {
                    action: call.name.clone(),
                    reason: format!("timed out after {:?}", self.tool_timeout),
                    executed: false,
                }
            }
        }
    }
}

/// 0.5 base + 0.2 any tool executed + 0.1 location + 0.1 simple message +
/// 0.1 low urgency, clamped to 1.0.
pub fn confidence_score(
    classification: &MessageClassification,
    has_location: bool,
    any_executed: bool,
) -> f32 {
    let mut confidence = CONFIDENCE_BASE;
    if any_executed {
        confidence += CONFIDENCE_TOOL_EXECUTED;
    }
    if has_location {
        confidence += CONFIDENCE_LOCATION;
    }
    if classification.complexity == Complexity::Simple {
        confidence += CONFIDENCE_SIMPLE;
    }
    if classification.urgency == Urgency::Low {
        confidence += CONFIDENCE_LOW_URGENCY;
    }
    confidence.clamp(0.0, 1.0)
}

/// Fixed follow-up suggestions keyed by topic.
fn next_steps(topic: TopicType) -> Vec<String> {
    let steps: &[&str] = match topic {
        TopicType::Spiritual => &[
            "Ask about the evening Ganga aarti",
            "Plan a sunrise boat ride along the ghats",
        ],
        TopicType::Food => &[
            "Ask for a street-food walking route",
            "Check which stalls are open right now",
        ],
        TopicType::History => &["Ask about the Sarnath excavations", "Visit the fort museum"],
        TopicType::Culture => &[
            "Ask about a silk-weaving workshop visit",
            "Check for evening classical concerts",
        ],
        TopicType::Shopping => &["Ask for bargaining tips", "Locate the government emporium"],
        TopicType::Practical => &["Share your location for nearby help", "Ask for a day plan"],
    };
    steps.iter().map(|s| s.to_string()).collect()
}

/// Fixed proactive suggestions keyed by urgency.
fn proactive_actions(urgency: Urgency) -> Vec<String> {
    let actions: &[&str] = match urgency {
        Urgency::Critical => &[
            "Keep your phone reachable — I'll confirm as soon as the booking lands",
        ],
        Urgency::High => &["I can hold options for you while you decide"],
        Urgency::Medium => &["I can set a reminder closer to the time"],
        Urgency::Low => &["I can sketch a relaxed plan for the rest of the day"],
    };
    actions.iter().map(|s| s.to_string()).collect()
}

fn contains_any(s: &str, terms: &[&str]) -> bool {
    terms.iter().any(|t| s.contains(t))
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &s[..end])
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::error::{EngineError, EngineResult};
    use crate::engine::classifier::classify_at;
    use crate::engine::tools::ToolHandler;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::Arc;

    struct FailingTool;

    #[async_trait]
    impl ToolHandler for FailingTool {
        async fn invoke(&self, _args: &Value) -> EngineResult<Value> {
            Err(EngineError::tool("failing_tool", "backend unavailable"))
        }
    }

    fn orchestrator() -> Orchestrator {
        Orchestrator::new(ToolDispatcher::with_builtins(), Duration::from_secs(5))
    }

    fn call(name: &str, args: Value) -> ProposedToolCall {
        ProposedToolCall { name: name.into(), arguments: args }
    }

    #[tokio::test]
    async fn low_urgency_ignores_proposed_calls() {
        let orch = orchestrator();
        let c = classify_at("what a nice day", None, 9);
        assert_eq!(c.urgency, Urgency::Low);

        let proposed = vec![call("search_hotels", serde_json::json!({ "area": "Chowk" }))];
        let out = orch.run(&c, "what a nice day", false, &proposed).await;
        assert!(out.actions.is_empty(), "no action may be recorded below the gate");
    }

    #[tokio::test]
    async fn critical_urgency_executes_proposed_calls() {
        let orch = orchestrator();
        let text = "URGENT please book a hotel for tonight, I need it ASAP";
        let c = classify_at(text, None, 21);
        assert_eq!(c.urgency, Urgency::Critical);
        assert!(c.requires_autonomy);

        let proposed = vec![call("search_hotels", serde_json::json!({ "area": "Godowlia" }))];
        let out = orch.run(&c, text, false, &proposed).await;
        assert_eq!(out.actions.len(), 1);
        let action = &out.actions[0];
        assert_eq!(action.action, "search_hotels");
        assert!(action.executed, "reason={}", action.reason);
        assert!(!action.reason.is_empty());
    }

    #[tokio::test]
    async fn failing_tool_is_recorded_not_propagated() {
        let mut dispatcher = ToolDispatcher::with_builtins();
        dispatcher.register("failing_tool", Arc::new(FailingTool));
        let orch = Orchestrator::new(dispatcher, Duration::from_secs(5));

        let text = "book this immediately";
        let c = classify_at(text, None, 9);
        let proposed = vec![
            call("failing_tool", serde_json::json!({})),
            call("get_directions", serde_json::json!({ "to": "Assi Ghat" })),
        ];
        let out = orch.run(&c, text, false, &proposed).await;

        assert_eq!(out.actions.len(), 2);
        assert!(!out.actions[0].executed);
        assert!(out.actions[0].reason.contains("backend unavailable"));
        // The sibling invocation still ran.
        assert!(out.actions[1].executed);
    }

    #[tokio::test]
    async fn unknown_tool_records_unexecuted_action() {
        let orch = orchestrator();
        let text = "need a ride asap";
        let c = classify_at(text, None, 9);
        let proposed = vec![call("teleport", serde_json::json!({}))];
        let out = orch.run(&c, text, false, &proposed).await;
        assert_eq!(out.actions.len(), 1);
        assert!(!out.actions[0].executed);
        assert!(out.actions[0].reason.contains("not registered"));
    }

    #[tokio::test]
    async fn confidence_stacks_and_clamps() {
        let c = classify_at("hi", None, 9); // simple + low urgency
        assert!((confidence_score(&c, true, true) - 1.0).abs() < f32::EPSILON);
        assert!((confidence_score(&c, false, false) - 0.7).abs() < 1e-6);

        let complex = classify_at(
            "please plan my entire itinerary immediately with everything included",
            None,
            9,
        );
        // Critical urgency + complex: only base + location apply.
        assert!((confidence_score(&complex, true, false) - 0.6).abs() < 1e-6);
    }

    #[test]
    fn urgent_booking_template_wins_over_trip_planning() {
        let text = "urgent: book a hotel and plan my week";
        let c = classify_at(text, None, 9);
        let goal = synthesize_goal(&c, text).expect("goal expected");
        assert!(matches!(goal.context, GoalContext::UrgentBooking { .. }));
        assert_eq!(goal.priority, GoalPriority::High);
        assert_eq!(goal.status, GoalStatus::Pending);
    }

    #[test]
    fn complex_message_without_urgency_plans_a_trip() {
        let text = "help me plan a full itinerary for temples and food";
        let c = classify_at(text, None, 9);
        assert_eq!(c.urgency, Urgency::Low);
        let goal = synthesize_goal(&c, text).expect("goal expected");
        assert!(matches!(goal.context, GoalContext::TripPlanning { .. }));
    }

    #[test]
    fn simple_calm_message_gets_no_goal() {
        let c = classify_at("hello", None, 9);
        assert!(synthesize_goal(&c, "hello").is_none());
    }

    #[test]
    fn goal_transitions_are_forward_only() {
        let mut goal = AgentGoal::urgent_booking("hotel", None);
        assert_eq!(goal.status, GoalStatus::Pending);

        goal.advance_step();
        assert_eq!(goal.status, GoalStatus::InProgress);
        assert_eq!(goal.current_step, 1);

        goal.advance_step();
        goal.advance_step();
        assert_eq!(goal.status, GoalStatus::Completed);
        assert_eq!(goal.current_step, goal.steps.len());

        // Terminal: neither further advances nor failure regress the status.
        goal.advance_step();
        assert_eq!(goal.current_step, goal.steps.len());
        goal.fail();
        assert_eq!(goal.status, GoalStatus::Completed);
    }

    #[test]
    fn failed_goal_stays_failed() {
        let mut goal = AgentGoal::trip_planning(TopicType::Food, 2);
        goal.fail();
        assert_eq!(goal.status, GoalStatus::Failed);
        goal.advance_step();
        assert_eq!(goal.status, GoalStatus::Failed);
        assert_eq!(goal.current_step, 0);
    }

    #[test]
    fn fallback_outcome_is_empty_with_fixed_confidence() {
        let out = Orchestrator::fallback_outcome();
        assert!(out.actions.is_empty());
        assert!(out.goal.is_none());
        assert!((out.confidence - 0.3).abs() < f32::EPSILON);
    }
}
