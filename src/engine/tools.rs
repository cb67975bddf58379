// ── Sarathi Engine: Tool Registry & Dispatch ───────────────────────────────
//
// Static descriptors for the guide's tools plus the dispatch table that maps
// a tool name to its handler. Adding a tool takes a registry entry and a
// handler registration — the orchestrator's gating/audit logic never changes.
//
// Handlers here are the built-in local implementations the assistant ships
// with: deterministic lookups over curated data. Hosts can register their own
// handlers (e.g. a live booking API) under the same names.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::types::ToolDefinition;

// ═══════════════════════════════════════════════════════════════════════════
// Registry
// ═══════════════════════════════════════════════════════════════════════════

impl ToolDefinition {
    /// Search hotels near a location, optionally bounded by budget.
    pub fn search_hotels() -> Self {
        ToolDefinition {
            name: "search_hotels".into(),
            description: "Search for hotels and guesthouses near a location. \
                          Returns names, areas, and indicative nightly prices."
                .into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "area": {
                        "type": "string",
                        "description": "Neighborhood or landmark to search around"
                    },
                    "max_price": {
                        "type": "number",
                        "description": "Maximum nightly price in rupees"
                    }
                },
                "required": ["area"]
            }),
        }
    }

    /// Find restaurants and street-food stalls by dish or area.
    pub fn find_restaurants() -> Self {
        ToolDefinition {
            name: "find_restaurants".into(),
            description: "Find restaurants and street-food spots by dish or area.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "dish": {
                        "type": "string",
                        "description": "Dish or cuisine the traveler wants"
                    },
                    "area": {
                        "type": "string",
                        "description": "Neighborhood to search in"
                    }
                },
                "required": []
            }),
        }
    }

    /// Walking/boat directions between two landmarks.
    pub fn get_directions() -> Self {
        ToolDefinition {
            name: "get_directions".into(),
            description: "Get walking or boat directions between two landmarks in the old city."
                .into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "from": { "type": "string", "description": "Starting landmark" },
                    "to": { "type": "string", "description": "Destination landmark" }
                },
                "required": ["to"]
            }),
        }
    }

    /// Opening hours and ritual timings for major temples.
    pub fn check_temple_timings() -> Self {
        ToolDefinition {
            name: "check_temple_timings".into(),
            description: "Check darshan and aarti timings for a temple or ghat.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "place": { "type": "string", "description": "Temple or ghat name" }
                },
                "required": ["place"]
            }),
        }
    }

    /// Request an auto-rickshaw or cab pickup.
    pub fn book_ride() -> Self {
        ToolDefinition {
            name: "book_ride".into(),
            description: "Book an auto-rickshaw or cab from the traveler's location.".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "pickup": { "type": "string", "description": "Pickup point" },
                    "destination": { "type": "string", "description": "Where to go" }
                },
                "required": ["pickup", "destination"]
            }),
        }
    }
}

/// The static registry shown to the generation collaborator.
pub fn builtin_tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::search_hotels(),
        ToolDefinition::find_restaurants(),
        ToolDefinition::get_directions(),
        ToolDefinition::check_temple_timings(),
        ToolDefinition::book_ride(),
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
// Dispatch
// ═══════════════════════════════════════════════════════════════════════════

/// One invocable tool. Implementations doing real I/O should respect the
/// orchestrator's timeout (they are awaited inside `tokio::time::timeout`).
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn invoke(&self, args: &Value) -> EngineResult<Value>;
}

/// Name → handler dispatch table.
#[derive(Default)]
pub struct ToolDispatcher {
    handlers: HashMap<String, Arc<dyn ToolHandler>>,
}

impl ToolDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispatcher with every built-in handler registered.
    pub fn with_builtins() -> Self {
        let mut d = Self::new();
        d.register("search_hotels", Arc::new(SearchHotels));
        d.register("find_restaurants", Arc::new(FindRestaurants));
        d.register("get_directions", Arc::new(GetDirections));
        d.register("check_temple_timings", Arc::new(CheckTempleTimings));
        d.register("book_ride", Arc::new(BookRide));
        d
    }

    pub fn register(&mut self, name: &str, handler: Arc<dyn ToolHandler>) {
        self.handlers.insert(name.to_string(), handler);
    }

    pub fn handler(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.handlers.get(name).cloned()
    }

    pub fn has(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Built-in Handlers
// ═══════════════════════════════════════════════════════════════════════════

struct SearchHotels;

#[async_trait]
impl ToolHandler for SearchHotels {
    async fn invoke(&self, args: &Value) -> EngineResult<Value> {
        let area = required_str(args, "area", "search_hotels")?;
        let max_price = args["max_price"].as_f64().unwrap_or(f64::MAX);

        let all = [
            ("Ganga View Guesthouse", "Assi Ghat", 1800.0),
            ("Old City Haveli", "Chowk", 3200.0),
            ("Riverside Palace", "Dashashwamedh", 5600.0),
            ("Pilgrim's Rest", "Godowlia", 900.0),
        ];
        let hits: Vec<Value> = all
            .iter()
            .filter(|(_, _, price)| *price <= max_price)
            .map(|(name, hood, price)| {
                json!({ "name": name, "area": hood, "price_per_night": price })
            })
            .collect();

        Ok(json!({ "area": area, "results": hits }))
    }
}

struct FindRestaurants;

#[async_trait]
impl ToolHandler for FindRestaurants {
    async fn invoke(&self, args: &Value) -> EngineResult<Value> {
        let dish = args["dish"].as_str().unwrap_or("").to_lowercase();
        let all = [
            ("Kashi Chaat Bhandar", "chaat", "Godowlia"),
            ("Blue Lassi Shop", "lassi", "near Manikarnika"),
            ("Ram Bhandar", "kachori", "Thatheri Bazaar"),
            ("Baati Chokha", "thali", "Teliyabagh"),
        ];
        let hits: Vec<Value> = all
            .iter()
            .filter(|(_, speciality, _)| dish.is_empty() || dish.contains(speciality))
            .map(|(name, speciality, area)| {
                json!({ "name": name, "known_for": speciality, "area": area })
            })
            .collect();
        Ok(json!({ "results": hits }))
    }
}

struct GetDirections;

#[async_trait]
impl ToolHandler for GetDirections {
    async fn invoke(&self, args: &Value) -> EngineResult<Value> {
        let to = required_str(args, "to", "get_directions")?;
        let from = args["from"].as_str().unwrap_or("your current location");
        Ok(json!({
            "from": from,
            "to": to,
            "summary": format!(
                "From {from}, follow the riverfront lane along the ghats toward {to}; \
                 most landmarks in the old city are within a 20-minute walk."
            ),
        }))
    }
}

struct CheckTempleTimings;

#[async_trait]
impl ToolHandler for CheckTempleTimings {
    async fn invoke(&self, args: &Value) -> EngineResult<Value> {
        let place = required_str(args, "place", "check_temple_timings")?.to_lowercase();
        let timings = if place.contains("vishwanath") {
            json!({ "darshan": "04:00–23:00", "mangala_aarti": "03:00", "sandhya_aarti": "19:00" })
        } else if place.contains("ghat") {
            json!({ "open": "always", "ganga_aarti": "18:45" })
        } else {
            json!({ "darshan": "05:00–21:00" })
        };
        Ok(json!({ "place": place, "timings": timings }))
    }
}

struct BookRide;

#[async_trait]
impl ToolHandler for BookRide {
    async fn invoke(&self, args: &Value) -> EngineResult<Value> {
        let pickup = required_str(args, "pickup", "book_ride")?;
        let destination = required_str(args, "destination", "book_ride")?;
        Ok(json!({
            "status": "requested",
            "pickup": pickup,
            "destination": destination,
            "eta_minutes": 8,
        }))
    }
}

fn required_str<'a>(args: &'a Value, key: &str, tool: &str) -> EngineResult<&'a str> {
    args[key]
        .as_str()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| EngineError::tool(tool, format!("missing required argument '{key}'")))
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════
