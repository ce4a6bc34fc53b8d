//! Validation of inbound match configuration payloads

use std::collections::HashSet;

use reqwest::Url;
use serde::Serialize;
use serde_json::{Map, Value};

use super::geometry::Coordinate;
use super::models::{MatchConfig, MatchSetup, PlayerPosition, PlayerSetup};

/// One rule broken by a configuration payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    /// Dotted path to the offending field, e.g. `setup.edgeLength`
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SetupError {
    #[error("invalid match configuration ({} violation(s))", .violations.len())]
    InvalidConfiguration { violations: Vec<FieldViolation> },
}

impl SetupError {
    pub fn violations(&self) -> &[FieldViolation] {
        match self {
            SetupError::InvalidConfiguration { violations } => violations,
        }
    }

    fn single(field: &str, message: impl Into<String>) -> Self {
        SetupError::InvalidConfiguration {
            violations: vec![FieldViolation {
                field: field.to_string(),
                message: message.into(),
            }],
        }
    }
}

/// Collects schema violations while walking the payload
#[derive(Default)]
struct SchemaCheck {
    violations: Vec<FieldViolation>,
}

impl SchemaCheck {
    fn push(&mut self, field: &str, message: impl Into<String>) {
        self.violations.push(FieldViolation {
            field: field.to_string(),
            message: message.into(),
        });
    }

    fn integer(
        &mut self,
        parent: &Map<String, Value>,
        key: &str,
        path: &str,
        min: i64,
        required: bool,
    ) -> Option<i64> {
        match parent.get(key) {
            None | Some(Value::Null) => {
                if required {
                    self.push(path, "is required");
                }
                None
            }
            Some(value) => match value.as_i64() {
                Some(n) if n >= min => Some(n),
                Some(_) => {
                    self.push(path, format!("must be an integer >= {min}"));
                    None
                }
                None => {
                    self.push(path, "must be an integer");
                    None
                }
            },
        }
    }

    fn name(&mut self, parent: &Map<String, Value>, path: &str) -> Option<String> {
        match parent.get("name").and_then(Value::as_str) {
            Some(name) if !name.trim().is_empty() => Some(name.to_string()),
            Some(_) => {
                self.push(path, "must not be empty");
                None
            }
            None => {
                self.push(path, "is required and must be a string");
                None
            }
        }
    }

    fn endpoint(&mut self, parent: &Map<String, Value>, path: &str) -> Option<String> {
        let Some(raw) = parent.get("endpoint").and_then(Value::as_str) else {
            self.push(path, "is required and must be a string");
            return None;
        };

        match Url::parse(raw) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {
                Some(raw.to_string())
            }
            Ok(_) => {
                self.push(path, "must be an http(s) URL");
                None
            }
            Err(e) => {
                self.push(path, format!("is not a valid URL: {e}"));
                None
            }
        }
    }
}

fn check_players(check: &mut SchemaCheck, root: &Map<String, Value>) -> Vec<PlayerSetup> {
    let Some(raw_players) = root.get("players").and_then(Value::as_array) else {
        check.push("players", "is required and must be an array");
        return Vec::new();
    };

    if raw_players.is_empty() {
        check.push("players", "must contain at least one player");
    }

    let mut players = Vec::with_capacity(raw_players.len());
    for (i, raw) in raw_players.iter().enumerate() {
        let Some(entry) = raw.as_object() else {
            check.push(&format!("players[{i}]"), "must be an object");
            continue;
        };
        let name = check.name(entry, &format!("players[{i}].name"));
        let endpoint = check.endpoint(entry, &format!("players[{i}].endpoint"));
        if let (Some(name), Some(endpoint)) = (name, endpoint) {
            players.push(PlayerSetup { name, endpoint });
        }
    }
    players
}

fn check_start_positions(
    check: &mut SchemaCheck,
    raw: &Value,
    edge_length: Option<i64>,
) -> Vec<PlayerPosition> {
    let Some(raw_positions) = raw.as_array() else {
        check.push("setup.startPositions", "must be an array");
        return Vec::new();
    };

    let mut positions = Vec::with_capacity(raw_positions.len());
    for (i, raw) in raw_positions.iter().enumerate() {
        let path = format!("setup.startPositions[{i}]");
        let Some(entry) = raw.as_object() else {
            check.push(&path, "must be an object");
            continue;
        };

        let name = check.name(entry, &format!("{path}.name"));
        let mut axes = [0i64; 3];
        let mut complete = true;
        for (slot, axis) in axes.iter_mut().zip(["x", "y", "z"]) {
            let axis_path = format!("{path}.{axis}");
            match check.integer(entry, axis, &axis_path, 0, true) {
                Some(v) => {
                    if edge_length.is_some_and(|edge| v >= edge) {
                        check.push(&axis_path, "must lie inside the cube");
                        complete = false;
                    }
                    *slot = v;
                }
                None => complete = false,
            }
        }

        if let (Some(name), true) = (name, complete) {
            let [x, y, z] = axes;
            positions.push(PlayerPosition::new(name, Coordinate::new(x, y, z)));
        }
    }
    positions
}

/// Validate an untyped match request.
///
/// Schema problems are reported together; the roster rules that follow
/// (unique names, start position coverage, cube capacity) stop at the
/// first failure.
pub fn validate_match_config(payload: &Value) -> Result<MatchConfig, SetupError> {
    let Some(root) = payload.as_object() else {
        return Err(SetupError::single("", "configuration must be an object"));
    };

    let mut check = SchemaCheck::default();

    let setup = root.get("setup").and_then(Value::as_object);
    if setup.is_none() {
        check.push("setup", "is required and must be an object");
    }

    let mut edge_length = None;
    let mut tasks_per_tick = None;
    let mut tick_delay_ms = None;
    let mut max_ticks = None;
    let mut start_positions = None;

    if let Some(setup) = setup {
        edge_length = check.integer(setup, "edgeLength", "setup.edgeLength", 1, true);
        if edge_length.is_some_and(|edge| u32::try_from(edge).is_err()) {
            check.push("setup.edgeLength", "is too large");
            edge_length = None;
        }
        tasks_per_tick = check.integer(setup, "tasksPerTick", "setup.tasksPerTick", 1, true);
        if tasks_per_tick.is_some_and(|n| u32::try_from(n).is_err()) {
            check.push("setup.tasksPerTick", "is too large");
            tasks_per_tick = None;
        }
        tick_delay_ms = check.integer(setup, "tickDelayMs", "setup.tickDelayMs", 0, false);
        max_ticks = check.integer(setup, "maxTicks", "setup.maxTicks", 1, false);
        start_positions = setup
            .get("startPositions")
            .filter(|v| !v.is_null())
            .map(|raw| check_start_positions(&mut check, raw, edge_length));
    }

    let players = check_players(&mut check, root);

    if !check.violations.is_empty() {
        return Err(SetupError::InvalidConfiguration {
            violations: check.violations,
        });
    }

    // Schema passed, so the required numbers are present
    let (Some(edge_length), Some(tasks_per_tick)) = (edge_length, tasks_per_tick) else {
        return Err(SetupError::single("setup", "is incomplete"));
    };

    let mut seen = HashSet::new();
    if let Some(duplicate) = players.iter().find(|p| !seen.insert(p.name.as_str())) {
        return Err(SetupError::single(
            "players",
            format!("all player names must be unique ({:?} appears more than once)", duplicate.name),
        ));
    }

    if let Some(positions) = &start_positions {
        let position_names: HashSet<&str> = positions.iter().map(|p| p.name.as_str()).collect();
        if positions.len() != players.len() || position_names != seen {
            return Err(SetupError::single(
                "setup.startPositions",
                "must give exactly one start position for every player",
            ));
        }
    }

    let capacity = u128::from(edge_length as u64).pow(3);
    if players.len() as u128 > capacity {
        return Err(SetupError::single(
            "players",
            format!("too many players for a cube with edge length {edge_length}"),
        ));
    }

    Ok(MatchConfig {
        setup: MatchSetup {
            edge_length: edge_length as u32,
            tick_delay_ms: tick_delay_ms.unwrap_or(0) as u64,
            tasks_per_tick: tasks_per_tick as u32,
            max_ticks: max_ticks.map(|n| n as u64),
            start_positions,
        },
        players,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base_payload() -> Value {
        json!({
            "setup": { "edgeLength": 8, "tasksPerTick": 1 },
            "players": [
                { "name": "John", "endpoint": "http://localhost:4001" },
                { "name": "Petra", "endpoint": "http://localhost:4002" }
            ]
        })
    }

    fn fields(err: &SetupError) -> Vec<&str> {
        err.violations().iter().map(|v| v.field.as_str()).collect()
    }

    #[test]
    fn test_valid_config_with_defaults() {
        let config = validate_match_config(&base_payload()).unwrap();
        assert_eq!(config.setup.edge_length, 8);
        assert_eq!(config.setup.tasks_per_tick, 1);
        assert_eq!(config.setup.tick_delay_ms, 0);
        assert_eq!(config.setup.max_ticks, None);
        assert!(config.setup.start_positions.is_none());
        assert_eq!(config.players.len(), 2);
        assert_eq!(config.players[1].name, "Petra");
    }

    #[test]
    fn test_schema_violations_are_field_level() {
        let payload = json!({
            "setup": { "edgeLength": 0, "tasksPerTick": 1.5, "tickDelayMs": -1 },
            "players": [
                { "name": "", "endpoint": "not a url" }
            ]
        });

        let err = validate_match_config(&payload).unwrap_err();
        let names = fields(&err);
        assert!(names.contains(&"setup.edgeLength"));
        assert!(names.contains(&"setup.tasksPerTick"));
        assert!(names.contains(&"setup.tickDelayMs"));
        assert!(names.contains(&"players[0].name"));
        assert!(names.contains(&"players[0].endpoint"));
    }

    #[test]
    fn test_missing_sections() {
        let err = validate_match_config(&json!({})).unwrap_err();
        let names = fields(&err);
        assert!(names.contains(&"setup"));
        assert!(names.contains(&"players"));

        let err = validate_match_config(&json!({
            "setup": { "edgeLength": 4, "tasksPerTick": 1 },
            "players": []
        }))
        .unwrap_err();
        assert_eq!(fields(&err), vec!["players"]);

        assert!(validate_match_config(&json!("nope")).is_err());
    }

    #[test]
    fn test_rejects_duplicate_names() {
        let mut payload = base_payload();
        payload["players"][1]["name"] = json!("John");

        let err = validate_match_config(&payload).unwrap_err();
        assert_eq!(fields(&err), vec!["players"]);
        assert!(err.violations()[0].message.contains("unique"));
    }

    #[test]
    fn test_start_positions_must_cover_roster() {
        let mut payload = base_payload();
        payload["setup"]["startPositions"] = json!([
            { "name": "John", "x": 0, "y": 0, "z": 0 }
        ]);
        let err = validate_match_config(&payload).unwrap_err();
        assert_eq!(fields(&err), vec!["setup.startPositions"]);

        payload["setup"]["startPositions"] = json!([
            { "name": "John", "x": 0, "y": 0, "z": 0 },
            { "name": "Stranger", "x": 1, "y": 0, "z": 0 }
        ]);
        assert!(validate_match_config(&payload).is_err());

        payload["setup"]["startPositions"] = json!([
            { "name": "John", "x": 0, "y": 0, "z": 0 },
            { "name": "Petra", "x": 0, "y": 0, "z": 1 }
        ]);
        let config = validate_match_config(&payload).unwrap();
        let positions = config.setup.start_positions.unwrap();
        assert_eq!(positions[1].coordinate, Coordinate::new(0, 0, 1));
    }

    #[test]
    fn test_start_positions_must_be_inside_cube() {
        let mut payload = base_payload();
        payload["setup"]["startPositions"] = json!([
            { "name": "John", "x": 8, "y": 0, "z": 0 },
            { "name": "Petra", "x": 0, "y": -1, "z": 0 }
        ]);
        let err = validate_match_config(&payload).unwrap_err();
        let names = fields(&err);
        assert!(names.contains(&"setup.startPositions[0].x"));
        assert!(names.contains(&"setup.startPositions[1].y"));
    }

    #[test]
    fn test_cube_capacity() {
        let payload = json!({
            "setup": { "edgeLength": 1, "tasksPerTick": 1 },
            "players": [
                { "name": "A", "endpoint": "http://a.local" },
                { "name": "B", "endpoint": "http://b.local" }
            ]
        });
        let err = validate_match_config(&payload).unwrap_err();
        assert!(err.violations()[0].message.contains("too many players"));

        let payload = json!({
            "setup": { "edgeLength": 1, "tasksPerTick": 1 },
            "players": [{ "name": "A", "endpoint": "http://a.local" }]
        });
        assert!(validate_match_config(&payload).is_ok());
    }

    #[test]
    fn test_optional_fields() {
        let mut payload = base_payload();
        payload["setup"]["tickDelayMs"] = json!(250);
        payload["setup"]["maxTicks"] = json!(100);
        let config = validate_match_config(&payload).unwrap();
        assert_eq!(config.setup.tick_delay_ms, 250);
        assert_eq!(config.setup.max_ticks, Some(100));

        payload["setup"]["maxTicks"] = json!(0);
        let err = validate_match_config(&payload).unwrap_err();
        assert_eq!(fields(&err), vec!["setup.maxTicks"]);
    }
}
