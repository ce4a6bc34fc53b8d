//! Bot decisions and their validation

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::geometry::Direction;

/// One task a bot asks the engine to perform this tick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "task", rename_all = "UPPERCASE")]
pub enum Decision {
    /// Step one cell
    Move { direction: Direction },
    /// Drop a bomb at any cell
    Bomb { x: i64, y: i64, z: i64 },
    /// Stay put
    Noop {},
}

/// Reasons a decision payload is refused
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("validation failed: {0}")]
    Malformed(String),

    #[error("validation failed: expected {expected} decisions, got {actual}")]
    WrongTaskCount { expected: u32, actual: usize },
}

/// Fields each decision shape may carry besides `task`
fn allowed_fields(task: &str) -> Option<&'static [&'static str]> {
    match task {
        "MOVE" => Some(&["direction"]),
        "BOMB" => Some(&["x", "y", "z"]),
        "NOOP" => Some(&[]),
        _ => None,
    }
}

fn parse_decision(index: usize, raw: &Value) -> Result<Decision, ValidationError> {
    let object = raw
        .as_object()
        .ok_or_else(|| ValidationError::Malformed(format!("decision {index} is not an object")))?;

    let task = object
        .get("task")
        .and_then(Value::as_str)
        .ok_or_else(|| ValidationError::Malformed(format!("decision {index} has no task")))?;

    let fields = allowed_fields(task).ok_or_else(|| {
        ValidationError::Malformed(format!("decision {index} has unknown task {task:?}"))
    })?;

    if let Some(extra) = object
        .keys()
        .find(|key| key.as_str() != "task" && !fields.contains(&key.as_str()))
    {
        return Err(ValidationError::Malformed(format!(
            "decision {index} ({task}) has unexpected field {extra:?}"
        )));
    }

    serde_json::from_value(raw.clone())
        .map_err(|e| ValidationError::Malformed(format!("decision {index} ({task}): {e}")))
}

/// Turn a raw bot response into exactly `tasks_per_tick` typed decisions
pub fn validate_decisions(
    payload: &Value,
    tasks_per_tick: u32,
) -> Result<Vec<Decision>, ValidationError> {
    let items = payload
        .as_array()
        .ok_or_else(|| ValidationError::Malformed("expected an array of decisions".to_string()))?;

    let decisions = items
        .iter()
        .enumerate()
        .map(|(index, raw)| parse_decision(index, raw))
        .collect::<Result<Vec<_>, _>>()?;

    if decisions.len() != tasks_per_tick as usize {
        return Err(ValidationError::WrongTaskCount {
            expected: tasks_per_tick,
            actual: decisions.len(),
        });
    }

    Ok(decisions)
}
