use std::collections::HashMap;
use std::path::Path;

use rapport_core::{RapportError, RapportResult};
use serde_json::Value;
use tracing::{info, warn};

/// Load a `{sender_id: display_name}` JSON object.
///
/// Numeric names are kept in their decimal form; other non-string values
/// are skipped with a warning.
pub fn load_user_map(path: &Path) -> RapportResult<HashMap<String, String>> {
    let text = std::fs::read_to_string(path)?;
    let map = parse_user_map(&text)?;
    info!("Loaded {} display names from {}", map.len(), path.display());
    Ok(map)
}

pub fn parse_user_map(text: &str) -> RapportResult<HashMap<String, String>> {
    let Value::Object(entries) = serde_json::from_str::<Value>(text)? else {
        return Err(RapportError::Other(
            "user map must be a JSON object of id -> name".to_string(),
        ));
    };

    let mut map = HashMap::with_capacity(entries.len());
    for (id, name) in entries {
        let name = match name {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            other => {
                warn!("Ignoring user map entry {}: {}", id, other);
                continue;
            }
        };
        map.insert(id.trim().to_string(), name);
    }
    Ok(map)
}
