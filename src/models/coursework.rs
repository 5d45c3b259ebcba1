use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Mirror of a remote assignment/material. Classification (survey/idea/
/// regular) is derived from the title at read time, never stored.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Coursework {
    pub course_work_id: String,
    pub course_id: String,
    pub title: String,
    pub max_points: Option<f64>,
    pub state: Option<String>,
    pub due_date: Option<String>,
    /// Opaque JSON list of materials, kept verbatim from the remote.
    pub materials: String,
    pub last_synced_at: String,
}

impl Coursework {
    /// First form or link URL found in the materials list, empty string
    /// when there is none or the JSON is malformed.
    pub fn form_url(&self) -> String {
        let parsed: serde_json::Value = match serde_json::from_str(&self.materials) {
            Ok(v) => v,
            Err(_) => return String::new(),
        };
        let items = match parsed.as_array() {
            Some(items) => items,
            None => return String::new(),
        };
        for item in items {
            if let Some(url) = item
                .pointer("/form/formUrl")
                .or_else(|| item.pointer("/link/url"))
                .and_then(|v| v.as_str())
            {
                return url.to_string();
            }
        }
        String::new()
    }
}
