//! Response model of the outdoor activity planner
//!
//! The dispatcher never depends on this shape. It is only used to offer a
//! compact summary when a successful reply happens to match it.

use serde::{Deserialize, Serialize};

/// Body returned by `POST /plan-activity` on success
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanActivityResponse {
    /// Local sunrise time, e.g. `6:01:02 AM`
    pub sunrise: String,
    /// Local sunset time, e.g. `5:48:10 PM`
    pub sunset: String,
    /// Day length as `HH:MM:SS`
    pub day_length: String,
    /// Suggested activities in chronological order
    pub activities: Vec<String>,
}

impl PlanActivityResponse {
    /// Try to read a rendered JSON body as a plan
    #[must_use]
    pub fn from_body(body: &str) -> Option<Self> {
        serde_json::from_str(body).ok()
    }

    /// Format sunrise and sunset without seconds
    #[must_use]
    pub fn format_sun_times(&self) -> String {
        format!(
            "Sunrise {} / Sunset {} (day length {})",
            strip_seconds(&self.sunrise),
            strip_seconds(&self.sunset),
            self.day_length
        )
    }

    /// Multi-line summary for terminal output
    #[must_use]
    pub fn summary(&self) -> String {
        let mut lines = vec![self.format_sun_times()];
        lines.extend(self.activities.iter().map(|a| format!("  - {a}")));
        lines.join("\n")
    }
}

/// Drop the seconds from an `H:MM:SS AM/PM` time.
///
/// `"2:08:55 PM"` becomes `"2:08 PM"`. Anything else is returned unchanged.
#[must_use]
pub fn strip_seconds(time: &str) -> String {
    let parts: Vec<&str> = time.split_whitespace().collect();
    let [clock, meridiem] = parts.as_slice() else {
        return time.to_string();
    };

    let fields: Vec<&str> = clock.split(':').collect();
    if fields.len() < 2 {
        return time.to_string();
    }

    format!("{}:{} {}", fields[0], fields[1], meridiem)
}
