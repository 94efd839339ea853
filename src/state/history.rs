/// Shared history record structures
///
/// These structs represent the data that flows between the store layer and
/// the history panel. A record is identified by a stable database id, never
/// by its position in the rendered list.

/// A history entry about to be persisted (no id yet)
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    /// Unix timestamp in milliseconds
    pub timestamp_ms: i64,
    pub prompt: String,
    pub model: String,
    pub processing_time_ms: i64,
    /// Display string, e.g. "2000 × 1500 像素"
    pub output_dimensions: String,
    /// Data URL or remote URL of the rendered image
    pub image_url: String,
    pub original_width: Option<u32>,
    pub original_height: Option<u32>,
}

/// A persisted history record
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRecord {
    /// Stable database id
    pub id: i64,
    pub timestamp_ms: i64,
    pub prompt: String,
    pub model: String,
    pub processing_time_ms: i64,
    pub output_dimensions: String,
    pub image_url: String,
    pub original_width: Option<u32>,
    pub original_height: Option<u32>,
}

impl HistoryRecord {
    /// Local-time display string for the record timestamp
    pub fn display_time(&self) -> String {
        use chrono::TimeZone;

        match chrono::Local.timestamp_millis_opt(self.timestamp_ms).single() {
            Some(time) => time.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => "-".to_string(),
        }
    }

    /// Original dimensions as a pair, when both were recorded
    pub fn original_dimensions(&self) -> Option<(u32, u32)> {
        match (self.original_width, self.original_height) {
            (Some(width), Some(height)) => Some((width, height)),
            _ => None,
        }
    }
}

/// Format pixel dimensions the way the UI and history records display them
pub fn dimension_label(width: u32, height: u32) -> String {
    format!("{} × {} 像素", width, height)
}

/// Truncate a prompt for list display, counting characters rather than bytes
pub fn truncate_prompt(prompt: &str, max_chars: usize) -> String {
    if prompt.chars().count() <= max_chars {
        return prompt.to_string();
    }
    let truncated: String = prompt.chars().take(max_chars).collect();
    format!("{}...", truncated)
}
