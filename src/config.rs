use serde::{Deserialize, Serialize};

pub const DEFAULT_START_ROW: u64 = 0;
pub const DEFAULT_END_ROW: u64 = 100;

/// Row window defaults applied to paginated list requests.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "json-schema", derive(schemars::JsonSchema))]
pub struct ListDefaults {
    /// First row returned when the request does not name one.
    #[serde(default = "default_start_row")]
    pub start_row: u64,
    /// End of the default window. `end_row - start_row` is the default page size.
    #[serde(default = "default_end_row")]
    pub end_row: u64,
    /// Wider windows are clamped to this many rows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_page_size: Option<u64>,
}

fn default_start_row() -> u64 {
    DEFAULT_START_ROW
}

fn default_end_row() -> u64 {
    DEFAULT_END_ROW
}

impl Default for ListDefaults {
    fn default() -> Self {
        Self {
            start_row: DEFAULT_START_ROW,
            end_row: DEFAULT_END_ROW,
            max_page_size: None,
        }
    }
}

impl ListDefaults {
    pub fn page_size(&self) -> u64 {
        self.end_row.saturating_sub(self.start_row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_partial_config() {
        let defaults: ListDefaults =
            serde_json::from_value(serde_json::json!({ "end_row": 25 })).unwrap();
        assert_eq!(defaults.start_row, DEFAULT_START_ROW);
        assert_eq!(defaults.page_size(), 25);
        assert_eq!(defaults.max_page_size, None);
    }
}
