use std::collections::HashMap;

/// Pair -> universe tag lookup with a fallback tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniverseMap {
    default: String,
    by_pair: HashMap<String, String>,
}

impl UniverseMap {
    pub fn new(default: impl Into<String>) -> Self {
        Self {
            default: default.into(),
            by_pair: HashMap::new(),
        }
    }

    /// Parse `PAIR:universe,PAIR:universe` entries; malformed entries are skipped
    pub fn parse(default: impl Into<String>, entries: &str) -> Self {
        let mut map = Self::new(default);
        for entry in entries.split(',') {
            if let Some((pair, universe)) = entry.split_once(':') {
                let (pair, universe) = (pair.trim(), universe.trim());
                if !pair.is_empty() && !universe.is_empty() {
                    map.by_pair.insert(pair.to_string(), universe.to_string());
                }
            }
        }
        map
    }

    pub fn with_pair(mut self, pair: impl Into<String>, universe: impl Into<String>) -> Self {
        self.by_pair.insert(pair.into(), universe.into());
        self
    }

    pub fn resolve(&self, pair: &str) -> &str {
        self.by_pair
            .get(pair)
            .map(String::as_str)
            .unwrap_or(&self.default)
    }
}

impl Default for UniverseMap {
    fn default() -> Self {
        Self::new("spot")
    }
}
