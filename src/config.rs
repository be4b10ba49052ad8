use serde::{Deserialize, Serialize};

/// Tunable limits of the compiler core. Every field has a default, so a JSON config
/// only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompilerConfig {
    /// Most match lines (value groups) one CASE may carry.
    pub case_limit: usize,
    /// Most ELSEIF / ELSEIFNOT clauses one IF may carry.
    pub elseif_limit: usize,
    /// Largest `max - min` a CASE_FAST value set may span.
    pub case_fast_span_limit: u32,
    /// Largest offset a CASE_FAST jump-table entry may hold.
    pub case_fast_table_limit: u32,
    /// Deepest nesting of control constructs.
    pub block_nest_limit: usize,
    /// Relaxation passes before giving up on a method body.
    pub max_relaxation_passes: usize,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        CompilerConfig {
            case_limit: 256,
            elseif_limit: 256,
            case_fast_span_limit: 255,
            case_fast_table_limit: 0xFFFF,
            block_nest_limit: 16,
            max_relaxation_passes: 8,
        }
    }
}

impl CompilerConfig {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = CompilerConfig::from_json(r#"{"elseif_limit": 4}"#).unwrap();
        assert_eq!(config.elseif_limit, 4);
        assert_eq!(config.case_limit, 256);
        assert_eq!(config.max_relaxation_passes, 8);
    }

    #[test]
    fn empty_json_is_default() {
        assert_eq!(CompilerConfig::from_json("{}").unwrap(), CompilerConfig::default());
    }

    #[test]
    fn unknown_key_rejected() {
        assert!(CompilerConfig::from_json(r#"{"case_limits": 3}"#).is_err());
    }
}
