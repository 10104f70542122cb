//! Option maps for load, save and storage arguments.
//!
//! Values keep their JSON shape; each reader/writer interprets its own keys.

use std::collections::BTreeMap;

use serde_json::Value;

/// Option name → value. Ordered so descriptions are stable.
pub type OptionMap = BTreeMap<String, Value>;

/// Key stripped from load/save options; storage options belong under
/// `credentials` or `fs_args`.
pub const STORAGE_OPTIONS_KEY: &str = "storage_options";

/// Save option that requests column partitioning, which is not supported.
pub const PARTITION_COLS_KEY: &str = "partition_cols";

/// Nested `fs_args` keys holding arguments for the filesystem open call.
pub const OPEN_ARGS_LOAD_KEY: &str = "open_args_load";
pub const OPEN_ARGS_SAVE_KEY: &str = "open_args_save";

/// Local filesystem option creating parent directories on write.
pub const AUTO_MKDIR_KEY: &str = "auto_mkdir";

/// `defaults` overlaid with `overrides`; override keys win.
pub fn merge_options(defaults: &OptionMap, overrides: Option<&OptionMap>) -> OptionMap {
    let mut merged = defaults.clone();
    if let Some(overrides) = overrides {
        merged.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    merged
}

/// Render an option map as `{k: v, ...}` for descriptions.
pub fn describe_options(options: &OptionMap) -> String {
    let body = options
        .iter()
        .map(|(k, v)| format!("{}: {}", k, v))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{{{}}}", body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn overrides_win() {
        let defaults: OptionMap = [("a".to_string(), json!(1)), ("b".to_string(), json!(2))]
            .into_iter()
            .collect();
        let overrides: OptionMap = [("b".to_string(), json!(3))].into_iter().collect();
        let merged = merge_options(&defaults, Some(&overrides));
        assert_eq!(merged["a"], json!(1));
        assert_eq!(merged["b"], json!(3));
    }

    #[test]
    fn describes_in_key_order() {
        let opts: OptionMap = [("z".to_string(), json!("x")), ("a".to_string(), json!(true))]
            .into_iter()
            .collect();
        assert_eq!(describe_options(&opts), r#"{a: true, z: "x"}"#);
        assert_eq!(describe_options(&OptionMap::new()), "{}");
    }
}
