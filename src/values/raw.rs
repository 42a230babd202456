/*
    Types:
    * RawValue - Untyped value as it arrives from the element tree or the settings backend, re-export of serde_json::Value
    * RawMap - String keyed record of RawValues
*/
pub type RawValue = serde_json::Value;
pub type RawMap = serde_json::Map<String, RawValue>;

/*
    Extension Traits:
    * RawMapExt - Lenient typed lookups on RawMap, used when reading element trees and persisted records
*/
pub trait RawMapExt {
    fn get_value(&self, key: &str) -> Option<&RawValue>;

    fn get_optional_string(&self, key: &str) -> Option<String> {
        self.get_value(key)
            .and_then(|v| v.as_str().map(|s| s.to_string()))
    }

    fn get_optional_i64(&self, key: &str) -> Option<i64> {
        self.get_value(key)
            .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)))
    }

    fn get_optional_bool(&self, key: &str) -> Option<bool> {
        self.get_value(key).and_then(|v| v.as_bool())
    }

    fn get_string_list(&self, key: &str) -> Vec<String> {
        self.get_value(key)
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.as_str().map(|s| s.to_string()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn get_object(&self, key: &str) -> Option<&RawMap> {
        self.get_value(key).and_then(|v| v.as_object())
    }
}

impl RawMapExt for RawMap {
    fn get_value(&self, key: &str) -> Option<&RawValue> {
        self.get(key)
    }
}
