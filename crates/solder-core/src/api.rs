//! Backend capability/version metadata.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Version info reported by the backend's `get_version_info` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VersionInfo {
    /// Backend implementation name.
    pub app_name: String,
    /// Backend implementation version.
    pub app_version: String,
    /// OneBot protocol version (e.g. "v11").
    pub protocol_version: String,
    /// Implementation-specific extras, kept as-is.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_version_info() {
        let data = json!({
            "app_name": "go-cqhttp",
            "app_version": "1.2.0",
            "protocol_version": "v11",
            "runtime_os": "linux",
        });

        let info: VersionInfo = serde_json::from_value(data).unwrap();
        assert_eq!(info.app_name, "go-cqhttp");
        assert_eq!(info.protocol_version, "v11");
        assert_eq!(info.extra.get("runtime_os"), Some(&json!("linux")));
    }

    #[test]
    fn test_missing_fields_default() {
        let info: VersionInfo = serde_json::from_value(json!({})).unwrap();
        assert_eq!(info, VersionInfo::default());
    }
}
