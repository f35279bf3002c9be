use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

/// Contents of `config.yaml`
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct ConfigFile {
    #[serde(default)]
    pub profiles: Vec<Profile>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Pretty-printed JSON
    #[default]
    Json,
    /// Response body as received
    Text,
}

impl std::str::FromStr for OutputMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" => Ok(Self::Text),
            other => Err(format!(
                "Invalid output format '{other}'. Valid values: 'json', 'text'"
            )),
        }
    }
}

/// One named set of connection settings and defaults
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct Profile {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,
    /// Replaces scheme, host and port of every definition's server URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, deserialize_with = "scalar_map")]
    pub path: IndexMap<String, String>,
    #[serde(default, deserialize_with = "scalar_map")]
    pub query: IndexMap<String, String>,
    #[serde(default, deserialize_with = "scalar_map")]
    pub header: IndexMap<String, String>,
    /// Strategy-specific authentication options
    #[serde(default)]
    pub auth: IndexMap<String, serde_json::Value>,
    #[serde(default)]
    pub insecure: bool,
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub output: OutputMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl Profile {
    #[must_use]
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// String-valued auth option
    #[must_use]
    pub fn auth_str(&self, key: &str) -> Option<&str> {
        self.auth
            .get(key)
            .and_then(serde_json::Value::as_str)
            .filter(|v| !v.is_empty())
    }
}

/// Contents of `plugins.yaml`
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct PluginConfig {
    #[serde(default)]
    pub authenticators: Vec<ExternalAuthenticatorConfig>,
}

/// An external executable that produces authentication headers
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ExternalAuthenticatorConfig {
    pub name: String,
    pub path: String,
}

/// Accepts any YAML scalar as a map value so `folderId: 42` and
/// `folderId: "42"` are equivalent.
fn scalar_map<'de, D>(deserializer: D) -> Result<IndexMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<IndexMap<String, serde_yaml::Value>> = Option::deserialize(deserializer)?;
    let mut map = IndexMap::new();
    for (key, value) in raw.unwrap_or_default() {
        let text = match value {
            serde_yaml::Value::String(s) => s,
            serde_yaml::Value::Number(n) => n.to_string(),
            serde_yaml::Value::Bool(b) => b.to_string(),
            serde_yaml::Value::Null => continue,
            other => {
                return Err(serde::de::Error::custom(format!(
                    "value of '{key}' must be a scalar, got {other:?}"
                )))
            }
        };
        map.insert(key, text);
    }
    Ok(map)
}
