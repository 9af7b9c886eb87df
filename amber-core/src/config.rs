use serde::{Deserialize, Serialize};

/// Default nesting limit for writing and reading.
pub const DEFAULT_MAX_DEPTH: usize = 1024;

/// Settings shared by save and restore.
///
/// Deserializable so it can be embedded in a host application's config file;
/// missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Maximum nesting of containers, enforced identically by the writer and
    /// the reader. Neither recurses per level, so this bounds the work and
    /// memory a single artifact can demand rather than stack usage.
    pub max_depth: usize,
    /// Whether to end the artifact with a newline.
    pub trailing_newline: bool,
    /// Comment written when `save` is called without one.
    pub default_comment: Option<String>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            trailing_newline: true,
            default_comment: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_table_takes_defaults() {
        let options: Options = toml::from_str("max_depth = 64\n").unwrap();
        assert_eq!(
            options,
            Options {
                max_depth: 64,
                ..Options::default()
            }
        );
    }

    #[test]
    fn empty_table_is_default() {
        let options: Options = toml::from_str("").unwrap();
        assert_eq!(options, Options::default());
    }

    #[test]
    fn embedded_in_host_config() {
        #[derive(Deserialize)]
        struct HostConfig {
            name: String,
            #[serde(default)]
            persistence: Options,
        }

        let text = r#"
name = "app"

[persistence]
trailing_newline = false
default_comment = "saved by app"
"#;
        let config: HostConfig = toml::from_str(text).unwrap();
        assert_eq!(config.name, "app");
        assert_eq!(config.persistence.max_depth, DEFAULT_MAX_DEPTH);
        assert!(!config.persistence.trailing_newline);
        assert_eq!(
            config.persistence.default_comment.as_deref(),
            Some("saved by app")
        );

        let bare: HostConfig = toml::from_str("name = \"app\"\n").unwrap();
        assert_eq!(bare.persistence, Options::default());
    }

    #[test]
    fn toml_roundtrip() {
        let options = Options {
            max_depth: 10,
            trailing_newline: false,
            default_comment: Some("state".to_string()),
        };
        let text = toml::to_string(&options).unwrap();
        let parsed: Options = toml::from_str(&text).unwrap();
        assert_eq!(parsed, options);
    }
}
