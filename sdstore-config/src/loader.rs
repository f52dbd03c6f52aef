// Configuration file loaders

use crate::{ConfigError, Result, DEFAULT_SECTION};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FileFormat {
    Ini,
    Json,
    Toml,
    Env,
}

impl FileFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "ini" | "conf" | "cfg" => Some(FileFormat::Ini),
            "json" => Some(FileFormat::Json),
            "toml" => Some(FileFormat::Toml),
            "env" => Some(FileFormat::Env),
            _ => None,
        }
    }
}

/// Configuration file loader
pub struct ConfigLoader {
    format: FileFormat,
}

impl ConfigLoader {
    pub fn new(format: FileFormat) -> Self {
        Self { format }
    }

    /// Auto-detect format from file extension
    pub fn auto(path: impl AsRef<Path>) -> Result<Self> {
        let ext = path
            .as_ref()
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| ConfigError::LoadError("No file extension found".to_string()))?;

        let format = FileFormat::from_extension(ext)
            .ok_or_else(|| ConfigError::LoadError(format!("Unsupported format: {}", ext)))?;

        Ok(Self::new(format))
    }

    pub fn format(&self) -> FileFormat {
        self.format
    }

    /// Load configuration from file
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<Value> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::LoadError(format!("Failed to read file: {}", e)))?;

        self.parse(&content)
    }

    /// Parse configuration from string
    pub fn parse(&self, content: &str) -> Result<Value> {
        match self.format {
            FileFormat::Ini => self.parse_ini(content),
            FileFormat::Json => self.parse_json(content),
            FileFormat::Toml => self.parse_toml(content),
            FileFormat::Env => self.parse_env(content),
        }
    }

    fn parse_json(&self, content: &str) -> Result<Value> {
        serde_json::from_str(content)
            .map_err(|e| ConfigError::ParseError(format!("JSON parse error: {}", e)))
    }

    fn parse_toml(&self, content: &str) -> Result<Value> {
        let table: toml::Table = toml::from_str(content)
            .map_err(|e| ConfigError::ParseError(format!("TOML parse error: {}", e)))?;

        serde_json::to_value(table)
            .map_err(|e| ConfigError::ParseError(format!("TOML to JSON conversion error: {}", e)))
    }

    // `[Section]` headers, `key = value` or `key: value` pairs, `#`/`;` comments.
    fn parse_ini(&self, content: &str) -> Result<Value> {
        let mut sections: Map<String, Value> = Map::new();
        let mut current = DEFAULT_SECTION.to_string();

        for (lineno, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some(header) = line.strip_prefix('[') {
                let name = header.strip_suffix(']').ok_or_else(|| {
                    ConfigError::ParseError(format!(
                        "INI parse error: unterminated section header on line {}",
                        lineno + 1
                    ))
                })?;
                current = name.trim().to_string();
                sections
                    .entry(current.clone())
                    .or_insert_with(|| Value::Object(Map::new()));
                continue;
            }

            let split = match (line.find('='), line.find(':')) {
                (Some(eq), Some(colon)) => Some(eq.min(colon)),
                (Some(idx), None) | (None, Some(idx)) => Some(idx),
                (None, None) => None,
            };
            let Some(idx) = split else {
                return Err(ConfigError::ParseError(format!(
                    "INI parse error: expected `key = value` on line {}",
                    lineno + 1
                )));
            };

            // Option names are case-insensitive
            let key = line[..idx].trim().to_lowercase();
            let value = line[idx + 1..].trim();
            if let Value::Object(section) = sections
                .entry(current.clone())
                .or_insert_with(|| Value::Object(Map::new()))
            {
                section.insert(key, Value::String(value.to_string()));
            }
        }

        Ok(Value::Object(sections))
    }

    fn parse_env(&self, content: &str) -> Result<Value> {
        let mut map = Map::new();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                let value = value.trim().trim_matches('"').trim_matches('\'');
                map.insert(key.to_string(), Value::String(value.to_string()));
            }
        }

        Ok(Value::Object(map))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ini() {
        let loader = ConfigLoader::new(FileFormat::Ini);
        let ini = r#"
            # datadog.conf
            [Main]
            sd_config_backend: consul
            backend_template_dir = /custom/templates

            [Other]
            ; comment
            key = value
        "#;

        let result = loader.parse(ini).unwrap();
        assert_eq!(result["Main"]["sd_config_backend"], "consul");
        assert_eq!(result["Main"]["backend_template_dir"], "/custom/templates");
        assert_eq!(result["Other"]["key"], "value");
    }

    #[test]
    fn test_parse_ini_lowercases_option_names() {
        let loader = ConfigLoader::new(FileFormat::Ini);
        let result = loader
            .parse("[Main]\nSD_Config_Backend: Consul\n")
            .unwrap();
        assert_eq!(result["Main"]["sd_config_backend"], "Consul");
        assert!(result["Main"].get("SD_Config_Backend").is_none());
    }

    #[test]
    fn test_parse_ini_keeps_url_values() {
        let loader = ConfigLoader::new(FileFormat::Ini);
        let result = loader.parse("[Main]\ndd_url: https://app.example.com\n").unwrap();
        assert_eq!(result["Main"]["dd_url"], "https://app.example.com");
    }

    #[test]
    fn test_parse_ini_rejects_garbage() {
        let loader = ConfigLoader::new(FileFormat::Ini);
        assert!(loader.parse("[Main\n").is_err());
        assert!(loader.parse("[Main]\njust some words\n").is_err());
    }

    #[test]
    fn test_parse_json() {
        let loader = ConfigLoader::new(FileFormat::Json);
        let json = r#"{"Main": {"sd_backend_port": 4001}}"#;

        let result = loader.parse(json).unwrap();
        assert!(result.is_object());
        assert_eq!(result["Main"]["sd_backend_port"], 4001);
    }

    #[test]
    fn test_parse_toml() {
        let loader = ConfigLoader::new(FileFormat::Toml);
        let toml = r#"
            [Main]
            sd_config_backend = "etcd"
            sd_backend_port = 4001
        "#;

        let result = loader.parse(toml).unwrap();
        assert_eq!(result["Main"]["sd_config_backend"], "etcd");
        assert_eq!(result["Main"]["sd_backend_port"], 4001);
    }

    #[test]
    fn test_parse_env() {
        let loader = ConfigLoader::new(FileFormat::Env);
        let env = r#"
            KEY=value
            NUMBER=42
            # Comment
            QUOTED="quoted value"
        "#;

        let result = loader.parse(env).unwrap();
        assert_eq!(result["QUOTED"], "quoted value");
        assert_eq!(result["NUMBER"], "42");
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(FileFormat::from_extension("conf"), Some(FileFormat::Ini));
        assert_eq!(FileFormat::from_extension("INI"), Some(FileFormat::Ini));
        assert_eq!(FileFormat::from_extension("json"), Some(FileFormat::Json));
        assert_eq!(FileFormat::from_extension("toml"), Some(FileFormat::Toml));
        assert_eq!(FileFormat::from_extension("env"), Some(FileFormat::Env));
        assert_eq!(FileFormat::from_extension("unknown"), None);
    }

    #[test]
    fn test_auto_requires_extension() {
        assert!(ConfigLoader::auto("datadog").is_err());
        assert_eq!(
            ConfigLoader::auto("/etc/dd-agent/datadog.conf").unwrap().format(),
            FileFormat::Ini
        );
    }
}
