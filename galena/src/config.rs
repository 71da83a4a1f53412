use std::path::Path;

use galena_server::ServerConfig;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error(transparent)]
    JsonError(#[from] serde_json::Error),
    #[error("Configuration root must be a JSON object")]
    NotAnObject,
    #[error("\"servers\" must be an array of per-listener overrides")]
    ServersNotAnArray,
}

/// Loads the base configuration and expands the optional `servers` array
/// into one [`ServerConfig`] per listener, each entry overriding base keys.
/// A listener entry that fails to parse is reported on stderr and skipped;
/// file-level problems are fatal.
pub fn load(path: Option<&Path>) -> Result<Vec<ServerConfig>, ConfigError> {
    let root: serde_json::Value = match path {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => serde_json::json!({}),
    };
    let base = root.as_object().ok_or(ConfigError::NotAnObject)?.clone();

    let listeners = match base.get("servers") {
        None => vec![serde_json::Value::Object(base)],
        Some(serde_json::Value::Array(entries)) => {
            let entries = entries.clone();
            entries
                .into_iter()
                .map(|entry| {
                    let mut merged = base.clone();
                    merged.remove("servers");
                    match entry {
                        serde_json::Value::Object(overrides) => {
                            merged.extend(overrides);
                            Ok(serde_json::Value::Object(merged))
                        }
                        _ => Err(ConfigError::ServersNotAnArray),
                    }
                })
                .collect::<Result<Vec<_>, _>>()?
        }
        Some(_) => return Err(ConfigError::ServersNotAnArray),
    };

    let mut configs = Vec::new();
    for listener in listeners {
        match serde_json::from_value::<ServerConfig>(listener) {
            Ok(config) => configs.push(config),
            Err(err) => eprintln!("Error parsing listener configuration: {}", err),
        }
    }
    Ok(configs)
}

#[cfg(test)]
mod test {
    use super::load;

    static COUNTER: std::sync::atomic::AtomicU32 = std::sync::atomic::AtomicU32::new(0);

    fn load_str(json: &str) -> Vec<galena_server::ServerConfig> {
        let path = std::env::temp_dir().join(format!(
            "galena-config-{}-{}.json",
            std::process::id(),
            COUNTER.fetch_add(1, std::sync::atomic::Ordering::Relaxed),
        ));
        std::fs::write(&path, json).unwrap();
        let configs = load(Some(&path)).unwrap();
        std::fs::remove_file(&path).unwrap();
        configs
    }

    #[test]
    fn missing_file_defaults_to_one_listener() {
        let configs = load(None).unwrap();
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].port, 25565);
    }

    #[test]
    fn base_keys_apply() {
        let configs = load_str(r#"{"port": 25570, "online": true, "description": "hi"}"#);
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].port, 25570);
        assert!(configs[0].online);
        assert_eq!(configs[0].description, "hi");
    }

    #[test]
    fn servers_array_overrides_base() {
        let configs = load_str(
            r#"{
                "compression": 64,
                "servers": [
                    {"port": 25565},
                    {"port": 25566, "compression": -1, "online": true}
                ]
            }"#,
        );
        assert_eq!(configs.len(), 2);
        assert_eq!(configs[0].port, 25565);
        assert_eq!(configs[0].compression, 64);
        assert_eq!(configs[1].port, 25566);
        assert_eq!(configs[1].compression, -1);
        assert!(configs[1].online);
    }

    #[test]
    fn invalid_json_is_fatal() {
        let path = std::env::temp_dir().join("galena-config-broken.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(load(Some(&path)).is_err());
        std::fs::remove_file(&path).unwrap();
    }
}
