use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AgentConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// VIN of the vehicle this device is mounted in
    #[serde(default = "default_vehicle_id")]
    pub vehicle_id: String,

    /// Device identifier; also used as MQTT client id and topic segment
    #[serde(default = "default_device_id")]
    pub device_id: String,

    // MQTT broker
    #[serde(default = "default_mqtt_host")]
    pub mqtt_host: String,

    #[serde(default = "default_mqtt_port")]
    pub mqtt_port: u16,

    #[serde(default = "default_mqtt_username")]
    pub mqtt_username: String,

    /// Leading segment of every topic: `{prefix}/{device_id}/...`
    #[serde(default = "default_topic_prefix")]
    pub topic_prefix: String,

    // Auth (OIDC client-credentials)
    #[serde(default = "default_auth_issuer")]
    pub auth_issuer: String,

    #[serde(default = "default_auth_client_id")]
    pub auth_client_id: String,

    #[serde(default)]
    pub auth_client_secret: String,

    #[serde(default = "default_auth_timeout_secs")]
    pub auth_timeout_secs: u64,

    /// Storage root for the durable buffer
    #[serde(default = "default_storage_dir")]
    pub storage_dir: String,

    // Scheduler cadence
    #[serde(default = "default_collect_interval_secs")]
    pub collect_interval_secs: u64,

    #[serde(default = "default_session_interval_secs")]
    pub session_interval_secs: u64,

    #[serde(default = "default_transmit_interval_secs")]
    pub transmit_interval_secs: u64,

    /// Bind address for the engine-control endpoints
    #[serde(default = "default_http_addr")]
    pub http_addr: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_vehicle_id() -> String {
    "VIN-TEST-0001".to_string()
}

fn default_device_id() -> String {
    "edge-device-001".to_string()
}

fn default_mqtt_host() -> String {
    "localhost".to_string()
}

fn default_mqtt_port() -> u16 {
    1883
}

fn default_mqtt_username() -> String {
    "device".to_string()
}

fn default_topic_prefix() -> String {
    "telematics".to_string()
}

fn default_auth_issuer() -> String {
    "http://localhost:8080/realms/telematics".to_string()
}

fn default_auth_client_id() -> String {
    "edge-device-001".to_string()
}

fn default_auth_timeout_secs() -> u64 {
    5
}

fn default_storage_dir() -> String {
    "data".to_string()
}

fn default_collect_interval_secs() -> u64 {
    1
}

fn default_session_interval_secs() -> u64 {
    1
}

fn default_transmit_interval_secs() -> u64 {
    30
}

fn default_http_addr() -> String {
    "127.0.0.1:3000".to_string()
}

impl AgentConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Environment::with_prefix("AGENT"))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Mutex to ensure tests run serially and don't interfere with each other
    static TEST_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_default_config() {
        let _lock = TEST_LOCK.lock().unwrap();

        std::env::remove_var("AGENT_DEVICE_ID");
        std::env::remove_var("AGENT_MQTT_HOST");
        std::env::remove_var("AGENT_TRANSMIT_INTERVAL_SECS");

        let config = AgentConfig::from_env().unwrap();
        assert_eq!(config.device_id, "edge-device-001");
        assert_eq!(config.mqtt_host, "localhost");
        assert_eq!(config.mqtt_port, 1883);
        assert_eq!(config.collect_interval_secs, 1);
        assert_eq!(config.session_interval_secs, 1);
        assert_eq!(config.transmit_interval_secs, 30);
    }

    #[test]
    fn test_custom_config() {
        let _lock = TEST_LOCK.lock().unwrap();

        std::env::set_var("AGENT_DEVICE_ID", "edge-device-042");
        std::env::set_var("AGENT_MQTT_HOST", "broker.fleet.internal");
        std::env::set_var("AGENT_TRANSMIT_INTERVAL_SECS", "60");

        let config = AgentConfig::from_env().unwrap();
        assert_eq!(config.device_id, "edge-device-042");
        assert_eq!(config.mqtt_host, "broker.fleet.internal");
        assert_eq!(config.transmit_interval_secs, 60);

        // Clean up
        std::env::remove_var("AGENT_DEVICE_ID");
        std::env::remove_var("AGENT_MQTT_HOST");
        std::env::remove_var("AGENT_TRANSMIT_INTERVAL_SECS");
    }
}
