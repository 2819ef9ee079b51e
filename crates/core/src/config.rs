//! 설정 관리 — sawmill.toml 파싱 및 런타임 설정
//!
//! [`SawmillConfig`]는 모든 모듈의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`SAWMILL_RECEIVER_LISTEN=0.0.0.0:5151` 형식)
//! 3. 설정 파일 (`sawmill.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), sawmill_core::error::SawmillError> {
//! use sawmill_core::config::SawmillConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = SawmillConfig::load("sawmill.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = SawmillConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, SawmillError};

/// Sawmill 통합 설정
///
/// `sawmill.toml` 파일의 최상위 구조를 나타냅니다.
/// 각 모듈은 자기 섹션만 읽어 사용합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SawmillConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// Beats 수신기 설정
    #[serde(default)]
    pub receiver: ReceiverConfig,
    /// 하류 sink 설정
    #[serde(default)]
    pub sink: SinkConfig,
}

/// 일반 설정 (로깅 등)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// 로그 포맷 (json, pretty)
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

/// Beats 수신기 설정
///
/// beats 크레이트의 `BeatsConfig`는 이 섹션에서 파생됩니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiverConfig {
    /// 활성화 여부
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// 바인드 주소 (예: "0.0.0.0:5151")
    #[serde(default = "default_listen")]
    pub listen: String,
    /// 최대 동시 연결 수
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// 연결 타임아웃 (초)
    #[serde(default = "default_connection_timeout_secs")]
    pub connection_timeout_secs: u64,
    /// 프레임 페이로드 최대 크기 (KiB)
    #[serde(default = "default_max_payload_kib")]
    pub max_payload_kib: usize,
    /// 배치 완료 시 클라이언트로 ack 프레임을 회신할지 여부
    #[serde(default = "default_true")]
    pub send_acks: bool,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listen: default_listen(),
            max_connections: default_max_connections(),
            connection_timeout_secs: default_connection_timeout_secs(),
            max_payload_kib: default_max_payload_kib(),
            send_acks: true,
        }
    }
}

/// 하류 sink 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// sink 종류 (stdout, null)
    #[serde(default = "default_sink_kind")]
    pub kind: String,
    /// 배치 이벤트 채널 용량
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            kind: default_sink_kind(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_owned()
}

fn default_log_format() -> String {
    "json".to_owned()
}

fn default_true() -> bool {
    true
}

fn default_listen() -> String {
    "0.0.0.0:5151".to_owned()
}

fn default_max_connections() -> usize {
    256
}

fn default_connection_timeout_secs() -> u64 {
    300
}

fn default_max_payload_kib() -> usize {
    10_240 // 10 MiB
}

fn default_sink_kind() -> String {
    "stdout".to_owned()
}

fn default_channel_capacity() -> usize {
    1024
}

impl SawmillConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    ///
    /// 설정 로딩 순서:
    /// 1. TOML 파일 파싱
    /// 2. 환경변수 오버라이드 적용
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, SawmillError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, SawmillError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SawmillError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                SawmillError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, SawmillError> {
        toml::from_str(toml_str).map_err(|e| {
            SawmillError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `SAWMILL_{SECTION}_{FIELD}`
    /// 예: `SAWMILL_RECEIVER_LISTEN=127.0.0.1:5151`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "SAWMILL_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "SAWMILL_GENERAL_LOG_FORMAT");

        // Receiver
        override_bool(&mut self.receiver.enabled, "SAWMILL_RECEIVER_ENABLED");
        override_string(&mut self.receiver.listen, "SAWMILL_RECEIVER_LISTEN");
        override_usize(
            &mut self.receiver.max_connections,
            "SAWMILL_RECEIVER_MAX_CONNECTIONS",
        );
        override_u64(
            &mut self.receiver.connection_timeout_secs,
            "SAWMILL_RECEIVER_CONNECTION_TIMEOUT_SECS",
        );
        override_usize(
            &mut self.receiver.max_payload_kib,
            "SAWMILL_RECEIVER_MAX_PAYLOAD_KIB",
        );
        override_bool(&mut self.receiver.send_acks, "SAWMILL_RECEIVER_SEND_ACKS");

        // Sink
        override_string(&mut self.sink.kind, "SAWMILL_SINK_KIND");
        override_usize(
            &mut self.sink.channel_capacity,
            "SAWMILL_SINK_CHANNEL_CAPACITY",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), SawmillError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        // receiver 검증
        if self.receiver.enabled {
            if self.receiver.listen.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "receiver.listen".to_owned(),
                    reason: "listen address must not be empty when receiver is enabled"
                        .to_owned(),
                }
                .into());
            }

            if self.receiver.max_connections == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "receiver.max_connections".to_owned(),
                    reason: "must be greater than 0".to_owned(),
                }
                .into());
            }

            if self.receiver.max_payload_kib == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "receiver.max_payload_kib".to_owned(),
                    reason: "must be greater than 0".to_owned(),
                }
                .into());
            }
        }

        // sink kind 검증
        let valid_sinks = ["stdout", "null"];
        if !valid_sinks.contains(&self.sink.kind.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "sink.kind".to_owned(),
                reason: format!("must be one of: {}", valid_sinks.join(", ")),
            }
            .into());
        }

        if self.sink.channel_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "sink.channel_capacity".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        Ok(())
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(value) = std::env::var(env_key) {
        *target = value;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(value) = std::env::var(env_key) {
        match value.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(env = env_key, value, "ignoring unparsable bool override"),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(value) = std::env::var(env_key) {
        match value.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(env = env_key, value, "ignoring unparsable integer override"),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(value) = std::env::var(env_key) {
        match value.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(env = env_key, value, "ignoring unparsable integer override"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SawmillConfig::default();
        config.validate().unwrap();
    }

    #[test]
    fn default_receiver_values() {
        let config = SawmillConfig::default();
        assert_eq!(config.receiver.listen, "0.0.0.0:5151");
        assert_eq!(config.receiver.max_connections, 256);
        assert_eq!(config.receiver.max_payload_kib, 10_240);
        assert!(config.receiver.send_acks);
    }

    #[test]
    fn parse_minimal_toml() {
        let config = SawmillConfig::parse("[general]\nlog_level = \"debug\"").unwrap();
        assert_eq!(config.general.log_level, "debug");
        // 나머지 섹션은 기본값
        assert_eq!(config.receiver.listen, "0.0.0.0:5151");
        assert_eq!(config.sink.kind, "stdout");
    }

    #[test]
    fn parse_full_receiver_section() {
        let toml_str = r#"
            [receiver]
            listen = "127.0.0.1:6000"
            max_connections = 32
            connection_timeout_secs = 60
            max_payload_kib = 512
            send_acks = false
        "#;
        let config = SawmillConfig::parse(toml_str).unwrap();
        assert_eq!(config.receiver.listen, "127.0.0.1:6000");
        assert_eq!(config.receiver.max_connections, 32);
        assert_eq!(config.receiver.connection_timeout_secs, 60);
        assert_eq!(config.receiver.max_payload_kib, 512);
        assert!(!config.receiver.send_acks);
    }

    #[test]
    fn parse_rejects_invalid_toml() {
        assert!(SawmillConfig::parse("not valid toml [[").is_err());
    }

    #[test]
    fn validate_rejects_unknown_log_level() {
        let mut config = SawmillConfig::default();
        config.general.log_level = "verbose".to_owned();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_unknown_log_format() {
        let mut config = SawmillConfig::default();
        config.general.log_format = "xml".to_owned();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_listen_when_enabled() {
        let mut config = SawmillConfig::default();
        config.receiver.listen.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_allows_empty_listen_when_disabled() {
        let mut config = SawmillConfig::default();
        config.receiver.enabled = false;
        config.receiver.listen.clear();
        config.validate().unwrap();
    }

    #[test]
    fn validate_rejects_zero_max_payload() {
        let mut config = SawmillConfig::default();
        config.receiver.max_payload_kib = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_unknown_sink_kind() {
        let mut config = SawmillConfig::default();
        config.sink.kind = "kafka".to_owned();
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn from_file_reports_missing_file() {
        let err = SawmillConfig::from_file("/nonexistent/sawmill.toml")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SawmillError::Config(ConfigError::FileNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn from_file_loads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sawmill.toml");
        tokio::fs::write(&path, "[receiver]\nlisten = \"127.0.0.1:7000\"")
            .await
            .unwrap();

        let config = SawmillConfig::from_file(&path).await.unwrap();
        assert_eq!(config.receiver.listen, "127.0.0.1:7000");
    }
}
