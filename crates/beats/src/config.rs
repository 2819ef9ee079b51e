//! Beats 수신기 설정
//!
//! [`BeatsConfig`]는 core의 [`ReceiverConfig`](sawmill_core::config::ReceiverConfig)를
//! 기반으로 수신기 전용 설정을 제공합니다.
//!
//! # 사용 예시
//! ```ignore
//! use sawmill_core::config::SawmillConfig;
//! use sawmill_beats::config::BeatsConfig;
//!
//! let core_config = SawmillConfig::default();
//! let config = BeatsConfig::from_core(&core_config.receiver);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::BeatsError;

/// Beats 수신기 설정
///
/// core의 `ReceiverConfig`에서 파생되며, 수신기 내부에서 사용하는
/// 추가 설정을 포함합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeatsConfig {
    /// 바인드 주소 (예: "0.0.0.0:5151")
    pub listen: String,
    /// 최대 동시 연결 수
    pub max_connections: usize,
    /// 연결 타임아웃 (초)
    pub connection_timeout_secs: u64,
    /// 프레임 페이로드 최대 크기 (KiB)
    pub max_payload_kib: usize,
    /// 배치 완료 시 ack 프레임 회신 여부
    pub send_acks: bool,

    // --- 확장 설정 (core에 없는 추가 필드) ---
    /// 연결당 수신 버퍼 크기 (바이트)
    pub recv_buffer_size: usize,
    /// 허용하는 윈도우 크기 상한
    pub max_window_size: u32,
}

impl Default for BeatsConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:5151".to_owned(),
            max_connections: 256,
            connection_timeout_secs: 300, // 5 minutes
            max_payload_kib: 10_240,      // 10 MiB
            send_acks: true,
            recv_buffer_size: 64 * 1024, // 64KB
            max_window_size: 65_536,
        }
    }
}

impl BeatsConfig {
    /// core의 `ReceiverConfig`에서 수신기 설정을 생성합니다.
    ///
    /// core 설정에 없는 확장 필드는 기본값이 적용됩니다.
    pub fn from_core(core: &sawmill_core::config::ReceiverConfig) -> Self {
        Self {
            listen: core.listen.clone(),
            max_connections: core.max_connections,
            connection_timeout_secs: core.connection_timeout_secs,
            max_payload_kib: core.max_payload_kib,
            send_acks: core.send_acks,
            ..Self::default()
        }
    }

    /// 프레임 페이로드 상한을 바이트 단위로 반환합니다.
    pub fn max_payload_bytes(&self) -> usize {
        self.max_payload_kib * 1024
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), BeatsError> {
        const MAX_CONNECTIONS_LIMIT: usize = 65_536;
        const MAX_PAYLOAD_KIB_LIMIT: usize = 1_048_576; // 1 GiB
        const MAX_TIMEOUT_SECS: u64 = 86_400; // 24 hours

        if self.listen.is_empty() {
            return Err(BeatsError::Config {
                field: "listen".to_owned(),
                reason: "listen address must not be empty".to_owned(),
            });
        }

        if self.max_connections == 0 || self.max_connections > MAX_CONNECTIONS_LIMIT {
            return Err(BeatsError::Config {
                field: "max_connections".to_owned(),
                reason: format!("must be 1-{MAX_CONNECTIONS_LIMIT}"),
            });
        }

        if self.connection_timeout_secs == 0 || self.connection_timeout_secs > MAX_TIMEOUT_SECS
        {
            return Err(BeatsError::Config {
                field: "connection_timeout_secs".to_owned(),
                reason: format!("must be 1-{MAX_TIMEOUT_SECS}"),
            });
        }

        if self.max_payload_kib == 0 || self.max_payload_kib > MAX_PAYLOAD_KIB_LIMIT {
            return Err(BeatsError::Config {
                field: "max_payload_kib".to_owned(),
                reason: format!("must be 1-{MAX_PAYLOAD_KIB_LIMIT}"),
            });
        }

        if self.recv_buffer_size < 1024 {
            return Err(BeatsError::Config {
                field: "recv_buffer_size".to_owned(),
                reason: "must be at least 1024 bytes".to_owned(),
            });
        }

        if self.max_window_size == 0 {
            return Err(BeatsError::Config {
                field: "max_window_size".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        Ok(())
    }
}

/// 수신기 설정 빌더
#[derive(Default)]
pub struct BeatsConfigBuilder {
    config: BeatsConfig,
}

impl BeatsConfigBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 바인드 주소를 설정합니다.
    pub fn listen(mut self, listen: impl Into<String>) -> Self {
        self.config.listen = listen.into();
        self
    }

    /// 최대 동시 연결 수를 설정합니다.
    pub fn max_connections(mut self, max: usize) -> Self {
        self.config.max_connections = max;
        self
    }

    /// 연결 타임아웃(초)을 설정합니다.
    pub fn connection_timeout_secs(mut self, secs: u64) -> Self {
        self.config.connection_timeout_secs = secs;
        self
    }

    /// 프레임 페이로드 상한(KiB)을 설정합니다.
    pub fn max_payload_kib(mut self, kib: usize) -> Self {
        self.config.max_payload_kib = kib;
        self
    }

    /// ack 회신 여부를 설정합니다.
    pub fn send_acks(mut self, send_acks: bool) -> Self {
        self.config.send_acks = send_acks;
        self
    }

    /// 수신 버퍼 크기를 설정합니다.
    pub fn recv_buffer_size(mut self, size: usize) -> Self {
        self.config.recv_buffer_size = size;
        self
    }

    /// 윈도우 크기 상한을 설정합니다.
    pub fn max_window_size(mut self, max: u32) -> Self {
        self.config.max_window_size = max;
        self
    }

    /// 설정을 검증하고 `BeatsConfig`를 생성합니다.
    pub fn build(self) -> Result<BeatsConfig, BeatsError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
