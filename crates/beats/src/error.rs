//! Beats 수신기 에러 타입
//!
//! [`BeatsError`]는 beats 프로토콜 처리 내부에서 발생하는 모든 에러를
//! 표현합니다. `From<BeatsError> for SawmillError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.
//!
//! 프로토콜 위반과 압축 해제 실패는 디코더 내부에서 복구되므로
//! 일반적으로 연결 밖으로 전파되지 않습니다. 세션 밖으로 나가는 것은
//! 채널/I/O 에러뿐입니다.

use sawmill_core::error::{PipelineError, SawmillError};

use crate::cursor::InsufficientData;

/// Beats 수신기 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum BeatsError {
    /// 프로토콜 위반 (알 수 없는 버전/프레임 타입, 잘린 sub-stream 등)
    #[error("protocol violation: {reason}")]
    ProtocolViolation {
        /// 위반 사유
        reason: String,
    },

    /// 압축 해제 실패
    #[error("decompression failed: {0}")]
    Decompression(String),

    /// 프레임 페이로드가 설정된 상한을 초과
    #[error("payload too large: {size} bytes (max: {max})")]
    PayloadTooLarge {
        /// 요구된 페이로드 크기
        size: usize,
        /// 허용 상한
        max: usize,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 채널 통신 에러 (하류 수신측이 닫힘 등)
    #[error("channel error: {0}")]
    Channel(String),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<InsufficientData> for BeatsError {
    fn from(err: InsufficientData) -> Self {
        // 디코더는 항상 required_bytes만큼 확보한 뒤 읽으므로, 커서가
        // 바닥나는 것은 잘린 sub-stream에서만 발생합니다.
        BeatsError::ProtocolViolation {
            reason: format!("truncated frame: {err}"),
        }
    }
}

impl From<BeatsError> for SawmillError {
    fn from(err: BeatsError) -> Self {
        match err {
            BeatsError::Io(io) => SawmillError::Io(io),
            BeatsError::Channel(msg) => {
                SawmillError::Pipeline(PipelineError::ChannelSend(msg))
            }
            other => SawmillError::Pipeline(PipelineError::Receiver(other.to_string())),
        }
    }
}
