//! 도메인 타입 — 시스템 전역에서 사용되는 공통 타입
//!
//! 디코딩된 메시지와 배치를 표현하는 데이터 구조를 정의합니다.
//! 수신기(beats 크레이트)가 생성하고, 하류 sink가 소비합니다.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lumberjack 프로토콜 버전
///
/// 와이어 상에서는 ASCII `'1'` / `'2'` 한 바이트로 표현됩니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProtocolVersion {
    /// 버전 1 (legacy data 프레임 세대)
    V1,
    /// 버전 2 (JSON 프레임 세대, 기본값)
    #[default]
    V2,
}

impl ProtocolVersion {
    /// 와이어 버전 바이트를 해석합니다. 알 수 없는 바이트면 `None`.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'1' => Some(Self::V1),
            b'2' => Some(Self::V2),
            _ => None,
        }
    }

    /// 와이어 버전 바이트를 반환합니다.
    pub fn as_byte(self) -> u8 {
        match self {
            Self::V1 => b'1',
            Self::V2 => b'2',
        }
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V1 => write!(f, "v1"),
            Self::V2 => write!(f, "v2"),
        }
    }
}

/// 디코딩된 단일 메시지
///
/// JSON 프레임 또는 legacy data 프레임 하나당 한 개 생성됩니다.
/// JSON 디코딩에 실패한 메시지는 `payload`가 `Value::Null`로 유지됩니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// 클라이언트가 부여한 시퀀스 번호
    pub sequence: u32,
    /// 디코딩된 페이로드 (임의의 JSON 값)
    pub payload: serde_json::Value,
}

impl Message {
    /// 새 메시지를 생성합니다.
    pub fn new(sequence: u32, payload: serde_json::Value) -> Self {
        Self { sequence, payload }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Message[seq={}]", self.sequence)
    }
}

/// 윈도우 크기로 경계 지어진 메시지 배치
///
/// 불변식: `messages.len() <= window_size`.
/// 수신기가 배치를 완성하거나 조기 플러시할 때 생성되어
/// 하류로 전달됩니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    /// 연결에서 협상된 프로토콜 버전
    pub protocol: ProtocolVersion,
    /// 배치가 완성되는 메시지 수 (클라이언트가 공지)
    pub window_size: u32,
    /// 도착(시퀀스) 순서가 보존된 메시지 목록
    pub messages: Vec<Message>,
}

impl Batch {
    /// 새 배치를 생성합니다.
    pub fn new(protocol: ProtocolVersion, window_size: u32, messages: Vec<Message>) -> Self {
        Self {
            protocol,
            window_size,
            messages,
        }
    }

    /// 배치에 담긴 메시지 수를 반환합니다.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// 배치가 비어있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// 마지막 메시지의 시퀀스 번호를 반환합니다 (ack 대상).
    pub fn last_sequence(&self) -> Option<u32> {
        self.messages.last().map(|m| m.sequence)
    }
}

impl fmt::Display for Batch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Batch[{} {}/{} last_seq={:?}]",
            self.protocol,
            self.messages.len(),
            self.window_size,
            self.last_sequence(),
        )
    }
}
