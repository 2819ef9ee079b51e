//! 배치 누적 -- 윈도우 크기 단위의 메시지 수집
//!
//! [`BatchAccumulator`]는 디코딩된 메시지를 협상된 윈도우 크기에
//! 도달할 때까지 모으고, [`flush`](BatchAccumulator::flush)로 완성된
//! 배치를 내보냅니다.
//!
//! 플러시는 누적된 메시지가 이 컴포넌트를 떠나는 유일한 경로이며,
//! 다음 세 경우에 호출됩니다:
//! - 배치가 가득 찼을 때
//! - 미완성 배치 중 새 윈도우 크기 공지가 도착했을 때 (조기 플러시)
//! - 연결 종료 시 잔여 배치의 best-effort 전달

use sawmill_core::types::{Batch, Message, ProtocolVersion};

/// 윈도우 크기 공지가 없을 때의 기본값
///
/// 윈도우를 공지하지 않는 클라이언트도 메시지당 한 배치로 전달됩니다.
const DEFAULT_WINDOW_SIZE: u32 = 1;

/// 윈도우 단위 배치 누적기
///
/// 불변식: `len() <= window_size()`. 가득 참 판정은 메시지를 추가한
/// 직후 호출자(디코더)의 몫입니다.
#[derive(Debug)]
pub struct BatchAccumulator {
    /// 연결의 프로토콜 버전
    protocol: ProtocolVersion,
    /// 현재 윈도우 크기
    window_size: u32,
    /// 누적 중인 메시지
    messages: Vec<Message>,
}

impl BatchAccumulator {
    /// 새 누적기를 생성합니다.
    pub fn new() -> Self {
        Self {
            protocol: ProtocolVersion::default(),
            window_size: DEFAULT_WINDOW_SIZE,
            messages: Vec::new(),
        }
    }

    /// 연결의 프로토콜 버전을 설정합니다.
    pub fn set_protocol(&mut self, protocol: ProtocolVersion) {
        self.protocol = protocol;
    }

    /// 연결의 프로토콜 버전을 반환합니다.
    pub fn protocol(&self) -> ProtocolVersion {
        self.protocol
    }

    /// 윈도우 크기를 설정합니다.
    pub fn set_window_size(&mut self, window_size: u32) {
        self.window_size = window_size;
    }

    /// 현재 윈도우 크기를 반환합니다.
    pub fn window_size(&self) -> u32 {
        self.window_size
    }

    /// 메시지를 추가합니다.
    ///
    /// 추가 직후 [`is_full`](Self::is_full)을 확인하고 가득 찼으면
    /// 즉시 플러시해야 합니다.
    pub fn add_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// 누적된 메시지 수를 반환합니다.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// 누적된 메시지가 없는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// 배치가 윈도우 크기에 도달했는지 확인합니다.
    pub fn is_full(&self) -> bool {
        self.messages.len() as u32 >= self.window_size
    }

    /// 현재 배치를 내보내고 빈 배치로 재설정합니다.
    ///
    /// 윈도우 크기와 프로토콜 버전은 유지됩니다.
    /// 누적된 메시지가 없으면 `None`을 반환합니다 (no-op).
    pub fn flush(&mut self) -> Option<Batch> {
        if self.messages.is_empty() {
            return None;
        }
        let messages = std::mem::take(&mut self.messages);
        Some(Batch::new(self.protocol, self.window_size, messages))
    }
}

impl Default for BatchAccumulator {
    fn default() -> Self {
        Self::new()
    }
}
