//! 메트릭 상수 정의
//!
//! 모든 메트릭의 이름을 중앙에서 정의합니다. 각 모듈은 이 상수를
//! 사용하여 `metrics::counter!()`, `metrics::gauge!()` 매크로를
//! 호출합니다. 레코더 설치는 호스트 프로세스의 몫입니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `sawmill_`
//! - 모듈명: `beats_`, `sink_`
//! - 접미어: `_total` (counter), 없음 (gauge)

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 프레임 타입 레이블 키 (window, json, compressed, data)
pub const LABEL_FRAME_TYPE: &str = "frame_type";

/// 프로토콜 버전 레이블 키 (v1, v2)
pub const LABEL_PROTOCOL: &str = "protocol";

// ─── Beats 수신기 메트릭 ────────────────────────────────────────────

/// Beats: 디코딩된 프레임 수 (counter, label: frame_type)
pub const BEATS_FRAMES_TOTAL: &str = "sawmill_beats_frames_total";

/// Beats: 디코딩된 메시지 수 (counter)
pub const BEATS_MESSAGES_TOTAL: &str = "sawmill_beats_messages_total";

/// Beats: 플러시된 배치 수 (counter)
pub const BEATS_BATCHES_FLUSHED_TOTAL: &str = "sawmill_beats_batches_flushed_total";

/// Beats: 프로토콜 위반으로 재동기화한 횟수 (counter)
pub const BEATS_PROTOCOL_VIOLATIONS_TOTAL: &str = "sawmill_beats_protocol_violations_total";

/// Beats: JSON 디코딩 실패 수 (counter)
pub const BEATS_JSON_DECODE_ERRORS_TOTAL: &str = "sawmill_beats_json_decode_errors_total";

/// Beats: 압축 해제 실패 수 (counter)
pub const BEATS_DECOMPRESS_ERRORS_TOTAL: &str = "sawmill_beats_decompress_errors_total";

/// Beats: 전송된 ack 프레임 수 (counter)
pub const BEATS_ACKS_SENT_TOTAL: &str = "sawmill_beats_acks_sent_total";

/// Beats: 수신 바이트 수 (counter)
pub const BEATS_BYTES_RECEIVED_TOTAL: &str = "sawmill_beats_bytes_received_total";

/// Beats: 현재 활성 연결 수 (gauge)
pub const BEATS_ACTIVE_CONNECTIONS: &str = "sawmill_beats_active_connections";

// ─── Sink 메트릭 ────────────────────────────────────────────────────

/// Sink: 하류로 전달된 배치 수 (counter)
pub const SINK_BATCHES_DELIVERED_TOTAL: &str = "sawmill_sink_batches_delivered_total";

/// Sink: 하류로 전달된 메시지 수 (counter)
pub const SINK_MESSAGES_DELIVERED_TOTAL: &str = "sawmill_sink_messages_delivered_total";
