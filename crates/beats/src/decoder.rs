//! 프레임 디코딩 상태 기계 -- 크레이트의 핵심
//!
//! [`FrameDecoder`]는 연결 하나의 [`DecoderState`]를 소유하고, 전송
//! 계층에서 도착하는 바이트(임의 크기 청크)를 증분 소비하며 프레임을
//! 해석합니다. 압축 프레임을 해제한 결과 버퍼도 **동일한** 전이
//! 로직으로 재진입 처리합니다. 상태 전이 테이블은 이 타입 하나에만
//! 존재합니다.
//!
//! # 상태 전이
//!
//! ```text
//! ReadHeader(1) -> ReadFrameType(1) -+-> ReadWindowSize(4) ----------> ReadHeader
//!                                    +-> ReadJsonHeader(8) -> ReadJson(len) -> ReadHeader
//!                                    +-> ReadCompressedHeader(4) -> ReadCompressedFrame(len) -> ReadHeader
//!                                    +-> ReadDataFields(8, 이후 필드별 길이) -> ReadHeader
//! ```
//!
//! # 에러 정책
//!
//! 부족한 바이트는 에러가 아니라 중단 지점입니다: 디코더는 내부 버퍼에
//! 쌓아두고 호출자에게 제어를 돌려줍니다. 구조적으로 잘못된 입력(알 수
//! 없는 버전/프레임 타입, 압축 해제 실패, 상한 초과)은 부분 배치를
//! 플러시한 뒤 `ReadHeader`로 재동기화하며, 연결을 끊지 않습니다.
//! JSON 디코딩 실패는 해당 메시지의 페이로드를 null로 두고 계속합니다.

use bytes::BytesMut;
use metrics::counter;
use tracing::{debug, warn};

use sawmill_core::metrics::{
    BEATS_BATCHES_FLUSHED_TOTAL, BEATS_DECOMPRESS_ERRORS_TOTAL, BEATS_FRAMES_TOTAL,
    BEATS_JSON_DECODE_ERRORS_TOTAL, BEATS_MESSAGES_TOTAL, BEATS_PROTOCOL_VIOLATIONS_TOTAL,
    LABEL_FRAME_TYPE,
};
use sawmill_core::types::{Batch, Message, ProtocolVersion};

use crate::batch::BatchAccumulator;
use crate::cursor::ByteCursor;
use crate::error::BeatsError;
use crate::frame::{
    self, FRAME_COMPRESSED, FRAME_DATA, FRAME_JSON, FRAME_WINDOW_SIZE, Frame,
};
use crate::inflate::Inflator;

/// 디코더 상태
///
/// 각 상태는 완료에 필요한 바이트 수(`required_bytes`)를 가지며,
/// 그만큼 확보된 뒤에만 해석이 수행됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    /// 1바이트 프로토콜 버전 마커 대기
    ReadHeader,
    /// 1바이트 프레임 타입 마커 대기
    ReadFrameType,
    /// 4바이트 윈도우 크기 대기
    ReadWindowSize,
    /// 8바이트 JSON 프레임 헤더 (시퀀스 + 페이로드 길이) 대기
    ReadJsonHeader,
    /// 4바이트 압축 페이로드 길이 대기
    ReadCompressedHeader,
    /// 압축 페이로드 전체 대기
    ReadCompressedFrame,
    /// JSON 페이로드 전체 대기
    ReadJson,
    /// legacy data 프레임 헤더/필드 대기
    ReadDataFields,
}

/// legacy data 프레임 내부 진행 단계
///
/// `ReadDataFields` 상태는 8바이트 헤더, 필드별 4바이트 길이, 필드
/// 값을 차례로 요구하므로 별도 진행 단계를 둡니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DataFieldPhase {
    /// 시퀀스 + 필드 카운트 헤더
    Header,
    /// 다음 필드의 길이 접두사
    FieldLength,
    /// 필드 값 바이트
    FieldValue,
}

/// 프레임 디코딩 상태 기계
///
/// 연결당 정확히 하나 존재하며, 해당 연결의 I/O를 구동하는 단일
/// 태스크만 접근합니다.
pub struct FrameDecoder {
    /// 현재 상태
    state: DecoderState,
    /// 현재 상태를 완료하는 데 필요한 바이트 수
    required_bytes: usize,
    /// Json/Data 헤더에서 페이로드로 넘어갈 때 유지되는 시퀀스 번호
    sequence: u32,
    /// 배치 누적기
    batch: BatchAccumulator,
    /// 압축 프레임 해제기
    inflator: Inflator,
    /// 아직 상태를 완료하지 못한 수신 바이트
    pending: BytesMut,
    /// 프레임 페이로드 상한 (바이트)
    max_payload: usize,
    /// 윈도우 크기 상한
    max_window_size: u32,
    /// data 프레임 진행 단계
    data_phase: DataFieldPhase,
    /// 남은 data 필드 수
    data_fields_left: u32,
    /// 누적 중인 data 필드
    data_fields: serde_json::Map<String, serde_json::Value>,
}

impl FrameDecoder {
    /// 새 디코더를 생성합니다. 초기 상태는 `ReadHeader(1)`입니다.
    pub fn new(max_payload: usize, max_window_size: u32) -> Self {
        Self {
            state: DecoderState::ReadHeader,
            required_bytes: 1,
            sequence: 0,
            batch: BatchAccumulator::new(),
            inflator: Inflator::new(max_payload),
            pending: BytesMut::new(),
            max_payload,
            max_window_size,
            data_phase: DataFieldPhase::Header,
            data_fields_left: 0,
            data_fields: serde_json::Map::new(),
        }
    }

    /// 현재 상태를 반환합니다.
    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// 현재 상태를 완료하는 데 필요한 바이트 수를 반환합니다.
    pub fn required_bytes(&self) -> usize {
        self.required_bytes
    }

    /// 연결에서 감지된 프로토콜 버전을 반환합니다.
    pub fn protocol(&self) -> ProtocolVersion {
        self.batch.protocol()
    }

    /// 현재 윈도우 크기를 반환합니다.
    pub fn window_size(&self) -> u32 {
        self.batch.window_size()
    }

    /// 누적 중인 미완성 배치의 메시지 수를 반환합니다.
    pub fn pending_messages(&self) -> usize {
        self.batch.len()
    }

    /// 전송 계층에서 받은 바이트를 공급하고, 완성된 배치를 반환합니다.
    ///
    /// 입력이 현재 상태를 완료하기에 부족하면 내부에 쌓아두고 빈
    /// Vec을 반환합니다. 청크 경계는 디코딩 결과에 영향을 주지
    /// 않습니다. 구조적 오류는 내부에서 복구되므로 이 함수는 실패하지
    /// 않습니다.
    pub fn feed(&mut self, data: &[u8]) -> Vec<Batch> {
        self.pending.extend_from_slice(data);
        let mut completed = Vec::new();
        while self.pending.len() >= self.required_bytes {
            let frame_bytes = self.pending.split_to(self.required_bytes);
            self.advance(&frame_bytes, &mut completed);
        }
        completed
    }

    /// 미완성 배치를 best-effort로 내보냅니다 (연결 종료 시).
    pub fn flush_partial(&mut self) -> Option<Batch> {
        let batch = self.batch.flush();
        if batch.is_some() {
            counter!(BEATS_BATCHES_FLUSHED_TOTAL).increment(1);
        }
        batch
    }

    /// `required_bytes`만큼 확보된 바이트로 현재 상태를 실행합니다.
    ///
    /// 구조적 오류는 여기서 흡수됩니다: 부분 배치 플러시 후
    /// `ReadHeader`로 재동기화하고 후속 바이트 처리를 계속합니다.
    fn advance(&mut self, bytes: &[u8], completed: &mut Vec<Batch>) {
        if let Err(err) = self.step(bytes, completed) {
            warn!(error = %err, state = ?self.state, "protocol error, resynchronizing");
            counter!(BEATS_PROTOCOL_VIOLATIONS_TOTAL).increment(1);
            self.resync(completed);
        }
    }

    /// 상태 전이 테이블 본체.
    fn step(&mut self, bytes: &[u8], completed: &mut Vec<Batch>) -> Result<(), BeatsError> {
        match self.state {
            DecoderState::ReadHeader => {
                let byte = ByteCursor::new(bytes).read_byte()?;
                match ProtocolVersion::from_byte(byte) {
                    Some(version) => {
                        debug!(%version, "frame version detected");
                        self.batch.set_protocol(version);
                        self.transition(DecoderState::ReadFrameType, 1);
                        Ok(())
                    }
                    None => Err(BeatsError::ProtocolViolation {
                        reason: format!("unknown protocol version byte 0x{byte:02x}"),
                    }),
                }
            }

            DecoderState::ReadFrameType => {
                let frame_type = ByteCursor::new(bytes).read_byte()?;
                counter!(BEATS_FRAMES_TOTAL, LABEL_FRAME_TYPE => frame::frame_type_label(frame_type))
                    .increment(1);
                match frame_type {
                    FRAME_WINDOW_SIZE => {
                        self.transition(DecoderState::ReadWindowSize, 4);
                        Ok(())
                    }
                    FRAME_JSON => {
                        self.transition(DecoderState::ReadJsonHeader, 8);
                        Ok(())
                    }
                    FRAME_COMPRESSED => {
                        self.transition(DecoderState::ReadCompressedHeader, 4);
                        Ok(())
                    }
                    FRAME_DATA => {
                        self.data_phase = DataFieldPhase::Header;
                        self.transition(DecoderState::ReadDataFields, 8);
                        Ok(())
                    }
                    other => Err(BeatsError::ProtocolViolation {
                        reason: format!("unknown frame type 0x{other:02x}"),
                    }),
                }
            }

            DecoderState::ReadWindowSize => {
                let size = ByteCursor::new(bytes).read_u32_be()?;
                self.on_frame(Frame::WindowSize { size }, completed)
            }

            DecoderState::ReadJsonHeader => {
                let mut cursor = ByteCursor::new(bytes);
                let sequence = cursor.read_u32_be()?;
                let payload_length = cursor.read_u32_be()?;
                self.on_frame(
                    Frame::JsonHeader {
                        sequence,
                        payload_length,
                    },
                    completed,
                )
            }

            DecoderState::ReadCompressedHeader => {
                let payload_length = ByteCursor::new(bytes).read_u32_be()?;
                self.on_frame(Frame::CompressedHeader { payload_length }, completed)
            }

            DecoderState::ReadJson => {
                let payload = decode_json_lenient(bytes, self.sequence);
                self.push_message(Message::new(self.sequence, payload), completed);
                self.next_frame();
                Ok(())
            }

            DecoderState::ReadCompressedFrame => {
                let inflated = match self.inflator.inflate(bytes) {
                    Ok(data) => data,
                    Err(err) => {
                        counter!(BEATS_DECOMPRESS_ERRORS_TOTAL).increment(1);
                        return Err(err);
                    }
                };
                debug!(
                    compressed = bytes.len(),
                    inflated = inflated.len(),
                    "inflated compressed frame"
                );
                self.next_frame();
                self.run_inflated(&inflated, completed);
                Ok(())
            }

            DecoderState::ReadDataFields => self.step_data_fields(bytes, completed),
        }
    }

    /// 헤더까지 해석된 프레임을 적용합니다.
    fn on_frame(&mut self, frame: Frame, completed: &mut Vec<Batch>) -> Result<(), BeatsError> {
        match frame {
            Frame::WindowSize { size } => {
                if size == 0 || size > self.max_window_size {
                    return Err(BeatsError::ProtocolViolation {
                        reason: format!(
                            "window size {size} out of range (max {})",
                            self.max_window_size
                        ),
                    });
                }
                // 미완성 배치 중 새 윈도우 공지가 오면 현재 배치를 먼저
                // 내보냄. 윈도우와 시퀀스 외에는 프레임 경계를 알 방법이
                // 없으므로 발생할 수 있는 정상 경로임 (경고, 에러 아님).
                if !self.batch.is_empty() {
                    warn!(
                        pending = self.batch.len(),
                        new_window = size,
                        "new window size received before current batch completed, flushing early"
                    );
                    self.flush_into(completed);
                }
                self.batch.set_window_size(size);
                debug!(window_size = size, "window size updated");
                self.next_frame();
            }
            Frame::JsonHeader {
                sequence,
                payload_length,
            } => {
                self.check_payload_size(payload_length)?;
                debug!(sequence, payload_length, "json frame header");
                self.sequence = sequence;
                self.transition(DecoderState::ReadJson, payload_length as usize);
            }
            Frame::CompressedHeader { payload_length } => {
                self.check_payload_size(payload_length)?;
                self.transition(DecoderState::ReadCompressedFrame, payload_length as usize);
            }
            Frame::DataHeader {
                sequence,
                field_count,
            } => {
                debug!(sequence, field_count, "data frame header");
                self.sequence = sequence;
                self.data_fields = serde_json::Map::new();
                // 필드 카운트는 헤더 자신을 포함해 계산되므로 실제
                // 필드는 field_count - 1개
                if field_count <= 1 {
                    let payload =
                        serde_json::Value::Object(std::mem::take(&mut self.data_fields));
                    self.push_message(Message::new(sequence, payload), completed);
                    self.next_frame();
                } else {
                    self.data_fields_left = field_count - 1;
                    self.data_phase = DataFieldPhase::FieldLength;
                    self.transition(DecoderState::ReadDataFields, 4);
                }
            }
        }
        Ok(())
    }

    /// legacy data 프레임의 단계별 처리.
    fn step_data_fields(
        &mut self,
        bytes: &[u8],
        completed: &mut Vec<Batch>,
    ) -> Result<(), BeatsError> {
        match self.data_phase {
            DataFieldPhase::Header => {
                let mut cursor = ByteCursor::new(bytes);
                let sequence = cursor.read_u32_be()?;
                let field_count = cursor.read_u32_be()?;
                self.on_frame(
                    Frame::DataHeader {
                        sequence,
                        field_count,
                    },
                    completed,
                )
            }
            DataFieldPhase::FieldLength => {
                let length = ByteCursor::new(bytes).read_u32_be()?;
                self.check_payload_size(length)?;
                if length == 0 {
                    self.record_data_field(String::new(), completed);
                } else {
                    self.data_phase = DataFieldPhase::FieldValue;
                    self.transition(DecoderState::ReadDataFields, length as usize);
                }
                Ok(())
            }
            DataFieldPhase::FieldValue => {
                let value = String::from_utf8_lossy(bytes).into_owned();
                self.record_data_field(value, completed);
                Ok(())
            }
        }
    }

    /// data 필드 하나를 기록하고 프레임 완료 여부를 판정합니다.
    fn record_data_field(&mut self, value: String, completed: &mut Vec<Batch>) {
        let index = self.data_fields.len();
        self.data_fields
            .insert(format!("field_{index}"), serde_json::Value::String(value));
        self.data_fields_left = self.data_fields_left.saturating_sub(1);
        if self.data_fields_left == 0 {
            let payload = serde_json::Value::Object(std::mem::take(&mut self.data_fields));
            self.push_message(Message::new(self.sequence, payload), completed);
            self.next_frame();
        } else {
            self.data_phase = DataFieldPhase::FieldLength;
            self.transition(DecoderState::ReadDataFields, 4);
        }
    }

    /// 압축 해제된 sub-stream을 동일한 전이 로직으로 소비합니다.
    ///
    /// sub-stream 내부에는 버전 바이트가 반복되지 않으므로
    /// `ReadHeader` 상태는 바이트 소비 없이 연결의 버전을 상속하고
    /// 넘어갑니다. sub-stream이 프레임 중간에서 끝나면 프로토콜
    /// 위반으로 처리합니다 (압축 프레임은 자기완결적이어야 함).
    fn run_inflated(&mut self, data: &[u8], completed: &mut Vec<Batch>) {
        let mut cursor = ByteCursor::new(data);
        loop {
            if self.state == DecoderState::ReadHeader {
                if cursor.remaining() == 0 {
                    // sub-stream 소진, 프레임 경계에서 정상 종료
                    break;
                }
                self.transition(DecoderState::ReadFrameType, 1);
            }
            if cursor.remaining() < self.required_bytes {
                warn!(
                    remaining = cursor.remaining(),
                    required = self.required_bytes,
                    state = ?self.state,
                    "inflated sub-stream truncated mid-frame, resynchronizing"
                );
                counter!(BEATS_PROTOCOL_VIOLATIONS_TOTAL).increment(1);
                self.resync(completed);
                break;
            }
            match cursor.read_exact(self.required_bytes) {
                Ok(frame_bytes) => self.advance(frame_bytes, completed),
                Err(_) => {
                    // 위의 remaining 검사로 도달 불가하지만, 방어적으로
                    // 재동기화 후 종료
                    self.resync(completed);
                    break;
                }
            }
        }
    }

    /// 페이로드 길이가 설정된 상한 이내인지 확인합니다.
    fn check_payload_size(&self, length: u32) -> Result<(), BeatsError> {
        if length as usize > self.max_payload {
            return Err(BeatsError::PayloadTooLarge {
                size: length as usize,
                max: self.max_payload,
            });
        }
        Ok(())
    }

    /// 메시지를 배치에 추가하고, 가득 찼으면 즉시 플러시합니다.
    fn push_message(&mut self, message: Message, completed: &mut Vec<Batch>) {
        counter!(BEATS_MESSAGES_TOTAL).increment(1);
        self.batch.add_message(message);
        if self.batch.is_full() {
            self.flush_into(completed);
        }
    }

    /// 누적된 배치가 있으면 내보냅니다 (비어있으면 no-op).
    fn flush_into(&mut self, completed: &mut Vec<Batch>) {
        if let Some(batch) = self.batch.flush() {
            counter!(BEATS_BATCHES_FLUSHED_TOTAL).increment(1);
            completed.push(batch);
        }
    }

    /// 부분 배치를 플러시하고 `ReadHeader`로 재동기화합니다.
    fn resync(&mut self, completed: &mut Vec<Batch>) {
        self.flush_into(completed);
        self.data_phase = DataFieldPhase::Header;
        self.data_fields_left = 0;
        self.data_fields = serde_json::Map::new();
        self.transition(DecoderState::ReadHeader, 1);
    }

    /// 다음 프레임의 버전 바이트 대기 상태로 전이합니다.
    fn next_frame(&mut self) {
        self.transition(DecoderState::ReadHeader, 1);
    }

    fn transition(&mut self, next: DecoderState, required_bytes: usize) {
        debug!(from = ?self.state, to = ?next, required_bytes, "decoder transition");
        self.state = next;
        self.required_bytes = required_bytes;
    }
}

/// JSON 페이로드를 관대하게 디코딩합니다.
///
/// 디코딩 실패는 연결을 중단시키지 않습니다. 해당 메시지는 null
/// 페이로드로 기록되고 배치는 계속 진행됩니다.
fn decode_json_lenient(raw: &[u8], sequence: u32) -> serde_json::Value {
    match serde_json::from_slice(raw) {
        Ok(value) => value,
        Err(err) => {
            counter!(BEATS_JSON_DECODE_ERRORS_TOTAL).increment(1);
            warn!(
                sequence,
                error = %err,
                "could not decode json payload, recording null payload"
            );
            serde_json::Value::Null
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const MAX_PAYLOAD: usize = 1024 * 1024;
    const MAX_WINDOW: u32 = 65_536;

    fn decoder() -> FrameDecoder {
        FrameDecoder::new(MAX_PAYLOAD, MAX_WINDOW)
    }

    /// 윈도우 크기 프레임을 인코딩합니다.
    fn window_frame(size: u32) -> Vec<u8> {
        let mut out = vec![b'2', b'W'];
        out.extend_from_slice(&size.to_be_bytes());
        out
    }

    /// JSON 프레임을 인코딩합니다.
    fn json_frame(sequence: u32, payload: &serde_json::Value) -> Vec<u8> {
        let body = serde_json::to_vec(payload).unwrap();
        let mut out = vec![b'2', b'J'];
        out.extend_from_slice(&sequence.to_be_bytes());
        out.extend_from_slice(&(body.len() as u32).to_be_bytes());
        out.extend_from_slice(&body);
        out
    }

    /// 버전 바이트 없는 프레임 바디를 인코딩합니다 (sub-stream용).
    fn json_frame_body(sequence: u32, payload: &serde_json::Value) -> Vec<u8> {
        let body = serde_json::to_vec(payload).unwrap();
        let mut out = vec![b'J'];
        out.extend_from_slice(&sequence.to_be_bytes());
        out.extend_from_slice(&(body.len() as u32).to_be_bytes());
        out.extend_from_slice(&body);
        out
    }

    fn zlib_compress(data: &[u8]) -> Vec<u8> {
        use flate2::Compression;
        use flate2::write::ZlibEncoder;
        use std::io::Write;
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn compressed_frame(inner: &[u8]) -> Vec<u8> {
        let compressed = zlib_compress(inner);
        let mut out = vec![b'2', b'C'];
        out.extend_from_slice(&(compressed.len() as u32).to_be_bytes());
        out.extend_from_slice(&compressed);
        out
    }

    #[test]
    fn initial_state_is_read_header() {
        let dec = decoder();
        assert_eq!(dec.state(), DecoderState::ReadHeader);
        assert_eq!(dec.required_bytes(), 1);
    }

    #[test]
    fn decodes_full_window_of_json_frames() {
        let mut dec = decoder();
        let mut stream = window_frame(2);
        stream.extend_from_slice(&json_frame(1, &json!({"message": "one"})));
        stream.extend_from_slice(&json_frame(2, &json!({"message": "two"})));

        let batches = dec.feed(&stream);
        assert_eq!(batches.len(), 1);
        let batch = &batches[0];
        assert_eq!(batch.window_size, 2);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.messages[0].sequence, 1);
        assert_eq!(batch.messages[0].payload["message"], "one");
        assert_eq!(batch.messages[1].sequence, 2);
        // 배치 완성 후 상태 초기화 확인
        assert_eq!(dec.pending_messages(), 0);
        assert_eq!(dec.state(), DecoderState::ReadHeader);
    }

    #[test]
    fn incomplete_window_yields_no_batch() {
        let mut dec = decoder();
        let mut stream = window_frame(3);
        stream.extend_from_slice(&json_frame(1, &json!({"a": 1})));

        let batches = dec.feed(&stream);
        assert!(batches.is_empty());
        assert_eq!(dec.pending_messages(), 1);
        assert_eq!(dec.window_size(), 3);
    }

    #[test]
    fn byte_at_a_time_equals_single_feed() {
        let mut stream = window_frame(2);
        stream.extend_from_slice(&json_frame(1, &json!({"message": "one"})));
        stream.extend_from_slice(&json_frame(2, &json!({"message": "two"})));

        let mut whole = decoder();
        let expected = whole.feed(&stream);

        let mut trickle = decoder();
        let mut collected = Vec::new();
        for byte in &stream {
            collected.extend(trickle.feed(std::slice::from_ref(byte)));
        }

        assert_eq!(expected.len(), 1);
        assert_eq!(collected.len(), 1);
        assert_eq!(
            serde_json::to_string(&expected[0]).unwrap(),
            serde_json::to_string(&collected[0]).unwrap()
        );
    }

    #[test]
    fn default_window_delivers_per_message() {
        // 윈도우 공지가 없으면 기본 윈도우 1: 메시지마다 배치 완성
        let mut dec = decoder();
        let batches = dec.feed(&json_frame(9, &json!({"solo": true})));
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 1);
        assert_eq!(batches[0].last_sequence(), Some(9));
    }

    #[test]
    fn window_change_flushes_partial_batch() {
        let mut dec = decoder();
        let mut stream = window_frame(5);
        stream.extend_from_slice(&json_frame(1, &json!({"n": 1})));
        stream.extend_from_slice(&json_frame(2, &json!({"n": 2})));
        stream.extend_from_slice(&window_frame(3));

        let batches = dec.feed(&stream);
        // 2개짜리 부분 배치가 조기 플러시됨
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 2);
        assert_eq!(batches[0].window_size, 5);
        // 새 윈도우 크기가 적용됨
        assert_eq!(dec.window_size(), 3);
        assert_eq!(dec.pending_messages(), 0);
    }

    #[test]
    fn window_never_exceeded() {
        let mut dec = decoder();
        let mut stream = window_frame(2);
        for seq in 1..=5 {
            stream.extend_from_slice(&json_frame(seq, &json!({"n": seq})));
        }
        let batches = dec.feed(&stream);
        // 5개 메시지 = 2 + 2 완성, 1개 누적 중
        assert_eq!(batches.len(), 2);
        for batch in &batches {
            assert!(batch.len() as u32 <= batch.window_size);
        }
        assert_eq!(dec.pending_messages(), 1);
    }

    #[test]
    fn compressed_frame_round_trips() {
        let mut inner = Vec::new();
        // sub-stream: 버전 바이트 없이 프레임 바디만 이어짐
        inner.extend_from_slice(&[b'W', 0, 0, 0, 2]);
        inner.extend_from_slice(&json_frame_body(1, &json!({"message": "one"})));
        inner.extend_from_slice(&json_frame_body(2, &json!({"message": "two"})));

        let mut dec = decoder();
        let batches = dec.feed(&compressed_frame(&inner));
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 2);
        assert_eq!(batches[0].messages[1].payload["message"], "two");
        // sub-stream 소진 후 전송 스트림은 버전 바이트부터 재개
        assert_eq!(dec.state(), DecoderState::ReadHeader);
    }

    #[test]
    fn compressed_then_plain_frames_interleave() {
        let inner = json_frame_body(1, &json!({"src": "compressed"}));

        let mut dec = decoder();
        let mut stream = window_frame(2);
        stream.extend_from_slice(&compressed_frame(&inner));
        stream.extend_from_slice(&json_frame(2, &json!({"src": "plain"})));

        let batches = dec.feed(&stream);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].messages[0].payload["src"], "compressed");
        assert_eq!(batches[0].messages[1].payload["src"], "plain");
    }

    #[test]
    fn corrupt_compressed_payload_resyncs() {
        let mut dec = decoder();
        let mut stream = vec![b'2', b'C', 0, 0, 0, 4];
        stream.extend_from_slice(b"junk");
        // 압축 해제 실패 후에도 후속 프레임은 정상 디코딩
        stream.extend_from_slice(&json_frame(1, &json!({"ok": true})));

        let batches = dec.feed(&stream);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].messages[0].payload["ok"], true);
    }

    #[test]
    fn truncated_substream_resyncs() {
        // sub-stream이 JSON 헤더 중간에서 끊김
        let mut inner = json_frame_body(1, &json!({"complete": true}));
        inner.extend_from_slice(&[b'J', 0, 0]);

        let mut dec = decoder();
        let mut stream = window_frame(4);
        stream.extend_from_slice(&compressed_frame(&inner));
        // 잘린 sub-stream의 부분 배치는 플러시, 이후 전송 스트림은 정상
        stream.extend_from_slice(&json_frame(2, &json!({"after": true})));

        let batches = dec.feed(&stream);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 1);
        assert_eq!(batches[0].messages[0].payload["complete"], true);
        assert_eq!(dec.pending_messages(), 1);
    }

    #[test]
    fn invalid_version_byte_resyncs() {
        let mut dec = decoder();
        let mut stream = vec![b'9'];
        stream.extend_from_slice(&json_frame(1, &json!({"valid": true})));

        let batches = dec.feed(&stream);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].messages[0].payload["valid"], true);
    }

    #[test]
    fn unknown_frame_type_flushes_partial_and_resyncs() {
        let mut dec = decoder();
        let mut stream = window_frame(5);
        stream.extend_from_slice(&json_frame(1, &json!({"n": 1})));
        stream.extend_from_slice(&[b'2', b'X']);
        stream.extend_from_slice(&json_frame(2, &json!({"n": 2})));

        let batches = dec.feed(&stream);
        // 부분 배치(1개)가 위반 시점에 플러시됨
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 1);
        // 'X' 다음의 유효 프레임은 계속 누적됨
        assert_eq!(dec.pending_messages(), 1);
    }

    #[test]
    fn violation_with_empty_batch_flushes_nothing() {
        let mut dec = decoder();
        let batches = dec.feed(&[b'9', b'9', b'9']);
        assert!(batches.is_empty());
        assert_eq!(dec.state(), DecoderState::ReadHeader);
    }

    #[test]
    fn malformed_json_keeps_null_payload() {
        let mut dec = decoder();
        let mut stream = vec![b'2', b'J', 0, 0, 0, 7, 0, 0, 0, 5];
        stream.extend_from_slice(b"{oops");

        let batches = dec.feed(&stream);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].messages[0].sequence, 7);
        assert!(batches[0].messages[0].payload.is_null());
    }

    #[test]
    fn empty_json_payload_records_null() {
        let mut dec = decoder();
        let stream = vec![b'2', b'J', 0, 0, 0, 3, 0, 0, 0, 0];
        let batches = dec.feed(&stream);
        assert_eq!(batches.len(), 1);
        assert!(batches[0].messages[0].payload.is_null());
        assert_eq!(dec.state(), DecoderState::ReadHeader);
    }

    #[test]
    fn oversized_json_payload_is_violation() {
        let mut dec = FrameDecoder::new(16, MAX_WINDOW);
        // 헤더가 상한(16B)을 넘는 페이로드 길이를 선언 — 헤더 단계에서
        // 거부되므로 페이로드 바이트는 소비되지 않고, 바로 다음 유효
        // 프레임부터 재동기화됨
        let mut stream = vec![b'2', b'J', 0, 0, 0, 1];
        stream.extend_from_slice(&1000u32.to_be_bytes());
        stream.extend_from_slice(&json_frame(2, &json!({"a": 1})));

        let batches = dec.feed(&stream);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].messages[0].sequence, 2);
        assert_eq!(batches[0].messages[0].payload["a"], 1);
    }

    #[test]
    fn zero_window_size_is_violation() {
        let mut dec = decoder();
        let mut stream = window_frame(0);
        stream.extend_from_slice(&json_frame(1, &json!({"ok": 1})));

        let batches = dec.feed(&stream);
        // 기본 윈도우(1)가 유지되어 메시지당 배치
        assert_eq!(batches.len(), 1);
        assert_eq!(dec.window_size(), 1);
    }

    #[test]
    fn v1_data_frame_decodes_fields() {
        let mut dec = decoder();
        let mut stream = vec![b'1', b'D'];
        stream.extend_from_slice(&3u32.to_be_bytes()); // sequence
        stream.extend_from_slice(&3u32.to_be_bytes()); // field_count (실제 필드 2개)
        stream.extend_from_slice(&5u32.to_be_bytes());
        stream.extend_from_slice(b"hello");
        stream.extend_from_slice(&5u32.to_be_bytes());
        stream.extend_from_slice(b"world");

        let batches = dec.feed(&stream);
        assert_eq!(batches.len(), 1);
        let msg = &batches[0].messages[0];
        assert_eq!(msg.sequence, 3);
        assert_eq!(msg.payload["field_0"], "hello");
        assert_eq!(msg.payload["field_1"], "world");
        assert_eq!(batches[0].protocol, ProtocolVersion::V1);
    }

    #[test]
    fn data_frame_with_no_fields() {
        let mut dec = decoder();
        let mut stream = vec![b'1', b'D'];
        stream.extend_from_slice(&4u32.to_be_bytes()); // sequence
        stream.extend_from_slice(&1u32.to_be_bytes()); // field_count 1 = 필드 없음

        let batches = dec.feed(&stream);
        assert_eq!(batches.len(), 1);
        let msg = &batches[0].messages[0];
        assert_eq!(msg.sequence, 4);
        assert_eq!(msg.payload, json!({}));
    }

    #[test]
    fn data_frame_chunked_delivery() {
        let mut stream = vec![b'1', b'D'];
        stream.extend_from_slice(&8u32.to_be_bytes());
        stream.extend_from_slice(&2u32.to_be_bytes());
        stream.extend_from_slice(&4u32.to_be_bytes());
        stream.extend_from_slice(b"data");

        let mut dec = decoder();
        let mut collected = Vec::new();
        for byte in &stream {
            collected.extend(dec.feed(std::slice::from_ref(byte)));
        }
        assert_eq!(collected.len(), 1);
        assert_eq!(collected[0].messages[0].payload["field_0"], "data");
    }

    #[test]
    fn flush_partial_returns_remainder() {
        let mut dec = decoder();
        let mut stream = window_frame(10);
        stream.extend_from_slice(&json_frame(1, &json!({"n": 1})));
        stream.extend_from_slice(&json_frame(2, &json!({"n": 2})));

        assert!(dec.feed(&stream).is_empty());
        let batch = dec.flush_partial().unwrap();
        assert_eq!(batch.len(), 2);
        assert!(dec.flush_partial().is_none());
    }

    #[test]
    fn sequence_order_preserved_within_batch() {
        let mut dec = decoder();
        let mut stream = window_frame(4);
        for seq in [10, 11, 12, 13] {
            stream.extend_from_slice(&json_frame(seq, &json!({"seq": seq})));
        }
        let batches = dec.feed(&stream);
        assert_eq!(batches.len(), 1);
        let sequences: Vec<u32> = batches[0].messages.iter().map(|m| m.sequence).collect();
        assert_eq!(sequences, vec![10, 11, 12, 13]);
    }

    #[test]
    fn nested_compressed_frame() {
        // 압축 프레임 안에 또 압축 프레임 — 프로토콜상 드물지만 상태
        // 기계는 재귀적으로 처리함
        let innermost = json_frame_body(1, &json!({"depth": 2}));
        let mut middle = Vec::new();
        let compressed_inner = zlib_compress(&innermost);
        middle.push(b'C');
        middle.extend_from_slice(&(compressed_inner.len() as u32).to_be_bytes());
        middle.extend_from_slice(&compressed_inner);

        let mut dec = decoder();
        let batches = dec.feed(&compressed_frame(&middle));
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].messages[0].payload["depth"], 2);
    }
}
