//! Ack 프레임 인코딩 및 회신
//!
//! 배치가 하류로 전달된 뒤, 클라이언트에게 마지막으로 처리된 시퀀스
//! 번호를 알리는 6바이트 ack 프레임을 회신합니다. 클라이언트는 이를
//! 받고 전송 윈도우를 전진시킵니다.
//!
//! 와이어 형식: 버전 바이트 + `'A'` + u32 big-endian 시퀀스 번호.

use metrics::counter;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use sawmill_core::metrics::BEATS_ACKS_SENT_TOTAL;
use sawmill_core::types::ProtocolVersion;

use crate::frame::FRAME_ACK;

/// ack 프레임 길이 (바이트)
pub const ACK_FRAME_LEN: usize = 6;

/// ack 프레임을 인코딩합니다.
pub fn encode_ack(protocol: ProtocolVersion, sequence: u32) -> [u8; ACK_FRAME_LEN] {
    let mut out = [0u8; ACK_FRAME_LEN];
    out[0] = protocol.as_byte();
    out[1] = FRAME_ACK;
    out[2..6].copy_from_slice(&sequence.to_be_bytes());
    out
}

/// ack 프레임을 전송 계층에 씁니다.
///
/// 쓰기 실패는 로깅만 하고 전파하지 않습니다. 쓰기가 실패할 정도면
/// 연결은 이미 끊어지는 중이며, 해제는 전송 계층(read 루프)의
/// 몫입니다.
pub async fn send_ack<W>(writer: &mut W, protocol: ProtocolVersion, sequence: u32)
where
    W: AsyncWrite + Unpin,
{
    let ack = encode_ack(protocol, sequence);
    match writer.write_all(&ack).await {
        Ok(()) => {
            counter!(BEATS_ACKS_SENT_TOTAL).increment(1);
            debug!(sequence, protocol = %protocol, "ack sent");
        }
        Err(err) => {
            warn!(
                sequence,
                error = %err,
                "failed to write ack, connection presumed closing"
            );
        }
    }
}
