//! 연결 세션 -- 연결당 디코딩 조립 지점
//!
//! [`ConnectionSession`]은 TCP 연결 하나에 대해 [`FrameDecoder`] 하나를
//! 소유하고, 수신 바이트를 디코더에 공급하며, 완성된 배치를 하류
//! 채널로 전달합니다. 역할([`SessionRole`])에 따라 전달 후 ack 회신
//! 여부가 갈립니다.
//!
//! 세션 상태는 해당 연결의 I/O를 구동하는 단일 태스크만 접근하므로
//! 락이 필요 없습니다.

use tokio::io::AsyncWrite;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use sawmill_core::event::BatchEvent;
use sawmill_core::types::Batch;

use crate::ack;
use crate::config::BeatsConfig;
use crate::decoder::FrameDecoder;
use crate::error::BeatsError;

/// 배치 완료 시 세션의 역할
///
/// 생성 시점에 한 번 선택되어 match로 분기합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionRole {
    /// 배치를 하류로 전달만 함
    Collect,
    /// 배치 전달 후 마지막 시퀀스 번호를 ack로 회신
    CollectAndAck,
}

/// 연결당 디코딩 세션
pub struct ConnectionSession {
    /// 프레임 디코더 (연결당 하나)
    decoder: FrameDecoder,
    /// 배치 완료 시 역할
    role: SessionRole,
    /// 클라이언트 주소 (로깅 및 이벤트 표기용)
    peer: String,
    /// 하류 배치 이벤트 채널
    batch_tx: mpsc::Sender<BatchEvent>,
    /// 종료 처리가 이미 수행되었는지 여부
    closed: bool,
}

impl ConnectionSession {
    /// 새 세션을 생성합니다.
    pub fn new(
        config: &BeatsConfig,
        role: SessionRole,
        peer: impl Into<String>,
        batch_tx: mpsc::Sender<BatchEvent>,
    ) -> Self {
        Self {
            decoder: FrameDecoder::new(config.max_payload_bytes(), config.max_window_size),
            role,
            peer: peer.into(),
            batch_tx,
            closed: false,
        }
    }

    /// 세션의 역할을 반환합니다.
    pub fn role(&self) -> SessionRole {
        self.role
    }

    /// 전송 계층에서 받은 바이트를 처리합니다.
    ///
    /// 디코더가 배치를 완성하면 즉시 하류로 전달하고, 역할에 따라
    /// ack를 회신합니다. 하류 채널이 닫힌 경우에만 실패합니다.
    pub async fn on_bytes_received<W>(
        &mut self,
        data: &[u8],
        writer: &mut W,
    ) -> Result<(), BeatsError>
    where
        W: AsyncWrite + Unpin,
    {
        for batch in self.decoder.feed(data) {
            self.deliver(batch, writer).await?;
        }
        Ok(())
    }

    /// 연결 종료를 처리합니다. 정확히 한 번만 동작합니다.
    ///
    /// 미완성 배치가 있으면 best-effort로 전달을 시도합니다.
    /// 전달 실패는 로깅만 합니다 (연결은 이미 끝났음).
    pub async fn on_connection_closed<W>(&mut self, writer: &mut W)
    where
        W: AsyncWrite + Unpin,
    {
        if self.closed {
            return;
        }
        self.closed = true;

        if let Some(batch) = self.decoder.flush_partial() {
            debug!(
                peer = %self.peer,
                messages = batch.len(),
                "flushing partial batch on connection close"
            );
            if let Err(err) = self.deliver(batch, writer).await {
                warn!(
                    peer = %self.peer,
                    error = %err,
                    "failed to deliver final partial batch"
                );
            }
        }
    }

    /// 배치 하나를 하류로 전달하고, 역할에 따라 ack를 회신합니다.
    async fn deliver<W>(&mut self, batch: Batch, writer: &mut W) -> Result<(), BeatsError>
    where
        W: AsyncWrite + Unpin,
    {
        let protocol = batch.protocol;
        let last_sequence = batch.last_sequence();
        debug!(
            peer = %self.peer,
            messages = batch.len(),
            last_sequence,
            "delivering batch downstream"
        );

        let event = BatchEvent::new(batch, self.peer.clone());
        self.batch_tx
            .send(event)
            .await
            .map_err(|e| BeatsError::Channel(e.to_string()))?;

        if self.role == SessionRole::CollectAndAck {
            if let Some(sequence) = last_sequence {
                ack::send_ack(writer, protocol, sequence).await;
            }
        }
        Ok(())
    }
}
