//! TCP 수락 루프 -- beats 클라이언트 연결 수신
//!
//! [`BeatsReceiver`]는 TCP 소켓에 바인드하여 beats 클라이언트 연결을
//! 수락하고, 연결마다 별도 tokio 태스크에서 [`ConnectionSession`]을
//! 구동합니다. core의 [`Pipeline`] trait을 구현하여 데몬에서 다른
//! 모듈과 동일한 생명주기로 관리됩니다.
//!
//! TLS 종단은 이 모듈의 관심사가 아닙니다. 수신기는 평문 `TcpStream`
//! 위에서 동작하며, TLS가 필요하면 앞단 프록시에서 종단합니다.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, gauge};
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Semaphore, mpsc};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use sawmill_core::error::{PipelineError, SawmillError};
use sawmill_core::event::BatchEvent;
use sawmill_core::metrics::{BEATS_ACTIVE_CONNECTIONS, BEATS_BYTES_RECEIVED_TOTAL};
use sawmill_core::pipeline::{HealthStatus, Pipeline};

use crate::config::BeatsConfig;
use crate::error::BeatsError;
use crate::session::{ConnectionSession, SessionRole};

/// 수신기 실행 상태
#[derive(Debug, Clone, PartialEq, Eq)]
enum ReceiverState {
    /// 초기화됨, 아직 시작하지 않음
    Initialized,
    /// 실행 중
    Running,
    /// 정지됨
    Stopped,
}

/// Beats TCP 수신기
///
/// # 사용 예시
/// ```ignore
/// use sawmill_beats::{BeatsConfig, BeatsReceiver};
/// use sawmill_core::pipeline::Pipeline;
///
/// let (batch_tx, batch_rx) = tokio::sync::mpsc::channel(1024);
/// let mut receiver = BeatsReceiver::new(config, batch_tx, cancel_token);
/// receiver.start().await?;
/// ```
pub struct BeatsReceiver {
    /// 수신기 설정
    config: BeatsConfig,
    /// 배치 이벤트 전송 채널
    batch_tx: mpsc::Sender<BatchEvent>,
    /// Cancellation token for graceful shutdown
    cancel_token: CancellationToken,
    /// 현재 상태
    state: ReceiverState,
    /// 수락 루프 태스크 핸들
    accept_task: Option<tokio::task::JoinHandle<()>>,
    /// 바인드된 실제 주소 (start 이후 유효)
    local_addr: Option<SocketAddr>,
}

impl BeatsReceiver {
    /// 새 수신기를 생성합니다.
    pub fn new(
        config: BeatsConfig,
        batch_tx: mpsc::Sender<BatchEvent>,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            config,
            batch_tx,
            cancel_token,
            state: ReceiverState::Initialized,
            accept_task: None,
            local_addr: None,
        }
    }

    /// 현재 상태명을 반환합니다.
    pub fn state_name(&self) -> &str {
        match self.state {
            ReceiverState::Initialized => "initialized",
            ReceiverState::Running => "running",
            ReceiverState::Stopped => "stopped",
        }
    }

    /// 바인드된 실제 주소를 반환합니다 (start 이후 유효).
    ///
    /// `listen = "127.0.0.1:0"`처럼 임의 포트에 바인드한 경우 실제
    /// 포트를 알아내는 데 사용합니다.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// 연결 수락 루프.
    async fn accept_loop(
        listener: TcpListener,
        config: BeatsConfig,
        batch_tx: mpsc::Sender<BatchEvent>,
        cancel: CancellationToken,
    ) {
        // 연결 수 제한을 위한 세마포어
        let connection_semaphore = Arc::new(Semaphore::new(config.max_connections));

        loop {
            tokio::select! {
                result = listener.accept() => {
                    let (stream, addr) = match result {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            error!(error = %e, "accept error");
                            continue;
                        }
                    };

                    debug!(peer = %addr, "accepted connection");

                    // 연결 수 제한 확인
                    let permit = match connection_semaphore.clone().try_acquire_owned() {
                        Ok(p) => p,
                        Err(_) => {
                            warn!(peer = %addr, "max connections reached, rejecting connection");
                            continue;
                        }
                    };

                    gauge!(BEATS_ACTIVE_CONNECTIONS).increment(1.0);

                    let tx = batch_tx.clone();
                    let config = config.clone();
                    let cancel = cancel.clone();

                    // 각 연결을 별도 태스크에서 처리
                    tokio::spawn(async move {
                        if let Err(e) =
                            Self::handle_connection(stream, addr, config, tx, cancel).await
                        {
                            error!(peer = %addr, error = %e, "connection handler error");
                        }
                        gauge!(BEATS_ACTIVE_CONNECTIONS).decrement(1.0);
                        drop(permit); // 연결 종료 시 세마포어 반환
                    });
                }
                _ = cancel.cancelled() => {
                    info!("beats receiver accept loop shutting down");
                    break;
                }
            }
        }
    }

    /// 단일 TCP 연결을 처리합니다.
    ///
    /// 수신 바이트를 세션에 공급하는 read 루프입니다. 타임아웃, EOF,
    /// 종료 시그널 모두 best-effort 부분 배치 플러시를 거쳐 종료하며,
    /// I/O 에러만 에러로 전파됩니다.
    async fn handle_connection(
        stream: TcpStream,
        addr: SocketAddr,
        config: BeatsConfig,
        batch_tx: mpsc::Sender<BatchEvent>,
        cancel: CancellationToken,
    ) -> Result<(), BeatsError> {
        let peer = addr.to_string();
        let role = if config.send_acks {
            SessionRole::CollectAndAck
        } else {
            SessionRole::Collect
        };
        let (mut reader, mut writer) = stream.into_split();
        let mut session = ConnectionSession::new(&config, role, peer.as_str(), batch_tx);
        let mut buf = vec![0u8; config.recv_buffer_size];
        let connection_timeout = Duration::from_secs(config.connection_timeout_secs);

        loop {
            tokio::select! {
                result = timeout(connection_timeout, reader.read(&mut buf)) => {
                    match result {
                        Ok(Ok(0)) => {
                            // EOF - 연결 종료
                            debug!(peer = %peer, "connection closed by peer");
                            session.on_connection_closed(&mut writer).await;
                            break;
                        }
                        Ok(Ok(bytes_read)) => {
                            counter!(BEATS_BYTES_RECEIVED_TOTAL).increment(bytes_read as u64);
                            if let Err(e) =
                                session.on_bytes_received(&buf[..bytes_read], &mut writer).await
                            {
                                // 하류 채널이 닫힘 — 세션을 유지할 이유가 없음
                                error!(peer = %peer, error = %e, "failed to deliver batch downstream");
                                return Err(e);
                            }
                        }
                        Ok(Err(e)) => {
                            error!(peer = %peer, error = %e, "read error");
                            session.on_connection_closed(&mut writer).await;
                            return Err(BeatsError::Io(e));
                        }
                        Err(_) => {
                            warn!(peer = %peer, "connection timeout");
                            session.on_connection_closed(&mut writer).await;
                            break;
                        }
                    }
                }
                _ = cancel.cancelled() => {
                    debug!(peer = %peer, "connection handler received shutdown signal");
                    session.on_connection_closed(&mut writer).await;
                    break;
                }
            }
        }

        Ok(())
    }
}

impl Pipeline for BeatsReceiver {
    async fn start(&mut self) -> Result<(), SawmillError> {
        if self.state == ReceiverState::Running {
            return Err(PipelineError::AlreadyRunning.into());
        }

        self.config
            .validate()
            .map_err(|e| PipelineError::InitFailed(e.to_string()))?;

        info!(listen = %self.config.listen, "starting beats receiver");

        let listener = TcpListener::bind(&self.config.listen).await.map_err(|e| {
            PipelineError::Receiver(format!("failed to bind to {}: {}", self.config.listen, e))
        })?;
        self.local_addr = listener.local_addr().ok();

        info!(
            listen = %self.config.listen,
            acks = self.config.send_acks,
            "beats receiver listening"
        );

        let config = self.config.clone();
        let batch_tx = self.batch_tx.clone();
        let cancel = self.cancel_token.clone();
        self.accept_task = Some(tokio::spawn(async move {
            Self::accept_loop(listener, config, batch_tx, cancel).await;
        }));

        self.state = ReceiverState::Running;
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), SawmillError> {
        if self.state != ReceiverState::Running {
            return Err(PipelineError::NotRunning.into());
        }

        info!("stopping beats receiver");
        self.cancel_token.cancel();

        if let Some(task) = self.accept_task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "accept loop task join failed");
            }
        }

        self.state = ReceiverState::Stopped;
        info!("beats receiver stopped");
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        match self.state {
            ReceiverState::Running => {
                if self.batch_tx.is_closed() {
                    HealthStatus::Degraded("downstream channel closed".to_owned())
                } else {
                    HealthStatus::Healthy
                }
            }
            ReceiverState::Initialized => HealthStatus::Unhealthy("not started".to_owned()),
            ReceiverState::Stopped => HealthStatus::Unhealthy("stopped".to_owned()),
        }
    }
}
