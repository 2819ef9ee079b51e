use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;

use sawmill_beats::{BeatsConfig, BeatsReceiver};
use sawmill_core::config::SawmillConfig;
use sawmill_core::pipeline::Pipeline;

use sawmill_daemon::cli::DaemonCli;
use sawmill_daemon::logging;
use sawmill_daemon::sink::Sink;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    // 설정 로드 (파일 -> 환경변수 -> CLI 순으로 덮어씀)
    let mut config = SawmillConfig::load(&cli.config)
        .await
        .with_context(|| format!("failed to load config from {}", cli.config.display()))?;
    if let Some(level) = cli.log_level {
        config.general.log_level = level;
    }
    if let Some(format) = cli.log_format {
        config.general.log_format = format;
    }
    config.validate().context("invalid configuration")?;

    if cli.validate {
        println!("configuration ok: {}", cli.config.display());
        return Ok(());
    }

    logging::init_tracing(&config.general)?;
    tracing::info!(config = %cli.config.display(), "sawmill-daemon starting");

    // 수신기 -> sink 배치 이벤트 채널
    let (batch_tx, batch_rx) = tokio::sync::mpsc::channel(config.sink.channel_capacity);
    let cancel_token = CancellationToken::new();

    // sink 태스크 스폰
    let mut sink = Sink::from_kind(&config.sink.kind)
        .map_err(|e| anyhow::anyhow!("failed to build sink: {}", e))?;
    tracing::info!(sink = sink.name(), "sink initialized");
    let sink_task = tokio::spawn(async move {
        sink.run(batch_rx).await;
    });

    // 수신기 시작
    let beats_config = BeatsConfig::from_core(&config.receiver);
    let mut receiver = BeatsReceiver::new(beats_config, batch_tx, cancel_token.clone());
    if config.receiver.enabled {
        receiver
            .start()
            .await
            .map_err(|e| anyhow::anyhow!("failed to start beats receiver: {}", e))?;
        tracing::info!("beats receiver started");
    } else {
        tracing::warn!("beats receiver disabled by config, nothing to do");
    }

    // 종료 시그널 대기
    tracing::info!("sawmill-daemon running");
    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");

    // 우아한 종료: 수신기를 먼저 멈춰 채널을 닫고, sink가 잔여
    // 배치를 드레인하게 함
    if config.receiver.enabled {
        if let Err(e) = receiver.stop().await {
            tracing::error!(error = %e, "failed to stop beats receiver");
        }
    }
    drop(receiver); // 마지막 batch_tx를 내려놓아 채널을 닫음
    if let Err(e) = sink_task.await {
        tracing::error!(error = %e, "sink task join failed");
    }

    tracing::info!("sawmill-daemon shut down");
    Ok(())
}
