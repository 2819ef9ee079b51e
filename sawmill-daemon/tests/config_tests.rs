//! Configuration loading tests for the daemon wiring.

use sawmill_beats::BeatsConfig;
use sawmill_core::config::SawmillConfig;
use sawmill_daemon::sink::Sink;

#[tokio::test]
async fn loads_config_and_derives_receiver_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sawmill.toml");
    tokio::fs::write(
        &path,
        r#"
            [general]
            log_level = "debug"
            log_format = "pretty"

            [receiver]
            listen = "127.0.0.1:5151"
            max_connections = 16
            send_acks = false

            [sink]
            kind = "null"
            channel_capacity = 64
        "#,
    )
    .await
    .unwrap();

    let config = SawmillConfig::from_file(&path).await.unwrap();
    assert_eq!(config.general.log_level, "debug");
    assert_eq!(config.sink.kind, "null");

    let beats_config = BeatsConfig::from_core(&config.receiver);
    assert_eq!(beats_config.listen, "127.0.0.1:5151");
    assert_eq!(beats_config.max_connections, 16);
    assert!(!beats_config.send_acks);
    beats_config.validate().unwrap();

    let sink = Sink::from_kind(&config.sink.kind).unwrap();
    assert_eq!(sink.name(), "null");
}

#[tokio::test]
async fn rejects_config_with_bad_sink_kind() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sawmill.toml");
    tokio::fs::write(&path, "[sink]\nkind = \"elasticsearch\"")
        .await
        .unwrap();

    assert!(SawmillConfig::from_file(&path).await.is_err());
}

#[tokio::test]
async fn missing_config_file_is_reported() {
    let err = SawmillConfig::from_file("/does/not/exist/sawmill.toml")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("not found"));
}
