#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`cursor`]: 인메모리 버퍼 전방향 리더
//! - [`frame`]: 프레임 타입 와이어 상수 및 헤더 표현
//! - [`decoder`]: 프레임 디코딩 상태 기계 (핵심)
//! - [`inflate`]: 압축 프레임 해제
//! - [`batch`]: 윈도우 단위 배치 누적
//! - [`ack`]: ack 프레임 인코딩 및 회신
//! - [`session`]: 연결당 디코딩 세션
//! - [`server`]: TCP 수락 루프 (`Pipeline` 구현)
//! - [`config`]: 수신기 설정
//! - [`error`]: 도메인 에러 타입

pub mod ack;
pub mod batch;
pub mod config;
pub mod cursor;
pub mod decoder;
pub mod error;
pub mod frame;
pub mod inflate;
pub mod server;
pub mod session;

// --- 주요 타입 re-export ---

// 수신기
pub use server::BeatsReceiver;

// 설정
pub use config::{BeatsConfig, BeatsConfigBuilder};

// 에러
pub use error::BeatsError;

// 디코더
pub use decoder::{DecoderState, FrameDecoder};

// 세션
pub use session::{ConnectionSession, SessionRole};

// 배치 누적
pub use batch::BatchAccumulator;

// 압축 해제
pub use inflate::Inflator;

// 바이트 커서
pub use cursor::{ByteCursor, InsufficientData};
