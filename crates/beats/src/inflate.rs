//! 압축 프레임 해제 -- zlib/gzip 컨테이너 자동 감지
//!
//! [`Inflator`]는 압축 프레임 하나의 페이로드를 통째로 해제합니다.
//! 프로토콜은 프레임마다 독립적으로 압축하므로 호출 간에 상태를
//! 유지하지 않습니다.
//!
//! 컨테이너는 매직 바이트로 감지합니다: `1f 8b`이면 gzip, 아니면
//! zlib 헤더로 간주합니다.

use std::io::Read;

use flate2::read::{GzDecoder, ZlibDecoder};

use crate::error::BeatsError;

/// gzip 매직 바이트
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// 압축 프레임 해제기
#[derive(Debug, Clone)]
pub struct Inflator {
    /// 해제 결과의 최대 크기 (바이트)
    max_output: usize,
}

impl Inflator {
    /// 출력 상한과 함께 새 해제기를 생성합니다.
    pub fn new(max_output: usize) -> Self {
        Self { max_output }
    }

    /// 압축 페이로드 하나를 해제합니다.
    ///
    /// 손상된 스트림이면 [`BeatsError::Decompression`], 해제 결과가
    /// 상한을 초과하면 [`BeatsError::PayloadTooLarge`]를 반환합니다.
    pub fn inflate(&self, compressed: &[u8]) -> Result<Vec<u8>, BeatsError> {
        let mut output = Vec::new();
        // 상한 + 1바이트까지만 읽어 초과 여부를 판별
        let limit = self.max_output as u64 + 1;

        let read = if compressed.starts_with(&GZIP_MAGIC) {
            GzDecoder::new(compressed)
                .take(limit)
                .read_to_end(&mut output)
        } else {
            ZlibDecoder::new(compressed)
                .take(limit)
                .read_to_end(&mut output)
        };

        read.map_err(|e| BeatsError::Decompression(e.to_string()))?;

        if output.len() > self.max_output {
            return Err(BeatsError::PayloadTooLarge {
                size: output.len(),
                max: self.max_output,
            });
        }

        Ok(output)
    }
}
