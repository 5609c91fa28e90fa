//! WAV Info - 解析引擎返回的 WAV 头
//!
//! 引擎输出 24kHz WAV，这里只读取头部元信息，不解码 PCM

use thiserror::Error;

/// 音频解析错误
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AudioError {
    #[error("Invalid WAV: {0}")]
    InvalidWav(String),
}

/// 音频信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioInfo {
    /// 时长（毫秒）
    pub duration_ms: u64,
    /// 采样率
    pub sample_rate: u32,
    /// 声道数
    pub channels: u16,
    /// 位深度
    pub bits_per_sample: u16,
    /// 数据大小（字节）
    pub data_size: usize,
}

/// WAV fmt chunk 中用到的字段
struct FmtChunk {
    num_channels: u16,
    sample_rate: u32,
    bits_per_sample: u16,
}

fn read_u16(data: &[u8], pos: usize) -> u16 {
    u16::from_le_bytes([data[pos], data[pos + 1]])
}

fn read_u32(data: &[u8], pos: usize) -> u32 {
    u32::from_le_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]])
}

/// 解析 RIFF/WAVE 头
pub fn inspect_wav(data: &[u8]) -> Result<AudioInfo, AudioError> {
    if data.len() < 12 {
        return Err(AudioError::InvalidWav("data too short".to_string()));
    }
    if &data[0..4] != b"RIFF" {
        return Err(AudioError::InvalidWav("missing RIFF header".to_string()));
    }
    if &data[8..12] != b"WAVE" {
        return Err(AudioError::InvalidWav("missing WAVE identifier".to_string()));
    }

    let mut pos = 12;
    let mut fmt: Option<FmtChunk> = None;
    let mut data_size: Option<usize> = None;

    while pos + 8 <= data.len() {
        let chunk_id = &data[pos..pos + 4];
        let chunk_size = read_u32(data, pos + 4) as usize;
        let body = pos + 8;

        match chunk_id {
            b"fmt " => {
                if chunk_size < 16 || body + 16 > data.len() {
                    return Err(AudioError::InvalidWav("truncated fmt chunk".to_string()));
                }
                fmt = Some(FmtChunk {
                    num_channels: read_u16(data, body + 2),
                    sample_rate: read_u32(data, body + 4),
                    bits_per_sample: read_u16(data, body + 14),
                });
            }
            b"data" => {
                // 流式写出的 WAV 可能把 data 大小写成 0xFFFFFFFF
                data_size = Some(chunk_size.min(data.len() - body));
                break;
            }
            _ => {}
        }

        // 奇数大小的 chunk 需要补齐一个字节
        pos = body.saturating_add(chunk_size).saturating_add(chunk_size % 2);
    }

    let fmt = fmt.ok_or_else(|| AudioError::InvalidWav("missing fmt chunk".to_string()))?;
    let data_size =
        data_size.ok_or_else(|| AudioError::InvalidWav("missing data chunk".to_string()))?;

    let frame_size = (fmt.bits_per_sample as usize / 8) * fmt.num_channels as usize;
    let frames = if frame_size > 0 { data_size / frame_size } else { 0 };
    let duration_ms = if fmt.sample_rate > 0 {
        (frames as u64 * 1000) / fmt.sample_rate as u64
    } else {
        0
    };

    Ok(AudioInfo {
        duration_ms,
        sample_rate: fmt.sample_rate,
        channels: fmt.num_channels,
        bits_per_sample: fmt.bits_per_sample,
        data_size,
    })
}
