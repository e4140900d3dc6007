//! Action bundle 编解码
//!
//! 记录格式（小端），重复直到缓冲区耗尽：
//! - 8 字节动作标签（ActionId）
//! - 4 字节负载长度
//! - 负载（各动作自定义）
//!
//! BundleReader 逐条解码，供 Runtime 边解码边执行：前面记录的修改不会因后面的解码失败而回滚。

use crate::actions::RequestAction;
use crate::codec::{u32_len, ByteReader};
use crate::core::{DecodeError, EncodeError};

/// 编码单条记录并追加到 out
pub fn encode_record(action: &RequestAction, out: &mut Vec<u8>) -> Result<(), EncodeError> {
    let payload = action.encode()?;
    let len = u32_len(payload.len(), "action payload")?;
    out.extend_from_slice(&action.tag().as_u64().to_le_bytes());
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(&payload);
    Ok(())
}

/// 按给定顺序编码为 bundle
pub fn encode_bundle(actions: &[RequestAction]) -> Result<Vec<u8>, EncodeError> {
    let mut out = Vec::new();
    for action in actions {
        encode_record(action, &mut out)?;
    }
    Ok(out)
}

/// 一次性解码整个 bundle（不执行）
pub fn decode_bundle(bundle: &[u8]) -> Result<Vec<RequestAction>, DecodeError> {
    BundleReader::new(bundle).collect()
}

/// 逐条解码的迭代器；遇到错误后停止
#[derive(Debug, Clone)]
pub struct BundleReader<'a> {
    reader: ByteReader<'a>,
    failed: bool,
}

impl<'a> BundleReader<'a> {
    pub fn new(bundle: &'a [u8]) -> Self {
        Self {
            reader: ByteReader::new(bundle),
            failed: false,
        }
    }

    /// 当前记录的起始偏移（用于日志）
    pub fn offset(&self) -> usize {
        self.reader.position()
    }

    fn read_record(&mut self) -> Result<RequestAction, DecodeError> {
        let tag = self.reader.read_u64("action tag")?;
        let len = self.reader.read_u32("action length")? as usize;
        let payload = self.reader.read_bytes(len, "action payload")?;
        RequestAction::decode(tag, payload)
    }
}

impl Iterator for BundleReader<'_> {
    type Item = Result<RequestAction, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.reader.is_finished() {
            return None;
        }
        let record = self.read_record();
        self.failed = record.is_err();
        Some(record)
    }
}
