//! 编译逻辑块的整体表示，用于构造测试数据和离线检查

use serde::{Deserialize, Serialize};

use crate::codec::{put_u16_prefixed, u8_len, ByteReader};
use crate::core::{DecodeError, EncodeError};
use crate::logic::condition::StatementGroup;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompiledLogicBlock {
    /// 无条件执行的 bundle 键（可为空）
    pub always: String,
    #[serde(default)]
    pub groups: Vec<StatementGroup>,
}

impl CompiledLogicBlock {
    /// 没有语句组时只写 AlwaysExec 键
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let mut out = Vec::new();
        put_u16_prefixed(&mut out, self.always.as_bytes(), "always key")?;
        if self.groups.is_empty() {
            return Ok(out);
        }
        out.push(u8_len(self.groups.len(), "statement group count")?);
        for group in &self.groups {
            let payload = group.encode()?;
            out.extend_from_slice(&(payload.len() as u64).to_le_bytes());
            out.extend_from_slice(&payload);
        }
        Ok(out)
    }

    /// 一次性解码（运行时走惰性求值器，不经过这里）
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut r = ByteReader::new(bytes);
        let always = r.read_str_u16("always key")?;
        let mut groups = Vec::new();
        if !r.is_finished() {
            let count = r.read_u8("statement group count")?;
            for _ in 0..count {
                groups.push(StatementGroup::decode(r.read_u64_prefixed("statement group")?)?);
            }
        }
        r.expect_finished("logic block")?;
        Ok(Self { always, groups })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::{Condition, Statement};

    #[test]
    fn test_layout() {
        let block = CompiledLogicBlock {
            always: "ab".into(),
            groups: vec![StatementGroup::new(vec![Statement::new(Condition::always(), "k")])],
        };
        let bytes = block.encode().unwrap();
        assert_eq!(&bytes[..4], &[2, 0, b'a', b'b']);
        assert_eq!(bytes[4], 1);
        let group_len = u64::from_le_bytes(bytes[5..13].try_into().unwrap());
        assert_eq!(group_len as usize, bytes.len() - 13);
        assert_eq!(CompiledLogicBlock::decode(&bytes).unwrap(), block);
    }

    #[test]
    fn test_empty_block_is_just_always() {
        let bytes = CompiledLogicBlock::default().encode().unwrap();
        assert_eq!(bytes, vec![0, 0]);
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes = CompiledLogicBlock::default().encode().unwrap();
        bytes.extend_from_slice(&[0, 9]);
        assert!(matches!(
            CompiledLogicBlock::decode(&bytes),
            Err(DecodeError::TrailingBytes { what: "logic block", .. })
        ));
    }
}
