//! 类型化变量
//!
//! Variable 是封闭的和类型：类型标签即枚举分支，不存在「标签与值不一致」的状态。
//! 二进制编码：1 字节类型 + 值（int: i64；bool: u8；string: u32 前缀；array: u32 个数 + 元素）。

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::codec::{put_u32_prefixed, u32_len, ByteReader};
use crate::core::{DecodeError, EncodeError};

/// 数组嵌套的最大解码深度
const MAX_ARRAY_DEPTH: usize = 32;

/// 变量类型标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableType {
    Int,
    Bool,
    String,
    Array,
}

impl VariableType {
    pub fn as_byte(self) -> u8 {
        match self {
            VariableType::Int => 0,
            VariableType::Bool => 1,
            VariableType::String => 2,
            VariableType::Array => 3,
        }
    }

    pub fn from_byte(b: u8) -> Result<Self, DecodeError> {
        match b {
            0 => Ok(VariableType::Int),
            1 => Ok(VariableType::Bool),
            2 => Ok(VariableType::String),
            3 => Ok(VariableType::Array),
            other => Err(DecodeError::InvalidVariableType(other)),
        }
    }
}

impl fmt::Display for VariableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VariableType::Int => "int",
            VariableType::Bool => "bool",
            VariableType::String => "string",
            VariableType::Array => "array",
        };
        f.write_str(s)
    }
}

/// 会话变量（类型 + 值）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Variable {
    Int(i64),
    Bool(bool),
    String(String),
    Array(Vec<Variable>),
}

impl Variable {
    pub fn type_tag(&self) -> VariableType {
        match self {
            Variable::Int(_) => VariableType::Int,
            Variable::Bool(_) => VariableType::Bool,
            Variable::String(_) => VariableType::String,
            Variable::Array(_) => VariableType::Array,
        }
    }

    pub fn encode_into(&self, out: &mut Vec<u8>) -> Result<(), EncodeError> {
        out.push(self.type_tag().as_byte());
        match self {
            Variable::Int(n) => out.extend_from_slice(&n.to_le_bytes()),
            Variable::Bool(b) => out.push(u8::from(*b)),
            Variable::String(s) => put_u32_prefixed(out, s.as_bytes(), "string variable")?,
            Variable::Array(items) => {
                let count = u32_len(items.len(), "array variable")?;
                out.extend_from_slice(&count.to_le_bytes());
                for item in items {
                    item.encode_into(out)?;
                }
            }
        }
        Ok(())
    }

    pub fn decode_from(r: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        Self::decode_at_depth(r, 0)
    }

    fn decode_at_depth(r: &mut ByteReader<'_>, depth: usize) -> Result<Self, DecodeError> {
        if depth > MAX_ARRAY_DEPTH {
            return Err(DecodeError::NestingTooDeep);
        }
        match VariableType::from_byte(r.read_u8("variable type")?)? {
            VariableType::Int => Ok(Variable::Int(r.read_i64("int variable")?)),
            VariableType::Bool => match r.read_u8("bool variable")? {
                0 => Ok(Variable::Bool(false)),
                1 => Ok(Variable::Bool(true)),
                other => Err(DecodeError::InvalidBool(other)),
            },
            VariableType::String => Ok(Variable::String(r.read_str_u32("string variable")?)),
            VariableType::Array => {
                let count = r.read_u32("array variable")? as usize;
                // 每个元素至少 2 字节，先按剩余长度校验，避免按伪造的个数预分配
                if count > r.remaining() / 2 {
                    return Err(DecodeError::Truncated {
                        what: "array variable",
                        needed: count.saturating_mul(2),
                        remaining: r.remaining(),
                    });
                }
                let mut items = Vec::with_capacity(count);
                for _ in 0..count {
                    items.push(Self::decode_at_depth(r, depth + 1)?);
                }
                Ok(Variable::Array(items))
            }
        }
    }
}

/// 占位符替换使用的字符串渲染
impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variable::Int(n) => write!(f, "{n}"),
            Variable::Bool(b) => write!(f, "{b}"),
            Variable::String(s) => f.write_str(s),
            Variable::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(v: &Variable) -> Variable {
        let mut out = Vec::new();
        v.encode_into(&mut out).unwrap();
        let mut r = ByteReader::new(&out);
        let decoded = Variable::decode_from(&mut r).unwrap();
        assert!(r.is_finished());
        decoded
    }

    #[test]
    fn test_variable_round_trip() {
        let nested = Variable::Array(vec![
            Variable::Int(-3),
            Variable::Bool(true),
            Variable::String("lamp".into()),
            Variable::Array(vec![]),
        ]);
        assert_eq!(round_trip(&nested), nested);
    }

    #[test]
    fn test_variable_display() {
        assert_eq!(Variable::Int(7).to_string(), "7");
        assert_eq!(Variable::Bool(false).to_string(), "false");
        assert_eq!(Variable::String("key".into()).to_string(), "key");
        let arr = Variable::Array(vec![Variable::Int(1), Variable::String("a".into())]);
        assert_eq!(arr.to_string(), "[1, a]");
    }

    #[test]
    fn test_invalid_type_byte() {
        let bytes = [9u8];
        let mut r = ByteReader::new(&bytes);
        assert_eq!(
            Variable::decode_from(&mut r).unwrap_err(),
            DecodeError::InvalidVariableType(9)
        );
    }

    #[test]
    fn test_forged_array_count() {
        let mut bytes = vec![3u8];
        bytes.extend_from_slice(&u32::MAX.to_le_bytes());
        let mut r = ByteReader::new(&bytes);
        assert!(matches!(
            Variable::decode_from(&mut r),
            Err(DecodeError::Truncated { .. })
        ));
    }

    #[test]
    fn test_serde_shape() {
        let json = serde_json::to_string(&Variable::Int(7)).unwrap();
        assert_eq!(json, r#"{"type":"int","value":7}"#);
    }
}
