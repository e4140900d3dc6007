//! 小端字节读写工具
//!
//! ByteReader 在切片上顺序读取定长整数与长度前缀字符串，越界统一报 DecodeError::Truncated；
//! put_* 系列函数负责编码侧的长度前缀，长度溢出报 EncodeError。

use crate::core::{DecodeError, EncodeError};

/// 切片上的顺序读取器，记录当前位置
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    buf: &'a [u8],
    position: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, position: 0 }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.position
    }

    pub fn is_finished(&self) -> bool {
        self.position >= self.buf.len()
    }

    /// 读取 n 个字节；不足时不移动位置
    pub fn read_bytes(&mut self, n: usize, what: &'static str) -> Result<&'a [u8], DecodeError> {
        if n > self.remaining() {
            return Err(DecodeError::Truncated {
                what,
                needed: n,
                remaining: self.remaining(),
            });
        }
        let bytes = &self.buf[self.position..self.position + n];
        self.position += n;
        Ok(bytes)
    }

    fn read_array<const N: usize>(&mut self, what: &'static str) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N, what)?);
        Ok(out)
    }

    pub fn read_u8(&mut self, what: &'static str) -> Result<u8, DecodeError> {
        Ok(self.read_bytes(1, what)?[0])
    }

    pub fn read_u16(&mut self, what: &'static str) -> Result<u16, DecodeError> {
        self.read_array(what).map(u16::from_le_bytes)
    }

    pub fn read_u32(&mut self, what: &'static str) -> Result<u32, DecodeError> {
        self.read_array(what).map(u32::from_le_bytes)
    }

    pub fn read_u64(&mut self, what: &'static str) -> Result<u64, DecodeError> {
        self.read_array(what).map(u64::from_le_bytes)
    }

    pub fn read_i64(&mut self, what: &'static str) -> Result<i64, DecodeError> {
        self.read_array(what).map(i64::from_le_bytes)
    }

    /// 读取 u64 长度前缀后的字节块
    pub fn read_u64_prefixed(&mut self, what: &'static str) -> Result<&'a [u8], DecodeError> {
        let len = self.read_u64(what)?;
        let len = usize::try_from(len).map_err(|_| DecodeError::Truncated {
            what,
            needed: usize::MAX,
            remaining: self.remaining(),
        })?;
        self.read_bytes(len, what)
    }

    /// 读取 u16 长度前缀的 UTF-8 字符串
    pub fn read_str_u16(&mut self, what: &'static str) -> Result<String, DecodeError> {
        let len = self.read_u16(what)? as usize;
        utf8(self.read_bytes(len, what)?, what)
    }

    /// 读取 u32 长度前缀的 UTF-8 字符串
    pub fn read_str_u32(&mut self, what: &'static str) -> Result<String, DecodeError> {
        let len = self.read_u32(what)? as usize;
        utf8(self.read_bytes(len, what)?, what)
    }

    /// 取走剩余全部字节
    pub fn rest(&mut self) -> &'a [u8] {
        let bytes = &self.buf[self.position..];
        self.position = self.buf.len();
        bytes
    }

    /// 要求已读完，否则报 TrailingBytes
    pub fn expect_finished(&self, what: &'static str) -> Result<(), DecodeError> {
        if self.is_finished() {
            Ok(())
        } else {
            Err(DecodeError::TrailingBytes {
                what,
                count: self.remaining(),
            })
        }
    }
}

pub fn utf8(bytes: &[u8], what: &'static str) -> Result<String, DecodeError> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|_| DecodeError::InvalidUtf8(what))
}

pub fn put_u16_prefixed(out: &mut Vec<u8>, bytes: &[u8], field: &'static str) -> Result<(), EncodeError> {
    let len = u16::try_from(bytes.len()).map_err(|_| EncodeError::FieldTooLong {
        field,
        len: bytes.len(),
        max: u16::MAX as usize,
    })?;
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(bytes);
    Ok(())
}

pub fn put_u32_prefixed(out: &mut Vec<u8>, bytes: &[u8], field: &'static str) -> Result<(), EncodeError> {
    let len = u32_len(bytes.len(), field)?;
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(bytes);
    Ok(())
}

pub fn u32_len(len: usize, field: &'static str) -> Result<u32, EncodeError> {
    u32::try_from(len).map_err(|_| EncodeError::FieldTooLong {
        field,
        len,
        max: u32::MAX as usize,
    })
}

pub fn u8_len(len: usize, field: &'static str) -> Result<u8, EncodeError> {
    u8::try_from(len).map_err(|_| EncodeError::FieldTooLong {
        field,
        len,
        max: u8::MAX as usize,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_little_endian() {
        let bytes = [0x01, 0x00, 0x02, 0x00, 0x00, 0x00, 0xff];
        let mut r = ByteReader::new(&bytes);
        assert_eq!(r.read_u16("a").unwrap(), 1);
        assert_eq!(r.read_u32("b").unwrap(), 2);
        assert_eq!(r.read_u8("c").unwrap(), 0xff);
        assert!(r.is_finished());
    }

    #[test]
    fn test_truncated_read_keeps_position() {
        let bytes = [0x01, 0x02, 0x03];
        let mut r = ByteReader::new(&bytes);
        let err = r.read_u64("tag").unwrap_err();
        assert_eq!(
            err,
            DecodeError::Truncated {
                what: "tag",
                needed: 8,
                remaining: 3
            }
        );
        assert_eq!(r.position(), 0);
    }

    #[test]
    fn test_prefixed_string() {
        let mut out = Vec::new();
        put_u16_prefixed(&mut out, "zone".as_bytes(), "name").unwrap();
        let mut r = ByteReader::new(&out);
        assert_eq!(r.read_str_u16("name").unwrap(), "zone");
        assert!(r.expect_finished("name").is_ok());
    }

    #[test]
    fn test_invalid_utf8() {
        let bytes = [0x02, 0x00, 0xc3, 0x28];
        let mut r = ByteReader::new(&bytes);
        assert_eq!(
            r.read_str_u16("key").unwrap_err(),
            DecodeError::InvalidUtf8("key")
        );
    }

    #[test]
    fn test_u8_len_overflow() {
        assert!(u8_len(255, "count").is_ok());
        assert!(matches!(
            u8_len(256, "count"),
            Err(EncodeError::FieldTooLong { max: 255, .. })
        ));
    }
}
