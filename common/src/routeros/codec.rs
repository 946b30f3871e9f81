//! RouterOS API 字编码
//!
//! 每个 word 由变长长度前缀 + 内容组成，sentence 以长度为 0 的 word 结束。
//!
//! | 长度范围              | 前缀字节数 | 标志位 |
//! |-----------------------|-----------|--------|
//! | `< 0x80`              | 1         | -      |
//! | `< 0x4000`            | 2         | `0x80` |
//! | `< 0x20_0000`         | 3         | `0xC0` |
//! | `< 0x1000_0000`       | 4         | `0xE0` |
//! | 其余                  | 5         | `0xF0` |

use tokio::io::{AsyncRead, AsyncReadExt};

use super::error::{Result, RouterOsError};

/// 写入长度前缀
pub fn encode_length(len: usize, out: &mut Vec<u8>) -> Result<()> {
    let len = u32::try_from(len)
        .map_err(|_| RouterOsError::Protocol(format!("word too long: {} bytes", len)))?;

    if len < 0x80 {
        out.push(len as u8);
    } else if len < 0x4000 {
        out.extend_from_slice(&((len | 0x8000) as u16).to_be_bytes());
    } else if len < 0x20_0000 {
        out.extend_from_slice(&(len | 0xC0_0000).to_be_bytes()[1..]);
    } else if len < 0x1000_0000 {
        out.extend_from_slice(&(len | 0xE000_0000).to_be_bytes());
    } else {
        out.push(0xF0);
        out.extend_from_slice(&len.to_be_bytes());
    }
    Ok(())
}

/// 编码单个 word
pub fn encode_word(word: &str, out: &mut Vec<u8>) -> Result<()> {
    encode_length(word.len(), out)?;
    out.extend_from_slice(word.as_bytes());
    Ok(())
}

/// 编码完整 sentence（自动追加结束 word）
pub fn encode_sentence<S: AsRef<str>>(words: &[S]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(words.iter().map(|w| w.as_ref().len() + 1).sum::<usize>() + 1);
    for word in words {
        encode_word(word.as_ref(), &mut out)?;
    }
    out.push(0);
    Ok(out)
}

/// 读取长度前缀
pub async fn read_length<R: AsyncRead + Unpin>(reader: &mut R) -> Result<usize> {
    let first = reader.read_u8().await?;
    let (extra, initial) = match first {
        b if b & 0x80 == 0x00 => return Ok(b as usize),
        b if b & 0xC0 == 0x80 => (1, u32::from(b & 0x3F)),
        b if b & 0xE0 == 0xC0 => (2, u32::from(b & 0x1F)),
        b if b & 0xF0 == 0xE0 => (3, u32::from(b & 0x0F)),
        0xF0 => (4, 0),
        b => {
            return Err(RouterOsError::Protocol(format!(
                "unexpected control byte 0x{:02X} in length prefix",
                b
            )))
        }
    };

    let mut len = initial;
    for _ in 0..extra {
        len = (len << 8) | u32::from(reader.read_u8().await?);
    }
    Ok(len as usize)
}

/// 读取单个 word，空字符串表示 sentence 结束
pub async fn read_word<R: AsyncRead + Unpin>(reader: &mut R) -> Result<String> {
    let len = read_length(reader).await?;
    if len == 0 {
        return Ok(String::new());
    }
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;
    // RouterOS 的注释字段可能是 cp1252 编码
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// 读取完整 sentence（不含结束 word）
pub async fn read_sentence<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<String>> {
    let mut words = Vec::new();
    loop {
        let word = read_word(reader).await?;
        if word.is_empty() {
            return Ok(words);
        }
        words.push(word);
    }
}
