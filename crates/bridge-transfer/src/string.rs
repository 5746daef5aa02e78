//! 線形メモリ上の文字列の読み書き
//!
//! Wasm 側は文字列を `(ptr, len)` で渡してくる。JS 側 `TextDecoder` と同じく
//! 不正な UTF-8 は U+FFFD に置き換えてデコードする。

use alloc::borrow::Cow;
use alloc::string::String;

use crate::error::StringError;

/// `memory[ptr..ptr + len]` を UTF-8 としてデコードする
///
/// 正しい UTF-8 ならコピーせずに借用を返す。
///
/// # エラー
/// - `StringError::OutOfBounds`: 範囲がメモリ外（オーバーフロー含む）
pub fn decode_string(memory: &[u8], ptr: u32, len: u32) -> Result<Cow<'_, str>, StringError> {
    let out_of_bounds = StringError::OutOfBounds {
        ptr,
        len,
        memory_len: memory.len(),
    };
    let start = ptr as usize;
    let end = start.checked_add(len as usize).ok_or(out_of_bounds.clone())?;
    let bytes = memory.get(start..end).ok_or(out_of_bounds)?;
    Ok(String::from_utf8_lossy(bytes))
}

/// 文字列を `dest` にちょうど収まるように書き込む
///
/// `dest` は事前に `s.len()` バイトで確保されている前提。
/// 長さが合わない場合は何も書き込まない。
///
/// # エラー
/// - `StringError::DestTooSmall`: `dest` が短い
/// - `StringError::DestTooLarge`: `dest` が長い
pub fn encode_string(s: &str, dest: &mut [u8]) -> Result<(), StringError> {
    let bytes = s.as_bytes();
    if bytes.len() > dest.len() {
        return Err(StringError::DestTooSmall {
            needed: bytes.len(),
            available: dest.len(),
        });
    }
    if bytes.len() < dest.len() {
        return Err(StringError::DestTooLarge {
            written: bytes.len(),
            available: dest.len(),
        });
    }
    dest.copy_from_slice(bytes);
    Ok(())
}
