//! bridge-transfer エラー型

use bridge_registry::{Handle, RegistryError};

/// 文字列と線形メモリの変換エラー
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StringError {
    /// `(ptr, len)` がメモリの範囲外を指している
    #[error("String range {ptr}+{len} is outside linear memory ({memory_len} bytes)")]
    OutOfBounds { ptr: u32, len: u32, memory_len: usize },
    /// 書き込み先が小さすぎる
    #[error("dest too small: need {needed} bytes, have {available}")]
    DestTooSmall { needed: usize, available: usize },
    /// 書き込み先が大きすぎる（末尾が未初期化のまま残る）
    #[error("dest too large: wrote {written} bytes into {available}")]
    DestTooLarge { written: usize, available: usize },
}

/// コールバック呼び出しのエラー
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CallbackError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// 登録されたコールバックと呼び出し側の引数の数が違う
    #[error("Callback {handle} takes {expected} argument(s), invoked with {actual}")]
    ArityMismatch {
        handle: Handle,
        expected: u8,
        actual: u8,
    },
    /// コールバックの呼び出し中に、同じ表へ登録・呼び出しをしようとした
    #[error("Callback table is busy with another invocation")]
    Busy,
}
