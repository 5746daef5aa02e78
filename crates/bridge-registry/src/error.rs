//! レジストリのエラー型

use crate::handle::Handle;

/// レジストリ操作のエラー
///
/// 境界の向こう側には例外を伝播できないことが多いため、
/// すべて `Result` で呼び出し元に返す。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// ハンドルがテーブルに存在しない（未割り当て、または dispose 済み）
    #[error("Unknown handle {0}")]
    UnknownHandle(Handle),
    /// 保存されている値と書き込み先の長さが一致しない
    #[error("Length mismatch for handle {handle}: stored {expected} bytes, destination {actual} bytes")]
    LengthMismatch {
        handle: Handle,
        expected: usize,
        actual: usize,
    },
    /// 全ハンドルが使用中で割り当てられない
    #[error("Handle space exhausted ({capacity} live handles)")]
    Exhausted { capacity: u64 },
    /// ハンドルとして表現できない整数（負数）
    #[error("Invalid handle value: {0}")]
    InvalidHandle(i32),
}
