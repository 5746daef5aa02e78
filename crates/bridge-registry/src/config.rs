//! レジストリ設定と統計情報

use serde::{Deserialize, Serialize};

use crate::handle::Handle;

/// レジストリの設定
///
/// JSON からも読み込める（`bridge-wasm` の `BlobChannel.withConfig`）。
///
/// ```json
/// { "max_handle": 2147483647, "warn_on_stale_dispose": true }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// ハンドルカウンタの上限（これを超えると 0 に戻る）
    /// `Handle::MAX` より大きい値は `Handle::MAX` に丸める
    pub max_handle: u32,
    /// 存在しないハンドルの dispose で警告ログを出すか
    pub warn_on_stale_dispose: bool,
}

impl RegistryConfig {
    /// 上限を指定して設定を作る
    pub fn with_max_handle(max_handle: u32) -> Self {
        RegistryConfig {
            max_handle,
            ..Self::default()
        }
    }

    /// 実際に使う上限（`Handle::MAX` で丸めた値）
    pub fn effective_max_handle(&self) -> u32 {
        self.max_handle.min(Handle::MAX)
    }

    /// 同時に生存できるハンドル数
    pub fn capacity(&self) -> u64 {
        self.effective_max_handle() as u64 + 1
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        RegistryConfig {
            max_handle: Handle::MAX,
            warn_on_stale_dispose: true,
        }
    }
}

/// レジストリの統計情報
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    /// 現在生存しているハンドル数
    pub live: usize,
    /// これまでに割り当てたハンドルの総数
    pub allocated_total: u64,
    /// これまでに dispose した総数（存在しないハンドルへの dispose は含まない）
    pub disposed_total: u64,
    /// 存在しないハンドルへの dispose 回数（二重 dispose など）
    pub stale_disposals: u64,
    /// カウンタが上限から 0 に戻った回数
    pub wraparounds: u64,
}
