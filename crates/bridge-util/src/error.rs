//! bridge-util エラー型

/// ユーティリティのエラー
#[derive(Debug, thiserror::Error)]
pub enum UtilError {
    /// OS / ブラウザの乱数源が使えない
    #[error("Random source unavailable: {0}")]
    Random(#[from] getrandom::Error),
}
