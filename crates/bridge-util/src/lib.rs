//! # bridge-util
//!
//! クライアントで使う小さなユーティリティ群。
//!
//! - `human_size`: バイト数を `"1.5MB"` のような表記にする
//! - `shuffle`: スライスをその場でシャッフルする
//! - `random_id` / `uuid`: HTML の id 属性に使える乱数文字列
//!
//! 乱数は `getrandom`（WASM では `crypto.getRandomValues`）から取る。

pub mod error;
pub mod id;
pub mod shuffle;
pub mod size;

pub use error::UtilError;
pub use id::{random_id, uuid};
pub use shuffle::shuffle;
pub use size::human_size;
