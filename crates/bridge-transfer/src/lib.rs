//! # bridge-transfer
//!
//! `bridge-registry` の上に作る転送チャンネル群。
//!
//! - **blob**: JS → WASM へバイト列（文字列を含む）を渡す
//! - **string**: 線形メモリ上の `(ptr, len)` と文字列の相互変換
//! - **callback**: ハンドル越しに呼び出せるコールバック表
//!
//! ## blob 転送の流れ
//!
//! ```text
//! JS:   createBlob(array)           → { handle, length, dispose }
//! JS:   (handle, length) を Wasm へ渡す
//! Wasm: length バイトのバッファを確保
//! Wasm: readBlob(handle, ptr, len)  → JS が長さを検証し、Wasm メモリへコピー
//! JS:   blob.dispose()              → handle は無効になる
//! ```

#![cfg_attr(not(test), no_std)]
extern crate alloc;

pub mod blob;
pub mod callback;
pub mod error;
pub mod string;

pub use blob::{Blob, BlobRegistry};
pub use callback::{Callback, CallbackRegistry};
pub use error::{CallbackError, StringError};
pub use string::{decode_string, encode_string};

pub use bridge_registry::{Handle, RegistryConfig, RegistryError, RegistryStats};
