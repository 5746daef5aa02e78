//! # bridge-registry
//!
//! JS と WASM の境界をまたいで値を受け渡すためのハンドルレジストリ。
//!
//! ホスト側が保持する値（主にバイト列）を、メモリアドレスではなく
//! 小さな非負整数（ハンドル）で相手側に渡す。相手側はハンドルを使って
//! 長さ一致のコピーを要求し、ホスト側は明示的に dispose して解放する。
//!
//! ## ハンドルのライフサイクル
//!
//! ```text
//! unallocated --alloc--> allocated --dispose--> disposed
//!                          |  ^                    |
//!                          +--+ read_into          +--+ dispose (警告のみ)
//! ```
//!
//! ## 境界での受け渡し
//!
//! ```text
//! Host:  alloc(buffer)            → (handle, disposer)
//! Host:  (handle, buffer.len) を Guest へ渡す
//! Guest: 同じ長さのバッファを確保 → read_into(handle, dest)
//! Host:  disposer.dispose(..)     → handle は無効になる
//! ```
//!
//! ハンドルは `0..=Handle::MAX`（i32 の非負範囲）に収まる。
//! カウンタが上限に達すると 0 に戻り、まだ生きているハンドルは飛ばして割り当てる。

#![cfg_attr(not(test), no_std)]
extern crate alloc;

#[cfg(all(feature = "std", not(test)))]
extern crate std;

mod config;
mod error;
mod handle;
mod registry;
#[cfg(feature = "std")]
mod shared;

pub use config::{RegistryConfig, RegistryStats};
pub use error::RegistryError;
pub use handle::Handle;
pub use registry::{Allocation, Disposer, HandleRegistry};
#[cfg(feature = "std")]
pub use shared::{SharedAllocation, SharedDisposer, SharedRegistry};
