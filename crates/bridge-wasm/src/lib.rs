//! # bridge-wasm
//!
//! wasm-bindgen エクスポート：ブラウザ側 JS から呼び出す公開 API。
//!
//! ## 使用方法（JavaScript）
//!
//! ```javascript
//! import { BlobChannel, CallbackChannel, initPanicHook, initLogging, humanSize } from './pkg/bridge_wasm';
//!
//! initPanicHook();
//! initLogging("warn");
//!
//! // JS → Wasm への blob 転送
//! const channel = new BlobChannel();
//! const blob = channel.createBlob(new TextEncoder().encode("hello"));
//! // (blob.handle, blob.length) を相手に渡す
//! const dest = new Uint8Array(wasmMemory.buffer, ptr, blob.length);
//! channel.readBlob(blob.handle, dest);
//! blob.dispose();
//!
//! // JS イベントから Wasm 側クロージャを呼ぶ
//! callbacks.invokeI32(handle, event.keyCode);
//!
//! console.log(humanSize(1536, 1)); // "1.5KB"
//! ```

use wasm_bindgen::prelude::*;

pub mod callbacks;
pub mod channel;

pub use callbacks::CallbackChannel;
pub use channel::{BlobChannel, BlobTicket};

use bridge_registry::Handle;

/// パニック時にブラウザコンソールにスタックトレースを出力する
///
/// 開発時に必ず呼び出すこと。本番ビルドでは feature flag で無効化可能。
#[wasm_bindgen(js_name = "initPanicHook")]
pub fn init_panic_hook() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// `log` の出力先をブラウザコンソールにする
///
/// # 引数
/// - `level`: `"error" | "warn" | "info" | "debug" | "trace"`。省略時・不正値は `"info"`
///
/// 2 回目以降の呼び出しはコンソールにエラーを出すだけで無視される。
#[wasm_bindgen(js_name = "initLogging")]
pub fn init_logging(level: Option<String>) {
    let level = level
        .as_deref()
        .and_then(|l| l.parse::<log::Level>().ok())
        .unwrap_or(log::Level::Info);
    wasm_logger::init(wasm_logger::Config::new(level));
}

/// バイト数を `"1.5KB"` のような表記にする
///
/// JS の number をそのまま受ける。負数・NaN は 0 として扱う。
#[wasm_bindgen(js_name = "humanSize")]
pub fn human_size(bytes: f64, precision: Option<u32>) -> String {
    let bytes = if bytes.is_finite() && bytes > 0.0 { bytes as u64 } else { 0 };
    bridge_util::human_size(bytes, precision.unwrap_or(0) as usize)
}

/// 8 文字の乱数 id（HTML id 属性用）
#[wasm_bindgen(js_name = "randomId")]
pub fn random_id() -> Result<String, JsError> {
    bridge_util::random_id().map_err(|e| JsError::new(&format!("randomId failed: {}", e)))
}

/// 32 文字の乱数 id
#[wasm_bindgen]
pub fn uuid() -> Result<String, JsError> {
    bridge_util::uuid().map_err(|e| JsError::new(&format!("uuid failed: {}", e)))
}

/// JS の配列をその場でシャッフルする
#[wasm_bindgen]
pub fn shuffle(array: &js_sys::Array) {
    let mut items = array.to_vec();
    bridge_util::shuffle(&mut items, &mut rand::thread_rng());
    for (i, item) in items.iter().enumerate() {
        array.set(i as u32, item.clone());
    }
}

/// 線形メモリ上の `(ptr, len)` の文字列を読む
///
/// `memory` は相手側の線形メモリ全体のビュー（`new Uint8Array(memory.buffer)`）。
/// コピーするのは `ptr..ptr + len` の範囲だけ。
/// 不正な UTF-8 は U+FFFD に置き換える（`TextDecoder` と同じ挙動）。
#[wasm_bindgen(js_name = "decodeString")]
pub fn decode_string(memory: &js_sys::Uint8Array, ptr: u32, len: u32) -> Result<String, JsError> {
    let in_bounds = ptr
        .checked_add(len)
        .is_some_and(|end| end <= memory.length());
    if !in_bounds {
        let e = bridge_transfer::StringError::OutOfBounds {
            ptr,
            len,
            memory_len: memory.length() as usize,
        };
        return Err(JsError::new(&format!("decodeString failed: {}", e)));
    }
    let bytes = memory.subarray(ptr, ptr + len).to_vec();
    bridge_transfer::decode_string(&bytes, 0, len)
        .map(|s| s.into_owned())
        .map_err(|e| JsError::new(&format!("decodeString failed: {}", e)))
}

/// 文字列を `dest`（ちょうど UTF-8 長のビュー）に書き込む
///
/// # エラー
/// - `dest` が短い / 長い（何も書き込まない）
#[wasm_bindgen(js_name = "encodeString")]
pub fn encode_string(s: &str, dest: &js_sys::Uint8Array) -> Result<(), JsError> {
    let mut buf = vec![0u8; dest.length() as usize];
    bridge_transfer::encode_string(s, &mut buf)
        .map_err(|e| JsError::new(&format!("encodeString failed: {}", e)))?;
    dest.copy_from(&buf);
    Ok(())
}

/// JS から来たハンドル値を検証する
pub(crate) fn handle_from_js(handle: i32) -> Result<Handle, JsError> {
    Handle::try_from(handle).map_err(|e| JsError::new(&format!("{}", e)))
}
