//! BlobChannel wasm-bindgen エクスポート
//!
//! JS 側が持つ `Uint8Array` をハンドル経由で Wasm 側に渡すチャンネル。
//!
//! ```text
//! JS:   const blob = channel.createBlob(array)   // { handle, length }
//! JS:   (blob.handle, blob.length) を Wasm へ渡す
//! Wasm: length バイト確保 → channel.readBlob(handle, view)
//! JS:   blob.dispose()
//! ```

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use js_sys::Uint8Array;
use serde::Serialize;
use wasm_bindgen::prelude::*;

use bridge_registry::{Disposer, RegistryConfig, RegistryError, RegistryStats};
use bridge_transfer::BlobRegistry;

use crate::handle_from_js;

/// blob 転送チャンネル
///
/// ## スレッド安全性
///
/// WASM は シングルスレッドのため、`!Send + !Sync` を満たす。
/// JS からは単一スレッドで呼び出される前提。
/// レジストリは発行済みの `BlobTicket` と共有する（チケットは `Weak` で参照）。
#[wasm_bindgen]
pub struct BlobChannel {
    registry: Rc<RefCell<BlobRegistry>>,
}

/// `createBlob` の戻り値
///
/// `handle` と `length` を相手側に渡し、読み出しが終わったら `dispose()` する。
/// チャンネルが先に破棄されていれば `dispose()` は何もしない。
#[wasm_bindgen]
pub struct BlobTicket {
    handle: i32,
    length: u32,
    disposer: Option<Disposer>,
    registry: Weak<RefCell<BlobRegistry>>,
}

/// `getStats` の JSON
#[derive(Serialize)]
struct ChannelStats {
    registry: RegistryStats,
    live_bytes: usize,
}

#[wasm_bindgen]
impl BlobTicket {
    #[wasm_bindgen(getter)]
    pub fn handle(&self) -> i32 {
        self.handle
    }

    #[wasm_bindgen(getter)]
    pub fn length(&self) -> u32 {
        self.length
    }

    /// blob を解放する。2 回目以降は何もしない（`false` を返す）
    pub fn dispose(&mut self) -> bool {
        let Some(disposer) = self.disposer.take() else {
            log::warn!("blob ticket {} already disposed", self.handle);
            return false;
        };
        let Some(registry) = self.registry.upgrade() else {
            log::warn!("blob ticket {} outlived its channel", self.handle);
            return false;
        };
        let disposed = registry.borrow_mut().dispose_with(disposer).is_some();
        disposed
    }
}

#[wasm_bindgen]
impl BlobChannel {
    /// チャンネルを作る
    ///
    /// # 引数
    /// - `max_handle`: ハンドルカウンタの上限。省略時は 2^31 - 1
    #[wasm_bindgen(constructor)]
    pub fn new(max_handle: Option<u32>) -> BlobChannel {
        let config = max_handle
            .map(RegistryConfig::with_max_handle)
            .unwrap_or_default();
        BlobChannel::from_config(config)
    }

    /// JSON の設定からチャンネルを作る
    ///
    /// # 例
    /// ```javascript
    /// const channel = BlobChannel.withConfig('{"max_handle": 1023, "warn_on_stale_dispose": false}');
    /// ```
    #[wasm_bindgen(js_name = "withConfig")]
    pub fn with_config(json: &str) -> Result<BlobChannel, JsError> {
        let config: RegistryConfig = serde_json::from_str(json)
            .map_err(|e| JsError::new(&format!("Invalid channel config: {}", e)))?;
        Ok(BlobChannel::from_config(config))
    }

    /// バイト列を登録する（内容は Wasm 側にコピーされる）
    #[wasm_bindgen(js_name = "createBlob")]
    pub fn create_blob(&self, data: &[u8]) -> Result<BlobTicket, JsError> {
        let blob = self
            .registry
            .borrow_mut()
            .create_blob(data)
            .map_err(|e| JsError::new(&format!("createBlob failed: {}", e)))?;
        Ok(self.ticket(blob))
    }

    /// 文字列を UTF-8 で登録する
    #[wasm_bindgen(js_name = "createStringBlob")]
    pub fn create_string_blob(&self, s: &str) -> Result<BlobTicket, JsError> {
        let blob = self
            .registry
            .borrow_mut()
            .create_string_blob(s)
            .map_err(|e| JsError::new(&format!("createStringBlob failed: {}", e)))?;
        Ok(self.ticket(blob))
    }

    /// blob の内容を `dest` ビューにそのまま書き込む
    ///
    /// `dest` は相手側のメモリ上に確保された、blob と同じ長さのビュー。
    ///
    /// # エラー
    /// - 不正なハンドル（解放済みを含む）
    /// - 長さ不一致（`dest` は変更されない）
    #[wasm_bindgen(js_name = "readBlob")]
    pub fn read_blob(&self, handle: i32, dest: &Uint8Array) -> Result<(), JsError> {
        let handle = handle_from_js(handle)?;
        let registry = self.registry.borrow();
        let bytes = registry
            .bytes(handle)
            .map_err(|e| JsError::new(&format!("readBlob failed: {}", e)))?;

        let actual = dest.length() as usize;
        if bytes.len() != actual {
            let e = RegistryError::LengthMismatch {
                handle,
                expected: bytes.len(),
                actual,
            };
            return Err(JsError::new(&format!("readBlob failed: {}", e)));
        }
        dest.copy_from(bytes);
        Ok(())
    }

    /// blob の長さ
    #[wasm_bindgen(js_name = "blobLength")]
    pub fn blob_length(&self, handle: i32) -> Result<u32, JsError> {
        let handle = handle_from_js(handle)?;
        self.registry
            .borrow()
            .blob_len(handle)
            .map(|len| len as u32)
            .map_err(|e| JsError::new(&format!("blobLength failed: {}", e)))
    }

    /// ハンドルを直接指定して解放する。存在しなければ警告ログのみで `false`
    pub fn dispose(&self, handle: i32) -> Result<bool, JsError> {
        let handle = handle_from_js(handle)?;
        Ok(self.registry.borrow_mut().dispose(handle).is_some())
    }

    /// 生存中の blob をすべて解放し、解放した数を返す
    pub fn clear(&self) -> u32 {
        self.registry.borrow_mut().clear() as u32
    }

    /// 生存中の blob 数
    #[wasm_bindgen(getter, js_name = "liveCount")]
    pub fn live_count(&self) -> u32 {
        self.registry.borrow().len() as u32
    }

    /// チャンネル統計を JSON 文字列で返す
    ///
    /// # 戻り値
    /// ```json
    /// {
    ///   "registry": {
    ///     "live": 2,
    ///     "allocated_total": 10,
    ///     "disposed_total": 8,
    ///     "stale_disposals": 0,
    ///     "wraparounds": 0
    ///   },
    ///   "live_bytes": 4096
    /// }
    /// ```
    #[wasm_bindgen(js_name = "getStats")]
    pub fn get_stats(&self) -> Result<String, JsError> {
        let registry = self.registry.borrow();
        let stats = ChannelStats {
            registry: registry.stats(),
            live_bytes: registry.live_bytes(),
        };
        serde_json::to_string(&stats).map_err(|e| JsError::new(&format!("getStats failed: {}", e)))
    }
}

impl BlobChannel {
    pub fn from_config(config: RegistryConfig) -> Self {
        BlobChannel {
            registry: Rc::new(RefCell::new(BlobRegistry::with_config(config))),
        }
    }

    fn ticket(&self, blob: bridge_transfer::Blob) -> BlobTicket {
        BlobTicket {
            handle: blob.handle.as_i32(),
            length: blob.len as u32,
            disposer: Some(blob.into_disposer()),
            registry: Rc::downgrade(&self.registry),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticket_dispose_takes_no_channel() {
        let channel = BlobChannel::new(None);
        let mut ticket = channel.create_blob(&[0x41, 0x42, 0x43]).ok().unwrap();
        assert_eq!(ticket.handle(), 0);
        assert_eq!(ticket.length(), 3);
        assert_eq!(channel.live_count(), 1);

        assert!(ticket.dispose());
        assert_eq!(channel.live_count(), 0);
        // 2 回目は警告のみ
        assert!(!ticket.dispose());
        assert_eq!(channel.registry.borrow().stats().disposed_total, 1);
    }

    #[test]
    fn test_ticket_outliving_channel_is_noop() {
        let channel = BlobChannel::new(None);
        let mut ticket = channel.create_string_blob("hello").ok().unwrap();
        drop(channel);
        assert!(!ticket.dispose());
    }

    #[test]
    fn test_ticket_after_handle_dispose_is_stale() {
        let channel = BlobChannel::new(None);
        let mut ticket = channel.create_blob(&[1]).ok().unwrap();
        assert!(channel.dispose(ticket.handle()).ok().unwrap());
        assert!(!ticket.dispose());
        assert_eq!(channel.registry.borrow().stats().stale_disposals, 1);
    }
}
