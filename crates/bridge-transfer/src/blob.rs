//! blob 転送チャンネル
//!
//! JS 側が持つ `Uint8Array` を、ハンドル経由で Wasm 側にコピーさせる。
//! 値は固定長（`Box<[u8]>`）で保持し、読み出しは長さ完全一致のみ許す。

use alloc::boxed::Box;

use bridge_registry::{Disposer, Handle, HandleRegistry, RegistryConfig, RegistryError, RegistryStats};

/// `create_blob` の結果
///
/// `handle` と `len` を相手側に渡し、読み出しが終わったら `dispose` する。
#[derive(Debug)]
#[must_use = "a blob must be disposed once the other side has read it"]
pub struct Blob {
    pub handle: Handle,
    pub len: usize,
    disposer: Disposer,
}

impl Blob {
    /// blob を解放する。既に解放済みなら `false`
    pub fn dispose(self, registry: &mut BlobRegistry) -> bool {
        registry.dispose_with(self.disposer).is_some()
    }

    /// Disposer だけを取り出す（ハンドルと長さは別に持ち運ぶ場合）
    pub fn into_disposer(self) -> Disposer {
        self.disposer
    }
}

/// blob 用のハンドルレジストリ
#[derive(Debug, Default)]
pub struct BlobRegistry {
    inner: HandleRegistry<Box<[u8]>>,
}

impl BlobRegistry {
    pub fn new() -> Self {
        BlobRegistry {
            inner: HandleRegistry::new(),
        }
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        BlobRegistry {
            inner: HandleRegistry::with_config(config),
        }
    }

    /// バイト列を登録して blob を作る
    ///
    /// # エラー
    /// - `RegistryError::Exhausted`: ハンドル空間がすべて使用中
    pub fn create_blob(&mut self, bytes: impl Into<Box<[u8]>>) -> Result<Blob, RegistryError> {
        let bytes: Box<[u8]> = bytes.into();
        let len = bytes.len();
        let allocation = self.inner.alloc(bytes)?;
        Ok(Blob {
            handle: allocation.handle,
            len,
            disposer: allocation.disposer,
        })
    }

    /// 文字列を UTF-8 バイト列として登録する
    pub fn create_string_blob(&mut self, s: &str) -> Result<Blob, RegistryError> {
        self.create_blob(s.as_bytes())
    }

    /// blob の中身を `dest` にコピーする（`dest` は相手側が確保したバッファ）
    ///
    /// # エラー
    /// - `RegistryError::UnknownHandle`: 不正なハンドル（解放済みを含む）
    /// - `RegistryError::LengthMismatch`: 長さ不一致
    pub fn read_blob(&self, handle: Handle, dest: &mut [u8]) -> Result<(), RegistryError> {
        self.inner.read_into(handle, dest)
    }

    /// blob の長さ
    pub fn blob_len(&self, handle: Handle) -> Result<usize, RegistryError> {
        self.inner.byte_len(handle)
    }

    /// blob の中身への参照（コピーせずに読む場合）
    pub fn bytes(&self, handle: Handle) -> Result<&[u8], RegistryError> {
        self.inner.get(handle).map(|b| &**b)
    }

    /// 生存中の blob の合計バイト数
    pub fn live_bytes(&self) -> usize {
        self.inner.iter().map(|(_, bytes)| bytes.len()).sum()
    }

    /// ハンドルを直接指定して解放する。存在しなければ警告ログのみ
    pub fn dispose(&mut self, handle: Handle) -> Option<Box<[u8]>> {
        self.inner.dispose(handle)
    }

    /// `Blob` から取り出した Disposer で解放する
    pub fn dispose_with(&mut self, disposer: Disposer) -> Option<Box<[u8]>> {
        disposer.dispose(&mut self.inner)
    }

    /// 生存中の blob をすべて解放する
    pub fn clear(&mut self) -> usize {
        self.inner.drain().len()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn stats(&self) -> RegistryStats {
        self.inner.stats()
    }

    pub fn config(&self) -> &RegistryConfig {
        self.inner.config()
    }
}
