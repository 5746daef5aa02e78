//! ハンドルレジストリ本体

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU32, Ordering};

use crate::config::{RegistryConfig, RegistryStats};
use crate::error::RegistryError;
use crate::handle::Handle;

/// レジストリインスタンスの ID 採番用（Disposer の取り違え検出に使う）
static NEXT_REGISTRY_ID: AtomicU32 = AtomicU32::new(0);

/// 整数ハンドル → 値 のレジストリ
///
/// 論理チャンネル（blob 転送、コールバックなど）ごとに 1 インスタンスを持つ。
/// グローバルなシングルトンにはせず、境界を管理するコンポーネントが所有する。
///
/// ## 不変条件
/// - `table` のキーはすべて `alloc` で払い出され、まだ dispose されていない
/// - `next_handle` は常に `0..=max_handle` の範囲
///
/// ## スレッド安全性
///
/// 変更系の操作は `&mut self` を要求するため、テーブル更新とカウンタ更新は
/// 借用規則によって一体で行われる。複数スレッドから使う場合は
/// `SharedRegistry`（`std` feature）を使う。
pub struct HandleRegistry<T> {
    /// このインスタンスの ID
    id: u32,
    /// 次に割り当てる候補のハンドル値
    next_handle: u32,
    /// 生存中のハンドル → 値
    table: BTreeMap<u32, T>,
    config: RegistryConfig,
    stats: RegistryStats,
}

/// `alloc` の結果：割り当てられたハンドルと、それを解放する Disposer
#[derive(Debug)]
#[must_use = "the disposer is the only way to release the handle"]
pub struct Allocation {
    pub handle: Handle,
    pub disposer: Disposer,
}

/// 1 つのハンドルを無効化するための使い捨てトークン
///
/// `dispose` は `self` を消費するので、同じ Disposer を 2 回使うことはできない。
/// 割り当てたレジストリ以外に渡された場合は何もしない（警告ログのみ）。
#[derive(Debug, PartialEq, Eq)]
#[must_use = "dropping a disposer leaks the registry entry"]
pub struct Disposer {
    handle: Handle,
    registry_id: u32,
}

impl Disposer {
    /// 対象のハンドル
    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// ハンドルを解放し、保持されていた値を返す
    ///
    /// 既に解放済みのハンドルや、別のレジストリに対して呼んだ場合は `None`。
    pub fn dispose<T>(self, registry: &mut HandleRegistry<T>) -> Option<T> {
        if registry.id != self.registry_id {
            log::warn!(
                "disposer for handle {} belongs to registry {}, not {}",
                self.handle,
                self.registry_id,
                registry.id
            );
            return None;
        }
        registry.dispose(self.handle)
    }
}

impl<T> HandleRegistry<T> {
    /// デフォルト設定（上限 2^31 - 1）でレジストリを作る
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// 設定を指定してレジストリを作る
    pub fn with_config(config: RegistryConfig) -> Self {
        HandleRegistry {
            id: NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed),
            next_handle: 0,
            table: BTreeMap::new(),
            config,
            stats: RegistryStats::default(),
        }
    }

    /// 値を登録してハンドルを払い出す
    ///
    /// 現在のカウンタ値から順に、生存中でない最初の値を割り当てる。
    /// カウンタが上限を超えると 0 に戻る（生存中のハンドルは飛ばす）。
    ///
    /// # エラー
    /// - `RegistryError::Exhausted`: ハンドル空間がすべて使用中
    pub fn alloc(&mut self, value: T) -> Result<Allocation, RegistryError> {
        let handle = self.next_free_handle()?;
        self.table.insert(handle.raw(), value);
        self.stats.allocated_total += 1;
        log::trace!("registry {}: alloc {}", self.id, handle);

        Ok(Allocation {
            handle,
            disposer: Disposer {
                handle,
                registry_id: self.id,
            },
        })
    }

    /// ハンドルを解放し、保持されていた値を返す
    ///
    /// 存在しないハンドルはエラーにせず警告ログを出して `None` を返す
    /// （二重 dispose を許容する）。
    pub fn dispose(&mut self, handle: Handle) -> Option<T> {
        match self.table.remove(&handle.raw()) {
            Some(value) => {
                self.stats.disposed_total += 1;
                log::trace!("registry {}: dispose {}", self.id, handle);
                Some(value)
            }
            None => {
                self.stats.stale_disposals += 1;
                if self.config.warn_on_stale_dispose {
                    log::warn!("disposing non-existent handle: {}", handle);
                }
                None
            }
        }
    }

    /// ハンドルが指す値への参照
    pub fn get(&self, handle: Handle) -> Result<&T, RegistryError> {
        self.table
            .get(&handle.raw())
            .ok_or(RegistryError::UnknownHandle(handle))
    }

    /// ハンドルが指す値への可変参照
    pub fn get_mut(&mut self, handle: Handle) -> Result<&mut T, RegistryError> {
        self.table
            .get_mut(&handle.raw())
            .ok_or(RegistryError::UnknownHandle(handle))
    }

    /// ハンドルが生存中か
    pub fn contains(&self, handle: Handle) -> bool {
        self.table.contains_key(&handle.raw())
    }

    /// 生存中のハンドル数
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// 生存中のハンドルと値をハンドル順に列挙する
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &T)> + '_ {
        self.table.iter().map(|(raw, value)| (Handle::new(*raw), value))
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// 統計情報のスナップショット
    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            live: self.table.len(),
            ..self.stats
        }
    }

    /// 生存中の値をすべて取り出してテーブルを空にする（チャンネルの破棄用）
    ///
    /// カウンタは巻き戻さない。取り出した分は dispose 済みとして数える。
    pub fn drain(&mut self) -> Vec<(Handle, T)> {
        let table = core::mem::take(&mut self.table);
        self.stats.disposed_total += table.len() as u64;
        table
            .into_iter()
            .map(|(raw, value)| (Handle::new(raw), value))
            .collect()
    }

    fn next_free_handle(&mut self) -> Result<Handle, RegistryError> {
        let capacity = self.config.capacity();
        if self.table.len() as u64 >= capacity {
            return Err(RegistryError::Exhausted { capacity });
        }

        // 空きが少なくとも 1 つあるので必ず終了する
        loop {
            let candidate = self.next_handle;
            self.advance();
            if !self.table.contains_key(&candidate) {
                return Ok(Handle::new(candidate));
            }
        }
    }

    fn advance(&mut self) {
        if self.next_handle >= self.config.effective_max_handle() {
            self.next_handle = 0;
            self.stats.wraparounds += 1;
            log::debug!("registry {}: handle counter wrapped around", self.id);
        } else {
            self.next_handle += 1;
        }
    }
}

impl<T: AsRef<[u8]>> HandleRegistry<T> {
    /// ハンドルが指すバイト列を `dest` に丸ごとコピーする
    ///
    /// `dest` は境界の向こう側が自分のメモリに確保したバッファ。
    /// 長さが完全に一致しない限りコピーしない（切り詰めやゼロ埋めはしない）。
    /// レジストリ側の値はそのまま残る（move ではなく copy）。
    ///
    /// # エラー
    /// - `RegistryError::UnknownHandle`: 未割り当て、または dispose 済み
    /// - `RegistryError::LengthMismatch`: 長さ不一致（`dest` は変更されない）
    pub fn read_into(&self, handle: Handle, dest: &mut [u8]) -> Result<(), RegistryError> {
        let src = self.get(handle)?.as_ref();
        if src.len() != dest.len() {
            return Err(RegistryError::LengthMismatch {
                handle,
                expected: src.len(),
                actual: dest.len(),
            });
        }
        dest.copy_from_slice(src);
        Ok(())
    }

    /// ハンドルが指すバイト列の長さ
    pub fn byte_len(&self, handle: Handle) -> Result<usize, RegistryError> {
        Ok(self.get(handle)?.as_ref().len())
    }
}

impl<T> Default for HandleRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> core::fmt::Debug for HandleRegistry<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HandleRegistry")
            .field("id", &self.id)
            .field("next_handle", &self.next_handle)
            .field("live", &self.table.len())
            .field("config", &self.config)
            .finish()
    }
}
