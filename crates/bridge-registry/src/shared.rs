//! スレッド間で共有できるレジストリ（`std` feature）
//!
//! `HandleRegistry` を 1 つの `Mutex` で包む。テーブル更新とカウンタ更新は
//! 同じクリティカルセクション内で行われる。

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::config::{RegistryConfig, RegistryStats};
use crate::error::RegistryError;
use crate::handle::Handle;
use crate::registry::HandleRegistry;

/// `Arc<Mutex<HandleRegistry<T>>>` のラッパー
///
/// clone すると同じレジストリを指す。
pub struct SharedRegistry<T> {
    inner: Arc<Mutex<HandleRegistry<T>>>,
}

/// `SharedRegistry::alloc` の結果
#[derive(Debug)]
#[must_use = "the disposer is the only way to release the handle"]
pub struct SharedAllocation<T> {
    pub handle: Handle,
    pub disposer: SharedDisposer<T>,
}

/// 引数なしで呼べる Disposer
///
/// レジストリへの弱参照を持つ。レジストリが既に破棄されていれば何もしない。
#[must_use = "dropping a disposer leaks the registry entry"]
pub struct SharedDisposer<T> {
    handle: Handle,
    registry: Weak<Mutex<HandleRegistry<T>>>,
}

impl<T> SharedDisposer<T> {
    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// ハンドルを解放し、保持されていた値を返す
    pub fn dispose(self) -> Option<T> {
        let registry = self.registry.upgrade()?;
        let mut guard = registry.lock().unwrap_or_else(PoisonError::into_inner);
        guard.dispose(self.handle)
    }
}

impl<T> core::fmt::Debug for SharedDisposer<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SharedDisposer")
            .field("handle", &self.handle)
            .finish()
    }
}

impl<T> SharedRegistry<T> {
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        SharedRegistry {
            inner: Arc::new(Mutex::new(HandleRegistry::with_config(config))),
        }
    }

    /// ロックを取る。パニックで poison されていても中身を使い続ける
    /// （各操作は 1 回のロック内で完結するため、テーブルは壊れない）
    fn lock(&self) -> MutexGuard<'_, HandleRegistry<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn alloc(&self, value: T) -> Result<SharedAllocation<T>, RegistryError> {
        let allocation = self.lock().alloc(value)?;
        let handle = allocation.handle;
        // 内部の Disposer は SharedDisposer に置き換える
        drop(allocation.disposer);
        Ok(SharedAllocation {
            handle,
            disposer: SharedDisposer {
                handle,
                registry: Arc::downgrade(&self.inner),
            },
        })
    }

    pub fn dispose(&self, handle: Handle) -> Option<T> {
        self.lock().dispose(handle)
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.lock().contains(handle)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn stats(&self) -> RegistryStats {
        self.lock().stats()
    }

    /// ロック中にクロージャで値を参照する
    pub fn with<R>(&self, handle: Handle, f: impl FnOnce(&T) -> R) -> Result<R, RegistryError> {
        let guard = self.lock();
        guard.get(handle).map(f)
    }
}

impl<T: AsRef<[u8]>> SharedRegistry<T> {
    pub fn read_into(&self, handle: Handle, dest: &mut [u8]) -> Result<(), RegistryError> {
        self.lock().read_into(handle, dest)
    }
}

impl<T> Clone for SharedRegistry<T> {
    fn clone(&self) -> Self {
        SharedRegistry {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for SharedRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::vec;
    use std::vec::Vec;

    #[test]
    fn test_shared_disposer_releases_handle() {
        let reg = SharedRegistry::new();
        let SharedAllocation { handle, disposer } = reg.alloc(vec![1u8, 2, 3]).unwrap();
        assert_eq!(handle.raw(), 0);
        assert_eq!(disposer.dispose(), Some(vec![1u8, 2, 3]));
        assert!(!reg.contains(handle));

        let mut dest = [0u8; 3];
        assert_eq!(
            reg.read_into(handle, &mut dest),
            Err(RegistryError::UnknownHandle(handle))
        );
    }

    #[test]
    fn test_disposer_after_registry_dropped() {
        let reg = SharedRegistry::new();
        let alloc = reg.alloc(vec![0u8]).unwrap();
        drop(reg);
        assert_eq!(alloc.disposer.dispose(), None);
    }

    #[test]
    fn test_concurrent_alloc_yields_unique_handles() {
        let reg: SharedRegistry<Vec<u8>> = SharedRegistry::new();
        let workers: Vec<_> = (0..4u8)
            .map(|t| {
                let reg = reg.clone();
                thread::spawn(move || {
                    (0..100u8)
                        .map(|i| reg.alloc(vec![t, i]).unwrap().handle.raw())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut all: Vec<u32> = workers
            .into_iter()
            .flat_map(|w| w.join().unwrap())
            .collect();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 400);
        assert_eq!(reg.len(), 400);
    }

    #[test]
    fn test_with_reads_value_under_lock() {
        let reg = SharedRegistry::new();
        let alloc = reg.alloc(vec![7u8; 5]).unwrap();
        assert_eq!(reg.with(alloc.handle, |v| v.len()).unwrap(), 5);
        let _ = alloc.disposer.dispose();
        assert!(reg.with(alloc.handle, |v| v.len()).is_err());
    }
}
