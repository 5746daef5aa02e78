//! ハンドル越しに呼び出すコールバック表
//!
//! JS 側のイベント（タイマー、WebSocket、DOM イベントなど）から Wasm 側の
//! クロージャを呼ぶために、クロージャをレジストリに登録して整数ハンドルを渡す。
//! JS 側はハンドルと引数（0〜2 個の i32）だけで呼び出せる。

use alloc::boxed::Box;

use bridge_registry::{Allocation, Handle, HandleRegistry, RegistryConfig, RegistryStats};

use crate::error::CallbackError;

/// 登録できるコールバックの形
pub enum Callback {
    /// 引数なし
    Unit(Box<dyn FnMut()>),
    /// i32 を 1 つ受け取る
    I32(Box<dyn FnMut(i32)>),
    /// i32 を 2 つ受け取る
    I32I32(Box<dyn FnMut(i32, i32)>),
}

impl Callback {
    /// 引数の数
    pub fn arity(&self) -> u8 {
        match self {
            Callback::Unit(_) => 0,
            Callback::I32(_) => 1,
            Callback::I32I32(_) => 2,
        }
    }
}

impl core::fmt::Debug for Callback {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Callback(arity={})", self.arity())
    }
}

/// コールバック用のハンドルレジストリ
#[derive(Debug, Default)]
pub struct CallbackRegistry {
    inner: HandleRegistry<Callback>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        CallbackRegistry {
            inner: HandleRegistry::new(),
        }
    }

    pub fn with_config(config: RegistryConfig) -> Self {
        CallbackRegistry {
            inner: HandleRegistry::with_config(config),
        }
    }

    pub fn register(&mut self, callback: Callback) -> Result<Allocation, CallbackError> {
        Ok(self.inner.alloc(callback)?)
    }

    pub fn register_unit(&mut self, f: impl FnMut() + 'static) -> Result<Allocation, CallbackError> {
        self.register(Callback::Unit(Box::new(f)))
    }

    pub fn register_i32(&mut self, f: impl FnMut(i32) + 'static) -> Result<Allocation, CallbackError> {
        self.register(Callback::I32(Box::new(f)))
    }

    pub fn register_i32_i32(
        &mut self,
        f: impl FnMut(i32, i32) + 'static,
    ) -> Result<Allocation, CallbackError> {
        self.register(Callback::I32I32(Box::new(f)))
    }

    /// 引数なしで呼び出す
    pub fn invoke(&mut self, handle: Handle) -> Result<(), CallbackError> {
        match self.inner.get_mut(handle)? {
            Callback::Unit(f) => {
                f();
                Ok(())
            }
            other => Err(mismatch(handle, other, 0)),
        }
    }

    /// i32 を 1 つ渡して呼び出す
    pub fn invoke_i32(&mut self, handle: Handle, arg: i32) -> Result<(), CallbackError> {
        match self.inner.get_mut(handle)? {
            Callback::I32(f) => {
                f(arg);
                Ok(())
            }
            other => Err(mismatch(handle, other, 1)),
        }
    }

    /// i32 を 2 つ渡して呼び出す
    pub fn invoke_i32_i32(&mut self, handle: Handle, arg1: i32, arg2: i32) -> Result<(), CallbackError> {
        match self.inner.get_mut(handle)? {
            Callback::I32I32(f) => {
                f(arg1, arg2);
                Ok(())
            }
            other => Err(mismatch(handle, other, 2)),
        }
    }

    /// 登録を解除する。存在しなければ警告ログのみで `false`
    pub fn unregister(&mut self, handle: Handle) -> bool {
        self.inner.dispose(handle).is_some()
    }

    /// `register` が返した Disposer で登録を解除する
    pub fn unregister_allocation(&mut self, allocation: Allocation) -> bool {
        allocation.disposer.dispose(&mut self.inner).is_some()
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
}

fn mismatch(handle: Handle, callback: &Callback, actual: u8) -> CallbackError {
    log::warn!(
        "callback {} invoked with {} argument(s), expects {}",
        handle,
        actual,
        callback.arity()
    );
    CallbackError::ArityMismatch {
        handle,
        expected: callback.arity(),
        actual,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::rc::Rc;
    use alloc::vec::Vec;
    use core::cell::{Cell, RefCell};

    #[test]
    fn test_invoke_unit() {
        let mut reg = CallbackRegistry::new();
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        let alloc = reg.register_unit(move || c.set(c.get() + 1)).unwrap();

        reg.invoke(alloc.handle).unwrap();
        reg.invoke(alloc.handle).unwrap();
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_invoke_with_args() {
        let mut reg = CallbackRegistry::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let s1 = seen.clone();
        let one = reg.register_i32(move |a| s1.borrow_mut().push((a, 0))).unwrap();
        let s2 = seen.clone();
        let two = reg
            .register_i32_i32(move |a, b| s2.borrow_mut().push((a, b)))
            .unwrap();

        reg.invoke_i32(one.handle, 7).unwrap();
        reg.invoke_i32_i32(two.handle, -1, 42).unwrap();
        assert_eq!(*seen.borrow(), [(7, 0), (-1, 42)]);
    }

    #[test]
    fn test_arity_mismatch() {
        let mut reg = CallbackRegistry::new();
        let alloc = reg.register_i32(|_| {}).unwrap();
        assert_eq!(
            reg.invoke(alloc.handle),
            Err(CallbackError::ArityMismatch {
                handle: alloc.handle,
                expected: 1,
                actual: 0
            })
        );
        assert!(matches!(
            reg.invoke_i32_i32(alloc.handle, 1, 2),
            Err(CallbackError::ArityMismatch { expected: 1, actual: 2, .. })
        ));
    }

    #[test]
    fn test_unregistered_callback_is_unknown() {
        let mut reg = CallbackRegistry::new();
        let alloc = reg.register_unit(|| {}).unwrap();
        let handle = alloc.handle;
        assert!(reg.unregister_allocation(alloc));
        assert!(matches!(
            reg.invoke(handle),
            Err(CallbackError::Registry(bridge_registry::RegistryError::UnknownHandle(_)))
        ));
        assert!(!reg.unregister(handle));
        assert!(reg.is_empty());
    }

    #[test]
    fn test_dropping_registry_drops_closures() {
        let token = Rc::new(());
        let mut reg = CallbackRegistry::new();
        let t = token.clone();
        let _alloc = reg.register_unit(move || drop(t.clone())).unwrap();
        assert_eq!(Rc::strong_count(&token), 2);
        drop(reg);
        assert_eq!(Rc::strong_count(&token), 1);
    }
}
