//! CallbackChannel wasm-bindgen エクスポート
//!
//! Wasm 側（Rust）のクロージャ、または JS の関数をハンドルに登録し、
//! JS 側のイベントハンドラからハンドルと i32 引数だけで呼び出せるようにする。
//!
//! ## 再入
//!
//! 呼び出し中のコールバックから `unregister` した場合、解除は呼び出しが
//! 終わった直後に行われる（ワンショットのハンドラ向け）。
//! 呼び出し中のコールバックから別の `invoke*` を呼ぶことはできない（エラー）。

use std::cell::RefCell;

use js_sys::Function;
use wasm_bindgen::prelude::*;

use bridge_registry::{Allocation, Handle};
use bridge_transfer::{Callback, CallbackError, CallbackRegistry};

use crate::handle_from_js;

/// コールバック呼び出しチャンネル
///
/// エクスポートはすべて `&self` を取る。コールバック内から同じチャンネルを
/// 呼んでも wasm-bindgen の借用チェックで弾かれないようにするため。
#[wasm_bindgen]
pub struct CallbackChannel {
    registry: RefCell<CallbackRegistry>,
    /// 呼び出し中に要求された解除
    pending_unregister: RefCell<Vec<Handle>>,
}

#[wasm_bindgen]
impl CallbackChannel {
    #[wasm_bindgen(constructor)]
    pub fn new() -> CallbackChannel {
        CallbackChannel {
            registry: RefCell::new(CallbackRegistry::new()),
            pending_unregister: RefCell::new(Vec::new()),
        }
    }

    /// JS の関数を登録してハンドルを返す
    ///
    /// # 引数
    /// - `f`: 呼び出す関数（`this` は `undefined`）
    /// - `arity`: 引数の数（0〜2）。省略時は `f.length`
    ///
    /// 関数内で投げられた例外は warn ログに出して握りつぶす。
    #[wasm_bindgen(js_name = "registerFunction")]
    pub fn register_function(&self, f: Function, arity: Option<u32>) -> Result<i32, JsError> {
        let arity = arity.unwrap_or_else(|| f.length());
        let callback = callback_for_arity(f, arity)
            .ok_or_else(|| JsError::new(&format!("Unsupported callback arity: {}", arity)))?;
        let allocation = self.register(callback).map_err(to_js)?;
        // 解除は unregister(handle) で行う
        Ok(allocation.handle.as_i32())
    }

    /// 引数なしで呼び出す
    pub fn invoke(&self, handle: i32) -> Result<(), JsError> {
        let handle = handle_from_js(handle)?;
        self.with_registry(|registry| registry.invoke(handle))
    }

    #[wasm_bindgen(js_name = "invokeI32")]
    pub fn invoke_i32(&self, handle: i32, arg: i32) -> Result<(), JsError> {
        let handle = handle_from_js(handle)?;
        self.with_registry(|registry| registry.invoke_i32(handle, arg))
    }

    #[wasm_bindgen(js_name = "invokeI32I32")]
    pub fn invoke_i32_i32(&self, handle: i32, arg1: i32, arg2: i32) -> Result<(), JsError> {
        let handle = handle_from_js(handle)?;
        self.with_registry(|registry| registry.invoke_i32_i32(handle, arg1, arg2))
    }

    /// 登録を解除する。存在しなければ警告ログのみで `false`
    ///
    /// コールバックの呼び出し中は解除を予約して `true` を返す。
    pub fn unregister(&self, handle: i32) -> Result<bool, JsError> {
        let handle = handle_from_js(handle)?;
        match self.registry.try_borrow_mut() {
            Ok(mut registry) => Ok(registry.unregister(handle)),
            Err(_) => {
                log::debug!("callback {} unregister deferred until invocation ends", handle);
                self.pending_unregister.borrow_mut().push(handle);
                Ok(true)
            }
        }
    }

    /// 登録中のコールバック数（呼び出し中は数えられないので 0）
    #[wasm_bindgen(getter, js_name = "liveCount")]
    pub fn live_count(&self) -> u32 {
        self.registry.try_borrow().map_or(0, |r| r.len() as u32)
    }
}

impl CallbackChannel {
    /// Rust 側のコールバックを登録する
    pub fn register(&self, callback: Callback) -> Result<Allocation, CallbackError> {
        self.registry
            .try_borrow_mut()
            .map_err(|_| CallbackError::Busy)?
            .register(callback)
    }

    fn with_registry(
        &self,
        f: impl FnOnce(&mut CallbackRegistry) -> Result<(), CallbackError>,
    ) -> Result<(), JsError> {
        let mut registry = self
            .registry
            .try_borrow_mut()
            .map_err(|_| to_js(CallbackError::Busy))?;
        let result = f(&mut registry);
        for handle in self.pending_unregister.borrow_mut().drain(..) {
            registry.unregister(handle);
        }
        result.map_err(to_js)
    }
}

impl Default for CallbackChannel {
    fn default() -> Self {
        Self::new()
    }
}

fn callback_for_arity(f: Function, arity: u32) -> Option<Callback> {
    let callback = match arity {
        0 => Callback::Unit(Box::new(move || report(f.call0(&JsValue::UNDEFINED)))),
        1 => Callback::I32(Box::new(move |a| {
            report(f.call1(&JsValue::UNDEFINED, &JsValue::from(a)))
        })),
        2 => Callback::I32I32(Box::new(move |a, b| {
            report(f.call2(&JsValue::UNDEFINED, &JsValue::from(a), &JsValue::from(b)))
        })),
        _ => return None,
    };
    Some(callback)
}

fn report(result: Result<JsValue, JsValue>) {
    if let Err(e) = result {
        log::warn!("callback threw: {:?}", e);
    }
}

fn to_js(e: CallbackError) -> JsError {
    JsError::new(&format!("callback failed: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_one_shot_unregister_from_inside_callback() {
        let channel = Rc::new(CallbackChannel::new());
        let own_handle = Rc::new(Cell::new(-1));
        let calls = Rc::new(Cell::new(0));

        let (c, h, n) = (channel.clone(), own_handle.clone(), calls.clone());
        let allocation = channel
            .register(Callback::Unit(Box::new(move || {
                n.set(n.get() + 1);
                assert_eq!(c.unregister(h.get()).ok(), Some(true));
            })))
            .unwrap();
        own_handle.set(allocation.handle.as_i32());
        assert_eq!(channel.live_count(), 1);

        assert!(channel.invoke(own_handle.get()).is_ok());
        assert_eq!(calls.get(), 1);
        assert_eq!(channel.live_count(), 0);
        assert_eq!(channel.registry.borrow().stats().disposed_total, 1);
        assert!(channel.pending_unregister.borrow().is_empty());
    }

    #[test]
    fn test_unregister_other_handle_from_inside_callback() {
        let channel = Rc::new(CallbackChannel::new());
        let target = channel.register(Callback::I32(Box::new(|_| {}))).unwrap();
        let target_handle = target.handle.as_i32();

        let c = channel.clone();
        let trigger = channel
            .register(Callback::Unit(Box::new(move || {
                let _ = c.unregister(target_handle);
            })))
            .unwrap();

        assert!(channel.invoke(trigger.handle.as_i32()).is_ok());
        assert_eq!(channel.live_count(), 1);
        assert!(channel.unregister(trigger.handle.as_i32()).ok().unwrap());
    }

    #[test]
    fn test_unregister_outside_invocation_is_immediate() {
        let channel = CallbackChannel::new();
        let allocation = channel.register(Callback::Unit(Box::new(|| {}))).unwrap();
        let handle = allocation.handle.as_i32();
        assert_eq!(channel.unregister(handle).ok(), Some(true));
        assert_eq!(channel.unregister(handle).ok(), Some(false));
        assert_eq!(channel.live_count(), 0);
    }

    #[test]
    fn test_nested_register_is_busy() {
        let channel = Rc::new(CallbackChannel::new());
        let nested = Rc::new(Cell::new(None));

        let (c, r) = (channel.clone(), nested.clone());
        let allocation = channel
            .register(Callback::Unit(Box::new(move || {
                r.set(Some(c.register(Callback::Unit(Box::new(|| {}))).map(|a| a.handle)));
            })))
            .unwrap();

        assert!(channel.invoke(allocation.handle.as_i32()).is_ok());
        assert_eq!(nested.take(), Some(Err(CallbackError::Busy)));
        assert_eq!(channel.live_count(), 1);
    }
}
