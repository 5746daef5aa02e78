//! 境界をまたぐ不透明ハンドル

use crate::error::RegistryError;

/// レジストリ内の値を指す不透明な整数ハンドル
///
/// 相手側にはこの整数だけが見える。値の所有者はレジストリであり、
/// ハンドルは単なる検索キー（弱参照）にすぎない。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Handle(u32);

impl Handle {
    /// ハンドルの最大値（2^31 - 1）
    ///
    /// JS / WASM の i32 として符号なしで表現できる範囲に収める。
    pub const MAX: u32 = 0x7fff_ffff;

    /// 生の値からハンドルを作る（範囲チェックなし、上位ビットは落とす）
    pub const fn new(raw: u32) -> Self {
        Handle(raw & Self::MAX)
    }

    /// 生の u32 値を返す
    pub const fn raw(&self) -> u32 {
        self.0
    }

    /// 境界越しに渡す i32 表現
    pub const fn as_i32(&self) -> i32 {
        self.0 as i32
    }
}

impl core::fmt::Display for Handle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl TryFrom<i32> for Handle {
    type Error = RegistryError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        if value < 0 {
            return Err(RegistryError::InvalidHandle(value));
        }
        Ok(Handle(value as u32))
    }
}

impl From<Handle> for u32 {
    fn from(handle: Handle) -> Self {
        handle.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_from_i32() {
        assert_eq!(Handle::try_from(0i32).unwrap().raw(), 0);
        assert_eq!(Handle::try_from(i32::MAX).unwrap().raw(), Handle::MAX);
        assert_eq!(Handle::try_from(-1i32), Err(RegistryError::InvalidHandle(-1)));
    }

    #[test]
    fn test_handle_new_masks_high_bit() {
        assert_eq!(Handle::new(0xffff_ffff).raw(), Handle::MAX);
        assert_eq!(Handle::new(7).as_i32(), 7);
    }
}
