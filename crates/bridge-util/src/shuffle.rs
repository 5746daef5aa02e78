//! スライスのシャッフル

use rand::seq::SliceRandom;
use rand::Rng;

/// スライスをその場で一様にシャッフルする（Fisher–Yates）
pub fn shuffle<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    items.shuffle(rng);
}
