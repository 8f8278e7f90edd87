//! IdGenerator port - ID 生成の抽象化
//!
//! # 実装
//! - **UlidGenerator**: Clock ベースの ULID（本番用・テスト用どちらも）

use ulid::Ulid;

use crate::domain::ids::{Id, IdMarker};
use crate::ports::Clock;

/// IdGenerator はエンティティ ID の元になる ULID を生成
///
/// # Thread Safety
/// - `Send + Sync` を要求（複数の転送タスクから使える）
pub trait IdGenerator: Send + Sync {
    fn generate_ulid(&self) -> Ulid;
}

impl dyn IdGenerator {
    /// 型付き ID を生成
    pub fn generate<T: IdMarker>(&self) -> Id<T> {
        Id::from_ulid(self.generate_ulid())
    }
}

/// UlidGenerator は Clock の時刻をタイムスタンプ部に使う
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_ulid(&self) -> Ulid {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        Ulid::from_parts(timestamp_ms, rand::random())
    }
}
