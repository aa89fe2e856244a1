//! Repository trait 定義
//!
//! 空間のジオメトリ（幅・高さ・通行不可セル）を取得するインターフェース。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。

use async_trait::async_trait;

use super::{entity::SpaceGeometry, error::RepositoryError, value_object::SpaceId};

/// Space geometry repository
///
/// Room の生成時に 1 回だけ呼ばれます（参加者ごとではない）。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpaceGeometryRepository: Send + Sync {
    /// 空間のジオメトリを取得
    async fn get_space_geometry(&self, space_id: &SpaceId)
    -> Result<SpaceGeometry, RepositoryError>;
}
