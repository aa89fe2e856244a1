//! UseCase 層のエラー定義
//!
//! ハンドシェイクのエラーは `crate::domain::JoinError` を使います。

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GetSpaceDetailError {
    #[error("no live room for space '{0}'")]
    SpaceNotFound(String),
}
