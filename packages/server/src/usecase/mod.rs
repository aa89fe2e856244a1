//! UseCase layer
//!
//! - `join_space`: ハンドシェイク（認証 → Room への参加）とセッション操作
//! - `get_spaces`: 生きている Room の一覧
//! - `get_space_detail`: 指定した Room の詳細

pub mod error;
pub mod get_space_detail;
pub mod get_spaces;
pub mod join_space;

pub use error::GetSpaceDetailError;
pub use get_space_detail::GetSpaceDetailUseCase;
pub use get_spaces::GetSpacesUseCase;
pub use join_space::{JoinSpaceUseCase, SpaceSession};
