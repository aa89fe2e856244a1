//! Domain layer
//!
//! 空間セッションの中核となるモデルと純粋なロジックを定義します。
//! 外部協調者（トークン認証・空間ジオメトリの取得）へのインターフェースもここで定義し、
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。

pub mod auth;
pub mod entity;
pub mod error;
pub mod movement;
pub mod repository;
pub mod room;
pub mod spawn;
pub mod value_object;

pub use auth::TokenAuthenticator;
pub use entity::{Participant, RoomSnapshot, SpaceGeometry};
pub use error::{
    AuthError, DomainError, JoinError, JoinRejection, MessagePushError, RepositoryError,
    SpaceFullError,
};
pub use movement::{MoveRejection, MoveVerdict, validate_move};
pub use repository::SpaceGeometryRepository;
pub use room::{Delivery, JoinOutcome, LeaveOutcome, PeerPosition, Room, RoomEvent};
pub use spawn::allocate_spawn;
pub use value_object::{ConnectionId, ConnectionIdFactory, Dimensions, Position, SpaceId, UserId};
