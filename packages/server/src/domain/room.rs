//! Room: authoritative state of everyone currently in one space.
//!
//! The Room is a plain state machine. Each transition returns the list of
//! events to deliver and to whom; the caller (the room actor) is responsible
//! for serializing transitions and pushing the events out.

use std::collections::{BTreeMap, HashSet};

use super::{
    entity::{Participant, RoomSnapshot, SpaceGeometry},
    error::JoinRejection,
    movement::{MoveVerdict, validate_move},
    spawn::allocate_spawn,
    value_object::{ConnectionId, Position, SpaceId, UserId},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerPosition {
    pub user_id: UserId,
    pub position: Position,
}

/// Events a Room emits towards connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEvent {
    /// To the joining connection only.
    SpaceJoined {
        spawn: Position,
        users: Vec<PeerPosition>,
    },
    UserJoined {
        user_id: UserId,
        position: Position,
    },
    Movement {
        user_id: UserId,
        position: Position,
    },
    /// To the requester only, carrying its unchanged position.
    MovementRejected { position: Position },
    UserLeft { user_id: UserId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub to: ConnectionId,
    pub event: RoomEvent,
}

impl Delivery {
    fn new(to: ConnectionId, event: RoomEvent) -> Self {
        Self { to, event }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    pub spawn: Position,
    pub deliveries: Vec<Delivery>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveOutcome {
    pub participant: Participant,
    pub deliveries: Vec<Delivery>,
}

#[derive(Debug, Clone)]
pub struct Room {
    space_id: SpaceId,
    geometry: SpaceGeometry,
    /// Ordered by connection id, i.e. by connection order.
    participants: BTreeMap<ConnectionId, Participant>,
}

impl Room {
    pub fn new(space_id: SpaceId, geometry: SpaceGeometry) -> Self {
        Self {
            space_id,
            geometry,
            participants: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn participant(&self, connection_id: ConnectionId) -> Option<&Participant> {
        self.participants.get(&connection_id)
    }

    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            space_id: self.space_id.clone(),
            dimensions: self.geometry.dimensions(),
            participants: self.participants.values().cloned().collect(),
        }
    }

    /// Admit a participant at a freshly allocated spawn cell.
    ///
    /// The joiner gets `SpaceJoined` first; every participant already present
    /// gets `UserJoined`. A user may be present at most once.
    pub fn join(
        &mut self,
        connection_id: ConnectionId,
        user_id: UserId,
        joined_at: i64,
    ) -> Result<JoinOutcome, JoinRejection> {
        if self.participants.contains_key(&connection_id) {
            return Err(JoinRejection::DuplicateConnection(connection_id));
        }
        if self.participants.values().any(|p| p.user_id == user_id) {
            return Err(JoinRejection::DuplicateUser(user_id));
        }

        let occupied: HashSet<Position> = self.participants.values().map(|p| p.position).collect();
        let spawn = allocate_spawn(&self.geometry, &occupied)?;

        let users = self
            .participants
            .values()
            .map(|p| PeerPosition {
                user_id: p.user_id.clone(),
                position: p.position,
            })
            .collect();
        let mut deliveries = vec![Delivery::new(
            connection_id,
            RoomEvent::SpaceJoined { spawn, users },
        )];
        deliveries.extend(self.others(connection_id).map(|to| {
            Delivery::new(
                to,
                RoomEvent::UserJoined {
                    user_id: user_id.clone(),
                    position: spawn,
                },
            )
        }));

        self.participants.insert(
            connection_id,
            Participant::new(connection_id, user_id, spawn, joined_at),
        );

        Ok(JoinOutcome { spawn, deliveries })
    }

    /// Apply a move request. Unknown connections are ignored.
    ///
    /// Accepted moves are broadcast to everyone but the mover; rejected moves
    /// answer the mover alone with its current position.
    pub fn move_participant(
        &mut self,
        connection_id: ConnectionId,
        requested: Position,
    ) -> Vec<Delivery> {
        let Some(participant) = self.participants.get_mut(&connection_id) else {
            return Vec::new();
        };

        match validate_move(participant.position, requested, &self.geometry) {
            MoveVerdict::Accept => {
                participant.position = requested;
                let user_id = participant.user_id.clone();
                self.others(connection_id)
                    .map(|to| {
                        Delivery::new(
                            to,
                            RoomEvent::Movement {
                                user_id: user_id.clone(),
                                position: requested,
                            },
                        )
                    })
                    .collect()
            }
            MoveVerdict::Reject(reason) => {
                tracing::debug!(
                    "Rejected move of '{}' from {} to {}: {:?}",
                    participant.user_id,
                    participant.position,
                    requested,
                    reason
                );
                vec![Delivery::new(
                    connection_id,
                    RoomEvent::MovementRejected {
                        position: participant.position,
                    },
                )]
            }
        }
    }

    /// Remove a participant and tell everyone left. `None` if it was not here.
    pub fn leave(&mut self, connection_id: ConnectionId) -> Option<LeaveOutcome> {
        let participant = self.participants.remove(&connection_id)?;
        let deliveries = self
            .others(connection_id)
            .map(|to| {
                Delivery::new(
                    to,
                    RoomEvent::UserLeft {
                        user_id: participant.user_id.clone(),
                    },
                )
            })
            .collect();
        Some(LeaveOutcome {
            participant,
            deliveries,
        })
    }

    fn others(&self, connection_id: ConnectionId) -> impl Iterator<Item = ConnectionId> + '_ {
        self.participants
            .keys()
            .copied()
            .filter(move |id| *id != connection_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{error::SpaceFullError, value_object::Dimensions};

    fn space_id() -> SpaceId {
        SpaceId::new("space-1".to_string()).unwrap()
    }

    fn user(name: &str) -> UserId {
        UserId::new(name.to_string()).unwrap()
    }

    fn conn(id: u64) -> ConnectionId {
        ConnectionId::new(id)
    }

    fn room(width: u32, height: u32) -> Room {
        Room::new(
            space_id(),
            SpaceGeometry::open(Dimensions::new(width, height).unwrap()),
        )
    }

    fn recipients(deliveries: &[Delivery]) -> Vec<ConnectionId> {
        deliveries.iter().map(|d| d.to).collect()
    }

    #[test]
    fn test_first_join_gets_space_joined_only() {
        // テスト項目: 最初の参加者には space-joined のみが届く
        // given (前提条件):
        let mut room = room(10, 10);

        // when (操作):
        let outcome = room.join(conn(1), user("alice"), 1000).unwrap();

        // then (期待する結果):
        assert_eq!(outcome.spawn, Position::new(0, 0));
        assert_eq!(
            outcome.deliveries,
            vec![Delivery::new(
                conn(1),
                RoomEvent::SpaceJoined {
                    spawn: Position::new(0, 0),
                    users: vec![],
                }
            )]
        );
        assert_eq!(room.len(), 1);
    }

    #[test]
    fn test_second_join_notifies_existing_participants_only() {
        // テスト項目: user-joined は既存の参加者にのみ届き、参加者本人には届かない
        // given (前提条件):
        let mut room = room(10, 10);
        room.join(conn(1), user("alice"), 1000).unwrap();
        room.join(conn(2), user("bob"), 2000).unwrap();

        // when (操作):
        let outcome = room.join(conn(3), user("carol"), 3000).unwrap();

        // then (期待する結果):
        assert_eq!(outcome.spawn, Position::new(2, 0));
        assert_eq!(recipients(&outcome.deliveries), vec![conn(3), conn(1), conn(2)]);
        assert_eq!(
            outcome.deliveries[0].event,
            RoomEvent::SpaceJoined {
                spawn: Position::new(2, 0),
                users: vec![
                    PeerPosition {
                        user_id: user("alice"),
                        position: Position::new(0, 0)
                    },
                    PeerPosition {
                        user_id: user("bob"),
                        position: Position::new(1, 0)
                    },
                ],
            }
        );
        for delivery in &outcome.deliveries[1..] {
            assert_eq!(
                delivery.event,
                RoomEvent::UserJoined {
                    user_id: user("carol"),
                    position: Position::new(2, 0)
                }
            );
        }
    }

    #[test]
    fn test_spawns_are_disjoint() {
        // テスト項目: 同じ空間に参加した参加者の spawn は重ならない
        // given (前提条件):
        let mut room = room(3, 3);

        // when (操作):
        let spawns: HashSet<Position> = (0..9)
            .map(|i| {
                room.join(conn(i), user(&format!("user-{i}")), 0)
                    .unwrap()
                    .spawn
            })
            .collect();

        // then (期待する結果):
        assert_eq!(spawns.len(), 9);
    }

    #[test]
    fn test_join_rejected_when_space_full() {
        // テスト項目: 空きセルがなければ参加は拒否され、状態は変わらない
        // given (前提条件):
        let mut room = room(1, 1);
        room.join(conn(1), user("alice"), 0).unwrap();

        // when (操作):
        let result = room.join(conn(2), user("bob"), 0);

        // then (期待する結果):
        assert_eq!(result, Err(JoinRejection::SpaceFull(SpaceFullError)));
        assert_eq!(room.len(), 1);
    }

    #[test]
    fn test_join_rejected_for_duplicate_user() {
        // テスト項目: 同じ userId の 2 回目の参加は拒否される
        // given (前提条件):
        let mut room = room(5, 5);
        room.join(conn(1), user("alice"), 0).unwrap();

        // when (操作):
        let result = room.join(conn(2), user("alice"), 0);

        // then (期待する結果):
        assert_eq!(result, Err(JoinRejection::DuplicateUser(user("alice"))));
        assert_eq!(room.len(), 1);
        assert!(room.participant(conn(1)).is_some());
    }

    #[test]
    fn test_join_rejected_for_same_connection() {
        // テスト項目: 同じ connectionId の 2 回目の参加は拒否される
        // given (前提条件):
        let mut room = room(5, 5);
        room.join(conn(1), user("alice"), 0).unwrap();

        // when (操作):
        let result = room.join(conn(1), user("bob"), 0);

        // then (期待する結果):
        assert_eq!(result, Err(JoinRejection::DuplicateConnection(conn(1))));
    }

    #[test]
    fn test_accepted_move_broadcasts_to_others_only() {
        // テスト項目: 受理された移動は移動者以外に movement として届く
        // given (前提条件):
        let mut room = room(10, 10);
        room.join(conn(1), user("alice"), 0).unwrap();
        room.join(conn(2), user("bob"), 0).unwrap();
        room.join(conn(3), user("carol"), 0).unwrap();

        // when (操作): alice (0,0) -> (0,1)
        let deliveries = room.move_participant(conn(1), Position::new(0, 1));

        // then (期待する結果):
        assert_eq!(recipients(&deliveries), vec![conn(2), conn(3)]);
        for delivery in &deliveries {
            assert_eq!(
                delivery.event,
                RoomEvent::Movement {
                    user_id: user("alice"),
                    position: Position::new(0, 1)
                }
            );
        }
        assert_eq!(
            room.participant(conn(1)).unwrap().position,
            Position::new(0, 1)
        );
    }

    #[test]
    fn test_rejected_move_answers_requester_with_current_position() {
        // テスト項目: 拒否された移動は移動者にのみ現在位置付きで通知され、位置は変わらない
        // given (前提条件):
        let mut room = room(10, 10);
        room.join(conn(1), user("alice"), 0).unwrap();
        room.join(conn(2), user("bob"), 0).unwrap();

        for requested in [
            Position::new(1_000_000, 10_000),
            Position::new(2, 0),
            Position::new(1, 1),
            Position::new(0, 0),
        ] {
            // when (操作):
            let deliveries = room.move_participant(conn(1), requested);

            // then (期待する結果):
            assert_eq!(
                deliveries,
                vec![Delivery::new(
                    conn(1),
                    RoomEvent::MovementRejected {
                        position: Position::new(0, 0)
                    }
                )],
                "move to {requested}"
            );
            assert_eq!(
                room.participant(conn(1)).unwrap().position,
                Position::new(0, 0)
            );
        }
    }

    #[test]
    fn test_move_from_unknown_connection_is_ignored() {
        // テスト項目: 参加していない接続からの移動は無視される
        // given (前提条件):
        let mut room = room(10, 10);
        room.join(conn(1), user("alice"), 0).unwrap();

        // when (操作):
        let deliveries = room.move_participant(conn(99), Position::new(0, 1));

        // then (期待する結果):
        assert!(deliveries.is_empty());
    }

    #[test]
    fn test_leave_broadcasts_user_left_once() {
        // テスト項目: 退出時に残りの参加者へ user-left が 1 回ずつ届き、人数が 1 減る
        // given (前提条件):
        let mut room = room(10, 10);
        room.join(conn(1), user("alice"), 0).unwrap();
        room.join(conn(2), user("bob"), 0).unwrap();
        room.join(conn(3), user("carol"), 0).unwrap();

        // when (操作):
        let outcome = room.leave(conn(1)).unwrap();

        // then (期待する結果):
        assert_eq!(outcome.participant.user_id, user("alice"));
        assert_eq!(recipients(&outcome.deliveries), vec![conn(2), conn(3)]);
        assert!(outcome.deliveries.iter().all(|d| d.event
            == RoomEvent::UserLeft {
                user_id: user("alice")
            }));
        assert_eq!(room.len(), 2);

        // 2 回目の退出は何も起こさない
        assert_eq!(room.leave(conn(1)), None);
        assert_eq!(room.len(), 2);
    }

    #[test]
    fn test_last_leave_empties_room() {
        // テスト項目: 最後の参加者が退出すると Room は空になる
        // given (前提条件):
        let mut room = room(10, 10);
        room.join(conn(1), user("alice"), 0).unwrap();

        // when (操作):
        let outcome = room.leave(conn(1)).unwrap();

        // then (期待する結果):
        assert!(outcome.deliveries.is_empty());
        assert!(room.is_empty());
    }

    #[test]
    fn test_spawn_avoids_current_not_original_positions() {
        // テスト項目: spawn は参加者の現在位置を避けて割り当てられる
        // given (前提条件):
        let mut room = room(3, 1);
        room.join(conn(1), user("alice"), 0).unwrap();
        room.move_participant(conn(1), Position::new(1, 0));

        // when (操作):
        let outcome = room.join(conn(2), user("bob"), 0).unwrap();

        // then (期待する結果): (0,0) が空いたので再利用される
        assert_eq!(outcome.spawn, Position::new(0, 0));
    }

    #[test]
    fn test_snapshot_lists_participants_in_connection_order() {
        // テスト項目: スナップショットは接続順に参加者を返す
        // given (前提条件):
        let mut room = room(10, 10);
        room.join(conn(7), user("bob"), 2000).unwrap();
        room.join(conn(3), user("alice"), 1000).unwrap();

        // when (操作):
        let snapshot = room.snapshot();

        // then (期待する結果):
        assert_eq!(snapshot.space_id, space_id());
        assert_eq!(snapshot.dimensions, Dimensions::new(10, 10).unwrap());
        let users: Vec<&str> = snapshot
            .participants
            .iter()
            .map(|p| p.user_id.as_str())
            .collect();
        assert_eq!(users, vec!["alice", "bob"]);
    }
}
