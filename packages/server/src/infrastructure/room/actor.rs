//! Room actor.
//!
//! One task per live space. All commands for the space go through a single
//! bounded mailbox and are applied one at a time, so every participant sees
//! the same total order of events and no lock guards the Room state.

use std::{
    collections::HashMap,
    sync::{Arc, Weak},
};

use thiserror::Error;
use tokio::sync::{Mutex, mpsc, oneshot};

use hiroba_shared::time::now_millis;

use crate::{
    domain::{
        ConnectionId, JoinError, JoinOutcome, Position, Room, RoomSnapshot,
        SpaceGeometryRepository, SpaceId, UserId,
    },
    infrastructure::message_pusher::{ChannelMessagePusher, PusherChannel},
};

pub(super) type RoomTable = Mutex<HashMap<SpaceId, RoomHandle>>;

pub(super) enum RoomCommand {
    Join {
        connection_id: ConnectionId,
        user_id: UserId,
        outbound: PusherChannel,
        reply: oneshot::Sender<JoinReply>,
    },
    Move {
        connection_id: ConnectionId,
        requested: Position,
    },
    Leave {
        connection_id: ConnectionId,
    },
    Snapshot {
        reply: oneshot::Sender<Option<RoomSnapshot>>,
    },
}

#[derive(Debug)]
pub(super) enum JoinReply {
    Joined(Position),
    Rejected(JoinError),
    /// The room was evicted before the join was processed; ask the registry again.
    Closing,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("room for space '{0}' has shut down")]
pub struct RoomClosed(pub SpaceId);

/// Cheap, cloneable address of a Room actor.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    space_id: SpaceId,
    instance: u64,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn space_id(&self) -> &SpaceId {
        &self.space_id
    }

    pub(super) fn instance(&self) -> u64 {
        self.instance
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    pub(super) async fn join(
        &self,
        connection_id: ConnectionId,
        user_id: UserId,
        outbound: PusherChannel,
    ) -> Result<JoinReply, RoomClosed> {
        let (reply, response) = oneshot::channel();
        self.send(RoomCommand::Join {
            connection_id,
            user_id,
            outbound,
            reply,
        })
        .await?;
        response.await.map_err(|_| self.closed())
    }

    /// Post a move request. Waits for mailbox capacity.
    pub async fn move_to(
        &self,
        connection_id: ConnectionId,
        requested: Position,
    ) -> Result<(), RoomClosed> {
        self.send(RoomCommand::Move {
            connection_id,
            requested,
        })
        .await
    }

    pub async fn leave(&self, connection_id: ConnectionId) -> Result<(), RoomClosed> {
        self.send(RoomCommand::Leave { connection_id }).await
    }

    /// `None` once the room has shut down or before its geometry is loaded.
    pub async fn snapshot(&self) -> Option<RoomSnapshot> {
        let (reply, response) = oneshot::channel();
        self.send(RoomCommand::Snapshot { reply }).await.ok()?;
        response.await.ok().flatten()
    }

    async fn send(&self, command: RoomCommand) -> Result<(), RoomClosed> {
        self.sender.send(command).await.map_err(|_| self.closed())
    }

    fn closed(&self) -> RoomClosed {
        RoomClosed(self.space_id.clone())
    }
}

pub(super) struct RoomActor {
    space_id: SpaceId,
    instance: u64,
    receiver: mpsc::Receiver<RoomCommand>,
    repository: Arc<dyn SpaceGeometryRepository>,
    rooms: Weak<RoomTable>,
    /// Loaded lazily by the first join.
    room: Option<Room>,
    pusher: ChannelMessagePusher,
}

impl RoomActor {
    /// Start the actor task and return its handle.
    pub(super) fn spawn(
        space_id: SpaceId,
        instance: u64,
        mailbox_capacity: usize,
        repository: Arc<dyn SpaceGeometryRepository>,
        rooms: Weak<RoomTable>,
    ) -> RoomHandle {
        let (sender, receiver) = mpsc::channel(mailbox_capacity.max(1));
        let actor = Self {
            space_id: space_id.clone(),
            instance,
            receiver,
            repository,
            rooms,
            room: None,
            pusher: ChannelMessagePusher::new(),
        };
        tokio::spawn(actor.run());
        RoomHandle {
            space_id,
            instance,
            sender,
        }
    }

    async fn run(mut self) {
        tracing::info!("Room '{}' (#{}) started", self.space_id, self.instance);

        while let Some(command) = self.receiver.recv().await {
            let may_empty = matches!(
                command,
                RoomCommand::Join { .. } | RoomCommand::Leave { .. }
            );
            self.handle(command).await;
            if may_empty && self.is_empty() {
                self.shutdown().await;
                break;
            }
        }

        tracing::info!("Room '{}' (#{}) stopped", self.space_id, self.instance);
    }

    async fn handle(&mut self, command: RoomCommand) {
        match command {
            RoomCommand::Join {
                connection_id,
                user_id,
                outbound,
                reply,
            } => {
                let result = self.join(connection_id, user_id, outbound).await;
                let joined = matches!(result, JoinReply::Joined(_));
                if reply.send(result).is_err() && joined {
                    tracing::warn!(
                        "Connection {} went away while joining '{}'",
                        connection_id,
                        self.space_id
                    );
                    self.leave(connection_id);
                }
            }
            RoomCommand::Move {
                connection_id,
                requested,
            } => {
                if let Some(room) = self.room.as_mut() {
                    let deliveries = room.move_participant(connection_id, requested);
                    self.pusher.deliver(deliveries);
                }
            }
            RoomCommand::Leave { connection_id } => self.leave(connection_id),
            RoomCommand::Snapshot { reply } => {
                let _ = reply.send(self.room.as_ref().map(Room::snapshot));
            }
        }
    }

    async fn join(
        &mut self,
        connection_id: ConnectionId,
        user_id: UserId,
        outbound: PusherChannel,
    ) -> JoinReply {
        if let Err(e) = self.load_geometry().await {
            tracing::warn!("Cannot open space '{}': {}", self.space_id, e);
            return JoinReply::Rejected(e);
        }
        let Some(room) = self.room.as_mut() else {
            return JoinReply::Rejected(JoinError::RoomUnavailable(self.space_id.clone()));
        };

        match room.join(connection_id, user_id.clone(), now_millis()) {
            Ok(JoinOutcome { spawn, deliveries }) => {
                tracing::info!(
                    "'{}' joined '{}' at {} via {} ({} present)",
                    user_id,
                    self.space_id,
                    spawn,
                    connection_id,
                    room.len()
                );
                self.pusher.register_client(connection_id, outbound);
                self.pusher.deliver(deliveries);
                JoinReply::Joined(spawn)
            }
            Err(rejection) => {
                tracing::info!(
                    "Join of '{}' to '{}' rejected: {}",
                    user_id,
                    self.space_id,
                    rejection
                );
                JoinReply::Rejected(JoinError::from_rejection(&self.space_id, rejection))
            }
        }
    }

    fn leave(&mut self, connection_id: ConnectionId) {
        self.pusher.unregister_client(connection_id);
        let Some(outcome) = self.room.as_mut().and_then(|room| room.leave(connection_id)) else {
            return;
        };
        tracing::info!(
            "'{}' left '{}' ({} remaining)",
            outcome.participant.user_id,
            self.space_id,
            self.room.as_ref().map_or(0, Room::len)
        );
        self.pusher.deliver(outcome.deliveries);
    }

    async fn load_geometry(&mut self) -> Result<(), JoinError> {
        if self.room.is_none() {
            let geometry = self.repository.get_space_geometry(&self.space_id).await?;
            tracing::debug!(
                "Loaded geometry of '{}': {} with {} blocked cells",
                self.space_id,
                geometry.dimensions(),
                geometry.blocked_cells().len()
            );
            self.room = Some(Room::new(self.space_id.clone(), geometry));
        }
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.room.as_ref().is_none_or(Room::is_empty)
    }

    /// Evict this room from the registry, then answer whatever is still queued.
    ///
    /// Eviction and mailbox close happen under the registry lock, so a join
    /// either reached this mailbox before the close (and is told to retry) or
    /// finds no entry and creates a fresh room.
    async fn shutdown(&mut self) {
        if let Some(rooms) = self.rooms.upgrade() {
            let mut rooms = rooms.lock().await;
            if rooms
                .get(&self.space_id)
                .is_some_and(|handle| handle.instance() == self.instance)
            {
                rooms.remove(&self.space_id);
            }
            self.receiver.close();
        } else {
            self.receiver.close();
        }

        while let Some(command) = self.receiver.recv().await {
            match command {
                RoomCommand::Join { reply, .. } => {
                    let _ = reply.send(JoinReply::Closing);
                }
                RoomCommand::Snapshot { reply } => {
                    let _ = reply.send(None);
                }
                RoomCommand::Move { .. } | RoomCommand::Leave { .. } => {}
            }
        }

        tracing::info!("Room '{}' (#{}) evicted", self.space_id, self.instance);
    }
}
