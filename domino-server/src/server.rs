//! 网关主逻辑
//!
//! 单个命令循环串行处理所有房间的命令（玩家命令与协调器触发的自动
//! 动作走同一条队列），因此同一房间内不存在交错；广播顺序即处理顺序。

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use protocol::{
    BoardEnd, ClientMessage, DominoError, MatchPhase, PlayerId, ServerMessage, Tile,
};

use crate::coordinator::{AutoAction, ScheduledAction, TurnCoordinator};
use crate::player::{PlayerManager, PlayerStatus};
use crate::session::{MatchSession, RoomRegistry};

/// 网关命令：连接任务与协调器汇入同一循环
pub enum GatewayCommand {
    /// 新连接建立：登记玩家并注册下行通道
    Connect {
        outbound: mpsc::Sender<ServerMessage>,
        reply: oneshot::Sender<PlayerId>,
    },
    /// 客户端消息
    Message {
        player_id: PlayerId,
        msg: ClientMessage,
    },
    /// 连接断开
    Disconnect { player_id: PlayerId },
}

/// 服务器状态
pub struct ServerState {
    pub players: PlayerManager,
    pub rooms: RoomRegistry,
    pub coordinator: TurnCoordinator,
    /// 玩家 ID -> 消息发送通道
    pub connections: HashMap<PlayerId, mpsc::Sender<ServerMessage>>,
    /// 发牌、摸牌、房间码共用的随机源
    rng: StdRng,
}

impl ServerState {
    pub fn new(coordinator: TurnCoordinator) -> Self {
        Self::with_rng(coordinator, StdRng::from_entropy())
    }

    /// 指定随机源（测试用确定性种子）
    pub fn with_rng(coordinator: TurnCoordinator, rng: StdRng) -> Self {
        Self {
            players: PlayerManager::new(),
            rooms: RoomRegistry::new(),
            coordinator,
            connections: HashMap::new(),
            rng,
        }
    }

    /// 发送消息给玩家
    pub async fn send_to_player(&self, player_id: PlayerId, msg: ServerMessage) {
        if let Some(tx) = self.connections.get(&player_id) {
            let _ = tx.send(msg).await;
        }
    }
}

/// 待发送的消息
struct PendingMessages {
    messages: Vec<(PlayerId, ServerMessage)>,
}

impl PendingMessages {
    fn new() -> Self {
        Self {
            messages: Vec::new(),
        }
    }

    fn send(&mut self, player_id: PlayerId, msg: ServerMessage) {
        self.messages.push((player_id, msg));
    }

    /// 给房间内所有在座玩家排队同一条消息
    fn broadcast(&mut self, session: &MatchSession, msg: ServerMessage) {
        for player_id in session.seated_players() {
            self.messages.push((player_id, msg.clone()));
        }
    }

    async fn flush(self, state: &ServerState) {
        for (player_id, msg) in self.messages {
            state.send_to_player(player_id, msg).await;
        }
    }
}

/// 网关命令循环
pub async fn run(
    mut state: ServerState,
    mut cmd_rx: mpsc::Receiver<GatewayCommand>,
    mut auto_rx: mpsc::Receiver<ScheduledAction>,
) {
    loop {
        tokio::select! {
            Some(cmd) = cmd_rx.recv() => {
                MessageHandler::dispatch(&mut state, cmd).await;
            }
            Some(auto) = auto_rx.recv() => {
                MessageHandler::handle_auto(&mut state, auto).await;
            }
            else => break,
        }
    }
}

/// 消息处理器
pub struct MessageHandler;

impl MessageHandler {
    /// 处理一条网关命令
    pub async fn dispatch(state: &mut ServerState, cmd: GatewayCommand) {
        match cmd {
            GatewayCommand::Connect { outbound, reply } => {
                let player_id = state.players.register();
                state.connections.insert(player_id, outbound);
                let _ = reply.send(player_id);
                state
                    .send_to_player(
                        player_id,
                        ServerMessage::Connected {
                            message: "已连接到多米诺对战服务器".to_string(),
                        },
                    )
                    .await;
                info!(player = player_id, "新连接");
            }
            GatewayCommand::Message { player_id, msg } => {
                if let Some(reply) = Self::handle(state, player_id, msg).await {
                    state.send_to_player(player_id, reply).await;
                }
            }
            GatewayCommand::Disconnect { player_id } => {
                Self::handle_disconnect(state, player_id).await;
            }
        }
    }

    /// 处理客户端消息，返回只发给该连接的直接回复
    pub async fn handle(
        state: &mut ServerState,
        player_id: PlayerId,
        msg: ClientMessage,
    ) -> Option<ServerMessage> {
        let mut pending = PendingMessages::new();

        let result = match msg {
            ClientMessage::CreateRoom { name } => Self::handle_create_room(state, player_id, name),
            ClientMessage::JoinRoom { room_code, name } => {
                Self::handle_join_room(state, &mut pending, player_id, room_code, name)
            }
            ClientMessage::PlayPiece {
                room_code,
                left,
                right,
                side,
            } => Self::handle_play_piece(
                state,
                &mut pending,
                player_id,
                room_code,
                left,
                right,
                side,
            ),
            ClientMessage::BuyPiece { room_code } => {
                Self::handle_buy_piece(state, &mut pending, player_id, room_code)
            }
            ClientMessage::PassTurn { room_code } => {
                Self::handle_pass_turn(state, &mut pending, player_id, room_code)
            }
            ClientMessage::GetGameState { room_code } => {
                Self::handle_get_state(state, player_id, room_code)
            }
            ClientMessage::Ping => Some(ServerMessage::Pong),
        };

        // 广播排队的消息
        pending.flush(state).await;

        result
    }

    /// 引擎错误 -> 只发给出错连接的错误事件
    fn error_reply(err: DominoError) -> ServerMessage {
        ServerMessage::Error {
            code: err.code(),
            message: err.player_message(),
        }
    }

    /// 处理创建房间
    fn handle_create_room(
        state: &mut ServerState,
        player_id: PlayerId,
        name: String,
    ) -> Option<ServerMessage> {
        if let Err(e) = PlayerManager::validate_name(&name) {
            return Some(Self::error_reply(e));
        }
        let name = name.trim().to_string();

        // 已在房间中则拒绝再建
        if state.players.room_of(player_id).is_some() {
            return Some(Self::error_reply(DominoError::IllegalMove {
                reason: "请先离开当前房间".to_string(),
            }));
        }

        let code = match state.rooms.create(player_id, name.clone(), &mut state.rng) {
            Ok(code) => code,
            Err(e) => return Some(Self::error_reply(e)),
        };
        state.players.set_name(player_id, name);
        state
            .players
            .set_status(player_id, PlayerStatus::InRoom(code.clone()));

        info!(room = %code, player = player_id, "房间已创建");
        Some(ServerMessage::RoomCreated {
            room_code: code.clone(),
            message: format!("房间 {code} 创建成功"),
        })
    }

    /// 处理加入房间（满员即发牌开局）
    fn handle_join_room(
        state: &mut ServerState,
        pending: &mut PendingMessages,
        player_id: PlayerId,
        room_code: String,
        name: String,
    ) -> Option<ServerMessage> {
        if let Err(e) = PlayerManager::validate_name(&name) {
            return Some(Self::error_reply(e));
        }
        let code = match RoomRegistry::normalize(&room_code) {
            Ok(code) => code,
            Err(e) => return Some(Self::error_reply(e)),
        };
        if state.players.room_of(player_id).is_some() {
            return Some(Self::error_reply(DominoError::IllegalMove {
                reason: "请先离开当前房间".to_string(),
            }));
        }
        let name = name.trim().to_string();

        let Some(session) = state.rooms.get_mut(&code) else {
            return Some(Self::error_reply(DominoError::NotFound));
        };
        if let Err(e) = session.join(player_id, name.clone(), &mut state.rng) {
            return Some(Self::error_reply(e));
        }

        state.players.set_name(player_id, name.clone());
        state
            .players
            .set_status(player_id, PlayerStatus::InRoom(code.clone()));

        pending.send(
            player_id,
            ServerMessage::RoomJoined {
                room_code: code.clone(),
                message: format!("你已加入房间 {code}"),
            },
        );
        pending.broadcast(
            session,
            ServerMessage::PlayerJoined {
                message: format!("{name} 加入了房间"),
            },
        );
        // 对局开始：给双方各自过滤后的快照
        for pid in session.seated_players() {
            pending.send(pid, ServerMessage::GameStarted(session.snapshot_for(pid)));
        }
        info!(room = %code, player = player_id, "玩家加入，对局开始");

        state.coordinator.observe(session);
        None
    }

    /// 处理落子
    fn handle_play_piece(
        state: &mut ServerState,
        pending: &mut PendingMessages,
        player_id: PlayerId,
        room_code: String,
        left: u8,
        right: u8,
        side: BoardEnd,
    ) -> Option<ServerMessage> {
        let code = match RoomRegistry::normalize(&room_code) {
            Ok(code) => code,
            Err(e) => return Some(Self::error_reply(e)),
        };
        let Some(tile) = Tile::new(left, right) else {
            return Some(Self::error_reply(DominoError::IllegalMove {
                reason: "点数超出范围".to_string(),
            }));
        };
        let Some(session) = state.rooms.get_mut(&code) else {
            return Some(Self::error_reply(DominoError::NotFound));
        };

        if let Err(e) = session.play_move(player_id, tile, side) {
            return Some(Self::error_reply(e));
        }
        debug!(room = %code, player = player_id, %tile, ?side, "落子");

        Self::after_change(state, pending, &code);
        None
    }

    /// 处理摸牌
    fn handle_buy_piece(
        state: &mut ServerState,
        pending: &mut PendingMessages,
        player_id: PlayerId,
        room_code: String,
    ) -> Option<ServerMessage> {
        let code = match RoomRegistry::normalize(&room_code) {
            Ok(code) => code,
            Err(e) => return Some(Self::error_reply(e)),
        };
        let Some(session) = state.rooms.get_mut(&code) else {
            return Some(Self::error_reply(DominoError::NotFound));
        };

        if let Err(e) = session.draw_from_pool(player_id, &mut state.rng) {
            return Some(Self::error_reply(e));
        }
        debug!(room = %code, player = player_id, "摸牌");

        Self::after_change(state, pending, &code);
        None
    }

    /// 处理过牌
    fn handle_pass_turn(
        state: &mut ServerState,
        pending: &mut PendingMessages,
        player_id: PlayerId,
        room_code: String,
    ) -> Option<ServerMessage> {
        let code = match RoomRegistry::normalize(&room_code) {
            Ok(code) => code,
            Err(e) => return Some(Self::error_reply(e)),
        };
        let Some(session) = state.rooms.get_mut(&code) else {
            return Some(Self::error_reply(DominoError::NotFound));
        };

        if let Err(e) = session.pass_turn(player_id) {
            return Some(Self::error_reply(e));
        }
        debug!(room = %code, player = player_id, "过牌");

        Self::after_change(state, pending, &code);
        None
    }

    /// 处理对局状态查询
    fn handle_get_state(
        state: &ServerState,
        player_id: PlayerId,
        room_code: String,
    ) -> Option<ServerMessage> {
        let code = match RoomRegistry::normalize(&room_code) {
            Ok(code) => code,
            Err(e) => return Some(Self::error_reply(e)),
        };
        let Some(session) = state.rooms.get(&code) else {
            return Some(Self::error_reply(DominoError::NotFound));
        };
        // 只有在座玩家可以查询
        if session.seat_of(player_id).is_none() {
            return Some(Self::error_reply(DominoError::NotFound));
        }
        Some(ServerMessage::GameState(session.snapshot_for(player_id)))
    }

    /// 状态变更后的统一收尾：广播快照、处理终局、重新评估自动动作
    fn after_change(state: &mut ServerState, pending: &mut PendingMessages, code: &str) {
        let Some(session) = state.rooms.get(code) else {
            return;
        };
        for pid in session.seated_players() {
            pending.send(pid, ServerMessage::GameUpdate(session.snapshot_for(pid)));
        }

        if session.phase == MatchPhase::Finished {
            pending.broadcast(
                session,
                ServerMessage::GameFinished {
                    winner: session.winner_name(),
                    message: session.finish_summary(),
                },
            );
            info!(room = %code, winner = ?session.winner_name(), "对局结束");
            state.coordinator.cancel(code);
        } else {
            state.coordinator.observe(session);
        }
    }

    /// 处理协调器触发的自动动作
    ///
    /// 延迟窗口内状态可能已前进（落子、断线、终局），执行前必须按
    /// 当前状态重新校验，失效则丢弃。
    pub async fn handle_auto(state: &mut ServerState, cmd: ScheduledAction) {
        let mut pending = PendingMessages::new();

        let Some(session) = state.rooms.get_mut(&cmd.room_code) else {
            return;
        };
        if session.version != cmd.version || session.phase != MatchPhase::Active {
            debug!(room = %cmd.room_code, "自动动作已失效，丢弃");
            return;
        }
        if session.current_player() != Some(cmd.player) {
            return;
        }

        let result = match cmd.action {
            AutoAction::Draw => session
                .draw_from_pool(cmd.player, &mut state.rng)
                .map(|_| ()),
            AutoAction::Pass => session.pass_turn(cmd.player),
        };

        match result {
            Ok(()) => {
                debug!(
                    room = %cmd.room_code,
                    player = cmd.player,
                    action = ?cmd.action,
                    "自动动作已执行"
                );
                Self::after_change(state, &mut pending, &cmd.room_code);
            }
            Err(e) => {
                // 前置条件在延迟窗口内失效（例如对手摸到牌后打出）
                warn!(room = %cmd.room_code, error = %e, "自动动作校验失败，丢弃");
            }
        }

        pending.flush(state).await;
    }

    /// 处理玩家断线
    ///
    /// Lobby 阶段销毁房间；Active 阶段保留对局给剩余玩家并广播离开。
    pub async fn handle_disconnect(state: &mut ServerState, player_id: PlayerId) {
        let mut pending = PendingMessages::new();

        let name = state
            .players
            .get_name(player_id)
            .filter(|n| !n.is_empty())
            .unwrap_or("玩家")
            .to_string();

        if let Some(code) = state.players.room_of(player_id).cloned() {
            Self::leave_room(state, &mut pending, player_id, &name, &code);
        }

        state.players.remove(player_id);
        state.connections.remove(&player_id);

        pending.flush(state).await;
        info!(player = player_id, "连接已断开");
    }

    fn leave_room(
        state: &mut ServerState,
        pending: &mut PendingMessages,
        player_id: PlayerId,
        name: &str,
        code: &str,
    ) {
        let Some(session) = state.rooms.get_mut(code) else {
            return;
        };
        session.vacate(player_id);

        if session.phase == MatchPhase::Lobby || session.is_empty() {
            state.coordinator.cancel(code);
            state.rooms.remove(code);
            info!(room = %code, "房间已销毁");
            return;
        }

        pending.broadcast(
            session,
            ServerMessage::PlayerLeft {
                message: format!("{name} 离开了房间"),
            },
        );
        info!(room = %code, player = player_id, "玩家离开，对局保留");
        // 取消离开者座位上可能悬挂的调度
        state.coordinator.observe(session);
    }
}
