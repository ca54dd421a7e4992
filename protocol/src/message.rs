//! 消息类型定义

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::board::BoardEnd;
use crate::tile::Tile;

/// 玩家 ID
pub type PlayerId = u64;

/// 房间码（6 位大写字母数字）
pub type RoomCode = String;

/// 对局阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchPhase {
    /// 等待第二位玩家加入
    Lobby,
    /// 对局进行中
    Active,
    /// 对局结束（终态）
    Finished,
}

/// 开局规则说明
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartingInfo {
    /// 面向玩家的开局说明文案
    pub message: String,
    /// 决定先手的最大对子点数（双方都无对子时为 None）
    pub highest_double: Option<u8>,
}

/// 房间内玩家的公开信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerBrief {
    pub name: String,
    /// 手牌数量（手牌内容只发给本人）
    pub hand_count: usize,
}

/// 发给单个玩家的对局快照
///
/// 手牌已按接收者过滤：`my_hand` 只含接收者自己的牌，其余玩家只暴露
/// `hand_count`，牌池只暴露数量。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub room_code: RoomCode,
    pub players: HashMap<PlayerId, PlayerBrief>,
    /// 接收者自己的手牌
    pub my_hand: Vec<Tile>,
    /// 桌面牌链（含朝向）
    pub board: Vec<Tile>,
    /// 当前行动方（对局结束后为 None）
    pub current_player: Option<PlayerId>,
    pub pool_count: usize,
    pub starting_info: Option<StartingInfo>,
    /// 仅在开局对子约束未解除时存在
    pub required_double: Option<u8>,
    pub game_finished: bool,
    /// 胜者名字（流局平局为 None）
    pub winner: Option<String>,
}

/// 客户端发送给服务端的消息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ClientMessage {
    // === 房间操作 ===
    /// 创建房间
    CreateRoom { name: String },
    /// 加入房间
    JoinRoom { room_code: RoomCode, name: String },

    // === 对局操作 ===
    /// 落子
    PlayPiece {
        room_code: RoomCode,
        left: u8,
        right: u8,
        side: BoardEnd,
    },
    /// 从牌池摸一张牌
    BuyPiece { room_code: RoomCode },
    /// 过牌
    PassTurn { room_code: RoomCode },
    /// 查询当前对局状态
    GetGameState { room_code: RoomCode },

    // === 心跳 ===
    /// 心跳请求
    Ping,
}

/// 服务端发送给客户端的消息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ServerMessage {
    // === 连接 ===
    /// 连接建立问候
    Connected { message: String },

    // === 房间事件 ===
    /// 房间创建成功
    RoomCreated { room_code: RoomCode, message: String },
    /// 加入房间成功
    RoomJoined { room_code: RoomCode, message: String },
    /// 有玩家加入房间
    PlayerJoined { message: String },
    /// 有玩家离开房间
    PlayerLeft { message: String },

    // === 对局事件 ===
    /// 对局开始（发牌完成）
    GameStarted(GameSnapshot),
    /// 对局状态变更
    GameUpdate(GameSnapshot),
    /// 对局状态查询结果
    GameState(GameSnapshot),
    /// 对局结束
    GameFinished {
        /// 胜者名字（流局平局为 None）
        winner: Option<String>,
        message: String,
    },

    // === 心跳 ===
    /// 心跳响应
    Pong,

    // === 错误 ===
    /// 错误消息（只发给出错的连接）
    Error { code: ErrorCode, message: String },
}

/// 错误码定义
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u16)]
pub enum ErrorCode {
    // === 房间相关 (1xx) ===
    /// 房间不存在
    RoomNotFound = 100,
    /// 房间已满
    RoomFull = 101,
    /// 对局已开始，无法加入
    AlreadyStarted = 102,
    /// 房间码空间耗尽
    CapacityExhausted = 103,

    // === 对局相关 (2xx) ===
    /// 不是你的回合
    NotYourTurn = 200,
    /// 非法动作
    IllegalMove = 201,
    /// 牌池已空
    PoolEmpty = 202,
    /// 对局已结束
    GameFinished = 203,

    // === 参数相关 (3xx) ===
    /// 玩家名不合法
    InvalidName = 300,
    /// 房间码不合法
    InvalidCode = 301,

    // === 系统相关 (5xx) ===
    /// 内部错误
    InternalError = 500,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}
