//! 双人多米诺对战共享协议库
//!
//! 包含:
//! - 骨牌、牌链、座位等核心数据结构
//! - 规则引擎（发牌、先手判定、落子合法性、流局判定）
//! - 消息类型定义 (ClientMessage, ServerMessage)
//! - 传输层抽象 (Connector, Connection, Listener traits)
//! - 帧编解码 (FrameReader, FrameWriter)

mod board;
mod constants;
mod error;
mod message;
mod rules;
mod tile;
mod transport;

pub use board::{Board, BoardEnd};
pub use constants::*;
pub use error::{DominoError, ProtocolError, Result};
pub use message::{
    ClientMessage, ServerMessage, ErrorCode, GameSnapshot, MatchPhase,
    PlayerBrief, PlayerId, RoomCode, StartingInfo,
};
pub use rules::{Deal, Opening, RuleEngine};
pub use tile::{Seat, Tile};
pub use transport::{
    Connection, Connector, Listener,
    TcpConnection, TcpConnector, TcpListener,
    FrameReader, FrameWriter,
};
