//! 错误类型定义

use thiserror::Error;

use crate::constants::ROOM_CAPACITY;
use crate::message::ErrorCode;

/// 对局规则错误
///
/// 全部在网关边界就地恢复：转换为发给出错连接的 `Error` 事件，
/// 不影响房间内其他玩家，也不跨房间传播。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DominoError {
    /// 玩家名不合法
    #[error("Invalid player name: {reason}")]
    InvalidName { reason: String },

    /// 房间码不合法
    #[error("Invalid room code")]
    InvalidCode,

    /// 房间不存在
    #[error("Room not found")]
    NotFound,

    /// 房间已满
    #[error("Room is full")]
    RoomFull,

    /// 对局已开始
    #[error("Match already started")]
    AlreadyStarted,

    /// 不是该玩家的回合
    #[error("Not your turn")]
    NotYourTurn,

    /// 非法动作（落子、摸牌、过牌的前置条件不满足）
    #[error("Illegal move: {reason}")]
    IllegalMove { reason: String },

    /// 牌池已空
    #[error("Pool is empty")]
    PoolEmpty,

    /// 对局已结束，不再接受命令
    #[error("Match is already finished")]
    GameFinished,

    /// 房间码空间耗尽
    #[error("Room code space exhausted")]
    CapacityExhausted,
}

impl DominoError {
    /// 对应的线上错误码
    pub fn code(&self) -> ErrorCode {
        match self {
            DominoError::InvalidName { .. } => ErrorCode::InvalidName,
            DominoError::InvalidCode => ErrorCode::InvalidCode,
            DominoError::NotFound => ErrorCode::RoomNotFound,
            DominoError::RoomFull => ErrorCode::RoomFull,
            DominoError::AlreadyStarted => ErrorCode::AlreadyStarted,
            DominoError::NotYourTurn => ErrorCode::NotYourTurn,
            DominoError::IllegalMove { .. } => ErrorCode::IllegalMove,
            DominoError::PoolEmpty => ErrorCode::PoolEmpty,
            DominoError::GameFinished => ErrorCode::GameFinished,
            DominoError::CapacityExhausted => ErrorCode::CapacityExhausted,
        }
    }

    /// 面向玩家的提示文案
    pub fn player_message(&self) -> String {
        match self {
            DominoError::InvalidName { reason } => reason.clone(),
            DominoError::InvalidCode => "房间码不合法".to_string(),
            DominoError::NotFound => "房间不存在".to_string(),
            DominoError::RoomFull => format!("房间已满（最多 {ROOM_CAPACITY} 名玩家）"),
            DominoError::AlreadyStarted => "对局已经开始，无法加入".to_string(),
            DominoError::NotYourTurn => "还没轮到你行动".to_string(),
            DominoError::IllegalMove { reason } => reason.clone(),
            DominoError::PoolEmpty => "牌池已经空了".to_string(),
            DominoError::GameFinished => "对局已结束".to_string(),
            DominoError::CapacityExhausted => "暂时无法分配新的房间码，请稍后再试".to_string(),
        }
    }
}

/// 协议错误类型
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// IO 错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 序列化错误（bincode）
    #[error("Bincode serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// 协议版本不匹配
    #[error("Protocol version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: u8, actual: u8 },

    /// 帧大小超限
    #[error("Frame too large: {size} bytes (max: {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// 连接超时
    #[error("Connection timeout")]
    ConnectionTimeout,

    /// 连接已关闭
    #[error("Connection closed")]
    ConnectionClosed,

    /// 对局规则错误
    #[error("Rule error: {0}")]
    Rule(#[from] DominoError),
}

/// 协议操作结果类型
pub type Result<T> = std::result::Result<T, ProtocolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        assert_eq!(DominoError::NotFound.code(), ErrorCode::RoomNotFound);
        assert_eq!(DominoError::RoomFull.code(), ErrorCode::RoomFull);
        assert_eq!(DominoError::NotYourTurn.code(), ErrorCode::NotYourTurn);
        assert_eq!(DominoError::PoolEmpty.code(), ErrorCode::PoolEmpty);
        let illegal = DominoError::IllegalMove {
            reason: "这张牌不能落在该端".to_string(),
        };
        assert_eq!(illegal.code(), ErrorCode::IllegalMove);
        assert_eq!(illegal.player_message(), "这张牌不能落在该端");
    }
}
