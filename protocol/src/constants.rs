//! 协议常量定义

use std::time::Duration;

/// 协议版本号
pub const PROTOCOL_VERSION: u8 = 1;

/// 最大点数（双六套装）
pub const MAX_PIP: u8 = 6;

/// 整套骨牌数量（0-0 到 6-6）
pub const FULL_SET_SIZE: usize = 28;

/// 每位玩家的起手牌数
pub const HAND_SIZE: usize = 7;

/// 每局玩家数量（座位布局依赖此值为 2）
pub const ROOM_CAPACITY: usize = 2;

/// 房间码长度
pub const ROOM_CODE_LEN: usize = 6;

/// 房间码字符集（大写字母 + 数字）
pub const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// 房间码生成最大重试次数，耗尽视为码空间已满
pub const ROOM_CODE_MAX_ATTEMPTS: usize = 64;

/// 玩家名最大长度
pub const MAX_NAME_LEN: usize = 20;

/// 消息帧最大大小
pub const MAX_FRAME_SIZE: usize = 65536;

/// 连接超时（秒）
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// 行动方无牌可出时自动摸牌的延迟（毫秒）
pub const AUTO_DRAW_DELAY_MS: u64 = 800;

/// 牌池已空时自动过牌的延迟（毫秒）
pub const AUTO_PASS_DELAY_MS: u64 = 1000;

/// 连接超时 Duration
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(CONNECT_TIMEOUT_SECS);

/// 自动摸牌延迟 Duration
pub const AUTO_DRAW_DELAY: Duration = Duration::from_millis(AUTO_DRAW_DELAY_MS);

/// 自动过牌延迟 Duration
pub const AUTO_PASS_DELAY: Duration = Duration::from_millis(AUTO_PASS_DELAY_MS);
