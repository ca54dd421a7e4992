//! 玩家管理

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use protocol::{DominoError, PlayerId, RoomCode, MAX_NAME_LEN};

/// 玩家状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerStatus {
    /// 在线，未进入房间
    Online,
    /// 在房间中
    InRoom(RoomCode),
}

/// 玩家信息
#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    /// 显示名，在创建/加入房间时登记
    pub name: String,
    pub status: PlayerStatus,
}

/// 玩家管理器
///
/// 连接建立即分配 ID（连接身份），名字随创建/加入房间的命令登记。
pub struct PlayerManager {
    /// 玩家 ID -> 玩家信息
    players: HashMap<PlayerId, Player>,
    /// ID 生成器
    next_id: AtomicU64,
}

impl PlayerManager {
    pub fn new() -> Self {
        Self {
            players: HashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// 验证玩家名
    pub fn validate_name(name: &str) -> Result<(), DominoError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DominoError::InvalidName {
                reason: "名字不能为空".to_string(),
            });
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(DominoError::InvalidName {
                reason: format!("名字不能超过{}个字符", MAX_NAME_LEN),
            });
        }
        Ok(())
    }

    /// 连接建立时登记玩家，返回新分配的 ID
    pub fn register(&mut self) -> PlayerId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.players.insert(
            id,
            Player {
                id,
                name: String::new(),
                status: PlayerStatus::Online,
            },
        );
        id
    }

    /// 移除玩家（连接断开）
    pub fn remove(&mut self, player_id: PlayerId) -> Option<Player> {
        self.players.remove(&player_id)
    }

    /// 获取玩家
    pub fn get(&self, player_id: PlayerId) -> Option<&Player> {
        self.players.get(&player_id)
    }

    /// 登记显示名
    pub fn set_name(&mut self, player_id: PlayerId, name: String) {
        if let Some(player) = self.players.get_mut(&player_id) {
            player.name = name;
        }
    }

    /// 设置玩家状态
    pub fn set_status(&mut self, player_id: PlayerId, status: PlayerStatus) {
        if let Some(player) = self.players.get_mut(&player_id) {
            player.status = status;
        }
    }

    /// 获取显示名
    pub fn get_name(&self, player_id: PlayerId) -> Option<&str> {
        self.players.get(&player_id).map(|p| p.name.as_str())
    }

    /// 玩家所在房间
    pub fn room_of(&self, player_id: PlayerId) -> Option<&RoomCode> {
        match self.players.get(&player_id)?.status {
            PlayerStatus::InRoom(ref code) => Some(code),
            PlayerStatus::Online => None,
        }
    }

    /// 在线玩家数量
    pub fn online_count(&self) -> usize {
        self.players.len()
    }
}

impl Default for PlayerManager {
    fn default() -> Self {
        Self::new()
    }
}
