//! 回合协调器
//!
//! 每次状态变更后重新评估：当前行动方无牌可出时，延迟调度一次自动摸牌
//! 或自动过牌。更新的状态版本会取消尚未触发的调度；已触发的动作回到
//! 网关命令队列，执行前按当前状态重新校验（延迟窗口内可能发生了落子、
//! 离开房间等使其失效的事件）。每个房间同时最多一个未触发的调度。

use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use protocol::{MatchPhase, PlayerId, RoomCode, AUTO_DRAW_DELAY, AUTO_PASS_DELAY};

use crate::session::MatchSession;

/// 自动动作类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoAction {
    /// 从牌池摸一张
    Draw,
    /// 过牌
    Pass,
}

/// 延迟触发后入队的自动命令
#[derive(Debug, Clone)]
pub struct ScheduledAction {
    pub room_code: RoomCode,
    pub player: PlayerId,
    pub action: AutoAction,
    /// 调度时观察到的状态版本，执行前用于失效检查
    pub version: u64,
}

/// 单个房间的未触发调度
struct Pending {
    handle: JoinHandle<()>,
}

/// 回合协调器
pub struct TurnCoordinator {
    /// 触发的动作经此通道回到网关命令循环
    tx: mpsc::Sender<ScheduledAction>,
    pending: HashMap<RoomCode, Pending>,
}

impl TurnCoordinator {
    pub fn new(tx: mpsc::Sender<ScheduledAction>) -> Self {
        Self {
            tx,
            pending: HashMap::new(),
        }
    }

    /// 状态变更后调用：取消旧调度，必要时安排新的自动动作
    pub fn observe(&mut self, session: &MatchSession) {
        self.cancel(&session.code);

        if session.phase != MatchPhase::Active {
            return;
        }
        let Some(player) = session.current_player() else {
            return;
        };
        if !session.active_player_stuck() {
            return;
        }

        let (action, delay) = if session.pool_count() > 0 {
            (AutoAction::Draw, AUTO_DRAW_DELAY)
        } else {
            (AutoAction::Pass, AUTO_PASS_DELAY)
        };
        let cmd = ScheduledAction {
            room_code: session.code.clone(),
            player,
            action,
            version: session.version,
        };
        debug!(
            room = %session.code,
            ?action,
            version = session.version,
            "调度自动动作"
        );

        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(cmd).await;
        });
        self.pending
            .insert(session.code.clone(), Pending { handle });
    }

    /// 取消指定房间尚未触发的调度（状态前进、房间销毁、对局终态）
    pub fn cancel(&mut self, code: &str) {
        if let Some(pending) = self.pending.remove(code) {
            pending.handle.abort();
        }
    }

    /// 当前未触发的调度数量
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
