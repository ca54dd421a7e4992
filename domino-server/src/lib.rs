//! 双人多米诺对战服务端
//!
//! 包含:
//! - 房间注册与对局状态机
//! - 回合协调器（行动方卡住时自动摸牌/过牌）
//! - 玩家管理
//! - 协议网关（命令循环与连接处理）

pub mod config;
pub mod coordinator;
pub mod handler;
pub mod player;
pub mod server;
pub mod session;

pub use config::ServerConfig;
pub use coordinator::{AutoAction, ScheduledAction, TurnCoordinator};
pub use handler::handle_connection;
pub use player::{Player, PlayerManager, PlayerStatus};
pub use server::{GatewayCommand, MessageHandler, ServerState};
pub use session::{MatchSession, RoomRegistry};
