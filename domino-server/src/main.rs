use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use protocol::{Listener, TcpListener};

use domino_server::config::ServerConfig;
use domino_server::coordinator::TurnCoordinator;
use domino_server::handler::handle_connection;
use domino_server::server::{self, ServerState};

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("domino_server=debug".parse()?))
        .init();

    let config = ServerConfig::from_env();
    let addr = config.bind_addr();

    // 网关命令循环：玩家命令与协调器的自动动作汇入同一队列
    let (cmd_tx, cmd_rx) = mpsc::channel(256);
    let (auto_tx, auto_rx) = mpsc::channel(64);
    let state = ServerState::new(TurnCoordinator::new(auto_tx));
    tokio::spawn(server::run(state, cmd_rx, auto_rx));

    let mut listener = TcpListener::bind(&addr).await?;
    info!("多米诺对战服务端已启动，监听 {addr}");

    loop {
        match listener.accept().await {
            Ok(conn) => {
                tokio::spawn(handle_connection(conn, cmd_tx.clone()));
            }
            Err(e) => {
                warn!(error = %e, "接受连接失败");
            }
        }
    }
}
