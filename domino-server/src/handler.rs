//! 连接处理
//!
//! 每条连接一个读取循环：解码入站帧并转交网关命令队列；另起写出任务
//! 把网关的下行消息编码回连接。连接断开走 `leave` 转换并广播，不是错误。

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use protocol::{ClientMessage, Connection, ErrorCode, ProtocolError, ServerMessage, TcpConnection};

use crate::server::GatewayCommand;

/// 单连接下行通道容量
const OUTBOUND_BUFFER: usize = 32;

/// 处理一条客户端连接，直到对端关闭或出错
pub async fn handle_connection(conn: TcpConnection, cmd_tx: mpsc::Sender<GatewayCommand>) {
    let peer = conn.peer_addr();
    let (mut reader, mut writer) = conn.split();

    // 向网关登记，取得玩家 ID 与下行通道
    let (out_tx, mut out_rx) = mpsc::channel::<ServerMessage>(OUTBOUND_BUFFER);
    let (reply_tx, reply_rx) = oneshot::channel();
    let register = GatewayCommand::Connect {
        outbound: out_tx.clone(),
        reply: reply_tx,
    };
    if cmd_tx.send(register).await.is_err() {
        return;
    }
    let Ok(player_id) = reply_rx.await else {
        return;
    };
    debug!(player = player_id, peer = ?peer, "连接已登记");

    // 写出任务
    let write_task = tokio::spawn(async move {
        while let Some(msg) = out_rx.recv().await {
            if writer.write_frame(&msg).await.is_err() {
                break;
            }
        }
    });

    // 读取循环
    loop {
        match reader.read_frame::<ClientMessage>().await {
            Ok(msg) => {
                if cmd_tx
                    .send(GatewayCommand::Message { player_id, msg })
                    .await
                    .is_err()
                {
                    break;
                }
            }
            Err(ProtocolError::ConnectionClosed) => break,
            Err(e @ ProtocolError::Bincode(_)) => {
                // 帧边界完整，拒绝这一条畸形命令后继续读取
                warn!(player = player_id, error = %e, "无法解析的消息");
                let reject = ServerMessage::Error {
                    code: ErrorCode::InternalError,
                    message: "无法解析的消息".to_string(),
                };
                if out_tx.send(reject).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                // 版本不匹配、帧超限等错误后流无法继续对齐，断开连接
                warn!(player = player_id, error = %e, "读取消息失败，断开连接");
                break;
            }
        }
    }

    let _ = cmd_tx.send(GatewayCommand::Disconnect { player_id }).await;
    write_task.abort();
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;
    use crate::coordinator::TurnCoordinator;
    use crate::server::{self, ServerState};
    use protocol::{Connection, Connector, Listener, TcpConnector, TcpListener};

    /// 起一个完整的服务端（网关循环 + 监听循环），返回监听地址
    async fn spawn_server() -> String {
        let (cmd_tx, cmd_rx) = mpsc::channel(64);
        let (auto_tx, auto_rx) = mpsc::channel(64);
        let state = ServerState::new(TurnCoordinator::new(auto_tx));
        tokio::spawn(server::run(state, cmd_rx, auto_rx));

        let mut listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok(conn) = listener.accept().await else {
                    break;
                };
                tokio::spawn(handle_connection(conn, cmd_tx.clone()));
            }
        });
        addr
    }

    #[tokio::test]
    async fn test_connect_create_and_join_over_tcp() {
        let addr = spawn_server().await;
        let connector = TcpConnector;

        // 第一位玩家：问候 + 创建房间
        let mut conn1 = connector.connect(&addr).await.unwrap();
        let msg: ServerMessage = conn1.recv().await.unwrap();
        assert!(matches!(msg, ServerMessage::Connected { .. }));

        conn1
            .send(&ClientMessage::CreateRoom {
                name: "玩家1".to_string(),
            })
            .await
            .unwrap();
        let msg: ServerMessage = conn1.recv().await.unwrap();
        let code = match msg {
            ServerMessage::RoomCreated { room_code, .. } => room_code,
            other => panic!("Unexpected message: {:?}", other),
        };

        // 第二位玩家加入，双方都进入对局
        let mut conn2 = connector.connect(&addr).await.unwrap();
        let msg: ServerMessage = conn2.recv().await.unwrap();
        assert!(matches!(msg, ServerMessage::Connected { .. }));

        conn2
            .send(&ClientMessage::JoinRoom {
                room_code: code,
                name: "玩家2".to_string(),
            })
            .await
            .unwrap();

        // 加入者依次收到 RoomJoined / PlayerJoined / GameStarted
        let mut saw_started = false;
        for _ in 0..3 {
            let msg: ServerMessage = conn2.recv().await.unwrap();
            if let ServerMessage::GameStarted(snapshot) = msg {
                assert_eq!(snapshot.my_hand.len(), 7);
                assert_eq!(snapshot.pool_count, 14);
                saw_started = true;
            }
        }
        assert!(saw_started);

        // 房主也收到开局快照
        let mut saw_started = false;
        for _ in 0..2 {
            let msg: ServerMessage = conn1.recv().await.unwrap();
            if let ServerMessage::GameStarted(snapshot) = msg {
                assert_eq!(snapshot.my_hand.len(), 7);
                saw_started = true;
            }
        }
        assert!(saw_started);
    }

    #[tokio::test]
    async fn test_disconnect_notifies_remaining_player() {
        let addr = spawn_server().await;
        let connector = TcpConnector;

        let mut conn1 = connector.connect(&addr).await.unwrap();
        let _: ServerMessage = conn1.recv().await.unwrap();
        conn1
            .send(&ClientMessage::CreateRoom {
                name: "玩家1".to_string(),
            })
            .await
            .unwrap();
        let code = match conn1.recv().await.unwrap() {
            ServerMessage::RoomCreated { room_code, .. } => room_code,
            other => panic!("Unexpected message: {:?}", other),
        };

        let mut conn2 = connector.connect(&addr).await.unwrap();
        let _: ServerMessage = conn2.recv().await.unwrap();
        conn2
            .send(&ClientMessage::JoinRoom {
                room_code: code,
                name: "玩家2".to_string(),
            })
            .await
            .unwrap();
        // 排空加入方的开局消息
        for _ in 0..3 {
            let _: ServerMessage = conn2.recv().await.unwrap();
        }

        // 对局开始后第二位玩家断开
        conn2.close().await.unwrap();
        drop(conn2);

        // 房主先收到 PlayerJoined / GameStarted，然后是离开通知
        loop {
            let msg: ServerMessage = conn1.recv().await.unwrap();
            if let ServerMessage::PlayerLeft { message } = msg {
                assert!(message.contains("玩家2"));
                break;
            }
        }
    }
}
