mod config;

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use dashmap::DashMap;
use futures_util::{stream::StreamExt, SinkExt};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use config::ServerConfig;
use hope_kill_core::{ClientMessage, LogKind, PlayerId, RoomId, RoomSummary, RuleError, ServerMessage, SessionRegistry};

// 服务器全局状态
//
// 重要‼️：严格规定使用锁的顺序，避免死锁：
// registry -> connections。
// 两者都是同步锁，不能跨越 `.await` 持有；发送消息前先把发送端克隆出来。
struct AppState {
    registry: SessionRegistry,
    // 房间ID -> 玩家ID -> 该玩家 WebSocket 任务的发送通道
    connections: DashMap<RoomId, HashMap<PlayerId, mpsc::Sender<ServerMessage>>>,
    config: ServerConfig,
}

type SharedState = Arc<AppState>;

impl AppState {
    fn register(&self, room_id: RoomId, player_id: PlayerId, sender: mpsc::Sender<ServerMessage>) {
        self.connections.entry(room_id).or_default().insert(player_id, sender);
    }

    fn unregister(&self, room_id: RoomId, player_id: PlayerId) {
        if let Some(mut conns) = self.connections.get_mut(&room_id) {
            conns.remove(&player_id);
        }
        self.connections.remove_if(&room_id, |_, conns| conns.is_empty());
    }

    /// 房间内所有连接的发送端
    fn senders(&self, room_id: RoomId) -> Vec<(PlayerId, mpsc::Sender<ServerMessage>)> {
        self.connections
            .get(&room_id)
            .map(|conns| conns.iter().map(|(id, tx)| (*id, tx.clone())).collect())
            .unwrap_or_default()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env();
    let addr = config.addr;
    let state = SharedState::new(AppState {
        registry: SessionRegistry::new(),
        connections: DashMap::new(),
        config,
    });

    let app = Router::new()
        .route("/ws", get(websocket_handler))
        .route("/api/rooms", get(list_rooms).post(create_room))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("服务器正在监听 {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

// --- HTTP 接口 ---

async fn list_rooms(State(state): State<SharedState>) -> Json<Vec<RoomSummary>> {
    Json(state.registry.list_rooms())
}

#[derive(Serialize)]
struct RoomCreated {
    room_id: RoomId,
}

/// 创建一个空房间，之后通过 WebSocket 的 JoinRoom 加入
async fn create_room(State(state): State<SharedState>) -> Json<RoomCreated> {
    let room_id = state.registry.create_room();
    Json(RoomCreated { room_id })
}

// --- WebSocket ---

/// 处理 WebSocket 连接请求
async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<SharedState>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// 处理单个 WebSocket 连接的生命周期
async fn handle_socket(socket: WebSocket, state: SharedState) {
    let (mut sender, mut receiver) = socket.split();

    // 创建一个 MPSC 通道，用于从其他任务接收要发送的消息
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(state.config.channel_capacity);

    // 启动一个新任务，专门负责将 MPSC 通道中的消息发送到 WebSocket
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let payload = match serde_json::to_string(&msg) {
                Ok(p) => p,
                Err(e) => {
                    warn!("序列化消息失败: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(payload.into())).await.is_err() {
                // 发送失败，说明客户端已断开，退出任务
                break;
            }
        }
    });

    // 当前连接所在的房间和玩家ID，加入房间后填充
    let mut player_context: Option<(RoomId, PlayerId)> = None;

    // 主循环，处理从客户端接收到的消息
    while let Some(Ok(msg)) = receiver.next().await {
        if let Message::Text(text) = msg {
            match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => {
                    handle_client_message(client_msg, &state, &tx, &mut player_context).await;
                }
                Err(e) => {
                    warn!("解析消息失败: {}", e);
                    let _ = tx.send(ServerMessage::error(format!("无法解析的消息: {}", e))).await;
                }
            }
        }
    }

    // 客户端断开连接，视为离开房间
    if let Some((room_id, player_id)) = player_context {
        info!("玩家 {} 从房间 {} 断开连接", player_id, room_id);
        leave_room(&state, room_id, player_id).await;
    }
    info!("客户端连接关闭");
}

/// 核心消息处理逻辑
async fn handle_client_message(
    msg: ClientMessage,
    state: &SharedState,
    tx: &mpsc::Sender<ServerMessage>,
    context: &mut Option<(RoomId, PlayerId)>,
) {
    match msg {
        ClientMessage::ListRooms => {
            let _ = tx.send(ServerMessage::RoomList(state.registry.list_rooms())).await;
        }
        ClientMessage::CreateRoom { nickname } => {
            if context.is_some() {
                let _ = tx.send(ServerMessage::error("你已经在一个房间里了")).await;
                return;
            }
            let room_id = state.registry.create_room();
            join_room(state, tx, context, room_id, nickname).await;
        }
        ClientMessage::JoinRoom { room_id, nickname } => {
            if context.is_some() {
                let _ = tx.send(ServerMessage::error("你已经在一个房间里了")).await;
                return;
            }
            if !state.registry.contains(&room_id) {
                let _ = tx.send(RuleError::RoomNotFound { room_id }.into()).await;
                return;
            }
            join_room(state, tx, context, room_id, nickname).await;
        }
        ClientMessage::LeaveRoom => match context.take() {
            Some((room_id, player_id)) => {
                leave_room(state, room_id, player_id).await;
                let _ = tx.send(ServerMessage::Info { message: "你已离开房间".to_string() }).await;
            }
            None => {
                let _ = tx.send(ServerMessage::error("你不在任何房间中")).await;
            }
        },
        // 其余都是对局内指令
        command => {
            let Some((room_id, player_id)) = *context else {
                let _ = tx.send(ServerMessage::error("请先加入或创建房间")).await;
                return;
            };
            let private = matches!(command, ClientMessage::GetGameState);
            let messages = match state.registry.with_session(&room_id, |s| s.handle_command(player_id, command)) {
                Ok(messages) => messages,
                Err(err) => vec![err.into()],
            };

            for msg in messages {
                if private || msg.is_private() {
                    // 错误和查询结果只发给当前玩家
                    let _ = tx.send(msg).await;
                } else {
                    broadcast(state.senders(room_id), &msg, None).await;
                }
            }
        }
    }
}

async fn join_room(
    state: &SharedState,
    tx: &mpsc::Sender<ServerMessage>,
    context: &mut Option<(RoomId, PlayerId)>,
    room_id: RoomId,
    nickname: String,
) {
    let player_id = Uuid::new_v4();
    let snapshot = match state.registry.join(room_id, player_id, nickname.clone()) {
        Ok(s) => s,
        Err(err) => {
            let _ = tx.send(err.into()).await;
            return;
        }
    };
    state.register(room_id, player_id, tx.clone());
    *context = Some((room_id, player_id));

    // 广播给房间内其他玩家
    let join_msg = ServerMessage::PlayerJoined { player_id, nickname };
    broadcast(state.senders(room_id), &join_msg, Some(player_id)).await;
    let _ = tx
        .send(ServerMessage::RoomJoined { your_id: player_id, room_id, game_state: snapshot.clone() })
        .await;
    broadcast(state.senders(room_id), &ServerMessage::GameStateSnapshot(snapshot), Some(player_id)).await;
}

/// 玩家离开或断开后的处理
async fn leave_room(state: &SharedState, room_id: RoomId, player_id: PlayerId) {
    state.unregister(room_id, player_id);

    let snapshot = match state.registry.leave(&room_id, player_id) {
        Ok(s) => s,
        Err(err) => {
            warn!("玩家 {} 离开房间 {} 失败: {}", player_id, room_id, err);
            return;
        }
    };

    let remaining = state.senders(room_id);
    broadcast(remaining.clone(), &ServerMessage::PlayerLeft { player_id }, None).await;
    match snapshot {
        Some(snapshot) => {
            // 对局中途离开会直接结束对局
            let forfeited = snapshot.game_log.last().is_some_and(|e| e.kind == LogKind::GameEnded);
            if let (true, Some(outcome)) = (forfeited, snapshot.outcome) {
                broadcast(remaining.clone(), &ServerMessage::GameOver(outcome), None).await;
            }
            broadcast(remaining, &ServerMessage::GameStateSnapshot(snapshot), None).await;
        }
        None => info!("房间 {} 已空，已被移除", room_id),
    }
}

/// 向房间内所有玩家广播消息
async fn broadcast(
    players: Vec<(PlayerId, mpsc::Sender<ServerMessage>)>,
    message: &ServerMessage,
    exclude: Option<PlayerId>,
) {
    for (player_id, sender) in players {
        if Some(player_id) == exclude {
            continue;
        }
        if sender.send(message.clone()).await.is_err() {
            // 发送失败，说明该玩家也断开了，后续由其自己的 handle_socket 任务处理
            warn!("向玩家 {} 发送消息失败（可能已断开）", player_id);
        }
    }
}
