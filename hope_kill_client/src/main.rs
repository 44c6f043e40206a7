use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use url::Url;

use hope_kill_core::{ClientMessage, GamePhase, GameSnapshot, PlayerId, RoomId, ServerMessage};

const DEFAULT_URL: &str = "ws://127.0.0.1:25917/ws";

/// 客户端记住的自己的身份和最近一次快照，用来解析出牌目标
#[derive(Default)]
struct LocalView {
    my_id: Option<PlayerId>,
    snapshot: Option<GameSnapshot>,
}

impl LocalView {
    fn opponent(&self) -> Option<PlayerId> {
        let my_id = self.my_id?;
        self.snapshot.as_ref()?.players.iter().map(|p| p.id).find(|id| *id != my_id)
    }

    fn apply(&mut self, msg: &ServerMessage) {
        match msg {
            ServerMessage::RoomJoined { your_id, game_state, .. } => {
                self.my_id = Some(*your_id);
                self.snapshot = Some(game_state.clone());
            }
            ServerMessage::GameStateSnapshot(s) => self.snapshot = Some(s.clone()),
            _ => {}
        }
    }
}

fn render(snapshot: &GameSnapshot, my_id: Option<PlayerId>) {
    println!("=== 房间 {} ({:?}) ===", snapshot.room_id, snapshot.phase);
    for p in &snapshot.players {
        let me = if Some(p.id) == my_id { " (你)" } else { "" };
        let turn = if snapshot.current_turn == Some(p.id) { " <- 当前回合" } else { "" };
        println!("{}{}: san {}/{} 手牌 {} 张{}", p.name, me, p.sanity, p.max_sanity, p.hand.len(), turn);
        if Some(p.id) == my_id {
            for (i, card) in p.hand.iter().enumerate() {
                println!("  [{}] {} - {}", i, card, card.description);
            }
        }
    }
    println!("牌堆 {} 张，弃牌堆 {} 张", snapshot.deck_count, snapshot.discard_count);
    if let Some(pending) = &snapshot.pending_attack {
        println!("!! 等待闪避: {} 对 {} 使用了 {}", pending.attacker, pending.target, pending.card);
    }
    if snapshot.phase == GamePhase::Finished {
        println!("对局已结束: {:?}", snapshot.outcome);
    }
    for entry in &snapshot.game_log {
        println!("  · {}", entry.message);
    }
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let raw_url = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_URL.to_string());
    let url = Url::parse(&raw_url)?;

    println!("正在连接到: {}", url);
    let (ws_stream, _) = connect_async(url.as_str()).await?;
    println!("连接成功!");

    let (mut write, mut read) = ws_stream.split();
    let view = Arc::new(Mutex::new(LocalView::default()));

    // 启动一个任务来处理从服务器接收的消息
    let reader_view = Arc::clone(&view);
    tokio::spawn(async move {
        while let Some(msg) = read.next().await {
            match msg {
                Ok(Message::Text(text)) => match serde_json::from_str::<ServerMessage>(&text) {
                    Ok(server_msg) => {
                        let mut view = reader_view.lock();
                        view.apply(&server_msg);
                        match &server_msg {
                            ServerMessage::GameStateSnapshot(s) => render(s, view.my_id),
                            ServerMessage::RoomJoined { room_id, game_state, .. } => {
                                println!("\n已加入房间 {}", room_id);
                                render(game_state, view.my_id);
                            }
                            ServerMessage::Error { message, .. } => println!("\n[错误] {}", message),
                            ServerMessage::Info { message } => println!("\n[提示] {}", message),
                            other => println!("\n<-- [服务器消息]: {:?}", other),
                        }
                        prompt();
                    }
                    Err(e) => eprintln!("解析服务器消息失败: {}", e),
                },
                Ok(_) => {}
                Err(e) => {
                    eprintln!("接收消息时出错: {}", e);
                    break;
                }
            }
        }
    });

    // 主任务处理用户输入
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    println!("--- 希望杀客户端 ---");
    println!("可用命令:");
    println!("  create <昵称>             - 创建一个新房间");
    println!("  join <房间ID> <昵称>      - 加入一个房间");
    println!("  leave                     - 离开房间");
    println!("  rooms                     - 查看所有房间");
    println!("  start                     - 开始游戏 (需要2名玩家)");
    println!("  play <序号> [me|op|ID]    - 使用手牌，可指定目标");
    println!("  resolve                   - 不闪避，直接结算攻击");
    println!("  draw                      - 抽一张牌");
    println!("  end                       - 结束回合");
    println!("  state                     - 查看当前状态");
    println!("  exit                      - 退出");

    loop {
        prompt();

        let Some(line) = stdin.next_line().await? else { break };
        let parts: Vec<&str> = line.split_whitespace().collect();

        let client_msg = match parts.first().copied() {
            Some("create") => {
                let nickname = parts.get(1).unwrap_or(&"新玩家").to_string();
                ClientMessage::CreateRoom { nickname }
            }
            Some("join") => {
                let (Some(raw_id), Some(nickname)) = (parts.get(1), parts.get(2)) else {
                    println!("用法: join <房间ID> <昵称>");
                    continue;
                };
                let Ok(room_id) = raw_id.parse::<RoomId>() else {
                    println!("无效的房间ID格式: {}", raw_id);
                    continue;
                };
                ClientMessage::JoinRoom { room_id, nickname: nickname.to_string() }
            }
            Some("leave") => ClientMessage::LeaveRoom,
            Some("rooms") => ClientMessage::ListRooms,
            Some("start") => ClientMessage::StartGame,
            Some("play") => {
                let Some(Ok(hand_index)) = parts.get(1).map(|s| s.parse::<usize>()) else {
                    println!("用法: play <序号> [me|op|ID]");
                    continue;
                };
                let target_id = match parts.get(2).copied() {
                    None => None,
                    Some("me") => view.lock().my_id,
                    Some("op") => view.lock().opponent(),
                    Some(raw) => match raw.parse::<PlayerId>() {
                        Ok(id) => Some(id),
                        Err(_) => {
                            println!("无效的目标: {}", raw);
                            continue;
                        }
                    },
                };
                ClientMessage::UseCard { hand_index, target_id }
            }
            Some("resolve") => ClientMessage::ResolveAttack,
            Some("draw") => ClientMessage::DrawCard,
            Some("end") => ClientMessage::EndTurn,
            Some("state") => ClientMessage::GetGameState,
            Some("exit") => {
                println!("正在断开连接...");
                break;
            }
            None => continue,
            Some(_) => {
                println!("未知命令: {}", line);
                continue;
            }
        };

        let payload = serde_json::to_string(&client_msg)?;
        write.send(Message::Text(payload.into())).await?;
    }

    Ok(())
}
