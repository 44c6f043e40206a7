use crate::card::Card;
use crate::error::RuleError;
use crate::logic::{PlayOutcome, Resolution, TurnChange};
use crate::state::{GameOutcome, GamePhase, GameSession, GameSnapshot, PlayerId, RoomId, RoomSummary};
use serde::{Deserialize, Serialize};

// --- 客户端 -> 服务器 的消息 ---
// 这些是客户端可以发送给服务器的指令。

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    // --- 房间管理消息 ---
    /// 客户端请求创建一个新房间
    CreateRoom { nickname: String },
    /// 客户端请求加入一个已存在的房间
    JoinRoom { room_id: RoomId, nickname: String },
    /// 离开当前房间
    LeaveRoom,
    /// 查询所有房间
    ListRooms,

    // --- 游戏内消息 ---
    /// 人数满2人后开始对局
    StartGame,
    /// 打出手牌。攻击牌和刮擦需要指定对手，恢复牌不指定时作用于自己
    UseCard { hand_index: usize, target_id: Option<PlayerId> },
    EndTurn,
    DrawCard,
    /// 放弃闪避，直接结算待处理的攻击
    ResolveAttack,
    GetGameState,
}

// --- 服务器 -> 客户端 的消息 ---
// 错误只发给发起请求的玩家，其余事件广播给房间内所有玩家。

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    // --- 房间管理消息 ---
    /// 成功加入或创建房间后，服务器私密地发给该玩家
    RoomJoined {
        your_id: PlayerId,
        room_id: RoomId,
        game_state: GameSnapshot,
    },
    /// 一个新玩家加入了房间
    PlayerJoined { player_id: PlayerId, nickname: String },
    /// 一个玩家离开了房间
    PlayerLeft { player_id: PlayerId },
    RoomList(Vec<RoomSummary>),

    // --- 游戏状态更新消息 ---
    /// 完整游戏状态的快照，每次状态改变后广播
    GameStateSnapshot(GameSnapshot),
    GameStarted { first_player: PlayerId },
    CardUsed {
        player_id: PlayerId,
        hand_index: usize,
        target_id: Option<PlayerId>,
        outcome: PlayOutcome,
    },
    CardDrawn { player_id: PlayerId, card: Option<Card> },
    TurnEnded(TurnChange),
    AttackResolved(Resolution),
    GameOver(GameOutcome),

    Info { message: String },
    /// 规则错误时 `code` 带有具体原因，连接层面的错误没有
    Error { code: Option<RuleError>, message: String },
}

impl ServerMessage {
    /// 连接层面的错误，例如还没有加入房间
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error { code: None, message: message.into() }
    }

    /// 是否只应该发给发起请求的玩家
    pub fn is_private(&self) -> bool {
        matches!(self, ServerMessage::Error { .. } | ServerMessage::RoomJoined { .. } | ServerMessage::RoomList(_))
    }
}

impl From<RuleError> for ServerMessage {
    fn from(err: RuleError) -> Self {
        ServerMessage::Error { message: err.to_string(), code: Some(err) }
    }
}

impl GameSession {
    /// 处理一条对局内指令，返回要发送的消息
    ///
    /// 失败时只返回一条错误消息，状态不变。成功时返回事件，
    /// 对局因此结束时追加 `GameOver`，最后附上最新的快照。
    /// 房间管理类消息由上层处理，这里直接报错。
    pub fn handle_command(&mut self, player_id: PlayerId, command: ClientMessage) -> Vec<ServerMessage> {
        if !self.has_player(player_id) {
            return vec![RuleError::PlayerNotFound { player_id }.into()];
        }
        let was_finished = self.phase == GamePhase::Finished;

        let event = match command {
            ClientMessage::StartGame => self.start_game().map(|_| {
                ServerMessage::GameStarted { first_player: self.current_turn.unwrap_or(player_id) }
            }),
            ClientMessage::UseCard { hand_index, target_id } => self
                .use_card(player_id, hand_index, target_id)
                .map(|outcome| ServerMessage::CardUsed { player_id, hand_index, target_id, outcome }),
            ClientMessage::EndTurn => self.end_turn(player_id).map(ServerMessage::TurnEnded),
            ClientMessage::DrawCard => self.draw_card(player_id).map(|card| ServerMessage::CardDrawn { player_id, card }),
            ClientMessage::ResolveAttack => self.resolve_attack().map(ServerMessage::AttackResolved),
            ClientMessage::GetGameState => return vec![ServerMessage::GameStateSnapshot(self.snapshot())],
            ClientMessage::CreateRoom { .. }
            | ClientMessage::JoinRoom { .. }
            | ClientMessage::LeaveRoom
            | ClientMessage::ListRooms => return vec![ServerMessage::error("房间管理消息不能在对局内处理")],
        };

        match event {
            Err(err) => vec![err.into()],
            Ok(event) => {
                let mut messages = vec![event];
                if !was_finished && self.phase == GamePhase::Finished {
                    if let Some(outcome) = self.outcome {
                        messages.push(ServerMessage::GameOver(outcome));
                    }
                }
                messages.push(ServerMessage::GameStateSnapshot(self.snapshot()));
                messages
            }
        }
    }
}

// --- 单元测试 ---
