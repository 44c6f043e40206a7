use crate::card::{Card, CardKind};
use crate::deck::CardPiles;
use crate::turn::{InterruptWindow, TurnUsage};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use uuid::Uuid;

pub type RoomId = Uuid;
pub type PlayerId = Uuid;

/// 每个房间的玩家上限
pub const MAX_PLAYERS: usize = 2;
/// 初始和最大san值
pub const MAX_SANITY: u32 = 4;
/// 开局每人发的手牌数
pub const INITIAL_HAND_SIZE: usize = 4;
/// 每个回合开始时抽的牌数
pub const TURN_DRAW_COUNT: usize = 2;
/// 快照中保留的最近日志条数
pub const LOG_CAPACITY: usize = 10;

/// 单个房间的对局状态
///
/// 所有操作都必须在同一把锁下串行执行（见 `registry`），这里本身不做任何同步。
#[derive(Debug, Clone)]
pub struct GameSession {
    pub room_id: RoomId,
    // 按加入顺序排列，最先加入的玩家先手
    pub players: Vec<Player>,
    pub current_turn: Option<PlayerId>,
    pub phase: GamePhase,
    pub piles: CardPiles,
    pub log: GameLog,
    pub window: InterruptWindow,
    pub turn_usage: TurnUsage,
    pub outcome: Option<GameOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub sanity: u32,
    pub max_sanity: u32,
    pub hand: Vec<Card>,  // 顺序即抽牌顺序
    pub equipment: Vec<Card>,  // 预留
    pub status: Vec<Card>,  // 预留
    pub homework_used_this_turn: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum GamePhase {
    Waiting,
    Playing,
    Finished,
}

/// 对局结果
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum GameOutcome {
    /// 唯一存活的玩家获胜
    Winner(PlayerId),
    /// 双方同时倒下
    Draw,
    /// 对手中途离开，剩下的玩家获胜
    Forfeit { winner: PlayerId },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LogKind {
    PlayerJoined,
    PlayerLeft,
    GameStarted,
    CardDrawn,
    DeckReshuffled,
    CardUsed,
    AttackResolved,
    TurnEnded,
    GameOver,
    GameEnded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub kind: LogKind,
    pub message: String,
}

/// 固定容量的日志环，只保留最近 `LOG_CAPACITY` 条
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameLog {
    entries: VecDeque<LogEntry>,
}

impl GameLog {
    pub fn push(&mut self, kind: LogKind, message: impl Into<String>) {
        if self.entries.len() == LOG_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(LogEntry { kind, message: message.into() });
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Player {
    pub fn new(id: PlayerId, name: String) -> Self {
        Player {
            id,
            name,
            sanity: MAX_SANITY,
            max_sanity: MAX_SANITY,
            hand: Vec::new(),
            equipment: Vec::new(),
            status: Vec::new(),
            homework_used_this_turn: false,
        }
    }

    /// 扣除san值，最低为0
    pub fn take_damage(&mut self, amount: u32) {
        self.sanity = self.sanity.saturating_sub(amount);
    }

    /// 恢复san值，最高为上限
    pub fn heal(&mut self, amount: u32) {
        self.sanity = self.sanity.saturating_add(amount).min(self.max_sanity);
    }

    pub fn is_alive(&self) -> bool {
        self.sanity > 0
    }

    pub fn count_in_hand(&self, kind: CardKind) -> usize {
        self.hand.iter().filter(|c| c.kind == kind).count()
    }
}

// --- 客户端可见的快照 ---

/// 广播给房间内所有连接的状态快照。牌堆和弃牌堆只给出数量。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub room_id: RoomId,
    pub players: Vec<Player>,
    pub current_turn: Option<PlayerId>,
    pub phase: GamePhase,
    pub deck_count: usize,
    pub discard_count: usize,
    pub game_log: Vec<LogEntry>,
    pub waiting_for_dodge: bool,
    pub attack_target: Option<PlayerId>,
    pub turn_card_usage: HashMap<PlayerId, HashMap<CardKind, u32>>,
    pub pending_attack: Option<PendingAttackView>,
    pub outcome: Option<GameOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAttackView {
    pub attacker: PlayerId,
    pub target: PlayerId,
    pub card: Card,
}

/// 房间列表中的一项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSummary {
    pub room_id: RoomId,
    pub players: usize,
    pub max_players: usize,
    pub phase: GamePhase,
}

// --- GameSession 的实现方法 ---

impl GameSession {
    pub fn new(room_id: RoomId) -> Self {
        GameSession {
            room_id,
            players: Vec::new(),
            current_turn: None,
            phase: GamePhase::Waiting,
            piles: CardPiles::default(),
            log: GameLog::default(),
            window: InterruptWindow::Idle,
            turn_usage: TurnUsage::default(),
            outcome: None,
        }
    }

    pub fn player(&self, player_id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == player_id)
    }

    pub fn player_mut(&mut self, player_id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == player_id)
    }

    pub fn has_player(&self, player_id: PlayerId) -> bool {
        self.player(player_id).is_some()
    }

    /// 日志里使用的玩家名称，找不到时退回到ID
    pub(crate) fn display_name(&self, player_id: PlayerId) -> String {
        self.player(player_id)
            .map_or_else(|| player_id.to_string(), |p| p.name.clone())
    }

    pub fn waiting_for_dodge(&self) -> bool {
        self.window.is_open()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// 牌堆、弃牌堆与所有手牌的总数
    pub fn total_cards(&self) -> usize {
        self.piles.total() + self.players.iter().map(|p| p.hand.len()).sum::<usize>()
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            room_id: self.room_id,
            players: self.players.clone(),
            current_turn: self.current_turn,
            phase: self.phase,
            deck_count: self.piles.deck.len(),
            discard_count: self.piles.discard.len(),
            game_log: self.log.entries().cloned().collect(),
            waiting_for_dodge: self.window.is_open(),
            attack_target: self.window.attack_target(),
            turn_card_usage: self
                .players
                .iter()
                .map(|p| (p.id, self.turn_usage.for_player(p.id).cloned().unwrap_or_default()))
                .collect(),
            pending_attack: self.window.pending().map(|p| PendingAttackView {
                attacker: p.attacker,
                target: p.target,
                card: p.card.clone(),
            }),
            outcome: self.outcome,
        }
    }

    pub fn room_summary(&self) -> RoomSummary {
        RoomSummary {
            room_id: self.room_id,
            players: self.players.len(),
            max_players: MAX_PLAYERS,
            phase: self.phase,
        }
    }
}
