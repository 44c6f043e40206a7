use crate::card::{Card, CardCategory, CardKind};
use crate::deck::CardPiles;
use crate::effects::Effect;
use crate::error::RuleError;
use crate::state::*;
use crate::turn::{InterruptWindow, PendingAttack, WindowResponse};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// 一次成功出牌的结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayOutcome {
    /// 攻击牌已打出，等待目标闪避或强制结算
    AttackPending { target: PlayerId },
    /// 目标用驳回取消了攻击
    Dodged { attacker: PlayerId },
    /// 目标用一套卷子抵消了线性代数
    Countered { attacker: PlayerId },
    /// 立即生效的卡牌
    Applied { effects: Vec<Effect> },
}

/// 一次攻击结算的结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub attacker: PlayerId,
    pub target: PlayerId,
    pub card: Card,
    pub effects: Vec<Effect>,
    /// 结算后如果对局结束，这里是结果
    pub outcome: Option<GameOutcome>,
}

/// 一次回合切换的结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnChange {
    pub ended: PlayerId,
    /// 强制结算导致对局结束时没有下一位玩家
    pub next: Option<PlayerId>,
    /// 回合结束前被强制结算的攻击
    pub resolution: Option<Resolution>,
    pub cards_drawn: usize,
}

// --- 核心游戏流程函数 ---

impl GameSession {
    /// 玩家加入房间，最多2人
    pub fn add_player(&mut self, player_id: PlayerId, name: String) -> Result<(), RuleError> {
        if self.has_player(player_id) {
            return Err(RuleError::AlreadyJoined { player_id });
        }
        if self.players.len() >= MAX_PLAYERS {
            return Err(RuleError::RoomFull);
        }

        self.log.push(LogKind::PlayerJoined, format!("{} 加入了游戏", name));
        self.players.push(Player::new(player_id, name));
        self.turn_usage.clear(player_id);
        Ok(())
    }

    /// 玩家离开房间
    ///
    /// 对局进行中离开会直接结束对局，剩下的玩家获胜；离开玩家的手牌进入弃牌堆。
    pub fn remove_player(&mut self, player_id: PlayerId) -> Result<(), RuleError> {
        let idx = self
            .players
            .iter()
            .position(|p| p.id == player_id)
            .ok_or(RuleError::PlayerNotFound { player_id })?;

        let player = self.players.remove(idx);
        for card in player.hand {
            self.piles.discard(card);
        }
        self.turn_usage.remove_player(player_id);
        self.log.push(LogKind::PlayerLeft, format!("{} 离开了游戏", player.name));

        if self.phase == GamePhase::Playing {
            self.window.close();
            self.phase = GamePhase::Finished;
            self.current_turn = None;
            self.outcome = self.players.first().map(|p| GameOutcome::Forfeit { winner: p.id });
            self.log.push(LogKind::GameEnded, "游戏结束");
            info!("房间 {} 的对局因玩家 {} 离开而结束", self.room_id, player_id);
        } else if self.current_turn == Some(player_id) {
            self.current_turn = None;
        }
        Ok(())
    }

    /// 开始新的一局
    ///
    /// - 重置所有玩家的san值、手牌和回合标记，清空使用记录。
    /// - 创建一副新牌并洗牌，每人发4张。
    /// - 最先加入的玩家先手，并立即抽2张牌。
    pub fn start_game(&mut self) -> Result<(), RuleError> {
        if self.phase == GamePhase::Playing {
            return Err(RuleError::GameAlreadyStarted);
        }
        if self.players.len() != MAX_PLAYERS {
            return Err(RuleError::NotEnoughPlayers { present: self.players.len() });
        }

        self.turn_usage.reset();
        for player in self.players.iter_mut() {
            player.hand.clear();
            player.equipment.clear();
            player.status.clear();
            player.homework_used_this_turn = false;
            player.max_sanity = MAX_SANITY;
            player.sanity = MAX_SANITY;
            self.turn_usage.clear(player.id);
        }

        self.piles = CardPiles::fresh();
        self.log.clear();
        self.window = InterruptWindow::Idle;
        self.outcome = None;
        self.phase = GamePhase::Playing;

        // 发初始手牌，不写日志
        for player in self.players.iter_mut() {
            for _ in 0..INITIAL_HAND_SIZE {
                if let Some(card) = self.piles.deck.pop() {
                    player.hand.push(card);
                }
            }
        }

        let first = self.players[0].id;
        self.current_turn = Some(first);
        for _ in 0..TURN_DRAW_COUNT {
            self.draw_into(first);
        }

        self.log.push(LogKind::GameStarted, "游戏开始！");
        info!("房间 {} 的对局开始，先手玩家 {}", self.room_id, first);
        Ok(())
    }

    /// 玩家抽一张牌。牌堆和弃牌堆都空时返回 `Ok(None)`。
    pub fn draw_card(&mut self, player_id: PlayerId) -> Result<Option<Card>, RuleError> {
        self.ensure_playing()?;
        if !self.has_player(player_id) {
            return Err(RuleError::PlayerNotFound { player_id });
        }
        Ok(self.draw_into(player_id))
    }

    /// 使用手牌
    ///
    /// 闪避窗口打开时只有被攻击的目标可以响应；窗口空闲时只有当前回合的玩家可以出牌。
    /// 被拒绝的出牌不会修改任何状态，成功的出牌会计入本回合的使用次数。
    pub fn use_card(
        &mut self,
        player_id: PlayerId,
        hand_index: usize,
        target: Option<PlayerId>,
    ) -> Result<PlayOutcome, RuleError> {
        self.try_use_card(player_id, hand_index, target).inspect_err(|err| {
            debug!("房间 {} 拒绝了玩家 {} 的出牌（索引 {}）: {}", self.room_id, player_id, hand_index, err);
        })
    }

    fn try_use_card(
        &mut self,
        player_id: PlayerId,
        hand_index: usize,
        target: Option<PlayerId>,
    ) -> Result<PlayOutcome, RuleError> {
        self.ensure_playing()?;
        let kind = {
            let player = self.player(player_id).ok_or(RuleError::PlayerNotFound { player_id })?;
            let card = player.hand.get(hand_index).ok_or(RuleError::CardIndexOutOfRange {
                index: hand_index,
                hand_size: player.hand.len(),
            })?;
            card.kind
        };
        if !kind.can_use(self, player_id) {
            return Err(RuleError::CardNotUsable);
        }

        let response = self.window.classify(player_id, kind)?;

        // 一套卷子每回合只能成功使用一次，抵消线性代数时同样计数
        if kind == CardKind::BasicHomework && self.turn_usage.count(player_id, CardKind::BasicHomework) >= 1 {
            return Err(RuleError::HomeworkLimitReached);
        }

        if let Some(response) = response {
            return self.answer_attack(player_id, hand_index, response);
        }

        if self.current_turn != Some(player_id) {
            return Err(RuleError::NotYourTurn);
        }

        if kind.is_attack() {
            let target = self.opponent_target(player_id, target)?;
            let card = self.play_from_hand(player_id, hand_index)?;
            let message = format!(
                "{} 对 {} 使用了 {}，等待闪避",
                self.display_name(player_id),
                self.display_name(target),
                card.name
            );
            self.window.open(PendingAttack { attacker: player_id, target, card });
            self.log.push(LogKind::CardUsed, message);
            return Ok(PlayOutcome::AttackPending { target });
        }

        let target = if kind.is_basic_physical() {
            // 不指定目标时默认为自己
            match target {
                None => Some(player_id),
                Some(t) if self.has_player(t) => Some(t),
                Some(_) => return Err(RuleError::InvalidTarget),
            }
        } else if kind == CardKind::Scratch {
            Some(self.opponent_target(player_id, target)?)
        } else {
            None
        };

        self.play_from_hand(player_id, hand_index)?;
        let effects = kind.apply(self, player_id, target);
        Ok(PlayOutcome::Applied { effects })
    }

    /// 结算待处理的攻击（没有闪避时）
    ///
    /// 按攻击牌的种类执行效果，关闭闪避窗口，然后检查对局是否结束。
    pub fn resolve_attack(&mut self) -> Result<Resolution, RuleError> {
        let pending = self.window.close().ok_or(RuleError::NoPendingAttack)?;
        let effects = pending.card.kind.apply(self, pending.attacker, Some(pending.target));
        let outcome = self.check_game_over();
        Ok(Resolution {
            attacker: pending.attacker,
            target: pending.target,
            card: pending.card,
            effects,
            outcome,
        })
    }

    /// 结束回合
    ///
    /// 只有当前回合的玩家可以结束自己的回合。有待处理的攻击时先强制结算，
    /// 然后清空结束方的回合记录，轮到另一名玩家，新玩家抽2张牌。
    pub fn end_turn(&mut self, player_id: PlayerId) -> Result<TurnChange, RuleError> {
        self.ensure_playing()?;
        if self.current_turn != Some(player_id) {
            return Err(RuleError::NotYourTurn);
        }

        let resolution = if self.window.is_open() { Some(self.resolve_attack()?) } else { None };
        if self.phase != GamePhase::Playing {
            return Ok(TurnChange { ended: player_id, next: None, resolution, cards_drawn: 0 });
        }

        if let Some(player) = self.player_mut(player_id) {
            player.homework_used_this_turn = false;
        }
        self.turn_usage.clear(player_id);

        let current_idx = self.players.iter().position(|p| p.id == player_id).unwrap_or(0);
        let next_idx = (current_idx + 1) % self.players.len();
        let next = self.players[next_idx].id;
        self.current_turn = Some(next);

        // 新回合开始前清空新玩家的标记和计数
        self.players[next_idx].homework_used_this_turn = false;
        self.turn_usage.clear(next);

        let cards_drawn = (0..TURN_DRAW_COUNT).filter_map(|_| self.draw_into(next)).count();

        self.log.push(
            LogKind::TurnEnded,
            format!("{} 的回合结束，轮到 {}", self.display_name(player_id), self.display_name(next)),
        );
        Ok(TurnChange { ended: player_id, next: Some(next), resolution, cards_drawn })
    }

    /// 检查对局是否结束
    ///
    /// 对局进行中且存活（san值大于0）的玩家不超过1人时，对局结束并写入结束日志。
    /// 对局已经结束时直接返回之前的结果，不会重复结束。
    pub fn check_game_over(&mut self) -> Option<GameOutcome> {
        match self.phase {
            GamePhase::Finished => return self.outcome,
            GamePhase::Waiting => return None,
            GamePhase::Playing => {}
        }

        let alive: Vec<&Player> = self.players.iter().filter(|p| p.is_alive()).collect();
        if alive.len() > 1 {
            return None;
        }

        let (outcome, message) = match alive.first() {
            Some(winner) => (GameOutcome::Winner(winner.id), format!("游戏结束！{} 获胜！", winner.name)),
            None => (GameOutcome::Draw, "游戏结束！平局！".to_string()),
        };
        self.phase = GamePhase::Finished;
        self.outcome = Some(outcome);
        self.log.push(LogKind::GameOver, message);
        info!("房间 {} 的对局结束: {:?}", self.room_id, outcome);
        Some(outcome)
    }
}

// --- 辅助逻辑函数 ---

impl GameSession {
    fn ensure_playing(&self) -> Result<(), RuleError> {
        if self.phase != GamePhase::Playing {
            return Err(RuleError::GameNotInProgress { phase: self.phase });
        }
        Ok(())
    }

    /// 攻击和挠痒的目标必须是房间内的另一名玩家
    fn opponent_target(&self, player_id: PlayerId, target: Option<PlayerId>) -> Result<PlayerId, RuleError> {
        match target {
            Some(t) if t != player_id && self.has_player(t) => Ok(t),
            _ => Err(RuleError::InvalidTarget),
        }
    }

    /// 把手牌移到弃牌堆，记录使用次数，返回这张牌
    fn play_from_hand(&mut self, player_id: PlayerId, hand_index: usize) -> Result<Card, RuleError> {
        let player = self
            .players
            .iter_mut()
            .find(|p| p.id == player_id)
            .ok_or(RuleError::PlayerNotFound { player_id })?;
        if hand_index >= player.hand.len() {
            return Err(RuleError::CardIndexOutOfRange { index: hand_index, hand_size: player.hand.len() });
        }

        let card = player.hand.remove(hand_index);
        if card.category == CardCategory::Homework {
            player.homework_used_this_turn = true;
        }
        self.turn_usage.record(player_id, card.kind);
        self.piles.discard(card.clone());
        Ok(card)
    }

    /// 响应闪避窗口：驳回或一套卷子抵消线性代数
    fn answer_attack(
        &mut self,
        player_id: PlayerId,
        hand_index: usize,
        response: WindowResponse,
    ) -> Result<PlayOutcome, RuleError> {
        let card = self.play_from_hand(player_id, hand_index)?;
        let attacker = self.window.close().map_or(player_id, |p| p.attacker);
        let name = self.display_name(player_id);

        match response {
            WindowResponse::Dodge => {
                self.log.push(LogKind::CardUsed, format!("{} 使用了 {} 闪避了攻击", name, card.name));
                Ok(PlayOutcome::Dodged { attacker })
            }
            WindowResponse::Counter => {
                self.log.push(LogKind::CardUsed, format!("{} 使用了一套卷子抵消了线性代数的攻击", name));
                Ok(PlayOutcome::Countered { attacker })
            }
        }
    }

    /// 从牌堆顶抽一张牌放入玩家手牌
    fn draw_into(&mut self, player_id: PlayerId) -> Option<Card> {
        let name = self.player(player_id)?.name.clone();
        let drawn = self.piles.draw();
        if drawn.reshuffled {
            self.log.push(LogKind::DeckReshuffled, "牌堆重新洗牌");
            info!("房间 {} 的弃牌堆已洗回牌堆", self.room_id);
        }

        let card = drawn.card?;
        self.player_mut(player_id)?.hand.push(card.clone());
        self.log.push(LogKind::CardDrawn, format!("{} 抽了一张牌", name));
        Some(card)
    }
}

impl GameOutcome {
    pub fn winner(&self) -> Option<PlayerId> {
        match self {
            GameOutcome::Winner(id) | GameOutcome::Forfeit { winner: id } => Some(*id),
            GameOutcome::Draw => None,
        }
    }
}

// --- 单元测试 ---
