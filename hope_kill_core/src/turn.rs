use crate::card::{Card, CardKind};
use crate::error::RuleError;
use crate::state::PlayerId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 等待闪避的攻击
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAttack {
    pub attacker: PlayerId,
    pub target: PlayerId,
    pub card: Card,
}

/// 闪避窗口
///
/// 待处理的攻击只存在于 `AwaitingDodge` 中，所以"有待处理攻击"和"正在等待闪避"
/// 总是同时成立或同时不成立。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterruptWindow {
    #[default]
    Idle,
    AwaitingDodge(PendingAttack),
}

/// 目标在闪避窗口中的合法响应
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindowResponse {
    /// 驳回：取消攻击
    Dodge,
    /// 一套卷子抵消线性代数
    Counter,
}

impl InterruptWindow {
    pub fn is_open(&self) -> bool {
        matches!(self, InterruptWindow::AwaitingDodge(_))
    }

    pub fn pending(&self) -> Option<&PendingAttack> {
        match self {
            InterruptWindow::Idle => None,
            InterruptWindow::AwaitingDodge(pending) => Some(pending),
        }
    }

    pub fn attack_target(&self) -> Option<PlayerId> {
        self.pending().map(|p| p.target)
    }

    pub fn open(&mut self, pending: PendingAttack) {
        *self = InterruptWindow::AwaitingDodge(pending);
    }

    /// 关闭窗口并取出待处理的攻击
    pub fn close(&mut self) -> Option<PendingAttack> {
        match std::mem::take(self) {
            InterruptWindow::Idle => None,
            InterruptWindow::AwaitingDodge(pending) => Some(pending),
        }
    }

    /// 判断玩家打出某种牌在当前窗口状态下意味着什么
    ///
    /// - `Ok(None)`：窗口空闲，按普通出牌处理
    /// - `Ok(Some(_))`：对待处理攻击的合法响应
    /// - `Err(_)`：窗口状态不允许这次出牌
    pub fn classify(&self, player_id: PlayerId, kind: CardKind) -> Result<Option<WindowResponse>, RuleError> {
        let pending = match self {
            InterruptWindow::Idle => {
                return if kind == CardKind::Dodge { Err(RuleError::NoAttackToDodge) } else { Ok(None) };
            }
            InterruptWindow::AwaitingDodge(pending) => pending,
        };

        if player_id != pending.target {
            return Err(RuleError::InterruptWindowOpen);
        }

        match (kind, pending.card.kind) {
            (CardKind::Dodge, CardKind::LinearAlgebra) => Err(RuleError::DodgeCannotCancel),
            (CardKind::Dodge, _) => Ok(Some(WindowResponse::Dodge)),
            (CardKind::BasicHomework, CardKind::LinearAlgebra) => Ok(Some(WindowResponse::Counter)),
            _ => Err(RuleError::InterruptWindowOpen),
        }
    }
}

/// 回合内的卡牌使用次数：玩家 -> (卡牌种类 -> 次数)
///
/// 只记录成功打出的牌。每个玩家的计数在其回合结束时清零，
/// 并在其下一个回合开始前再次清零。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TurnUsage {
    counts: HashMap<PlayerId, HashMap<CardKind, u32>>,
}

impl TurnUsage {
    pub fn record(&mut self, player_id: PlayerId, kind: CardKind) {
        *self.counts.entry(player_id).or_default().entry(kind).or_insert(0) += 1;
    }

    pub fn count(&self, player_id: PlayerId, kind: CardKind) -> u32 {
        self.counts
            .get(&player_id)
            .and_then(|usage| usage.get(&kind))
            .copied()
            .unwrap_or(0)
    }

    /// 清空某个玩家的计数，保留其条目
    pub fn clear(&mut self, player_id: PlayerId) {
        self.counts.insert(player_id, HashMap::new());
    }

    pub fn remove_player(&mut self, player_id: PlayerId) {
        self.counts.remove(&player_id);
    }

    pub fn reset(&mut self) {
        self.counts.clear();
    }

    pub fn for_player(&self, player_id: PlayerId) -> Option<&HashMap<CardKind, u32>> {
        self.counts.get(&player_id)
    }
}

// --- 单元测试 ---
