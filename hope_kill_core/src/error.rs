use crate::state::{GamePhase, PlayerId, RoomId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 非法操作的原因
///
/// 所有规则函数都通过 `Result<_, RuleError>` 报告失败，失败的操作不会修改任何状态。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code")]
pub enum RuleError {
    RoomNotFound { room_id: RoomId },
    RoomFull,
    AlreadyJoined { player_id: PlayerId },
    PlayerNotFound { player_id: PlayerId },
    NotEnoughPlayers { present: usize },
    GameAlreadyStarted,
    GameNotInProgress { phase: GamePhase },
    NotYourTurn,
    CardIndexOutOfRange { index: usize, hand_size: usize },
    InvalidTarget,
    CardNotUsable,
    /// 闪避窗口打开时，只有被攻击的目标可以用驳回（或一套卷子抵消线性代数）响应
    InterruptWindowOpen,
    NoAttackToDodge,
    /// 线性代数不能被驳回
    DodgeCannotCancel,
    HomeworkLimitReached,
    NoPendingAttack,
}

impl fmt::Display for RuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleError::RoomNotFound { room_id } => write!(f, "房间 {} 不存在", room_id),
            RuleError::RoomFull => write!(f, "房间已满"),
            RuleError::AlreadyJoined { .. } => write!(f, "你已经在这个房间里了"),
            RuleError::PlayerNotFound { player_id } => write!(f, "玩家 {} 不在房间中", player_id),
            RuleError::NotEnoughPlayers { present } => {
                write!(f, "无法开始游戏，需要2名玩家（当前 {} 名）", present)
            }
            RuleError::GameAlreadyStarted => write!(f, "游戏已经开始"),
            RuleError::GameNotInProgress { phase } => write!(f, "游戏未在进行中（当前阶段: {:?}）", phase),
            RuleError::NotYourTurn => write!(f, "不是你的回合"),
            RuleError::CardIndexOutOfRange { index, hand_size } => {
                write!(f, "手牌索引 {} 超出范围（手牌数 {}）", index, hand_size)
            }
            RuleError::InvalidTarget => write!(f, "无效的目标"),
            RuleError::CardNotUsable => write!(f, "这张卡牌现在不能使用"),
            RuleError::InterruptWindowOpen => write!(f, "正在等待闪避，现在不能使用这张卡牌"),
            RuleError::NoAttackToDodge => write!(f, "现在没有可以驳回的攻击"),
            RuleError::DodgeCannotCancel => write!(f, "不能用驳回牌闪避线性代数"),
            RuleError::HomeworkLimitReached => write!(f, "本回合已经使用过一套卷子"),
            RuleError::NoPendingAttack => write!(f, "没有待结算的攻击"),
        }
    }
}

impl std::error::Error for RuleError {}
