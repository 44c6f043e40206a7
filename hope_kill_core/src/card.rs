use crate::state::{GameSession, PlayerId};
use rand::prelude::SliceRandom;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
// --- 核心数据结构定义 ---

pub type CardId = Uuid;

/// 卡牌类别 (Category)
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Serialize, Deserialize)]
pub enum CardCategory {
    Homework,  // 作业牌
    Physical,  // 体术牌
    Event,     // 事件牌
    Equipment, // 装备牌
    Status,    // 状态牌
    Time,      // 时间牌
    Magic,     // 魔法牌
}

/// 卡牌种类 (Kind)
/// 每种卡牌的效果由这个标签决定，规则判断一律比较标签而不是显示名称。
/// Event 及之后的变体是预留的扩展位，目前使用后没有任何效果。
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
pub enum CardKind {
    BasicHomework,
    LinearAlgebra,
    Settlement,
    Exercise,
    Rest,
    Meditate,
    Scratch,
    MountTai,
    Dodge,
    Event,
    Equipment,
    Status,
    Time,
    Magic,
}

/// 单张卡牌 (Card)
/// 创建之后不再修改，在牌堆、弃牌堆和手牌之间整体移动。
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub kind: CardKind,
    pub name: String,
    pub category: CardCategory,
    pub description: String,
    pub cost: u32,
}

impl Card {
    pub fn new(kind: CardKind) -> Card {
        Card {
            id: Uuid::new_v4(),
            kind,
            name: kind.name().to_string(),
            category: kind.category(),
            description: kind.description().to_string(),
            cost: 0,
        }
    }

    pub fn is_attack(&self) -> bool {
        self.kind.is_attack()
    }
}

impl CardKind {
    pub fn name(&self) -> &'static str {
        match self {
            CardKind::BasicHomework => "一套卷子",
            CardKind::LinearAlgebra => "线性代数",
            CardKind::Settlement => "清算时刻",
            CardKind::Exercise => "运动",
            CardKind::Rest => "休息",
            CardKind::Meditate => "冥想",
            CardKind::Scratch => "挠痒",
            CardKind::MountTai => "泰山压顶",
            CardKind::Dodge => "驳回",
            CardKind::Event => "事件牌",
            CardKind::Equipment => "装备牌",
            CardKind::Status => "状态牌",
            CardKind::Time => "时间牌",
            CardKind::Magic => "魔法牌",
        }
    }

    pub fn category(&self) -> CardCategory {
        match self {
            CardKind::BasicHomework | CardKind::LinearAlgebra | CardKind::Settlement => CardCategory::Homework,
            CardKind::Exercise
            | CardKind::Rest
            | CardKind::Meditate
            | CardKind::Scratch
            | CardKind::MountTai
            | CardKind::Dodge => CardCategory::Physical,
            CardKind::Event => CardCategory::Event,
            CardKind::Equipment => CardCategory::Equipment,
            CardKind::Status => CardCategory::Status,
            CardKind::Time => CardCategory::Time,
            CardKind::Magic => CardCategory::Magic,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            CardKind::BasicHomework => "对目标造成1点伤害",
            CardKind::LinearAlgebra => "其他所有敌对玩家需要弃掉一张'一套卷子'，否则对其造成1点作业伤害",
            CardKind::Settlement => "指定一个目标对其造成N点作业伤害，N=本回合使用过的'一套卷子'的数量",
            CardKind::Exercise | CardKind::Rest | CardKind::Meditate => "恢复1点san值",
            CardKind::Scratch => "指定一名玩家，弃掉他的一张手牌",
            CardKind::MountTai => "指定一个目标对其造成N点伤害，N=(当前的san值/2)",
            CardKind::Dodge => "闪避一次攻击",
            CardKind::Event | CardKind::Equipment | CardKind::Status | CardKind::Time | CardKind::Magic => {
                "预留扩展，暂无效果"
            }
        }
    }

    /// 攻击类卡牌：打出后会打开闪避窗口，等待目标响应或强制结算
    pub fn is_attack(&self) -> bool {
        self.category() == CardCategory::Homework || *self == CardKind::MountTai
    }

    /// 基础体术牌（运动/休息/冥想），效果都是恢复1点san值
    pub fn is_basic_physical(&self) -> bool {
        matches!(self, CardKind::Exercise | CardKind::Rest | CardKind::Meditate)
    }

    pub fn is_reserved(&self) -> bool {
        matches!(
            self,
            CardKind::Event | CardKind::Equipment | CardKind::Status | CardKind::Time | CardKind::Magic
        )
    }

    /// 当前规则下所有卡牌都可以使用，保留这个入口给以后的合法性规则
    pub fn can_use(&self, _session: &GameSession, _player_id: PlayerId) -> bool {
        true
    }
}

// --- 实现辅助功能 ---

impl fmt::Display for CardCategory {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", match self {
            CardCategory::Homework => "作业牌",
            CardCategory::Physical => "体术牌",
            CardCategory::Event => "事件牌",
            CardCategory::Equipment => "装备牌",
            CardCategory::Status => "状态牌",
            CardCategory::Time => "时间牌",
            CardCategory::Magic => "魔法牌",
        })
    }
}

impl fmt::Display for CardKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}]{}", self.category, self.name)
    }
}

// --- 牌组构建 ---

/// 开局时的固定牌组构成，共18张
pub const DECK_COMPOSITION: [(CardKind, usize); 9] = [
    (CardKind::BasicHomework, 3),
    (CardKind::LinearAlgebra, 2),
    (CardKind::Settlement, 1),
    (CardKind::Exercise, 2),
    (CardKind::Rest, 2),
    (CardKind::Meditate, 2),
    (CardKind::Scratch, 1),
    (CardKind::MountTai, 1),
    (CardKind::Dodge, 4),
];

pub fn deck_size() -> usize {
    DECK_COMPOSITION.iter().map(|(_, count)| count).sum()
}

/// 按固定构成创建一副未洗的牌
fn create_deck() -> Vec<Card> {
    let mut deck = Vec::with_capacity(deck_size());
    for &(kind, count) in &DECK_COMPOSITION {
        for _ in 0..count {
            deck.push(Card::new(kind));
        }
    }
    deck
}

/// 创建一副新牌并均匀随机洗牌
pub fn new_shuffled_deck() -> Vec<Card> {
    let mut deck = create_deck();
    let mut rng = rand::rng();
    deck.shuffle(&mut rng);
    deck
}

// --- 单元测试 ---
