use crate::card::{new_shuffled_deck, Card};
use rand::prelude::SliceRandom;
use serde::{Deserialize, Serialize};

/// 共享的牌堆和弃牌堆
///
/// `deck` 的末尾是牌堆顶，抽牌从末尾弹出；弃牌追加到 `discard` 末尾。
/// 牌堆抽空时，弃牌堆整体洗回成为新的牌堆。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CardPiles {
    pub deck: Vec<Card>,
    pub discard: Vec<Card>,
}

/// 一次抽牌的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Drawn {
    pub card: Option<Card>,
    /// 抽牌前是否把弃牌堆洗回了牌堆
    pub reshuffled: bool,
}

impl CardPiles {
    /// 新建一副洗好的牌，弃牌堆为空
    pub fn fresh() -> Self {
        CardPiles {
            deck: new_shuffled_deck(),
            discard: Vec::new(),
        }
    }

    /// 从牌堆顶抽一张牌
    ///
    /// 牌堆为空时先把弃牌堆洗回牌堆；两者都为空时什么也不做，返回 `None`。
    pub fn draw(&mut self) -> Drawn {
        let reshuffled = self.deck.is_empty() && self.reshuffle_discard();
        Drawn {
            card: self.deck.pop(),
            reshuffled,
        }
    }

    /// 把一张牌放到弃牌堆顶
    pub fn discard(&mut self, card: Card) {
        self.discard.push(card);
    }

    /// 弃牌堆变为新的牌堆并洗牌。弃牌堆为空时返回 false。
    fn reshuffle_discard(&mut self) -> bool {
        if self.discard.is_empty() {
            return false;
        }
        self.deck = std::mem::take(&mut self.discard);
        let mut rng = rand::rng();
        self.deck.shuffle(&mut rng);
        true
    }

    pub fn total(&self) -> usize {
        self.deck.len() + self.discard.len()
    }
}

/// 移除手牌中第一张满足条件的牌（按手牌顺序），没有匹配时返回 `None`
pub fn remove_first_matching<F>(hand: &mut Vec<Card>, predicate: F) -> Option<Card>
where
    F: Fn(&Card) -> bool,
{
    let pos = hand.iter().position(predicate)?;
    Some(hand.remove(pos))
}

// --- 单元测试 ---

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::CardKind;

    fn cards(kinds: &[CardKind]) -> Vec<Card> {
        kinds.iter().map(|&k| Card::new(k)).collect()
    }

    #[test]
    fn test_draw_pops_from_tail() {
        let mut piles = CardPiles {
            deck: cards(&[CardKind::Rest, CardKind::Dodge]),
            discard: vec![],
        };
        let drawn = piles.draw();
        assert_eq!(drawn.card.map(|c| c.kind), Some(CardKind::Dodge));
        assert!(!drawn.reshuffled);
        assert_eq!(piles.deck.len(), 1);
    }

    #[test]
    fn test_draw_reshuffles_discard_when_deck_empty() {
        let mut piles = CardPiles {
            deck: vec![],
            discard: cards(&[CardKind::Rest, CardKind::Scratch, CardKind::MountTai]),
        };
        let drawn = piles.draw();
        assert!(drawn.card.is_some());
        assert!(drawn.reshuffled);
        // 弃牌堆被清空，剩下的两张在牌堆中
        assert!(piles.discard.is_empty());
        assert_eq!(piles.deck.len(), 2);
    }

    #[test]
    fn test_draw_with_everything_empty_is_noop() {
        let mut piles = CardPiles::default();
        let drawn = piles.draw();
        assert_eq!(drawn, Drawn { card: None, reshuffled: false });
        assert_eq!(piles.total(), 0);
    }

    #[test]
    fn test_fresh_piles() {
        let piles = CardPiles::fresh();
        assert_eq!(piles.deck.len(), 18);
        assert!(piles.discard.is_empty());
    }

    #[test]
    fn test_remove_first_matching_respects_hand_order() {
        let mut hand = cards(&[CardKind::Rest, CardKind::BasicHomework, CardKind::Dodge, CardKind::BasicHomework]);
        let second_homework_id = hand[3].id;
        let first_homework_id = hand[1].id;

        let removed = remove_first_matching(&mut hand, |c| c.kind == CardKind::BasicHomework);
        assert_eq!(removed.map(|c| c.id), Some(first_homework_id));
        assert_eq!(hand.len(), 3);
        assert_eq!(hand[2].id, second_homework_id);
    }

    #[test]
    fn test_remove_first_matching_without_match() {
        let mut hand = cards(&[CardKind::Rest, CardKind::Dodge]);
        assert!(remove_first_matching(&mut hand, |c| c.kind == CardKind::BasicHomework).is_none());
        assert_eq!(hand.len(), 2);
    }
}
