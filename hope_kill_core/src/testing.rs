//! 单元测试共用的对局构造函数

use crate::card::{Card, CardKind};
use crate::state::{GamePhase, GameSession, Player, PlayerId, RoomId};
use uuid::Uuid;

/// 构造一局正在进行的双人对局：手牌、牌堆、弃牌堆都为空，先加入的玩家行动
pub(crate) fn duel() -> (GameSession, PlayerId, PlayerId) {
    let p1 = Uuid::new_v4();
    let p2 = Uuid::new_v4();
    let mut session = GameSession::new(RoomId::new_v4());
    session.players.push(Player::new(p1, "小明".to_string()));
    session.players.push(Player::new(p2, "小红".to_string()));
    session.phase = GamePhase::Playing;
    session.current_turn = Some(p1);
    (session, p1, p2)
}

/// 按顺序把指定种类的牌加到玩家手牌末尾
pub(crate) fn give(session: &mut GameSession, player_id: PlayerId, kinds: &[CardKind]) {
    let player = session.player_mut(player_id).expect("player must be seated");
    player.hand.extend(kinds.iter().map(|&k| Card::new(k)));
}

/// 按顺序把指定种类的牌放进牌堆（最后一张在堆顶）
pub(crate) fn stack_deck(session: &mut GameSession, kinds: &[CardKind]) {
    session.piles.deck = kinds.iter().map(|&k| Card::new(k)).collect();
}
