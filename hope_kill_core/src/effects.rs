use crate::card::{Card, CardKind};
use crate::deck::remove_first_matching;
use crate::state::{GameSession, LogKind, PlayerId};
use serde::{Deserialize, Serialize};

/// 卡牌效果对对局状态造成的一项改变
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    Damage { target: PlayerId, amount: u32, sanity: u32 },
    Heal { target: PlayerId, amount: u32, sanity: u32 },
    /// 被效果弃掉的手牌，已经进入弃牌堆
    Discarded { player: PlayerId, card: Card },
    NothingToDiscard { player: PlayerId },
}

impl CardKind {
    /// 执行卡牌效果
    ///
    /// 攻击牌在结算时调用（此时卡牌已经在弃牌堆中），其余卡牌在打出时立即调用。
    /// 驳回的效果由闪避窗口处理，预留类别没有效果，两者都返回空列表。
    /// 调用前目标已经过合法性检查；缺少目标时效果不生效。
    pub fn apply(&self, session: &mut GameSession, actor: PlayerId, target: Option<PlayerId>) -> Vec<Effect> {
        let log_kind = if self.is_attack() { LogKind::AttackResolved } else { LogKind::CardUsed };
        let actor_name = session.display_name(actor);

        match self {
            CardKind::BasicHomework => {
                let Some(target) = target else { return vec![] };
                let effect = damage(session, target, 1);
                let message = format!(
                    "{} 的 {} 对 {} 造成了1点伤害",
                    actor_name,
                    self.name(),
                    session.display_name(target)
                );
                session.log.push(log_kind, message);
                effect.into_iter().collect()
            }
            CardKind::LinearAlgebra => {
                let enemies: Vec<PlayerId> = session.players.iter().map(|p| p.id).filter(|id| *id != actor).collect();
                let mut effects = Vec::new();
                for enemy in enemies {
                    let enemy_name = session.display_name(enemy);
                    let removed = session
                        .player_mut(enemy)
                        .and_then(|p| remove_first_matching(&mut p.hand, |c| c.kind == CardKind::BasicHomework));

                    match removed {
                        Some(card) => {
                            session.piles.discard(card.clone());
                            session.log.push(log_kind, format!("{} 弃掉了一张'一套卷子'", enemy_name));
                            effects.push(Effect::Discarded { player: enemy, card });
                        }
                        None => {
                            let old_sanity = session.player(enemy).map_or(0, |p| p.sanity);
                            effects.extend(damage(session, enemy, 1));
                            let new_sanity = session.player(enemy).map_or(0, |p| p.sanity);
                            session.log.push(
                                log_kind,
                                format!(
                                    "{} 没有'一套卷子'，受到1点伤害，san值从{}降至{}",
                                    enemy_name, old_sanity, new_sanity
                                ),
                            );
                        }
                    }
                }
                effects
            }
            CardKind::Settlement => {
                let Some(target) = target else { return vec![] };
                let homework_count = session.turn_usage.count(actor, CardKind::BasicHomework);
                let effect = damage(session, target, homework_count);
                session.log.push(
                    log_kind,
                    format!(
                        "{} 的 {} 对 {} 造成 {} 点伤害（本回合使用了 {} 张一套卷子）",
                        actor_name,
                        self.name(),
                        session.display_name(target),
                        homework_count,
                        homework_count
                    ),
                );
                effect.into_iter().collect()
            }
            CardKind::MountTai => {
                let Some(target) = target else { return vec![] };
                let attacker_sanity = session.player(actor).map_or(0, |p| p.sanity);
                let amount = mount_tai_damage(attacker_sanity);
                let effect = damage(session, target, amount);
                session.log.push(
                    log_kind,
                    format!(
                        "{} 的 {} 对 {} 造成了 {} 点伤害（基于攻击者san值 {}）",
                        actor_name,
                        self.name(),
                        session.display_name(target),
                        amount,
                        attacker_sanity
                    ),
                );
                effect.into_iter().collect()
            }
            CardKind::Exercise | CardKind::Rest | CardKind::Meditate => {
                let target = target.unwrap_or(actor);
                let Some(player) = session.player_mut(target) else { return vec![] };
                player.heal(1);
                let effect = Effect::Heal { target, amount: 1, sanity: player.sanity };
                let message = format!(
                    "{} 使用了 {}，为 {} 恢复1点san值",
                    actor_name,
                    self.name(),
                    session.display_name(target)
                );
                session.log.push(log_kind, message);
                vec![effect]
            }
            CardKind::Scratch => {
                let Some(target) = target else { return vec![] };
                let target_name = session.display_name(target);
                let Some(player) = session.player_mut(target) else { return vec![] };
                let effect = if player.hand.is_empty() {
                    session.log.push(
                        log_kind,
                        format!("{} 对 {} 使用了 {}，{} 没有手牌可弃", actor_name, target_name, self.name(), target_name),
                    );
                    Effect::NothingToDiscard { player: target }
                } else {
                    let card = player.hand.remove(0);
                    session.piles.discard(card.clone());
                    session.log.push(
                        log_kind,
                        format!("{} 对 {} 使用了 {}，弃掉了 {} 的一张手牌", actor_name, target_name, self.name(), target_name),
                    );
                    Effect::Discarded { player: target, card }
                };
                vec![effect]
            }
            CardKind::Dodge => vec![],
            CardKind::Event | CardKind::Equipment | CardKind::Status | CardKind::Time | CardKind::Magic => {
                session.log.push(log_kind, format!("{} 使用了 {}，没有效果", actor_name, self.name()));
                vec![]
            }
        }
    }
}

/// 泰山压顶的伤害：攻击者当前san值的一半（向下取整），至少为1
pub fn mount_tai_damage(attacker_sanity: u32) -> u32 {
    (attacker_sanity / 2).max(1)
}

fn damage(session: &mut GameSession, target: PlayerId, amount: u32) -> Option<Effect> {
    let player = session.player_mut(target)?;
    player.take_damage(amount);
    Some(Effect::Damage { target, amount, sanity: player.sanity })
}

// --- 单元测试 ---

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{duel, give};

    #[test]
    fn test_mount_tai_damage_formula() {
        assert_eq!(mount_tai_damage(7), 3);
        assert_eq!(mount_tai_damage(4), 2);
        assert_eq!(mount_tai_damage(1), 1);
        assert_eq!(mount_tai_damage(0), 1);
    }

    #[test]
    fn test_basic_homework_deals_one_damage() {
        let (mut session, p1, p2) = duel();
        let effects = CardKind::BasicHomework.apply(&mut session, p1, Some(p2));
        assert_eq!(effects, vec![Effect::Damage { target: p2, amount: 1, sanity: 3 }]);
        assert_eq!(session.log.last().map(|e| e.kind), Some(LogKind::AttackResolved));
    }

    #[test]
    fn test_linear_algebra_discards_homework_instead_of_damage() {
        let (mut session, p1, p2) = duel();
        give(&mut session, p2, &[CardKind::Rest, CardKind::BasicHomework, CardKind::BasicHomework]);

        let effects = CardKind::LinearAlgebra.apply(&mut session, p1, Some(p2));
        assert!(matches!(effects.as_slice(), [Effect::Discarded { player, card }] if *player == p2 && card.kind == CardKind::BasicHomework));

        let target = session.player(p2).unwrap();
        assert_eq!(target.sanity, 4);
        assert_eq!(target.count_in_hand(CardKind::BasicHomework), 1);
        assert_eq!(target.hand[0].kind, CardKind::Rest);
        // 被弃掉的牌进入弃牌堆
        assert_eq!(session.piles.discard.len(), 1);
    }

    #[test]
    fn test_linear_algebra_damages_without_homework() {
        let (mut session, p1, p2) = duel();
        give(&mut session, p2, &[CardKind::Dodge]);

        let effects = CardKind::LinearAlgebra.apply(&mut session, p1, Some(p2));
        assert_eq!(effects, vec![Effect::Damage { target: p2, amount: 1, sanity: 3 }]);
        assert_eq!(session.player(p2).unwrap().hand.len(), 1);
        // 攻击者自己不受影响
        assert_eq!(session.player(p1).unwrap().sanity, 4);
    }

    #[test]
    fn test_settlement_uses_homework_count() {
        let (mut session, p1, p2) = duel();
        let effects = CardKind::Settlement.apply(&mut session, p1, Some(p2));
        assert_eq!(effects, vec![Effect::Damage { target: p2, amount: 0, sanity: 4 }]);

        session.turn_usage.record(p1, CardKind::BasicHomework);
        CardKind::Settlement.apply(&mut session, p1, Some(p2));
        assert_eq!(session.player(p2).unwrap().sanity, 3);
    }

    #[test]
    fn test_mount_tai_uses_attacker_sanity() {
        let (mut session, p1, p2) = duel();
        session.player_mut(p1).unwrap().sanity = 1;
        CardKind::MountTai.apply(&mut session, p1, Some(p2));
        assert_eq!(session.player(p2).unwrap().sanity, 3);

        session.player_mut(p1).unwrap().sanity = 4;
        CardKind::MountTai.apply(&mut session, p1, Some(p2));
        assert_eq!(session.player(p2).unwrap().sanity, 1);
    }

    #[test]
    fn test_heal_defaults_to_self_and_respects_max() {
        let (mut session, p1, p2) = duel();
        session.player_mut(p1).unwrap().sanity = 2;

        CardKind::Meditate.apply(&mut session, p1, None);
        assert_eq!(session.player(p1).unwrap().sanity, 3);

        let effects = CardKind::Exercise.apply(&mut session, p1, Some(p2));
        assert_eq!(effects, vec![Effect::Heal { target: p2, amount: 1, sanity: 4 }]);
    }

    #[test]
    fn test_scratch_discards_first_card() {
        let (mut session, p1, p2) = duel();
        give(&mut session, p2, &[CardKind::Dodge, CardKind::MountTai]);

        let effects = CardKind::Scratch.apply(&mut session, p1, Some(p2));
        assert!(matches!(effects.as_slice(), [Effect::Discarded { card, .. }] if card.kind == CardKind::Dodge));
        assert_eq!(session.player(p2).unwrap().hand.len(), 1);
        assert_eq!(session.piles.discard.len(), 1);

        session.player_mut(p2).unwrap().hand.clear();
        let effects = CardKind::Scratch.apply(&mut session, p1, Some(p2));
        assert_eq!(effects, vec![Effect::NothingToDiscard { player: p2 }]);
    }

    #[test]
    fn test_reserved_cards_have_no_effect() {
        let (mut session, p1, p2) = duel();
        for kind in [CardKind::Event, CardKind::Equipment, CardKind::Status, CardKind::Time, CardKind::Magic] {
            assert!(kind.apply(&mut session, p1, Some(p2)).is_empty());
        }
        assert_eq!(session.player(p2).unwrap().sanity, 4);
    }
}
