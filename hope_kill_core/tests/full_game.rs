use hope_kill_core::*;
use uuid::Uuid;

fn seat_two() -> (GameSession, PlayerId, PlayerId) {
    let p1 = Uuid::new_v4();
    let p2 = Uuid::new_v4();
    let mut session = GameSession::new(Uuid::new_v4());
    session.add_player(p1, "小明".to_string()).unwrap();
    session.add_player(p2, "小红".to_string()).unwrap();
    (session, p1, p2)
}

fn set_hand(session: &mut GameSession, player_id: PlayerId, kinds: &[CardKind]) {
    // 换下的手牌放进弃牌堆，新手牌从牌堆、弃牌堆或其他玩家手中取，总牌数不变
    let old: Vec<Card> = session.player_mut(player_id).unwrap().hand.drain(..).collect();
    for card in old {
        session.piles.discard(card);
    }
    for &kind in kinds {
        let card = take_card(session, player_id, kind).unwrap_or_else(|| panic!("no {:?} left", kind));
        session.player_mut(player_id).unwrap().hand.push(card);
    }
}

fn take_card(session: &mut GameSession, player_id: PlayerId, kind: CardKind) -> Option<Card> {
    let piles = &mut session.piles;
    if let Some(i) = piles.deck.iter().position(|c| c.kind == kind) {
        return Some(piles.deck.remove(i));
    }
    if let Some(i) = piles.discard.iter().position(|c| c.kind == kind) {
        return Some(piles.discard.remove(i));
    }
    session
        .players
        .iter_mut()
        .filter(|p| p.id != player_id)
        .find_map(|p| p.hand.iter().position(|c| c.kind == kind).map(|i| p.hand.remove(i)))
}

#[test]
fn test_start_game_deals_and_opens_first_turn() {
    let (mut session, p1, p2) = seat_two();
    assert_eq!(session.start_game(), Ok(()));

    assert_eq!(session.phase, GamePhase::Playing);
    assert_eq!(session.current_turn, Some(p1));
    assert_eq!(session.player(p1).unwrap().hand.len(), INITIAL_HAND_SIZE + TURN_DRAW_COUNT);
    assert_eq!(session.player(p2).unwrap().hand.len(), INITIAL_HAND_SIZE);
    assert_eq!(session.piles.deck.len(), deck_size() - 10);
    assert_eq!(session.total_cards(), deck_size());
    assert_eq!(session.start_game(), Err(RuleError::GameAlreadyStarted));
}

#[test]
fn test_start_game_needs_two_players() {
    let mut session = GameSession::new(Uuid::new_v4());
    assert_eq!(session.start_game(), Err(RuleError::NotEnoughPlayers { present: 0 }));
    session.add_player(Uuid::new_v4(), "小明".to_string()).unwrap();
    assert_eq!(session.start_game(), Err(RuleError::NotEnoughPlayers { present: 1 }));
}

#[test]
fn test_scripted_game_until_victory() {
    let (mut session, p1, p2) = seat_two();
    session.start_game().unwrap();

    // 小明: 线性代数；小红: 一套卷子 + 驳回
    set_hand(&mut session, p1, &[CardKind::LinearAlgebra, CardKind::BasicHomework]);
    set_hand(&mut session, p2, &[CardKind::BasicHomework, CardKind::Dodge]);
    assert_eq!(session.total_cards(), deck_size());

    // 驳回不能取消线性代数，只能用一套卷子抵消
    assert_eq!(session.use_card(p1, 0, Some(p2)), Ok(PlayOutcome::AttackPending { target: p2 }));
    assert_eq!(session.use_card(p2, 1, None), Err(RuleError::DodgeCannotCancel));
    assert_eq!(session.use_card(p2, 0, Some(p1)), Ok(PlayOutcome::Countered { attacker: p1 }));
    assert!(!session.waiting_for_dodge());
    assert_eq!(session.player(p2).unwrap().sanity, MAX_SANITY);

    // 一套卷子被驳回
    assert_eq!(session.use_card(p1, 0, Some(p2)), Ok(PlayOutcome::AttackPending { target: p2 }));
    assert_eq!(session.use_card(p2, 0, None), Ok(PlayOutcome::Dodged { attacker: p1 }));
    assert_eq!(session.player(p2).unwrap().sanity, MAX_SANITY);

    let change = session.end_turn(p1).unwrap();
    assert_eq!(change.next, Some(p2));
    assert_eq!(session.current_turn, Some(p2));
    assert_eq!(session.total_cards(), deck_size());

    // 小红用泰山压顶逼到小明只剩1点
    set_hand(&mut session, p2, &[CardKind::MountTai]);
    session.player_mut(p1).unwrap().sanity = 3;
    session.use_card(p2, 0, Some(p1)).unwrap();
    let resolution = session.resolve_attack().unwrap();
    assert_eq!(resolution.effects, vec![Effect::Damage { target: p1, amount: 2, sanity: 1 }]);
    assert_eq!(resolution.outcome, None);
    session.end_turn(p2).unwrap();

    // 小明回合：恢复后用一套卷子，回合结束时强制结算
    set_hand(&mut session, p1, &[CardKind::Rest, CardKind::BasicHomework, CardKind::BasicHomework]);
    session.use_card(p1, 0, None).unwrap();
    assert_eq!(session.player(p1).unwrap().sanity, 2);
    session.player_mut(p2).unwrap().sanity = 1;
    session.use_card(p1, 0, Some(p2)).unwrap();
    assert_eq!(session.use_card(p1, 0, Some(p2)), Err(RuleError::InterruptWindowOpen));

    let change = session.end_turn(p1).unwrap();
    assert_eq!(change.next, None);
    assert_eq!(change.resolution.and_then(|r| r.outcome), Some(GameOutcome::Winner(p1)));
    assert_eq!(session.phase, GamePhase::Finished);
    assert_eq!(session.log.last().map(|e| e.message.as_str()), Some("游戏结束！小明 获胜！"));
    assert_eq!(session.total_cards(), deck_size());

    // 结束后的对局拒绝继续操作，但可以重新开始
    assert!(matches!(session.end_turn(p1), Err(RuleError::GameNotInProgress { .. })));
    assert_eq!(session.start_game(), Ok(()));
    assert_eq!(session.outcome, None);
    assert!(session.players.iter().all(|p| p.sanity == MAX_SANITY));
}

#[test]
fn test_leaving_mid_game_forfeits() {
    let (mut session, p1, p2) = seat_two();
    session.start_game().unwrap();
    let total = session.total_cards();

    session.remove_player(p2).unwrap();
    assert_eq!(session.phase, GamePhase::Finished);
    assert_eq!(session.outcome, Some(GameOutcome::Forfeit { winner: p1 }));
    // 离开玩家的手牌进入弃牌堆
    assert_eq!(session.total_cards(), total);
    assert_eq!(session.remove_player(p2), Err(RuleError::PlayerNotFound { player_id: p2 }));
}

#[test]
fn test_snapshot_serializes_to_json() {
    let (mut session, p1, _) = seat_two();
    session.start_game().unwrap();
    let json = serde_json::to_value(session.snapshot()).unwrap();

    assert_eq!(json["phase"], "Playing");
    assert_eq!(json["current_turn"], p1.to_string());
    assert_eq!(json["waiting_for_dodge"], false);
    assert_eq!(json["deck_count"], deck_size() - 10);
}
