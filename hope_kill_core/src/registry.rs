use crate::error::RuleError;
use crate::state::{GameSession, GameSnapshot, PlayerId, RoomId, RoomSummary};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// 单个房间的对局，所有操作都在这把锁下串行执行
pub type SharedSession = Arc<Mutex<GameSession>>;

/// 所有活跃房间的目录：房间ID -> 对局
///
/// 显式构造后传给使用方（例如服务器的共享状态），不是全局单例。
/// 不同房间的操作互不影响，可以并行。
///
/// 重要‼️：严格规定使用锁的顺序，避免死锁：
/// sessions 分片锁 -> 单个房间的 Mutex。
/// 持有房间锁时不能再访问 `sessions`。
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<RoomId, SharedSession>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        SessionRegistry { sessions: DashMap::new() }
    }

    /// 创建房间；房间已存在时返回已有的对局
    pub fn create(&self, room_id: RoomId) -> SharedSession {
        self.sessions
            .entry(room_id)
            .or_insert_with(|| {
                info!("创建了新房间 {}", room_id);
                Arc::new(Mutex::new(GameSession::new(room_id)))
            })
            .clone()
    }

    /// 用随机ID创建一个空房间
    pub fn create_room(&self) -> RoomId {
        let room_id = Uuid::new_v4();
        self.create(room_id);
        room_id
    }

    pub fn get(&self, room_id: &RoomId) -> Option<SharedSession> {
        self.sessions.get(room_id).map(|s| s.clone())
    }

    pub fn remove(&self, room_id: &RoomId) -> bool {
        self.sessions.remove(room_id).is_some()
    }

    pub fn contains(&self, room_id: &RoomId) -> bool {
        self.sessions.contains_key(room_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// 在房间锁内执行操作
    pub fn with_session<R>(&self, room_id: &RoomId, f: impl FnOnce(&mut GameSession) -> R) -> Result<R, RuleError> {
        let session = self.get(room_id).ok_or(RuleError::RoomNotFound { room_id: *room_id })?;
        let mut guard = session.lock();
        Ok(f(&mut guard))
    }

    /// 玩家加入房间，房间不存在时先创建
    ///
    /// 加入在分片锁内完成，避免和最后一名玩家离开时的销毁交错。
    /// 加入失败且房间是刚创建的空房间时，房间会被移除。
    pub fn join(&self, room_id: RoomId, player_id: PlayerId, nickname: String) -> Result<GameSnapshot, RuleError> {
        let result = {
            let entry = self
                .sessions
                .entry(room_id)
                .or_insert_with(|| Arc::new(Mutex::new(GameSession::new(room_id))));
            let mut session = entry.lock();
            session.add_player(player_id, nickname).map(|_| session.snapshot())
        };
        if result.is_err() {
            self.sessions.remove_if(&room_id, |_, s| s.lock().is_empty());
        }
        if result.is_ok() {
            info!("玩家 {} 加入了房间 {}", player_id, room_id);
        }
        result
    }

    /// 玩家离开房间
    ///
    /// 房间变空时销毁对局并返回 `Ok(None)`，否则返回离开后的快照。
    pub fn leave(&self, room_id: &RoomId, player_id: PlayerId) -> Result<Option<GameSnapshot>, RuleError> {
        let snapshot = self.with_session(room_id, |session| {
            session.remove_player(player_id).map(|_| session.snapshot())
        })??;

        if self.sessions.remove_if(room_id, |_, s| s.lock().is_empty()).is_some() {
            info!("房间 {} 已空，已被移除", room_id);
            return Ok(None);
        }
        Ok(Some(snapshot))
    }

    /// 所有房间的概况，按房间ID排序
    pub fn list_rooms(&self) -> Vec<RoomSummary> {
        let mut rooms: Vec<RoomSummary> = self.sessions.iter().map(|entry| entry.value().lock().room_summary()).collect();
        rooms.sort_by_key(|r| r.room_id);
        rooms
    }
}

// --- 单元测试 ---
