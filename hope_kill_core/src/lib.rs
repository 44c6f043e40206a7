//! # 希望杀核心逻辑库
//!
//! 这个 `core` crate 包含了双人卡牌对战"希望杀"的全部规则：
//! 卡牌与牌堆、回合与闪避窗口、卡牌效果、胜负判定，
//! 以及房间目录和客户端-服务器通信消息的定义。
//! 它不依赖任何网络或界面实现，服务器和客户端都直接复用它。

mod card;
mod deck;
mod effects;
mod error;
mod logic;
mod message;
mod registry;
mod state;
mod turn;

#[cfg(test)]
mod testing;

pub use card::*;

pub use deck::*;

pub use effects::*;

pub use error::*;

pub use logic::*;

pub use message::*;

pub use registry::*;

pub use state::*;

pub use turn::*;
