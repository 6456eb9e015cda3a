use std::collections::VecDeque;

use super::Event;

/// 先進先出事件佇列
///
/// 不做優先級重排，事件嚴格按到達順序取出。只在回測主循環內單線程使用。
#[derive(Debug, Default)]
pub struct EventQueue {
    events: VecDeque<Event>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加事件到佇列尾部
    pub fn push(&mut self, event: impl Into<Event>) {
        self.events.push_back(event.into());
    }

    /// 取出佇列頭部事件，佇列為空時返回 None
    pub fn pop(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    /// 查看佇列頭部事件
    pub fn peek(&self) -> Option<&Event> {
        self.events.front()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
