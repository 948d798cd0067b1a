//! 可编辑的题目集合
//!
//! 封装"当前有哪些题、按什么顺序"这一信息。顺序即显示顺序，也是导出顺序。

use std::collections::HashSet;
use tracing::{debug, warn};

use crate::models::{FieldEdit, QuestionRecord};

/// 新建题目的 id 生成器
///
/// 生成 `new-<毫秒>-<序号>`，序号在会话内单调递增，同一毫秒内多次新建也不会重复。
#[derive(Debug, Default)]
pub struct IdGenerator {
    seq: u64,
}

impl IdGenerator {
    pub fn next_id(&mut self) -> String {
        self.seq += 1;
        format!("new-{}-{}", chrono::Utc::now().timestamp_millis(), self.seq)
    }
}

/// 题目集合
#[derive(Debug, Default)]
pub struct RecordStore {
    records: Vec<QuestionRecord>,
    ids: IdGenerator,
    /// 每次内容变化加一
    revision: u64,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 用解析结果整体替换当前集合
    ///
    /// 与前面记录 id 重复的记录会被丢弃。
    pub fn replace_all(&mut self, records: Vec<QuestionRecord>) {
        let mut seen = HashSet::with_capacity(records.len());
        let mut kept = Vec::with_capacity(records.len());
        for record in records {
            if seen.insert(record.id.clone()) {
                kept.push(record);
            } else {
                warn!("丢弃 id 重复的题目: {}", record.id);
            }
        }
        debug!("替换题目集合: {} -> {} 道", self.records.len(), kept.len());
        self.records = kept;
        self.revision += 1;
    }

    /// 修改一个字段
    ///
    /// # 返回
    /// id 不存在时返回 `false`，集合不变
    pub fn update(&mut self, id: &str, edit: FieldEdit) -> bool {
        match self.records.iter_mut().find(|r| r.id == id) {
            Some(record) => {
                record.apply(edit);
                self.revision += 1;
                true
            }
            None => false,
        }
    }

    /// 在末尾追加一道空白题目
    ///
    /// # 返回
    /// 新题目的 id
    pub fn add(&mut self) -> String {
        let id = self.ids.next_id();
        self.records.push(QuestionRecord::new_blank(id.clone()));
        self.revision += 1;
        id
    }

    /// 删除题目，其余题目保持相对顺序
    pub fn remove(&mut self, id: &str) -> bool {
        match self.position(id) {
            Some(idx) => {
                self.records.remove(idx);
                self.revision += 1;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: &str) -> Option<&QuestionRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn records(&self) -> &[QuestionRecord] {
        &self.records
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.records.iter().position(|r| r.id == id)
    }

    /// 显示行号（从 1 开始）对应的 id
    pub fn id_at(&self, row: usize) -> Option<&str> {
        row.checked_sub(1)
            .and_then(|idx| self.records.get(idx))
            .map(|r| r.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }
}
