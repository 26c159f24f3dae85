//! In-memory execution history.
//!
//! Records are kept in a ring buffer; when full, the oldest record is
//! dropped. Success-rate counters cover every execution ever appended, not
//! just the retained window.

use std::collections::VecDeque;

use crate::models::{ExecutionStatus, HistoryPage, HistoryStats, WorkflowExecution};

#[derive(Debug)]
pub struct ExecutionHistory {
    records: VecDeque<WorkflowExecution>,
    /// `0` means unbounded
    capacity: usize,
    completed: u64,
    failed: u64,
}

impl ExecutionHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: VecDeque::new(),
            capacity,
            completed: 0,
            failed: 0,
        }
    }

    pub fn append(&mut self, record: WorkflowExecution) {
        match record.status {
            ExecutionStatus::Completed => self.completed += 1,
            ExecutionStatus::Failed => self.failed += 1,
        }
        if self.capacity > 0 && self.records.len() >= self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    /// The most recent `limit` records, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<WorkflowExecution> {
        let skip = self.records.len().saturating_sub(limit);
        self.records.iter().skip(skip).cloned().collect()
    }

    pub fn get(&self, id: &str) -> Option<&WorkflowExecution> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn stats(&self) -> HistoryStats {
        let total = self.completed + self.failed;
        HistoryStats {
            total_executions: total,
            successful_executions: self.completed,
            failed_executions: self.failed,
            success_rate: if total == 0 {
                0.0
            } else {
                self.completed as f64 / total as f64
            },
        }
    }

    pub fn page(&self, limit: usize) -> HistoryPage {
        let stats = self.stats();
        HistoryPage {
            workflows: self.recent(limit),
            total_executions: stats.total_executions,
            success_rate: stats.success_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WorkflowTemplate;

    fn record(id: &str, status: ExecutionStatus) -> WorkflowExecution {
        WorkflowExecution {
            id: id.to_string(),
            name: "fraud_detection".to_string(),
            template: WorkflowTemplate::new("fraud_detection", "F", "", &["fraud_agent"], &[]),
            user_id: None,
            parameters: serde_json::Map::new(),
            results: Vec::new(),
            summary: None,
            status,
            started_at: chrono::Utc::now(),
            duration_ms: 0,
            error: None,
        }
    }

    #[test]
    fn test_empty_history_has_zero_success_rate() {
        let history = ExecutionHistory::new(10);
        let stats = history.stats();
        assert_eq!(stats.total_executions, 0);
        assert_eq!(stats.success_rate, 0.0);
    }

    #[test]
    fn test_success_rate() {
        let mut history = ExecutionHistory::new(10);
        for i in 0..3 {
            history.append(record(&format!("ok-{}", i), ExecutionStatus::Completed));
        }
        history.append(record("bad", ExecutionStatus::Failed));
        assert_eq!(history.stats().success_rate, 0.75);
        assert_eq!(history.page(2).workflows.len(), 2);
    }

    #[test]
    fn test_ring_buffer_evicts_oldest_but_keeps_counters() {
        let mut history = ExecutionHistory::new(2);
        history.append(record("a", ExecutionStatus::Completed));
        history.append(record("b", ExecutionStatus::Failed));
        history.append(record("c", ExecutionStatus::Completed));

        assert_eq!(history.len(), 2);
        assert!(history.get("a").is_none());
        let ids: Vec<String> = history.recent(10).into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["b", "c"]);
        assert_eq!(history.stats().total_executions, 3);
    }

    #[test]
    fn test_zero_capacity_is_unbounded() {
        let mut history = ExecutionHistory::new(0);
        for i in 0..50 {
            history.append(record(&i.to_string(), ExecutionStatus::Completed));
        }
        assert_eq!(history.len(), 50);
    }
}
