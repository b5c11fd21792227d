//! 报告存储
//!
//! 以报告 id 为键的显式存储，由编排层持有并传给流程层。
//! 读取返回快照，写入通过闭包在锁内完成。

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::Report;

#[derive(Clone, Default)]
pub struct ReportStore {
    reports: Arc<RwLock<HashMap<Uuid, Report>>>,
}

impl ReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, report: Report) {
        self.reports.write().await.insert(report.id, report);
    }

    /// 报告快照；不存在时返回 `None`
    pub async fn get(&self, id: Uuid) -> Option<Report> {
        self.reports.read().await.get(&id).cloned()
    }

    /// 在写锁内修改报告
    ///
    /// 闭包返回错误时报告保持修改前的样子。
    pub async fn update<T, F>(&self, id: Uuid, f: F) -> AppResult<T>
    where
        F: FnOnce(&mut Report) -> AppResult<T>,
    {
        let mut reports = self.reports.write().await;
        let report = reports
            .get_mut(&id)
            .ok_or_else(|| AppError::Internal(format!("报告 {} 不存在", id)))?;

        let mut draft = report.clone();
        let value = f(&mut draft)?;
        *report = draft;
        Ok(value)
    }

    pub async fn len(&self) -> usize {
        self.reports.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReportStatus;

    #[tokio::test]
    async fn test_insert_get_update() {
        let store = ReportStore::new();
        let report = Report::new("https://www.zillow.com/x");
        let id = report.id;
        store.insert(report).await;

        store
            .update(id, |r| r.transition_to(ReportStatus::Processing))
            .await
            .unwrap();
        assert_eq!(store.get(id).await.unwrap().status, ReportStatus::Processing);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_failed_update_leaves_report_untouched() {
        let store = ReportStore::new();
        let report = Report::new("https://www.zillow.com/x");
        let id = report.id;
        store.insert(report).await;
        let before = store.get(id).await.unwrap();

        let result = store
            .update(id, |r| {
                r.transition_to(ReportStatus::Processing)?;
                r.transition_to(ReportStatus::Pending)
            })
            .await;
        assert!(result.is_err());
        assert_eq!(store.get(id).await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_unknown_id() {
        let store = ReportStore::new();
        assert!(store.get(Uuid::new_v4()).await.is_none());
        assert!(store.update(Uuid::new_v4(), |_| Ok(())).await.is_err());
    }
}
