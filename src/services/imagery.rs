//! 地图 / 街景图片
//!
//! 图片只是锦上添花：失败或超时时流程记录警告并跳过，报告照常完成。

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::error::{AnalysisError, AppError, AppResult};

const STATIC_MAP_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/staticmap";
const STREET_VIEW_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/streetview";
const STREET_VIEW_METADATA_ENDPOINT: &str =
    "https://maps.googleapis.com/maps/api/streetview/metadata";

/// 图片服务
#[async_trait]
pub trait ImageryService: Send + Sync {
    /// 地址对应的图片 URL 列表
    async fn imagery_for(&self, address: &str) -> AppResult<Vec<String>>;
}

/// 静态地图 + 街景（Google Maps 接口）
pub struct StaticMapImagery {
    client: Client,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreetViewMetadata {
    status: String,
}

impl StaticMapImagery {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    fn build_url(endpoint: &str, params: &[(&str, &str)]) -> AppResult<String> {
        let url = Url::parse_with_params(endpoint, params)
            .map_err(|e| AppError::Analysis(AnalysisError::Imagery(e.to_string())))?;
        Ok(url.to_string())
    }

    pub fn static_map_url(address: &str, key: &str) -> AppResult<String> {
        Self::build_url(
            STATIC_MAP_ENDPOINT,
            &[
                ("center", address),
                ("zoom", "17"),
                ("size", "640x400"),
                ("markers", address),
                ("key", key),
            ],
        )
    }

    pub fn street_view_url(address: &str, key: &str) -> AppResult<String> {
        Self::build_url(
            STREET_VIEW_ENDPOINT,
            &[("location", address), ("size", "640x400"), ("key", key)],
        )
    }
}

#[async_trait]
impl ImageryService for StaticMapImagery {
    async fn imagery_for(&self, address: &str) -> AppResult<Vec<String>> {
        let key = self.api_key.as_deref().ok_or_else(|| {
            AppError::Analysis(AnalysisError::Imagery("no imagery API key configured".to_string()))
        })?;

        let mut urls = vec![Self::static_map_url(address, key)?];

        // 只有街景确实存在时才附上街景图
        let metadata_url = Self::build_url(
            STREET_VIEW_METADATA_ENDPOINT,
            &[("location", address), ("key", key)],
        )?;
        let metadata: StreetViewMetadata = self
            .client
            .get(metadata_url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::Analysis(AnalysisError::Imagery(e.to_string())))?
            .json()
            .await
            .map_err(|e| AppError::Analysis(AnalysisError::Imagery(e.to_string())))?;

        debug!("街景元数据状态: {}", metadata.status);
        if metadata.status == "OK" {
            urls.push(Self::street_view_url(address, key)?);
        }

        Ok(urls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_are_encoded() {
        let url = StaticMapImagery::static_map_url("123 Main St, Seattle, WA", "k").unwrap();
        assert!(url.starts_with(STATIC_MAP_ENDPOINT));
        assert!(url.contains("center=123+Main+St%2C+Seattle%2C+WA"));
        assert!(url.contains("key=k"));
    }

    #[tokio::test]
    async fn test_missing_key_is_an_imagery_error() {
        let service = StaticMapImagery::new(Some("  ".to_string()));
        let err = service.imagery_for("1 A St").await.unwrap_err();
        assert!(matches!(err, AppError::Analysis(AnalysisError::Imagery(_))));
    }
}
