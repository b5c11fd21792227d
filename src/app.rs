use anyhow::Result;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use crate::api;
use crate::browser;
use crate::config::{Config, RenderMode};
use crate::orchestrator::ReportOrchestrator;
use crate::render::{ChromiumRenderer, HttpRenderer, SourceRenderer};
use crate::services::{ImageryService, LlmService, ResearchService, StaticMapImagery};
use crate::utils::logging::log_startup;
use crate::workflow::{ReportFlow, StageTimeouts};

/// 应用主结构
pub struct App {
    config: Config,
    orchestrator: Arc<ReportOrchestrator>,
}

impl App {
    /// 初始化应用：准备渲染器、研究服务与编排器
    pub async fn initialize(config: Config) -> Result<Self> {
        log_startup(&config);

        let renderer: Arc<dyn SourceRenderer> = match config.render_mode {
            RenderMode::Chromium => {
                let browser = browser::open_browser(&config).await?;
                Arc::new(ChromiumRenderer::new(
                    Arc::new(browser),
                    config.allowed_hosts.clone(),
                    config.render_timeout(),
                ))
            }
            RenderMode::Http => Arc::new(HttpRenderer::new(
                config.allowed_hosts.clone(),
                config.render_timeout(),
            )?),
        };
        let research: Arc<dyn ResearchService> = Arc::new(LlmService::new(&config));
        let imagery: Arc<dyn ImageryService> =
            Arc::new(StaticMapImagery::new(config.imagery_api_key.clone()));

        let flow = ReportFlow::new(
            renderer,
            research,
            imagery,
            config.max_images,
            StageTimeouts::from_config(&config),
        );
        let orchestrator = Arc::new(ReportOrchestrator::new(
            flow,
            config.max_concurrent_reports,
            config.allowed_hosts.clone(),
            config.address_search_base.clone(),
            config.poll_interval_ms,
        ));

        Ok(Self {
            config,
            orchestrator,
        })
    }

    /// 启动 HTTP 服务，直到进程退出
    pub async fn run(self) -> Result<()> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        info!("✅ 服务已启动: http://{}", listener.local_addr()?);

        axum::serve(listener, api::router(self.orchestrator)).await?;
        Ok(())
    }
}
