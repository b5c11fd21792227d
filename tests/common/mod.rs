//! 集成测试共用的假协作方与样例页面

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use url::Url;
use uuid::Uuid;

use listing_report::error::{AnalysisError, AppError, AppResult};
use listing_report::models::{
    ComparableProperty, Contractor, PropertyRecord, RenovationProject, RenovationSuggestion,
    Report,
};
use listing_report::render::{RenderedDocument, SourceRenderer};
use listing_report::services::{ImageryService, RenovationAnalysis, ResearchService};
use listing_report::{ReportFlow, ReportOrchestrator, StageTimeouts};

pub const LISTING_URL: &str = "https://www.zillow.com/homedetails/123-Main-St/1_zpid/";

pub fn allowed_hosts() -> Vec<String> {
    vec!["www.zillow.com".to_string(), "www.redfin.com".to_string()]
}

/// 内嵌状态给出 450000，meta 标签给出另一个价格
pub const LISTING_HTML: &str = r#"<html><head>
<title>123 Main St, Seattle, WA 98101 | Zillow</title>
<meta name="twitter:text:price" content="$999,000">
<meta property="og:image" content="https://photos.zillowstatic.com/fp/og.jpg">
</head><body>
<table><tr><th>Year Built</th><td>1985</td></tr></table>
</body></html>"#;

pub const LISTING_STATE: &str = r#"window.__INITIAL_STATE__ = {"listing":{"data":{"streetAddress":"123 Main St","city":"Seattle","state":"WA","zipcode":"98101","price":450000,"bedrooms":3,"bathrooms":2,"livingArea":1800}}};"#;

/// 有地址、没有任何价格
pub const NO_PRICE_HTML: &str = r#"<html><head>
<meta name="twitter:text:street_address" content="77 Pine Ave">
<meta property="og:locality" content="Portland">
</head><body><p>Contact agent for details</p></body></html>"#;

pub struct FakeRenderer {
    html: String,
    payloads: Vec<String>,
    delay: Option<Duration>,
    pub calls: AtomicUsize,
}

impl FakeRenderer {
    pub fn new(html: &str, payloads: Vec<String>) -> Self {
        Self {
            html: html.to_string(),
            payloads,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// 渲染前先等待一段时间
    pub fn slow(html: &str, payloads: Vec<String>, delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::new(html, payloads)
        }
    }

    pub fn listing() -> Self {
        Self::new(LISTING_HTML, vec![LISTING_STATE.to_string()])
    }
}

#[async_trait]
impl SourceRenderer for FakeRenderer {
    async fn render(&self, url: &Url) -> AppResult<RenderedDocument> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let mut doc = RenderedDocument::new(url.as_str(), self.html.clone());
        doc.state_payloads = self.payloads.clone();
        Ok(doc)
    }
}

pub fn sample_projects() -> Vec<RenovationProject> {
    vec![
        RenovationProject {
            id: "proj-1".to_string(),
            name: "Kitchen remodel".to_string(),
            description: Some("Open up the kitchen".to_string()),
            cost_range_low: 20000,
            cost_range_high: 30000,
            value_add: 40000,
            timeline: Some("6-8 weeks".to_string()),
            market_demand: Some("high".to_string()),
            buyer_profile: Some("young families".to_string()),
        },
        RenovationProject {
            id: "proj-2".to_string(),
            name: "Roof replacement".to_string(),
            description: None,
            cost_range_low: 10000,
            cost_range_high: 10000,
            value_add: 11000,
            timeline: None,
            market_demand: None,
            buyer_profile: None,
        },
    ]
}

#[derive(Default)]
pub struct FakeResearch {
    pub projects: Vec<RenovationProject>,
    /// 设置后，翻新分析会等到被放行才返回
    pub gate: Option<Arc<Notify>>,
    pub analysis_delay: Option<Duration>,
    pub suggestions: Vec<RenovationSuggestion>,
    /// 可比房源查询返回服务错误
    pub fail_comparables: bool,
    /// 可比房源查询直接 panic
    pub panic_comparables: bool,
    pub contractor_calls: AtomicUsize,
    pub contractor_project: std::sync::Mutex<Option<String>>,
}

impl FakeResearch {
    pub fn with_projects(projects: Vec<RenovationProject>) -> Self {
        Self {
            projects,
            ..Default::default()
        }
    }
}

#[async_trait]
impl ResearchService for FakeResearch {
    async fn analyze_renovations(&self, _property: &PropertyRecord) -> AppResult<RenovationAnalysis> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if let Some(delay) = self.analysis_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(RenovationAnalysis {
            projects: self.projects.clone(),
            market_summary: Some("Steady demand in the neighborhood".to_string()),
            additional_suggestions: self.suggestions.clone(),
        })
    }

    async fn find_comparables(&self, property: &PropertyRecord) -> AppResult<Vec<ComparableProperty>> {
        if self.panic_comparables {
            panic!("comparables lookup blew up");
        }
        if self.fail_comparables {
            return Err(AppError::llm_failed("fake-model", "service unavailable"));
        }
        Ok(vec![ComparableProperty {
            address: format!("near {}", property.address),
            sale_price: Some(470000),
            price_per_sqft: Some(261.0),
            summary: None,
            url: None,
        }])
    }

    async fn find_contractors(&self, project_name: &str, _address: &str) -> AppResult<Vec<Contractor>> {
        self.contractor_calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut slot) = self.contractor_project.lock() {
            *slot = Some(project_name.to_string());
        }
        Ok(vec![Contractor {
            name: "Acme Builders".to_string(),
            specialty: Some(project_name.to_string()),
            contact_info: None,
            url: None,
        }])
    }
}

pub struct FakeImagery {
    pub fail: bool,
}

#[async_trait]
impl ImageryService for FakeImagery {
    async fn imagery_for(&self, address: &str) -> AppResult<Vec<String>> {
        if self.fail {
            Err(AppError::Analysis(AnalysisError::Imagery("quota exceeded".to_string())))
        } else {
            Ok(vec![format!("https://maps.example.com/static?center={}", address.len())])
        }
    }
}

pub fn fast_timeouts() -> StageTimeouts {
    StageTimeouts {
        render: Duration::from_secs(5),
        analysis: Duration::from_secs(5),
        lookup: Duration::from_secs(5),
        imagery: Duration::from_secs(5),
    }
}

pub fn orchestrator(
    renderer: Arc<FakeRenderer>,
    research: Arc<FakeResearch>,
    imagery: Arc<FakeImagery>,
    timeouts: StageTimeouts,
) -> Arc<ReportOrchestrator> {
    let flow = ReportFlow::new(renderer, research, imagery, 20, timeouts);
    Arc::new(ReportOrchestrator::new(
        flow,
        4,
        allowed_hosts(),
        "https://www.zillow.com/homes/",
        1000,
    ))
}

/// 轮询直到报告进入终态
pub async fn wait_for_terminal(orchestrator: &ReportOrchestrator, id: Uuid) -> Report {
    for _ in 0..500 {
        if let Some(report) = orchestrator.query(id).await {
            if report.status.is_terminal() {
                return report;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("报告 {} 未在预期时间内结束", id);
}

/// 轮询直到满足条件
pub async fn wait_until<F>(orchestrator: &ReportOrchestrator, id: Uuid, pred: F) -> Report
where
    F: Fn(&Report) -> bool,
{
    for _ in 0..500 {
        if let Some(report) = orchestrator.query(id).await {
            if pred(&report) {
                return report;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("报告 {} 未达到预期状态", id);
}
