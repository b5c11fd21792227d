mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio_test::{assert_err, assert_ok};

use common::*;
use listing_report::models::{
    Field, Provenance, RenovationProject, RenovationSuggestion, ReportStatus, Stage, Submission,
};
use listing_report::AppError;

#[tokio::test]
async fn test_report_fills_in_stage_by_stage() {
    let gate = Arc::new(Notify::new());
    let research = Arc::new(FakeResearch {
        projects: sample_projects(),
        gate: Some(gate.clone()),
        suggestions: vec![RenovationSuggestion {
            name: "Fresh exterior paint".to_string(),
            description: None,
            reason: Some("Curb appeal".to_string()),
        }],
        ..Default::default()
    });
    let orch = orchestrator(
        Arc::new(FakeRenderer::listing()),
        research.clone(),
        Arc::new(FakeImagery { fail: false }),
        fast_timeouts(),
    );

    let accepted = assert_ok!(orch.submit(Submission::from_url(LISTING_URL)).await);
    assert_eq!(accepted.status, ReportStatus::Pending);
    assert_eq!(accepted.poll_interval_ms, 1000);

    // 翻新分析被卡住时，房源数据已经可见
    let partial = wait_until(&orch, accepted.report_id, |r| r.property_data.is_some()).await;
    assert_eq!(partial.status, ReportStatus::Processing);
    assert!(partial.renovation_projects.is_none());
    assert!(partial.financial_summary.is_none());
    assert!(partial.completed_at.is_none());

    gate.notify_one();
    let report = wait_for_terminal(&orch, accepted.report_id).await;

    assert_eq!(report.status, ReportStatus::Completed, "{:?}", report.failure_reason);
    assert!(report.completed_at.is_some());
    assert!(report.current_stage.is_none());
    assert!(report.failure_reason.is_none());

    let property = report.property_data.as_ref().unwrap();
    assert!(property.address.starts_with("123 Main St"));
    assert_eq!(property.price, 450000);
    assert_eq!(property.year_built, Some(1985));
    assert_eq!(property.source.as_deref(), Some("zillow"));
    assert_eq!(report.imagery.as_ref().map(|i| i.len()), Some(1));

    assert_eq!(report.renovation_projects.as_ref().map(|p| p.len()), Some(2));
    let summary = report.financial_summary.as_ref().unwrap();
    // ROI: 60% 和 10%
    assert_eq!(summary.opportunity_score, Some(35));
    assert_eq!(summary.projected_value, 450000 + 51000);
    let insights = &summary.quick_insights;
    assert_eq!(insights.top_opportunities[0].project_id, "proj-1");
    assert_eq!(insights.estimated_budget, 35000.0);
    assert_eq!(insights.potential_value_add, 51000);
    assert_eq!(insights.potential_score, Some(4.4));
    assert_eq!(
        report.additional_suggestions.as_ref().map(|s| s[0].name.as_str()),
        Some("Fresh exterior paint")
    );
    let project = &report.renovation_projects.as_ref().unwrap()[0];
    assert_eq!(project.market_demand.as_deref(), Some("high"));

    assert_eq!(report.comparable_properties.as_ref().map(|c| c.len()), Some(1));
    assert_eq!(report.contractors.as_ref().map(|c| c.len()), Some(1));
    assert_eq!(
        research.contractor_project.lock().unwrap().as_deref(),
        Some("Kitchen remodel")
    );
}

#[tokio::test]
async fn test_embedded_state_wins_over_meta() {
    let orch = orchestrator(
        Arc::new(FakeRenderer::listing()),
        Arc::new(FakeResearch::with_projects(sample_projects())),
        Arc::new(FakeImagery { fail: false }),
        fast_timeouts(),
    );

    let accepted = assert_ok!(orch.submit(Submission::from_url(LISTING_URL)).await);
    let report = wait_for_terminal(&orch, accepted.report_id).await;
    let property = report.property_data.unwrap();

    assert_eq!(property.price, 450000);
    assert_eq!(property.provenance_of(Field::Price), Some(Provenance::EmbeddedState));
    assert_eq!(property.provenance_of(Field::YearBuilt), Some(Provenance::Table));
}

#[tokio::test]
async fn test_missing_price_fails_without_property_data() {
    let research = Arc::new(FakeResearch::with_projects(sample_projects()));
    let orch = orchestrator(
        Arc::new(FakeRenderer::new(NO_PRICE_HTML, vec![])),
        research.clone(),
        Arc::new(FakeImagery { fail: false }),
        fast_timeouts(),
    );

    let accepted = assert_ok!(orch.submit(Submission::from_url(LISTING_URL)).await);
    let report = wait_for_terminal(&orch, accepted.report_id).await;

    assert_eq!(report.status, ReportStatus::Failed);
    let reason = report.failure_reason.unwrap();
    assert!(reason.contains("price"), "{}", reason);
    assert!(report.property_data.is_none());
    assert!(report.renovation_projects.is_none());
    assert!(report.completed_at.is_none());
    assert_eq!(research.contractor_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_analysis_timeout_fails_report() {
    let research = Arc::new(FakeResearch {
        projects: sample_projects(),
        analysis_delay: Some(Duration::from_secs(30)),
        ..Default::default()
    });
    let mut timeouts = fast_timeouts();
    timeouts.analysis = Duration::from_millis(50);
    let orch = orchestrator(
        Arc::new(FakeRenderer::listing()),
        research,
        Arc::new(FakeImagery { fail: false }),
        timeouts,
    );

    let accepted = assert_ok!(orch.submit(Submission::from_url(LISTING_URL)).await);
    let report = wait_for_terminal(&orch, accepted.report_id).await;

    assert_eq!(report.status, ReportStatus::Failed);
    let reason = report.failure_reason.unwrap();
    assert!(reason.contains(&Stage::RenovationAnalysis.to_string()), "{}", reason);
    assert!(reason.contains("timed out"), "{}", reason);
    // 已完成阶段的结果保留
    assert!(report.property_data.is_some());
    assert!(report.renovation_projects.is_none());
    assert!(report.financial_summary.is_none());
}

#[tokio::test]
async fn test_imagery_failure_does_not_fail_report() {
    let orch = orchestrator(
        Arc::new(FakeRenderer::listing()),
        Arc::new(FakeResearch::with_projects(sample_projects())),
        Arc::new(FakeImagery { fail: true }),
        fast_timeouts(),
    );

    let accepted = assert_ok!(orch.submit(Submission::from_url(LISTING_URL)).await);
    let report = wait_for_terminal(&orch, accepted.report_id).await;

    assert_eq!(report.status, ReportStatus::Completed);
    assert!(report.imagery.is_none());
    assert!(report.property_data.is_some());
}

#[tokio::test]
async fn test_no_projects_skips_contractor_lookup() {
    let research = Arc::new(FakeResearch::with_projects(vec![]));
    let orch = orchestrator(
        Arc::new(FakeRenderer::listing()),
        research.clone(),
        Arc::new(FakeImagery { fail: false }),
        fast_timeouts(),
    );

    let accepted = assert_ok!(orch.submit(Submission::from_url(LISTING_URL)).await);
    let report = wait_for_terminal(&orch, accepted.report_id).await;

    assert_eq!(report.status, ReportStatus::Completed);
    assert_eq!(report.financial_summary.unwrap().opportunity_score, None);
    assert_eq!(report.contractors, Some(vec![]));
    assert_eq!(research.contractor_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_disallowed_host_is_rejected_before_fetch() {
    let renderer = Arc::new(FakeRenderer::listing());
    let orch = orchestrator(
        renderer.clone(),
        Arc::new(FakeResearch::default()),
        Arc::new(FakeImagery { fail: false }),
        fast_timeouts(),
    );

    let err = assert_err!(
        orch.submit(Submission::from_url("http://169.254.169.254/latest/meta-data"))
            .await
    );
    assert!(matches!(err, AppError::Validation(_)));

    let err = assert_err!(orch.submit(Submission::default()).await);
    assert!(matches!(err, AppError::Validation(_)));

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(orch.store().is_empty().await);
    assert_eq!(renderer.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_address_submission_is_rendered() {
    let renderer = Arc::new(FakeRenderer::listing());
    let orch = orchestrator(
        renderer.clone(),
        Arc::new(FakeResearch::with_projects(sample_projects())),
        Arc::new(FakeImagery { fail: false }),
        fast_timeouts(),
    );

    let accepted = assert_ok!(
        orch.submit(Submission::from_address("123 Main St, Seattle, WA"))
            .await
    );
    let report = wait_for_terminal(&orch, accepted.report_id).await;

    assert!(report.source_url.starts_with("https://www.zillow.com/homes/"));
    assert_eq!(report.status, ReportStatus::Completed);
    assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_terminal_report_queries_are_identical() {
    let orch = orchestrator(
        Arc::new(FakeRenderer::listing()),
        Arc::new(FakeResearch::with_projects(sample_projects())),
        Arc::new(FakeImagery { fail: false }),
        fast_timeouts(),
    );

    let accepted = assert_ok!(orch.submit(Submission::from_url(LISTING_URL)).await);
    wait_for_terminal(&orch, accepted.report_id).await;

    let first = serde_json::to_string(&orch.query(accepted.report_id).await.unwrap()).unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    let second = serde_json::to_string(&orch.query(accepted.report_id).await.unwrap()).unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_unknown_report_is_none() {
    let orch = orchestrator(
        Arc::new(FakeRenderer::listing()),
        Arc::new(FakeResearch::default()),
        Arc::new(FakeImagery { fail: false }),
        fast_timeouts(),
    );
    assert!(orch.query(uuid::Uuid::new_v4()).await.is_none());
}

#[tokio::test]
async fn test_comparables_error_keeps_earlier_results() {
    let research = Arc::new(FakeResearch {
        projects: sample_projects(),
        fail_comparables: true,
        ..Default::default()
    });
    let orch = orchestrator(
        Arc::new(FakeRenderer::listing()),
        research.clone(),
        Arc::new(FakeImagery { fail: false }),
        fast_timeouts(),
    );

    let accepted = assert_ok!(orch.submit(Submission::from_url(LISTING_URL)).await);
    let report = wait_for_terminal(&orch, accepted.report_id).await;

    assert_eq!(report.status, ReportStatus::Failed);
    let reason = report.failure_reason.as_deref().unwrap();
    assert!(reason.contains("research service error"), "{}", reason);
    assert!(report.property_data.is_some());
    assert!(report.renovation_projects.is_some());
    assert!(report.financial_summary.is_some());
    assert!(report.comparable_properties.is_none());
    assert!(report.contractors.is_none());
    assert!(report.completed_at.is_none());
    assert_eq!(research.contractor_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_render_timeout_fails_report() {
    let renderer = Arc::new(FakeRenderer::slow(
        LISTING_HTML,
        vec![LISTING_STATE.to_string()],
        Duration::from_secs(30),
    ));
    let mut timeouts = fast_timeouts();
    timeouts.render = Duration::from_millis(50);
    let orch = orchestrator(
        renderer,
        Arc::new(FakeResearch::with_projects(sample_projects())),
        Arc::new(FakeImagery { fail: false }),
        timeouts,
    );

    let accepted = assert_ok!(orch.submit(Submission::from_url(LISTING_URL)).await);
    let report = wait_for_terminal(&orch, accepted.report_id).await;

    assert_eq!(report.status, ReportStatus::Failed);
    let reason = report.failure_reason.as_deref().unwrap();
    assert!(reason.contains("extraction timed out"), "{}", reason);
    assert!(report.property_data.is_none());
    assert!(report.renovation_projects.is_none());
}

#[tokio::test]
async fn test_out_of_range_financials_fail_report() {
    let huge = RenovationProject {
        id: "proj-huge".to_string(),
        name: "Add a wing".to_string(),
        description: None,
        cost_range_low: i64::MAX,
        cost_range_high: i64::MAX,
        value_add: i64::MAX,
        timeline: None,
        market_demand: None,
        buyer_profile: None,
    };
    let orch = orchestrator(
        Arc::new(FakeRenderer::listing()),
        Arc::new(FakeResearch::with_projects(vec![huge])),
        Arc::new(FakeImagery { fail: false }),
        fast_timeouts(),
    );

    let accepted = assert_ok!(orch.submit(Submission::from_url(LISTING_URL)).await);
    let report = wait_for_terminal(&orch, accepted.report_id).await;

    assert_eq!(report.status, ReportStatus::Failed);
    let reason = report.failure_reason.as_deref().unwrap();
    assert!(reason.contains("financials"), "{}", reason);
    assert!(reason.contains("out of range"), "{}", reason);
    assert!(report.renovation_projects.is_some());
    assert!(report.financial_summary.is_none());
}

#[tokio::test]
async fn test_panicking_collaborator_fails_report() {
    let research = Arc::new(FakeResearch {
        projects: sample_projects(),
        panic_comparables: true,
        ..Default::default()
    });
    let orch = orchestrator(
        Arc::new(FakeRenderer::listing()),
        research,
        Arc::new(FakeImagery { fail: false }),
        fast_timeouts(),
    );

    let accepted = assert_ok!(orch.submit(Submission::from_url(LISTING_URL)).await);
    let report = wait_for_terminal(&orch, accepted.report_id).await;

    assert_eq!(report.status, ReportStatus::Failed);
    let reason = report.failure_reason.as_deref().unwrap();
    assert!(reason.contains("panicked"), "{}", reason);
    assert!(report.financial_summary.is_some());
}
