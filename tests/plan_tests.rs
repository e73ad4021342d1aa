// ABOUTME: Integration tests for plan documents, construction and static analysis
// ABOUTME: Exercises file loading, field aliases, violation reporting and batch prediction

use capflow::plan::{AnalysisIssue, PlanAnalyzer, PlanError, PlanParser, PlanViolation};

mod common;
use common::{TestEnvironment, TestPlanBuilder};

#[tokio::test]
async fn test_parse_generated_yaml_file() {
    let env = TestEnvironment::new();
    let builder = TestPlanBuilder::new("generated")
        .add_step("s1", "monitor", "look at: \"everything\"")
        .add_dependent_step("s2", "rednote", "write", vec!["s1"]);
    let path = env.create_plan_file("generated", &builder).await;

    let plan = PlanParser::new().parse_file(&path).await.unwrap();

    assert_eq!(plan, builder.build());
    assert_eq!(plan.get("s1").unwrap().description, "look at: \"everything\"");
}

#[tokio::test]
async fn test_planner_json_with_agent_and_depends_on() {
    let env = TestEnvironment::new();
    let path = env
        .write_file(
            "planner.json",
            r#"{
  "steps": [
    {"id": "s1", "name": "Analyse", "agent": "monitor", "description": "analyse"},
    {"id": "s2", "name": "Post", "agent": "rednote", "description": "post", "depends_on": ["s1"]},
    {"id": "s3", "name": "Spec", "agent": "product", "description": "spec", "depends_on": ["s1", "s2"]}
  ]
}"#,
        )
        .await;

    let plan = PlanParser::new().parse_file(&path).await.unwrap();

    assert_eq!(plan.len(), 3);
    assert_eq!(plan.get("s3").unwrap().capability, "product");
    assert_eq!(plan.get("s3").unwrap().dependencies, vec!["s1", "s2"]);
    assert_eq!(plan.get("s2").unwrap().display_name(), "Post");
}

#[tokio::test]
async fn test_malformed_plan_lists_all_violations() {
    let env = TestEnvironment::new();
    let path = env
        .write_file(
            "broken.yaml",
            r#"
steps:
  - id: s1
    capability: monitor
  - id: ""
    capability: monitor
  - id: s1
    capability: product
"#,
        )
        .await;

    let error = PlanParser::new().parse_file(&path).await.unwrap_err();

    assert!(matches!(error, PlanError::Malformed { .. }));
    assert_eq!(
        error.violations(),
        &[
            PlanViolation::EmptyId { index: 1 },
            PlanViolation::DuplicateId {
                id: "s1".to_string(),
                first: 0,
                duplicate: 2
            },
        ]
    );
}

#[tokio::test]
async fn test_missing_file_is_io_error() {
    let env = TestEnvironment::new();
    let error = PlanParser::new()
        .parse_file(env.path().join("absent.yaml"))
        .await
        .unwrap_err();
    assert!(matches!(error, PlanError::Io(_)));
}

#[test]
fn test_analysis_of_a_broken_plan() {
    let plan = TestPlanBuilder::new("analysis")
        .add_step("root", "echo", "root")
        .add_dependent_step("a", "echo", "a", vec!["b"])
        .add_dependent_step("b", "echo", "b", vec!["a"])
        .add_dependent_step("late", "echo", "late", vec!["b", "root"])
        .add_dependent_step("lost", "echo", "lost", vec!["nowhere"])
        .build();

    let report = PlanAnalyzer::new()
        .with_capabilities(["echo"])
        .analyze(&plan);

    assert!(!report.is_valid);
    assert!(report.errors.contains(&AnalysisIssue::CircularDependency {
        steps: vec!["a".to_string(), "b".to_string()]
    }));
    assert!(report.errors.contains(&AnalysisIssue::DanglingDependency {
        step: "lost".to_string(),
        dependency: "nowhere".to_string()
    }));
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].contains("'late'"));
    assert!(report.batches.is_none());
}

#[test]
fn test_analysis_predicts_batches() {
    let plan = TestPlanBuilder::new("layers")
        .add_step("a", "echo", "a")
        .add_step("b", "echo", "b")
        .add_dependent_step("c", "echo", "c", vec!["a", "b"])
        .add_dependent_step("d", "echo", "d", vec!["a"])
        .build();

    let report = PlanAnalyzer::new().analyze(&plan);

    assert!(report.is_valid);
    assert_eq!(
        report.batches,
        Some(vec![
            vec!["a".to_string(), "b".to_string()],
            vec!["c".to_string(), "d".to_string()],
        ])
    );
}
