//! Reclassification bounds and retry budgets across whole turns.

use std::sync::Arc;

use osprey::approval::{ApprovalMode, ApprovalPolicy};
use osprey::capabilities::{framework_defaults, FrameworkServices};
use osprey::llm::{MockProvider, ModelRole};
use osprey::runtime::{AgentRuntime, TurnOutcome};
use osprey::services::MockConnector;
use osprey::{ProjectConfig, Registry};

fn registry() -> Arc<Registry> {
    let services = FrameworkServices::mock(
        Arc::new(MockConnector::new().with_channel("SR:X", 5.0)),
        ApprovalPolicy::new(ApprovalMode::Disabled),
    );
    Arc::new(Registry::from_config(framework_defaults(&services)).unwrap())
}

fn bypassed_config() -> ProjectConfig {
    let mut config = ProjectConfig::default();
    config.agent_control.bypass.task_extraction = true;
    config.agent_control.bypass.classification = true;
    config
}

fn bad_plan() -> osprey::llm::Scripted {
    osprey::llm::Scripted::Structured(serde_json::json!({
        "steps": [{
            "capability_name": "nonexistent",
            "context_key": "x_1",
            "task_objective": "do something impossible"
        }]
    }))
}

/// **Scenario**: An orchestrator that keeps referencing a nonexistent
/// capability is bounded by max_reclassifications; the turn ends at the error
/// node with the counter equal to the bound and a capability-mapping message.
#[tokio::test]
async fn reclassification_is_bounded() {
    let mock = Arc::new(MockProvider::new().with_default_text("fallback"));
    // One bad plan per orchestration entry; the increment of the final entry
    // reaches the bound, so orchestration runs max_reclassifications times.
    let rounds = osprey::state::ExecutionLimits::default().max_reclassifications;
    for _ in 0..rounds {
        mock.push(ModelRole::Orchestrator, bad_plan());
    }

    let runtime = AgentRuntime::builder(registry(), bypassed_config())
        .with_default_provider(mock)
        .build()
        .unwrap();

    let outcome = runtime.run_turn("t1", "do the impossible").await.unwrap();
    let state = match outcome {
        TurnOutcome::Completed(state) => state,
        _ => panic!("expected a completed (error) turn"),
    };

    assert_eq!(
        state.planning.reclassification_attempts,
        state.control.limits.max_reclassifications,
        "counter equals the bound at error entry"
    );
    assert!(state.error.is_none(), "error node clears the record");
    let response = state.input_output.final_response.unwrap();
    assert!(
        response.contains("could not be mapped") || response.contains("fallback"),
        "states the capability-mapping failure: {}",
        response
    );
}

/// **Scenario**: A plan with a forward reference is re-planned (not
/// reclassified); the second, corrected plan executes.
#[tokio::test]
async fn invalid_context_key_replans() {
    let mock = Arc::new(MockProvider::new().with_default_text("answered"));
    mock.push(
        ModelRole::Orchestrator,
        osprey::llm::Scripted::Structured(serde_json::json!({
            "steps": [{
                "capability_name": "channel_read",
                "context_key": "cv_1",
                "task_objective": "Read `SR:X`",
                "inputs": ["not_stored_anywhere"]
            }]
        })),
    );
    mock.push(
        ModelRole::Orchestrator,
        osprey::llm::Scripted::Structured(serde_json::json!({
            "steps": [{
                "capability_name": "channel_read",
                "context_key": "cv_1",
                "task_objective": "Read `SR:X`"
            }]
        })),
    );

    let runtime = AgentRuntime::builder(registry(), bypassed_config())
        .with_default_provider(mock)
        .build()
        .unwrap();

    let outcome = runtime.run_turn("t1", "read `SR:X`").await.unwrap();
    let state = match outcome {
        TurnOutcome::Completed(state) => state,
        _ => panic!("expected completion"),
    };
    assert_eq!(
        state.planning.reclassification_attempts, 0,
        "re-planning does not consume the reclassification budget"
    );
    assert!(state.context.get("CHANNEL_VALUES", "cv_1").is_some());
}

/// **Scenario**: Retriable orchestration failures stop at the retry budget
/// and surface through the error node.
#[tokio::test]
async fn retry_budget_is_bounded() {
    // No orchestrator scripts at all: every structured call is a parse error.
    let mock = Arc::new(MockProvider::new().with_default_text("explained"));

    let runtime = AgentRuntime::builder(registry(), bypassed_config())
        .with_default_provider(mock)
        .build()
        .unwrap();

    let outcome = runtime.run_turn("t1", "read `SR:X`").await.unwrap();
    let state = match outcome {
        TurnOutcome::Completed(state) => state,
        _ => panic!("expected a completed (error) turn"),
    };
    assert!(state.planning.execution_plan.is_empty(), "no plan accepted");
    assert!(state.error.is_none(), "error node cleared the record");
    assert!(state.input_output.final_response.is_some());
}
