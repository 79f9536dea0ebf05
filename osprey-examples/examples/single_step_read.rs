//! Single-step read turn against the mock provider and connector.
//!
//! Run: `cargo run -p osprey-examples --example single_step_read`

use std::sync::Arc;

use osprey::approval::{ApprovalMode, ApprovalPolicy};
use osprey::capabilities::{framework_defaults, FrameworkServices};
use osprey::llm::{MockProvider, ModelRole, Scripted};
use osprey::runtime::{AgentRuntime, TurnOutcome};
use osprey::services::MockConnector;
use osprey::{ProjectConfig, Registry};

#[tokio::main]
async fn main() {
    let connector = Arc::new(MockConnector::new().with_channel("SR:BEAM:CURRENT", 402.3));
    let services = FrameworkServices::mock(
        connector,
        ApprovalPolicy::new(ApprovalMode::Disabled),
    );
    let registry =
        Arc::new(Registry::from_config(framework_defaults(&services)).expect("registry"));

    let mock = Arc::new(MockProvider::new());
    mock.push(
        ModelRole::TaskExtraction,
        Scripted::Structured(serde_json::json!({
            "task": "Read the current value of `SR:BEAM:CURRENT`",
            "depends_on_chat_history": false
        })),
    );
    for is_relevant in [true, false, false, false] {
        mock.push(
            ModelRole::Classifier,
            Scripted::Structured(
                serde_json::json!({"is_relevant": is_relevant, "rationale": "demo"}),
            ),
        );
    }
    mock.push(
        ModelRole::Orchestrator,
        Scripted::Structured(serde_json::json!({
            "steps": [{
                "capability_name": "channel_read",
                "context_key": "cv_1",
                "task_objective": "Read the current value of `SR:BEAM:CURRENT`"
            }]
        })),
    );
    mock.push(
        ModelRole::Response,
        Scripted::Text("The beam current is 402.3 mA.".into()),
    );

    let runtime = AgentRuntime::builder(registry, ProjectConfig::default())
        .with_default_provider(mock)
        .build()
        .expect("runtime");

    match runtime
        .run_turn("demo", "What is the current beam current?")
        .await
        .expect("turn")
    {
        TurnOutcome::Completed(state) => {
            println!("plan: {:?}", state.planning.execution_plan);
            println!(
                "stored: {:?}",
                state.context.get("CHANNEL_VALUES", "cv_1").map(|c| &c.value)
            );
            println!(
                "response: {}",
                state.input_output.final_response.unwrap_or_default()
            );
        }
        _ => println!("unexpected outcome"),
    }
}
