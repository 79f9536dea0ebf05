//! Approval round-trip: a channel write suspends, then an approval resumes it.
//!
//! Run: `cargo run -p osprey-examples --example approval_roundtrip`

use std::sync::Arc;

use osprey::approval::{ApprovalMode, ApprovalPolicy, ResumePayload};
use osprey::capabilities::{framework_defaults, FrameworkServices};
use osprey::llm::{MockProvider, ModelRole, Scripted};
use osprey::runtime::{AgentRuntime, TurnOutcome};
use osprey::services::MockConnector;
use osprey::{ProjectConfig, Registry};

#[tokio::main]
async fn main() {
    let connector = Arc::new(MockConnector::new().with_channel("SR:CORRECTOR:1", 0.0));
    let services = FrameworkServices::mock(
        connector.clone(),
        ApprovalPolicy::new(ApprovalMode::WritesOnly),
    );
    let registry =
        Arc::new(Registry::from_config(framework_defaults(&services)).expect("registry"));

    let mock = Arc::new(MockProvider::new());
    mock.push(
        ModelRole::TaskExtraction,
        Scripted::Structured(serde_json::json!({
            "task": "Set channel `SR:CORRECTOR:1` to 5.0",
            "depends_on_chat_history": false
        })),
    );
    for is_relevant in [false, true, false, false] {
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
                "capability_name": "channel_write",
                "context_key": "wr_1",
                "task_objective": "Set channel `SR:CORRECTOR:1` to 5.0"
            }]
        })),
    );
    mock.push(
        ModelRole::Response,
        Scripted::Text("Corrector setpoint updated to 5.0.".into()),
    );

    let runtime = AgentRuntime::builder(registry, ProjectConfig::default())
        .with_default_provider(mock)
        .build()
        .expect("runtime");

    match runtime
        .run_turn("demo", "Set `SR:CORRECTOR:1` to 5.0")
        .await
        .expect("turn")
    {
        TurnOutcome::Suspended(payload) => {
            println!("suspended: {}", payload.operation_summary);
            println!("concerns: {:?}", payload.safety_concerns);
        }
        _ => {
            println!("expected a suspension");
            return;
        }
    }

    match runtime
        .resume("demo", ResumePayload::approved())
        .await
        .expect("resume")
    {
        TurnOutcome::Completed(state) => {
            println!("writes: {:?}", connector.recorded_writes());
            println!(
                "response: {}",
                state.input_output.final_response.unwrap_or_default()
            );
        }
        _ => println!("unexpected outcome"),
    }
}
