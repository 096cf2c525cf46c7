mod helpers;

use helpers::{ScriptedModel, SpikeEmbedder};
use moat::agent::Agent;
use moat::config::AgentConfig;
use moat::tracer::{read_traces, Tracer};
use moat::{data, memory::vector};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

const LONG: &str = "Take I-5 south after 8pm to skip rush hour, stop in Kettleman City for fuel.";

fn agent_with(model: &ScriptedModel, tmp: &TempDir) -> Agent {
    let tracer = Tracer::open(tmp.path().join("logs").join("traces.log")).unwrap();
    Agent::new(
        Box::new(model.clone()),
        Arc::new(SpikeEmbedder),
        helpers::test_db(),
        tracer,
        AgentConfig::default(),
    )
}

#[tokio::test]
async fn long_first_response_is_accepted_and_stored() {
    let tmp = TempDir::new().unwrap();
    let model = ScriptedModel::new(&[LONG]);
    let mut agent = agent_with(&model, &tmp);

    let outcome = agent.reason_loop("Plan a trip from SF to LA", 5).await.unwrap();

    assert!(outcome.accepted);
    assert_eq!(outcome.iterations, 1);
    assert_eq!(outcome.response, LONG);
    assert_eq!(outcome.trace_id, 1);

    let conn = agent.connection();
    assert_eq!(vector::count(conn).unwrap(), 1);
    assert_eq!(
        data::get_data(conn, "refined_Plan a trip from SF to LA").unwrap(),
        Some(json!({"response": LONG, "trace_id": 1}))
    );

    let traces = read_traces(tmp.path().join("logs").join("traces.log"), 10).unwrap();
    assert_eq!(traces.len(), 1);
    assert_eq!(traces[0].step, "Iter 0");
    assert!(traces[0].rationale.starts_with("Used context: Memory: []"));
    assert!(traces[0].rationale.ends_with("..."));
}

#[tokio::test]
async fn short_responses_are_refined_until_accepted() {
    let tmp = TempDir::new().unwrap();
    let model = ScriptedModel::new(&["short", "tiny", LONG]);
    let mut agent = agent_with(&model, &tmp);

    let outcome = agent.reason_loop("Plan a trip", 5).await.unwrap();

    assert!(outcome.accepted);
    assert_eq!(outcome.iterations, 3);
    assert_eq!(outcome.trace_id, 3);

    let prompts = model.prompts();
    assert_eq!(prompts.len(), 3);
    assert!(prompts[0].starts_with("Task: Plan a trip\nContext: "));
    assert!(prompts[1].starts_with("Task: Refine: short\n"));
    assert!(prompts[2].starts_with("Task: Refine: tiny\n"));
    assert!(prompts[2].ends_with("\nResponse:"));

    let conn = agent.connection();
    assert!(data::get_data(conn, "refined_Refine: tiny").unwrap().is_some());
    assert_eq!(agent.session().get_short_term("last_task"), Some(&json!("Refine: tiny")));
}

#[tokio::test]
async fn loop_stops_at_the_iteration_limit() {
    let tmp = TempDir::new().unwrap();
    let model = ScriptedModel::new(&["no", "still no", "unused"]);
    let mut agent = agent_with(&model, &tmp);

    let outcome = agent.reason_loop("Plan a trip", 2).await.unwrap();

    assert!(!outcome.accepted);
    assert_eq!(outcome.iterations, 2);
    assert_eq!(outcome.response, "still no");
    assert_eq!(model.prompts().len(), 2);

    let conn = agent.connection();
    assert_eq!(vector::count(conn).unwrap(), 0);
    assert_eq!(data::count(conn).unwrap(), 0);
}

#[tokio::test]
async fn exactly_min_length_is_not_enough() {
    let tmp = TempDir::new().unwrap();
    let fifty = "x".repeat(50);
    let model = ScriptedModel::new(&[&fifty]);
    let agent = agent_with(&model, &tmp);
    assert!(!agent.evaluate(&fifty));
    assert!(agent.evaluate(&"x".repeat(51)));
}

#[tokio::test]
async fn zero_iterations_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let model = ScriptedModel::new(&[LONG]);
    let mut agent = agent_with(&model, &tmp);

    assert!(agent.reason_loop("anything", 0).await.is_err());
    assert!(model.prompts().is_empty());
}

#[tokio::test]
async fn seeded_moats_feed_the_context() {
    let tmp = TempDir::new().unwrap();
    let model = ScriptedModel::new(&[LONG]);
    let mut agent = agent_with(&model, &tmp);
    agent.seed().await.unwrap();

    agent.reason_loop("traffic", 1).await.unwrap();

    let prompt = &model.prompts()[0];
    assert!(prompt.contains("Previous trip: SF to LA, avoid traffic."));
    assert!(prompt.contains("Use I-5 after 8pm."));
}

#[tokio::test]
async fn model_failure_propagates() {
    let tmp = TempDir::new().unwrap();
    let model = ScriptedModel::new(&[]);
    let mut agent = agent_with(&model, &tmp);

    let err = agent.reason_loop("Plan a trip", 3).await.unwrap_err();
    assert!(format!("{err:#}").contains("script exhausted"));
    assert_eq!(agent.tracer().last_id(), 0);
}
