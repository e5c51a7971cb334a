//! `DaoClient` against a mocked DataDAO server.

use datadao::core::TaskStatus;
use datadao::{Address, DaoClient};
use httpmock::prelude::*;
use serde_json::json;

fn actor() -> Address {
    Address::system("cli-user")
}

#[tokio::test]
async fn test_stats_unwraps_envelope() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/stats");
        then.status(200).json_body(json!({
            "success": true,
            "data": {
                "member_count": 3,
                "task_count": 7,
                "dataset_count": 1,
                "proposal_count": 0
            }
        }));
    });

    let client = DaoClient::new(&server.base_url());
    let stats = client.stats().await.unwrap();
    mock.assert();
    assert_eq!(stats.member_count, 3);
    assert_eq!(stats.task_count, 7);
}

#[tokio::test]
async fn test_error_envelope_carries_server_message() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/faucet/request");
        then.status(429)
            .header("retry-after", "3600")
            .json_body(json!({
                "success": false,
                "message": "Limit of 1 request(s) per window reached, try again in 1h 0m"
            }));
    });

    let client = DaoClient::new(&server.base_url());
    let err = client.request_faucet(&actor()).await.unwrap_err();
    let text = err.to_string();
    assert!(text.contains("429"), "{}", text);
    assert!(text.contains("try again in 1h 0m"), "{}", text);
}

#[tokio::test]
async fn test_non_json_failure_reports_status() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/health");
        then.status(502).body("bad gateway");
    });

    let client = DaoClient::new(&server.base_url());
    let err = client.health().await.unwrap_err();
    assert!(err.to_string().contains("502"));
}

#[tokio::test]
async fn test_mutating_calls_send_actor_header() {
    let server = MockServer::start();
    let who = actor();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/tasks/9/close")
            .header("x-actor-address", who.as_str());
        then.status(200).json_body(json!({
            "success": true,
            "data": {
                "id": 9,
                "creator": who.as_str(),
                "title": "Old task",
                "description": "",
                "task_type": "data_curation",
                "reward_per_submission": 10,
                "reward_per_review": 0,
                "required_submissions": 1,
                "required_validations": 1,
                "deadline": 1_700_000_000,
                "visibility": "public",
                "access_conditions": null,
                "content_reference": null,
                "content_key": format!("0x{}", "00".repeat(32)),
                "status": "closed",
                "nominated_reviewers": [],
                "submission_count": 0,
                "approved_count": 0,
                "rejected_count": 0,
                "escrowed": 10,
                "created_at": 1_699_990_000,
                "updated_at": 1_700_000_100,
                "completed_at": null,
                "closed_at": 1_700_000_100
            }
        }));
    });

    let client = DaoClient::new(&server.base_url()).with_actor(who.clone());
    let task = client.close_task(9).await.unwrap();
    mock.assert();
    assert_eq!(task.status, TaskStatus::Closed);
    assert_eq!(task.creator, who);
}

#[tokio::test]
async fn test_list_tasks_passes_status_filter() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/tasks").query_param("status", "open");
        then.status(200).json_body(json!({ "success": true, "data": [] }));
    });

    let client = DaoClient::new(&server.base_url());
    let tasks = client.list_tasks(Some(TaskStatus::Open)).await.unwrap();
    mock.assert();
    assert!(tasks.is_empty());
}
