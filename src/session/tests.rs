use super::*;
use crate::api::mock_client::{GenerateScript, ScriptedBackend};
use crate::types::{FoundryDataset, FoundryListing, PollSnapshot, ResultEntry};
use std::sync::Arc;

fn harness() -> (Arc<ScriptedBackend>, SessionController) {
    let mock = ScriptedBackend::new();
    let client = BackendClient::new_mock(mock.clone());
    (mock, SessionController::new(client, Preferences::default()))
}

fn snapshot(status: &str, results: Vec<(&str, ContentKind)>) -> PollOutcome {
    PollOutcome::Snapshot(PollSnapshot {
        status: status.to_string(),
        results: results
            .into_iter()
            .map(|(value, kind)| ResultEntry {
                value: value.to_string(),
                kind,
            })
            .collect(),
    })
}

fn error_snapshot(text: &str) -> PollOutcome {
    snapshot("idle", vec![(text, ContentKind::ErrorMessage)])
}

/// Let fire-and-forget submission tasks run to completion on the
/// current-thread test runtime.
async fn drain_spawned() {
    tokio::task::yield_now().await;
    tokio::task::yield_now().await;
}

fn fix_prompt_count(controller: &SessionController) -> usize {
    controller
        .messages()
        .iter()
        .filter(|message| message.role == Role::Generator && message.text == FIX_PROMPT)
        .count()
}

fn giving_up_count(controller: &SessionController) -> usize {
    controller
        .messages()
        .iter()
        .filter(|message| message.text.contains("Giving up"))
        .count()
}

#[tokio::test]
async fn test_new_session_starts_with_the_greeting_pair() {
    let (_mock, controller) = harness();

    assert_eq!(controller.messages().len(), 2);
    assert!(controller
        .messages()
        .iter()
        .all(|message| message.role == Role::Generator));
    assert_eq!(controller.status(), SystemStatus::Idle);
}

#[tokio::test]
async fn test_word_commands_hit_control_endpoints_without_generation() {
    let (mock, mut controller) = harness();

    controller.handle_input("RESET").await;
    controller.handle_input(" stop ").await;

    assert_eq!(
        mock.controls(),
        vec![ControlEndpoint::Restart, ControlEndpoint::Interrupt]
    );
    assert!(mock.generate_calls().is_empty());
    assert_eq!(controller.status(), SystemStatus::WaitingForKernel);

    let last = controller.messages().last().expect("info entry");
    assert_eq!(last.role, Role::System);
    assert_eq!(last.text, "Interrupting code execution.");
}

#[tokio::test]
async fn test_clear_resets_the_transcript_to_the_greeting() {
    let (mock, mut controller) = harness();
    controller
        .apply_poll(snapshot("idle", vec![("42\n", ContentKind::Message)]))
        .await;
    assert!(controller.messages().len() > 2);

    controller.handle_input("clear").await;

    assert_eq!(mock.controls(), vec![ControlEndpoint::ClearHistory]);
    assert_eq!(controller.messages().len(), 2);
    assert_eq!(controller.status(), SystemStatus::Idle);
}

#[tokio::test]
async fn test_failed_control_call_keeps_the_transcript() {
    let (mock, mut controller) = harness();
    mock.fail_controls();

    controller.handle_input("clear").await;

    // The optimistic info entry stays; only a successful clear wipes the log.
    assert_eq!(controller.messages().len(), 3);
    assert_eq!(
        controller.messages().last().expect("info entry").text,
        "Clearing chat history."
    );
}

#[tokio::test]
async fn test_blank_input_is_ignored() {
    let (mock, mut controller) = harness();

    controller.handle_input("   ").await;

    assert_eq!(controller.messages().len(), 2);
    assert!(mock.generate_calls().is_empty());
    assert!(mock.controls().is_empty());
    assert_eq!(controller.status(), SystemStatus::Idle);
}

#[tokio::test]
async fn test_prompt_generates_and_submits_code() {
    let (mock, mut controller) = harness();
    mock.script_reply(true, "Here you go", Some("import numpy\n"));

    controller.handle_input("Plot a sine wave").await;
    drain_spawned().await;

    assert_eq!(
        mock.generate_calls(),
        vec![("Plot a sine wave".to_string(), "gpt-3.5-turbo".to_string())]
    );
    assert_eq!(
        mock.submissions(),
        vec![("import numpy\n".to_string(), vec!["svg".to_string()])]
    );
    assert_eq!(controller.status(), SystemStatus::RunningCode);

    let entries = controller.messages();
    assert_eq!(entries[entries.len() - 2].role, Role::User);
    assert_eq!(entries[entries.len() - 1].role, Role::Generator);
    assert_eq!(entries[entries.len() - 1].text, "Here you go");
    // Code entries only appear when show_code is on.
    assert!(entries.iter().all(|m| m.kind != ContentKind::Code));
}

#[tokio::test]
async fn test_reply_without_code_returns_to_idle() {
    let (mock, mut controller) = harness();
    mock.script_reply(true, "That is a question, not a task.", None);

    controller.handle_input("what is numpy?").await;
    drain_spawned().await;

    assert!(mock.submissions().is_empty());
    assert_eq!(controller.status(), SystemStatus::Idle);
}

#[tokio::test]
async fn test_soft_failure_reply_shows_text_and_goes_idle() {
    let (mock, mut controller) = harness();
    mock.script_reply(false, "Model quota exceeded.", Some("ignored()"));

    controller.handle_input("do something").await;
    drain_spawned().await;

    assert!(mock.submissions().is_empty());
    assert_eq!(controller.status(), SystemStatus::Idle);
    assert_eq!(
        controller.messages().last().expect("reply entry").text,
        "Model quota exceeded."
    );
}

#[tokio::test]
async fn test_generation_transport_error_leaves_status_untouched() {
    let (mock, mut controller) = harness();
    mock.script_generate(GenerateScript::TransportError);

    controller.handle_input("do something").await;

    assert_eq!(controller.status(), SystemStatus::GeneratingCode);
    assert_eq!(
        controller.messages().last().expect("user entry").role,
        Role::User
    );
}

#[tokio::test]
async fn test_show_code_appends_a_code_entry() {
    let mock = ScriptedBackend::new();
    let client = BackendClient::new_mock(mock.clone());
    let prefs = Preferences {
        show_code: true,
        ..Preferences::default()
    };
    let mut controller = SessionController::new(client, prefs);
    mock.script_reply(true, "Here you go", Some("print(1)"));

    controller.handle_input("print something").await;
    drain_spawned().await;

    let code = controller
        .messages()
        .iter()
        .find(|m| m.kind == ContentKind::Code)
        .expect("code entry");
    assert_eq!(code.text, "print(1)");
    assert_eq!(code.role, Role::Generator);
    assert_eq!(mock.submissions().len(), 1);
}

#[tokio::test]
async fn test_poll_snapshot_appends_results_and_maps_status() {
    let (_mock, mut controller) = harness();

    controller
        .apply_poll(snapshot(
            "busy",
            vec![
                ("42\n", ContentKind::Message),
                ("   ", ContentKind::Message),
                ("<svg/>", ContentKind::Svg),
            ],
        ))
        .await;

    assert_eq!(controller.status(), SystemStatus::RunningCode);
    // Blank results are dropped, everything else lands as kernel output.
    assert_eq!(controller.messages().len(), 4);
    let entries = controller.messages();
    assert_eq!(entries[2].role, Role::System);
    assert_eq!(entries[2].text, "42\n");
    assert_eq!(entries[3].kind, ContentKind::Svg);
}

#[tokio::test]
async fn test_auth_redirect_times_the_session_out() {
    let (_mock, mut controller) = harness();
    controller.apply_poll(snapshot("busy", vec![])).await;

    controller.apply_poll(PollOutcome::AuthRedirect).await;

    assert_eq!(controller.status(), SystemStatus::SessionTimeout);
}

#[tokio::test]
async fn test_unreachable_backend_means_waiting_for_kernel() {
    let (_mock, mut controller) = harness();

    controller.apply_poll(PollOutcome::Unreachable).await;

    assert_eq!(controller.status(), SystemStatus::WaitingForKernel);
    assert_eq!(controller.messages().len(), 2);
}

#[tokio::test]
async fn test_execution_errors_trigger_a_bounded_fix_loop() {
    let (mock, mut controller) = harness();
    mock.script_reply(true, "Here you go", Some("bad()"));
    for _ in 0..3 {
        mock.script_reply(true, "Trying a fix", Some("better()"));
    }

    controller.handle_input("run something").await;
    drain_spawned().await;

    for attempt in 1..=3 {
        controller.apply_poll(error_snapshot("Traceback: boom")).await;
        drain_spawned().await;
        assert_eq!(fix_prompt_count(&controller), attempt);
        assert_eq!(controller.status(), SystemStatus::RunningCode);
    }

    // Each fix attempt marks the error it reacts to as superseded.
    let stale = controller
        .messages()
        .iter()
        .filter(|m| m.role == Role::SystemHide)
        .count();
    assert_eq!(stale, 3);

    // Fourth error: the budget is spent, one terminal entry and no retry.
    controller.apply_poll(error_snapshot("Traceback: boom")).await;
    assert_eq!(fix_prompt_count(&controller), 3);
    assert_eq!(giving_up_count(&controller), 1);
    assert!(controller
        .messages()
        .iter()
        .any(|m| m.text.contains("3 attempts")));

    // Further errors change nothing; the failure is reported exactly once.
    controller.apply_poll(error_snapshot("Traceback: boom")).await;
    assert_eq!(fix_prompt_count(&controller), 3);
    assert_eq!(giving_up_count(&controller), 1);

    let calls = mock.generate_calls();
    assert_eq!(calls.len(), 4);
    assert!(calls[1..].iter().all(|(prompt, _)| prompt == FIX_PROMPT));
}

#[tokio::test]
async fn test_a_fresh_prompt_rearms_the_fix_budget() {
    let (mock, mut controller) = harness();
    controller.configure_auto_fix(true, 1);
    mock.script_reply(true, "first", Some("a()"));
    mock.script_reply(true, "fixing first", Some("b()"));
    mock.script_reply(true, "second", Some("c()"));
    mock.script_reply(true, "fixing second", Some("d()"));

    controller.handle_input("first task").await;
    controller.apply_poll(error_snapshot("boom")).await;
    controller.apply_poll(error_snapshot("boom")).await;
    assert_eq!(fix_prompt_count(&controller), 1);
    assert_eq!(giving_up_count(&controller), 1);

    controller.handle_input("second task").await;
    controller.apply_poll(error_snapshot("boom")).await;
    drain_spawned().await;

    assert_eq!(fix_prompt_count(&controller), 2);
    assert_eq!(
        mock.generate_calls().last().expect("fix call").0,
        FIX_PROMPT
    );
}

#[tokio::test]
async fn test_disabled_autofix_leaves_errors_alone() {
    let (mock, mut controller) = harness();
    controller.configure_auto_fix(false, 3);
    mock.script_reply(true, "Here you go", Some("bad()"));

    controller.handle_input("run something").await;
    controller.apply_poll(error_snapshot("Traceback: boom")).await;
    drain_spawned().await;

    assert_eq!(mock.generate_calls().len(), 1);
    assert_eq!(fix_prompt_count(&controller), 0);
    assert_eq!(
        controller.messages().last().expect("error entry").role,
        Role::System
    );
}

#[tokio::test]
async fn test_upload_appends_an_entry_and_returns_to_idle() {
    let (mock, mut controller) = harness();
    mock.set_upload_reply("File data.csv uploaded.");

    controller.upload_file(Path::new("/tmp/data.csv")).await;

    let last = controller.messages().last().expect("upload entry");
    assert_eq!(last.role, Role::Upload);
    assert_eq!(last.text, "File data.csv uploaded.");
    assert_eq!(controller.status(), SystemStatus::Idle);
}

#[tokio::test]
async fn test_dataset_listing_adopts_the_backend_default_folder() {
    let (mock, mut controller) = harness();
    mock.set_foundry_listing(FoundryListing {
        folder: Some("/Data/shared".to_string()),
        datasets: vec![FoundryDataset {
            name: "flights".to_string(),
            dataset_rid: "ri.foundry.main.dataset.1".to_string(),
        }],
    });

    let listing = controller.refresh_datasets().await.expect("listing");

    assert_eq!(listing.datasets.len(), 1);
    assert_eq!(
        controller.prefs().foundry_folder.as_deref(),
        Some("/Data/shared")
    );
}

#[tokio::test]
async fn test_dataset_download_failure_lands_in_the_transcript() {
    let (mock, mut controller) = harness();
    mock.set_foundry_download(FoundryDownload::Failed {
        status: 403,
        message: "forbidden".to_string(),
    });

    controller.load_dataset("ri.foundry.main.dataset.1").await;

    let last = controller.messages().last().expect("failure entry");
    assert_eq!(last.role, Role::Upload);
    assert!(last.text.contains("403"));
    assert!(last.text.contains("forbidden"));
    assert_eq!(controller.status(), SystemStatus::Idle);
}

#[tokio::test]
async fn test_dataset_load_ignores_a_blank_rid() {
    let (_mock, mut controller) = harness();

    controller.load_dataset("   ").await;

    assert_eq!(controller.messages().len(), 2);
    assert_eq!(controller.status(), SystemStatus::Idle);
}
