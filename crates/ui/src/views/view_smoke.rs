use exam_core::model::ExamId;
use storage::repository::StorageKey;

use super::test_harness::{ViewKind, setup_view_harness};

#[tokio::test(flavor = "current_thread")]
async fn home_view_links_launch_exam() {
    let mut harness = setup_view_harness(ViewKind::Home, Some(ExamId::new(12)));
    harness.rebuild();
    let html = harness.render();
    assert!(html.contains("Continue to exam 12"), "missing exam link in {html}");
    assert!(html.contains("Open exam"), "missing open button in {html}");
}

#[tokio::test(flavor = "current_thread")]
async fn take_exam_view_shows_instructions_first() {
    let mut harness = setup_view_harness(ViewKind::TakeExam(5), None);
    harness.rebuild();
    for _ in 0..4 {
        harness.drive_async().await;
    }
    let html = harness.render();
    assert!(html.contains("Start Exam"), "missing start button in {html}");
    assert!(!html.contains("question-container"), "questions shown early in {html}");
}

#[tokio::test(flavor = "current_thread")]
async fn take_exam_view_resumes_started_attempt() {
    let mut harness = setup_view_harness(ViewKind::TakeExam(5), None);
    harness
        .storage
        .local_state
        .set_item(&StorageKey::started(ExamId::new(5)), "true")
        .await
        .unwrap();
    harness.rebuild();
    for _ in 0..8 {
        harness.drive_async().await;
    }
    let html = harness.render();
    assert!(html.contains("Capital of France?"), "missing question in {html}");
    assert!(html.contains("15:00"), "missing timer in {html}");
    assert!(!html.contains("Start Exam"), "instructions still shown in {html}");
}

#[tokio::test(flavor = "current_thread")]
async fn completed_view_links_home() {
    let mut harness = setup_view_harness(ViewKind::Completed(5), None);
    harness.rebuild();
    let html = harness.render();
    assert!(html.contains("Exam submitted"), "missing heading in {html}");
    assert!(html.contains("exam 5"), "missing exam id in {html}");
}

#[tokio::test(flavor = "current_thread")]
async fn unsubmitted_answers_arm_the_leave_prompt() {
    let mut harness = setup_view_harness(ViewKind::TakeExam(5), None);
    let exam = ExamId::new(5);
    harness
        .storage
        .local_state
        .set_item(&StorageKey::started(exam), "true")
        .await
        .unwrap();
    harness
        .storage
        .local_state
        .set_item(&StorageKey::answers(exam), r#"{"1":"A"}"#)
        .await
        .unwrap();
    harness.rebuild();
    for _ in 0..8 {
        harness.drive_async().await;
    }
    let html = harness.render();
    assert!(html.contains("Capital of France?"), "missing question in {html}");
    assert!(html.contains("leave-guard-armed"), "leave prompt not armed in {html}");
}

#[tokio::test(flavor = "current_thread")]
async fn fresh_attempt_leaves_without_prompt() {
    let mut harness = setup_view_harness(ViewKind::TakeExam(5), None);
    harness
        .storage
        .local_state
        .set_item(&StorageKey::started(ExamId::new(5)), "true")
        .await
        .unwrap();
    harness.rebuild();
    for _ in 0..8 {
        harness.drive_async().await;
    }
    let html = harness.render();
    assert!(html.contains("Capital of France?"), "missing question in {html}");
    assert!(!html.contains("leave-guard-armed"), "prompt armed without answers in {html}");
}
