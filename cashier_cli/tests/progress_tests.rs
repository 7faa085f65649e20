use cashier_cli::progress::{
    ProgressRenderer, create_progress_infrastructure, join_renderer, render_progress,
};
use cashier_core::SubscriptionStatus;
use cashier_core::progress::ProgressUpdate;

fn render(updates: Vec<ProgressUpdate>) -> String {
    let mut renderer = ProgressRenderer::new(Vec::new());
    for update in updates {
        renderer.handle_update(update);
    }
    String::from_utf8(renderer.finish()).unwrap()
}

#[test]
fn test_record_lines() {
    let output = render(vec![
        ProgressUpdate::BatchStarted { index: 1, total: 3 },
        ProgressUpdate::RecordStarted {
            stripe_id: "sub_123".to_string(),
            status: SubscriptionStatus::Unsynced,
        },
        ProgressUpdate::RecordFinished {
            stripe_id: "sub_123".to_string(),
            status: SubscriptionStatus::PastDue,
        },
    ]);

    assert_eq!(
        output,
        "Processing chunk #1 / 3\n\
         \x20   Processing subscription #sub_123\n\
         \x20       Status before update = ''\n\
         \x20       Status after update = 'past_due'\n"
    );
}

#[test]
fn test_skipped_record_line() {
    colored::control::set_override(false);
    let output = render(vec![ProgressUpdate::RecordFailed {
        stripe_id: "sub_9".to_string(),
        message: "timed out".to_string(),
    }]);

    assert_eq!(output, "        Skipped #sub_9: timed out\n");
}

#[tokio::test]
async fn test_channel_renderer_stops_on_complete() {
    let (provider, rx) = create_progress_infrastructure();
    let handle = tokio::spawn(render_progress(rx, Vec::new()));

    provider.report(ProgressUpdate::BatchStarted { index: 2, total: 2 });
    provider.complete();

    let output = String::from_utf8(join_renderer(handle).await.unwrap()).unwrap();
    assert_eq!(output, "Processing chunk #2 / 2\n");
}

#[tokio::test]
async fn test_failed_renderer_is_reported_not_propagated() {
    let handle: tokio::task::JoinHandle<Vec<u8>> =
        tokio::spawn(async { panic!("terminal went away") });

    assert!(join_renderer(handle).await.is_none());
}
