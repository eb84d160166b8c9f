use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::*;
use crate::channel::ProcessExit;
use crate::inject::RetryPolicy;
use crate::sources::MemorySource;
use crate::test_utils::{
    RadiotapFrameBuilder, ScriptedSink, ScriptedSpawner, SinkStep, TokioClock, frame_at,
    radiotap_frame_at,
};

const WALL_START: Timespec = Timespec::new(1_700_000_000, 250_000_000);

fn unpaced() -> RetryPolicy {
    RetryPolicy { airtime_pacing: false, ..RetryPolicy::default() }
}

fn scheduler(
    frames: Vec<CaptureFrame>,
    sink: ScriptedSink,
    options: ReplayOptions,
) -> ReplayScheduler<MemorySource, ScriptedSink> {
    ReplayScheduler::new(MemorySource::new(frames), InjectionRetrier::new(sink, unpaced()), options)
        .with_clock(Arc::new(TokioClock::starting_at(WALL_START)))
}

fn following() -> ReplayOptions {
    ReplayOptions { follow_channel: true, ..ReplayOptions::default() }
}

fn offsets(sink: &ScriptedSink, start: Instant) -> Vec<Duration> {
    sink.submissions().iter().map(|s| s.at - start).collect()
}

#[tokio::test(start_paused = true)]
async fn frames_keep_their_capture_spacing() {
    let frames = vec![frame_at(10, 0, 100), frame_at(10, 500_000, 100), frame_at(12, 500_000, 100)];
    let sink = ScriptedSink::new();

    let start = Instant::now();
    let summary = scheduler(frames, sink.clone(), ReplayOptions::default()).run().await.unwrap();

    assert_eq!(
        offsets(&sink, start),
        vec![Duration::ZERO, Duration::from_millis(500), Duration::from_millis(2_500)]
    );
    assert_eq!(summary.frames, 3);
    assert_eq!(summary.bytes, 300);
    assert_eq!(summary.failed_attempts, 0);
    assert!(!summary.interrupted);

    let total = summary.total_time.to_duration().unwrap();
    assert!(total >= Duration::from_millis(2_500) && total < Duration::from_millis(2_600));
}

#[tokio::test(start_paused = true)]
async fn capture_epoch_does_not_matter() {
    // same relative spacing from a capture made decades ago
    let frames = vec![frame_at(1_000, 900_000, 60), frame_at(1_001, 100_000, 60)];
    let sink = ScriptedSink::new();

    let start = Instant::now();
    scheduler(frames, sink.clone(), ReplayOptions::default()).run().await.unwrap();

    assert_eq!(offsets(&sink, start), vec![Duration::ZERO, Duration::from_millis(200)]);
}

#[tokio::test(start_paused = true)]
async fn timestamps_going_backwards_send_immediately() {
    let frames = vec![frame_at(50, 0, 10), frame_at(51, 0, 10), frame_at(49, 0, 10)];
    let sink = ScriptedSink::new();

    let start = Instant::now();
    let summary = scheduler(frames, sink.clone(), ReplayOptions::default()).run().await.unwrap();

    assert_eq!(summary.frames, 3);
    assert_eq!(
        offsets(&sink, start),
        vec![Duration::ZERO, Duration::from_secs(1), Duration::from_secs(1)]
    );
}

#[tokio::test(start_paused = true)]
async fn timing_can_be_switched_off() {
    let frames = vec![frame_at(0, 0, 10), frame_at(30, 0, 10), frame_at(90, 0, 10)];
    let sink = ScriptedSink::new();
    let options = ReplayOptions { enforce_timing: false, ..ReplayOptions::default() };

    let start = Instant::now();
    let summary = scheduler(frames, sink.clone(), options).run().await.unwrap();

    assert_eq!(summary.frames, 3);
    assert!(offsets(&sink, start).iter().all(|offset| *offset == Duration::ZERO));
}

#[tokio::test(start_paused = true)]
async fn short_writes_are_counted_not_fatal() {
    let sink = ScriptedSink::with_steps([SinkStep::Accept(20), SinkStep::Accept(0)]);

    let summary = scheduler(vec![frame_at(3, 0, 100)], sink.clone(), ReplayOptions::default())
        .run()
        .await
        .unwrap();

    assert_eq!(summary.frames, 1);
    assert_eq!(summary.failed_attempts, 2);
    assert_eq!(summary.bytes, 120);
    assert_eq!(sink.submissions().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn sink_failure_aborts_the_run() {
    let frames = vec![frame_at(0, 0, 10), frame_at(0, 1, 10), frame_at(0, 2, 10)];
    let sink =
        ScriptedSink::with_steps([SinkStep::Full, SinkStep::Fail(std::io::ErrorKind::BrokenPipe)]);

    let result = scheduler(frames, sink.clone(), ReplayOptions::default()).run().await;

    assert!(matches!(result, Err(ReplayError::InjectionFatal { .. })));
    assert_eq!(sink.submissions().len(), 2, "nothing is sent after the failure");
}

#[tokio::test(start_paused = true)]
async fn cancellation_during_wait_returns_partial_summary() {
    let frames = vec![frame_at(0, 0, 40), frame_at(5, 0, 40), frame_at(6, 0, 40)];
    let sink = ScriptedSink::new();
    let cancel = CancellationToken::new();
    let replay =
        scheduler(frames, sink.clone(), ReplayOptions::default()).with_cancellation(cancel.clone());

    let stopper = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();
    });

    let summary = replay.run().await.unwrap();
    stopper.await.unwrap();

    assert!(summary.interrupted);
    assert_eq!(summary.frames, 1);
    assert_eq!(summary.bytes, 40);
    assert_eq!(sink.submissions().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn cancelled_before_start_sends_nothing() {
    let sink = ScriptedSink::new();
    let replay = scheduler(vec![frame_at(0, 0, 10)], sink.clone(), ReplayOptions::default());
    replay.cancellation_token().cancel();

    let summary = replay.run().await.unwrap();
    assert!(summary.interrupted);
    assert_eq!(summary.frames, 0);
    assert!(sink.submissions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn following_retunes_only_on_change() {
    let frames = vec![
        radiotap_frame_at(0, 0, 2412),
        radiotap_frame_at(0, 100, 2412),
        radiotap_frame_at(0, 200, 2437),
    ];
    let spawner = ScriptedSpawner::new();
    let sink = ScriptedSink::new();

    let summary = scheduler(frames, sink.clone(), following())
        .with_channel_controller(ChannelController::new(Arc::new(spawner.clone())))
        .run()
        .await
        .unwrap();

    assert_eq!(summary.frames, 3);
    let calls = spawner.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].1, vec!["wlan0", "set", "channel", "1"]);
    assert_eq!(calls[1].1, vec!["wlan0", "set", "channel", "6"]);
}

#[tokio::test(start_paused = true)]
async fn retuning_happens_inside_the_gap() {
    let frames = vec![radiotap_frame_at(0, 0, 2412), radiotap_frame_at(0, 500_000, 2437)];
    let spawner = ScriptedSpawner::new().with_run_time(Duration::from_millis(100));
    let sink = ScriptedSink::new();

    let start = Instant::now();
    scheduler(frames, sink.clone(), following())
        .with_channel_controller(ChannelController::new(Arc::new(spawner.clone())))
        .run()
        .await
        .unwrap();

    // the first frame has no gap to hide the tool in; the second still meets its deadline
    assert_eq!(offsets(&sink, start), vec![Duration::from_millis(100), Duration::from_millis(500)]);
    assert_eq!(spawner.calls().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn undecodable_channels_keep_the_current_one() {
    let no_channel = CaptureFrame::new(
        RadiotapFrameBuilder::new().tsft(1).rate(2).build(),
        Timespec::from_micros(0, 100),
    );
    let frames = vec![
        radiotap_frame_at(0, 0, 2412),
        no_channel,
        radiotap_frame_at(0, 200, 2472), // channel 13, outside the tunable range
        radiotap_frame_at(0, 300, 5180),
    ];
    let spawner = ScriptedSpawner::new();

    let summary = scheduler(frames, ScriptedSink::new(), following())
        .with_channel_controller(ChannelController::new(Arc::new(spawner.clone())))
        .run()
        .await
        .unwrap();

    assert_eq!(summary.frames, 4, "every frame is still sent");
    assert_eq!(spawner.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn wrong_radiotap_version_aborts() {
    let mut bad = RadiotapFrameBuilder::new().channel(2412).build();
    bad[0] = 1;
    let frames = vec![radiotap_frame_at(0, 0, 2412), CaptureFrame::new(bad, Timespec::new(0, 1_000))];
    let sink = ScriptedSink::new();

    let result = scheduler(frames, sink.clone(), following())
        .with_channel_controller(ChannelController::new(Arc::new(ScriptedSpawner::new())))
        .run()
        .await;

    assert!(matches!(result, Err(ReplayError::InvalidRadiotapVersion { found: 1 })));
    assert_eq!(sink.submissions().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn failing_channel_command_aborts() {
    let spawner = ScriptedSpawner::new();
    spawner.push_exit(ProcessExit::from_code(0));
    spawner.push_exit(ProcessExit::from_code(1));
    let frames = vec![radiotap_frame_at(0, 0, 2412), radiotap_frame_at(0, 500, 2462)];

    let result = scheduler(frames, ScriptedSink::new(), following())
        .with_channel_controller(ChannelController::new(Arc::new(spawner)))
        .run()
        .await;

    assert!(matches!(result, Err(ReplayError::ChannelCommandFailed { channel: 11, code: Some(1), .. })));
}

#[tokio::test(start_paused = true)]
async fn missing_channel_tool_aborts() {
    let spawner = ScriptedSpawner::new();
    spawner.push_spawn_failure();

    let result = scheduler(vec![radiotap_frame_at(0, 0, 2437)], ScriptedSink::new(), following())
        .with_channel_controller(ChannelController::new(Arc::new(spawner)))
        .run()
        .await;

    assert!(matches!(result, Err(ReplayError::SpawnFailure { .. })));
}

#[tokio::test]
async fn following_without_controller_is_a_config_error() {
    let result = scheduler(vec![frame_at(0, 0, 10)], ScriptedSink::new(), following()).run().await;
    assert!(matches!(result, Err(ReplayError::Config { .. })));
}

#[test]
fn first_schedule_fixes_the_offset() {
    let mut state = ReplayState::new();
    let wall = Timespec::new(500, 0);

    assert_eq!(state.schedule(Timespec::new(10, 0), wall), Schedule::Immediate);
    assert_eq!(state.offset().map(|o| o.as_timespec()), Some(Timespec::new(490, 0)));

    // later wall readings do not move the offset
    assert_eq!(
        state.schedule(Timespec::new(11, 250_000_000), Timespec::new(900, 0)),
        Schedule::At(Timespec::new(501, 250_000_000))
    );
}

proptest! {
    #[test]
    fn deadlines_preserve_capture_gaps(
        start_secs in 0i64..2_000_000_000,
        start_nanos in 0u32..1_000_000_000,
        gaps in prop::collection::vec(0u64..5_000_000_000, 1..40),
    ) {
        let wall = Timespec::new(1_800_000_000, 0);
        let mut capture = Timespec::new(start_secs, start_nanos);
        let mut state = ReplayState::new();
        prop_assert_eq!(state.schedule(capture, wall), Schedule::Immediate);

        let mut previous = wall;
        for gap in gaps {
            let next = capture + Timespec::from_duration(Duration::from_nanos(gap));
            let Schedule::At(deadline) = state.schedule(next, wall) else {
                panic!("only the first frame is immediate");
            };
            prop_assert!(deadline >= previous);
            prop_assert_eq!(deadline - previous, next - capture);
            previous = deadline;
            capture = next;
        }
    }
}
