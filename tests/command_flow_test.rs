//! Controller loop dispatch: queued commands and control events applied
//! against shared state through real channels.

mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Instant;

use common::{Call, NoFrames, RecordingInjector, RecordingSpeaker, ScriptedTranscriber};
use iris::command::{Command, CommandTable};
use iris::config::Config;
use iris::controller::{ControlEvent, Controller, Tick};
use iris::inject;
use iris::listen::{ListenTuning, VoiceEngine};
use iris::speech::Feedback;
use iris::state::{RuntimeState, SharedState};
use iris::wake::WakeSet;

struct Harness {
    controller: Controller,
    state: SharedState,
    commands: flume::Sender<Command>,
    events: flume::Sender<ControlEvent>,
    injector_log: Arc<std::sync::Mutex<Vec<Call>>>,
    speaker: Arc<RecordingSpeaker>,
}

fn harness() -> Harness {
    let config = Config::default();
    let state = RuntimeState::new(&config);
    let speaker = RecordingSpeaker::new();
    let feedback = Feedback::new(speaker.clone(), Arc::clone(&state));
    let (injector, injector_log) = RecordingInjector::new();
    let injector = inject::shared(injector);

    let (commands_tx, commands_rx) = flume::unbounded();
    let (events_tx, events_rx) = flume::unbounded();

    let engine = VoiceEngine::new(
        Arc::clone(&state),
        commands_tx.clone(),
        ScriptedTranscriber::new(&[]),
        Arc::clone(&injector),
        feedback.clone(),
        WakeSet::new(&["computer".to_string()]),
        Arc::new(CommandTable::builtin()),
        ListenTuning::from_config(&config),
    );

    let controller = Controller::new(
        &config,
        Arc::clone(&state),
        engine,
        commands_rx,
        events_rx,
        Box::new(NoFrames),
        injector,
        feedback,
        (1920.0, 1080.0),
    );

    Harness {
        controller,
        state,
        commands: commands_tx,
        events: events_tx,
        injector_log,
        speaker,
    }
}

#[test]
fn tracking_commands_round_trip_in_order() {
    let mut h = harness();

    for cmd in [Command::Track, Command::StopTracking, Command::Track] {
        h.commands.send(cmd).unwrap();
    }
    assert_eq!(h.controller.tick(Instant::now()), Tick::Continue);

    assert!(h.controller.snapshot().tracking_enabled);
}

#[test]
fn stop_tracking_applies_in_the_same_tick() {
    let mut h = harness();

    h.commands.send(Command::StopTracking).unwrap();
    h.controller.tick(Instant::now());

    assert!(!h.controller.snapshot().tracking_enabled);
    // the queue was drained completely
    h.commands.send(Command::Track).unwrap();
    h.controller.tick(Instant::now());
    assert!(h.controller.snapshot().tracking_enabled);
}

#[test]
fn scroll_repeats_three_presses() {
    let mut h = harness();

    h.commands.send(Command::ScrollUp).unwrap();
    h.controller.tick(Instant::now());

    let log = h.injector_log.lock().unwrap();
    let ups = log
        .iter()
        .filter(|c| matches!(c, Call::Press(iris::inject::Key::PageUp)))
        .count();
    assert_eq!(ups, 3);
    drop(log);
    assert_eq!(h.speaker.count_containing("Scrolling up"), 1);
}

#[test]
fn click_commands_reach_the_injector() {
    let mut h = harness();

    h.commands.send(Command::RightClick).unwrap();
    h.commands.send(Command::DoubleClick).unwrap();
    h.controller.tick(Instant::now());

    let log = h.injector_log.lock().unwrap();
    assert!(log.contains(&Call::RightClick));
    assert!(log.contains(&Call::DoubleClick));
}

#[test]
fn disable_feedback_speaks_the_goodbye_first() {
    let mut h = harness();

    h.commands.send(Command::DisableFeedback).unwrap();
    h.controller.tick(Instant::now());

    assert_eq!(h.speaker.count_containing("Voice feedback disabled"), 1);
    assert!(!h.state.voice_feedback_enabled.load(Ordering::SeqCst));

    // subsequent acknowledgements are silenced
    h.commands.send(Command::ScrollDown).unwrap();
    h.controller.tick(Instant::now());
    assert_eq!(h.speaker.count_containing("Scrolling down"), 0);

    h.commands.send(Command::EnableFeedback).unwrap();
    h.controller.tick(Instant::now());
    assert!(h.state.voice_feedback_enabled.load(Ordering::SeqCst));
    assert_eq!(h.speaker.count_containing("Voice feedback enabled"), 1);
}

#[test]
fn cancel_command_mode_clears_wake() {
    let mut h = harness();
    h.state.activate_wake(std::time::Duration::from_secs(30));
    assert!(h.state.wake_word_active.load(Ordering::SeqCst));

    h.commands.send(Command::CancelCommandMode).unwrap();
    h.controller.tick(Instant::now());

    assert!(!h.state.wake_word_active.load(Ordering::SeqCst));
}

#[test]
fn force_wake_event_activates_command_mode() {
    let mut h = harness();

    h.events.send(ControlEvent::ForceWake).unwrap();
    h.controller.tick(Instant::now());

    assert!(h.state.wake_word_active.load(Ordering::SeqCst));
    assert_eq!(h.speaker.count_containing("manually"), 1);
}

#[test]
fn quit_event_ends_the_loop() {
    let mut h = harness();

    h.events.send(ControlEvent::Quit).unwrap();
    assert_eq!(h.controller.tick(Instant::now()), Tick::Quit);
}
