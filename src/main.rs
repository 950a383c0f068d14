use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal;

use iris::command::CommandTable;
use iris::config::Config;
use iris::controller::{ControlEvent, Controller, Tick};
use iris::inject::{self, InputInjector, SystemInjector};
use iris::landmarks::LandmarkFeed;
use iris::listen::{ListenTuning, VoiceEngine};
use iris::speech::{CommandSpeaker, Feedback};
use iris::state::RuntimeState;
use iris::transcribe::{CommandTranscriber, TranscriptionSource};
use iris::ui;
use iris::wake::WakeSet;

#[derive(Parser)]
#[command(name = "iris", about = "eye-controlled pointer with voice commands")]
struct Cli {
    /// Configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run microphone calibration and exit
    Calibrate,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load(&cli.config);

    if matches!(cli.command, Some(Command::Calibrate)) {
        return run_calibrate(&config);
    }
    run(config)
}

fn run_calibrate(config: &Config) -> anyhow::Result<()> {
    let transcriber = CommandTranscriber::from_config(&config.stt);
    let duration = std::time::Duration::from_secs(config.listen.calibrate_secs);
    eprintln!("[calib] calibrating microphone, please remain silent");
    transcriber
        .calibrate(duration)
        .context("microphone calibration")?;
    eprintln!("[calib] calibration complete");
    Ok(())
}

fn run(config: Config) -> anyhow::Result<()> {
    // resource acquisition is fatal before any loop starts
    let mut system_injector = SystemInjector::new().context("initializing input injector")?;
    let screen = system_injector
        .screen_size()
        .context("querying screen size")?;
    let landmarks = LandmarkFeed::open(&config.landmarks.path)?;

    let state = RuntimeState::new(&config);
    let speaker = Arc::new(CommandSpeaker::from_config(&config.speech));
    let feedback = Feedback::new(speaker, Arc::clone(&state));
    let transcriber: Arc<dyn TranscriptionSource> =
        Arc::new(CommandTranscriber::from_config(&config.stt));
    let injector = inject::shared(system_injector);

    let (commands_tx, commands_rx) = flume::unbounded();
    let (events_tx, events_rx) = flume::unbounded();

    let wake = WakeSet::new(&config.wake_phrases);
    let table = Arc::new(CommandTable::with_extras(&config.commands.extra));

    let mut engine = VoiceEngine::new(
        Arc::clone(&state),
        commands_tx,
        Arc::clone(&transcriber),
        Arc::clone(&injector),
        feedback.clone(),
        wake,
        Arc::clone(&table),
        ListenTuning::from_config(&config),
    );
    engine.start();
    engine.calibrate();

    let mut controller = Controller::new(
        &config,
        Arc::clone(&state),
        engine,
        commands_rx,
        events_rx,
        Box::new(landmarks),
        injector,
        feedback,
        screen,
    );

    let quit_tx = events_tx.clone();
    ctrlc::set_handler(move || {
        let _ = quit_tx.send(ControlEvent::Quit);
    })
    .context("installing quit handler")?;

    let _raw = RawMode::enable()?;
    let tick = config.tick();
    let mut frame = 0usize;

    loop {
        pump_key_events(&events_tx)?;
        if controller.tick(Instant::now()) == Tick::Quit {
            break;
        }
        ui::status_line(&controller.snapshot(), frame);
        frame = frame.wrapping_add(1);
        thread::sleep(tick);
    }

    drop(_raw);
    ui::clear_line();
    controller.shutdown();
    Ok(())
}

/// Space forces command mode, `c` recalibrates, `q`/Esc/Ctrl-C quits.
fn pump_key_events(events: &flume::Sender<ControlEvent>) -> anyhow::Result<()> {
    while event::poll(std::time::Duration::ZERO)? {
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        let event = match key.code {
            KeyCode::Char(' ') => ControlEvent::ForceWake,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                ControlEvent::Quit
            }
            KeyCode::Char('c') => ControlEvent::Calibrate,
            KeyCode::Char('q') | KeyCode::Esc => ControlEvent::Quit,
            _ => continue,
        };
        let _ = events.send(event);
    }
    Ok(())
}

/// Raw-mode guard so the terminal is restored on every exit path.
struct RawMode;

impl RawMode {
    fn enable() -> anyhow::Result<Self> {
        terminal::enable_raw_mode().context("enabling raw terminal mode")?;
        Ok(Self)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}
