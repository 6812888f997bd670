mod app;
mod cli;
mod config;
mod error;
mod input;
mod k8s;
mod model;
mod ui;
mod view;

use anyhow::{Context, Result};
use app::{App, run_command};
use clap::Parser;
use cli::CliArgs;
use crossterm::event::{
    Event, EventStream, KeyEventKind, KeyboardEnhancementFlags, PopKeyboardEnhancementFlags,
    PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
    supports_keyboard_enhancement,
};
use futures::StreamExt;
use input::KeyMap;
use k8s::{KubeGateway, ResourceGateway};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::fs::OpenOptions;
use std::io::{self, Stdout};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

type TuiTerminal = Terminal<CrosstermBackend<Stdout>>;

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(&args.log_filter, args.log_file.as_deref())?;

    let runtime_config = config::load_runtime_config(args.config.as_deref())?;
    if let Some(source) = &runtime_config.source {
        debug!(source = %source, "using runtime config");
    }

    let gateway = KubeGateway::connect(args.kubeconfig.as_deref(), args.context.clone())
        .await
        .context("failed to connect to the cluster")?
        .with_log_tail_lines(runtime_config.log_tail_lines);
    info!(context = gateway.context(), cluster = gateway.cluster(), "connected");

    let mut app = App::new(
        KeyMap::from_overrides(&runtime_config.keys),
        runtime_config.exec_char_limit,
    );
    app.set_cluster_label(format!("{}@{}", gateway.context(), gateway.cluster()));

    run(&mut app, &gateway).await
}

fn init_tracing(level_filter: &str, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_new(level_filter)
        .or_else(|_| EnvFilter::try_new("info"))
        .context("failed to initialize tracing filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact();

    // stdout belongs to the terminal UI.
    let _ = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.with_writer(std::io::sink).try_init(),
    };

    Ok(())
}

async fn run(app: &mut App, gateway: &KubeGateway) -> Result<()> {
    let (mut terminal, keyboard_enhanced) = init_terminal()?;
    let run_result = run_loop(&mut terminal, app, gateway).await;
    let restore_result = restore_terminal(&mut terminal, keyboard_enhanced);

    match (run_result, restore_result) {
        (Err(run_error), Err(restore_error)) => Err(anyhow::anyhow!(
            "{run_error:#}\nterminal restore error: {restore_error:#}"
        )),
        (Err(error), _) => Err(error),
        (_, Err(error)) => Err(error),
        (Ok(()), Ok(())) => Ok(()),
    }
}

fn init_terminal() -> Result<(TuiTerminal, bool)> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    let keyboard_enhanced = matches!(supports_keyboard_enhancement(), Ok(true));
    if keyboard_enhanced {
        execute!(
            stdout,
            EnterAlternateScreen,
            PushKeyboardEnhancementFlags(
                KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                    | KeyboardEnhancementFlags::REPORT_ALTERNATE_KEYS
            )
        )
        .context("failed to enter alternate screen with keyboard enhancement")?;
    } else {
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal backend")?;
    terminal.clear().context("failed to clear terminal")?;
    Ok((terminal, keyboard_enhanced))
}

fn restore_terminal(terminal: &mut TuiTerminal, keyboard_enhanced: bool) -> Result<()> {
    if keyboard_enhanced {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)
            .context("failed to pop keyboard enhancement flags")?;
    }
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;
    Ok(())
}

async fn run_loop<G>(terminal: &mut TuiTerminal, app: &mut App, gateway: &G) -> Result<()>
where
    G: ResourceGateway + ?Sized,
{
    app.set_status("Loading namespaces…");
    terminal
        .draw(|frame| ui::render(frame, app))
        .context("failed to render terminal frame")?;
    let initial = app.initial_command();
    run_command(app, gateway, initial).await;

    let mut reader = EventStream::new();
    loop {
        terminal
            .draw(|frame| ui::render(frame, app))
            .context("failed to render terminal frame")?;

        if !app.running() {
            break;
        }

        match reader.next().await {
            Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                if let Some(action) = input::map_key(app.mode(), app.keymap(), key) {
                    debug!("action={action:?}");
                    let command = app.apply_action(action);
                    // Show the loading state before the call blocks the loop.
                    terminal
                        .draw(|frame| ui::render(frame, app))
                        .context("failed to render terminal frame")?;
                    run_command(app, gateway, command).await;
                }
            }
            Some(Ok(Event::Resize(_, _))) => {}
            Some(Ok(_)) => {}
            Some(Err(error)) => {
                app.set_status(format!("terminal event error: {error}"));
            }
            None => {
                app.set_status("terminal event stream closed");
                break;
            }
        }
    }

    Ok(())
}
