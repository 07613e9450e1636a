use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{CommandFactory, Parser};
use color_eyre::eyre::eyre;

mod app;
mod config;
mod debounce;
mod highlight;
mod selection;
mod source;
mod tracing_setup;
mod tree;
mod ui;
mod widgets;

use app::{Action, App};
use config::{PickerConfig, ScopeSet};
use selection::SelectedChannel;
use source::{DocumentSource, TeamSource};

/// Longest the event loop sleeps when no debounce is pending.
const IDLE_POLL: Duration = Duration::from_millis(250);

/// Pick a team channel from a filterable team/channel tree
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a JSON teams document
    #[arg(long)]
    teams_file: Option<PathBuf>,

    /// Command whose stdout is a JSON teams document
    #[arg(long)]
    teams_cmd: Option<String>,

    /// Permission scopes the document must grant
    #[arg(long, value_enum, default_value_t = ScopeSet::Teams)]
    scopes: ScopeSet,

    /// Channel id to select on startup
    #[arg(long)]
    select: Option<String>,

    /// Write logs to this file (filter with TEAMPICK_LOG)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Generate usage spec for this tool
    #[arg(long)]
    usage: bool,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    // Handle --usage flag to output usage spec
    if args.usage {
        let mut cmd = Args::command();
        let bin_name = std::env::args()
            .next()
            .unwrap_or_else(|| "teampick".to_string());
        let mut buf = Vec::new();
        clap_usage::generate(&mut cmd, bin_name, &mut buf);
        print!("{}", String::from_utf8_lossy(&buf));
        return Ok(());
    }

    if let Some(ref log_file) = args.log_file {
        tracing_setup::init_tracing(log_file)?;
    }

    let source = team_source(&args)?;
    let config = PickerConfig::new(args.scopes);
    tracing::info!(scopes = config.scope_set.name(), "starting picker");

    let mut app = App::new(source, config);
    if let Some(ref channel_id) = args.select {
        if !app.select_by_id(channel_id) {
            return Err(eyre!(
                "No channel with id '{}' is available to select",
                channel_id
            ));
        }
        // The initial selection is not a user change.
        app.take_selection_changes();
    }

    // Enable mouse capture before initializing the terminal
    crossterm::execute!(std::io::stderr(), crossterm::event::EnableMouseCapture)?;

    let mut terminal = ratatui::init();
    let result = run_event_loop(&mut terminal, &mut app);

    // Restore terminal and disable mouse capture
    ratatui::restore();
    crossterm::execute!(std::io::stderr(), crossterm::event::DisableMouseCapture)?;

    match result {
        Ok(Some(selected)) => {
            println!("{}", serde_json::to_string(&selected)?);
            Ok(())
        }
        Ok(None) => Ok(()),
        Err(e) => Err(e),
    }
}

/// Build the team source from exactly one of `--teams-file` / `--teams-cmd`.
fn team_source(args: &Args) -> color_eyre::Result<Arc<dyn TeamSource>> {
    match (&args.teams_file, &args.teams_cmd) {
        (Some(_), Some(_)) => Err(eyre!(
            "Cannot specify both --teams-file and --teams-cmd. Use --help for usage information."
        )),
        (None, None) => Err(eyre!(
            "Must specify either --teams-file or --teams-cmd. Use --help for usage information."
        )),
        (Some(path), None) => {
            if !path.exists() {
                return Err(eyre!("Teams file '{}' does not exist", path.display()));
            }
            Ok(Arc::new(DocumentSource::file(path)))
        }
        (None, Some(cmd)) => Ok(Arc::new(DocumentSource::command(cmd))),
    }
}

fn run_event_loop(
    terminal: &mut ratatui::DefaultTerminal,
    app: &mut App,
) -> color_eyre::Result<Option<SelectedChannel>> {
    use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};

    loop {
        app.tick(Instant::now());
        for change in app.take_selection_changes() {
            tracing::info!(change = %serde_json::to_string(&change)?, "selection changed");
        }

        terminal.draw(|frame| ui::render(frame, app))?;

        // Wake up in time for a pending debounce or background load.
        if !event::poll(app.poll_timeout(Instant::now(), IDLE_POLL))? {
            continue;
        }

        let action = match event::read()? {
            Event::Key(key) => {
                if key.kind != KeyEventKind::Press {
                    continue;
                }

                // Global quit shortcut
                if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
                    return Ok(None);
                }

                app.handle_key(key)
            }
            Event::Mouse(mouse) => app.handle_mouse(mouse),
            Event::Resize(_, _) => {
                // Terminal will be redrawn on next loop iteration
                Action::None
            }
            _ => Action::None,
        };

        match action {
            Action::None => {}
            Action::Quit => return Ok(None),
            Action::Accept => {
                if let Some(selected) = app.selected() {
                    return Ok(Some(selected.clone()));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_require_exactly_one_source() {
        let both = Args::parse_from(["teampick", "--teams-file", "a.json", "--teams-cmd", "cat a.json"]);
        let err = team_source(&both).err().unwrap();
        assert!(err.to_string().contains("Cannot specify both"));

        let neither = Args::parse_from(["teampick"]);
        let err = team_source(&neither).err().unwrap();
        assert!(err.to_string().contains("Must specify either"));
    }

    #[test]
    fn test_missing_teams_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let args = Args::parse_from(["teampick", "--teams-file", path.to_str().unwrap()]);
        let err = team_source(&args).err().unwrap();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_scopes_flag() {
        let args = Args::parse_from(["teampick", "--teams-cmd", "true", "--scopes", "graph"]);
        assert_eq!(args.scopes, ScopeSet::Graph);
        let args = Args::parse_from(["teampick", "--teams-cmd", "true"]);
        assert_eq!(args.scopes, ScopeSet::Teams);
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Args::command().debug_assert();
    }
}
