use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use env_logger::{Builder, Env, Target};
use log::info;
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    fs::{self, OpenOptions},
    io::{self, stdin},
    time::Duration,
};

use typesprint::{
    app::{build_session, App, Control},
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    corpus::{Corpus, FixedCorpus, ParagraphCorpus, ReferenceText},
    high_score::RecordRule,
    runtime::{CrosstermEventSource, Runner},
    stats::{ScoreDb, HIGH_SCORE_KEY},
};

const POLL_INTERVAL_MS: u64 = 100;

/// timed typing test with live accuracy and a persistent high score
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A timed typing test for the terminal. Type the shown paragraph before the countdown runs out; errors are highlighted as you go and your best words-per-minute is kept between runs."
)]
pub struct Cli {
    /// length of the countdown in seconds
    #[clap(short = 's', long, value_parser = clap::value_parser!(u32).range(1..))]
    duration_secs: Option<u32>,

    /// custom text to type instead of a random paragraph
    #[clap(short = 'p', long)]
    prompt: Option<String>,

    /// when a score counts as a new record
    #[clap(long, value_enum)]
    record_rule: Option<RecordRule>,

    /// keep the high score in memory only for this run
    #[clap(long)]
    no_persist: bool,

    /// write the effective settings to the config file
    #[clap(long)]
    save_config: bool,

    /// print the best score and the last N sessions, then exit
    #[clap(long, value_name = "N")]
    history: Option<usize>,
}

impl Cli {
    /// Layer command line flags over stored settings
    fn apply(&self, mut config: Config) -> Config {
        if let Some(secs) = self.duration_secs {
            config.duration_secs = secs;
        }
        if let Some(rule) = self.record_rule {
            config.record_rule = rule;
        }
        if self.no_persist {
            config.persist_scores = false;
        }
        config
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging();

    let store = FileConfigStore::new();
    let config = cli.apply(store.load());
    if cli.save_config {
        store.save(&config)?;
        info!("saved settings to {}", store.path().display());
    }

    if let Some(limit) = cli.history {
        return print_history(limit);
    }

    let corpus: Box<dyn Corpus> = match &cli.prompt {
        Some(text) => match ReferenceText::new(text.as_str()) {
            Ok(text) => Box::new(FixedCorpus::new(text)),
            Err(e) => {
                let mut cmd = Cli::command();
                cmd.error(ErrorKind::InvalidValue, e).exit();
            }
        },
        None => Box::new(ParagraphCorpus::embedded()?),
    };

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let events = CrosstermEventSource::new();
    let session = build_session(&config, corpus, Box::new(events.tick_scheduler()));
    let mut app = App::new(session);
    let runner = Runner::new(events, Duration::from_millis(POLL_INTERVAL_MS));

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let outcome = start_tui(&mut terminal, &mut app, &runner);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    outcome
}

fn start_tui<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<CrosstermEventSource>,
) -> Result<(), Box<dyn Error>> {
    terminal.draw(|f| f.render_widget(&*app, f.area()))?;

    loop {
        let Some(event) = runner.step() else {
            continue;
        };

        match app.handle_event(event) {
            Control::Quit => break,
            Control::Redraw => {
                terminal.draw(|f| f.render_widget(&*app, f.area()))?;
            }
            Control::Continue => {}
        }
    }

    Ok(())
}

/// Send log records to a file in the state dir; the terminal belongs to the TUI.
fn init_logging() {
    let Some(path) = AppDirs::log_path() else {
        return;
    };
    if let Some(parent) = path.parent() {
        if fs::create_dir_all(parent).is_err() {
            return;
        }
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };

    let _ = Builder::from_env(Env::default().default_filter_or("warn"))
        .target(Target::Pipe(Box::new(file)))
        .try_init();
}

fn print_history(limit: usize) -> Result<(), Box<dyn Error>> {
    let db = ScoreDb::open_default()?;

    match db.get_value(HIGH_SCORE_KEY)? {
        Some(best) => println!("best: {} wpm", best),
        None => println!("best: none yet"),
    }

    let sessions = db.recent_sessions(limit)?;
    if sessions.is_empty() {
        println!("no sessions recorded yet");
        return Ok(());
    }

    for s in sessions {
        println!(
            "{}  {:>3} wpm  {:>3}% acc  {:>3} errors  {:>4} chars  {:>3}/{}s  {}",
            s.timestamp.format("%Y-%m-%d %H:%M"),
            s.wpm,
            s.accuracy,
            s.errors,
            s.characters,
            s.elapsed_secs,
            s.duration_secs,
            if s.completed { "completed" } else { "time up" }
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["typesprint"]);

        assert_eq!(cli.duration_secs, None);
        assert_eq!(cli.prompt, None);
        assert_eq!(cli.record_rule, None);
        assert!(!cli.no_persist);
        assert!(!cli.save_config);
        assert_eq!(cli.history, None);
    }

    #[test]
    fn test_cli_duration() {
        let cli = Cli::parse_from(["typesprint", "-s", "30"]);
        assert_eq!(cli.duration_secs, Some(30));

        let cli = Cli::parse_from(["typesprint", "--duration-secs", "120"]);
        assert_eq!(cli.duration_secs, Some(120));
    }

    #[test]
    fn test_cli_rejects_zero_duration() {
        assert!(Cli::try_parse_from(["typesprint", "-s", "0"]).is_err());
    }

    #[test]
    fn test_cli_custom_prompt() {
        let cli = Cli::parse_from(["typesprint", "-p", "hello world"]);
        assert_eq!(cli.prompt, Some("hello world".to_string()));
    }

    #[test]
    fn test_cli_record_rule() {
        let cli = Cli::parse_from(["typesprint", "--record-rule", "at-least"]);
        assert_eq!(cli.record_rule, Some(RecordRule::AtLeastWhenSet));

        let cli = Cli::parse_from(["typesprint", "--record-rule", "strict"]);
        assert_eq!(cli.record_rule, Some(RecordRule::StrictlyGreater));

        assert!(Cli::try_parse_from(["typesprint", "--record-rule", "sometimes"]).is_err());
    }

    #[test]
    fn test_cli_history() {
        let cli = Cli::parse_from(["typesprint", "--history", "5"]);
        assert_eq!(cli.history, Some(5));
    }

    #[test]
    fn test_apply_keeps_stored_settings_without_flags() {
        let stored = Config {
            duration_secs: 45,
            record_rule: RecordRule::AtLeastWhenSet,
            persist_scores: true,
            record_history: false,
        };
        let cli = Cli::parse_from(["typesprint"]);

        assert_eq!(cli.apply(stored.clone()), stored);
    }

    #[test]
    fn test_apply_flags_override_stored_settings() {
        let cli = Cli::parse_from([
            "typesprint",
            "-s",
            "15",
            "--record-rule",
            "at-least",
            "--no-persist",
        ]);
        let config = cli.apply(Config::default());

        assert_eq!(config.duration_secs, 15);
        assert_eq!(config.record_rule, RecordRule::AtLeastWhenSet);
        assert!(!config.persist_scores);
        assert!(config.record_history);
    }
}
