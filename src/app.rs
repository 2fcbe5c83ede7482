use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use log::warn;

use crate::clock::{Clock, TickScheduler, DEFAULT_TICK_INTERVAL};
use crate::config::Config;
use crate::corpus::Corpus;
use crate::high_score::{HighScoreBoard, MemoryScoreStorage, ScoreStorage};
use crate::runtime::AppEvent;
use crate::session::{Session, Transition};
use crate::stats::ScoreDb;

/// What the event loop should do after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Redraw,
    Quit,
}

/// Front-end state: the session plus key mapping
pub struct App {
    pub session: Session,
}

impl App {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    pub fn handle_event(&mut self, event: AppEvent) -> Control {
        match event {
            AppEvent::Tick(generation) => redraw_unless_ignored(self.session.on_tick(generation)),
            AppEvent::Resize => Control::Redraw,
            AppEvent::Key(key) => self.on_key(key),
        }
    }

    fn on_key(&mut self, key: KeyEvent) -> Control {
        if key.kind != KeyEventKind::Press {
            return Control::Continue;
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let transition = match key.code {
            KeyCode::Esc => return Control::Quit,
            KeyCode::Char('c') if ctrl => return Control::Quit,
            KeyCode::Char('r') if ctrl => self.session.retry(),
            KeyCode::Tab => self.session.reset(),
            KeyCode::Backspace => self.session.backspace(),
            KeyCode::Char(c) if !ctrl && !key.modifiers.contains(KeyModifiers::ALT) => {
                self.session.type_char(c)
            }
            _ => Transition::Ignored,
        };

        redraw_unless_ignored(transition)
    }
}

fn redraw_unless_ignored(transition: Transition) -> Control {
    match transition {
        Transition::Ignored => Control::Continue,
        _ => Control::Redraw,
    }
}

/// Assemble a session from settings.
///
/// The database is opened once and shared by the score board and the
/// history log; scores fall back to memory when it cannot be opened.
pub fn build_session(
    config: &Config,
    corpus: Box<dyn Corpus>,
    scheduler: Box<dyn TickScheduler>,
) -> Session {
    let clock = Clock::new(config.duration_secs, DEFAULT_TICK_INTERVAL, scheduler);

    let db = if config.persist_scores {
        match ScoreDb::open_default() {
            Ok(db) => Some(db),
            Err(e) => {
                warn!("high score will not persist: {}", e);
                None
            }
        }
    } else {
        None
    };

    session_with_db(config, corpus, clock, db)
}

fn session_with_db(
    config: &Config,
    corpus: Box<dyn Corpus>,
    clock: Clock,
    db: Option<ScoreDb>,
) -> Session {
    let storage: Box<dyn ScoreStorage> = match &db {
        Some(db) => Box::new(db.clone()),
        None => Box::new(MemoryScoreStorage::default()),
    };

    let session = Session::new(
        corpus,
        clock,
        HighScoreBoard::load(storage, config.record_rule),
    );

    match db {
        Some(db) if config.record_history => session.with_history(Box::new(db)),
        _ => session,
    }
}
