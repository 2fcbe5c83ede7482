use chrono::Local;
use log::{debug, info, warn};

use crate::clock::{Clock, ClockSignal, Generation};
use crate::corpus::{Corpus, ReferenceText};
use crate::diff::{self, Classification, Verdict};
use crate::high_score::HighScoreBoard;
use crate::metrics::{self, SessionMetrics};
use crate::stats::{SessionLog, SessionRecord};

/// Lifecycle of one typing test
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Phase {
    /// Waiting for the first keystroke; clock not running
    Idle,
    Active,
    /// Terminal until reset; input is ignored
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum FinishReason {
    Completed,
    TimeExpired,
}

/// What an input event or tick did to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Ignored,
    Started,
    Updated,
    Ticked,
    Finished(FinishReason),
    Reset,
}

/// Frozen outcome of a finished session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionResult {
    pub metrics: SessionMetrics,
    pub reason: FinishReason,
    pub new_record: bool,
    pub previous_best: u32,
    /// Set when the new record could not be written to storage
    pub persist_error: Option<String>,
}

/// Read-only snapshot handed to the renderer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView<'a> {
    pub phase: Phase,
    pub reference: &'a ReferenceText,
    pub typed: &'a [char],
    pub verdicts: Vec<Verdict>,
    pub remaining_secs: u32,
    pub duration_secs: u32,
    pub progress_percent: u8,
    pub error_count: usize,
    pub live_metrics: Option<SessionMetrics>,
    pub result: Option<&'a SessionResult>,
    pub high_score: u32,
}

/// The typing test state machine.
///
/// Owns the typed prefix and drives the clock, the diff, the metrics and the
/// high-score board. Every method runs to completion for a single event.
pub struct Session {
    corpus: Box<dyn Corpus>,
    clock: Clock,
    high_scores: HighScoreBoard,
    history: Option<Box<dyn SessionLog>>,
    reference: ReferenceText,
    typed: Vec<char>,
    phase: Phase,
    error_count: usize,
    result: Option<SessionResult>,
}

impl Session {
    pub fn new(mut corpus: Box<dyn Corpus>, clock: Clock, high_scores: HighScoreBoard) -> Self {
        let reference = corpus.next_reference_text();
        Self {
            corpus,
            clock,
            high_scores,
            history: None,
            reference,
            typed: Vec::new(),
            phase: Phase::Idle,
            error_count: 0,
            result: None,
        }
    }

    /// Append every finished session to `log`
    pub fn with_history(mut self, log: Box<dyn SessionLog>) -> Self {
        self.history = Some(log);
        self
    }

    /// Replace the typed prefix with `new_prefix`
    pub fn text_changed(&mut self, new_prefix: &str) -> Transition {
        self.apply_prefix(new_prefix.chars().collect())
    }

    pub fn type_char(&mut self, c: char) -> Transition {
        if self.phase == Phase::Finished {
            return Transition::Ignored;
        }
        let mut next = self.typed.clone();
        next.push(c);
        self.apply_prefix(next)
    }

    pub fn backspace(&mut self) -> Transition {
        if self.phase == Phase::Finished || self.typed.is_empty() {
            return Transition::Ignored;
        }
        let mut next = self.typed.clone();
        next.pop();
        self.apply_prefix(next)
    }

    /// Advance the countdown for a tick produced by run `generation`
    pub fn on_tick(&mut self, generation: Generation) -> Transition {
        if self.phase != Phase::Active {
            return Transition::Ignored;
        }
        match self.clock.tick(generation) {
            ClockSignal::Ignored => Transition::Ignored,
            ClockSignal::Ticked { .. } => Transition::Ticked,
            ClockSignal::Expired => self.finish(FinishReason::TimeExpired),
        }
    }

    /// Start over with a fresh reference text; allowed from any phase
    pub fn reset(&mut self) -> Transition {
        self.clock.rewind();
        self.reference = self.corpus.next_reference_text();
        self.clear();
        debug!("session reset with new reference text");
        Transition::Reset
    }

    /// Start over with the same reference text
    pub fn retry(&mut self) -> Transition {
        self.clock.rewind();
        self.clear();
        debug!("session reset with same reference text");
        Transition::Reset
    }

    fn clear(&mut self) {
        self.typed.clear();
        self.error_count = 0;
        self.result = None;
        self.phase = Phase::Idle;
    }

    fn apply_prefix(&mut self, mut next: Vec<char>) -> Transition {
        if self.phase == Phase::Finished {
            debug!("input after finish ignored");
            return Transition::Ignored;
        }

        let limit = self.reference.char_count();
        if next.len() > limit {
            warn!(
                "input of {} chars exceeds reference of {}; truncating",
                next.len(),
                limit
            );
            next.truncate(limit);
        }

        let started = match self.phase {
            Phase::Idle if next.is_empty() => return Transition::Ignored,
            Phase::Idle => {
                self.phase = Phase::Active;
                self.clock.start();
                true
            }
            _ => false,
        };

        if !started && next == self.typed {
            return Transition::Ignored;
        }

        self.typed = next;
        self.error_count = diff::error_count(self.reference.chars(), &self.typed);

        if self.typed.len() == limit && self.classification().is_complete() {
            return self.finish(FinishReason::Completed);
        }

        if started {
            Transition::Started
        } else {
            Transition::Updated
        }
    }

    fn finish(&mut self, reason: FinishReason) -> Transition {
        self.clock.stop();

        let metrics = metrics::compute(self.clock.elapsed(), self.typed.len(), self.error_count);
        let previous_best = self.high_scores.read();
        let (new_record, persist_error) = match self.high_scores.write_if_greater(metrics.wpm) {
            Ok(updated) => (updated, None),
            Err(e) => {
                warn!("unable to persist high score {}: {}", metrics.wpm, e);
                (true, Some(e.to_string()))
            }
        };

        self.append_history(&metrics, reason);

        info!(
            "session finished ({}): {} wpm, {}% accuracy, {} error(s) in {}s",
            reason,
            metrics.wpm,
            metrics.accuracy_percent,
            metrics.error_count,
            metrics.elapsed_seconds
        );

        self.phase = Phase::Finished;
        self.result = Some(SessionResult {
            metrics,
            reason,
            new_record,
            previous_best,
            persist_error,
        });
        Transition::Finished(reason)
    }

    fn append_history(&mut self, metrics: &SessionMetrics, reason: FinishReason) {
        let duration_secs = self.clock.duration();
        if let Some(log) = self.history.as_mut() {
            let record = SessionRecord {
                timestamp: Local::now(),
                duration_secs,
                elapsed_secs: metrics.elapsed_seconds,
                characters: metrics.total_characters_typed,
                errors: metrics.error_count,
                wpm: metrics.wpm,
                accuracy: metrics.accuracy_percent,
                completed: reason == FinishReason::Completed,
            };
            if let Err(e) = log.append(&record) {
                warn!("unable to record session history: {}", e);
            }
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn reference(&self) -> &ReferenceText {
        &self.reference
    }

    pub fn typed(&self) -> &[char] {
        &self.typed
    }

    pub fn typed_string(&self) -> String {
        self.typed.iter().collect()
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn remaining_secs(&self) -> u32 {
        self.clock.remaining()
    }

    pub fn duration_secs(&self) -> u32 {
        self.clock.duration()
    }

    pub fn clock_generation(&self) -> Generation {
        self.clock.generation()
    }

    pub fn is_clock_running(&self) -> bool {
        self.clock.is_running()
    }

    pub fn result(&self) -> Option<&SessionResult> {
        self.result.as_ref()
    }

    pub fn high_score(&self) -> u32 {
        self.high_scores.read()
    }

    pub fn classification(&self) -> Classification {
        diff::classify(self.reference.chars(), &self.typed)
    }

    /// Metrics as of now; frozen once finished, absent before the first keystroke
    pub fn live_metrics(&self) -> Option<SessionMetrics> {
        match self.phase {
            Phase::Idle => None,
            Phase::Active => Some(metrics::compute(
                self.clock.elapsed(),
                self.typed.len(),
                self.error_count,
            )),
            Phase::Finished => self.result.as_ref().map(|r| r.metrics),
        }
    }

    pub fn progress_percent(&self) -> u8 {
        (self.typed.len() * 100 / self.reference.char_count()).min(100) as u8
    }

    pub fn view(&self) -> SessionView<'_> {
        SessionView {
            phase: self.phase,
            reference: &self.reference,
            typed: &self.typed,
            verdicts: self.classification().verdicts,
            remaining_secs: self.clock.remaining(),
            duration_secs: self.clock.duration(),
            progress_percent: self.progress_percent(),
            error_count: self.error_count,
            live_metrics: self.live_metrics(),
            result: self.result.as_ref(),
            high_score: self.high_scores.read(),
        }
    }
}
