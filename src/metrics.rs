/// Characters that make up one "word" for speed purposes
pub const CHARS_PER_WORD: u64 = 5;

/// Derived results of a typing session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionMetrics {
    pub elapsed_seconds: u32,
    pub total_characters_typed: usize,
    pub error_count: usize,
    pub wpm: u32,
    pub accuracy_percent: u8,
}

impl SessionMetrics {
    /// Characters typed expressed as five-character words
    pub fn words_typed(&self) -> u64 {
        div_round_half_up(self.total_characters_typed as u64, CHARS_PER_WORD)
    }
}

/// Compute speed and accuracy.
///
/// `wpm = round((chars / 5) / (secs / 60))`, 0 when no time has elapsed.
/// `accuracy = round((chars - errors) / chars * 100)`, 100 when nothing was typed.
pub fn compute(
    elapsed_seconds: u32,
    total_characters_typed: usize,
    error_count: usize,
) -> SessionMetrics {
    SessionMetrics {
        elapsed_seconds,
        total_characters_typed,
        error_count,
        wpm: wpm(elapsed_seconds, total_characters_typed),
        accuracy_percent: accuracy_percent(total_characters_typed, error_count),
    }
}

fn wpm(elapsed_seconds: u32, chars: usize) -> u32 {
    if elapsed_seconds == 0 {
        return 0;
    }
    // (chars / 5) / (secs / 60) == chars * 60 / (5 * secs)
    let value = div_round_half_up(chars as u64 * 60, CHARS_PER_WORD * elapsed_seconds as u64);
    u32::try_from(value).unwrap_or(u32::MAX)
}

fn accuracy_percent(chars: usize, errors: usize) -> u8 {
    if chars == 0 {
        return 100;
    }
    let correct = chars.saturating_sub(errors) as u64;
    let value = div_round_half_up(correct * 100, chars as u64);
    value.min(100) as u8
}

/// Integer division rounding halves up; `denominator` must be non-zero
fn div_round_half_up(numerator: u64, denominator: u64) -> u64 {
    (2 * numerator + denominator) / (2 * denominator)
}
