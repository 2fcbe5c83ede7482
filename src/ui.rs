use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use crate::app::App;
use crate::diff::Verdict;
use crate::session::{FinishReason, Phase, SessionResult, SessionView};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let view = self.session.view();

        let result_lines = if view.result.is_some() { 5 } else { 0 };
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints([
                Constraint::Length(1), // stats
                Constraint::Length(1), // padding
                Constraint::Length(1), // progress
                Constraint::Length(1), // padding
                Constraint::Min(1),    // prompt
                Constraint::Length(result_lines),
                Constraint::Length(1), // legend
            ])
            .split(area);

        stats_line(&view).render(chunks[0], buf);

        Gauge::default()
            .gauge_style(Style::default().fg(Color::Cyan))
            .percent(u16::from(view.progress_percent))
            .label(format!("{}%", view.progress_percent))
            .render(chunks[2], buf);

        let max_chars_per_line = chunks[4].width as usize;
        let single_line = view.reference.as_str().width() <= max_chars_per_line;
        Paragraph::new(Line::from(prompt_spans(&view)))
            .alignment(if single_line {
                // short prompts sit centered
                Alignment::Center
            } else {
                Alignment::Left
            })
            .wrap(Wrap { trim: false })
            .render(chunks[4], buf);

        if let Some(result) = view.result {
            result_block(result, view.high_score).render(chunks[5], buf);
        }

        let legend = match view.phase {
            Phase::Idle => "start typing to begin | (tab) new text | (esc) quit",
            Phase::Active => "(tab) new text | (ctrl+r) retry | (esc) quit",
            Phase::Finished => "(tab) new text | (ctrl+r) retry same text | (esc) quit",
        };
        Paragraph::new(Span::styled(
            legend,
            Style::default().add_modifier(Modifier::ITALIC | Modifier::DIM),
        ))
        .alignment(Alignment::Center)
        .render(chunks[6], buf);
    }
}

fn stats_line(view: &SessionView<'_>) -> Paragraph<'static> {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let dim = Style::default().add_modifier(Modifier::DIM);

    let (wpm, accuracy) = match view.result {
        Some(r) => (
            r.metrics.wpm.to_string(),
            format!("{}%", r.metrics.accuracy_percent),
        ),
        None => ("-".to_string(), "-%".to_string()),
    };
    let best = if view.high_score > 0 {
        format!(" (best {})", view.high_score)
    } else {
        " (no record yet)".to_string()
    };
    let chars = view.typed.len();
    let words = view
        .live_metrics
        .map(|m| m.words_typed())
        .unwrap_or_default();

    let line = Line::from(vec![
        Span::styled(format!("{}s", view.remaining_secs), bold),
        Span::styled(" left  ", dim),
        Span::styled(wpm, bold),
        Span::styled(" wpm", dim),
        Span::styled(best, dim),
        Span::raw("  "),
        Span::styled(accuracy, bold),
        Span::styled(format!(" acc ({} errors)  ", view.error_count), dim),
        Span::styled(chars.to_string(), bold),
        Span::styled(format!(" chars / {} words", words), dim),
    ]);

    Paragraph::new(line).alignment(Alignment::Center)
}

fn prompt_spans(view: &SessionView<'_>) -> Vec<Span<'static>> {
    let bold_style = Style::default().add_modifier(Modifier::BOLD);
    let green_bold_style = bold_style.fg(Color::Green);
    let red_bold_style = bold_style.fg(Color::Red);
    let dim_bold_style = bold_style.add_modifier(Modifier::DIM);
    let underlined_dim_bold_style = dim_bold_style.add_modifier(Modifier::UNDERLINED);

    view.reference
        .chars()
        .iter()
        .zip(view.verdicts.iter())
        .enumerate()
        .map(|(idx, (expected, verdict))| match verdict {
            Verdict::Correct => Span::styled(expected.to_string(), green_bold_style),
            Verdict::Incorrect => {
                let typed = view.typed.get(idx).copied().unwrap_or(*expected);
                Span::styled(
                    match typed {
                        ' ' => "·".to_owned(),
                        c => c.to_string(),
                    },
                    red_bold_style,
                )
            }
            Verdict::PendingCurrent => Span::styled(expected.to_string(), underlined_dim_bold_style),
            Verdict::Untyped => Span::styled(expected.to_string(), dim_bold_style),
        })
        .collect()
}

fn result_block(result: &SessionResult, high_score: u32) -> Paragraph<'static> {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let m = &result.metrics;

    let title = match result.reason {
        FinishReason::Completed => "Completed",
        FinishReason::TimeExpired => "Time's up",
    };

    let mut lines = vec![Line::from(vec![
        Span::styled(format!("{} wpm", m.wpm), bold.fg(Color::Magenta)),
        Span::raw(format!(
            "   {}% acc   {} errors   {} chars in {}s",
            m.accuracy_percent, m.error_count, m.total_characters_typed, m.elapsed_seconds
        )),
    ])];

    lines.push(if result.new_record {
        Line::from(Span::styled(
            format!("New record! (previous best {})", result.previous_best),
            bold.fg(Color::Yellow),
        ))
    } else {
        Line::from(format!("Best: {} wpm", high_score))
    });

    if let Some(err) = &result.persist_error {
        lines.push(Line::from(Span::styled(
            format!("record not saved: {}", err),
            Style::default().fg(Color::Red),
        )));
    }

    Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(title))
        .alignment(Alignment::Center)
}
