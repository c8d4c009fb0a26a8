use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use hark::{
    audio::AudioNarrator,
    clock::Clock,
    engine::{GameState, GameView, InputFeedback},
};

use crate::App;

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;
const INPUT_MIN_WIDTH: u16 = 30;

fn feedback_color(feedback: InputFeedback) -> Color {
    match feedback {
        InputFeedback::Inactive => Color::DarkGray,
        InputFeedback::Empty => Color::Gray,
        InputFeedback::OnTrack => Color::Cyan,
        InputFeedback::Mismatch => Color::Red,
        InputFeedback::Complete => Color::Green,
    }
}

fn legend(state: GameState, debug: bool) -> String {
    let mut keys = match state {
        GameState::Idle => "enter start",
        GameState::Countdown => "ctrl+r restart",
        GameState::Preparing | GameState::Running => "tab replay · ctrl+r restart",
        GameState::Finished => "enter play again · tab replay",
    }
    .to_string();
    if debug {
        keys.push_str(" · ctrl+d reveal");
    }
    keys.push_str(" · esc quit");
    keys
}

/// A `width` x `height` rect centred in `area`, clamped to fit.
fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

fn render_message(lines: Vec<Line>, area: Rect, buf: &mut Buffer) {
    let height = lines.len() as u16;
    let rect = centered(area, area.width, height);
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(rect, buf);
}

fn render_input(view: &GameView, area: Rect, buf: &mut Buffer) {
    let color = feedback_color(view.feedback);
    let width = u16::try_from(view.typed_input.width())
        .unwrap_or(u16::MAX)
        .saturating_add(4)
        .max(INPUT_MIN_WIDTH);
    let rect = centered(area, width, 3);

    let mut spans = if view.typed_input.is_empty() {
        vec![]
    } else {
        vec![Span::styled(
            view.typed_input.to_string(),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )]
    };
    // cursor
    spans.push(Span::styled(
        " ",
        Style::default().add_modifier(Modifier::UNDERLINED | Modifier::SLOW_BLINK),
    ));

    Paragraph::new(Line::from(spans))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color))
                .title("type what you hear"),
        )
        .render(rect, buf);
}

impl<N: AudioNarrator, C: Clock> Widget for &App<N, C> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let view = self.engine.view();

        let bold_style = Style::default().add_modifier(Modifier::BOLD);
        let dim_style = Style::default().add_modifier(Modifier::DIM);
        let italic_style = Style::default().add_modifier(Modifier::ITALIC);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints([
                Constraint::Min(3),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(area);

        match view.state {
            GameState::Idle => render_message(
                vec![
                    Line::from(Span::styled(
                        "Press Enter to start",
                        Style::default()
                            .fg(Color::Yellow)
                            .add_modifier(Modifier::BOLD | Modifier::ITALIC),
                    )),
                    Line::from(Span::styled(
                        "listen for the word, then type it",
                        dim_style,
                    )),
                ],
                chunks[0],
                buf,
            ),
            GameState::Countdown => render_message(
                vec![
                    Line::from(Span::styled(
                        view.countdown_remaining.to_string(),
                        bold_style.fg(Color::Magenta),
                    )),
                    Line::from(Span::styled("get ready", dim_style)),
                ],
                chunks[0],
                buf,
            ),
            GameState::Preparing => render_message(
                vec![Line::from(Span::styled(
                    "Listen...",
                    italic_style.fg(Color::Cyan),
                ))],
                chunks[0],
                buf,
            ),
            GameState::Running => render_input(&view, chunks[0], buf),
            GameState::Finished => {
                let mut lines = vec![Line::from(Span::styled(
                    view.target_word.to_string(),
                    bold_style.fg(Color::Green),
                ))];
                if let Some(score) = view.score {
                    lines.push(Line::from(vec![
                        Span::styled("Time: ", dim_style),
                        Span::styled(format!("{:.2}s", score.elapsed_seconds), bold_style),
                        Span::styled("   WPM: ", dim_style),
                        Span::styled(format!("{:.2}", score.wpm), bold_style),
                    ]));
                }
                render_message(lines, chunks[0], buf);
            }
        }

        if let Some(notice) = &self.notice {
            Paragraph::new(Span::styled(notice.as_str(), italic_style.fg(Color::Yellow)))
                .alignment(Alignment::Center)
                .render(chunks[1], buf);
        }

        Paragraph::new(Span::styled(legend(view.state, self.debug), dim_style))
            .alignment(Alignment::Center)
            .render(chunks[2], buf);
    }
}
