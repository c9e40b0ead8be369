pub mod screen;

use drivethru::{
    catalog::ExposedCode,
    code::CODE_WIDTH,
    evaluator::{Feedback, Outcome, Phase},
    mode::{GameMode, Representation},
    scene::{Frame as SceneFrame, Scene, CAR_TRACK_LENGTH},
};
use itertools::Itertools;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
};

use crate::App;

const HORIZONTAL_MARGIN: u16 = 3;
const FINGER_WEIGHTS: [u8; CODE_WIDTH] = [16, 8, 4, 2, 1];

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim() -> Style {
    Style::default().add_modifier(Modifier::DIM)
}

fn format_remaining(ms: u64) -> String {
    format!("{:.1}s", ms as f64 / 1000.0)
}

/// Rect of at most `width` x `height` in the middle of `area`
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

/// Mode picker shown before a game
pub struct MenuView<'a>(pub &'a App);

impl Widget for MenuView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let app = self.0;
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(6),
                Constraint::Length(3),
                Constraint::Length(2),
            ])
            .split(area);

        Paragraph::new(Span::styled(
            "DRIVE-THRU BINARY",
            bold().fg(Color::Yellow),
        ))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::BOTTOM))
        .render(chunks[0], buf);

        let selected = app.selected_mode();
        let rows: Vec<Line> = GameMode::ALL
            .iter()
            .map(|mode| {
                let policy = mode.policy();
                let marker = if *mode == selected { "> " } else { "  " };
                let style = if *mode == selected {
                    bold().fg(Color::Cyan)
                } else {
                    Style::default()
                };
                Line::from(vec![
                    Span::styled(format!("{}{:<16}", marker, mode.display_name()), style),
                    Span::styled(format!("{:>4}s  ", policy.duration_ms / 1000), dim()),
                    Span::styled(format!("{:<12}", mode.hands_label()), dim()),
                    Span::styled(format!("{:<18}", mode.validate_label()), dim()),
                    Span::styled(
                        format!("best {:<4}", app.session.best_score(*mode)),
                        Style::default().fg(Color::Magenta),
                    ),
                    Span::styled(
                        format!("played {}", app.session.games_played(*mode)),
                        dim(),
                    ),
                ])
            })
            .collect();
        Paragraph::new(rows)
            .block(Block::default().borders(Borders::ALL).title("Modes"))
            .render(chunks[1], buf);

        Paragraph::new(selected.policy().instructions)
            .style(Style::default().add_modifier(Modifier::ITALIC))
            .wrap(Wrap { trim: true })
            .render(chunks[2], buf);

        let footer = match &app.notice {
            Some(notice) => Line::from(Span::styled(notice.as_str(), bold().fg(Color::Red))),
            None => Line::from(Span::styled(
                "(↑/↓) choose   (enter) open the window   (q) quit",
                dim(),
            )),
        };
        Paragraph::new(footer)
            .alignment(Alignment::Center)
            .render(chunks[3], buf);
    }
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let session = &self.session;
        let frame = session.active_frame();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .constraints([
                Constraint::Length(2),
                Constraint::Min(8),
                Constraint::Length(1),
            ])
            .split(area);

        self.render_header(&frame, chunks[0], buf);
        match frame.scene {
            Scene::Order => self.render_order_scene(&frame, chunks[1], buf),
            Scene::Prep => self.render_prep_scene(&frame, chunks[1], buf),
        }
        self.render_footer(chunks[2], buf);

        match session.phase() {
            Phase::Awaiting if session.is_paused() => {
                render_overlay(
                    vec![
                        Line::from(Span::styled("PAUSED", bold().fg(Color::Yellow))),
                        Line::from(""),
                        Line::from(Span::styled("(esc) resume   (b) menu", dim())),
                    ],
                    area,
                    buf,
                );
            }
            Phase::Resolved(_) => {
                if let Some(feedback) = session.feedback() {
                    render_overlay(
                        feedback_lines(feedback, session.score(), session.is_new_highscore()),
                        area,
                        buf,
                    );
                }
            }
            _ => {}
        }
    }
}

impl App {
    fn render_header(&self, frame: &SceneFrame, area: Rect, buf: &mut Buffer) {
        let session = &self.session;
        let timer_style = if frame.remaining_ms <= 3_000 {
            bold().fg(Color::Red)
        } else {
            bold()
        };
        let (window, kitchen) = match frame.scene {
            Scene::Order => (bold().fg(Color::Cyan), dim()),
            Scene::Prep => (dim(), bold().fg(Color::Cyan)),
        };

        let line = Line::from(vec![
            Span::styled(format!("{} ", session.mode().display_name()), bold().fg(Color::Yellow)),
            Span::raw(format!("  score {}", session.score())),
            Span::styled(format!("  best {}", session.highscore()), dim()),
            Span::raw("   "),
            Span::styled(format_remaining(frame.remaining_ms), timer_style),
            Span::raw("   "),
            Span::styled("[window]", window),
            Span::raw(" "),
            Span::styled("[kitchen]", kitchen),
        ]);
        Paragraph::new(line)
            .block(Block::default().borders(Borders::BOTTOM))
            .render(area, buf);
    }

    fn render_order_scene(&self, frame: &SceneFrame, area: Rect, buf: &mut Buffer) {
        let session = &self.session;
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(area);

        let exposed_as = session.mode().policy().exposed_as;
        let deals: Vec<Line> = session
            .deals()
            .iter()
            .map(|item| {
                let code = match exposed_as {
                    Representation::Bits => item.code.binary_string(),
                    Representation::Decimal => item.code.decimal().to_string(),
                };
                Line::from(vec![
                    Span::raw(format!("{:<14}", item.name)),
                    Span::styled(code, bold().fg(Color::Green)),
                ])
            })
            .collect();
        Paragraph::new(deals)
            .block(Block::default().borders(Borders::ALL).title("Daily deals"))
            .render(chunks[0], buf);

        let track = format!(
            "{}o=o>{}|#|",
            " ".repeat(frame.car_position as usize),
            " ".repeat((CAR_TRACK_LENGTH - frame.car_position) as usize),
        );
        let mut lines = vec![Line::from(""), Line::from(Span::raw(track)), Line::from("")];

        match session.order() {
            Some(order) if frame.show_order => {
                let requested = match order.exposed {
                    ExposedCode::Bits(code) => format!("{}(2)", code.binary_string()),
                    ExposedCode::Decimal(d) => format!("{}(10)", d),
                };
                lines.push(Line::from(vec![
                    Span::raw("One "),
                    Span::styled(order.item.name.as_str(), bold()),
                    Span::raw(", please! "),
                ]));
                lines.push(Line::from(Span::styled(requested, bold().fg(Color::Green))));
            }
            _ => lines.push(Line::from(Span::styled("...", dim()))),
        }

        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title("Window"))
            .render(chunks[1], buf);
    }

    fn render_prep_scene(&self, frame: &SceneFrame, area: Rect, buf: &mut Buffer) {
        let mode = self.session.mode();
        let raised = bold().fg(Color::Green);

        let fingers = self
            .fingers
            .iter()
            .map(|b| {
                if *b == 1 {
                    Span::styled(" | ", raised)
                } else {
                    Span::styled(" _ ", dim())
                }
            })
            .collect_vec();
        let weights = FINGER_WEIGHTS.iter().map(|w| format!("{:^3}", w)).join("");
        let keys = (1..=CODE_WIDTH).map(|k| format!("{:^3}", k)).join("");

        // a steam puff that drifts while the kitchen is busy
        let steam = [" ~ ", "  ~", "~  "][(frame.animation_frame % 3) as usize];

        let mut lines = vec![
            Line::from(Span::styled(steam, dim())),
            Line::from(""),
            Line::from(fingers),
            Line::from(Span::styled(weights, dim())),
            Line::from(Span::styled(keys, dim())),
            Line::from(""),
        ];

        if frame.show_validate {
            lines.push(Line::from(Span::styled(
                format!("(enter) {}", mode.validate_label()),
                bold().fg(Color::Cyan),
            )));
        } else if mode.is_automatic() && self.session.phase() == Phase::Awaiting {
            lines.push(Line::from(Span::styled(
                format!("(space) {}", mode.validate_label()),
                bold().fg(Color::Cyan),
            )));
        }

        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!("Kitchen ({})", mode.hands_label())),
            )
            .render(area, buf);
    }

    fn render_footer(&self, area: Rect, buf: &mut Buffer) {
        let line = match &self.notice {
            Some(notice) => Line::from(Span::styled(notice.as_str(), bold().fg(Color::Red))),
            None => Line::from(Span::styled(
                "(tab) switch scene   (1-5) fingers   (esc) pause   (m) mode   (q) quit",
                dim(),
            )),
        };
        Paragraph::new(line)
            .alignment(Alignment::Center)
            .render(area, buf);
    }
}

fn feedback_lines(feedback: &Feedback, score: u32, new_highscore: bool) -> Vec<Line<'static>> {
    let (title, color, hint) = match feedback.outcome {
        Outcome::Correct => ("Order up!", Color::Green, "(c) next customer"),
        Outcome::Incorrect => ("Wrong order", Color::Red, "(r) retry   (esc) menu"),
        Outcome::TimeExpired => ("Time's up", Color::Red, "(r) play again   (esc) menu"),
    };

    let mut lines = vec![
        Line::from(Span::styled(title, bold().fg(color))),
        Line::from(""),
        Line::from(feedback.true_line()),
    ];
    if let Some(current) = feedback.current_line() {
        lines.push(Line::from(Span::styled(current, Style::default().fg(Color::Red))));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(format!("score {}", score)));
    if new_highscore {
        lines.push(Line::from(Span::styled(
            "new highscore!",
            bold().fg(Color::Magenta),
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(hint, dim())));
    lines
}

fn render_overlay(lines: Vec<Line<'static>>, area: Rect, buf: &mut Buffer) {
    let height = lines.len() as u16 + 2;
    let rect = centered_rect(40, height, area);
    Clear.render(rect, buf);
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL))
        .render(rect, buf);
}
