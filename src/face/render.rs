//! Terminal rendering of the face

use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Wrap};

use crate::wake::{Snapshot, WakeState};

use super::FaceModel;

const FACE_COLOR: Color = Color::LightGreen;

/// Rows reserved for the drifting sleep particles
const PARTICLE_ROWS: usize = 6;

/// Draw the whole face into the frame
pub fn draw(frame: &mut Frame<'_>, model: &FaceModel, snapshot: &Snapshot) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),    // top padding
            Constraint::Length(6), // sleep particles (PARTICLE_ROWS)
            Constraint::Length(4), // eyes
            Constraint::Length(1), // gap
            Constraint::Length(1), // mouth
            Constraint::Length(2), // status
            Constraint::Length(3), // answer
            Constraint::Min(0),    // bottom padding
        ])
        .split(frame.area());

    frame.render_widget(particles(model, chunks[1].width), chunks[1]);
    frame.render_widget(eyes(model.eyes_open(snapshot)), chunks[2]);
    frame.render_widget(mouth(snapshot), chunks[4]);
    frame.render_widget(status(model, snapshot), chunks[5]);
    frame.render_widget(answer(model, snapshot), chunks[6]);
}

/// Rising, drifting "z" glyphs over the right temple
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss
)]
fn particles(model: &FaceModel, width: u16) -> Paragraph<'static> {
    let width = usize::from(width);
    let mut grid = vec![vec![' '; width]; PARTICLE_ROWS];
    let base_col = width / 2 + 8;

    for particle in model.particles() {
        let progress = particle.progress();
        let risen = (progress * particle.rise) as usize;
        if risen >= PARTICLE_ROWS {
            continue;
        }
        let row = PARTICLE_ROWS - 1 - risen;
        let col = base_col as isize + (particle.drift * progress) as isize;
        if col >= 0 && (col as usize) < width {
            grid[row][col as usize] = if particle.big { 'Z' } else { 'z' };
        }
    }

    let lines: Vec<Line> = grid
        .into_iter()
        .map(|row| Line::from(row.into_iter().collect::<String>()))
        .collect();
    Paragraph::new(lines).style(Style::default().fg(FACE_COLOR))
}

fn eyes(open: bool) -> Paragraph<'static> {
    let lines: Vec<Line> = if open {
        vec![
            Line::from("██████        ██████"),
            Line::from("██████        ██████"),
            Line::from("██████        ██████"),
            Line::from("██████        ██████"),
        ]
    } else {
        vec![
            Line::from(""),
            Line::from("▄▄▄▄▄▄        ▄▄▄▄▄▄"),
            Line::from(""),
            Line::from(""),
        ]
    };

    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .style(Style::default().fg(FACE_COLOR))
}

fn mouth(snapshot: &Snapshot) -> Paragraph<'static> {
    let shape = if snapshot.busy {
        "────○────"
    } else if snapshot.recording {
        "─▄▄▄▄▄▄▄─"
    } else {
        "─────────"
    };

    Paragraph::new(shape)
        .alignment(Alignment::Center)
        .style(Style::default().fg(FACE_COLOR))
}

fn status(model: &FaceModel, snapshot: &Snapshot) -> Paragraph<'static> {
    let line = if let Some(error) = &snapshot.error {
        Line::from(Span::styled(
            error.clone(),
            Style::default().fg(Color::Red),
        ))
    } else if snapshot.busy {
        let dots = ".".repeat(usize::try_from(model.ticks() / 8 % 4).unwrap_or_default());
        Line::from(format!("thinking{dots}"))
    } else if snapshot.recording {
        Line::from(Span::styled(
            "● listening",
            Style::default().fg(Color::LightRed),
        ))
    } else if snapshot.replay_armed {
        Line::from(Span::styled(
            "press p to replay the answer",
            Style::default().fg(Color::DarkGray),
        ))
    } else if snapshot.state == WakeState::Asleep {
        Line::from(Span::styled(
            "say \"салам\"",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Line::from("")
    };

    Paragraph::new(line).alignment(Alignment::Center)
}

fn answer(model: &FaceModel, snapshot: &Snapshot) -> Paragraph<'static> {
    let text = snapshot.answer.clone().unwrap_or_default();
    // fresh answers flash white before settling into the face color
    let color = if model.answer_flashing() {
        Color::White
    } else {
        FACE_COLOR
    };
    Paragraph::new(text)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .style(Style::default().fg(color).add_modifier(Modifier::BOLD))
}
