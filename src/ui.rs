use std::time::Instant;

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap},
};
use tui_textarea::TextArea;

use crate::app::{App, HitMap, JournalFocus, ToastKind, View};
use crate::calendar::DayCell;
use crate::editor::{AVAILABLE_TAGS, EditorField, MAX_EXCERPT_CHARS, MAX_TITLE_CHARS};
use crate::filter::CellEmphasis;
use crate::journal::format_date;
use crate::markdown::{Block as MdBlock, Document, Inline};
use crate::modal::{MAX_NOTE_CHARS, ModalFocus};
use crate::models::FALLBACK_COLOR;

const DIMMED_OPACITY: f64 = 0.35;
const BACKGROUND: (u8, u8, u8) = (0, 0, 0);
const CURSOR_BG: Color = Color::Rgb(30, 30, 40);

/// `#rrggbb` to its channels.
pub fn hex_to_rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

/// Mixes `rgb` toward the background; opacity 1.0 leaves it unchanged.
pub fn fade(rgb: (u8, u8, u8), opacity: f64) -> Color {
    let opacity = opacity.clamp(0.0, 1.0);
    let mix = |c: u8, bg: u8| (bg as f64 + (c as f64 - bg as f64) * opacity).round() as u8;
    Color::Rgb(
        mix(rgb.0, BACKGROUND.0),
        mix(rgb.1, BACKGROUND.1),
        mix(rgb.2, BACKGROUND.2),
    )
}

fn hex_color(hex: &str, opacity: f64) -> Color {
    let rgb = hex_to_rgb(hex)
        .or_else(|| hex_to_rgb(FALLBACK_COLOR))
        .unwrap_or((107, 114, 128));
    fade(rgb, opacity)
}

fn get_popup_area(frame_width: u16, frame_height: u16, width_percent: u16, height_percent: u16) -> Rect {
    let width = frame_width.saturating_mul(width_percent) / 100;
    let height = frame_height.saturating_mul(height_percent) / 100;
    let x = (frame_width.saturating_sub(width)) / 2;
    let y = (frame_height.saturating_sub(height)) / 2;
    Rect { x, y, width, height }
}

fn render_button(frame: &mut Frame, text: &str, area: Rect, color: Color) {
    let btn = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Center)
        .style(Style::default().fg(color));
    frame.render_widget(btn, area);
}

fn split_equal_horizontal(area: Rect, count: usize) -> Vec<Rect> {
    if count == 0 {
        return Vec::new();
    }
    let pct = 100 / count.max(1) as u16;
    let constraints: Vec<Constraint> = (0..count).map(|_| Constraint::Percentage(pct)).collect();
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(area)
        .to_vec()
}

fn row(area: Rect, offset: u16) -> Rect {
    Rect {
        x: area.x,
        y: area.y + offset,
        width: area.width,
        height: 1,
    }
}

pub fn draw(frame: &mut Frame, app: &mut App, now: Instant) {
    app.hits = HitMap::default();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(1),
        ])
        .split(frame.size());

    draw_view_selector(frame, app, chunks[0]);

    match app.view {
        View::Calendar => {
            let body = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
                .split(chunks[1]);
            draw_calendar(frame, app, body[0], now);
            draw_statistics(frame, app, body[1], now);
        }
        View::Journal => draw_journal(frame, app, chunks[1]),
        View::Editor => draw_editor(frame, app, chunks[1]),
    }

    draw_help_line(frame, app, chunks[2]);

    if app.view == View::Calendar && app.modal.is_none() {
        draw_details_popup(frame, app);
    }
    if app.modal.is_some() {
        draw_mood_modal(frame, app, now);
    }
    if app.view == View::Editor && app.editor.prompt().is_some() {
        draw_draft_prompt(frame, app);
    }
    if app.inline_export.is_some() {
        draw_inline_export(frame, app);
    }
    draw_toasts(frame, app, now);
}

fn draw_view_selector(frame: &mut Frame, app: &mut App, area: Rect) {
    let chunks = split_equal_horizontal(area, View::ALL.len());
    for (i, (view, rect)) in View::ALL.iter().zip(chunks).enumerate() {
        let style = if app.view == *view {
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Cyan)
        };
        let btn = Paragraph::new(format!("{} [F{}]", view.title(), i + 1))
            .block(Block::default().borders(Borders::ALL))
            .alignment(Alignment::Center)
            .style(style);
        app.hits.tabs.push((*view, rect));
        frame.render_widget(btn, rect);
    }
}

fn draw_help_line(frame: &mut Frame, app: &App, area: Rect) {
    let text = if app.modal.is_some() {
        "←/→ pick mood  Space select  Tab note  Ctrl+S save  Esc close"
    } else {
        match app.view {
            View::Calendar => {
                "Arrows move  Enter open  Space quick record  f filter  [ ] month  r reload  q quit"
            }
            View::Journal => match app.journal_focus {
                JournalFocus::Search => "Type to search  Enter done  Esc clear",
                JournalFocus::List => {
                    "↑/↓ select  / search  t tag  m mood  a show all  r reload  q quit"
                }
            },
            View::Editor => "Tab next field  Ctrl+S save & export  Ctrl+R reset  F1 calendar",
        }
    };
    let para = Paragraph::new(text).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(para, area);
}

// Calendar

fn day_style(cell: &DayCell, weekend: bool, opacity: f64) -> Style {
    let opacity = match cell.emphasis {
        CellEmphasis::Dimmed => opacity * DIMMED_OPACITY,
        _ => opacity,
    };
    let mut style = match &cell.glow {
        Some(glow) => Style::default().bg(hex_color(glow, opacity)).fg(Color::Black),
        None => {
            let base = if cell.is_today {
                (34, 197, 94)
            } else if weekend {
                (234, 179, 8)
            } else {
                (229, 231, 235)
            };
            Style::default().fg(fade(base, opacity))
        }
    };
    if cell.is_today {
        style = style.add_modifier(Modifier::BOLD);
    }
    if cell.emphasis == CellEmphasis::Highlighted {
        style = style.add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
    }
    if let Some(pulse) = cell.pulse {
        if pulse > 0.5 {
            style = style.add_modifier(Modifier::SLOW_BLINK | Modifier::BOLD);
        }
    }
    if cell.is_selected {
        style = style.add_modifier(Modifier::REVERSED);
    }
    style
}

fn draw_calendar(frame: &mut Frame, app: &mut App, area: Rect, now: Instant) {
    let grid = app.calendar.month_grid(app.today, now);
    let opacity = app.calendar.grid_opacity(now);

    let block = Block::default()
        .title("Mood Calendar")
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let legend = app.calendar.legend();
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(9),
            Constraint::Length(1),
            Constraint::Min(legend.len() as u16),
        ])
        .split(inner);

    // Month header with clickable arrows
    let title = format!("{:^20}", grid.title);
    let header = Line::from(vec![
        Span::styled(" ◄ ", Style::default().fg(Color::Cyan)),
        Span::styled(
            title.clone(),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ),
        Span::styled(" ► ", Style::default().fg(Color::Cyan)),
    ]);
    app.hits.prev_month = Rect {
        x: layout[0].x,
        y: layout[0].y,
        width: 3,
        height: 1,
    };
    app.hits.next_month = Rect {
        x: layout[0].x + 3 + title.chars().count() as u16,
        y: layout[0].y,
        width: 3,
        height: 1,
    };
    frame.render_widget(Paragraph::new(header), layout[0]);

    draw_calendar_grid(frame, app, &grid.days, grid.leading_blanks, opacity, layout[1]);

    let filter_line = match app.filter().get_current_filter() {
        Some(mood) => {
            let catalog = app.calendar.catalog();
            Line::from(vec![
                Span::styled("Filter: ", Style::default().fg(Color::Gray)),
                Span::styled(
                    format!("{} {}", catalog.icon_for(mood), catalog.label_for(mood)),
                    Style::default()
                        .fg(hex_color(catalog.color_for(mood), 1.0))
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled("  (Esc to clear)", Style::default().fg(Color::DarkGray)),
            ])
        }
        None => Line::from(""),
    };
    frame.render_widget(Paragraph::new(filter_line), layout[2]);

    let legend_lines: Vec<Line> = legend
        .iter()
        .map(|(_, mood_type)| {
            Line::from(vec![
                Span::styled("● ", Style::default().fg(hex_color(&mood_type.color, 1.0))),
                Span::raw(format!("{} {}", mood_type.icon, mood_type.label)),
            ])
        })
        .collect();
    frame.render_widget(
        Paragraph::new(legend_lines).block(Block::default().title("Legend")),
        layout[3],
    );
}

fn draw_calendar_grid(
    frame: &mut Frame,
    app: &mut App,
    days: &[DayCell],
    leading_blanks: u32,
    opacity: f64,
    area: Rect,
) {
    let header_style = Style::default().fg(fade((34, 211, 238), opacity));
    let weekend_header = Style::default().fg(fade((234, 179, 8), opacity));
    let mut lines = vec![
        Line::from(vec![
            Span::styled(" Su ", weekend_header),
            Span::styled(" Mo ", header_style),
            Span::styled(" Tu ", header_style),
            Span::styled(" We ", header_style),
            Span::styled(" Th ", header_style),
            Span::styled(" Fr ", header_style),
            Span::styled(" Sa ", weekend_header),
        ]),
        Line::from(""),
    ];

    let offset = leading_blanks as usize;
    let total_cells = offset + days.len();
    let rows = total_cells.div_ceil(7);

    for week in 0..rows {
        let mut week_spans = Vec::new();
        for day_of_week in 0..7 {
            let cell_idx = week * 7 + day_of_week;
            let Some(cell) = cell_idx.checked_sub(offset).and_then(|i| days.get(i)) else {
                week_spans.push(Span::raw("    "));
                continue;
            };
            let weekend = day_of_week == 0 || day_of_week == 6;
            let day_rect = Rect {
                x: area.x + (day_of_week * 4) as u16,
                y: area.y + 2 + week as u16,
                width: 4,
                height: 1,
            };
            app.hits.days.push((cell.date, day_rect));
            week_spans.push(Span::styled(
                format!(" {:2} ", cell.day),
                day_style(cell, weekend, opacity),
            ));
        }
        lines.push(Line::from(week_spans));
    }

    let calendar_widget = Paragraph::new(lines).alignment(Alignment::Left);
    frame.render_widget(calendar_widget, area);
}

fn draw_details_popup(frame: &mut Frame, app: &App) {
    let Some((record, mood_type)) = app.calendar.details() else {
        return;
    };
    let size = frame.size();
    let area = get_popup_area(size.width, size.height, 50, 35);
    let (start, end) = crate::calendar::mood_gradient(&record.mood);

    let block = Block::default()
        .title(Line::from(vec![
            Span::styled("▌", Style::default().fg(hex_color(start, 1.0))),
            Span::styled(
                format!(" {} {} ", mood_type.icon, mood_type.label),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::styled("▐", Style::default().fg(hex_color(end, 1.0))),
        ]))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .style(
            Style::default()
                .fg(hex_color(&app.calendar.glow_color(record), 1.0))
                .bg(Color::Black),
        );
    let inner = block.inner(area);
    frame.render_widget(Clear, area);
    frame.render_widget(block, area);

    let note = if record.note.is_empty() {
        Span::styled("No note", Style::default().fg(Color::DarkGray))
    } else {
        Span::styled(record.note.clone(), Style::default().fg(Color::White))
    };
    let lines = vec![
        Line::from(Span::styled(
            format_date(&record.date),
            Style::default().fg(Color::Gray),
        )),
        Line::from(""),
        Line::from(note),
        Line::from(""),
        Line::from(Span::styled(
            "Space to edit  Esc to close",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )),
    ];
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);
}

// Statistics

fn draw_statistics(frame: &mut Frame, app: &mut App, area: Rect, now: Instant) {
    let block = Block::default()
        .title(format!("Mood statistics · {}", app.statistics.month_label()))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .style(Style::default().fg(Color::Magenta));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let frequency = app.statistics.frequency();
    if frequency.is_empty() {
        let para = Paragraph::new("No moods recorded this month")
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(para, inner);
        return;
    }

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(frequency.len() as u16 + 1),
            Constraint::Min(3),
        ])
        .split(inner);

    let active = app.statistics.active_filter();
    let label_width = 14usize;
    let bar_space = (layout[0].width as usize).saturating_sub(label_width + 12).max(1);

    let mut lines = Vec::with_capacity(frequency.len());
    let mut bars = Vec::with_capacity(frequency.len());
    for (index, entry) in frequency.iter().enumerate() {
        let progress = app.statistics.bar_progress(index, now);
        let filled = ((bar_space as f64) * entry.percentage as f64 / 100.0 * progress).round() as usize;
        let is_active = active == Some(entry.mood.as_str());
        let color = hex_color(&entry.color, if active.is_some() && !is_active { DIMMED_OPACITY } else { 1.0 });
        let mut label_style = Style::default().fg(Color::White);
        if is_active {
            label_style = label_style.add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
        }

        let label = format!("{} {}", entry.icon, entry.label);
        lines.push(Line::from(vec![
            Span::styled(format!("{label:<label_width$}"), label_style),
            Span::styled("█".repeat(filled), Style::default().fg(color)),
            Span::styled(
                "░".repeat(bar_space.saturating_sub(filled)),
                Style::default().fg(Color::DarkGray),
            ),
            Span::styled(
                format!(" {:>3}% ({})", entry.percentage, entry.count),
                Style::default().fg(Color::Gray),
            ),
        ]));
        bars.push((index, row(layout[0], index as u16)));
    }
    app.hits.bars = bars;
    frame.render_widget(Paragraph::new(lines), layout[0]);

    let advice = match app.statistics.advice() {
        Some((label, text)) => vec![
            Line::from(Span::styled(
                format!("Mostly {label} this month"),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(Span::styled(text, Style::default().fg(Color::White))),
        ],
        None => Vec::new(),
    };
    let para = Paragraph::new(advice)
        .block(Block::default().borders(Borders::TOP).title("Advice"))
        .wrap(Wrap { trim: true });
    frame.render_widget(para, layout[1]);
}

// Mood modal

fn draw_mood_modal(frame: &mut Frame, app: &mut App, now: Instant) {
    let Some(modal) = &app.modal else {
        return;
    };
    let opacity = modal.opacity(now);
    let size = frame.size();
    let area = get_popup_area(size.width, size.height, 60, 70);
    let mut hits = std::mem::take(&mut app.hits);
    hits.modal_dialog = area;

    let block = Block::default()
        .title(format!("Record mood · {}", modal.date().format("%A, %B %-d")))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .style(Style::default().fg(fade((34, 211, 238), opacity)).bg(Color::Black));
    let inner = block.inner(area);
    frame.render_widget(Clear, area);
    frame.render_widget(block, area);

    hits.modal_close = Rect {
        x: area.x + area.width.saturating_sub(4),
        y: area.y,
        width: 3,
        height: 1,
    };
    frame.render_widget(
        Paragraph::new("[x]").style(Style::default().fg(Color::Red)),
        hits.modal_close,
    );

    let catalog = modal.catalog();
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(catalog.len() as u16),
            Constraint::Length(1),
            Constraint::Min(4),
            Constraint::Length(3),
        ])
        .split(inner);

    let mut mood_lines = Vec::with_capacity(catalog.len());
    for (index, (key, mood_type)) in catalog.iter().enumerate() {
        let selected = modal.selected_mood() == Some(key);
        let under_cursor = modal.cursor() == index && modal.focus() == ModalFocus::Moods;
        let marker = if selected { "●" } else { "○" };
        let mut style = Style::default().fg(hex_color(&mood_type.color, opacity));
        if selected {
            style = style.add_modifier(Modifier::BOLD);
        }
        if under_cursor {
            style = style.add_modifier(Modifier::REVERSED);
        }
        mood_lines.push(Line::from(Span::styled(
            format!(" {marker} {} {}", mood_type.icon, mood_type.label),
            style,
        )));
        hits.modal_moods.push((index, row(layout[0], index as u16)));
    }
    frame.render_widget(Paragraph::new(mood_lines), layout[0]);

    hits.modal_note = layout[2];
    let note_focused = modal.focus() == ModalFocus::Note;
    let note_title = format!("Note ({}/{MAX_NOTE_CHARS})", modal.note_chars());
    if modal.note().is_empty() && !note_focused {
        let para = Paragraph::new(modal.placeholder())
            .block(Block::default().title(note_title).borders(Borders::ALL))
            .wrap(Wrap { trim: false })
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(para, layout[2]);
    } else {
        render_textarea_editor(frame, modal.note_area(), note_focused, layout[2], &note_title);
    }

    let buttons = split_equal_horizontal(layout[3], 2);
    if let [save, cancel] = buttons.as_slice() {
        let save_color = if modal.can_save() { Color::Green } else { Color::DarkGray };
        render_button(frame, "Save (Ctrl+S)", *save, save_color);
        render_button(frame, "Cancel (Esc)", *cancel, Color::Red);
        hits.modal_save = *save;
        hits.modal_cancel = *cancel;
    }

    app.hits = hits;
}

// Journal

fn draw_journal(frame: &mut Frame, app: &mut App, area: Rect) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(3),
        ])
        .split(area);

    app.hits.journal_search = layout[0];
    let searching = app.journal_focus == JournalFocus::Search;
    let query = app.journal.search.current_query();
    if query.is_empty() && !searching {
        let para = Paragraph::new("Search titles and summaries (/)")
            .block(Block::default().title("Search").borders(Borders::ALL))
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(para, layout[0]);
    } else {
        let title = if app.journal.search.is_pending() { "Search …" } else { "Search" };
        render_textarea_editor(frame, app.journal.search.query_area(), searching, layout[0], title);
    }

    draw_tag_bar(frame, app, layout[1]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(layout[2]);
    draw_entry_list(frame, app, body[0]);
    draw_entry_details(frame, app, body[1]);
}

fn draw_tag_bar(frame: &mut Frame, app: &mut App, area: Rect) {
    let block = Block::default().title("Tags").borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let current = app.journal.current_tag().map(str::to_string);
    let mut chips: Vec<(Option<String>, String)> =
        vec![(None, format!(" All ({}) ", app.journal.entries().len()))];
    for tag in app.journal.get_all_tags() {
        let count = app.journal.get_entries_count_by_tag(&tag);
        chips.push((Some(tag.clone()), format!(" {tag} ({count}) ")));
    }

    let mut spans = Vec::new();
    let mut x = inner.x;
    for (tag, text) in chips {
        let span_width = Span::raw(text.as_str()).width() as u16;
        if x + span_width > inner.x + inner.width {
            break;
        }
        let style = if tag == current {
            Style::default().bg(Color::Blue).fg(Color::White).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Cyan)
        };
        app.hits.journal_tags.push((
            tag,
            Rect {
                x,
                y: inner.y,
                width: span_width,
                height: 1,
            },
        ));
        spans.push(Span::styled(text, style));
        spans.push(Span::raw(" "));
        x += span_width + 1;
    }
    if let Some(mood) = app.journal.current_mood() {
        let catalog = app.calendar.catalog();
        spans.push(Span::styled(
            format!("mood: {} {}", catalog.icon_for(mood), catalog.label_for(mood)),
            Style::default().fg(hex_color(catalog.color_for(mood), 1.0)),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), inner);
}

fn draw_entry_list(frame: &mut Frame, app: &mut App, area: Rect) {
    let entries = app.journal.filtered_entries();
    let block = Block::default()
        .title(format!("Entries ({})", entries.len()))
        .borders(Borders::ALL);
    let inner = block.inner(area);

    if entries.is_empty() {
        let para = Paragraph::new("No entries match")
            .block(block)
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(para, area);
        return;
    }

    let selected = app.journal.selected();
    let height = inner.height.max(1) as usize;
    let start = selected.saturating_sub(height.saturating_sub(1));
    let mut lines = Vec::new();
    let mut rects = Vec::new();
    for (index, entry) in entries.iter().enumerate().skip(start).take(height) {
        let style = if index == selected {
            Style::default().bg(Color::Blue).fg(Color::White)
        } else {
            Style::default().fg(Color::White)
        };
        lines.push(Line::from(vec![
            Span::styled(
                format!("{:<13}", format_date(&entry.date)),
                Style::default().fg(Color::Gray),
            ),
            Span::styled(entry.title.clone(), style),
        ]));
        rects.push((index, row(inner, (index - start) as u16)));
    }
    drop(entries);
    app.hits.journal_entries = rects;
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_entry_details(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default().title("Entry").borders(Borders::ALL);
    let Some(entry) = app.journal.selected_entry() else {
        frame.render_widget(block, area);
        return;
    };
    let catalog = app.calendar.catalog();
    let mut lines = vec![
        Line::from(Span::styled(
            entry.title.clone(),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            format!("{} · {} min read", format_date(&entry.date), entry.read_time),
            Style::default().fg(Color::Gray),
        )),
    ];
    if let Some(mood) = &entry.mood {
        lines.push(Line::from(Span::styled(
            format!("{} {}", catalog.icon_for(mood), catalog.label_for(mood)),
            Style::default().fg(hex_color(catalog.color_for(mood), 1.0)),
        )));
    }
    lines.push(Line::from(Span::styled(
        entry.tags.iter().map(|t| format!("#{t}")).collect::<Vec<_>>().join(" "),
        Style::default().fg(Color::Cyan),
    )));
    lines.push(Line::from(""));
    lines.push(Line::from(entry.excerpt.clone()));

    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: true }),
        area,
    );
}

// Editor

fn draw_editor(frame: &mut Frame, app: &mut App, area: Rect) {
    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let form = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(5),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(body[0]);

    let editor = &app.editor;
    let form_data = editor.form();
    let fields = [
        (
            EditorField::Title,
            form[0],
            format!("Title ({}/{MAX_TITLE_CHARS})", form_data.title.chars().count()),
        ),
        (
            EditorField::Excerpt,
            form[1],
            format!("Summary ({}/{MAX_EXCERPT_CHARS})", form_data.excerpt.chars().count()),
        ),
        (EditorField::Content, form[2], "Content (Markdown)".to_string()),
    ];
    for (field, rect, title) in fields {
        let title = match editor.error_for(field) {
            Some(error) => format!("{title} · {error}"),
            None => title,
        };
        if let Some(textarea) = editor.field_area(field) {
            let focused = editor.focus() == field;
            let panel_style = if editor.error_for(field).is_some() {
                Style::default().fg(Color::Red)
            } else if focused {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default().fg(Color::White)
            };
            let inner_height = rect.height.saturating_sub(2);
            let panel = Paragraph::new(textarea_lines_with_cursor(textarea, focused, inner_height))
                .block(Block::default().title(title).borders(Borders::ALL))
                .wrap(Wrap { trim: false })
                .style(panel_style);
            frame.render_widget(panel, rect);
        }
    }

    let tags_focused = editor.focus() == EditorField::Tags;
    let tags_title = match editor.error_for(EditorField::Tags) {
        Some(error) => format!("Tags · {error}"),
        None => "Tags".to_string(),
    };
    let tags_block = Block::default()
        .title(tags_title)
        .borders(Borders::ALL)
        .style(Style::default().fg(if editor.error_for(EditorField::Tags).is_some() {
            Color::Red
        } else if tags_focused {
            Color::Yellow
        } else {
            Color::White
        }));
    let tags_inner = tags_block.inner(form[3]);
    frame.render_widget(tags_block, form[3]);

    let mut tag_lines: Vec<Vec<Span>> = vec![Vec::new()];
    let mut tag_rects = Vec::new();
    let (mut x, mut y) = (tags_inner.x, tags_inner.y);
    for (index, tag) in AVAILABLE_TAGS.iter().enumerate() {
        let checked = editor.selected_tags().iter().any(|t| t == tag);
        let text = format!("[{}] {tag}", if checked { "x" } else { " " });
        let width = Span::raw(text.as_str()).width() as u16;
        if x > tags_inner.x && x + width > tags_inner.x + tags_inner.width {
            x = tags_inner.x;
            y += 1;
            tag_lines.push(Vec::new());
        }
        if y >= tags_inner.y + tags_inner.height {
            break;
        }
        let mut style = if checked {
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        if tags_focused && editor.tag_cursor() == index {
            style = style.add_modifier(Modifier::REVERSED);
        }
        tag_rects.push((index, Rect { x, y, width, height: 1 }));
        if let Some(line) = tag_lines.last_mut() {
            line.push(Span::styled(text, style));
            line.push(Span::raw(" "));
        }
        x += width + 1;
    }
    let tag_lines: Vec<Line> = tag_lines.into_iter().map(Line::from).collect();
    frame.render_widget(Paragraph::new(tag_lines), tags_inner);

    let mood_focused = editor.focus() == EditorField::Mood;
    let mood_text = match editor.mood() {
        Some(mood) => {
            let catalog = editor.catalog();
            Span::styled(
                format!("◄ {} {} ►", catalog.icon_for(mood), catalog.label_for(mood)),
                Style::default().fg(hex_color(catalog.color_for(mood), 1.0)),
            )
        }
        None => Span::styled("◄ no mood ►", Style::default().fg(Color::DarkGray)),
    };
    let mood_block = Block::default()
        .title("Mood (optional)")
        .borders(Borders::ALL)
        .style(Style::default().fg(if mood_focused { Color::Yellow } else { Color::White }));
    frame.render_widget(Paragraph::new(Line::from(mood_text)).block(mood_block), form[4]);

    let status = Paragraph::new(format!("{} min read", editor.read_time()))
        .style(Style::default().fg(Color::Gray));
    frame.render_widget(status, form[5]);

    let preview = Paragraph::new(document_lines(editor.preview()))
        .block(Block::default().title("Preview").borders(Borders::ALL))
        .wrap(Wrap { trim: false });
    frame.render_widget(preview, body[1]);

    app.hits.editor_tags = tag_rects;
    app.hits.editor_fields = vec![
        (EditorField::Title, form[0]),
        (EditorField::Excerpt, form[1]),
        (EditorField::Content, form[2]),
        (EditorField::Tags, form[3]),
        (EditorField::Mood, form[4]),
    ];
}

fn inline_spans(spans: &[Inline], base: Style) -> Vec<Span<'static>> {
    spans
        .iter()
        .map(|span| match span {
            Inline::Text(text) => Span::styled(text.clone(), base),
            Inline::Strong(text) => Span::styled(text.clone(), base.add_modifier(Modifier::BOLD)),
        })
        .collect()
}

/// Terminal rendering of a parsed Markdown document.
pub fn document_lines(document: &Document) -> Vec<Line<'static>> {
    let blocks = match document {
        Document::Escaped(text) => {
            return text.lines().map(|l| Line::from(l.to_string())).collect();
        }
        Document::Blocks(blocks) => blocks,
    };

    let mut lines = Vec::new();
    for block in blocks {
        match block {
            MdBlock::Heading { level, content } => {
                let color = match level {
                    1 => Color::Yellow,
                    2 => Color::Cyan,
                    _ => Color::Green,
                };
                let mut spans = vec![Span::styled(
                    format!("{} ", "#".repeat(*level as usize)),
                    Style::default().fg(Color::DarkGray),
                )];
                spans.extend(inline_spans(
                    content,
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                ));
                lines.push(Line::from(spans));
            }
            MdBlock::List(items) => {
                for item in items {
                    let mut spans = vec![Span::styled("  • ", Style::default().fg(Color::Cyan))];
                    spans.extend(inline_spans(item, Style::default()));
                    lines.push(Line::from(spans));
                }
            }
            MdBlock::Paragraph(spans) => lines.push(Line::from(inline_spans(spans, Style::default()))),
            MdBlock::Break => lines.push(Line::from("")),
            MdBlock::Plain(text) => lines.push(Line::from(text.clone())),
        }
    }
    lines
}

fn draw_draft_prompt(frame: &mut Frame, app: &App) {
    let Some(prompt) = app.editor.prompt() else {
        return;
    };
    let size = frame.size();
    let area = get_popup_area(size.width, size.height, 55, 28);
    let color = if prompt.expired { Color::Yellow } else { Color::Green };

    let block = Block::default()
        .title("Unsaved draft")
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .style(Style::default().fg(color).bg(Color::Black));
    let inner = block.inner(area);
    frame.render_widget(Clear, area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(2), Constraint::Length(1)])
        .split(inner);

    let para = Paragraph::new(prompt.message())
        .wrap(Wrap { trim: true })
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::White));
    frame.render_widget(para, chunks[0]);

    let hint = Paragraph::new("y restore  n discard")
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC));
    frame.render_widget(hint, chunks[1]);
}

fn draw_inline_export(frame: &mut Frame, app: &App) {
    let Some(json) = &app.inline_export else {
        return;
    };
    let size = frame.size();
    let area = get_popup_area(size.width, size.height, 80, 70);

    let block = Block::default()
        .title("[!] Export file not written, copy the entry below")
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .style(Style::default().fg(Color::Red).bg(Color::Black));
    let inner = block.inner(area);
    frame.render_widget(Clear, area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(inner);

    let para = Paragraph::new(json.as_str())
        .wrap(Wrap { trim: false })
        .style(Style::default().fg(Color::White));
    frame.render_widget(para, chunks[0]);

    let hint = Paragraph::new("Press Esc to dismiss")
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC));
    frame.render_widget(hint, chunks[1]);
}

fn draw_toasts(frame: &mut Frame, app: &App, now: Instant) {
    let size = frame.size();
    let width = 48.min(size.width.saturating_sub(2));
    let mut y = size.y + 1;
    for toast in app.toasts.iter().filter(|t| t.expires > now) {
        if y + 3 > size.height {
            break;
        }
        let area = Rect {
            x: size.x + size.width.saturating_sub(width + 1),
            y,
            width,
            height: 3,
        };
        let (color, title) = match toast.kind {
            ToastKind::Info => (Color::Cyan, "Info"),
            ToastKind::Success => (Color::Green, "Done"),
            ToastKind::Error => (Color::Red, "Error"),
        };
        let para = Paragraph::new(toast.message.as_str())
            .block(
                Block::default()
                    .title(title)
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded),
            )
            .style(Style::default().fg(color).bg(Color::Black));
        frame.render_widget(Clear, area);
        frame.render_widget(para, area);
        y += 3;
    }
}

fn textarea_lines_with_cursor(
    textarea: &TextArea<'static>,
    focused: bool,
    height: u16,
) -> Vec<Line<'static>> {
    let (cursor_row, cursor_col) = textarea.cursor();
    let text_lines = textarea.lines();

    if text_lines.is_empty() {
        return vec![Line::from(if focused { "|" } else { "" })];
    }

    let mut lines = Vec::with_capacity(text_lines.len());
    for (idx, line) in text_lines.iter().enumerate() {
        if focused && idx == cursor_row {
            let char_col = cursor_col.min(line.chars().count());
            let mut new_line = String::new();
            for (i, c) in line.chars().enumerate() {
                if i == char_col {
                    new_line.push('|');
                }
                new_line.push(c);
            }
            if char_col == line.chars().count() {
                new_line.push('|');
            }
            lines.push(Line::from(Span::styled(
                new_line,
                Style::default().fg(Color::Yellow).bg(CURSOR_BG),
            )));
        } else {
            lines.push(Line::from(line.clone()));
        }
    }
    let view_height = height.max(1) as usize;
    if lines.len() > view_height {
        let start = cursor_row.saturating_sub(view_height.saturating_sub(1));
        let end = (start + view_height).min(lines.len());
        lines[start..end].to_vec()
    } else {
        lines
    }
}

fn render_textarea_editor(
    frame: &mut Frame,
    textarea: &TextArea<'static>,
    focused: bool,
    area: Rect,
    title: &str,
) {
    let inner_height = area.height.saturating_sub(2);
    let lines_display = textarea_lines_with_cursor(textarea, focused, inner_height);
    let color = if focused { Color::Yellow } else { Color::White };
    let panel = Paragraph::new(lines_display)
        .block(Block::default().title(title.to_string()).borders(Borders::ALL))
        .wrap(Wrap { trim: false })
        .style(Style::default().fg(color));

    frame.render_widget(panel, area);
}

#[cfg(test)]
mod tests {
    use std::fs;

    use chrono::NaiveDate;
    use ratatui::{Terminal, backend::TestBackend};

    use super::*;
    use crate::app::Services;
    use crate::draft::DraftService;
    use crate::export::ExportService;
    use crate::filter::MoodFilterController;
    use crate::loader::DataLoader;
    use crate::markdown::MarkdownParser;
    use crate::storage::MemoryStorage;

    fn app(dir: &std::path::Path, now: Instant) -> App {
        let content = dir.join("data");
        fs::create_dir_all(&content).unwrap();
        fs::write(
            content.join("moods.json"),
            r##"{"moods": [{"date": "2024-05-02", "mood": "happy", "note": "walk", "color": "#10b981", "timestamp": 1}],
                "moodTypes": {"happy": {"label": "Happy", "icon": "😊", "color": "#10b981"},
                              "sad": {"label": "Sad", "icon": "😢", "color": "#3b82f6"}}}"##,
        )
        .unwrap();
        fs::write(
            content.join("journal-entries.json"),
            r#"{"entries": [{"id": "a", "title": "First", "date": "2024-05-01", "excerpt": "x",
                             "content": "", "tags": ["design"], "readTime": 1}]}"#,
        )
        .unwrap();
        let services = Services {
            loader: DataLoader::new(&content),
            drafts: DraftService::new(Box::new(MemoryStorage::default())),
            exporter: ExportService::new(dir.join("exports")),
            filter: MoodFilterController::new(),
        };
        App::new(services, NaiveDate::from_ymd_opt(2024, 5, 10).unwrap(), now)
    }

    #[test]
    fn hex_colors_parse_and_fade() {
        assert_eq!(hex_to_rgb("#10b981"), Some((0x10, 0xb9, 0x81)));
        assert_eq!(hex_to_rgb("10b981"), None);
        assert_eq!(hex_to_rgb("#xyzxyz"), None);
        assert_eq!(fade((200, 100, 50), 1.0), Color::Rgb(200, 100, 50));
        assert_eq!(fade((200, 100, 50), 0.5), Color::Rgb(100, 50, 25));
        assert_eq!(hex_color("nonsense", 1.0), Color::Rgb(0x6b, 0x72, 0x80));
    }

    #[test]
    fn markdown_preview_lines() {
        let doc = MarkdownParser::new().parse_document("# Title\n- one\n- **two**\n\nplain");
        let lines = document_lines(&doc);
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[2].spans[1].content, "two");
        assert!(lines[2].spans[1].style.add_modifier.contains(Modifier::BOLD));
        assert_eq!(lines[3].width(), 0);
    }

    #[test]
    fn drawing_every_view_records_hit_areas() {
        let tmp = tempfile::tempdir().unwrap();
        let now = Instant::now();
        let mut app = app(tmp.path(), now);
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();

        terminal.draw(|frame| draw(frame, &mut app, now)).unwrap();
        assert_eq!(app.hits.tabs.len(), 3);
        assert_eq!(app.hits.days.len(), 31);
        assert_eq!(app.hits.bars.len(), 1);
        // May 2024 starts on a Wednesday
        let (first, rect) = app.hits.days[0];
        assert_eq!(first, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        assert_eq!(rect.x - app.hits.prev_month.x, 12);

        app.switch_view(View::Journal);
        terminal.draw(|frame| draw(frame, &mut app, now)).unwrap();
        assert_eq!(app.hits.journal_entries.len(), 1);
        assert_eq!(app.hits.journal_tags.len(), 2);
        assert!(app.hits.days.is_empty());

        app.switch_view(View::Editor);
        terminal.draw(|frame| draw(frame, &mut app, now)).unwrap();
        assert_eq!(app.hits.editor_fields.len(), 5);
        assert!(!app.hits.editor_tags.is_empty());
    }

    #[test]
    fn modal_draw_records_its_controls() {
        let tmp = tempfile::tempdir().unwrap();
        let now = Instant::now();
        let mut app = app(tmp.path(), now);
        app.handle_key(
            crossterm::event::KeyEvent::new(
                crossterm::event::KeyCode::Enter,
                crossterm::event::KeyModifiers::NONE,
            ),
            now,
        );
        assert!(app.modal.is_some());

        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal.draw(|frame| draw(frame, &mut app, now)).unwrap();
        assert_eq!(app.hits.modal_moods.len(), 2);
        assert!(app.hits.modal_save.width > 0);
        assert!(app.hits.modal_cancel.width > 0);
        assert!(app.hits.days.len() == 31, "calendar stays drawn under the modal");
    }
}
