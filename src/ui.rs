use std::error::Error;
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration as StdDuration, Instant};

use chrono::{Datelike, Duration, Local, NaiveDate};
use crossterm::event::{self, Event as CEvent, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, ExecutableCommand};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use reqwest::blocking::Client;
use tracing::{debug, info, warn};

use crate::app::AppState;
use crate::calendar::{render, CalendarCell, DateKey, MonthCursor};
use crate::config::Config;
use crate::fetch::{build_client, FetchError, RequestTracker};
use crate::news::{credential, Headline, NewsCategory, NewsClient, NewsView};
use crate::preferences::{Theme, WidgetId};
use crate::stopwatch::{format_duration, StopwatchStatus};
use crate::storage::StorageError;
use crate::todos::TodoFilter;
use crate::transit::{self, Severity, TransitStatus};
use crate::weather::{Location, Observation, WeatherClient, WeatherView};

const FOCUSED_PANEL_BORDER_COLOR: Color = Color::Yellow;
const INACTIVE_PANEL_BORDER_COLOR: Color = Color::DarkGray;
const INPUT_POLL_INTERVAL: StdDuration = StdDuration::from_millis(250);
const COLLAPSED_HEIGHT: u16 = 3;
const FOCUS_ORDER: [WidgetId; 7] = [
	WidgetId::Todo,
	WidgetId::Notes,
	WidgetId::Calendar,
	WidgetId::Stopwatch,
	WidgetId::Transit,
	WidgetId::Weather,
	WidgetId::News,
];

pub fn run_dashboard(state: &mut AppState, config: &Config) -> Result<(), Box<dyn Error>> {
	enable_raw_mode()?;
	let mut stdout = io::stdout();
	stdout.execute(EnterAlternateScreen)?;
	let backend = CrosstermBackend::new(stdout);
	let mut terminal = Terminal::new(backend)?;

	let result = run_event_loop(&mut terminal, state, config);

	disable_raw_mode()?;
	execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
	terminal.show_cursor()?;

	result
}

fn run_event_loop(
	terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
	state: &mut AppState,
	config: &Config,
) -> Result<(), Box<dyn Error>> {
	let mut app = App::new(config.news.category);
	let mut feeds = Feeds::new(config);
	feeds.refresh_all(app.news_category);

	loop {
		let now = Instant::now();
		state.stopwatch.tick(now);
		feeds.drain();
		app.clamp_selection(state, &feeds);
		terminal.draw(|frame| draw_dashboard(frame, &app, state, &feeds))?;

		if event::poll(poll_timeout(state.stopwatch.next_sample_due(), Instant::now()))? {
			if let CEvent::Key(key) = event::read()? {
				if key.kind != KeyEventKind::Press {
					continue;
				}

				let should_quit = match &app.mode {
					InputMode::Prompt(_) => handle_prompt_key(&mut app, key.code, state),
					InputMode::Select(_) => handle_select_key(&mut app, key.code, state),
					InputMode::Normal => handle_normal_key(&mut app, key.code, state, &mut feeds),
				};

				if should_quit {
					break;
				}
			}
		}
	}

	// A running stopwatch is not resumed across sessions; laps are already saved.
	info!(laps = state.stopwatch.laps().len(), "dashboard closed");
	Ok(())
}

fn poll_timeout(next_sample: Option<Instant>, now: Instant) -> StdDuration {
	match next_sample {
		Some(due) => due.saturating_duration_since(now).min(INPUT_POLL_INTERVAL),
		None => INPUT_POLL_INTERVAL,
	}
}

fn draw_dashboard(frame: &mut Frame, app: &App, state: &AppState, feeds: &Feeds) {
	let palette = Palette::for_theme(state.ui.theme);
	frame.render_widget(Block::default().style(palette.base()), frame.area());

	let layout = Layout::default()
		.direction(Direction::Vertical)
		.constraints([Constraint::Length(3), Constraint::Min(12), Constraint::Length(4)])
		.split(frame.area());

	let body = Layout::default()
		.direction(Direction::Horizontal)
		.constraints([
			Constraint::Percentage(32),
			Constraint::Percentage(34),
			Constraint::Percentage(34),
		])
		.split(layout[1]);

	render_clock_bar(frame, layout[0], app, state, &palette);

	let left = split_column(body[0], state, &[WidgetId::Todo, WidgetId::Notes]);
	render_todo_panel(frame, left[0], app, state, &palette);
	render_notes_panel(frame, left[1], app, state, &palette);

	let middle = split_column(body[1], state, &[WidgetId::Calendar, WidgetId::Stopwatch]);
	render_calendar_panel(frame, middle[0], app, state, &palette);
	render_stopwatch_panel(frame, middle[1], app, state, &palette);

	let right = split_column(
		body[2],
		state,
		&[WidgetId::Transit, WidgetId::Weather, WidgetId::News],
	);
	render_transit_panel(frame, right[0], app, state, feeds.transit, &palette);
	render_weather_panel(frame, right[1], app, state, &feeds.weather, &palette);
	render_news_panel(frame, right[2], app, state, &feeds.news, &palette);

	render_footer(frame, layout[2], app, &palette);

	if let InputMode::Select(select) = &app.mode {
		render_select_popup(frame, select, &palette);
	}
}

fn split_column(area: Rect, state: &AppState, widgets: &[WidgetId]) -> Vec<Rect> {
	let constraints = widgets
		.iter()
		.map(|widget| {
			if state.ui.is_collapsed(*widget) {
				Constraint::Length(COLLAPSED_HEIGHT)
			} else {
				Constraint::Min(5)
			}
		})
		.collect::<Vec<_>>();
	Layout::default()
		.direction(Direction::Vertical)
		.constraints(constraints)
		.split(area)
		.to_vec()
}

fn widget_block(app: &App, widget: WidgetId, title: String) -> Block<'static> {
	Block::default()
		.borders(Borders::ALL)
		.title(title)
		.border_style(border_style(app.focus == widget))
}

/// Draws the collapsed placeholder and returns `true` when the widget is
/// collapsed.
fn render_collapsed(frame: &mut Frame, area: Rect, app: &App, state: &AppState, widget: WidgetId) -> bool {
	if !state.ui.is_collapsed(widget) {
		return false;
	}
	let block = widget_block(app, widget, format!("{} (collapsed)", widget.title()));
	frame.render_widget(Paragraph::new("z to expand").block(block), area);
	true
}

fn render_clock_bar(frame: &mut Frame, area: Rect, app: &App, state: &AppState, palette: &Palette) {
	let now = Local::now();
	let line = Line::from(vec![
		Span::styled(
			now.format("%H:%M").to_string(),
			Style::default().fg(palette.accent).add_modifier(Modifier::BOLD),
		),
		Span::raw("  "),
		Span::styled(now.format("%A, %d %B %Y").to_string(), palette.muted()),
		Span::raw(format!("  | theme {} | {}", state.ui.theme.label(), app.status)),
	]);
	let clock = Paragraph::new(line).block(
		Block::default()
			.borders(Borders::ALL)
			.title(WidgetId::Clock.title())
			.border_style(border_style(false)),
	);
	frame.render_widget(clock, area);
}

fn render_todo_panel(frame: &mut Frame, area: Rect, app: &App, state: &AppState, palette: &Palette) {
	if render_collapsed(frame, area, app, state, WidgetId::Todo) {
		return;
	}

	let rows = state.todos.filtered(app.todo_filter);
	let items = if rows.is_empty() {
		vec![ListItem::new(Span::styled(format!("(no {} tasks)", app.todo_filter), palette.muted()))]
	} else {
		rows.iter()
			.map(|(_, todo)| {
				let mut spans = vec![Span::raw(if todo.completed { "[x] " } else { "[ ] " })];
				if let Some(tag) = todo.tag_label() {
					spans.push(Span::styled(
						format!("#{tag} "),
						Style::default().fg(palette.accent),
					));
				}
				let text_style = if todo.completed {
					palette.muted().add_modifier(Modifier::CROSSED_OUT)
				} else {
					Style::default()
				};
				spans.push(Span::styled(todo.text.clone(), text_style));
				ListItem::new(Line::from(spans))
			})
			.collect::<Vec<_>>()
	};

	let mut list_state = ListState::default();
	if !rows.is_empty() {
		list_state.select(Some(app.todo_index.min(rows.len() - 1)));
	}

	let title = format!(
		"{} ({}) | {}",
		WidgetId::Todo.title(),
		app.todo_filter,
		state.todos.summary()
	);
	let list = List::new(items)
		.block(widget_block(app, WidgetId::Todo, title))
		.highlight_style(palette.highlight());
	frame.render_stateful_widget(list, area, &mut list_state);
}

fn render_notes_panel(frame: &mut Frame, area: Rect, app: &App, state: &AppState, palette: &Palette) {
	if render_collapsed(frame, area, app, state, WidgetId::Notes) {
		return;
	}

	let notes = state.notes.notes();
	let items = if notes.is_empty() {
		vec![ListItem::new(Span::styled("(no notes)", palette.muted()))]
	} else {
		notes
			.iter()
			.map(|note| {
				let mut lines = vec![Line::from(vec![
					Span::styled(
						note.display_title().to_string(),
						Style::default().add_modifier(Modifier::BOLD),
					),
					Span::styled(
						format!("  {}", note.created.with_timezone(&Local).format("%d %b %H:%M")),
						palette.muted(),
					),
				])];
				if !note.body.is_empty() {
					lines.push(Line::from(Span::styled(note.body.clone(), palette.muted())));
				}
				ListItem::new(lines)
			})
			.collect::<Vec<_>>()
	};

	let mut list_state = ListState::default();
	if !notes.is_empty() {
		list_state.select(Some(app.note_index.min(notes.len() - 1)));
	}

	let list = List::new(items)
		.block(widget_block(app, WidgetId::Notes, WidgetId::Notes.title().to_string()))
		.highlight_style(palette.highlight());
	frame.render_stateful_widget(list, area, &mut list_state);
}

fn render_calendar_panel(frame: &mut Frame, area: Rect, app: &App, state: &AppState, palette: &Palette) {
	if render_collapsed(frame, area, app, state, WidgetId::Calendar) {
		return;
	}

	let grid = render(app.calendar_month, &state.events);
	let selected_key = DateKey::from_date(app.selected_day);
	let mut lines = Vec::new();
	lines.push(Line::from(Span::styled(
		grid.cursor.title(),
		Style::default().add_modifier(Modifier::BOLD),
	)));
	lines.push(Line::from(Span::styled("Su Mo Tu We Th Fr Sa", palette.muted())));

	for week in grid.weeks() {
		let spans = week
			.iter()
			.map(|cell| match cell {
				CalendarCell::Leading { day } => Span::styled(format!("{day:>2} "), palette.muted()),
				CalendarCell::Filler => Span::raw("   "),
				CalendarCell::Day {
					day,
					key,
					has_event,
				} => {
					let mut style = Style::default();
					if *key == selected_key {
						style = style.fg(Color::Black).bg(Color::Yellow).add_modifier(Modifier::BOLD);
					} else if *has_event {
						style = style
							.fg(palette.accent)
							.add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
					}
					Span::styled(format!("{day:>2} "), style)
				}
			})
			.collect::<Vec<_>>();
		lines.push(Line::from(spans));
	}

	lines.push(Line::from(""));
	lines.push(Line::from(Span::styled(
		app.selected_day.format("%A, %d %B %Y").to_string(),
		Style::default().add_modifier(Modifier::BOLD),
	)));
	let events = state.events.events(&selected_key);
	if events.is_empty() {
		lines.push(Line::from(Span::styled("(no events)", palette.muted())));
	}
	for (index, event) in events.iter().enumerate() {
		lines.push(Line::from(format!("{}. {event}", index + 1)));
	}

	let calendar = Paragraph::new(lines)
		.block(widget_block(app, WidgetId::Calendar, WidgetId::Calendar.title().to_string()))
		.wrap(Wrap { trim: false });
	frame.render_widget(calendar, area);
}

fn render_stopwatch_panel(frame: &mut Frame, area: Rect, app: &App, state: &AppState, palette: &Palette) {
	if render_collapsed(frame, area, app, state, WidgetId::Stopwatch) {
		return;
	}

	let stopwatch = &state.stopwatch;
	let status = match stopwatch.status() {
		StopwatchStatus::Idle => "idle",
		StopwatchStatus::Running => "running",
		StopwatchStatus::Paused => "paused",
	};
	let mut lines = vec![
		Line::from(vec![
			Span::styled(
				format_duration(stopwatch.elapsed_ms()),
				Style::default().fg(palette.accent).add_modifier(Modifier::BOLD),
			),
			Span::styled(format!("  {status}"), palette.muted()),
		]),
		Line::from(""),
	];

	let rows = stopwatch.lap_rows();
	if rows.is_empty() {
		lines.push(Line::from(Span::styled("(no laps)", palette.muted())));
	}
	for row in rows {
		lines.push(Line::from(vec![
			Span::styled(format!("Lap {:>2} ", row.number), Style::default().add_modifier(Modifier::BOLD)),
			Span::styled(format!("{} ", format_duration(row.lap.time)), Style::default().fg(palette.accent)),
			Span::raw(format_duration(row.lap.accumulated_time)),
		]));
	}

	let panel = Paragraph::new(lines).block(widget_block(
		app,
		WidgetId::Stopwatch,
		WidgetId::Stopwatch.title().to_string(),
	));
	frame.render_widget(panel, area);
}

fn render_transit_panel(
	frame: &mut Frame,
	area: Rect,
	app: &App,
	state: &AppState,
	status: &TransitStatus,
	palette: &Palette,
) {
	if render_collapsed(frame, area, app, state, WidgetId::Transit) {
		return;
	}

	let mut lines = vec![Line::from(Span::styled(
		status.label,
		Style::default()
			.fg(severity_color(status.severity))
			.add_modifier(Modifier::BOLD),
	))];
	for alert in status.alerts {
		lines.push(Line::from(Span::styled(format!("- {alert}"), palette.muted())));
	}

	let panel = Paragraph::new(lines)
		.block(widget_block(app, WidgetId::Transit, WidgetId::Transit.title().to_string()))
		.wrap(Wrap { trim: true });
	frame.render_widget(panel, area);
}

fn render_weather_panel(
	frame: &mut Frame,
	area: Rect,
	app: &App,
	state: &AppState,
	view: &WeatherView,
	palette: &Palette,
) {
	if render_collapsed(frame, area, app, state, WidgetId::Weather) {
		return;
	}

	let lines = match view {
		WeatherView::Loading => vec![Line::from(Span::styled("Fetching weather...", palette.muted()))],
		WeatherView::LocationUnavailable(message) | WeatherView::Failed(message) => {
			vec![Line::from(Span::styled(message.clone(), palette.muted()))]
		}
		WeatherView::Ready(observation) => vec![
			Line::from(Span::styled(
				format!("{}°C | {}", observation.temperature_c, observation.condition()),
				Style::default().add_modifier(Modifier::BOLD),
			)),
			Line::from(Span::styled(
				format!(
					"Wind {} km/h | Updated {}",
					observation.wind_kmh,
					observation.observed_clock()
				),
				palette.muted(),
			)),
		],
	};

	let panel = Paragraph::new(lines)
		.block(widget_block(app, WidgetId::Weather, WidgetId::Weather.title().to_string()))
		.wrap(Wrap { trim: true });
	frame.render_widget(panel, area);
}

fn render_news_panel(
	frame: &mut Frame,
	area: Rect,
	app: &App,
	state: &AppState,
	view: &NewsView,
	palette: &Palette,
) {
	if render_collapsed(frame, area, app, state, WidgetId::News) {
		return;
	}

	let title = format!("{} ({})", WidgetId::News.title(), app.news_category);
	let block = widget_block(app, WidgetId::News, title);

	let lines = match view {
		NewsView::Ready(headlines) => {
			let items = headlines
				.iter()
				.map(|headline| {
					ListItem::new(vec![
						Line::from(Span::styled(
							headline.title.clone(),
							Style::default().add_modifier(Modifier::BOLD),
						)),
						Line::from(Span::styled(headline.source.clone(), palette.muted())),
					])
				})
				.collect::<Vec<_>>();
			let mut list_state = ListState::default();
			list_state.select(Some(app.news_index.min(headlines.len().saturating_sub(1))));
			let list = List::new(items).block(block).highlight_style(palette.highlight());
			frame.render_stateful_widget(list, area, &mut list_state);
			return;
		}
		NewsView::Loading => vec![Line::from(Span::styled("Loading news...", palette.muted()))],
		NewsView::Empty => vec![Line::from("No news found for this category.")],
		NewsView::SetupNeeded { register_url } => vec![
			Line::from(Span::styled(
				"API key required",
				Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
			)),
			Line::from(Span::styled(
				"Set [news] api_key in the config or DESKBOARD_NEWS_API_KEY.",
				palette.muted(),
			)),
			Line::from(format!("Get a free key: {register_url}")),
		],
		NewsView::Failed(message) => vec![Line::from(Span::styled(
			message.clone(),
			Style::default().fg(Color::Red),
		))],
	};

	let panel = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
	frame.render_widget(panel, area);
}

fn render_footer(frame: &mut Frame, area: Rect, app: &App, palette: &Palette) {
	let footer_lines = match &app.mode {
		InputMode::Normal => vec![
			Line::from("Tab pane | z collapse | T theme | r refresh all | q quit"),
			Line::from(Span::styled(focus_hint(app.focus), palette.muted())),
		],
		InputMode::Prompt(prompt) => vec![
			Line::from(format!("{}: > {}", prompt.title, prompt.input)),
			Line::from("Enter submit | Esc cancel"),
		],
		InputMode::Select(select) => vec![
			Line::from(select.title.clone()),
			Line::from("j/k or arrows move | Enter choose | Esc cancel"),
		],
	};

	let footer = Paragraph::new(footer_lines).block(Block::default().borders(Borders::ALL).title("Shortcuts"));
	frame.render_widget(footer, area);
}

fn focus_hint(focus: WidgetId) -> &'static str {
	match focus {
		WidgetId::Todo => "j/k move | a add | e edit | space toggle | d delete | f filter | C clear completed",
		WidgetId::Notes => "j/k move | a add | d delete",
		WidgetId::Calendar => "arrows/hjkl day | n/N month | a add event | d delete event",
		WidgetId::Stopwatch => "space start/pause | l lap | x reset",
		WidgetId::News => "j/k move | Enter show link | c next category",
		WidgetId::Transit | WidgetId::Weather | WidgetId::Clock => "r refresh",
	}
}

fn render_select_popup(frame: &mut Frame, select: &SelectState, palette: &Palette) {
	let area = centered_rect(56, 40, frame.area());
	frame.render_widget(Clear, area);

	let items = if select.options.is_empty() {
		vec![ListItem::new("(no choices)")]
	} else {
		select
			.options
			.iter()
			.map(|option| ListItem::new(option.label.clone()))
			.collect::<Vec<_>>()
	};

	let list = List::new(items)
		.block(Block::default().borders(Borders::ALL).title(select.title.clone()))
		.style(palette.base())
		.highlight_symbol(">> ")
		.highlight_style(palette.highlight());

	let mut state = ListState::default();
	if !select.options.is_empty() {
		state.select(Some(select.selected.min(select.options.len() - 1)));
	}
	frame.render_stateful_widget(list, area, &mut state);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
	let popup_layout = Layout::default()
		.direction(Direction::Vertical)
		.constraints([
			Constraint::Percentage((100 - percent_y) / 2),
			Constraint::Percentage(percent_y),
			Constraint::Percentage((100 - percent_y) / 2),
		])
		.split(area);
	Layout::default()
		.direction(Direction::Horizontal)
		.constraints([
			Constraint::Percentage((100 - percent_x) / 2),
			Constraint::Percentage(percent_x),
			Constraint::Percentage((100 - percent_x) / 2),
		])
		.split(popup_layout[1])[1]
}

fn handle_normal_key(app: &mut App, code: KeyCode, state: &mut AppState, feeds: &mut Feeds) -> bool {
	match code {
		KeyCode::Char('q') | KeyCode::Esc => return true,
		KeyCode::Tab => app.focus = next_focus(app.focus, 1),
		KeyCode::BackTab => app.focus = next_focus(app.focus, -1),
		KeyCode::Char('T') => {
			let theme = state.ui.toggle_theme();
			app.report(persist(state.save_ui()).map(|_| format!("theme: {}", theme.label())));
		}
		KeyCode::Char('z') => {
			let collapsed = state.ui.toggle_collapsed(app.focus);
			let message = format!(
				"{} {}",
				app.focus.title(),
				if collapsed { "collapsed" } else { "expanded" }
			);
			app.report(persist(state.save_ui()).map(|_| message));
		}
		KeyCode::Char('r') => {
			feeds.refresh_all(app.news_category);
			app.news_index = 0;
			app.status = "Refreshing transit, weather and news".to_string();
		}
		_ => match app.focus {
			WidgetId::Todo => handle_todo_key(app, code, state),
			WidgetId::Notes => handle_notes_key(app, code, state),
			WidgetId::Calendar => handle_calendar_key(app, code, state),
			WidgetId::Stopwatch => handle_stopwatch_key(app, code, state),
			WidgetId::News => handle_news_key(app, code, feeds),
			WidgetId::Transit | WidgetId::Weather | WidgetId::Clock => {}
		},
	}
	false
}

fn handle_todo_key(app: &mut App, code: KeyCode, state: &mut AppState) {
	let (selected, row_count) = {
		let rows = state.todos.filtered(app.todo_filter);
		let selected = rows.get(app.todo_index).map(|(index, todo)| (*index, todo.text.clone()));
		(selected, rows.len())
	};

	match code {
		KeyCode::Up | KeyCode::Char('k') => app.todo_index = move_index(app.todo_index, -1, row_count),
		KeyCode::Down | KeyCode::Char('j') => app.todo_index = move_index(app.todo_index, 1, row_count),
		KeyCode::Char('a') => {
			app.mode = InputMode::Prompt(PromptState::new("New task", PromptKind::AddTodoText));
		}
		KeyCode::Char('e') => match selected {
			Some((index, text)) => {
				app.mode = InputMode::Prompt(PromptState::with_input(
					"Edit task",
					text,
					PromptKind::EditTodo { index },
				));
			}
			None => app.status = "No task selected".to_string(),
		},
		KeyCode::Char(' ') => match selected {
			Some((index, _)) => {
				let result = state
					.todos
					.toggle(index)
					.and_then(|completed| persist(state.save_todos()).map(|_| completed))
					.map(|completed| if completed { "Task completed" } else { "Task reopened" }.to_string());
				app.report(result);
			}
			None => app.status = "No task selected".to_string(),
		},
		KeyCode::Char('d') => match selected {
			Some((index, text)) => {
				app.mode = InputMode::Select(build_confirm_select(
					format!("Delete task '{text}'?"),
					SelectKind::DeleteTodo { index },
				));
			}
			None => app.status = "No task selected".to_string(),
		},
		KeyCode::Char('f') => {
			app.todo_filter = app.todo_filter.next();
			app.todo_index = 0;
			app.status = format!("Showing {} tasks", app.todo_filter);
		}
		KeyCode::Char('C') => {
			let removed = state.todos.clear_completed();
			app.report(persist(state.save_todos()).map(|_| format!("Cleared {removed} completed tasks")));
		}
		_ => {}
	}
}

fn handle_notes_key(app: &mut App, code: KeyCode, state: &mut AppState) {
	let count = state.notes.len();
	match code {
		KeyCode::Up | KeyCode::Char('k') => app.note_index = move_index(app.note_index, -1, count),
		KeyCode::Down | KeyCode::Char('j') => app.note_index = move_index(app.note_index, 1, count),
		KeyCode::Char('a') => {
			app.mode = InputMode::Prompt(PromptState::new("Note title (optional)", PromptKind::AddNoteTitle));
		}
		KeyCode::Char('d') => match state.notes.notes().get(app.note_index) {
			Some(note) => {
				app.mode = InputMode::Select(build_confirm_select(
					format!("Delete note '{}'?", note.display_title()),
					SelectKind::DeleteNote {
						index: app.note_index,
					},
				));
			}
			None => app.status = "No note selected".to_string(),
		},
		_ => {}
	}
}

fn handle_calendar_key(app: &mut App, code: KeyCode, state: &mut AppState) {
	match code {
		KeyCode::Left | KeyCode::Char('h') => app.shift_selected_day(-1),
		KeyCode::Right | KeyCode::Char('l') => app.shift_selected_day(1),
		KeyCode::Up | KeyCode::Char('k') => app.shift_selected_day(-7),
		KeyCode::Down | KeyCode::Char('j') => app.shift_selected_day(7),
		KeyCode::Char('n') => app.shift_selected_month(1),
		KeyCode::Char('N') => app.shift_selected_month(-1),
		KeyCode::Char('a') => {
			let key = DateKey::from_date(app.selected_day);
			app.mode = InputMode::Prompt(PromptState::new(
				format!("Event on {key}"),
				PromptKind::AddEvent { key },
			));
		}
		KeyCode::Char('d') => {
			let key = DateKey::from_date(app.selected_day);
			let events = state.events.events(&key);
			if events.is_empty() {
				app.status = format!("No events on {key}");
				return;
			}
			let options = events
				.iter()
				.enumerate()
				.map(|(index, event)| SelectOption::new(format!("{}. {event}", index + 1), Some(index)))
				.collect();
			app.mode = InputMode::Select(SelectState::new(
				format!("Delete event on {key}"),
				SelectKind::DeleteEvent { key },
				options,
			));
		}
		_ => {}
	}
}

fn handle_stopwatch_key(app: &mut App, code: KeyCode, state: &mut AppState) {
	let now = Instant::now();
	match code {
		KeyCode::Char(' ') => {
			let status = state.stopwatch.toggle(now);
			app.status = match status {
				StopwatchStatus::Running => "Stopwatch running".to_string(),
				StopwatchStatus::Paused | StopwatchStatus::Idle => "Stopwatch paused".to_string(),
			};
		}
		KeyCode::Char('l') => match state.stopwatch.lap(now) {
			Some(lap) => {
				let number = state.stopwatch.laps().len();
				app.report(
					persist(state.save_stopwatch())
						.map(|_| format!("Lap {number}: {}", format_duration(lap.time))),
				);
			}
			None => app.status = "Start the stopwatch to record laps".to_string(),
		},
		KeyCode::Char('x') => {
			state.stopwatch.reset();
			app.report(persist(state.save_stopwatch()).map(|_| "Stopwatch reset".to_string()));
		}
		_ => {}
	}
}

fn handle_news_key(app: &mut App, code: KeyCode, feeds: &mut Feeds) {
	let headlines: &[Headline] = match &feeds.news {
		NewsView::Ready(headlines) => headlines,
		_ => &[],
	};
	match code {
		KeyCode::Up | KeyCode::Char('k') => app.news_index = move_index(app.news_index, -1, headlines.len()),
		KeyCode::Down | KeyCode::Char('j') => app.news_index = move_index(app.news_index, 1, headlines.len()),
		KeyCode::Enter => {
			if let Some(headline) = headlines.get(app.news_index) {
				app.status = headline.url.clone();
			}
		}
		KeyCode::Char('c') => {
			app.news_category = app.news_category.next();
			app.news_index = 0;
			feeds.refresh_news(app.news_category);
			app.status = format!("News category: {}", app.news_category);
		}
		_ => {}
	}
}

fn handle_prompt_key(app: &mut App, code: KeyCode, state: &mut AppState) -> bool {
	match code {
		KeyCode::Esc => {
			app.mode = InputMode::Normal;
			app.status = "Input cancelled".to_string();
		}
		KeyCode::Backspace => {
			if let InputMode::Prompt(prompt) = &mut app.mode {
				prompt.input.pop();
			}
		}
		KeyCode::Char(value) => {
			if let InputMode::Prompt(prompt) = &mut app.mode {
				prompt.input.push(value);
			}
		}
		KeyCode::Enter => {
			let prompt = match std::mem::replace(&mut app.mode, InputMode::Normal) {
				InputMode::Prompt(prompt) => prompt,
				InputMode::Normal | InputMode::Select(_) => return false,
			};

			match submit_prompt(prompt.clone(), state) {
				Ok(PromptOutcome::NextPrompt(next_prompt)) => app.mode = InputMode::Prompt(next_prompt),
				Ok(PromptOutcome::Done(message)) => {
					app.mode = InputMode::Normal;
					app.status = message;
				}
				Err(err) => {
					app.mode = InputMode::Prompt(prompt);
					app.status = format!("error: {err}");
				}
			}
		}
		_ => {}
	}

	false
}

fn handle_select_key(app: &mut App, code: KeyCode, state: &mut AppState) -> bool {
	match code {
		KeyCode::Esc => {
			app.mode = InputMode::Normal;
			app.status = "Selection cancelled".to_string();
		}
		KeyCode::Up | KeyCode::Char('k') => {
			if let InputMode::Select(select) = &mut app.mode {
				select.move_selection(-1);
			}
		}
		KeyCode::Down | KeyCode::Char('j') => {
			if let InputMode::Select(select) = &mut app.mode {
				select.move_selection(1);
			}
		}
		KeyCode::Enter => {
			let select = match std::mem::replace(&mut app.mode, InputMode::Normal) {
				InputMode::Select(select) => select,
				_ => return false,
			};

			match submit_select(select.clone(), state) {
				Ok(message) => app.status = message,
				Err(err) => {
					app.mode = InputMode::Select(select);
					app.status = format!("error: {err}");
				}
			}
		}
		_ => {}
	}

	false
}

fn submit_prompt(prompt: PromptState, state: &mut AppState) -> Result<PromptOutcome, String> {
	match prompt.kind {
		PromptKind::AddTodoText => {
			let text = required_text(&prompt.input, "task text")?;
			Ok(PromptOutcome::NextPrompt(PromptState::new(
				"Tag (optional)",
				PromptKind::AddTodoTag { text },
			)))
		}
		PromptKind::AddTodoTag { text } => {
			state.todos.add(&text, optional_text(&prompt.input).as_deref())?;
			persist(state.save_todos())?;
			Ok(PromptOutcome::Done(format!("Added task ({})", state.todos.summary())))
		}
		PromptKind::EditTodo { index } => {
			state.todos.edit(index, &prompt.input)?;
			persist(state.save_todos())?;
			Ok(PromptOutcome::Done("Task updated".to_string()))
		}
		PromptKind::AddNoteTitle => Ok(PromptOutcome::NextPrompt(PromptState::new(
			"Note body",
			PromptKind::AddNoteBody {
				title: prompt.input.trim().to_string(),
			},
		))),
		PromptKind::AddNoteBody { title } => {
			state.notes.add(&title, &prompt.input, chrono::Utc::now())?;
			persist(state.save_notes())?;
			Ok(PromptOutcome::Done("Note added".to_string()))
		}
		PromptKind::AddEvent { key } => {
			state.events.select(key.clone()).add(&prompt.input)?;
			persist(state.save_events())?;
			Ok(PromptOutcome::Done(format!("Added event on {key}")))
		}
	}
}

fn submit_select(select: SelectState, state: &mut AppState) -> Result<String, String> {
	let selected_value = select
		.selected_option()
		.and_then(|option| option.value)
		.ok_or_else(|| "no option selected".to_string());

	match select.kind {
		SelectKind::DeleteTodo { index } => {
			if selected_value.is_err() {
				return Ok("Delete cancelled".to_string());
			}
			let removed = state.todos.delete(index)?;
			persist(state.save_todos())?;
			Ok(format!("Deleted task: {}", removed.text))
		}
		SelectKind::DeleteNote { index } => {
			if selected_value.is_err() {
				return Ok("Delete cancelled".to_string());
			}
			let removed = state.notes.delete(index)?;
			persist(state.save_notes())?;
			Ok(format!("Deleted note: {}", removed.display_title()))
		}
		SelectKind::DeleteEvent { key } => {
			let position = selected_value?;
			let removed = state
				.events
				.select(key.clone())
				.remove(position)
				.ok_or_else(|| format!("event not found on {key}"))?;
			persist(state.save_events())?;
			Ok(format!("Deleted event: {removed}"))
		}
	}
}

fn build_confirm_select(title: String, kind: SelectKind) -> SelectState {
	SelectState::new(
		title,
		kind,
		vec![SelectOption::new("No", None), SelectOption::new("Yes, delete", Some(0))],
	)
}

fn persist(result: Result<(), StorageError>) -> Result<(), String> {
	result.map_err(|err| {
		warn!(error = %err, "failed to persist dashboard state");
		err.to_string()
	})
}

fn required_text(input: &str, field_name: &str) -> Result<String, String> {
	let value = input.trim();
	if value.is_empty() {
		return Err(format!("{field_name} is required"));
	}
	Ok(value.to_string())
}

fn optional_text(input: &str) -> Option<String> {
	let value = input.trim();
	if value.is_empty() {
		None
	} else {
		Some(value.to_string())
	}
}

fn move_index(current: usize, delta: i32, len: usize) -> usize {
	if len == 0 {
		return 0;
	}
	if delta > 0 {
		(current + delta as usize).min(len - 1)
	} else {
		current.saturating_sub(delta.unsigned_abs() as usize)
	}
}

fn next_focus(current: WidgetId, delta: i32) -> WidgetId {
	let position = FOCUS_ORDER.iter().position(|widget| *widget == current).unwrap_or(0) as i32;
	let next = (position + delta).rem_euclid(FOCUS_ORDER.len() as i32) as usize;
	FOCUS_ORDER[next]
}

fn severity_color(severity: Severity) -> Color {
	severity.hex_color().parse().unwrap_or(Color::Reset)
}

fn border_style(focused: bool) -> Style {
	if focused {
		Style::default()
			.fg(FOCUSED_PANEL_BORDER_COLOR)
			.add_modifier(Modifier::BOLD)
	} else {
		Style::default().fg(INACTIVE_PANEL_BORDER_COLOR)
	}
}

fn shift_month(day: NaiveDate, delta: i32) -> NaiveDate {
	let mut cursor = MonthCursor::containing(day);
	cursor.navigate(delta);
	let target_day = day.day().min(cursor.days_in_month());
	NaiveDate::from_ymd_opt(cursor.year(), cursor.month(), target_day).unwrap_or(day)
}

struct Palette {
	text: Color,
	background: Color,
	muted: Color,
	accent: Color,
	highlight_background: Color,
}

impl Palette {
	fn for_theme(theme: Theme) -> Self {
		match theme {
			Theme::Light => Self {
				text: Color::Black,
				background: Color::White,
				muted: Color::DarkGray,
				accent: Color::Blue,
				highlight_background: Color::Rgb(220, 226, 236),
			},
			Theme::Dark => Self {
				text: Color::White,
				background: Color::Rgb(24, 26, 31),
				muted: Color::Gray,
				accent: Color::LightCyan,
				highlight_background: Color::Rgb(42, 45, 52),
			},
		}
	}

	fn base(&self) -> Style {
		Style::default().fg(self.text).bg(self.background)
	}

	fn muted(&self) -> Style {
		Style::default().fg(self.muted)
	}

	fn highlight(&self) -> Style {
		Style::default()
			.bg(self.highlight_background)
			.add_modifier(Modifier::BOLD)
	}
}

enum FetchOutcome {
	Weather {
		sequence: u64,
		result: Result<Observation, FetchError>,
	},
	News {
		sequence: u64,
		result: Result<Vec<Headline>, FetchError>,
	},
}

/// Network-backed and simulated widgets. Fetches run on worker threads and
/// report back over a channel; only the newest request per widget may
/// update its view.
struct Feeds {
	client: Result<Client, String>,
	location: Option<Result<Location, String>>,
	news_key: Option<String>,
	sender: Sender<FetchOutcome>,
	receiver: Receiver<FetchOutcome>,
	weather_requests: RequestTracker,
	news_requests: RequestTracker,
	weather: WeatherView,
	news: NewsView,
	transit: &'static TransitStatus,
}

impl Feeds {
	fn new(config: &Config) -> Self {
		let (sender, receiver) = mpsc::channel();
		Self {
			client: build_client(config.fetch_timeout()).map_err(|err| err.to_string()),
			location: config.location(),
			news_key: credential(config.news.api_key.as_deref()).map(str::to_string),
			sender,
			receiver,
			weather_requests: RequestTracker::default(),
			news_requests: RequestTracker::default(),
			weather: WeatherView::Loading,
			news: NewsView::Loading,
			transit: &transit::STATUSES[0],
		}
	}

	fn refresh_all(&mut self, category: NewsCategory) {
		self.transit = transit::refresh(&mut rand::thread_rng());
		self.refresh_weather();
		self.refresh_news(category);
	}

	fn refresh_weather(&mut self) {
		let location = match &self.location {
			None => {
				self.weather = WeatherView::location_missing();
				return;
			}
			Some(Err(message)) => {
				self.weather = WeatherView::LocationUnavailable(message.clone());
				return;
			}
			Some(Ok(location)) => *location,
		};
		let client = match &self.client {
			Ok(client) => client.clone(),
			Err(message) => {
				self.weather = WeatherView::Failed(format!("Could not load weather: {message}"));
				return;
			}
		};

		let sequence = self.weather_requests.issue();
		self.weather = WeatherView::Loading;
		let sender = self.sender.clone();
		thread::spawn(move || {
			let result = WeatherClient::new(client).fetch(location);
			let _ = sender.send(FetchOutcome::Weather { sequence, result });
		});
	}

	fn refresh_news(&mut self, category: NewsCategory) {
		let Some(api_key) = self.news_key.clone() else {
			self.news = NewsView::setup_needed();
			return;
		};
		let client = match &self.client {
			Ok(client) => client.clone(),
			Err(message) => {
				self.news = NewsView::Failed(format!("Error loading news: {message}"));
				return;
			}
		};

		let sequence = self.news_requests.issue();
		self.news = NewsView::Loading;
		let sender = self.sender.clone();
		thread::spawn(move || {
			let result = NewsClient::new(client).fetch(category, &api_key);
			let _ = sender.send(FetchOutcome::News { sequence, result });
		});
	}

	fn drain(&mut self) {
		while let Ok(outcome) = self.receiver.try_recv() {
			self.apply(outcome);
		}
	}

	/// Returns `false` when the outcome belongs to a superseded request.
	fn apply(&mut self, outcome: FetchOutcome) -> bool {
		match outcome {
			FetchOutcome::Weather { sequence, result } => {
				if !self.weather_requests.is_current(sequence) {
					debug!(sequence, latest = self.weather_requests.latest(), "dropping stale weather response");
					return false;
				}
				if let Err(err) = &result {
					warn!(error = %err, "weather fetch failed");
				}
				self.weather = WeatherView::from_result(result);
			}
			FetchOutcome::News { sequence, result } => {
				if !self.news_requests.is_current(sequence) {
					debug!(sequence, latest = self.news_requests.latest(), "dropping stale news response");
					return false;
				}
				if let Err(err) = &result {
					warn!(error = %err, "news fetch failed");
				}
				self.news = NewsView::from_result(result);
			}
		}
		true
	}
}

#[derive(Debug, Clone)]
enum PromptOutcome {
	NextPrompt(PromptState),
	Done(String),
}

#[derive(Debug, Clone)]
struct PromptState {
	title: String,
	input: String,
	kind: PromptKind,
}

impl PromptState {
	fn new(title: impl Into<String>, kind: PromptKind) -> Self {
		Self::with_input(title, String::new(), kind)
	}

	fn with_input(title: impl Into<String>, input: String, kind: PromptKind) -> Self {
		Self {
			title: title.into(),
			input,
			kind,
		}
	}
}

#[derive(Debug, Clone)]
struct SelectState {
	title: String,
	options: Vec<SelectOption>,
	selected: usize,
	kind: SelectKind,
}

impl SelectState {
	fn new(title: impl Into<String>, kind: SelectKind, options: Vec<SelectOption>) -> Self {
		Self {
			title: title.into(),
			options,
			selected: 0,
			kind,
		}
	}

	fn move_selection(&mut self, delta: i32) {
		self.selected = move_index(self.selected, delta, self.options.len());
	}

	fn selected_option(&self) -> Option<&SelectOption> {
		self.options.get(self.selected)
	}
}

#[derive(Debug, Clone)]
struct SelectOption {
	label: String,
	value: Option<usize>,
}

impl SelectOption {
	fn new(label: impl Into<String>, value: Option<usize>) -> Self {
		Self {
			label: label.into(),
			value,
		}
	}
}

#[derive(Debug, Clone)]
enum PromptKind {
	AddTodoText,
	AddTodoTag { text: String },
	EditTodo { index: usize },
	AddNoteTitle,
	AddNoteBody { title: String },
	AddEvent { key: DateKey },
}

#[derive(Debug, Clone)]
enum SelectKind {
	DeleteTodo { index: usize },
	DeleteNote { index: usize },
	DeleteEvent { key: DateKey },
}

#[derive(Debug, Clone)]
enum InputMode {
	Normal,
	Prompt(PromptState),
	Select(SelectState),
}

#[derive(Debug, Clone)]
struct App {
	focus: WidgetId,
	todo_filter: TodoFilter,
	todo_index: usize,
	note_index: usize,
	selected_day: NaiveDate,
	calendar_month: MonthCursor,
	news_category: NewsCategory,
	news_index: usize,
	mode: InputMode,
	status: String,
}

impl App {
	fn new(news_category: NewsCategory) -> Self {
		let today = Local::now().date_naive();
		Self {
			focus: WidgetId::Todo,
			todo_filter: TodoFilter::All,
			todo_index: 0,
			note_index: 0,
			selected_day: today,
			calendar_month: MonthCursor::containing(today),
			news_category,
			news_index: 0,
			mode: InputMode::Normal,
			status: "Ready".to_string(),
		}
	}

	fn report(&mut self, result: Result<String, String>) {
		self.status = match result {
			Ok(message) => message,
			Err(err) => format!("error: {err}"),
		};
	}

	fn clamp_selection(&mut self, state: &AppState, feeds: &Feeds) {
		let todo_rows = state.todos.filtered(self.todo_filter).len();
		self.todo_index = self.todo_index.min(todo_rows.saturating_sub(1));
		self.note_index = self.note_index.min(state.notes.len().saturating_sub(1));
		let headlines = match &feeds.news {
			NewsView::Ready(headlines) => headlines.len(),
			_ => 0,
		};
		self.news_index = self.news_index.min(headlines.saturating_sub(1));
	}

	fn shift_selected_day(&mut self, delta_days: i64) {
		self.selected_day += Duration::days(delta_days);
		self.calendar_month = MonthCursor::containing(self.selected_day);
	}

	fn shift_selected_month(&mut self, delta_months: i32) {
		self.selected_day = shift_month(self.selected_day, delta_months);
		self.calendar_month = MonthCursor::containing(self.selected_day);
	}
}

#[cfg(test)]
mod tests {
	use std::time::{Duration, Instant};

	use chrono::NaiveDate;

	use super::{move_index, next_focus, poll_timeout, shift_month, FetchOutcome, Feeds, INPUT_POLL_INTERVAL};
	use crate::config::Config;
	use crate::fetch::FetchError;
	use crate::news::NewsView;
	use crate::preferences::WidgetId;
	use crate::weather::{Observation, WeatherView};

	fn observation(temperature_c: f64) -> Observation {
		Observation {
			temperature_c,
			code: 0,
			wind_kmh: 3.0,
			observed_at: "2026-10-16T09:00".to_string(),
		}
	}

	#[test]
	fn stale_weather_response_is_dropped() {
		let mut feeds = Feeds::new(&Config::default());
		let older = feeds.weather_requests.issue();
		let newer = feeds.weather_requests.issue();

		assert!(feeds.apply(FetchOutcome::Weather {
			sequence: newer,
			result: Ok(observation(18.0)),
		}));
		assert!(!feeds.apply(FetchOutcome::Weather {
			sequence: older,
			result: Ok(observation(5.0)),
		}));
		assert_eq!(feeds.weather, WeatherView::Ready(observation(18.0)));
	}

	#[test]
	fn news_failure_replaces_only_its_widget() {
		let mut feeds = Feeds::new(&Config::default());
		let sequence = feeds.news_requests.issue();
		feeds.apply(FetchOutcome::News {
			sequence,
			result: Err(FetchError::Status { status: 500 }),
		});
		assert!(matches!(feeds.news, NewsView::Failed(_)));
		assert_eq!(feeds.weather, WeatherView::Loading);
	}

	#[test]
	fn missing_settings_degrade_without_network() {
		let mut feeds = Feeds::new(&Config::default());
		feeds.refresh_weather();
		feeds.refresh_news(crate::news::NewsCategory::General);
		assert!(matches!(feeds.weather, WeatherView::LocationUnavailable(_)));
		assert_eq!(feeds.news, NewsView::setup_needed());
		assert_eq!(feeds.news_requests.latest(), 0);
	}

	#[test]
	fn poll_timeout_follows_sampler() {
		let now = Instant::now();
		assert_eq!(poll_timeout(None, now), INPUT_POLL_INTERVAL);
		assert_eq!(poll_timeout(Some(now + Duration::from_millis(10)), now), Duration::from_millis(10));
		assert_eq!(poll_timeout(Some(now), now + Duration::from_millis(5)), Duration::ZERO);
	}

	#[test]
	fn navigation_helpers() {
		assert_eq!(move_index(0, -1, 3), 0);
		assert_eq!(move_index(1, 5, 3), 2);
		assert_eq!(move_index(4, 1, 0), 0);
		assert_eq!(next_focus(WidgetId::News, 1), WidgetId::Todo);
		assert_eq!(next_focus(WidgetId::Todo, -1), WidgetId::News);

		let jan_31 = NaiveDate::from_ymd_opt(2024, 1, 31).expect("date");
		assert_eq!(shift_month(jan_31, 1), NaiveDate::from_ymd_opt(2024, 2, 29).expect("date"));
	}
}
