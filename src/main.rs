mod app;
mod calendar;
mod config;
mod fetch;
mod locations;
mod logging;
mod news;
mod notes;
mod preferences;
mod stopwatch;
mod storage;
mod todos;
mod transit;
mod ui;
mod weather;

use std::error::Error;
use std::fs;
use std::path::PathBuf;

use chrono::{Local, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use crate::app::AppState;
use crate::calendar::{render, CalendarCell, DateKey, MonthCursor};
use crate::config::{generate_default_config, Config};
use crate::fetch::build_client;
use crate::locations::{default_config_path, resolve_data_dir, state_dir};
use crate::logging::init_logging;
use crate::news::{credential, NewsCategory, NewsClient, NewsView};
use crate::stopwatch::format_duration;
use crate::storage::Store;
use crate::todos::TodoFilter;
use crate::ui::run_dashboard;
use crate::weather::{WeatherClient, WeatherView};

#[derive(Debug, Parser)]
#[command(name = "deskboard", about = "Terminal personal dashboard")]
struct Cli {
	#[arg(long)]
	data_dir: Option<PathBuf>,
	#[arg(long)]
	config: Option<PathBuf>,
	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
	Dashboard,
	InitConfig {
		#[arg(long)]
		force: bool,
	},
	Todo {
		#[command(subcommand)]
		action: TodoCommand,
	},
	Note {
		#[command(subcommand)]
		action: NoteCommand,
	},
	Event {
		#[command(subcommand)]
		action: EventCommand,
	},
	Calendar {
		/// Month as YYYY-MM, defaults to the current month
		#[arg(long)]
		month: Option<String>,
	},
	Laps,
	Transit,
	Weather,
	News {
		#[arg(long, value_enum)]
		category: Option<NewsCategory>,
	},
}

#[derive(Debug, Subcommand)]
enum TodoCommand {
	Add {
		#[arg(long)]
		text: String,
		#[arg(long)]
		tag: Option<String>,
	},
	List {
		#[arg(long, value_enum, default_value_t = TodoFilter::All)]
		filter: TodoFilter,
	},
	Toggle {
		#[arg(long)]
		index: usize,
	},
	Edit {
		#[arg(long)]
		index: usize,
		#[arg(long)]
		text: String,
	},
	Remove {
		#[arg(long)]
		index: usize,
	},
	ClearCompleted,
}

#[derive(Debug, Subcommand)]
enum NoteCommand {
	Add {
		#[arg(long, default_value = "")]
		title: String,
		#[arg(long, default_value = "")]
		body: String,
	},
	List,
	Remove {
		#[arg(long)]
		index: usize,
	},
}

#[derive(Debug, Subcommand)]
enum EventCommand {
	Add {
		#[arg(long)]
		date: String,
		#[arg(long)]
		text: String,
	},
	List {
		#[arg(long)]
		date: Option<String>,
		#[arg(long, default_value_t = 20)]
		limit: usize,
	},
	Remove {
		#[arg(long)]
		date: String,
		#[arg(long)]
		index: usize,
	},
}

fn main() {
	if let Err(err) = run() {
		eprintln!("error: {err}");
		std::process::exit(1);
	}
}

fn run() -> Result<(), Box<dyn Error>> {
	let cli = Cli::parse();

	if let Some(Command::InitConfig { force }) = &cli.command {
		return write_default_config(cli.config.clone(), *force);
	}

	let config = Config::resolve(cli.config.as_deref())?;
	if let Err(err) = init_logging(&config.logging, &state_dir()) {
		eprintln!("warning: logging disabled: {err}");
	}

	let data_dir = resolve_data_dir(cli.data_dir);
	let mut state = AppState::load(Store::open(data_dir), config.sample_interval());

	match cli.command.unwrap_or(Command::Dashboard) {
		Command::Dashboard => {
			info!("starting dashboard");
			run_dashboard(&mut state, &config)?;
		}
		Command::InitConfig { .. } => {}
		Command::Todo { action } => run_todo_command(&mut state, action)?,
		Command::Note { action } => run_note_command(&mut state, action)?,
		Command::Event { action } => run_event_command(&mut state, action)?,
		Command::Calendar { month } => print_calendar(&state, month.as_deref())?,
		Command::Laps => print_laps(&state),
		Command::Transit => {
			let status = transit::refresh(&mut rand::thread_rng());
			println!("{}", status.label);
			for alert in status.alerts {
				println!("- {alert}");
			}
		}
		Command::Weather => print_weather(&config)?,
		Command::News { category } => {
			print_news(&config, category.unwrap_or(config.news.category))?;
		}
	}

	Ok(())
}

fn write_default_config(path: Option<PathBuf>, force: bool) -> Result<(), Box<dyn Error>> {
	let path = path.unwrap_or_else(default_config_path);
	if path.exists() && !force {
		return Err(format!("{} already exists, pass --force to overwrite", path.display()).into());
	}
	if let Some(parent) = path.parent() {
		if !parent.as_os_str().is_empty() {
			fs::create_dir_all(parent)?;
		}
	}
	fs::write(&path, generate_default_config())?;
	println!("wrote config to {}", path.display());
	Ok(())
}

fn run_todo_command(state: &mut AppState, action: TodoCommand) -> Result<(), Box<dyn Error>> {
	match action {
		TodoCommand::Add { text, tag } => {
			state.todos.add(&text, tag.as_deref())?;
			state.save_todos()?;
			println!("added task ({})", state.todos.summary());
		}
		TodoCommand::List { filter } => print_todos(state, filter),
		TodoCommand::Toggle { index } => {
			let completed = state.todos.toggle(position(index)?)?;
			state.save_todos()?;
			println!("task {index} {}", if completed { "completed" } else { "reopened" });
		}
		TodoCommand::Edit { index, text } => {
			state.todos.edit(position(index)?, &text)?;
			state.save_todos()?;
			println!("updated task {index}");
		}
		TodoCommand::Remove { index } => {
			let removed = state.todos.delete(position(index)?)?;
			state.save_todos()?;
			println!("removed task: {}", removed.text);
		}
		TodoCommand::ClearCompleted => {
			let removed = state.todos.clear_completed();
			state.save_todos()?;
			println!("cleared {removed} completed tasks");
		}
	}
	Ok(())
}

fn run_note_command(state: &mut AppState, action: NoteCommand) -> Result<(), Box<dyn Error>> {
	match action {
		NoteCommand::Add { title, body } => {
			state.notes.add(&title, &body, Utc::now())?;
			state.save_notes()?;
			println!("added note");
		}
		NoteCommand::List => {
			if state.notes.is_empty() {
				println!("no notes yet");
			}
			for (index, note) in state.notes.notes().iter().enumerate() {
				println!(
					"{:>2}. {} | {}",
					index + 1,
					note.display_title(),
					note.created.with_timezone(&Local).format("%Y-%m-%d %H:%M")
				);
				if !note.body.is_empty() {
					println!("    {}", note.body);
				}
			}
		}
		NoteCommand::Remove { index } => {
			let removed = state.notes.delete(position(index)?)?;
			state.save_notes()?;
			println!("removed note: {}", removed.display_title());
		}
	}
	Ok(())
}

fn run_event_command(state: &mut AppState, action: EventCommand) -> Result<(), Box<dyn Error>> {
	match action {
		EventCommand::Add { date, text } => {
			let key = parse_date_key(&date)?;
			state.events.select(key.clone()).add(&text)?;
			state.save_events()?;
			println!("added event on {key}");
		}
		EventCommand::List { date, limit } => match date {
			Some(date) => {
				let key = parse_date_key(&date)?;
				let events = state.events.events(&key);
				if events.is_empty() {
					println!("no events on {key}");
				}
				for (index, event) in events.iter().enumerate() {
					println!("{:>2}. {event}", index + 1);
				}
			}
			None => {
				let today = DateKey::from_date(Local::now().date_naive());
				let upcoming = state.events.upcoming(&today, limit);
				if upcoming.is_empty() {
					println!("no upcoming events");
				}
				for (key, event) in upcoming {
					println!("{key} | {event}");
				}
			}
		},
		EventCommand::Remove { date, index } => {
			let key = parse_date_key(&date)?;
			let removed = state
				.events
				.select(key.clone())
				.remove(position(index)?)
				.ok_or_else(|| format!("no event {index} on {key}"))?;
			state.save_events()?;
			println!("removed event: {removed}");
		}
	}
	Ok(())
}

fn print_todos(state: &AppState, filter: TodoFilter) {
	let rows = state.todos.filtered(filter);
	if rows.is_empty() {
		println!("no {filter} tasks");
	}
	for (index, todo) in rows {
		let tag = todo
			.tag_label()
			.map(|tag| format!(" [{tag}]"))
			.unwrap_or_default();
		println!(
			"{:>2}. [{}] {}{}",
			index + 1,
			if todo.completed { "x" } else { " " },
			todo.text,
			tag
		);
	}
	println!("{}", state.todos.summary());
}

fn print_calendar(state: &AppState, month: Option<&str>) -> Result<(), Box<dyn Error>> {
	let cursor = match month {
		Some(raw) => {
			let first = NaiveDate::parse_from_str(&format!("{}-01", raw.trim()), "%Y-%m-%d")?;
			MonthCursor::containing(first)
		}
		None => MonthCursor::containing(Local::now().date_naive()),
	};

	let grid = render(cursor, &state.events);
	println!("{}", cursor.title());
	println!("Su  Mo  Tu  We  Th  Fr  Sa");
	for week in grid.weeks() {
		let line = week
			.iter()
			.map(|cell| match cell {
				CalendarCell::Leading { .. } | CalendarCell::Filler => "    ".to_string(),
				CalendarCell::Day { day, has_event, .. } => {
					format!("{day:>2}{} ", if *has_event { "*" } else { " " })
				}
			})
			.collect::<String>();
		println!("{}", line.trim_end());
	}
	Ok(())
}

fn print_laps(state: &AppState) {
	let rows = state.stopwatch.lap_rows();
	if rows.is_empty() {
		println!("no laps recorded");
		return;
	}
	for row in rows {
		println!(
			"Lap {:>2} | {} | {}",
			row.number,
			format_duration(row.lap.time),
			format_duration(row.lap.accumulated_time)
		);
	}
}

fn print_weather(config: &Config) -> Result<(), Box<dyn Error>> {
	let view = match config.location() {
		None => WeatherView::location_missing(),
		Some(Err(err)) => WeatherView::LocationUnavailable(err),
		Some(Ok(location)) => {
			let client = WeatherClient::new(build_client(config.fetch_timeout())?);
			WeatherView::from_result(client.fetch(location))
		}
	};

	match view {
		WeatherView::Ready(observation) => {
			println!(
				"{}°C | {} | wind {} km/h | updated {}",
				observation.temperature_c,
				observation.condition(),
				observation.wind_kmh,
				observation.observed_clock()
			);
		}
		WeatherView::LocationUnavailable(message) | WeatherView::Failed(message) => {
			warn!(%message, "weather unavailable");
			println!("{message}");
		}
		WeatherView::Loading => {}
	}
	Ok(())
}

fn print_news(config: &Config, category: NewsCategory) -> Result<(), Box<dyn Error>> {
	let view = match credential(config.news.api_key.as_deref()) {
		None => NewsView::setup_needed(),
		Some(key) => {
			let client = NewsClient::new(build_client(config.fetch_timeout())?);
			NewsView::from_result(client.fetch(category, key))
		}
	};

	match view {
		NewsView::SetupNeeded { register_url } => {
			println!("API key required: set [news] api_key or DESKBOARD_NEWS_API_KEY.");
			println!("Get a free key at {register_url}");
		}
		NewsView::Empty => println!("No news found for this category."),
		NewsView::Ready(headlines) => {
			for headline in headlines {
				println!("{} | {}", headline.title, headline.source);
				println!("    {}", headline.url);
			}
		}
		NewsView::Failed(message) => println!("{message}"),
		NewsView::Loading => {}
	}
	Ok(())
}

fn parse_date_key(raw: &str) -> Result<DateKey, String> {
	DateKey::parse(raw).ok_or_else(|| format!("invalid date '{raw}', expected YYYY-MM-DD"))
}

/// CLI indices are 1-based.
fn position(index: usize) -> Result<usize, String> {
	index
		.checked_sub(1)
		.ok_or_else(|| "index starts at 1".to_string())
}
