use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{
    DisableMouseCapture, EnableMouseCapture, KeyCode, KeyEvent, KeyEventKind, KeyModifiers,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use log::{info, warn};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Wrap};

use lexiread::app::{App, PageSource, PageView};
use lexiread::backend::LogSpeech;
use lexiread::backend::memory::MemoryBackend;
use lexiread::backend::worker::RequestWorker;
use lexiread::config::{CommitMode, Config};
use lexiread::event::{AppEvent, EventHandler};
use lexiread::logging;
use lexiread::notice::NoticeLevel;
use lexiread::session::word_detail::{CloseReason, Direction};
use lexiread::store::json_store::JsonStore;
use lexiread::text::tokenize;
use lexiread::ui::components::reading_area::ReadingArea;
use lexiread::ui::components::training_sidebar::TrainingSidebar;
use lexiread::ui::components::translation_dialog::TranslationDialog;
use lexiread::ui::components::word_detail::WordDetailModal;
use lexiread::ui::layout::pack_hint_lines;
use lexiread::ui::theme::Theme;

#[cfg(feature = "network")]
use lexiread::backend::http::HttpBackend;

#[derive(Parser)]
#[command(
    name = "lexiread",
    version,
    about = "Terminal reader for language learners with progress-driven word highlighting"
)]
struct Cli {
    #[arg(short, long, help = "Read a local text file instead of a server chapter")]
    file: Option<PathBuf>,

    #[arg(short, long, default_value_t = 1, help = "Chapter id on the server")]
    chapter: u64,

    #[arg(short, long, default_value_t = 1, help = "Page number to open")]
    page: u32,

    #[arg(long, help = "Your native language, e.g. en or en-US")]
    native: Option<String>,

    #[arg(long, help = "Language of the book, e.g. de")]
    book_lang: Option<String>,

    #[arg(short, long, help = "Dictionary id whose progress drives highlighting")]
    dictionary: Option<u64>,

    #[arg(short, long, help = "Theme name")]
    theme: Option<String>,

    #[arg(long, help = "Apply progress changes only after the server confirms them")]
    await_commits: bool,

    #[arg(long, help = "Do not contact the server")]
    offline: bool,

    #[arg(long, help = "Write the effective settings to the config file and exit")]
    save_config: bool,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(native) = &self.native {
            config.native_language = Some(native.clone());
        }
        if let Some(lang) = &self.book_lang {
            config.book_language = lang.clone();
        }
        if let Some(id) = self.dictionary {
            config.dictionary_id = id;
        }
        if let Some(theme) = &self.theme {
            config.theme = theme.clone();
        }
        if self.await_commits {
            config.commit_mode = CommitMode::Await;
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let data_dir = JsonStore::default_dir();
    if let Err(e) = logging::init(&data_dir) {
        eprintln!("logging disabled: {e:#}");
    }

    let mut config = Config::load().unwrap_or_else(|e| {
        warn!("config could not be read, using defaults: {e:#}");
        Config::default()
    });
    cli.apply(&mut config);
    config.validate(&Theme::available_themes());
    if cli.save_config {
        let path = config.save().context("could not write the config file")?;
        info!("settings written to {}", path.display());
        println!("Settings written to {}", path.display());
        return Ok(());
    }
    let theme = Theme::load(&config.theme).unwrap_or_default();

    let local_text = match &cli.file {
        Some(path) => Some(
            fs::read_to_string(path)
                .with_context(|| format!("could not read {}", path.display()))?,
        ),
        None => None,
    };

    let store = match JsonStore::new() {
        Ok(store) => Some(store),
        Err(e) => {
            warn!("persistence disabled: {e:#}");
            None
        }
    };

    let events = EventHandler::new(Duration::from_millis(100));
    let worker = start_worker(&config, cli.offline, events.sender())?;

    let mut app = App::new(config, theme, store, Box::new(LogSpeech));
    match (&cli.file, local_text) {
        (Some(path), Some(content)) => app.load_text(&path.display().to_string(), content),
        _ => app.start(cli.chapter, cli.page),
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app, &events, &worker);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableMouseCapture,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    if !app.should_quit {
        app.save_data();
    }
    if let Err(err) = result {
        eprintln!("Error: {err:?}");
    }

    Ok(())
}

fn start_worker(
    config: &Config,
    offline: bool,
    tx: mpsc::Sender<AppEvent>,
) -> Result<RequestWorker> {
    let deliver = move |response| tx.send(AppEvent::Backend(response)).is_ok();

    #[cfg(feature = "network")]
    if !offline {
        info!("using backend at {}", config.backend_url);
        let backend = HttpBackend::new(
            &config.backend_url,
            config.api_token.clone(),
            config.request_timeout(),
        )?;
        return Ok(RequestWorker::spawn(backend, deliver));
    }

    #[cfg(not(feature = "network"))]
    if !offline {
        warn!(
            "built without network support, {} is not used",
            config.backend_url
        );
    }

    info!("running offline");
    Ok(RequestWorker::spawn(MemoryBackend::new(), deliver))
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    events: &EventHandler,
    worker: &RequestWorker,
) -> Result<()> {
    let size = terminal.size()?;
    app.resize(Rect::new(0, 0, size.width, size.height));

    loop {
        for request in app.take_requests() {
            worker.submit(request);
        }

        terminal.draw(|frame| render(frame, app))?;

        match events.next()? {
            AppEvent::Key(key) => handle_key(app, key),
            AppEvent::Mouse(mouse) => app.on_mouse(mouse),
            AppEvent::Tick => app.tick(),
            AppEvent::Resize(w, h) => app.resize(Rect::new(0, 0, w, h)),
            AppEvent::Backend(response) => app.handle_response(response),
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    if key.kind != KeyEventKind::Press {
        return;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.quit();
        return;
    }

    if !app.detail.is_closed() {
        handle_detail_key(app, key);
    } else if !app.selection.is_idle() {
        handle_dialog_key(app, key);
    } else {
        handle_reading_key(app, key);
    }
}

fn handle_reading_key(app: &mut App, key: KeyEvent) {
    let page_height = app.text_area().height.max(1) as i32;
    match key.code {
        KeyCode::Char('q') => app.quit(),
        KeyCode::Esc => {
            if app.mark.is_some() {
                app.mark = None;
            } else {
                app.cursor = None;
            }
        }
        KeyCode::Left | KeyCode::Char('h') => app.move_cursor(false),
        KeyCode::Right | KeyCode::Char('l') => app.move_cursor(true),
        KeyCode::Enter => app.activate_cursor(),
        KeyCode::Char('v') => app.toggle_mark(),
        KeyCode::Down | KeyCode::Char('j') => app.scroll_by(1),
        KeyCode::Up | KeyCode::Char('k') => app.scroll_by(-1),
        KeyCode::PageDown | KeyCode::Char(' ') => app.scroll_by(page_height),
        KeyCode::PageUp => app.scroll_by(-page_height),
        KeyCode::Char('n') => app.next_page(),
        KeyCode::Char('p') => app.prev_page(),
        KeyCode::Char('T') => app.toggle_training(),
        KeyCode::Char('C') => app.clear_training(),
        KeyCode::Char('r') => app.refresh_progress(),
        _ => {}
    }
}

fn handle_dialog_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => app.close_dialog(),
        KeyCode::Char('a') => app.add_to_dictionary(),
        KeyCode::Char('t') => app.add_selection_to_training(),
        KeyCode::Char('s') => app.speak_selection(),
        _ => {}
    }
}

fn handle_detail_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Enter => {
            app.close_detail(CloseReason::Close)
        }
        KeyCode::Up | KeyCode::Char('k') | KeyCode::Char('+') => {
            app.adjust_progress(Direction::Up)
        }
        KeyCode::Down | KeyCode::Char('j') | KeyCode::Char('-') => {
            app.adjust_progress(Direction::Down)
        }
        KeyCode::Char('h') => app.toggle_highlight(),
        KeyCode::Char('e') => app.close_detail(CloseReason::Edit),
        KeyCode::Char('d') => app.delete_word(),
        KeyCode::Char('t') => app.add_detail_to_training(),
        KeyCode::Char('s') => app.speak_detail(),
        _ => {}
    }
}

fn render(frame: &mut ratatui::Frame, app: &App) {
    let layout = app.app_layout();

    render_header(frame, app, layout.header);
    render_page(frame, app, layout.main);
    if let Some(sidebar) = layout.sidebar {
        frame.render_widget(TrainingSidebar::new(&app.training, app.theme), sidebar);
    }
    render_footer(frame, app, layout.footer);
    render_modal(frame, app);
}

fn render_header(frame: &mut ratatui::Frame, app: &App, area: Rect) {
    let colors = &app.theme.colors;
    let location = match (&app.source, &app.page) {
        (PageSource::Local { name }, _) => name.clone(),
        (PageSource::Remote { chapter_id }, PageView::Ready(page)) => match page.total_pages {
            Some(total) => format!("Chapter {chapter_id}  Page {}/{total}", page.page_number),
            None => format!("Chapter {chapter_id}  Page {}", page.page_number),
        },
        (PageSource::Remote { chapter_id }, _) => format!("Chapter {chapter_id}"),
    };
    let native = app.languages.native.as_deref().unwrap_or("??");

    let line = Line::from(vec![
        Span::styled(
            " lexiread ",
            Style::default()
                .fg(colors.header_fg())
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!(" {location} "), Style::default().fg(colors.header_fg())),
        Span::styled(
            format!(
                " {} \u{2192} {native}  {} tracked ",
                app.languages.book,
                app.index.len()
            ),
            Style::default().fg(colors.text_dim()),
        ),
    ]);
    frame.render_widget(
        Paragraph::new(line).style(Style::default().bg(colors.header_bg())),
        area,
    );
}

fn render_page(frame: &mut ratatui::Frame, app: &App, area: Rect) {
    let colors = &app.theme.colors;
    let message = |text: String, color| {
        Paragraph::new(text)
            .style(Style::default().fg(color))
            .wrap(Wrap { trim: true })
            .block(
                Block::bordered()
                    .border_style(Style::default().fg(colors.border()))
                    .style(Style::default().bg(colors.bg())),
            )
    };

    match &app.page {
        PageView::Ready(page) => {
            let tokens = tokenize(&page.content);
            let title = if app.mark.is_some() {
                "selecting: move, then [enter]"
            } else {
                ""
            };
            let area_widget = ReadingArea::new(
                &page.content,
                &tokens,
                &app.layout,
                &app.index,
                &app.palette,
                app.theme,
            )
            .selection(app.display_selection())
            .focus(app.cursor.clone())
            .scroll(app.scroll)
            .title(title);
            frame.render_widget(area_widget, area);
        }
        PageView::Loading {
            chapter_id,
            page_number,
        } => frame.render_widget(
            message(
                format!("Loading chapter {chapter_id}, page {page_number}..."),
                colors.text_dim(),
            ),
            area,
        ),
        PageView::Failed(error) => frame.render_widget(
            message(format!("Could not load the page: {error}"), colors.error()),
            area,
        ),
        PageView::Empty => frame.render_widget(
            message("Nothing to read.".to_string(), colors.text_dim()),
            area,
        ),
    }
}

fn render_footer(frame: &mut ratatui::Frame, app: &App, area: Rect) {
    let colors = &app.theme.colors;

    if let Some(notice) = app.notices.latest() {
        let color = match notice.level {
            NoticeLevel::Info => colors.success(),
            NoticeLevel::Warning => colors.warning(),
            NoticeLevel::Error => colors.error(),
        };
        frame.render_widget(
            Paragraph::new(format!(" {}", notice.message)).style(Style::default().fg(color)),
            area,
        );
        return;
    }

    let hints: &[&str] = if app.modal_open() {
        &[]
    } else {
        &[
            "[click] translate",
            "[drag] select",
            "[\u{2190}/\u{2192}] word",
            "[enter] open",
            "[v] mark",
            "[n/p] page",
            "[T] training",
            "[q] quit",
        ]
    };
    let line = pack_hint_lines(hints, area.width as usize)
        .into_iter()
        .next()
        .unwrap_or_default();
    frame.render_widget(
        Paragraph::new(line).style(Style::default().fg(colors.text_dim())),
        area,
    );
}

fn render_modal(frame: &mut ratatui::Frame, app: &App) {
    let Some(area) = app.modal_area() else {
        return;
    };
    if !app.detail.is_closed() {
        frame.render_widget(
            WordDetailModal::new(app.detail.state(), &app.palette, app.theme),
            area,
        );
    } else if let (Some(selection), Some(status)) =
        (app.selection.selection(), app.selection.status())
    {
        frame.render_widget(
            TranslationDialog::new(&selection.selected_text, status, app.theme),
            area,
        );
    }
}
