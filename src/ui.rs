use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use registry_lens::{
    DateRange, DuplicateGroup, DuplicateKey, ExportView, Record, SearchOutcome, Session, TableSource,
    YearCount,
};
use std::fs;
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Search,
    ClosedList,
    ClosedByYear,
    Duplicates,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Search => Page::ClosedList,
            Page::ClosedList => Page::ClosedByYear,
            Page::ClosedByYear => Page::Duplicates,
            Page::Duplicates => Page::Search,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::Search => Page::Duplicates,
            Page::ClosedList => Page::Search,
            Page::ClosedByYear => Page::ClosedList,
            Page::Duplicates => Page::ClosedByYear,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Search => "Search",
            Page::ClosedList => "Status List",
            Page::ClosedByYear => "Closures by Year",
            Page::Duplicates => "Duplicate Owners",
        }
    }

    /// Prompt for the page's input line.
    fn prompt(&self) -> &str {
        match self {
            Page::Search => "Query",
            Page::ClosedList => "Closure dates (YYYY-MM-DD..YYYY-MM-DD)",
            Page::ClosedByYear => "Years (YYYY..YYYY)",
            Page::Duplicates => "Key value",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// What the input line is editing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputTarget {
    /// The page's own input: query, date range, year range or key value
    Page,
    /// Status selection of the status list
    Statuses,
}

pub struct App {
    pub session: Session,
    pub current_page: Page,

    /// Rows of the record table shown on the current page
    pub view: Vec<Record>,
    pub state: TableState,
    pub outcome: SearchOutcome,

    pub statuses: Vec<String>,
    pub date_range: Option<DateRange>,
    pub year_range: Option<(i32, i32)>,
    pub year_counts: Vec<YearCount>,

    pub dup_key: DuplicateKey,
    pub dup_groups: Vec<DuplicateGroup>,
    pub group_state: TableState,
    /// Key value drilled into on the duplicates page
    pub dup_selected: Option<String>,

    pub input_mode: InputMode,
    pub input_target: InputTarget,
    pub input: String,
    pub show_detail: bool,
    pub message: Option<String>,
}

impl App {
    pub fn new(session: Session) -> Self {
        let query_text = session.query_text.clone();
        let statuses = session.default_statuses();
        let mut app = Self {
            session,
            current_page: Page::Search,
            view: Vec::new(),
            state: TableState::default(),
            outcome: SearchOutcome::NoQuery,
            statuses,
            date_range: None,
            year_range: None,
            year_counts: Vec::new(),
            dup_key: DuplicateKey::Owner,
            dup_groups: Vec::new(),
            group_state: TableState::default(),
            dup_selected: None,
            input_mode: InputMode::Normal,
            input_target: InputTarget::Page,
            input: query_text,
            show_detail: false,
            message: None,
        };
        app.refresh();
        app
    }

    /// Recompute the current page from the session.
    pub fn refresh(&mut self) {
        match self.current_page {
            Page::Search => {
                self.outcome = self.session.search();
                self.view = self.outcome.records().to_vec();
            }
            Page::ClosedList => {
                self.view = self.session.status_list(&self.statuses, self.date_range);
            }
            Page::ClosedByYear => {
                let range = self.year_range.map(|(lo, hi)| lo..=hi);
                self.year_counts = self.session.closures_by_year(range);
                self.view.clear();
            }
            Page::Duplicates => {
                self.dup_groups = self.session.duplicate_groups(self.dup_key);
                self.view = match &self.dup_selected {
                    Some(value) => self.session.duplicate_detail(self.dup_key, value),
                    None => Vec::new(),
                };
                reset_selection(&mut self.group_state, self.dup_groups.len());
            }
        }

        reset_selection(&mut self.state, self.view.len());
    }

    pub fn toggle_detail(&mut self) {
        self.show_detail = !self.show_detail;
    }

    pub fn selected_record(&self) -> Option<&Record> {
        self.state.selected().and_then(|i| self.view.get(i))
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
        self.enter_page();
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.previous();
        self.enter_page();
    }

    fn enter_page(&mut self) {
        self.show_detail = false;
        self.message = None;
        self.input = match self.current_page {
            Page::Search => self.session.query_text.clone(),
            Page::ClosedList => self
                .date_range
                .map(|r| format!("{}..{}", r.start, r.end))
                .unwrap_or_default(),
            Page::ClosedByYear => self
                .year_range
                .map(|(lo, hi)| format!("{}..{}", lo, hi))
                .unwrap_or_default(),
            Page::Duplicates => self.dup_selected.clone().unwrap_or_default(),
        };
        self.refresh();
    }

    // ========================================================================
    // INPUT LINE
    // ========================================================================

    pub fn start_editing(&mut self) {
        self.input_mode = InputMode::Editing;
        self.input_target = InputTarget::Page;
    }

    /// Edit the status selection as a comma-separated list.
    pub fn start_editing_statuses(&mut self) {
        self.input_mode = InputMode::Editing;
        self.input_target = InputTarget::Statuses;
        self.input = self.statuses.join(",");
    }

    pub fn cancel_editing(&mut self) {
        self.input_mode = InputMode::Normal;
        self.input_target = InputTarget::Page;
        self.enter_page();
    }

    /// Apply the input line to the current page.
    pub fn commit_input(&mut self) {
        self.input_mode = InputMode::Normal;
        self.message = None;
        let text = self.input.trim().to_string();

        if self.input_target == InputTarget::Statuses {
            self.input_target = InputTarget::Page;
            let picked: Vec<String> = text
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            self.statuses = if picked.is_empty() {
                self.session.default_statuses()
            } else {
                picked
            };
            self.enter_page();
            return;
        }

        match self.current_page {
            Page::Search => {
                self.session.query_text = text;
            }
            Page::ClosedList => {
                if text.is_empty() {
                    self.date_range = None;
                } else {
                    match DateRange::parse(&text) {
                        Some(range) => self.date_range = Some(range),
                        None => self.message = Some(format!("Unrecognised date range: {}", text)),
                    }
                }
            }
            Page::ClosedByYear => {
                if text.is_empty() {
                    self.year_range = None;
                } else {
                    match parse_year_range(&text) {
                        Some(range) => self.year_range = Some(range),
                        None => self.message = Some(format!("Unrecognised year range: {}", text)),
                    }
                }
            }
            Page::Duplicates => {
                self.dup_selected = if text.is_empty() { None } else { Some(text) };
            }
        }

        self.refresh();
    }

    pub fn toggle_mode(&mut self) {
        self.session.mode = self.session.mode.toggle();
        self.refresh();
    }

    pub fn toggle_dup_key(&mut self) {
        self.dup_key = self.dup_key.toggle();
        self.dup_selected = None;
        self.input.clear();
        self.refresh();
    }

    /// Drill into the highlighted duplicate group.
    pub fn open_selected_group(&mut self) {
        let key = self
            .group_state
            .selected()
            .and_then(|i| self.dup_groups.get(i))
            .map(|g| g.key.clone());
        if let Some(key) = key {
            self.input = key.clone();
            self.dup_selected = Some(key);
            self.refresh();
        }
    }

    pub fn clear_filter(&mut self) {
        match self.current_page {
            Page::Search => self.session.query_text.clear(),
            Page::ClosedList => self.date_range = None,
            Page::ClosedByYear => self.year_range = None,
            Page::Duplicates => self.dup_selected = None,
        }
        self.input.clear();
        self.message = None;
        self.refresh();
    }

    // ========================================================================
    // EXPORT
    // ========================================================================

    fn export_target(&self) -> Option<(ExportView, Result<Vec<u8>, registry_lens::ExportError>)> {
        match self.current_page {
            Page::Search if self.view.is_empty() => None,
            Page::Search => Some((ExportView::Search, self.session.export_records(&self.view))),
            Page::ClosedList => Some((ExportView::ClosedList, self.session.export_records(&self.view))),
            Page::ClosedByYear => Some((
                ExportView::ClosedByYear,
                self.session.export_year_counts(&self.year_counts),
            )),
            Page::Duplicates if self.dup_selected.is_some() => Some((
                ExportView::DuplicateDetail(self.dup_key),
                self.session.export_records(&self.view),
            )),
            Page::Duplicates => Some((
                ExportView::DuplicateSummary(self.dup_key),
                self.session.export_duplicate_groups(self.dup_key, &self.dup_groups),
            )),
        }
    }

    /// Write the current view next to the working directory.
    pub fn export_current(&mut self) {
        self.message = Some(match self.export_target() {
            None => "Nothing to export".to_string(),
            Some((view, Ok(bytes))) => match fs::write(view.file_name(), bytes) {
                Ok(()) => format!("Exported {}", view.file_name()),
                Err(e) => format!("Export failed: {}", e),
            },
            Some((_, Err(e))) => format!("Export failed: {}", e),
        });
    }

    // ========================================================================
    // NAVIGATION
    // ========================================================================

    fn active_state(&mut self) -> (&mut TableState, usize) {
        if self.current_page == Page::Duplicates && self.dup_selected.is_none() {
            (&mut self.group_state, self.dup_groups.len())
        } else if self.current_page == Page::ClosedByYear {
            // year table has no selection of its own
            (&mut self.state, 0)
        } else {
            (&mut self.state, self.view.len())
        }
    }

    pub fn next(&mut self) {
        let (state, len) = self.active_state();
        if len == 0 {
            return;
        }
        let i = match state.selected() {
            Some(i) => {
                if i >= len - 1 {
                    0
                } else {
                    i + 1
                }
            }
            None => 0,
        };
        state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let (state, len) = self.active_state();
        if len == 0 {
            return;
        }
        let i = match state.selected() {
            Some(i) => {
                if i == 0 {
                    len - 1
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        state.select(Some(i));
    }

    pub fn page_down(&mut self) {
        let (state, len) = self.active_state();
        if len == 0 {
            return;
        }
        let i = match state.selected() {
            Some(i) => (i + 20).min(len - 1),
            None => 0,
        };
        state.select(Some(i));
    }

    pub fn page_up(&mut self) {
        let (state, _) = self.active_state();
        let i = state.selected().map(|i| i.saturating_sub(20)).unwrap_or(0);
        state.select(Some(i));
    }

    pub fn first(&mut self) {
        let (state, len) = self.active_state();
        if len > 0 {
            state.select(Some(0));
        }
    }

    pub fn last(&mut self) {
        let (state, len) = self.active_state();
        if len > 0 {
            state.select(Some(len - 1));
        }
    }

    /// Handle one key press; returns false when the app should quit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if self.input_mode == InputMode::Editing {
            match key.code {
                KeyCode::Enter => self.commit_input(),
                KeyCode::Esc => self.cancel_editing(),
                KeyCode::Backspace => {
                    self.input.pop();
                }
                KeyCode::Char(c) => self.input.push(c),
                _ => {}
            }
            return true;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return false,
            KeyCode::Char('/') | KeyCode::Char('i') => self.start_editing(),
            KeyCode::Enter if self.current_page == Page::Duplicates && self.dup_selected.is_none() => {
                self.open_selected_group()
            }
            KeyCode::Enter => self.toggle_detail(),
            KeyCode::Tab => {
                if key.modifiers.contains(KeyModifiers::SHIFT) {
                    self.previous_page();
                } else {
                    self.next_page();
                }
            }
            KeyCode::BackTab => self.previous_page(),
            KeyCode::Char('m') if self.current_page == Page::Search => self.toggle_mode(),
            KeyCode::Char('b') if self.current_page == Page::Duplicates => self.toggle_dup_key(),
            KeyCode::Char('s') if self.current_page == Page::ClosedList => self.start_editing_statuses(),
            KeyCode::Char('c') => self.clear_filter(),
            KeyCode::Char('e') => self.export_current(),
            KeyCode::Down | KeyCode::Char('j') => self.next(),
            KeyCode::Up | KeyCode::Char('k') => self.previous(),
            KeyCode::PageDown => self.page_down(),
            KeyCode::PageUp => self.page_up(),
            KeyCode::Home => self.first(),
            KeyCode::End => self.last(),
            _ => {}
        }
        true
    }
}

fn reset_selection(state: &mut TableState, len: usize) {
    if len == 0 {
        state.select(None);
    } else {
        state.select(Some(0));
    }
}

fn parse_year_range(text: &str) -> Option<(i32, i32)> {
    let (lo, hi) = text.split_once("..")?;
    let lo: i32 = lo.trim().parse().ok()?;
    let hi: i32 = hi.trim().parse().ok()?;
    Some((lo.min(hi), lo.max(hi)))
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            // Windows reports releases too
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if !app.handle_key(key) {
                return Ok(());
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Length(3), // Input line
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);
    render_input(f, chunks[1], app);

    let content = chunks[2];
    match app.current_page {
        Page::ClosedByYear => render_year_counts(f, content, app),
        Page::Duplicates if app.dup_selected.is_none() => render_duplicate_groups(f, content, app),
        _ if app.show_detail => {
            let content_chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([
                    Constraint::Percentage(60), // Record list
                    Constraint::Percentage(40), // Detail panel
                ])
                .split(content);

            render_table(f, content_chunks[0], app);
            render_detail_panel(f, content_chunks[1], app);
        }
        _ => render_table(f, content, app),
    }

    render_status_bar(f, chunks[3], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let summary = app.session.summary();

    let pages = [Page::Search, Page::ClosedList, Page::ClosedByYear, Page::Duplicates];

    let mut tab_spans = vec![];
    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(page.title().to_string(), style));
    }

    let source = match app.session.source() {
        TableSource::Sample => "sample".to_string(),
        TableSource::Upload(name) => name.clone(),
    };

    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Rows: {}", summary.total),
        Style::default().fg(Color::White),
    ));
    tab_spans.push(Span::raw("  "));
    tab_spans.push(Span::styled(
        format!("Closed: {} ({:.1}%)", summary.closed, summary.closed_ratio),
        Style::default().fg(Color::Red),
    ));
    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(source, Style::default().fg(Color::Green)));

    let header = Paragraph::new(vec![Line::from(tab_spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn render_input(f: &mut Frame, area: Rect, app: &App) {
    let editing = app.input_mode == InputMode::Editing;

    let prompt = match app.input_target {
        InputTarget::Statuses => format!(
            "Statuses (comma-separated; available: {})",
            app.session.status_options().join(", ")
        ),
        InputTarget::Page => app.current_page.prompt().to_string(),
    };
    let mut spans = vec![Span::styled(
        format!(" {}: ", prompt),
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )];
    spans.push(Span::styled(
        app.input.clone(),
        if editing {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::White)
        },
    ));
    if editing {
        spans.push(Span::styled("▏", Style::default().fg(Color::Yellow)));
    }
    if app.current_page == Page::Search {
        spans.push(Span::raw("   "));
        spans.push(Span::styled(
            format!("[{}]", app.session.mode.label()),
            Style::default().fg(Color::Magenta),
        ));
    }
    if app.current_page == Page::ClosedList && app.input_target == InputTarget::Page {
        spans.push(Span::raw("   "));
        spans.push(Span::styled(
            format!("[{}]", app.statuses.join(", ")),
            Style::default().fg(Color::Magenta),
        ));
    }
    if app.current_page == Page::Duplicates {
        spans.push(Span::raw("   "));
        spans.push(Span::styled(
            format!("[by {}]", app.session.key_header(app.dup_key)),
            Style::default().fg(Color::Magenta),
        ));
    }

    let border = if editing { Color::Yellow } else { Color::White };
    let input = Paragraph::new(vec![Line::from(spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(border)));

    f.render_widget(input, area);
}

fn header_row(titles: &[&str]) -> Row<'static> {
    let cells = titles.iter().map(|h| {
        Cell::from(h.to_string()).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    });

    Row::new(cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1)
}

fn render_table(f: &mut Frame, area: Rect, app: &mut App) {
    let closed_status = app.session.closed_status().to_string();
    let header = header_row(&app.session.config().columns.display());

    let rows = app.view.iter().map(|r| {
        let color = if r.is_closed(&closed_status) {
            Color::Red
        } else {
            Color::White
        };

        let cells = vec![
            Cell::from(truncate(&r.name, 24)),
            Cell::from(r.registration_id.clone()),
            Cell::from(truncate(&r.owner_name, 14)),
            Cell::from(r.national_id.clone()),
            Cell::from(r.status.clone()).style(Style::default().fg(color)),
            Cell::from(r.closure_date_raw.clone()),
        ];

        Row::new(cells).height(1)
    });

    let title = match app.current_page {
        Page::Duplicates => format!(
            " {} = {} ({}) ",
            app.session.key_header(app.dup_key),
            app.dup_selected.as_deref().unwrap_or(""),
            app.view.len()
        ),
        page => format!(" {} ({}) ", page.title(), app.view.len()),
    };

    let table = Table::new(
        rows,
        [
            Constraint::Length(26),
            Constraint::Length(16),
            Constraint::Length(16),
            Constraint::Length(18),
            Constraint::Length(12),
            Constraint::Length(12),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(title),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_year_counts(f: &mut Frame, area: Rect, app: &App) {
    let years = app.session.closed_years();
    let span = match (years.first(), years.last()) {
        (Some(lo), Some(hi)) => format!("available {}..{}", lo, hi),
        _ => "no closure years".to_string(),
    };

    let mut content = vec![Line::from("")];
    for c in &app.year_counts {
        content.push(Line::from(vec![
            Span::styled(format!("  {:>6}  ", c.year), Style::default().fg(Color::Cyan)),
            Span::styled(format!("{:>5}  ", c.count), Style::default().fg(Color::White)),
            Span::styled("█".repeat(c.count.min(60)), Style::default().fg(Color::Red)),
        ]));
    }
    if app.year_counts.is_empty() {
        content.push(Line::from(Span::styled(
            "  No closure year information.",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    let paragraph = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(format!(" Closures by Year ({}) ", span)),
    );

    f.render_widget(paragraph, area);
}

fn render_duplicate_groups(f: &mut Frame, area: Rect, app: &mut App) {
    let key_header = app.session.key_header(app.dup_key).to_string();
    let header = header_row(&[key_header.as_str(), "Count"]);

    let rows = app.dup_groups.iter().map(|g| {
        Row::new(vec![
            Cell::from(g.key.clone()),
            Cell::from(g.count.to_string()).style(Style::default().fg(Color::Red)),
        ])
        .height(1)
    });

    let table = Table::new(rows, [Constraint::Length(30), Constraint::Length(10)])
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(format!(" Repeated {} ({}) ", key_header, app.dup_groups.len())),
        )
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.group_state);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let selected = app.state.selected().map(|i| i + 1).unwrap_or(0);
    let total = app.view.len();

    let mut status_spans = vec![Span::styled(
        format!(" Row: {}/{} ", selected, total),
        Style::default().fg(Color::Cyan),
    )];

    let advisory = match app.current_page {
        Page::Search => app.outcome.advisory().map(str::to_string),
        _ => None,
    };
    if let Some(msg) = app.message.clone().or(advisory) {
        status_spans.push(Span::raw(" | "));
        status_spans.push(Span::styled(msg, Style::default().fg(Color::Green)));
    }

    let keys: &[(&str, &str)] = match app.current_page {
        Page::Search => &[("/", "Edit"), ("m", "Mode"), ("Enter", "Details"), ("e", "Export")],
        Page::ClosedList => &[("/", "Dates"), ("s", "Statuses"), ("c", "Clear"), ("Enter", "Details"), ("e", "Export")],
        Page::ClosedByYear => &[("/", "Years"), ("c", "Clear"), ("e", "Export")],
        Page::Duplicates => &[("Enter", "Open"), ("b", "Key"), ("c", "Back"), ("e", "Export")],
    };
    for (key, label) in keys {
        status_spans.push(Span::raw(" | "));
        status_spans.push(Span::styled(*key, Style::default().fg(Color::Yellow)));
        status_spans.push(Span::raw(format!(" {}", label)));
    }
    status_spans.push(Span::raw(" | "));
    status_spans.push(Span::styled("Tab", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Page | "));
    status_spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Quit"));

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

/// Shorten to `max_len` characters (not bytes; names are mostly Hangul).
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

fn render_detail_panel(f: &mut Frame, area: Rect, app: &App) {
    let record = match app.selected_record() {
        Some(r) => r,
        None => {
            let no_selection = Paragraph::new("No record selected").block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Yellow))
                    .title(" Record Details "),
            );
            f.render_widget(no_selection, area);
            return;
        }
    };

    let label = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let columns = &app.session.config().columns;
    let field = |name: &str, value: &str| {
        vec![
            Line::from(vec![
                Span::styled(format!("  {}: ", name), label),
                Span::raw(value.to_string()),
            ]),
            Line::from(""),
        ]
    };

    let mut content = vec![Line::from("")];
    content.extend(field(&columns.name, &record.name));
    content.extend(field(&columns.registration_id, &record.registration_id));
    content.extend(field(&columns.owner_name, &record.owner_name));
    content.extend(field(&columns.national_id, &record.national_id));
    content.extend(field(&columns.status, &record.status));
    content.extend(field(&columns.closure_date, &record.closure_date_raw));
    content.extend(field("Category", &record.category));

    if !record.extra.is_empty() {
        content.push(Line::from("  ─────────────────────────────────────"));
        content.push(Line::from(""));
        for (column, value) in &record.extra {
            content.extend(field(column, value));
        }
    }

    content.push(Line::from(vec![Span::styled(
        "  Press Enter to close",
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::ITALIC),
    )]));

    let detail_panel = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(" Record Details "),
    );

    f.render_widget(detail_panel, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use registry_lens::Config;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(app: &mut App, text: &str) {
        app.handle_key(key(KeyCode::Char('/')));
        app.input.clear();
        for c in text.chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
        app.handle_key(key(KeyCode::Enter));
    }

    #[test]
    fn test_search_page_starts_empty() {
        let app = App::new(Session::sample(Config::default()));
        assert_eq!(app.current_page, Page::Search);
        assert!(app.view.is_empty());
        assert_eq!(app.outcome, SearchOutcome::NoQuery);
    }

    #[test]
    fn test_typing_a_query_filters() {
        let mut app = App::new(Session::sample(Config::default()));
        type_text(&mut app, "333-33");
        assert_eq!(app.view.len(), 1);
        assert_eq!(app.view[0].name, "C식당");
        assert_eq!(app.input_mode, InputMode::Normal);
    }

    #[test]
    fn test_mode_toggle() {
        let mut app = App::new(Session::sample(Config::default()));
        type_text(&mut app, "홍길동 김철수");
        assert!(app.view.is_empty());
        app.handle_key(key(KeyCode::Char('m')));
        assert_eq!(app.view.len(), 2);
    }

    #[test]
    fn test_closed_page_date_range() {
        let mut app = App::new(Session::sample(Config::default()));
        app.handle_key(key(KeyCode::Tab));
        assert_eq!(app.current_page, Page::ClosedList);
        assert_eq!(app.view.len(), 3);

        type_text(&mut app, "2021-01-01..2023-12-31");
        assert_eq!(app.view.len(), 2);

        type_text(&mut app, "not a range");
        assert!(app.message.is_some());
        assert_eq!(app.view.len(), 2);

        app.handle_key(key(KeyCode::Char('c')));
        assert_eq!(app.view.len(), 3);
    }

    #[test]
    fn test_year_page() {
        let mut app = App::new(Session::sample(Config::default()));
        app.current_page = Page::ClosedByYear;
        app.refresh();
        assert_eq!(app.year_counts.len(), 3);

        type_text(&mut app, "2023..2021");
        assert_eq!(app.year_range, Some((2021, 2023)));
        assert_eq!(app.year_counts.len(), 2);
    }

    #[test]
    fn test_duplicates_drill_down() {
        let mut records = registry_lens::sample_records();
        records[1].owner_name = "홍길동".to_string();
        let session = Session::new(records, TableSource::Sample, Config::default());

        let mut app = App::new(session);
        app.handle_key(key(KeyCode::BackTab));
        assert_eq!(app.current_page, Page::Duplicates);
        assert_eq!(app.dup_groups.len(), 1);

        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.dup_selected.as_deref(), Some("홍길동"));
        assert_eq!(app.view.len(), 2);

        app.handle_key(key(KeyCode::Char('b')));
        assert_eq!(app.dup_key, DuplicateKey::NationalId);
        assert!(app.dup_groups.is_empty());
        assert!(app.view.is_empty());
    }

    #[test]
    fn test_quit_keys() {
        let mut app = App::new(Session::sample(Config::default()));
        assert!(!app.handle_key(key(KeyCode::Char('q'))));

        // 'q' is text while editing
        app.handle_key(key(KeyCode::Char('/')));
        assert!(app.handle_key(key(KeyCode::Char('q'))));
        assert_eq!(app.input, "q");
    }

    #[test]
    fn test_truncate_counts_chars() {
        assert_eq!(truncate("가나다라마바사", 5), "가나...");
        assert_eq!(truncate("short", 10), "short");
    }

    #[test]
    fn test_status_selection_on_list_page() {
        let mut records = registry_lens::sample_records();
        records[0].status = "휴업".to_string();
        let session = Session::new(records, TableSource::Sample, Config::default());

        let mut app = App::new(session);
        app.handle_key(key(KeyCode::Tab));
        assert_eq!(app.statuses, vec!["폐업".to_string()]);
        assert_eq!(app.view.len(), 3);

        app.handle_key(key(KeyCode::Char('s')));
        assert_eq!(app.input_target, InputTarget::Statuses);
        assert_eq!(app.input, "폐업");
        for c in ",휴업".chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.input_target, InputTarget::Page);
        assert_eq!(app.view.len(), 4);

        // Clearing the selection restores the defaults
        app.handle_key(key(KeyCode::Char('s')));
        app.input.clear();
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.view.len(), 3);
    }
}
