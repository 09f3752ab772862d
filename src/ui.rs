use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use parish_ledger::currency::{format_currency, parse_amount};
use parish_ledger::{Contribution, ContributionOwner, LedgerState, ParentKind, ParentRef};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Foranes,
    Parishes,
    Communities,
    Families,
    Contributors,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Foranes => Page::Parishes,
            Page::Parishes => Page::Communities,
            Page::Communities => Page::Families,
            Page::Families => Page::Contributors,
            Page::Contributors => Page::Foranes,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::Foranes => Page::Contributors,
            Page::Parishes => Page::Foranes,
            Page::Communities => Page::Parishes,
            Page::Families => Page::Communities,
            Page::Contributors => Page::Families,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Foranes => "Foranes",
            Page::Parishes => "Parishes",
            Page::Communities => "Communities",
            Page::Families => "Families",
            Page::Contributors => "Individuals & Institutions",
        }
    }

    fn headers(&self) -> &'static [&'static str] {
        match self {
            Page::Foranes => &["#", "Code", "Name", "Location", "Vicar", "Total"],
            Page::Parishes => &["#", "Name", "Place", "Vicar", "Forane", "Total"],
            Page::Communities => &["#", "No.", "Name", "Parent"],
            Page::Families => &["#", "Family", "Head", "Community", "Contact", "Total"],
            Page::Contributors => &["#", "Name", "Type", "Contact", "Total"],
        }
    }

    fn widths(&self) -> Vec<Constraint> {
        match self {
            Page::Foranes => vec![
                Constraint::Length(4),
                Constraint::Length(9),
                Constraint::Length(22),
                Constraint::Length(18),
                Constraint::Length(22),
                Constraint::Length(16),
            ],
            Page::Parishes => vec![
                Constraint::Length(4),
                Constraint::Length(22),
                Constraint::Length(18),
                Constraint::Length(26),
                Constraint::Length(14),
                Constraint::Length(16),
            ],
            Page::Communities => vec![
                Constraint::Length(4),
                Constraint::Length(5),
                Constraint::Length(28),
                Constraint::Length(30),
            ],
            Page::Families => vec![
                Constraint::Length(4),
                Constraint::Length(18),
                Constraint::Length(14),
                Constraint::Length(22),
                Constraint::Length(14),
                Constraint::Length(16),
            ],
            Page::Contributors => vec![
                Constraint::Length(4),
                Constraint::Length(36),
                Constraint::Length(12),
                Constraint::Length(14),
                Constraint::Length(16),
            ],
        }
    }
}

/// One table row plus the contribution owner it stands for, if any
#[derive(Debug, Clone, PartialEq)]
pub struct ListRow {
    pub cells: Vec<String>,
    pub owner: Option<ContributionOwner>,
}

pub struct App {
    pub ledger: LedgerState,
    pub rows: Vec<ListRow>,
    pub state: TableState,
    pub current_page: Page,
    pub show_detail: bool,
}

impl App {
    pub fn new(ledger: LedgerState) -> Self {
        let mut app = Self {
            ledger,
            rows: Vec::new(),
            state: TableState::default(),
            current_page: Page::Families,
            show_detail: false,
        };
        app.rebuild_rows();
        app
    }

    fn parent_label(&self, parent: &ParentRef) -> String {
        let name = match parent.kind {
            ParentKind::Forane => self.ledger.foranes.get(parent.id).map(|f| f.name.clone()),
            ParentKind::Parish => self.ledger.parishes.get(parent.id).map(|p| p.name.clone()),
        };
        match name {
            Some(name) => format!("{} ({})", name, parent.kind.as_str()),
            None => parent.to_string(),
        }
    }

    fn community_label(&self, community_id: u64) -> String {
        self.ledger
            .communities
            .items()
            .find(|c| c.id == community_id)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| format!("#{}", community_id))
    }

    fn rebuild_rows(&mut self) {
        let ledger = &self.ledger;
        let mut rows: Vec<ListRow> = match self.current_page {
            Page::Foranes => ledger
                .foranes
                .items
                .iter()
                .map(|f| ListRow {
                    cells: vec![f.id.to_string(), f.code.clone(), f.name.clone(), f.location.clone(), f.vicar_name.clone(), f.total.clone()],
                    owner: None,
                })
                .collect(),
            Page::Parishes => ledger
                .parishes
                .items
                .iter()
                .map(|p| {
                    let forane = p
                        .forane_id
                        .and_then(|id| ledger.foranes.get(id))
                        .map(|f| f.code.clone())
                        .unwrap_or_else(|| "-".to_string());
                    ListRow {
                        cells: vec![p.id.to_string(), p.name.clone(), p.place.clone(), p.vicar_name.clone(), forane, p.total.clone()],
                        owner: None,
                    }
                })
                .collect(),
            Page::Communities => {
                let mut communities: Vec<_> = ledger.communities.items().collect();
                communities.sort_by_key(|c| c.id);
                communities
                    .into_iter()
                    .map(|c| ListRow {
                        cells: vec![c.id.to_string(), c.number.to_string(), c.name.clone(), self.parent_label(&c.parent)],
                        owner: None,
                    })
                    .collect()
            }
            Page::Families => ledger
                .families
                .items()
                .map(|f| ListRow {
                    cells: vec![
                        f.id.to_string(),
                        f.family_name.clone(),
                        f.head_name.clone(),
                        self.community_label(f.community_id),
                        f.contact.clone(),
                        f.total.clone(),
                    ],
                    owner: Some(ContributionOwner::Family(f.id)),
                })
                .collect(),
            Page::Contributors => ledger
                .individuals
                .items
                .iter()
                .map(|i| ListRow {
                    cells: vec![i.id.to_string(), i.name.clone(), "Individual".to_string(), i.contact.clone(), i.total.clone()],
                    owner: Some(ContributionOwner::Individual(i.id)),
                })
                .chain(ledger.institutions.items.iter().map(|i| ListRow {
                    cells: vec![i.id.to_string(), i.name.clone(), i.kind.clone(), i.contact.clone(), i.total.clone()],
                    owner: Some(ContributionOwner::Institution(i.id)),
                }))
                .collect(),
        };

        if self.current_page == Page::Families {
            rows.sort_by_key(|r| r.owner.map(|o| o.id()));
        }

        self.rows = rows;
        self.state.select(if self.rows.is_empty() { None } else { Some(0) });
    }

    pub fn toggle_detail(&mut self) {
        self.show_detail = !self.show_detail;
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
        self.rebuild_rows();
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.previous();
        self.rebuild_rows();
    }

    pub fn selected_row(&self) -> Option<&ListRow> {
        self.state.selected().and_then(|i| self.rows.get(i))
    }

    /// Contributions of the selected family / individual / institution
    pub fn selected_contributions(&self) -> Vec<&Contribution> {
        let Some(owner) = self.selected_row().and_then(|r| r.owner) else {
            return Vec::new();
        };
        self.ledger
            .contributions
            .entry(&owner)
            .map(|entry| entry.items.iter().collect())
            .unwrap_or_default()
    }

    pub fn next(&mut self) {
        if self.rows.is_empty() {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i + 1 >= self.rows.len() => 0,
            Some(i) => i + 1,
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        if self.rows.is_empty() {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => self.rows.len() - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    pub fn page_down(&mut self) {
        if self.rows.is_empty() {
            return;
        }
        let i = self.state.selected().unwrap_or(0);
        self.state.select(Some((i + 10).min(self.rows.len() - 1)));
    }

    pub fn page_up(&mut self) {
        let i = self.state.selected().unwrap_or(0);
        self.state.select(Some(i.saturating_sub(10)));
    }

    /// Sum of every contributor's running total
    pub fn grand_total(&self) -> f64 {
        let families: f64 = self.ledger.families.items().map(|f| parse_amount(&f.total)).sum();
        let individuals: f64 = self.ledger.individuals.items.iter().map(|i| parse_amount(&i.total)).sum();
        let institutions: f64 = self.ledger.institutions.items.iter().map(|i| parse_amount(&i.total)).sum();
        families + individuals + institutions
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res.map_err(Into::into)
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Enter => app.toggle_detail(),
                KeyCode::Tab => {
                    if key.modifiers.contains(KeyModifiers::SHIFT) {
                        app.previous_page();
                    } else {
                        app.next_page();
                    }
                }
                KeyCode::BackTab => app.previous_page(),
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::PageDown => app.page_down(),
                KeyCode::PageUp => app.page_up(),
                KeyCode::Home => app.state.select(Some(0)),
                KeyCode::End => {
                    if !app.rows.is_empty() {
                        app.state.select(Some(app.rows.len() - 1));
                    }
                }
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    let has_owner = app.selected_row().and_then(|r| r.owner).is_some();
    if app.show_detail && has_owner {
        let content_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(chunks[1]);

        render_table(f, content_chunks[0], app);
        render_detail_panel(f, content_chunks[1], app);
    } else {
        render_table(f, chunks[1], app);
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let pages = [
        Page::Foranes,
        Page::Parishes,
        Page::Communities,
        Page::Families,
        Page::Contributors,
    ];

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

    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Collected: {}", format_currency(app.grand_total())),
        Style::default().fg(Color::Green),
    ));

    let header = Paragraph::new(vec![Line::from(tab_spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn render_table(f: &mut Frame, area: Rect, app: &mut App) {
    let page = app.current_page;
    let header_cells = page.headers().iter().map(|h| {
        Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows = app.rows.iter().map(|row| {
        let cells = row.cells.iter().enumerate().map(|(i, value)| {
            let cell = Cell::from(truncate(value, 34));
            // Totals are always the last column
            if i + 1 == row.cells.len() && value.starts_with("Rs.") {
                cell.style(Style::default().fg(Color::Green))
            } else {
                cell
            }
        });
        Row::new(cells).height(1)
    });

    let table = Table::new(rows, page.widths())
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(format!(" {} ", page.title())),
        )
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_detail_panel(f: &mut Frame, area: Rect, app: &App) {
    let mut lines = vec![];

    if let Some(row) = app.selected_row() {
        lines.push(Line::from(Span::styled(
            row.cells.get(1).cloned().unwrap_or_default(),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(format!("Total: {}", row.cells.last().cloned().unwrap_or_default())));
        lines.push(Line::from(""));
    }

    let contributions = app.selected_contributions();
    if contributions.is_empty() {
        lines.push(Line::from(Span::styled(
            "No contributions recorded",
            Style::default().fg(Color::DarkGray),
        )));
    }
    for c in contributions {
        lines.push(Line::from(vec![
            Span::styled(c.date.format("%d %b %Y").to_string(), Style::default().fg(Color::Cyan)),
            Span::raw("  "),
            Span::styled(c.display_amount(), Style::default().fg(Color::Green)),
            Span::raw("  "),
            Span::raw(truncate(&c.purpose, 24)),
        ]));
    }

    let panel = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" Contributions "),
    );
    f.render_widget(panel, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let selected = app.state.selected().map(|i| i + 1).unwrap_or(0);

    let status_spans = vec![
        Span::styled(format!(" Row: {}/{} ", selected, app.rows.len()), Style::default().fg(Color::Cyan)),
        Span::raw(" | "),
        Span::styled("Enter", Style::default().fg(Color::Yellow)),
        Span::raw(" Contributions | "),
        Span::styled("Tab", Style::default().fg(Color::Yellow)),
        Span::raw(" Page | "),
        Span::styled("↑/↓", Style::default().fg(Color::Yellow)),
        Span::raw(" Nav | "),
        Span::styled("q", Style::default().fg(Color::Red)),
        Span::raw(" Quit"),
    ];

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parish_ledger::{MockApi, Latency, Store};
    use std::sync::Arc;

    async fn loaded_app() -> App {
        let store = Arc::new(Store::new(Arc::new(MockApi::seeded(Latency::none()))));
        crate::load_dashboard(&store).await;
        App::new(store.snapshot())
    }

    #[tokio::test]
    async fn test_families_page_lists_all_families() {
        let app = loaded_app().await;
        assert_eq!(app.current_page, Page::Families);
        assert_eq!(app.rows.len(), 4);
        assert_eq!(app.rows[0].cells[1], "Kallarackal");
        assert_eq!(app.rows[0].cells[3], "St Joseph Unit");
        assert_eq!(app.rows[0].cells[5], "Rs. 3,500");
    }

    #[tokio::test]
    async fn test_selected_contributions() {
        let mut app = loaded_app().await;
        assert_eq!(app.selected_contributions().len(), 2);

        app.next(); // Puthenpurackal
        assert_eq!(app.selected_contributions().len(), 1);
        app.next(); // Thottathil
        assert!(app.selected_contributions().is_empty());
    }

    #[tokio::test]
    async fn test_page_cycle_rebuilds_rows() {
        let mut app = loaded_app().await;
        app.next_page();
        assert_eq!(app.current_page, Page::Contributors);
        assert_eq!(app.rows.len(), 2);
        assert_eq!(app.rows[1].cells[2], "School");

        app.next_page();
        assert_eq!(app.current_page, Page::Foranes);
        assert_eq!(app.rows[0].cells[1], "KOT-KOT");

        app.previous_page();
        app.previous_page();
        assert_eq!(app.current_page, Page::Families);
    }

    #[tokio::test]
    async fn test_communities_show_parent_names() {
        let mut app = loaded_app().await;
        app.previous_page();
        assert_eq!(app.current_page, Page::Communities);
        assert_eq!(app.rows.len(), 4);
        assert_eq!(app.rows[0].cells[3], "St Mary's (parish)");
        assert_eq!(app.rows[3].cells[3], "Kottayam (forane)");
    }

    #[tokio::test]
    async fn test_grand_total() {
        let app = loaded_app().await;
        // 1000 + 2500 + 750 + 5000 + 10000 + 25000
        assert_eq!(app.grand_total(), 44250.0);
    }

    #[test]
    fn test_navigation_wraps() {
        let mut app = App::new(LedgerState::default());
        app.next();
        assert_eq!(app.state.selected(), None);

        app.rows = vec![
            ListRow { cells: vec!["1".to_string()], owner: None },
            ListRow { cells: vec!["2".to_string()], owner: None },
        ];
        app.state.select(Some(1));
        app.next();
        assert_eq!(app.state.selected(), Some(0));
        app.previous();
        assert_eq!(app.state.selected(), Some(1));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("St Mary's Higher Secondary School", 12), "St Mary's...");
    }
}
