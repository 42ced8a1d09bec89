use ratatui::{
    Frame,
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};

use crate::app::App;
use crate::domain::email::{EmailMessage, Folder};
use crate::notify::NoticeLevel;
use crate::routes::{Navigation, Route};
use crate::store::derive;
use crate::terminal::state::{ComposeField, Focus, InputMode, ViewState};

const READING_WIDTH: usize = 100;

pub fn render(f: &mut Frame, state: &ViewState, app: &App) {
    let [main, footer] = Layout::vertical([Constraint::Min(0), Constraint::Length(1)]).areas(f.area());

    match app.navigate(state.route.clone()) {
        Navigation::Loading => render_loading(f, main),
        Navigation::Render(route) | Navigation::Redirect(route) => match route {
            Route::Auth | Route::Root => render_auth(f, main),
            Route::Dashboard => render_dashboard(f, main, state, app),
            Route::Email(_) => render_email(f, main, state, app),
            Route::Compose => render_compose(f, main, state, app),
            Route::Templates => render_templates(f, main, app),
            Route::Campaigns => render_campaigns(f, main, app),
            Route::Analytics => render_analytics(f, main, app),
            Route::Settings => render_settings(f, main, app),
        },
    }

    if state.mode == InputMode::Connect {
        render_connect(f, main, state);
    }
    render_footer(f, footer, state);
}

fn bordered(title: impl Into<String>, active: bool) -> Block<'static> {
    let color = if active { Color::Yellow } else { Color::DarkGray };
    Block::default()
        .title(format!(" {} ", title.into()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
}

fn bold(s: impl Into<String>) -> Span<'static> {
    Span::styled(s.into(), Style::default().add_modifier(Modifier::BOLD))
}

fn popup_area(area: Rect, width: u16, height: u16) -> Rect {
    let [row] = Layout::vertical([Constraint::Length(height)]).flex(Flex::Center).areas(area);
    let [cell] = Layout::horizontal([Constraint::Length(width)]).flex(Flex::Center).areas(row);
    cell
}

fn render_loading(f: &mut Frame, area: Rect) {
    let p = Paragraph::new("Loading…").block(bordered("StartupMail", false));
    f.render_widget(p, popup_area(area, 30, 3));
}

fn render_auth(f: &mut Frame, area: Rect) {
    let text = Text::from(vec![
        Line::from(bold("Welcome to StartupMail")),
        Line::from(""),
        Line::from("Email and outreach for founders."),
        Line::from(""),
        Line::from(vec![Span::raw("Press "), bold("l"), Span::raw(" to sign in with your browser.")]),
    ]);
    let p = Paragraph::new(text).block(bordered("Sign in", true)).wrap(Wrap { trim: true });
    f.render_widget(p, popup_area(area, 50, 7));
}

fn render_dashboard(f: &mut Frame, area: Rect, state: &ViewState, app: &App) {
    let st = app.email_state();
    if st.accounts.is_empty() && !st.loading {
        let text = Text::from(vec![
            Line::from(bold("Connect your email")),
            Line::from(""),
            Line::from("Connect your Gmail or Outlook account to start managing your emails."),
            Line::from(""),
            Line::from(vec![Span::raw("Press "), bold("n"), Span::raw(" to connect an account.")]),
        ]);
        let p = Paragraph::new(text).block(bordered("No accounts", true)).wrap(Wrap { trim: true });
        f.render_widget(p, popup_area(area, 60, 7));
        return;
    }

    let [sidebar, content] =
        Layout::horizontal([Constraint::Length(28), Constraint::Min(0)]).areas(area);
    render_sidebar(f, sidebar, app);

    let [header, list_area] = Layout::vertical([Constraint::Length(3), Constraint::Min(0)]).areas(content);

    let mut heading = vec![bold(derive::folder_title(&st.current_folder))];
    if let Some(acc) = &st.selected_account {
        heading.push(Span::styled(format!("  {}", acc.email), Style::default().fg(Color::Gray)));
    }
    let search_active = state.mode == InputMode::Search;
    let search = if state.search.is_empty() && !search_active {
        Span::styled("  / search", Style::default().fg(Color::DarkGray))
    } else {
        Span::styled(
            format!("  search: {}{}", state.search, if search_active { "_" } else { "" }),
            Style::default().fg(Color::Cyan),
        )
    };
    heading.push(search);
    f.render_widget(Paragraph::new(Line::from(heading)).block(bordered("StartupMail", false)), header);

    let emails = state.visible_emails(app);
    let title = if st.loading {
        "Messages (loading…)".to_string()
    } else {
        format!("Messages ({})", emails.len())
    };
    let block = bordered(title, state.focus == Focus::List);

    if emails.is_empty() {
        let msg = if state.search.is_empty() {
            "No emails in this folder."
        } else {
            "No emails match your search."
        };
        f.render_widget(Paragraph::new(msg).block(block), list_area);
        return;
    }

    let items: Vec<ListItem> = emails.iter().map(|e| email_item(e)).collect();
    let list = List::new(items)
        .block(block)
        .highlight_symbol("➜ ")
        .highlight_style(Style::default().fg(Color::Green));
    f.render_stateful_widget(list, list_area, &mut state.list_state.clone());
}

fn email_item(e: &EmailMessage) -> ListItem<'static> {
    let mut subject_style = Style::default();
    if !e.is_read {
        subject_style = subject_style.add_modifier(Modifier::BOLD);
    }
    let flag = if e.is_important { "! " } else { "  " };
    let subject = if e.subject.is_empty() { "(no subject)" } else { e.subject.as_str() };
    let first = Line::from(vec![
        Span::styled(flag, Style::default().fg(Color::Red)),
        Span::styled(subject.to_string(), subject_style),
    ]);
    let second = Line::from(Span::styled(format!("  {}", e.from), Style::default().fg(Color::Gray)));
    ListItem::new(Text::from(vec![first, second]))
}

fn render_sidebar(f: &mut Frame, area: Rect, app: &App) {
    let st = app.email_state();
    let counts = derive::folder_counts(&st.emails);

    let mut lines: Vec<Line> = Folder::KNOWN
        .iter()
        .map(|folder| {
            let marker = if *folder == st.current_folder { "➜ " } else { "  " };
            let n = counts.for_folder(folder).unwrap_or_default();
            Line::from(format!("{marker}{:<10}{n:>4}", derive::folder_title(folder)))
        })
        .collect();
    if let Folder::Other(_) = st.current_folder {
        lines.push(Line::from(format!("➜ {}", derive::folder_title(&st.current_folder))));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(format!("  Unread    {:>4}", counts.unread)));
    lines.push(Line::from(format!("  Important {:>4}", counts.important)));
    lines.push(Line::from(""));
    lines.push(Line::from(bold("Accounts")));
    for acc in &st.accounts {
        let selected = st.selected_account.as_ref().is_some_and(|s| s.id == acc.id);
        let style = if selected {
            Style::default().fg(Color::Green)
        } else {
            Style::default()
        };
        lines.push(Line::from(Span::styled(
            format!("{} {}", if selected { "●" } else { "○" }, acc.email),
            style,
        )));
    }
    if let Some(user) = app.session.user() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            user.display_name().to_string(),
            Style::default().fg(Color::Gray),
        )));
    }

    f.render_widget(Paragraph::new(lines).block(bordered("Folders", false)), area);
}

/// Plain text for the reading pane; HTML bodies go through html2text.
pub fn body_text(e: &EmailMessage) -> String {
    if e.is_html {
        html2text::from_read(e.body.as_bytes(), READING_WIDTH).unwrap_or_else(|_| e.body.clone())
    } else {
        e.body.clone()
    }
}

fn render_email(f: &mut Frame, area: Rect, state: &ViewState, app: &App) {
    let Some(e) = state.opened_email(app) else {
        let p = Paragraph::new("Email not found. Press Esc to go back.").block(bordered("Email", true));
        f.render_widget(p, area);
        return;
    };

    let [meta, body] = Layout::vertical([Constraint::Length(5), Constraint::Min(0)]).areas(area);
    let mut header = vec![
        Line::from(vec![bold("From: "), Span::raw(e.from.clone())]),
        Line::from(vec![bold("To: "), Span::raw(e.to.join(", "))]),
    ];
    if let Some(at) = &e.sent_at {
        header.push(Line::from(vec![bold("Date: "), Span::raw(at.clone())]));
    }
    f.render_widget(Paragraph::new(header).block(bordered(e.subject.clone(), false)), meta);

    let p = Paragraph::new(body_text(e))
        .block(bordered("Message", state.focus == Focus::Body))
        .wrap(Wrap { trim: false })
        .scroll((state.body_scroll, 0));
    f.render_widget(p, body);
}

fn render_compose(f: &mut Frame, area: Rect, state: &ViewState, app: &App) {
    let [form, side] = Layout::horizontal([Constraint::Percentage(70), Constraint::Percentage(30)]).areas(area);
    let [to, subject, body] =
        Layout::vertical([Constraint::Length(3), Constraint::Length(3), Constraint::Min(0)]).areas(form);

    let form_state = &state.compose;
    let field = |title: &str, value: &str, which: ComposeField| {
        Paragraph::new(value.to_string())
            .block(bordered(title.to_string(), form_state.field == which))
            .wrap(Wrap { trim: false })
    };
    f.render_widget(field("To", &form_state.to, ComposeField::To), to);
    f.render_widget(field("Subject", &form_state.subject, ComposeField::Subject), subject);
    let body_title = match &form_state.draft_id {
        Some(id) => format!("Body (draft {id})"),
        None => "Body".to_string(),
    };
    f.render_widget(field(&body_title, &form_state.body, ComposeField::Body), body);

    let st = app.email_state();
    let [templates, drafts] =
        Layout::vertical([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(side);
    let items: Vec<ListItem> = st.templates.iter().map(|t| ListItem::new(t.name.clone())).collect();
    f.render_widget(List::new(items).block(bordered("Templates (^T)", false)), templates);
    let items: Vec<ListItem> = st
        .drafts
        .iter()
        .map(|d| {
            let subject = if d.subject.is_empty() { "(no subject)" } else { d.subject.as_str() };
            ListItem::new(subject.to_string())
        })
        .collect();
    f.render_widget(List::new(items).block(bordered("Drafts (^O)", false)), drafts);
}

fn render_templates(f: &mut Frame, area: Rect, app: &App) {
    let items: Vec<ListItem> = app
        .email_state()
        .templates
        .iter()
        .map(|t| {
            let category = t.category.as_deref().unwrap_or("general");
            ListItem::new(Text::from(vec![
                Line::from(vec![bold(t.name.clone()), Span::styled(format!("  [{category}]"), Style::default().fg(Color::Cyan))]),
                Line::from(Span::styled(format!("  {}", t.subject), Style::default().fg(Color::Gray))),
            ]))
        })
        .collect();
    let title = format!("Templates ({})", items.len());
    f.render_widget(List::new(items).block(bordered(title, true)), area);
}

fn render_campaigns(f: &mut Frame, area: Rect, app: &App) {
    let items: Vec<ListItem> = app
        .email_state()
        .campaigns
        .iter()
        .map(|c| {
            let status = c.status.as_deref().unwrap_or("draft");
            ListItem::new(Text::from(vec![
                Line::from(vec![bold(c.name.clone()), Span::styled(format!("  {status}"), Style::default().fg(Color::Cyan))]),
                Line::from(Span::styled(
                    format!("  {} · {} recipients", c.subject, c.recipients.len()),
                    Style::default().fg(Color::Gray),
                )),
            ]))
        })
        .collect();
    let title = format!("Campaigns ({})", items.len());
    f.render_widget(List::new(items).block(bordered(title, true)), area);
}

fn render_analytics(f: &mut Frame, area: Rect, app: &App) {
    let st = app.email_state();
    let counts = derive::folder_counts(&st.emails);
    let row = |label: &str, n: usize| Line::from(vec![Span::raw(format!("{label:<18}")), bold(n.to_string())]);
    let lines = vec![
        row("Total emails", st.emails.len()),
        row("Inbox", counts.inbox),
        row("Sent", counts.sent),
        row("Drafts", counts.drafts),
        row("Unread", counts.unread),
        row("Important", counts.important),
        Line::from(""),
        row("Campaigns", st.campaigns.len()),
        row("Connected accounts", st.accounts.len()),
    ];
    f.render_widget(Paragraph::new(lines).block(bordered("Analytics", true)), area);
}

fn render_settings(f: &mut Frame, area: Rect, app: &App) {
    let mut lines = Vec::new();
    if let Some(user) = app.session.user() {
        lines.push(Line::from(vec![bold("Name: "), Span::raw(user.display_name().to_string())]));
        if let Some(email) = &user.email {
            lines.push(Line::from(vec![bold("Email: "), Span::raw(email.clone())]));
        }
        if let Some(company) = &user.company {
            lines.push(Line::from(vec![bold("Company: "), Span::raw(company.clone())]));
        }
    }
    lines.push(Line::from(vec![bold("Backend: "), Span::raw(app.api().base_url().to_string())]));
    lines.push(Line::from(""));
    lines.push(Line::from(bold("Connected accounts")));
    for acc in &app.email_state().accounts {
        let primary = if acc.is_primary { " (primary)" } else { "" };
        lines.push(Line::from(format!("  {:<8} {}{primary}", acc.provider.display_name(), acc.email)));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(vec![Span::raw("n "), Span::raw("connect account  "), bold("L"), Span::raw(" log out")]));
    f.render_widget(Paragraph::new(lines).block(bordered("Settings", true)), area);
}

fn render_connect(f: &mut Frame, area: Rect, state: &ViewState) {
    let popup = popup_area(area, 56, 7);
    f.render_widget(Clear, popup);
    let text = Text::from(vec![
        Line::from(vec![bold("Provider: "), Span::raw(state.connect.provider.display_name()), Span::styled("  (Tab to switch)", Style::default().fg(Color::DarkGray))]),
        Line::from(""),
        Line::from(vec![bold("Auth code: "), Span::raw(format!("{}_", state.connect.auth_code))]),
        Line::from(""),
        Line::from(Span::styled("Enter connect · Esc cancel", Style::default().fg(Color::DarkGray))),
    ]);
    f.render_widget(Paragraph::new(text).block(bordered("Connect account", true)), popup);
}

fn render_footer(f: &mut Frame, area: Rect, state: &ViewState) {
    if let Some(notice) = &state.status {
        let color = match notice.level {
            NoticeLevel::Success => Color::Green,
            NoticeLevel::Error => Color::Red,
        };
        let p = Paragraph::new(Span::styled(notice.message.clone(), Style::default().fg(color)));
        f.render_widget(p, area);
        return;
    }

    let hints: &[(&str, &str)] = match state.mode {
        InputMode::Compose => &[("Tab", "field"), ("^S", "send"), ("^D", "save draft"), ("^X", "delete draft"), ("Esc", "back")],
        InputMode::Search => &[("Enter", "keep"), ("Esc", "clear")],
        InputMode::Connect => &[("Tab", "provider"), ("Enter", "connect"), ("Esc", "cancel")],
        InputMode::Normal => &[
            ("j/k", "move"),
            ("Enter", "open"),
            ("/", "search"),
            ("f", "folder"),
            ("a", "account"),
            ("c", "compose"),
            ("1-5", "views"),
            ("r", "refresh"),
            ("q", "quit"),
        ],
    };
    let spans: Vec<Span> = hints
        .iter()
        .flat_map(|(key, what)| [bold(*key), Span::raw(format!(" {what}  "))])
        .collect();
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RecordId;

    #[test]
    fn html_bodies_are_rendered_as_text() {
        let e = EmailMessage {
            id: RecordId::new("e1"),
            body: "<p>Hello <b>there</b></p>".into(),
            is_html: true,
            ..Default::default()
        };
        let text = body_text(&e);
        assert!(text.contains("Hello"));
        assert!(!text.contains("<p>"));
    }

    #[test]
    fn plain_bodies_pass_through() {
        let e = EmailMessage {
            body: "<not html>".into(),
            ..Default::default()
        };
        assert_eq!(body_text(&e), "<not html>");
    }
}
