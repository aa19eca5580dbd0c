use chrono::Local;
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, BorderType, Borders, List, ListItem, Paragraph, Wrap},
};

use crate::table::{RowView, TableView};
use crate::terminal::state::App;

pub fn render(f: &mut Frame, app: &mut App) {
    let view = app.table.view(&app.session, &Local::now());

    let [border_area] = Layout::vertical([Constraint::Fill(1)])
        .margin(1)
        .areas(f.area());

    let block = Block::bordered()
        .border_type(BorderType::Rounded)
        .title(" Venmo emails ")
        .fg(Color::Yellow);
    let inner = block.inner(border_area);
    f.render_widget(block, border_area);

    match view {
        TableView::Placeholder { signed_in } => {
            app.list_area = Rect::default();
            app.verify_area = Rect::default();
            render_placeholder(f, app, inner, signed_in);
        }
        TableView::Populated {
            account,
            rows,
            verify_enabled,
        } => render_table(f, app, inner, &account, &rows, verify_enabled),
    }
}

fn key_hint(key: &str, label: &str) -> Vec<Span<'static>> {
    vec![
        Span::styled(key.to_string(), Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(format!(" {label}  ")),
    ]
}

fn status_line(app: &App) -> Line<'static> {
    if app.is_loading() {
        return Line::from(Span::styled("Loading…", Style::default().fg(Color::Cyan)));
    }
    match &app.status {
        Some(s) => Line::from(Span::styled(s.clone(), Style::default().fg(Color::Gray))),
        None => Line::default(),
    }
}

fn render_placeholder(f: &mut Frame, app: &App, area: Rect, signed_in: bool) {
    let headline = if signed_in {
        format!("No Venmo emails found for {}.", app.session.account)
    } else {
        "Sign in with Google to see your Venmo emails.".to_string()
    };

    let mut hints = key_hint("s", "sign in with Google");
    if signed_in {
        hints.extend(key_hint("r", "refresh"));
    }
    hints.extend(key_hint("q", "quit"));

    let text = Text::from(vec![
        Line::from(headline),
        Line::default(),
        Line::from(hints),
        Line::default(),
        status_line(app),
    ]);

    let [_, middle, _] = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(5),
        Constraint::Fill(1),
    ])
    .areas(area);

    f.render_widget(
        Paragraph::new(text)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
        middle,
    );
}

fn render_table(
    f: &mut Frame,
    app: &mut App,
    area: Rect,
    account: &str,
    rows: &[RowView],
    verify_enabled: bool,
) {
    let [header, list_area, verify_area, footer] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Fill(1),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    let mut header_line = vec![
        Span::raw("Signed in as "),
        Span::styled(account.to_string(), Style::default().fg(Color::Green)),
        Span::raw("   "),
    ];
    header_line.extend(key_hint("o", "sign out"));
    header_line.extend(key_hint("r", "refresh"));
    f.render_widget(Paragraph::new(Line::from(header_line)), header);

    let list_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    let rows_area = list_block.inner(list_area);
    app.list_area = rows_area;

    // room left for the subject once the highlight symbol is drawn
    let width = rows_area.width.saturating_sub(2);
    let items: Vec<ListItem> = rows.iter().map(|r| mail_row(r, width)).collect();
    let list = List::new(items)
        .block(list_block)
        .highlight_symbol("➜ ")
        .highlight_style(Style::default().fg(Color::Green));
    f.render_stateful_widget(list, list_area, &mut app.list_state);

    let (verify_style, verify_label) = if verify_enabled {
        (Style::default().fg(Color::Green), "Verify Email  (Enter)")
    } else {
        (Style::default().fg(Color::DarkGray), "Verify Email  (select an email)")
    };
    app.verify_area = verify_area;
    f.render_widget(
        Paragraph::new(verify_label)
            .alignment(Alignment::Center)
            .style(verify_style)
            .block(
                Block::bordered()
                    .border_type(BorderType::Rounded)
                    .border_style(verify_style),
            ),
        verify_area,
    );

    let mut footer_line = key_hint("j/k", "move");
    footer_line.extend(key_hint("q", "quit"));
    footer_line.extend(status_line(app).spans);
    f.render_widget(Paragraph::new(Line::from(footer_line)), footer);
}

/// One list entry: subject on the left, date label flush right.
pub fn mail_row(row: &RowView, width: u16) -> ListItem<'static> {
    let date_len = row.date_label.chars().count();
    let room = (width as usize).saturating_sub(date_len + 1);

    let mut subject: String = row.subject.chars().take(room).collect();
    if subject.chars().count() < row.subject.chars().count() && room > 0 {
        subject.pop();
        subject.push('…');
    }
    let pad = room.saturating_sub(subject.chars().count()) + 1;

    let subject_style = if row.selected {
        Style::default().add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };

    ListItem::new(Line::from(vec![
        Span::styled(subject, subject_style),
        Span::raw(" ".repeat(pad)),
        Span::styled(row.date_label.clone(), Style::default().fg(Color::Gray)),
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthSession;
    use crate::domain::email::{FetchedEmail, ListQuery, MessageId, MessageList};
    use crate::mail::MailProvider;
    use crate::terminal::state::FetchDone;
    use ratatui::{Terminal, backend::TestBackend};
    use std::sync::Arc;

    struct NoMail;

    impl MailProvider for NoMail {
        fn list_messages(&self, _: &str, _: &ListQuery) -> anyhow::Result<MessageList> {
            Ok(MessageList::default())
        }
        fn fetch_full(&self, _: &str, _: &[MessageId]) -> anyhow::Result<Vec<FetchedEmail>> {
            Ok(vec![])
        }
    }

    fn screen(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 20)).unwrap();
        terminal.draw(|f| render(f, app)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content()
            .chunks(buffer.area.width as usize)
            .map(|line| line.iter().map(|c| c.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn row(subject: &str, date: &str) -> RowView {
        RowView {
            subject: subject.into(),
            date_label: date.into(),
            selected: false,
        }
    }

    #[test]
    fn signed_out_screen_offers_sign_in() {
        let mut app = App::new(
            Arc::new(NoMail),
            ListQuery::default(),
            AuthSession::signed_out("me@example.com"),
        );
        let text = screen(&mut app);
        assert!(text.contains("Sign in with Google"));
        assert!(!text.contains("Verify Email"));
    }

    #[test]
    fn populated_screen_lists_rows_and_account() {
        let mut app = App::new(
            Arc::new(NoMail),
            ListQuery::default(),
            AuthSession::signed_in("me@example.com", "tok", true),
        );
        app.apply_fetch_done(FetchDone {
            generation: 1,
            result: Ok(Some(vec![FetchedEmail {
                id: "1".into(),
                subject: "You paid Sam $5.00".into(),
                internal_date: "1700000000000".into(),
                decoded_contents: "body".into(),
            }])),
        });

        let text = screen(&mut app);
        assert!(text.contains("me@example.com"));
        assert!(text.contains("You paid Sam $5.00"));
        assert!(text.contains("select an email"));
        assert!(app.list_area.height > 0);

        app.select(0);
        let text = screen(&mut app);
        assert!(text.contains("Verify Email  (Enter)"));
    }

    #[test]
    fn long_subject_is_truncated_before_the_date() {
        let item = mail_row(&row("A very long subject line", "3/14"), 16);
        assert_eq!(item.height(), 1);

        let short = mail_row(&row("Hi", "9:05 AM"), 20);
        assert_eq!(short.width(), 20);
        let long = mail_row(&row("A very long subject line", "3/14"), 16);
        assert_eq!(long.width(), 16);
    }
}
