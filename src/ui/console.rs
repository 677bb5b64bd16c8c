//! Interactive terminal front-end: a navigation menu over [`View`]s, with
//! dialoguer prompts for each form.

use anyhow::Result;
use console::{style, Term};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Password, Select};

use crate::auth::{AccountSummary, NewAccount, UserStore};

use super::actions::{self, Level, Navigation, Notice, Outcome};
use super::{Session, View};

/// Run the menu loop until the user picks "Quit" or presses Esc.
pub fn run(store: &UserStore) -> Result<()> {
    let term = Term::stdout();
    let theme = ColorfulTheme::default();
    let mut session = Session::new();

    let mut labels: Vec<&str> = View::ALL.iter().map(View::label).collect();
    labels.push("Quit");

    render_header(&term, store, &session)?;
    loop {
        let choice = Select::with_theme(&theme)
            .with_prompt("Navigation")
            .items(&labels)
            .default(0)
            .interact_on_opt(&term)?;

        let Some(view) = choice.and_then(|i| View::ALL.get(i).copied()) else {
            break;
        };

        term.write_line("")?;
        term.write_line(&style(view.title()).bold().underlined().to_string())?;

        match view {
            View::Register => {
                let first_name = text(&theme, "First name")?;
                let last_name = text(&theme, "Last name")?;
                let email = text(&theme, "Email address")?;
                let password = secret(&theme)?;
                let outcome = actions::register(
                    store,
                    &NewAccount {
                        first_name: &first_name,
                        last_name: &last_name,
                        email: &email,
                        password: &password,
                    },
                );
                show_outcome(&term, store, &session, &outcome)?;
            }
            View::Login => {
                let email = text(&theme, "Email address")?;
                let password = secret(&theme)?;
                let outcome = actions::login(store, &mut session, &email, &password);
                show_outcome(&term, store, &session, &outcome)?;
            }
            View::Delete => {
                let email = text(&theme, "Email address to delete")?;
                let outcome = actions::delete(store, &email);
                show_outcome(&term, store, &session, &outcome)?;
            }
            View::Database => match actions::database(store, &session) {
                Ok(accounts) => term.write_line(&format_table(&accounts))?,
                Err(notice) => show_notice(&term, &notice)?,
            },
            View::Logout => {
                let confirmed = Confirm::with_theme(&theme)
                    .with_prompt("Are you sure you want to log out?")
                    .default(false)
                    .interact_on(&term)?;
                if confirmed {
                    let outcome = actions::logout(&mut session);
                    show_outcome(&term, store, &session, &outcome)?;
                }
            }
        }
        term.write_line("")?;
    }
    Ok(())
}

fn text(theme: &ColorfulTheme, prompt: &str) -> Result<String> {
    Ok(Input::<String>::with_theme(theme)
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()?)
}

fn secret(theme: &ColorfulTheme) -> Result<String> {
    Ok(Password::with_theme(theme)
        .with_prompt("Password")
        .allow_empty_password(true)
        .interact()?)
}

fn render_header(term: &Term, store: &UserStore, session: &Session) -> Result<()> {
    let who = session
        .user()
        .map_or_else(|| "not logged in".to_string(), |u| format!("logged in as {u}"));
    let accounts = match store.count() {
        Ok(n) => format!("{n} account(s)"),
        Err(_) => "account count unavailable".to_string(),
    };
    term.write_line(&format!(
        "{} {}",
        style("userdesk").cyan().bold(),
        style(format!("· {who} · {accounts}")).dim()
    ))?;
    Ok(())
}

fn show_outcome(term: &Term, store: &UserStore, session: &Session, outcome: &Outcome) -> Result<()> {
    show_notice(term, &outcome.notice)?;
    if outcome.navigation == Navigation::Refresh {
        render_header(term, store, session)?;
    }
    Ok(())
}

fn show_notice(term: &Term, notice: &Notice) -> Result<()> {
    let styled = match notice.level {
        Level::Success => style(&notice.message).green(),
        Level::Warning => style(&notice.message).yellow(),
        Level::Error => style(&notice.message).red(),
    };
    term.write_line(&styled.to_string())?;
    Ok(())
}

/// Render accounts as a fixed-width text table.
pub fn format_table(accounts: &[AccountSummary]) -> String {
    const HEADERS: [&str; 4] = ["id", "first name", "last name", "email"];

    let rows: Vec<[String; 4]> = accounts
        .iter()
        .map(|a| {
            [
                a.id.to_string(),
                a.first_name.clone(),
                a.last_name.clone(),
                a.email.clone(),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(|h| h.chars().count());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |cells: [&str; 4]| -> String {
        cells
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut out = vec![line(HEADERS)];
    out.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("  "),
    );
    for row in &rows {
        out.push(line([
            row[0].as_str(),
            row[1].as_str(),
            row[2].as_str(),
            row[3].as_str(),
        ]));
    }
    if rows.is_empty() {
        out.push("(no accounts)".to_string());
    }
    out.join("\n")
}
