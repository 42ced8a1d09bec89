pub mod events;
pub mod state;
pub mod ui;

use color_eyre::eyre::{Result, eyre};
use crossterm::event::{self, Event, KeyEventKind};
use log::{info, warn};
use ratatui::DefaultTerminal;
use std::time::Duration;

use crate::app::App;
use crate::auth::redirect;
use crate::config::{self, Config};
use crate::notify::{DesktopNotifier, Notice, NoticeLevel, Notifier, ToastQueue};
use crate::routes::Route;
use events::Flow;
use state::ViewState;

const TICK: Duration = Duration::from_millis(250);

/// Runs the dashboard until the user quits. `open` starts on a given route.
pub fn run_tui(cfg: &Config, open: Option<Route>) -> Result<()> {
    color_eyre::install()?;

    let toasts = ToastQueue::new();
    let notifier: Box<dyn Notifier> = if cfg.desktop_notifications {
        Box::new(DesktopNotifier::new(toasts.clone()))
    } else {
        Box::new(toasts.clone())
    };
    let mut app = App::from_config(cfg, notifier).map_err(|e| eyre!("{e:#}"))?;
    let mut state = ViewState::new();

    let mut terminal = ratatui::init();
    // placeholder while the stored credential is checked
    terminal.draw(|f| ui::render(f, &state, &app))?;
    app.bootstrap();
    state.go(&mut app, open.unwrap_or(Route::Dashboard));

    let result = run(terminal, cfg, &mut app, &mut state, &toasts);
    ratatui::restore();
    result
}

fn run(
    mut terminal: DefaultTerminal,
    cfg: &Config,
    app: &mut App,
    state: &mut ViewState,
    toasts: &ToastQueue,
) -> Result<()> {
    loop {
        if let Some(last) = toasts.drain().pop() {
            state.status = Some(last);
        }
        terminal.draw(|f| ui::render(f, &*state, &*app))?;

        if !event::poll(TICK)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        state.status = None;

        match events::handle_key(key, state, app).map_err(|e| eyre!("{e:#}"))? {
            Flow::Continue => {}
            Flow::Quit => break,
            Flow::SignIn => {
                ratatui::restore();
                let outcome = sign_in(cfg, app);
                terminal = ratatui::init();
                state.status = Some(outcome);
                state.go(app, Route::Dashboard);
            }
        }
    }
    Ok(())
}

/// Browser sign-in with the alternate screen released.
fn sign_in(cfg: &Config, app: &mut App) -> Notice {
    let urls = config::resolve_identity_url(cfg).and_then(|id| Ok((id, config::resolve_callback_url(cfg)?)));
    let exchange_id = urls.and_then(|(identity, callback)| redirect::browser_sign_in(&identity, &callback));

    let exchange_id = match exchange_id {
        Ok(id) => id,
        Err(e) => {
            warn!("sign-in aborted: {e:#}");
            return Notice {
                level: NoticeLevel::Error,
                message: format!("Sign-in failed: {e}"),
            };
        }
    };

    let result = app.login(&exchange_id);
    if result.is_success() {
        info!("signed in");
        Notice {
            level: NoticeLevel::Success,
            message: "Signed in".to_string(),
        }
    } else {
        Notice {
            level: NoticeLevel::Error,
            message: result.error.unwrap_or_else(|| "Login failed".to_string()),
        }
    }
}
