use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::App;
use crate::routes::{Navigation, Route};
use crate::terminal::state::{ComposeField, Focus, InputMode, ViewState};

/// What the event loop should do after a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
    /// Leave the alternate screen and run the browser sign-in.
    SignIn,
}

pub fn handle_key(key: KeyEvent, state: &mut ViewState, app: &mut App) -> Result<Flow> {
    match state.mode {
        InputMode::Search => handle_search_keys(key, state, app),
        InputMode::Compose => handle_compose_keys(key, state, app),
        InputMode::Connect => handle_connect_keys(key, state, app),
        InputMode::Normal => handle_normal_keys(key, state, app),
    }
}

fn handle_normal_keys(key: KeyEvent, state: &mut ViewState, app: &mut App) -> Result<Flow> {
    if app.navigate(state.route.clone()) == Navigation::Loading {
        return Ok(match key.code {
            KeyCode::Char('q') | KeyCode::Esc => Flow::Quit,
            _ => Flow::Continue,
        });
    }

    if state.route == Route::Auth {
        return Ok(match key.code {
            KeyCode::Char('q') | KeyCode::Esc => Flow::Quit,
            KeyCode::Char('l') | KeyCode::Enter => Flow::SignIn,
            _ => Flow::Continue,
        });
    }

    match key.code {
        KeyCode::Char('q') => return Ok(Flow::Quit),

        KeyCode::Esc => {
            if matches!(state.route, Route::Email(_)) {
                state.close_email(app);
                return Ok(Flow::Continue);
            }
            if state.route != Route::Dashboard {
                state.go(app, Route::Dashboard);
                return Ok(Flow::Continue);
            }
            return Ok(Flow::Quit);
        }

        KeyCode::Char('1') => state.go(app, Route::Dashboard),
        KeyCode::Char('2') => state.go(app, Route::Templates),
        KeyCode::Char('3') => state.go(app, Route::Campaigns),
        KeyCode::Char('4') => state.go(app, Route::Analytics),
        KeyCode::Char('5') => state.go(app, Route::Settings),
        KeyCode::Char('c') => state.go(app, Route::Compose),
        KeyCode::Char('r') => state.refresh(app),
        KeyCode::Char('n') => state.begin_connect(),
        KeyCode::Char('L') => state.logout(app),
        _ => {}
    }

    match &state.route {
        Route::Dashboard => handle_list_keys(key, state, app),
        Route::Email(_) => handle_body_keys(key, state, app),
        _ => {}
    }
    Ok(Flow::Continue)
}

fn handle_list_keys(key: KeyEvent, state: &mut ViewState, app: &mut App) {
    match key.code {
        KeyCode::Down | KeyCode::Char('j') => state.move_selection(app, 1),
        KeyCode::Up | KeyCode::Char('k') => state.move_selection(app, -1),
        KeyCode::Home => state.move_selection(app, i32::MIN / 2),
        KeyCode::End => state.move_selection(app, i32::MAX / 2),
        KeyCode::Enter => state.open_selected(app),
        KeyCode::Char('/') => state.begin_search(),
        KeyCode::Char('f') => state.cycle_folder(app),
        KeyCode::Char('a') => state.cycle_account(app),
        _ => {}
    }
}

fn handle_body_keys(key: KeyEvent, state: &mut ViewState, app: &mut App) {
    match key.code {
        KeyCode::Down | KeyCode::Char('j') => state.scroll_body(1),
        KeyCode::Up | KeyCode::Char('k') => state.scroll_body(-1),
        KeyCode::PageDown => state.scroll_body(10),
        KeyCode::PageUp => state.scroll_body(-10),
        KeyCode::Home => state.body_scroll = 0,
        KeyCode::Tab => {
            state.focus = match state.focus {
                Focus::List => Focus::Body,
                Focus::Body => Focus::List,
            };
        }
        KeyCode::Backspace => state.close_email(app),
        _ => {}
    }
}

fn handle_search_keys(key: KeyEvent, state: &mut ViewState, app: &mut App) -> Result<Flow> {
    match key.code {
        KeyCode::Enter => state.end_search(app, true),
        KeyCode::Esc => state.end_search(app, false),
        KeyCode::Backspace => {
            state.search.pop();
            state.clamp_selection(app);
        }
        KeyCode::Char(c) => {
            state.search.push(c);
            state.clamp_selection(app);
        }
        _ => {}
    }
    Ok(Flow::Continue)
}

fn handle_compose_keys(key: KeyEvent, state: &mut ViewState, app: &mut App) -> Result<Flow> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('s') => state.send_compose(app),
            KeyCode::Char('d') => state.save_compose_draft(app),
            KeyCode::Char('t') => state.apply_next_template(app),
            KeyCode::Char('o') => state.load_next_draft(app),
            KeyCode::Char('x') => state.delete_loaded_draft(app),
            KeyCode::Char('c') => return Ok(Flow::Quit),
            _ => {}
        }
        return Ok(Flow::Continue);
    }

    match key.code {
        KeyCode::Esc => state.go(app, Route::Dashboard),
        KeyCode::Tab => state.compose.next_field(),
        KeyCode::Enter => {
            if state.compose.field == ComposeField::Body {
                state.compose.body.push('\n');
            } else {
                state.compose.next_field();
            }
        }
        KeyCode::Backspace => {
            state.compose.active_mut().pop();
        }
        KeyCode::Char(c) => state.compose.active_mut().push(c),
        _ => {}
    }
    Ok(Flow::Continue)
}

fn handle_connect_keys(key: KeyEvent, state: &mut ViewState, app: &mut App) -> Result<Flow> {
    match key.code {
        KeyCode::Esc => state.mode = InputMode::Normal,
        KeyCode::Tab => state.connect.toggle_provider(),
        KeyCode::Enter => state.submit_connect(app),
        KeyCode::Backspace => {
            state.connect.auth_code.pop();
        }
        KeyCode::Char(c) => state.connect.auth_code.push(c),
        _ => {}
    }
    Ok(Flow::Continue)
}
