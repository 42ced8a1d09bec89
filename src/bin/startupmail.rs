use anyhow::{Result, anyhow, bail};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use startupmail_client::app::App;
use startupmail_client::auth::redirect;
use startupmail_client::config::{self, Config, load_config};
use startupmail_client::domain::RecordId;
use startupmail_client::domain::account::Provider;
use startupmail_client::domain::campaign::{NewCampaign, NewTemplate};
use startupmail_client::domain::email::{DraftInput, OutgoingEmail};
use startupmail_client::notify::{ConsoleNotifier, DesktopNotifier, Notifier};
use startupmail_client::outcome::ActionResult;
use startupmail_client::routes::Route;
use startupmail_client::terminal::run_tui;

#[derive(Parser)]
#[command(name = "startupmail")]
#[command(about = "StartupMail client (terminal dashboard + CLI)", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the terminal dashboard
    Tui {
        /// Start on a route, e.g. /compose or /email/<id>
        #[arg(long)]
        open: Option<String>,
    },

    /// Sign in through the identity provider
    Login {
        /// Exchange identifier, or the whole redirect URL it arrived on
        #[arg(long)]
        session_id: Option<String>,

        /// Loopback URL the identity provider redirects to
        #[arg(long)]
        callback_url: Option<String>,
    },

    /// Forget the stored session
    Logout,

    /// Print the signed-in user's profile
    Whoami,

    #[command(subcommand)]
    Accounts(AccountsCmd),

    /// Send an email from the selected account
    Send(SendArgs),

    #[command(subcommand)]
    Drafts(DraftsCmd),

    #[command(subcommand)]
    Templates(TemplatesCmd),

    #[command(subcommand)]
    Campaigns(CampaignsCmd),
}

#[derive(Subcommand)]
enum AccountsCmd {
    List,
    Connect {
        /// gmail or outlook
        #[arg(long)]
        provider: String,
        #[arg(long)]
        auth_code: String,
    },
}

#[derive(Args)]
struct MessageArgs {
    /// Comma separated recipients
    #[arg(long, value_delimiter = ',')]
    to: Vec<String>,
    #[arg(long, value_delimiter = ',')]
    cc: Vec<String>,
    #[arg(long, value_delimiter = ',')]
    bcc: Vec<String>,
    #[arg(long, default_value = "")]
    subject: String,
    #[arg(long, default_value = "")]
    body: String,
    #[arg(long)]
    html: bool,
}

#[derive(Args)]
struct SendArgs {
    #[command(flatten)]
    message: MessageArgs,
    /// Account id to send from (defaults to the primary account)
    #[arg(long)]
    account: Option<String>,
}

#[derive(Subcommand)]
enum DraftsCmd {
    List,
    Save {
        #[command(flatten)]
        message: MessageArgs,
        /// Update an existing draft
        #[arg(long)]
        id: Option<String>,
    },
    Delete {
        id: String,
    },
}

#[derive(Subcommand)]
enum TemplatesCmd {
    List,
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        subject: String,
        #[arg(long)]
        body: String,
        #[arg(long)]
        category: Option<String>,
    },
}

#[derive(Subcommand)]
enum CampaignsCmd {
    List,
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        subject: String,
        #[arg(long)]
        body: String,
        #[arg(long)]
        template_id: Option<String>,
        #[arg(long, value_delimiter = ',')]
        recipients: Vec<String>,
    },
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let cfg = load_config().map_err(|e| anyhow!("Configuration error: {e}"))?;

    match cli.cmd {
        Command::Tui { open } => {
            let route = match open {
                Some(path) => Some(Route::parse(&path).ok_or_else(|| anyhow!("unknown route {path}"))?),
                None => None,
            };
            run_tui(&cfg, route).map_err(|e| anyhow!("{e:?}"))
        }

        Command::Login {
            session_id,
            callback_url,
        } => {
            let mut app = App::from_config(&cfg, notifier(&cfg))?;
            let exchange_id = match session_id {
                Some(input) => redirect::exchange_id_from_input(&input)
                    .ok_or_else(|| anyhow!("no session_id found in {input:?}"))?,
                None => {
                    let identity = config::resolve_identity_url(&cfg)?;
                    let callback = match callback_url {
                        Some(raw) => url::Url::parse(&raw)?,
                        None => config::resolve_callback_url(&cfg)?,
                    };
                    redirect::browser_sign_in(&identity, &callback)?
                }
            };
            let result = app.login(&exchange_id);
            report(&result)?;
            if let Some(user) = app.session.user() {
                println!("Signed in as {}", user.display_name());
            }
            Ok(())
        }

        Command::Logout => {
            let mut app = App::from_config(&cfg, notifier(&cfg))?;
            app.logout();
            println!("Signed out");
            Ok(())
        }

        Command::Whoami => {
            let app = signed_in(&cfg)?;
            print_json(&app.session.user())
        }

        Command::Accounts(cmd) => {
            let mut app = signed_in(&cfg)?;
            match cmd {
                AccountsCmd::List => {
                    app.store.fetch_email_accounts();
                    print_json(&app.email_state().accounts)
                }
                AccountsCmd::Connect {
                    provider,
                    auth_code,
                } => report(&app.store.connect_email_account(&Provider::from(provider), &auth_code)),
            }
        }

        Command::Send(args) => {
            let mut app = signed_in(&cfg)?;
            app.store.fetch_email_accounts();
            if let Some(id) = args.account {
                if !app.store.select_account(&RecordId::new(&id)) {
                    bail!("no connected account with id {id}");
                }
            }
            let m = args.message;
            let email = OutgoingEmail {
                to: m.to,
                cc: m.cc,
                bcc: m.bcc,
                subject: m.subject,
                body: m.body,
                is_html: m.html,
            };
            if email.to.is_empty() {
                bail!("at least one --to recipient is required");
            }
            report(&app.store.send_email(&email))
        }

        Command::Drafts(cmd) => {
            let mut app = signed_in(&cfg)?;
            match cmd {
                DraftsCmd::List => {
                    app.store.fetch_drafts();
                    print_json(&app.email_state().drafts)
                }
                DraftsCmd::Save { message: m, id } => {
                    let draft = DraftInput {
                        to: m.to,
                        cc: m.cc,
                        bcc: m.bcc,
                        subject: m.subject,
                        body: m.body,
                        is_html: m.html,
                    };
                    let id = id.map(RecordId::from);
                    report(&app.store.save_draft(&draft, id.as_ref()))
                }
                DraftsCmd::Delete { id } => report(&app.store.delete_draft(&RecordId::from(id))),
            }
        }

        Command::Templates(cmd) => {
            let mut app = signed_in(&cfg)?;
            match cmd {
                TemplatesCmd::List => {
                    app.store.fetch_templates();
                    print_json(&app.email_state().templates)
                }
                TemplatesCmd::Create {
                    name,
                    subject,
                    body,
                    category,
                } => report(&app.store.create_template(&NewTemplate {
                    name,
                    subject,
                    body,
                    category,
                })),
            }
        }

        Command::Campaigns(cmd) => {
            let mut app = signed_in(&cfg)?;
            match cmd {
                CampaignsCmd::List => {
                    app.store.fetch_campaigns();
                    print_json(&app.email_state().campaigns)
                }
                CampaignsCmd::Create {
                    name,
                    subject,
                    body,
                    template_id,
                    recipients,
                } => report(&app.store.create_campaign(&NewCampaign {
                    name,
                    subject,
                    body,
                    template_id: template_id.map(RecordId::from),
                    recipients,
                })),
            }
        }
    }
}

fn notifier(cfg: &Config) -> Box<dyn Notifier> {
    if cfg.desktop_notifications {
        Box::new(DesktopNotifier::new(ConsoleNotifier))
    } else {
        Box::new(ConsoleNotifier)
    }
}

/// Resumes the stored session or fails with a hint to log in.
fn signed_in(cfg: &Config) -> Result<App> {
    let mut app = App::from_config(cfg, notifier(cfg))?;
    app.bootstrap();
    if !app.session.is_authenticated() {
        bail!("Not signed in. Run: startupmail login");
    }
    Ok(app)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn report<T: Serialize>(result: &ActionResult<T>) -> Result<()> {
    if result.is_success() {
        if result.data.is_some() {
            print_json(result)?;
        }
        Ok(())
    } else {
        Err(anyhow!(result.error.clone().unwrap_or_else(|| "request failed".to_string())))
    }
}
