#![forbid(unsafe_code)]
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use escala::{
    assign::{self, HttpAssigner, SlotRef, SlotStatus},
    build_weeks,
    config::Config,
    decode_records,
    model::{ShiftRecord, NOT_OFFERED_MARKER},
    parse_record_date,
    poller::{PollError, Poller, TickOutcome},
    render::{render_weeks, JsonRenderer, Renderer, TextRenderer},
    source::{FileSource, HttpSource, ShiftSource},
    state::{ClientState, JsonStateStore, StateStore},
    Locale,
};
use std::io;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
#[cfg(feature = "logging")]
use tracing_subscriber::{fmt::Subscriber, EnvFilter};

/// CLI du calendrier de turnos
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Active les logs (feature `logging`)
    #[arg(long, global = true)]
    log: bool,

    /// Fichier de configuration TOML (défaut : escala.toml s'il existe)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Fichier d'état client (utilisateur, admin, pause)
    #[arg(long, global = true)]
    state: Option<PathBuf>,

    /// Langue des libellés (es, en)
    #[arg(long, global = true)]
    locale: Option<Locale>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Récupérer une fois et afficher le calendrier
    Render {
        /// Fichier JSON local au lieu de l'endpoint
        #[arg(long, conflicts_with = "url")]
        input: Option<PathBuf>,
        #[arg(long)]
        url: Option<String>,
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Afficher la grille des semaines d'un mois
    Weeks {
        #[arg(long)]
        year: i32,
        /// 1 = janvier
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: u32,
    },

    /// Rafraîchir en continu (stdin : p = pause, r = rafraîchir, q = quitter)
    Watch {
        #[arg(long, conflicts_with = "url")]
        input: Option<PathBuf>,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        interval_ms: Option<u64>,
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Définir l'utilisateur courant
    Session {
        #[arg(long)]
        user: Option<String>,
        #[arg(long)]
        admin: bool,
        /// Efface l'état enregistré
        #[arg(long, conflicts_with_all = ["user", "admin"])]
        logout: bool,
    },

    /// Lister les postes du lot avec leur identifiant
    Slots {
        #[arg(long, conflicts_with = "url")]
        input: Option<PathBuf>,
        #[arg(long)]
        url: Option<String>,
    },

    /// S'inscrire sur un poste libre (utilisateur de la session)
    Claim {
        /// Identifiant d'assignation (voir `slots`)
        id: String,
        #[arg(long, conflicts_with = "url")]
        input: Option<PathBuf>,
        #[arg(long)]
        url: Option<String>,
    },

    /// Libérer un poste occupé (admin)
    Release {
        id: String,
        #[arg(long, conflicts_with = "url")]
        input: Option<PathBuf>,
        #[arg(long)]
        url: Option<String>,
    },

    /// Suspendre les mises à jour automatiques (admin)
    Pause,

    /// Reprendre les mises à jour automatiques (admin)
    Resume,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    #[cfg(feature = "logging")]
    if cli.log {
        let _ = Subscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(io::stderr)
            .try_init();
    }

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(path) = cli.state {
        config.state_path = path;
    }
    if let Some(locale) = cli.locale {
        config.locale = locale;
    }
    let store = JsonStateStore::open(&config.state_path);

    let code = match cli.cmd {
        Commands::Render { input, url, format } => {
            let source = build_source(&config, input, url)?;
            let renderer = build_renderer(format, config.locale);
            let mut poller =
                Poller::new(source, renderer, Box::new(store), config.poll_options());
            match poller.tick().await {
                TickOutcome::Failed => 1,
                TickOutcome::Rendered | TickOutcome::Unchanged => 0,
            }
        }
        Commands::Weeks { year, month } => {
            let grid = build_weeks(month - 1, year)?;
            print!("{}", render_weeks(&grid, config.locale));
            0
        }
        Commands::Watch {
            input,
            url,
            interval_ms,
            format,
        } => {
            if let Some(ms) = interval_ms {
                config.poll_interval_ms = ms;
                config.validate()?;
            }
            let source = build_source(&config, input, url)?;
            let renderer = build_renderer(format, config.locale);
            let poller = Poller::new(source, renderer, Box::new(store), config.poll_options());
            if poller.is_paused() {
                eprintln!("auto-refresh paused (p to resume)");
            }
            watch(poller).await?;
            0
        }
        Commands::Session { user, admin, logout } => {
            let state = if logout {
                ClientState::default()
            } else {
                let mut state = store.load()?;
                if let Some(user) = user {
                    state.user_name = Some(user.trim().to_string());
                }
                state.is_admin = admin;
                state
            };
            store.save(&state)?;
            match (&state.user_name, state.is_admin) {
                (_, true) => println!("session: administrador"),
                (Some(name), false) => println!("session: {name}"),
                (None, false) => println!("session: anonymous"),
            }
            0
        }
        Commands::Slots { input, url } => {
            let records = load_records(&config, input, url).await?;
            for slot in assign::slots(&records) {
                println!("{}", slot_line(&slot, config.locale));
            }
            0
        }
        Commands::Claim { id, input, url } => {
            let assigner = build_assigner(&config, url.as_deref())?;
            let records = load_records(&config, input, url).await?;
            let message = assign::claim(&assigner, &records, &store.load()?, &id).await?;
            print_reply(&message);
            0
        }
        Commands::Release { id, input, url } => {
            let assigner = build_assigner(&config, url.as_deref())?;
            let records = load_records(&config, input, url).await?;
            let message = assign::release(&assigner, &records, &store.load()?, &id).await?;
            print_reply(&message);
            0
        }
        Commands::Pause => {
            set_paused(&store, true)?;
            println!("auto-refresh paused");
            0
        }
        Commands::Resume => {
            set_paused(&store, false)?;
            println!("auto-refresh resumed");
            0
        }
    };

    std::process::exit(code);
}

fn build_source(
    config: &Config,
    input: Option<PathBuf>,
    url: Option<String>,
) -> Result<Box<dyn ShiftSource>> {
    if let Some(path) = input {
        return Ok(Box::new(FileSource::with_field(
            path,
            config.payload_field.clone(),
        )));
    }
    let url = url.unwrap_or_else(|| config.endpoint.clone());
    let source = HttpSource::with_options(
        url,
        config.payload_field.clone(),
        config.request_timeout(),
    )
    .context("building HTTP client")?;
    Ok(Box::new(source))
}

async fn load_records(
    config: &Config,
    input: Option<PathBuf>,
    url: Option<String>,
) -> Result<Vec<ShiftRecord>> {
    let payload = build_source(config, input, url)?
        .fetch()
        .await
        .context("fetching shifts")?;
    Ok(decode_records(payload.rows()))
}

fn build_assigner(config: &Config, url: Option<&str>) -> Result<HttpAssigner> {
    let endpoint = url.unwrap_or(config.endpoint.as_str());
    HttpAssigner::from_endpoint(endpoint, config.request_timeout())
        .context("building HTTP client")
}

/// `id  date heure salle  poste: état`
fn slot_line(slot: &SlotRef<'_>, locale: Locale) -> String {
    let record = slot.record;
    let raw_date = record.date.as_deref().unwrap_or("").trim();
    let date = parse_record_date(raw_date)
        .map(|d| d.to_string())
        .unwrap_or_else(|| raw_date.to_string());
    let time = record.time.as_deref().unwrap_or("").trim();
    let time = time.get(..5).unwrap_or(time);
    let room = record.room.as_deref().unwrap_or("").trim();
    let status = match slot.status() {
        SlotStatus::NotOffered => NOT_OFFERED_MARKER.to_string(),
        SlotStatus::Open => locale.vacancy_marker().to_string(),
        SlotStatus::Taken(name) => name,
    };
    format!(
        "{:>4}  {date} {time} {room}  {}: {status}",
        slot.slot.id.as_deref().unwrap_or("-"),
        slot.position.label()
    )
}

fn print_reply(message: &str) {
    if message.is_empty() {
        println!("ok");
    } else {
        println!("{message}");
    }
}

fn build_renderer(format: Format, locale: Locale) -> Box<dyn Renderer + Send> {
    match format {
        Format::Text => Box::new(TextRenderer::new(io::stdout(), locale)),
        Format::Json => Box::new(JsonRenderer::new(io::stdout())),
    }
}

fn set_paused(store: &JsonStateStore, paused: bool) -> Result<()> {
    let mut state = store.load()?;
    if !state.is_admin {
        return Err(PollError::NotAdmin.into());
    }
    state.paused = paused;
    store.save(&state)
}

async fn watch(poller: Poller) -> Result<()> {
    let (handle, mut join) = poller.spawn();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => match line? {
                Some(line) => match line.trim() {
                    "p" => match handle.toggle_pause().await {
                        Ok(true) => eprintln!("auto-refresh paused"),
                        Ok(false) => eprintln!("auto-refresh resumed"),
                        Err(err) => eprintln!("{err}"),
                    },
                    "r" => handle.refresh().await?,
                    "q" => break,
                    _ => {}
                },
                None => stdin_open = false,
            },
            _ = &mut ctrl_c => break,
            res = &mut join => {
                res.context("poller task failed")?;
                return Ok(());
            }
        }
    }

    handle.shutdown().await;
    join.await.context("poller task failed")?;
    Ok(())
}
