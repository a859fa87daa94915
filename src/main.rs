use color_eyre::Result;
use ipatlas_tui::{
    api::{self, DohResolver, NetworkProbe, ProbeEndpoints},
    app::{Action, App},
    config::{Config, LocationConfig},
    coordinator::Coordinator,
    events::{BannerKind, Event, EventHandler},
    history::History,
    location, logging,
    resolve::LookupPipeline,
    ui,
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{io, sync::Arc};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Instrumentation and safety
    let _log_guard = logging::initialize_logging();
    color_eyre::install()?;
    install_panic_hook();

    let config = Config::load();
    let client = api::http_client(config.api.request_timeout_secs)?;
    let history = History::open(&config.storage.history_db)?;
    let mut app = App::new(
        Coordinator::new(history, config.ui.camera()),
        config.ui.default_layer,
    );

    let pipeline = Arc::new(LookupPipeline::new(
        api::location_provider(config.api.provider, client.clone()),
        Box::new(DohResolver::new(client.clone(), config.api.doh_endpoint.clone())),
        api::geocoder(&config.api, client.clone()),
    ));
    let probe = Arc::new(NetworkProbe::new(client, ProbeEndpoints::default()));

    // Ready terminal and event pump
    let mut terminal = setup_terminal()?;
    let mut events = EventHandler::new(config.ui.tick_rate_ms);
    spawn_startup_probes(&probe, &events.tx, &config.location);

    // Main loop
    while !app.should_quit {
        terminal.draw(|f| ui::render(f, &app))?;

        let Some(event) = events.next().await else {
            break;
        };
        if let Some(action) = app.handle_event(event) {
            dispatch(
                action,
                &pipeline,
                &events.tx,
                &config.location,
                app.visitor_ip.clone(),
            );
        }
    }

    restore_terminal(terminal)?;
    info!("Bye.");
    Ok(())
}

/// Fills the banner panel and, once the visitor IP is known, locates us.
fn spawn_startup_probes(probe: &Arc<NetworkProbe>, tx: &UnboundedSender<Event>, location: &LocationConfig) {
    let (p, t, loc) = (probe.clone(), tx.clone(), location.clone());
    tokio::spawn(async move {
        let visitor = p.visitor().await;
        let ip = visitor.as_ref().ok().and_then(|b| b.ip.clone());
        let _ = t.send(Event::Banner(BannerKind::Visitor, visitor.map_err(|e| e.to_string())));

        let point = location::locate_self(&loc, ip.as_deref()).await;
        let _ = t.send(Event::SelfLocated(point));
    });

    let (p, t) = (probe.clone(), tx.clone());
    tokio::spawn(async move {
        let egress = p.egress().await.map_err(|e| e.to_string());
        let _ = t.send(Event::Banner(BannerKind::Egress, egress));
    });

    let (p, t) = (probe.clone(), tx.clone());
    tokio::spawn(async move {
        let carrier = p.carrier().await.map_err(|e| e.to_string());
        let _ = t.send(Event::Banner(BannerKind::Carrier, carrier));
    });
}

/// Runs an [`Action`] in the background; its completion comes back as an [`Event`].
fn dispatch(
    action: Action,
    pipeline: &Arc<LookupPipeline>,
    tx: &UnboundedSender<Event>,
    location: &LocationConfig,
    visitor_ip: Option<String>,
) {
    let tx = tx.clone();
    match action {
        Action::Lookup { seq, query } => {
            let pipeline = pipeline.clone();
            tokio::spawn(async move {
                let outcome = pipeline.lookup(&query).await.map_err(|e| {
                    warn!("Lookup #{} for '{}' failed: {}", seq, query, e);
                    e.user_message()
                });
                let _ = tx.send(Event::LookupDone { seq, query, outcome });
            });
        }
        Action::FindPlace { seq, query } => {
            let pipeline = pipeline.clone();
            tokio::spawn(async move {
                let outcome = pipeline.find_place(&query).await.map_err(|e| {
                    warn!("Place search #{} for '{}' failed: {}", seq, query, e);
                    e.user_message()
                });
                let _ = tx.send(Event::PlaceDone { seq, outcome });
            });
        }
        Action::Relocate => {
            let location = location.clone();
            tokio::spawn(async move {
                let point = location::locate_self(&location, visitor_ip.as_deref()).await;
                let _ = tx.send(Event::SelfLocated(point));
            });
        }
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    crossterm::terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    crossterm::execute!(stdout, crossterm::terminal::EnterAlternateScreen, crossterm::cursor::Hide)?;
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

fn restore_terminal(mut terminal: Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    crossterm::terminal::disable_raw_mode()?;
    crossterm::execute!(terminal.backend_mut(), crossterm::terminal::LeaveAlternateScreen, crossterm::cursor::Show)?;
    Ok(())
}

fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        // Force terminal cleanup!
        crossterm::terminal::disable_raw_mode().ok();
        crossterm::execute!(std::io::stdout(), crossterm::terminal::LeaveAlternateScreen, crossterm::cursor::Show).ok();
        original_hook(panic_info);
    }));
}
