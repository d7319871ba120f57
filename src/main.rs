use abohawa_core::{App, AppError};
use abohawa_dashboard::{
    Dashboard, DashboardEvent, DashboardSettings, LoadOutcome, PreferenceStore, Selection,
};
use abohawa_weather::{
    CascadeSelection, TemperatureUnit, ValidationError, WeatherClient, WeatherError,
};
use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "\
Commands:
  search <text>                   search the catalog (falls back to place search)
  pick <n>                        load result <n> of the last search
  districts                       list districts
  thanas <district>               list thanas in a district
  grams <district> | <thana>      list grams in a thana
  district <name>                 pick a district (clears thana and gram)
  thana <name>                    pick a thana (clears gram)
  gram <name>                     pick a gram
  select [<district> | <thana> [| <gram>]]
                                  load the picked catalog entry
  at <lat> <lon>                  load a point, named by reverse geocoding
  unit c|f                        set the temperature unit
  toggle                          switch between Celsius and Fahrenheit
  refresh                         reload the current location
  popular                         temperatures for popular cities
  show                            print the dashboard
  help                            this text
  quit";

/// A search result that `pick` can load.
struct Candidate {
    label: String,
    latitude: f64,
    longitude: f64,
}

#[tokio::main]
async fn main() -> Result<()> {
    abohawa_core::init()?;

    let app = App::new()?;
    if !app.warnings().is_empty() {
        println!("Configuration loaded with {} warning(s).", app.warnings().len());
    }
    let config = app.shared_config();

    let client = WeatherClient::new(config.weather.client_config())
        .context("Failed to build weather client")?;
    let initial = Selection::new(
        config.defaults.location_name.clone(),
        config.defaults.latitude,
        config.defaults.longitude,
    )
    .map_err(WeatherError::from)
    .map_err(AppError::from)?;

    let dashboard = Dashboard::builder(client)
        .settings(DashboardSettings::from_config(&config))
        .preferences(PreferenceStore::new(config.prefs_dir()))
        .initial(initial, config.defaults.temperature_unit)
        .build()
        .map_err(AppError::from)?;

    tracing::info!("abohawa started");
    println!("abohawa - weather for Bangladesh. Type `help` for commands.");

    let printer = spawn_printer(&dashboard);
    let auto_refresh = dashboard.spawn_auto_refresh();

    report(dashboard.refresh().await);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut candidates: Vec<Candidate> = Vec::new();
    let mut cascade = CascadeSelection::new();

    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let line = line.trim();
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };

        match command {
            "" => {}
            "quit" | "exit" => break,
            "help" => println!("{}", HELP),
            "show" => print!("{}", dashboard.view()),
            "districts" => print_list(&dashboard.catalog().districts()),
            "thanas" => print_list(&dashboard.catalog().thanas(rest)),
            "grams" => match split_fields(rest).as_slice() {
                [district, thana] => print_list(&dashboard.catalog().grams(district, thana)),
                _ => println!("usage: grams <district> | <thana>"),
            },
            "district" => {
                cascade.set_district(Some(rest.to_string()));
                print_list(&cascade.options(dashboard.catalog()));
            }
            "thana" => {
                cascade.set_thana(Some(rest.to_string()));
                print_list(&cascade.options(dashboard.catalog()));
            }
            "gram" => {
                cascade.set_gram(Some(rest.to_string()));
                println!("  {}", cascade.label().unwrap_or_default());
            }
            "select" => {
                match split_fields(rest).as_slice() {
                    [] => {}
                    [district, thana, gram @ ..] if gram.len() <= 1 => {
                        cascade.set_district(Some(district.to_string()));
                        cascade.set_thana(Some(thana.to_string()));
                        cascade.set_gram(gram.first().map(|g| g.to_string()));
                    }
                    _ => {
                        println!("usage: select [<district> | <thana> [| <gram>]]");
                        continue;
                    }
                }
                report_selection(dashboard.select_cascade(&cascade).await);
            }
            "search" => {
                candidates = search(&dashboard, rest).await;
                for (index, candidate) in candidates.iter().enumerate() {
                    println!("  {}. {}", index + 1, candidate.label);
                }
                if candidates.is_empty() {
                    println!("No matches.");
                }
            }
            "pick" => {
                let picked = rest
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|index| candidates.get(index));
                match picked {
                    Some(c) => report_selection(
                        dashboard
                            .select_location(&c.label, c.latitude, c.longitude)
                            .await,
                    ),
                    None => println!("usage: pick <n> (after a search)"),
                }
            }
            "at" => {
                let coords: Vec<f64> = rest
                    .split_whitespace()
                    .filter_map(|part| part.trim_end_matches(',').parse().ok())
                    .collect();
                match coords.as_slice() {
                    [lat, lon] => report_selection(dashboard.select_point(*lat, *lon).await),
                    _ => println!("usage: at <lat> <lon>"),
                }
            }
            "unit" => match TemperatureUnit::parse(rest) {
                Some(unit) => dashboard.set_unit(unit),
                None => println!("usage: unit c|f"),
            },
            "toggle" => {
                dashboard.toggle_unit();
            }
            "refresh" => report(dashboard.refresh().await),
            "popular" => {
                let unit = dashboard.state().unit();
                for popular in dashboard.popular_temperatures().await {
                    println!("  {:<12} {}", popular.name, popular.display(unit));
                }
            }
            other => println!("Unknown command `{}`. Type `help`.", other),
        }
    }

    dashboard.shutdown();
    if let Some(handle) = auto_refresh {
        let _ = handle.await;
    }
    printer.abort();
    app.shutdown();
    Ok(())
}

/// Print the view whenever a load settles or the unit changes.
fn spawn_printer(dashboard: &Dashboard<WeatherClient>) -> tokio::task::JoinHandle<()> {
    let mut events = dashboard.subscribe();
    let dashboard = dashboard.clone();
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                DashboardEvent::Loading { name } => println!("Loading {}...", name),
                DashboardEvent::Ready { .. } | DashboardEvent::UnitChanged(_) => {
                    print!("{}", dashboard.view())
                }
                DashboardEvent::Failed { error } => {
                    println!("{}", AppError::from(error).user_message())
                }
            }
        }
    })
}

/// Catalog matches first; an empty catalog result falls back to place search.
async fn search(dashboard: &Dashboard<WeatherClient>, query: &str) -> Vec<Candidate> {
    let hits = dashboard.search_catalog(query);
    if !hits.is_empty() {
        return hits
            .into_iter()
            .map(|hit| Candidate {
                label: hit.label,
                latitude: hit.location.latitude,
                longitude: hit.location.longitude,
            })
            .collect();
    }

    match dashboard.search_places(query).await {
        Ok(places) => places
            .into_iter()
            .map(|place| Candidate {
                label: place.label(),
                latitude: place.latitude,
                longitude: place.longitude,
            })
            .collect(),
        Err(e) => {
            println!("{}", AppError::from(e).user_message());
            Vec::new()
        }
    }
}

fn split_fields(raw: &str) -> Vec<&str> {
    raw.split('|')
        .map(str::trim)
        .filter(|field| !field.is_empty())
        .collect()
}

fn print_list(items: &[String]) {
    if items.is_empty() {
        println!("Nothing found.");
    }
    for item in items {
        println!("  {}", item);
    }
}

fn report_selection(outcome: Result<LoadOutcome, ValidationError>) {
    match outcome {
        Ok(outcome) => report(outcome),
        Err(e) => println!("{}", AppError::from(WeatherError::from(e)).user_message()),
    }
}

fn report(outcome: LoadOutcome) {
    match outcome {
        LoadOutcome::AlreadyInFlight => println!("Already loading."),
        LoadOutcome::Superseded => tracing::debug!("Load superseded by a newer selection"),
        LoadOutcome::Cancelled => println!("Load cancelled."),
        LoadOutcome::Loaded | LoadOutcome::Failed(_) => {}
    }
}
