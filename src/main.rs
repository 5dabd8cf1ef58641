#![forbid(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::{Level as TraceLevel, info, warn};
use tracing_subscriber::FmtSubscriber;

use customviews::codec::{self, token_from_url};
use customviews::constants::tabs::{GROUP_TAG, TAB_TAG};
use customviews::constants::toggle::ATTR as TOGGLE_ATTR;
use customviews::{
    AssetStore, Configuration, Document, Engine, FileStorage, KeyValueStorage, MemoryHistory, MemoryStorage,
    Source, State, Tree, WidgetModel,
};

#[derive(Parser)]
#[command(name = "customviews", version, about = "Inspect and build customviews state tokens")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Encode a state into a `view` token
    Encode {
        #[command(flatten)]
        state: StateArgs,

        /// Leave tab selections out of the token
        #[arg(long)]
        no_tabs: bool,
    },

    /// Decode a token (or a full URL carrying one) into state JSON
    Decode {
        /// Raw token or page URL
        input: String,
    },

    /// Resolve the state a page would show: URL token, then storage, then default
    Resolve {
        #[command(flatten)]
        page: PageArgs,

        /// Storage file (default: platform data dir)
        #[arg(long, value_name = "PATH")]
        storage: Option<PathBuf>,

        /// Print the painted page instead of the state
        #[arg(long)]
        html: bool,

        /// Print the widget model instead of the state
        #[arg(long, conflicts_with = "html")]
        widget: bool,
    },

    /// Apply a state to a page URL and print the shareable link
    Share {
        #[command(flatten)]
        page: PageArgs,

        #[command(flatten)]
        state: StateArgs,
    },
}

#[derive(clap::Args)]
struct PageArgs {
    /// Configuration file path or http(s) URL (default: platform config dir)
    #[arg(long, short, value_name = "LOCATION")]
    config: Option<String>,

    /// Asset catalog path or URL (default: `assetsJsonPath` from the configuration)
    #[arg(long, value_name = "LOCATION")]
    assets: Option<String>,

    /// Page URL, possibly carrying a `view` token
    #[arg(long, default_value = "http://localhost/")]
    url: String,
}

#[derive(clap::Args)]
struct StateArgs {
    /// Active toggle ids, comma separated
    #[arg(long, short, value_delimiter = ',')]
    toggles: Vec<String>,

    /// Tab selection as GROUP=TAB; repeatable
    #[arg(long = "tab", value_name = "GROUP=TAB")]
    tabs: Vec<String>,
}

impl StateArgs {
    fn to_state(&self) -> Result<State> {
        let mut state = State::with_toggles(self.toggles.iter().filter(|t| !t.is_empty()));
        for pair in &self.tabs {
            let Some((group, tab)) = pair.split_once('=') else {
                bail!("tab selection '{pair}' is not GROUP=TAB");
            };
            state = state.with_tab(group, tab);
        }
        Ok(state)
    }
}

fn load_config(location: Option<&str>) -> Result<(Configuration, Source)> {
    let source = location.map_or_else(|| Source::File(Source::default_path()), Source::parse);
    let config = Configuration::load(&source)
        .with_context(|| format!("loading configuration from {}", source.describe()))?;
    info!(source = %source.describe(), toggles = config.all_toggles.len(), "Loaded configuration");
    Ok((config, source))
}

/// Catalog location: explicit flag, else `assetsJsonPath` next to the configuration
fn assets_source(explicit: Option<&str>, config: &Configuration, config_source: &Source) -> Option<Source> {
    if let Some(location) = explicit {
        return Some(Source::parse(location));
    }
    let relative = config.assets_json_path.as_deref()?;
    let source = match Source::parse(relative) {
        Source::File(path) if path.is_relative() => match config_source {
            Source::File(config_path) => {
                Source::File(config_path.parent().map(|dir| dir.join(&path)).unwrap_or(path))
            }
            Source::Url(base) => url::Url::parse(base)
                .and_then(|base| base.join(relative))
                .map(|joined| Source::Url(joined.to_string()))
                .unwrap_or(Source::File(path)),
            Source::Inline(_) => Source::File(path),
        },
        other => other,
    };
    Some(source)
}

fn load_assets(page: &PageArgs, config: &Configuration, config_source: &Source) -> AssetStore {
    let Some(source) = assets_source(page.assets.as_deref(), config, config_source) else {
        return AssetStore::empty();
    };
    let base_url = config.base_url.as_deref().unwrap_or_default();
    AssetStore::load(&source, base_url).unwrap_or_else(|e| {
        warn!(source = %source.describe(), error = %e, "Failed to load asset catalog");
        AssetStore::empty()
    })
}

/// A page carrying one marked region per configured toggle and every
/// configured tab group
fn skeleton_page(config: &Configuration) -> Tree {
    let mut tree = Tree::new();
    let body = tree.body();
    for toggle in &config.all_toggles {
        let region = tree.element(body, "div", &[(TOGGLE_ATTR, toggle.as_str())]);
        tree.text(region, toggle);
    }
    for group in &config.tab_groups {
        let group_el = tree.element(body, GROUP_TAG, &[("id", group.id.as_str())]);
        for tab in &group.tabs {
            let panel = tree.element(group_el, TAB_TAG, &[("id", tab.id.as_str())]);
            tree.text(panel, tab.label.as_deref().unwrap_or(&tab.id));
        }
    }
    tree
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).context("serializing output")?);
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Encode { state, no_tabs } => {
            let state = state.to_state()?;
            match codec::encode(&state, !no_tabs) {
                Some(token) => println!("{token}"),
                None => warn!("State is empty, nothing to encode"),
            }
        }
        Command::Decode { input } => {
            let token = if input.contains("://") {
                token_from_url(&input).with_context(|| format!("no view token in {input}"))?
            } else {
                input
            };
            let state = codec::try_decode(&token).context("token is not a valid view state")?;
            print_json(&state)?;
        }
        Command::Resolve { page, storage, html, widget } => {
            let (config, config_source) = load_config(page.config.as_deref())?;
            let assets = load_assets(&page, &config, &config_source);
            let storage: Box<dyn KeyValueStorage> =
                Box::new(FileStorage::new(storage.unwrap_or_else(FileStorage::default_path)));

            let doc = skeleton_page(&config);
            let mut engine = Engine::new(doc, Some(config))
                .with_storage(storage)
                .with_history(Box::new(MemoryHistory::new(page.url)))
                .with_assets(assets);
            let source = engine.init().context("engine has no configuration")?;
            info!(source = %source, "Resolved");

            if html {
                println!("{}", engine.document().to_html(engine.document().root()));
            } else if widget {
                print_json(&WidgetModel::from_engine(&engine))?;
            } else {
                print_json(&engine.current_state())?;
            }
        }
        Command::Share { page, state } => {
            let state = state.to_state()?;
            let (config, _) = load_config(page.config.as_deref())?;
            let doc = skeleton_page(&config);
            let mut engine = Engine::new(doc, Some(config))
                .with_storage(Box::new(MemoryStorage::new()))
                .with_history(Box::new(MemoryHistory::new(page.url)));
            engine.init();
            engine.apply_state(&state);
            let url = engine.shareable_url().context("page URL is not valid")?;
            println!("{url}");
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    // Parse log level from environment variable
    let log_level = match std::env::var("LOG_LEVEL")
        .unwrap_or_else(|_| "info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => TraceLevel::TRACE,
        "debug" => TraceLevel::DEBUG,
        "warn" => TraceLevel::WARN,
        "error" => TraceLevel::ERROR,
        _ => TraceLevel::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    run(Cli::parse())
}
