use anyhow::{bail, Context, Result};
use locale_provider::config::Config;
use locale_provider::i18n::{Locale, LocaleRegistry};
use locale_provider::provider::LocaleProvider;
use locale_provider::state::{LoadStatus, LocaleState, STORAGE_KEY};
use locale_provider::storage::{JsonFileStore, PreferenceStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

const USAGE: &str = "Usage: locale-provider <command>

Commands:
  list                      List supported locales
  current                   Show the persisted locale and bundle status
  set <tag>                 Persist a new locale and load its bundle
  translate <id> [default]  Render a message in the current locale";

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("locale_provider=info".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        println!("{}", USAGE);
        return Ok(());
    };

    if command == "list" {
        list_locales();
        return Ok(());
    }

    let config = Config::from_env()?;
    info!(
        "Using preferences at {} (default locale {})",
        config.store_path.display(),
        config.default_locale
    );

    let store = Arc::new(JsonFileStore::new(&config.store_path));

    // A new locale is persisted before mounting so the mount effect loads its
    // bundle. Switching on a mounted state would hit the load guard once the
    // restored locale's bundle is in.
    if command == "set" {
        let tag = args.get(1).context("set requires a locale tag")?;
        let locale: Locale = tag
            .parse()
            .with_context(|| format!("Cannot switch to '{}'", tag))?;
        store
            .set(STORAGE_KEY, locale.code())
            .with_context(|| format!("Failed to persist locale '{}'", locale))?;
        info!("Persisted locale {}", locale);
    }

    let state = LocaleState::new(store, config.loaders()?, config.state_options());
    let provider = LocaleProvider::mount(state);

    match command.as_str() {
        "current" | "set" => {
            let status = settle(&provider).await;
            println!("{} ({})", provider.locale(), provider.locale().display_name());
            println!("status: {}", describe(&status));
        }
        "translate" => {
            let id = args.get(1).context("translate requires a message id")?;
            let default_message = args.get(2).map(String::as_str);

            settle(&provider).await;
            let scope = provider.scope();
            println!("{}", scope.intl.format_message(id, default_message, &[]));
        }
        other => bail!("Unknown command '{}'\n\n{}", other, USAGE),
    }

    let report = provider.state().metrics().report();
    info!(
        "Bundle loads: {} started, {} installed, {} failed",
        report.fetches_started, report.bundles_installed, report.fetch_failures
    );

    Ok(())
}

fn list_locales() {
    for config in LocaleRegistry::get().list_all() {
        let marker = if config.is_base { " (base)" } else { "" };
        println!("{:<8} {}{}", config.code, config.native_name, marker);
    }
}

/// Wait until no bundle load is pending, giving up after 30 seconds.
async fn settle(provider: &LocaleProvider) -> LoadStatus {
    let mut status_rx = provider.state().subscribe_status();
    let result = tokio::time::timeout(Duration::from_secs(30), wait_for_settled(&mut status_rx)).await;

    match result {
        Ok(status) => status,
        Err(_) => {
            warn!("Timed out waiting for the bundle load");
            status_rx.borrow().clone()
        }
    }
}

async fn wait_for_settled(status_rx: &mut watch::Receiver<LoadStatus>) -> LoadStatus {
    loop {
        let status = status_rx.borrow_and_update().clone();
        if !matches!(status, LoadStatus::Loading(_)) {
            return status;
        }
        if status_rx.changed().await.is_err() {
            return status;
        }
    }
}

fn describe(status: &LoadStatus) -> String {
    match status {
        LoadStatus::Idle => "no bundle installed".to_string(),
        LoadStatus::Loading(locale) => format!("loading {}", locale),
        LoadStatus::Loaded(locale) => format!("bundle loaded for {}", locale),
        LoadStatus::Failed { locale, message } => {
            format!("bundle for {} failed to load: {}", locale, message)
        }
    }
}
