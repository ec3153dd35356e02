use std::{io::Result, path::PathBuf, rc::Rc};

use chrono::Local;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use folio_site::{
    analyze::{self, DEFAULT_DIST, DEFAULT_OUTPUT, DEFAULT_TOP},
    core::{
        data::RetryPolicy,
        fetch::{Fetch, HttpFetcher, LocalFetcher},
        prefs::{DocumentRoot, FileStorage, Language, Preferences, SystemHints, Theme},
        settings::{Settings, DEFAULT_SETTINGS_PATH},
    },
    server::start_server,
    views::{parse_viewport_height, route_path, App},
};

#[derive(Parser)]
#[command(name = "folio-site")]
#[command(version)]
#[command(about = "Serve, inspect and browse the portfolio site")]
struct Cli {
    /// Settings file; built-in defaults are used when it does not exist
    #[arg(long, global = true, default_value = DEFAULT_SETTINGS_PATH)]
    settings: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the compiled site with compression and cache headers
    Serve {
        /// Directory holding index.html and the hashed bundles
        #[arg(long)]
        dist: Option<PathBuf>,

        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Write a size report of the JavaScript bundles in a build output
    Analyze {
        #[arg(value_name = "DIST", default_value = DEFAULT_DIST)]
        dist: PathBuf,

        #[arg(short, long, default_value = DEFAULT_OUTPUT)]
        output: PathBuf,

        /// Rows per section
        #[arg(long, default_value_t = DEFAULT_TOP)]
        top: usize,
    },

    /// Render a page of the site as text
    Browse {
        /// Project id or route to render, e.g. `2`, `/` or `/project/2`
        #[arg(value_name = "PROJECT_ID|PATH", default_value = "/")]
        target: String,

        #[arg(long)]
        lang: Option<Language>,

        #[arg(long)]
        theme: Option<Theme>,

        #[arg(long)]
        toggle_theme: bool,

        /// Read assets from a build output instead of the running site
        #[arg(long)]
        local: Option<PathBuf>,

        /// Viewport height in px used to scroll detail pages
        #[arg(long, default_value_t = 900.0, value_parser = parse_viewport_height)]
        viewport: f64,
    },
}

#[actix_web::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let mut settings = Settings::load_or_default(&cli.settings)?;

    match cli.command {
        Commands::Serve { dist, port } => {
            if let Some(dist) = dist {
                settings.dist_path.value = dist.display().to_string();
            }
            if let Some(port) = port {
                settings.port.value = port;
            }
            start_server(&settings).await
        }
        Commands::Analyze { dist, output, top } => {
            let report = analyze::analyze(&dist, top)?;
            report.write_to(&output)?;
            println!(
                "Analysis complete at {}. Report written to {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                output.display()
            );
            Ok(())
        }
        Commands::Browse {
            target,
            lang,
            theme,
            toggle_theme,
            local,
            viewport,
        } => {
            let options = BrowseOptions {
                path: route_path(&target),
                lang,
                theme,
                toggle_theme,
                viewport,
            };
            match local {
                Some(root) => browse(LocalFetcher::new(root), &settings, options).await,
                None => browse(HttpFetcher::new(&settings.assets_url.value), &settings, options).await,
            }
        }
    }
}

struct BrowseOptions {
    path: String,
    lang: Option<Language>,
    theme: Option<Theme>,
    toggle_theme: bool,
    viewport: f64,
}

async fn browse<F: Fetch + 'static>(fetcher: F, settings: &Settings, options: BrowseOptions) -> Result<()> {
    let prefs = Preferences::init(
        Rc::new(FileStorage::new(&settings.prefs_path.value)),
        Rc::new(DocumentRoot::new()),
        &SystemHints::from_env(),
    );
    let policy = RetryPolicy {
        retries: settings.fetch_retries.value,
        delay: settings.retry_delay(),
    };
    let mut app = App::start(prefs, fetcher, policy).await;

    if let Some(language) = options.lang {
        if let Some(announcement) = app.change_language(language).await {
            println!("{}", announcement);
        }
    }
    if let Some(theme) = options.theme {
        app.prefs.theme.set(theme);
    }
    if options.toggle_theme {
        app.toggle_theme();
    }

    print!("{}", app.render(&options.path, options.viewport).await);
    Ok(())
}
