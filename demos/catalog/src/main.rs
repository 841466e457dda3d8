//! # Catalog demo
//!
//! A small library catalog served from a view tree:
//!
//! - **Tree**: static sections, a dynamic book id, dependent chapter numbers
//! - **Failure handlers**: unknown books and chapters answer 404
//! - **Redirects**: `/latest` and `/books/<id>/first`
//! - **Introspection**: breadcrumbs, sitemaps and a route listing
//! - **Settings**: loaded from `catalog.toml` with environment overrides
//!
//! ## Running
//!
//! ```bash
//! cargo run --package catalog-demo -- serve
//! cargo run --package catalog-demo -- routes
//! cargo run --package catalog-demo -- sitemap --xml
//! cargo run --package catalog-demo -- breadcrumbs /books/1/chapters/2
//! ```

mod library;
mod settings;
mod urls;
mod views;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use viewtree::core::logging::setup_logging;
use viewtree::core::Settings;
use viewtree::http::server::App;
use viewtree::tree::{breadcrumbs, render_sitemap_xml, sitemap, RawValues, RequestNode};

use library::Library;
use settings::load_settings;
use urls::{catalog_urls, Site};

fn cli() -> clap::Command {
    clap::Command::new("catalog")
        .about("A library catalog served from a view tree")
        .subcommand_required(true)
        .arg(
            clap::Arg::new("config")
                .long("config")
                .global(true)
                .default_value("catalog.toml")
                .value_parser(clap::value_parser!(PathBuf))
                .help("Settings file"),
        )
        .subcommand(
            clap::Command::new("serve").about("Run the development server").arg(
                clap::Arg::new("addr")
                    .long("addr")
                    .help("Address to bind to, overriding bind_address"),
            ),
        )
        .subcommand(clap::Command::new("routes").about("List every registered route"))
        .subcommand(
            clap::Command::new("sitemap").about("Print every enumerable page").arg(
                clap::Arg::new("xml")
                    .long("xml")
                    .action(clap::ArgAction::SetTrue)
                    .help("Render as sitemaps.org XML"),
            ),
        )
        .subcommand(
            clap::Command::new("breadcrumbs")
                .about("Print the breadcrumb trail of a path")
                .arg(clap::Arg::new("path").required(true)),
        )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();

    let config = matches
        .get_one::<PathBuf>("config")
        .cloned()
        .unwrap_or_else(|| PathBuf::from("catalog.toml"));
    let mut settings = load_settings(&config)?;
    setup_logging(&settings);

    let library = Arc::new(Library::with_sample_data());
    let site = catalog_urls(library, &settings).context("declaring the catalog tree")?;

    match matches.subcommand() {
        Some(("serve", sub)) => {
            if let Some(addr) = sub.get_one::<String>("addr") {
                settings.bind_address.clone_from(addr);
            }
            App::new(settings).urls(site.urls).run().await?;
        }
        Some(("routes", _)) => print_routes(&site),
        Some(("sitemap", sub)) => print_sitemap(&site, &settings, sub.get_flag("xml"))?,
        Some(("breadcrumbs", sub)) => {
            let path = sub
                .get_one::<String>("path")
                .context("a path is required")?;
            print_breadcrumbs(&site, path)?;
        }
        _ => anyhow::bail!("unknown command"),
    }
    Ok(())
}

fn print_routes(site: &Site) {
    for route in site.urls.routes() {
        println!(
            "{:<40} {}",
            route.pattern().route(),
            route.pattern().name().unwrap_or_default()
        );
    }
}

fn print_sitemap(site: &Site, settings: &Settings, xml: bool) -> anyhow::Result<()> {
    let root = RequestNode::new(Arc::clone(&site.root), RawValues::new());
    let map = sitemap(&root, &site.urls, usize::MAX)?;
    if xml {
        print!("{}", render_sitemap_xml(&map, settings.site_origin()));
        return Ok(());
    }
    for entry in map.iter() {
        println!("{}{} {}", "  ".repeat(entry.depth), entry.location, entry.title);
    }
    Ok(())
}

fn print_breadcrumbs(site: &Site, path: &str) -> anyhow::Result<()> {
    let node = site
        .node_at(path)
        .with_context(|| format!("no page at {path}"))?
        .resolve_redirect()?;
    for crumb in breadcrumbs(&node, &site.urls)? {
        println!("{:<30} {}", crumb.title, crumb.url);
    }
    Ok(())
}
