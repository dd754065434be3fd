use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use diamond_search::diamonds::{
    refine, FilterCriteria, NivodaClient, Origin, RefineCriteria, SortDirection, SortKey,
    SortOrder,
};
use diamond_search::util::env;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "diamonds", version, about = "Nivoda diamond search operator CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Commands {
    /// Run one search page and print the results
    Search {
        /// Storefront shape name (round, oval, cushion-modified, ...)
        #[arg(long)]
        shape: String,
        #[arg(long)]
        carat_min: Option<f64>,
        #[arg(long)]
        carat_max: Option<f64>,
        /// Color grades; repeat or comma-separate
        #[arg(long = "color", value_delimiter = ',')]
        colors: Vec<String>,
        /// Clarity grades; repeat or comma-separate
        #[arg(long = "clarity", value_delimiter = ',')]
        clarities: Vec<String>,
        /// Cut grades; repeat or comma-separate
        #[arg(long = "cut", value_delimiter = ',')]
        cuts: Vec<String>,
        #[arg(long)]
        price_min: Option<f64>,
        #[arg(long)]
        price_max: Option<f64>,
        /// natural, lab-grown or both
        #[arg(long, default_value = "both")]
        origin: Origin,
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long, default_value_t = 0)]
        offset: u32,
        /// price or carat
        #[arg(long, default_value = "price")]
        sort: SortKey,
        #[arg(long, default_value_t = false)]
        desc: bool,
        /// Deadline for authenticate + search together
        #[arg(long, default_value_t = 30)]
        timeout_secs: u64,
    },
    /// Authenticate once and report when the cached token expires
    AuthCheck,
}

#[tokio::main]
async fn main() -> Result<()> {
    env::init_env();
    diamond_search::tracing::init_tracing("diamond_search=warn")?;
    env::bootstrap_cli("diamonds");

    let cli = Cli::parse();
    let client = NivodaClient::from_env().context("failed to build Nivoda client")?;

    match cli.command {
        Commands::Search {
            shape,
            carat_min,
            carat_max,
            colors,
            clarities,
            cuts,
            price_min,
            price_max,
            origin,
            limit,
            offset,
            sort,
            desc,
            timeout_secs,
        } => {
            let mut builder = FilterCriteria::builder()
                .shape(shape)
                .carat(carat_min, carat_max)
                .price(price_min, price_max)
                .colors(colors)
                .clarities(clarities)
                .cuts(cuts)
                .origin(origin)
                .offset(offset);
            if let Some(limit) = limit {
                builder = builder.limit(limit);
            }
            let criteria = builder.build()?;

            let result = client
                .search_with_timeout(&criteria, Duration::from_secs(timeout_secs))
                .await?;

            let direction = if desc {
                SortDirection::Desc
            } else {
                SortDirection::Asc
            };
            let items = refine(
                &result.items,
                &RefineCriteria::default(),
                SortOrder::new(sort, direction),
            );

            for d in &items {
                println!(
                    "{id}\t{price}\t{carats}\t{color}\t{clarity}\t{cut}\t{image}",
                    id = d.id,
                    price = d.price.map_or("-".to_string(), |p| format!("{p:.2}")),
                    carats = d.carats().map_or("-".to_string(), |c| format!("{c:.2}")),
                    color = d.color().unwrap_or("-"),
                    clarity = d.clarity().unwrap_or("-"),
                    cut = d.cut().unwrap_or("-"),
                    image = d.image_url().unwrap_or("-"),
                );
            }
            println!(
                "shown={} page_size={} offset={} total={} has_more={}",
                items.len(),
                result.page_size,
                result.offset,
                result.total_count,
                result.has_more
            );
        }
        Commands::AuthCheck => {
            client.token().await.context("authentication failed")?;
            match client.token_expires_at().await {
                Some(at) => {
                    info!(expires_at = %at, "token acquired");
                    println!("ok: token valid until {}", at.to_rfc3339());
                }
                None => println!("ok: token acquired"),
            }
        }
    }

    Ok(())
}
