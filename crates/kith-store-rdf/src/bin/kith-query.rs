//! kith-query: print the queries the engine would run for a fetch.
//!
//! Reads engine settings from `kith-rdf.toml` (or the path given with
//! `--config`) and from `KITH_RDF_*` environment variables, then prints the
//! assembled query of each requested contact type. Nothing is executed.
//!
//! Resource ids are not resolved here, so filters on instance fields
//! translate to a constant `false`.
//!
//! ```
//! cargo run -p kith-store-rdf --bin kith-query -- -t person --details Name,PhoneNumber
//! ```

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use kith_core::{contact::ContactType, hint::FetchHint, store::ContactQuery};
use kith_store_rdf::{
  cache::ResourceCache,
  config::EngineConfig,
  query::{assemble_id_query, assemble_query},
  schema::{SchemaProvider, SchemaSet},
};
use strum::IntoEnumIterator;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Print the queries of the Kith RDF backend")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "kith-rdf.toml")]
  config: PathBuf,

  /// Contact type to query (`person` or `group`). Repeatable; all types
  /// when omitted.
  #[arg(short = 't', long = "contact-type")]
  contact_types: Vec<ContactType>,

  /// Comma-separated detail names to fetch. Empty fetches every detail.
  #[arg(short, long, value_delimiter = ',')]
  details: Vec<String>,

  /// Print the id-only query instead of the full one.
  #[arg(long)]
  ids: bool,

  /// Limit applied to the id-only query.
  #[arg(long, requires = "ids")]
  limit: Option<usize>,

  /// Print the schema summaries as JSON and exit.
  #[arg(long)]
  dump_schema: bool,
}

fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("KITH_RDF"))
    .build()
    .context("failed to read config file")?;

  let engine_cfg: EngineConfig = settings
    .try_deserialize()
    .context("failed to deserialise EngineConfig")?;
  engine_cfg.validate().context("invalid engine configuration")?;

  let contact_types: Vec<ContactType> = if cli.contact_types.is_empty() {
    ContactType::iter().collect()
  } else {
    cli.contact_types
  };

  let schemas = SchemaSet::builtin();

  if cli.dump_schema {
    let summaries = contact_types
      .iter()
      .map(|contact_type| {
        schemas
          .schema(*contact_type)
          .map(|schema| schema.summary())
          .with_context(|| format!("no schema for {contact_type}"))
      })
      .collect::<anyhow::Result<Vec<_>>>()?;
    let json = serde_json::to_string_pretty(&summaries)
      .context("failed to serialise schema summaries")?;
    println!("{json}");
    return Ok(());
  }

  let mut hint = FetchHint::details(cli.details);
  hint.max_count = cli.limit;
  let query = ContactQuery::default().with_hint(hint);
  let cache = ResourceCache::new();

  for contact_type in contact_types {
    let text = if cli.ids {
      assemble_id_query(&schemas, &engine_cfg, &cache, contact_type, &query)
    } else {
      assemble_query(&schemas, &engine_cfg, &cache, contact_type, &query)
    }
    .with_context(|| format!("cannot assemble the {contact_type} query"))?;

    tracing::info!(%contact_type, "assembled query");
    println!("{text}");
  }

  Ok(())
}
