//! Chunked data view command line tool.
//!
//! Archives GRIB2 files into a directory store, lists stored records and
//! reads chunks of views described by YAML definitions.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use bytes::Bytes;
use chunked_data_view::{ChunkedDataView, ChunkedDataViewBuilder, ViewDefinition};
use clap::{Parser, Subcommand};
use field_store::{DataHandle, DirectoryStore, FieldStore, StoreConfig};
use grib2_parser::{Grib2Message, Grib2Reader};
use mars_request::{Key, Request};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "cdv")]
#[command(about = "Chunked N-dimensional views over a GRIB field store")]
struct Cli {
    /// Store directory (defaults to CDV_STORE_ROOT)
    #[arg(short, long, global = true)]
    store: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Archive every message of a GRIB2 file
    Archive {
        /// GRIB2 file
        file: PathBuf,

        /// Key template, e.g. "class=od,date=20200101,step={step},param=t".
        /// Placeholders: {index}, {step}, {level}, {param}
        #[arg(short, long)]
        key: String,
    },

    /// List the records matching a request
    List {
        /// Request, e.g. "date=20200101/to/20200103,param=t"
        request: String,
    },

    /// Print the shape of a view
    Shape {
        /// View definition YAML file
        view: PathBuf,
    },

    /// Read one chunk of a view
    Read {
        /// View definition YAML file
        view: PathBuf,

        /// Chunk index, comma separated (e.g. "0,2,1")
        #[arg(short, long)]
        chunk: String,

        /// Write the chunk as little-endian f32 to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_tracing(&cli.log_level, cli.log_json)?;

    let mut store_config = StoreConfig::from_env();
    if let Some(root) = &cli.store {
        store_config.root = root.clone();
    }

    match cli.command {
        Commands::Archive { file, key } => {
            store_config.create_if_missing = true;
            let store = store_config.open_store()?;
            archive(&store, &file, &key)
        }
        Commands::List { request } => {
            let store = store_config.open_store()?;
            list(&store, &request)
        }
        Commands::Shape { view } => {
            let view = open_view(&store_config, &view)?;
            println!("shape:       {:?}", view.shape());
            println!("chunk shape: {:?}", view.chunk_shape());
            println!("chunks:      {:?}", view.chunks());
            println!("chunk size:  {} values", view.count_chunk_values());
            Ok(())
        }
        Commands::Read {
            view,
            chunk,
            output,
        } => {
            let view = open_view(&store_config, &view)?;
            read(&view, &chunk, output.as_deref())
        }
    }
}

fn init_tracing(log_level: &str, json: bool) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

fn archive(store: &DirectoryStore, file: &Path, template: &str) -> Result<()> {
    let data = fs::read(file).with_context(|| format!("reading {}", file.display()))?;
    let mut reader = Grib2Reader::new(Bytes::from(data));

    let mut seen = HashSet::new();
    let mut index = 0;
    while let Some(message) = reader.next_message()? {
        let key = Key::parse(&expand_template(template, index, &message))
            .with_context(|| format!("key for message {}", index))?;
        if !seen.insert(key.clone()) {
            bail!(
                "messages map to the same key {}, add placeholders to the key template",
                key
            );
        }

        store.archive(key.clone(), message.raw())?;
        info!(key = %key, values = message.num_values(), "Archived message");
        index += 1;
    }
    store.flush()?;

    if index == 0 {
        warn!(file = %file.display(), "File holds no GRIB2 message");
    }
    println!("archived {} messages into {}", index, store.root().display());
    Ok(())
}

fn expand_template(template: &str, index: usize, message: &Grib2Message) -> String {
    let product = &message.product_definition;
    template
        .replace("{index}", &index.to_string())
        .replace("{step}", &product.forecast_time.to_string())
        .replace("{level}", &product.level_value.to_string())
        .replace(
            "{param}",
            &format!(
                "{}.{}.{}",
                message.indicator.discipline, product.parameter_category, product.parameter_number
            ),
        )
}

fn list(store: &DirectoryStore, request: &str) -> Result<()> {
    let request = Request::parse(request)?;
    let mut count = 0;
    for item in store.inspect(&request)? {
        let (key, handle) = item?;
        match handle.size_hint() {
            Some(size) => println!("{}  ({} bytes)", key, size),
            None => println!("{}", key),
        }
        count += 1;
    }
    println!("{} records", count);
    Ok(())
}

fn open_view(store_config: &StoreConfig, definition: &Path) -> Result<ChunkedDataView> {
    let definition = ViewDefinition::from_yaml_file(definition)?;
    let store: Arc<dyn FieldStore> = Arc::new(store_config.open_store()?);
    let view = ChunkedDataViewBuilder::from_definition(&definition, store).build()?;
    Ok(view)
}

fn read(view: &ChunkedDataView, chunk: &str, output: Option<&Path>) -> Result<()> {
    let index = parse_chunk_index(chunk)?;
    let (values, fill) = view.chunk(&index)?;

    println!("chunk {:?}: {}", index, fill);
    match Stats::of(&values) {
        Some(stats) => println!(
            "min {:.4}  max {:.4}  mean {:.4}  ({} of {} values valid)",
            stats.min,
            stats.max,
            stats.mean,
            stats.valid,
            values.len()
        ),
        None => println!("no valid values"),
    }

    if let Some(path) = output {
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))?;
        println!("wrote {} values to {}", values.len(), path.display());
    }
    Ok(())
}

fn parse_chunk_index(text: &str) -> Result<Vec<usize>> {
    text.split(',')
        .map(|part| {
            part.trim()
                .parse::<usize>()
                .with_context(|| format!("invalid chunk index component '{}'", part))
        })
        .collect()
}

/// Summary of the non-NaN values of a chunk.
#[derive(Debug, PartialEq)]
struct Stats {
    min: f32,
    max: f32,
    mean: f64,
    valid: usize,
}

impl Stats {
    fn of(values: &[f32]) -> Option<Self> {
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        let mut sum = 0.0f64;
        let mut valid = 0;
        for &v in values.iter().filter(|v| !v.is_nan()) {
            min = min.min(v);
            max = max.max(v);
            sum += v as f64;
            valid += 1;
        }
        (valid > 0).then(|| Self {
            min,
            max,
            mean: sum / valid as f64,
            valid,
        })
    }
}
