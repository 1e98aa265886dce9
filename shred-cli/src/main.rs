use clap::{Args, Parser, Subcommand};
use eyre::{Result, WrapErr};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use shred_core::json::{self, Rendering};
use shred_core::keys::{IdentityKeyProvider, KeyProvider};
use shred_core::{AesKeyedEncryptor, FieldIndexCache, Schema, ShredConfig};

#[derive(Parser)]
#[command(name = "shred")]
#[command(about = "Crypto-shred sensitive fields of Avro records")]
#[command(version)]
struct Cli {
    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt the sensitive fields of a plaintext JSON document
    Encrypt {
        #[command(flatten)]
        io: IoArgs,

        #[command(flatten)]
        key: KeyArgs,
    },
    /// Decrypt the sensitive fields of a wire JSON document
    Decrypt {
        #[command(flatten)]
        io: IoArgs,

        #[command(flatten)]
        key: KeyArgs,
    },
    /// List the sensitive field positions of every record in a schema
    Inspect {
        /// Avro schema file
        #[arg(short, long)]
        schema: PathBuf,
    },
    /// Check that a schema parses, and optionally that a plaintext document
    /// matches it
    Validate {
        /// Avro schema file
        #[arg(short, long)]
        schema: PathBuf,

        /// Plaintext JSON document
        #[arg(short, long)]
        data: Option<PathBuf>,
    },
}

#[derive(Args)]
struct IoArgs {
    /// Avro schema file
    #[arg(short, long)]
    schema: PathBuf,

    /// Input JSON document
    #[arg(short, long)]
    input: PathBuf,

    /// Output file (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct KeyArgs {
    /// Passphrase to derive the key from
    #[arg(short, long, conflicts_with = "key_id")]
    key: Option<String>,

    /// Key id, resolved through --config (or used as the passphrase without it)
    #[arg(long)]
    key_id: Option<String>,

    /// JSON configuration holding the key table
    #[arg(short, long, requires = "key_id")]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Encrypt { io, key } => {
            let cipher = resolve_cipher(key)?;
            transform_file(io, Rendering::Plaintext, Rendering::Wire, |schema, value| {
                shred_core::encrypt_value(&cipher, schema, value)
            })?;
        }
        Commands::Decrypt { io, key } => {
            let cipher = resolve_cipher(key)?;
            transform_file(io, Rendering::Wire, Rendering::Plaintext, |schema, value| {
                shred_core::decrypt_value(&cipher, schema, value)
            })?;
        }
        Commands::Inspect { schema } => {
            inspect_schema(schema)?;
        }
        Commands::Validate { schema, data } => {
            validate(schema, data.as_deref())?;
        }
    }

    Ok(())
}

fn load_schema(path: &Path) -> Result<Schema> {
    let content = fs::read_to_string(path)
        .wrap_err_with(|| format!("reading schema {}", path.display()))?;
    let schema = Schema::parse_str(&content)
        .wrap_err_with(|| format!("parsing schema {}", path.display()))?;
    Ok(schema)
}

fn load_json(path: &Path) -> Result<serde_json::Value> {
    let content = fs::read_to_string(path)
        .wrap_err_with(|| format!("reading {}", path.display()))?;
    let json = serde_json::from_str(&content)
        .wrap_err_with(|| format!("parsing {}", path.display()))?;
    Ok(json)
}

fn resolve_cipher(args: &KeyArgs) -> Result<AesKeyedEncryptor> {
    let passphrase = match (&args.key, &args.key_id, &args.config) {
        (Some(key), _, _) => key.clone(),
        (None, Some(key_id), Some(config_path)) => {
            let content = fs::read_to_string(config_path)
                .wrap_err_with(|| format!("reading config {}", config_path.display()))?;
            let config = ShredConfig::from_json_str(&content)
                .wrap_err_with(|| format!("parsing config {}", config_path.display()))?;
            config.key_provider().key(key_id)?
        }
        (None, Some(key_id), None) => IdentityKeyProvider.key(key_id)?,
        (None, None, _) => return Err(eyre::eyre!("one of --key or --key-id is required")),
    };
    Ok(AesKeyedEncryptor::new(&passphrase))
}

fn transform_file<F>(io: &IoArgs, read_as: Rendering, write_as: Rendering, apply: F) -> Result<()>
where
    F: Fn(&Schema, &mut shred_core::Value) -> shred_core::Result<()>,
{
    let schema = load_schema(&io.schema)?;
    let input = load_json(&io.input)?;

    let mut value = json::from_json(&schema, &input, read_as)?;
    apply(&schema, &mut value)?;
    let output = serde_json::to_string_pretty(&json::to_json(&schema, &value, write_as)?)?;

    match &io.output {
        Some(path) => {
            fs::write(path, output)?;
            info!(input = %io.input.display(), output = %path.display(), "wrote document");
        }
        None => println!("{}", output),
    }
    Ok(())
}

fn inspect_schema(path: &Path) -> Result<()> {
    let schema = load_schema(path)?;
    let cache = FieldIndexCache::new();

    println!("Schema: {}", path.display());
    for record in schema.records() {
        let positions = cache.positions_for(&record);
        let names: Vec<String> = positions
            .iter()
            .map(|&p| format!("{}@{}", record.fields[p].name, p))
            .collect();
        if names.is_empty() {
            println!("{}: no sensitive fields", record.fullname());
        } else {
            println!("{}: {}", record.fullname(), names.join(", "));
        }
    }
    debug!(records = cache.len(), "inspected schema");
    Ok(())
}

fn validate(schema_path: &Path, data_path: Option<&Path>) -> Result<()> {
    let schema = match load_schema(schema_path) {
        Ok(schema) => {
            println!("Schema validation: PASS");
            schema
        }
        Err(e) => {
            println!("Schema validation: FAIL - {:#}", e);
            return Ok(());
        }
    };

    if let Some(data_path) = data_path {
        let data = load_json(data_path)?;
        match json::from_json(&schema, &data, Rendering::Plaintext) {
            Ok(_) => println!("Data validation: PASS"),
            Err(e) => println!("Data validation: FAIL - {}", e),
        }
    }
    Ok(())
}
