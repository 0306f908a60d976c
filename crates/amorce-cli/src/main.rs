//! Amorce CLI — `amorce` command.
//!
//! Manage agent identities, sign and verify transaction records, and
//! wrap or open A2A envelopes from the command line.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};

use amorce::crypto::keys::Ed25519KeyPair;
use amorce::envelope::A2aEnvelope;
use amorce::identity::RotationReason;
use amorce::record::{verify_record, RecordBuilder, RecordContent, RecordId, RecordKind};
use amorce::storage::{load_identity, read_public_document, save_identity, RecordStore};

fn amorce_dir() -> PathBuf {
    let home = std::env::var("HOME").expect("HOME not set");
    PathBuf::from(home).join(".amorce")
}

fn identity_dir() -> PathBuf {
    amorce_dir().join("identity")
}

fn record_dir() -> PathBuf {
    amorce_dir().join("records")
}

fn identity_path(name: &str) -> PathBuf {
    identity_dir().join(format!("{name}.amid"))
}

fn read_passphrase(prompt: &str) -> String {
    eprint!("{prompt}");
    let mut passphrase = String::new();
    std::io::stdin()
        .read_line(&mut passphrase)
        .expect("Failed to read passphrase");
    passphrase.trim().to_string()
}

fn micros_to_datetime(micros: u64) -> String {
    let secs = (micros / 1_000_000) as i64;
    let dt = chrono::DateTime::from_timestamp(secs, 0)
        .unwrap_or_else(|| chrono::DateTime::from_timestamp(0, 0).unwrap());
    dt.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Amorce CLI — manage agent identities, sign actions, and work with
/// A2A envelopes.
#[derive(Parser, Debug)]
#[command(
    name = "amorce",
    about = "Amorce CLI",
    version,
    long_about = "amorce — security layer CLI\n\nManage agent identities, sign and verify transaction records,\nand wrap or open A2A protocol envelopes."
)]
struct Cli {
    /// Use specific identity (default: default)
    #[arg(long, global = true, default_value = "default")]
    identity: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a new agent identity
    Init {
        /// Name for the new identity
        #[arg(long)]
        name: Option<String>,
    },

    /// Display identity information
    Show {
        /// Identity name to show (overrides --identity)
        #[arg(long)]
        identity: Option<String>,
    },

    /// List all identities
    List,

    /// Export identity public document as JSON
    Export {
        /// Identity name to export (overrides --identity)
        #[arg(long)]
        identity: Option<String>,

        /// Output file path (default: stdout)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Rotate identity keys
    Rotate {
        /// Reason for rotation (manual, scheduled, compromised, policy_required)
        #[arg(long)]
        reason: Option<String>,
    },

    /// Sign an action and create a transaction record
    Sign {
        /// Record kind (run_start, tool_call, run_complete, or custom)
        #[arg(long, default_value = "custom")]
        kind: String,

        /// Human-readable description of the action
        #[arg(long)]
        description: String,

        /// Optional JSON data payload
        #[arg(long)]
        data: Option<String>,

        /// Chain this record to a previous record ID
        #[arg(long)]
        chain_to: Option<String>,
    },

    /// Verify a transaction record by ID
    Verify {
        /// Record ID (atx_...)
        record_id: String,
    },

    /// Manage transaction records
    Record {
        #[command(subcommand)]
        subcommand: RecordCommands,
    },

    /// Wrap or open A2A envelopes
    Envelope {
        #[command(subcommand)]
        subcommand: EnvelopeCommands,
    },
}

#[derive(Subcommand, Debug)]
enum RecordCommands {
    /// List records with optional filters
    List {
        /// Filter by actor agent ID
        #[arg(long)]
        actor: Option<String>,

        /// Filter by record kind
        #[arg(long)]
        kind: Option<String>,

        /// Maximum number of records to display
        #[arg(long, default_value = "20")]
        limit: usize,
    },
}

#[derive(Subcommand, Debug)]
enum EnvelopeCommands {
    /// Sign a message and print the A2A envelope JSON
    Wrap {
        /// Message to seal
        message: String,
    },

    /// Parse an envelope and optionally verify its signature
    Open {
        /// Envelope JSON file (default: stdin)
        #[arg(long, short)]
        file: Option<PathBuf>,

        /// Sender public key (base64) to verify against
        #[arg(long)]
        key: Option<String>,
    },
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let verbose = cli.verbose;
    let identity_name = cli.identity.clone();

    let result = match cli.command {
        Commands::Init { name } => cmd_init(name, verbose),
        Commands::Show { identity } => {
            let name = identity.unwrap_or(identity_name);
            cmd_show(&name)
        }
        Commands::List => cmd_list(),
        Commands::Export { identity, output } => {
            let name = identity.unwrap_or(identity_name);
            cmd_export(&name, output.as_deref())
        }
        Commands::Rotate { reason } => cmd_rotate(&identity_name, reason.as_deref(), verbose),
        Commands::Sign {
            kind,
            description,
            data,
            chain_to,
        } => cmd_sign(
            &identity_name,
            &kind,
            &description,
            data.as_deref(),
            chain_to.as_deref(),
            verbose,
        ),
        Commands::Verify { record_id } => cmd_verify(&record_id, verbose),
        Commands::Record { subcommand } => match subcommand {
            RecordCommands::List { actor, kind, limit } => {
                cmd_record_list(actor.as_deref(), kind.as_deref(), limit, verbose)
            }
        },
        Commands::Envelope { subcommand } => match subcommand {
            EnvelopeCommands::Wrap { message } => cmd_envelope_wrap(&identity_name, &message),
            EnvelopeCommands::Open { file, key } => {
                cmd_envelope_open(file.as_deref(), key.as_deref())
            }
        },
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

/// `amorce init [--name NAME]`
fn cmd_init(name: Option<String>, verbose: bool) -> Result<()> {
    let name = name.unwrap_or_else(|| "default".to_string());
    let path = identity_path(&name);

    if path.exists() {
        return Err(anyhow!(
            "identity '{}' already exists at {}",
            name,
            path.display()
        ));
    }

    let passphrase = read_passphrase("Enter passphrase for new identity: ");
    if passphrase.is_empty() {
        return Err(anyhow!("passphrase cannot be empty"));
    }
    let confirm = read_passphrase("Confirm passphrase: ");
    if passphrase != confirm {
        return Err(anyhow!("passphrases do not match"));
    }

    let identity = amorce::IdentityManager::generate(Some(name.clone()));
    let id = identity.agent_id();

    save_identity(&identity, &path, &passphrase).context("failed to save identity")?;

    println!("Created identity '{name}'");
    println!("  ID:   {id}");
    println!("  File: {}", path.display());

    if verbose {
        println!("  Key:  {}", identity.public_key_base64());
        println!("  Created: {}", micros_to_datetime(identity.created_at));
    }

    Ok(())
}

/// `amorce show [--identity NAME]`
fn cmd_show(name: &str) -> Result<()> {
    let path = identity_path(name);
    if !path.exists() {
        return Err(anyhow!(
            "identity '{}' not found (expected at {})",
            name,
            path.display()
        ));
    }

    let doc = read_public_document(&path).context("failed to read identity file")?;

    println!("Identity: {name}");
    println!("  ID:         {}", doc.id);
    println!("  Algorithm:  {}", doc.algorithm);
    println!("  Public Key: {}", doc.public_key);
    println!("  Created:    {}", micros_to_datetime(doc.created_at));

    if let Some(ref n) = doc.name {
        println!("  Name:       {n}");
    }

    if doc.rotation_history.is_empty() {
        println!("  Rotation History: none");
    } else {
        println!(
            "  Rotation History ({} rotation(s)):",
            doc.rotation_history.len()
        );
        for (i, rot) in doc.rotation_history.iter().enumerate() {
            println!(
                "    [{}] {} — reason: {:?}",
                i + 1,
                micros_to_datetime(rot.rotated_at),
                rot.reason
            );
        }
    }

    match doc.verify_signature() {
        Ok(()) => println!("  Signature: valid"),
        Err(e) => println!("  Signature: INVALID ({e})"),
    }

    Ok(())
}

/// `amorce list`
fn cmd_list() -> Result<()> {
    let dir = identity_dir();
    if !dir.exists() {
        println!(
            "No identities found (directory {} does not exist)",
            dir.display()
        );
        return Ok(());
    }

    let mut entries: Vec<(String, PathBuf)> = std::fs::read_dir(&dir)
        .context("failed to read identity directory")?
        .filter_map(|e| e.ok())
        .filter_map(|e| {
            let path = e.path();
            if path.extension().map(|x| x == "amid").unwrap_or(false) {
                let stem = path.file_stem()?.to_string_lossy().into_owned();
                Some((stem, path))
            } else {
                None
            }
        })
        .collect();

    entries.sort_by(|a, b| a.0.cmp(&b.0));

    if entries.is_empty() {
        println!("No identities found in {}", dir.display());
        return Ok(());
    }

    println!("{:<20} {:<30} CREATED", "NAME", "ID");
    println!("{}", "-".repeat(72));
    for (name, path) in &entries {
        match read_public_document(path) {
            Ok(doc) => println!(
                "{:<20} {:<30} {}",
                name,
                doc.id,
                micros_to_datetime(doc.created_at)
            ),
            Err(e) => println!("{name:<20} (failed to read: {e})"),
        }
    }

    Ok(())
}

/// `amorce export [--identity NAME] [--output FILE]`
fn cmd_export(name: &str, output: Option<&std::path::Path>) -> Result<()> {
    let path = identity_path(name);
    if !path.exists() {
        return Err(anyhow!(
            "identity '{}' not found (expected at {})",
            name,
            path.display()
        ));
    }

    let doc = read_public_document(&path).context("failed to read identity file")?;
    let json =
        serde_json::to_string_pretty(&doc).context("failed to serialize identity document")?;

    if let Some(out_path) = output {
        std::fs::write(out_path, &json)
            .with_context(|| format!("failed to write to {}", out_path.display()))?;
        println!("Exported identity '{}' to {}", name, out_path.display());
    } else {
        println!("{json}");
    }

    Ok(())
}

/// `amorce rotate [--reason REASON]`
fn cmd_rotate(identity_name: &str, reason_str: Option<&str>, verbose: bool) -> Result<()> {
    let path = identity_path(identity_name);
    if !path.exists() {
        return Err(anyhow!(
            "identity '{}' not found — run `amorce init` first",
            identity_name
        ));
    }

    let passphrase = read_passphrase(&format!(
        "Current passphrase for identity '{identity_name}': "
    ));
    let identity =
        load_identity(&path, &passphrase).context("failed to load identity (wrong passphrase?)")?;

    let old_id = identity.agent_id();
    let reason = parse_rotation_reason(reason_str.unwrap_or("manual"));
    let rotated = identity.rotate(reason).context("failed to rotate keys")?;

    let new_passphrase = read_passphrase("New passphrase (or press Enter to keep current): ");
    let final_passphrase = if new_passphrase.is_empty() {
        passphrase
    } else {
        let confirm = read_passphrase("Confirm new passphrase: ");
        if new_passphrase != confirm {
            return Err(anyhow!("passphrases do not match"));
        }
        new_passphrase
    };

    save_identity(&rotated, &path, &final_passphrase).context("failed to save rotated identity")?;

    println!("Identity rotated successfully");
    println!("  Identity: {identity_name}");
    println!("  Old ID:   {old_id}");
    println!("  New ID:   {}", rotated.agent_id());
    println!("  Rotations: {}", rotated.rotation_history.len());

    if verbose {
        println!("  New Key: {}", rotated.public_key_base64());
    }

    Ok(())
}

/// `amorce sign --description DESC [--kind KIND] [--data JSON] [--chain-to RECORD_ID]`
fn cmd_sign(
    identity_name: &str,
    kind_str: &str,
    description: &str,
    data: Option<&str>,
    chain_to: Option<&str>,
    verbose: bool,
) -> Result<()> {
    let path = identity_path(identity_name);
    if !path.exists() {
        return Err(anyhow!(
            "identity '{}' not found — run `amorce init` first",
            identity_name
        ));
    }

    let passphrase = read_passphrase(&format!("Passphrase for identity '{identity_name}': "));
    let identity =
        load_identity(&path, &passphrase).context("failed to load identity (wrong passphrase?)")?;

    let kind = parse_record_kind(kind_str);

    let content = if let Some(json_str) = data {
        let json_val: serde_json::Value =
            serde_json::from_str(json_str).context("--data must be valid JSON")?;
        RecordContent::with_data(description, json_val)
    } else {
        RecordContent::new(description)
    };

    let mut builder = RecordBuilder::new(identity.agent_id(), kind, content);
    if let Some(prev) = chain_to {
        builder = builder.chain_to(RecordId(prev.to_string()));
    }

    let record = builder
        .sign(identity.signing_key())
        .context("failed to sign record")?;

    let store = RecordStore::new(record_dir()).context("failed to open record store")?;
    store.save(&record).context("failed to save record")?;

    println!("Record created");
    println!("  ID:        {}", record.id);
    println!("  Kind:      {}", record.kind.as_tag());
    println!("  Actor:     {}", record.actor);
    println!("  Timestamp: {}", micros_to_datetime(record.timestamp));

    if let Some(ref prev) = record.previous_record {
        println!("  Chained to: {prev}");
    }

    if verbose {
        println!("  Hash:      {}", record.record_hash);
        println!("  Signature: {}...", &record.signature[..16]);
    }

    Ok(())
}

/// `amorce verify RECORD_ID`
fn cmd_verify(record_id_str: &str, verbose: bool) -> Result<()> {
    let store = RecordStore::new(record_dir()).context("failed to open record store")?;

    let id = RecordId(record_id_str.to_string());
    let record = store
        .load(&id)
        .with_context(|| format!("record '{record_id_str}' not found"))?;

    let verification = verify_record(&record).context("verification failed")?;

    println!("Record: {}", record.id);
    println!("  Actor:       {}", record.actor);
    println!("  Kind:        {}", record.kind.as_tag());
    println!("  Timestamp:   {}", micros_to_datetime(record.timestamp));
    println!("  Description: {}", record.content.description);

    println!();
    println!("Verification:");
    println!(
        "  Signature: {}",
        if verification.signature_valid {
            "VALID"
        } else {
            "INVALID"
        }
    );
    println!(
        "  Hash:      {}",
        if verification.hash_valid {
            "VALID"
        } else {
            "INVALID"
        }
    );

    println!();
    println!(
        "Result: {}",
        if verification.is_valid {
            "VALID"
        } else {
            "INVALID"
        }
    );

    if verbose {
        println!();
        println!("  Hash: {}", record.record_hash);
        if let Some(ref prev) = record.previous_record {
            println!("  Chained to: {prev}");
        }
    }

    Ok(())
}

/// `amorce record list [--actor AGENT_ID] [--kind KIND] [--limit N]`
fn cmd_record_list(
    actor_filter: Option<&str>,
    kind_filter: Option<&str>,
    limit: usize,
    verbose: bool,
) -> Result<()> {
    let store = RecordStore::new(record_dir()).context("failed to open record store")?;

    let all_ids = store.list().context("failed to list records")?;
    if all_ids.is_empty() {
        println!("No records found.");
        return Ok(());
    }

    let mut records = Vec::new();
    for id in &all_ids {
        match store.load(id) {
            Ok(record) => {
                if let Some(actor) = actor_filter {
                    if record.actor.0 != actor {
                        continue;
                    }
                }
                if let Some(kind) = kind_filter {
                    if record.kind.as_tag() != kind {
                        continue;
                    }
                }
                records.push(record);
            }
            Err(e) => {
                if verbose {
                    eprintln!("warning: could not load record {}: {e}", id.0);
                }
            }
        }
    }

    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    let total = records.len();
    records.truncate(limit);

    println!("Records ({} shown, {} total):", records.len(), total);
    if records.is_empty() {
        println!("  (none match filters)");
        return Ok(());
    }

    println!(
        "  {:<30} {:<14} {:<25} DESCRIPTION",
        "ID", "KIND", "TIMESTAMP"
    );
    println!("  {}", "-".repeat(90));
    for record in &records {
        let desc = truncate_description(&record.content.description, 35);
        println!(
            "  {:<30} {:<14} {:<25} {}",
            record.id,
            record.kind.as_tag(),
            micros_to_datetime(record.timestamp),
            desc
        );
        if verbose {
            println!("    Actor: {}", record.actor);
            if let Some(ref prev) = record.previous_record {
                println!("    Chained to: {prev}");
            }
        }
    }

    Ok(())
}

/// `amorce envelope wrap MESSAGE`
fn cmd_envelope_wrap(identity_name: &str, message: &str) -> Result<()> {
    let path = identity_path(identity_name);
    if !path.exists() {
        return Err(anyhow!(
            "identity '{}' not found — run `amorce init` first",
            identity_name
        ));
    }

    let passphrase = read_passphrase(&format!("Passphrase for identity '{identity_name}': "));
    let identity =
        load_identity(&path, &passphrase).context("failed to load identity (wrong passphrase?)")?;

    let envelope = A2aEnvelope::seal(&identity, message);
    println!("{}", envelope.to_json().context("serialization failed")?);

    Ok(())
}

/// `amorce envelope open [--file FILE] [--key BASE64]`
fn cmd_envelope_open(file: Option<&std::path::Path>, key_b64: Option<&str>) -> Result<()> {
    let json = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::Read::read_to_string(&mut std::io::stdin(), &mut buf)
                .context("failed to read stdin")?;
            buf
        }
    };

    let envelope = A2aEnvelope::from_json(&json).context("failed to parse envelope")?;

    println!("Envelope");
    println!("  Protocol: {}", envelope.protocol_version);
    println!("  Layer:    {}", envelope.security_layer);
    println!("  Sender:   {}", envelope.sender_id);
    println!("  Message:  {}", envelope.message);

    if let Some(b64) = key_b64 {
        let key = Ed25519KeyPair::verifying_key_from_base64(b64)
            .context("invalid --key (expected base64 Ed25519 public key)")?;
        match envelope.verify_with_key(&key) {
            Ok(()) => println!("  Signature: VALID"),
            Err(_) => println!("  Signature: INVALID"),
        }
    } else {
        println!("  Signature: (not checked — pass --key to verify)");
    }

    Ok(())
}

fn parse_rotation_reason(s: &str) -> RotationReason {
    match s.to_lowercase().as_str() {
        "scheduled" => RotationReason::Scheduled,
        "compromised" => RotationReason::Compromised,
        "policy_required" | "policyrequired" => RotationReason::PolicyRequired,
        _ => RotationReason::Manual,
    }
}

fn parse_record_kind(s: &str) -> RecordKind {
    match s.to_lowercase().as_str() {
        "run_start" | "runstart" => RecordKind::RunStart,
        "tool_call" | "toolcall" => RecordKind::ToolCall,
        "run_complete" | "runcomplete" => RecordKind::RunComplete,
        other => RecordKind::Custom(other.to_string()),
    }
}

/// Shorten a description to at most `max` characters, ellipsized.
/// Truncation is by char, never mid way through a UTF-8 sequence.
fn truncate_description(description: &str, max: usize) -> String {
    if description.chars().count() <= max {
        return description.to_string();
    }
    let head: String = description.chars().take(max.saturating_sub(3)).collect();
    format!("{head}...")
}
