//! pemseal: chunked RSA file encryption CLI
//!
//! Commands:
//!   keygen              - generate a key pair and write both PEM files
//!   pubkey              - derive the public key PEM of a private key file
//!   encrypt <in> <out>  - encrypt a file chunk by chunk with a public key
//!   decrypt <in> <out>  - decrypt a file chunk by chunk with a private key
//!   config show         - display current configuration
//!
//! Ctrl-C during encrypt/decrypt stops after the chunk in flight; the
//! partial output file is left in place.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use secrecy::SecretString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use pemseal_core::config::{expand_tilde, PemsealConfig};
use pemseal_core::{Direction, Notification, SessionOutcome};
use pemseal_crypto::kdf::effective_passphrase;
use pemseal_crypto::{ChunkCipher, KdfParams, KeyLifecycleManager, RsaPrivateKey, RsaPublicKey};
use pemseal_stream::{ChunkedFileProcessor, StopHandle};

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "pemseal",
    version,
    about = "Chunked RSA-OAEP file encryption",
    long_about = "pemseal: encrypt and decrypt files of any size under an RSA key pair, and manage PEM key files"
)]
struct Cli {
    /// Path to pemseal.toml configuration file
    #[arg(long, short = 'c', env = "PEMSEAL_CONFIG", default_value = "~/.config/pemseal/pemseal.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long, env = "PEMSEAL_LOG")]
    log: Option<String>,

    /// Log format; overrides the config file
    #[arg(long, env = "PEMSEAL_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate an RSA key pair and write PKCS#8 / SubjectPublicKeyInfo PEM files
    Keygen {
        /// Private key output path (default: config keys.private_key)
        #[arg(long)]
        private_key: Option<PathBuf>,
        /// Public key output path (default: config keys.public_key)
        #[arg(long)]
        public_key: Option<PathBuf>,
        /// Modulus size in bits (default: config keys.bits)
        #[arg(long)]
        bits: Option<usize>,
        /// Public exponent, 3 or 65537 (default: config keys.public_exponent)
        #[arg(long)]
        exponent: Option<u64>,
        /// Overwrite existing key files
        #[arg(long)]
        force: bool,
        #[command(flatten)]
        passphrase: PassphraseArgs,
    },

    /// Derive the public key of a private key file
    Pubkey {
        /// Private key PEM file (default: config keys.private_key)
        #[arg(long)]
        private_key: Option<PathBuf>,
        /// Public key output path (default: print to stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
        #[command(flatten)]
        passphrase: PassphraseArgs,
    },

    /// Encrypt a file with a public key
    Encrypt {
        /// Plaintext input file
        input: PathBuf,
        /// Ciphertext output file (created or truncated)
        output: PathBuf,
        #[command(flatten)]
        key: PublicKeyArgs,
        /// Plaintext bytes per chunk (default: largest the key allows)
        #[arg(long)]
        chunk_size: Option<usize>,
    },

    /// Decrypt a file with a private key
    Decrypt {
        /// Ciphertext input file
        input: PathBuf,
        /// Plaintext output file (created or truncated)
        output: PathBuf,
        #[command(flatten)]
        key: PrivateKeyArgs,
        #[command(flatten)]
        passphrase: PassphraseArgs,
        /// Ciphertext bytes per chunk (default: the key modulus length)
        #[arg(long)]
        chunk_size: Option<usize>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration (merged defaults + config file)
    Show,
}

#[derive(Args, Debug)]
struct PassphraseArgs {
    /// Read the private key passphrase from this environment variable
    #[arg(long, value_name = "VAR")]
    passphrase_env: Option<String>,
    /// Prompt for the private key passphrase
    #[arg(long, conflicts_with = "passphrase_env")]
    ask_passphrase: bool,
}

#[derive(Args, Debug)]
struct PublicKeyArgs {
    /// Public key PEM file (default: config keys.public_key)
    #[arg(long)]
    public_key: Option<PathBuf>,
    /// Public key PEM text, e.g. pasted from elsewhere
    #[arg(long, env = "PEMSEAL_PUBLIC_KEY_PEM", conflicts_with = "public_key")]
    public_key_pem: Option<String>,
}

#[derive(Args, Debug)]
struct PrivateKeyArgs {
    /// Private key PEM file (default: config keys.private_key)
    #[arg(long)]
    private_key: Option<PathBuf>,
    /// Private key PEM text
    #[arg(long, env = "PEMSEAL_PRIVATE_KEY_PEM", conflicts_with = "private_key")]
    private_key_pem: Option<String>,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = expand_tilde(&cli.config);
    let config = load_config(&config_path).await?;

    init_logging(&cli, &config);

    let manager = KeyLifecycleManager::new(KdfParams {
        pbkdf2_iterations: config.keys.pbkdf2_iterations,
    });

    match cli.command {
        Commands::Keygen { private_key, public_key, bits, exponent, force, passphrase } => {
            cmd_keygen(&config, &manager, private_key, public_key, bits, exponent, force, &passphrase)
        }
        Commands::Pubkey { private_key, output, passphrase } => {
            cmd_pubkey(&config, &manager, private_key, output.as_deref(), &passphrase)
        }
        Commands::Encrypt { input, output, key, chunk_size } => {
            let public = resolve_public_key(&config, &manager, &key)?;
            let cipher = ChunkCipher::for_encryption(public);
            let chunk_size = chunk_size
                .or(config.processing.encrypt_chunk_size)
                .unwrap_or_else(|| cipher.input_chunk_len());
            cmd_process(input, output, cipher, chunk_size).await
        }
        Commands::Decrypt { input, output, key, passphrase, chunk_size } => {
            let private = resolve_private_key(&config, &manager, &key, &passphrase)?;
            let cipher = ChunkCipher::for_decryption(private);
            let chunk_size = chunk_size
                .or(config.processing.decrypt_chunk_size)
                .unwrap_or_else(|| cipher.input_chunk_len());
            cmd_process(input, output, cipher, chunk_size).await
        }
        Commands::Config { action: ConfigAction::Show } => cmd_config_show(&config, &config_path),
    }
}

// ── Config loading ────────────────────────────────────────────────────────────

async fn load_config(path: &Path) -> Result<PemsealConfig> {
    if path.exists() {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading config: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("parsing config: {}", path.display()))
    } else {
        Ok(PemsealConfig::default())
    }
}

fn init_logging(cli: &Cli, config: &PemsealConfig) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let level = cli.log.as_deref().unwrap_or(&config.log.level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let json = match &cli.log_format {
        Some(LogFormat::Json) => true,
        Some(LogFormat::Text) => false,
        None => config.log.format.eq_ignore_ascii_case("json"),
    };

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

// ── Key resolution ────────────────────────────────────────────────────────────

/// Resolve the passphrase: env var > prompt > none.
///
/// An explicitly requested passphrase must not be empty.
fn read_passphrase(args: &PassphraseArgs, confirm: bool) -> Result<Option<SecretString>> {
    let value = if let Some(var) = &args.passphrase_env {
        std::env::var(var)
            .with_context(|| format!("passphrase environment variable {var} is not set"))?
    } else if args.ask_passphrase {
        let first = rpassword::prompt_password("Passphrase: ").context("reading passphrase")?;
        if confirm {
            let second = rpassword::prompt_password("Confirm passphrase: ")
                .context("reading passphrase confirmation")?;
            if first != second {
                anyhow::bail!("passphrases do not match");
            }
        }
        first
    } else {
        return Ok(None);
    };

    if value.is_empty() {
        anyhow::bail!("passphrase must not be empty");
    }
    Ok(Some(SecretString::from(value)))
}

fn resolve_public_key(
    config: &PemsealConfig,
    manager: &KeyLifecycleManager,
    args: &PublicKeyArgs,
) -> Result<RsaPublicKey> {
    if let Some(text) = &args.public_key_pem {
        return manager
            .parse_public_from_text(text)
            .context("parsing public key text");
    }
    let path = expand_tilde(args.public_key.as_ref().unwrap_or(&config.keys.public_key));
    manager
        .load_public(&path)
        .with_context(|| format!("loading public key: {}", path.display()))
}

fn resolve_private_key(
    config: &PemsealConfig,
    manager: &KeyLifecycleManager,
    args: &PrivateKeyArgs,
    passphrase: &PassphraseArgs,
) -> Result<RsaPrivateKey> {
    let passphrase = read_passphrase(passphrase, false)?;
    if let Some(text) = &args.private_key_pem {
        return manager
            .parse_private_from_text(text, passphrase.as_ref())
            .context("parsing private key text");
    }
    let path = expand_tilde(args.private_key.as_ref().unwrap_or(&config.keys.private_key));
    manager
        .load_private(&path, passphrase.as_ref())
        .with_context(|| format!("loading private key: {}", path.display()))
}

// ── `pemseal keygen` ──────────────────────────────────────────────────────────

#[allow(clippy::too_many_arguments)]
fn cmd_keygen(
    config: &PemsealConfig,
    manager: &KeyLifecycleManager,
    private_key: Option<PathBuf>,
    public_key: Option<PathBuf>,
    bits: Option<usize>,
    exponent: Option<u64>,
    force: bool,
    passphrase: &PassphraseArgs,
) -> Result<()> {
    let private_path = expand_tilde(private_key.as_ref().unwrap_or(&config.keys.private_key));
    let public_path = expand_tilde(public_key.as_ref().unwrap_or(&config.keys.public_key));

    for path in [&private_path, &public_path] {
        if path.exists() && !force {
            anyhow::bail!(
                "{} already exists; pass --force to overwrite",
                path.display()
            );
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating directory: {}", parent.display()))?;
        }
    }

    let passphrase = read_passphrase(passphrase, true)?;
    let bits = bits.unwrap_or(config.keys.bits);
    let exponent = exponent.unwrap_or(config.keys.public_exponent);

    let pb = make_spinner("keygen");
    pb.set_message(format!("generating {bits}-bit RSA key pair..."));
    let pair = manager
        .generate_and_save_private(&private_path, bits, exponent, passphrase.as_ref())
        .with_context(|| format!("writing private key: {}", private_path.display()))?;
    manager
        .save_public(&public_path, pair.public_key())
        .with_context(|| format!("writing public key: {}", public_path.display()))?;
    pb.finish_with_message("done".to_string());

    println!("Generated {bits}-bit RSA key pair (e = {exponent})");
    println!(
        "  private: {} ({})",
        private_path.display(),
        protection_label(passphrase.as_ref())
    );
    println!("  public:  {}", public_path.display());
    Ok(())
}

/// How the private key PEM was written; an empty passphrase leaves it unencrypted.
fn protection_label(passphrase: Option<&SecretString>) -> &'static str {
    if effective_passphrase(passphrase).is_some() {
        "passphrase-protected"
    } else {
        "unencrypted"
    }
}

// ── `pemseal pubkey` ──────────────────────────────────────────────────────────

fn cmd_pubkey(
    config: &PemsealConfig,
    manager: &KeyLifecycleManager,
    private_key: Option<PathBuf>,
    output: Option<&Path>,
    passphrase: &PassphraseArgs,
) -> Result<()> {
    let key_args = PrivateKeyArgs {
        private_key,
        private_key_pem: None,
    };
    let private = resolve_private_key(config, manager, &key_args, passphrase)?;
    let public = manager.derive_public(&private).context("deriving public key")?;

    match output {
        Some(path) => {
            manager
                .save_public(path, &public)
                .with_context(|| format!("writing public key: {}", path.display()))?;
            println!("Public key written to {}", path.display());
        }
        None => print!("{}", manager.public_to_pem(&public)?),
    }
    Ok(())
}

// ── `pemseal encrypt` / `pemseal decrypt` ─────────────────────────────────────

async fn cmd_process(
    input: PathBuf,
    output: PathBuf,
    cipher: ChunkCipher,
    chunk_size: usize,
) -> Result<()> {
    let direction = cipher.direction();
    let total = std::fs::metadata(&input).map(|m| m.len()).unwrap_or(0);

    let pb = make_progress_bar(total, &direction.to_string());
    pb.set_message(input.display().to_string());

    let pb_clone = pb.clone();
    let notify = move |n: Notification| match n {
        Notification::Progress { processed, .. } => pb_clone.set_position(processed),
        Notification::Completed => pb_clone.finish_with_message("done".to_string()),
        Notification::Error { message, .. } => pb_clone.abandon_with_message(message),
    };

    let processor = ChunkedFileProcessor::new(notify);
    let stop = processor.stop_handle();

    info!(
        input = %input.display(),
        output = %output.display(),
        direction = %direction,
        chunk_size,
        "starting"
    );

    let (task_input, task_output) = (input.clone(), output.clone());
    let mut task = tokio::task::spawn_blocking(move || {
        processor.start(&task_input, &task_output, &cipher, chunk_size)
    });

    let outcome = tokio::select! {
        res = &mut task => res.context("processing task failed")?,
        _ = tokio::signal::ctrl_c() => {
            request_stop_with_notice(&stop, &pb);
            task.await.context("processing task failed")?
        }
    };

    match outcome {
        SessionOutcome::Completed { bytes } => {
            println!();
            println!("{}:", if direction == Direction::Encrypt { "Encrypted" } else { "Decrypted" });
            println!("  input:  {} ({})", input.display(), fmt_bytes(bytes));
            println!("  output: {}", output.display());
            Ok(())
        }
        SessionOutcome::Cancelled { bytes } => {
            pb.abandon_with_message("stopped".to_string());
            eprintln!();
            eprintln!("Process stopped by user after {}.", fmt_bytes(bytes));
            eprintln!("Partial output left at {}; discard it or start over.", output.display());
            std::process::exit(130);
        }
        SessionOutcome::Failed { message } => {
            anyhow::bail!("error processing file {}: {message}", input.display())
        }
    }
}

/// Stop the session at the next chunk boundary and say so on the progress bar.
fn request_stop_with_notice(stop: &StopHandle, pb: &ProgressBar) {
    stop.request_stop();
    pb.set_message("stopping after current chunk...".to_string());
}

// ── `pemseal config show` ─────────────────────────────────────────────────────

fn cmd_config_show(config: &PemsealConfig, config_path: &Path) -> Result<()> {
    if config_path.exists() {
        println!("# Configuration from: {}", config_path.display());
    } else {
        println!("# Configuration: defaults (no file at {})", config_path.display());
    }
    println!();
    let rendered = toml::to_string_pretty(config)
        .context("serializing config to TOML")?;
    print!("{rendered}");
    Ok(())
}

// ── Progress bar helpers ──────────────────────────────────────────────────────

fn make_progress_bar(total: u64, prefix: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::with_template(
        "{prefix:.bold} [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}"
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("=>-");
    pb.set_style(style);
    pb.set_prefix(prefix.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn make_spinner(prefix: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{prefix:.bold} {spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    );
    pb.set_prefix(prefix.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn fmt_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
