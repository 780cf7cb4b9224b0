//! Syncany API CLI
//!
//! Entry point for the `syncany-api` command-line tool. Requests are written
//! to stdout, framed for `syncany-server serve`.

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

use chrono::Utc;
use clap::{Parser, Subcommand};
use syncany_api::request::new_request_id;
use syncany_api::signer::random_nonce;
use syncany_api::{
    link_add_request, link_get_request, write_framed, ApiRequest, ClientError, Method,
    ReleaseMetadata, RequestSigner, UploadRequest,
};
use syncany_protocol::ops::{Architecture, ArtifactType, Dist, OperatingSystem};

#[derive(Parser)]
#[command(name = "syncany-api")]
#[command(about = "Signing client for the Syncany release and link API", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the canonical string and signature of a request
    Sign {
        /// Secret record file of the security context
        #[arg(long, short = 'k')]
        key_file: PathBuf,

        /// HTTP method (GET, PUT, POST, DELETE)
        #[arg(long, default_value = "GET")]
        method: Method,

        /// Resource name
        #[arg(long)]
        resource: String,

        /// Sub-verb
        #[arg(long)]
        verb: Option<String>,

        /// Path argument (repeatable)
        #[arg(long = "path-arg")]
        path_args: Vec<String>,

        /// Named argument as key=value (repeatable)
        #[arg(long = "arg", value_parser = parse_key_value)]
        args: Vec<(String, String)>,

        /// Unix time to sign with (default: now)
        #[arg(long)]
        time: Option<i64>,

        /// Nonce to sign with (default: random)
        #[arg(long)]
        rand: Option<String>,
    },

    /// Emit a signed release upload request
    Upload {
        /// Secret record file of the security context
        #[arg(long, short = 'k')]
        key_file: PathBuf,

        /// File to upload
        file: PathBuf,

        /// Public file name (default: name of FILE)
        #[arg(long)]
        filename: Option<String>,

        /// Upload the OS X notifier instead of an application release
        #[arg(long)]
        osx_notifier: bool,

        /// Publish as snapshot
        #[arg(long)]
        snapshot: bool,

        /// Application version
        #[arg(long, required_unless_present = "osx_notifier")]
        app_version: Option<String>,

        /// Release date, YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<String>,

        /// Operating system (all, linux, windows, macosx)
        #[arg(long, default_value = "all")]
        os: OperatingSystem,

        /// Architecture (all, x86, x86_64)
        #[arg(long, default_value = "all")]
        arch: Architecture,

        /// Distribution (cli, gui)
        #[arg(long, default_value = "cli")]
        dist: Dist,

        /// File type (tar.gz, zip, deb, exe, app.zip)
        #[arg(long = "type", required_unless_present = "osx_notifier")]
        artifact_type: Option<ArtifactType>,
    },

    /// Emit a short link request
    Shorten {
        /// Long `syncany://` link
        link: String,
    },

    /// Emit a short link lookup request
    Resolve {
        /// Short link id
        id: String,
    },
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{}'", s))
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Sign {
            key_file,
            method,
            resource,
            verb,
            path_args,
            args,
            time,
            rand,
        } => cmd_sign(key_file, method, resource, verb, path_args, args, time, rand),
        Commands::Upload {
            key_file,
            file,
            filename,
            osx_notifier,
            snapshot,
            app_version,
            date,
            os,
            arch,
            dist,
            artifact_type,
        } => cmd_upload(UploadArgs {
            key_file,
            file,
            filename,
            osx_notifier,
            snapshot,
            app_version,
            date,
            os,
            arch,
            dist,
            artifact_type,
        }),
        Commands::Shorten { link } => emit(&link_add_request(&link)),
        Commands::Resolve { id } => emit(&link_get_request(&id)),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_sign(
    key_file: PathBuf,
    method: Method,
    resource: String,
    verb: Option<String>,
    path_args: Vec<String>,
    args: Vec<(String, String)>,
    time: Option<i64>,
    rand: Option<String>,
) -> Result<(), ClientError> {
    let signer = RequestSigner::from_key_file(&key_file)?;
    let time = time.unwrap_or_else(|| Utc::now().timestamp());
    let nonce = rand.unwrap_or_else(random_nonce);

    let mut request = ApiRequest::new(new_request_id(), method, resource);
    request.verb = verb;
    request.path_args = path_args;
    request.args = args.into_iter().collect::<BTreeMap<_, _>>();

    let (canonical, signature) = signer.explain(&request, time, &nonce);
    signer.sign_at(&mut request, time, &nonce);

    println!("canonical: {}", canonical);
    println!("signature: {}", signature);
    println!("request:   {}", serde_json::to_string(&request)?);
    Ok(())
}

struct UploadArgs {
    key_file: PathBuf,
    file: PathBuf,
    filename: Option<String>,
    osx_notifier: bool,
    snapshot: bool,
    app_version: Option<String>,
    date: Option<String>,
    os: OperatingSystem,
    arch: Architecture,
    dist: Dist,
    artifact_type: Option<ArtifactType>,
}

fn cmd_upload(args: UploadArgs) -> Result<(), ClientError> {
    let signer = RequestSigner::from_key_file(&args.key_file)?;

    let filename = match args.filename {
        Some(filename) => filename,
        None => args
            .file
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| ClientError::InvalidArgument("cannot derive file name".to_string()))?,
    };

    let mut upload = if args.osx_notifier {
        UploadRequest::osx_notifier(&args.file, &filename, args.snapshot)?
    } else {
        let metadata = ReleaseMetadata {
            filename,
            version: args
                .app_version
                .ok_or_else(|| ClientError::InvalidArgument("--app-version is required".to_string()))?,
            date: args
                .date
                .unwrap_or_else(|| Utc::now().format("%Y-%m-%d").to_string()),
            snapshot: args.snapshot,
            os: args.os,
            arch: args.arch,
            dist: args.dist,
            artifact_type: args
                .artifact_type
                .ok_or_else(|| ClientError::InvalidArgument("--type is required".to_string()))?,
        };
        UploadRequest::release(&args.file, &metadata)?
    };

    upload.sign(&signer);
    upload.write_to(&mut io::stdout().lock())
}

fn emit(request: &ApiRequest) -> Result<(), ClientError> {
    let mut stdout = io::stdout().lock();
    write_framed(&mut stdout, request, None)?;
    stdout.flush().map_err(ClientError::Write)
}
