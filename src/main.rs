use clap::{Parser, Subcommand};
use shard_merge::config::{self, MergeConfig, MergeOptions};
use shard_merge::naming::NamePatterns;
use shard_merge::{logging, output, plan, scan};
use std::path::PathBuf;
use std::process::ExitCode;

/// Flags shared by commands that walk the source tree.
#[derive(clap::Args, Clone)]
struct SourceArgs {
    /// Source folder or file
    #[arg(short, long, default_value = ".")]
    src: PathBuf,

    /// Exclude paths containing this fragment (matched per path segment, repeatable)
    #[arg(short = 'x', long = "exclude", value_name = "PATTERN")]
    exclude: Vec<String>,
}

#[derive(clap::Args, Clone)]
struct PlanArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Destination store; the first receives new files, the rest are only searched (repeatable)
    #[arg(short, long = "dst", value_name = "DIR")]
    dst: Vec<PathBuf>,

    /// File extension to merge, e.g. `jpg` or `.JPG` (repeatable)
    #[arg(short, long = "ext", value_name = "EXT")]
    ext: Vec<String>,

    /// Keep the source file name verbatim instead of shortening and cleaning it
    #[arg(long)]
    preserve_file_names: bool,
}

#[derive(Parser)]
#[command(name = "shard-merge")]
#[command(about = "Plan merges of a file tree into content-addressed stores")]
#[command(long_about = "\
Plan merges of a file tree into content-addressed stores

Every matching source file is fingerprinted (SHA-256) and compared with the
destination stores. The plan is printed as shell directives; nothing on disk
is changed:

  mkdir '<store>/3f'
  mv '<source>'\t'<store>/3f/3fc4…__name.ext'
  rm '<duplicate>'\t# '<surviving copy>'

Store layout:

  store/
  └── 3f/                          # first two hex chars of the fingerprint
      └── 3fc4ccfe…a5__holiday.jpg # <fingerprint>__<cleaned name>

Review the plan, then run it with `shard-merge plan ... | sh`.")]
#[command(version)]
struct Cli {
    /// Read defaults from a TOML config file (see `gen-config`)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase diagnostic output on stderr (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the merge plan for matching source files
    Plan(PlanArgs),
    /// List the distinct file extensions under the source folder
    Exts(SourceArgs),
    /// Print a stock shard-merge.toml with all options documented
    GenConfig,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logger(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let file_config = cli
        .config
        .as_deref()
        .map(config::load_file_config)
        .transpose()?;

    match cli.command {
        Command::Plan(args) => {
            let options = MergeOptions {
                source: args.source.src,
                destinations: args.dst,
                exclude: args.source.exclude,
                extensions: args.ext,
                preserve_file_names: args.preserve_file_names,
            };
            let merge_config = MergeConfig::build(options, file_config)?;
            let patterns = NamePatterns::new();
            let plan = plan::plan(&merge_config, &patterns)?;
            output::print_plan(&plan)?;
        }
        Command::Exts(args) => {
            let mut exclude = file_config.map(|f| f.exclude).unwrap_or_default();
            exclude.extend(args.exclude);
            let exclusions = config::parse_exclusions(&exclude)?;
            let source = shard_merge::paths::clean(&args.src);
            let extensions = scan::list_extensions(&source, &exclusions)?;
            output::print_extensions(&source, &extensions);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}
