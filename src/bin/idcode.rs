use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::Local;
use clap::{Parser, ValueEnum};
use mimalloc::MiMalloc;

use idcode_lib::encoder::gis::GisEncoder;
use idcode_lib::encoder::ilp::IlpEncoder;
use idcode_lib::timer::{ProcessTimer, WallclockTimer};
use idcode_lib::{Config, Encoder, Error, Instance};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum EncodingKind {
    Gis,
    Ilp,
}

/// Encodes a network into a CNF or ILP formulation of the
/// k-identifying-code problem.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Path to network file.
    #[arg(long, short = 'n')]
    network: PathBuf,

    /// Path to output directory above the k sub directory.
    #[arg(long = "out_dir")]
    out_dir: PathBuf,

    /// Basename of output file.
    #[arg(long = "out_file")]
    out_file: String,

    /// Specify the encoding.
    #[arg(long, value_enum)]
    encoding: EncodingKind,

    /// Budget (number of smoke detectors / injected colors).
    #[arg(short = 'b', default_value_t = -1, allow_hyphen_values = true)]
    budget: i64,

    /// Max number of simultaneous events.
    #[arg(short = 'k', default_value_t = 1)]
    k: u32,

    /// Request two_step approach.
    #[arg(long = "two_step")]
    two_step: bool,

    /// For ILP encoding only: remove redundant constraints.
    #[arg(long = "remove_supersets")]
    remove_supersets: bool,

    /// For ILP encoding only: avoid adding unnecessary constraints.
    #[arg(long = "check_2_neighbourhood")]
    check_2_neighbourhood: bool,
}

fn log_message(message: &str) {
    println!("{}: {message}", Local::now().format("%Y-%m-%d, %Hh%Mm%Ss"));
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = Config::from_env();

    if cli.k < 1 {
        eprintln!("{}", Error::Argument("k must be at least 1".to_string()));
        return ExitCode::FAILURE;
    }

    let encoding_name = match cli.encoding {
        EncodingKind::Gis => "gis",
        EncodingKind::Ilp => "ilp",
    };

    log_message(&format!("Processing {}", cli.network.display()));
    log_message(&format!("Initialising {encoding_name} instance"));
    log_message(&format!("Building {encoding_name} instance."));

    let mut t_wallclock = WallclockTimer::new("Building took {} wallclock seconds.");
    let mut t_process = ProcessTimer::new("Building took {} CPU seconds.");
    t_wallclock.start();
    t_process.start();
    let build_result = build(&cli);
    log_message(&t_wallclock.stop());
    log_message(&t_process.stop());
    let instance = match build_result {
        Ok(instance) => {
            log_message("Building completed!");
            instance
        }
        Err(err) => {
            log_message("Building FAILED!");
            eprintln!("{err}");
            log_message("Building failed. Aborting rest of the process");
            return ExitCode::FAILURE;
        }
    };

    log_message(&format!("Encoding {encoding_name} instance."));
    log_message(&format!("Encoding k = {}", cli.k));

    let mut t_wallclock = WallclockTimer::new(&format!(
        "Encoding took {{}} wallclock seconds for k = {}.",
        cli.k
    ));
    let mut t_process = ProcessTimer::new(&format!(
        "Encoding took {{}} CPU seconds for k = {}.",
        cli.k
    ));
    t_wallclock.start();
    t_process.start();
    let encode_result = encode(&cli, &config, &instance);
    log_message(&t_wallclock.stop());
    log_message(&t_process.stop());
    match encode_result {
        Ok(()) => log_message("Encoding completed!"),
        Err(err) => {
            log_message("Encoding FAILED!");
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    }

    log_message("Done!");
    ExitCode::SUCCESS
}

/// Build phase: reject impossible parameter combinations, then load and
/// preprocess the network.
fn build(cli: &Cli) -> Result<Instance, Error> {
    if !cli.two_step && cli.k > 1 {
        return Err(Error::Preprocess(
            "one-step encoding is only valid for k = 1".to_string(),
        ));
    }
    Instance::build(&cli.network, cli.budget, cli.two_step)
}

/// Encode phase: create the k output directory and write the formula.
fn encode(cli: &Cli, config: &Config, instance: &Instance) -> Result<(), Error> {
    let out_dir = cli.out_dir.join(format!("k{}", cli.k));
    fs::create_dir_all(&out_dir)?;
    let out_file = out_dir.join(&cli.out_file);

    let encoder = match cli.encoding {
        EncodingKind::Gis => Encoder::Gis(GisEncoder {
            two_step: cli.two_step,
        }),
        EncodingKind::Ilp => Encoder::Ilp(IlpEncoder {
            two_step: cli.two_step,
            remove_supersets: cli.remove_supersets,
            check_2_neighbourhood: cli.check_2_neighbourhood,
        }),
    };

    let stats = encoder.encode(instance, config, &out_file, cli.k)?;
    log_message(&format!(
        "Wrote {} variables and {} rows to {}",
        stats.n_vars,
        stats.n_rows,
        out_file.display()
    ));
    Ok(())
}
