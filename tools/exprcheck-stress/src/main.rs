use std::process::ExitCode;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::Parser;
use exprcheck_sema::{Arch, Target};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::time::FormatTime;

use exprcheck_stress::check::{check, synthetic_frame};
use exprcheck_stress::{DefaultGeneratorRng, ExprGenerator, get_profile};

struct NoTimestamp;

impl FormatTime for NoTimestamp {
    fn format_time(
        &self,
        _w: &mut tracing_subscriber::fmt::format::Writer<'_>,
    ) -> std::fmt::Result {
        Ok(())
    }
}

#[derive(Parser)]
#[command(name = "exprcheck-stress")]
#[command(about = "Generate random C++ expressions for differential testing")]
struct Cli {
    /// Profile name or path to a profile TOML file
    #[arg(long, default_value = "default")]
    profile: String,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Number of expressions (default: from the profile)
    #[arg(long)]
    count: Option<usize>,

    /// Target architecture, overriding the profile's
    #[arg(long, value_parser = parse_arch)]
    target: Option<Arch>,

    /// Evaluate each expression and annotate its value or undefined behavior
    #[arg(long)]
    check: bool,

    /// Emit random variable declarations instead of expressions
    #[arg(long)]
    declare: bool,
}

fn parse_arch(name: &str) -> Result<Arch, String> {
    Arch::from_name(name).ok_or_else(|| format!("unknown target architecture '{name}'"))
}

fn init_tracing() {
    // EXPRCHECK_LOG_STYLE: "compact" (default) or "full" (with timestamps)
    if let Ok(filter) = EnvFilter::try_from_env("EXPRCHECK_LOG") {
        let style = std::env::var("EXPRCHECK_LOG_STYLE").unwrap_or_default();
        if style == "full" {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(true)
                .with_level(true)
                .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
                .with_writer(std::io::stderr)
                .init();
        } else {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(true)
                .with_level(true)
                .with_timer(NoTimestamp)
                .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
                .with_writer(std::io::stderr)
                .init();
        }
        tracing::debug!("tracing initialized");
    }
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let seed = cli.seed.unwrap_or_else(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0)
    });

    let profile = match get_profile(&cli.profile) {
        Ok(profile) => profile,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let arch = cli.target.unwrap_or(profile.target);
    let target = Target::new(arch);
    let count = cli
        .count
        .unwrap_or(profile.generator.num_exprs_to_generate);
    let frame = synthetic_frame(&target, &profile.generator);

    let mut generator = match ExprGenerator::new(DefaultGeneratorRng::new(seed), profile.generator)
    {
        Ok(generator) => generator,
        Err(e) => {
            eprintln!("error: invalid profile '{}': {e}", cli.profile);
            return ExitCode::FAILURE;
        }
    };

    println!("// seed: {seed}");
    println!("// profile: {}", cli.profile);
    println!("// target: {arch}");

    for _ in 0..count {
        if cli.declare {
            match generator.generate_declaration() {
                Ok(decl) => println!("{decl}"),
                Err(e) => {
                    eprintln!("error: {e}");
                    return ExitCode::FAILURE;
                }
            }
            continue;
        }
        let expr = match generator.generate() {
            Ok(expr) => expr,
            Err(e) => {
                eprintln!("error: {e}");
                return ExitCode::FAILURE;
            }
        };
        if cli.check {
            println!("{expr}  // {}", check(&target, &frame, &expr));
        } else {
            println!("{expr}");
        }
    }

    ExitCode::SUCCESS
}
