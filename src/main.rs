use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use log::{LevelFilter, error, info};
use env_logger::Builder;
use methylotl::cli::parse;
use methylotl::cli::args::{Action, ProcessArgs};
use methylotl::config::defs::{PipelineError, RunConfig};
use methylotl::utils::file::absolutize;
use methylotl::utils::system::current_dir;
use methylotl::pipelines::{index, methylation};


#[tokio::main]
async fn main() -> Result<()> {
    let run_start = Instant::now();

    let args = parse();

    let log_level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    Builder::new()
        .filter_level(log_level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {}: {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .init();

    println!("\n-------------\n Methylotl\n-------------\n");

    let dir = current_dir()?;
    info!("The current directory is {:?}\n", dir);

    if let Err(e) = match args.action {
        Action::Index(index_args) => index_run(absolutize(&index_args.genome, &dir)).await,
        Action::Process(process_args) => process_run(run_config(process_args, dir)).await,
    } {
        error!("Pipeline failed: {} at {} milliseconds.", e, run_start.elapsed().as_millis());
        std::process::exit(1);
    }

    println!("Run complete: {} milliseconds.", run_start.elapsed().as_millis());
    Ok(())
}


async fn index_run(genome: PathBuf) -> Result<(), PipelineError> {
    index::run(&genome).await.map(|_| ())
}

async fn process_run(run_config: Arc<RunConfig>) -> Result<(), PipelineError> {
    methylation::run(run_config).await.map(|_| ())
}

/// Freezes the process arguments into the shared run configuration.
/// Relative paths are resolved against `cwd` so tools started in another
/// working directory see the same files.
fn run_config(args: ProcessArgs, cwd: PathBuf) -> Arc<RunConfig> {
    Arc::new(RunConfig {
        threads: args.threads,
        input_dir: absolutize(&args.input_dir, &cwd),
        output_dir: absolutize(&args.output_dir, &cwd),
        reference: absolutize(&args.reference, &cwd),
        log_dir: absolutize(&args.logs, &cwd),
        quality: args.quality,
        r1_suffix: args.r1_suffix,
        dry_run: args.dry_run,
        cwd,
    })
}
