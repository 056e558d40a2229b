use std::env;
use std::path::PathBuf;

use tracing_subscriber::EnvFilter;
use txseed_generate::output::{render_preview, write_frame_csv};
use txseed_generate::{GenerateOptions, GenerationEngine};
use txseed_spec::{load_spec_file, transactions_spec};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut args = env::args().skip(1);
    let mut spec_path: Option<PathBuf> = None;
    let mut out: PathBuf = PathBuf::from("sample_data.csv");
    let mut rows: u64 = 100;
    let mut options = GenerateOptions::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--spec" => spec_path = args.next().map(PathBuf::from),
            "--out" => out = args.next().map(PathBuf::from).ok_or("missing --out path")?,
            "--rows" => rows = args.next().ok_or("missing --rows value")?.parse()?,
            "--seed" => options.seed = Some(args.next().ok_or("missing --seed value")?.parse()?),
            _ => return Err(format!("unexpected argument: {arg}").into()),
        }
    }

    let spec = match spec_path {
        Some(path) => load_spec_file(&path)?,
        None => transactions_spec(rows),
    };

    let result = GenerationEngine::new(options).run(&spec)?;
    print!("{}", render_preview(&result.frame, 5));
    let bytes = write_frame_csv(&out, &result.frame)?;

    println!("csv={} bytes={} seed={}", out.display(), bytes, result.report.seed);
    Ok(())
}
