//! Command-line driver for the header reflector: file discovery, worker pool, output.

mod buffering_sink;
mod cli_args;
mod error;
mod file_list;

use std::fs;
use std::path::PathBuf;
use std::process;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use crossbeam_channel::bounded;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing_subscriber::EnvFilter;

use refl_emit::{DebugSink, TypeDbSink};
use refl_parser::{EventSink, Parser as ReflParser};

use buffering_sink::{Batch, BufferingSink};
use cli_args::Args;
use error::CliError;

/// Factory for a named generator: builds the one real sink a run replays every event against.
type GeneratorFactory = fn(Option<PathBuf>) -> Box<dyn EventSink>;

fn generator_registry() -> FxHashMap<&'static str, GeneratorFactory> {
    let mut registry: FxHashMap<&'static str, GeneratorFactory> = FxHashMap::default();
    registry.insert("typedb", (|path: Option<PathBuf>| Box::new(TypeDbSink::new(path)) as Box<dyn EventSink>) as GeneratorFactory);
    registry
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    if let Err(err) = run(args) {
        tracing::error!(%err, "reflectc failed");
        process::exit(1);
    }
}

fn run(args: Args) -> Result<(), CliError> {
    let registry = generator_registry();
    let factory = *registry
        .get(args.generator.as_str())
        .ok_or_else(|| CliError::UnknownGenerator(args.generator.clone()))?;

    let files = match &args.list {
        Some(list_path) => file_list::load(list_path)?,
        None => vec![args.input_file.clone()],
    };

    let macros = args.macro_list();
    let output_path = args.typedb_output.clone().or_else(|| Some(args.output_file.clone()));

    let mut real_sink = factory(output_path);
    let mut debug_sink;
    let sink: &mut dyn EventSink = if args.debug {
        debug_sink = DebugSink::new(real_sink.as_mut());
        &mut debug_sink
    } else {
        real_sink.as_mut()
    };

    let thread_count = thread::available_parallelism()
        .map(|n| n.get().saturating_sub(1))
        .unwrap_or(1)
        .max(1)
        .min(files.len().max(1));

    let files_parsed = Mutex::new(0usize);

    let (file_tx, file_rx) = bounded::<PathBuf>(files.len().max(1));
    for file in &files {
        file_tx.send(file.clone()).expect("queue sized to file count");
    }
    drop(file_tx);

    let (result_tx, result_rx) = bounded::<Batch>(4096);

    let total_start = Instant::now();
    let mut spawn_time = Duration::default();

    thread::scope(|scope| {
        for _ in 0..thread_count {
            let file_rx = file_rx.clone();
            let result_tx = result_tx.clone();
            let macros = &macros;
            let profile = args.profile;
            let files_parsed = &files_parsed;
            scope.spawn(move || worker_loop(file_rx, result_tx, macros, profile, files_parsed));
        }
        drop(file_rx);
        drop(result_tx);
        spawn_time = total_start.elapsed();

        while let Ok(mut batch) = result_rx.recv() {
            while let Some(op) = batch.pop_front() {
                op(sink);
            }
        }
    });

    let total_time = total_start.elapsed();
    let parsed = *files_parsed.lock();

    println!("Starting {thread_count} thread(s) took: {:.3}ms", spawn_time.as_secs_f64() * 1000.0);
    println!("Total time: {:.3}ms", total_time.as_secs_f64() * 1000.0);
    println!("Total file(s) parsed: {parsed}");

    Ok(())
}

fn worker_loop(
    file_rx: crossbeam_channel::Receiver<PathBuf>,
    result_tx: crossbeam_channel::Sender<Batch>,
    macros: &[String],
    profile: bool,
    files_parsed: &Mutex<usize>,
) {
    while let Ok(file) = file_rx.recv() {
        let source_name = file.display().to_string();

        let load_start = Instant::now();
        let data = match fs::read_to_string(&file) {
            Ok(data) => data,
            Err(err) => {
                tracing::error!(file = %source_name, %err, "failed to load file");
                continue;
            }
        };
        let load_time = load_start.elapsed();

        let mut sink = BufferingSink::new(result_tx.clone());
        let mut parser = ReflParser::new(&data);
        for macro_name in macros {
            parser.add_macro(macro_name);
        }

        let parse_start = Instant::now();
        let result = parser.parse(&mut sink, &source_name);
        let parse_time = parse_start.elapsed();

        match result {
            Ok(()) => *files_parsed.lock() += 1,
            Err(err) => tracing::info!(file = %source_name, error = %err, "parse failed"),
        }

        if profile {
            let message = format!(
                "'{source_name}': load time {:.3} ms, parse time {:.3} ms",
                load_time.as_secs_f64() * 1000.0,
                parse_time.as_secs_f64() * 1000.0,
            );
            BufferingSink::log(&result_tx, move |_sink| tracing::info!("{message}"));
        }
    }
}
