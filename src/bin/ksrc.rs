
extern crate clap;
extern crate env_logger;
extern crate exitcode;
extern crate log;

use clap::{value_t, values_t, App, Arg};
use log::{error, info};
use std::sync::Arc;

use ksrc::error::{Cli, Error};
use ksrc::kmer_encoding::{validate_k, MAX_K};
use ksrc::kmer_set::{CountedKmerSet, HashKmerSet, KmerCounts, SharedKmerSet, MAX_COUNTING_K};
use ksrc::read_correction::{build_methods, run_correction, CorrectionParameters};

const VERSION: Option<&'static str> = option_env!("CARGO_PKG_VERSION");

fn main() {
    //initialize logging for our benefit later
    env_logger::from_env(env_logger::Env::default().default_filter_or("info")).init();

    //this is the CLI block, params that get populated appear before
    let mut kmer_size: Option<u8> = None;
    let mut abundance: Option<u8> = None;
    let mut confirm: u8 = 2;
    let mut max_search: u8 = 7;
    let mut threads: usize = 1;
    let mut job_slots: u64 = 10000;
    let verbose_mode: bool;
    let one_side: bool;

    let matches = App::new("KSRC")
        .version(VERSION.unwrap_or("?"))
        .about("K-mer Spectrum Read Corrector - Rust implementation")
        .arg(Arg::with_name("verbose_mode")
            .short("v")
            .long("verbose")
            .help("enable per-read solidity output"))
        .arg(Arg::with_name("inputs")
            .short("i")
            .long("inputs")
            .multiple(true)
            .takes_value(true)
            .required(true)
            .help("FASTA/FASTQ file(s) to correct"))
        .arg(Arg::with_name("outputs")
            .short("o")
            .long("outputs")
            .multiple(true)
            .takes_value(true)
            .required(true)
            .help("path(s) the corrected reads are written to, one per input"))
        .arg(Arg::with_name("kmer_size")
            .short("k")
            .long("kmer_size")
            .takes_value(true)
            .help("k-mer length used for correction"))
        .arg(Arg::with_name("trusted")
            .short("S")
            .long("trusted")
            .multiple(true)
            .takes_value(true)
            .help("FASTA/FASTQ file(s) whose k-mers are taken as solid, requires -k"))
        .arg(Arg::with_name("abundance")
            .short("a")
            .long("min_abundance")
            .takes_value(true)
            .help("minimum count for a counted k-mer to be solid (default: spectrum valley)"))
        .arg(Arg::with_name("methods")
            .short("m")
            .long("method")
            .multiple(true)
            .takes_value(true)
            .possible_values(&["exist", "gap_size", "graph", "greedy"])
            .help("correction method(s), applied in the order given (default: exist)"))
        .arg(Arg::with_name("confirm")
            .short("c")
            .long("confirm")
            .takes_value(true)
            .help("number of solid k-mers needed to confirm an edit (default: 2)"))
        .arg(Arg::with_name("max_search")
            .short("M")
            .long("max_search")
            .takes_value(true)
            .help("symbol budget for graph walks past a weak region (default: 7)"))
        .arg(Arg::with_name("one_side")
            .short("n")
            .long("one_side")
            .help("only correct scanning forward, skip the reverse complement pass"))
        .arg(Arg::with_name("threads")
            .short("t")
            .long("threads")
            .takes_value(true)
            .help("number of correction threads (default: 1)"))
        .arg(Arg::with_name("job_slots")
            .short("b")
            .long("record_buffer")
            .takes_value(true)
            .help("maximum number of reads in flight (default: 10000)"))
        .get_matches();

    //pull out required values
    let inputs: Vec<String> = values_t!(matches.values_of("inputs"), String).unwrap_or_else(|e| e.exit());
    let outputs: Vec<String> = values_t!(matches.values_of("outputs"), String).unwrap_or_else(|e| e.exit());

    //now check options
    verbose_mode = matches.is_present("verbose_mode");
    one_side = matches.is_present("one_side");
    if matches.is_present("kmer_size") {
        kmer_size = Some(value_t!(matches.value_of("kmer_size"), u8).unwrap_or_else(|e| e.exit()));
    }
    if matches.is_present("abundance") {
        abundance = Some(value_t!(matches.value_of("abundance"), u8).unwrap_or_else(|e| e.exit()));
    }
    let trusted: Option<Vec<String>> = if matches.is_present("trusted") {
        Some(values_t!(matches.values_of("trusted"), String).unwrap_or_else(|e| e.exit()))
    } else {
        None
    };
    let methods: Option<Vec<String>> = if matches.is_present("methods") {
        Some(values_t!(matches.values_of("methods"), String).unwrap_or_else(|e| e.exit()))
    } else {
        None
    };
    confirm = value_t!(matches.value_of("confirm"), u8).unwrap_or(confirm);
    max_search = value_t!(matches.value_of("max_search"), u8).unwrap_or(max_search);
    threads = value_t!(matches.value_of("threads"), usize).unwrap_or(threads);
    job_slots = value_t!(matches.value_of("job_slots"), u64).unwrap_or(job_slots);

    info!("Input parameters (required):");
    info!("\tinputs: {:?}", inputs);
    info!("\toutputs: {:?}", outputs);
    if inputs.len() != outputs.len() {
        error!("{}", Error::Cli(Cli::NotSameNumberOfInAndOut));
        std::process::exit(exitcode::USAGE);
    }

    info!("Execution parameters:");
    info!("\tverbose: {}", verbose_mode);
    info!("\tthreads: {}", threads);
    info!("\trecord buffer: {}", job_slots);
    if threads == 0 {
        error!("--threads must be at least 1");
        std::process::exit(exitcode::DATAERR);
    }
    if job_slots == 0 {
        error!("--record_buffer must be at least 1");
        std::process::exit(exitcode::DATAERR);
    }

    info!("Correction parameters:");
    info!("\tk-mer size: {:?}", kmer_size);
    info!("\tconfirmation count: {}", confirm);
    info!("\tmax search: {}", max_search);
    info!("\ttwo sided: {}", !one_side);

    //build the solid k-mer set: trusted files need an explicit k, otherwise
    //the inputs themselves are counted and thresholded
    let valid_kmer: SharedKmerSet = if let Some(trusted_paths) = trusted {
        let k = match kmer_size {
            Some(k) => k,
            None => {
                error!("{}", Error::Cli(Cli::KmerSolidNeedK));
                std::process::exit(exitcode::USAGE);
            }
        };
        if validate_k(k).is_err() {
            error!("--kmer_size must be in [1, {}]", MAX_K);
            std::process::exit(exitcode::DATAERR);
        }

        info!("Loading trusted k-mers from {:?}", trusted_paths);
        match HashKmerSet::from_files(&trusted_paths, k) {
            Ok(set) => Arc::new(set),
            Err(e) => {
                error!("Failed to load trusted k-mers: {}", e);
                std::process::exit(exitcode::IOERR);
            }
        }
    } else if let Some(k) = kmer_size {
        if k == 0 || k > MAX_COUNTING_K {
            error!("--kmer_size must be in [1, {}] when counting inputs", MAX_COUNTING_K);
            std::process::exit(exitcode::DATAERR);
        }

        info!("Counting k-mers from the inputs");
        let mut counts = match KmerCounts::new(k) {
            Ok(counts) => counts,
            Err(e) => {
                error!("Failed to allocate the count table: {}", e);
                std::process::exit(exitcode::DATAERR);
            }
        };
        match counts.count_files(&inputs) {
            Ok(()) => {},
            Err(e) => {
                error!("Failed to count input k-mers: {}", e);
                std::process::exit(exitcode::IOERR);
            }
        };

        let solidity = match abundance {
            Some(threshold) => threshold,
            None => match counts.first_minimum() {
                Some(threshold) => threshold,
                None => {
                    error!("{}", Error::CantComputeAbundance);
                    std::process::exit(exitcode::DATAERR);
                }
            },
        };
        info!("\tminimum solid abundance: {}", solidity);

        Arc::new(CountedKmerSet::new(counts, solidity))
    } else {
        error!("{}", Error::Cli(Cli::NoSolidityNoKmer));
        std::process::exit(exitcode::USAGE);
    };

    //translate the method list into the corrector chain
    let method_chain = match build_methods(methods.as_deref(), &valid_kmer, confirm, max_search) {
        Ok(chain) => Arc::new(chain),
        Err(e) => {
            error!("{}", e);
            std::process::exit(exitcode::USAGE);
        }
    };

    let params = Arc::new(CorrectionParameters {
        two_side: !one_side,
        verbose: verbose_mode,
        threads,
        job_slots,
    });

    info!("Starting read correction processes...");
    match run_correction(&inputs, &outputs, method_chain, params) {
        Ok(stats) => {
            info!(
                "Finished processing {} total reads, {} changed",
                stats.reads_processed, stats.reads_changed
            );
        }
        Err(e) => {
            error!("Correction failed: {}", e);
            std::process::exit(exitcode::IOERR);
        }
    };
}
