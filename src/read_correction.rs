
extern crate log;

use std::fs::File;
use std::sync::{mpsc, Arc};

use log::{debug, info};
use needletail::parse_fastx_file;
use threadpool::ThreadPool;

use crate::corrector::Corrector;
use crate::error::{Cli, Error, IO};
use crate::exist::Exist;
use crate::gap_size::GapSize;
use crate::graph::Graph;
use crate::greedy::Greedy;
use crate::kmer_encoding::{encode, reverse_complement_seq};
use crate::kmer_set::{KmerSet, SharedKmerSet};
use crate::ordered_fasta_writer::OrderedFastaWriter;

/// progress is logged every time this many reads have been written
const UPDATE_INTERVAL: u64 = 10000;

/// stores options for running the correction pipeline
pub struct CorrectionParameters {
    /// Also correct the reverse complement so errors near the left edge of a
    /// weak region get a solid anchor on their other side
    pub two_side: bool,
    /// Will calculate per-read solidity statistics if set to `true`
    pub verbose: bool,
    /// The number of correction worker threads
    pub threads: usize,
    /// The maximum number of reads in flight between the parser and the writer
    pub job_slots: u64,
}

impl Default for CorrectionParameters {
    fn default() -> Self {
        Self {
            two_side: true,
            verbose: false,
            threads: 1,
            job_slots: 10000,
        }
    }
}

/// a struct for storing a generic input read
#[derive(Clone, Debug)]
pub struct InputRead {
    /// The index associated with the read
    pub read_index: u64,
    /// The read label/identifier
    pub label: String,
    /// The actual genomic sequence
    pub seq: String,
}

/// a struct for storing the corrected read
#[derive(Clone, Debug)]
pub struct CorrectionResults {
    /// The index associated with the read
    pub read_index: u64,
    /// The read label/identifier
    pub label: String,
    /// The original, uncorrected sequence
    pub original_seq: String,
    /// The modified, corrected sequence
    pub corrected_seq: String,
    /// True if any corrector changed the sequence
    pub changed: bool,
    /// If verbose is set, the fraction of solid k-mers before correction
    pub solid_before: f64,
    /// If verbose is set, the fraction of solid k-mers after correction
    pub solid_after: f64,
}

/// summary statistics for a whole correction run
#[derive(Clone, Copy, Debug, Default)]
pub struct CorrectionStats {
    /// The number of reads that went through the pipeline
    pub reads_processed: u64,
    /// The number of reads at least one corrector changed
    pub reads_changed: u64,
}

/// the ordered corrector chain shared by all worker threads
pub type MethodChain = Vec<Box<dyn Corrector>>;

/// Translates a configuration-level list of method names into live corrector
/// instances sharing the same k-mer set. With no list, the scenario-based
/// corrector alone is used.
/// # Arguments
/// * `methods` - the ordered method names: "exist", "gap_size", "graph" or "greedy"
/// * `valid_kmer` - the solid k-mer set every corrector validates against
/// * `confirm` - the number of solid k-mers required to confirm an edit
/// * `max_search` - the symbol budget for graph walks
pub fn build_methods(
    methods: Option<&[String]>,
    valid_kmer: &SharedKmerSet,
    confirm: u8,
    max_search: u8,
) -> Result<MethodChain, Error> {
    let mut chain: MethodChain = Vec::new();

    if let Some(names) = methods {
        for name in names {
            match name.as_str() {
                "exist" => chain.push(Box::new(Exist::new(valid_kmer.clone(), confirm))),
                "gap_size" => chain.push(Box::new(GapSize::new(
                    valid_kmer.clone(),
                    confirm,
                    max_search,
                ))),
                "graph" => chain.push(Box::new(Graph::new(valid_kmer.clone(), max_search))),
                "greedy" => chain.push(Box::new(Greedy::new(valid_kmer.clone()))),
                _ => {
                    return Err(Error::Cli(Cli::UnknownCorrectionMethod(name.clone())));
                }
            }
        }
    } else {
        chain.push(Box::new(Exist::new(valid_kmer.clone(), confirm)));
    }

    Ok(chain)
}

/// Returns the fraction of read windows that are solid against the set.
/// # Arguments
/// * `valid_kmer` - the solid k-mer set
/// * `seq` - the read to measure
pub fn solid_fraction(valid_kmer: &dyn KmerSet, seq: &[u8]) -> f64 {
    let k = valid_kmer.k() as usize;
    if seq.len() < k {
        return 0.0;
    }

    let mut solid: u64 = 0;
    let mut total: u64 = 0;
    for window in seq.windows(k) {
        total += 1;
        if let Ok(kmer) = encode(window) {
            if valid_kmer.get(kmer) {
                solid += 1;
            }
        }
    }

    solid as f64 / total as f64
}

/// This will run a correction "job" on a single read using the shared
/// corrector chain. Jobs are task-local: nothing is shared between reads
/// except the read-only correctors and their k-mer set.
/// # Arguments
/// * `arc_methods` - the shared ordered corrector chain
/// * `read` - the read to correct
/// * `arc_params` - the shared parameters to use for performing the correction
pub fn correction_job(
    arc_methods: Arc<MethodChain>,
    read: InputRead,
    arc_params: Arc<CorrectionParameters>,
) -> CorrectionResults {
    let methods: &MethodChain = &arc_methods;
    let params: &CorrectionParameters = &arc_params;

    let mut seq: Vec<u8> = read.seq.as_bytes().to_vec();
    for method in methods.iter() {
        seq = method.correct(&seq);
    }

    if params.two_side {
        //errors at the left edge of a weak region only have a solid anchor on
        //their right, so run the chain over the reverse complement as well
        seq = reverse_complement_seq(&seq);
        for method in methods.iter() {
            seq = method.correct(&seq);
        }
        seq = reverse_complement_seq(&seq);
    }

    let (solid_before, solid_after) = match (params.verbose, methods.first()) {
        (true, Some(method)) => (
            solid_fraction(method.valid_kmer(), read.seq.as_bytes()),
            solid_fraction(method.valid_kmer(), &seq),
        ),
        _ => (0.0, 0.0),
    };

    let corrected_seq = String::from_utf8_lossy(&seq).into_owned();
    let changed = corrected_seq != read.seq;

    debug!("read {} corrected: {}", read.read_index, changed);

    CorrectionResults {
        read_index: read.read_index,
        label: read.label,
        original_seq: read.seq,
        corrected_seq,
        changed,
        solid_before,
        solid_after,
    }
}

/// The orchestration entry point: streams every input file through the
/// corrector chain on a worker pool and writes each output file in input
/// order. Only structural failures surface as errors; an uncorrectable read
/// is simply passed through and counted.
/// # Arguments
/// * `inputs` - the FASTA/FASTQ files to correct
/// * `outputs` - one output path per input path
/// * `methods` - the shared ordered corrector chain
/// * `params` - the shared pipeline parameters
pub fn run_correction(
    inputs: &[String],
    outputs: &[String],
    methods: Arc<MethodChain>,
    params: Arc<CorrectionParameters>,
) -> Result<CorrectionStats, Error> {
    if inputs.len() != outputs.len() {
        return Err(Error::Cli(Cli::NotSameNumberOfInAndOut));
    }

    let pool = ThreadPool::new(params.threads);
    let mut stats = CorrectionStats::default();

    for (input, output) in inputs.iter().zip(outputs.iter()) {
        info!("Correcting \"{}\" into \"{}\"", input, output);

        let write_file: File = File::create(output).map_err(|_| Error::IO(IO::CantCreateFile))?;
        let mut fasta_writer = OrderedFastaWriter::new(&write_file);

        let mut fastx_reader = parse_fastx_file(input).map_err(|_| Error::IO(IO::CantOpenFile))?;

        let (tx, rx) = mpsc::channel();
        let mut jobs_queued: u64 = 0;
        let mut results_received: u64 = 0;

        while let Some(raw_record) = fastx_reader.next() {
            let record = raw_record.map_err(|_| Error::IO(IO::ErrorDuringRead))?;

            //if we've filled our queue, then we should wait until we get some results back
            if jobs_queued - results_received >= params.job_slots {
                let rx_value: CorrectionResults =
                    rx.recv().expect("worker threads hung up unexpectedly");
                write_result(rx_value, &mut fasta_writer, &mut stats, &params)?;
                results_received += 1;
            }

            //clone the transmit channel and submit the pool job
            let tx = tx.clone();
            let arc_methods = methods.clone();
            let arc_params = params.clone();
            let read = InputRead {
                read_index: jobs_queued,
                label: String::from_utf8_lossy(record.id()).into_owned(),
                seq: String::from_utf8_lossy(&record.seq()).into_owned(),
            };
            pool.execute(move || {
                let results: CorrectionResults = correction_job(arc_methods, read, arc_params);
                tx.send(results)
                    .expect("channel will be there waiting for the pool");
            });
            jobs_queued += 1;
        }

        while results_received < jobs_queued {
            let rx_value: CorrectionResults =
                rx.recv().expect("worker threads hung up unexpectedly");
            write_result(rx_value, &mut fasta_writer, &mut stats, &params)?;
            results_received += 1;
        }

        fasta_writer
            .flush()
            .map_err(|_| Error::IO(IO::ErrorDuringWrite))?;

        info!("Finished \"{}\": {} reads", input, jobs_queued);
    }

    Ok(stats)
}

fn write_result<W: std::io::Write>(
    results: CorrectionResults,
    fasta_writer: &mut OrderedFastaWriter<W>,
    stats: &mut CorrectionStats,
    params: &CorrectionParameters,
) -> Result<(), Error> {
    if params.verbose {
        info!(
            "Read #{}: solid fraction {:.2} -> {:.2}",
            results.read_index, results.solid_before, results.solid_after
        );
    }

    stats.reads_processed += 1;
    if results.changed {
        stats.reads_changed += 1;
    }

    fasta_writer
        .write_correction(results)
        .map_err(|_| Error::IO(IO::ErrorDuringWrite))?;

    if stats.reads_processed % UPDATE_INTERVAL == 0 {
        info!("Processed {} reads...", stats.reads_processed);
    }

    Ok(())
}
