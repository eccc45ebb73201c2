
pub mod corrector;
pub mod error;
pub mod exist;
pub mod gap_size;
pub mod graph;
pub mod greedy;
pub mod kmer_encoding;
pub mod kmer_set;
pub mod ordered_fasta_writer;
pub mod read_correction;
pub mod scenario;
