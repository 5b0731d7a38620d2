/// Arrow IPC stream and Parquet codecs for datasets
pub mod builder;
pub mod parquet_io;
pub mod parser;

pub use builder::{build_dataset_ipc, dataset_to_batch};
pub use parquet_io::{read_parquet, write_parquet};
pub use parser::{batches_to_dataset, parse_arrow_ipc};
