pub mod bytes;
pub mod checksum;
pub mod stream;
pub mod entry;
pub mod header;
pub mod io_stream;
pub mod error;
pub mod inputs;
pub mod archive;

pub use entry::{Entry, validate_name};
pub use error::{Error, Result};
pub use header::{Header, Footer, VERSION};
pub use io_stream::{BarReader, BarWriter};
pub use stream::EntryReader;
pub use flate2::Compression;
