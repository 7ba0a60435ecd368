//! Container reader and writer.
//!
//! # Layout
//! ```text
//! ┌────────┬──────────────────────────────┬──────────────┬────────┐
//! │ Header │ Data: entry streams, packed  │ Table stream │ Footer │
//! │  4 B   │ back to back, no delimiters  │  (DEFLATE)   │  16 B  │
//! └────────┴──────────────────────────────┴──────────────┴────────┘
//! ```
//!
//! # Writer
//! [`BarWriter`] only needs [`std::io::Write`]: it tracks absolute offsets by
//! counting compressed bytes as each entry is finalized, so it never seeks.
//!
//! # Reader
//! [`BarReader`] needs `Read + Seek`.  It reads the footer from the end of
//! the source, then the table, and serves entries in any order.
//!
//! # Endianness
//! All integers are little-endian; see `header.rs` and `entry.rs` for the
//! field layouts.

mod reader;
mod writer;

pub use reader::BarReader;
pub use writer::BarWriter;
