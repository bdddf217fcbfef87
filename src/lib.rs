pub mod core;
pub mod loader;
pub mod writer;

pub use core::{
    extract_tables, Bounds, ExtractionOptions, PDFError, PDFResult, ProcessingMode, Table,
    TableCell,
};
pub use loader::{LoadedPage, PdfLoader};
pub use writer::{write_tables_csv, WriterError};
