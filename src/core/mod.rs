pub mod error;
pub mod geometry;
pub mod interpreter;
pub mod lexer;
pub mod merger;
pub mod options;
pub mod pipeline;
pub mod reconstructor;
pub mod resources;

pub use error::{PDFError, PDFResult};
pub use interpreter::{Interpreter, LineSegment, TextFragment};
pub use lexer::{Lexer, Token};
pub use merger::{coalesce_lines, merge_text_fragments, Orientation, RuledLine, TextElement};
pub use options::{ExtractionOptions, ProcessingMode};
pub use pipeline::extract_tables;
pub use reconstructor::{reconstruct_tables, Bounds, Table, TableCell};
pub use resources::{NoResources, PageResources, DEFAULT_ADVANCE_RATIO};
