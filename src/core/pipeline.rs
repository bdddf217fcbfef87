//! Top-level entry point wiring Lexer -> Interpreter -> Merger -> Table
//! Reconstructor for a single page's content stream.

use super::error::PDFResult;
use super::lexer::Lexer;
use super::interpreter::Interpreter;
use super::merger::{coalesce_lines, merge_text_fragments};
use super::options::ExtractionOptions;
use super::reconstructor::{reconstruct_tables, Table};
use super::resources::PageResources;

/// Runs the full pipeline over one page's content-stream bytes.
///
/// Returns `Ok(vec![])` when no table clears the confidence threshold, and
/// propagates a lexer-level [`super::error::PDFError::MalformedStream`] when
/// the stream cannot be tokenized to completion: a broken tail means no
/// partial emission for the page.
pub fn extract_tables(
    content_stream: &[u8],
    page_resources: Option<&dyn PageResources>,
    options: &ExtractionOptions,
    page_number: u32,
) -> PDFResult<Vec<Table>> {
    let lexer = Lexer::new(content_stream);
    let (fragments, segments) = Interpreter::new(page_resources).run(lexer)?;

    let elements = merge_text_fragments(fragments);
    let lines = coalesce_lines(segments);

    Ok(reconstruct_tables(elements, &lines, options, page_number))
}
