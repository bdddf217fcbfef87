//! Content-stream operator interpreter (spec §4.2).
//!
//! Consumes the token stream produced by the [`super::lexer::Lexer`],
//! maintains a graphics/text state stack, and emits two parallel
//! sequences: positioned [`TextFragment`]s and stroked [`LineSegment`]s,
//! both in page (user-space) coordinates.

use smallvec::SmallVec;
use tracing::warn;

use super::error::PDFResult;
use super::geometry::{self, Matrix, Point, IDENTITY};
use super::lexer::Token;
use super::resources::{PageResources, DEFAULT_ADVANCE_RATIO};

const MIN_LINE_LENGTH: f64 = 10.0;
const LINE_EPSILON: f64 = 2.0;

/// A single positioned text emission, one per `Tj` call or per string
/// element of a `TJ` array.
#[derive(Debug, Clone, PartialEq)]
pub struct TextFragment {
    pub text: String,
    pub origin: Point,
    pub advance_width: f64,
    pub font_size: f64,
    pub font_resource_name: String,
}

/// A straight stroked segment, already classified as (approximately)
/// horizontal or vertical and long enough to matter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSegment {
    pub start: Point,
    pub end: Point,
    pub stroke_width: f64,
}

#[derive(Clone)]
struct GfxState {
    ctm: Matrix,
    text_matrix: Matrix,
    text_line_matrix: Matrix,
    font_resource_name: String,
    font_size: f64,
    leading: f64,
    stroke_width: f64,
}

impl Default for GfxState {
    fn default() -> Self {
        GfxState {
            ctm: IDENTITY,
            text_matrix: IDENTITY,
            text_line_matrix: IDENTITY,
            font_resource_name: String::new(),
            font_size: 0.0,
            leading: 0.0,
            stroke_width: 1.0,
        }
    }
}

/// Consumes a token stream and produces positioned text fragments and
/// stroked line segments for one page.
pub struct Interpreter<'r> {
    resources: Option<&'r dyn PageResources>,
    stack: Vec<GfxState>,
    state: GfxState,
    subpaths: Vec<Vec<Point>>,
    fragments: Vec<TextFragment>,
    lines: Vec<LineSegment>,
}

impl<'r> Interpreter<'r> {
    pub fn new(resources: Option<&'r dyn PageResources>) -> Self {
        Interpreter {
            resources,
            stack: Vec::new(),
            state: GfxState::default(),
            subpaths: Vec::new(),
            fragments: Vec::new(),
            lines: Vec::new(),
        }
    }

    /// Runs the interpreter to completion over a token iterator. Returns
    /// the fragments and lines emitted so far, or propagates a lexer
    /// error (`MalformedStream`) unchanged — per spec §4.4's failure
    /// model a broken tail means no partial emission.
    pub fn run(
        mut self,
        tokens: impl Iterator<Item = PDFResult<Token>>,
    ) -> PDFResult<(Vec<TextFragment>, Vec<LineSegment>)> {
        let mut args: SmallVec<[Token; 8]> = SmallVec::new();
        for token in tokens {
            let token = token?;
            match token {
                Token::Operator(op) => {
                    self.dispatch(&op, &args);
                    args.clear();
                }
                other => args.push(other),
            }
        }
        Ok((self.fragments, self.lines))
    }

    fn dispatch(&mut self, op: &str, args: &[Token]) {
        match op {
            "q" => self.op_save(),
            "Q" => self.op_restore(),
            "cm" => self.op_concat_matrix(op, args),
            "w" => self.op_set_stroke_width(op, args),
            "BT" => self.op_begin_text(),
            "ET" => {}
            "Tf" => self.op_set_font(op, args),
            "Tm" => self.op_set_text_matrix(op, args),
            "Td" => self.op_move_text(op, args),
            "TD" => self.op_move_text_set_leading(op, args),
            "T*" => self.op_next_line(),
            "Tj" => self.op_show_text(op, args),
            "'" => self.op_next_line_show_text(op, args),
            "\"" => self.op_set_spacing_show_text(op, args),
            "TJ" => self.op_show_spaced_text(op, args),
            "m" => self.op_move_to(op, args),
            "l" => self.op_line_to(op, args),
            "h" => self.op_close_path(),
            "S" => self.op_stroke(false),
            "s" => self.op_stroke(true),
            "n" | "f" | "F" | "f*" | "B" | "B*" | "b" | "b*" => self.subpaths.clear(),
            _ => {}
        }
    }

    fn op_save(&mut self) {
        self.stack.push(self.state.clone());
    }

    fn op_restore(&mut self) {
        if let Some(prev) = self.stack.pop() {
            self.state = prev;
        }
    }

    fn op_concat_matrix(&mut self, op: &str, args: &[Token]) {
        match numbers::<6>(args) {
            Some(m) => self.state.ctm = geometry::multiply(m, self.state.ctm),
            None => warn_bad_operand(op, args),
        }
    }

    fn op_set_stroke_width(&mut self, op: &str, args: &[Token]) {
        match numbers::<1>(args) {
            Some([w]) => self.state.stroke_width = w,
            None => warn_bad_operand(op, args),
        }
    }

    fn op_begin_text(&mut self) {
        self.state.text_matrix = IDENTITY;
        self.state.text_line_matrix = IDENTITY;
    }

    fn op_set_font(&mut self, op: &str, args: &[Token]) {
        if args.len() != 2 {
            warn_bad_operand(op, args);
            return;
        }
        match (&args[0], &args[1]) {
            (Token::Name(name), Token::Number(size)) => {
                self.state.font_resource_name = name.clone();
                self.state.font_size = *size;
            }
            _ => warn_bad_operand(op, args),
        }
    }

    fn op_set_text_matrix(&mut self, op: &str, args: &[Token]) {
        match numbers::<6>(args) {
            Some(m) => {
                self.state.text_matrix = m;
                self.state.text_line_matrix = m;
            }
            None => warn_bad_operand(op, args),
        }
    }

    fn op_move_text(&mut self, op: &str, args: &[Token]) {
        match numbers::<2>(args) {
            Some([tx, ty]) => {
                let m = geometry::multiply(geometry::translate(tx, ty), self.state.text_line_matrix);
                self.state.text_line_matrix = m;
                self.state.text_matrix = m;
            }
            None => warn_bad_operand(op, args),
        }
    }

    fn op_move_text_set_leading(&mut self, op: &str, args: &[Token]) {
        match numbers::<2>(args) {
            Some([tx, ty]) => {
                self.state.leading = -ty;
                let m = geometry::multiply(geometry::translate(tx, ty), self.state.text_line_matrix);
                self.state.text_line_matrix = m;
                self.state.text_matrix = m;
            }
            None => warn_bad_operand(op, args),
        }
    }

    fn op_next_line(&mut self) {
        let leading = self.state.leading;
        let m = geometry::multiply(geometry::translate(0.0, -leading), self.state.text_line_matrix);
        self.state.text_line_matrix = m;
        self.state.text_matrix = m;
    }

    fn op_show_text(&mut self, op: &str, args: &[Token]) {
        if args.len() != 1 {
            warn_bad_operand(op, args);
            return;
        }
        match string_bytes(&args[0]) {
            Some(bytes) => self.show_string(bytes),
            None => warn_bad_operand(op, args),
        }
    }

    fn op_next_line_show_text(&mut self, op: &str, args: &[Token]) {
        if args.len() != 1 {
            warn_bad_operand(op, args);
            return;
        }
        match string_bytes(&args[0]) {
            Some(bytes) => {
                self.op_next_line();
                self.show_string(bytes);
            }
            None => warn_bad_operand(op, args),
        }
    }

    fn op_set_spacing_show_text(&mut self, op: &str, args: &[Token]) {
        if args.len() != 3 {
            warn_bad_operand(op, args);
            return;
        }
        match string_bytes(&args[2]) {
            Some(bytes) => {
                self.op_next_line();
                self.show_string(bytes);
            }
            None => warn_bad_operand(op, args),
        }
    }

    fn op_show_spaced_text(&mut self, op: &str, args: &[Token]) {
        if args.len() != 1 {
            warn_bad_operand(op, args);
            return;
        }
        let elements = match &args[0] {
            Token::Array(items) => items,
            _ => {
                warn_bad_operand(op, args);
                return;
            }
        };
        for element in elements {
            match element {
                Token::Number(n) => {
                    let shift = -n / 1000.0 * self.state.font_size;
                    let m = geometry::multiply(geometry::translate(shift, 0.0), self.state.text_matrix);
                    self.state.text_matrix = m;
                }
                Token::String(bytes) | Token::HexString(bytes) => {
                    self.show_string(bytes.clone());
                }
                _ => {}
            }
        }
    }

    fn show_string(&mut self, bytes: Vec<u8>) {
        let render_matrix = geometry::multiply(self.state.text_matrix, self.state.ctm);
        let origin = geometry::origin(render_matrix);
        let text = String::from_utf8_lossy(&bytes).into_owned();
        let width = self.measure_width(&bytes);

        if width > 0.0 && self.state.font_size > 0.0 {
            self.fragments.push(TextFragment {
                text,
                origin,
                advance_width: width,
                font_size: self.state.font_size,
                font_resource_name: self.state.font_resource_name.clone(),
            });
        }

        let advance = geometry::multiply(geometry::translate(width, 0.0), self.state.text_matrix);
        self.state.text_matrix = advance;
    }

    fn measure_width(&self, bytes: &[u8]) -> f64 {
        let font_size = self.state.font_size;
        bytes
            .iter()
            .map(|&b| {
                self.resources
                    .and_then(|r| r.char_width(&self.state.font_resource_name, b))
                    .map(|ratio| ratio * font_size)
                    .unwrap_or(DEFAULT_ADVANCE_RATIO * font_size)
            })
            .sum()
    }

    fn op_move_to(&mut self, op: &str, args: &[Token]) {
        match numbers::<2>(args) {
            Some([x, y]) => self.subpaths.push(vec![Point::new(x, y)]),
            None => warn_bad_operand(op, args),
        }
    }

    fn op_line_to(&mut self, op: &str, args: &[Token]) {
        match numbers::<2>(args) {
            Some([x, y]) => {
                if let Some(subpath) = self.subpaths.last_mut() {
                    subpath.push(Point::new(x, y));
                } else {
                    self.subpaths.push(vec![Point::new(x, y)]);
                }
            }
            None => warn_bad_operand(op, args),
        }
    }

    fn op_close_path(&mut self) {
        if let Some(subpath) = self.subpaths.last_mut() {
            if let Some(&first) = subpath.first() {
                subpath.push(first);
            }
        }
    }

    fn op_stroke(&mut self, close: bool) {
        if close {
            self.op_close_path();
        }
        let ctm = self.state.ctm;
        let stroke_width = self.state.stroke_width;
        for subpath in &self.subpaths {
            for pair in subpath.windows(2) {
                let start = geometry::apply(ctm, pair[0]);
                let end = geometry::apply(ctm, pair[1]);
                if let Some(segment) = classify_segment(start, end, stroke_width) {
                    self.lines.push(segment);
                }
            }
        }
        self.subpaths.clear();
    }
}

fn classify_segment(start: Point, end: Point, stroke_width: f64) -> Option<LineSegment> {
    let dx = (end.x - start.x).abs();
    let dy = (end.y - start.y).abs();
    let is_horizontal = dy < LINE_EPSILON;
    let is_vertical = dx < LINE_EPSILON;
    if !is_horizontal && !is_vertical {
        return None;
    }
    let length = if is_horizontal { dx } else { dy };
    if length < MIN_LINE_LENGTH {
        return None;
    }
    Some(LineSegment {
        start,
        end,
        stroke_width,
    })
}

fn warn_bad_operand(operator: &str, args: &[Token]) {
    warn!(operator, argument_count = args.len(), "invalid operand, skipping");
}

fn numbers<const N: usize>(args: &[Token]) -> Option<[f64; N]> {
    if args.len() != N {
        return None;
    }
    let mut out = [0.0; N];
    for (slot, arg) in out.iter_mut().zip(args) {
        match arg {
            Token::Number(n) => *slot = *n,
            _ => return None,
        }
    }
    Some(out)
}

fn string_bytes(token: &Token) -> Option<Vec<u8>> {
    match token {
        Token::String(bytes) | Token::HexString(bytes) => Some(bytes.clone()),
        _ => None,
    }
}
