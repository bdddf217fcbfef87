//! Pluggable character-width resolution (spec §6 `page_resources`).

/// Default advance used when no [`PageResources`] is supplied, or when
/// the supplied one cannot resolve a given font resource / byte.
pub const DEFAULT_ADVANCE_RATIO: f64 = 0.6;

/// Opaque handle the interpreter uses to resolve a font resource name to
/// a character-width function. Implementations typically wrap a parsed
/// font program or a width table pulled from a page's `/Resources`
/// dictionary; the core never constructs one itself.
pub trait PageResources {
    /// Returns the advance width, in unscaled text-space units (i.e.
    /// already divided by 1000 and ready to multiply by `font_size`), for
    /// one byte of a string shown under the given font resource name.
    /// `None` means the resource or glyph could not be resolved, and the
    /// caller should fall back to the default approximation.
    fn char_width(&self, font_resource_name: &str, byte: u8) -> Option<f64>;
}

/// A `PageResources` with no data — always falls back to the default
/// approximation. Used when the caller has no width information at all.
pub struct NoResources;

impl PageResources for NoResources {
    fn char_width(&self, _font_resource_name: &str, _byte: u8) -> Option<f64> {
        None
    }
}
