//! Print the contents of WOFF2 fonts.
//!
//! Lists the table directory, or decodes the transformed `glyf` table and
//! prints a summary of each glyph.

use read_woff2::{DecodeOptions, Woff2Font};

mod print;

use print::GlyphPrinter;

fn main() -> Result<(), Error> {
    env_logger::init();
    let args = flags::Args::from_env().map_err(|e| Error(e.to_string()))?;
    let bytes = std::fs::read(&args.input)
        .map_err(|e| Error(format!("could not read '{}': {e}", args.input.display())))?;
    let mut options = DecodeOptions::default();
    if let Some(depth) = args.max_depth {
        options = options.with_max_component_depth(depth);
    }
    let font = Woff2Font::with_options(&bytes, options).map_err(Error::new)?;
    log::debug!("read {} bytes from {}", bytes.len(), args.input.display());

    if args.list {
        list_tables(&font);
        return Ok(());
    }

    let glyphs = font.glyphs().map_err(Error::new)?;
    let mut printer = GlyphPrinter::stdout();
    match args.glyph {
        Some(gid) => {
            let glyph = glyphs
                .get(gid)
                .ok_or_else(|| Error(format!("no glyph {gid} in font")))?;
            printer.print_glyph(glyph, true).map_err(Error::new)?;
        }
        None => {
            for glyph in &glyphs {
                printer.print_glyph(glyph, args.glyphs).map_err(Error::new)?;
            }
        }
    }
    Ok(())
}

fn list_tables(font: &Woff2Font) {
    let header = font.header();
    println!(
        "flavor {}  {} tables  sfnt size {}  compressed {}",
        header.flavor, header.num_tables, header.total_sfnt_size, header.total_compressed_size
    );
    println!("Tag  Offset   OrigLen  Stored  Transform");
    println!("-----------------------------------------");
    for entry in font.table_directory() {
        println!(
            "{} 0x{:06X} {:8} {:7} {}",
            entry.tag,
            entry.offset,
            entry.orig_length,
            entry.stored_len(),
            entry.transform_version()
        );
    }
}

#[derive(Debug, Clone)]
struct Error(String);

impl Error {
    fn new(t: impl std::fmt::Display) -> Self {
        Self(t.to_string())
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for Error {}

mod flags {
    use std::path::PathBuf;

    xflags::xflags! {
        /// Inspect WOFF2 fonts
        cmd args {
            required input: PathBuf
                /// Print the table directory.
                optional -l, --list
                /// Print the points of every glyph.
                optional -g, --glyphs
                /// Print a single glyph.
                optional --glyph glyph: u16
                /// Maximum composite nesting depth.
                optional --max-depth max_depth: u16
        }
    }
}
