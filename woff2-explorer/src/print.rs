//! glyph printing

use std::io::{IsTerminal, Write};

use ansi_term::{Color, Style};
use read_woff2::{Glyph, GlyphKind};

pub struct GlyphPrinter<'a> {
    is_tty: bool,
    writer: Box<dyn Write + 'a>,
}

impl GlyphPrinter<'_> {
    pub fn stdout() -> Self {
        let stdout = std::io::stdout();
        GlyphPrinter {
            is_tty: stdout.is_terminal(),
            writer: Box::new(stdout.lock()),
        }
    }

    fn styled(&self, style: Style, text: impl std::fmt::Display) -> String {
        if self.is_tty {
            style.paint(text.to_string()).to_string()
        } else {
            text.to_string()
        }
    }

    /// Print a one line summary, followed by the contours if `points` is set.
    pub fn print_glyph(&mut self, glyph: &Glyph, points: bool) -> std::io::Result<()> {
        let bounds = glyph.bounds();
        let name = self.styled(Style::new().bold(), format!("glyph {}", glyph.glyph_id()));
        let kind = match glyph.kind() {
            GlyphKind::Outline(outline) => format!(
                "{} contours, {} points, {} instruction bytes",
                outline.num_contours(),
                outline.points.len(),
                outline.instructions.as_ref().map(Vec::len).unwrap_or_default()
            ),
            GlyphKind::CompactFontOutline(_) => "cff".into(),
            GlyphKind::Bitmap(_) => "bitmap".into(),
            GlyphKind::LayoutOnly => "layout only".into(),
        };
        writeln!(
            self.writer,
            "{name}: {kind} [{}, {}, {}, {}]",
            bounds.x_min, bounds.y_min, bounds.x_max, bounds.y_max
        )?;
        if !points {
            return Ok(());
        }
        let Some(outline) = glyph.outline() else {
            return Ok(());
        };
        for (i, contour) in outline.contours().enumerate() {
            let label = self.styled(Color::Cyan.normal(), format!("  contour {i}"));
            writeln!(self.writer, "{label}")?;
            for point in contour {
                let marker = if point.on_curve { "on " } else { "off" };
                writeln!(self.writer, "    {marker} {:6} {:6}", point.x, point.y)?;
            }
        }
        Ok(())
    }
}
