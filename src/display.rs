use std::io;
use tui::backend::CrosstermBackend;
use tui::layout::Rect;
use tui::style::{Color, Style};
use tui::symbols::Marker;
use tui::widgets::canvas::{Canvas, Points};
use tui::widgets::{Block, Borders};
use tui::Terminal;

use crate::machine::{GFX_HEIGHT, GFX_SIZE, GFX_WIDTH};

/// Display is used by the interpreter to draw things on the screen. It
/// abstracts the implementation details, so a variety of kinds of screen
/// work. `data` is the machine's framebuffer: one byte per pixel, 0 or 1,
/// row-major from the top left.
pub trait Display {
    fn draw(&mut self, data: &[u8]) -> Result<(), io::Error>;
}

// store useful metadata about the framebuffer we render
struct Resolution(usize, usize);

impl Resolution {
    fn pixel_count(&self) -> usize {
        self.0 * self.1
    }

    fn x_bounds(&self) -> [f64; 2] {
        [0.0, (self.0 - 1) as f64]
    }

    fn y_bounds(&self) -> [f64; 2] {
        [-1.0 * (self.1 - 1) as f64, 0.0]
    }

    /// expand the pixels matching `plane` (0 or 1) into x, y float coords,
    /// suitable for rendering with TUI
    fn plane_from_data<'a>(
        &self,
        data: &'a [u8],
        plane: u8,
    ) -> impl std::iter::Iterator<Item = (f64, f64)> + 'a {
        let mut count = self.pixel_count();
        let w = self.0;
        std::iter::from_fn(move || {
            while count > 0 {
                count -= 1;
                if data[count] == plane {
                    return Some((
                        (count % w) as f64,        // x
                        -1.0 * (count / w) as f64, // y
                    ));
                }
            }
            None
        })
    }
}

/// split a packed 0xRRGGBB value into a TUI colour
fn rgb(c: u32) -> Color {
    Color::Rgb((c >> 16) as u8, (c >> 8) as u8, c as u8)
}

/// monochrome display in a terminal, rendered using TUI and crossterm
pub struct TermDisplay {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    resolution: Resolution,
    viewport: Rect,
    fore: Color,
    back: Color,
    marker: Marker,
}

impl TermDisplay {
    /// `width` and `height` are terminal cells for the outer viewport;
    /// colours are 24-bit 0xRRGGBB values straight off the command line
    pub fn new(
        width: u16,
        height: u16,
        fore: u32,
        back: u32,
        fallback: bool,
    ) -> Result<TermDisplay, io::Error> {
        let backend = CrosstermBackend::new(io::stdout());
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;
        Ok(TermDisplay {
            terminal,
            resolution: Resolution(GFX_WIDTH, GFX_HEIGHT),
            viewport: Rect::new(0, 0, width, height),
            fore: rgb(fore),
            back: rgb(back),
            // not every terminal has the block glyph; dots always render
            marker: if fallback { Marker::Dot } else { Marker::Block },
        })
    }
}

impl Display for TermDisplay {
    fn draw(&mut self, data: &[u8]) -> Result<(), io::Error> {
        // make sure we're given exactly the right amount of data to draw
        assert_eq!(
            data.len(),
            self.resolution.pixel_count(),
            "TermDisplay must have correct-sized data to draw"
        );

        // this assumes a 1:1 ratio between terminal cells, chip8 pixels and
        // the internal TUI canvas
        self.terminal.draw(|f| {
            let size = self.viewport.intersection(f.size());

            let canvas = Canvas::default()
                .block(
                    Block::default()
                        .title("CHIP-8")
                        .borders(Borders::ALL)
                        .style(Style::default().bg(self.back)),
                )
                .x_bounds(self.resolution.x_bounds())
                .y_bounds(self.resolution.y_bounds())
                .marker(self.marker)
                .paint(|ctx| {
                    ctx.draw(&Points {
                        coords: &self
                            .resolution
                            .plane_from_data(data, 0)
                            .collect::<Vec<_>>(),
                        color: self.back,
                    });
                    ctx.draw(&Points {
                        coords: &self
                            .resolution
                            .plane_from_data(data, 1)
                            .collect::<Vec<_>>(),
                        color: self.fore,
                    });
                });
            f.render_widget(canvas, size);
        })?;
        Ok(())
    }
}

/// useful for testing non-display routines; counts the frames it was handed
pub struct DummyDisplay {
    pub frames: usize,
}

impl DummyDisplay {
    pub fn new() -> DummyDisplay {
        DummyDisplay { frames: 0 }
    }
}

impl Display for DummyDisplay {
    fn draw(&mut self, data: &[u8]) -> Result<(), io::Error> {
        assert_eq!(data.len(), GFX_SIZE);
        self.frames += 1;
        Ok(())
    }
}
