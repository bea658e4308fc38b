//! HTML rendering of the media grid.

mod grid;

pub use grid::{escape_html, render_empty, render_grid, MAX_COLS, MIN_COLS};
