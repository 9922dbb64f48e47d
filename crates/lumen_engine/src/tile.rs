//! Image tessellation for the parallel renderer.
//!
//! The image is cut into an `n × n` grid of roughly equal tiles, where `n`
//! is the ceiling of the square root of the worker count. Tiles are handed
//! out center-first so the middle of the frame converges first.

/// A rectangular region of the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    /// X coordinate of the tile's top-left corner
    pub x: u32,
    /// Y coordinate of the tile's top-left corner
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Position in dispatch order
    pub index: usize,
}

impl Tile {
    pub fn new(x: u32, y: u32, width: u32, height: u32, index: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
            index,
        }
    }

    pub fn pixel_count(&self) -> usize {
        (self.width * self.height) as usize
    }

    /// Image coordinates of every pixel, row-major within the tile.
    pub fn pixels(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        (self.y..self.y + self.height).flat_map(move |y| (self.x..self.x + self.width).map(move |x| (x, y)))
    }
}

/// Tiles along each axis for `cores` workers.
pub fn tiles_per_axis(cores: usize) -> u32 {
    (cores.max(1) as f64).sqrt().ceil() as u32
}

/// Split a `width × height` image into `per_axis²` tiles, sorted center-first.
///
/// Edges are distributed as evenly as integer division allows; when the
/// image is narrower than `per_axis` the empty columns or rows are dropped.
pub fn generate_tiles(width: u32, height: u32, per_axis: u32) -> Vec<Tile> {
    let per_axis = per_axis.max(1);
    let edges = |extent: u32| -> Vec<u32> {
        (0..=per_axis)
            .map(|i| (extent as u64 * i as u64 / per_axis as u64) as u32)
            .collect()
    };
    let xs = edges(width);
    let ys = edges(height);

    let mut tiles = Vec::with_capacity((per_axis * per_axis) as usize);
    for row in ys.windows(2) {
        for col in xs.windows(2) {
            let (w, h) = (col[1] - col[0], row[1] - row[0]);
            if w > 0 && h > 0 {
                tiles.push(Tile::new(col[0], row[0], w, h, tiles.len()));
            }
        }
    }

    sort_spiral(&mut tiles, width, height);
    for (i, tile) in tiles.iter_mut().enumerate() {
        tile.index = i;
    }
    tiles
}

/// Sort tiles by distance of their centers from the image center.
fn sort_spiral(tiles: &mut [Tile], width: u32, height: u32) {
    let center_x = width as f32 / 2.0;
    let center_y = height as f32 / 2.0;
    let dist = |t: &Tile| {
        let x = t.x as f32 + t.width as f32 / 2.0;
        let y = t.y as f32 + t.height as f32 / 2.0;
        (x - center_x).powi(2) + (y - center_y).powi(2)
    };
    tiles.sort_by(|a, b| dist(a).total_cmp(&dist(b)));
}
