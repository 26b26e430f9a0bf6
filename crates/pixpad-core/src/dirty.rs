/// Sparse pixel regions touched by interactive tools.
///
/// A [`Dirty`] lists, row by row, horizontal runs of pixels together with
/// their bytes. Capturing or applying a dirty region touches only the listed
/// pixels, which keeps brush strokes cheap to snapshot.
use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::image::{Image, PixelFormat};

/// Consecutive pixels on one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirtyRun {
    pub x: u32,
    pub width: u32,
    pub pixels: Vec<u8>,
}

impl DirtyRun {
    /// One past the last column, widened so runs near `u32::MAX` can't wrap.
    fn end(&self) -> u64 {
        self.x as u64 + self.width as u64
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirtyRow {
    pub y: u32,
    /// Runs sorted by `x`, never overlapping.
    pub runs: Vec<DirtyRun>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dirty {
    format: PixelFormat,
    rows: Vec<DirtyRow>,
}

impl Dirty {
    pub fn new(format: PixelFormat) -> Self {
        Self {
            format,
            rows: Vec::new(),
        }
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn rows(&self) -> &[DirtyRow] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Total number of listed pixels.
    pub fn pixel_count(&self) -> usize {
        self.rows
            .iter()
            .flat_map(|row| row.runs.iter())
            .map(|run| run.width as usize)
            .sum()
    }

    /// Sets the pixel at (`x`, `y`) to a packed `value`, extending an
    /// adjacent run when possible.
    pub fn put_pixel(&mut self, x: u32, y: u32, value: u32) {
        let bpp = self.format.bytes_per_pixel();
        let bytes = value.to_le_bytes();
        let bytes = &bytes[..bpp];

        let row_at = match self.rows.binary_search_by_key(&y, |row| row.y) {
            Ok(i) => i,
            Err(i) => {
                self.rows.insert(i, DirtyRow { y, runs: Vec::new() });
                i
            }
        };
        let runs = &mut self.rows[row_at].runs;

        if let Some(run) = runs.iter_mut().find(|run| x >= run.x && (x as u64) < run.end()) {
            let at = (x - run.x) as usize * bpp;
            run.pixels[at..at + bpp].copy_from_slice(bytes);
            return;
        }
        for run in runs.iter_mut() {
            if x as u64 == run.end() {
                run.width += 1;
                run.pixels.extend_from_slice(bytes);
                return;
            }
        }

        let insert_at = runs.partition_point(|run| run.x < x);
        runs.insert(
            insert_at,
            DirtyRun {
                x,
                width: 1,
                pixels: bytes.to_vec(),
            },
        );
    }

    fn check_fits(&self, image: &Image) -> Result<()> {
        if image.format() != self.format {
            anyhow::bail!(
                "dirty region is {} but image is {}",
                self.format.name(),
                image.format().name()
            );
        }
        for row in &self.rows {
            for run in &row.runs {
                if row.y >= image.height() || run.end() > image.width() as u64 {
                    anyhow::bail!(
                        "dirty run at ({}, {}) width {} outside {}x{} image",
                        run.x,
                        row.y,
                        run.width,
                        image.width(),
                        image.height()
                    );
                }
            }
        }
        Ok(())
    }

    /// Copy of this region holding `image`'s current pixels instead.
    ///
    /// # Errors
    ///
    /// Returns an error if formats differ or a run lies outside the image.
    pub fn capture_from(&self, image: &Image) -> Result<Dirty> {
        self.check_fits(image)?;
        let rows = self
            .rows
            .iter()
            .map(|row| DirtyRow {
                y: row.y,
                runs: row
                    .runs
                    .iter()
                    .map(|run| DirtyRun {
                        x: run.x,
                        width: run.width,
                        pixels: image.span(run.x, row.y, run.width).to_vec(),
                    })
                    .collect(),
            })
            .collect();
        Ok(Dirty {
            format: self.format,
            rows,
        })
    }

    /// Writes the listed pixels into `image`.
    pub fn apply_to(&self, image: &mut Image) -> Result<()> {
        self.check_fits(image)?;
        for row in &self.rows {
            for run in &row.runs {
                image
                    .span_mut(run.x, row.y, run.width)
                    .copy_from_slice(&run.pixels);
            }
        }
        Ok(())
    }
}
