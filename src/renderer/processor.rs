use rayon::prelude::*;

use super::cell::CellData;
use crate::core::format::FrameGeometry;

/// Scales a frame's luma plane onto a grid of half-block cells.
///
/// Each cell covers one pixel column and two pixel rows of the scaled canvas.
pub struct FrameProcessor {
    geometry: FrameGeometry,
    cols: usize,
    rows: usize,
}

impl FrameProcessor {
    /// Largest grid that fits `max_cols` x `max_rows` cells and keeps the
    /// frame's aspect ratio (half-block pixels are roughly square).
    pub fn fit(geometry: FrameGeometry, max_cols: u16, max_rows: u16) -> Self {
        let w = geometry.width() as f64;
        let h = geometry.height() as f64;
        let max_w = max_cols.max(1) as f64;
        let max_h = max_rows.max(1) as f64 * 2.0;

        let scale = (max_w / w).min(max_h / h);
        let cols = ((w * scale).round() as usize).clamp(1, max_cols.max(1) as usize);
        let pixel_rows = ((h * scale).round() as usize).max(1);
        let rows = ((pixel_rows + 1) / 2).clamp(1, max_rows.max(1) as usize);

        Self { geometry, cols, rows }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cell_count(&self) -> usize {
        self.cols * self.rows
    }

    #[cfg(test)]
    pub fn process_frame(&self, frame: &[u8]) -> Vec<CellData> {
        let mut cells = vec![CellData::default(); self.cell_count()];
        self.process_frame_into(frame, &mut cells);
        cells
    }

    pub fn process_frame_into(&self, frame: &[u8], cells: &mut Vec<CellData>) {
        cells.resize(self.cell_count(), CellData::default());

        let cols = self.cols;
        let canvas_h = self.rows * 2;
        let src_w = self.geometry.width() as usize;
        let src_h = self.geometry.height() as usize;

        let chunk_size = (cells.len() / rayon::current_num_threads().max(1)).clamp(1, 2000);

        cells
            .par_chunks_mut(chunk_size)
            .enumerate()
            .for_each(|(chunk_idx, chunk)| {
                let start_idx = chunk_idx * chunk_size;

                for (i, cell) in chunk.iter_mut().enumerate() {
                    let idx = start_idx + i;
                    let cx = idx % cols;
                    let cy = idx / cols;

                    // Nearest-neighbour source pixel for a canvas position.
                    let sample = |py: usize| -> u8 {
                        let sx = (cx * src_w / cols) as u32;
                        let sy = (py * src_h / canvas_h) as u32;
                        self.geometry.luma_at(frame, sx, sy).unwrap_or(0)
                    };

                    *cell = CellData {
                        top: sample(cy * 2),
                        bottom: sample(cy * 2 + 1),
                    };
                }
            });
    }
}
