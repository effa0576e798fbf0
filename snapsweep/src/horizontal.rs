//! Horizontal edges at the top of a scanbeam.
//!
//! A horizontal edge is traversed in one go: its bound slides along the
//! active bound list, crossing every bound between the two ends of the edge
//! and picking up the hot pixels that lie on the edge.

use crate::{geom::Point, sweep::Sweep, Error};

impl Sweep {
    pub(crate) fn process_horizontals(&mut self, y: f64) -> Result<(), Error> {
        let mut pos = 0;
        while pos < self.abl.len() {
            match self.abl.slot(pos) {
                Some(b) if self.bounds[b.0].current_edge()?.is_horizontal() => {
                    pos = self.process_horizontal(y, pos)?;
                }
                _ => pos += 1,
            }
        }
        self.abl.compact();
        Ok(())
    }

    /// Processes the horizontal edge of the bound at `pos`, returning the
    /// position at which to continue.
    fn process_horizontal(&mut self, y: f64, pos: usize) -> Result<usize, Error> {
        let b = self.abl.get(pos)?;
        let edge = *self.bounds[b.0].current_edge()?;
        if edge.bot.x < edge.top.x {
            self.process_horizontal_left_to_right(y, pos)
        } else {
            self.process_horizontal_right_to_left(y, pos)
        }
    }

    fn process_horizontal_left_to_right(&mut self, y: f64, start: usize) -> Result<usize, Error> {
        let horz = self.abl.get(start)?;
        let edge = *self.bounds[horz.0].current_edge()?;
        let next_dx = self.bounds[horz.0].next_edge().map(|e| e.dx);
        let max_pair = if self.bounds[horz.0].is_maxima(y)? {
            self.bounds[horz.0].maximum_bound
        } else {
            None
        };

        let row = self.rings.hot_pixels.row(y);
        let mut hp = row.start;
        while hp < row.end && self.rings.hot_pixels.get(hp)?.x < edge.bot.x {
            hp += 1;
        }

        let mut pos = start;
        let mut shifted = false;
        let mut next = start + 1;
        while next < self.abl.len() {
            let Some(other) = self.abl.slot(next) else {
                next += 1;
                continue;
            };
            let other_x = self.bounds[other.0].current_x;
            let rounded = self.grid.round(other_x);

            while hp < row.end {
                let pixel = self.rings.hot_pixels.get(hp)?;
                if !(pixel.x < rounded && pixel.x < edge.top.x) {
                    break;
                }
                if self.bounds[horz.0].ring.is_some() {
                    self.rings
                        .add_point_to_ring(&mut self.bounds[horz.0], pixel)?;
                }
                hp += 1;
            }

            if other_x > edge.top.x {
                break;
            }
            // Above the end of the horizontal, a bound with a smaller dx is to
            // the right of the next edge, so there is no crossing.
            if rounded == edge.top.x {
                if let Some(next_dx) = next_dx {
                    if self.bounds[other.0].current_edge()?.dx < next_dx {
                        break;
                    }
                }
            }

            let crossing = Point::new(rounded, y);
            if self.bounds[horz.0].ring.is_some() {
                self.rings
                    .add_point_to_ring(&mut self.bounds[horz.0], crossing)?;
            }

            if Some(other) == max_pair {
                if self.bounds[horz.0].ring.is_some() {
                    self.rings.add_local_maximum_point(
                        &mut self.bounds,
                        &self.abl,
                        horz,
                        other,
                        edge.top,
                    )?;
                }
                self.abl.retire(next);
                self.abl.retire(pos);
                return Ok(if shifted { start } else { start + 1 });
            }

            self.cross_bounds(pos, next, crossing)?;
            pos = next;
            next += 1;
            shifted = true;
        }

        if self.bounds[horz.0].ring.is_some() {
            while hp < row.end {
                let pixel = self.rings.hot_pixels.get(hp)?;
                if pixel.x >= edge.top.x {
                    break;
                }
                self.rings
                    .add_point_to_ring(&mut self.bounds[horz.0], pixel)?;
                hp += 1;
            }
            self.rings
                .add_point_to_ring(&mut self.bounds[horz.0], edge.top)?;
        }

        if self.bounds[horz.0].next_edge().is_some() {
            self.bounds[horz.0].advance(&mut self.scanbeam);
        } else {
            self.abl.retire(pos);
        }
        Ok(if shifted { start } else { start + 1 })
    }

    fn process_horizontal_right_to_left(&mut self, y: f64, start: usize) -> Result<usize, Error> {
        let horz = self.abl.get(start)?;
        let edge = *self.bounds[horz.0].current_edge()?;
        let next_dx = self.bounds[horz.0].next_edge().map(|e| e.dx);
        let max_pair = if self.bounds[horz.0].is_maxima(y)? {
            self.bounds[horz.0].maximum_bound
        } else {
            None
        };

        // Walks the row backwards: `hp_end` is one past the next pixel to visit.
        let row = self.rings.hot_pixels.row(y);
        let mut hp_end = row.end;
        while hp_end > row.start && self.rings.hot_pixels.get(hp_end - 1)?.x > edge.bot.x {
            hp_end -= 1;
        }

        let mut pos = start;
        let mut cursor = start;
        while cursor > 0 {
            let prev = cursor - 1;
            let Some(other) = self.abl.slot(prev) else {
                cursor = prev;
                continue;
            };
            let other_x = self.bounds[other.0].current_x;
            let rounded = self.grid.round(other_x);

            while hp_end > row.start {
                let pixel = self.rings.hot_pixels.get(hp_end - 1)?;
                if !(pixel.x > rounded && pixel.x > edge.top.x) {
                    break;
                }
                if self.bounds[horz.0].ring.is_some() {
                    self.rings
                        .add_point_to_ring(&mut self.bounds[horz.0], pixel)?;
                }
                hp_end -= 1;
            }

            if other_x < edge.top.x {
                break;
            }
            // Above the end of the horizontal, a bound with a larger dx is to
            // the left of the next edge, so there is no crossing.
            if rounded == edge.top.x {
                if let Some(next_dx) = next_dx {
                    if self.bounds[other.0].current_edge()?.dx > next_dx {
                        break;
                    }
                }
            }

            let crossing = Point::new(rounded, y);
            if self.bounds[horz.0].ring.is_some() {
                self.rings
                    .add_point_to_ring(&mut self.bounds[horz.0], crossing)?;
            }

            if Some(other) == max_pair {
                if self.bounds[horz.0].ring.is_some() {
                    self.rings.add_local_maximum_point(
                        &mut self.bounds,
                        &self.abl,
                        horz,
                        other,
                        edge.top,
                    )?;
                }
                self.abl.retire(prev);
                self.abl.retire(pos);
                return Ok(pos);
            }

            self.cross_bounds(prev, pos, crossing)?;
            pos = prev;
            cursor = prev;
        }

        if self.bounds[horz.0].ring.is_some() {
            while hp_end > row.start {
                let pixel = self.rings.hot_pixels.get(hp_end - 1)?;
                if pixel.x <= edge.top.x {
                    break;
                }
                self.rings
                    .add_point_to_ring(&mut self.bounds[horz.0], pixel)?;
                hp_end -= 1;
            }
            self.rings
                .add_point_to_ring(&mut self.bounds[horz.0], edge.top)?;
        }

        if self.bounds[horz.0].next_edge().is_some() {
            self.bounds[horz.0].advance(&mut self.scanbeam);
        } else {
            self.abl.retire(pos);
        }
        Ok(pos)
    }
}
