use crate::types::{Label, Solution};

const MAX_COLS: f64 = 80.0;
const MAX_ROWS: f64 = 40.0;

/// A label cell on one revolution, in mm from the roll's left edge and the
/// start of the development.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Cell {
    x: f64,
    y: f64,
}

fn cells(label: &Label, sol: &Solution) -> Vec<Cell> {
    let step_x = label.width_mm() + sol.gap_horizontal_mm.unwrap_or(0.0);
    let step_y = label.height_mm() + sol.gap_vertical_mm;
    (0..sol.repeats)
        .flat_map(|row| {
            (0..sol.across_count).map(move |col| Cell {
                x: col as f64 * step_x,
                y: row as f64 * step_y,
            })
        })
        .collect()
}

/// ASCII drawing of one cylinder revolution: roll width across, development down.
pub fn render_revolution(label: &Label, sol: &Solution) -> String {
    let scale = f64::min(
        MAX_COLS / sol.roll_width_used_mm,
        MAX_ROWS / sol.development_mm,
    );
    let grid_w = (sol.roll_width_used_mm * scale).round() as usize;
    let grid_h = (sol.development_mm * scale).round() as usize;

    if grid_w == 0 || grid_h == 0 {
        return String::new();
    }

    let mut grid = vec![vec![' '; grid_w + 1]; grid_h + 1];
    draw_rect(&mut grid, 0, 0, grid_w, grid_h);

    let text: Vec<char> = label.to_string().chars().collect();
    let sw = (label.width_mm() * scale).round() as usize;
    let sh = (label.height_mm() * scale).round() as usize;

    let cells = if sw == 0 || sh == 0 {
        Vec::new()
    } else {
        cells(label, sol)
    };
    for cell in cells {
        let sx = (cell.x * scale).round() as usize;
        let sy = (cell.y * scale).round() as usize;
        draw_rect(&mut grid, sx, sy, sw, sh);

        if sw > text.len() + 1 && sh > 1 {
            let cy = sy + sh / 2;
            let start_x = sx + (sw - text.len()) / 2;
            for (i, &ch) in text.iter().enumerate() {
                let x = start_x + i;
                if x > sx && x < sx + sw && cy < grid.len() && x < grid[cy].len() {
                    grid[cy][x] = ch;
                }
            }
        }
    }

    let mut out = String::new();
    for row in &grid {
        let line: String = row.iter().collect();
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

fn plot(grid: &mut [Vec<char>], x: usize, y: usize, edge: char) {
    let Some(cell) = grid.get_mut(y).and_then(|row| row.get_mut(x)) else {
        return;
    };
    *cell = match (*cell, edge) {
        ('+', _) => '+',
        ('|', '-') | ('-', '|') => '+',
        (_, e) => e,
    };
}

fn draw_rect(grid: &mut [Vec<char>], x: usize, y: usize, w: usize, h: usize) {
    for i in x..=x + w {
        plot(grid, i, y, '-');
        plot(grid, i, y + h, '-');
    }
    for j in y..=y + h {
        plot(grid, x, j, '|');
        plot(grid, x + w, j, '|');
    }
    for (cx, cy) in [(x, y), (x + w, y), (x, y + h), (x + w, y + h)] {
        if let Some(c) = grid.get_mut(cy).and_then(|row| row.get_mut(cx)) {
            *c = '+';
        }
    }
}
