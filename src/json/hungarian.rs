//! Assignment problem solver (Munkres' algorithm), used by QuickJEDI to
//! match the children of unordered nodes at minimal total subtree cost.
//!
//! The solver mutates the given cost matrix; a parallel mask matrix marks
//! starred (1) and primed (2) zeros, and row/column cover flags drive the
//! classic seven-step loop.

/// Minimal assignment cost over a square, non-negative `matrix_size` x
/// `matrix_size` cost matrix. Only the top-left `matrix_size` block of
/// `cost_matrix` is read and modified.
pub fn execute_hungarian(cost_matrix: &mut [Vec<f64>], matrix_size: usize) -> f64 {
    let mut mask_matrix = vec![vec![0u8; matrix_size]; matrix_size];
    let mut row_cover = vec![false; matrix_size];
    let mut col_cover = vec![false; matrix_size];
    let mut path_row_0 = 0usize;
    let mut path_col_0 = 0usize;

    // Keep the original costs to sum up the assignment at the end.
    let mut orig_matrix = vec![vec![0.0f64; matrix_size]; matrix_size];
    for r in 0..matrix_size {
        orig_matrix[r][..matrix_size].copy_from_slice(&cost_matrix[r][..matrix_size]);
    }

    let mut step = 1;
    loop {
        match step {
            1 => step = step_one(cost_matrix, matrix_size),
            2 => step = step_two(cost_matrix, &mut mask_matrix, matrix_size, &mut row_cover, &mut col_cover),
            3 => step = step_three(&mask_matrix, matrix_size, &mut col_cover),
            4 => {
                step = step_four(
                    cost_matrix,
                    &mut mask_matrix,
                    matrix_size,
                    &mut row_cover,
                    &mut col_cover,
                    &mut path_row_0,
                    &mut path_col_0,
                )
            }
            5 => {
                step = step_five(
                    &mut mask_matrix,
                    matrix_size,
                    &mut row_cover,
                    &mut col_cover,
                    path_row_0,
                    path_col_0,
                )
            }
            6 => step = step_six(cost_matrix, matrix_size, &row_cover, &col_cover),
            _ => break,
        }
    }

    let mut costs = 0.0;
    for r in 0..matrix_size {
        for c in 0..matrix_size {
            if mask_matrix[r][c] == 1 {
                costs += orig_matrix[r][c];
            }
        }
    }
    costs
}

/// Subtract the row minima.
fn step_one(cost_matrix: &mut [Vec<f64>], matrix_size: usize) -> u8 {
    for r in 0..matrix_size {
        let mut min_in_row = cost_matrix[r][0];
        for c in 0..matrix_size {
            if cost_matrix[r][c] < min_in_row {
                min_in_row = cost_matrix[r][c];
            }
        }
        for c in 0..matrix_size {
            cost_matrix[r][c] -= min_in_row;
        }
    }
    2
}

/// Star zeros greedily, one per row and column.
fn step_two(
    cost_matrix: &[Vec<f64>],
    mask_matrix: &mut [Vec<u8>],
    matrix_size: usize,
    row_cover: &mut [bool],
    col_cover: &mut [bool],
) -> u8 {
    for r in 0..matrix_size {
        for c in 0..matrix_size {
            if cost_matrix[r][c] == 0.0 && !row_cover[r] && !col_cover[c] {
                mask_matrix[r][c] = 1;
                row_cover[r] = true;
                col_cover[c] = true;
            }
        }
    }
    row_cover.fill(false);
    col_cover.fill(false);
    3
}

/// Cover columns with starred zeros; all covered means done.
fn step_three(mask_matrix: &[Vec<u8>], matrix_size: usize, col_cover: &mut [bool]) -> u8 {
    for row in mask_matrix.iter().take(matrix_size) {
        for (c, mask) in row.iter().enumerate().take(matrix_size) {
            if *mask == 1 {
                col_cover[c] = true;
            }
        }
    }
    let col_count = col_cover.iter().filter(|covered| **covered).count();
    if col_count >= matrix_size {
        7
    } else {
        4
    }
}

fn find_a_zero(
    cost_matrix: &[Vec<f64>],
    matrix_size: usize,
    row_cover: &[bool],
    col_cover: &[bool],
) -> Option<(usize, usize)> {
    for r in 0..matrix_size {
        for c in 0..matrix_size {
            if cost_matrix[r][c] == 0.0 && !row_cover[r] && !col_cover[c] {
                return Some((r, c));
            }
        }
    }
    None
}

fn find_star_in_row(mask_matrix: &[Vec<u8>], matrix_size: usize, row: usize) -> Option<usize> {
    (0..matrix_size).find(|c| mask_matrix[row][*c] == 1)
}

fn find_star_in_col(mask_matrix: &[Vec<u8>], matrix_size: usize, col: usize) -> Option<usize> {
    (0..matrix_size).find(|r| mask_matrix[*r][col] == 1)
}

fn find_prime_in_row(mask_matrix: &[Vec<u8>], matrix_size: usize, row: usize) -> Option<usize> {
    (0..matrix_size).find(|c| mask_matrix[row][*c] == 2)
}

/// Prime uncovered zeros. A primed zero without a starred zero in its row
/// starts an augmenting path (step 5); no uncovered zero left goes to the
/// matrix adjustment (step 6).
fn step_four(
    cost_matrix: &[Vec<f64>],
    mask_matrix: &mut [Vec<u8>],
    matrix_size: usize,
    row_cover: &mut [bool],
    col_cover: &mut [bool],
    path_row_0: &mut usize,
    path_col_0: &mut usize,
) -> u8 {
    loop {
        let Some((row, col)) = find_a_zero(cost_matrix, matrix_size, row_cover, col_cover) else {
            return 6;
        };
        mask_matrix[row][col] = 2;
        if let Some(star_col) = find_star_in_row(mask_matrix, matrix_size, row) {
            row_cover[row] = true;
            col_cover[star_col] = false;
        } else {
            *path_row_0 = row;
            *path_col_0 = col;
            return 5;
        }
    }
}

/// Augment along the alternating star/prime series, then reset covers and
/// primes.
fn step_five(
    mask_matrix: &mut [Vec<u8>],
    matrix_size: usize,
    row_cover: &mut [bool],
    col_cover: &mut [bool],
    path_row_0: usize,
    path_col_0: usize,
) -> u8 {
    let mut path = vec![(path_row_0, path_col_0)];
    loop {
        let last_col = path.last().unwrap().1;
        let Some(r) = find_star_in_col(mask_matrix, matrix_size, last_col) else {
            break;
        };
        path.push((r, last_col));
        let c = find_prime_in_row(mask_matrix, matrix_size, r)
            .expect("a starred row in the series always has a primed zero");
        path.push((r, c));
    }
    for (r, c) in path {
        mask_matrix[r][c] = if mask_matrix[r][c] == 1 { 0 } else { 1 };
    }
    row_cover.fill(false);
    col_cover.fill(false);
    for row in mask_matrix.iter_mut().take(matrix_size) {
        for mask in row.iter_mut().take(matrix_size) {
            if *mask == 2 {
                *mask = 0;
            }
        }
    }
    3
}

/// Add the smallest uncovered value to covered rows, subtract it from
/// uncovered columns.
fn step_six(
    cost_matrix: &mut [Vec<f64>],
    matrix_size: usize,
    row_cover: &[bool],
    col_cover: &[bool],
) -> u8 {
    let mut min_val = f64::MAX;
    for r in 0..matrix_size {
        for c in 0..matrix_size {
            if !row_cover[r] && !col_cover[c] && min_val > cost_matrix[r][c] {
                min_val = cost_matrix[r][c];
            }
        }
    }
    for r in 0..matrix_size {
        for c in 0..matrix_size {
            if row_cover[r] {
                cost_matrix[r][c] += min_val;
            }
            if !col_cover[c] {
                cost_matrix[r][c] -= min_val;
            }
        }
    }
    4
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::Itertools;

    fn brute_force(matrix: &[Vec<f64>], n: usize) -> f64 {
        (0..n)
            .permutations(n)
            .map(|perm| (0..n).map(|r| matrix[r][perm[r]]).sum::<f64>())
            .fold(f64::INFINITY, f64::min)
    }

    #[test]
    fn test_known_assignment() {
        let mut m = vec![
            vec![1.0, 2.0, 3.0],
            vec![2.0, 4.0, 6.0],
            vec![3.0, 6.0, 9.0],
        ];
        // Anti-diagonal: 3 + 4 + 3 = 10.
        assert_eq!(execute_hungarian(&mut m, 3), 10.0);
    }

    #[test]
    fn test_identity_matrix() {
        let mut m = vec![
            vec![0.0, 1.0, 1.0],
            vec![1.0, 0.0, 1.0],
            vec![1.0, 1.0, 0.0],
        ];
        assert_eq!(execute_hungarian(&mut m, 3), 0.0);
    }

    #[test]
    fn test_matches_brute_force() {
        let matrices = [
            vec![
                vec![4.0, 1.0, 3.0],
                vec![2.0, 0.0, 5.0],
                vec![3.0, 2.0, 2.0],
            ],
            vec![
                vec![7.0, 5.0, 11.0, 8.0],
                vec![5.0, 4.0, 6.0, 5.0],
                vec![8.0, 12.0, 11.0, 9.0],
                vec![6.0, 7.0, 10.0, 7.0],
            ],
            vec![
                vec![1.0, 1.0, 1.0, 2.0],
                vec![2.0, 3.0, 1.0, 1.0],
                vec![1.0, 2.0, 3.0, 2.0],
                vec![3.0, 1.0, 2.0, 1.0],
            ],
        ];
        for m in matrices {
            let n = m.len();
            let expected = brute_force(&m, n);
            let mut work = m.clone();
            assert_eq!(execute_hungarian(&mut work, n), expected);
        }
    }

    #[test]
    fn test_rectangular_slack_padding() {
        // Two real rows, one padding row of zeros against slack columns.
        let mut m = vec![
            vec![2.0, 9.0, 1.0],
            vec![3.0, 8.0, 2.0],
            vec![4.0, 0.0, 0.0],
        ];
        let expected = brute_force(&m.clone(), 3);
        assert_eq!(execute_hungarian(&mut m, 3), expected);
    }
}
