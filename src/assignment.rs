//! Optimal rectangular assignment.
//!
//! Kuhn-Munkres (Hungarian) algorithm with row/column potentials,
//! O(n^3). Used for CEAF cluster matching, partial mention alignment
//! and split-antecedent alignment, everywhere the best one-to-one
//! pairing under a similarity matrix is required.

/// Maximum-similarity assignment over a rectangular score matrix.
///
/// Every row of the smaller dimension is matched; the returned pairs
/// are `(row, column)` indices sorted by row. Callers filter out pairs
/// whose score they consider too low. An empty matrix yields no pairs.
#[must_use]
pub fn max_score_assignment(score: &[Vec<f64>]) -> Vec<(usize, usize)> {
    let rows = score.len();
    let cols = score.first().map_or(0, Vec::len);
    if rows == 0 || cols == 0 {
        return Vec::new();
    }
    let n = rows.max(cols);

    // Minimize negated scores on a square matrix; padded cells carry a
    // constant cost so they never change which real cells win.
    let cost = |i: usize, j: usize| -> f64 {
        if i < rows && j < cols {
            -score[i][j]
        } else {
            0.0
        }
    };

    // 1-indexed potentials; p[j] is the row matched to column j.
    let mut u = vec![0.0_f64; n + 1];
    let mut v = vec![0.0_f64; n + 1];
    let mut p = vec![0_usize; n + 1];
    let mut way = vec![0_usize; n + 1];

    for i in 1..=n {
        p[0] = i;
        let mut j0 = 0_usize;
        let mut minv = vec![f64::INFINITY; n + 1];
        let mut used = vec![false; n + 1];

        // Dijkstra-style search for the cheapest augmenting path.
        loop {
            used[j0] = true;
            let i0 = p[j0];
            let mut delta = f64::INFINITY;
            let mut j1 = 0_usize;
            for j in 1..=n {
                if used[j] {
                    continue;
                }
                let cur = cost(i0 - 1, j - 1) - u[i0] - v[j];
                if cur < minv[j] {
                    minv[j] = cur;
                    way[j] = j0;
                }
                if minv[j] < delta {
                    delta = minv[j];
                    j1 = j;
                }
            }
            for j in 0..=n {
                if used[j] {
                    u[p[j]] += delta;
                    v[j] -= delta;
                } else {
                    minv[j] -= delta;
                }
            }
            j0 = j1;
            if p[j0] == 0 {
                break;
            }
        }

        // Unwind the augmenting path.
        loop {
            let j1 = way[j0];
            p[j0] = p[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    let mut pairs: Vec<(usize, usize)> = (1..=n)
        .filter(|&j| p[j] != 0)
        .map(|j| (p[j] - 1, j - 1))
        .filter(|&(i, j)| i < rows && j < cols)
        .collect();
    pairs.sort_unstable();
    pairs
}
