use nalgebra_sparse::CsrMatrix;
use ndarray::Array2;
use num_traits::Zero;

/// Materialize rows `start..end` of a CSR matrix as a dense block.
pub(crate) fn csr_rows_to_dense<T>(matrix: &CsrMatrix<T>, start: usize, end: usize) -> Array2<T>
where
    T: Copy + Zero,
{
    let end = end.min(matrix.nrows());
    let start = start.min(end);
    let mut block = Array2::zeros((end - start, matrix.ncols()));

    for (out_row, row_idx) in (start..end).enumerate() {
        let row = matrix.row(row_idx);
        for (&col, &value) in row.col_indices().iter().zip(row.values()) {
            block[[out_row, col]] = value;
        }
    }
    block
}

/// Count non-zero values per row and per column of a CSR matrix.
pub(crate) fn csr_nonzero_counts<T>(matrix: &CsrMatrix<T>) -> (Vec<usize>, Vec<usize>)
where
    T: Copy + Zero,
{
    let mut row_counts = vec![0; matrix.nrows()];
    let mut col_counts = vec![0; matrix.ncols()];

    for (row_idx, row) in matrix.row_iter().enumerate() {
        for (&col, value) in row.col_indices().iter().zip(row.values()) {
            if !value.is_zero() {
                row_counts[row_idx] += 1;
                col_counts[col] += 1;
            }
        }
    }
    (row_counts, col_counts)
}

/// Build a new CSR matrix keeping `rows` (in the given order) and remapping
/// columns through `col_map`. Columns mapped to `None` are dropped.
pub(crate) fn subset_csr<T>(
    matrix: &CsrMatrix<T>,
    rows: &[usize],
    col_map: &[Option<usize>],
    n_cols: usize,
) -> anyhow::Result<CsrMatrix<T>>
where
    T: Copy,
{
    let mut row_offsets = Vec::with_capacity(rows.len() + 1);
    let mut col_indices = Vec::new();
    let mut values = Vec::new();
    let mut entries: Vec<(usize, T)> = Vec::new();

    row_offsets.push(0);
    for &row_idx in rows {
        let row = matrix.row(row_idx);
        entries.clear();
        entries.extend(
            row.col_indices()
                .iter()
                .zip(row.values())
                .filter_map(|(&col, &value)| col_map[col].map(|new_col| (new_col, value))),
        );
        entries.sort_by_key(|entry| entry.0);
        for (col, value) in entries.drain(..) {
            col_indices.push(col);
            values.push(value);
        }
        row_offsets.push(col_indices.len());
    }

    CsrMatrix::try_from_csr_data(rows.len(), n_cols, row_offsets, col_indices, values)
        .map_err(|e| anyhow::anyhow!("Failed to rebuild sparse matrix: {}", e))
}
