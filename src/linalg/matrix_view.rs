use crate::linalg::Matrix;
use std::ops::{Index, IndexMut};

fn check_window(len: usize, rows: usize, cols: usize, ld: usize) {
    assert!(
        ld >= rows,
        "leading dimension {} is smaller than the row count {}",
        ld,
        rows
    );
    if rows > 0 && cols > 0 {
        assert!(
            (cols - 1) * ld + rows <= len,
            "a {}x{} window with leading dimension {} does not fit in {} elements",
            rows,
            cols,
            ld,
            len
        );
    }
}

/// A read-only window into column-major data. The referent must outlive the
/// view; the view's base, leading dimension and shape are fixed at
/// construction.
///
/// Element bounds are checked in debug builds only; a release-mode index that
/// is out of shape but inside the borrowed slice reads the wrong element.
#[derive(Debug, Clone, Copy)]
pub struct MatrixView<'a, T> {
    data: &'a [T],
    ld: usize,
    rows: usize,
    cols: usize,
}

/// A read-write window into column-major data. There is deliberately no way
/// to turn a [`MatrixView`] into a `MatrixViewMut`; writable windows can only
/// be derived from writable storage.
#[derive(Debug)]
pub struct MatrixViewMut<'a, T> {
    data: &'a mut [T],
    ld: usize,
    rows: usize,
    cols: usize,
}

impl<'a, T> MatrixView<'a, T> {
    /// View a `rows` x `cols` window over column-major data with the given
    /// leading dimension.
    pub fn from_slice(data: &'a [T], rows: usize, cols: usize, ld: usize) -> Self {
        check_window(data.len(), rows, cols, ld);
        Self {
            data,
            ld,
            rows,
            cols,
        }
    }

    /// View a square `n` x `n` window with leading dimension `n`.
    pub fn square(data: &'a [T], n: usize) -> Self {
        Self::from_slice(data, n, n, n)
    }

    /// View a whole matrix.
    pub fn of(mat: &'a Matrix<T>) -> Self {
        Self::from_slice(
            mat.as_slice(),
            mat.nr_rows(),
            mat.nr_cols(),
            mat.leading_dimension(),
        )
    }

    /// View the remainder of a matrix starting at `(off_i, off_j)`.
    pub fn of_offset(mat: &'a Matrix<T>, off_i: usize, off_j: usize) -> Self {
        Self::of_part(
            mat,
            off_i,
            off_j,
            mat.nr_rows() - off_i,
            mat.nr_cols() - off_j,
        )
    }

    /// View an `ni` x `nj` window of a matrix starting at `(off_i, off_j)`.
    pub fn of_part(mat: &'a Matrix<T>, off_i: usize, off_j: usize, ni: usize, nj: usize) -> Self {
        assert!(off_i + ni <= mat.nr_rows() && off_j + nj <= mat.nr_cols());
        let ld = mat.leading_dimension();
        let start = (off_i + off_j * ld).min(mat.as_slice().len());
        Self::from_slice(&mat.as_slice()[start..], ni, nj, ld)
    }

    /// Number of rows.
    pub fn nr_rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn nr_cols(&self) -> usize {
        self.cols
    }

    /// Distance between the starts of consecutive columns.
    pub fn leading_dimension(&self) -> usize {
        self.ld
    }

    /// Whether the window is square.
    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    /// The `j`-th column as a slice of length `nr_rows`.
    pub fn col(&self, j: usize) -> &[T] {
        debug_assert!(j < self.cols);
        &self.data[j * self.ld..j * self.ld + self.rows]
    }
}

impl<'a, T> MatrixViewMut<'a, T> {
    /// View a `rows` x `cols` window over mutable column-major data with the
    /// given leading dimension.
    pub fn from_slice(data: &'a mut [T], rows: usize, cols: usize, ld: usize) -> Self {
        check_window(data.len(), rows, cols, ld);
        Self {
            data,
            ld,
            rows,
            cols,
        }
    }

    /// View a square `n` x `n` window with leading dimension `n`.
    pub fn square(data: &'a mut [T], n: usize) -> Self {
        Self::from_slice(data, n, n, n)
    }

    /// View a whole matrix mutably.
    pub fn of(mat: &'a mut Matrix<T>) -> Self {
        let (rows, cols, ld) = (mat.nr_rows(), mat.nr_cols(), mat.leading_dimension());
        Self::from_slice(mat.as_mut_slice(), rows, cols, ld)
    }

    /// View the remainder of a matrix starting at `(off_i, off_j)` mutably.
    pub fn of_offset(mat: &'a mut Matrix<T>, off_i: usize, off_j: usize) -> Self {
        let (ni, nj) = (mat.nr_rows() - off_i, mat.nr_cols() - off_j);
        Self::of_part(mat, off_i, off_j, ni, nj)
    }

    /// View an `ni` x `nj` window of a matrix starting at `(off_i, off_j)`
    /// mutably.
    pub fn of_part(
        mat: &'a mut Matrix<T>,
        off_i: usize,
        off_j: usize,
        ni: usize,
        nj: usize,
    ) -> Self {
        assert!(off_i + ni <= mat.nr_rows() && off_j + nj <= mat.nr_cols());
        let ld = mat.leading_dimension();
        let start = (off_i + off_j * ld).min(mat.as_slice().len());
        Self::from_slice(&mut mat.as_mut_slice()[start..], ni, nj, ld)
    }

    /// Number of rows.
    pub fn nr_rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn nr_cols(&self) -> usize {
        self.cols
    }

    /// Distance between the starts of consecutive columns.
    pub fn leading_dimension(&self) -> usize {
        self.ld
    }

    /// Whether the window is square.
    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    /// The `j`-th column as a slice of length `nr_rows`.
    pub fn col(&self, j: usize) -> &[T] {
        debug_assert!(j < self.cols);
        &self.data[j * self.ld..j * self.ld + self.rows]
    }

    /// The `j`-th column as a mutable slice of length `nr_rows`.
    pub fn col_mut(&mut self, j: usize) -> &mut [T] {
        debug_assert!(j < self.cols);
        &mut self.data[j * self.ld..j * self.ld + self.rows]
    }

    /// A read-only view of the same window.
    pub fn as_view(&self) -> MatrixView<'_, T> {
        MatrixView {
            data: &self.data[..],
            ld: self.ld,
            rows: self.rows,
            cols: self.cols,
        }
    }
}

impl<'a, T: Copy> MatrixViewMut<'a, T> {
    /// Assign elementwise from another window of the same shape. The window's
    /// own base, leading dimension and shape never change.
    pub fn copy_from(&mut self, rhs: &MatrixView<'_, T>) {
        assert!(
            self.rows == rhs.nr_rows() && self.cols == rhs.nr_cols(),
            "cannot assign a {}x{} view from a {}x{} view",
            self.rows,
            self.cols,
            rhs.nr_rows(),
            rhs.nr_cols()
        );
        for j in 0..self.cols {
            for i in 0..self.rows {
                self[(i, j)] = rhs[(i, j)];
            }
        }
    }
}

impl<'a, T> Index<(usize, usize)> for MatrixView<'a, T> {
    type Output = T;

    fn index(&self, (i, j): (usize, usize)) -> &T {
        debug_assert!(i < self.rows && j < self.cols);
        &self.data[i + j * self.ld]
    }
}

impl<'a, T> Index<(usize, usize)> for MatrixViewMut<'a, T> {
    type Output = T;

    fn index(&self, (i, j): (usize, usize)) -> &T {
        debug_assert!(i < self.rows && j < self.cols);
        &self.data[i + j * self.ld]
    }
}

impl<'a, T> IndexMut<(usize, usize)> for MatrixViewMut<'a, T> {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut T {
        debug_assert!(i < self.rows && j < self.cols);
        &mut self.data[i + j * self.ld]
    }
}

#[cfg(test)]
mod view_tests {
    use super::*;

    fn counting_matrix(rows: usize, cols: usize) -> Matrix<f64> {
        let mut mat = Matrix::new(rows, cols);
        for j in 0..cols {
            for i in 0..rows {
                mat[(i, j)] = (10 * i + j) as f64;
            }
        }
        mat
    }

    #[test]
    fn whole_matrix_view() {
        let mat = counting_matrix(4, 5);
        let view = MatrixView::of(&mat);
        assert_eq!(view.nr_rows(), 4);
        assert_eq!(view.nr_cols(), 5);
        assert_eq!(view.leading_dimension(), 4);
        for j in 0..5 {
            for i in 0..4 {
                assert_eq!(view[(i, j)], mat[(i, j)]);
            }
        }
    }

    #[test]
    fn offset_view_addressing() {
        let mat = counting_matrix(4, 5);
        let view = MatrixView::of_offset(&mat, 1, 2);
        assert_eq!(view.nr_rows(), 3);
        assert_eq!(view.nr_cols(), 3);
        for j in 0..3 {
            for i in 0..3 {
                assert_eq!(view[(i, j)], mat[(i + 1, j + 2)]);
            }
        }
    }

    #[test]
    fn sub_window_write_hits_parent() {
        let mut mat = counting_matrix(4, 5);
        let mut view = MatrixViewMut::of_part(&mut mat, 1, 2, 3, 3);
        view[(0, 0)] = 7.0;
        assert_eq!(mat[(1, 2)], 7.0);
    }

    #[test]
    fn square_view_from_slice() {
        let data: Vec<i32> = (0..9).collect();
        let view = MatrixView::square(&data, 3);
        assert_eq!(view[(1, 2)], 7);
        assert_eq!(view.col(1), &[3, 4, 5]);
        assert!(view.is_square());
    }

    #[test]
    fn copy_assignment_is_elementwise() {
        let src = counting_matrix(3, 3);
        let mut dst = Matrix::new(4, 4);
        let src_view = MatrixView::of(&src);
        let mut dst_view = MatrixViewMut::of_part(&mut dst, 1, 1, 3, 3);
        dst_view.copy_from(&src_view);
        for j in 0..3 {
            for i in 0..3 {
                assert_eq!(dst[(i + 1, j + 1)], src[(i, j)]);
            }
        }
        assert_eq!(dst[(0, 0)], 0.0);
    }

    #[test]
    #[should_panic]
    fn copy_assignment_rejects_shape_mismatch() {
        let src = counting_matrix(2, 2);
        let mut dst = Matrix::<f64>::new(3, 3);
        let src_view = MatrixView::of(&src);
        MatrixViewMut::of(&mut dst).copy_from(&src_view);
    }

    #[test]
    #[should_panic]
    fn window_must_fit_the_storage() {
        let data = vec![0.0f64; 10];
        let _ = MatrixView::from_slice(&data, 4, 3, 4);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic]
    fn debug_bounds_check() {
        let mat = counting_matrix(3, 3);
        let view = MatrixView::of_part(&mat, 0, 0, 2, 2);
        let _ = view[(0, 2)];
    }
}
