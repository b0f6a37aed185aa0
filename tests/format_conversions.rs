//! Integration tests for format conversions, checked against sprs

mod common;

use proptest::prelude::*;
use sparse_krylov::utils::sprs_spmv;
use sparse_krylov::{from_sprs_csr, to_sprs_csr, CsrMatrix};

/// Creates a test matrix with a specific pattern
fn create_test_matrix_csr() -> CsrMatrix<f64> {
    // [ 1.0  0.0  2.0  0.0  0.0  0.0 ]
    // [ 0.0  3.0  0.0  0.0  4.0  0.0 ]
    // [ 0.0  0.0  5.0  0.0  0.0  0.0 ]
    // [ 6.0  0.0  0.0  7.0  0.0  0.0 ]
    // [ 0.0  0.0  8.0  0.0  9.0  0.0 ]
    // [ 0.0  0.0  0.0  0.0  0.0  1.5 ]
    CsrMatrix::new(
        6, 6,
        vec![0, 2, 4, 5, 7, 9, 10],
        vec![0, 2, 1, 4, 2, 0, 3, 2, 4, 5],
        vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 1.5],
    )
}

/// Random CSR pattern with sorted, distinct columns
fn arb_csr(max_n: usize) -> impl Strategy<Value = CsrMatrix<f64>> {
    (1..=max_n).prop_flat_map(|n| {
        proptest::collection::vec(
            proptest::collection::btree_map(0..n, -10.0f64..10.0, 0..=n.min(6)),
            n,
        )
        .prop_map(move |rows| {
            let mut row_ptr = vec![0];
            let mut col_idx = Vec::new();
            let mut values = Vec::new();
            for row in rows {
                for (c, v) in row {
                    // explicit zeros would be indistinguishable from block fill
                    col_idx.push(c);
                    values.push(if v == 0.0 { 1.0 } else { v });
                }
                row_ptr.push(col_idx.len());
            }
            CsrMatrix::new(n, n, row_ptr, col_idx, values)
        })
    })
}

#[test]
fn test_sprs_roundtrip() {
    let csr = create_test_matrix_csr();
    let sprs_mat = to_sprs_csr(&csr);
    assert_eq!(sprs_mat.nnz(), csr.nnz());
    assert_eq!(sprs_mat.get(4, 2), Some(&8.0));

    let back = from_sprs_csr(sprs_mat);
    assert_eq!(back, csr);
}

#[test]
fn test_transpose_matches_sprs() {
    let csr = create_test_matrix_csr();
    let ours = csr.transpose();
    let theirs = from_sprs_csr(to_sprs_csr(&csr).transpose_into().to_csr());
    assert_eq!(ours, theirs);
}

#[test]
fn test_spmv_formats_agree_with_sprs() {
    let a = common::diagonally_dominant(64, 5, 1.0, 11);
    let x = common::rhs(64, 12);
    let expected = sprs_spmv(&a, &x);

    let mut y = vec![0.0; 64];
    a.spmv(&x, &mut y).unwrap();
    common::assert_close(&y, &expected, 1e-12);

    for (bnl, bnw) in [(1, 1), (4, 2), (8, 1), (8, 8)] {
        let bcsr = a.to_bcsr(bnl, bnw).unwrap();
        bcsr.spmv(&x, &mut y).unwrap();
        common::assert_close(&y, &expected, 1e-12);
    }

    // slice heights that do and do not divide the row count
    for c in [1, 4, 7, 32] {
        let sell = a.to_sell(c).unwrap();
        sell.spmv(&x, &mut y).unwrap();
        common::assert_close(&y, &expected, 1e-12);
    }
}

#[test]
fn test_bcsr_zero_fill_is_exact() {
    let csr = create_test_matrix_csr();
    let bcsr = csr.to_bcsr(2, 2).unwrap();
    let filled = bcsr.to_csr();

    // every original entry survives, every added entry is an exact zero
    for i in 0..6 {
        for (j, &v) in filled.row_iter(i) {
            assert_eq!(v, csr.get(i, j));
        }
        for (j, &v) in csr.row_iter(i) {
            assert_eq!(filled.get(i, j), v);
        }
    }
    assert!(filled.nnz() > csr.nnz());
}

#[test]
fn test_bcsr_requires_divisible_dimension() {
    let csr = create_test_matrix_csr();
    assert!(csr.to_bcsr(4, 1).is_err());
    assert!(csr.to_bcsr(2, 4).is_err());
    assert!(csr.to_bcsr(3, 2).is_ok());
}

proptest! {
    #[test]
    fn prop_bcsr_roundtrip(a in arb_csr(24), bnl in 1usize..5, bnw in 1usize..5) {
        let mut padded = a.clone();
        padded.padding(bnl * bnw).unwrap();

        let mut back = padded.to_bcsr(bnl, bnw).unwrap().to_csr();
        back.remove_zeros();
        prop_assert_eq!(&back.row_ptr, &padded.row_ptr);
        prop_assert_eq!(&back.col_idx, &padded.col_idx);
        prop_assert_eq!(&back.values, &padded.values);
    }

    #[test]
    fn prop_csc_roundtrip(a in arb_csr(30)) {
        prop_assert_eq!(a.to_csc().to_csr(), a.clone());
        prop_assert_eq!(a.transpose().transpose(), a);
    }
}
