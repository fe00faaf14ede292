use approx::assert_relative_eq;
use rand::{rngs::StdRng, Rng, SeedableRng};
use strided_kernel::{
    mapreduce, zip_map2_into, zip_mapreduce2, zip_update2_into, ExecPolicy, StridedArray,
    StridedError, StridedView, PARALLEL_OVERHEAD_THRESHOLD,
};

fn make_tensor(rows: usize, cols: usize) -> StridedArray<f64> {
    StridedArray::from_fn_row_major(&[rows, cols], |idx| (idx[0] * cols + idx[1]) as f64)
}

fn random_tensor(rng: &mut StdRng, dims: &[usize]) -> StridedArray<f64> {
    StridedArray::from_fn_row_major(dims, |_| rng.gen_range(-1.0..1.0))
}

fn parallel_policy() -> ExecPolicy {
    ExecPolicy::current().with_threads(4)
}

#[test]
fn test_zip_map2_mixed_strides() {
    let a = make_tensor(6, 4);
    let b = make_tensor(6, 4);
    let a_view = a.view();
    let b_view = b.view();
    let a_t = a_view.permute(&[1, 0]).unwrap();
    let b_t = b_view.permute(&[1, 0]).unwrap();

    let mut out = StridedArray::<f64>::row_major(&[4, 6]);
    zip_map2_into(
        &mut out.view_mut(),
        &a_t,
        &b_t,
        ExecPolicy::sequential(),
        |x, y| x + y,
    )
    .unwrap();

    for i in 0..4 {
        for j in 0..6 {
            let expected = a.get(&[j, i]) + b.get(&[j, i]);
            assert_relative_eq!(out.get(&[i, j]), expected, epsilon = 1e-10);
        }
    }
}

#[test]
fn test_zip_map2_pairs_by_logical_index() {
    // [2, 3] row-major, [3, 2] col-major and [6] flat all hold 0..6 in
    // logical order.
    let a = make_tensor(2, 3);
    let b = StridedArray::<f64>::from_fn_col_major(&[3, 2], |idx| (idx[0] * 2 + idx[1]) as f64);
    let mut out = StridedArray::<f64>::row_major(&[6]);
    zip_map2_into(
        &mut out.view_mut(),
        &a.view(),
        &b.view(),
        ExecPolicy::sequential(),
        |x, y| x * 10.0 + y,
    )
    .unwrap();
    assert_eq!(
        out.to_vec(),
        vec![0.0, 11.0, 22.0, 33.0, 44.0, 55.0]
    );
}

#[test]
fn test_zip_map2_col_major_dest() {
    let a = make_tensor(3, 5);
    let b = make_tensor(3, 5);
    let mut out = StridedArray::<f64>::col_major(&[3, 5]);
    zip_map2_into(
        &mut out.view_mut(),
        &a.view(),
        &b.view(),
        parallel_policy(),
        |x, y| x - 2.0 * y,
    )
    .unwrap();
    for i in 0..3 {
        for j in 0..5 {
            assert_relative_eq!(out.get(&[i, j]), -a.get(&[i, j]));
        }
    }
}

#[test]
fn test_zip_map2_negative_stride() {
    let data: Vec<f64> = (0..8).map(|i| i as f64).collect();
    let rev = StridedView::new(&data, &[8], &[-1], 7).unwrap();
    let ones = StridedArray::from_vec(vec![1.0; 8], &[8]).unwrap();
    let mut out = StridedArray::<f64>::row_major(&[8]);
    zip_map2_into(
        &mut out.view_mut(),
        &rev,
        &ones.view(),
        ExecPolicy::sequential(),
        |x, y| x + y,
    )
    .unwrap();
    assert_eq!(out.to_vec(), vec![8.0, 7.0, 6.0, 5.0, 4.0, 3.0, 2.0, 1.0]);
}

#[test]
fn test_zip_update2_accumulates() {
    let a = make_tensor(4, 4);
    let a_t = a.view().permute(&[1, 0]).unwrap();
    let b = StridedArray::from_vec(vec![1.0; 16], &[16]).unwrap();
    let mut acc = StridedArray::from_vec(vec![100.0; 16], &[4, 4]).unwrap();
    zip_update2_into(
        &mut acc.view_mut(),
        &a_t,
        &b.view(),
        parallel_policy(),
        |d, x, y| d + x * y,
    )
    .unwrap();
    for i in 0..4 {
        for j in 0..4 {
            assert_relative_eq!(acc.get(&[i, j]), 100.0 + a.get(&[j, i]));
        }
    }
}

#[test]
fn test_sequential_and_parallel_bitwise_equal() {
    let mut rng = StdRng::seed_from_u64(42);
    let f = |x: f64, y: f64| (x * 1.7 - y).exp() * y.sin();
    for &(rows, cols) in &[(1, 3), (2, 5), (3, 4), (17, 31), (128, 65)] {
        let a = random_tensor(&mut rng, &[rows, cols]);
        let b = random_tensor(&mut rng, &[cols, rows]);
        let a_t = a.view().permute(&[1, 0]).unwrap();

        for contiguous in [true, false] {
            let src: StridedView<f64> = if contiguous { a.view() } else { a_t.clone() };
            let mut seq = StridedArray::<f64>::row_major(&[cols * rows]);
            let mut par = StridedArray::<f64>::row_major(&[cols * rows]);
            zip_map2_into(
                &mut seq.view_mut(),
                &src,
                &b.view(),
                ExecPolicy::sequential(),
                f,
            )
            .unwrap();
            zip_map2_into(&mut par.view_mut(), &src, &b.view(), parallel_policy(), f).unwrap();
            let seq_bits: Vec<u64> = seq.to_vec().iter().map(|x| x.to_bits()).collect();
            let par_bits: Vec<u64> = par.to_vec().iter().map(|x| x.to_bits()).collect();
            assert_eq!(seq_bits, par_bits, "rows={rows} cols={cols}");
        }
    }
}

#[test]
fn test_threshold_boundary_sizes() {
    for n in [
        PARALLEL_OVERHEAD_THRESHOLD - 1,
        PARALLEL_OVERHEAD_THRESHOLD,
        PARALLEL_OVERHEAD_THRESHOLD + 1,
    ] {
        let a = StridedArray::from_fn_row_major(&[n], |idx| idx[0] as f64);
        let b = StridedArray::from_fn_col_major(&[1, n], |idx| idx[1] as f64);
        let mut out = StridedArray::<f64>::row_major(&[n]);
        zip_map2_into(
            &mut out.view_mut(),
            &a.view(),
            &b.view(),
            parallel_policy(),
            |x, y| x * y,
        )
        .unwrap();
        let expected: Vec<f64> = (0..n).map(|i| (i * i) as f64).collect();
        assert_eq!(out.to_vec(), expected);
    }
}

#[test]
fn test_map_inside_pool_runs_nested() {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(3)
        .build()
        .unwrap();
    let a = make_tensor(20, 20);
    let a_t = a.view().permute(&[1, 0]).unwrap();
    let b = make_tensor(20, 20);
    let out = pool.install(|| {
        let policy = ExecPolicy::current();
        assert!(!policy.allows_fan_out());
        let mut out = StridedArray::<f64>::row_major(&[20, 20]);
        zip_map2_into(&mut out.view_mut(), &a_t, &b.view(), policy, |x, y| x - y).unwrap();
        out
    });
    for i in 0..20 {
        for j in 0..20 {
            assert_relative_eq!(out.get(&[i, j]), a.get(&[j, i]) - b.get(&[i, j]));
        }
    }
}

#[test]
fn test_zip_mapreduce2_transposed() {
    let a = make_tensor(7, 9);
    let a_t = a.view().permute(&[1, 0]).unwrap();
    let b = make_tensor(9, 7);
    let result = zip_mapreduce2(&a_t, &b.view(), |x, y| x * y, |p, q| p + q, 0.0).unwrap();

    let mut expected = 0.0;
    for i in 0..9 {
        for j in 0..7 {
            expected += a.get(&[j, i]) * b.get(&[i, j]);
        }
    }
    assert_relative_eq!(result, expected, epsilon = 1e-10);
}

#[test]
fn test_zip_mapreduce2_matches_sequential_fold() {
    // The fold order is fixed, so results match a left-to-right sum bitwise.
    let mut rng = StdRng::seed_from_u64(7);
    let a = random_tensor(&mut rng, &[33, 17]);
    let b = random_tensor(&mut rng, &[17, 33]);
    let a_t = a.view().permute(&[1, 0]).unwrap();
    let result = zip_mapreduce2(&a_t, &b.view(), |x, y| x * y, |p, q| p + q, 0.0).unwrap();
    let expected = a_t
        .to_vec()
        .iter()
        .zip(b.to_vec())
        .fold(0.0, |acc, (&x, y)| acc + x * y);
    assert_eq!(result.to_bits(), expected.to_bits());
}

#[test]
fn test_mapreduce_sum() {
    let a = make_tensor(10, 12);
    let result = mapreduce(&a.view(), |x| x, |p, q| p + q, 0.0).unwrap();
    let expected: f64 = a.to_vec().iter().sum();
    assert_relative_eq!(result, expected, epsilon = 1e-10);
}

#[test]
fn test_shape_mismatch_errors() {
    let a = make_tensor(2, 3);
    let b = make_tensor(2, 4);
    let mut out = StridedArray::from_vec(vec![-1.0; 6], &[6]).unwrap();
    let err = zip_map2_into(
        &mut out.view_mut(),
        &a.view(),
        &b.view(),
        parallel_policy(),
        |x, y| x + y,
    )
    .unwrap_err();
    assert_eq!(err, StridedError::ShapeMismatch(vec![6], vec![2, 4]));
    assert_eq!(out.to_vec(), vec![-1.0; 6]);

    let err = zip_mapreduce2(&a.view(), &b.view(), |x, y| x + y, |p, q| p + q, 0.0).unwrap_err();
    assert_eq!(err, StridedError::ShapeMismatch(vec![2, 3], vec![2, 4]));
}

#[test]
fn test_rank0_operands() {
    let a = StridedArray::from_vec(vec![3.0], &[]).unwrap();
    let b = StridedArray::from_vec(vec![4.0], &[1, 1]).unwrap();
    let mut out = StridedArray::<f64>::row_major(&[1]);
    zip_map2_into(
        &mut out.view_mut(),
        &a.view(),
        &b.view(),
        ExecPolicy::current(),
        |x, y| x * y,
    )
    .unwrap();
    assert_eq!(out.to_vec(), vec![12.0]);
}
