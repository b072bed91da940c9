// Integration tests for the condition_statistics crate: an end-to-end pass from
// a sparse expression matrix through condition aggregation into a power-law fit,
// the way the two cores are chained from analysis notebooks.

#[cfg(test)]
mod integration_tests {
    use approx::assert_abs_diff_eq;
    use condition_statistics::aggregate::{condition_statistics, AggregateOptions};
    use condition_statistics::annotations::CellAnnotations;
    use condition_statistics::regression::{fit_power_law, FitOptions};
    use nalgebra_sparse::{CooMatrix, CsrMatrix};

    #[test]
    fn aggregate_then_fit_time_course() {
        // One replicate, LPS treatment, three time points with two cells each.
        // Per-time-point means follow y = 2 * sqrt(t) + 1 exactly: the cell
        // values are mean ± 0.5.
        let time_points = ["1", "4", "9"];
        let means = [3.0, 5.0, 7.0];

        let n_cells = 6;
        let mut coo = CooMatrix::new(n_cells, 1);
        let mut replicate = Vec::new();
        let mut treatment = Vec::new();
        let mut time = Vec::new();
        for (cond, (&label, &mean)) in time_points.iter().zip(&means).enumerate() {
            for (offset, delta) in [(0usize, -0.5), (1usize, 0.5)] {
                coo.push(cond * 2 + offset, 0, mean + delta);
                replicate.push("r1".to_string());
                treatment.push("lps".to_string());
                time.push(label.to_string());
            }
        }
        let matrix = CsrMatrix::from(&coo);

        let mut ann =
            CellAnnotations::new((0..n_cells).map(|i| format!("BC{i}")).collect());
        ann.add_column("replicate", replicate).unwrap();
        ann.add_column("treatment", treatment).unwrap();
        ann.add_column("time_point", time).unwrap();

        let gene_ids = vec!["Tnf".to_string()];
        let table =
            condition_statistics(&matrix, &ann, &gene_ids, &AggregateOptions::default()).unwrap();

        // Three condition groups, each with two cells; sorted by time point.
        assert_eq!(table.len(), 3);
        let x: Vec<f64> = table
            .records()
            .iter()
            .map(|rec| rec.condition[2].parse::<f64>().unwrap())
            .collect();
        let y: Vec<f64> = table.records().iter().map(|rec| rec.mean).collect();
        assert_eq!(x, vec![1.0, 4.0, 9.0]);
        assert_abs_diff_eq!(y[0], 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(y[2], 7.0, epsilon = 1e-12);

        // Fit the group means against time. Three points for three parameters
        // is an exact fit, which is why callers treat tiny-n fits with suspicion.
        let fit = fit_power_law(&x, &y, &FitOptions::default()).unwrap();
        assert!(fit.is_converged());
        assert_abs_diff_eq!(fit.a, 2.0, epsilon = 1e-3);
        assert_abs_diff_eq!(fit.b, 0.5, epsilon = 1e-3);
        assert_abs_diff_eq!(fit.c, 1.0, epsilon = 1e-3);
        assert_abs_diff_eq!(fit.r2, 1.0, epsilon = 1e-6);
    }
}
