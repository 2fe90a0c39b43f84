use nalgebra_sparse::{CooMatrix, CsrMatrix};
use ndarray::array;
use single_wsum::enrichment::{
    AnnotatedMatrix, Edge, LabeledMatrix, MatrixData, WsumConfig, run_wsum, run_wsum_annotated,
};

#[cfg(test)]
mod pipeline_tests {
    use super::*;
    use approx::assert_relative_eq;

    fn names(prefix: &str, n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("{}{}", prefix, i)).collect()
    }

    fn toy_matrix() -> LabeledMatrix<f64> {
        // Features are given out of order on purpose.
        LabeledMatrix::new(
            MatrixData::Dense(array![
                [1.0, 2.0, 0.0, 3.0],
                [0.5, 0.0, 1.0, 1.5],
                [2.0, 1.0, 4.0, 0.0],
            ]),
            names("cell", 3),
            vec!["g4".into(), "g2".into(), "g3".into(), "g1".into()],
        )
        .unwrap()
    }

    fn toy_net() -> Vec<Edge<f64>> {
        vec![
            Edge::new("T1", "g1", 1.0),
            Edge::new("T1", "g2", 2.0),
            Edge::new("T1", "g3", -1.0),
            Edge::new("T2", "g2", 1.0),
            Edge::new("T2", "g4", -0.5),
            Edge::new("T2", "g3", 1.0),
            Edge::new("T3", "g1", 1.0),
            Edge::new("T3", "g9", 1.0),
        ]
    }

    #[test]
    fn estimate_matches_hand_computation() {
        let config = WsumConfig::default().with_min_n(3).with_times(1);
        let tables = run_wsum(&toy_matrix(), &toy_net(), &config).unwrap();

        assert!(tables.norm.is_none());
        assert!(tables.corr.is_none());
        assert!(tables.pvals.is_none());

        let est = &tables.estimate;
        assert_eq!(est.name, "wsum_estimate");
        // T3 has a single matched target and is filtered out.
        assert_eq!(est.sources, vec!["T1", "T2"]);
        assert_eq!(est.samples, vec!["cell1", "cell2", "cell3"]);

        // cell1: g1=3, g2=2, g3=0, g4=1
        assert_relative_eq!(est.get("cell1", "T1").unwrap(), 3.0 + 4.0, epsilon = 1e-12);
        assert_relative_eq!(est.get("cell1", "T2").unwrap(), 2.0 - 0.5, epsilon = 1e-12);
        // cell3: g1=0, g2=1, g3=4, g4=2
        assert_relative_eq!(est.get("cell3", "T1").unwrap(), 2.0 - 4.0, epsilon = 1e-12);
        assert_relative_eq!(est.get("cell3", "T2").unwrap(), 1.0 - 1.0 + 4.0, epsilon = 1e-12);
    }

    #[test]
    fn permutations_fill_all_tables() {
        let config = WsumConfig::default().with_min_n(3).with_times(100);
        let tables = run_wsum(&toy_matrix(), &toy_net(), &config).unwrap();

        let pvals = tables.pvals.as_ref().unwrap();
        assert_eq!(pvals.name, "wsum_pvals");
        assert_eq!(pvals.shape(), (3, 2));
        for &p in pvals.values.iter() {
            assert!(p > 0.0 && p <= 1.0);
        }

        let corr = tables.corr.as_ref().unwrap();
        for ((&c, &e), &p) in corr
            .values
            .iter()
            .zip(tables.estimate.values.iter())
            .zip(pvals.values.iter())
        {
            assert_relative_eq!(c, e * -p.log10(), epsilon = 1e-12);
        }
        assert_eq!(tables.norm.as_ref().unwrap().name, "wsum_norm");
    }

    #[test]
    fn sparse_input_gives_same_estimate() {
        let dense = toy_matrix();
        let dense_values = match &dense.data {
            MatrixData::Dense(d) => d.clone(),
            MatrixData::Sparse(_) => unreachable!(),
        };
        let mut coo = CooMatrix::new(3, 4);
        for ((i, j), &v) in dense_values.indexed_iter() {
            if v != 0.0 {
                coo.push(i, j, v);
            }
        }
        let sparse = LabeledMatrix::new(
            MatrixData::Sparse(CsrMatrix::from(&coo)),
            dense.samples.clone(),
            dense.features.clone(),
        )
        .unwrap();

        let config = WsumConfig::default().with_min_n(3).with_times(1).with_batch_size(2);
        let a = run_wsum(&dense, &toy_net(), &config).unwrap();
        let b = run_wsum(&sparse, &toy_net(), &config).unwrap();
        for (x, y) in a.estimate.values.iter().zip(b.estimate.values.iter()) {
            assert_relative_eq!(*x, *y, epsilon = 1e-12);
        }
    }

    #[test]
    fn rejects_repeated_edges() {
        let mut net = toy_net();
        net.push(Edge::new("T1", "g1", 5.0));
        let config = WsumConfig::default().with_min_n(3).with_times(1);
        assert!(run_wsum(&toy_matrix(), &net, &config).is_err());
    }

    #[test]
    fn rejects_when_no_source_has_enough_targets() {
        let config = WsumConfig::default().with_times(1);
        let result = run_wsum(&toy_matrix(), &toy_net(), &config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("min_n=5"));
    }

    #[test]
    fn empty_samples_are_dropped() {
        let mat = LabeledMatrix::new(
            MatrixData::Dense(array![
                [1.0, 2.0, 3.0, 4.0],
                [0.0, 0.0, 0.0, 0.0],
                [4.0, 3.0, 2.0, 1.0],
            ]),
            names("cell", 3),
            names("g", 4),
        )
        .unwrap();
        let config = WsumConfig::default().with_min_n(3).with_times(1);
        let tables = run_wsum(&mat, &toy_net(), &config).unwrap();
        assert_eq!(tables.estimate.samples, vec!["cell1", "cell3"]);
        assert_eq!(tables.estimate.shape(), (2, 2));
    }

    #[test]
    fn annotated_container_receives_obsm_entries() {
        let m = toy_matrix();
        let mut adata = AnnotatedMatrix::new(m.data, m.samples, m.features).unwrap();
        let config = WsumConfig::default().with_min_n(3).with_times(20);
        run_wsum_annotated(&mut adata, &toy_net(), &config).unwrap();

        for name in ["wsum_estimate", "wsum_norm", "wsum_corr", "wsum_pvals"] {
            let table = adata.obsm.get(name).unwrap();
            assert_eq!(table.name, name);
            assert_eq!(table.shape(), (3, 2));
        }
    }

    #[test]
    fn annotated_without_permutations_stores_estimate_only() {
        let m = toy_matrix();
        let mut adata = AnnotatedMatrix::new(m.data, m.samples, m.features).unwrap();
        let config = WsumConfig::default().with_min_n(3).with_times(1);
        run_wsum_annotated(&mut adata, &toy_net(), &config).unwrap();
        assert_eq!(adata.obsm.len(), 1);
        assert!(adata.obsm.contains_key("wsum_estimate"));
    }

    #[test]
    fn annotated_layer_is_scored() {
        let m = toy_matrix();
        let mut adata =
            AnnotatedMatrix::new(m.data, m.samples.clone(), m.features.clone()).unwrap();
        adata
            .add_layer(
                "scaled",
                MatrixData::Dense(array![
                    [2.0, 4.0, 0.0, 6.0],
                    [1.0, 0.0, 2.0, 3.0],
                    [4.0, 2.0, 8.0, 0.0],
                ]),
            )
            .unwrap();

        let config = WsumConfig::default()
            .with_min_n(3)
            .with_times(1)
            .with_layer("scaled");
        run_wsum_annotated(&mut adata, &toy_net(), &config).unwrap();
        let est = adata.obsm.get("wsum_estimate").unwrap();
        assert_relative_eq!(est.get("cell1", "T1").unwrap(), 14.0, epsilon = 1e-12);

        let missing = WsumConfig::default().with_min_n(3).with_layer("raw");
        assert!(run_wsum_annotated(&mut adata, &toy_net(), &missing).is_err());
    }

    #[test]
    fn annotated_raw_matrix_is_scored() {
        let m = toy_matrix();
        let mut adata = AnnotatedMatrix::new(m.data, m.samples, m.features).unwrap();
        // Raw covers a wider feature set in a different order.
        adata
            .set_raw(
                MatrixData::Dense(array![
                    [9.0, 1.0, 1.0, 1.0, 1.0],
                    [0.0, 2.0, 0.0, 1.0, 1.0],
                    [1.0, 0.0, 3.0, 2.0, 1.0],
                ]),
                vec!["g5".into(), "g1".into(), "g2".into(), "g3".into(), "g4".into()],
            )
            .unwrap();

        let config = WsumConfig::default()
            .with_min_n(3)
            .with_times(1)
            .with_use_raw(true);
        run_wsum_annotated(&mut adata, &toy_net(), &config).unwrap();

        let est = adata.obsm.get("wsum_estimate").unwrap();
        // cell2 in raw: g1=2, g2=0, g3=1, g4=1
        assert_relative_eq!(est.get("cell2", "T1").unwrap(), 2.0 - 1.0, epsilon = 1e-12);
        assert_relative_eq!(est.get("cell2", "T2").unwrap(), -0.5 + 1.0, epsilon = 1e-12);
        // cell3 in raw: g1=0, g2=3, g3=2, g4=1
        assert_relative_eq!(est.get("cell3", "T1").unwrap(), 6.0 - 2.0, epsilon = 1e-12);
    }

    #[test]
    fn raw_and_layer_together_are_rejected() {
        let m = toy_matrix();
        let mut adata =
            AnnotatedMatrix::new(m.data.clone(), m.samples.clone(), m.features.clone()).unwrap();
        adata.add_layer("counts", m.data.clone()).unwrap();
        adata.set_raw(m.data, m.features).unwrap();

        let config = WsumConfig::default()
            .with_min_n(3)
            .with_times(1)
            .with_layer("counts")
            .with_use_raw(true);
        assert!(run_wsum_annotated(&mut adata, &toy_net(), &config).is_err());
        assert!(adata.obsm.is_empty());
    }
}
