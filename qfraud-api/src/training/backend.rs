//! Default training backend: rebalance, scale, project, split and fit the
//! circuit classifier

use std::time::Instant;

use ndarray::Axis;
use qfraud_common::events::{ReportSummary, TrainingCharts, TrainingProgress, TrainingReport};
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::circuit::CircuitClassifier;
use super::dataset::Dataset;
use super::metrics;
use super::pca::Pca;
use super::scaler::StandardScaler;
use super::smote::{self, DEFAULT_K_NEIGHBORS};
use super::split::{stratified_split, TEST_FRACTION};
use super::{round_to, Matrix, TrainingBackend, TrainingError, TrainingOutcome, TrainingRequest};

/// Maximum retained principal components (and circuit wires)
pub const MAX_COMPONENTS: usize = 2;

/// Oversampling only runs above this many rows
const MIN_ROWS_FOR_OVERSAMPLING: usize = 10;

/// Every n-th ROC point is kept in the report
const ROC_DOWNSAMPLE_STEP: usize = 10;

#[derive(Debug, Clone, Copy, Default)]
pub struct VariationalCircuitBackend;

impl VariationalCircuitBackend {
    pub fn new() -> Self {
        Self
    }
}

/// Fitted inputs for the classifier
struct PreparedData {
    train_x: Matrix,
    train_y: Vec<f64>,
    test_x: Matrix,
    test_y: Vec<i64>,
    n_components: usize,
    pca_variance: Vec<f64>,
}

fn prepare(dataset: &Dataset, rng: &mut StdRng) -> Result<PreparedData, TrainingError> {
    let resampled = if dataset.class_counts().len() > 1 && dataset.len() > MIN_ROWS_FOR_OVERSAMPLING
    {
        let resampled = smote::oversample(dataset, DEFAULT_K_NEIGHBORS, rng);
        tracing::debug!(
            before = dataset.len(),
            after = resampled.len(),
            "Oversampled minority classes"
        );
        resampled
    } else {
        dataset.clone()
    };

    let scaled = StandardScaler::fit_transform(&resampled.features);

    let n_components = MAX_COMPONENTS
        .min(resampled.n_features())
        .min(resampled.len());
    let pca = Pca::fit(&scaled, n_components)?;
    let projected = pca.transform(&scaled);

    let split = stratified_split(&resampled.labels, TEST_FRACTION, rng)?;

    Ok(PreparedData {
        train_x: projected.select(Axis(0), &split.train),
        train_y: split
            .train
            .iter()
            .map(|&i| if resampled.labels[i] == metrics::POSITIVE_LABEL { 1.0 } else { 0.0 })
            .collect(),
        test_x: projected.select(Axis(0), &split.test),
        test_y: split.test.iter().map(|&i| resampled.labels[i]).collect(),
        n_components,
        pca_variance: pca.explained_variance_ratio().to_vec(),
    })
}

/// Scores, labels and headline metrics on the test set
struct Evaluation {
    probabilities: Vec<f64>,
    predictions: Vec<i64>,
    accuracy: f64,
    f1: f64,
    auc: f64,
}

fn evaluate(classifier: &CircuitClassifier, test_x: &Matrix, test_y: &[i64]) -> Evaluation {
    let probabilities = classifier.predict_proba_rows(test_x.view());
    let predictions = metrics::predict_labels(&probabilities);

    Evaluation {
        accuracy: metrics::accuracy(test_y, &predictions),
        f1: metrics::f1_score(test_y, &predictions),
        auc: metrics::roc_auc(test_y, &probabilities),
        probabilities,
        predictions,
    }
}

impl TrainingBackend for VariationalCircuitBackend {
    fn train(
        &self,
        request: TrainingRequest<'_>,
        progress: &mut dyn FnMut(TrainingProgress),
    ) -> Result<TrainingOutcome, TrainingError> {
        let options = request.options;
        let dataset = Dataset::from_rows(request.rows);
        if dataset.is_empty() {
            return Err(TrainingError::NoData(request.project_name.to_string()));
        }
        if options.epochs == 0 {
            return Err(TrainingError::Pipeline("epochs must be at least 1".to_string()));
        }

        let mut rng = StdRng::seed_from_u64(options.seed);
        let data = prepare(&dataset, &mut rng)?;

        tracing::debug!(
            project_name = request.project_name,
            train_size = data.train_x.nrows(),
            test_size = data.test_x.nrows(),
            n_components = data.n_components,
            "Prepared training data"
        );

        let mut classifier = CircuitClassifier::random(data.n_components, &mut rng);
        let n_train = data.train_x.nrows();
        let batch_size = options.max_batch_size.min(n_train).max(1);

        let mut loss_curve = Vec::with_capacity(options.epochs);
        let mut accuracy_curve = Vec::with_capacity(options.epochs);
        let mut f1_curve = Vec::with_capacity(options.epochs);
        let mut auc_curve = Vec::with_capacity(options.epochs);

        for epoch in 1..=options.epochs {
            let epoch_start = Instant::now();

            let batch = rand::seq::index::sample(&mut rng, n_train, batch_size).into_vec();
            let batch_x = data.train_x.select(Axis(0), &batch);
            let batch_y: Vec<f64> = batch.iter().map(|&i| data.train_y[i]).collect();

            let loss = classifier.step(batch_x.view(), &batch_y, options.learning_rate);
            if !loss.is_finite() {
                return Err(TrainingError::Pipeline(format!(
                    "loss diverged at epoch {}",
                    epoch
                )));
            }

            let evaluation = evaluate(&classifier, &data.test_x, &data.test_y);
            loss_curve.push(loss);
            accuracy_curve.push(evaluation.accuracy);
            f1_curve.push(evaluation.f1);
            auc_curve.push(evaluation.auc);

            progress(TrainingProgress {
                epoch,
                total_epochs: options.epochs,
                loss,
                accuracy: evaluation.accuracy,
                f1: evaluation.f1,
                auc: evaluation.auc,
                progress: round_to(epoch as f64 / options.epochs as f64 * 100.0, 2),
                duration_sec: Some(round_to(epoch_start.elapsed().as_secs_f64(), 2)),
                is_final: false,
                message: None,
            });
        }

        let final_eval = evaluate(&classifier, &data.test_x, &data.test_y);
        let roc_curve = metrics::downsample(
            &metrics::roc_curve(&data.test_y, &final_eval.probabilities),
            ROC_DOWNSAMPLE_STEP,
        );
        let confusion_matrix = options
            .include_confusion_matrix
            .then(|| metrics::confusion_matrix(&data.test_y, &final_eval.predictions));

        progress(TrainingProgress {
            epoch: options.epochs,
            total_epochs: options.epochs,
            loss: loss_curve.last().copied().unwrap_or_default(),
            accuracy: final_eval.accuracy,
            f1: final_eval.f1,
            auc: final_eval.auc,
            progress: 100.0,
            duration_sec: None,
            is_final: true,
            message: Some(format!(
                "Final Accuracy: {:.4}, F1: {:.4}, AUC: {:.4}",
                final_eval.accuracy, final_eval.f1, final_eval.auc
            )),
        });

        let report = TrainingReport {
            summary: ReportSummary {
                project: request.project_name.to_string(),
                total_samples: dataset.len(),
                train_size: n_train,
                test_size: data.test_x.nrows(),
                accuracy: round_to(final_eval.accuracy, 4),
                f1_score: round_to(final_eval.f1, 4),
                roc_auc: round_to(final_eval.auc, 4),
                pca_variance: data.pca_variance,
            },
            charts: TrainingCharts {
                loss_curve,
                accuracy_curve,
                f1_curve,
                auc_curve,
                roc_curve,
                confusion_matrix,
            },
            classification_report: metrics::classification_report(
                &data.test_y,
                &final_eval.predictions,
            ),
        };

        Ok(TrainingOutcome {
            report,
            accuracy: final_eval.accuracy,
            f1_score: final_eval.f1,
            auc: final_eval.auc,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::transaction::FEATURE_COUNT;
    use crate::models::TransactionRow;
    use crate::training::TrainingOptions;

    /// Two separable clusters; `fraud` rows out of `total`
    fn synthetic_rows(total: usize, fraud: usize) -> Vec<TransactionRow> {
        (0..total)
            .map(|i| {
                let class = i64::from(i < fraud);
                let center = if class == 1 { 2.0 } else { -2.0 };
                let mut features = [0.0; FEATURE_COUNT];
                for (j, f) in features.iter_mut().enumerate() {
                    let jitter = ((i * 31 + j * 17) % 13) as f64 / 13.0 - 0.5;
                    *f = center + jitter;
                }
                TransactionRow { features, class }
            })
            .collect()
    }

    fn run(
        rows: &[TransactionRow],
        options: &TrainingOptions,
    ) -> (Result<TrainingOutcome, TrainingError>, Vec<TrainingProgress>) {
        let mut events = Vec::new();
        let result = VariationalCircuitBackend::new().train(
            TrainingRequest {
                project_name: "alpha",
                rows,
                options,
            },
            &mut |p: TrainingProgress| events.push(p),
        );
        (result, events)
    }

    #[test]
    fn test_emits_one_record_per_epoch_then_final() {
        let rows = synthetic_rows(40, 8);
        let (result, events) = run(&rows, &TrainingOptions::default());
        let outcome = result.unwrap();

        assert_eq!(events.len(), 11);
        for (i, event) in events.iter().take(10).enumerate() {
            assert_eq!(event.epoch, i + 1);
            assert_eq!(event.total_epochs, 10);
            assert!(!event.is_final);
            assert!(event.duration_sec.is_some());
        }
        assert_eq!(events[4].progress, 50.0);

        let last = &events[10];
        assert!(last.is_final);
        assert_eq!(last.progress, 100.0);
        assert!(last.message.as_deref().unwrap().starts_with("Final Accuracy:"));

        let report = &outcome.report;
        assert_eq!(report.summary.total_samples, 40);
        // 32 + 32 after oversampling; ceil(0.2 * 64) = 13 held out
        assert_eq!(report.summary.test_size, 13);
        assert_eq!(report.summary.train_size, 51);
        assert_eq!(report.summary.pca_variance.len(), 2);
        assert_eq!(report.charts.loss_curve.len(), 10);
        assert!(report.charts.confusion_matrix.is_some());
        assert!((0.0..=1.0).contains(&outcome.accuracy));
        assert!((0.0..=1.0).contains(&outcome.auc));
    }

    #[test]
    fn test_same_seed_is_reproducible() {
        let rows = synthetic_rows(30, 10);
        let options = TrainingOptions::default();
        let (first, _) = run(&rows, &options);
        let (second, _) = run(&rows, &options);

        assert_eq!(first.unwrap().report, second.unwrap().report);
    }

    #[test]
    fn test_confusion_matrix_optional() {
        let options = TrainingOptions {
            include_confusion_matrix: false,
            ..TrainingOptions::default()
        };
        let (result, _) = run(&synthetic_rows(20, 10), &options);
        assert!(result.unwrap().report.charts.confusion_matrix.is_none());
    }

    #[test]
    fn test_empty_rows_fail_without_events() {
        let (result, events) = run(&[], &TrainingOptions::default());
        assert!(matches!(result, Err(TrainingError::NoData(_))));
        assert!(events.is_empty());
    }

    #[test]
    fn test_too_few_rows_fail() {
        // one row per class: no oversampling, cannot stratify
        let rows = synthetic_rows(2, 1);
        let (result, events) = run(&rows, &TrainingOptions::default());
        assert!(matches!(result, Err(TrainingError::InsufficientData(_))));
        assert!(events.is_empty());
    }

    #[test]
    fn test_single_class_dataset_trains() {
        let rows = synthetic_rows(12, 0);
        let (result, events) = run(&rows, &TrainingOptions::default());
        let outcome = result.unwrap();

        assert_eq!(events.len(), 11);
        assert_eq!(outcome.auc, 0.5);
        assert_eq!(outcome.report.charts.roc_curve.fpr, vec![0.0]);
    }
}
