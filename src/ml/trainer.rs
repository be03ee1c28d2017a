// ============================================================
// Layer 5 — Training Loops
// ============================================================
// Two training paths share this file:
//
//   * fit/evaluate — the generic loop for the classifier and the
//     two taggers, driven by the SupervisedModel trait
//   * EncoderDecoderTrainer — the bucketed generator loop with
//     free-running decoding, masked NLL loss, mid-epoch resume,
//     per-epoch checkpoints and early stopping
//
// Training runs on Autodiff<NdArray>; validation uses .valid()
// to drop onto the plain NdArray backend.

use anyhow::Result;
use burn::{
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::{activation, backend::AutodiffBackend},
};

use crate::data::bucketer::Bucket;
use crate::infra::checkpoint::{CheckpointManager, CheckpointMeta};
use crate::infra::metrics::{EpochMetrics, MetricsLogger};
use crate::ml::batcher::{ClassifierBatch, SeqPairBatch, TaggerBatch, TokenBatcher};
use crate::ml::model::{AnswerGenerator, ConceptTagger, RelationClassifier};

pub type TrainBackend = burn::backend::Autodiff<burn::backend::NdArray>;
pub type EvalBackend  = burn::backend::NdArray;

// ── Supervised models: classifier + taggers ──────────────────

/// Loss tensor plus the counts behind an accuracy figure.
pub struct TrainStep<B: Backend> {
    pub loss:    Tensor<B, 1>,
    pub correct: usize,
    pub total:   usize,
}

/// Anything fit/evaluate can drive: one batch in, loss + hits out.
pub trait SupervisedModel<B: Backend> {
    type Batch: Clone;
    fn forward_step(&self, batch: Self::Batch) -> TrainStep<B>;
}

impl<B: Backend> SupervisedModel<B> for RelationClassifier<B> {
    type Batch = ClassifierBatch<B>;

    fn forward_step(&self, batch: ClassifierBatch<B>) -> TrainStep<B> {
        let logits = self.forward(batch.input_ids);
        let [batch_size, _] = logits.dims();
        let log_probs = activation::log_softmax(logits, 1);

        let picked = log_probs
            .clone()
            .gather(1, batch.labels.clone().reshape([batch_size, 1]));
        let loss = picked.mean().neg();

        let preds = log_probs.argmax(1).flatten::<1>(0, 1);
        let correct = preds
            .equal(batch.labels)
            .int().sum().into_scalar().elem::<i64>() as usize;

        TrainStep { loss, correct, total: batch_size }
    }
}

impl<B: Backend> SupervisedModel<B> for ConceptTagger<B> {
    type Batch = TaggerBatch<B>;

    /// Per-token NLL with PAD positions masked out of both the
    /// loss average and the accuracy counts.
    fn forward_step(&self, batch: TaggerBatch<B>) -> TrainStep<B> {
        let logits = self.forward(batch.input_ids.clone());
        let [batch_size, seq_len, categories] = logits.dims();
        let flat = batch_size * seq_len;

        let log_probs = activation::log_softmax(logits, 2).reshape([flat, categories]);
        let gold = batch.labels.reshape([flat]);
        let mask = batch
            .input_ids
            .reshape([flat])
            .equal_elem(self.pad_id as i32)
            .bool_not()
            .float();

        let non_pad = mask.clone().sum().into_scalar().elem::<f64>() as usize;
        let denom = non_pad.max(1) as f64;

        let picked = log_probs
            .clone()
            .gather(1, gold.clone().reshape([flat, 1]))
            .reshape([flat]);
        let loss = (picked * mask.clone()).sum().neg() / denom;

        let preds = log_probs.argmax(1).flatten::<1>(0, 1);
        let hits = preds.equal(gold).float() * mask;
        let correct = hits.sum().into_scalar().elem::<f64>() as usize;

        TrainStep { loss, correct, total: non_pad }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EvalReport {
    pub loss:     f64,
    pub accuracy: f64,
}

pub fn evaluate<B, M>(model: &M, batches: &[M::Batch]) -> EvalReport
where
    B: Backend,
    M: SupervisedModel<B>,
{
    let mut loss_sum = 0.0f64;
    let mut correct  = 0usize;
    let mut total    = 0usize;

    for batch in batches {
        let step = model.forward_step(batch.clone());
        loss_sum += step.loss.into_scalar().elem::<f64>();
        correct  += step.correct;
        total    += step.total;
    }

    EvalReport {
        loss:     if batches.is_empty() { f64::NAN } else { loss_sum / batches.len() as f64 },
        accuracy: if total > 0 { correct as f64 / total as f64 } else { 0.0 },
    }
}

/// Adam training loop shared by the classifier and both taggers.
/// Validation batches live on the inner backend so no autodiff
/// graph is built for them.
pub fn fit<B, M>(
    mut model: M,
    train:     &[<M as SupervisedModel<B>>::Batch],
    dev:       &[<M::InnerModule as SupervisedModel<B::InnerBackend>>::Batch],
    epochs:    usize,
    lr:        f64,
) -> (M, EvalReport)
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + SupervisedModel<B>,
    M::InnerModule: SupervisedModel<B::InnerBackend>,
{
    let mut optim = AdamConfig::new().with_epsilon(1e-8).init();
    let mut report = EvalReport { loss: f64::NAN, accuracy: 0.0 };

    for epoch in 1..=epochs {
        let mut loss_sum = 0.0f64;
        let mut batches  = 0usize;

        for batch in train {
            let step = model.forward_step(batch.clone());
            loss_sum += step.loss.clone().into_scalar().elem::<f64>();
            batches  += 1;

            let grads = step.loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(lr, model, grads);
        }

        let train_loss = if batches > 0 { loss_sum / batches as f64 } else { f64::NAN };
        report = evaluate(&model.valid(), dev);
        tracing::info!(
            "Epoch {:>3}/{} | train_loss={:.4} | val_loss={:.4} | val_acc={:.1}%",
            epoch, epochs, train_loss, report.loss, report.accuracy * 100.0,
        );
    }

    (model, report)
}

// ── Encoder-decoder loop ──────────────────────────────────────

pub struct Rollout<B: Backend> {
    /// Sum over timesteps of the masked per-step mean NLL
    pub loss:    Tensor<B, 1>,
    pub correct: usize,
    pub total:   usize,
}

/// Unroll the decoder across a whole target batch. In the default
/// free-running mode each step's argmax becomes the next input;
/// argmax ids carry no gradient, so every step is trained against
/// the gold token while conditioning on the model's own history.
pub fn rollout<B: Backend>(
    generator:       &AnswerGenerator<B>,
    batch:           SeqPairBatch<B>,
    pad_id:          u32,
    go_id:           u32,
    teacher_forcing: bool,
) -> Rollout<B> {
    let [batch_size, target_len] = batch.target_ids.dims();
    let device = batch.source_ids.device();

    let mut hidden = generator.encoder.forward(batch.source_ids);
    let mut input: Tensor<B, 1, Int> =
        Tensor::from_ints(vec![go_id as i32; batch_size].as_slice(), &device);

    let mut loss: Tensor<B, 1> = Tensor::zeros([1], &device);
    let mut correct = 0usize;
    let mut total   = 0usize;

    for t in 0..target_len {
        let log_probs = generator.decoder.step(input, &mut hidden);

        let gold = batch
            .target_ids
            .clone()
            .slice([0..batch_size, t..t + 1])
            .reshape([batch_size]);
        let mask = gold.clone().equal_elem(pad_id as i32).bool_not().float();
        let live = mask.clone().sum().into_scalar().elem::<f64>();

        if live > 0.0 {
            let picked = log_probs
                .clone()
                .gather(1, gold.clone().reshape([batch_size, 1]))
                .reshape([batch_size]);
            loss = loss + (picked * mask.clone()).sum().neg() / live;
        }

        let preds = log_probs.argmax(1).flatten::<1>(0, 1);
        let hits = preds.clone().equal(gold.clone()).float() * mask;
        correct += hits.sum().into_scalar().elem::<f64>() as usize;
        total   += live as usize;

        input = if teacher_forcing { gold } else { preds };
    }

    Rollout { loss, correct, total }
}

/// Free-running evaluation over every non-empty bucket.
pub fn evaluate_generator<B: Backend>(
    generator:  &AnswerGenerator<B>,
    buckets:    &[Bucket],
    batch_size: usize,
    pad_id:     u32,
    go_id:      u32,
    device:     &B::Device,
) -> EvalReport {
    let batcher = TokenBatcher::<B>::new(device.clone());
    let mut loss_sum = 0.0f64;
    let mut batches  = 0usize;
    let mut correct  = 0usize;
    let mut total    = 0usize;

    for bucket in buckets.iter().filter(|b| !b.is_empty()) {
        let mut start = 0usize;
        while start < bucket.len() {
            let end = (start + batch_size).min(bucket.len());
            let batch = batcher.seq_pair_batch(&bucket.sources[start..end], &bucket.targets[start..end]);
            let out = rollout(generator, batch, pad_id, go_id, false);

            loss_sum += out.loss.into_scalar().elem::<f64>();
            batches  += 1;
            correct  += out.correct;
            total    += out.total;
            start = end;
        }
    }

    EvalReport {
        loss:     if batches > 0 { loss_sum / batches as f64 } else { f64::NAN },
        accuracy: if total > 0 { correct as f64 / total as f64 } else { 0.0 },
    }
}

pub struct GeneratorTrainOptions {
    pub batch_size:         usize,
    pub epochs:             usize,
    pub learning_rate:      f64,
    /// Stop after this many consecutive epochs without a new best
    /// validation accuracy (0 disables early stopping)
    pub early_stopping_max: usize,
    pub teacher_forcing:    bool,
    /// Also checkpoint every N batches inside an epoch
    pub checkpoint_every:   Option<usize>,
    pub pad_id:             u32,
    pub go_id:              u32,
}

#[derive(Debug, PartialEq, Eq)]
pub enum TrainOutcome {
    /// Early stopping fired at this epoch
    Converged { epoch: usize },
    /// Ran the full epoch budget
    Exhausted,
}

pub struct EncoderDecoderTrainer<'a> {
    pub options:     GeneratorTrainOptions,
    pub checkpoints: &'a CheckpointManager,
    pub metrics:     &'a MetricsLogger,
}

impl EncoderDecoderTrainer<'_> {
    /// Train the generator over length buckets, ascending. When
    /// `resume` is set, weights, optimizer state and the
    /// {epoch, iter, best_acc} position are restored from the
    /// checkpoint directory; the first `iter` batches of the
    /// resumed epoch are skipped so no batch is trained twice.
    pub fn train(
        &self,
        mut generator: AnswerGenerator<TrainBackend>,
        train_buckets: &[Bucket],
        dev_buckets:   &[Bucket],
        resume:        bool,
    ) -> Result<(AnswerGenerator<TrainBackend>, TrainOutcome)> {
        let device = <TrainBackend as Backend>::Device::default();
        let eval_device = <EvalBackend as Backend>::Device::default();
        let mut optim = AdamConfig::new().with_epsilon(1e-8).init();

        let mut start = CheckpointMeta { epoch: 1, iter: 0, best_acc: 0.0 };
        if resume {
            let meta = self.checkpoints.load_meta()?;
            generator = self.checkpoints.load_module("generator", generator, &device)?;
            optim = optim.load_record(self.checkpoints.load_record("generator_optim", &device)?);
            tracing::info!(
                "Resuming at epoch {} iter {} (best_acc={:.4})",
                meta.epoch, meta.iter, meta.best_acc,
            );
            start = meta;
        }

        let batcher = TokenBatcher::<TrainBackend>::new(device.clone());
        let mut best_acc = start.best_acc;
        let mut stale_epochs = 0usize;
        let mut outcome = TrainOutcome::Exhausted;

        for epoch in start.epoch..=self.options.epochs {
            let skip = if epoch == start.epoch { start.iter } else { 0 };
            let mut iter = 0usize;
            let mut loss_sum = 0.0f64;
            let mut batches  = 0usize;

            for bucket in train_buckets.iter().filter(|b| !b.is_empty()) {
                let mut row = 0usize;
                while row < bucket.len() {
                    let end = (row + self.options.batch_size).min(bucket.len());
                    iter += 1;
                    if iter <= skip {
                        row = end;
                        continue;
                    }

                    let batch =
                        batcher.seq_pair_batch(&bucket.sources[row..end], &bucket.targets[row..end]);
                    let out = rollout(
                        &generator, batch,
                        self.options.pad_id, self.options.go_id,
                        self.options.teacher_forcing,
                    );
                    loss_sum += out.loss.clone().into_scalar().elem::<f64>();
                    batches  += 1;

                    let grads = out.loss.backward();
                    let grads = GradientsParams::from_grads(grads, &generator);
                    generator = optim.step(self.options.learning_rate, generator, grads);

                    if let Some(every) = self.options.checkpoint_every {
                        if iter % every == 0 {
                            self.save_checkpoint(
                                &generator, &optim,
                                &CheckpointMeta { epoch, iter, best_acc },
                            )?;
                        }
                    }
                    row = end;
                }
            }

            let train_loss = if batches > 0 { loss_sum / batches as f64 } else { f64::NAN };
            let report = evaluate_generator(
                &generator.valid(), dev_buckets,
                self.options.batch_size, self.options.pad_id, self.options.go_id,
                &eval_device,
            );

            let epoch_metrics = EpochMetrics::new(epoch, train_loss, report.loss, report.accuracy);
            self.metrics.log(&epoch_metrics)?;
            tracing::info!(
                "Epoch {:>3}/{} | train_loss={:.4} | val_loss={:.4} | val_acc={:.1}%",
                epoch, self.options.epochs, train_loss, report.loss, report.accuracy * 100.0,
            );

            if epoch_metrics.is_improvement(best_acc) {
                best_acc = report.accuracy;
                stale_epochs = 0;
            } else {
                stale_epochs += 1;
            }

            // Stored position is the place to continue from
            self.save_checkpoint(
                &generator, &optim,
                &CheckpointMeta { epoch: epoch + 1, iter: 0, best_acc },
            )?;

            if self.options.early_stopping_max > 0 && stale_epochs >= self.options.early_stopping_max {
                tracing::info!(
                    "No validation improvement for {} epochs — stopping at epoch {}",
                    stale_epochs, epoch,
                );
                outcome = TrainOutcome::Converged { epoch };
                break;
            }
        }

        Ok((generator, outcome))
    }

    fn save_checkpoint<O>(
        &self,
        generator: &AnswerGenerator<TrainBackend>,
        optim:     &O,
        meta:      &CheckpointMeta,
    ) -> Result<()>
    where
        O: Optimizer<AnswerGenerator<TrainBackend>, TrainBackend>,
    {
        self.checkpoints.save_module("generator", generator.clone())?;
        self.checkpoints.save_record("generator_optim", optim.to_record())?;
        self.checkpoints.save_meta(meta)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::bucketer::bucket;
    use crate::ml::model::{RelationClassifierConfig, Seq2SeqConfig};

    fn tiny_generator(device: &<TrainBackend as Backend>::Device) -> AnswerGenerator<TrainBackend> {
        Seq2SeqConfig::new(20, 12, 8, 6, 6, 1).init::<TrainBackend>(device)
    }

    /// Two examples in one bucket; with batch_size 2 that is one
    /// batch iteration per epoch.
    fn tiny_buckets() -> Vec<Bucket> {
        let examples = vec![
            (vec![5, 4], vec![7, 3]),
            (vec![6, 3], vec![8, 3]),
        ];
        bucket(&examples, &[5], 0, 0)
    }

    fn options(epochs: usize, early_stopping_max: usize) -> GeneratorTrainOptions {
        GeneratorTrainOptions {
            batch_size:         2,
            epochs,
            learning_rate:      0.01,
            early_stopping_max,
            teacher_forcing:    false,
            checkpoint_every:   None,
            pad_id:             0,
            go_id:              2,
        }
    }

    #[test]
    fn test_rollout_counts_only_non_pad_positions() {
        let device = Default::default();
        let generator = Seq2SeqConfig::new(20, 12, 8, 6, 6, 1).init::<EvalBackend>(&device);
        let batcher = TokenBatcher::<EvalBackend>::new(device);

        // 3 non-PAD target tokens across the batch
        let batch = batcher.seq_pair_batch(
            &[vec![5, 4, 0], vec![7, 0, 0]],
            &[vec![5, 6, 0], vec![7, 0, 0]],
        );
        let out = rollout(&generator, batch, 0, 2, false);

        assert_eq!(out.total, 3);
        assert!(out.correct <= out.total);
        assert!(out.loss.into_scalar().elem::<f64>().is_finite());
    }

    #[test]
    fn test_fit_updates_classifier_and_reports() {
        let device = Default::default();
        let model = RelationClassifierConfig::new(10, 4, 4, 1, false, 3).init::<TrainBackend>(&device);

        let train_batcher = TokenBatcher::<TrainBackend>::new(device);
        let eval_batcher  = TokenBatcher::<EvalBackend>::new(Default::default());
        let train = vec![train_batcher.classifier_batch(&[vec![4, 5], vec![6, 7]], &[0, 2])];
        let dev   = vec![eval_batcher.classifier_batch(&[vec![4, 5]], &[0])];

        let (_, report) = fit(model, &train, &dev, 2, 0.01);
        assert!(report.loss.is_finite());
        assert!((0.0..=1.0).contains(&report.accuracy));
    }

    #[test]
    fn test_early_stopping_converges_after_stale_epochs() {
        let dir = std::env::temp_dir().join(format!("kbqa-train-stop-{}", std::process::id()));
        let checkpoints = CheckpointManager::new(&dir);
        let metrics = MetricsLogger::new(&dir).unwrap();
        let device = Default::default();

        // An empty dev set scores 0.0 every epoch, which never beats
        // the running best, so the patience runs out at epoch 2
        let trainer = EncoderDecoderTrainer {
            options:     options(5, 2),
            checkpoints: &checkpoints,
            metrics:     &metrics,
        };
        let (_, outcome) = trainer
            .train(tiny_generator(&device), &tiny_buckets(), &[], false)
            .unwrap();
        assert_eq!(outcome, TrainOutcome::Converged { epoch: 2 });

        // Zero patience disables early stopping entirely
        let trainer = EncoderDecoderTrainer {
            options:     options(2, 0),
            checkpoints: &checkpoints,
            metrics:     &metrics,
        };
        let (_, outcome) = trainer
            .train(tiny_generator(&device), &tiny_buckets(), &[], false)
            .unwrap();
        assert_eq!(outcome, TrainOutcome::Exhausted);

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_resume_skips_trained_iters_and_keeps_best_acc() {
        let dir = std::env::temp_dir().join(format!("kbqa-train-resume-{}", std::process::id()));
        let checkpoints = CheckpointManager::new(&dir);
        let metrics = MetricsLogger::new(&dir).unwrap();
        let device = Default::default();
        let buckets = tiny_buckets();

        // A fresh single-epoch run seeds the module and optimizer
        // records on disk
        let trainer = EncoderDecoderTrainer {
            options:     options(1, 0),
            checkpoints: &checkpoints,
            metrics:     &metrics,
        };
        let (generator, _) = trainer
            .train(tiny_generator(&device), &buckets, &[], false)
            .unwrap();

        // Rewind the position to mid-epoch 1, past its only batch
        checkpoints
            .save_meta(&CheckpointMeta { epoch: 1, iter: 1, best_acc: 0.42 })
            .unwrap();
        trainer.train(generator, &buckets, &[], true).unwrap();

        // The resumed epoch trained nothing: its CSV row carries a
        // NaN train_loss because every batch was already consumed
        let csv = std::fs::read_to_string(metrics.csv_path()).unwrap();
        assert_eq!(csv.lines().last().unwrap(), "1,NaN,NaN,0.000000");

        // best_acc came from the checkpoint and survived the
        // no-improvement epoch; the stored position moved on
        let meta = checkpoints.load_meta().unwrap();
        assert_eq!(meta, CheckpointMeta { epoch: 2, iter: 0, best_acc: 0.42 });

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_evaluate_generator_empty_buckets() {
        let device = Default::default();
        let generator = Seq2SeqConfig::new(20, 12, 8, 6, 6, 1).init::<EvalBackend>(&device);

        let report = evaluate_generator(&generator, &[], 4, 0, 2, &device);
        assert!(report.loss.is_nan());
        assert_eq!(report.accuracy, 0.0);
    }
}
