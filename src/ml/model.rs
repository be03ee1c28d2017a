use burn::{
    nn::{
        Embedding, EmbeddingConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation,
};

// ============================================================
// Recurrent building block
// ============================================================
// Single Elman-style cell, unrolled by hand one timestep at a
// time. Free-running decoding feeds each argmax back in as the
// next input, which needs per-step control the packaged RNN
// modules do not give.

#[derive(Module, Debug)]
pub struct RecurrentCell<B: Backend> {
    pub input:  Linear<B>,
    pub hidden: Linear<B>,
}

impl<B: Backend> RecurrentCell<B> {
    /// h' = tanh(W_in·x + W_h·h + b)
    pub fn forward(&self, x: Tensor<B, 2>, h: Tensor<B, 2>) -> Tensor<B, 2> {
        activation::tanh(self.input.forward(x) + self.hidden.forward(h))
    }
}

fn init_cell<B: Backend>(input_size: usize, hidden_size: usize, device: &B::Device) -> RecurrentCell<B> {
    RecurrentCell {
        input:  LinearConfig::new(input_size, hidden_size).init(device),
        hidden: LinearConfig::new(hidden_size, hidden_size).with_bias(false).init(device),
    }
}

fn init_stack<B: Backend>(
    input_size:  usize,
    hidden_size: usize,
    n_layers:    usize,
    device:      &B::Device,
) -> Vec<RecurrentCell<B>> {
    (0..n_layers)
        .map(|layer| {
            let in_size = if layer == 0 { input_size } else { hidden_size };
            init_cell(in_size, hidden_size, device)
        })
        .collect()
}

fn zero_hidden<B: Backend>(
    n_layers:    usize,
    batch:       usize,
    hidden_size: usize,
    device:      &B::Device,
) -> Vec<Tensor<B, 2>> {
    (0..n_layers)
        .map(|_| Tensor::zeros([batch, hidden_size], device))
        .collect()
}

/// Advance every layer of a stack by one timestep. `hidden` is
/// updated in place; the return value is the top layer's output.
fn step_stack<B: Backend>(
    cells:  &[RecurrentCell<B>],
    input:  Tensor<B, 2>,
    hidden: &mut [Tensor<B, 2>],
) -> Tensor<B, 2> {
    let mut x = input;
    for (layer, cell) in cells.iter().enumerate() {
        let h = cell.forward(x, hidden[layer].clone());
        hidden[layer] = h.clone();
        x = h;
    }
    x
}

/// Slice out timestep `t` from an embedded batch: [batch, seq, emb] → [batch, emb]
fn at_timestep<B: Backend>(embedded: &Tensor<B, 3>, t: usize) -> Tensor<B, 2> {
    let [batch, _, emb] = embedded.dims();
    embedded
        .clone()
        .slice([0..batch, t..t + 1, 0..emb])
        .squeeze(1)
}

// ============================================================
// Sequence encoder — shared by classifier and taggers
// ============================================================

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally — do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct SequenceEncoderConfig {
    pub vocab_size:    usize,
    pub embedding_dim: usize,
    pub hidden_size:   usize,
    pub n_layers:      usize,
    pub bidirectional: bool,
}

impl SequenceEncoderConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> SequenceEncoder<B> {
        let embedding = EmbeddingConfig::new(self.vocab_size, self.embedding_dim).init(device);
        let forward_cells  = init_stack(self.embedding_dim, self.hidden_size, self.n_layers, device);
        let backward_cells = self
            .bidirectional
            .then(|| init_stack(self.embedding_dim, self.hidden_size, self.n_layers, device));
        SequenceEncoder {
            embedding, forward_cells, backward_cells,
            hidden_size: self.hidden_size,
        }
    }

    /// Width of the per-token feature vector this encoder produces.
    pub fn feature_size(&self) -> usize {
        if self.bidirectional { self.hidden_size * 2 } else { self.hidden_size }
    }
}

#[derive(Module, Debug)]
pub struct SequenceEncoder<B: Backend> {
    pub embedding:      Embedding<B>,
    pub forward_cells:  Vec<RecurrentCell<B>>,
    pub backward_cells: Option<Vec<RecurrentCell<B>>>,
    pub hidden_size:    usize,
}

pub struct EncoderOutput<B: Backend> {
    /// Per-token features: [batch, seq_len, feature_size]
    pub features: Tensor<B, 3>,
    /// Summary of the whole sequence: [batch, feature_size]
    pub final_state: Tensor<B, 2>,
}

impl<B: Backend> SequenceEncoder<B> {
    pub fn forward(&self, input_ids: Tensor<B, 2, Int>) -> EncoderOutput<B> {
        let [batch, seq_len] = input_ids.dims();
        let embedded = self.embedding.forward(input_ids);
        let device = embedded.device();

        let mut hidden = zero_hidden(self.forward_cells.len(), batch, self.hidden_size, &device);
        let mut outputs = Vec::with_capacity(seq_len);
        for t in 0..seq_len {
            outputs.push(step_stack(&self.forward_cells, at_timestep(&embedded, t), &mut hidden));
        }
        let forward_final = outputs[seq_len - 1].clone();
        let forward_features: Tensor<B, 3> = Tensor::stack(outputs, 1);

        let Some(backward_cells) = &self.backward_cells else {
            return EncoderOutput { features: forward_features, final_state: forward_final };
        };

        // Backward pass runs right-to-left; its outputs are collected
        // in reading order so the two directions line up per token.
        let mut hidden = zero_hidden(backward_cells.len(), batch, self.hidden_size, &device);
        let mut outputs = Vec::with_capacity(seq_len);
        for t in (0..seq_len).rev() {
            outputs.push(step_stack(backward_cells, at_timestep(&embedded, t), &mut hidden));
        }
        let backward_final = outputs[seq_len - 1].clone();
        outputs.reverse();
        let backward_features: Tensor<B, 3> = Tensor::stack(outputs, 1);

        EncoderOutput {
            features:    Tensor::cat(vec![forward_features, backward_features], 2),
            final_state: Tensor::cat(vec![forward_final, backward_final], 1),
        }
    }
}

// ============================================================
// Relation classifier — one label per question
// ============================================================

#[derive(Config, Debug)]
pub struct RelationClassifierConfig {
    pub vocab_size:    usize,
    pub embedding_dim: usize,
    pub hidden_size:   usize,
    pub n_layers:      usize,
    pub bidirectional: bool,
    pub num_classes:   usize,
}

impl RelationClassifierConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> RelationClassifier<B> {
        let encoder_cfg = SequenceEncoderConfig::new(
            self.vocab_size, self.embedding_dim, self.hidden_size,
            self.n_layers, self.bidirectional,
        );
        RelationClassifier {
            encoder: encoder_cfg.init(device),
            head:    LinearConfig::new(encoder_cfg.feature_size(), self.num_classes).init(device),
        }
    }
}

#[derive(Module, Debug)]
pub struct RelationClassifier<B: Backend> {
    pub encoder: SequenceEncoder<B>,
    pub head:    Linear<B>,
}

impl<B: Backend> RelationClassifier<B> {
    /// input_ids: [batch, seq_len] → logits: [batch, num_classes]
    pub fn forward(&self, input_ids: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        self.head.forward(self.encoder.forward(input_ids).final_state)
    }
}

// ============================================================
// Concept tagger — one category per token
// ============================================================

#[derive(Config, Debug)]
pub struct ConceptTaggerConfig {
    pub vocab_size:    usize,
    pub embedding_dim: usize,
    pub hidden_size:   usize,
    pub n_layers:      usize,
    pub bidirectional: bool,
    pub categories:    usize,
    pub pad_id:        usize,
}

impl ConceptTaggerConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> ConceptTagger<B> {
        let encoder_cfg = SequenceEncoderConfig::new(
            self.vocab_size, self.embedding_dim, self.hidden_size,
            self.n_layers, self.bidirectional,
        );
        ConceptTagger {
            encoder: encoder_cfg.init(device),
            head:    LinearConfig::new(encoder_cfg.feature_size(), self.categories).init(device),
            pad_id:  self.pad_id,
        }
    }
}

#[derive(Module, Debug)]
pub struct ConceptTagger<B: Backend> {
    pub encoder: SequenceEncoder<B>,
    pub head:    Linear<B>,
    /// PAD positions are excluded from loss and accuracy
    pub pad_id:  usize,
}

impl<B: Backend> ConceptTagger<B> {
    /// input_ids: [batch, seq_len] → logits: [batch, seq_len, categories]
    pub fn forward(&self, input_ids: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        self.head.forward(self.encoder.forward(input_ids).features)
    }
}

// ============================================================
// Answer generator — encoder/decoder pair
// ============================================================
// One wrapping module holds both halves, so a single backward
// pass and optimizer update covers every parameter and the
// checkpoint manager records the whole generator under one name.
// The encoder's final hidden states pass through a per-layer
// bridge projection because the two sides may use different
// widths.

#[derive(Config, Debug)]
pub struct Seq2SeqConfig {
    pub source_vocab_size:   usize,
    pub target_vocab_size:   usize,
    pub embedding_dim:       usize,
    pub encoder_hidden_size: usize,
    pub decoder_hidden_size: usize,
    pub n_layers:            usize,
}

impl Seq2SeqConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> AnswerGenerator<B> {
        let encoder = Seq2SeqEncoder {
            embedding: EmbeddingConfig::new(self.source_vocab_size, self.embedding_dim).init(device),
            cells:     init_stack(self.embedding_dim, self.encoder_hidden_size, self.n_layers, device),
            bridge:    LinearConfig::new(self.encoder_hidden_size, self.decoder_hidden_size).init(device),
            hidden_size: self.encoder_hidden_size,
        };
        let decoder = Seq2SeqDecoder {
            embedding: EmbeddingConfig::new(self.target_vocab_size, self.embedding_dim).init(device),
            cells:     init_stack(self.embedding_dim, self.decoder_hidden_size, self.n_layers, device),
            out:       LinearConfig::new(self.decoder_hidden_size, self.target_vocab_size).init(device),
            hidden_size: self.decoder_hidden_size,
        };
        AnswerGenerator { encoder, decoder }
    }
}

#[derive(Module, Debug)]
pub struct AnswerGenerator<B: Backend> {
    pub encoder: Seq2SeqEncoder<B>,
    pub decoder: Seq2SeqDecoder<B>,
}

#[derive(Module, Debug)]
pub struct Seq2SeqEncoder<B: Backend> {
    pub embedding:   Embedding<B>,
    pub cells:       Vec<RecurrentCell<B>>,
    pub bridge:      Linear<B>,
    pub hidden_size: usize,
}

impl<B: Backend> Seq2SeqEncoder<B> {
    /// Encode a (reversed, padded) source batch into the decoder's
    /// initial hidden state, one tensor per layer: [batch, dec_hidden]
    pub fn forward(&self, source_ids: Tensor<B, 2, Int>) -> Vec<Tensor<B, 2>> {
        let [batch, seq_len] = source_ids.dims();
        let embedded = self.embedding.forward(source_ids);
        let device = embedded.device();

        let mut hidden = zero_hidden(self.cells.len(), batch, self.hidden_size, &device);
        for t in 0..seq_len {
            step_stack(&self.cells, at_timestep(&embedded, t), &mut hidden);
        }

        hidden
            .into_iter()
            .map(|h| self.bridge.forward(h))
            .collect()
    }
}

#[derive(Module, Debug)]
pub struct Seq2SeqDecoder<B: Backend> {
    pub embedding:   Embedding<B>,
    pub cells:       Vec<RecurrentCell<B>>,
    pub out:         Linear<B>,
    pub hidden_size: usize,
}

impl<B: Backend> Seq2SeqDecoder<B> {
    /// One decoding step. input_ids: [batch] → log-probs: [batch, target_vocab].
    /// `hidden` is advanced in place.
    pub fn step(
        &self,
        input_ids: Tensor<B, 1, Int>,
        hidden:    &mut [Tensor<B, 2>],
    ) -> Tensor<B, 2> {
        let [batch] = input_ids.dims();
        let embedded = self
            .embedding
            .forward(input_ids.reshape([batch, 1]))
            .squeeze(1);
        let top = step_stack(&self.cells, embedded, hidden);
        activation::log_softmax(self.out.forward(top), 1)
    }
}
