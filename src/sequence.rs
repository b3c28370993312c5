use futures::{future, StreamExt};
use futures_channel::{mpsc, oneshot};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::error::{TbError, TbResult};
use crate::executor::Spawner;
use crate::item::StimulusItem;
use crate::model::{Phase, SinCos, Validity, PHASE_COUNT, VALIDITY_LEN};
use crate::tb_obj::TbObj;

/// Extra stimulus issued after the full phase space. The DUT pipeline needs it so that the last
/// real phase is captured before the run ends.
pub const PIPELINE_FLUSH: u32 = 2;

/// An item handed to the driver together with the channel completing it.
pub struct SeqRequest {
    pub item: StimulusItem,
    done: oneshot::Sender<StimulusItem>,
}

impl SeqRequest {
    pub fn item_done(self, item: StimulusItem) {
        // the sequence may have been dropped in the meantime, nothing left to notify then
        let _ = self.done.send(item);
    }
}

/// Serializes items of any number of sequences to the driver in arrival order.
#[derive(Clone)]
pub struct Sequencer {
    tx: mpsc::UnboundedSender<SeqRequest>,
}

/// Driver side of the sequencer.
pub struct SeqItemPort {
    rx: mpsc::UnboundedReceiver<SeqRequest>,
}

impl Sequencer {
    pub fn new() -> (Self, SeqItemPort) {
        let (tx, rx) = mpsc::unbounded();
        (Self { tx }, SeqItemPort { rx })
    }

    /// Hands the item to the driver and suspends until the driver completed it.
    /// A malformed validity strobe is rejected here, the driver never sees it.
    pub async fn execute_item(&self, item: StimulusItem) -> TbResult<StimulusItem> {
        item.validity().check()?;
        let (done, rx) = oneshot::channel();
        self.tx
            .unbounded_send(SeqRequest { item, done })
            .map_err(|_| TbError::SequencerClosed)?;
        rx.await.map_err(|_| TbError::SequencerClosed)
    }
}

impl SeqItemPort {
    /// Next item, `None` once every sequencer handle is gone.
    pub async fn get_next_item(&mut self) -> Option<SeqRequest> {
        self.rx.next().await
    }
}

/// Runs a single item through the DUT and returns what came back.
pub async fn sincos(seqr: &Sequencer, phase: Phase, validity: Validity) -> TbResult<SinCos> {
    let item = seqr
        .execute_item(StimulusItem::new("seq_item", phase, validity))
        .await?;
    Ok(item.trig().value())
}

/// Phase indices `0, step, 2*step, ...` below `PHASE_COUNT + PIPELINE_FLUSH`.
pub fn phase_indices(step: u32) -> Vec<u32> {
    (0..PHASE_COUNT + PIPELINE_FLUSH)
        .step_by(step.max(1) as usize)
        .collect()
}

/// Sequence issuing one item per phase index, each with a fresh random validity strobe.
pub struct PhaseSeq {
    name: String,
    indices: Vec<u32>,
    validity_len: usize,
    rng: StdRng,
}

impl PhaseSeq {
    pub fn sequential(step: u32, seed: u64) -> Self {
        Self::from_indices("sequential", phase_indices(step), seed)
    }

    /// Same phases as `sequential`, visited in a random permutation.
    pub fn random(step: u32, seed: u64) -> Self {
        let mut seq = Self::from_indices("random", phase_indices(step), seed);
        seq.indices.shuffle(&mut seq.rng);
        seq
    }

    pub fn from_indices(name: &str, indices: Vec<u32>, seed: u64) -> Self {
        Self {
            name: name.to_string(),
            indices,
            validity_len: VALIDITY_LEN,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn with_validity_len(mut self, len: usize) -> Self {
        self.validity_len = len.max(1);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Runs the sequence to completion and returns the completed items in issue order.
    pub async fn run(mut self, seqr: Sequencer) -> TbResult<Vec<StimulusItem>> {
        let mut done = Vec::with_capacity(self.indices.len());
        for &index in &self.indices {
            let validity = Validity::random(&mut self.rng, self.validity_len);
            let item = StimulusItem::new("sincos_tr", Phase::wrapping(index), validity);
            done.push(seqr.execute_item(item).await?);
        }
        Ok(done)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Composition {
    /// Sequential sweep, then the random permutation.
    Serial,
    /// Both sweeps started at once and joined.
    Parallel,
}

/// Completed items per sequence name.
pub type SequenceLog = TbObj<Vec<(String, Vec<StimulusItem>)>>;

/// The sequential and random sweeps, composed serially or in parallel.
pub struct TestAllSeq {
    pub composition: Composition,
    pub step: u32,
    pub seed: u64,
    pub validity_len: usize,
}

impl TestAllSeq {
    pub async fn run(self, seqr: Sequencer, spawner: Spawner, log: SequenceLog) -> TbResult {
        let sequential = PhaseSeq::sequential(self.step, self.seed).with_validity_len(self.validity_len);
        let random = PhaseSeq::random(self.step, self.seed.wrapping_add(1))
            .with_validity_len(self.validity_len);
        match self.composition {
            Composition::Serial => {
                run_logged(sequential, seqr.clone(), log.clone()).await?;
                run_logged(random, seqr, log).await
            }
            Composition::Parallel => {
                let a = spawner.spawn("sequential", run_logged(sequential, seqr.clone(), log.clone()));
                let b = spawner.spawn("random", run_logged(random, seqr, log));
                let (ra, rb) = future::join(a, b).await;
                ra.and(rb)
            }
        }
    }
}

async fn run_logged(seq: PhaseSeq, seqr: Sequencer, log: SequenceLog) -> TbResult {
    let name = seq.name().to_string();
    let items = seq.run(seqr).await?;
    log.with_mut(|l| l.push((name, items)));
    Ok(())
}
