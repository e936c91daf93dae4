//! Audio-side half of a chain.
//!
//! [`ChainRenderer`] owns every processor instance and every node buffer. It
//! is moved to the audio thread and driven by [`process`](ChainRenderer::process).
//! Topology changes reach it only as [`ChainUpdate`]s pulled with `try_recv` at
//! block boundaries. Anything it lets go of (replaced processors, old
//! snapshots, spent update containers) is sent back to the control side so
//! that deallocation never happens on the audio thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use crossbeam_channel::{Receiver, Sender};

use crate::meter::LevelMeter;
use crate::processor::Processor;

use super::buffer::StereoBuffer;
use super::node::{NodeId, NodeRole};
use super::snapshot::ChainSnapshot;

/// Sample rate and block size shared between the two halves of a chain.
///
/// Written by [`ChainRenderer::prepare`], read by the control side when it
/// prepares newly added nodes.
#[derive(Debug)]
pub(crate) struct SharedSpec {
    sample_rate: AtomicU32,
    block_size: AtomicUsize,
}

impl SharedSpec {
    pub(crate) fn new(sample_rate: f32, block_size: usize) -> Self {
        Self {
            sample_rate: AtomicU32::new(sample_rate.to_bits()),
            block_size: AtomicUsize::new(block_size),
        }
    }

    pub(crate) fn store(&self, sample_rate: f32, block_size: usize) {
        self.sample_rate.store(sample_rate.to_bits(), Ordering::Release);
        self.block_size.store(block_size, Ordering::Release);
    }

    pub(crate) fn load(&self) -> (f32, usize) {
        (
            f32::from_bits(self.sample_rate.load(Ordering::Acquire)),
            self.block_size.load(Ordering::Acquire),
        )
    }
}

/// One atomic topology change, in transit from control to audio.
pub(crate) struct ChainUpdate {
    /// The plan to render from now on. After applying, holds the old plan.
    pub(crate) snapshot: Arc<ChainSnapshot>,
    /// Spec the installed processors were prepared at.
    pub(crate) prepared_at: (f32, usize),
    /// Slots to empty, applied before `installs`.
    pub(crate) retires: Vec<usize>,
    /// Processors to move into slots.
    pub(crate) installs: Vec<(usize, Box<dyn Processor>)>,
    /// Filled by the renderer with the processors it let go of.
    /// Pre-sized by the sender so pushing never allocates.
    pub(crate) released: Vec<Box<dyn Processor>>,
}

/// Audio-thread owner of a chain's processors and buffers.
pub struct ChainRenderer {
    slots: Vec<Option<Box<dyn Processor>>>,
    buffers: Vec<StereoBuffer>,
    scratch: StereoBuffer,
    snapshot: Arc<ChainSnapshot>,
    updates: Receiver<ChainUpdate>,
    retired: Sender<ChainUpdate>,
    spec: Arc<SharedSpec>,
    input_meter: Arc<LevelMeter>,
    output_meter: Arc<LevelMeter>,
    sample_rate: f32,
    block_size: usize,
}

impl ChainRenderer {
    pub(crate) fn new(
        slot_count: usize,
        snapshot: Arc<ChainSnapshot>,
        updates: Receiver<ChainUpdate>,
        retired: Sender<ChainUpdate>,
        spec: Arc<SharedSpec>,
        input_meter: Arc<LevelMeter>,
        output_meter: Arc<LevelMeter>,
    ) -> Self {
        let (sample_rate, block_size) = spec.load();
        let block_size = block_size.max(1);
        Self {
            slots: (0..slot_count).map(|_| None).collect(),
            buffers: (0..slot_count).map(|_| StereoBuffer::new(block_size)).collect(),
            scratch: StereoBuffer::new(block_size),
            snapshot,
            updates,
            retired,
            spec,
            input_meter,
            output_meter,
            sample_rate,
            block_size,
        }
    }

    /// Reconfigures for a new sample rate or maximum block size.
    ///
    /// Host-side call made while the stream is stopped: it allocates, and it
    /// re-prepares every installed processor.
    pub fn prepare(&mut self, sample_rate: f32, block_size: usize) {
        let block_size = block_size.max(1);
        self.apply_updates();
        self.sample_rate = sample_rate;
        self.block_size = block_size;
        self.spec.store(sample_rate, block_size);
        for buffer in &mut self.buffers {
            buffer.resize(block_size);
        }
        self.scratch.resize(block_size);
        for processor in self.slots.iter_mut().flatten() {
            processor.prepare(sample_rate, block_size);
        }
    }

    /// Session sample rate.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Largest block rendered in one pass. Longer host buffers are chunked.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Generation of the snapshot currently being rendered.
    pub fn generation(&self) -> u64 {
        self.snapshot.generation()
    }

    /// Render plan currently in use.
    pub fn snapshot(&self) -> &ChainSnapshot {
        &self.snapshot
    }

    /// Solver fallbacks reported by `node`, or `None` if it is not installed.
    pub fn solver_fallbacks(&self, node: NodeId) -> Option<u64> {
        let slot = self.snapshot.slot_of(node)?;
        self.slots
            .get(slot)?
            .as_ref()
            .map(|p| p.solver_fallbacks())
    }

    /// Sum of solver fallbacks over every installed processor.
    pub fn total_solver_fallbacks(&self) -> u64 {
        self.slots.iter().flatten().map(|p| p.solver_fallbacks()).sum()
    }

    /// Processes one stereo buffer in place.
    ///
    /// Applies pending topology updates first. Channels of unequal length are
    /// processed up to the shorter one.
    pub fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        self.apply_updates();
        let len = left.len().min(right.len());
        let mut start = 0;
        while start < len {
            let end = (start + self.block_size).min(len);
            self.render_block(&mut left[start..end], &mut right[start..end]);
            start = end;
        }
    }

    fn apply_updates(&mut self) {
        while let Ok(mut update) = self.updates.try_recv() {
            for &slot in &update.retires {
                if let Some(old) = self.slots.get_mut(slot).and_then(Option::take) {
                    update.released.push(old);
                }
            }
            let current = (self.sample_rate, self.block_size);
            for (slot, mut processor) in update.installs.drain(..) {
                if update.prepared_at != current {
                    // only when a prepare raced the mutation
                    processor.prepare(current.0, current.1);
                }
                if let Some(target) = self.slots.get_mut(slot) {
                    if let Some(old) = target.replace(processor) {
                        update.released.push(old);
                    }
                } else {
                    update.released.push(processor);
                }
            }
            core::mem::swap(&mut self.snapshot, &mut update.snapshot);
            if let Err(err) = self.retired.try_send(update) {
                // control side is gone or lagging; drop here as a last resort
                drop(err.into_inner());
            }
        }
    }

    fn render_block(&mut self, left: &mut [f32], right: &mut [f32]) {
        let n = left.len();
        self.input_meter.update(left, right);

        let Self {
            slots,
            buffers,
            scratch,
            snapshot,
            ..
        } = self;

        for step in snapshot.steps() {
            if step.role == NodeRole::Input {
                buffers[step.slot].copy_from(left, right);
                continue;
            }

            scratch.clear(n);
            for &src in &step.audio_sources {
                scratch.accumulate(&buffers[src], n);
            }
            core::mem::swap(&mut buffers[step.slot], scratch);

            let Some(processor) = slots[step.slot].as_mut() else {
                continue;
            };
            for &(port, src) in &step.control_sources {
                processor.set_control_input(port, &buffers[src].left[..n]);
            }
            if processor.params().is_on() {
                let out = &mut buffers[step.slot];
                processor.process_audio(&mut out.left[..n], &mut out.right[..n]);
            }
        }

        let out = &buffers[snapshot.output_slot()];
        left.copy_from_slice(&out.left[..n]);
        right.copy_from_slice(&out.right[..n]);
        self.output_meter.update(left, right);
    }
}

impl core::fmt::Debug for ChainRenderer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ChainRenderer")
            .field("generation", &self.generation())
            .field("sample_rate", &self.sample_rate)
            .field("block_size", &self.block_size)
            .field("installed", &self.slots.iter().flatten().count())
            .finish()
    }
}
