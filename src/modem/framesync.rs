//! Frame synchronizer
//!
//! Streaming receiver for frames built by [`FrameGenerator`](super::FrameGenerator).
//!
//! ## Pipeline
//!
//! ```text
//! samples → preamble detector ─(detect)─┐
//!                                       ▼
//!           coarse NCO → 1/gain → symbol timing (PFB) → fine NCO/PLL → equalizer → demod
//!                                                                           │
//!                        header codec ◄── RxHeader ◄────────────────────────┤
//!                        payload codec ◄── RxPayload ◄──────────────────────┘
//! ```
//!
//! On detection the detector's buffered window (preamble plus filter
//! warm-up) is queued for replay ahead of any remaining queued samples.
//! `execute` drains that queue after every input sample, so replay never
//! recurses and a frame always consumes more samples than a replay adds.
//!
//! The first `PREAMBLE_LEN` symbols after detection are the known preamble.
//! They give a fine frequency/phase estimate for the symbol-rate PLL and
//! train the equalizer before the header arrives.

use std::collections::VecDeque;

use num_complex::Complex32;

use super::codec::PacketCodec;
use super::header::{decode_header, header_codec, HeaderFault};
use super::modulation::{Decision, Modem};
use super::preamble::{Preamble, PREAMBLE_LEN};
use crate::adapters::LogObserver;
use crate::domain::{
    DetectionStats, EqualizerKind, FrameDataStats, FrameStats, FrameSyncConfig, FrameSyncState,
    PayloadProperties, SyncResult,
};
use crate::dsp::{Equalizer, LmsEqualizer, Nco, PreambleDetector, RlsEqualizer, SymbolSync};
use crate::ports::{Frame, FrameHandler, SyncObserver};

pub struct FrameSynchronizer<H: FrameHandler> {
    config: FrameSyncConfig,
    handler: H,
    observer: Box<dyn SyncObserver>,

    preamble: Preamble,
    detector: PreambleDetector,
    /// Sample-rate mixer seeded from the detector
    coarse: Nco,
    /// Input scale, 1/gamma_hat
    gain: f32,
    symsync: SymbolSync,
    /// Symbol-rate carrier tracking
    fine: Nco,
    equalizer: Box<dyn Equalizer>,
    header_codec: PacketCodec,
    payload_codec: PacketCodec,

    state: FrameSyncState,
    replay: VecDeque<Complex32>,
    /// Set for the duration of `execute`; still set after a panic unwound
    /// through it
    executing: bool,

    detection: DetectionStats,
    preamble_rx: Vec<Complex32>,
    header_symbols: Vec<u8>,
    header_user: Vec<u8>,
    payload_symbols: Vec<u8>,
    payload_samples: Vec<Complex32>,
    evm_sum: f32,
    evm_count: usize,

    stats: FrameDataStats,
}

impl<H: FrameHandler> FrameSynchronizer<H> {
    /// Synchronizer tracing through [`LogObserver`]
    pub fn new(config: &FrameSyncConfig, handler: H) -> SyncResult<Self> {
        Self::with_observer(config, handler, Box::new(LogObserver))
    }

    pub fn with_observer(
        config: &FrameSyncConfig,
        handler: H,
        observer: Box<dyn SyncObserver>,
    ) -> SyncResult<Self> {
        config.validate()?;

        let k = config.samples_per_symbol;
        let m = config.filter_semi_length;
        let beta = config.excess_bandwidth;

        let preamble = Preamble::new(k, m, beta);
        let detector = PreambleDetector::new(
            preamble.template(),
            k * m,
            config.detection_threshold,
            config.dphi_max,
        );

        let mut symsync = SymbolSync::new(k, m, beta, config.num_filters)?;
        symsync.set_bandwidth(config.timing_bandwidth);

        let mut fine = Nco::new(0.0);
        fine.pll_set_bandwidth(config.pll_bandwidth);

        let equalizer: Box<dyn Equalizer> = match config.equalizer {
            EqualizerKind::Lms => Box::new(LmsEqualizer::new(config.equalizer_len, config.equalizer_mu)),
            EqualizerKind::Rls => Box::new(RlsEqualizer::new(config.equalizer_len, config.equalizer_mu)),
        };

        let header_codec = header_codec(config.header_user_len)?;
        let payload_codec = PacketCodec::new(&config.payload)?;

        log::debug!(
            "Frame synchronizer: k={k} m={m} beta={beta} P={} header={} symbols",
            config.num_filters,
            header_codec.num_symbols()
        );

        Ok(Self {
            config: config.clone(),
            handler,
            observer,
            preamble,
            detector,
            coarse: Nco::new(0.0),
            gain: 1.0,
            symsync,
            fine,
            equalizer,
            header_codec,
            payload_codec,
            state: FrameSyncState::Detect,
            replay: VecDeque::new(),
            executing: false,
            detection: DetectionStats::default(),
            preamble_rx: Vec::with_capacity(PREAMBLE_LEN),
            header_symbols: Vec::new(),
            header_user: Vec::new(),
            payload_symbols: Vec::new(),
            payload_samples: Vec::new(),
            evm_sum: 0.0,
            evm_count: 0,
            stats: FrameDataStats::default(),
        })
    }

    pub fn set_observer(&mut self, observer: Box<dyn SyncObserver>) {
        self.observer = observer;
    }

    pub fn config(&self) -> &FrameSyncConfig {
        &self.config
    }

    pub fn state(&self) -> FrameSyncState {
        self.state
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    pub fn into_handler(self) -> H {
        self.handler
    }

    /// Header codec; its lengths are fixed by configuration
    pub fn header_codec(&self) -> &PacketCodec {
        &self.header_codec
    }

    /// Payload codec as configured by the most recent valid header
    pub fn payload_codec(&self) -> &PacketCodec {
        &self.payload_codec
    }

    /// Estimates from the most recent detection
    pub fn detection(&self) -> &DetectionStats {
        &self.detection
    }

    /// Fractional timing of the last recovered symbol, samples
    pub fn timing(&self) -> f32 {
        self.symsync.get_tau()
    }

    pub fn framedatastats(&self) -> FrameDataStats {
        self.stats
    }

    pub fn reset_framedatastats(&mut self) {
        self.stats = FrameDataStats::default();
    }

    /// Process a block of samples, invoking the handler for each completed
    /// frame attempt
    ///
    /// # Panics
    /// If an earlier call on this instance did not return (a panicking frame
    /// handler leaves the synchronizer in this state until [`Self::reset`]).
    pub fn execute(&mut self, samples: &[Complex32]) {
        assert!(
            !self.executing,
            "FrameSynchronizer::execute re-entered: an earlier call did not complete; call reset() first"
        );
        self.executing = true;

        for &x in samples {
            self.step(x);
            while let Some(y) = self.replay.pop_front() {
                self.step(y);
            }
        }

        self.executing = false;
    }

    /// Abort any reception in progress without a callback and return to
    /// detection. Cumulative counters are kept.
    pub fn reset(&mut self) {
        self.reset_frame();
        self.replay.clear();
        self.executing = false;
        if let Err(err) = self.payload_codec.configure(&self.config.payload) {
            log::warn!("Could not restore payload configuration: {err}");
        }
        self.observer.reset();
    }

    fn step(&mut self, x: Complex32) {
        match self.state {
            FrameSyncState::Detect => {
                if let Some(stats) = self.detector.push(x) {
                    self.start_frame(stats);
                }
            }
            FrameSyncState::RxHeader | FrameSyncState::RxPayload => {
                let y = self.coarse.mix_down(x) * self.gain;
                self.coarse.step();
                if let Some(symbol) = self.symsync.step(y) {
                    self.receive_symbol(symbol);
                }
            }
        }
    }

    fn start_frame(&mut self, stats: DetectionStats) {
        self.stats.frames_detected += 1;
        self.observer.frame_detected(&stats);
        self.detection = stats;

        self.coarse.set_frequency(stats.dphi_hat);
        self.coarse.set_phase(stats.phi_hat);
        self.gain = stats.gamma_hat.max(f32::EPSILON).recip();

        // Symbol 0 peaks `k*m + tau_hat` samples into the replay window and
        // the matched filter adds another `k*m`
        let lead = (self.config.samples_per_symbol * self.config.filter_semi_length) as f32;
        self.symsync.reset();
        self.symsync.set_timing(2.0 * lead + stats.tau_hat);

        for &x in self.detector.buffer().iter().rev() {
            self.replay.push_front(x);
        }
        self.detector.reset();
        self.state = FrameSyncState::RxHeader;
    }

    fn receive_symbol(&mut self, symbol: Complex32) {
        match self.state {
            FrameSyncState::Detect => {}
            FrameSyncState::RxHeader => {
                if self.preamble_rx.len() < PREAMBLE_LEN {
                    self.preamble_rx.push(symbol);
                    if self.preamble_rx.len() == PREAMBLE_LEN {
                        self.sync_preamble();
                    }
                    return;
                }

                let (_, decision) = track(
                    &mut self.fine,
                    self.equalizer.as_mut(),
                    self.header_codec.modem(),
                    symbol,
                );
                self.accumulate_evm(&decision);
                self.header_symbols.push(decision.symbol);
                if self.header_symbols.len() == self.header_codec.num_symbols() {
                    self.finish_header();
                }
            }
            FrameSyncState::RxPayload => {
                let (z, decision) = track(
                    &mut self.fine,
                    self.equalizer.as_mut(),
                    self.payload_codec.modem(),
                    symbol,
                );
                self.accumulate_evm(&decision);
                self.payload_symbols.push(decision.symbol);
                self.payload_samples.push(z);
                if self.payload_symbols.len() == self.payload_codec.num_symbols() {
                    self.finish_payload();
                }
            }
        }
    }

    /// Fine carrier estimate from the received preamble, then PLL and
    /// equalizer training over it
    fn sync_preamble(&mut self) {
        let pn = self.preamble.symbols();
        let r: Vec<Complex32> = self.preamble_rx.iter().zip(pn).map(|(x, &p)| x * p).collect();

        let slope: Complex32 = r.windows(2).map(|w| w[1] * w[0].conj()).sum();
        let dphi = if slope.norm_sqr() > 0.0 { slope.arg() } else { 0.0 };
        let rotated: Complex32 = r
            .iter()
            .enumerate()
            .map(|(i, x)| x * Complex32::from_polar(1.0, -dphi * i as f32))
            .sum();
        let theta = if rotated.norm_sqr() > 0.0 { rotated.arg() } else { 0.0 };

        self.fine.set_frequency(dphi);
        self.fine.set_phase(theta);
        self.observer.preamble_synchronized(dphi, theta);

        for (&x, &p) in self.preamble_rx.iter().zip(pn) {
            let reference = Complex32::new(p, 0.0);
            let z = self.equalizer.push_execute(self.fine.mix_down(x));
            let error = z * reference;
            if error.norm_sqr() > 0.0 {
                self.fine.pll_step(error.arg());
            }
            self.fine.step();
            self.equalizer.step(reference, z);
        }
    }

    fn finish_header(&mut self) {
        let (bytes, crc_ok) = self.header_codec.decode(&self.header_symbols);
        let user_len = self.config.header_user_len;
        self.header_user.clear();
        self.header_user.extend_from_slice(&bytes[..user_len]);

        let parsed = if crc_ok {
            decode_header(&bytes)
        } else {
            Err(HeaderFault::Checksum)
        };
        let configured = parsed.and_then(|props| {
            self.payload_codec
                .configure(&props)
                .map(|()| props)
                .map_err(|_| HeaderFault::Length(props.payload_len))
        });

        match configured {
            Ok(props) => {
                self.stats.headers_valid += 1;
                self.observer.header_decoded(&props);
                if self.config.lock_timing_on_payload {
                    self.symsync.lock();
                }
                self.state = FrameSyncState::RxPayload;
                if self.payload_codec.num_symbols() == 0 {
                    self.finish_payload();
                }
            }
            Err(fault) => {
                self.observer.header_rejected(fault);
                let frame = Frame {
                    header: &self.header_user,
                    header_valid: false,
                    payload: None,
                    payload_valid: false,
                    symbols: &[],
                    stats: self.frame_stats(None),
                };
                let status = self.handler.on_frame(&frame);
                if status != 0 {
                    self.observer.callback_returned(status);
                }
                self.reset_frame();
            }
        }
    }

    fn finish_payload(&mut self) {
        let (payload, valid) = self.payload_codec.decode(&self.payload_symbols);
        if valid {
            self.stats.payloads_valid += 1;
            self.stats.bytes_received += payload.len() as u64;
        }

        let props = *self.payload_codec.properties();
        let stats = self.frame_stats(Some(&props));
        self.observer.payload_decoded(valid, &stats);

        let frame = Frame {
            header: &self.header_user,
            header_valid: true,
            payload: Some(&payload),
            payload_valid: valid,
            symbols: &self.payload_samples,
            stats,
        };
        let status = self.handler.on_frame(&frame);
        if status != 0 {
            self.observer.callback_returned(status);
        }
        self.reset_frame();
    }

    fn accumulate_evm(&mut self, decision: &Decision) {
        self.evm_sum += decision.evm * decision.evm;
        self.evm_count += 1;
    }

    fn frame_stats(&self, props: Option<&PayloadProperties>) -> FrameStats {
        let evm = if self.evm_count > 0 {
            10.0 * (self.evm_sum / self.evm_count as f32).max(1e-12).log10()
        } else {
            0.0
        };
        FrameStats {
            rssi: 20.0 * self.detection.gamma_hat.max(1e-12).log10(),
            cfo: self.detection.dphi_hat
                + self.fine.frequency() / self.config.samples_per_symbol as f32,
            evm,
            modulation: props.map(|p| p.modulation),
            fec_inner: props.map(|p| p.fec_inner),
            fec_outer: props.map(|p| p.fec_outer),
            check: props.map(|p| p.crc),
        }
    }

    /// Back to detection. Queued replay samples are kept so a frame that
    /// finishes mid-replay hands the rest of the window to the detector.
    fn reset_frame(&mut self) {
        self.state = FrameSyncState::Detect;
        self.detector.reset();
        self.coarse.reset();
        self.gain = 1.0;
        self.symsync.reset();
        self.fine.reset();
        self.equalizer.reset();
        self.preamble_rx.clear();
        self.header_symbols.clear();
        self.payload_symbols.clear();
        self.payload_samples.clear();
        self.evm_sum = 0.0;
        self.evm_count = 0;
    }
}

/// Carrier correction, equalization and decision for one symbol
fn track(
    fine: &mut Nco,
    equalizer: &mut dyn Equalizer,
    modem: &Modem,
    symbol: Complex32,
) -> (Complex32, Decision) {
    let z = equalizer.push_execute(fine.mix_down(symbol));
    let decision = modem.demodulate(z);
    fine.pll_step(decision.phase_error);
    fine.step();
    equalizer.step(decision.point, z);
    (z, decision)
}
