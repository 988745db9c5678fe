//! Frame generator
//!
//! Builds the sample stream a [`FrameSynchronizer`](super::FrameSynchronizer)
//! expects: preamble, header, payload and a flush tail of `2m` zero symbols,
//! all pulse-shaped at `k` samples/symbol with unit average power.

use num_complex::Complex32;

use super::codec::PacketCodec;
use super::header::{encode_header, header_codec};
use super::preamble::{Preamble, PREAMBLE_LEN};
use crate::domain::{FrameSyncConfig, PayloadProperties, SyncResult};
use crate::dsp::raised_cosine::transmit_taps;
use crate::dsp::Pfb;

pub struct FrameGenerator {
    k: usize,
    m: usize,
    header_user_len: usize,
    preamble: Preamble,
    header_codec: PacketCodec,
    payload_codec: PacketCodec,
    interp: Pfb<Complex32>,
}

impl FrameGenerator {
    pub fn new(config: &FrameSyncConfig) -> SyncResult<Self> {
        config.validate()?;
        let k = config.samples_per_symbol;
        let m = config.filter_semi_length;
        let beta = config.excess_bandwidth;
        Ok(Self {
            k,
            m,
            header_user_len: config.header_user_len,
            preamble: Preamble::new(k, m, beta),
            header_codec: header_codec(config.header_user_len)?,
            payload_codec: PacketCodec::new(&config.payload)?,
            interp: Pfb::new(k, &transmit_taps(k, m, beta)),
        })
    }

    /// Change the payload encoding for subsequent frames
    pub fn set_properties(&mut self, props: &PayloadProperties) -> SyncResult<()> {
        self.payload_codec.configure(props)
    }

    pub fn properties(&self) -> &PayloadProperties {
        self.payload_codec.properties()
    }

    /// Symbols per frame, tail included
    pub fn num_symbols(&self) -> usize {
        PREAMBLE_LEN
            + self.header_codec.num_symbols()
            + self.payload_codec.num_symbols()
            + 2 * self.m
    }

    /// Samples per frame
    pub fn frame_len(&self) -> usize {
        self.k * self.num_symbols()
    }

    /// Modulate one frame
    ///
    /// # Panics
    /// If `header` is not `header_user_len` bytes or `payload` does not match
    /// the configured payload length.
    pub fn assemble(&mut self, header: &[u8], payload: &[u8]) -> Vec<Complex32> {
        assert_eq!(
            header.len(),
            self.header_user_len,
            "generator configured for {} header bytes, got {}",
            self.header_user_len,
            header.len()
        );

        let props = *self.payload_codec.properties();
        self.modulate(&encode_header(header, &props), payload)
    }

    /// Modulate a frame from plain header bytes, protocol fields included
    pub(crate) fn modulate(&mut self, plain_header: &[u8], payload: &[u8]) -> Vec<Complex32> {
        let header_symbols = self.header_codec.encode(plain_header);
        let payload_symbols = self.payload_codec.encode(payload);

        let header_modem = self.header_codec.modem();
        let payload_modem = self.payload_codec.modem();
        let zero = Complex32::new(0.0, 0.0);

        let symbols = self
            .preamble
            .symbols()
            .iter()
            .map(|&s| Complex32::new(s, 0.0))
            .chain(header_symbols.iter().map(|&s| header_modem.modulate(s)))
            .chain(payload_symbols.iter().map(|&s| payload_modem.modulate(s)))
            .chain(std::iter::repeat(zero).take(2 * self.m));

        self.interp.reset();
        let mut samples = Vec::with_capacity(self.frame_len());
        for s in symbols {
            self.interp.push(s);
            for p in 0..self.k {
                samples.push(self.interp.execute(p));
            }
        }

        log::trace!(
            "Assembled frame: {} header symbols, {} payload symbols, {} samples",
            header_symbols.len(),
            payload_symbols.len(),
            samples.len()
        );
        samples
    }
}
