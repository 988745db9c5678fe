//! Packet codec
//!
//! Bytes to constellation symbol indices and back: CRC and FEC through the
//! [`Packetizer`], whitening, then packing into `bits_per_symbol` fields.

use super::bits::{bytes_to_symbols, symbols_to_bytes};
use super::modulation::Modem;
use super::packetizer::Packetizer;
use super::scramble::scramble;
use crate::domain::{FrameSyncError, ModulationScheme, PayloadProperties, SyncResult, MAX_PAYLOAD_LEN};

#[derive(Debug, Clone)]
pub struct PacketCodec {
    props: PayloadProperties,
    packetizer: Packetizer,
    modem: Modem,
    num_symbols: usize,
}

impl PacketCodec {
    pub fn new(props: &PayloadProperties) -> SyncResult<Self> {
        check(props)?;
        let packetizer = packetizer_for(props);
        let modem = Modem::new(props.modulation);
        Ok(Self {
            props: *props,
            num_symbols: symbol_count(&packetizer, props.modulation),
            packetizer,
            modem,
        })
    }

    /// Switch to new payload properties, recomputing every derived length
    ///
    /// On error the codec keeps its previous configuration.
    pub fn configure(&mut self, props: &PayloadProperties) -> SyncResult<()> {
        check(props)?;
        if *props == self.props {
            return Ok(());
        }
        self.packetizer = packetizer_for(props);
        if props.modulation != self.props.modulation {
            self.modem = Modem::new(props.modulation);
        }
        self.num_symbols = symbol_count(&self.packetizer, props.modulation);
        self.props = *props;
        Ok(())
    }

    pub fn properties(&self) -> &PayloadProperties {
        &self.props
    }

    pub fn payload_len(&self) -> usize {
        self.props.payload_len
    }

    /// Encoded length in bytes, after CRC and FEC
    pub fn encoded_len(&self) -> usize {
        self.packetizer.packet_len()
    }

    /// Symbols per packet
    pub fn num_symbols(&self) -> usize {
        self.num_symbols
    }

    pub fn modem(&self) -> &Modem {
        &self.modem
    }

    /// # Panics
    /// If `payload.len()` differs from the configured payload length.
    pub fn encode(&self, payload: &[u8]) -> Vec<u8> {
        assert_eq!(
            payload.len(),
            self.props.payload_len,
            "codec configured for {} payload bytes, got {}",
            self.props.payload_len,
            payload.len()
        );
        let mut packet = self.packetizer.encode(payload);
        scramble(&mut packet);
        bytes_to_symbols(&packet, self.modem.bits_per_symbol())
    }

    /// Best-effort payload bytes and validity
    ///
    /// # Panics
    /// If `symbols.len()` differs from [`Self::num_symbols`].
    pub fn decode(&self, symbols: &[u8]) -> (Vec<u8>, bool) {
        assert_eq!(
            symbols.len(),
            self.num_symbols,
            "codec expects {} symbols, got {}",
            self.num_symbols,
            symbols.len()
        );
        let mut packet = symbols_to_bytes(symbols, self.modem.bits_per_symbol(), self.encoded_len());
        scramble(&mut packet);
        self.packetizer.decode(&packet)
    }
}

fn check(props: &PayloadProperties) -> SyncResult<()> {
    if props.payload_len > MAX_PAYLOAD_LEN {
        return Err(FrameSyncError::Codec(format!(
            "payload_len {} exceeds {MAX_PAYLOAD_LEN}",
            props.payload_len
        )));
    }
    Ok(())
}

fn packetizer_for(props: &PayloadProperties) -> Packetizer {
    Packetizer::new(props.payload_len, props.crc, props.fec_inner, props.fec_outer)
}

fn symbol_count(packetizer: &Packetizer, modulation: ModulationScheme) -> usize {
    (8 * packetizer.packet_len()).div_ceil(modulation.bits_per_symbol())
}
