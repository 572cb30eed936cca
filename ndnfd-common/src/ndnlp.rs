//! NDNLP (Named-Data Networking Link Protocol) fragment wire format (§4.1,
//! §6). Slicing and reassembly logic live in `ndnfd-face`; this module only
//! owns the TLV shape so both the face crate and tests can share it.

use crate::error::Error;
use crate::tlv::{self, TlvElement};
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// One NDNLP fragment: a slice of a larger network-layer packet plus the
/// bookkeeping needed to reassemble it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NdnlpFragment {
    pub sequence: u64,
    pub frag_index: u16,
    pub frag_count: u16,
    pub payload: Bytes,
}

impl NdnlpFragment {
    pub fn single(sequence: u64, payload: Bytes) -> Self {
        Self { sequence, frag_index: 0, frag_count: 1, payload }
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        let mut body = BytesMut::new();

        let mut seq_bytes = BytesMut::with_capacity(8);
        seq_bytes.put_u64(self.sequence);
        TlvElement::new(tlv::TLV_NDNLP_SEQUENCE, seq_bytes.freeze()).encode(&mut body);

        if self.frag_count > 1 {
            let mut idx_bytes = BytesMut::with_capacity(2);
            idx_bytes.put_u16(self.frag_index);
            TlvElement::new(tlv::TLV_NDNLP_FRAG_INDEX, idx_bytes.freeze()).encode(&mut body);

            let mut count_bytes = BytesMut::with_capacity(2);
            count_bytes.put_u16(self.frag_count);
            TlvElement::new(tlv::TLV_NDNLP_FRAG_COUNT, count_bytes.freeze()).encode(&mut body);
        }

        TlvElement::new(tlv::TLV_NDNLP_PAYLOAD, self.payload.clone()).encode(&mut body);

        TlvElement::new(tlv::TLV_NDNLP_DATA, body.freeze()).encode(buf);
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, Error> {
        let mut buf = Bytes::copy_from_slice(bytes);
        let outer = TlvElement::decode(&mut buf)?;
        if outer.tlv_type != tlv::TLV_NDNLP_DATA {
            return Err(Error::Ndnlp(format!(
                "expected NdnlpData TLV type {}, got {}",
                tlv::TLV_NDNLP_DATA,
                outer.tlv_type
            )));
        }

        let mut body = outer.value;
        let mut sequence = None;
        let mut frag_index = None;
        let mut frag_count = None;
        let mut payload = None;

        while body.has_remaining() {
            let element = TlvElement::decode(&mut body)?;
            match element.tlv_type {
                t if t == tlv::TLV_NDNLP_SEQUENCE => {
                    if element.value.len() != 8 {
                        return Err(Error::Ndnlp("malformed NdnlpSequence".into()));
                    }
                    sequence = Some(u64::from_be_bytes(element.value[..8].try_into().unwrap()));
                }
                t if t == tlv::TLV_NDNLP_FRAG_INDEX => {
                    if element.value.len() != 2 {
                        return Err(Error::Ndnlp("malformed NdnlpFragIndex".into()));
                    }
                    frag_index = Some(u16::from_be_bytes(element.value[..2].try_into().unwrap()));
                }
                t if t == tlv::TLV_NDNLP_FRAG_COUNT => {
                    if element.value.len() != 2 {
                        return Err(Error::Ndnlp("malformed NdnlpFragCount".into()));
                    }
                    frag_count = Some(u16::from_be_bytes(element.value[..2].try_into().unwrap()));
                }
                t if t == tlv::TLV_NDNLP_PAYLOAD => payload = Some(element.value),
                _ => {}
            }
        }

        let sequence = sequence.ok_or_else(|| Error::Ndnlp("missing NdnlpSequence".into()))?;
        let payload = payload.ok_or_else(|| Error::Ndnlp("missing NdnlpPayload".into()))?;

        let (frag_index, frag_count) = match (frag_index, frag_count) {
            (None, None) => (0, 1),
            (Some(i), Some(c)) => (i, c),
            _ => {
                return Err(Error::Ndnlp(
                    "NdnlpFragIndex and NdnlpFragCount must both be present or both absent".into(),
                ))
            }
        };

        if frag_index >= frag_count {
            return Err(Error::Ndnlp(format!(
                "fragIndex {} >= fragCount {}",
                frag_index, frag_count
            )));
        }

        Ok(Self { sequence, frag_index, frag_count, payload })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_fragment_omits_index_and_count() {
        let frag = NdnlpFragment::single(42, Bytes::from_static(b"hi"));
        let mut buf = BytesMut::new();
        frag.encode(&mut buf);
        let decoded = NdnlpFragment::decode(&buf).unwrap();
        assert_eq!(decoded, frag);
        assert_eq!(decoded.frag_count, 1);
    }

    #[test]
    fn multi_fragment_round_trips() {
        let frag = NdnlpFragment {
            sequence: 1000,
            frag_index: 2,
            frag_count: 4,
            payload: Bytes::from_static(b"chunk"),
        };
        let mut buf = BytesMut::new();
        frag.encode(&mut buf);
        let decoded = NdnlpFragment::decode(&buf).unwrap();
        assert_eq!(decoded, frag);
    }

    #[test]
    fn rejects_frag_index_past_count() {
        let bad = NdnlpFragment { sequence: 1, frag_index: 3, frag_count: 3, payload: Bytes::new() };
        let mut buf = BytesMut::new();
        bad.encode(&mut buf);
        assert!(NdnlpFragment::decode(&buf).is_err());
    }
}
