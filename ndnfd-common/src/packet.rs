//! Interest, Data and Nack packet types and their TLV wire format (§3, §6).

use crate::error::Error;
use crate::name::{FullName, Name, IMPLICIT_DIGEST_LEN};
use crate::tlv::{self, TlvElement};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;

/// Default Interest lifetime when none is carried on the wire (§4.4, §8).
pub const DEFAULT_INTEREST_LIFETIME: Duration = Duration::from_secs(4);
/// Default hop limit assigned to freshly originated Interests.
pub const DEFAULT_HOP_LIMIT: u8 = 32;

/// `child_selector` as carried on an Interest's [`Selectors`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChildSelector {
    Leftmost,
    Rightmost,
}

/// Selector fields that narrow which Data an Interest may be satisfied by
/// (§4.5). Part of PIT identity (§4.4): two Interests differing only in
/// `selectors` are distinct pending requests, not aggregated together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selectors {
    pub min_suffix_components: Option<u32>,
    pub max_suffix_components: Option<u32>,
    pub publisher_public_key_locator: Option<Bytes>,
    pub exclude: Vec<Name>,
    pub child_selector: Option<ChildSelector>,
}

impl Selectors {
    fn encode_tlv(&self) -> TlvElement {
        let mut body = BytesMut::new();
        if let Some(min) = self.min_suffix_components {
            let mut v = BytesMut::with_capacity(4);
            v.put_u32(min);
            TlvElement::new(tlv::TLV_MIN_SUFFIX_COMPONENTS, v.freeze()).encode(&mut body);
        }
        if let Some(max) = self.max_suffix_components {
            let mut v = BytesMut::with_capacity(4);
            v.put_u32(max);
            TlvElement::new(tlv::TLV_MAX_SUFFIX_COMPONENTS, v.freeze()).encode(&mut body);
        }
        if let Some(locator) = &self.publisher_public_key_locator {
            TlvElement::new(tlv::TLV_PUBLISHER_PUBLIC_KEY_LOCATOR, locator.clone()).encode(&mut body);
        }
        if !self.exclude.is_empty() {
            let mut exclude_body = BytesMut::new();
            for name in &self.exclude {
                name.to_tlv().encode(&mut exclude_body);
            }
            TlvElement::new(tlv::TLV_EXCLUDE, exclude_body.freeze()).encode(&mut body);
        }
        if let Some(child_selector) = self.child_selector {
            let value: u8 = match child_selector {
                ChildSelector::Leftmost => 0,
                ChildSelector::Rightmost => 1,
            };
            TlvElement::new(tlv::TLV_CHILD_SELECTOR, Bytes::copy_from_slice(&[value])).encode(&mut body);
        }
        TlvElement::new(tlv::TLV_SELECTORS, body.freeze())
    }

    fn decode_tlv(element: &TlvElement) -> Result<Self, Error> {
        let mut selectors = Selectors::default();
        let mut body = element.value.clone();
        while body.has_remaining() {
            let inner = TlvElement::decode(&mut body)?;
            match inner.tlv_type {
                t if t == tlv::TLV_MIN_SUFFIX_COMPONENTS => {
                    if inner.value.len() != 4 {
                        return Err(Error::NdnPacket("malformed MinSuffixComponents".into()));
                    }
                    selectors.min_suffix_components =
                        Some(u32::from_be_bytes(inner.value[..4].try_into().unwrap()));
                }
                t if t == tlv::TLV_MAX_SUFFIX_COMPONENTS => {
                    if inner.value.len() != 4 {
                        return Err(Error::NdnPacket("malformed MaxSuffixComponents".into()));
                    }
                    selectors.max_suffix_components =
                        Some(u32::from_be_bytes(inner.value[..4].try_into().unwrap()));
                }
                t if t == tlv::TLV_PUBLISHER_PUBLIC_KEY_LOCATOR => {
                    selectors.publisher_public_key_locator = Some(inner.value.clone());
                }
                t if t == tlv::TLV_EXCLUDE => {
                    let mut exclude_buf = inner.value.clone();
                    let mut names = Vec::new();
                    while exclude_buf.has_remaining() {
                        let name_elem = TlvElement::decode(&mut exclude_buf)?;
                        names.push(Name::from_tlv(&name_elem)?);
                    }
                    selectors.exclude = names;
                }
                t if t == tlv::TLV_CHILD_SELECTOR => {
                    if inner.value.is_empty() {
                        return Err(Error::NdnPacket("malformed ChildSelector".into()));
                    }
                    selectors.child_selector = Some(match inner.value[0] {
                        0 => ChildSelector::Leftmost,
                        _ => ChildSelector::Rightmost,
                    });
                }
                _ => {}
            }
        }
        Ok(selectors)
    }

    /// Whether `data_name` (a prefix match under `interest_name`) satisfies
    /// these selectors — min/max suffix length and exclude (§4.5). Mirrors
    /// the candidate filter in `Cs::find`, minus `child_selector`, which
    /// only disambiguates among multiple candidates and has no bearing on
    /// accepting a single Data packet.
    pub fn accepts(&self, interest_name: &Name, data_name: &Name) -> bool {
        let suffix_len = data_name.len().saturating_sub(interest_name.len());
        if let Some(min) = self.min_suffix_components {
            if (suffix_len as u32) < min {
                return false;
            }
        }
        if let Some(max) = self.max_suffix_components {
            if (suffix_len as u32) > max {
                return false;
            }
        }
        if !self.exclude.is_empty() {
            if let Some(next) = data_name.get(interest_name.len()) {
                let excluded: std::collections::HashSet<_> = self
                    .exclude
                    .iter()
                    .filter_map(|e| e.components().last().cloned())
                    .collect();
                if excluded.contains(next) {
                    return false;
                }
            }
        }
        true
    }
}

/// The subset of an Interest that determines PIT identity: two Interests
/// with the same identity are aggregated into the same PIT entry (§4.4).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InterestIdentity {
    name: Name,
    must_be_fresh: bool,
    can_be_prefix: bool,
    forwarding_hint: Option<Name>,
    selectors: Selectors,
}

impl InterestIdentity {
    /// The selectors carried on the Interest(s) that share this identity.
    pub fn selectors(&self) -> &Selectors {
        &self.selectors
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interest {
    pub name: Name,
    pub nonce: u32,
    pub lifetime: Duration,
    pub hop_limit: Option<u8>,
    pub can_be_prefix: bool,
    pub must_be_fresh: bool,
    pub forwarding_hint: Option<Name>,
    pub selectors: Selectors,
}

impl Interest {
    pub fn new(name: Name) -> Self {
        Self {
            name,
            nonce: rand::random(),
            lifetime: DEFAULT_INTEREST_LIFETIME,
            hop_limit: Some(DEFAULT_HOP_LIMIT),
            can_be_prefix: false,
            must_be_fresh: true,
            forwarding_hint: None,
            selectors: Selectors::default(),
        }
    }

    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    pub fn with_nonce(mut self, nonce: u32) -> Self {
        self.nonce = nonce;
        self
    }

    pub fn with_must_be_fresh(mut self, must_be_fresh: bool) -> Self {
        self.must_be_fresh = must_be_fresh;
        self
    }

    pub fn with_selectors(mut self, selectors: Selectors) -> Self {
        self.selectors = selectors;
        self
    }

    /// The key PIT entries are indexed by; see [`InterestIdentity`].
    pub fn identity(&self) -> InterestIdentity {
        InterestIdentity {
            name: self.name.clone(),
            must_be_fresh: self.must_be_fresh,
            can_be_prefix: self.can_be_prefix,
            forwarding_hint: self.forwarding_hint.clone(),
            selectors: self.selectors.clone(),
        }
    }

    pub fn decrement_hop_limit(&mut self) -> bool {
        match self.hop_limit {
            Some(0) => false,
            Some(n) => {
                self.hop_limit = Some(n - 1);
                true
            }
            None => true,
        }
    }

    pub fn encode(&self, buf: &mut BytesMut) -> Result<(), Error> {
        let mut body = BytesMut::new();
        self.name.to_tlv().encode(&mut body);
        if self.can_be_prefix {
            TlvElement::new(tlv::TLV_CAN_BE_PREFIX, Bytes::new()).encode(&mut body);
        }
        if self.must_be_fresh {
            TlvElement::new(tlv::TLV_MUST_BE_FRESH, Bytes::new()).encode(&mut body);
        }
        if let Some(hint) = &self.forwarding_hint {
            TlvElement::new(tlv::TLV_FORWARDING_HINT, hint.wire_encode()).encode(&mut body);
        }
        if self.selectors != Selectors::default() {
            self.selectors.encode_tlv().encode(&mut body);
        }
        let mut nonce_bytes = BytesMut::with_capacity(4);
        nonce_bytes.put_u32(self.nonce);
        TlvElement::new(tlv::TLV_NONCE, nonce_bytes.freeze()).encode(&mut body);
        let mut lifetime_bytes = BytesMut::with_capacity(8);
        lifetime_bytes.put_u64(self.lifetime.as_millis() as u64);
        TlvElement::new(tlv::TLV_INTEREST_LIFETIME, lifetime_bytes.freeze()).encode(&mut body);
        if let Some(hop_limit) = self.hop_limit {
            TlvElement::new(tlv::TLV_HOP_LIMIT, Bytes::copy_from_slice(&[hop_limit])).encode(&mut body);
        }
        TlvElement::new(tlv::TLV_INTEREST, body.freeze()).encode(buf);
        Ok(())
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, Error> {
        let mut buf = Bytes::copy_from_slice(bytes);
        let outer = TlvElement::decode(&mut buf)?;
        if outer.tlv_type != tlv::TLV_INTEREST {
            return Err(Error::NdnPacket(format!(
                "expected Interest TLV type {}, got {}",
                tlv::TLV_INTEREST,
                outer.tlv_type
            )));
        }
        let mut body = outer.value;
        let mut name = None;
        let mut can_be_prefix = false;
        let mut must_be_fresh = false;
        let mut forwarding_hint = None;
        let mut selectors = Selectors::default();
        let mut nonce = None;
        let mut lifetime = DEFAULT_INTEREST_LIFETIME;
        let mut hop_limit = None;
        while body.has_remaining() {
            let element = TlvElement::decode(&mut body)?;
            match element.tlv_type {
                t if t == tlv::TLV_NAME => name = Some(Name::from_tlv(&element)?),
                t if t == tlv::TLV_CAN_BE_PREFIX => can_be_prefix = true,
                t if t == tlv::TLV_MUST_BE_FRESH => must_be_fresh = true,
                t if t == tlv::TLV_FORWARDING_HINT => {
                    forwarding_hint = Some(Name::from_tlv(&TlvElement::decode(&mut element.value.clone())?)?);
                }
                t if t == tlv::TLV_SELECTORS => {
                    selectors = Selectors::decode_tlv(&element)?;
                }
                t if t == tlv::TLV_NONCE => {
                    if element.value.len() != 4 {
                        return Err(Error::NdnPacket("malformed Nonce".into()));
                    }
                    nonce = Some(u32::from_be_bytes(element.value[..4].try_into().unwrap()));
                }
                t if t == tlv::TLV_INTEREST_LIFETIME => {
                    if element.value.len() != 8 {
                        return Err(Error::NdnPacket("malformed InterestLifetime".into()));
                    }
                    let millis = u64::from_be_bytes(element.value[..8].try_into().unwrap());
                    lifetime = Duration::from_millis(millis);
                }
                t if t == tlv::TLV_HOP_LIMIT => {
                    if element.value.len() != 1 {
                        return Err(Error::NdnPacket("malformed HopLimit".into()));
                    }
                    hop_limit = Some(element.value[0]);
                }
                _ => {}
            }
        }
        Ok(Self {
            name: name.ok_or_else(|| Error::NdnPacket("Interest missing Name".into()))?,
            nonce: nonce.unwrap_or_else(rand::random),
            lifetime,
            hop_limit,
            can_be_prefix,
            must_be_fresh,
            forwarding_hint,
            selectors,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetaInfo {
    pub freshness_period: Option<Duration>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Data {
    pub name: Name,
    pub content: Bytes,
    pub meta: MetaInfo,
}

impl Data {
    pub fn new(name: Name, content: impl Into<Bytes>) -> Self {
        Self {
            name,
            content: content.into(),
            meta: MetaInfo::default(),
        }
    }

    pub fn with_freshness_period(mut self, freshness_period: Duration) -> Self {
        self.meta.freshness_period = Some(freshness_period);
        self
    }

    /// The 32-byte implicit digest of this Data's encoded form (§3).
    pub fn digest(&self) -> [u8; IMPLICIT_DIGEST_LEN] {
        let mut buf = BytesMut::new();
        // Digest is computed over everything except itself; encoding the
        // packet without a digest component gives a stable fixed point.
        self.encode_body(&mut buf);
        let hash = Sha256::digest(&buf);
        let mut out = [0u8; IMPLICIT_DIGEST_LEN];
        out.copy_from_slice(&hash);
        out
    }

    pub fn full_name(&self) -> FullName {
        FullName::new(self.name.clone(), self.digest())
    }

    fn encode_body(&self, buf: &mut BytesMut) {
        self.name.to_tlv().encode(buf);
        let mut meta_buf = BytesMut::new();
        if let Some(freshness) = self.meta.freshness_period {
            let mut fp = BytesMut::with_capacity(8);
            fp.put_u64(freshness.as_millis() as u64);
            TlvElement::new(tlv::TLV_FRESHNESS_PERIOD, fp.freeze()).encode(&mut meta_buf);
        }
        TlvElement::new(tlv::TLV_META_INFO, meta_buf.freeze()).encode(buf);
        TlvElement::new(tlv::TLV_CONTENT, self.content.clone()).encode(buf);
    }

    pub fn encode(&self, buf: &mut BytesMut) -> Result<(), Error> {
        let mut body = BytesMut::new();
        self.encode_body(&mut body);
        TlvElement::new(tlv::TLV_DATA, body.freeze()).encode(buf);
        Ok(())
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, Error> {
        let mut buf = Bytes::copy_from_slice(bytes);
        let outer = TlvElement::decode(&mut buf)?;
        if outer.tlv_type != tlv::TLV_DATA {
            return Err(Error::NdnPacket(format!(
                "expected Data TLV type {}, got {}",
                tlv::TLV_DATA,
                outer.tlv_type
            )));
        }
        let mut body = outer.value;
        let mut name = None;
        let mut content = Bytes::new();
        let mut meta = MetaInfo::default();
        while body.has_remaining() {
            let element = TlvElement::decode(&mut body)?;
            match element.tlv_type {
                t if t == tlv::TLV_NAME => name = Some(Name::from_tlv(&element)?),
                t if t == tlv::TLV_CONTENT => content = element.value,
                t if t == tlv::TLV_META_INFO => {
                    let mut meta_buf = element.value;
                    while meta_buf.has_remaining() {
                        let inner = TlvElement::decode(&mut meta_buf)?;
                        if inner.tlv_type == tlv::TLV_FRESHNESS_PERIOD {
                            if inner.value.len() != 8 {
                                return Err(Error::NdnPacket("malformed FreshnessPeriod".into()));
                            }
                            let millis = u64::from_be_bytes(inner.value[..8].try_into().unwrap());
                            meta.freshness_period = Some(Duration::from_millis(millis));
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(Self {
            name: name.ok_or_else(|| Error::NdnPacket("Data missing Name".into()))?,
            content,
            meta,
        })
    }
}

/// Reasons a Nack may carry (§4.7.4, GLOSSARY).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum NackReason {
    Congestion = 50,
    Duplicate = 100,
    NoRoute = 150,
    None = 0,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Nack {
    pub interest: Interest,
    pub reason: NackReason,
}

impl Nack {
    pub fn new(interest: Interest, reason: NackReason) -> Self {
        Self { interest, reason }
    }

    pub fn nonce(&self) -> u32 {
        self.interest.nonce
    }

    pub fn encode(&self, buf: &mut BytesMut) -> Result<(), Error> {
        let mut interest_bytes = BytesMut::new();
        self.interest.encode(&mut interest_bytes)?;
        let mut body = BytesMut::new();
        TlvElement::new(tlv::TLV_NACK_REASON, Bytes::copy_from_slice(&[self.reason as u8]))
            .encode(&mut body);
        body.extend_from_slice(&interest_bytes);
        TlvElement::new(tlv::TLV_NACK, body.freeze()).encode(buf);
        Ok(())
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, Error> {
        let mut buf = Bytes::copy_from_slice(bytes);
        let outer = TlvElement::decode(&mut buf)?;
        if outer.tlv_type != tlv::TLV_NACK {
            return Err(Error::NdnPacket(format!(
                "expected Nack TLV type {}, got {}",
                tlv::TLV_NACK,
                outer.tlv_type
            )));
        }
        let mut body = outer.value;
        let reason_elem = TlvElement::decode(&mut body)?;
        if reason_elem.tlv_type != tlv::TLV_NACK_REASON || reason_elem.value.is_empty() {
            return Err(Error::NdnPacket("Nack missing NackReason".into()));
        }
        let reason = match reason_elem.value[0] {
            50 => NackReason::Congestion,
            100 => NackReason::Duplicate,
            150 => NackReason::NoRoute,
            _ => NackReason::None,
        };
        let interest = Interest::decode(&body)?;
        Ok(Self { interest, reason })
    }
}

/// A decoded network-layer packet as delivered across a Face.
#[derive(Debug, Clone)]
pub enum NdnPacket {
    Interest(Interest),
    Data(Data),
    Nack(Nack),
}

impl NdnPacket {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.is_empty() {
            return Err(Error::NdnPacket("empty packet".into()));
        }
        match bytes[0] {
            t if t == tlv::TLV_INTEREST => Ok(NdnPacket::Interest(Interest::decode(bytes)?)),
            t if t == tlv::TLV_DATA => Ok(NdnPacket::Data(Data::decode(bytes)?)),
            t if t == tlv::TLV_NACK => Ok(NdnPacket::Nack(Nack::decode(bytes)?)),
            other => Err(Error::NdnPacket(format!("unknown packet type: {}", other))),
        }
    }

    pub fn to_bytes(&self) -> Result<Bytes, Error> {
        let mut buf = BytesMut::new();
        match self {
            NdnPacket::Interest(interest) => interest.encode(&mut buf)?,
            NdnPacket::Data(data) => data.encode(&mut buf)?,
            NdnPacket::Nack(nack) => nack.encode(&mut buf)?,
        }
        Ok(buf.freeze())
    }

    pub fn name(&self) -> &Name {
        match self {
            NdnPacket::Interest(interest) => &interest.name,
            NdnPacket::Data(data) => &data.name,
            NdnPacket::Nack(nack) => &nack.interest.name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interest_round_trips() {
        let interest = Interest::new(Name::from_str("/a/b")).with_nonce(7);
        let mut buf = BytesMut::new();
        interest.encode(&mut buf).unwrap();
        let decoded = Interest::decode(&buf).unwrap();
        assert_eq!(decoded.name, interest.name);
        assert_eq!(decoded.nonce, 7);
        assert_eq!(decoded.lifetime, DEFAULT_INTEREST_LIFETIME);
        assert!(decoded.must_be_fresh);
    }

    #[test]
    fn data_round_trips_and_digest_is_stable() {
        let data = Data::new(Name::from_str("/a/b"), Bytes::from_static(b"hello"))
            .with_freshness_period(Duration::from_millis(500));
        let mut buf = BytesMut::new();
        data.encode(&mut buf).unwrap();
        let decoded = Data::decode(&buf).unwrap();
        assert_eq!(decoded.name, data.name);
        assert_eq!(decoded.content, data.content);
        assert_eq!(data.digest(), data.digest());
        assert_eq!(decoded.digest(), data.digest());
    }

    #[test]
    fn identity_ignores_nonce_and_lifetime() {
        let a = Interest::new(Name::from_str("/x")).with_nonce(1);
        let b = Interest::new(Name::from_str("/x"))
            .with_nonce(2)
            .with_lifetime(Duration::from_secs(10));
        assert_eq!(a.identity(), b.identity());
    }

    #[test]
    fn nack_round_trips() {
        let interest = Interest::new(Name::from_str("/x")).with_nonce(5);
        let nack = Nack::new(interest, NackReason::Duplicate);
        let mut buf = BytesMut::new();
        nack.encode(&mut buf).unwrap();
        let decoded = Nack::decode(&buf).unwrap();
        assert_eq!(decoded.reason, NackReason::Duplicate);
        assert_eq!(decoded.nonce(), 5);
    }
}
