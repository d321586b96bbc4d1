//! Content negotiation over the `Accept` header.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};

/// Representation picked for a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Representation {
    Html,
    Json,
    /// The client accepts none of the representations on offer.
    Unsupported,
}

/// One entry of an `Accept` header.
#[derive(Debug)]
struct MediaRange {
    kind: String,
    subtype: String,
    quality: f32,
    position: usize,
}

impl MediaRange {
    fn parse(position: usize, entry: &str) -> Option<Self> {
        let mut parts = entry.split(';');
        let range = parts.next()?.trim().to_ascii_lowercase();
        let (kind, subtype) = match range.as_str() {
            "*" => ("*", "*"),
            other => other.split_once('/')?,
        };
        if kind.is_empty() || subtype.is_empty() {
            return None;
        }

        let quality = parts
            .find_map(|param| {
                let (name, value) = param.split_once('=')?;
                if name.trim().eq_ignore_ascii_case("q") {
                    value.trim().parse::<f32>().ok()
                } else {
                    None
                }
            })
            .unwrap_or(1.0)
            .clamp(0.0, 1.0);

        Some(Self {
            kind: kind.to_string(),
            subtype: subtype.to_string(),
            quality,
            position,
        })
    }

    /// 2 for an exact match, 1 for `type/*`, 0 for `*/*`.
    fn specificity(&self, offered: &str) -> Option<u8> {
        let (kind, subtype) = offered.split_once('/')?;
        if self.kind == "*" && self.subtype == "*" {
            Some(0)
        } else if self.kind == kind && self.subtype == "*" {
            Some(1)
        } else if self.kind == kind && self.subtype == subtype {
            Some(2)
        } else {
            None
        }
    }
}

/// How well the client accepts one offered media type.
#[derive(Debug, Clone, Copy)]
struct Preference {
    quality: f32,
    specificity: u8,
    position: usize,
    offer: usize,
}

impl Representation {
    /// Media types on offer, in order of preference.
    pub const OFFERED: [&'static str; 2] = ["text/html", "application/json"];

    /// Pick a representation from an `Accept` header value.
    ///
    /// A missing or blank header accepts anything and yields HTML. Each
    /// offered type takes the quality of the most specific range matching
    /// it, so `text/html;q=0, */*` refuses HTML even though `*/*` would
    /// cover it. Types are then ranked by quality, specificity, header
    /// order, and finally our own preference.
    pub fn from_accept(accept: Option<&str>) -> Self {
        let Some(accept) = accept.map(str::trim).filter(|value| !value.is_empty()) else {
            return Representation::Html;
        };

        let ranges: Vec<MediaRange> = accept
            .split(',')
            .enumerate()
            .filter_map(|(position, entry)| MediaRange::parse(position, entry))
            .collect();

        Self::OFFERED
            .iter()
            .enumerate()
            .filter_map(|(offer, offered)| Self::preference(&ranges, offer, offered))
            .filter(|preference| preference.quality > 0.0)
            .max_by(|a, b| {
                a.quality
                    .total_cmp(&b.quality)
                    .then(a.specificity.cmp(&b.specificity))
                    .then(b.position.cmp(&a.position))
                    .then(b.offer.cmp(&a.offer))
            })
            .map(|preference| Self::from_offer(preference.offer))
            .unwrap_or(Representation::Unsupported)
    }

    fn preference(ranges: &[MediaRange], offer: usize, offered: &str) -> Option<Preference> {
        ranges
            .iter()
            .filter_map(|range| {
                range.specificity(offered).map(|specificity| Preference {
                    quality: range.quality,
                    specificity,
                    position: range.position,
                    offer,
                })
            })
            // The most specific range decides; among equals the first listed
            .max_by(|a, b| {
                a.specificity
                    .cmp(&b.specificity)
                    .then(b.position.cmp(&a.position))
            })
    }

    fn from_offer(offer: usize) -> Self {
        match offer {
            0 => Representation::Html,
            _ => Representation::Json,
        }
    }

    pub fn is_supported(self) -> bool {
        self != Representation::Unsupported
    }
}

impl<S> FromRequestParts<S> for Representation
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let accept = parts
            .headers
            .get(header::ACCEPT)
            .and_then(|value| value.to_str().ok());
        Ok(Representation::from_accept(accept))
    }
}
