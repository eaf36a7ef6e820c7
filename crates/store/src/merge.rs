//! Order-preserving merge of a snapshot scan with an overlay
//!
//! Both inputs are already in ascending byte order, so a two-pointer
//! walk keeps the output ordered without re-sorting. For a key present
//! on both sides the overlay wins: a pending put replaces the snapshot
//! value, a tombstone suppresses the snapshot entry entirely.
//! Overlay-only puts are injected at their sort position.

use crate::overlay::Mutation;
use shale_core::error::Result;
use shale_core::key::Key;
use shale_core::traits::KvIter;
use std::cmp::Ordering;
use std::iter::Peekable;
use std::vec;

enum Side {
    Base,
    Overlay,
    Both,
}

pub(crate) struct MergedScan {
    base: Peekable<KvIter>,
    overlay: Peekable<vec::IntoIter<(Key, Mutation)>>,
}

impl MergedScan {
    pub(crate) fn new(base: KvIter, overlay: Vec<(Key, Mutation)>) -> Self {
        MergedScan {
            base: base.peekable(),
            overlay: overlay.into_iter().peekable(),
        }
    }
}

impl Iterator for MergedScan {
    type Item = Result<(Key, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let side = match (self.base.peek(), self.overlay.peek()) {
                (None, None) => return None,
                // Propagate base errors as soon as they surface.
                (Some(Err(_)), _) => Side::Base,
                (Some(Ok(_)), None) => Side::Base,
                (None, Some(_)) => Side::Overlay,
                (Some(Ok((base_key, _))), Some((overlay_key, _))) => {
                    match base_key.as_slice().cmp(overlay_key.as_bytes()) {
                        Ordering::Less => Side::Base,
                        Ordering::Greater => Side::Overlay,
                        Ordering::Equal => Side::Both,
                    }
                }
            };

            match side {
                Side::Base => match self.base.next() {
                    Some(Ok((key, value))) => return Some(Ok((Key::new(key), value))),
                    Some(Err(err)) => return Some(Err(err)),
                    None => return None,
                },
                Side::Overlay => {
                    let (key, mutation) = self.overlay.next()?;
                    match mutation {
                        Mutation::Put(value) => return Some(Ok((key, value))),
                        Mutation::Tombstone => continue,
                    }
                }
                Side::Both => {
                    // Overlay shadows the snapshot entry for this key.
                    let _ = self.base.next();
                    let (key, mutation) = self.overlay.next()?;
                    match mutation {
                        Mutation::Put(value) => return Some(Ok((key, value))),
                        Mutation::Tombstone => continue,
                    }
                }
            }
        }
    }
}
