//! Stream tags and tag propagation.
//!
//! A [`Tag`] is an out-of-band annotation pinned to an absolute item offset of
//! one stream. After each work call the executor moves the tags that sat on
//! the consumed input range onto the outputs according to the block's
//! [`TagPropagation`] policy, rescaling offsets by the block's
//! [`RelativeRate`].
//!
//! The routing step is a pure function ([`route_tags`]) so that policies can
//! be tested without buffers.

use crate::rate::RelativeRate;

/// Value carried by a [`Tag`].
#[derive(Clone, Debug, PartialEq)]
pub enum TagValue {
    /// No payload; the key alone is the message.
    Null,
    /// Boolean flag.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Unsigned integer (sample counts, frequencies in Hz).
    UInt(u64),
    /// Floating-point number.
    Float(f64),
    /// Free-form text.
    Text(String),
}

/// An annotation attached to one item of a stream.
#[derive(Clone, Debug, PartialEq)]
pub struct Tag {
    /// Absolute item offset in the stream the tag currently lives on.
    pub offset: u64,
    /// Tag key, e.g. `"rx_freq"`.
    pub key: String,
    /// Payload.
    pub value: TagValue,
    /// Name of the block that created the tag, if recorded.
    pub source: Option<String>,
}

impl Tag {
    /// Creates a tag with no source identifier.
    pub fn new(offset: u64, key: impl Into<String>, value: TagValue) -> Self {
        Self {
            offset,
            key: key.into(),
            value,
            source: None,
        }
    }

    /// Sets the source identifier.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Returns a copy of this tag moved to `offset`.
    pub fn at(&self, offset: u64) -> Self {
        Self {
            offset,
            ..self.clone()
        }
    }
}

/// How tags move from a block's inputs to its outputs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TagPropagation {
    /// Tags stop at this block.
    None,
    /// Every tag on every input is copied to every output.
    #[default]
    AllToAll,
    /// Tags on input `i` go to output `i` only. Needs `ninputs == noutputs`.
    OneToOne,
}

/// Routes tags taken from the just-consumed input ranges onto output ports.
///
/// `input_tags[i]` holds the tags found on input `i`; the result holds, per
/// output port, the tags to attach with offsets already rescaled by `rate`.
/// Relative order within each input is preserved.
pub fn route_tags(
    policy: TagPropagation,
    rate: RelativeRate,
    input_tags: &[Vec<Tag>],
    noutputs: usize,
) -> Vec<Vec<Tag>> {
    let mut routed = vec![Vec::new(); noutputs];
    match policy {
        TagPropagation::None => {}
        TagPropagation::AllToAll => {
            for tags in input_tags {
                for tag in tags {
                    let moved = tag.at(rate.rescale_offset(tag.offset));
                    for out in &mut routed {
                        out.push(moved.clone());
                    }
                }
            }
        }
        TagPropagation::OneToOne => {
            for (tags, out) in input_tags.iter().zip(routed.iter_mut()) {
                out.extend(tags.iter().map(|t| t.at(rate.rescale_offset(t.offset))));
            }
        }
    }
    routed
}
