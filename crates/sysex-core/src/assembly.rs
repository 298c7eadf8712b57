//! Caller-owned accumulation of a multi-message item.
//!
//! A device may answer an item request with one message per block. The
//! codec checks each incoming message against an [`ItemAssembly`] the host
//! keeps for the request in flight; the assembly, not the codec, remembers
//! which blocks have arrived.

use crate::codec::MemoryKind;

/// Position of an in-flight item in its block sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssemblyState {
    /// Block `n` is the next one expected.
    AwaitingBlock(usize),
    /// Every block has arrived.
    Complete,
}

/// Verdict on one message offered to an assembly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DumpPart {
    /// Message is not the next block of this item.
    Rejected,
    /// Message is the next block.
    Accepted {
        /// Item index the message belongs to.
        item: usize,
        /// Block index the message carries.
        block: usize,
        /// Number of blocks in one item.
        block_count: usize,
        /// Request for the following block, for devices that hand out one
        /// block per request.
        follow_up: Option<Vec<u8>>,
    },
}

impl DumpPart {
    /// Returns `true` for [`DumpPart::Accepted`].
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    /// Request to send before the next block can arrive.
    #[must_use]
    pub fn follow_up(&self) -> Option<&[u8]> {
        match self {
            Self::Accepted {
                follow_up: Some(request),
                ..
            } => Some(request),
            _ => None,
        }
    }
}

/// Messages received so far for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemAssembly {
    kind: MemoryKind,
    item: Option<usize>,
    block_count: usize,
    messages: Vec<Vec<u8>>,
}

impl ItemAssembly {
    /// Empty assembly for an edit buffer or program item.
    #[must_use]
    pub const fn new(kind: MemoryKind) -> Self {
        Self {
            kind,
            item: None,
            block_count: 0,
            messages: Vec::new(),
        }
    }

    /// Memory the assembled item comes from.
    #[must_use]
    pub const fn kind(&self) -> MemoryKind {
        self.kind
    }

    /// Item index fixed by the first accepted block.
    #[must_use]
    pub const fn item(&self) -> Option<usize> {
        self.item
    }

    /// Number of accepted messages.
    #[must_use]
    pub fn received(&self) -> usize {
        self.messages.len()
    }

    /// First accepted message, which fixes the item and its format.
    #[must_use]
    pub fn first_message(&self) -> Option<&[u8]> {
        self.messages.first().map(Vec::as_slice)
    }

    /// Current state-machine position.
    #[must_use]
    pub fn state(&self) -> AssemblyState {
        if self.item.is_some() && self.messages.len() >= self.block_count {
            AssemblyState::Complete
        } else {
            AssemblyState::AwaitingBlock(self.messages.len())
        }
    }

    /// Stores `message` when `part` accepted it. Returns `true` once the
    /// item is complete.
    pub fn record(&mut self, message: &[u8], part: &DumpPart) -> bool {
        if let DumpPart::Accepted {
            item,
            block,
            block_count,
            ..
        } = *part
        {
            if block == self.messages.len() && self.item.is_none_or(|current| current == item) {
                self.item = Some(item);
                self.block_count = block_count;
                self.messages.push(message.to_vec());
            }
        }
        self.state() == AssemblyState::Complete
    }

    /// Concatenated messages of the complete item.
    #[must_use]
    pub fn finish(&self) -> Option<Vec<u8>> {
        (self.state() == AssemblyState::Complete).then(|| self.messages.concat())
    }

    /// Drops everything received so far.
    pub fn reset(&mut self) {
        self.item = None;
        self.block_count = 0;
        self.messages.clear();
    }
}
