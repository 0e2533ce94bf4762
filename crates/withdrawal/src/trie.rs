//! Storage-proof surgery for the portal's Merkle-Patricia verifier.
//!
//! `eth_getProof` returns one RLP element per *stored* trie node. When a
//! storage value is short enough, its leaf is embedded inline in the parent
//! branch and the RPC proof stops one level above the value. The portal's
//! on-chain verifier consumes exactly one proof element per node on the path,
//! so such a proof fails verification even though the value is present.
//!
//! [`normalize_proof`] walks the proof along the key nibbles and materializes
//! any inline node as an extra trailing element. [`verify_proof`] is a strict
//! element-per-node reference walk in the style of the on-chain library, used
//! by the test suite to pin the behavior down.

use alloy_primitives::{keccak256, Bytes, B256};
use alloy_rlp::{Encodable, Header};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrieError {
    #[error("invalid rlp in proof node: {0}")]
    Rlp(#[from] alloy_rlp::Error),

    #[error("proof node has {0} items, expected 2 or 17")]
    NodeShape(usize),

    #[error("malformed trie node")]
    InvalidNode,

    #[error("malformed hex-prefix path")]
    InvalidPath,

    #[error("proof does not cover the requested key")]
    PathDivergence,

    #[error("proof ended before the key path was consumed")]
    Truncated,

    #[error("proof element does not match its parent reference")]
    HashMismatch,

    #[error("terminal value does not match the expected value")]
    ValueMismatch,

    #[error("empty proof")]
    EmptyProof,
}

/// A decoded RLP tree: byte strings and nested lists.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RlpItem {
    Str(Vec<u8>),
    List(Vec<RlpItem>),
}

fn decode_item(buf: &mut &[u8]) -> Result<RlpItem, TrieError> {
    let header = Header::decode(buf)?;
    if buf.len() < header.payload_length {
        return Err(TrieError::Rlp(alloy_rlp::Error::InputTooShort));
    }
    let (payload, rest) = buf.split_at(header.payload_length);
    *buf = rest;

    if header.list {
        let mut items = Vec::new();
        let mut cursor = payload;
        while !cursor.is_empty() {
            items.push(decode_item(&mut cursor)?);
        }
        Ok(RlpItem::List(items))
    } else {
        Ok(RlpItem::Str(payload.to_vec()))
    }
}

fn encode_item(item: &RlpItem, out: &mut Vec<u8>) {
    match item {
        RlpItem::Str(bytes) => bytes[..].encode(out),
        RlpItem::List(items) => {
            let mut payload = Vec::new();
            for child in items {
                encode_item(child, &mut payload);
            }
            Header {
                list: true,
                payload_length: payload.len(),
            }
            .encode(out);
            out.extend_from_slice(&payload);
        }
    }
}

/// Decode one proof element as a trie node (a 2-item or 17-item list).
fn decode_node(encoded: &[u8]) -> Result<Vec<RlpItem>, TrieError> {
    let mut buf = encoded;
    let item = decode_item(&mut buf)?;
    if !buf.is_empty() {
        return Err(TrieError::InvalidNode);
    }
    match item {
        RlpItem::List(items) => Ok(items),
        RlpItem::Str(_) => Err(TrieError::InvalidNode),
    }
}

fn key_nibbles(key: &[u8]) -> Vec<u8> {
    key.iter().flat_map(|b| [b >> 4, b & 0x0f]).collect()
}

/// Decode a hex-prefix encoded node path into (nibbles, is_leaf).
fn decode_path(encoded: &[u8]) -> Result<(Vec<u8>, bool), TrieError> {
    let Some(&first) = encoded.first() else {
        return Err(TrieError::InvalidPath);
    };
    let flag = first >> 4;
    if flag > 3 {
        return Err(TrieError::InvalidPath);
    }

    let mut nibbles = Vec::with_capacity(1 + (encoded.len() - 1) * 2);
    if flag & 1 == 1 {
        nibbles.push(first & 0x0f);
    }
    for &b in &encoded[1..] {
        nibbles.push(b >> 4);
        nibbles.push(b & 0x0f);
    }

    Ok((nibbles, flag >= 2))
}

/// Reference to the next node on the path.
enum Pointer {
    Hash(B256),
    Inline(Vec<RlpItem>),
}

enum Step {
    Descend(Pointer),
    Terminal,
}

/// Advance one node along the key path, consuming nibbles.
fn step(node: &[RlpItem], nibbles: &[u8], depth: &mut usize) -> Result<Step, TrieError> {
    match node.len() {
        17 => {
            if *depth == nibbles.len() {
                // Key ends here; the value sits in the branch itself.
                return Ok(Step::Terminal);
            }
            let nib = nibbles[*depth] as usize;
            *depth += 1;
            match &node[nib] {
                RlpItem::Str(b) if b.is_empty() => Err(TrieError::PathDivergence),
                RlpItem::Str(b) if b.len() == 32 => {
                    Ok(Step::Descend(Pointer::Hash(B256::from_slice(b))))
                }
                RlpItem::Str(_) => Err(TrieError::InvalidNode),
                RlpItem::List(items) => Ok(Step::Descend(Pointer::Inline(items.clone()))),
            }
        }
        2 => {
            let RlpItem::Str(path) = &node[0] else {
                return Err(TrieError::InvalidNode);
            };
            let (path_nibbles, is_leaf) = decode_path(path)?;
            let remaining = &nibbles[*depth..];

            if is_leaf {
                if remaining == path_nibbles.as_slice() {
                    Ok(Step::Terminal)
                } else {
                    Err(TrieError::PathDivergence)
                }
            } else {
                if !remaining.starts_with(&path_nibbles) {
                    return Err(TrieError::PathDivergence);
                }
                *depth += path_nibbles.len();
                match &node[1] {
                    RlpItem::Str(b) if b.len() == 32 => {
                        Ok(Step::Descend(Pointer::Hash(B256::from_slice(b))))
                    }
                    RlpItem::List(items) => Ok(Step::Descend(Pointer::Inline(items.clone()))),
                    RlpItem::Str(_) => Err(TrieError::InvalidNode),
                }
            }
        }
        n => Err(TrieError::NodeShape(n)),
    }
}

/// Value carried by a terminal node.
fn terminal_value(node: &[RlpItem]) -> Result<&[u8], TrieError> {
    let item = match node.len() {
        2 => &node[1],
        17 => &node[16],
        _ => return Err(TrieError::InvalidNode),
    };
    match item {
        RlpItem::Str(b) => Ok(b),
        RlpItem::List(_) => Err(TrieError::InvalidNode),
    }
}

/// Walk `proof` along the nibbles of `key` and append the encoding of any
/// inline node the RPC left embedded in its parent.
///
/// Returns the proof unchanged when it already terminates at the value.
pub fn normalize_proof(key: &[u8], proof: &[Bytes]) -> Result<Vec<Bytes>, TrieError> {
    if proof.is_empty() {
        return Err(TrieError::EmptyProof);
    }

    let nibbles = key_nibbles(key);
    let mut depth = 0usize;
    let mut idx = 0usize;
    let mut out: Vec<Bytes> = proof.to_vec();
    let mut node = decode_node(&proof[idx])?;

    loop {
        match step(&node, &nibbles, &mut depth)? {
            Step::Terminal => return Ok(out),
            Step::Descend(Pointer::Hash(_)) => {
                idx += 1;
                let encoded = proof.get(idx).ok_or(TrieError::Truncated)?;
                node = decode_node(encoded)?;
            }
            Step::Descend(Pointer::Inline(items)) => {
                let mut encoded = Vec::new();
                encode_item(&RlpItem::List(items.clone()), &mut encoded);
                out.push(Bytes::from(encoded));
                node = items;
            }
        }
    }
}

enum ExpectedRef {
    Hash(B256),
    Raw(Vec<u8>),
}

/// Strict element-per-node proof walk, mirroring the portal's trie library.
///
/// Consumes exactly one proof element for every node on the path, comparing
/// each element against the parent's reference (hash, or raw encoding for
/// inline references), and requires the terminal value to match.
pub fn verify_proof(
    root: B256,
    key: &[u8],
    expected_value: &[u8],
    proof: &[Bytes],
) -> Result<(), TrieError> {
    let nibbles = key_nibbles(key);
    let mut depth = 0usize;
    let mut expected = ExpectedRef::Hash(root);
    let mut elements = proof.iter();

    loop {
        let encoded = elements.next().ok_or(TrieError::Truncated)?;
        match &expected {
            ExpectedRef::Hash(hash) => {
                if keccak256(encoded) != *hash {
                    return Err(TrieError::HashMismatch);
                }
            }
            ExpectedRef::Raw(raw) => {
                if encoded.as_ref() != raw.as_slice() {
                    return Err(TrieError::HashMismatch);
                }
            }
        }

        let node = decode_node(encoded)?;
        match step(&node, &nibbles, &mut depth)? {
            Step::Terminal => {
                return if terminal_value(&node)? == expected_value {
                    Ok(())
                } else {
                    Err(TrieError::ValueMismatch)
                };
            }
            Step::Descend(Pointer::Hash(hash)) => expected = ExpectedRef::Hash(hash),
            Step::Descend(Pointer::Inline(items)) => {
                let mut raw = Vec::new();
                encode_item(&RlpItem::List(items), &mut raw);
                expected = ExpectedRef::Raw(raw);
            }
        }
    }
}
